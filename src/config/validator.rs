//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Resolves every secret-bearing value so a missing env var or file fails
//!   the load instead of the first token request
//! - Checks url shape, grant requirements, lease and timeout bounds

use crate::config::settings::{RetryConfig, SettingsConfig};
use crate::config::types::{CacheConfig, ConfigValue, CrmConfig, GrantType, IdentityConfig, ServiceConfig};
use crate::utils::constants::MAX_LEASE_SECONDS;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_identity(&cfg.identity, &mut errors);
    validate_crm(&cfg.crm, &mut errors);
    validate_cache(&cfg.cache, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.lease_seconds == 0 {
        errors.push("settings.lease_seconds must be > 0".to_string());
    } else if settings.lease_seconds > MAX_LEASE_SECONDS {
        errors.push(format!(
            "settings.lease_seconds must be <= {} (got {})",
            MAX_LEASE_SECONDS, settings.lease_seconds
        ));
    }
    if settings.http_timeout_ms == 0 {
        errors.push("settings.http_timeout_ms must be > 0".to_string());
    }
    if settings.cache_timeout_ms == 0 {
        errors.push("settings.cache_timeout_ms must be > 0".to_string());
    }
    if let Some(retry) = &settings.retry {
        validate_retry(retry, errors);
    }
    if !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }
    if settings.server.host.trim().is_empty() {
        errors.push("settings.server.host is empty".to_string());
    }
    if let Some(logging) = &settings.logging {
        let level = logging.level.to_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            errors.push(format!("settings.logging.level '{}' is not supported", logging.level));
        }
    }
}

fn validate_retry(retry: &RetryConfig, errors: &mut Vec<String>) {
    if retry.attempts == Some(0) {
        errors.push("settings.retry.attempts must be >= 1".to_string());
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "settings.retry.max_delay_ms ({}) must be >= base_delay_ms ({})",
                max, base
            ));
        }
    }
}

fn validate_identity(identity: &IdentityConfig, errors: &mut Vec<String>) {
    validate_url("identity.login_url", &identity.login_url, errors);
    validate_value("identity.client_id", &identity.client_id, errors);
    validate_value("identity.client_secret", &identity.client_secret, errors);

    match identity.grant {
        GrantType::Password => {
            for (field, value) in [
                ("identity.username", &identity.username),
                ("identity.password", &identity.password),
            ] {
                match value {
                    Some(value) => validate_value(field, value, errors),
                    None => errors.push(format!("{} is required for the password grant", field)),
                }
            }
        }
        GrantType::ClientCredentials => {
            if identity.username.is_some() || identity.password.is_some() {
                errors.push(
                    "identity.username/password are only used with grant: password".to_string(),
                );
            }
        }
    }
}

fn validate_crm(crm: &CrmConfig, errors: &mut Vec<String>) {
    validate_url("crm.base_url", &crm.base_url, errors);
    if !crm.probe_path.starts_with('/') {
        errors.push(format!("crm.probe_path '{}' must start with '/'", crm.probe_path));
    }
}

fn validate_cache(cache: &CacheConfig, errors: &mut Vec<String>) {
    if cache.key.trim().is_empty() {
        errors.push("cache.key is empty".to_string());
    }
    if let Some(url) = cache.redis_url.as_deref().filter(|url| !url.trim().is_empty()) {
        if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
            errors.push(format!(
                "cache.redis_url must start with redis:// or rediss:// (got '{}')",
                url
            ));
        }
    }
}

fn validate_url(field: &str, url: &str, errors: &mut Vec<String>) {
    if url.trim().is_empty() {
        errors.push(format!("{} is empty", field));
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("{} must be an http(s) url (got '{}')", field, url));
    }
}

fn validate_value(field: &str, value: &ConfigValue, errors: &mut Vec<String>) {
    if let Err(err) = value.resolve() {
        errors.push(format!("{}: {}", field, err));
    }
}
