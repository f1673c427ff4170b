//! Token acquisition pipeline.
//!
//! `get_valid_token` walks the tiers in order and stops at the first token
//! that passes the validity probe:
//!
//! 1. distributed store (shared across replicas, best-effort)
//! 2. local memory (only while inside the assumed lease)
//! 3. issuance from the identity provider, written back to both tiers
//!
//! Issuance runs behind a single-flight lock so concurrent misses share one
//! call to the identity provider, and its outcome: callers queued behind a
//! failed issuance get the same error instead of retrying one after another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::cache::distributed::{build_distributed_cache, CacheError, DistributedCache};
use crate::cache::token::AccessToken;
use crate::cache::token_cache::LocalTokenCache;
use crate::config::credentials::IdentityCredentials;
use crate::config::types::ServiceConfig;
use crate::helpers::time::get_instant;
use crate::observability::metrics::{
    get_metrics, PROBE_INVALID, PROBE_VALID, TIER_DISTRIBUTED, TIER_FAILED, TIER_ISSUED, TIER_LOCAL,
};
use crate::provider::error::TokenError;
use crate::resilience::retry::RetrySettings;
use crate::sources::oauth2::OAuth2Source;
use crate::sources::probe::ValidityProbe;

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// key of the shared token in the distributed store
    pub cache_key: String,
    pub lease: Duration,
    /// bound on each distributed store call
    pub cache_timeout: Duration,
    pub retry: RetrySettings,
}

/// Hands out bearer tokens for one upstream credential set.
///
/// Cheap to clone; clones share the same tiers and single-flight guard.
#[derive(Clone)]
pub struct TokenProvider {
    inner: Arc<Inner>,
}

struct Inner {
    settings: ProviderSettings,
    distributed: Arc<dyn DistributedCache>,
    local: LocalTokenCache,
    issuer: OAuth2Source,
    probe: ValidityProbe,
    /// single-flight guard; holds the failure of the last issuance, if it failed
    issuance: Mutex<Option<TokenError>>,
    /// bumped after every completed issuance, successful or not
    generation: AtomicU64,
}

enum DistributedRead {
    Valid(AccessToken),
    Rejected(String),
    Miss,
}

impl TokenProvider {
    pub fn new(
        settings: ProviderSettings,
        distributed: Arc<dyn DistributedCache>,
        issuer: OAuth2Source,
        probe: ValidityProbe,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                distributed,
                local: LocalTokenCache::new(),
                issuer,
                probe,
                issuance: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Builds the provider and its collaborators from a validated config.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let settings = &config.settings;
        let client = Client::builder()
            .timeout(settings.http_timeout())
            .build()
            .context("failed to build HTTP client")?;

        let credentials = IdentityCredentials::resolve(&config.identity)?;
        let issuer = OAuth2Source::new(&config.identity.login_url, credentials, client.clone());
        let probe = ValidityProbe::new(&config.crm.base_url, &config.crm.probe_path, client);
        let distributed = build_distributed_cache(&config.cache)
            .context("failed to build distributed token cache")?;

        info!("token endpoint: {}, probe: {}", issuer.token_url(), probe.url());

        Ok(Self::new(
            ProviderSettings {
                cache_key: config.cache.key.to_owned(),
                lease: settings.lease(),
                cache_timeout: settings.cache_timeout(),
                retry: RetrySettings::from_config(settings.retry.as_ref()),
            },
            distributed,
            issuer,
            probe,
        ))
    }

    /// Returns a token that passed the validity probe on this call, or a
    /// freshly issued one. Fails only when issuance fails.
    ///
    /// The pipeline runs on its own task: dropping the returned future does
    /// not cancel an in-flight issuance, and its result is still cached.
    pub async fn get_valid_token(&self) -> Result<AccessToken, TokenError> {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.acquire().await })
            .await
            .map_err(|err| TokenError::Aborted(err.to_string()))?
    }

    /// Forgets the local token so the next call re-enters the pipeline from
    /// the top. The distributed tier is left alone; readers there probe.
    pub async fn invalidate(&self) {
        let cleared = self.inner.local.clear().await;
        get_metrics().await.invalidations.inc();
        info!("local token invalidated (held: {})", cleared);
    }

    pub fn local(&self) -> &LocalTokenCache {
        &self.inner.local
    }
}

impl Inner {
    async fn acquire(&self) -> Result<AccessToken, TokenError> {
        let metrics = get_metrics().await;
        let generation = self.generation.load(Ordering::Acquire);

        let rejected = match self.from_distributed().await {
            DistributedRead::Valid(token) => {
                metrics.token_requests.with_label_values(&[TIER_DISTRIBUTED]).inc();
                return Ok(token);
            }
            DistributedRead::Rejected(value) => Some(value),
            DistributedRead::Miss => None,
        };

        if let Some(token) = self.from_local(rejected.as_deref()).await {
            metrics.token_requests.with_label_values(&[TIER_LOCAL]).inc();
            return Ok(token);
        }

        match self.issue(generation).await {
            Ok(token) => {
                metrics.token_requests.with_label_values(&[TIER_ISSUED]).inc();
                Ok(token)
            }
            Err(err) => {
                metrics.token_requests.with_label_values(&[TIER_FAILED]).inc();
                Err(err)
            }
        }
    }

    async fn from_distributed(&self) -> DistributedRead {
        let value = match self.cache_get().await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!("distributed cache miss for key '{}'", self.settings.cache_key);
                return DistributedRead::Miss;
            }
            Err(err) => {
                record_cache_error("get", &err).await;
                return DistributedRead::Miss;
            }
        };

        if !self.probe(&value, TIER_DISTRIBUTED).await {
            return DistributedRead::Rejected(value);
        }

        let instance_url = self
            .local
            .get()
            .await
            .filter(|held| held.value == value)
            .and_then(|held| held.instance_url);
        let token = AccessToken::new(value, instance_url, self.settings.lease);
        self.local.set(token.clone()).await;
        debug!("adopted token from distributed cache, lease until {}", token.assumed_expiry);
        DistributedRead::Valid(token)
    }

    async fn from_local(&self, rejected: Option<&str>) -> Option<AccessToken> {
        let token = self.local.get().await?;

        if rejected == Some(token.value.as_str()) {
            debug!("local token already failed the probe this call, discarding");
            self.local.clear_if(&token.value).await;
            return None;
        }
        if !token.is_within_lease() {
            debug!("local token lease elapsed at {}", token.assumed_expiry);
            self.local.clear_if(&token.value).await;
            return None;
        }
        if self.probe(&token.value, TIER_LOCAL).await {
            return Some(token);
        }
        self.local.clear_if(&token.value).await;
        None
    }

    async fn issue(&self, generation: u64) -> Result<AccessToken, TokenError> {
        let mut last_failure = self.issuance.lock().await;

        // a concurrent caller finished issuing while this one waited
        if self.generation.load(Ordering::Acquire) != generation {
            if let Some(err) = last_failure.as_ref() {
                debug!("sharing failed issuance of a concurrent caller: {}", err);
                return Err(err.clone());
            }
            if let Some(token) = self.local.get().await.filter(AccessToken::is_within_lease) {
                debug!("reusing token issued by a concurrent caller");
                return Ok(token);
            }
        }

        let metrics = get_metrics().await;
        let start = get_instant();
        metrics.issuance_requests.inc();

        let issued = self
            .settings
            .retry
            .run_with_retry(|| self.issuer.fetch_token(), TokenError::is_transient)
            .await;

        let issued = match issued {
            Ok(issued) => {
                metrics.issuance_duration.with_label_values(&["success"]).observe(start.elapsed().as_secs_f64());
                issued
            }
            Err(err) => {
                metrics.issuance_duration.with_label_values(&["failure"]).observe(start.elapsed().as_secs_f64());
                metrics.issuance_failures.with_label_values(&[err.reason()]).inc();
                if let TokenError::UpstreamAuth { status, body } = &err {
                    error!("token issuance failed, status: {:?}, body: {}", status, body);
                }
                *last_failure = Some(err.clone());
                self.generation.fetch_add(1, Ordering::AcqRel);
                return Err(err);
            }
        };

        let token = AccessToken::new(issued.access_token, issued.instance_url, self.settings.lease);
        self.local.set(token.clone()).await;
        *last_failure = None;
        self.generation.fetch_add(1, Ordering::AcqRel);
        drop(last_failure);

        info!("issued new token, lease until {}", token.assumed_expiry);

        if let Err(err) = self.cache_set(&token.value).await {
            record_cache_error("set", &err).await;
        }
        Ok(token)
    }

    async fn probe(&self, value: &str, tier: &str) -> bool {
        let metrics = get_metrics().await;
        match self.probe.check(value).await {
            Ok(()) => {
                metrics.probes.with_label_values(&[PROBE_VALID]).inc();
                true
            }
            Err(failure) => {
                metrics.probes.with_label_values(&[PROBE_INVALID]).inc();
                info!("{} token failed validity probe: {}", tier, failure);
                false
            }
        }
    }

    async fn cache_get(&self) -> Result<Option<String>, CacheError> {
        let timeout = self.settings.cache_timeout;
        tokio::time::timeout(timeout, self.distributed.get(&self.settings.cache_key))
            .await
            .map_err(|_| CacheError::Timeout(timeout))?
    }

    async fn cache_set(&self, value: &str) -> Result<(), CacheError> {
        let timeout = self.settings.cache_timeout;
        tokio::time::timeout(timeout, self.distributed.set(&self.settings.cache_key, value))
            .await
            .map_err(|_| CacheError::Timeout(timeout))?
    }
}

async fn record_cache_error(op: &str, err: &CacheError) {
    get_metrics()
        .await
        .distributed_cache_errors
        .with_label_values(&[op, err.reason()])
        .inc();
    match err {
        CacheError::NotConfigured => debug!("distributed cache {} skipped: {}", op, err),
        _ => warn!("distributed cache {} failed, treated as miss: {}", op, err),
    }
}
