// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use httpmock::Method::{GET, POST};
use httpmock::{Mock, MockServer};
use reqwest::Client;

use crate::cache::distributed::{CacheError, DistributedCache, NoopCache};
use crate::config::credentials::IdentityCredentials;
use crate::provider::token_provider::{ProviderSettings, TokenProvider};
use crate::resilience::retry::RetrySettings;
use crate::sources::oauth2::OAuth2Source;
use crate::sources::probe::ValidityProbe;
use crate::utils::constants::{DEFAULT_CACHE_KEY, DEFAULT_PROBE_PATH, TOKEN_ENDPOINT_PATH};

pub const LEASE: Duration = Duration::from_secs(300);

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// In-memory distributed tier with outage injection.
#[derive(Default)]
pub struct FakeStore {
    values: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_token(value: &str) -> Arc<Self> {
        let store = Self::default();
        store.put(value);
        Arc::new(store)
    }

    pub fn put(&self, value: &str) {
        self.values.lock().unwrap().insert(DEFAULT_CACHE_KEY.to_owned(), value.to_owned());
    }

    pub fn stored(&self) -> Option<String> {
        self.values.lock().unwrap().get(DEFAULT_CACHE_KEY).cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl DistributedCache for FakeStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("simulated outage".to_owned()));
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("simulated outage".to_owned()));
        }
        self.values.lock().unwrap().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Distributed tier that never answers
pub struct HangingStore;

#[async_trait]
impl DistributedCache for HangingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), CacheError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

pub fn provider_settings(retry: RetrySettings) -> ProviderSettings {
    ProviderSettings {
        cache_key: DEFAULT_CACHE_KEY.to_owned(),
        lease: LEASE,
        cache_timeout: Duration::from_millis(200),
        retry,
    }
}

/// Provider whose identity provider and CRM are both `server`
pub fn build_provider(server: &MockServer, distributed: Arc<dyn DistributedCache>) -> TokenProvider {
    build_provider_with_retry(server, distributed, RetrySettings::no_retry())
}

pub fn build_provider_with_retry(
    server: &MockServer,
    distributed: Arc<dyn DistributedCache>,
    retry: RetrySettings,
) -> TokenProvider {
    let client = build_reqwest_client();
    let issuer = OAuth2Source::new(
        &server.base_url(),
        IdentityCredentials::client_credentials("client-id", "client-secret"),
        client.clone(),
    );
    let probe = ValidityProbe::new(&server.base_url(), DEFAULT_PROBE_PATH, client);
    TokenProvider::new(provider_settings(retry), distributed, issuer, probe)
}

pub fn local_only_provider(server: &MockServer) -> TokenProvider {
    build_provider(server, Arc::new(NoopCache))
}

pub async fn mock_issuance<'a>(server: &'a MockServer, token: &str) -> Mock<'a> {
    mock_issuance_delayed(server, token, Duration::ZERO).await
}

pub async fn mock_issuance_delayed<'a>(server: &'a MockServer, token: &str, delay: Duration) -> Mock<'a> {
    let body = json!({
        "access_token": token,
        "instance_url": server.base_url(),
        "token_type": "Bearer",
        "issued_at": "1700000000000",
    });
    server
        .mock_async(|when, then| {
            when.method(POST).path(TOKEN_ENDPOINT_PATH);
            then.status(200)
                .header("Content-Type", "application/json")
                .delay(delay)
                .json_body(body);
        })
        .await
}

pub async fn mock_issuance_failure<'a>(server: &'a MockServer, status: u16) -> Mock<'a> {
    mock_issuance_failure_delayed(server, status, Duration::ZERO).await
}

pub async fn mock_issuance_failure_delayed<'a>(server: &'a MockServer, status: u16, delay: Duration) -> Mock<'a> {
    server
        .mock_async(|when, then| {
            when.method(POST).path(TOKEN_ENDPOINT_PATH);
            then.status(status)
                .header("Content-Type", "application/json")
                .delay(delay)
                .json_body(json!({
                    "error": "invalid_client",
                    "error_description": "invalid client credentials",
                }));
        })
        .await
}

/// Probe answering `status` for `Bearer <token>`
pub async fn mock_probe<'a>(server: &'a MockServer, token: &str, status: u16) -> Mock<'a> {
    let authorization = format!("Bearer {}", token);
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path(DEFAULT_PROBE_PATH)
                .header("authorization", authorization);
            then.status(status)
                .header("Content-Type", "application/json")
                .json_body(json!({ "DailyApiRequests": { "Max": 15000, "Remaining": 14999 } }));
        })
        .await
}
