use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cache::token::AccessToken;

/// Process-local token tier: holds at most one token, replaced wholesale.
#[derive(Debug, Clone, Default)]
pub struct LocalTokenCache {
    inner: Arc<RwLock<Option<AccessToken>>>,
}

impl LocalTokenCache {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(None)) }
    }

    /// Remembered token, whether or not its lease has elapsed
    pub async fn get(&self) -> Option<AccessToken> {
        self.inner.read().await.clone()
    }

    pub async fn set(&self, token: AccessToken) {
        *self.inner.write().await = Some(token);
    }

    /// Returns true if a token was held
    pub async fn clear(&self) -> bool {
        self.inner.write().await.take().is_some()
    }

    /// Clears only if the held token still carries `value`, so a token
    /// replaced by a concurrent issuance survives a stale eviction.
    pub async fn clear_if(&self, value: &str) -> bool {
        let mut guard = self.inner.write().await;
        match guard.as_ref() {
            Some(token) if token.value == value => {
                *guard = None;
                true
            }
            _ => false,
        }
    }
}
