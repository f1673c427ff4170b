use reqwest::{Client, StatusCode};
use thiserror::Error;

/// Why a candidate token was judged invalid
#[derive(Debug, Error)]
pub enum ProbeFailure {
    #[error("probe rejected with status {0}")]
    Rejected(StatusCode),
    #[error("probe transport failure: {0}")]
    Transport(String),
}

/// Minimal side-effect-free authenticated GET against the CRM.
/// 2xx means the token is currently honored; anything else means it is not.
#[derive(Debug, Clone)]
pub struct ValidityProbe {
    url: String,
    client: Client,
}

impl ValidityProbe {
    pub fn new(crm_base_url: &str, probe_path: &str, client: Client) -> Self {
        Self {
            url: format!("{}{}", crm_base_url.trim_end_matches('/'), probe_path),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn check(&self, token: &str) -> Result<(), ProbeFailure> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| ProbeFailure::Transport(err.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(ProbeFailure::Rejected(status)),
        }
    }
}
