use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::provider::error::TokenError;
use crate::provider::token_provider::TokenProvider;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The CRM refused a freshly acquired token as well.
    #[error("CRM rejected the bearer token after a refresh (status {0})")]
    Unauthorized(StatusCode),

    #[error("CRM request failed with status {status}")]
    Status { status: StatusCode, body: String },

    #[error("CRM transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Calls CRM business endpoints with a token from the provider.
///
/// A 401/403 invalidates the local token and the request is retried once
/// with a newly acquired token; a second rejection is returned as
/// [`CrmError::Unauthorized`].
#[derive(Clone)]
pub struct CrmClient {
    base_url: String,
    client: Client,
    provider: TokenProvider,
}

impl CrmClient {
    pub fn new(base_url: &str, client: Client, provider: TokenProvider) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
            provider,
        }
    }

    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response, CrmError> {
        let url = format!("{}{}", self.base_url, path);
        let mut refreshed = false;

        loop {
            let token = self.provider.get_valid_token().await?;
            let mut request = self.client.request(method.clone(), &url).bearer_auth(&token.value);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                if refreshed {
                    return Err(CrmError::Unauthorized(status));
                }
                warn!("{} {} answered {}, invalidating token and retrying once", method, path, status);
                self.provider.invalidate().await;
                refreshed = true;
                continue;
            }

            if !status.is_success() {
                let body = match response.text().await {
                    Ok(body) => body,
                    Err(err) => {
                        debug!("failed to read body of {} {} ({}): {}", method, path, status, err);
                        String::new()
                    }
                };
                return Err(CrmError::Status { status, body });
            }
            return Ok(response);
        }
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, CrmError> {
        let response = self.send(Method::GET, path, None).await?;
        Ok(response.json().await?)
    }
}
