use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::credentials::IdentityCredentials;
use crate::provider::error::TokenError;
use crate::utils::constants::TOKEN_ENDPOINT_PATH;

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    instance_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub instance_url: Option<String>,
}

/// Identity-provider token endpoint (`<login-base>/services/oauth2/token`).
#[derive(Debug, Clone)]
pub struct OAuth2Source {
    token_url: String,
    credentials: IdentityCredentials,
    client: Client,
}

impl OAuth2Source {
    pub fn new(login_url: &str, credentials: IdentityCredentials, client: Client) -> Self {
        Self {
            token_url: format!("{}{}", login_url.trim_end_matches('/'), TOKEN_ENDPOINT_PATH),
            credentials,
            client,
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub async fn fetch_token(&self) -> Result<IssuedToken, TokenError> {
        debug!(
            "requesting token from {} (grant {})",
            self.token_url,
            self.credentials.grant_type().as_str()
        );
        let response = self
            .client
            .post(&self.token_url)
            .form(&self.credentials.form())
            .send()
            .await
            .map_err(|err| TokenError::UpstreamAuth { status: None, body: err.to_string() })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| TokenError::UpstreamAuth { status: Some(status.as_u16()), body: err.to_string() })?;
        if !status.is_success() {
            return Err(TokenError::UpstreamAuth { status: Some(status.as_u16()), body });
        }

        let parsed: TokenEndpointResponse = serde_json::from_str(&body).map_err(|err| {
            TokenError::UpstreamAuth {
                status: Some(status.as_u16()),
                body: format!("malformed token response: {}", err),
            }
        })?;
        if parsed.access_token.is_empty() {
            return Err(TokenError::UpstreamAuth {
                status: Some(status.as_u16()),
                body: "token response carried an empty access_token".to_string(),
            });
        }

        Ok(IssuedToken {
            access_token: parsed.access_token,
            instance_url: parsed.instance_url,
        })
    }
}
