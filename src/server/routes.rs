use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::provider::token_provider::TokenProvider;
use crate::server::server::AppState;

pub const UNAVAILABLE_MSG: &str = "service temporarily unavailable, try again later";

#[derive(Clone)]
pub struct TokenState {
    pub provider: TokenProvider,
}

#[derive(Debug, Serialize)]
struct TokenBody {
    access_token: String,
    instance_url: Option<String>,
    obtained_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TokenState {
    pub fn new(provider: TokenProvider) -> Self {
        Self { provider }
    }

    pub fn router(&self) -> Router<AppState> {
        Router::new()
            .route("/token", get(get_token))
            .route("/token/invalidate", post(invalidate_token))
            .route("/healthz", get(healthz))
    }
}

async fn get_token(State(state): State<AppState>) -> Response {
    match state.token_state.provider.get_valid_token().await {
        Ok(token) => Json(TokenBody {
            access_token: token.value,
            instance_url: token.instance_url,
            obtained_at: token.obtained_at,
            expires_at: token.assumed_expiry,
        })
        .into_response(),
        Err(err) => {
            // provider status/body stay in operator logs
            error!("token request failed: {}", err);
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": UNAVAILABLE_MSG }))).into_response()
        }
    }
}

async fn invalidate_token(State(state): State<AppState>) -> StatusCode {
    state.token_state.provider.invalidate().await;
    StatusCode::NO_CONTENT
}

async fn healthz() -> &'static str {
    "ok"
}
