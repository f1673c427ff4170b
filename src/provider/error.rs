use thiserror::Error;

/// Hard failures of token acquisition. Tier misses, cache outages and
/// probe rejections never surface here.
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    /// The identity provider rejected or failed the issuance call. `status`
    /// is absent for transport failures. `body` is for operator logs only.
    #[error("identity provider token request failed ({})", describe_status(.status))]
    UpstreamAuth { status: Option<u16>, body: String },

    #[error("token acquisition task aborted: {0}")]
    Aborted(String),
}

impl TokenError {
    /// Transport errors and 5xx are worth another attempt; 4xx is not.
    pub fn is_transient(&self) -> bool {
        match self {
            TokenError::UpstreamAuth { status: None, .. } => true,
            TokenError::UpstreamAuth { status: Some(status), .. } => *status >= 500,
            TokenError::Aborted(_) => false,
        }
    }

    /// metric label
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::UpstreamAuth { status: None, .. } => "transport",
            TokenError::UpstreamAuth { status: Some(status), .. } if *status >= 500 => "server_error",
            TokenError::UpstreamAuth { .. } => "rejected",
            TokenError::Aborted(_) => "aborted",
        }
    }
}

fn describe_status(status: &Option<u16>) -> String {
    match status {
        Some(status) => format!("status {}", status),
        None => "transport failure".to_string(),
    }
}
