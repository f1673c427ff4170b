use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::helpers::time::{lease_expiry, now};

/// Opaque bearer credential plus the locally derived lease window.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    /// issuance time, or the time it was adopted from the distributed tier
    pub obtained_at: DateTime<Utc>,
    /// `obtained_at + lease`; a hint for skipping probes, not a guarantee
    pub assumed_expiry: DateTime<Utc>,
    pub instance_url: Option<String>,
}

impl AccessToken {
    pub fn new(value: String, instance_url: Option<String>, lease: Duration) -> Self {
        Self::obtained_at(value, instance_url, now(), lease)
    }

    pub fn obtained_at(
        value: String,
        instance_url: Option<String>,
        obtained_at: DateTime<Utc>,
        lease: Duration,
    ) -> Self {
        Self {
            value,
            obtained_at,
            assumed_expiry: lease_expiry(obtained_at, lease),
            instance_url,
        }
    }

    pub fn is_within_lease(&self) -> bool {
        now() < self.assumed_expiry
    }
}

// keep the credential out of logs
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("obtained_at", &self.obtained_at)
            .field("assumed_expiry", &self.assumed_expiry)
            .field("instance_url", &self.instance_url)
            .finish()
    }
}
