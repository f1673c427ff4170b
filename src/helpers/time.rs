use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use tokio::time::Instant;

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// `obtained_at + lease`; an unrepresentable lease collapses to zero so the
/// token is treated as already outside its lease.
pub fn lease_expiry(obtained_at: DateTime<Utc>, lease: Duration) -> DateTime<Utc> {
    let lease = TimeDelta::from_std(lease).unwrap_or(TimeDelta::zero());
    obtained_at
        .checked_add_signed(lease)
        .unwrap_or(obtained_at)
}
