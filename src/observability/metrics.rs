use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

pub const TIER_DISTRIBUTED: &str = "distributed";
pub const TIER_LOCAL: &str = "local";
pub const TIER_ISSUED: &str = "issued";
pub const TIER_FAILED: &str = "failed";

pub const PROBE_VALID: &str = "valid";
pub const PROBE_INVALID: &str = "invalid";

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Provider metrics
    pub token_requests: IntCounterVec,
    pub probes: IntCounterVec,
    pub invalidations: IntCounter,

    // Issuance metrics
    pub issuance_requests: IntCounter,
    pub issuance_failures: IntCounterVec,
    pub issuance_duration: HistogramVec,

    // Distributed cache metrics
    pub distributed_cache_errors: IntCounterVec,

    // Config/runtime
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("crmtokenagent".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Provider
            token_requests: IntCounterVec::new(Opts::new("token_requests_total", "Token requests by serving tier"), &["tier"]).unwrap(),
            probes: IntCounterVec::new(Opts::new("probe_total", "Validity probes by result"), &["result"]).unwrap(),
            invalidations: IntCounter::new("invalidations_total", "Explicit local token invalidations").unwrap(),

            // Issuance
            issuance_requests: IntCounter::new("issuance_total", "Token issuance calls to the identity provider").unwrap(),
            issuance_failures: IntCounterVec::new(Opts::new("issuance_failures_total", "Issuance failures by reason"), &["reason"]).unwrap(),
            issuance_duration: HistogramVec::new(HistogramOpts::new("issuance_duration_seconds", "Issuance duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["outcome"]).unwrap(),

            // Distributed cache
            distributed_cache_errors: IntCounterVec::new(Opts::new("distributed_cache_errors_total", "Distributed cache errors absorbed as misses"), &["op", "reason"]).unwrap(),

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup").unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_requests.clone())).unwrap();
        reg.register(Box::new(metrics.probes.clone())).unwrap();
        reg.register(Box::new(metrics.invalidations.clone())).unwrap();
        reg.register(Box::new(metrics.issuance_requests.clone())).unwrap();
        reg.register(Box::new(metrics.issuance_failures.clone())).unwrap();
        reg.register(Box::new(metrics.issuance_duration.clone())).unwrap();
        reg.register(Box::new(metrics.distributed_cache_errors.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
