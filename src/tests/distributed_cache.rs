#[cfg(test)]
mod test {
    use std::sync::Arc;

    use httpmock::MockServer;

    use crate::cache::distributed::{build_distributed_cache, CacheError, DistributedCache, RedisCache};
    use crate::config::types::CacheConfig;
    use crate::observability::metrics::get_metrics;
    use crate::tests::common::{build_provider, local_only_provider, mock_issuance};

    // nothing listens on port 1
    const DEAD_REDIS: &str = "redis://127.0.0.1:1";

    async fn cache_errors(op: &str, reason: &str) -> u64 {
        get_metrics()
            .await
            .distributed_cache_errors
            .with_label_values(&[op, reason])
            .get()
    }

    #[tokio::test]
    async fn absent_or_blank_redis_url_selects_the_noop_tier() {
        for redis_url in [None, Some(String::new()), Some("   ".to_owned())] {
            let config = CacheConfig { redis_url, ..CacheConfig::default() };
            let cache = build_distributed_cache(&config).expect("noop cache");

            assert!(matches!(cache.get(&config.key).await, Err(CacheError::NotConfigured)));
            assert!(matches!(cache.set(&config.key, "T").await, Err(CacheError::NotConfigured)));
        }
    }

    #[tokio::test]
    async fn configured_redis_url_selects_the_redis_tier() {
        let config = CacheConfig { redis_url: Some(DEAD_REDIS.to_owned()), ..CacheConfig::default() };
        let cache = build_distributed_cache(&config).expect("pool is built lazily");

        assert!(matches!(cache.get(&config.key).await, Err(CacheError::Unavailable(_))));
    }

    #[tokio::test]
    async fn unreachable_redis_is_unavailable() {
        let cache = RedisCache::from_url(DEAD_REDIS).expect("pool is built lazily");

        let get = cache.get("sf_token").await;
        let set = cache.set("sf_token", "T").await;

        assert!(matches!(get, Err(CacheError::Unavailable(_))), "{:?}", get);
        assert!(matches!(set, Err(CacheError::Unavailable(_))), "{:?}", set);
    }

    #[tokio::test]
    async fn provider_on_unreachable_redis_still_issues() {
        let server = MockServer::start_async().await;
        let issuance = mock_issuance(&server, "T_no_redis").await;
        let cache = RedisCache::from_url(DEAD_REDIS).expect("pool is built lazily");
        let provider = build_provider(&server, Arc::new(cache));
        let gets_before = cache_errors("get", "unavailable").await;
        let sets_before = cache_errors("set", "unavailable").await;

        let token = provider.get_valid_token().await.expect("token despite redis outage");

        assert_eq!(token.value, "T_no_redis");
        assert_eq!(issuance.hits_async().await, 1);
        assert!(cache_errors("get", "unavailable").await > gets_before);
        assert!(cache_errors("set", "unavailable").await > sets_before);
    }

    #[tokio::test]
    async fn unconfigured_tier_is_counted_apart_from_an_outage() {
        let server = MockServer::start_async().await;
        let _issuance = mock_issuance(&server, "T_local_only").await;
        let provider = local_only_provider(&server);
        let gets_before = cache_errors("get", "not_configured").await;
        let sets_before = cache_errors("set", "not_configured").await;

        provider.get_valid_token().await.expect("token");

        assert!(cache_errors("get", "not_configured").await > gets_before);
        assert!(cache_errors("set", "not_configured").await > sets_before);
    }
}
