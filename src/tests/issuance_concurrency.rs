#[cfg(test)]
mod test {
    use std::time::Duration;

    use httpmock::MockServer;
    use tokio::task::JoinSet;
    use tokio::time::{sleep, timeout, Instant};

    use crate::provider::error::TokenError;
    use crate::tests::common::{
        build_provider, local_only_provider, mock_issuance_delayed, mock_issuance_failure_delayed, mock_probe,
        FakeStore,
    };

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_cold_start_shares_one_issuance() {
        let server = MockServer::start_async().await;
        let issuance = mock_issuance_delayed(&server, "T_flight", Duration::from_millis(300)).await;
        let provider = local_only_provider(&server);

        let mut callers = JoinSet::new();
        for _ in 0..8 {
            let provider = provider.clone();
            callers.spawn(async move { provider.get_valid_token().await });
        }

        let mut values = Vec::new();
        while let Some(joined) = callers.join_next().await {
            let token = joined.expect("caller task").expect("token");
            values.push(token.value);
        }

        assert_eq!(values.len(), 8);
        assert!(values.iter().all(|value| value == "T_flight"));
        assert_eq!(issuance.hits_async().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_with_shared_store_issue_once() {
        let server = MockServer::start_async().await;
        let issuance = mock_issuance_delayed(&server, "T_replica", Duration::from_millis(200)).await;
        let _probe = mock_probe(&server, "T_replica", 200).await;
        let store = FakeStore::new();
        let provider = build_provider(&server, store.clone());

        let mut callers = JoinSet::new();
        for _ in 0..5 {
            let provider = provider.clone();
            callers.spawn(async move { provider.get_valid_token().await });
        }
        while let Some(joined) = callers.join_next().await {
            assert_eq!(joined.expect("caller task").expect("token").value, "T_replica");
        }

        assert_eq!(issuance.hits_async().await, 1);
        assert_eq!(store.stored().as_deref(), Some("T_replica"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn abandoned_caller_still_caches_the_issued_token() {
        let server = MockServer::start_async().await;
        let issuance = mock_issuance_delayed(&server, "T_detached", Duration::from_millis(300)).await;
        let provider = local_only_provider(&server);

        // caller gives up long before the identity provider answers
        let abandoned = timeout(Duration::from_millis(50), provider.get_valid_token()).await;
        assert!(abandoned.is_err(), "caller should have timed out");

        sleep(Duration::from_millis(800)).await;

        let cached = provider.local().get().await.expect("issuance finished in the background");
        assert_eq!(cached.value, "T_detached");
        assert_eq!(issuance.hits_async().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_a_failed_issuance() {
        let server = MockServer::start_async().await;
        let issuance = mock_issuance_failure_delayed(&server, 503, Duration::from_millis(400)).await;
        let provider = local_only_provider(&server);

        let started = Instant::now();
        let mut callers = JoinSet::new();
        for _ in 0..8 {
            let provider = provider.clone();
            callers.spawn(async move { provider.get_valid_token().await });
        }
        while let Some(joined) = callers.join_next().await {
            let err = joined.expect("caller task").expect_err("issuance must fail");
            assert!(matches!(err, TokenError::UpstreamAuth { status: Some(503), .. }), "{:?}", err);
        }

        // one 400ms flight, not eight in a row
        assert!(started.elapsed() < Duration::from_millis(1500), "took {:?}", started.elapsed());
        assert_eq!(issuance.hits_async().await, 1);

        // the failure is not sticky: the next call tries again
        assert!(provider.get_valid_token().await.is_err());
        assert_eq!(issuance.hits_async().await, 2);
    }
}
