#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::broker::AuthBroker;
    use crate::config::types::ConnectionConfig;
    use crate::stores::{MemorySessionStore, SessionStore};
    use crate::tests::common::{connection, credentials, SERVICE_URL};
    use crate::tests::mocks::{validator, MockValidator, SlowProvider};

    async fn session_with_refresh_token() -> MemorySessionStore {
        let sessions = MemorySessionStore::new();
        sessions
            .set_connection_config("T", ConnectionConfig::new(Some(SERVICE_URL.into()), ""))
            .await
            .unwrap();
        sessions
            .set_authorization_config("T", credentials("https://uaa.x").with_refresh_token(Some("r1".into())))
            .await
            .unwrap();
        sessions
    }

    #[tokio::test]
    async fn concurrent_gets_share_one_refresh() {
        let provider = Arc::new(SlowProvider::new(Duration::from_millis(100)));
        let broker = Arc::new(
            AuthBroker::builder()
                .session_store(session_with_refresh_token().await)
                .validator(validator(true))
                .shared_token_provider(provider.clone())
                .build()
                .unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let broker = broker.clone();
                tokio::spawn(async move { broker.get_token("T").await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "slow-1");
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn destinations_resolve_independently() {
        let sessions = session_with_refresh_token().await;
        sessions
            .set_connection_config("U", ConnectionConfig::new(Some(SERVICE_URL.into()), ""))
            .await
            .unwrap();
        sessions
            .set_authorization_config("U", credentials("https://uaa.x").with_refresh_token(Some("r1".into())))
            .await
            .unwrap();

        let provider = Arc::new(SlowProvider::new(Duration::from_millis(200)));
        let broker = Arc::new(
            AuthBroker::builder()
                .session_store(sessions)
                .validator(validator(true))
                .shared_token_provider(provider.clone())
                .build()
                .unwrap(),
        );

        let started = tokio::time::Instant::now();
        let (t, u) = tokio::join!(broker.get_token("T"), broker.get_token("U"));
        assert!(t.is_ok() && u.is_ok());
        // two 200ms refreshes overlapped
        assert!(started.elapsed() < Duration::from_millis(390));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn provider_override_replaces_validator() {
        let sessions = MemorySessionStore::new();
        sessions.set_connection_config("T", connection("expired-jwt")).await.unwrap();
        sessions
            .set_authorization_config("T", credentials("https://uaa.x").with_refresh_token(Some("r1".into())))
            .await
            .unwrap();

        let mut never = MockValidator::new();
        never.expect_validate().times(0);
        let mut provider = SlowProvider::new(Duration::from_millis(1));
        provider.verdict = Some(false);
        let provider = Arc::new(provider);

        let broker = AuthBroker::builder()
            .session_store(sessions)
            .validator(never)
            .shared_token_provider(provider.clone())
            .build()
            .unwrap();

        assert_eq!(broker.get_token("T").await.unwrap(), "slow-1");
        assert_eq!(provider.calls(), 1);
    }
}
