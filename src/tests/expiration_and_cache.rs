#[cfg(test)]
mod test {

    use crate::cache::TokenCache;
    use chrono::{TimeDelta, Utc};
    use std::time::Duration;

    #[tokio::test]
    async fn token_is_served_until_it_expires() {
        let cache = TokenCache::new();
        let ttl = 2;
        // token that expires in 2 seconds
        cache
            .set("T", "short-val", Some(Utc::now() + TimeDelta::seconds(ttl)))
            .await;

        let got = cache.get("T").await;
        assert!(got.is_some());
        assert_eq!(got.unwrap().token, "short-val");

        tokio::time::sleep(Duration::from_secs(ttl as u64)).await;
        assert!(cache.get("T").await.is_none());
        // expired entry was evicted on read
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn token_without_expiry_stays_until_cleared() {
        let cache = TokenCache::new();
        cache.set("A", "a", None).await;
        cache.set("B", "b", None).await;

        cache.clear("A").await;
        assert!(cache.get("A").await.is_none());
        assert_eq!(cache.get("B").await.unwrap().token, "b");

        cache.clear_all().await;
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn set_overwrites_and_keys_are_case_sensitive() {
        let cache = TokenCache::new();
        cache.set("T", "first", None).await;
        cache.set("T", "second", None).await;
        cache.set("t", "lower", None).await;

        assert_eq!(cache.get("T").await.unwrap().token, "second");
        assert_eq!(cache.get("t").await.unwrap().token, "lower");
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let cache = TokenCache::new();
        let other = cache.clone();
        cache.set("T", "shared", None).await;
        assert_eq!(other.get("T").await.unwrap().token, "shared");
    }
}
