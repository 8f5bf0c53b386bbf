//! Cached profile repository.

use async_trait::async_trait;
use finsync_cache::{CacheKey, TtlCache};
use finsync_types::error::Result;
use finsync_types::{ProfileRepository, SharedProfileRepository, UserProfile};

/// Caches present profiles for the very-long tier.
#[derive(Clone)]
pub struct CachedProfileRepository {
    inner: SharedProfileRepository,
    cache: TtlCache,
}

impl CachedProfileRepository {
    pub fn new(inner: SharedProfileRepository, cache: TtlCache) -> Self {
        Self { inner, cache }
    }

    pub async fn invalidate(&self, user_id: &str) {
        self.cache.remove(&CacheKey::user_profile(user_id)).await;
    }
}

#[async_trait]
impl ProfileRepository for CachedProfileRepository {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let key = CacheKey::user_profile(user_id);
        if let Some(hit) = self.cache.get::<UserProfile>(&key).await {
            return Ok(Some(hit));
        }

        let profile = self.inner.profile(user_id).await?;
        if let Some(found) = &profile {
            self.cache
                .set(&key, found, self.cache.tiers().very_long())
                .await;
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use finsync_types::{InMemoryRecordStore, ManualClock};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_profile_cached_for_an_hour() {
        let clock = ManualClock::starting_now();
        let store = InMemoryRecordStore::new();
        store.set_profile(UserProfile {
            id: "u1".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            avatar: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        let repo = CachedProfileRepository::new(
            Arc::new(store.clone()),
            TtlCache::in_memory().with_clock(clock.shared()),
        );

        assert_eq!(repo.profile("u1").await.unwrap().unwrap().name, "Ana");
        clock.advance(chrono::Duration::minutes(59));
        repo.profile("u1").await.unwrap();
        assert_eq!(store.call_count("profile"), 1);

        repo.invalidate("u1").await;
        repo.profile("u1").await.unwrap();
        assert_eq!(store.call_count("profile"), 2);

        assert_eq!(repo.profile("nobody").await.unwrap(), None);
    }
}
