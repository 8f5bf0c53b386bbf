//! Cached record repository.

use async_trait::async_trait;
use finsync_cache::{CacheKey, TtlCache};
use finsync_types::error::Result;
use finsync_types::{
    ReceiptUpload, Record, RecordDraft, RecordPage, RecordPatch, RecordQuery, RecordRepository,
    SharedRecordRepository,
};
use tracing::trace;

use crate::read_through::{invalidate_user_records, read_through};

/// Read-through caching decorator over a [`RecordRepository`].
///
/// Reads are served from the cache while fresh. Writes go to the remote
/// first; only a successful write invalidates the acting user's
/// record-derived entries, and a failed write leaves the cache untouched.
#[derive(Clone)]
pub struct CachedRecordRepository {
    inner: SharedRecordRepository,
    cache: TtlCache,
}

impl CachedRecordRepository {
    pub fn new(inner: SharedRecordRepository, cache: TtlCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// Drop every cached list, record and category set for a user.
    pub async fn invalidate(&self, user_id: &str) -> usize {
        invalidate_user_records(&self.cache, user_id).await
    }
}

#[async_trait]
impl RecordRepository for CachedRecordRepository {
    async fn list_records(&self, user_id: &str, query: &RecordQuery) -> Result<RecordPage> {
        let key = CacheKey::transactions(user_id, query);
        read_through(&self.cache, &key, self.cache.tiers().medium(), || {
            self.inner.list_records(user_id, query)
        })
        .await
    }

    async fn get_record(&self, user_id: &str, id: &str) -> Result<Option<Record>> {
        let key = CacheKey::transaction(user_id, id);
        if let Some(hit) = self.cache.get::<Record>(&key).await {
            return Ok(Some(hit));
        }

        let record = self.inner.get_record(user_id, id).await?;
        match &record {
            Some(found) => {
                self.cache
                    .set(&key, found, self.cache.tiers().medium())
                    .await
            }
            None => trace!(user_id = %user_id, record_id = %id, "Record absent, not caching"),
        }
        Ok(record)
    }

    async fn create_record(&self, user_id: &str, draft: RecordDraft) -> Result<Record> {
        let record = self.inner.create_record(user_id, draft).await?;
        invalidate_user_records(&self.cache, user_id).await;
        Ok(record)
    }

    async fn update_record(&self, user_id: &str, id: &str, patch: RecordPatch) -> Result<Record> {
        let record = self.inner.update_record(user_id, id, patch).await?;
        invalidate_user_records(&self.cache, user_id).await;
        Ok(record)
    }

    async fn delete_record(&self, user_id: &str, id: &str) -> Result<()> {
        self.inner.delete_record(user_id, id).await?;
        invalidate_user_records(&self.cache, user_id).await;
        Ok(())
    }

    async fn categories(&self, user_id: &str) -> Result<Vec<String>> {
        let key = CacheKey::transaction_categories(user_id);
        read_through(&self.cache, &key, self.cache.tiers().long(), || {
            self.inner.categories(user_id)
        })
        .await
    }

    async fn attach_receipt(
        &self,
        user_id: &str,
        id: &str,
        upload: ReceiptUpload,
    ) -> Result<String> {
        let receipt_ref = self.inner.attach_receipt(user_id, id, upload).await?;
        invalidate_user_records(&self.cache, user_id).await;
        Ok(receipt_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use finsync_cache::Ttl;
    use finsync_types::{Filter, InMemoryRecordStore, ManualClock, RecordKind, RemoteError};
    use std::sync::Arc;

    fn setup() -> (CachedRecordRepository, InMemoryRecordStore, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap());
        let store = InMemoryRecordStore::with_clock(clock.shared());
        let cache = TtlCache::in_memory().with_clock(clock.shared());
        (
            CachedRecordRepository::new(Arc::new(store.clone()), cache),
            store,
            clock,
        )
    }

    fn draft(desc: &str, category: &str) -> RecordDraft {
        RecordDraft::new(
            desc,
            10.0,
            RecordKind::Expense,
            category,
            Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_list_is_served_from_cache() {
        let (repo, store, _) = setup();
        let query = RecordQuery::new(Filter::all().with_category("Food"));

        repo.list_records("u1", &query).await.unwrap();
        repo.list_records("u1", &query).await.unwrap();
        assert_eq!(store.call_count("list_records"), 1);

        // A different filter is a different key.
        repo.list_records("u1", &RecordQuery::default()).await.unwrap();
        assert_eq!(store.call_count("list_records"), 2);
    }

    #[tokio::test]
    async fn test_list_refetches_after_medium_ttl() {
        let (repo, store, clock) = setup();
        repo.list_records("u1", &RecordQuery::default()).await.unwrap();

        clock.advance(chrono::Duration::minutes(5) + chrono::Duration::milliseconds(1));
        repo.list_records("u1", &RecordQuery::default()).await.unwrap();
        assert_eq!(store.call_count("list_records"), 2);
    }

    #[tokio::test]
    async fn test_categories_use_long_ttl() {
        let (repo, store, clock) = setup();
        repo.categories("u1").await.unwrap();

        clock.advance(chrono::Duration::minutes(10));
        repo.categories("u1").await.unwrap();
        assert_eq!(store.call_count("categories"), 1);

        clock.advance(chrono::Duration::minutes(6));
        repo.categories("u1").await.unwrap();
        assert_eq!(store.call_count("categories"), 2);
    }

    #[tokio::test]
    async fn test_write_invalidates_only_acting_user() {
        let (repo, store, _) = setup();
        let cache = repo.cache().clone();
        cache
            .set(&CacheKey::user_profile("u1"), "profile", Ttl::VERY_LONG)
            .await;
        repo.list_records("u1", &RecordQuery::default()).await.unwrap();
        repo.categories("u1").await.unwrap();
        repo.list_records("u2", &RecordQuery::default()).await.unwrap();

        repo.create_record("u1", draft("lunch", "Food")).await.unwrap();

        let categories = repo.categories("u1").await.unwrap();
        assert_eq!(categories, vec!["Food".to_string()]);
        assert_eq!(store.call_count("categories"), 2);

        repo.list_records("u2", &RecordQuery::default()).await.unwrap();
        assert_eq!(store.call_count("list_records"), 2);
        assert!(cache.contains(&CacheKey::user_profile("u1")).await);
    }

    #[tokio::test]
    async fn test_update_and_delete_invalidate() {
        let (repo, store, _) = setup();
        let record = repo.create_record("u1", draft("lunch", "Food")).await.unwrap();

        assert!(repo.get_record("u1", &record.id).await.unwrap().is_some());
        assert!(repo.get_record("u1", &record.id).await.unwrap().is_some());
        assert_eq!(store.call_count("get_record"), 1);

        let patch = RecordPatch {
            description: Some("brunch".into()),
            ..Default::default()
        };
        repo.update_record("u1", &record.id, patch).await.unwrap();
        let fresh = repo.get_record("u1", &record.id).await.unwrap().unwrap();
        assert_eq!(fresh.description, "brunch");
        assert_eq!(store.call_count("get_record"), 2);

        repo.delete_record("u1", &record.id).await.unwrap();
        assert_eq!(repo.get_record("u1", &record.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_absent_record_is_not_cached() {
        let (repo, store, _) = setup();
        assert_eq!(repo.get_record("u1", "missing").await.unwrap(), None);
        assert_eq!(repo.get_record("u1", "missing").await.unwrap(), None);
        assert_eq!(store.call_count("get_record"), 2);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache_and_propagates() {
        let (repo, store, _) = setup();
        repo.categories("u1").await.unwrap();

        store.fail_next_call(RemoteError::PermissionDenied("nope".into()));
        let err = repo.create_record("u1", draft("lunch", "Food")).await.unwrap_err();
        assert_eq!(err, RemoteError::PermissionDenied("nope".into()));

        repo.categories("u1").await.unwrap();
        assert_eq!(store.call_count("categories"), 1);
    }

    #[tokio::test]
    async fn test_failed_read_is_not_cached() {
        let (repo, store, _) = setup();
        store.fail_next_call(RemoteError::Network("offline".into()));
        assert!(repo.categories("u1").await.is_err());
        assert!(repo.categories("u1").await.is_ok());
        assert_eq!(store.call_count("categories"), 2);
    }

    #[tokio::test]
    async fn test_attach_receipt_invalidates() {
        let (repo, _, _) = setup();
        let record = repo.create_record("u1", draft("lunch", "Food")).await.unwrap();
        repo.get_record("u1", &record.id).await.unwrap();

        let upload = ReceiptUpload {
            file_name: "r.jpg".into(),
            content_type: "image/jpeg".into(),
            bytes: vec![1, 2, 3],
        };
        let receipt = repo.attach_receipt("u1", &record.id, upload).await.unwrap();
        let fresh = repo.get_record("u1", &record.id).await.unwrap().unwrap();
        assert_eq!(fresh.receipt_ref, Some(receipt));
    }
}
