//! Cached dashboard repository.

use async_trait::async_trait;
use finsync_cache::{CacheKey, Namespace, TtlCache};
use finsync_types::error::Result;
use finsync_types::{
    ChartData, DashboardData, DashboardRepository, ReportWindow, SharedDashboardRepository,
};
use tracing::debug;

use crate::read_through::read_through;

/// Read-through caching decorator over a [`DashboardRepository`].
#[derive(Clone)]
pub struct CachedDashboardRepository {
    inner: SharedDashboardRepository,
    cache: TtlCache,
}

impl CachedDashboardRepository {
    pub fn new(inner: SharedDashboardRepository, cache: TtlCache) -> Self {
        Self { inner, cache }
    }

    /// Drop cached dashboards and charts for a user, either for one window or
    /// for all of them. Returns how many entries were removed.
    pub async fn invalidate(&self, user_id: &str, window: Option<&ReportWindow>) -> usize {
        let scopes = match window {
            Some(window) => vec![
                CacheKey::dashboard(user_id, window).to_string(),
                CacheKey::dashboard_charts(user_id, window).to_string(),
            ],
            None => vec![
                CacheKey::scope(Namespace::Dashboard, user_id),
                CacheKey::scope(Namespace::DashboardCharts, user_id),
            ],
        };
        let removed = self.cache.invalidate_prefixes(&scopes).await;
        debug!(user_id = %user_id, window = ?window, removed, "Invalidated dashboard caches");
        removed
    }
}

#[async_trait]
impl DashboardRepository for CachedDashboardRepository {
    async fn dashboard(&self, user_id: &str, window: &ReportWindow) -> Result<DashboardData> {
        let key = CacheKey::dashboard(user_id, window);
        read_through(&self.cache, &key, self.cache.tiers().medium(), || {
            self.inner.dashboard(user_id, window)
        })
        .await
    }

    async fn charts(&self, user_id: &str, window: &ReportWindow) -> Result<Vec<ChartData>> {
        let key = CacheKey::dashboard_charts(user_id, window);
        read_through(&self.cache, &key, self.cache.tiers().medium(), || {
            self.inner.charts(user_id, window)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CachedRecordRepository;
    use chrono::{TimeZone, Utc};
    use finsync_types::{
        ChartKind, InMemoryRecordStore, ManualClock, RecordDraft, RecordKind, RecordRepository,
    };
    use std::sync::Arc;

    fn march() -> ReportWindow {
        ReportWindow::Month { year: 2025, month: 3 }
    }

    fn setup() -> (CachedDashboardRepository, InMemoryRecordStore, TtlCache) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 20, 0, 0, 0).unwrap());
        let store = InMemoryRecordStore::with_clock(clock.shared());
        let cache = TtlCache::in_memory().with_clock(clock.shared());
        (
            CachedDashboardRepository::new(Arc::new(store.clone()), cache.clone()),
            store,
            cache,
        )
    }

    #[tokio::test]
    async fn test_dashboard_cached_per_window() {
        let (repo, store, _) = setup();
        repo.dashboard("u1", &march()).await.unwrap();
        repo.dashboard("u1", &march()).await.unwrap();
        assert_eq!(store.call_count("dashboard"), 1);

        repo.dashboard("u1", &ReportWindow::Year { year: 2025 }).await.unwrap();
        assert_eq!(store.call_count("dashboard"), 2);
    }

    #[tokio::test]
    async fn test_charts_cached() {
        let (repo, store, _) = setup();
        store.set_charts(
            "u1",
            vec![ChartData {
                id: "trend".into(),
                kind: ChartKind::Line,
                title: "Trend".into(),
                data: vec![],
            }],
        );
        let charts = repo.charts("u1", &march()).await.unwrap();
        assert_eq!(charts.len(), 1);
        repo.charts("u1", &march()).await.unwrap();
        assert_eq!(store.call_count("charts"), 1);
    }

    #[tokio::test]
    async fn test_invalidate_single_window() {
        let (repo, store, _) = setup();
        let year = ReportWindow::Year { year: 2025 };
        repo.dashboard("u1", &march()).await.unwrap();
        repo.charts("u1", &march()).await.unwrap();
        repo.dashboard("u1", &year).await.unwrap();

        assert_eq!(repo.invalidate("u1", Some(&march())).await, 2);
        repo.dashboard("u1", &year).await.unwrap();
        assert_eq!(store.call_count("dashboard"), 2);

        assert_eq!(repo.invalidate("u1", None).await, 1);
    }

    #[tokio::test]
    async fn test_record_write_invalidates_dashboard() {
        let (repo, store, cache) = setup();
        let records = CachedRecordRepository::new(Arc::new(store.clone()), cache);

        let before = repo.dashboard("u1", &march()).await.unwrap();
        assert_eq!(before.monthly_income, 0.0);

        records
            .create_record(
                "u1",
                RecordDraft::new(
                    "salary",
                    1000.0,
                    RecordKind::Income,
                    "Salary",
                    Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap(),
                ),
            )
            .await
            .unwrap();

        let after = repo.dashboard("u1", &march()).await.unwrap();
        assert_eq!(after.monthly_income, 1000.0);
    }
}
