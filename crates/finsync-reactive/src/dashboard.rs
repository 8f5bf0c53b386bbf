//! Live dashboard aggregates derived from the record stream.

use futures::stream::{BoxStream, StreamExt};
use finsync_types::{
    DashboardData, Filter, ReportWindow, SharedClock, SharedSubscriptionChannel, system_clock,
};
use tracing::debug;

use crate::config::StreamConfig;
use crate::error::Result;
use crate::operators::distinct_until_changed_by;
use crate::records::RecordStream;
use crate::subscription::Subscription;

/// Stream of dashboard aggregates.
pub type DashboardResults = BoxStream<'static, Result<DashboardData>>;

/// Recomputes [`DashboardData`] on every record push for one window.
///
/// Emits only when the `(balance, income, expense)` headline changes.
#[derive(Clone)]
pub struct DashboardStream {
    records: RecordStream,
    clock: SharedClock,
}

impl DashboardStream {
    pub fn new(channel: SharedSubscriptionChannel, config: StreamConfig) -> Self {
        Self {
            records: RecordStream::new(channel, config),
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn dashboard(&self, user_id: &str, window: ReportWindow) -> DashboardResults {
        debug!(user_id = %user_id, window = %window, "Subscribing to dashboard");
        let clock = self.clock.clone();
        let computed = self
            .records
            .records(user_id, Filter::all())
            .map(move |snapshot| {
                snapshot.map(|records| DashboardData::compute(&records, &window, clock.now()))
            });
        distinct_until_changed_by(computed, |item| {
            item.as_ref().ok().map(DashboardData::headline)
        })
    }

    pub fn subscribe(&self, user_id: &str, window: ReportWindow) -> Subscription<Result<DashboardData>> {
        Subscription::spawn(
            self.dashboard(user_id, window),
            self.records.config().buffer_size,
        )
    }
}
