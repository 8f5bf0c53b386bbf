//! Real-time record stream.
//!
//! Every pipeline opens exactly one remote subscription for its user. Each
//! pushed snapshot is filtered and sorted locally, so any number of filtered
//! views can be derived without extra remote listeners.

use futures::stream::{BoxStream, Stream, StreamExt};
use finsync_types::{Filter, Record, SharedSubscriptionChannel};
use tracing::debug;

use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use crate::operators::{
    debounce, distinct_until_changed, distinct_until_changed_by, end_after_error, switch_latest,
};
use crate::subscription::Subscription;

/// Stream of filtered, sorted snapshots. An error item is the last item.
pub type RecordResults = BoxStream<'static, Result<Vec<Record>>>;

/// Injectable factory for live record pipelines.
#[derive(Clone)]
pub struct RecordStream {
    channel: SharedSubscriptionChannel,
    config: StreamConfig,
}

impl RecordStream {
    pub fn new(channel: SharedSubscriptionChannel, config: StreamConfig) -> Self {
        Self { channel, config }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Live snapshots of `user_id`'s records matching `filter`, newest first.
    pub fn records(&self, user_id: &str, filter: Filter) -> RecordResults {
        let filter = filter.normalized();
        debug!(user_id = %user_id, filter = ?filter, "Subscribing to records");
        end_after_error(self.channel.subscribe(user_id).map(move |snapshot| {
            snapshot
                .map(|records| filter.apply(records))
                .map_err(StreamError::from)
        }))
    }

    /// Like [`records`](Self::records), but only emits when the ordered id
    /// sequence changes.
    pub fn records_distinct(&self, user_id: &str, filter: Filter) -> RecordResults {
        distinct_until_changed_by(self.records(user_id, filter), |item| {
            item.as_ref().ok().map(|records| {
                records.iter().map(|r| r.id.clone()).collect::<Vec<_>>()
            })
        })
    }

    /// Records matching `base` narrowed by the latest settled search term.
    ///
    /// Terms are debounced, repeated terms are ignored, and each new term
    /// replaces the previous term's subscription. An error from the current
    /// term's subscription ends the whole stream; later terms are ignored.
    pub fn search<S>(&self, user_id: &str, base: Filter, terms: S) -> RecordResults
    where
        S: Stream<Item = String> + Send + 'static,
    {
        let settled = distinct_until_changed(debounce(terms, self.config.search_debounce));
        let this = self.clone();
        let user_id = user_id.to_string();
        end_after_error(switch_latest(settled.map(move |term| {
            debug!(user_id = %user_id, term = %term, "Applying search term");
            this.records(&user_id, base.clone().with_search(term))
        })))
    }

    pub fn subscribe(&self, user_id: &str, filter: Filter) -> Subscription<Result<Vec<Record>>> {
        Subscription::spawn(self.records(user_id, filter), self.config.buffer_size)
    }

    pub fn subscribe_distinct(
        &self,
        user_id: &str,
        filter: Filter,
    ) -> Subscription<Result<Vec<Record>>> {
        Subscription::spawn(self.records_distinct(user_id, filter), self.config.buffer_size)
    }

    pub fn subscribe_search<S>(
        &self,
        user_id: &str,
        base: Filter,
        terms: S,
    ) -> Subscription<Result<Vec<Record>>>
    where
        S: Stream<Item = String> + Send + 'static,
    {
        Subscription::spawn(self.search(user_id, base, terms), self.config.buffer_size)
    }
}
