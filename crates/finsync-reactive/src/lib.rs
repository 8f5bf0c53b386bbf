//! Real-time streams for finsync.
//!
//! [`RecordStream`] turns the per-user snapshot subscription into filtered,
//! sorted record lists, with distinct and debounced-search variants.
//! [`DashboardStream`] derives live dashboard aggregates from the same
//! snapshots. Both hand out [`Subscription`] handles that release the remote
//! listener when unsubscribed or dropped.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod operators;
pub mod records;
pub mod search;
pub mod subscription;

pub use config::{DEFAULT_BUFFER_SIZE, DEFAULT_SEARCH_DEBOUNCE_MS, StreamConfig};
pub use dashboard::{DashboardResults, DashboardStream};
pub use error::{Result, StreamError};
pub use operators::{
    debounce, distinct_until_changed, distinct_until_changed_by, end_after_error, switch_latest,
};
pub use records::{RecordResults, RecordStream};
pub use search::{SearchInput, SearchTerms};
pub use subscription::Subscription;
