//! Shared domain types for finsync.
//!
//! This crate holds the value types every other finsync crate speaks
//! (records, filters, reporting windows, dashboard aggregates, identities),
//! the [`Clock`] abstraction, and the traits for the remote collaborators the
//! client layer wraps. In-memory implementations of those traits live in
//! [`memory`] so downstream crates can exercise the full contract in tests.

pub mod clock;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod identity;
pub mod memory;
pub mod record;
pub mod remote;
pub mod window;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock, system_clock};
pub use dashboard::{
    CashFlow, CategorySummary, ChartData, ChartKind, DashboardData, MonthlyTrend, RecentRecord,
};
pub use error::{AuthError, RemoteError, WindowError};
pub use filter::{AmountRange, DateRange, Filter, compare_recency, sort_records};
pub use identity::{AuthGrant, Credentials, Identity, UserProfile};
pub use memory::{InMemoryAuthProvider, InMemoryRecordStore};
pub use record::{ReceiptUpload, Record, RecordDraft, RecordKind, RecordPage, RecordPatch, RecordQuery};
pub use remote::{
    AuthProvider, DashboardRepository, ProfileRepository, RecordRepository, SharedAuthProvider,
    SharedDashboardRepository, SharedProfileRepository, SharedRecordRepository,
    SharedSubscriptionChannel, SnapshotStream, SubscriptionChannel,
};
pub use window::{Period, ReportWindow};
