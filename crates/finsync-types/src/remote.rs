//! Traits for the remote collaborators the client layer sits on.
//!
//! Every read and write is scoped by the owning user id so caches and
//! subscriptions above these traits can always invalidate per user.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::dashboard::{ChartData, DashboardData};
use crate::error::{AuthError, RemoteError, Result};
use crate::identity::{AuthGrant, Credentials, Identity, UserProfile};
use crate::record::{ReceiptUpload, Record, RecordDraft, RecordPage, RecordPatch, RecordQuery};
use crate::window::ReportWindow;

// ============================================================================
// Records
// ============================================================================

/// CRUD and paginated query over a user's records.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// One page of records matching the query.
    async fn list_records(&self, user_id: &str, query: &RecordQuery) -> Result<RecordPage>;

    /// A single record, `None` if it does not exist.
    async fn get_record(&self, user_id: &str, id: &str) -> Result<Option<Record>>;

    async fn create_record(&self, user_id: &str, draft: RecordDraft) -> Result<Record>;

    async fn update_record(&self, user_id: &str, id: &str, patch: RecordPatch) -> Result<Record>;

    async fn delete_record(&self, user_id: &str, id: &str) -> Result<()>;

    /// Distinct categories the user has used.
    async fn categories(&self, user_id: &str) -> Result<Vec<String>>;

    /// Upload a receipt and link it to the record; returns the receipt reference.
    async fn attach_receipt(&self, user_id: &str, id: &str, upload: ReceiptUpload)
    -> Result<String>;
}

/// Shared record repository handle.
pub type SharedRecordRepository = Arc<dyn RecordRepository>;

// ============================================================================
// Dashboard and profile
// ============================================================================

/// Server-side dashboard aggregates.
#[async_trait]
pub trait DashboardRepository: Send + Sync {
    async fn dashboard(&self, user_id: &str, window: &ReportWindow) -> Result<DashboardData>;

    async fn charts(&self, user_id: &str, window: &ReportWindow) -> Result<Vec<ChartData>>;
}

pub type SharedDashboardRepository = Arc<dyn DashboardRepository>;

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
}

pub type SharedProfileRepository = Arc<dyn ProfileRepository>;

// ============================================================================
// Live updates
// ============================================================================

/// Stream of full record snapshots for one user.
///
/// A snapshot is the complete current record set, not a delta. An `Err` item
/// ends the stream.
pub type SnapshotStream = BoxStream<'static, std::result::Result<Vec<Record>, RemoteError>>;

/// Push channel delivering full snapshots whenever a user's records change.
pub trait SubscriptionChannel: Send + Sync {
    /// Open a live listener. Dropping the returned stream releases it.
    fn subscribe(&self, user_id: &str) -> SnapshotStream;
}

pub type SharedSubscriptionChannel = Arc<dyn SubscriptionChannel>;

// ============================================================================
// Authentication
// ============================================================================

/// External identity provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Currently signed-in identity, if any.
    async fn current_identity(&self) -> std::result::Result<Option<Identity>, AuthError>;

    /// Fresh token for the current identity, `None` if signed out.
    async fn token(&self) -> std::result::Result<Option<String>, AuthError>;

    async fn sign_in(&self, credentials: &Credentials) -> std::result::Result<AuthGrant, AuthError>;

    async fn sign_out(&self) -> std::result::Result<(), AuthError>;
}

pub type SharedAuthProvider = Arc<dyn AuthProvider>;
