//! In-memory collaborators.
//!
//! [`InMemoryRecordStore`] stands in for the remote document store and its
//! live-update channel; [`InMemoryAuthProvider`] stands in for the identity
//! provider. Both are complete implementations of their traits and expose
//! counters and failure injection for tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, trace};

use crate::clock::{SharedClock, system_clock};
use crate::dashboard::{ChartData, DashboardData};
use crate::error::{AuthError, RemoteError, Result};
use crate::identity::{AuthGrant, Credentials, Identity, UserProfile};
use crate::record::{ReceiptUpload, Record, RecordDraft, RecordPage, RecordPatch, RecordQuery};
use crate::remote::{
    AuthProvider, DashboardRepository, ProfileRepository, RecordRepository, SnapshotStream,
    SubscriptionChannel,
};
use crate::window::ReportWindow;

const CHANNEL_CAPACITY: usize = 64;

type Snapshot = std::result::Result<Vec<Record>, RemoteError>;

// ============================================================================
// InMemoryRecordStore
// ============================================================================

/// Remote store double backed by per-user vectors and broadcast channels.
///
/// Clones share state.
#[derive(Clone)]
pub struct InMemoryRecordStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    clock: SharedClock,
    records: Mutex<HashMap<String, Vec<Record>>>,
    channels: Mutex<HashMap<String, broadcast::Sender<Snapshot>>>,
    profiles: Mutex<HashMap<String, UserProfile>>,
    charts: Mutex<HashMap<String, Vec<ChartData>>>,
    fail_next: Mutex<Option<RemoteError>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    live_listeners: Arc<AtomicUsize>,
    opened_listeners: AtomicUsize,
}

impl std::fmt::Debug for InMemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRecordStore")
            .field("users", &self.inner.records.lock().len())
            .field("live_listeners", &self.subscriber_count())
            .finish()
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Create a store that stamps `created_at`/`updated_at` from `clock`.
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                clock,
                records: Mutex::new(HashMap::new()),
                channels: Mutex::new(HashMap::new()),
                profiles: Mutex::new(HashMap::new()),
                charts: Mutex::new(HashMap::new()),
                fail_next: Mutex::new(None),
                calls: Mutex::new(HashMap::new()),
                live_listeners: Arc::new(AtomicUsize::new(0)),
                opened_listeners: AtomicUsize::new(0),
            }),
        }
    }

    /// Seed records for a user without counting as a remote call.
    pub fn seed(&self, user_id: &str, records: Vec<Record>) {
        self.mutate(user_id, |existing| existing.extend(records));
    }

    pub fn set_profile(&self, profile: UserProfile) {
        self.inner.profiles.lock().insert(profile.id.clone(), profile);
    }

    pub fn set_charts(&self, user_id: &str, charts: Vec<ChartData>) {
        self.inner.charts.lock().insert(user_id.to_string(), charts);
    }

    /// Make the next repository call fail with `error`.
    pub fn fail_next_call(&self, error: RemoteError) {
        *self.inner.fail_next.lock() = Some(error);
    }

    /// Deliver a terminal error to every live listener of `user_id`.
    pub fn push_error(&self, user_id: &str, error: RemoteError) {
        let channels = self.inner.channels.lock();
        if let Some(sender) = channels.get(user_id) {
            let _ = sender.send(Err(error));
        }
    }

    /// Number of times a repository operation has been invoked.
    pub fn call_count(&self, operation: &str) -> usize {
        self.inner.calls.lock().get(operation).copied().unwrap_or(0)
    }

    /// Live listeners currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.inner.live_listeners.load(Ordering::SeqCst)
    }

    /// Listeners opened since creation.
    pub fn subscriptions_opened(&self) -> usize {
        self.inner.opened_listeners.load(Ordering::SeqCst)
    }

    /// Current records of a user, unsorted.
    pub fn snapshot(&self, user_id: &str) -> Vec<Record> {
        self.inner
            .records
            .lock()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    fn begin(&self, operation: &'static str) -> Result<()> {
        *self.inner.calls.lock().entry(operation).or_default() += 1;
        match self.inner.fail_next.lock().take() {
            Some(error) => {
                debug!(operation, error = %error, "Injected remote failure");
                Err(error)
            }
            None => Ok(()),
        }
    }

    /// Apply a mutation and broadcast the new snapshot while holding the lock,
    /// so listeners observe writes in order.
    fn mutate<T>(&self, user_id: &str, f: impl FnOnce(&mut Vec<Record>) -> T) -> T {
        let mut records = self.inner.records.lock();
        let user_records = records.entry(user_id.to_string()).or_default();
        let out = f(user_records);
        let snapshot = user_records.clone();

        if let Some(sender) = self.inner.channels.lock().get(user_id) {
            let delivered = sender.send(Ok(snapshot)).unwrap_or(0);
            trace!(user_id, delivered, "Broadcast record snapshot");
        }
        out
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordStore {
    async fn list_records(&self, user_id: &str, query: &RecordQuery) -> Result<RecordPage> {
        self.begin("list_records")?;
        let matching = query.filter.apply(self.snapshot(user_id));

        let offset = match &query.cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| RemoteError::Backend(format!("invalid cursor: {}", cursor)))?,
            None => 0,
        };
        let remaining: Vec<Record> = matching.into_iter().skip(offset).collect();
        let take = query.page_size.unwrap_or(remaining.len());
        let has_more = remaining.len() > take;
        let records: Vec<Record> = remaining.into_iter().take(take).collect();
        let next_cursor = has_more.then(|| (offset + records.len()).to_string());

        Ok(RecordPage {
            records,
            next_cursor,
            has_more,
        })
    }

    async fn get_record(&self, user_id: &str, id: &str) -> Result<Option<Record>> {
        self.begin("get_record")?;
        Ok(self.snapshot(user_id).into_iter().find(|r| r.id == id))
    }

    async fn create_record(&self, user_id: &str, draft: RecordDraft) -> Result<Record> {
        self.begin("create_record")?;
        let record = draft.into_record(uuid::Uuid::new_v4().to_string(), self.inner.clock.now());
        let created = record.clone();
        self.mutate(user_id, |records| records.push(record));
        debug!(user_id, record_id = %created.id, "Created record");
        Ok(created)
    }

    async fn update_record(&self, user_id: &str, id: &str, patch: RecordPatch) -> Result<Record> {
        self.begin("update_record")?;
        let now = self.inner.clock.now();
        self.mutate(user_id, |records| {
            let record = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| RemoteError::NotFound(format!("record {}", id)))?;
            patch.apply_to(record, now);
            Ok(record.clone())
        })
    }

    async fn delete_record(&self, user_id: &str, id: &str) -> Result<()> {
        self.begin("delete_record")?;
        self.mutate(user_id, |records| {
            let before = records.len();
            records.retain(|r| r.id != id);
            if records.len() == before {
                Err(RemoteError::NotFound(format!("record {}", id)))
            } else {
                Ok(())
            }
        })
    }

    async fn categories(&self, user_id: &str) -> Result<Vec<String>> {
        self.begin("categories")?;
        let categories: BTreeSet<String> = self
            .snapshot(user_id)
            .into_iter()
            .map(|r| r.category)
            .filter(|c| !c.is_empty())
            .collect();
        Ok(categories.into_iter().collect())
    }

    async fn attach_receipt(
        &self,
        user_id: &str,
        id: &str,
        upload: ReceiptUpload,
    ) -> Result<String> {
        self.begin("attach_receipt")?;
        let receipt_ref = format!("receipts/{}/{}/{}", user_id, id, upload.file_name);
        let now = self.inner.clock.now();
        self.mutate(user_id, |records| {
            let record = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| RemoteError::NotFound(format!("record {}", id)))?;
            record.receipt_ref = Some(receipt_ref.clone());
            record.updated_at = now;
            Ok(receipt_ref)
        })
    }
}

#[async_trait]
impl DashboardRepository for InMemoryRecordStore {
    async fn dashboard(&self, user_id: &str, window: &ReportWindow) -> Result<DashboardData> {
        self.begin("dashboard")?;
        Ok(DashboardData::compute(
            &self.snapshot(user_id),
            window,
            self.inner.clock.now(),
        ))
    }

    async fn charts(&self, user_id: &str, _window: &ReportWindow) -> Result<Vec<ChartData>> {
        self.begin("charts")?;
        Ok(self
            .inner
            .charts
            .lock()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRecordStore {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.begin("profile")?;
        Ok(self.inner.profiles.lock().get(user_id).cloned())
    }
}

/// Decrements the live listener count when the snapshot stream is dropped.
struct ListenerGuard(Arc<AtomicUsize>);

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SubscriptionChannel for InMemoryRecordStore {
    fn subscribe(&self, user_id: &str) -> SnapshotStream {
        // Subscribe and read the initial snapshot under the records lock so no
        // write can slip between them.
        let (mut rx, initial) = {
            let records = self.inner.records.lock();
            let rx = self
                .inner
                .channels
                .lock()
                .entry(user_id.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .subscribe();
            (rx, records.get(user_id).cloned().unwrap_or_default())
        };

        self.inner.live_listeners.fetch_add(1, Ordering::SeqCst);
        self.inner.opened_listeners.fetch_add(1, Ordering::SeqCst);
        let guard = ListenerGuard(self.inner.live_listeners.clone());
        let user_id = user_id.to_string();
        debug!(user_id = %user_id, "Opened record listener");

        async_stream::stream! {
            let _guard = guard;
            yield Ok(initial);
            loop {
                match rx.recv().await {
                    Ok(Ok(snapshot)) => yield Ok(snapshot),
                    Ok(Err(error)) => {
                        yield Err(error);
                        break;
                    }
                    // Snapshots are complete, so skipping stale ones loses nothing.
                    Err(RecvError::Lagged(skipped)) => {
                        trace!(user_id = %user_id, skipped, "Listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
        .boxed()
    }
}

// ============================================================================
// InMemoryAuthProvider
// ============================================================================

/// Identity provider double with a fixed user table.
#[derive(Debug, Default)]
pub struct InMemoryAuthProvider {
    users: Mutex<HashMap<String, (String, Identity)>>,
    current: Mutex<Option<Identity>>,
    token_failure: Mutex<Option<AuthError>>,
    tokens_revoked: Mutex<bool>,
    token_requests: AtomicUsize,
    issued: AtomicU64,
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user that can sign in with the given credentials.
    pub fn with_user(self, email: &str, password: &str, user_id: &str) -> Self {
        self.users.lock().insert(
            email.to_string(),
            (
                password.to_string(),
                Identity::new(user_id).with_email(email),
            ),
        );
        self
    }

    /// Mark `identity` as signed in without going through credentials.
    pub fn sign_in_as(&self, identity: Identity) {
        *self.current.lock() = Some(identity);
        *self.tokens_revoked.lock() = false;
    }

    /// Drop the current identity as if the provider signed the user out.
    pub fn expire_identity(&self) {
        *self.current.lock() = None;
    }

    /// Keep the identity but stop issuing tokens.
    pub fn revoke_tokens(&self) {
        *self.tokens_revoked.lock() = true;
    }

    /// Make token requests fail with `error` until cleared with `None`.
    pub fn fail_tokens(&self, error: Option<AuthError>) {
        *self.token_failure.lock() = error;
    }

    /// Number of token requests served or refused.
    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    fn issue_token(&self, identity: &Identity) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        format!("token-{}-{}", identity.user_id, n)
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn current_identity(&self) -> std::result::Result<Option<Identity>, AuthError> {
        Ok(self.current.lock().clone())
    }

    async fn token(&self) -> std::result::Result<Option<String>, AuthError> {
        self.token_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.token_failure.lock().clone() {
            return Err(error);
        }
        if *self.tokens_revoked.lock() {
            return Ok(None);
        }
        let current = self.current.lock().clone();
        Ok(current.map(|identity| self.issue_token(&identity)))
    }

    async fn sign_in(&self, credentials: &Credentials) -> std::result::Result<AuthGrant, AuthError> {
        let identity = {
            let users = self.users.lock();
            match users.get(&credentials.email) {
                Some((password, identity)) if *password == credentials.password => identity.clone(),
                _ => return Err(AuthError::InvalidCredentials),
            }
        };
        self.sign_in_as(identity.clone());
        let token = self.issue_token(&identity);
        Ok(AuthGrant {
            refresh_token: Some(format!("refresh-{}", identity.user_id)),
            identity,
            token,
        })
    }

    async fn sign_out(&self) -> std::result::Result<(), AuthError> {
        self.expire_identity();
        Ok(())
    }
}
