//! Authentication session lifecycle.
//!
//! A session moves through `Unauthenticated -> Active -> Stale ->
//! Unauthenticated`. The manager persists credentials in the
//! [`CredentialStore`], validates them against the [`AuthProvider`], and owns
//! a background task that renews the provider token on a fixed period.
//!
//! Every failure path tears the session down instead of retrying: an invalid
//! session clears stored credentials and stops renewal, and callers asking for
//! a token get `None`, which means "authenticate again".

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, TimeDelta, Utc};
use finsync_types::{Credentials, SharedAuthProvider, SharedClock, system_clock};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{MIN_RENEWAL_INTERVAL, SessionConfig};
use crate::error::{Result, SessionError};
use crate::store::CredentialStore;

/// Lifecycle state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session.
    Unauthenticated,
    /// Credentials present and not yet expired.
    Active,
    /// Credentials present but past their expiry; the next validation tears
    /// them down.
    Stale,
}

/// In-memory view of the current session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

struct RenewalTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    store: CredentialStore,
    auth: SharedAuthProvider,
    clock: SharedClock,
    config: SessionConfig,
    session: Mutex<Option<Session>>,
    renewal: Mutex<Option<RenewalTask>>,
    /// Bumped whenever a session is established or torn down; a renewal
    /// that started under an older generation must not write.
    generation: AtomicU64,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.renewal.get_mut().take() {
            task.cancel.cancel();
        }
    }
}

/// Owns the authenticated session and its renewal timer.
///
/// Clones share the same session. The renewal task holds only a weak
/// reference, so dropping the last manager stops it.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .field("renewal_running", &self.is_renewal_running())
            .finish()
    }
}

impl SessionManager {
    pub fn new(store: CredentialStore, auth: SharedAuthProvider, config: SessionConfig) -> Self {
        Self::with_clock(store, auth, config, system_clock())
    }

    /// Create a manager that reads expiry time from `clock`.
    pub fn with_clock(
        store: CredentialStore,
        auth: SharedAuthProvider,
        config: SessionConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                auth,
                clock,
                config,
                session: Mutex::new(None),
                renewal: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        match self.inner.session.lock().as_ref() {
            None => SessionState::Unauthenticated,
            Some(session) if self.inner.clock.now() < session.expires_at => SessionState::Active,
            Some(_) => SessionState::Stale,
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.session.lock().clone()
    }

    /// User id of the persisted session, if any.
    pub async fn current_user_id(&self) -> Option<String> {
        let cached = self.inner.session.lock().as_ref().map(|s| s.user_id.clone());
        if cached.is_some() {
            return cached;
        }
        self.inner.store.user_id().await
    }

    pub fn is_renewal_running(&self) -> bool {
        self.inner
            .renewal
            .lock()
            .as_ref()
            .is_some_and(|task| !task.cancel.is_cancelled() && !task.handle.is_finished())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Persist a freshly authenticated session and start renewal.
    ///
    /// If any credential cannot be persisted the partial state is cleared and
    /// the error is returned.
    pub async fn initialize_session(&self, token: &str, user_id: &str) -> Result<Session> {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let expires_at = self.expiry_from_now();
        let persisted = async {
            self.inner.store.set_token(token).await?;
            self.inner.store.set_user_id(user_id).await?;
            self.inner.store.set_session_expiry(expires_at).await
        }
        .await;

        if let Err(e) = persisted {
            warn!(user_id = %user_id, error = %e, "Aborting session initialization");
            self.clear_session().await;
            return Err(e.into());
        }

        let session = Session {
            token: token.to_string(),
            user_id: user_id.to_string(),
            expires_at,
        };
        *self.inner.session.lock() = Some(session.clone());
        self.start_renewal();

        info!(user_id = %user_id, expires_at = %expires_at, "Session initialized");
        Ok(session)
    }

    /// Check the persisted session.
    ///
    /// Valid iff a token is stored, the expiry has not passed, and the
    /// provider still reports the same signed-in identity. Any failure clears
    /// the session.
    pub async fn validate_session(&self) -> bool {
        match self.check_session().await {
            Ok(session) => {
                *self.inner.session.lock() = Some(session);
                true
            }
            Err(reason) => {
                debug!(reason, "Session invalid");
                self.clear_session().await;
                false
            }
        }
    }

    async fn check_session(&self) -> std::result::Result<Session, &'static str> {
        let store = &self.inner.store;
        let token = store.token().await.ok_or("no stored token")?;
        let expires_at = store.session_expiry().await.ok_or("no stored expiry")?;
        if self.inner.clock.now() >= expires_at {
            return Err("session expired");
        }

        let identity = match self.inner.auth.current_identity().await {
            Ok(Some(identity)) => identity,
            Ok(None) => return Err("provider reports no identity"),
            Err(e) => {
                warn!(error = %e, "Auth provider failed during validation");
                return Err("provider error");
            }
        };

        let user_id = store.user_id().await.ok_or("no stored user id")?;
        if identity.user_id != user_id {
            return Err("provider identity does not match stored user");
        }

        Ok(Session {
            token,
            user_id,
            expires_at,
        })
    }

    /// Token of a validated session; `None` means authenticate again.
    pub async fn get_valid_token(&self) -> Option<String> {
        if !self.validate_session().await {
            return None;
        }
        self.inner.store.token().await
    }

    /// Validate, then fetch and persist a fresh provider token and extend the
    /// session.
    ///
    /// Any failure clears the session.
    ///
    /// A session cleared or replaced while the provider call is in flight
    /// wins: the renewed token is discarded and [`SessionError::Superseded`] is
    /// returned.
    pub async fn renew_token(&self) -> Result<String> {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        if !self.validate_session().await {
            return Err(SessionError::NotAuthenticated);
        }

        match self.refresh(generation).await {
            Ok(token) => Ok(token),
            Err(SessionError::Superseded) => {
                debug!("Session changed during renewal, discarding token");
                Err(SessionError::Superseded)
            }
            Err(e) => {
                warn!(error = %e, "Token renewal failed, clearing session");
                self.clear_session().await;
                Err(e)
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    async fn refresh(&self, generation: u64) -> Result<String> {
        let identity = self
            .inner
            .auth
            .current_identity()
            .await?
            .ok_or(SessionError::NoIdentity)?;
        let token = self.inner.auth.token().await?.ok_or(SessionError::NoToken)?;
        if !self.is_current(generation) {
            return Err(SessionError::Superseded);
        }

        let expires_at = self.expiry_from_now();
        let written = async {
            self.inner.store.set_token(&token).await?;
            self.inner.store.set_session_expiry(expires_at).await
        }
        .await;
        if let Err(e) = written {
            if !self.is_current(generation) {
                self.restore_after_superseded_write().await;
                return Err(SessionError::Superseded);
            }
            return Err(e.into());
        }

        let installed = {
            let mut slot = self.inner.session.lock();
            let current = self.is_current(generation) && slot.is_some();
            if current {
                *slot = Some(Session {
                    token: token.clone(),
                    user_id: identity.user_id.clone(),
                    expires_at,
                });
            }
            current
        };
        if !installed {
            self.restore_after_superseded_write().await;
            return Err(SessionError::Superseded);
        }
        debug!(user_id = %identity.user_id, expires_at = %expires_at, "Token renewed");
        Ok(token)
    }

    /// The session changed while a renewal was writing; put the store back
    /// in line with whatever session is current now.
    async fn restore_after_superseded_write(&self) {
        let current = self.inner.session.lock().clone();
        match current {
            None => self.inner.store.clear_auth_data().await,
            Some(session) => {
                let restored = async {
                    self.inner.store.set_token(&session.token).await?;
                    self.inner.store.set_session_expiry(session.expires_at).await
                }
                .await;
                if let Err(e) = restored {
                    warn!(error = %e, "Failed to restore credentials after superseded renewal");
                }
            }
        }
    }

    /// Stop renewal and purge stored credentials. Idempotent.
    pub async fn clear_session(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let task = self.inner.renewal.lock().take();
        let had_session = self.inner.session.lock().take().is_some();
        if let Some(task) = &task {
            task.cancel.cancel();
        }

        self.inner.store.clear_auth_data().await;
        if had_session || task.is_some() {
            info!("Session cleared");
        }
    }

    /// Sign in with the provider and initialize a session.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let grant = self.inner.auth.sign_in(credentials).await?;
        let session = self
            .initialize_session(&grant.token, &grant.identity.user_id)
            .await?;

        if let Some(refresh) = &grant.refresh_token
            && let Err(e) = self.inner.store.set_refresh_token(refresh).await
        {
            self.clear_session().await;
            return Err(e.into());
        }
        Ok(session)
    }

    /// Tear down locally, then sign out of the provider.
    pub async fn logout(&self) -> Result<()> {
        self.clear_session().await;
        self.inner.auth.sign_out().await?;
        info!("Logged out");
        Ok(())
    }

    /// Re-validate a session persisted by a previous run and restart renewal.
    ///
    /// Returns whether a valid session was resumed.
    pub async fn resume(&self) -> bool {
        let store = &self.inner.store;
        let (Some(token), Some(user_id), Some(expires_at)) =
            (store.token().await, store.user_id().await, store.session_expiry().await)
        else {
            debug!("No persisted session to resume");
            return false;
        };
        self.inner.generation.fetch_add(1, Ordering::SeqCst);

        *self.inner.session.lock() = Some(Session {
            token,
            user_id: user_id.clone(),
            expires_at,
        });

        if !self.validate_session().await {
            return false;
        }
        self.start_renewal();
        info!(user_id = %user_id, "Session resumed");
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Renewal task
    // ─────────────────────────────────────────────────────────────────────

    fn expiry_from_now(&self) -> DateTime<Utc> {
        let now = self.inner.clock.now();
        TimeDelta::from_std(self.inner.config.duration)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn start_renewal(&self) {
        let period = self.inner.config.renewal_interval.max(MIN_RENEWAL_INTERVAL);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(renewal_loop(
            Arc::downgrade(&self.inner),
            cancel.clone(),
            Instant::now() + period,
            period,
        ));

        let previous = self
            .inner
            .renewal
            .lock()
            .replace(RenewalTask { cancel, handle });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
        debug!(period_secs = period.as_secs(), "Renewal timer started");
    }
}

async fn renewal_loop(
    inner: Weak<Inner>,
    cancel: CancellationToken,
    first_tick: Instant,
    period: std::time::Duration,
) {
    let mut ticker = tokio::time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(inner) = inner.upgrade() else {
            break;
        };
        let manager = SessionManager { inner };
        let renewed = tokio::select! {
            _ = cancel.cancelled() => break,
            renewed = manager.renew_token() => renewed,
        };
        if let Err(e) = renewed {
            // Either the session was cleared, or a newer one owns the timer.
            debug!(error = %e, "Renewal stopped");
            break;
        }
    }
    debug!("Renewal timer exited");
}
