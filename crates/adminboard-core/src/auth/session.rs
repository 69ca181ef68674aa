use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::activity::{ActivityKind, ActivitySource, Subscription};
use super::credentials::CredentialVerifier;
use super::watchdog::Watchdog;
use super::AuthError;
use crate::models::{Profile, Role, Section};
use crate::storage::{KeyValueStore, MemoryStore};
use crate::utils::{Clock, SystemClock};

/// Storage key holding the JSON-serialized profile
pub const PROFILE_KEY: &str = "auth-profile";

/// Storage key holding the last activity time as Unix epoch milliseconds
pub const LAST_ACTIVITY_KEY: &str = "auth-last-activity";

/// Idle time after which a session ends
const DEFAULT_IDLE_TIMEOUT_MINUTES: i64 = 30;

/// How often the watchdog compares last activity against the timeout
const DEFAULT_WATCHDOG_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub idle_timeout: Duration,
    pub watchdog_interval: std::time::Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::minutes(DEFAULT_IDLE_TIMEOUT_MINUTES),
            watchdog_interval: std::time::Duration::from_secs(DEFAULT_WATCHDOG_INTERVAL_SECS),
        }
    }
}

/// Why the most recent session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum LogoutReason {
    /// `logout()` was called
    Explicit,
    /// The idle timeout elapsed, or a persisted session was stale or corrupt
    Expired,
}

/// Observable session state for navigation and route guards.
///
/// Published on every login/logout transition; activity refreshes do not
/// produce a new snapshot. Idle expiry is only reflected once the watchdog,
/// `check_idle` or a late `touch` ends the session, so a snapshot can still
/// report a user as authenticated shortly after the timeout. Use
/// [`SessionManager::is_authenticated`] for a clock-checked answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SessionSnapshot {
    pub profile: Option<Profile>,
    pub logout_reason: Option<LogoutReason>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.profile.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    pub fn can_access(&self, section: Section) -> bool {
        self.role().map(|r| r.can_access(section)).unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
enum SessionState {
    LoggedOut {
        reason: Option<LogoutReason>,
    },
    LoggedIn {
        profile: Profile,
        last_activity: DateTime<Utc>,
    },
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        match self {
            SessionState::LoggedOut { reason } => SessionSnapshot {
                profile: None,
                logout_reason: *reason,
            },
            SessionState::LoggedIn { profile, .. } => SessionSnapshot {
                profile: Some(profile.clone()),
                logout_reason: None,
            },
        }
    }
}

/// Resources held for one logged-in period: the idle watchdog and the
/// activity subscription. Dropping the scope releases both.
#[derive(Debug)]
struct SessionScope {
    watchdog: Option<Watchdog>,
    _activity: Option<Subscription>,
}

/// State shared between the manager handles, the watchdog task and the
/// activity listener. Background holders only keep a `Weak` to it.
struct SessionShared {
    state: Mutex<SessionState>,
    // Always locked after `state`, never before
    scope: Mutex<Option<SessionScope>>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    activity: Option<Arc<dyn ActivitySource>>,
    settings: SessionSettings,
    updates: watch::Sender<SessionSnapshot>,
}

impl SessionShared {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_scope(&self) -> MutexGuard<'_, Option<SessionScope>> {
        self.scope.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, last_activity: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - last_activity >= self.settings.idle_timeout
    }

    fn publish(&self, state: &SessionState) {
        self.updates.send_replace(state.snapshot());
    }

    // ===== Persistence =====

    fn persist_profile(&self, profile: &Profile) {
        match serde_json::to_string(profile) {
            Ok(json) => {
                if let Err(e) = self.store.set(PROFILE_KEY, &json) {
                    warn!(error = %e, "Failed to persist profile");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize profile"),
        }
    }

    fn persist_last_activity(&self, at: DateTime<Utc>) {
        let millis = at.timestamp_millis().to_string();
        if let Err(e) = self.store.set(LAST_ACTIVITY_KEY, &millis) {
            warn!(error = %e, "Failed to persist last activity");
        }
    }

    fn clear_persisted(&self) {
        for key in [PROFILE_KEY, LAST_ACTIVITY_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to clear persisted session");
            }
        }
    }

    /// Read the persisted session. Any missing, unreadable or malformed
    /// piece yields `None`.
    fn read_persisted(&self) -> Option<(Profile, DateTime<Utc>)> {
        let profile_json = match self.store.get(PROFILE_KEY) {
            Ok(value) => value?,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted profile");
                return None;
            }
        };
        let millis = match self.store.get(LAST_ACTIVITY_KEY) {
            Ok(value) => value?,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted last activity");
                return None;
            }
        };

        let profile: Profile = match serde_json::from_str(&profile_json) {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "Persisted profile is malformed");
                return None;
            }
        };
        let last_activity = millis
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis);
        match last_activity {
            Some(at) => Some((profile, at)),
            None => {
                warn!(value = %millis, "Persisted last activity is malformed");
                None
            }
        }
    }

    fn has_persisted(&self) -> bool {
        [PROFILE_KEY, LAST_ACTIVITY_KEY]
            .iter()
            .any(|key| !matches!(self.store.get(key), Ok(None)))
    }

    // ===== Transitions =====
    //
    // Each transition runs under the state lock. A scope being replaced is
    // returned so the caller drops it after the locks are released.

    fn enter(
        self: &Arc<Self>,
        state: &mut SessionState,
        profile: Profile,
        last_activity: DateTime<Utc>,
    ) -> Option<SessionScope> {
        *state = SessionState::LoggedIn {
            profile,
            last_activity,
        };
        self.publish(state);
        let scope = self.open_scope();
        self.lock_scope().replace(scope)
    }

    fn leave(&self, state: &mut SessionState, reason: LogoutReason) -> Option<SessionScope> {
        let was_logged_in = matches!(state, SessionState::LoggedIn { .. });
        self.clear_persisted();
        if was_logged_in {
            *state = SessionState::LoggedOut {
                reason: Some(reason),
            };
            self.publish(state);
        }
        self.lock_scope().take()
    }

    fn open_scope(self: &Arc<Self>) -> SessionScope {
        let weak = Arc::downgrade(self);
        let watchdog = Watchdog::spawn(self.settings.watchdog_interval, move || {
            match weak.upgrade() {
                Some(shared) => {
                    shared.check_idle();
                    ControlFlow::Continue(())
                }
                None => ControlFlow::Break(()),
            }
        });

        let activity = self.activity.as_ref().map(|source| {
            let weak: Weak<SessionShared> = Arc::downgrade(self);
            source.subscribe(Arc::new(move |_kind: ActivityKind| {
                if let Some(shared) = weak.upgrade() {
                    shared.touch();
                }
            }))
        });

        SessionScope {
            watchdog,
            _activity: activity,
        }
    }

    fn touch(&self) {
        let released = {
            let mut state = self.lock_state();
            let now = self.clock.now();
            let last_activity = match &*state {
                SessionState::LoggedIn { last_activity, .. } => *last_activity,
                SessionState::LoggedOut { .. } => return,
            };

            if self.is_expired(last_activity, now) {
                debug!("Activity after idle timeout; ending session");
                self.leave(&mut state, LogoutReason::Expired)
            } else {
                if now > last_activity {
                    if let SessionState::LoggedIn { last_activity, .. } = &mut *state {
                        *last_activity = now;
                    }
                    self.persist_last_activity(now);
                }
                None
            }
        };
        drop(released);
    }

    fn check_idle(&self) -> bool {
        let released = {
            let mut state = self.lock_state();
            let now = self.clock.now();
            let (user, last_activity) = match &*state {
                SessionState::LoggedIn {
                    profile,
                    last_activity,
                } => (profile.identifier.clone(), *last_activity),
                SessionState::LoggedOut { .. } => return false,
            };
            if !self.is_expired(last_activity, now) {
                return false;
            }

            info!(
                user = %user,
                idle_minutes = (now - last_activity).num_minutes(),
                "Session expired after inactivity"
            );
            self.leave(&mut state, LogoutReason::Expired)
        };
        drop(released);
        true
    }

    fn shutdown(&self) {
        let released = self.lock_scope().take();
        if released.is_some() {
            debug!("Session scope released");
        }
        drop(released);
    }
}

/// Owns the current user, login/logout transitions and the idle watchdog.
///
/// Cheap to clone; all clones share one session. The watchdog and the
/// activity subscription are released on logout, on forced expiry, on
/// [`SessionManager::shutdown`], and when the last clone is dropped.
pub struct SessionManager<V> {
    verifier: Arc<V>,
    shared: Arc<SessionShared>,
}

impl<V> Clone for SessionManager<V> {
    fn clone(&self) -> Self {
        Self {
            verifier: Arc::clone(&self.verifier),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V: CredentialVerifier> SessionManager<V> {
    /// Manager with default settings, in-memory storage and the system clock
    pub fn new(verifier: V) -> Self {
        Self::builder(verifier).build()
    }

    pub fn builder(verifier: V) -> SessionManagerBuilder<V> {
        SessionManagerBuilder {
            verifier,
            store: None,
            clock: None,
            activity: None,
            settings: SessionSettings::default(),
        }
    }

    /// Verify credentials and start a session.
    ///
    /// A failed attempt leaves the current state untouched. A successful
    /// attempt while already logged in replaces the previous session.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Profile, AuthError> {
        let Some(profile) = self.verifier.verify(identifier, secret).await else {
            info!(user = %identifier, "Login rejected");
            return Err(AuthError::AuthenticationFailed);
        };

        let shared = &self.shared;
        let released = {
            let mut state = shared.lock_state();
            let now = shared.clock.now();
            shared.persist_profile(&profile);
            shared.persist_last_activity(now);
            shared.enter(&mut state, profile.clone(), now)
        };
        drop(released);

        info!(user = %profile.identifier, role = %profile.role, "Logged in");
        Ok(profile)
    }
}

impl<V> SessionManager<V> {
    /// End the session, clear persisted data and release the watchdog.
    /// Safe to call repeatedly.
    pub fn logout(&self) {
        let released = {
            let mut state = self.shared.lock_state();
            if let SessionState::LoggedIn { profile, .. } = &*state {
                info!(user = %profile.identifier, "Logged out");
            }
            self.shared.leave(&mut state, LogoutReason::Explicit)
        };
        drop(released);
    }

    /// Record user activity. No-op when logged out.
    pub fn touch(&self) {
        self.shared.touch();
    }

    /// Rebuild the session from storage at startup.
    ///
    /// Stale, partial or malformed data is cleared and the session stays
    /// logged out. Returns whether a session was restored.
    pub fn restore(&self) -> bool {
        let shared = &self.shared;
        let persisted = shared.read_persisted();

        let released = {
            let mut state = shared.lock_state();
            let now = shared.clock.now();
            let reason = match persisted {
                Some((profile, last_activity)) if !shared.is_expired(last_activity, now) => {
                    // Clamp future timestamps in storage too, or every restart
                    // would revive the session
                    let last_activity = if last_activity > now {
                        shared.persist_last_activity(now);
                        now
                    } else {
                        last_activity
                    };
                    debug!(user = %profile.identifier, %last_activity, "Session restored");
                    let replaced = shared.enter(&mut state, profile, last_activity);
                    drop(state);
                    drop(replaced);
                    return self.is_authenticated();
                }
                Some((profile, last_activity)) => {
                    debug!(user = %profile.identifier, %last_activity, "Persisted session expired");
                    Some(LogoutReason::Expired)
                }
                None if shared.has_persisted() => {
                    debug!("Persisted session unreadable");
                    Some(LogoutReason::Expired)
                }
                None => None,
            };

            shared.clear_persisted();
            *state = SessionState::LoggedOut { reason };
            shared.publish(&state);
            shared.lock_scope().take()
        };
        drop(released);

        self.is_authenticated()
    }

    /// Run one idle check. Returns true if this call ended the session;
    /// later calls return false until a new session expires.
    pub fn check_idle(&self) -> bool {
        self.shared.check_idle()
    }

    /// Release the watchdog and activity subscription without changing the
    /// session or its persisted data.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    /// Logged in and within the idle timeout
    pub fn is_authenticated(&self) -> bool {
        self.current_profile().is_some()
    }

    /// The active profile, if any. `None` is the normal logged-out answer.
    pub fn current_profile(&self) -> Option<Profile> {
        let state = self.shared.lock_state();
        match &*state {
            SessionState::LoggedIn {
                profile,
                last_activity,
            } if !self.shared.is_expired(*last_activity, self.shared.clock.now()) => {
                Some(profile.clone())
            }
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.current_profile().map(|p| p.role)
    }

    pub fn can_access(&self, section: Section) -> bool {
        self.role().map(|r| r.can_access(section)).unwrap_or(false)
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        match &*self.shared.lock_state() {
            SessionState::LoggedIn { last_activity, .. } => Some(*last_activity),
            SessionState::LoggedOut { .. } => None,
        }
    }

    /// Time left before the idle timeout, if logged in
    pub fn time_until_expiry(&self) -> Option<Duration> {
        let last_activity = self.last_activity()?;
        let remaining = last_activity + self.shared.settings.idle_timeout - self.shared.clock.now();
        Some(remaining.max(Duration::zero()))
    }

    /// Latest published state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.updates.borrow().clone()
    }

    /// Receiver notified on every login/logout transition
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.updates.subscribe()
    }

    pub fn settings(&self) -> SessionSettings {
        self.shared.settings
    }

    /// Whether an idle watchdog task is currently running
    pub fn watchdog_running(&self) -> bool {
        self.shared
            .lock_scope()
            .as_ref()
            .and_then(|scope| scope.watchdog.as_ref())
            .map(Watchdog::is_running)
            .unwrap_or(false)
    }
}

impl<V> std::fmt::Debug for SessionManager<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("snapshot", &self.snapshot())
            .field("settings", &self.shared.settings)
            .finish()
    }
}

pub struct SessionManagerBuilder<V> {
    verifier: V,
    store: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    activity: Option<Arc<dyn ActivitySource>>,
    settings: SessionSettings,
}

impl<V: CredentialVerifier> SessionManagerBuilder<V> {
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn activity_source(mut self, source: Arc<dyn ActivitySource>) -> Self {
        self.activity = Some(source);
        self
    }

    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.settings.idle_timeout = timeout;
        self
    }

    pub fn watchdog_interval(mut self, interval: std::time::Duration) -> Self {
        self.settings.watchdog_interval = interval;
        self
    }

    pub fn build(self) -> SessionManager<V> {
        let (updates, _) = watch::channel(SessionSnapshot::default());
        let shared = SessionShared {
            state: Mutex::new(SessionState::LoggedOut { reason: None }),
            scope: Mutex::new(None),
            store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            activity: self.activity,
            settings: self.settings,
            updates,
        };
        SessionManager {
            verifier: Arc::new(self.verifier),
            shared: Arc::new(shared),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
