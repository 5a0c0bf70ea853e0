//! Session service - credential lifecycle and the refresh protocol

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use facturo_common::SingleFlight;
use facturo_domain::{CredentialPair, Result};
use tracing::{debug, info, instrument, warn};

use super::ports::{CredentialStore, SessionListener, TokenRefresher};

/// Observable state of the refresh protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// No exchange pending
    Idle,
    /// An exchange is pending; new 401s join it
    Refreshing,
    /// The last exchange failed and the session was torn down
    FailedTerminal,
}

/// A 401 could not be recovered from
///
/// The credentials have been cleared and the listener notified. Callers
/// surface the 401 they received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionExpired;

/// Clears the store and notifies the listener at most once per session
#[derive(Clone)]
struct ExpiryLatch {
    store: Arc<dyn CredentialStore>,
    listener: Arc<dyn SessionListener>,
    fired: Arc<AtomicBool>,
    reauth_path: Arc<str>,
}

impl ExpiryLatch {
    fn fire(&self, reason: &str) {
        if self.fired.swap(true, Ordering::SeqCst) {
            debug!(reason, "session already terminated");
            return;
        }
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "failed to clear persisted credentials");
        }
        warn!(reason, reauth_path = %self.reauth_path, "session expired");
        self.listener.session_expired(&self.reauth_path);
    }

    fn rearm(&self) {
        self.fired.store(false, Ordering::SeqCst);
    }

    fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

/// Owner of the credential lifecycle
///
/// Every request that needs to recover from a 401 goes through
/// [`SessionService::recover`]. At most one refresh exchange is in flight at
/// any time; concurrent callers await its outcome.
pub struct SessionService {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    latch: ExpiryLatch,
    flight: SingleFlight<String, SessionExpired>,
}

impl SessionService {
    /// Create a new session service
    pub fn new(
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        listener: Arc<dyn SessionListener>,
        reauth_path: impl Into<String>,
    ) -> Self {
        let reauth_path: String = reauth_path.into();
        let latch = ExpiryLatch {
            store: Arc::clone(&store),
            listener,
            fired: Arc::new(AtomicBool::new(false)),
            reauth_path: Arc::from(reauth_path),
        };
        Self { store, refresher, latch, flight: SingleFlight::new() }
    }

    /// Current credential pair
    pub fn credentials(&self) -> CredentialPair {
        self.store.get()
    }

    /// Current access credential, if logged in
    pub fn access_token(&self) -> Option<String> {
        self.store.get().access_token().map(str::to_string)
    }

    pub fn state(&self) -> RefreshState {
        if self.flight.in_flight() {
            RefreshState::Refreshing
        } else if self.latch.is_fired() {
            RefreshState::FailedTerminal
        } else {
            RefreshState::Idle
        }
    }

    /// Store a freshly issued pair (login, registration) and re-arm expiry
    /// signalling
    ///
    /// # Errors
    /// Returns the store's error when the pair could not be persisted. The
    /// in-memory view is updated regardless.
    pub fn establish(&self, pair: CredentialPair) -> Result<()> {
        let result = self.store.set(pair);
        self.latch.rearm();
        result
    }

    /// Forget the credentials without signalling expiry (explicit logout)
    ///
    /// # Errors
    /// Returns the store's error when the durable copy could not be removed.
    pub fn end_session(&self) -> Result<()> {
        self.store.clear()
    }

    /// Recover from a 401 received by a request sent with `sent_with`
    ///
    /// Returns the access credential the request should be replayed with.
    /// When the stored access credential already differs from `sent_with`
    /// another caller has refreshed it in the meantime and no exchange is
    /// made. Any failed exchange ends the session.
    ///
    /// # Errors
    /// [`SessionExpired`] once the session has been torn down.
    #[instrument(skip_all)]
    pub async fn recover(
        &self,
        sent_with: Option<&str>,
    ) -> std::result::Result<String, SessionExpired> {
        let current = self.store.get();
        if let Some(access) = current.access_token() {
            if sent_with != Some(access) && !self.flight.in_flight() {
                debug!("access credential replaced since request was sent");
                return Ok(access.to_string());
            }
        }

        let mut flight = self.flight.run(|| self.exchange(sent_with)).await;
        if !flight.leader
            && matches!(&flight.result, Ok(token) if sent_with == Some(token.as_str()))
        {
            // Joined a flight that only replayed the credential this request
            // was rejected with.
            flight = self.flight.run(|| self.exchange(sent_with)).await;
        }

        debug!(leader = flight.leader, ok = flight.result.is_ok(), "refresh flight settled");
        flight.result
    }

    /// Build the exchange for one flight
    ///
    /// Called while the flight slot is held, so the credentials read here are
    /// the ones the exchange uses. A refresh credential rotated by an earlier
    /// flight is never sent again.
    fn exchange(
        &self,
        sent_with: Option<&str>,
    ) -> impl Future<Output = std::result::Result<String, SessionExpired>> + Send + 'static {
        let current = self.store.get();
        let sent_with = sent_with.map(str::to_string);
        let refresher = Arc::clone(&self.refresher);
        let store = Arc::clone(&self.store);
        let latch = self.latch.clone();

        async move {
            if let Some(access) = current.access_token() {
                if sent_with.as_deref() != Some(access) {
                    debug!("access credential replaced before exchange");
                    return Ok(access.to_string());
                }
            }

            let Some(refresh_token) = current.refresh_token() else {
                latch.fire("no refresh credential");
                return Err(SessionExpired);
            };

            match refresher.refresh(refresh_token).await {
                Ok(bundle) => {
                    let pair = bundle.into_pair(Some(refresh_token));
                    let Some(access) = pair.access_token().map(str::to_string) else {
                        latch.fire("refresh response carried no access credential");
                        return Err(SessionExpired);
                    };
                    if let Err(err) = store.set(pair) {
                        warn!(error = %err, "refreshed credentials kept in memory only");
                    }
                    latch.rearm();
                    info!("access credential refreshed");
                    Ok(access)
                }
                Err(err) => {
                    warn!(error = %err, status = ?err.status_code(), "refresh exchange failed");
                    latch.fire("refresh exchange failed");
                    Err(SessionExpired)
                }
            }
        }
    }
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService").field("state", &self.state()).finish_non_exhaustive()
    }
}
