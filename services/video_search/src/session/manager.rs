//! services/video_search/src/session/manager.rs
//!
//! The session manager owns the signed-in identity and its bearer credential.
//! It consumes the identity provider's change notifications, keeps the
//! persisted credential in step with them, renews the credential on a fixed
//! interval, and publishes the current `Session` to dependents.

use futures::StreamExt;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use video_search_core::domain::{BearerToken, Session, UserIdentity};
use video_search_core::ports::{CredentialStore, IdentityProvider, PortResult};

//=========================================================================================
// Shared State (Used by the Manager and its Background Tasks)
//=========================================================================================

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    credentials: Arc<dyn CredentialStore>,
    state: watch::Sender<Session>,
    /// Serializes state transitions so notifications apply one at a time.
    transition: Mutex<()>,
}

impl Inner {
    /// Applies one identity-provider notification to the session.
    ///
    /// A user is only published once its credential is both fetched and
    /// persisted; if either step fails the session is signed out and the
    /// error is returned.
    async fn apply_auth_change(&self, user: Option<UserIdentity>) -> PortResult<()> {
        let _guard = self.transition.lock().await;

        let Some(identity) = user else {
            self.clear_credential();
            self.state.send_replace(Session::signed_out());
            return Ok(());
        };

        let stored = self
            .provider
            .get_token(false)
            .await
            .and_then(|token| self.credentials.store(token.as_str()).map(|()| token));

        match stored {
            Ok(token) => {
                self.state.send_replace(Session::signed_in(identity, token));
                Ok(())
            }
            Err(e) => {
                warn!("Could not establish a session for {}: {}", identity.uid, e);
                self.clear_credential();
                self.state.send_replace(Session::signed_out());
                Err(e)
            }
        }
    }

    /// Forces a credential renewal. Failures are logged and the current
    /// session is left as it was.
    async fn refresh_credential(&self) {
        if !self.state.borrow().is_authenticated() {
            return;
        }

        let token = match self.provider.get_token(true).await {
            Ok(token) => token,
            Err(e) => {
                warn!("Token refresh failed, keeping the current session: {}", e);
                return;
            }
        };

        let _guard = self.transition.lock().await;
        let renewed = self.state.send_if_modified(|session| {
            match session.with_credential(token.clone()) {
                Some(next) => {
                    *session = next;
                    true
                }
                None => false,
            }
        });
        if renewed {
            self.persist_credential(&token);
            info!("Credential refreshed");
        }
    }

    fn persist_credential(&self, token: &BearerToken) {
        if let Err(e) = self.credentials.store(token.as_str()) {
            warn!("Failed to persist credential: {}", e);
        }
    }

    fn clear_credential(&self) {
        if let Err(e) = self.credentials.clear() {
            warn!("Failed to clear persisted credential: {}", e);
        }
    }
}

//=========================================================================================
// SessionManager
//=========================================================================================

pub struct SessionManager {
    inner: Arc<Inner>,
    refresh_interval: Duration,
    shutdown: CancellationToken,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

impl SessionManager {
    /// Creates a manager in the initial `loading` state. Nothing runs until `start`.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        credentials: Arc<dyn CredentialStore>,
        refresh_interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(Session::starting());
        Self {
            inner: Arc::new(Inner { provider, credentials, state, transition: Mutex::new(()) }),
            refresh_interval,
            shutdown: CancellationToken::new(),
            tasks: StdMutex::new(Vec::new()),
        }
    }

    /// Subscribes to the identity provider and starts the refresh timer.
    /// The manager holds exactly one subscription; later calls do nothing.
    pub fn start(&self) {
        let Ok(mut tasks) = self.tasks.lock() else {
            warn!("Session task list poisoned; not starting");
            return;
        };
        if !tasks.is_empty() {
            return;
        }

        // --- 1. Identity provider subscription ---
        let mut changes = self.inner.provider.subscribe_to_auth_changes();
        let inner = self.inner.clone();
        let token = self.shutdown.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    next = changes.next() => match next {
                        // Failures are logged and published as signed-out.
                        Some(user) => {
                            let _ = inner.apply_auth_change(user).await;
                        }
                        None => break,
                    },
                }
            }
        }));

        // --- 2. Fixed-interval credential refresh ---
        let inner = self.inner.clone();
        let token = self.shutdown.clone();
        let period = self.refresh_interval;
        tasks.push(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => inner.refresh_credential().await,
                }
            }
        }));

        info!("Session manager started (refresh every {}s)", period.as_secs());
    }

    /// Cancels the subscription and the refresh timer and waits for both to stop.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handles: Vec<_> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    // --- Published state ---

    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// A receiver that observes every published session.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    pub fn credential(&self) -> Option<BearerToken> {
        self.inner.state.borrow().credential().cloned()
    }

    /// Resolves once the first provider notification has been handled.
    /// Requires `start` to have been called.
    pub async fn wait_until_ready(&self) -> Session {
        let mut receiver = self.inner.state.subscribe();
        // Clone out of the watch guard so no borrow of `receiver` outlives it.
        let ready = receiver.wait_for(|session| !session.is_loading()).await.map(|s| s.clone());
        ready.unwrap_or_else(|_| self.session())
    }

    // --- Operations ---

    /// Signs in. On success the session is already signed in when this returns;
    /// a credential that cannot be fetched or persisted fails the sign-in.
    pub async fn sign_in(&self, email: &str, password: &str) -> PortResult<()> {
        let identity = self.inner.provider.sign_in_with_password(email, password).await?;
        self.inner.apply_auth_change(Some(identity)).await
    }

    /// Creates an account and signs into it.
    pub async fn sign_up(&self, email: &str, password: &str) -> PortResult<()> {
        let identity = self.inner.provider.sign_up_with_password(email, password).await?;
        self.inner.apply_auth_change(Some(identity)).await
    }

    /// Always succeeds locally: the session and the persisted credential are
    /// cleared even when the provider call fails.
    pub async fn sign_out(&self) {
        if let Err(e) = self.inner.provider.sign_out().await {
            warn!("Identity provider sign-out failed, clearing local session anyway: {}", e);
        }
        let _ = self.inner.apply_auth_change(None).await;
    }

    /// Runs one forced renewal immediately, as the refresh timer would.
    pub async fn refresh_now(&self) {
        self.inner.refresh_credential().await;
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
