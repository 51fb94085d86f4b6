#![allow(dead_code)]

use async_trait::async_trait;
use axum::{extract::Request, http::header::AUTHORIZATION, middleware::Next, Router};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use video_search_core::domain::{BearerToken, UserIdentity};
use video_search_core::ports::{AuthChangeStream, IdentityProvider, PortError, PortResult};

//=========================================================================================
// In-process HTTP backend
//=========================================================================================

/// Counts requests reaching a mock server and remembers their raw paths and
/// Authorization headers.
#[derive(Clone, Default)]
pub struct Recorder {
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
    auth_headers: Arc<Mutex<Vec<Option<String>>>>,
}

impl Recorder {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.auth_headers.lock().unwrap().clone()
    }

    /// Wraps `router` so every request is counted before it is handled.
    pub fn wrap(&self, router: Router) -> Router {
        let recorder = self.clone();
        router.layer(axum::middleware::from_fn(move |req: Request, next: Next| {
            let recorder = recorder.clone();
            async move {
                recorder.hits.fetch_add(1, Ordering::SeqCst);
                recorder.paths.lock().unwrap().push(req.uri().path().to_string());
                let auth = req
                    .headers()
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                recorder.auth_headers.lock().unwrap().push(auth);
                next.run(req).await
            }
        }))
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

//=========================================================================================
// Fake identity provider
//=========================================================================================

pub const VALID_PASSWORD: &str = "correct-horse";

pub fn identity() -> UserIdentity {
    UserIdentity { uid: "uid-1".to_string(), email: Some("ada@example.com".to_string()) }
}

/// A scriptable identity provider. Tokens are minted as `token-1`, `token-2`, …
/// and cached until a forced refresh, mirroring a real provider.
pub struct FakeProvider {
    changes: watch::Sender<Option<UserIdentity>>,
    current_token: Mutex<Option<String>>,
    minted: AtomicUsize,
    pub fail_token: AtomicBool,
    pub fail_refresh: AtomicBool,
    pub fail_sign_out: AtomicBool,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        let (changes, _) = watch::channel(None);
        Arc::new(Self {
            changes,
            current_token: Mutex::new(None),
            minted: AtomicUsize::new(0),
            fail_token: AtomicBool::new(false),
            fail_refresh: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
        })
    }

    /// Simulates the provider pushing a state change on its own.
    pub fn push(&self, user: Option<UserIdentity>) {
        if user.is_none() {
            *self.current_token.lock().unwrap() = None;
        }
        self.changes.send_replace(user);
    }

    pub fn minted(&self) -> usize {
        self.minted.load(Ordering::SeqCst)
    }

    fn mint(&self) -> BearerToken {
        let n = self.minted.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("token-{}", n);
        *self.current_token.lock().unwrap() = Some(token.clone());
        BearerToken::new(token)
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> PortResult<UserIdentity> {
        if password != VALID_PASSWORD {
            return Err(PortError::AuthRejected("Invalid email or password".to_string()));
        }
        let user = UserIdentity { uid: "uid-1".to_string(), email: Some(email.to_string()) };
        self.changes.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> PortResult<UserIdentity> {
        if password.len() < 6 {
            return Err(PortError::AuthRejected(
                "Password should be at least 6 characters".to_string(),
            ));
        }
        let user = UserIdentity { uid: "uid-new".to_string(), email: Some(email.to_string()) };
        self.changes.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> PortResult<()> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("provider unreachable".to_string()));
        }
        self.push(None);
        Ok(())
    }

    fn subscribe_to_auth_changes(&self) -> AuthChangeStream {
        let mut receiver = self.changes.subscribe();
        Box::pin(async_stream::stream! {
            let current = receiver.borrow_and_update().clone();
            yield current;
            while receiver.changed().await.is_ok() {
                let next = receiver.borrow_and_update().clone();
                yield next;
            }
        })
    }

    async fn get_token(&self, force_refresh: bool) -> PortResult<BearerToken> {
        if self.changes.borrow().is_none() {
            return Err(PortError::Unauthenticated);
        }
        if self.fail_token.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("token endpoint down".to_string()));
        }
        if force_refresh {
            if self.fail_refresh.load(Ordering::SeqCst) {
                return Err(PortError::Unexpected("refresh rejected".to_string()));
            }
            return Ok(self.mint());
        }
        let cached = self.current_token.lock().unwrap().clone();
        match cached {
            Some(token) => Ok(BearerToken::new(token)),
            None => Ok(self.mint()),
        }
    }
}
