//! services/video_search/src/adapters/firebase_identity.rs
//!
//! This module contains the adapter for the Firebase Authentication REST API.
//! It implements the `IdentityProvider` port from the `core` crate: password
//! sign-in and sign-up, ID token renewal through the secure token endpoint, and
//! push notification of sign-in state through a watch channel.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use video_search_core::domain::{BearerToken, UserIdentity, TOKEN_LIFETIME};
use video_search_core::ports::{AuthChangeStream, IdentityProvider, PortError, PortResult};

/// Cached tokens this close to expiry are renewed before being handed out.
const EXPIRY_MARGIN_SECS: i64 = 5 * 60;

//=========================================================================================
// Account State
//=========================================================================================

struct Account {
    identity: UserIdentity,
    refresh_token: String,
    id_token: Option<BearerToken>,
}

/// The on-disk form of a signed-in account. The short-lived ID token is not
/// written; it is renewed from the refresh token on first use.
#[derive(Serialize, Deserialize)]
struct PersistedAccount {
    uid: String,
    email: Option<String>,
    refresh_token: String,
}

//=========================================================================================
// Wire Structs
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct ProviderErrorEnvelope {
    error: ProviderErrorBody,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    message: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `IdentityProvider` port against Firebase Auth.
pub struct FirebaseIdentityAdapter {
    http: Client,
    api_key: String,
    identity_url: String,
    token_url: String,
    account: Mutex<Option<Account>>,
    changes: watch::Sender<Option<UserIdentity>>,
    persistence: Option<PathBuf>,
}

impl FirebaseIdentityAdapter {
    /// Creates a new adapter with no signed-in account.
    pub fn new(
        api_key: &str,
        identity_url: &str,
        token_url: &str,
        timeout: Duration,
    ) -> PortResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(format!("Failed to create HTTP client: {}", e)))?;
        let (changes, _) = watch::channel(None);

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            identity_url: identity_url.trim_end_matches('/').to_string(),
            token_url: token_url.trim_end_matches('/').to_string(),
            account: Mutex::new(None),
            changes,
            persistence: None,
        })
    }

    /// Keeps the signed-in account in `path` across processes, restoring one
    /// that is already there.
    pub fn with_persistence(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match load_account(&path) {
            Ok(Some(saved)) => {
                info!("Restored signed-in account {}", saved.uid);
                let identity = UserIdentity { uid: saved.uid, email: saved.email };
                self.changes.send_replace(Some(identity.clone()));
                self.account = Mutex::new(Some(Account {
                    identity,
                    refresh_token: saved.refresh_token,
                    id_token: None,
                }));
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable account file {}: {}", path.display(), e),
        }
        self.persistence = Some(path);
        self
    }

    async fn password_call(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> PortResult<UserIdentity> {
        let url = format!("{}/accounts:{}", self.identity_url, endpoint);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest { email, password, return_secure_token: true })
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Identity provider unreachable: {}", e)))?;

        let reply: PasswordResponse = parse_reply(response).await?;
        let identity = UserIdentity {
            uid: reply.local_id,
            email: reply.email.or_else(|| Some(email.to_string())),
        };
        let account = Account {
            identity: identity.clone(),
            refresh_token: reply.refresh_token,
            id_token: Some(issue_token(reply.id_token, reply.expires_in.as_deref())),
        };

        self.persist(Some(&account));
        *self.account.lock().await = Some(account);
        self.changes.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn refresh(&self, account: &mut Account) -> PortResult<BearerToken> {
        let url = format!("{}/token", self.token_url);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", account.refresh_token.as_str())])
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Identity provider unreachable: {}", e)))?;

        let reply: RefreshResponse = parse_reply(response).await?;
        let token = issue_token(reply.id_token, reply.expires_in.as_deref());
        account.refresh_token = reply.refresh_token;
        account.id_token = Some(token.clone());
        self.persist(Some(account));
        debug!("Renewed ID token for {}", account.identity.uid);
        Ok(token)
    }

    /// Writes or removes the persisted account. Failures are logged only; the
    /// in-process session stays valid either way.
    fn persist(&self, account: Option<&Account>) {
        let Some(path) = &self.persistence else {
            return;
        };
        let result = match account {
            Some(account) => save_account(
                path,
                &PersistedAccount {
                    uid: account.identity.uid.clone(),
                    email: account.identity.email.clone(),
                    refresh_token: account.refresh_token.clone(),
                },
            ),
            None => match fs::remove_file(path) {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            },
        };
        if let Err(e) = result {
            warn!("Failed to update account file {}: {}", path.display(), e);
        }
    }
}

//=========================================================================================
// `IdentityProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for FirebaseIdentityAdapter {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> PortResult<UserIdentity> {
        let identity = self.password_call("signInWithPassword", email, password).await?;
        info!("Signed in as {}", identity.uid);
        Ok(identity)
    }

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> PortResult<UserIdentity> {
        let identity = self.password_call("signUp", email, password).await?;
        info!("Created account {}", identity.uid);
        Ok(identity)
    }

    /// Firebase sign-out is purely local: forget the tokens and notify.
    async fn sign_out(&self) -> PortResult<()> {
        let previous = self.account.lock().await.take();
        self.persist(None);
        self.changes.send_replace(None);
        if let Some(account) = previous {
            info!("Signed out {}", account.identity.uid);
        }
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
        let mut guard = self.account.lock().await;
        let account = guard.as_mut().ok_or(PortError::Unauthenticated)?;

        if !force_refresh {
            if let Some(token) = &account.id_token {
                if !token.expires_within(ChronoDuration::seconds(EXPIRY_MARGIN_SECS)) {
                    return Ok(token.clone());
                }
            }
        }

        match self.refresh(account).await {
            // A rejected refresh token cannot recover: forget the account.
            Err(PortError::AuthRejected(reason)) => {
                warn!("Refresh token rejected, signing out {}: {}", account.identity.uid, reason);
                *guard = None;
                self.persist(None);
                self.changes.send_replace(None);
                Err(PortError::AuthRejected(reason))
            }
            other => other,
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn issue_token(secret: String, expires_in: Option<&str>) -> BearerToken {
    let lifetime = expires_in
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(TOKEN_LIFETIME.as_secs() as i64);
    BearerToken::with_expiry(secret, Utc::now() + ChronoDuration::seconds(lifetime))
}

/// Decodes a success body, or maps the provider's `{error: {message}}` reply.
async fn parse_reply<T: serde::de::DeserializeOwned>(response: Response) -> PortResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| PortError::Unexpected(format!("Failed to read provider reply: {}", e)))?;

    if status.is_success() {
        return serde_json::from_str(&body)
            .map_err(|e| PortError::Unexpected(format!("Malformed provider reply: {}", e)));
    }

    match serde_json::from_str::<ProviderErrorEnvelope>(&body) {
        Ok(envelope) if status.is_client_error() => {
            Err(PortError::AuthRejected(describe_provider_error(&envelope.error.message)))
        }
        _ => Err(PortError::Http { status: status.as_u16(), body }),
    }
}

/// Turns a provider error code into a message fit for display.
pub fn describe_provider_error(code: &str) -> String {
    let code = code.trim();
    let message = match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Invalid email or password"
        }
        "USER_DISABLED" => "This account has been disabled",
        "EMAIL_EXISTS" => "An account with this email already exists",
        "INVALID_EMAIL" => "The email address is badly formatted",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts, try again later",
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
            "Your session has expired, please sign in again"
        }
        c if c.starts_with("WEAK_PASSWORD") => "Password should be at least 6 characters",
        other => return other.to_string(),
    };
    message.to_string()
}

fn load_account(path: &Path) -> std::io::Result<Option<PersistedAccount>> {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn save_account(path: &Path, account: &PersistedAccount) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(account)
        .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
    fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
