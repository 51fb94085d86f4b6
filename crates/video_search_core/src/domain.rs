//! crates/video_search_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! Wire formats of the remote API live with the adapters; these types are the
//! client's own naming and serialize in camelCase for display and export.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Provider-defined lifetime of a bearer credential.
pub const TOKEN_LIFETIME: std::time::Duration = std::time::Duration::from_secs(60 * 60);

/// Fixed interval of the background credential refresh. Must stay below `TOKEN_LIFETIME`.
pub const TOKEN_REFRESH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(50 * 60);

//=========================================================================================
// Identity and Credentials
//=========================================================================================

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub uid: String,
    pub email: Option<String>,
}

/// An opaque, time-limited credential presented to the API as `Authorization: Bearer`.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into(), expires_at: None }
    }

    pub fn with_expiry(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { secret: secret.into(), expires_at: Some(expires_at) }
    }

    pub fn as_str(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// True when the token is already expired or will be within `margin`.
    /// Tokens without a known expiry never report as expiring.
    pub fn expires_within(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + margin >= expires_at,
            None => false,
        }
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

//=========================================================================================
// Session
//=========================================================================================

/// An identity together with the credential issued for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub identity: UserIdentity,
    pub credential: BearerToken,
}

/// The client's view of authentication.
///
/// Identity and credential live in one optional pair so that one can never be
/// present without the other. `loading` stays true until the identity provider
/// has reported at least once; while loading, authorization is unknown rather
/// than denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    signed_in: Option<SignedIn>,
    loading: bool,
}

impl Session {
    /// The state at application start.
    pub fn starting() -> Self {
        Self { signed_in: None, loading: true }
    }

    pub fn signed_out() -> Self {
        Self { signed_in: None, loading: false }
    }

    pub fn signed_in(identity: UserIdentity, credential: BearerToken) -> Self {
        Self { signed_in: Some(SignedIn { identity, credential }), loading: false }
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.signed_in.as_ref().map(|s| &s.identity)
    }

    pub fn credential(&self) -> Option<&BearerToken> {
        self.signed_in.as_ref().map(|s| &s.credential)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.signed_in.is_some()
    }

    /// Swaps in a renewed credential. Returns `None` when nobody is signed in.
    pub fn with_credential(&self, credential: BearerToken) -> Option<Self> {
        self.signed_in.as_ref().map(|s| Self::signed_in(s.identity.clone(), credential))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::starting()
    }
}

//=========================================================================================
// Videos
//=========================================================================================

/// Server-assigned video identifier. The API sends integers; the client keeps
/// the textual form so ids can be used in paths without conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for VideoId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for VideoId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for VideoId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => VideoId::from(n),
            Raw::Text(s) => VideoId::from(s),
        })
    }
}

/// Processing progress of an uploaded video. Owned by the remote indexing
/// service and only ever read by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexingStatus {
    Pending,
    Indexing,
    Completed,
    Failed,
}

impl IndexingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexingStatus::Pending => "PENDING",
            IndexingStatus::Indexing => "INDEXING",
            IndexingStatus::Completed => "COMPLETED",
            IndexingStatus::Failed => "FAILED",
        }
    }

    /// Only fully indexed videos accept in-video search.
    pub fn is_searchable(&self) -> bool {
        matches!(self, IndexingStatus::Completed)
    }
}

impl fmt::Display for IndexingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A video in the user's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: VideoId,
    pub title: String,
    pub thumbnail_ref: Option<String>,
    pub duration: Option<f64>,
    pub indexing_status: IndexingStatus,
    pub created_at: String,
    /// Object-store location; the server's `minio_path`. Exported as `storagePath`.
    pub storage_path: String,
}

/// The server's acknowledgement of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedVideo {
    pub video_id: VideoId,
    pub message: Option<String>,
}

/// One timestamped match returned by semantic search.
///
/// Ordering is decided by the server (descending similarity) and is never
/// re-sorted on the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub video_id: VideoId,
    pub timestamp_seconds: f64,
    pub similarity_score: f64,
    pub title: Option<String>,
    pub frame_number: Option<u64>,
}

/// Result of the server-side credential check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCheck {
    pub user_id: String,
    pub message: String,
}
