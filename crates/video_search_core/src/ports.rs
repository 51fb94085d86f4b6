//! crates/video_search_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client depends on.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! session and library logic independent of the identity provider, the REST
//! transport and the local credential storage.

use crate::domain::{
    AuthCheck, BearerToken, SearchHit, UploadedVideo, UserIdentity, VideoId, VideoRecord,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// No stored credential; raised before any network call is attempted.
    #[error("Not signed in")]
    Unauthenticated,
    /// The identity provider refused the supplied credentials or sign-up request.
    #[error("Authentication failed: {0}")]
    AuthRejected(String),
    /// The remote API answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The HTTP status carried by the failure, if it came from the remote API.
    pub fn status(&self) -> Option<u16> {
        match self {
            PortError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound(_) | PortError::Http { status: 404, .. })
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Push notifications of the signed-in user; `None` means signed out.
pub type AuthChangeStream = Pin<Box<dyn Stream<Item = Option<UserIdentity>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> PortResult<UserIdentity>;

    async fn sign_up_with_password(&self, email: &str, password: &str)
        -> PortResult<UserIdentity>;

    async fn sign_out(&self) -> PortResult<()>;

    /// Yields the current user right away, then once per change.
    /// Dropping the stream unsubscribes.
    fn subscribe_to_auth_changes(&self) -> AuthChangeStream;

    /// Returns a bearer token for the current user, renewing it first when
    /// `force_refresh` is set or the cached one is about to expire.
    async fn get_token(&self, force_refresh: bool) -> PortResult<BearerToken>;
}

/// The single persisted entry holding the current bearer credential.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> PortResult<Option<String>>;

    fn store(&self, token: &str) -> PortResult<()>;

    /// Removing an absent entry succeeds.
    fn clear(&self) -> PortResult<()>;
}

#[async_trait]
pub trait VideoGateway: Send + Sync {
    // --- Library ---
    async fn list_videos(&self) -> PortResult<Vec<VideoRecord>>;

    async fn get_video(&self, id: &VideoId) -> PortResult<VideoRecord>;

    async fn upload_video(
        &self,
        file_name: &str,
        data: Bytes,
        title: &str,
    ) -> PortResult<UploadedVideo>;

    async fn delete_video(&self, id: &VideoId) -> PortResult<()>;

    // --- Search ---
    async fn global_search(&self, query: &str, limit: u32) -> PortResult<Vec<SearchHit>>;

    async fn search_in_video(
        &self,
        id: &VideoId,
        query: &str,
        limit: u32,
    ) -> PortResult<Vec<SearchHit>>;

    // --- Playback and Diagnostics ---
    async fn get_stream_url(&self, id: &VideoId) -> PortResult<String>;

    async fn health(&self) -> PortResult<serde_json::Value>;

    async fn verify_auth(&self) -> PortResult<AuthCheck>;
}
