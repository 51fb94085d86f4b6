//! services/video_search/src/adapters/rest_gateway.rs
//!
//! This module contains the REST adapter, the concrete implementation of the
//! `VideoGateway` port. Every call attaches the persisted bearer credential,
//! maps the server's snake_case payloads onto domain types, and turns any
//! non-2xx reply into `PortError::Http` carrying the status and body text.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use video_search_core::domain::{
    AuthCheck, IndexingStatus, SearchHit, UploadedVideo, VideoId, VideoRecord,
};
use video_search_core::ports::{CredentialStore, PortError, PortResult, VideoGateway};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `VideoGateway` port over the backend's REST API.
#[derive(Clone)]
pub struct RestGatewayAdapter {
    http: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialStore>,
}

impl RestGatewayAdapter {
    /// Creates a new `RestGatewayAdapter` rooted at `base_url`.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: Arc<dyn CredentialStore>,
    ) -> PortResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| PortError::Unexpected(format!("Invalid API base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(PortError::Unexpected(format!("{} cannot be used as an API base URL", base_url)));
        }

        Ok(Self { http, base_url, credentials })
    }

    /// Appends `segments` to the base URL, percent-encoding each one so an id
    /// can never reach a different endpoint.
    fn url(&self, segments: &[&str]) -> PortResult<Url> {
        if let Some(bad) = segments.iter().find(|s| s.is_empty() || **s == "." || **s == "..") {
            return Err(PortError::Unexpected(format!("Invalid path segment '{}'", bad)));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PortError::Unexpected(format!("{} cannot be used as an API base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Reads the persisted credential. Fails before any request is built.
    fn bearer(&self) -> PortResult<String> {
        self.credentials.load()?.ok_or(PortError::Unauthenticated)
    }

    async fn send(&self, request: RequestBuilder) -> PortResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Request failed: {}", e)))?;

        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url().path());
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable response body: {}>", e));
        Err(PortError::Http { status: status.as_u16(), body })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> PortResult<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed response body: {}", e)))
    }
}

//=========================================================================================
// "Impure" Wire Structs
//=========================================================================================

#[derive(Deserialize)]
struct VideoPayload {
    id: VideoId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    indexing_status: IndexingStatus,
    created_at: String,
    minio_path: String,
}
impl VideoPayload {
    fn to_domain(self) -> VideoRecord {
        VideoRecord {
            id: self.id,
            title: self.title,
            thumbnail_ref: self.thumbnail,
            duration: self.duration,
            indexing_status: self.indexing_status,
            created_at: self.created_at,
            storage_path: self.minio_path,
        }
    }
}

#[derive(Deserialize)]
struct UploadPayload {
    video_id: VideoId,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: u32,
}

#[derive(Deserialize)]
struct GlobalHitPayload {
    video_id: VideoId,
    #[serde(default)]
    title: Option<String>,
    similarity: f64,
    timestamp: f64,
    #[serde(default)]
    frame_number: Option<u64>,
}
impl GlobalHitPayload {
    fn to_domain(self) -> SearchHit {
        SearchHit {
            video_id: self.video_id,
            timestamp_seconds: self.timestamp,
            similarity_score: self.similarity,
            title: self.title,
            frame_number: self.frame_number,
        }
    }
}

/// In-video hits omit the video id and title; the caller supplies the id.
#[derive(Deserialize)]
struct InVideoHitPayload {
    similarity: f64,
    timestamp: f64,
    #[serde(default)]
    frame_number: Option<u64>,
}
impl InVideoHitPayload {
    fn to_domain(self, video_id: &VideoId) -> SearchHit {
        SearchHit {
            video_id: video_id.clone(),
            timestamp_seconds: self.timestamp,
            similarity_score: self.similarity,
            title: None,
            frame_number: self.frame_number,
        }
    }
}

#[derive(Deserialize)]
struct StreamPayload {
    stream_url: String,
}

#[derive(Deserialize)]
struct AuthCheckPayload {
    user_id: String,
    #[serde(default)]
    message: String,
}

/// The backend only accepts parts with a `video/*` content type.
pub fn video_content_type(file_name: &str) -> &'static str {
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mpeg") | Some("mpg") => "video/mpeg",
        Some("ogv") => "video/ogg",
        _ => "video/mp4",
    }
}

//=========================================================================================
// `VideoGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl VideoGateway for RestGatewayAdapter {
    async fn list_videos(&self) -> PortResult<Vec<VideoRecord>> {
        let token = self.bearer()?;
        let videos: Vec<VideoPayload> =
            self.send_json(self.http.get(self.url(&["api", "videos"])?).bearer_auth(token)).await?;
        Ok(videos.into_iter().map(VideoPayload::to_domain).collect())
    }

    async fn get_video(&self, id: &VideoId) -> PortResult<VideoRecord> {
        let token = self.bearer()?;
        let video: VideoPayload = self
            .send_json(self.http.get(self.url(&["api", "videos", id.as_str()])?).bearer_auth(token))
            .await?;
        Ok(video.to_domain())
    }

    /// Sends the file as multipart. No content-type header is set on the
    /// request itself so the transport can generate the boundary.
    async fn upload_video(
        &self,
        file_name: &str,
        data: Bytes,
        title: &str,
    ) -> PortResult<UploadedVideo> {
        let token = self.bearer()?;

        let file_part = multipart::Part::bytes(data.to_vec())
            .file_name(file_name.to_string())
            .mime_str(video_content_type(file_name))
            .map_err(|e| PortError::Unexpected(format!("Invalid upload content type: {}", e)))?;
        let form = multipart::Form::new().part("file", file_part).text("title", title.to_string());

        let uploaded: UploadPayload = self
            .send_json(
                self.http.post(self.url(&["api", "videos", "upload"])?).bearer_auth(token).multipart(form),
            )
            .await?;
        Ok(UploadedVideo { video_id: uploaded.video_id, message: uploaded.message })
    }

    async fn delete_video(&self, id: &VideoId) -> PortResult<()> {
        let token = self.bearer()?;
        self.send(self.http.delete(self.url(&["api", "videos", id.as_str()])?).bearer_auth(token))
            .await?;
        Ok(())
    }

    async fn global_search(&self, query: &str, limit: u32) -> PortResult<Vec<SearchHit>> {
        let token = self.bearer()?;
        let hits: Vec<GlobalHitPayload> = self
            .send_json(
                self.http
                    .post(self.url(&["api", "search", "global"])?)
                    .bearer_auth(token)
                    .json(&SearchRequest { query, limit }),
            )
            .await?;
        Ok(hits.into_iter().map(GlobalHitPayload::to_domain).collect())
    }

    async fn search_in_video(
        &self,
        id: &VideoId,
        query: &str,
        limit: u32,
    ) -> PortResult<Vec<SearchHit>> {
        let token = self.bearer()?;
        let hits: Vec<InVideoHitPayload> = self
            .send_json(
                self.http
                    .post(self.url(&["api", "search", "video", id.as_str()])?)
                    .bearer_auth(token)
                    .json(&SearchRequest { query, limit }),
            )
            .await?;
        Ok(hits.into_iter().map(|hit| hit.to_domain(id)).collect())
    }

    async fn get_stream_url(&self, id: &VideoId) -> PortResult<String> {
        let token = self.bearer()?;
        let stream: StreamPayload = self
            .send_json(
                self.http.get(self.url(&["api", "videos", id.as_str(), "stream"])?).bearer_auth(token),
            )
            .await?;
        Ok(stream.stream_url)
    }

    async fn health(&self) -> PortResult<serde_json::Value> {
        self.send_json(self.http.get(self.url(&["health"])?)).await
    }

    async fn verify_auth(&self) -> PortResult<AuthCheck> {
        let token = self.bearer()?;
        let check: AuthCheckPayload =
            self.send_json(self.http.get(self.url(&["api", "auth", "test"])?).bearer_auth(token)).await?;
        Ok(AuthCheck { user_id: check.user_id, message: check.message })
    }
}
