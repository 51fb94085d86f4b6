//! services/video_search/src/library.rs
//!
//! The caller-side view of the video library: the list shown to the user,
//! the last load failure (so the view can offer a retry), and the local
//! bookkeeping that follows uploads and deletions.

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};
use video_search_core::domain::{IndexingStatus, UploadedVideo, VideoId, VideoRecord};
use video_search_core::ports::{PortResult, VideoGateway};

#[derive(Debug, Default)]
pub struct VideoLibrary {
    videos: Vec<VideoRecord>,
    load_error: Option<String>,
}

impl VideoLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn videos(&self) -> &[VideoRecord] {
        &self.videos
    }

    /// A human-readable description of the last failed load, if any.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn find(&self, id: &VideoId) -> Option<&VideoRecord> {
        self.videos.iter().find(|v| &v.id == id)
    }

    /// Reloads the list from the server. On failure the previous list is kept
    /// and the error is recorded for display; calling again is the retry.
    pub async fn refresh(&mut self, gateway: &dyn VideoGateway) -> PortResult<()> {
        match gateway.list_videos().await {
            Ok(videos) => {
                info!("Loaded {} videos", videos.len());
                self.videos = videos;
                self.load_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load videos: {}", e);
                self.load_error = Some(format!("Failed to load videos: {}", e));
                Err(e)
            }
        }
    }

    /// Adds the entry for a video the server just accepted, ahead of the next
    /// reload. It starts out pending; the server owns every later status.
    pub fn record_upload(&mut self, uploaded: &UploadedVideo, title: &str) -> &VideoRecord {
        let record = VideoRecord {
            id: uploaded.video_id.clone(),
            title: title.to_string(),
            thumbnail_ref: None,
            duration: None,
            indexing_status: IndexingStatus::Pending,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            storage_path: format!("/videos/{}", uploaded.video_id),
        };
        self.videos.retain(|v| v.id != record.id);
        self.videos.insert(0, record);
        &self.videos[0]
    }

    /// Deletes on the server, then locally. A failed delete, including a 404
    /// for an id that is already gone, leaves the list untouched.
    pub async fn delete(&mut self, gateway: &dyn VideoGateway, id: &VideoId) -> PortResult<()> {
        gateway.delete_video(id).await?;
        self.videos.retain(|v| &v.id != id);
        info!("Deleted video {}", id);
        Ok(())
    }
}
