//! Camera capture
//!
//! The platform opens video streams through [`MediaDevices`] and renders
//! them into a [`VideoSink`]. [`CameraManager`] owns at most one capture
//! session at a time.

mod manager;

use async_trait::async_trait;
use thiserror::Error;

pub use manager::CameraManager;

/// Why the camera could not be started
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// No media devices capability on this platform
    #[error("camera capture is not supported")]
    Unsupported,

    /// The user or platform refused camera access
    #[error("camera permission denied")]
    PermissionDenied,

    /// The device is held by another application
    #[error("camera is busy")]
    Busy,

    /// Nowhere to render the stream
    #[error("no video surface to render into")]
    NoSink,

    /// The sink refused to start playback
    #[error("video playback failed: {0}")]
    Playback(String),

    /// A stop or a newer start arrived before this start finished
    #[error("camera start was cancelled")]
    Cancelled,

    #[error("camera error: {0}")]
    Other(String),
}

/// One track of a media stream
pub trait MediaTrack: Send + Sync {
    fn id(&self) -> &str;

    /// Release the underlying device; must be idempotent
    fn stop(&self);
}

/// Handle to an open video stream and its tracks
pub struct MediaStream {
    id: String,
    tracks: Vec<Box<dyn MediaTrack>>,
}

impl MediaStream {
    #[must_use]
    pub fn new(id: impl Into<String>, tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn tracks(&self) -> &[Box<dyn MediaTrack>] {
        &self.tracks
    }

    /// Stop every track
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("tracks", &self.tracks.iter().map(|t| t.id()).collect::<Vec<_>>())
            .finish()
    }
}

/// Platform capability for opening video devices
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request a video-only stream
    async fn open_video(&self) -> Result<MediaStream, CameraError>;
}

/// Display surface for a live stream
#[async_trait]
pub trait VideoSink: Send + Sync {
    /// Bind the stream as the sink's source
    fn attach(&self, stream: &MediaStream);

    /// Start rendering the attached stream
    async fn play(&self) -> Result<(), CameraError>;
}
