//! Backend API seam: wire types and the [`LabelApi`] trait.
//!
//! The workspace crate depends only on this trait, so scenario tests
//! drive the full editing and tracking state machines against a mock
//! with queued responses instead of a live backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vlabel_core::store::{VideoEntity, VideoFrameEntity};
use vlabel_core::types::FrameNumber;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the backend API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Response of a paged frame-entity fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePage {
    pub video_frame_entities: Vec<VideoFrameEntity>,
}

/// Outcome of a tracking-start request.
///
/// A rejection (e.g. the tracker is busy) is a normal response, not a
/// transport error: its message is shown to the user verbatim and the
/// attempt is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingStartOutcome {
    Started { tracker_uuid: Uuid },
    Rejected { message: String },
}

/// Raw poll/continue response body.  All fields are optional on the
/// wire; [`outcome`](Self::outcome) classifies the combination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingPollResponse {
    #[serde(default)]
    pub tracker_failed: Option<bool>,
    #[serde(default)]
    pub tracking_complete: Option<bool>,
    #[serde(default)]
    pub frame_number: Option<FrameNumber>,
    #[serde(default)]
    pub bboxes_text: Option<String>,
}

/// Classified poll/continue outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The tracker process died; the session should self-heal by
    /// restarting.
    Failed,
    /// The tracker finished the final frame; the session is over.
    Complete,
    /// Tracked boxes for the requested frame.
    Frame {
        frame_number: FrameNumber,
        bboxes_text: String,
    },
    /// The tracker has not produced this frame yet: re-poll shortly.
    /// Not a failure and never counted against the retry budget.
    NotReady,
}

impl TrackingPollResponse {
    /// Classify this response for the given requested frame.
    ///
    /// Order matters: a reported failure wins over everything, then
    /// completion; a frame payload only counts when its number matches
    /// the request; anything else is "not ready yet".
    pub fn outcome(&self, requested_frame: FrameNumber) -> PollOutcome {
        if self.tracker_failed == Some(true) {
            return PollOutcome::Failed;
        }
        if self.tracking_complete == Some(true) {
            return PollOutcome::Complete;
        }
        if let (Some(frame_number), Some(bboxes_text)) = (self.frame_number, &self.bboxes_text) {
            if frame_number == requested_frame {
                return PollOutcome::Frame {
                    frame_number,
                    bboxes_text: bboxes_text.clone(),
                };
            }
        }
        PollOutcome::NotReady
    }
}

// ---------------------------------------------------------------------------
// LabelApi
// ---------------------------------------------------------------------------

/// Every backend interface the labeling workspace consumes.
#[async_trait]
pub trait LabelApi: Send + Sync {
    /// Fetch (or re-fetch) the video record.  Also the authoritative
    /// source of the `tracking_in_progress` flag.
    async fn fetch_video(&self, video_uuid: Uuid) -> Result<VideoEntity, ApiError>;

    /// Fetch frame entities for `[min_frame, max_frame)`.
    async fn fetch_frames(
        &self,
        video_uuid: Uuid,
        min_frame: FrameNumber,
        max_frame: FrameNumber,
    ) -> Result<FramePage, ApiError>;

    /// Persist a frame's serialized box list.
    async fn save_bboxes(
        &self,
        video_uuid: Uuid,
        frame_number: FrameNumber,
        bboxes_text: &str,
    ) -> Result<(), ApiError>;

    /// Persist a frame's include-in-dataset flag.
    async fn save_include_flag(
        &self,
        video_uuid: Uuid,
        frame_number: FrameNumber,
        include: bool,
    ) -> Result<(), ApiError>;

    /// Fetch a frame image from a direct (e.g. signed storage) URL.
    async fn fetch_image_direct(&self, url: &str) -> Result<Vec<u8>, ApiError>;

    /// Fetch a frame image from the same-origin fallback endpoint.
    async fn fetch_image(
        &self,
        video_uuid: Uuid,
        frame_number: FrameNumber,
    ) -> Result<Vec<u8>, ApiError>;

    /// Start a tracking session from the given frame and box list.
    async fn tracking_start(
        &self,
        video_uuid: Uuid,
        init_frame_number: FrameNumber,
        init_bboxes_text: &str,
        tracker_name: &str,
        scale: f64,
    ) -> Result<TrackingStartOutcome, ApiError>;

    /// Request tracked boxes for a frame.
    async fn tracking_poll(
        &self,
        video_uuid: Uuid,
        tracker_uuid: Uuid,
        retrieve_frame_number: FrameNumber,
    ) -> Result<TrackingPollResponse, ApiError>;

    /// Push the just-edited current frame upstream and request the next.
    async fn tracking_continue(
        &self,
        video_uuid: Uuid,
        tracker_uuid: Uuid,
        retrieve_frame_number: FrameNumber,
        frame_number: FrameNumber,
        bboxes_text: &str,
    ) -> Result<TrackingPollResponse, ApiError>;

    /// Keep the server-side tracking session alive during long pauses.
    async fn tracking_heartbeat(
        &self,
        video_uuid: Uuid,
        tracker_uuid: Uuid,
    ) -> Result<(), ApiError>;

    /// Stop the tracking session.
    async fn tracking_stop(&self, video_uuid: Uuid, tracker_uuid: Uuid) -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
