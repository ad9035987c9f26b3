//! Workspace events published to rendering layers.
//!
//! The workspace never calls into UI code: it broadcasts
//! [`WorkspaceEvent`]s on a [`tokio::sync::broadcast`] channel and lets
//! subscribers redraw, refill label tables, or surface failure
//! indicators as they see fit.

use serde::Serialize;
use uuid::Uuid;

use vlabel_core::types::FrameNumber;

/// Broadcast channel capacity for workspace events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Why a tracking session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingEndReason {
    /// The tracker reported completion at the final frame.
    Completed,
    /// The user issued an explicit stop.
    Stopped,
    /// The retry budget was exhausted or a restart was refused.
    Failed,
}

/// A state change the rendering layer may care about.
#[derive(Debug, Clone, Serialize)]
pub enum WorkspaceEvent {
    /// The displayed frame changed (navigation, playback, or tracking).
    FrameChanged { frame_number: FrameNumber },

    /// A frame entity arrived from the server.
    FrameEntityLoaded { frame_number: FrameNumber },

    /// A frame image finished loading and decoding.
    FrameImageLoaded { frame_number: FrameNumber },

    /// The currently displayed frame's data changed underneath the view.
    RedrawNeeded { frame_number: FrameNumber },

    /// Background frame loading failed permanently.
    LoadFailed { detail: String },

    /// A box or include-flag save failed; the edit remains local only.
    SaveFailed {
        frame_number: FrameNumber,
        detail: String,
    },

    /// Playback reached a boundary frame or was paused.
    PlaybackStopped,

    /// A tracking session was accepted by the server.
    TrackingStarted { tracker_uuid: Uuid },

    /// The tracker supplied boxes for a frame.
    TrackingFrameApplied { frame_number: FrameNumber },

    /// The tracker died; a restart will be attempted.
    TrackerFailed,

    /// The tracking session is over; the workspace is browsing again.
    TrackingEnded { reason: TrackingEndReason },
}
