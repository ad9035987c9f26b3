use vlabel_client::api::ApiError;
use vlabel_core::error::CoreError;
use vlabel_core::types::FrameNumber;

/// Errors surfaced to the caller of workspace operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The requested operation is disabled in the current mode (or by
    /// the missing-label gate).
    #[error("Operation not allowed: {0}")]
    NotAllowed(String),

    /// Navigation gave up waiting for a frame entity to load.
    #[error("Frame {frame} did not load after {polls} polls")]
    FrameLoadTimeout { frame: FrameNumber, polls: u32 },

    /// The server reports another tracking session is already active.
    #[error("Tracking is already in progress for this video")]
    TrackingBusy,

    /// The server rejected the tracking-start request; the message is
    /// shown to the user verbatim.
    #[error("Tracking start rejected: {0}")]
    TrackingRejected(String),

    /// No tracking session is active.
    #[error("No tracking session is active")]
    NotTracking,
}
