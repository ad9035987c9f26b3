use crate::types::FrameNumber;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Frame {frame} is out of range (frame count {frame_count})")]
    FrameOutOfRange {
        frame: FrameNumber,
        frame_count: u32,
    },

    #[error("Frame {0} is not loaded")]
    FrameNotLoaded(FrameNumber),
}
