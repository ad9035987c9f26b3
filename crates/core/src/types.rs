/// Frame numbers are zero-based indices into the extracted frame sequence.
pub type FrameNumber = u32;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
