//! Workspace tunables.

use std::time::Duration;

use vlabel_client::retry::RetryConfig;

/// Per-frame box limit.
pub const MAX_BOXES_PER_FRAME: usize = 50;

/// Tunable parameters for loading, navigation, playback, and tracking.
///
/// The defaults are the production values; tests substitute
/// millisecond-scale delays.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Name of the tracker implementation to request from the server.
    pub tracker_name: String,
    /// Display scale forwarded to the tracker at session start.
    pub tracking_scale: f64,

    /// Frames per paged entity fetch.
    pub page_size: u32,
    /// Delay between successive page-fetch spawns, so a long video does
    /// not saturate the network with simultaneous requests.
    pub page_stagger: Duration,
    /// Backoff for page fetches.
    pub page_retry: RetryConfig,
    /// Backoff for per-frame image fetches.
    pub image_retry: RetryConfig,

    /// Poll interval while waiting for a navigated-to frame to load.
    pub nav_retry_interval: Duration,
    /// Polls before giving up on a navigation.
    pub nav_retry_max: u32,

    /// Backoff for tracking requests (transport errors only; "not ready"
    /// responses use `not_ready_delay` and no budget).
    pub tracking_retry: RetryConfig,
    /// Re-poll delay after a "not ready yet" tracking response.
    pub not_ready_delay: Duration,
    /// Delay before auto-restarting a dead tracker.
    pub restart_delay: Duration,
    /// Keep-alive cadence while a tracking session is otherwise quiet.
    pub heartbeat_interval: Duration,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            tracker_name: "default".to_string(),
            tracking_scale: 1.0,
            page_size: 100,
            page_stagger: Duration::from_millis(25),
            page_retry: RetryConfig::default(),
            image_retry: RetryConfig::default(),
            nav_retry_interval: Duration::from_secs(1),
            nav_retry_max: 20,
            tracking_retry: RetryConfig::default(),
            not_ready_delay: Duration::from_millis(100),
            restart_delay: Duration::from_secs(2),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}
