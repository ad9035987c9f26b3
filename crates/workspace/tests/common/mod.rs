//! Shared test fixtures: an in-memory [`LabelApi`] with a call log and
//! scriptable tracking responses, plus millisecond-scale workspace
//! config so scenario tests finish quickly.

// Each test binary uses a different slice of the fixture surface.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use vlabel_client::api::{
    ApiError, FramePage, LabelApi, TrackingPollResponse, TrackingStartOutcome,
};
use vlabel_client::retry::RetryConfig;
use vlabel_core::store::{VideoEntity, VideoFrameEntity};
use vlabel_core::types::FrameNumber;
use vlabel_workspace::config::WorkspaceConfig;

// ---------------------------------------------------------------------------
// Call log
// ---------------------------------------------------------------------------

/// One recorded API call, for asserting on traffic (e.g. that an
/// unchanged save produces no network call at all).
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    FetchVideo,
    FetchFrames {
        min_frame: FrameNumber,
        max_frame: FrameNumber,
    },
    SaveBboxes {
        frame_number: FrameNumber,
        bboxes_text: String,
    },
    SaveIncludeFlag {
        frame_number: FrameNumber,
        include: bool,
    },
    FetchImage {
        frame_number: FrameNumber,
    },
    TrackingStart {
        init_frame_number: FrameNumber,
        init_bboxes_text: String,
    },
    TrackingPoll {
        retrieve_frame_number: FrameNumber,
    },
    TrackingContinue {
        retrieve_frame_number: FrameNumber,
        frame_number: FrameNumber,
        bboxes_text: String,
    },
    TrackingHeartbeat,
    TrackingStop,
}

// ---------------------------------------------------------------------------
// MockLabelApi
// ---------------------------------------------------------------------------

/// In-memory backend.  Frame entities are served from a map; tracking
/// responses pop from scripted queues (an empty queue answers
/// "not ready").
pub struct MockLabelApi {
    video: Mutex<VideoEntity>,
    frames: Mutex<HashMap<FrameNumber, VideoFrameEntity>>,
    /// Frames excluded from `fetch_frames` responses, to simulate
    /// navigation racing ahead of the load front.
    withheld: Mutex<HashSet<FrameNumber>>,
    /// When set, background page fetches (min_frame >= 1) fail with a
    /// 500 response.
    fail_background_pages: AtomicBool,
    calls: Mutex<Vec<ApiCall>>,
    start_script: Mutex<VecDeque<TrackingStartOutcome>>,
    poll_script: Mutex<VecDeque<TrackingPollResponse>>,
    image_bytes: Vec<u8>,
}

impl MockLabelApi {
    /// A video whose frames all start included and unlabeled.
    pub fn new(frame_count: u32) -> Arc<Self> {
        let video_uuid = Uuid::new_v4();
        let video = VideoEntity {
            uuid: video_uuid,
            width: 640,
            height: 480,
            frame_count,
            fps: 25.0,
            tracking_in_progress: false,
        };
        let frames = (0..frame_count)
            .map(|n| (n, frame_entity(video_uuid, n, "", true)))
            .collect();
        Arc::new(Self {
            video: Mutex::new(video),
            frames: Mutex::new(frames),
            withheld: Mutex::new(HashSet::new()),
            fail_background_pages: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            start_script: Mutex::new(VecDeque::new()),
            poll_script: Mutex::new(VecDeque::new()),
            image_bytes: one_pixel_png(),
        })
    }

    pub fn video_uuid(&self) -> Uuid {
        self.video.lock().unwrap().uuid
    }

    pub fn set_tracking_in_progress(&self, value: bool) {
        self.video.lock().unwrap().tracking_in_progress = value;
    }

    /// Replace a frame's server-side entity before the workspace opens.
    pub fn set_frame(&self, frame_number: FrameNumber, bboxes_text: &str, include: bool) {
        let video_uuid = self.video_uuid();
        self.frames.lock().unwrap().insert(
            frame_number,
            frame_entity(video_uuid, frame_number, bboxes_text, include),
        );
    }

    /// The entity currently stored for a frame.
    pub fn frame(&self, frame_number: FrameNumber) -> VideoFrameEntity {
        self.frames.lock().unwrap()[&frame_number].clone()
    }

    pub fn withhold_frame(&self, frame_number: FrameNumber) {
        self.withheld.lock().unwrap().insert(frame_number);
    }

    pub fn fail_background_pages(&self) {
        self.fail_background_pages.store(true, Ordering::SeqCst);
    }

    pub fn push_start_outcome(&self, outcome: TrackingStartOutcome) {
        self.start_script.lock().unwrap().push_back(outcome);
    }

    pub fn push_poll_response(&self, response: TrackingPollResponse) {
        self.poll_script.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, pred: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_poll_response(&self) -> TrackingPollResponse {
        self.poll_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default()
    }
}

#[async_trait]
impl LabelApi for MockLabelApi {
    async fn fetch_video(&self, _video_uuid: Uuid) -> Result<VideoEntity, ApiError> {
        self.record(ApiCall::FetchVideo);
        Ok(self.video.lock().unwrap().clone())
    }

    async fn fetch_frames(
        &self,
        _video_uuid: Uuid,
        min_frame: FrameNumber,
        max_frame: FrameNumber,
    ) -> Result<FramePage, ApiError> {
        self.record(ApiCall::FetchFrames {
            min_frame,
            max_frame,
        });
        if min_frame >= 1 && self.fail_background_pages.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 500,
                body: "backend unavailable".to_string(),
            });
        }
        let withheld = self.withheld.lock().unwrap().clone();
        let frames = self.frames.lock().unwrap();
        let mut video_frame_entities: Vec<VideoFrameEntity> = (min_frame..max_frame)
            .filter(|n| !withheld.contains(n))
            .filter_map(|n| frames.get(&n).cloned())
            .collect();
        video_frame_entities.sort_by_key(|e| e.frame_number);
        Ok(FramePage {
            video_frame_entities,
        })
    }

    async fn save_bboxes(
        &self,
        _video_uuid: Uuid,
        frame_number: FrameNumber,
        bboxes_text: &str,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::SaveBboxes {
            frame_number,
            bboxes_text: bboxes_text.to_string(),
        });
        if let Some(entity) = self.frames.lock().unwrap().get_mut(&frame_number) {
            entity.bboxes_text = bboxes_text.to_string();
        }
        Ok(())
    }

    async fn save_include_flag(
        &self,
        _video_uuid: Uuid,
        frame_number: FrameNumber,
        include: bool,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::SaveIncludeFlag {
            frame_number,
            include,
        });
        if let Some(entity) = self.frames.lock().unwrap().get_mut(&frame_number) {
            entity.include_frame_in_dataset = include;
        }
        Ok(())
    }

    async fn fetch_image_direct(&self, _url: &str) -> Result<Vec<u8>, ApiError> {
        Ok(self.image_bytes.clone())
    }

    async fn fetch_image(
        &self,
        _video_uuid: Uuid,
        frame_number: FrameNumber,
    ) -> Result<Vec<u8>, ApiError> {
        self.record(ApiCall::FetchImage { frame_number });
        Ok(self.image_bytes.clone())
    }

    async fn tracking_start(
        &self,
        _video_uuid: Uuid,
        init_frame_number: FrameNumber,
        init_bboxes_text: &str,
        _tracker_name: &str,
        _scale: f64,
    ) -> Result<TrackingStartOutcome, ApiError> {
        self.record(ApiCall::TrackingStart {
            init_frame_number,
            init_bboxes_text: init_bboxes_text.to_string(),
        });
        let scripted = self.start_script.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or(TrackingStartOutcome::Started {
            tracker_uuid: Uuid::new_v4(),
        }))
    }

    async fn tracking_poll(
        &self,
        _video_uuid: Uuid,
        _tracker_uuid: Uuid,
        retrieve_frame_number: FrameNumber,
    ) -> Result<TrackingPollResponse, ApiError> {
        self.record(ApiCall::TrackingPoll {
            retrieve_frame_number,
        });
        Ok(self.next_poll_response())
    }

    async fn tracking_continue(
        &self,
        _video_uuid: Uuid,
        _tracker_uuid: Uuid,
        retrieve_frame_number: FrameNumber,
        frame_number: FrameNumber,
        bboxes_text: &str,
    ) -> Result<TrackingPollResponse, ApiError> {
        self.record(ApiCall::TrackingContinue {
            retrieve_frame_number,
            frame_number,
            bboxes_text: bboxes_text.to_string(),
        });
        Ok(self.next_poll_response())
    }

    async fn tracking_heartbeat(
        &self,
        _video_uuid: Uuid,
        _tracker_uuid: Uuid,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::TrackingHeartbeat);
        Ok(())
    }

    async fn tracking_stop(&self, _video_uuid: Uuid, _tracker_uuid: Uuid) -> Result<(), ApiError> {
        self.record(ApiCall::TrackingStop);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixture helpers
// ---------------------------------------------------------------------------

pub fn frame_entity(
    video_uuid: Uuid,
    frame_number: FrameNumber,
    bboxes_text: &str,
    include: bool,
) -> VideoFrameEntity {
    VideoFrameEntity {
        video_uuid,
        frame_number,
        bboxes_text: bboxes_text.to_string(),
        include_frame_in_dataset: include,
        image_url: None,
    }
}

/// Poll response carrying tracked boxes for one frame.
pub fn frame_response(frame_number: FrameNumber, bboxes_text: &str) -> TrackingPollResponse {
    TrackingPollResponse {
        frame_number: Some(frame_number),
        bboxes_text: Some(bboxes_text.to_string()),
        ..Default::default()
    }
}

pub fn failed_response() -> TrackingPollResponse {
    TrackingPollResponse {
        tracker_failed: Some(true),
        ..Default::default()
    }
}

pub fn complete_response() -> TrackingPollResponse {
    TrackingPollResponse {
        tracking_complete: Some(true),
        ..Default::default()
    }
}

fn one_pixel_png() -> Vec<u8> {
    let mut bytes = Vec::new();
    let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255]));
    image::DynamicImage::ImageRgba8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
    bytes
}

/// Millisecond-scale config so scenario tests run in tens of
/// milliseconds instead of real-world seconds.
pub fn fast_config() -> WorkspaceConfig {
    let fast_retry = RetryConfig {
        initial_delay: Duration::from_millis(1),
        multiplier: 2.0,
        max_delay: Duration::from_millis(5),
        max_attempts: 3,
    };
    WorkspaceConfig {
        tracker_name: "test-tracker".to_string(),
        tracking_scale: 1.0,
        page_size: 5,
        page_stagger: Duration::from_millis(1),
        page_retry: fast_retry.clone(),
        image_retry: fast_retry.clone(),
        nav_retry_interval: Duration::from_millis(5),
        nav_retry_max: 100,
        tracking_retry: fast_retry,
        not_ready_delay: Duration::from_millis(2),
        restart_delay: Duration::from_millis(2),
        heartbeat_interval: Duration::from_secs(60),
    }
}

/// Poll an async condition until it holds, panicking after a generous
/// timeout.  Used with `#[macro_use] mod common;` in each test file.
macro_rules! wait_for {
    ($cond:expr) => {{
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            if $cond {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("condition not reached within timeout: {}", stringify!($cond));
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
    }};
}
