//! The frame-by-frame labeling workspace.
//!
//! [`LabelingWorkspace`] owns the shared state (frame store, mode,
//! current frame) behind a [`tokio::sync::RwLock`] and coordinates the
//! concurrent actors that touch it: the background frame loader, the
//! playback ticker, the tracking session task, and the user's pointer
//! and navigation input.  All IO goes through the [`LabelApi`] seam;
//! all UI feedback goes out as [`WorkspaceEvent`]s.
//!
//! Locking rule: state locks are never held across an API call or a
//! sleep.  Out-of-order async completions are tolerated by re-checking
//! "is this still the current frame" at apply time rather than by
//! cancelling superseded requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use vlabel_client::api::LabelApi;
use vlabel_core::bbox::{BBox, Hotspot};
use vlabel_core::bboxes_text::serialize_bboxes;
use vlabel_core::error::CoreError;
use vlabel_core::geometry::Point;
use vlabel_core::mode::{PlayDirection, WorkspaceMode};
use vlabel_core::store::{FrameStore, VideoEntity, VideoFrameEntity};
use vlabel_core::types::{FrameNumber, Timestamp};

use crate::config::{WorkspaceConfig, MAX_BOXES_PER_FRAME};
use crate::error::WorkspaceError;
use crate::events::{WorkspaceEvent, EVENT_CHANNEL_CAPACITY};
use crate::loader;
use crate::tracking::{self, TrackingHandle};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// An in-progress pointer edit, kept separate from the committed boxes
/// so that aborting (pointer-leave) discards it without any undo work.
#[derive(Debug, Clone)]
pub enum DraftEdit {
    /// A new box being dragged out from its anchor corner.
    Defining { bbox: BBox, anchor: Point },
    /// An existing box being resized on a cloned draft; committed back
    /// through normalizing `copy_corners_from` on pointer-up.
    Resizing {
        index: usize,
        draft: BBox,
        hotspot: Hotspot,
        /// Corner-minus-pointer delta captured at pointer-down, so the
        /// corner does not snap to the pointer.
        delta: Point,
    },
}

/// Mutable workspace state shared by the UI-facing methods and the
/// background tasks.
pub(crate) struct WorkspaceState {
    pub(crate) video: VideoEntity,
    pub(crate) store: FrameStore,
    pub(crate) mode: WorkspaceMode,
    pub(crate) current_frame: FrameNumber,
    pub(crate) playback_speed: f64,
    pub(crate) draft: Option<DraftEdit>,
    /// Wall-clock time of the last failed save, for the "saving failed"
    /// indicator.  Cleared by the next successful save.
    pub(crate) save_failed_at: Option<Timestamp>,
}

impl WorkspaceState {
    /// Label completeness of the current frame (the missing-label gate).
    /// An unloaded frame has nothing to gate on.
    pub(crate) fn current_labels_complete(&self) -> bool {
        self.store
            .record(self.current_frame)
            .map_or(true, |r| r.labels_complete())
    }
}

/// Cloneable bundle of everything the background tasks need.
#[derive(Clone)]
pub(crate) struct Shared {
    pub(crate) api: Arc<dyn LabelApi>,
    pub(crate) config: Arc<WorkspaceConfig>,
    pub(crate) state: Arc<RwLock<WorkspaceState>>,
    pub(crate) event_tx: broadcast::Sender<WorkspaceEvent>,
    pub(crate) cancel: CancellationToken,
}

impl Shared {
    pub(crate) fn emit(&self, event: WorkspaceEvent) {
        // No subscribers is fine (e.g. headless runs).
        let _ = self.event_tx.send(event);
    }
}

/// Aggregate counters surfaced to the UI.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FrameCounts {
    pub frame_count: u32,
    pub loaded_frame_count: usize,
    pub all_frames_loaded: bool,
    pub ignored_frame_count: usize,
    pub min_ignored_frame: Option<FrameNumber>,
    pub max_ignored_frame: Option<FrameNumber>,
    pub unlabeled_frame_count: usize,
    pub min_unlabeled_frame: Option<FrameNumber>,
    pub max_unlabeled_frame: Option<FrameNumber>,
}

// ---------------------------------------------------------------------------
// LabelingWorkspace
// ---------------------------------------------------------------------------

/// One open video's labeling workspace.
pub struct LabelingWorkspace {
    shared: Shared,
    /// Cancellation token of the running playback ticker, if any.
    play_cancel: std::sync::Mutex<Option<CancellationToken>>,
    /// The active tracking session, if any.
    pub(crate) tracking: Mutex<Option<TrackingHandle>>,
}

impl LabelingWorkspace {
    /// Open a video: fetch its record, eagerly fetch frame 0, and spawn
    /// the background paged load of frames `[1, frame_count)`.
    pub async fn open(
        api: Arc<dyn LabelApi>,
        video_uuid: Uuid,
        config: WorkspaceConfig,
    ) -> Result<Self, WorkspaceError> {
        let video = api.fetch_video(video_uuid).await?;
        tracing::info!(
            video_uuid = %video.uuid,
            frame_count = video.frame_count,
            "Opening labeling workspace",
        );

        let store = FrameStore::new(video.frame_count);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let shared = Shared {
            api,
            config: Arc::new(config),
            state: Arc::new(RwLock::new(WorkspaceState {
                video,
                store,
                mode: WorkspaceMode::Browsing,
                current_frame: 0,
                playback_speed: 10.0,
                draft: None,
                save_failed_at: None,
            })),
            event_tx,
            cancel: CancellationToken::new(),
        };

        // Frame 0 is displayed immediately, so it loads eagerly rather
        // than waiting its turn in the paged background load.
        let page = shared.api.fetch_frames(video_uuid, 0, 1).await?;
        for entity in page.video_frame_entities {
            loader::ingest_entity(&shared, entity).await;
        }

        loader::spawn_frame_loads(shared.clone());

        Ok(Self {
            shared,
            play_cancel: std::sync::Mutex::new(None),
            tracking: Mutex::new(None),
        })
    }

    /// Subscribe to workspace events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Cancel all background work (loader, playback, tracking task).
    pub fn shutdown(&self) {
        self.shared.cancel.cancel();
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    // ---- read accessors ----

    pub async fn video(&self) -> VideoEntity {
        self.shared.state.read().await.video.clone()
    }

    pub async fn mode(&self) -> WorkspaceMode {
        self.shared.state.read().await.mode
    }

    pub async fn current_frame_number(&self) -> FrameNumber {
        self.shared.state.read().await.current_frame
    }

    /// Committed boxes of the current frame (empty if not loaded yet).
    pub async fn current_boxes(&self) -> Vec<BBox> {
        let state = self.shared.state.read().await;
        state
            .store
            .record(state.current_frame)
            .map(|r| r.boxes.clone())
            .unwrap_or_default()
    }

    /// The in-progress pointer edit, for overlay rendering.
    pub async fn current_draft(&self) -> Option<DraftEdit> {
        self.shared.state.read().await.draft.clone()
    }

    pub async fn frame_counts(&self) -> FrameCounts {
        let state = self.shared.state.read().await;
        let store = &state.store;
        FrameCounts {
            frame_count: store.frame_count(),
            loaded_frame_count: store.loaded_frame_count(),
            all_frames_loaded: store.all_frames_loaded(),
            ignored_frame_count: store.ignored_frame_count(),
            min_ignored_frame: store.min_ignored_frame(),
            max_ignored_frame: store.max_ignored_frame(),
            unlabeled_frame_count: store.unlabeled_frame_count(),
            min_unlabeled_frame: store.min_unlabeled_frame(),
            max_unlabeled_frame: store.max_unlabeled_frame(),
        }
    }

    pub async fn load_failed(&self) -> bool {
        self.shared.state.read().await.store.load_failed()
    }

    pub async fn save_failed_at(&self) -> Option<Timestamp> {
        self.shared.state.read().await.save_failed_at
    }

    /// Merge a frame entity delivered outside the paged loader (e.g. a
    /// push update).  Same idempotent path the loader uses.
    pub async fn ingest_frame_entity(&self, entity: VideoFrameEntity) {
        loader::ingest_entity(&self.shared, entity).await;
    }

    // ---- pointer-driven box editing ----

    /// Pointer-down over the canvas: begin resizing if a hotspot is hit,
    /// otherwise begin defining a new box.
    pub async fn pointer_down(&self, point: Point, scale: f64) -> Result<(), WorkspaceError> {
        let mut state = self.shared.state.write().await;
        if !state.mode.allows_box_editing() {
            return Err(WorkspaceError::NotAllowed(
                "box editing is disabled in the current mode".to_string(),
            ));
        }
        let current = state.current_frame;
        let (box_count, hit) = {
            let record = state
                .store
                .record(current)
                .ok_or(CoreError::FrameNotLoaded(current))?;
            let hit = record.boxes.iter().enumerate().find_map(|(index, bbox)| {
                bbox.hit_resize_hotspot(&point, scale)
                    .map(|(hotspot, delta)| (index, bbox.clone(), hotspot, delta))
            });
            (record.boxes.len(), hit)
        };

        if let Some((index, draft, hotspot, delta)) = hit {
            state.draft = Some(DraftEdit::Resizing {
                index,
                draft,
                hotspot,
                delta,
            });
            state.mode = WorkspaceMode::ResizingBox;
            return Ok(());
        }

        if box_count >= MAX_BOXES_PER_FRAME {
            return Err(WorkspaceError::NotAllowed(format!(
                "frame already has {MAX_BOXES_PER_FRAME} boxes"
            )));
        }

        state.draft = Some(DraftEdit::Defining {
            bbox: BBox::new(point.x, point.y, point.x, point.y, ""),
            anchor: point,
        });
        state.mode = WorkspaceMode::DefiningBox;
        Ok(())
    }

    /// Pointer-move: grow the defining box or drag the resize corner.
    /// A move outside an active drag is a hover and is ignored.
    pub async fn pointer_move(&self, point: Point) -> Result<(), WorkspaceError> {
        let mut state = self.shared.state.write().await;
        match &mut state.draft {
            Some(DraftEdit::Defining { bbox, anchor }) => {
                bbox.set_corners(anchor.x, anchor.y, point.x, point.y);
            }
            Some(DraftEdit::Resizing {
                draft,
                hotspot,
                delta,
                ..
            }) => {
                let (cx, cy) = match hotspot {
                    Hotspot::UpperLeft => (draft.x1, draft.y1),
                    Hotspot::LowerRight => (draft.x2, draft.y2),
                };
                let dx = point.x + delta.x - cx;
                let dy = point.y + delta.y - cy;
                draft.resize(*hotspot, dx, dy);
            }
            None => {}
        }
        Ok(())
    }

    /// Pointer-up: commit the draft (append a non-empty new box, or copy
    /// the resized corners back through normalization).
    pub async fn pointer_up(&self) -> Result<(), WorkspaceError> {
        let mut state = self.shared.state.write().await;
        let current = state.current_frame;
        match state.draft.take() {
            Some(DraftEdit::Defining { bbox, .. }) => {
                if !bbox.is_empty() {
                    if let Some(record) = state.store.record_mut(current) {
                        record.boxes.push(bbox);
                    }
                }
                state.mode = WorkspaceMode::Browsing;
                self.shared.emit(WorkspaceEvent::RedrawNeeded {
                    frame_number: current,
                });
            }
            Some(DraftEdit::Resizing { index, draft, .. }) => {
                if let Some(record) = state.store.record_mut(current) {
                    if let Some(bbox) = record.boxes.get_mut(index) {
                        bbox.copy_corners_from(&draft);
                    }
                }
                state.mode = WorkspaceMode::Browsing;
                self.shared.emit(WorkspaceEvent::RedrawNeeded {
                    frame_number: current,
                });
            }
            None => {}
        }
        Ok(())
    }

    /// Pointer left the canvas mid-drag: abort and discard the draft.
    pub async fn pointer_leave(&self) -> Result<(), WorkspaceError> {
        let mut state = self.shared.state.write().await;
        if state.draft.take().is_some() {
            state.mode = WorkspaceMode::Browsing;
            let current = state.current_frame;
            self.shared.emit(WorkspaceEvent::RedrawNeeded {
                frame_number: current,
            });
        }
        Ok(())
    }

    /// Edit a box's label on the current frame.
    pub async fn set_box_label(&self, index: usize, label: &str) -> Result<(), WorkspaceError> {
        BBox::validate_label(label)?;
        let mut state = self.shared.state.write().await;
        if !state.mode.allows_box_editing() {
            return Err(WorkspaceError::NotAllowed(
                "box editing is disabled in the current mode".to_string(),
            ));
        }
        let current = state.current_frame;
        let record = state
            .store
            .record_mut(current)
            .ok_or(CoreError::FrameNotLoaded(current))?;
        let bbox = record.boxes.get_mut(index).ok_or_else(|| {
            WorkspaceError::NotAllowed(format!("no box at index {index}"))
        })?;
        bbox.label = label.to_string();
        Ok(())
    }

    /// Delete a box from the current frame.
    pub async fn delete_box(&self, index: usize) -> Result<(), WorkspaceError> {
        let mut state = self.shared.state.write().await;
        if !state.mode.allows_box_editing() {
            return Err(WorkspaceError::NotAllowed(
                "box editing is disabled in the current mode".to_string(),
            ));
        }
        let current = state.current_frame;
        let record = state
            .store
            .record_mut(current)
            .ok_or(CoreError::FrameNotLoaded(current))?;
        if index >= record.boxes.len() {
            return Err(WorkspaceError::NotAllowed(format!(
                "no box at index {index}"
            )));
        }
        record.boxes.remove(index);
        self.shared.emit(WorkspaceEvent::RedrawNeeded {
            frame_number: current,
        });
        Ok(())
    }

    // ---- persistence ----

    /// Save the current frame's boxes if they changed.
    ///
    /// Returns the serialized text either way.  An unchanged text is a
    /// no-op with no network call.  A changed text is committed to the
    /// local store optimistically (aggregates update immediately) and
    /// POSTed fire-and-forget: a failure surfaces as a `SaveFailed`
    /// event and the edit stays local until the next save trigger.
    pub async fn save_current_bboxes(&self) -> Result<String, WorkspaceError> {
        let (video_uuid, frame, text) = {
            let mut state = self.shared.state.write().await;
            let current = state.current_frame;
            let record = state
                .store
                .record(current)
                .ok_or(CoreError::FrameNotLoaded(current))?;

            let text = serialize_bboxes(&record.boxes);
            if text == record.entity.bboxes_text {
                return Ok(text);
            }
            state.store.commit_bboxes_text(current, &text)?;
            (state.video.uuid, current, text)
        };

        self.spawn_save(video_uuid, frame, text.clone());
        Ok(text)
    }

    fn spawn_save(&self, video_uuid: Uuid, frame: FrameNumber, text: String) {
        let shared = self.shared.clone();
        tokio::spawn(async move {
            match shared.api.save_bboxes(video_uuid, frame, &text).await {
                Ok(()) => {
                    shared.state.write().await.save_failed_at = None;
                    tracing::debug!(frame, "Saved bboxes");
                }
                Err(e) => {
                    tracing::error!(frame, error = %e, "Saving bboxes failed");
                    shared.state.write().await.save_failed_at = Some(chrono::Utc::now());
                    shared.emit(WorkspaceEvent::SaveFailed {
                        frame_number: frame,
                        detail: e.to_string(),
                    });
                }
            }
        });
    }

    /// Toggle the current frame's include-in-dataset flag.  Optimistic
    /// local update plus a fire-and-forget POST, like box saves.
    pub async fn set_include_flag(&self, include: bool) -> Result<(), WorkspaceError> {
        let (video_uuid, frame) = {
            let mut state = self.shared.state.write().await;
            let current = state.current_frame;
            state.store.set_include_flag(current, include)?;
            (state.video.uuid, current)
        };

        let shared = self.shared.clone();
        tokio::spawn(async move {
            if let Err(e) = shared
                .api
                .save_include_flag(video_uuid, frame, include)
                .await
            {
                tracing::error!(frame, error = %e, "Saving include flag failed");
                shared.state.write().await.save_failed_at = Some(chrono::Utc::now());
                shared.emit(WorkspaceEvent::SaveFailed {
                    frame_number: frame,
                    detail: e.to_string(),
                });
            }
        });
        Ok(())
    }

    // ---- navigation ----

    /// Navigate to a frame.
    ///
    /// If the frame's entity has not loaded yet this polls for it
    /// (bounded) instead of failing: the user may navigate ahead of the
    /// background load front.  On success the outgoing frame is
    /// autosaved (if changed) and `FrameChanged` is emitted.
    pub async fn go_to_frame(&self, frame: FrameNumber) -> Result<(), WorkspaceError> {
        {
            let state = self.shared.state.read().await;
            if frame >= state.store.frame_count() {
                return Err(CoreError::FrameOutOfRange {
                    frame,
                    frame_count: state.store.frame_count(),
                }
                .into());
            }
            if frame == state.current_frame {
                return Ok(());
            }
            if !state.mode.allows_navigation(state.current_labels_complete()) {
                return Err(WorkspaceError::NotAllowed(
                    "navigation is disabled in the current mode".to_string(),
                ));
            }
        }

        self.wait_for_frame(frame).await?;

        // Autosave the outgoing frame; navigation proceeds optimistically
        // even if the save ultimately fails.
        if let Err(e) = self.save_current_bboxes().await {
            tracing::warn!(error = %e, "Autosave before navigation skipped");
        }

        let mut state = self.shared.state.write().await;
        if !state.mode.allows_navigation(state.current_labels_complete()) {
            return Err(WorkspaceError::NotAllowed(
                "navigation became disabled while waiting for the frame".to_string(),
            ));
        }
        state.current_frame = frame;
        state.draft = None;
        self.shared.emit(WorkspaceEvent::FrameChanged {
            frame_number: frame,
        });
        Ok(())
    }

    /// Poll until a frame's entity is loaded, bounded by the configured
    /// retry count.
    async fn wait_for_frame(&self, frame: FrameNumber) -> Result<(), WorkspaceError> {
        let config = Arc::clone(&self.shared.config);
        for poll in 0..config.nav_retry_max {
            if self.shared.state.read().await.store.is_loaded(frame) {
                return Ok(());
            }
            tokio::select! {
                _ = self.shared.cancel.cancelled() => {
                    return Err(WorkspaceError::FrameLoadTimeout {
                        frame,
                        polls: poll,
                    });
                }
                _ = tokio::time::sleep(config.nav_retry_interval) => {}
            }
        }
        if self.shared.state.read().await.store.is_loaded(frame) {
            return Ok(());
        }
        Err(WorkspaceError::FrameLoadTimeout {
            frame,
            polls: config.nav_retry_max,
        })
    }

    /// Jump to the next ignored frame after the current one, if any.
    /// Returns the frame navigated to.
    pub async fn go_to_next_ignored(&self) -> Result<Option<FrameNumber>, WorkspaceError> {
        let target = {
            let state = self.shared.state.read().await;
            state.store.next_ignored_after(state.current_frame)
        };
        self.jump(target).await
    }

    /// Jump to the previous ignored frame before the current one.
    pub async fn go_to_prev_ignored(&self) -> Result<Option<FrameNumber>, WorkspaceError> {
        let target = {
            let state = self.shared.state.read().await;
            state.store.prev_ignored_before(state.current_frame)
        };
        self.jump(target).await
    }

    /// Jump to the next unlabeled (negative) frame after the current one.
    pub async fn go_to_next_unlabeled(&self) -> Result<Option<FrameNumber>, WorkspaceError> {
        let target = {
            let state = self.shared.state.read().await;
            state.store.next_unlabeled_after(state.current_frame)
        };
        self.jump(target).await
    }

    /// Jump to the previous unlabeled frame before the current one.
    pub async fn go_to_prev_unlabeled(&self) -> Result<Option<FrameNumber>, WorkspaceError> {
        let target = {
            let state = self.shared.state.read().await;
            state.store.prev_unlabeled_before(state.current_frame)
        };
        self.jump(target).await
    }

    async fn jump(
        &self,
        target: Option<FrameNumber>,
    ) -> Result<Option<FrameNumber>, WorkspaceError> {
        match target {
            Some(frame) => {
                self.go_to_frame(frame).await?;
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    // ---- playback ----

    /// Set the playback speed in frames per second.
    pub async fn set_playback_speed(&self, speed: f64) -> Result<(), WorkspaceError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(CoreError::Validation(format!(
                "playback speed must be a positive number, got {speed}"
            ))
            .into());
        }
        self.shared.state.write().await.playback_speed = speed;
        Ok(())
    }

    /// Start timed playback.  Autosaves the current frame first, then
    /// auto-advances until a boundary frame, `pause`, or shutdown.
    pub async fn play(&self, direction: PlayDirection) -> Result<(), WorkspaceError> {
        let interval = {
            let mut state = self.shared.state.write().await;
            if !state.mode.allows_play(state.current_labels_complete()) {
                return Err(WorkspaceError::NotAllowed(
                    "playback is disabled in the current mode".to_string(),
                ));
            }
            state.mode = WorkspaceMode::Playing { direction };
            playback_interval(state.playback_speed)
        };

        if let Err(e) = self.save_current_bboxes().await {
            tracing::warn!(error = %e, "Autosave before playback skipped");
        }

        let cancel = self.shared.cancel.child_token();
        *self.play_cancel.lock().unwrap() = Some(cancel.clone());

        let shared = self.shared.clone();
        tokio::spawn(async move {
            run_playback(shared, direction, interval, cancel).await;
        });
        Ok(())
    }

    /// Stop playback and return to browsing.
    pub async fn pause(&self) -> Result<(), WorkspaceError> {
        if let Some(cancel) = self.play_cancel.lock().unwrap().take() {
            cancel.cancel();
        }
        let mut state = self.shared.state.write().await;
        if state.mode.is_playing() {
            state.mode = WorkspaceMode::Browsing;
            self.shared.emit(WorkspaceEvent::PlaybackStopped);
        }
        Ok(())
    }

    // ---- tracking ----

    /// Start a tracking session from the current frame.  See
    /// [`tracking`] for the protocol.
    pub async fn start_tracking(&self) -> Result<Uuid, WorkspaceError> {
        tracking::start(self).await
    }

    /// Pause the tracking session: responses already in flight still
    /// apply, but no new request auto-fires until `resume_tracking`.
    pub async fn pause_tracking(&self) -> Result<(), WorkspaceError> {
        tracking::set_paused(self, true).await
    }

    /// Resume a paused tracking session; the next request fires
    /// immediately, pushing any edits made while paused.
    pub async fn resume_tracking(&self) -> Result<(), WorkspaceError> {
        tracking::set_paused(self, false).await
    }

    /// Stop the tracking session and return to browsing.
    pub async fn stop_tracking(&self) -> Result<(), WorkspaceError> {
        tracking::stop(self).await
    }
}

// ---------------------------------------------------------------------------
// Playback ticker
// ---------------------------------------------------------------------------

/// Interval between playback frame advances for a speed slider value.
fn playback_interval(speed: f64) -> Duration {
    Duration::from_millis((1000.0 / speed).round() as u64)
}

/// Auto-advance loop.  Skips a tick instead of racing ahead when the
/// next frame has not loaded yet.
async fn run_playback(
    shared: Shared,
    direction: PlayDirection,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = shared.cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        let mut state = shared.state.write().await;
        if !state.mode.is_playing() {
            return;
        }

        let current = state.current_frame;
        let last = state.store.frame_count().saturating_sub(1);
        let next = match direction {
            PlayDirection::Forward if current < last => current + 1,
            PlayDirection::Reverse if current > 0 => current - 1,
            _ => {
                state.mode = WorkspaceMode::Browsing;
                shared.emit(WorkspaceEvent::PlaybackStopped);
                return;
            }
        };

        if !state.store.is_loaded(next) {
            // Wait for the load front to catch up.
            continue;
        }

        state.current_frame = next;
        shared.emit(WorkspaceEvent::FrameChanged { frame_number: next });

        // Reaching a boundary stops playback after displaying it.
        if next == 0 || next == last {
            state.mode = WorkspaceMode::Browsing;
            shared.emit(WorkspaceEvent::PlaybackStopped);
            return;
        }
    }
}
