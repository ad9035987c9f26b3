//! Tracking session driver.
//!
//! One spawned task owns the session protocol: start the server-side
//! tracker, then alternate poll/continue requests frame by frame,
//! applying returned boxes through the store's aggregate path and
//! moving the view along.  A watch channel carries the user's
//! pause/resume intent; a child `CancellationToken` carries stop and
//! workspace shutdown.  A sibling task sends keep-alive heartbeats
//! whenever the session has been quiet for a full interval.
//!
//! A dead tracker is not terminal: the task sleeps briefly and starts a
//! fresh tracker from the last applied frame.  Frames already applied
//! are never re-requested, so a restart never rewinds the user's
//! progress.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use vlabel_client::api::{
    ApiError, LabelApi, PollOutcome, TrackingPollResponse, TrackingStartOutcome,
};
use vlabel_client::retry::{retry_with_backoff, RetryError};
use vlabel_core::bboxes_text::serialize_bboxes;
use vlabel_core::mode::WorkspaceMode;
use vlabel_core::types::FrameNumber;

use crate::error::WorkspaceError;
use crate::events::{TrackingEndReason, WorkspaceEvent};
use crate::workspace::{LabelingWorkspace, Shared};

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// State shared between the session task, the heartbeat task, and the
/// workspace-facing control methods.  The tracker uuid changes when the
/// session self-heals after a tracker death.
struct SessionShared {
    tracker_uuid: Uuid,
    last_request: Instant,
}

/// The workspace's grip on a running session.
pub(crate) struct TrackingHandle {
    session: Arc<Mutex<SessionShared>>,
    cancel: CancellationToken,
    paused_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TrackingHandle {
    fn tracker_uuid(&self) -> Uuid {
        self.session.lock().unwrap().tracker_uuid
    }
}

// ---------------------------------------------------------------------------
// Control operations
// ---------------------------------------------------------------------------

/// Start a tracking session from the workspace's current frame.
pub(crate) async fn start(ws: &LabelingWorkspace) -> Result<Uuid, WorkspaceError> {
    let shared = ws.shared().clone();

    let (video_uuid, start_frame, init_text) = {
        let state = shared.state.read().await;
        if !state
            .mode
            .allows_tracking_start(state.current_labels_complete())
        {
            return Err(WorkspaceError::NotAllowed(
                "tracking cannot start in the current mode".to_string(),
            ));
        }
        if !state.store.all_frames_loaded() {
            return Err(WorkspaceError::NotAllowed(
                "tracking requires all frames to be loaded".to_string(),
            ));
        }
        let current = state.current_frame;
        if current + 1 >= state.store.frame_count() {
            return Err(WorkspaceError::NotAllowed(
                "tracking cannot start on the last frame".to_string(),
            ));
        }
        let record = state
            .store
            .record(current)
            .ok_or(vlabel_core::error::CoreError::FrameNotLoaded(current))?;
        if record.boxes.is_empty() {
            return Err(WorkspaceError::NotAllowed(
                "tracking requires at least one box on the current frame".to_string(),
            ));
        }
        (state.video.uuid, current, serialize_bboxes(&record.boxes))
    };

    // The local flag may be stale; the server's answer decides.
    let video = shared.api.fetch_video(video_uuid).await?;
    {
        let mut state = shared.state.write().await;
        state.video.tracking_in_progress = video.tracking_in_progress;
    }
    if video.tracking_in_progress {
        return Err(WorkspaceError::TrackingBusy);
    }

    // The tracker initializes from the server-side text, so flush any
    // unsaved edits first.
    ws.save_current_bboxes().await?;

    let cancel = shared.cancel.child_token();
    let tracker_uuid =
        start_tracker(&shared, &cancel, video_uuid, start_frame, &init_text).await?;

    // No request is in flight until the session task issues one, so a
    // pause landing before the first poll leaves the frame editable.
    {
        let mut state = shared.state.write().await;
        state.mode = WorkspaceMode::Tracking {
            paused: false,
            waiting_for_bboxes: false,
        };
    }
    shared.emit(WorkspaceEvent::TrackingStarted { tracker_uuid });
    tracing::info!(%tracker_uuid, start_frame, "Tracking session started");

    let session = Arc::new(Mutex::new(SessionShared {
        tracker_uuid,
        last_request: Instant::now(),
    }));
    let (paused_tx, paused_rx) = watch::channel(false);

    spawn_heartbeat(shared.clone(), Arc::clone(&session), cancel.clone(), video_uuid);

    let task = tokio::spawn(run_session(
        shared,
        Arc::clone(&session),
        cancel.clone(),
        paused_rx,
        video_uuid,
        start_frame,
    ));

    *ws.tracking.lock().await = Some(TrackingHandle {
        session,
        cancel,
        paused_tx,
        task,
    });
    Ok(tracker_uuid)
}

/// Flip the session's pause flag.  Pausing never cancels the in-flight
/// request; its response still applies, after which the loop parks.
pub(crate) async fn set_paused(ws: &LabelingWorkspace, paused: bool) -> Result<(), WorkspaceError> {
    let guard = ws.tracking.lock().await;
    let handle = guard.as_ref().ok_or(WorkspaceError::NotTracking)?;

    let mut state = ws.shared().state.write().await;
    match state.mode {
        WorkspaceMode::Tracking {
            waiting_for_bboxes, ..
        } => {
            state.mode = WorkspaceMode::Tracking {
                paused,
                waiting_for_bboxes,
            };
        }
        _ => return Err(WorkspaceError::NotTracking),
    }
    let _ = handle.paused_tx.send(paused);
    Ok(())
}

/// Stop the session: cancel the task, tell the server, return to
/// browsing.
pub(crate) async fn stop(ws: &LabelingWorkspace) -> Result<(), WorkspaceError> {
    let handle = ws
        .tracking
        .lock()
        .await
        .take()
        .ok_or(WorkspaceError::NotTracking)?;

    // A session that ended on its own (complete, failure budget) already
    // cancelled itself and left browsing mode; only a stale handle remains.
    if handle.task.is_finished() && !ws.shared().state.read().await.mode.is_tracking() {
        return Err(WorkspaceError::NotTracking);
    }

    handle.cancel.cancel();
    let tracker_uuid = handle.tracker_uuid();
    let _ = handle.task.await;

    let shared = ws.shared();
    let video_uuid = shared.state.read().await.video.uuid;
    if let Err(e) = shared.api.tracking_stop(video_uuid, tracker_uuid).await {
        // The server reaps heartbeat-less trackers anyway.
        tracing::warn!(%tracker_uuid, error = %e, "Tracking stop request failed");
    }

    let mut state = shared.state.write().await;
    if state.mode.is_tracking() {
        state.mode = WorkspaceMode::Browsing;
        shared.emit(WorkspaceEvent::TrackingEnded {
            reason: TrackingEndReason::Stopped,
        });
    }
    tracing::info!(%tracker_uuid, "Tracking session stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Session task
// ---------------------------------------------------------------------------

/// Issue a tracking-start request with retries, mapping rejection and
/// exhaustion onto workspace errors.
async fn start_tracker(
    shared: &Shared,
    cancel: &CancellationToken,
    video_uuid: Uuid,
    init_frame: FrameNumber,
    init_text: &str,
) -> Result<Uuid, WorkspaceError> {
    let api = Arc::clone(&shared.api);
    let tracker_name = shared.config.tracker_name.clone();
    let scale = shared.config.tracking_scale;
    let init_text = init_text.to_string();

    let outcome = retry_with_backoff(
        "tracking_start",
        &shared.config.tracking_retry,
        cancel,
        move || {
            let api = Arc::clone(&api);
            let tracker_name = tracker_name.clone();
            let init_text = init_text.clone();
            async move {
                api.tracking_start(video_uuid, init_frame, &init_text, &tracker_name, scale)
                    .await
            }
        },
    )
    .await;

    match outcome {
        Ok(TrackingStartOutcome::Started { tracker_uuid }) => Ok(tracker_uuid),
        Ok(TrackingStartOutcome::Rejected { message }) => {
            Err(WorkspaceError::TrackingRejected(message))
        }
        Err(RetryError::Cancelled) => Err(WorkspaceError::NotAllowed(
            "workspace is shutting down".to_string(),
        )),
        Err(RetryError::Exhausted { last_error, .. }) => Err(last_error.into()),
    }
}

enum NextRequest {
    Poll,
    Continue,
}

async fn run_session(
    shared: Shared,
    session: Arc<Mutex<SessionShared>>,
    cancel: CancellationToken,
    mut paused_rx: watch::Receiver<bool>,
    video_uuid: Uuid,
    start_frame: FrameNumber,
) {
    let mut last_applied = start_frame;
    let mut next = NextRequest::Poll;

    loop {
        if wait_while_paused(&cancel, &mut paused_rx).await.is_none() {
            return;
        }

        // Mark the request in flight so editing locks out.
        {
            let mut state = shared.state.write().await;
            if let WorkspaceMode::Tracking { paused, .. } = state.mode {
                state.mode = WorkspaceMode::Tracking {
                    paused,
                    waiting_for_bboxes: true,
                };
            }
        }

        let retrieve = last_applied + 1;
        let tracker_uuid = session.lock().unwrap().tracker_uuid;

        let result = match next {
            NextRequest::Poll => {
                send_poll(&shared, &cancel, video_uuid, tracker_uuid, retrieve).await
            }
            NextRequest::Continue => {
                // Push the (possibly edited-while-paused) text of the
                // last applied frame along with the request.
                let text = {
                    let state = shared.state.read().await;
                    state
                        .store
                        .record(last_applied)
                        .map(|r| serialize_bboxes(&r.boxes))
                        .unwrap_or_default()
                };
                send_continue(
                    &shared,
                    &cancel,
                    video_uuid,
                    tracker_uuid,
                    retrieve,
                    last_applied,
                    text,
                )
                .await
            }
        };

        let response = match result {
            Ok(response) => response,
            Err(RetryError::Cancelled) => return,
            Err(e @ RetryError::Exhausted { .. }) => {
                tracing::error!(retrieve, error = %e, "Tracking request failed");
                end_session(&shared, &cancel, TrackingEndReason::Failed).await;
                return;
            }
        };
        session.lock().unwrap().last_request = Instant::now();

        // Response landed; until the next request goes out the frame's
        // boxes are editable again (when paused).
        {
            let mut state = shared.state.write().await;
            if let WorkspaceMode::Tracking { paused, .. } = state.mode {
                state.mode = WorkspaceMode::Tracking {
                    paused,
                    waiting_for_bboxes: false,
                };
            }
        }

        match response.outcome(retrieve) {
            PollOutcome::Failed => {
                tracing::warn!(%tracker_uuid, last_applied, "Tracker died, restarting");
                shared.emit(WorkspaceEvent::TrackerFailed);

                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(shared.config.restart_delay) => {}
                }

                let init_text = {
                    let state = shared.state.read().await;
                    state
                        .store
                        .record(last_applied)
                        .map(|r| serialize_bboxes(&r.boxes))
                        .unwrap_or_default()
                };
                match start_tracker(&shared, &cancel, video_uuid, last_applied, &init_text).await {
                    Ok(new_uuid) => {
                        session.lock().unwrap().tracker_uuid = new_uuid;
                        shared.emit(WorkspaceEvent::TrackingStarted {
                            tracker_uuid: new_uuid,
                        });
                        tracing::info!(%new_uuid, last_applied, "Tracker restarted");
                        next = NextRequest::Poll;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Tracker restart failed");
                        end_session(&shared, &cancel, TrackingEndReason::Failed).await;
                        return;
                    }
                }
            }
            PollOutcome::Complete => {
                end_session(&shared, &cancel, TrackingEndReason::Completed).await;
                return;
            }
            PollOutcome::Frame {
                frame_number,
                bboxes_text,
            } => {
                apply_frame(&shared, frame_number, &bboxes_text).await;
                last_applied = frame_number;
                next = NextRequest::Continue;
            }
            PollOutcome::NotReady => {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(shared.config.not_ready_delay) => {}
                }
                // A continue's push already landed on the server; only
                // the retrieval needs repeating.
                next = NextRequest::Poll;
            }
        }
    }
}

/// Park while the user has the session paused.  Returns `None` on
/// cancellation.
async fn wait_while_paused(
    cancel: &CancellationToken,
    paused_rx: &mut watch::Receiver<bool>,
) -> Option<()> {
    loop {
        if !*paused_rx.borrow() {
            return Some(());
        }
        tokio::select! {
            _ = cancel.cancelled() => return None,
            changed = paused_rx.changed() => changed.ok()?,
        }
    }
}

async fn send_poll(
    shared: &Shared,
    cancel: &CancellationToken,
    video_uuid: Uuid,
    tracker_uuid: Uuid,
    retrieve: FrameNumber,
) -> Result<TrackingPollResponse, RetryError<ApiError>> {
    let api = Arc::clone(&shared.api);
    retry_with_backoff(
        "tracking_poll",
        &shared.config.tracking_retry,
        cancel,
        move || {
            let api = Arc::clone(&api);
            async move { api.tracking_poll(video_uuid, tracker_uuid, retrieve).await }
        },
    )
    .await
}

async fn send_continue(
    shared: &Shared,
    cancel: &CancellationToken,
    video_uuid: Uuid,
    tracker_uuid: Uuid,
    retrieve: FrameNumber,
    frame_number: FrameNumber,
    bboxes_text: String,
) -> Result<TrackingPollResponse, RetryError<ApiError>> {
    let api = Arc::clone(&shared.api);
    retry_with_backoff(
        "tracking_continue",
        &shared.config.tracking_retry,
        cancel,
        move || {
            let api = Arc::clone(&api);
            let bboxes_text = bboxes_text.clone();
            async move {
                api.tracking_continue(
                    video_uuid,
                    tracker_uuid,
                    retrieve,
                    frame_number,
                    &bboxes_text,
                )
                .await
            }
        },
    )
    .await
}

/// Apply one tracked frame: boxes through the aggregate path, then move
/// the view there.
async fn apply_frame(shared: &Shared, frame: FrameNumber, bboxes_text: &str) {
    {
        let mut state = shared.state.write().await;
        if let Err(e) = state.store.apply_tracked_bboxes(frame, bboxes_text) {
            tracing::error!(frame, error = %e, "Dropping tracked boxes");
            return;
        }
        state.current_frame = frame;
    }
    shared.emit(WorkspaceEvent::TrackingFrameApplied {
        frame_number: frame,
    });
    shared.emit(WorkspaceEvent::FrameChanged {
        frame_number: frame,
    });
    shared.emit(WorkspaceEvent::RedrawNeeded {
        frame_number: frame,
    });
    tracing::debug!(frame, "Applied tracked boxes");
}

/// Terminal path: cancelling the session token also stops the
/// heartbeat task, which would otherwise keep pinging a dead tracker.
async fn end_session(shared: &Shared, cancel: &CancellationToken, reason: TrackingEndReason) {
    cancel.cancel();
    let mut state = shared.state.write().await;
    state.mode = WorkspaceMode::Browsing;
    shared.emit(WorkspaceEvent::TrackingEnded { reason });
    tracing::info!(?reason, "Tracking session ended");
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

/// Keep the server-side session alive while the loop is parked (paused,
/// or waiting out a slow tracker).  Skipped whenever another request
/// went out within the interval.
fn spawn_heartbeat(
    shared: Shared,
    session: Arc<Mutex<SessionShared>>,
    cancel: CancellationToken,
    video_uuid: Uuid,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(shared.config.heartbeat_interval) => {}
            }

            let (tracker_uuid, quiet) = {
                let session = session.lock().unwrap();
                (
                    session.tracker_uuid,
                    session.last_request.elapsed() >= shared.config.heartbeat_interval,
                )
            };
            if !quiet {
                continue;
            }

            if let Err(e) = shared.api.tracking_heartbeat(video_uuid, tracker_uuid).await {
                tracing::warn!(%tracker_uuid, error = %e, "Heartbeat failed");
            } else {
                session.lock().unwrap().last_request = Instant::now();
                tracing::trace!(%tracker_uuid, "Heartbeat sent");
            }
        }
    });
}
