//! Scenario tests for the tracking session: start gates, the
//! poll/continue protocol, self-healing restart, pause, and stop.

#[macro_use]
mod common;

use common::{complete_response, failed_response, frame_response, ApiCall, MockLabelApi};

use assert_matches::assert_matches;
use vlabel_workspace::error::WorkspaceError;
use vlabel_workspace::events::{TrackingEndReason, WorkspaceEvent};
use vlabel_workspace::workspace::LabelingWorkspace;

/// Open a workspace whose frame 0 carries one labeled box, with all
/// frames loaded (the tracking start gates require both).
async fn open_trackable(api: &std::sync::Arc<MockLabelApi>) -> LabelingWorkspace {
    api.set_frame(0, "10,20,30,40,cat\n", true);
    let ws = LabelingWorkspace::open(api.clone(), api.video_uuid(), common::fast_config())
        .await
        .unwrap();
    wait_for!(ws.frame_counts().await.all_frames_loaded);
    ws
}

#[tokio::test]
async fn happy_path_applies_every_tracked_frame() {
    let api = MockLabelApi::new(5);
    api.push_poll_response(frame_response(1, "11,21,31,41,cat\n"));
    api.push_poll_response(frame_response(2, "12,22,32,42,cat\n"));
    api.push_poll_response(frame_response(3, "13,23,33,43,cat\n"));
    api.push_poll_response(frame_response(4, "14,24,34,44,cat\n"));
    api.push_poll_response(complete_response());

    let ws = open_trackable(&api).await;
    let mut events = ws.subscribe();
    ws.start_tracking().await.unwrap();

    wait_for!(!ws.mode().await.is_tracking());

    // The view followed the tracker to the last applied frame.
    assert_eq!(ws.current_frame_number().await, 4);
    let boxes = ws.current_boxes().await;
    assert_eq!((boxes[0].x1, boxes[0].label.as_str()), (14, "cat"));

    // Protocol: one poll, then continues pushing each applied frame.
    let tracking_calls: Vec<ApiCall> = api
        .calls()
        .into_iter()
        .filter(|c| {
            matches!(
                c,
                ApiCall::TrackingPoll { .. } | ApiCall::TrackingContinue { .. }
            )
        })
        .collect();
    assert_eq!(
        tracking_calls[0],
        ApiCall::TrackingPoll {
            retrieve_frame_number: 1
        }
    );
    assert_matches!(
        &tracking_calls[1],
        ApiCall::TrackingContinue {
            retrieve_frame_number: 2,
            frame_number: 1,
            bboxes_text,
        } if bboxes_text == "11,21,31,41,cat\n"
    );
    assert_matches!(
        &tracking_calls[4],
        ApiCall::TrackingContinue {
            retrieve_frame_number: 5,
            frame_number: 4,
            ..
        }
    );

    // The session announced itself and its completion.
    let mut started = false;
    let mut completed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            WorkspaceEvent::TrackingStarted { .. } => started = true,
            WorkspaceEvent::TrackingEnded {
                reason: TrackingEndReason::Completed,
            } => completed = true,
            _ => {}
        }
    }
    assert!(started && completed);
}

#[tokio::test]
async fn tracker_death_restarts_from_the_last_applied_frame() {
    let api = MockLabelApi::new(5);
    api.push_poll_response(frame_response(1, "11,21,31,41,cat\n"));
    api.push_poll_response(failed_response());
    // Responses for the restarted tracker.
    api.push_poll_response(frame_response(2, "12,22,32,42,cat\n"));
    api.push_poll_response(complete_response());

    let ws = open_trackable(&api).await;
    let mut events = ws.subscribe();
    ws.start_tracking().await.unwrap();

    wait_for!(!ws.mode().await.is_tracking());

    // Two tracker starts; the restart resumes from frame 1 with the
    // already-applied boxes, not from the beginning.
    let starts: Vec<ApiCall> = api
        .calls()
        .into_iter()
        .filter(|c| matches!(c, ApiCall::TrackingStart { .. }))
        .collect();
    assert_eq!(starts.len(), 2);
    assert_matches!(
        &starts[1],
        ApiCall::TrackingStart {
            init_frame_number: 1,
            init_bboxes_text,
        } if init_bboxes_text == "11,21,31,41,cat\n"
    );

    // Frame 1's applied boxes survived the restart.
    ws.go_to_frame(1).await.unwrap();
    assert_eq!(ws.current_boxes().await[0].x1, 11);

    let mut failed_seen = false;
    let mut completed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            WorkspaceEvent::TrackerFailed => failed_seen = true,
            WorkspaceEvent::TrackingEnded {
                reason: TrackingEndReason::Completed,
            } => completed = true,
            _ => {}
        }
    }
    assert!(failed_seen && completed);
}

#[tokio::test]
async fn stop_ends_the_session_and_notifies_the_server() {
    let api = MockLabelApi::new(5);
    api.push_poll_response(frame_response(1, "11,21,31,41,cat\n"));
    // Empty script afterwards answers "not ready", keeping the session
    // alive until the stop.

    let ws = open_trackable(&api).await;
    ws.start_tracking().await.unwrap();
    wait_for!(ws.current_frame_number().await == 1);

    ws.stop_tracking().await.unwrap();
    assert!(!ws.mode().await.is_tracking());
    assert_eq!(api.count_calls(|c| matches!(c, ApiCall::TrackingStop)), 1);

    // A second stop has nothing to stop.
    assert_matches!(
        ws.stop_tracking().await,
        Err(WorkspaceError::NotTracking)
    );
}

#[tokio::test]
async fn paused_session_allows_edits_and_pushes_them_on_resume() {
    let api = MockLabelApi::new(5);

    let ws = open_trackable(&api).await;
    ws.start_tracking().await.unwrap();
    ws.pause_tracking().await.unwrap();

    // Once the in-flight request settles the paused frame is editable.
    wait_for!(ws.mode().await.allows_box_editing());
    ws.set_box_label(0, "bird").await.unwrap();

    api.push_poll_response(frame_response(1, "11,21,31,41,bird\n"));
    api.push_poll_response(complete_response());
    ws.resume_tracking().await.unwrap();

    wait_for!(!ws.mode().await.is_tracking());

    // The continue after frame 1 pushed its applied text upstream.
    assert_matches!(
        api.calls()
            .into_iter()
            .find(|c| matches!(c, ApiCall::TrackingContinue { .. }))
            .unwrap(),
        ApiCall::TrackingContinue {
            retrieve_frame_number: 2,
            frame_number: 1,
            ..
        }
    );

    // The local edit on frame 0 stuck.
    ws.go_to_frame(0).await.ok();
    assert_eq!(ws.current_boxes().await[0].label, "bird");
}

#[tokio::test]
async fn heartbeat_fires_while_the_session_is_quiet() {
    let api = MockLabelApi::new(5);
    let mut config = common::fast_config();
    config.heartbeat_interval = std::time::Duration::from_millis(10);

    api.set_frame(0, "10,20,30,40,cat\n", true);
    let ws = LabelingWorkspace::open(api.clone(), api.video_uuid(), config)
        .await
        .unwrap();
    wait_for!(ws.frame_counts().await.all_frames_loaded);

    ws.start_tracking().await.unwrap();
    ws.pause_tracking().await.unwrap();

    wait_for!(api.count_calls(|c| matches!(c, ApiCall::TrackingHeartbeat)) >= 1);

    ws.stop_tracking().await.unwrap();
}

#[tokio::test]
async fn heartbeats_stop_when_the_session_completes() {
    let api = MockLabelApi::new(3);
    let mut config = common::fast_config();
    config.heartbeat_interval = std::time::Duration::from_millis(10);

    api.set_frame(0, "10,20,30,40,cat\n", true);
    let ws = LabelingWorkspace::open(api.clone(), api.video_uuid(), config)
        .await
        .unwrap();
    wait_for!(ws.frame_counts().await.all_frames_loaded);

    api.push_poll_response(frame_response(1, "11,21,31,41,cat\n"));
    api.push_poll_response(complete_response());
    ws.start_tracking().await.unwrap();
    wait_for!(!ws.mode().await.is_tracking());

    // Completion tore the session down; no keep-alives for a dead
    // tracker.
    let after_end = api.count_calls(|c| matches!(c, ApiCall::TrackingHeartbeat));
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(
        api.count_calls(|c| matches!(c, ApiCall::TrackingHeartbeat)),
        after_end
    );

    // And the leftover handle is not a stoppable session.
    assert_matches!(
        ws.stop_tracking().await,
        Err(WorkspaceError::NotTracking)
    );
}

#[tokio::test]
async fn pausing_before_the_first_response_keeps_the_frame_editable() {
    let api = MockLabelApi::new(5);
    // No scripted responses: every poll answers "not ready".

    let ws = open_trackable(&api).await;
    ws.start_tracking().await.unwrap();
    ws.pause_tracking().await.unwrap();

    wait_for!(ws.mode().await.allows_box_editing());
    ws.set_box_label(0, "bird").await.unwrap();
    assert_eq!(ws.current_boxes().await[0].label, "bird");

    ws.stop_tracking().await.unwrap();
}

#[tokio::test]
async fn paused_session_allows_navigation() {
    let api = MockLabelApi::new(5);
    let ws = open_trackable(&api).await;
    ws.start_tracking().await.unwrap();
    ws.pause_tracking().await.unwrap();
    wait_for!(ws.mode().await.allows_box_editing());

    ws.go_to_frame(2).await.unwrap();
    assert_eq!(ws.current_frame_number().await, 2);
    assert!(ws.mode().await.is_tracking());

    ws.stop_tracking().await.unwrap();
}

#[tokio::test]
async fn start_gates_reject_bad_preconditions() {
    // No boxes on the current frame.
    let api = MockLabelApi::new(5);
    let ws = LabelingWorkspace::open(api.clone(), api.video_uuid(), common::fast_config())
        .await
        .unwrap();
    wait_for!(ws.frame_counts().await.all_frames_loaded);
    assert_matches!(
        ws.start_tracking().await,
        Err(WorkspaceError::NotAllowed(_))
    );
    ws.shutdown();

    // Frames still loading.
    let api = MockLabelApi::new(5);
    api.set_frame(0, "10,20,30,40,cat\n", true);
    api.withhold_frame(3);
    let ws = LabelingWorkspace::open(api.clone(), api.video_uuid(), common::fast_config())
        .await
        .unwrap();
    assert_matches!(
        ws.start_tracking().await,
        Err(WorkspaceError::NotAllowed(_))
    );
    ws.shutdown();

    // Current frame is the last frame.
    let api = MockLabelApi::new(5);
    api.set_frame(4, "10,20,30,40,cat\n", true);
    let ws = LabelingWorkspace::open(api.clone(), api.video_uuid(), common::fast_config())
        .await
        .unwrap();
    wait_for!(ws.frame_counts().await.all_frames_loaded);
    ws.go_to_frame(4).await.unwrap();
    assert_matches!(
        ws.start_tracking().await,
        Err(WorkspaceError::NotAllowed(_))
    );
    ws.shutdown();
}

#[tokio::test]
async fn server_side_session_conflict_is_surfaced() {
    let api = MockLabelApi::new(5);
    api.set_tracking_in_progress(true);
    let ws = open_trackable(&api).await;

    assert_matches!(
        ws.start_tracking().await,
        Err(WorkspaceError::TrackingBusy)
    );
    ws.shutdown();
}

#[tokio::test]
async fn server_rejection_message_is_surfaced_verbatim() {
    let api = MockLabelApi::new(5);
    api.push_start_outcome(vlabel_client::api::TrackingStartOutcome::Rejected {
        message: "tracker pool exhausted".to_string(),
    });
    let ws = open_trackable(&api).await;

    assert_matches!(
        ws.start_tracking().await,
        Err(WorkspaceError::TrackingRejected(message)) if message == "tracker pool exhausted"
    );
    ws.shutdown();
}

#[tokio::test]
async fn editing_is_blocked_while_the_tracker_runs_unpaused() {
    let api = MockLabelApi::new(5);
    let ws = open_trackable(&api).await;
    ws.start_tracking().await.unwrap();

    assert_matches!(
        ws.set_box_label(0, "dog").await,
        Err(WorkspaceError::NotAllowed(_))
    );
    assert_matches!(
        ws.go_to_frame(2).await,
        Err(WorkspaceError::NotAllowed(_))
    );

    ws.stop_tracking().await.unwrap();
}
