//! Scenario tests for frame loading: eager frame 0, paged background
//! loading, aggregate counts, and the terminal load-failure path.

#[macro_use]
mod common;

use common::{ApiCall, MockLabelApi};

use vlabel_workspace::events::WorkspaceEvent;
use vlabel_workspace::workspace::LabelingWorkspace;

#[tokio::test]
async fn open_loads_frame_zero_eagerly() {
    let api = MockLabelApi::new(12);
    api.set_frame(0, "10,20,30,40,cat\n", true);

    let ws = LabelingWorkspace::open(api.clone(), api.video_uuid(), common::fast_config())
        .await
        .unwrap();

    // Frame 0 is available before any background page lands.
    assert_eq!(ws.current_frame_number().await, 0);
    let boxes = ws.current_boxes().await;
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].label, "cat");

    ws.shutdown();
}

#[tokio::test]
async fn background_load_completes_and_counts_aggregate() {
    let api = MockLabelApi::new(12);
    // Two ignored frames and one labeled frame among the unlabeled rest.
    api.set_frame(3, "", false);
    api.set_frame(9, "", false);
    api.set_frame(5, "1,2,3,4,ball\n", true);

    let ws = LabelingWorkspace::open(api.clone(), api.video_uuid(), common::fast_config())
        .await
        .unwrap();

    wait_for!(ws.frame_counts().await.all_frames_loaded);

    let counts = ws.frame_counts().await;
    assert_eq!(counts.loaded_frame_count, 12);
    assert_eq!(counts.ignored_frame_count, 2);
    assert_eq!(counts.min_ignored_frame, Some(3));
    assert_eq!(counts.max_ignored_frame, Some(9));
    // All but frame 5 have empty box text.
    assert_eq!(counts.unlabeled_frame_count, 11);
    assert_eq!(counts.min_unlabeled_frame, Some(0));
    assert_eq!(counts.max_unlabeled_frame, Some(11));

    ws.shutdown();
}

#[tokio::test]
async fn pages_are_fetched_in_order() {
    let api = MockLabelApi::new(12);

    let ws = LabelingWorkspace::open(api.clone(), api.video_uuid(), common::fast_config())
        .await
        .unwrap();
    wait_for!(ws.frame_counts().await.all_frames_loaded);

    let pages: Vec<(u32, u32)> = api
        .calls()
        .iter()
        .filter_map(|c| match c {
            ApiCall::FetchFrames {
                min_frame,
                max_frame,
            } => Some((*min_frame, *max_frame)),
            _ => None,
        })
        .collect();
    // Eager frame 0 first, then page_size=5 windows over [1, 12).
    assert_eq!(pages, vec![(0, 1), (1, 6), (6, 11), (11, 12)]);

    ws.shutdown();
}

#[tokio::test]
async fn frame_images_load_and_decode() {
    let api = MockLabelApi::new(3);

    let ws = LabelingWorkspace::open(api.clone(), api.video_uuid(), common::fast_config())
        .await
        .unwrap();
    let mut events = ws.subscribe();
    wait_for!(ws.frame_counts().await.all_frames_loaded);

    // At least one image-loaded event arrives for the fixture PNG.
    let mut image_loaded = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, WorkspaceEvent::FrameImageLoaded { .. }) {
            image_loaded = true;
        }
    }
    if !image_loaded {
        wait_for!(matches!(
            events.recv().await,
            Ok(WorkspaceEvent::FrameImageLoaded { .. })
        ));
    }

    ws.shutdown();
}

#[tokio::test]
async fn exhausted_page_retries_latch_load_failure() {
    let api = MockLabelApi::new(12);
    api.fail_background_pages();

    let ws = LabelingWorkspace::open(api.clone(), api.video_uuid(), common::fast_config())
        .await
        .unwrap();
    let mut events = ws.subscribe();

    wait_for!(ws.load_failed().await);
    wait_for!(matches!(
        events.recv().await,
        Ok(WorkspaceEvent::LoadFailed { .. })
    ));

    // Frame 0 loaded eagerly and stays usable.
    let counts = ws.frame_counts().await;
    assert_eq!(counts.loaded_frame_count, 1);
    assert!(!counts.all_frames_loaded);

    // Paging stopped after the failed page's retry budget.
    let attempts = api.count_calls(|c| matches!(c, ApiCall::FetchFrames { min_frame, .. } if *min_frame == 1));
    assert_eq!(attempts, 3);

    ws.shutdown();
}
