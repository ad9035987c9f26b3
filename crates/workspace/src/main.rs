//! `vlabel-workspace` -- headless labeling workspace smoke runner.
//!
//! Opens a video against a live backend, waits for the frame load to
//! finish, and prints workspace events and frame counts.  Useful for
//! exercising the client stack against a real server without a UI.
//!
//! # Environment variables
//!
//! | Variable      | Required | Default | Description                        |
//! |---------------|----------|---------|------------------------------------|
//! | `BACKEND_URL` | yes      | --      | API base URL, e.g. `http://host:3000` |
//! | `VIDEO_UUID`  | yes      | --      | UUID of the video to open          |
//! | `RUN_SECS`    | no       | `30`    | Seconds to run before shutting down |

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use vlabel_client::http::HttpLabelApi;
use vlabel_workspace::config::WorkspaceConfig;
use vlabel_workspace::workspace::LabelingWorkspace;

const DEFAULT_RUN_SECS: u64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vlabel_workspace=info,vlabel_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_url = std::env::var("BACKEND_URL").unwrap_or_else(|_| {
        tracing::error!("BACKEND_URL environment variable is required");
        std::process::exit(1);
    });

    let video_uuid: Uuid = std::env::var("VIDEO_UUID")
        .unwrap_or_else(|_| {
            tracing::error!("VIDEO_UUID environment variable is required");
            std::process::exit(1);
        })
        .parse()
        .unwrap_or_else(|_| {
            tracing::error!("VIDEO_UUID must be a valid UUID");
            std::process::exit(1);
        });

    let run_secs: u64 = std::env::var("RUN_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_RUN_SECS);

    tracing::info!(%video_uuid, base_url = %base_url, "Opening workspace");

    let api = Arc::new(HttpLabelApi::new(base_url));
    let workspace =
        LabelingWorkspace::open(api, video_uuid, WorkspaceConfig::default()).await?;
    let mut events = workspace.subscribe();

    let deadline = tokio::time::sleep(Duration::from_secs(run_secs));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            event = events.recv() => match event {
                Ok(event) => tracing::info!(?event, "Workspace event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(missed = n, "Event subscriber lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }

        let counts = workspace.frame_counts().await;
        if counts.all_frames_loaded {
            tracing::info!(
                loaded = counts.loaded_frame_count,
                ignored = counts.ignored_frame_count,
                unlabeled = counts.unlabeled_frame_count,
                "All frames loaded",
            );
            break;
        }
    }

    workspace.shutdown();
    Ok(())
}
