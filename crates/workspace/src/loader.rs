//! Background frame loading.
//!
//! Frame entities for `[1, frame_count)` load in staggered pages so the
//! first screenful is interactive while the rest streams in.  Each
//! loaded entity schedules its own image fetch with independent
//! retries.  Exhausting the page retries latches the store's
//! load-failed flag and stops paging; already-loaded frames stay
//! usable.

use std::sync::Arc;

use vlabel_client::api::LabelApi;
use vlabel_client::retry::{retry_with_backoff, RetryError};
use vlabel_core::store::{FrameImage, VideoFrameEntity};
use vlabel_core::types::FrameNumber;

use crate::events::WorkspaceEvent;
use crate::workspace::Shared;

/// Spawn the paged background load of frames `[1, frame_count)`.
/// Frame 0 is fetched eagerly at open time and is not re-requested.
pub(crate) fn spawn_frame_loads(shared: Shared) {
    tokio::spawn(async move {
        let frame_count = shared.state.read().await.store.frame_count();
        if frame_count <= 1 {
            return;
        }

        let page_size = shared.config.page_size;
        let mut min_frame: FrameNumber = 1;
        while min_frame < frame_count {
            let max_frame = (min_frame + page_size).min(frame_count);
            if !load_page(&shared, min_frame, max_frame).await {
                return;
            }
            min_frame = max_frame;

            // Stagger pages so saves and navigation fetches interleave.
            tokio::select! {
                _ = shared.cancel.cancelled() => return,
                _ = tokio::time::sleep(shared.config.page_stagger) => {}
            }
        }
        tracing::info!(frame_count, "All frame entities loaded");
    });
}

/// Fetch one page with retries.  Returns false when paging should stop
/// (cancelled, or retries exhausted and the failure latched).
async fn load_page(shared: &Shared, min_frame: FrameNumber, max_frame: FrameNumber) -> bool {
    let video_uuid = shared.state.read().await.video.uuid;
    let api = Arc::clone(&shared.api);

    let result = retry_with_backoff(
        "fetch_frames",
        &shared.config.page_retry,
        &shared.cancel,
        move || {
            let api = Arc::clone(&api);
            async move { api.fetch_frames(video_uuid, min_frame, max_frame).await }
        },
    )
    .await;

    match result {
        Ok(page) => {
            for entity in page.video_frame_entities {
                ingest_entity(shared, entity).await;
            }
            true
        }
        Err(RetryError::Cancelled) => false,
        Err(e @ RetryError::Exhausted { .. }) => {
            tracing::error!(min_frame, max_frame, error = %e, "Frame page load failed");
            shared.state.write().await.store.mark_load_failed();
            shared.emit(WorkspaceEvent::LoadFailed {
                detail: e.to_string(),
            });
            false
        }
    }
}

/// Merge one frame entity into the store and fan out events.  Shared by
/// the paged loader, the eager frame-0 fetch, and push deliveries.
pub(crate) async fn ingest_entity(shared: &Shared, entity: VideoFrameEntity) {
    let frame = entity.frame_number;
    let image_url = entity.image_url.clone();

    let needs_image = {
        let mut state = shared.state.write().await;
        if let Err(e) = state.store.insert_entity(entity) {
            tracing::warn!(frame, error = %e, "Dropping frame entity");
            return;
        }
        state
            .store
            .record(frame)
            .map_or(false, |r| r.image.is_none())
    };

    shared.emit(WorkspaceEvent::FrameEntityLoaded {
        frame_number: frame,
    });
    if shared.state.read().await.current_frame == frame {
        shared.emit(WorkspaceEvent::RedrawNeeded {
            frame_number: frame,
        });
    }

    if needs_image {
        spawn_image_load(shared.clone(), frame, image_url);
    }
}

/// Fetch and decode one frame's image, with its own retry budget.
fn spawn_image_load(shared: Shared, frame: FrameNumber, image_url: Option<String>) {
    tokio::spawn(async move {
        let video_uuid = shared.state.read().await.video.uuid;
        let api = Arc::clone(&shared.api);

        let result = retry_with_backoff(
            "fetch_image",
            &shared.config.image_retry,
            &shared.cancel,
            move || {
                let api = Arc::clone(&api);
                let image_url = image_url.clone();
                async move {
                    match image_url {
                        Some(url) => api.fetch_image_direct(&url).await,
                        None => api.fetch_image(video_uuid, frame).await,
                    }
                }
            },
        )
        .await;

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(RetryError::Cancelled) => return,
            Err(e) => {
                // Entities without images are still editable; the image
                // failure is logged but does not latch the load flag.
                tracing::error!(frame, error = %e, "Frame image load failed");
                return;
            }
        };

        let image = match decode_image(&bytes) {
            Ok(image) => image,
            Err(e) => {
                tracing::error!(frame, error = %e, "Frame image decode failed");
                return;
            }
        };

        shared.state.write().await.store.set_image(frame, image);
        shared.emit(WorkspaceEvent::FrameImageLoaded {
            frame_number: frame,
        });
        if shared.state.read().await.current_frame == frame {
            shared.emit(WorkspaceEvent::RedrawNeeded {
                frame_number: frame,
            });
        }
    });
}

/// Decode fetched bytes into pixel data with known dimensions.
fn decode_image(bytes: &[u8]) -> Result<FrameImage, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    Ok(FrameImage {
        width: decoded.width(),
        height: decoded.height(),
        data: decoded.into_rgba8().into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // A 1x1 PNG generated by the image crate itself keeps the fixture
    // honest against the decoder.
    fn one_pixel_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        let img = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 0, 0, 255]));
        image::DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[test]
    fn decode_image_reports_dimensions() {
        let decoded = decode_image(&one_pixel_png()).unwrap();
        assert_eq!((decoded.width, decoded.height), (1, 1));
        assert_eq!(decoded.data.len(), 4);
    }

    #[test]
    fn decode_image_rejects_garbage() {
        assert!(decode_image(b"not an image").is_err());
    }
}
