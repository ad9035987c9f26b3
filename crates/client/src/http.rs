//! reqwest implementation of [`LabelApi`].
//!
//! One instance per backend origin.  Endpoints mirror the server's
//! REST-ish surface; non-2xx statuses become [`ApiError::Status`] with
//! the raw body preserved for debugging.

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use vlabel_core::store::VideoEntity;
use vlabel_core::types::FrameNumber;

use crate::api::{ApiError, FramePage, LabelApi, TrackingPollResponse, TrackingStartOutcome};

/// HTTP client for one vlabel backend.
pub struct HttpLabelApi {
    client: reqwest::Client,
    base_url: String,
}

/// Tracking-start response body: either a tracker UUID (accepted) or a
/// human-readable rejection message.
#[derive(Debug, Deserialize)]
struct TrackingStartResponse {
    #[serde(default)]
    tracker_uuid: Option<Uuid>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpLabelApi {
    /// Create a new API client.
    ///
    /// * `base_url` - backend origin, e.g. `http://host:8000`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling).
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code.  Returns the
    /// response unchanged on success, or an [`ApiError::Status`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl LabelApi for HttpLabelApi {
    async fn fetch_video(&self, video_uuid: Uuid) -> Result<VideoEntity, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/videos/{video_uuid}", self.base_url))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn fetch_frames(
        &self,
        video_uuid: Uuid,
        min_frame: FrameNumber,
        max_frame: FrameNumber,
    ) -> Result<FramePage, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/videos/{video_uuid}/frames", self.base_url))
            .query(&[
                ("min_frame_number", min_frame),
                ("max_frame_number", max_frame),
            ])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn save_bboxes(
        &self,
        video_uuid: Uuid,
        frame_number: FrameNumber,
        bboxes_text: &str,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({ "bboxes_text": bboxes_text });
        let response = self
            .client
            .post(format!(
                "{}/api/videos/{video_uuid}/frames/{frame_number}/bboxes",
                self.base_url
            ))
            .json(&body)
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn save_include_flag(
        &self,
        video_uuid: Uuid,
        frame_number: FrameNumber,
        include: bool,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({ "include_frame_in_dataset": include });
        let response = self
            .client
            .post(format!(
                "{}/api/videos/{video_uuid}/frames/{frame_number}/include",
                self.base_url
            ))
            .json(&body)
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn fetch_image_direct(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.client.get(url).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_image(
        &self,
        video_uuid: Uuid,
        frame_number: FrameNumber,
    ) -> Result<Vec<u8>, ApiError> {
        let response = self
            .client
            .get(format!(
                "{}/api/videos/{video_uuid}/frames/{frame_number}/image",
                self.base_url
            ))
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn tracking_start(
        &self,
        video_uuid: Uuid,
        init_frame_number: FrameNumber,
        init_bboxes_text: &str,
        tracker_name: &str,
        scale: f64,
    ) -> Result<TrackingStartOutcome, ApiError> {
        let body = serde_json::json!({
            "init_frame_number": init_frame_number,
            "init_bboxes_text": init_bboxes_text,
            "tracker_name": tracker_name,
            "scale": scale,
        });
        let response = self
            .client
            .post(format!(
                "{}/api/videos/{video_uuid}/tracking/start",
                self.base_url
            ))
            .json(&body)
            .send()
            .await?;

        let parsed: TrackingStartResponse = Self::parse_response(response).await?;
        match parsed.tracker_uuid {
            Some(tracker_uuid) => Ok(TrackingStartOutcome::Started { tracker_uuid }),
            None => Ok(TrackingStartOutcome::Rejected {
                message: parsed
                    .message
                    .unwrap_or_else(|| "Tracking start rejected".to_string()),
            }),
        }
    }

    async fn tracking_poll(
        &self,
        video_uuid: Uuid,
        tracker_uuid: Uuid,
        retrieve_frame_number: FrameNumber,
    ) -> Result<TrackingPollResponse, ApiError> {
        let body = serde_json::json!({ "retrieve_frame_number": retrieve_frame_number });
        let response = self
            .client
            .post(format!(
                "{}/api/videos/{video_uuid}/tracking/{tracker_uuid}/frames",
                self.base_url
            ))
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn tracking_continue(
        &self,
        video_uuid: Uuid,
        tracker_uuid: Uuid,
        retrieve_frame_number: FrameNumber,
        frame_number: FrameNumber,
        bboxes_text: &str,
    ) -> Result<TrackingPollResponse, ApiError> {
        let body = serde_json::json!({
            "retrieve_frame_number": retrieve_frame_number,
            "frame_number": frame_number,
            "bboxes_text": bboxes_text,
        });
        let response = self
            .client
            .post(format!(
                "{}/api/videos/{video_uuid}/tracking/{tracker_uuid}/frames",
                self.base_url
            ))
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn tracking_heartbeat(
        &self,
        video_uuid: Uuid,
        tracker_uuid: Uuid,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .post(format!(
                "{}/api/videos/{video_uuid}/tracking/{tracker_uuid}/heartbeat",
                self.base_url
            ))
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn tracking_stop(&self, video_uuid: Uuid, tracker_uuid: Uuid) -> Result<(), ApiError> {
        let response = self
            .client
            .post(format!(
                "{}/api/videos/{video_uuid}/tracking/{tracker_uuid}/stop",
                self.base_url
            ))
            .send()
            .await?;
        Self::check_status(response).await
    }
}
