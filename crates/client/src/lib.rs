//! HTTP client layer for the vlabel backend.
//!
//! Defines the [`api::LabelApi`] trait covering every backend interface
//! the workspace consumes (frame fetch/save, image retrieval, and the
//! tracking sub-protocol), the reqwest implementation
//! [`http::HttpLabelApi`], and the bounded exponential-backoff retry
//! helper shared by all read paths.

pub mod api;
pub mod http;
pub mod retry;
