//! Labeling workspace orchestration.
//!
//! [`workspace::LabelingWorkspace`] ties the pure core (frame store,
//! boxes, mode state machine) to the backend API: background frame
//! loading, frame navigation with autosave, the pointer-driven box
//! editing state machine, timed playback, and the tracking session
//! driver.  State changes are published on a broadcast channel of
//! [`events::WorkspaceEvent`]s; rendering layers subscribe instead of
//! being called into.

pub mod config;
pub mod error;
pub mod events;
pub mod loader;
pub mod tracking;
pub mod workspace;
