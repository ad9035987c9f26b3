//! Pure domain logic for the vlabel video-labeling client.
//!
//! Everything in this crate is IO-free and rendering-free: geometry,
//! bounding boxes, the wire text format for box lists, the per-frame
//! store with its incremental aggregate bookkeeping, and the workspace
//! mode state machine.  The `client` and `workspace` crates layer
//! networking and orchestration on top.

pub mod bbox;
pub mod bboxes_text;
pub mod draw;
pub mod error;
pub mod geometry;
pub mod mode;
pub mod store;
pub mod types;
