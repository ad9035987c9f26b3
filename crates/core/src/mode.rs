//! Workspace mode state machine.
//!
//! The labeling workspace is always in exactly one [`WorkspaceMode`].
//! Every UI-enablement question is a pure function of the current mode
//! variant (plus, for navigation, the current frame's label
//! completeness), so enable/disable rules live here instead of being
//! re-derived from flag combinations at every call site.

use serde::Serialize;

/// Direction of timed playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayDirection {
    Forward,
    Reverse,
}

/// The mutually exclusive interaction mode of the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum WorkspaceMode {
    /// Idle: the user is viewing a frame and may edit or navigate.
    Browsing,
    /// Timed playback is auto-advancing frames.
    Playing { direction: PlayDirection },
    /// A new box is being dragged out from its anchor corner.
    DefiningBox,
    /// An existing box's corner is being dragged.
    ResizingBox,
    /// A tracking session is active.
    Tracking {
        /// User-requested pause: responses are applied but no new
        /// request auto-fires.
        paused: bool,
        /// A tracking request is in flight; edits must not occur.
        waiting_for_bboxes: bool,
    },
}

impl WorkspaceMode {
    /// True while any tracking session exists, paused or not.
    pub fn is_tracking(&self) -> bool {
        matches!(self, WorkspaceMode::Tracking { .. })
    }

    /// True while playback is auto-advancing.
    pub fn is_playing(&self) -> bool {
        matches!(self, WorkspaceMode::Playing { .. })
    }

    /// May the user start drawing or resizing a box?
    ///
    /// Editing is blocked during playback and while an unpaused tracker
    /// (or an in-flight tracking request) owns the current frame's boxes.
    pub fn allows_box_editing(&self) -> bool {
        match self {
            WorkspaceMode::Browsing => true,
            WorkspaceMode::Playing { .. } => false,
            WorkspaceMode::DefiningBox | WorkspaceMode::ResizingBox => false,
            WorkspaceMode::Tracking {
                paused,
                waiting_for_bboxes,
            } => *paused && !waiting_for_bboxes,
        }
    }

    /// May the user navigate to another frame?
    ///
    /// The missing-label gate takes priority over everything else: with
    /// an unlabeled box on the current frame all destructive navigation
    /// stays disabled regardless of mode.  A paused tracking session
    /// with no request in flight is as navigable as browsing; the
    /// session resumes from its own last applied frame, not the view.
    pub fn allows_navigation(&self, labels_complete: bool) -> bool {
        if !labels_complete {
            return false;
        }
        matches!(
            self,
            WorkspaceMode::Browsing
                | WorkspaceMode::Tracking {
                    paused: true,
                    waiting_for_bboxes: false,
                }
        )
    }

    /// May playback be started?
    pub fn allows_play(&self, labels_complete: bool) -> bool {
        labels_complete && matches!(self, WorkspaceMode::Browsing)
    }

    /// May a tracking session be started?  (Mode gate only -- the
    /// workspace also checks the server flag, load completeness, and the
    /// current frame's boxes.)
    pub fn allows_tracking_start(&self, labels_complete: bool) -> bool {
        labels_complete && matches!(self, WorkspaceMode::Browsing)
    }
}
