//! Per-frame state store and incremental aggregate bookkeeping.
//!
//! [`FrameStore`] holds one [`FrameRecord`] slot per frame of a video,
//! filled in asynchronously and out of order as paged fetches complete.
//! It also maintains the ignored / unlabeled frame aggregates (counts
//! and min/max bounds) incrementally: videos run to thousands of frames,
//! and the bounds drive navigation buttons that re-evaluate on every
//! edit, so recomputing from scratch per change is off the table.
//!
//! Every mutation path (initial load, local edit, include-flag toggle,
//! tracker update) funnels flag changes through `update_frame_counts`,
//! the single choke point that keeps counts and bounds from drifting.
//!
//! Polarity: `include_frame_in_dataset == false` means *ignored*
//! (excluded from dataset production); an empty `bboxes_text` means
//! *unlabeled* (a negative example).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bbox::BBox;
use crate::bboxes_text::parse_bboxes;
use crate::error::CoreError;
use crate::types::FrameNumber;

// ---------------------------------------------------------------------------
// Server-mirrored entities
// ---------------------------------------------------------------------------

/// Server-owned video record.  Immutable from the client's perspective
/// except for `tracking_in_progress`, which is refreshed by re-fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEntity {
    pub uuid: Uuid,
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
    pub fps: f64,
    /// Server-authoritative flag: another tracking session is active for
    /// this video (possibly from another tab or client).
    pub tracking_in_progress: bool,
}

/// Server-owned per-frame record, keyed by `(video_uuid, frame_number)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoFrameEntity {
    pub video_uuid: Uuid,
    pub frame_number: FrameNumber,
    /// Serialized box list; empty string means zero boxes.
    #[serde(default)]
    pub bboxes_text: String,
    pub include_frame_in_dataset: bool,
    /// Direct (e.g. signed cloud-storage) image URL, when the server
    /// supplies one; otherwise the same-origin fallback endpoint is used.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Decoded frame image.  The store treats this as an opaque handle; the
/// loader fills in dimensions at decode time.
#[derive(Debug, Clone)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// FrameRecord
// ---------------------------------------------------------------------------

/// Everything the client holds for one loaded frame.
///
/// Replaces the lockstep parallel arrays of the original client: entity,
/// parsed boxes, image, and derived flags live and die together.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub entity: VideoFrameEntity,
    /// Working copy of the frame's boxes.  May differ from
    /// `entity.bboxes_text` while an edit is unsaved.
    pub boxes: Vec<BBox>,
    pub image: Option<FrameImage>,
    /// Derived: `!entity.include_frame_in_dataset`.
    pub ignored: bool,
    /// Derived: `entity.bboxes_text` is empty.
    pub unlabeled: bool,
}

impl FrameRecord {
    /// True when every box on this frame has a non-empty label.
    /// (The missing-label navigation gate keys off this.)
    pub fn labels_complete(&self) -> bool {
        self.boxes.iter().all(|b| !b.label.is_empty())
    }
}

// ---------------------------------------------------------------------------
// FrameStore
// ---------------------------------------------------------------------------

/// Dense per-frame store plus incremental aggregates.
#[derive(Debug)]
pub struct FrameStore {
    records: Vec<Option<FrameRecord>>,
    loaded_count: usize,

    ignored_count: usize,
    min_ignored: Option<FrameNumber>,
    max_ignored: Option<FrameNumber>,

    unlabeled_count: usize,
    min_unlabeled: Option<FrameNumber>,
    max_unlabeled: Option<FrameNumber>,

    /// Latched when paged loading exhausts its retries.
    load_failed: bool,
}

impl FrameStore {
    pub fn new(frame_count: u32) -> Self {
        Self {
            records: (0..frame_count).map(|_| None).collect(),
            loaded_count: 0,
            ignored_count: 0,
            min_ignored: None,
            max_ignored: None,
            unlabeled_count: 0,
            min_unlabeled: None,
            max_unlabeled: None,
            load_failed: false,
        }
    }

    // ---- accessors ----

    pub fn frame_count(&self) -> u32 {
        self.records.len() as u32
    }

    pub fn loaded_frame_count(&self) -> usize {
        self.loaded_count
    }

    pub fn all_frames_loaded(&self) -> bool {
        self.loaded_count == self.records.len()
    }

    pub fn is_loaded(&self, frame: FrameNumber) -> bool {
        self.records
            .get(frame as usize)
            .is_some_and(|r| r.is_some())
    }

    pub fn record(&self, frame: FrameNumber) -> Option<&FrameRecord> {
        self.records.get(frame as usize)?.as_ref()
    }

    pub fn record_mut(&mut self, frame: FrameNumber) -> Option<&mut FrameRecord> {
        self.records.get_mut(frame as usize)?.as_mut()
    }

    pub fn ignored_frame_count(&self) -> usize {
        self.ignored_count
    }

    pub fn min_ignored_frame(&self) -> Option<FrameNumber> {
        self.min_ignored
    }

    pub fn max_ignored_frame(&self) -> Option<FrameNumber> {
        self.max_ignored
    }

    pub fn unlabeled_frame_count(&self) -> usize {
        self.unlabeled_count
    }

    pub fn min_unlabeled_frame(&self) -> Option<FrameNumber> {
        self.min_unlabeled
    }

    pub fn max_unlabeled_frame(&self) -> Option<FrameNumber> {
        self.max_unlabeled
    }

    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    pub fn mark_load_failed(&mut self) {
        self.load_failed = true;
    }

    // ---- mutation paths ----

    /// Merge a frame entity fetched from the server.
    ///
    /// Idempotent with respect to re-delivery: inserting the same entity
    /// twice leaves counts unchanged.  A re-insert of an already-loaded
    /// frame replaces the working boxes wholesale (navigation away and
    /// back reparses the server text) but keeps any decoded image.
    pub fn insert_entity(&mut self, entity: VideoFrameEntity) -> Result<(), CoreError> {
        let frame = entity.frame_number;
        if frame as usize >= self.records.len() {
            return Err(CoreError::FrameOutOfRange {
                frame,
                frame_count: self.frame_count(),
            });
        }

        let new_ignored = !entity.include_frame_in_dataset;
        let new_unlabeled = entity.bboxes_text.is_empty();

        let slot = &mut self.records[frame as usize];
        let (prev_ignored, prev_unlabeled) = match slot {
            Some(existing) => (existing.ignored, existing.unlabeled),
            None => {
                self.loaded_count += 1;
                (false, false)
            }
        };

        let image = slot.take().and_then(|r| r.image);
        let boxes = parse_bboxes(&entity.bboxes_text);
        *slot = Some(FrameRecord {
            entity,
            boxes,
            image,
            ignored: new_ignored,
            unlabeled: new_unlabeled,
        });

        self.update_frame_counts(frame, prev_ignored, new_ignored, prev_unlabeled, new_unlabeled);
        Ok(())
    }

    /// Commit a frame's serialized box text after a (possibly optimistic)
    /// save: mirrors the new server value and re-derives the unlabeled
    /// flag through the aggregate path.
    pub fn commit_bboxes_text(
        &mut self,
        frame: FrameNumber,
        text: &str,
    ) -> Result<(), CoreError> {
        let record = self
            .records
            .get_mut(frame as usize)
            .and_then(|r| r.as_mut())
            .ok_or(CoreError::FrameNotLoaded(frame))?;

        let prev_ignored = record.ignored;
        let prev_unlabeled = record.unlabeled;
        let new_unlabeled = text.is_empty();

        record.entity.bboxes_text = text.to_string();
        record.unlabeled = new_unlabeled;

        self.update_frame_counts(frame, prev_ignored, prev_ignored, prev_unlabeled, new_unlabeled);
        Ok(())
    }

    /// Apply tracker-supplied boxes to a frame: replaces the working
    /// boxes and mirrors the text, through the aggregate path.
    pub fn apply_tracked_bboxes(
        &mut self,
        frame: FrameNumber,
        text: &str,
    ) -> Result<(), CoreError> {
        {
            let record = self
                .records
                .get_mut(frame as usize)
                .and_then(|r| r.as_mut())
                .ok_or(CoreError::FrameNotLoaded(frame))?;
            record.boxes = parse_bboxes(text);
        }
        self.commit_bboxes_text(frame, text)
    }

    /// Flip a frame's include/ignore flag, through the aggregate path.
    pub fn set_include_flag(
        &mut self,
        frame: FrameNumber,
        include: bool,
    ) -> Result<(), CoreError> {
        let record = self
            .records
            .get_mut(frame as usize)
            .and_then(|r| r.as_mut())
            .ok_or(CoreError::FrameNotLoaded(frame))?;

        let prev_ignored = record.ignored;
        let prev_unlabeled = record.unlabeled;
        let new_ignored = !include;

        record.entity.include_frame_in_dataset = include;
        record.ignored = new_ignored;

        self.update_frame_counts(frame, prev_ignored, new_ignored, prev_unlabeled, prev_unlabeled);
        Ok(())
    }

    /// Attach a decoded image to a loaded frame.  Silently ignored when
    /// the entity has not arrived yet -- the image fetch is scheduled by
    /// the entity load, but a stale completion after a store reset must
    /// not fault.
    pub fn set_image(&mut self, frame: FrameNumber, image: FrameImage) {
        match self.records.get_mut(frame as usize).and_then(|r| r.as_mut()) {
            Some(record) => record.image = Some(image),
            None => {
                tracing::debug!(frame, "Dropping image for unloaded frame");
            }
        }
    }

    // ---- jump navigation ----

    /// First ignored frame strictly after `frame`, among loaded frames.
    pub fn next_ignored_after(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.scan_forward(frame, self.max_ignored?, |r| r.ignored)
    }

    /// Last ignored frame strictly before `frame`, among loaded frames.
    pub fn prev_ignored_before(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.scan_backward(frame, self.min_ignored?, |r| r.ignored)
    }

    /// First unlabeled frame strictly after `frame`, among loaded frames.
    pub fn next_unlabeled_after(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.scan_forward(frame, self.max_unlabeled?, |r| r.unlabeled)
    }

    /// Last unlabeled frame strictly before `frame`, among loaded frames.
    pub fn prev_unlabeled_before(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.scan_backward(frame, self.min_unlabeled?, |r| r.unlabeled)
    }

    fn scan_forward(
        &self,
        after: FrameNumber,
        bound: FrameNumber,
        flag: fn(&FrameRecord) -> bool,
    ) -> Option<FrameNumber> {
        (after + 1..=bound).find(|&f| self.record(f).is_some_and(flag))
    }

    fn scan_backward(
        &self,
        before: FrameNumber,
        bound: FrameNumber,
        flag: fn(&FrameRecord) -> bool,
    ) -> Option<FrameNumber> {
        // Decrementing scan: "previous" walks toward frame 0.
        (bound..before).rev().find(|&f| self.record(f).is_some_and(flag))
    }

    // ---- aggregate choke point ----

    /// Incrementally update counts and min/max bounds for one frame's
    /// flag changes.  Called by every mutation path.
    ///
    /// For each aggregate: adjust the counter by the flag diff, then
    /// repair the bounds -- a newly set flag just widens them; a cleared
    /// flag that was the current min (max) triggers a forward (backward)
    /// rescan over loaded frames, bounded by the surviving opposite bound.
    fn update_frame_counts(
        &mut self,
        frame: FrameNumber,
        prev_ignored: bool,
        new_ignored: bool,
        prev_unlabeled: bool,
        new_unlabeled: bool,
    ) {
        if prev_ignored != new_ignored {
            let (count, min, max) = Self::apply_flag_change(
                &self.records,
                frame,
                new_ignored,
                self.ignored_count,
                self.min_ignored,
                self.max_ignored,
                |r| r.ignored,
            );
            self.ignored_count = count;
            self.min_ignored = min;
            self.max_ignored = max;
        }

        if prev_unlabeled != new_unlabeled {
            let (count, min, max) = Self::apply_flag_change(
                &self.records,
                frame,
                new_unlabeled,
                self.unlabeled_count,
                self.min_unlabeled,
                self.max_unlabeled,
                |r| r.unlabeled,
            );
            self.unlabeled_count = count;
            self.min_unlabeled = min;
            self.max_unlabeled = max;
        }
    }

    fn apply_flag_change(
        records: &[Option<FrameRecord>],
        frame: FrameNumber,
        now_set: bool,
        count: usize,
        min: Option<FrameNumber>,
        max: Option<FrameNumber>,
        flag: fn(&FrameRecord) -> bool,
    ) -> (usize, Option<FrameNumber>, Option<FrameNumber>) {
        let lookup = |f: FrameNumber| {
            records[f as usize]
                .as_ref()
                .is_some_and(flag)
        };

        if now_set {
            let min = Some(min.map_or(frame, |m| m.min(frame)));
            let max = Some(max.map_or(frame, |m| m.max(frame)));
            return (count + 1, min, max);
        }

        let count = count - 1;
        if count == 0 {
            return (0, None, None);
        }

        let mut min = min;
        let mut max = max;

        if min == Some(frame) {
            // Rescan forward for the new minimum; count > 0 guarantees a
            // hit at or before the current max.
            let hi = max.unwrap_or(frame);
            min = (frame + 1..=hi).find(|&f| lookup(f));
        }
        if max == Some(frame) {
            let lo = min.unwrap_or(0);
            max = (lo..frame).rev().find(|&f| lookup(f));
        }

        (count, min, max)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
