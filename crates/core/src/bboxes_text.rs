//! The `bboxes_text` wire format.
//!
//! A frame's box list travels to and from the server as newline-separated
//! records of `x1,y1,x2,y2,label`.  The empty string denotes zero boxes
//! (an unlabeled / negative frame).  Parsing is lenient: blank lines are
//! skipped and malformed lines are logged and dropped rather than
//! aborting the whole parse, because a single bad record must not make an
//! entire frame unloadable.

use crate::bbox::BBox;

/// Serialize a box list to the wire text format.
///
/// Each record is terminated by `\n`; the empty list serializes to `""`.
pub fn serialize_bboxes(bboxes: &[BBox]) -> String {
    let mut out = String::new();
    for b in bboxes {
        out.push_str(&format!("{},{},{},{},{}\n", b.x1, b.y1, b.x2, b.y2, b.label));
    }
    out
}

/// Parse wire text into a box list.
///
/// Corners are normalized on construction, so a record with swapped
/// corners still yields a valid box.
pub fn parse_bboxes(text: &str) -> Vec<BBox> {
    let mut bboxes = Vec::new();

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 5 {
            tracing::warn!(line, field_count = fields.len(), "Dropping malformed bbox record");
            continue;
        }

        let coords: Option<Vec<i32>> = fields[..4].iter().map(|f| f.trim().parse().ok()).collect();
        match coords {
            Some(c) => bboxes.push(BBox::new(c[0], c[1], c[2], c[3], fields[4])),
            None => {
                tracing::warn!(line, "Dropping bbox record with non-integer coordinates");
            }
        }
    }

    bboxes
}
