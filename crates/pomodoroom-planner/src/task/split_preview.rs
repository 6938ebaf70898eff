//! Split preview for long tasks.
//!
//! Shows how a task of `total_minutes` would be broken into alternating
//! focus and break segments before the user commits to splitting it.

use serde::{Deserialize, Serialize};

/// Segment kind in a split preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Focus,
    Break,
}

/// Input for [`build_initial_split_preview`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitPreviewInput {
    pub title: String,
    pub total_minutes: u32,
    pub focus_block_minutes: u32,
    pub break_minutes: u32,
}

/// One segment of a split preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSegment {
    pub kind: SegmentKind,
    pub title: String,
    pub minutes: u32,
}

/// Split `total_minutes` into focus/break segments that sum to the total.
///
/// A residue no longer than one break is folded into the preceding focus
/// segment, so a preview never ends on a break.
pub fn build_initial_split_preview(input: &SplitPreviewInput) -> Vec<PreviewSegment> {
    let focus_block = input.focus_block_minutes.max(1);
    let break_len = input.break_minutes;
    let mut remaining = input.total_minutes;
    let mut segments = Vec::new();
    let mut focus_index = 0;

    while remaining > 0 {
        let mut focus = focus_block.min(remaining);
        remaining -= focus;
        if remaining > 0 && remaining <= break_len {
            focus += remaining;
            remaining = 0;
        }

        focus_index += 1;
        segments.push(PreviewSegment {
            kind: SegmentKind::Focus,
            title: format!("{} ({})", input.title, focus_index),
            minutes: focus,
        });

        if remaining > 0 && break_len > 0 {
            remaining -= break_len;
            segments.push(PreviewSegment {
                kind: SegmentKind::Break,
                title: "Break".to_string(),
                minutes: break_len,
            });
        }
    }

    if segments.len() == 1 {
        segments[0].title = input.title.clone();
    }

    segments
}
