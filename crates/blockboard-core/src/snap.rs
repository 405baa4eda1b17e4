//! Alignment guides for moving blocks against their unselected neighbours.

use crate::canvas::Block;
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Distance in pixels within which a moving block snaps to a guide.
pub const SNAP_TOLERANCE: f64 = 5.0;

/// A candidate alignment on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentLine {
    /// Position of the moving block's top (or left) edge that triggers the snap.
    pub trigger: f64,
    /// Where the guide is drawn.
    pub display: f64,
}

impl AlignmentLine {
    pub fn new(trigger: f64, display: f64) -> Self {
        Self { trigger, display }
    }
}

/// Candidate alignments for both axes, in scan order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentTargets {
    /// Candidates for the moving block's `left`.
    pub x: Vec<AlignmentLine>,
    /// Candidates for the moving block's `top`.
    pub y: Vec<AlignmentLine>,
}

impl AlignmentTargets {
    pub fn len(&self) -> usize {
        self.x.len() + self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() && self.y.is_empty()
    }
}

/// Guides currently shown. `x` is a vertical line, `y` a horizontal one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkState {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl MarkState {
    pub fn clear(&mut self) {
        self.x = None;
        self.y = None;
    }

    pub fn is_visible(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }
}

/// Result of snapping a drag delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The delta to apply, possibly adjusted.
    pub delta: Vec2,
    /// Guides to show for this frame.
    pub mark: MarkState,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(delta: Vec2) -> Self {
        Self {
            delta,
            mark: MarkState::default(),
        }
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.mark.is_visible()
    }
}

/// Outcome of scanning one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSnap {
    pub delta: f64,
    pub guide: Option<f64>,
}

/// Precompute alignment candidates for a block of size `moving` against
/// every block in `others`.
///
/// Each neighbour contributes five candidates per axis: top to top, top to
/// bottom, bottom to top, bottom to bottom and centre to centre (likewise
/// for left/right).
pub fn compute_targets<'a>(
    moving: Size,
    others: impl IntoIterator<Item = &'a Block>,
) -> AlignmentTargets {
    let mut targets = AlignmentTargets::default();
    for other in others {
        push_axis(&mut targets.y, other.top, other.height, moving.height);
        push_axis(&mut targets.x, other.left, other.width, moving.width);
    }
    targets
}

fn push_axis(lines: &mut Vec<AlignmentLine>, start: f64, extent: f64, moving: f64) {
    let end = start + extent;
    let centre = start + extent / 2.0;
    lines.push(AlignmentLine::new(start, start));
    lines.push(AlignmentLine::new(end, end));
    lines.push(AlignmentLine::new(start - moving, start));
    lines.push(AlignmentLine::new(end - moving, end));
    lines.push(AlignmentLine::new(centre - moving / 2.0, centre));
}

/// Snap one axis. The first candidate whose trigger lies strictly within
/// `tolerance` of `start + delta` wins.
pub fn snap_axis(start: f64, delta: f64, candidates: &[AlignmentLine], tolerance: f64) -> AxisSnap {
    let proposed = start + delta;
    candidates
        .iter()
        .find(|line| (line.trigger - proposed).abs() < tolerance)
        .map(|line| AxisSnap {
            delta: line.trigger - start,
            guide: Some(line.display),
        })
        .unwrap_or(AxisSnap { delta, guide: None })
}

/// Snap a drag delta for a block whose top-left started at `start`.
/// Each axis is scanned independently.
pub fn snap_delta(start: Point, delta: Vec2, targets: &AlignmentTargets, tolerance: f64) -> SnapResult {
    let y = snap_axis(start.y, delta.y, &targets.y, tolerance);
    let x = snap_axis(start.x, delta.x, &targets.x, tolerance);
    SnapResult {
        delta: Vec2::new(x.delta, y.delta),
        mark: MarkState {
            x: x.guide,
            y: y.guide,
        },
    }
}

/// Constrain a delta to its dominant axis.
pub fn lock_axis(delta: Vec2) -> Vec2 {
    if delta.x.abs() > delta.y.abs() {
        Vec2::new(delta.x, 0.0)
    } else {
        Vec2::new(0.0, delta.y)
    }
}
