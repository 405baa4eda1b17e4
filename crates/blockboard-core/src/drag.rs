//! Pointer-driven block dragging with alignment snapping.

use crate::canvas::{BlockId, CanvasModel, ModelHandle};
use crate::event::DragSignals;
use crate::input::Modifiers;
use crate::snap::{self, AlignmentTargets, MarkState, SNAP_TOLERANCE, SnapResult};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Drag behaviour settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragOptions {
    /// Snap distance in pixels.
    pub snap_tolerance: f64,
    /// Snap to neighbouring blocks.
    pub snap_enabled: bool,
    /// Shift constrains the drag to one axis.
    pub axis_lock: bool,
}

impl Default for DragOptions {
    fn default() -> Self {
        Self {
            snap_tolerance: SNAP_TOLERANCE,
            snap_enabled: true,
            axis_lock: true,
        }
    }
}

/// Per-gesture drag state.
#[derive(Debug, Clone)]
pub struct DragSession {
    /// Pointer position at pointer-down.
    pub start_point: Point,
    /// Current pointer position.
    pub current_point: Point,
    /// Top-left of the block under the pointer at pointer-down.
    pub start_position: Point,
    /// Top-left of every focused block at pointer-down.
    pub origins: Vec<(BlockId, Point)>,
    /// Alignment candidates against the unfocused blocks.
    pub targets: AlignmentTargets,
}

impl DragSession {
    /// Raw pointer delta since pointer-down.
    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }
}

/// Gesture state machine.
#[derive(Debug, Clone, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// Pointer is down on a focused block but hasn't moved yet.
    Armed(DragSession),
    /// At least one move happened in this gesture.
    Dragging(DragSession),
}

/// Moves focused blocks with the pointer and reports alignment guides.
///
/// Emits `signals.start` on the first move of a gesture and `signals.end`
/// on pointer-up after a gesture that moved, so listeners see exactly one
/// pair per gesture.
#[derive(Debug)]
pub struct DragEngine {
    state: DragState,
    mark: MarkState,
    options: DragOptions,
    signals: Rc<DragSignals>,
}

impl DragEngine {
    pub fn new(options: DragOptions, signals: Rc<DragSignals>) -> Self {
        Self {
            state: DragState::Idle,
            mark: MarkState::default(),
            options,
            signals,
        }
    }

    /// Pointer pressed on `primary`. Arms a gesture if the block is focused.
    ///
    /// A gesture still in progress (its pointer-up was lost) is ended first.
    pub fn pointer_down(&mut self, model: &CanvasModel, primary: BlockId, position: Point) -> bool {
        if self.is_dragging() {
            log::debug!("Pointer down during a drag, ending the previous gesture");
            self.pointer_up();
        }

        let Some(block) = model.block(primary).filter(|b| b.focus) else {
            self.state = DragState::Idle;
            return false;
        };

        let targets = if self.options.snap_enabled {
            snap::compute_targets(block.size(), model.unfocused())
        } else {
            AlignmentTargets::default()
        };
        let origins = model.focused().map(|b| (b.id, b.position())).collect::<Vec<_>>();
        log::debug!(
            "Drag armed on {} with {} focused blocks, {} guides",
            primary,
            origins.len(),
            targets.len()
        );

        self.state = DragState::Armed(DragSession {
            start_point: position,
            current_point: position,
            start_position: block.position(),
            origins,
            targets,
        });
        true
    }

    /// Pointer moved. Returns true if blocks were repositioned.
    pub fn pointer_move(&mut self, model: &ModelHandle, position: Point, modifiers: Modifiers) -> bool {
        let mut session = match std::mem::take(&mut self.state) {
            DragState::Idle => return false,
            DragState::Armed(session) => {
                // Listeners read the model, so this runs before any write
                self.signals.start.emit(&());
                session
            }
            DragState::Dragging(session) => session,
        };
        session.current_point = position;

        let mut delta = session.delta();
        if self.options.axis_lock && modifiers.shift {
            delta = snap::lock_axis(delta);
        }
        let result = if self.options.snap_enabled {
            snap::snap_delta(
                session.start_position,
                delta,
                &session.targets,
                self.options.snap_tolerance,
            )
        } else {
            SnapResult::none(delta)
        };
        self.mark = result.mark;

        {
            let mut model = model.borrow_mut();
            for (id, origin) in &session.origins {
                if let Some(block) = model.block_mut(*id) {
                    block.set_position(*origin + result.delta);
                }
            }
        }

        self.state = DragState::Dragging(session);
        true
    }

    /// Pointer released. Returns true if a gesture that moved has ended.
    pub fn pointer_up(&mut self) -> bool {
        self.mark.clear();
        match std::mem::take(&mut self.state) {
            DragState::Dragging(_) => {
                self.signals.end.emit(&());
                true
            }
            DragState::Armed(_) | DragState::Idle => false,
        }
    }

    /// A gesture is armed or in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Guides to draw for the current frame.
    pub fn mark(&self) -> MarkState {
        self.mark
    }

    pub fn options(&self) -> &DragOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: DragOptions) {
        self.options = options;
    }
}
