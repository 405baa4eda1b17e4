//! Blockboard Core Library
//!
//! Interaction and command engine for the Blockboard page builder: undo/redo
//! command history with keyboard bindings, canvas commands, and dragging
//! with alignment guides.

pub mod canvas;
pub mod commands;
pub mod drag;
pub mod editor;
pub mod event;
pub mod history;
pub mod input;
pub mod registry;
pub mod snap;

#[cfg(test)]
mod test_support;

pub use canvas::{Block, BlockId, CanvasModel, Contain, ModelError, ModelHandle, ModelResult};
pub use commands::{CanvasCommands, CommandPayload};
pub use drag::{DragEngine, DragOptions, DragState};
pub use editor::{Editor, EditorOptions};
pub use event::{DragSignals, EventEmitter, ListenerId};
pub use history::{Command, CommandManager, Execution, Trigger};
pub use input::{Chord, KeyEvent, KeyOutcome, Modifiers, PointerEvent, PointerTarget};
pub use registry::{ComponentDef, ComponentRegistry, PropKind, PropSpec};
pub use snap::{AlignmentLine, AlignmentTargets, MarkState, SNAP_TOLERANCE, SnapResult};
