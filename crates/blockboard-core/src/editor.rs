//! Editor facade: wires pointer input, selection, dragging and commands to
//! one canvas model.

use crate::canvas::{Block, BlockId, CanvasModel, ModelError, ModelHandle, ModelResult};
use crate::commands::CanvasCommands;
use crate::drag::{DragEngine, DragOptions};
use crate::event::DragSignals;
use crate::input::{KeyEvent, KeyOutcome, Modifiers, PointerEvent, PointerTarget};
use crate::registry::ComponentRegistry;
use crate::snap::MarkState;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Editor settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorOptions {
    pub drag: DragOptions,
}

/// A canvas being edited.
#[derive(Debug)]
pub struct Editor {
    model: ModelHandle,
    signals: Rc<DragSignals>,
    commands: CanvasCommands,
    drag: DragEngine,
    registry: ComponentRegistry,
    last_focused: Option<BlockId>,
}

impl Editor {
    pub fn new(model: CanvasModel, registry: ComponentRegistry, options: EditorOptions) -> Self {
        Self::with_handle(ModelHandle::new(model), registry, options)
    }

    /// Edit a model the host already shares through a handle.
    pub fn with_handle(model: ModelHandle, registry: ComponentRegistry, options: EditorOptions) -> Self {
        let signals = Rc::new(DragSignals::new());
        let commands = CanvasCommands::new(model.clone(), Rc::clone(&signals));
        let drag = DragEngine::new(options.drag, Rc::clone(&signals));
        log::info!(
            "Editor ready: {} blocks, {} components",
            model.borrow().len(),
            registry.len()
        );
        Self {
            model,
            signals,
            commands,
            drag,
            registry,
            last_focused: None,
        }
    }

    /// Drop a registered component with its centre at `position`.
    ///
    /// Not recorded in the history. The block is centred once the host
    /// reports its size through [`Editor::mount_block`].
    pub fn drop_component(&mut self, key: &str, position: Point) -> ModelResult<BlockId> {
        let component = self
            .registry
            .get(key)
            .ok_or_else(|| ModelError::UnknownComponent(key.to_string()))?;
        let mut block = Block::new(key, position);
        block.width = component.default_size.width;
        block.height = component.default_size.height;
        block.props = component.default_props();
        let id = block.id;

        let mut value = self.model.get();
        value.blocks.push(block);
        self.model.set(value);
        log::debug!("Dropped {} at ({}, {})", key, position.x, position.y);
        Ok(id)
    }

    /// Record a block's rendered size, centring it on its drop point the
    /// first time. Returns false for unknown blocks.
    pub fn mount_block(&mut self, id: BlockId, size: Size) -> bool {
        let mut model = self.model.borrow_mut();
        let Some(block) = model.block_mut(id) else {
            return false;
        };
        block.center_on_mount(size);
        true
    }

    /// Pointer pressed on a block: update the selection and arm a drag.
    ///
    /// Shift toggles the block's focus; otherwise an unfocused block becomes
    /// the only focused one.
    pub fn pointer_down_block(&mut self, id: BlockId, position: Point, modifiers: Modifiers) -> bool {
        self.finish_interrupted_drag();
        {
            let mut model = self.model.borrow_mut();
            let Some(block) = model.block_mut(id) else {
                return false;
            };
            if modifiers.shift {
                block.focus = !block.focus;
            } else if !block.focus {
                block.focus = true;
                model.clear_focus(Some(id));
            }
        }

        let focused = self.model.borrow().block(id).is_some_and(|b| b.focus);
        if focused {
            self.last_focused = Some(id);
        }
        self.drag.pointer_down(&self.model.borrow(), id, position)
    }

    /// Pointer pressed on empty canvas: clear the selection.
    pub fn pointer_down_canvas(&mut self) {
        self.finish_interrupted_drag();
        self.model.borrow_mut().clear_focus(None);
        self.last_focused = None;
    }

    pub fn pointer_move(&mut self, position: Point, modifiers: Modifiers) -> bool {
        self.drag.pointer_move(&self.model, position, modifiers)
    }

    /// Record a gesture whose pointer-up was lost before the selection
    /// changes.
    fn finish_interrupted_drag(&mut self) {
        if self.drag.is_dragging() {
            self.drag.pointer_up();
            self.commands.run_pending();
        }
    }

    /// Pointer released. A drag that moved becomes one history entry.
    pub fn pointer_up(&mut self) -> bool {
        let ended = self.drag.pointer_up();
        self.commands.run_pending();
        ended
    }

    /// Route a pointer event to the matching handler.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) -> bool {
        match *event {
            PointerEvent::Down {
                position,
                target: PointerTarget::Block(id),
                modifiers,
            } => self.pointer_down_block(id, position, modifiers),
            PointerEvent::Down {
                target: PointerTarget::Canvas,
                ..
            } => {
                self.pointer_down_canvas();
                true
            }
            PointerEvent::Move { position, modifiers } => self.pointer_move(position, modifiers),
            PointerEvent::Up { .. } => self.pointer_up(),
        }
    }

    pub fn key_down(&mut self, event: &KeyEvent) -> KeyOutcome {
        self.commands.handle_key(event)
    }

    /// The most recently clicked block, if it is still focused.
    pub fn focused_block(&self) -> Option<Block> {
        let id = self.last_focused?;
        self.model.borrow().block(id).filter(|b| b.focus).cloned()
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn commands(&self) -> &CanvasCommands {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CanvasCommands {
        &mut self.commands
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn signals(&self) -> &Rc<DragSignals> {
        &self.signals
    }

    /// Alignment guides for the current drag frame.
    pub fn mark(&self) -> MarkState {
        self.drag.mark()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Detach key handling and drag listeners.
    pub fn dispose(&mut self) {
        self.commands.dispose();
        log::info!("Editor disposed");
    }
}
