//! Undoable canvas operations.
//!
//! Every command records full copies of the block list (or the whole canvas
//! model) before and after it runs; undo and redo swap those copies back in
//! through the [`ModelHandle`].

use crate::canvas::{Block, CanvasModel, ModelHandle, ModelResult};
use crate::event::{DragSignals, ListenerId};
use crate::history::{Command, CommandManager, Execution, Teardown, Trigger};
use crate::input::{KeyEvent, KeyOutcome};
use std::cell::RefCell;
use std::rc::Rc;

pub const DELETE: &str = "delete";
pub const DRAG: &str = "drag";
pub const CLEAR: &str = "clear";
pub const PLACE_TOP: &str = "placeTop";
pub const PLACE_BOTTOM: &str = "placeBottom";
pub const UPDATE_BLOCK: &str = "updateBlock";
pub const UPDATE_CANVAS: &str = "updateCanvas";

/// Arguments passed along with a dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CommandPayload {
    #[default]
    None,
    /// Replace `old_block` with `new_block`.
    UpdateBlock { new_block: Block, old_block: Block },
    /// Replace the whole canvas model.
    Canvas(CanvasModel),
}

/// Undo/redo pair swapping between two block lists.
fn swap_blocks(before: Vec<Block>, after: Vec<Block>) -> Execution<ModelHandle> {
    Execution::reversible(
        move |model: &mut ModelHandle| {
            model.update_blocks(before.clone());
        },
        move |model: &mut ModelHandle| {
            model.update_blocks(after.clone());
        },
    )
}

fn current_blocks(model: &ModelHandle) -> Vec<Block> {
    model.borrow().blocks.clone()
}

/// Remove every focused block.
struct DeleteCommand;

impl Command<ModelHandle, CommandPayload> for DeleteCommand {
    fn name(&self) -> &str {
        DELETE
    }

    fn keyboard(&self) -> &[&'static str] {
        &["delete", "ctrl + d"]
    }

    fn execute(&mut self, model: &mut ModelHandle, _payload: CommandPayload) -> Execution<ModelHandle> {
        let before = current_blocks(model);
        let after = model.borrow().unfocused().cloned().collect();
        swap_blocks(before, after)
    }
}

#[derive(Debug, Default)]
struct DragData {
    before: Option<Vec<Block>>,
}

/// Collapses a whole drag gesture into one history entry.
///
/// `start` captures the blocks before the first move; `end` asks the manager
/// to dispatch this command, which pairs that capture with the live blocks.
struct DragCommand {
    signals: Rc<DragSignals>,
    data: Rc<RefCell<DragData>>,
}

impl Command<ModelHandle, CommandPayload> for DragCommand {
    fn name(&self) -> &str {
        DRAG
    }

    fn init(&mut self, model: &mut ModelHandle, trigger: &Trigger) -> Option<Teardown<ModelHandle>> {
        let start_model = model.clone();
        let data = Rc::clone(&self.data);
        let start: ListenerId = self.signals.start.on(move |_| {
            data.borrow_mut().before = Some(current_blocks(&start_model));
        });

        let trigger = trigger.clone();
        let end = self.signals.end.on(move |_| trigger.request(DRAG));

        let signals = Rc::clone(&self.signals);
        Some(Box::new(move |_: &mut ModelHandle| {
            signals.start.off(start);
            signals.end.off(end);
        }))
    }

    fn execute(&mut self, model: &mut ModelHandle, _payload: CommandPayload) -> Execution<ModelHandle> {
        let after = current_blocks(model);
        let before = self.data.borrow_mut().before.take().unwrap_or_else(|| {
            log::debug!("Drag recorded without a start snapshot");
            after.clone()
        });
        swap_blocks(before, after)
    }
}

/// Remove every block.
struct ClearCommand;

impl Command<ModelHandle, CommandPayload> for ClearCommand {
    fn name(&self) -> &str {
        CLEAR
    }

    fn execute(&mut self, model: &mut ModelHandle, _payload: CommandPayload) -> Execution<ModelHandle> {
        swap_blocks(current_blocks(model), Vec::new())
    }
}

/// Raise focused blocks above every unfocused one.
struct PlaceTopCommand;

impl Command<ModelHandle, CommandPayload> for PlaceTopCommand {
    fn name(&self) -> &str {
        PLACE_TOP
    }

    fn keyboard(&self) -> &[&'static str] {
        &["ctrl + up"]
    }

    fn execute(&mut self, model: &mut ModelHandle, _payload: CommandPayload) -> Execution<ModelHandle> {
        let before = current_blocks(model);
        let mut after = before.clone();
        let max = after
            .iter()
            .filter(|b| !b.focus)
            .fold(0, |max, b| max.max(b.z_index));
        for block in after.iter_mut().filter(|b| b.focus) {
            block.z_index = max.saturating_add(1);
        }
        swap_blocks(before, after)
    }
}

/// Lower focused blocks beneath every unfocused one, keeping indices
/// non-negative.
struct PlaceBottomCommand;

impl Command<ModelHandle, CommandPayload> for PlaceBottomCommand {
    fn name(&self) -> &str {
        PLACE_BOTTOM
    }

    fn keyboard(&self) -> &[&'static str] {
        &["ctrl + down"]
    }

    fn execute(&mut self, model: &mut ModelHandle, _payload: CommandPayload) -> Execution<ModelHandle> {
        let before = current_blocks(model);
        let mut after = before.clone();
        let min = after.iter().filter(|b| !b.focus).map(|b| b.z_index).min();

        let floor = match min {
            Some(min) if min < 1 => {
                let deficit = 1i64.saturating_sub(min);
                for block in after.iter_mut().filter(|b| !b.focus) {
                    block.z_index = block.z_index.saturating_add(deficit).max(1);
                }
                0
            }
            Some(min) => min - 1,
            None => 0,
        };
        for block in after.iter_mut().filter(|b| b.focus) {
            block.z_index = floor;
        }
        swap_blocks(before, after)
    }
}

/// Replace one block, matched by id.
struct UpdateBlockCommand;

impl Command<ModelHandle, CommandPayload> for UpdateBlockCommand {
    fn name(&self) -> &str {
        UPDATE_BLOCK
    }

    fn execute(&mut self, model: &mut ModelHandle, payload: CommandPayload) -> Execution<ModelHandle> {
        let before = current_blocks(model);
        let mut after = before.clone();
        match payload {
            CommandPayload::UpdateBlock { new_block, old_block } => {
                match after.iter().position(|b| b.id == old_block.id) {
                    Some(idx) => after[idx] = new_block,
                    None => log::debug!("Block {} no longer exists, update skipped", old_block.id),
                }
            }
            other => log::warn!("updateBlock dispatched with {:?}", other),
        }
        swap_blocks(before, after)
    }
}

/// Replace the whole canvas model, surface size included.
struct UpdateCanvasCommand;

impl Command<ModelHandle, CommandPayload> for UpdateCanvasCommand {
    fn name(&self) -> &str {
        UPDATE_CANVAS
    }

    fn execute(&mut self, model: &mut ModelHandle, payload: CommandPayload) -> Execution<ModelHandle> {
        let before = model.get();
        let after = match payload {
            CommandPayload::Canvas(value) => value,
            other => {
                log::warn!("updateCanvas dispatched with {:?}", other);
                before.clone()
            }
        };
        Execution::reversible(
            move |model: &mut ModelHandle| {
                model.set(before.clone());
            },
            move |model: &mut ModelHandle| {
                model.set(after.clone());
            },
        )
    }
}

/// The canvas command set bound to one model.
///
/// Exposes a method per command for toolbar and menu wiring; keyboard
/// shortcuts go through [`CanvasCommands::handle_key`].
#[derive(Debug)]
pub struct CanvasCommands {
    manager: CommandManager<ModelHandle, CommandPayload>,
    model: ModelHandle,
}

impl CanvasCommands {
    /// Register every canvas command and start listening for keys.
    pub fn new(model: ModelHandle, signals: Rc<DragSignals>) -> Self {
        let mut manager = CommandManager::new();
        let mut ctx = model.clone();
        let commands: Vec<Box<dyn Command<ModelHandle, CommandPayload>>> = vec![
            Box::new(DeleteCommand),
            Box::new(DragCommand {
                signals,
                data: Rc::new(RefCell::new(DragData::default())),
            }),
            Box::new(ClearCommand),
            Box::new(PlaceTopCommand),
            Box::new(PlaceBottomCommand),
            Box::new(UpdateBlockCommand),
            Box::new(UpdateCanvasCommand),
        ];
        for command in commands {
            manager.register(command, &mut ctx);
        }
        manager.init();
        Self { manager, model }
    }

    /// Dispatch by name. Returns false for unknown commands.
    pub fn dispatch(&mut self, name: &str, payload: CommandPayload) -> bool {
        let mut model = self.model.clone();
        self.manager.dispatch(name, &mut model, payload)
    }

    pub fn undo(&mut self) -> bool {
        let mut model = self.model.clone();
        self.manager.undo(&mut model)
    }

    pub fn redo(&mut self) -> bool {
        let mut model = self.model.clone();
        self.manager.redo(&mut model)
    }

    pub fn delete(&mut self) -> bool {
        self.dispatch(DELETE, CommandPayload::None)
    }

    /// Record the blocks' current positions against the last drag-start
    /// snapshot.
    pub fn drag(&mut self) -> bool {
        self.dispatch(DRAG, CommandPayload::None)
    }

    pub fn clear(&mut self) -> bool {
        self.dispatch(CLEAR, CommandPayload::None)
    }

    pub fn place_top(&mut self) -> bool {
        self.dispatch(PLACE_TOP, CommandPayload::None)
    }

    pub fn place_bottom(&mut self) -> bool {
        self.dispatch(PLACE_BOTTOM, CommandPayload::None)
    }

    pub fn update_block(&mut self, new_block: Block, old_block: Block) -> bool {
        self.dispatch(UPDATE_BLOCK, CommandPayload::UpdateBlock { new_block, old_block })
    }

    pub fn update_canvas(&mut self, value: CanvasModel) -> bool {
        self.dispatch(UPDATE_CANVAS, CommandPayload::Canvas(value))
    }

    /// Replace the model with one parsed from JSON.
    ///
    /// Invalid input leaves both the model and the history untouched.
    pub fn import_json(&mut self, text: &str) -> ModelResult<()> {
        match CanvasModel::from_json(text) {
            Ok(value) => {
                log::info!("Importing canvas with {} blocks", value.len());
                self.update_canvas(value);
                Ok(())
            }
            Err(e) => {
                log::warn!("Import failed, model unchanged: {}", e);
                Err(e)
            }
        }
    }

    /// The current model as pretty-printed JSON.
    pub fn export_json(&self) -> ModelResult<String> {
        Ok(self.model.borrow().to_json()?)
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> KeyOutcome {
        let mut model = self.model.clone();
        self.manager.handle_key(&mut model, event)
    }

    /// Dispatch commands requested by drag signals.
    pub fn run_pending(&mut self) -> usize {
        let mut model = self.model.clone();
        self.manager.run_pending(&mut model)
    }

    pub fn history(&self) -> &CommandManager<ModelHandle, CommandPayload> {
        &self.manager
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Stop key handling and detach from the drag signals.
    pub fn dispose(&mut self) {
        let mut model = self.model.clone();
        self.manager.dispose(&mut model);
    }
}
