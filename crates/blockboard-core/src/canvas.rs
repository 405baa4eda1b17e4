//! Canvas model and the host-owned model accessor.

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use uuid::Uuid;

/// Default design surface width in pixels.
pub const DEFAULT_CANVAS_WIDTH: f64 = 800.0;
/// Default design surface height in pixels.
pub const DEFAULT_CANVAS_HEIGHT: f64 = 600.0;

/// Canvas model errors.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid canvas size: {width}x{height}")]
    InvalidContain { width: f64, height: f64 },
    #[error("Unknown component: {0}")]
    UnknownComponent(String),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Unique identifier for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(Uuid);

impl BlockId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A placed component instance on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block identity. Imported blocks without one get a fresh id.
    #[serde(default)]
    pub id: BlockId,
    pub top: f64,
    pub left: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    /// Key of the registered component this block renders.
    pub component_key: String,
    /// Stacking order, higher paints above.
    #[serde(default)]
    pub z_index: i64,
    /// Selected for multi-block operations.
    #[serde(default)]
    pub focus: bool,
    /// Component specific configuration.
    #[serde(default)]
    pub props: BTreeMap<String, serde_json::Value>,
    /// The drop point should become the block centre on first mount.
    #[serde(default)]
    pub needs_centering: bool,
    /// The user has resized the block.
    #[serde(default)]
    pub has_resize: bool,
}

impl Block {
    /// Create a block for a component dropped at `position`.
    pub fn new(component_key: impl Into<String>, position: Point) -> Self {
        Self {
            id: BlockId::new(),
            top: position.y,
            left: position.x,
            width: 0.0,
            height: 0.0,
            component_key: component_key.into(),
            z_index: 0,
            focus: false,
            props: BTreeMap::new(),
            needs_centering: true,
            has_resize: false,
        }
    }

    /// Top-left corner.
    pub fn position(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Move the top-left corner.
    pub fn set_position(&mut self, position: Point) {
        self.left = position.x;
        self.top = position.y;
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position(), self.size())
    }

    /// Record the measured size after the first mount and, if the block is
    /// still waiting for it, centre it on its drop point.
    pub fn center_on_mount(&mut self, size: Size) {
        self.width = size.width;
        self.height = size.height;
        if self.needs_centering {
            self.top -= size.height / 2.0;
            self.left -= size.width / 2.0;
            self.needs_centering = false;
        }
    }

    /// Resize the block and remember that the user did so.
    pub fn resize(&mut self, size: Size) {
        self.width = size.width;
        self.height = size.height;
        self.has_resize = true;
    }
}

/// Design surface dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contain {
    pub width: f64,
    pub height: f64,
}

impl Default for Contain {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

impl Contain {
    /// Reject empty, negative or non-finite surfaces.
    pub fn validate(&self) -> ModelResult<()> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(self.width) && valid(self.height) {
            Ok(())
        } else {
            Err(ModelError::InvalidContain {
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// The canvas: surface dimensions plus every placed block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasModel {
    pub contain: Contain,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl CanvasModel {
    /// Create an empty canvas of the given size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            contain: Contain { width, height },
            blocks: Vec::new(),
        }
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    /// Selected blocks, in list order.
    pub fn focused(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.focus)
    }

    /// Unselected blocks, in list order.
    pub fn unfocused(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| !b.focus)
    }

    /// Unfocus every block except `except`.
    pub fn clear_focus(&mut self, except: Option<BlockId>) {
        for block in &mut self.blocks {
            if Some(block.id) != except {
                block.focus = false;
            }
        }
    }

    /// Block indices back to front. Ties keep list order.
    pub fn paint_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.blocks.len()).collect();
        order.sort_by_key(|&i| self.blocks[i].z_index);
        order
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Serialize the model to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize and validate a model from JSON.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.contain.validate()?;
        Ok(model)
    }
}

type ChangeListener = Rc<dyn Fn(&CanvasModel)>;

struct ModelCell {
    value: RefCell<CanvasModel>,
    on_change: RefCell<Option<ChangeListener>>,
    /// In-place edits happened since the last notification.
    dirty: Cell<bool>,
}

/// Shared accessor over the canvas model.
///
/// The host owns the model; everything in this crate reads and writes it
/// through a handle. `set` forwards replacements to the host's change
/// listener, in-place edits through `borrow_mut` are reported with the next
/// `set`. The listener runs with no borrow held, so it may read or write
/// back through any clone of the handle.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Rc<ModelCell>,
}

impl ModelHandle {
    pub fn new(model: CanvasModel) -> Self {
        Self {
            inner: Rc::new(ModelCell {
                value: RefCell::new(model),
                on_change: RefCell::new(None),
                dirty: Cell::new(false),
            }),
        }
    }

    /// Install the host's change listener, replacing any previous one.
    pub fn on_change(&self, listener: impl Fn(&CanvasModel) + 'static) {
        *self.inner.on_change.borrow_mut() = Some(Rc::new(listener));
    }

    /// A copy of the current model.
    pub fn get(&self) -> CanvasModel {
        self.inner.value.borrow().clone()
    }

    pub fn borrow(&self) -> Ref<'_, CanvasModel> {
        self.inner.value.borrow()
    }

    /// Live in-place access, used for drag frames and focus changes.
    pub fn borrow_mut(&self) -> RefMut<'_, CanvasModel> {
        self.inner.dirty.set(true);
        self.inner.value.borrow_mut()
    }

    /// Replace the model. Returns true if the host was notified.
    pub fn set(&self, value: CanvasModel) -> bool {
        let changed = *self.inner.value.borrow() != value;
        if !changed && !self.inner.dirty.get() {
            return false;
        }
        *self.inner.value.borrow_mut() = value;
        self.inner.dirty.set(false);
        let listener = self.inner.on_change.borrow().clone();
        if let Some(listener) = listener {
            let snapshot = self.get();
            listener(&snapshot);
        }
        true
    }

    /// Replace the block list, keeping the surface dimensions.
    pub fn update_blocks(&self, blocks: Vec<Block>) -> bool {
        let contain = self.inner.value.borrow().contain;
        self.set(CanvasModel { contain, blocks })
    }

    /// Whether two handles point at the same model.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for ModelHandle {
    fn default() -> Self {
        Self::new(CanvasModel::default())
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("value", &self.inner.value.borrow())
            .field("dirty", &self.inner.dirty.get())
            .finish()
    }
}
