//! Shared helpers for unit tests.

use crate::canvas::Block;
use kurbo::{Point, Size};

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A mounted block with the given geometry.
pub fn block_at(left: f64, top: f64, width: f64, height: f64) -> Block {
    let mut block = Block::new("button", Point::new(left, top));
    block.needs_centering = false;
    block.center_on_mount(Size::new(width, height));
    block
}

/// Same as `block_at`, already focused.
pub fn focused_at(left: f64, top: f64, width: f64, height: f64) -> Block {
    let mut block = block_at(left, top, width, height);
    block.focus = true;
    block
}
