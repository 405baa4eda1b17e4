//! Pointer and keyboard events, and keyboard chord matching.

use crate::canvas::BlockId;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };
}

/// A key press, as delivered by the host's document-level listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Key identifier (`"z"`, `"Delete"`, `"ArrowUp"`).
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }
}

/// What the host should do with a key event after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// A command ran: stop propagation and prevent the default action.
    Handled,
    /// No binding matched.
    Ignored,
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerTarget {
    Block(BlockId),
    Canvas,
}

/// Pointer event in canvas coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        target: PointerTarget,
        modifiers: Modifiers,
    },
    Move {
        position: Point,
        modifiers: Modifiers,
    },
    Up {
        position: Point,
    },
}

/// A normalized key combination.
///
/// `ctrl` and `meta` collapse into one flag so bindings work on every
/// platform. Displays as `ctrl+alt+shift+key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chord {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub key: String,
}

impl Chord {
    /// Chord for a key event.
    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            ctrl: event.modifiers.ctrl || event.modifiers.meta,
            alt: event.modifiers.alt,
            shift: event.modifiers.shift,
            key: normalize_key(&event.key),
        }
    }

    /// Parse a binding such as `"ctrl + shift + z"`.
    /// Whitespace and modifier order don't matter. Returns `None` without a key.
    pub fn parse(binding: &str) -> Option<Self> {
        let mut chord = Self {
            ctrl: false,
            alt: false,
            shift: false,
            key: String::new(),
        };
        for part in binding.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_lowercase().as_str() {
                "ctrl" | "control" | "meta" | "cmd" | "command" => chord.ctrl = true,
                "alt" | "option" => chord.alt = true,
                "shift" => chord.shift = true,
                _ => chord.key = normalize_key(part),
            }
        }
        if chord.key.is_empty() { None } else { Some(chord) }
    }

    /// Format for display (e.g., "Ctrl+Shift+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl".to_string());
        }
        if self.alt {
            parts.push("Alt".to_string());
        }
        if self.shift {
            parts.push("Shift".to_string());
        }
        parts.push(key_label(&self.key));
        parts.join("+")
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("ctrl+")?;
        }
        if self.alt {
            f.write_str("alt+")?;
        }
        if self.shift {
            f.write_str("shift+")?;
        }
        f.write_str(&self.key)
    }
}

/// Display label for a normalized key.
fn key_label(key: &str) -> String {
    let label = match key {
        "arrowup" => "Up",
        "arrowdown" => "Down",
        "arrowleft" => "Left",
        "arrowright" => "Right",
        "escape" => "Esc",
        "pageup" => "PageUp",
        "pagedown" => "PageDown",
        _ => {
            let mut chars = key.chars();
            return match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            };
        }
    };
    label.to_string()
}

fn normalize_key(key: &str) -> String {
    if key == " " {
        return "space".to_string();
    }
    let key = key.trim().to_lowercase();
    match key.as_str() {
        "up" => "arrowup".to_string(),
        "down" => "arrowdown".to_string(),
        "left" => "arrowleft".to_string(),
        "right" => "arrowright".to_string(),
        "del" => "delete".to_string(),
        "esc" => "escape".to_string(),
        _ => key,
    }
}
