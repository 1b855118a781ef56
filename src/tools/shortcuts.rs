use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::input::Modifiers;
use crate::tools::ToolKind;

pub const ESCAPE: char = '\u{1b}';

/// One configured key-to-tool binding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutBinding {
    pub key: char,
    pub tool: ToolKind,
}

/// What a key press asks the editor to do.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyAction {
    SelectTool(ToolKind),
    Undo,
    Redo,
    Cancel,
}

/// Single-character tool shortcuts. Each key maps to exactly one tool.
#[derive(Clone, Debug, PartialEq)]
pub struct ShortcutMap {
    bindings: HashMap<char, ToolKind>,
}

impl Default for ShortcutMap {
    fn default() -> Self {
        let bindings = Self::default_bindings()
            .into_iter()
            .map(|b| (b.key, b.tool))
            .collect();
        Self { bindings }
    }
}

impl ShortcutMap {
    pub fn default_bindings() -> Vec<ShortcutBinding> {
        [
            ('b', ToolKind::Brush),
            ('e', ToolKind::Eraser),
            ('p', ToolKind::Pen),
            ('s', ToolKind::Clone),
            ('m', ToolKind::RectSelect),
            ('l', ToolKind::LassoSelect),
            ('g', ToolKind::Gradient),
            ('u', ToolKind::Shape),
            ('v', ToolKind::Move),
        ]
        .into_iter()
        .map(|(key, tool)| ShortcutBinding { key, tool })
        .collect()
    }

    /// Build from explicit bindings. A key bound to two different tools is a
    /// configuration error; an empty list falls back to the defaults.
    pub fn from_bindings(bindings: &[ShortcutBinding]) -> Result<Self> {
        if bindings.is_empty() {
            return Ok(Self::default());
        }
        let mut map: HashMap<char, ToolKind> = HashMap::new();
        for binding in bindings {
            let key = binding.key.to_ascii_lowercase();
            match map.get(&key) {
                Some(&first) if first != binding.tool => {
                    return Err(EngineError::ShortcutConflict {
                        key,
                        first,
                        second: binding.tool,
                    });
                }
                _ => {
                    map.insert(key, binding.tool);
                }
            }
        }
        Ok(Self { bindings: map })
    }

    pub fn tool_for(&self, key: char) -> Option<ToolKind> {
        self.bindings.get(&key.to_ascii_lowercase()).copied()
    }

    pub fn key_for(&self, tool: ToolKind) -> Option<char> {
        self.bindings
            .iter()
            .find(|(_, t)| **t == tool)
            .map(|(k, _)| *k)
    }

    /// Resolve a key press: Ctrl+Z undo, Ctrl+Shift+Z or Ctrl+Y redo,
    /// Escape cancels, plain keys pick tools.
    pub fn resolve(&self, key: char, modifiers: Modifiers) -> Option<KeyAction> {
        if key == ESCAPE {
            return Some(KeyAction::Cancel);
        }
        let lower = key.to_ascii_lowercase();
        if modifiers.ctrl {
            return match (lower, modifiers.shift) {
                ('z', false) => Some(KeyAction::Undo),
                ('z', true) | ('y', _) => Some(KeyAction::Redo),
                _ => None,
            };
        }
        if modifiers.alt {
            return None;
        }
        self.tool_for(lower).map(KeyAction::SelectTool)
    }
}
