use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::utils::vector::Vec2;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn alt() -> Self {
        Self {
            alt: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// Normalized input, in canvas pixel coordinates.
///
/// Pressure is optional because mice don't report it; a missing value is
/// treated as full pressure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum InputEvent {
    PointerDown {
        pos: Vec2,
        #[serde(default)]
        pressure: Option<f32>,
        #[serde(default)]
        button: PointerButton,
        #[serde(default)]
        modifiers: Modifiers,
        #[serde(default)]
        timestamp: u64,
    },
    PointerMove {
        pos: Vec2,
        #[serde(default)]
        pressure: Option<f32>,
        #[serde(default)]
        modifiers: Modifiers,
        #[serde(default)]
        timestamp: u64,
    },
    PointerUp {
        pos: Vec2,
        #[serde(default)]
        button: PointerButton,
        #[serde(default)]
        modifiers: Modifiers,
        #[serde(default)]
        timestamp: u64,
    },
    PointerLeave {
        #[serde(default)]
        timestamp: u64,
    },
    LostCapture,
    Cancel,
    KeyDown {
        key: char,
        #[serde(default)]
        modifiers: Modifiers,
    },
}

impl InputEvent {
    pub fn down(x: f32, y: f32) -> Self {
        InputEvent::PointerDown {
            pos: Vec2::new(x, y),
            pressure: None,
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
            timestamp: 0,
        }
    }

    pub fn down_with(x: f32, y: f32, modifiers: Modifiers) -> Self {
        InputEvent::PointerDown {
            pos: Vec2::new(x, y),
            pressure: None,
            button: PointerButton::Primary,
            modifiers,
            timestamp: 0,
        }
    }

    pub fn moved(x: f32, y: f32) -> Self {
        InputEvent::PointerMove {
            pos: Vec2::new(x, y),
            pressure: None,
            modifiers: Modifiers::NONE,
            timestamp: 0,
        }
    }

    pub fn moved_with_pressure(x: f32, y: f32, pressure: f32) -> Self {
        InputEvent::PointerMove {
            pos: Vec2::new(x, y),
            pressure: Some(pressure),
            modifiers: Modifiers::NONE,
            timestamp: 0,
        }
    }

    pub fn up(x: f32, y: f32) -> Self {
        InputEvent::PointerUp {
            pos: Vec2::new(x, y),
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
            timestamp: 0,
        }
    }

    pub fn key(key: char) -> Self {
        InputEvent::KeyDown {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn key_with(key: char, modifiers: Modifiers) -> Self {
        InputEvent::KeyDown { key, modifiers }
    }
}

/// One pointer sample recorded by a stroke.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub pos: Vec2,
    /// 0..1
    pub pressure: f32,
    pub timestamp: u64,
}

impl Sample {
    pub fn new(pos: Vec2, pressure: Option<f32>, timestamp: u64) -> Self {
        Self {
            pos,
            pressure: pressure.unwrap_or(1.0).clamp(0.0, 1.0),
            timestamp,
        }
    }
}

/// FIFO of pending input, drained once per tick.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<InputEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take every queued event in arrival order.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        self.events.drain(..).collect()
    }
}
