use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Keys the demo reacts to. Window backends map their own key codes onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    Space,
    LeftControl,
    LeftShift,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Snapshot of keyboard and mouse state, updated from window events and read
/// once per frame.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys_held: HashSet<Key>,
    buttons_held: HashSet<MouseButton>,
    cursor: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&mut self, key: Key, pressed: bool) {
        if pressed {
            self.keys_held.insert(key);
        } else {
            self.keys_held.remove(&key);
        }
    }

    pub fn set_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            self.buttons_held.insert(button);
        } else {
            self.buttons_held.remove(&button);
        }
    }

    /// Record a cursor position reported by the window, in physical pixels.
    pub fn set_cursor_position(&mut self, position: Vec2) {
        self.cursor = position;
    }

    /// Record that the cursor was moved programmatically.
    ///
    /// Later deltas are measured from `position`, not from wherever the window
    /// last reported the cursor.
    pub fn cursor_warped(&mut self, position: Vec2) {
        tracing::trace!(x = position.x, y = position.y, "cursor warped");
        self.cursor = position;
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys_held.contains(&key)
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons_held.contains(&button)
    }

    pub fn cursor_position(&self) -> Vec2 {
        self.cursor
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.keys_held.clear();
        self.buttons_held.clear();
    }
}
