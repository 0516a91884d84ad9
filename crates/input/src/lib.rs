//! Input layer: raw window events are folded into an [`InputState`] snapshot,
//! and consumers query logical [`Action`]s through [`KeyBindings`].
//!
//! # Invariants
//! - Consumers never see raw window events, only the snapshot.
//! - Cursor side effects (warp, grab) go through [`CursorControl`].

pub mod action;
pub mod cursor;
pub mod state;

pub use action::{Action, Binding, KeyBindings};
pub use cursor::{CursorControl, CursorMode, VirtualCursor};
pub use state::{InputState, Key, MouseButton};
