use crate::state::{InputState, Key, MouseButton};
use serde::{Deserialize, Serialize};

/// A logical camera action.
///
/// The camera consumes actions, never raw keys, so bindings can be remapped
/// without touching camera code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MoveForward,
    MoveBackward,
    StrafeLeft,
    StrafeRight,
    Ascend,
    Descend,
    /// Speed modifier applied to all movement while held.
    Sprint,
    /// Mouse-look: the cursor is captured while this is held.
    Look,
}

/// A physical input an action can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    Key(Key),
    Mouse(MouseButton),
}

impl Binding {
    pub fn is_held(self, input: &InputState) -> bool {
        match self {
            Binding::Key(key) => input.is_key_down(key),
            Binding::Mouse(button) => input.is_button_down(button),
        }
    }
}

/// Action → binding table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub move_forward: Binding,
    pub move_backward: Binding,
    pub strafe_left: Binding,
    pub strafe_right: Binding,
    pub ascend: Binding,
    pub descend: Binding,
    pub sprint: Binding,
    pub look: Binding,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            move_forward: Binding::Key(Key::W),
            move_backward: Binding::Key(Key::S),
            strafe_left: Binding::Key(Key::A),
            strafe_right: Binding::Key(Key::D),
            ascend: Binding::Key(Key::Space),
            descend: Binding::Key(Key::LeftControl),
            sprint: Binding::Key(Key::LeftShift),
            look: Binding::Mouse(MouseButton::Left),
        }
    }
}

impl KeyBindings {
    pub fn binding(&self, action: Action) -> Binding {
        match action {
            Action::MoveForward => self.move_forward,
            Action::MoveBackward => self.move_backward,
            Action::StrafeLeft => self.strafe_left,
            Action::StrafeRight => self.strafe_right,
            Action::Ascend => self.ascend,
            Action::Descend => self.descend,
            Action::Sprint => self.sprint,
            Action::Look => self.look,
        }
    }

    /// Whether the input bound to `action` is currently held.
    pub fn is_active(&self, action: Action, input: &InputState) -> bool {
        self.binding(action).is_held(input)
    }
}
