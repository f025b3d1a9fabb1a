//! Event system: input, key bindings, host notifications.

pub mod binding;
pub mod input;
pub mod queue;

pub use binding::{KeyBindingRegistry, NavigationCommand, BUTTON_COUNT};
pub use input::{
    key_from_crossterm, try_from_crossterm, InputEvent, Key, KeyEvent, Modifiers, MouseAction,
    MouseBtn, MouseEvent,
};
pub use queue::{EventQueue, UiEvent};
