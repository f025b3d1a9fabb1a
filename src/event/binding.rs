//! Key binding registry.
//!
//! [`KeyBindingRegistry`] maps key+modifier combinations to
//! [`NavigationCommand`]s. The `with_defaults()` constructor installs the
//! twelve group buttons on F1..F12, Escape for popping a focus level and
//! PageUp/PageDown for paging the focused container.

use std::collections::HashMap;

use super::input::{Key, KeyEvent, Modifiers};

/// Number of addressable group buttons.
pub const BUTTON_COUNT: usize = 12;

// ---------------------------------------------------------------------------
// NavigationCommand
// ---------------------------------------------------------------------------

/// What a bound key asks the focus navigator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationCommand {
    /// Group button `0..12`.
    Button(u8),
    /// Pop one focus level.
    Escape,
    PageForward,
    PageBack,
}

// ---------------------------------------------------------------------------
// KeyBindingRegistry
// ---------------------------------------------------------------------------

/// Registry of key bindings, mapping (Key, Modifiers) -> NavigationCommand.
#[derive(Debug, Clone, Default)]
pub struct KeyBindingRegistry {
    bindings: HashMap<(Key, Modifiers), NavigationCommand>,
}

impl KeyBindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard bindings.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for button in 0..BUTTON_COUNT as u8 {
            registry.bind(Key::F(button + 1), Modifiers::NONE, NavigationCommand::Button(button));
        }
        registry.bind(Key::Escape, Modifiers::NONE, NavigationCommand::Escape);
        registry.bind(Key::PageDown, Modifiers::NONE, NavigationCommand::PageForward);
        registry.bind(Key::PageUp, Modifiers::NONE, NavigationCommand::PageBack);
        registry
    }

    /// Register a binding, replacing any existing one for the combination.
    pub fn bind(&mut self, key: Key, modifiers: Modifiers, command: NavigationCommand) {
        self.bindings.insert((key, modifiers), command);
    }

    pub fn unbind(&mut self, key: Key, modifiers: Modifiers) -> Option<NavigationCommand> {
        self.bindings.remove(&(key, modifiers))
    }

    /// Exact key + modifiers lookup.
    pub fn resolve(&self, event: &KeyEvent) -> Option<NavigationCommand> {
        self.bindings.get(&(event.code, event.modifiers)).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
