//! Name → function registry for per-type callbacks.
//!
//! Schema types name their hooks by string. The host registers the functions
//! once at startup; [`SchemaStore`](super::SchemaStore) resolves each name the
//! first time a type's hook is needed and caches the pointer.

use std::collections::HashMap;
use std::fmt;

use crate::event::MouseEvent;
use crate::tree::NodeId;
use crate::ui::Ui;

/// Hook invoked with the node it fires for.
pub type NodeCallback = fn(&mut Ui, NodeId);

/// Mouse hook; returns `true` when it consumed the event.
pub type MouseCallback = fn(&mut Ui, NodeId, MouseEvent) -> bool;

/// No-op substituted for unresolved node hooks.
pub fn noop_node_callback(_: &mut Ui, _: NodeId) {}

/// No-op substituted for unresolved mouse hooks.
pub fn noop_mouse_callback(_: &mut Ui, _: NodeId, _: MouseEvent) -> bool {
    false
}

// ---------------------------------------------------------------------------
// CallbackKind
// ---------------------------------------------------------------------------

/// The named hooks a schema type can carry, in file order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallbackKind {
    Update,
    GainFocus,
    LoseFocus,
    Visible,
    Hide,
    Create,
    UserFnA,
    UserFnB,
    UserMouseFnA,
}

impl CallbackKind {
    pub const COUNT: usize = 9;

    pub const ALL: [CallbackKind; Self::COUNT] = [
        CallbackKind::Update,
        CallbackKind::GainFocus,
        CallbackKind::LoseFocus,
        CallbackKind::Visible,
        CallbackKind::Hide,
        CallbackKind::Create,
        CallbackKind::UserFnA,
        CallbackKind::UserFnB,
        CallbackKind::UserMouseFnA,
    ];

    /// Position in [`CallbackKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether hooks of this kind are [`MouseCallback`]s.
    pub fn is_mouse(self) -> bool {
        matches!(self, CallbackKind::UserMouseFnA)
    }
}

// ---------------------------------------------------------------------------
// FunctionRegistry
// ---------------------------------------------------------------------------

/// Read-only table of host functions, looked up by name.
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    node: HashMap<String, NodeCallback>,
    mouse: HashMap<String, MouseCallback>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node hook (builder).
    pub fn with_node_fn(mut self, name: impl Into<String>, f: NodeCallback) -> Self {
        self.node.insert(name.into(), f);
        self
    }

    /// Register a mouse hook (builder).
    pub fn with_mouse_fn(mut self, name: impl Into<String>, f: MouseCallback) -> Self {
        self.mouse.insert(name.into(), f);
        self
    }

    /// Look up a node hook by its UTF-8 name.
    pub fn node_fn(&self, name: &[u8]) -> Option<NodeCallback> {
        let name = std::str::from_utf8(name).ok()?;
        self.node.get(name).copied()
    }

    /// Look up a mouse hook by its UTF-8 name.
    pub fn mouse_fn(&self, name: &[u8]) -> Option<MouseCallback> {
        let name = std::str::from_utf8(name).ok()?;
        self.mouse.get(name).copied()
    }

    /// Total number of registered functions.
    pub fn len(&self) -> usize {
        self.node.len() + self.mouse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut node: Vec<&str> = self.node.keys().map(String::as_str).collect();
        let mut mouse: Vec<&str> = self.mouse.keys().map(String::as_str).collect();
        node.sort_unstable();
        mouse.sort_unstable();
        f.debug_struct("FunctionRegistry")
            .field("node", &node)
            .field("mouse", &mouse)
            .finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(_: &mut Ui, _: NodeId) {}

    #[test]
    fn lookup_by_name() {
        let registry = FunctionRegistry::new()
            .with_node_fn("mark", mark)
            .with_mouse_fn("eat", |_, _, _| true);
        assert!(registry.node_fn(b"mark").is_some());
        assert!(registry.node_fn(b"eat").is_none());
        assert!(registry.mouse_fn(b"eat").is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn invalid_utf8_names_do_not_resolve() {
        let registry = FunctionRegistry::new().with_node_fn("mark", mark);
        assert!(registry.node_fn(&[0xFF, 0xFE]).is_none());
    }

    #[test]
    fn callback_kind_indices_follow_file_order() {
        for (i, kind) in CallbackKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        assert!(CallbackKind::UserMouseFnA.is_mouse());
        assert!(!CallbackKind::Update.is_mouse());
    }
}
