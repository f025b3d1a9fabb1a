//! Host-facing notifications.
//!
//! The runtime never plays sounds or reacts to focus itself; it queues
//! [`UiEvent`]s and the host drains them after each call.

use std::collections::VecDeque;

use crate::tree::NodeId;

/// Something the host may want to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// Play interaction sound `sound` (a schema sound id, never zero).
    PlaySound { sound: u16 },
    /// A paginated container switched to `page`.
    PageChanged { node: NodeId, page: usize },
    /// The focus stack top moved.
    FocusChanged {
        from: Option<NodeId>,
        to: Option<NodeId>,
    },
    /// A node received its primary activation.
    Activated { node: NodeId },
}

/// FIFO of pending [`UiEvent`]s.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<UiEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: UiEvent) {
        self.pending.push_back(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain(&mut self) -> Vec<UiEvent> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
