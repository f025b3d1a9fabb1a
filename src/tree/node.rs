//! Node types: NodeId, BehaviorFlags, NodeClass, NodeKind, Node.

use std::mem::size_of;

use bitflags::bitflags;
use slotmap::new_key_type;

use super::slots::{LocalStorage, SlotValue};
use crate::geometry::Region;
use crate::schema::TypeId;

new_key_type! {
    /// Generational handle to a node in the [`NodeRepository`](super::NodeRepository).
    ///
    /// Releasing a node invalidates every copy of its id; a recycled instance
    /// comes back under a fresh id.
    pub struct NodeId;
}

bitflags! {
    /// Per-node behavior bits. Defaults come from the schema, the runtime may
    /// toggle them afterwards.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BehaviorFlags: u32 {
        /// Responds to the primary button.
        const CLICKABLE = 1 << 0;
        /// Responds to the secondary (info) button.
        const INFO = 1 << 1;
        /// Focus target: focus navigation can land on it.
        const FOCUS = 1 << 2;
        /// The focus walk descends through it to reach interactables below.
        const TRANSPARENT_TO_FOCUS = 1 << 3;
        const HIDDEN = 1 << 4;
        /// Rendered and probed after its siblings.
        const POPUP = 1 << 5;
        /// First item of a group the column packer keeps together.
        const START_GROUP = 1 << 6;
        const SCROLL_TARGET = 1 << 7;
        const MOUSE_TRANSPARENT = 1 << 8;
        /// Pagination arrow: previous page of the parent.
        const PAGE_BACK = 1 << 9;
        /// Pagination arrow: next page of the parent.
        const PAGE_FORWARD = 1 << 10;
        /// Set by the paginating parent on children outside the current page.
        const OFF_PAGE = 1 << 16;
    }
}

impl BehaviorFlags {
    /// Bits that make a node a member of the focus walk.
    pub const INTERACTABLE: BehaviorFlags = BehaviorFlags::CLICKABLE
        .union(BehaviorFlags::INFO)
        .union(BehaviorFlags::FOCUS);

    /// Whether the node is drawn and probed at all.
    pub fn is_shown(self) -> bool {
        !self.intersects(BehaviorFlags::HIDDEN | BehaviorFlags::OFF_PAGE)
    }

    pub fn is_interactable(self) -> bool {
        self.intersects(Self::INTERACTABLE)
    }
}

// ---------------------------------------------------------------------------
// NodeClass
// ---------------------------------------------------------------------------

/// Concrete node variant selected by a schema class id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    Container,
    ProportionalWindow,
    DynamicColumn,
    DynamicGrid,
    MonotypeColumn,
    Text,
    EditText,
    Icon,
    Image,
}

impl NodeClass {
    pub const ALL: [NodeClass; 9] = [
        NodeClass::Container,
        NodeClass::ProportionalWindow,
        NodeClass::DynamicColumn,
        NodeClass::DynamicGrid,
        NodeClass::MonotypeColumn,
        NodeClass::Text,
        NodeClass::EditText,
        NodeClass::Icon,
        NodeClass::Image,
    ];

    /// Class id as stored in the schema.
    pub fn id(self) -> u16 {
        self as u16
    }

    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    /// Whether instances page their children.
    pub fn is_paginated(self) -> bool {
        matches!(
            self,
            NodeClass::DynamicColumn | NodeClass::DynamicGrid | NodeClass::MonotypeColumn
        )
    }
}

// ---------------------------------------------------------------------------
// Variant payloads
// ---------------------------------------------------------------------------

/// Sub-controls created from a type's page-ui definitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageControls {
    pub back: Option<NodeId>,
    pub forward: Option<NodeId>,
    pub text: Option<NodeId>,
}

impl PageControls {
    pub fn contains(&self, id: NodeId) -> bool {
        [self.back, self.forward, self.text].contains(&Some(id))
    }
}

/// Result of the last packing pass of a paginated container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagedState {
    pub current_page: usize,
    pub page_count: usize,
    pub controls: PageControls,
}

/// A column of identical elements, instantiated one page at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonotypeState {
    pub paged: PagedState,
    pub element_count: usize,
    /// Live elements of the current page, with their element index.
    pub elements: Vec<(NodeId, usize)>,
}

/// A window child together with its index in the type's window-children list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchoredChild {
    pub node: NodeId,
    pub anchor: usize,
}

/// Variant-specific state of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Container,
    ProportionalWindow { anchored: Vec<AnchoredChild> },
    DynamicColumn(PagedState),
    DynamicGrid(PagedState),
    MonotypeColumn(MonotypeState),
    Text { content: Option<String> },
    EditText { buffer: String, cursor: usize },
    Icon,
    Image,
}

impl NodeKind {
    /// Fresh payload for `class`.
    pub fn new(class: NodeClass) -> Self {
        match class {
            NodeClass::Container => NodeKind::Container,
            NodeClass::ProportionalWindow => NodeKind::ProportionalWindow { anchored: Vec::new() },
            NodeClass::DynamicColumn => NodeKind::DynamicColumn(PagedState::default()),
            NodeClass::DynamicGrid => NodeKind::DynamicGrid(PagedState::default()),
            NodeClass::MonotypeColumn => NodeKind::MonotypeColumn(MonotypeState::default()),
            NodeClass::Text => NodeKind::Text { content: None },
            NodeClass::EditText => NodeKind::EditText { buffer: String::new(), cursor: 0 },
            NodeClass::Icon => NodeKind::Icon,
            NodeClass::Image => NodeKind::Image,
        }
    }

    pub fn class(&self) -> NodeClass {
        match self {
            NodeKind::Container => NodeClass::Container,
            NodeKind::ProportionalWindow { .. } => NodeClass::ProportionalWindow,
            NodeKind::DynamicColumn(_) => NodeClass::DynamicColumn,
            NodeKind::DynamicGrid(_) => NodeClass::DynamicGrid,
            NodeKind::MonotypeColumn(_) => NodeClass::MonotypeColumn,
            NodeKind::Text { .. } => NodeClass::Text,
            NodeKind::EditText { .. } => NodeClass::EditText,
            NodeKind::Icon => NodeClass::Icon,
            NodeKind::Image => NodeClass::Image,
        }
    }

    /// Pagination state, for the paginated variants.
    pub fn paged(&self) -> Option<&PagedState> {
        match self {
            NodeKind::DynamicColumn(p) | NodeKind::DynamicGrid(p) => Some(p),
            NodeKind::MonotypeColumn(m) => Some(&m.paged),
            _ => None,
        }
    }

    pub fn paged_mut(&mut self) -> Option<&mut PagedState> {
        match self {
            NodeKind::DynamicColumn(p) | NodeKind::DynamicGrid(p) => Some(p),
            NodeKind::MonotypeColumn(m) => Some(&mut m.paged),
            _ => None,
        }
    }

    /// Clear per-instance content while keeping structure (sub-controls and
    /// anchored children). A monotype column goes back to zero elements; the
    /// elements it still holds are released by its next layout.
    pub(crate) fn reset_content(&mut self) {
        match self {
            NodeKind::Text { content } => *content = None,
            NodeKind::EditText { buffer, cursor } => {
                buffer.clear();
                *cursor = 0;
            }
            NodeKind::MonotypeColumn(state) => state.element_count = 0,
            _ => {}
        }
        if let Some(paged) = self.paged_mut() {
            paged.current_page = 0;
        }
    }

    fn heap_size(&self) -> usize {
        match self {
            NodeKind::ProportionalWindow { anchored } => {
                anchored.capacity() * size_of::<AnchoredChild>()
            }
            NodeKind::MonotypeColumn(m) => m.elements.capacity() * size_of::<(NodeId, usize)>(),
            NodeKind::Text { content } => content.as_ref().map_or(0, String::capacity),
            NodeKind::EditText { buffer, .. } => buffer.capacity(),
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One widget instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub type_id: TypeId,
    pub flags: BehaviorFlags,
    /// Box relative to the parent's top-left corner.
    pub position: Region,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    pub locals: LocalStorage,
}

impl Node {
    pub fn new(type_id: TypeId, kind: NodeKind, locals: LocalStorage) -> Self {
        Self {
            parent: None,
            type_id,
            flags: BehaviorFlags::empty(),
            position: Region::EMPTY,
            children: Vec::new(),
            kind,
            locals,
        }
    }

    /// In-memory footprint: the node itself, its variable cells and owned buffers.
    pub fn size(&self) -> usize {
        size_of::<Node>()
            + self.locals.len() * size_of::<SlotValue>()
            + self.children.capacity() * size_of::<NodeId>()
            + self.kind.heap_size()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn get_child(&self, index: usize) -> Option<NodeId> {
        self.children.get(index).copied()
    }

    pub fn is_shown(&self) -> bool {
        self.flags.is_shown()
    }

    pub fn class(&self) -> NodeClass {
        self.kind.class()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_ids_round_trip() {
        for class in NodeClass::ALL {
            assert_eq!(NodeClass::from_id(class.id()), Some(class));
            assert_eq!(NodeKind::new(class).class(), class);
        }
        assert_eq!(NodeClass::from_id(9), None);
    }

    #[test]
    fn shown_ignores_unrelated_bits() {
        assert!(BehaviorFlags::CLICKABLE.is_shown());
        assert!(!BehaviorFlags::HIDDEN.is_shown());
        assert!(!(BehaviorFlags::OFF_PAGE | BehaviorFlags::FOCUS).is_shown());
    }

    #[test]
    fn interactable_bits() {
        assert!(BehaviorFlags::INFO.is_interactable());
        assert!(BehaviorFlags::FOCUS.is_interactable());
        assert!(!BehaviorFlags::TRANSPARENT_TO_FOCUS.is_interactable());
        assert!(!BehaviorFlags::POPUP.is_interactable());
    }

    #[test]
    fn size_grows_with_variable_storage() {
        let small = Node::new(0, NodeKind::Icon, LocalStorage::with_words(0));
        let large = Node::new(0, NodeKind::Icon, LocalStorage::with_words(4));
        assert_eq!(large.size() - small.size(), 4 * size_of::<SlotValue>());
    }

    #[test]
    fn reset_content_keeps_controls() {
        let mut kind = NodeKind::DynamicColumn(PagedState {
            current_page: 3,
            page_count: 5,
            controls: PageControls::default(),
        });
        kind.reset_content();
        assert_eq!(kind.paged().unwrap().current_page, 0);
        assert_eq!(kind.paged().unwrap().page_count, 5);

        let mut text = NodeKind::Text { content: Some("hi".into()) };
        text.reset_content();
        assert_eq!(text, NodeKind::Text { content: None });

        let mut column = NodeKind::MonotypeColumn(MonotypeState {
            paged: PagedState {
                current_page: 2,
                page_count: 4,
                controls: PageControls::default(),
            },
            element_count: 17,
            elements: Vec::new(),
        });
        column.reset_content();
        let NodeKind::MonotypeColumn(state) = &column else {
            unreachable!();
        };
        assert_eq!(state.element_count, 0);
        assert_eq!(state.paged.current_page, 0);
        assert_eq!(state.paged.page_count, 4);
    }
}
