//! Runtime node tree: arena, per-node storage, allocation, layout and drawing.
//!
//! Nodes live in a generational arena ([`NodeRepository`]) and refer to each
//! other by [`NodeId`]. The tree operations that need the schema, hooks or
//! focus state are implemented on [`Ui`](crate::ui::Ui) in
//! [`allocator`], [`layout`] and [`render`].

pub mod allocator;
pub mod layout;
mod node;
pub mod render;
mod repository;
pub mod slots;

pub use allocator::AllocError;
pub use layout::{pack_columns, pack_grid, PackItem, PageInfo, Packing, Placement};
pub use node::{
    AnchoredChild, BehaviorFlags, MonotypeState, Node, NodeClass, NodeId, NodeKind, PageControls,
    PagedState,
};
pub use render::{Postponed, ProbeResult};
pub use repository::NodeRepository;
pub use slots::{slot_offset, DataType, LocalStorage, SlotPayload, SlotValue};
