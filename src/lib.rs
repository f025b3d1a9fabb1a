//! # schemata
//!
//! A schema-driven retained UI runtime with controller-style focus navigation.
//!
//! Widget types are authored once, compiled into a compact binary schema and
//! loaded at runtime without parsing. Nodes are instantiated from their type,
//! laid out into fixed boxes, proportional windows or paginated columns, and
//! addressed by up to twelve group buttons that zoom into a screen's
//! interactables.
//!
//! ## Core Systems
//!
//! - **[`codec`]**: Aligned serialization buffer, reader and relocatable hash maps
//! - **[`schema`]**: Type records, authoring model, runtime store and file formats
//! - **[`tree`]**: Node arena, slot storage, allocation, layout and drawing
//! - **[`focus`]**: Interactable grouping and the focus stack
//! - **[`event`]**: Input events, button bindings and the outgoing event queue
//! - **[`platform`]**: Render backend, text provider and file system traits
//! - **[`ui`]**: The runtime tying everything together
//! - **[`testing`]**: Headless pilot and recording backend
//! - **[`geometry`]**: Offset, Size and Region primitives

// Foundation
pub mod codec;
pub mod geometry;

// Schema and nodes
pub mod schema;
pub mod tree;

// Navigation and input
pub mod event;
pub mod focus;

// Host boundary
pub mod platform;

// Runtime
pub mod testing;
pub mod ui;

pub use geometry::{Offset, Region, Size};
pub use schema::{SchemaDefinition, SchemaStore, TypeDefinition, TypeId};
pub use tree::{BehaviorFlags, NodeClass, NodeId};
pub use ui::{Ui, UiConfig};
