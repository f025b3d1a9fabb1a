//! Widget type schema: wire records, authoring model, runtime store and file formats.
//!
//! Every widget type is addressed by a contiguous [`TypeId`]. Flat properties
//! live in per-type arrays; sparse overrides live in serialized hash maps that
//! [`SchemaStore`] probes in place.

pub mod definition;
pub mod project;
pub mod records;
pub mod registry;
pub mod store;

/// Index of a widget type in every schema array.
pub type TypeId = u32;

pub use definition::{SchemaDefinition, TypeDefinition};
pub use project::{load_project, read_project, write_project, SchemaFileError};
pub use records::{
    BackgroundDefinition, BackgroundFill, BrushSet, ColumnProperties, EdgeAnchor,
    GridProperties, HorizontalAlign, ImageInformation, InteractableDefinition,
    InteractableOrientation, InteractablePlacement, PageUiDefinitions, Point16, Rect16,
    SlotDefinition, TextInformation, VerticalAlign, WindowChild,
};
pub use registry::{CallbackKind, FunctionRegistry, MouseCallback, NodeCallback};
pub use store::{ResourceCounts, SchemaStore};
