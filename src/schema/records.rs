//! Fixed-size schema records, stored verbatim in the binary schema file.

use bytemuck::{Pod, Zeroable};

use super::TypeId;

// ---------------------------------------------------------------------------
// Geometry records
// ---------------------------------------------------------------------------

/// A point in layout units.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Point16 {
    pub x: i16,
    pub y: i16,
}

impl Point16 {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// A box in layout units.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rect16 {
    pub x: i16,
    pub y: i16,
    pub width: i16,
    pub height: i16,
}

impl Rect16 {
    pub const fn new(x: i16, y: i16, width: i16, height: i16) -> Self {
        Self { x, y, width, height }
    }
}

// ---------------------------------------------------------------------------
// Interactable definition
// ---------------------------------------------------------------------------

/// Side of a node an interactable marker is drawn on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InteractableOrientation {
    #[default]
    Left,
    Right,
    Above,
    Below,
}

impl InteractableOrientation {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Right,
            2 => Self::Above,
            3 => Self::Below,
            _ => Self::Left,
        }
    }

    fn raw(self) -> u8 {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Above => 2,
            Self::Below => 3,
        }
    }
}

/// Where the on-screen button marker for an interactable goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InteractablePlacement {
    /// Inside the node's box, at the definition's offset.
    #[default]
    Internal,
    /// Just outside the node's box, on the orientation side.
    External,
    /// No marker.
    Suppressed,
}

impl InteractablePlacement {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::External,
            2 => Self::Suppressed,
            _ => Self::Internal,
        }
    }

    fn raw(self) -> u8 {
        match self {
            Self::Internal => 0,
            Self::External => 1,
            Self::Suppressed => 2,
        }
    }
}

/// Marker anchor, orientation and placement for an interactable type.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct InteractableDefinition {
    pub offset: Point16,
    orientation: u8,
    placement: u8,
    _pad: [u8; 2],
}

impl InteractableDefinition {
    pub fn new(
        offset: Point16,
        orientation: InteractableOrientation,
        placement: InteractablePlacement,
    ) -> Self {
        Self {
            offset,
            orientation: orientation.raw(),
            placement: placement.raw(),
            _pad: [0; 2],
        }
    }

    pub fn orientation(&self) -> InteractableOrientation {
        InteractableOrientation::from_raw(self.orientation)
    }

    pub fn placement(&self) -> InteractablePlacement {
        InteractablePlacement::from_raw(self.placement)
    }
}

// ---------------------------------------------------------------------------
// Brushes and background
// ---------------------------------------------------------------------------

/// Foreground, background, highlight and info brush ids of a type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BrushSet {
    pub foreground: u16,
    pub background: u16,
    pub highlight: u16,
    pub info: u16,
}

/// What fills a node's box before its content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackgroundFill {
    None,
    Brush(u16),
    Image(u16),
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct BackgroundDefinition {
    kind: u16,
    handle: u16,
    pub border_x: i16,
    pub border_y: i16,
}

impl BackgroundDefinition {
    pub fn new(fill: BackgroundFill, border_x: i16, border_y: i16) -> Self {
        let (kind, handle) = match fill {
            BackgroundFill::None => (0, 0),
            BackgroundFill::Brush(b) => (1, b),
            BackgroundFill::Image(i) => (2, i),
        };
        Self { kind, handle, border_x, border_y }
    }

    pub fn fill(&self) -> BackgroundFill {
        match self.kind {
            1 => BackgroundFill::Brush(self.handle),
            2 => BackgroundFill::Image(self.handle),
            _ => BackgroundFill::None,
        }
    }
}

// ---------------------------------------------------------------------------
// Children
// ---------------------------------------------------------------------------

/// One edge of a proportionally positioned child: `proportion * parent + offset`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct EdgeAnchor {
    pub proportion: f32,
    pub offset: i16,
    _pad: i16,
}

impl EdgeAnchor {
    pub const fn new(proportion: f32, offset: i16) -> Self {
        Self { proportion, offset, _pad: 0 }
    }

    /// Resolve against a parent extent.
    pub fn resolve(&self, extent: i32) -> i32 {
        (self.proportion * extent as f32).round() as i32 + i32::from(self.offset)
    }
}

/// A child of a proportional window.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct WindowChild {
    pub child_type: TypeId,
    pub left: EdgeAnchor,
    pub top: EdgeAnchor,
    pub right: EdgeAnchor,
    pub bottom: EdgeAnchor,
}

// ---------------------------------------------------------------------------
// Variable slots
// ---------------------------------------------------------------------------

const SLOT_INLINE_DEFAULT: u32 = 1;

/// One per-instance storage cell declared by a type.
///
/// `offset` is in 8-byte words from the start of the node's variable storage.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct SlotDefinition {
    pub slot_id: u32,
    pub data_type: u16,
    pub offset: u16,
    flags: u32,
    _pad: u32,
    pub inline_default: u64,
}

impl SlotDefinition {
    /// A slot initialized by its data type's constructor.
    pub fn constructed(slot_id: u32, data_type: u16, offset: u16) -> Self {
        Self {
            slot_id,
            data_type,
            offset,
            flags: 0,
            _pad: 0,
            inline_default: 0,
        }
    }

    /// A slot initialized by copying 8 raw bytes.
    pub fn with_default(slot_id: u32, data_type: u16, offset: u16, bits: u64) -> Self {
        Self {
            flags: SLOT_INLINE_DEFAULT,
            inline_default: bits,
            ..Self::constructed(slot_id, data_type, offset)
        }
    }

    pub fn has_inline_default(&self) -> bool {
        self.flags & SLOT_INLINE_DEFAULT != 0
    }
}

// ---------------------------------------------------------------------------
// Sparse per-type overrides
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VerticalAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Column packing parameters of paginated containers.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct ColumnProperties {
    /// Width of one column; zero means the container's full width.
    pub column_width: i16,
    /// Gap between columns and between packed items.
    pub gap: i16,
    /// Upper bound on columns per page; zero means unbounded.
    pub max_columns: u8,
    vertical_align: u8,
    horizontal_align: u8,
    _pad: u8,
}

impl ColumnProperties {
    pub fn new(column_width: i16, gap: i16, max_columns: u8) -> Self {
        Self {
            column_width,
            gap,
            max_columns,
            ..Self::default()
        }
    }

    pub fn with_alignment(mut self, vertical: VerticalAlign, horizontal: HorizontalAlign) -> Self {
        self.vertical_align = match vertical {
            VerticalAlign::Top => 0,
            VerticalAlign::Center => 1,
            VerticalAlign::Bottom => 2,
        };
        self.horizontal_align = match horizontal {
            HorizontalAlign::Left => 0,
            HorizontalAlign::Center => 1,
            HorizontalAlign::Right => 2,
        };
        self
    }

    pub fn vertical_align(&self) -> VerticalAlign {
        match self.vertical_align {
            1 => VerticalAlign::Center,
            2 => VerticalAlign::Bottom,
            _ => VerticalAlign::Top,
        }
    }

    pub fn horizontal_align(&self) -> HorizontalAlign {
        match self.horizontal_align {
            1 => HorizontalAlign::Center,
            2 => HorizontalAlign::Right,
            _ => HorizontalAlign::Left,
        }
    }
}

/// Cell geometry of a dynamic grid.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct GridProperties {
    pub cell_width: i16,
    pub cell_height: i16,
    pub gap: i16,
    _pad: i16,
}

impl GridProperties {
    pub fn new(cell_width: i16, cell_height: i16, gap: i16) -> Self {
        Self { cell_width, cell_height, gap, _pad: 0 }
    }
}

/// Types of the pagination sub-controls. Stored as `type_id + 1`, zero = absent.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PageUiDefinitions {
    back: u32,
    forward: u32,
    text: u32,
}

impl PageUiDefinitions {
    pub fn new(back: Option<TypeId>, forward: Option<TypeId>, text: Option<TypeId>) -> Self {
        let encode = |t: Option<TypeId>| t.map_or(0, |t| t + 1);
        Self {
            back: encode(back),
            forward: encode(forward),
            text: encode(text),
        }
    }

    pub fn back_type(&self) -> Option<TypeId> {
        self.back.checked_sub(1)
    }

    pub fn forward_type(&self) -> Option<TypeId> {
        self.forward.checked_sub(1)
    }

    pub fn text_type(&self) -> Option<TypeId> {
        self.text.checked_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.back == 0 && self.forward == 0 && self.text == 0
    }
}

/// Text formatting of a text-bearing type.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct TextInformation {
    /// Key handed to the text provider.
    pub text_key: u32,
    pub font: u8,
    /// Font size in tenths of a layout unit.
    pub size: u8,
    alignment: u8,
    pub flags: u8,
}

impl TextInformation {
    pub fn new(text_key: u32, font: u8, size: u8, alignment: HorizontalAlign) -> Self {
        Self {
            text_key,
            font,
            size,
            alignment: match alignment {
                HorizontalAlign::Left => 0,
                HorizontalAlign::Center => 1,
                HorizontalAlign::Right => 2,
            },
            flags: 0,
        }
    }

    pub fn alignment(&self) -> HorizontalAlign {
        match self.alignment {
            1 => HorizontalAlign::Center,
            2 => HorizontalAlign::Right,
            _ => HorizontalAlign::Left,
        }
    }
}

/// Image shown by an image type.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct ImageInformation {
    pub image: u16,
    pub flags: u16,
}

impl ImageInformation {
    pub const STRETCH: u16 = 1;

    pub fn stretches(&self) -> bool {
        self.flags & Self::STRETCH != 0
    }
}

// ===========================================================================
// Tests
// ===========================================================================
