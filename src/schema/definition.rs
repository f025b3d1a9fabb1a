//! In-memory schema authoring model and the runtime schema writer.
//!
//! [`SchemaDefinition`] is what a schema compiler (or a test) assembles;
//! [`SchemaDefinition::write_runtime`] produces the relocated, hash-mapped blob
//! consumed by [`SchemaStore::load`](super::SchemaStore::load).

use bytemuck::Pod;

use super::records::{
    BackgroundDefinition, BrushSet, ColumnProperties, GridProperties, ImageInformation,
    InteractableDefinition, PageUiDefinitions, Point16, Rect16, SlotDefinition,
    TextInformation, WindowChild,
};
use super::registry::CallbackKind;
use super::TypeId;
use crate::codec::{build_buckets, Bucket, MapHeader, SerializationBuffer};
use crate::tree::{BehaviorFlags, DataType, NodeClass};

// ---------------------------------------------------------------------------
// TypeDefinition
// ---------------------------------------------------------------------------

/// Everything the schema says about one widget type.
///
/// `Option` fields are sparse overrides: `None` means the type is absent from
/// that map and readers see the zero value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeDefinition {
    pub icon_position: Point16,
    pub default_position: Rect16,
    pub interactable: InteractableDefinition,
    pub icon: u16,
    pub class_id: u16,
    pub behavior_flags: u32,
    pub brushes: BrushSet,
    pub fixed_children: Vec<TypeId>,
    pub window_children: Vec<WindowChild>,
    pub slots: Vec<SlotDefinition>,
    /// Variable storage size in 8-byte words.
    pub variable_words: u16,
    pub background: BackgroundDefinition,
    pub divider_index: Option<i32>,
    pub horizontal_orientation: Option<bool>,
    pub column_properties: Option<ColumnProperties>,
    pub page_ui: Option<PageUiDefinitions>,
    pub text_information: Option<TextInformation>,
    pub interaction_sound: Option<u16>,
    pub image_information: Option<ImageInformation>,
    pub child_data_type: Option<u16>,
    pub grid_properties: Option<GridProperties>,
    pub callbacks: [Option<String>; CallbackKind::COUNT],
}

impl TypeDefinition {
    /// A type instantiating `class`, with everything else zeroed.
    pub fn new(class: NodeClass) -> Self {
        Self {
            class_id: class.id(),
            ..Self::default()
        }
    }

    /// Set the default box (builder).
    pub fn with_position(mut self, x: i16, y: i16, width: i16, height: i16) -> Self {
        self.default_position = Rect16::new(x, y, width, height);
        self
    }

    /// Set the behavior flags (builder).
    pub fn with_flags(mut self, flags: BehaviorFlags) -> Self {
        self.behavior_flags = flags.bits();
        self
    }

    /// Set the interactable marker definition (builder).
    pub fn with_interactable(mut self, def: InteractableDefinition) -> Self {
        self.interactable = def;
        self
    }

    /// Set the icon and its anchor (builder).
    pub fn with_icon(mut self, icon: u16, position: Point16) -> Self {
        self.icon = icon;
        self.icon_position = position;
        self
    }

    /// Set the brushes (builder).
    pub fn with_brushes(mut self, brushes: BrushSet) -> Self {
        self.brushes = brushes;
        self
    }

    /// Set the background (builder).
    pub fn with_background(mut self, background: BackgroundDefinition) -> Self {
        self.background = background;
        self
    }

    /// Append a fixed child type (builder).
    pub fn with_child(mut self, child: TypeId) -> Self {
        self.fixed_children.push(child);
        self
    }

    /// Append a proportionally positioned child (builder).
    pub fn with_window_child(mut self, child: WindowChild) -> Self {
        self.window_children.push(child);
        self
    }

    /// Append a slot and grow the variable storage to cover it (builder).
    pub fn with_slot(mut self, slot: SlotDefinition) -> Self {
        let words = DataType::from_id(slot.data_type).map_or(1, DataType::words);
        let end = slot.offset.saturating_add(words);
        self.variable_words = self.variable_words.max(end);
        self.slots.push(slot);
        self
    }

    /// Name the host function for a hook (builder).
    pub fn with_callback(mut self, kind: CallbackKind, name: impl Into<String>) -> Self {
        self.callbacks[kind.index()] = Some(name.into());
        self
    }

    pub fn with_divider_index(mut self, index: i32) -> Self {
        self.divider_index = Some(index);
        self
    }

    pub fn with_horizontal_orientation(mut self, horizontal: bool) -> Self {
        self.horizontal_orientation = Some(horizontal);
        self
    }

    pub fn with_column_properties(mut self, props: ColumnProperties) -> Self {
        self.column_properties = Some(props);
        self
    }

    pub fn with_page_ui(mut self, page_ui: PageUiDefinitions) -> Self {
        self.page_ui = Some(page_ui);
        self
    }

    pub fn with_text(mut self, text: TextInformation) -> Self {
        self.text_information = Some(text);
        self
    }

    pub fn with_interaction_sound(mut self, sound: u16) -> Self {
        self.interaction_sound = Some(sound);
        self
    }

    pub fn with_image(mut self, image: ImageInformation) -> Self {
        self.image_information = Some(image);
        self
    }

    pub fn with_child_data_type(mut self, data_type: u16) -> Self {
        self.child_data_type = Some(data_type);
        self
    }

    pub fn with_grid_properties(mut self, grid: GridProperties) -> Self {
        self.grid_properties = Some(grid);
        self
    }
}

// ---------------------------------------------------------------------------
// SchemaDefinition
// ---------------------------------------------------------------------------

/// A complete schema: resource counts plus one definition per type id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDefinition {
    pub sound_count: u32,
    pub brush_count: u32,
    pub icon_count: u32,
    pub image_count: u32,
    pub types: Vec<TypeDefinition>,
}

/// Entries and buckets of one sparse map, ready to write.
struct PendingMap<V> {
    entries: Vec<(u32, V)>,
    buckets: Vec<Bucket>,
}

impl<V> PendingMap<V> {
    fn new(entries: Vec<(u32, V)>) -> Self {
        let buckets = build_buckets(entries.iter().map(|(key, _)| *key));
        Self { entries, buckets }
    }

    fn header(&self) -> MapHeader {
        MapHeader {
            bucket_count: self.buckets.len() as u32,
            value_count: self.entries.len() as u32,
        }
    }
}

impl<V: Pod> PendingMap<V> {
    fn write_payload(&self, buf: &mut SerializationBuffer<'_>) {
        buf.write_map_values(&self.entries);
        buf.write_map_buckets(&self.buckets);
    }
}

impl<T: Pod> PendingMap<Vec<T>> {
    fn write_relocated_payload<'a>(&'a self, buf: &mut SerializationBuffer<'a>) {
        buf.write_relocated_map_values(&self.entries);
        buf.write_map_buckets(&self.buckets);
    }
}

impl SchemaDefinition {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a type and return its id.
    pub fn push(&mut self, def: TypeDefinition) -> TypeId {
        self.types.push(def);
        (self.types.len() - 1) as TypeId
    }

    /// Number of types.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// The definition for `type_id`.
    pub fn get(&self, type_id: TypeId) -> Option<&TypeDefinition> {
        self.types.get(type_id as usize)
    }

    /// Mutable definition for `type_id`.
    pub fn get_mut(&mut self, type_id: TypeId) -> Option<&mut TypeDefinition> {
        self.types.get_mut(type_id as usize)
    }

    fn flat<T>(&self, f: impl Fn(&TypeDefinition) -> T) -> Vec<T> {
        self.types.iter().map(f).collect()
    }

    fn sparse<V>(&self, f: impl Fn(&TypeDefinition) -> Option<V>) -> Vec<(u32, V)> {
        self.types
            .iter()
            .enumerate()
            .filter_map(|(i, t)| f(t).map(|v| (i as u32, v)))
            .collect()
    }

    /// Serialize to the runtime format read by [`SchemaStore`](super::SchemaStore).
    pub fn write_runtime(&self) -> Vec<u8> {
        let fixed = PendingMap::new(
            self.sparse(|t| (!t.fixed_children.is_empty()).then(|| t.fixed_children.clone())),
        );
        let window = PendingMap::new(
            self.sparse(|t| (!t.window_children.is_empty()).then(|| t.window_children.clone())),
        );
        let divider = PendingMap::new(self.sparse(|t| t.divider_index));
        let horizontal = PendingMap::new(self.sparse(|t| t.horizontal_orientation.map(u8::from)));
        let column = PendingMap::new(self.sparse(|t| t.column_properties));
        let page_ui = PendingMap::new(self.sparse(|t| t.page_ui));
        let text = PendingMap::new(self.sparse(|t| t.text_information));
        let sound = PendingMap::new(self.sparse(|t| t.interaction_sound));
        let image = PendingMap::new(self.sparse(|t| t.image_information));
        let child_data = PendingMap::new(self.sparse(|t| t.child_data_type));
        let grid = PendingMap::new(self.sparse(|t| t.grid_properties));
        let callbacks: Vec<PendingMap<Vec<u8>>> = CallbackKind::ALL
            .iter()
            .map(|kind| {
                PendingMap::new(self.sparse(|t| {
                    t.callbacks[kind.index()].as_ref().map(|name| name.as_bytes().to_vec())
                }))
            })
            .collect();

        let mut buf = SerializationBuffer::new();

        buf.write(&(self.types.len() as u32));
        buf.write(&self.sound_count);
        buf.write(&self.brush_count);
        buf.write(&self.icon_count);
        buf.write(&self.image_count);

        buf.write_fixed(&self.flat(|t| t.icon_position));
        buf.write_fixed(&self.flat(|t| t.default_position));
        buf.write_fixed(&self.flat(|t| t.interactable));
        buf.write_fixed(&self.flat(|t| t.icon));
        buf.write_fixed(&self.flat(|t| t.class_id));
        buf.write_fixed(&self.flat(|t| t.behavior_flags));
        buf.write_fixed(&self.flat(|t| t.brushes.foreground));
        buf.write_fixed(&self.flat(|t| t.brushes.background));
        buf.write_fixed(&self.flat(|t| t.brushes.highlight));
        buf.write_fixed(&self.flat(|t| t.brushes.info));

        buf.write(&fixed.header());
        buf.write(&window.header());
        fixed.write_relocated_payload(&mut buf);
        window.write_relocated_payload(&mut buf);

        for t in &self.types {
            buf.write_relocated_array(&t.slots);
        }
        buf.write_fixed(&self.flat(|t| t.variable_words));
        buf.write_fixed(&self.flat(|t| t.background));

        buf.write(&divider.header());
        buf.write(&horizontal.header());
        buf.write(&column.header());
        buf.write(&page_ui.header());
        buf.write(&text.header());
        buf.write(&sound.header());
        buf.write(&image.header());
        buf.write(&child_data.header());
        buf.write(&grid.header());
        divider.write_payload(&mut buf);
        horizontal.write_payload(&mut buf);
        column.write_payload(&mut buf);
        page_ui.write_payload(&mut buf);
        text.write_payload(&mut buf);
        sound.write_payload(&mut buf);
        image.write_payload(&mut buf);
        child_data.write_payload(&mut buf);
        grid.write_payload(&mut buf);

        for map in &callbacks {
            buf.write(&map.header());
        }
        for map in &callbacks {
            map.write_relocated_payload(&mut buf);
        }

        buf.finalize()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
