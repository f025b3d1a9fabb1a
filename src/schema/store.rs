//! Runtime schema store: flat per-type arrays plus zero-copy sparse maps.

use std::cell::OnceCell;
use std::fmt;
use std::path::Path;

use bytemuck::Pod;

use super::project::SchemaFileError;
use super::records::{
    BackgroundDefinition, BrushSet, ColumnProperties, GridProperties, ImageInformation,
    InteractableDefinition, PageUiDefinitions, Point16, Rect16, SlotDefinition,
    TextInformation, WindowChild,
};
use super::registry::{
    noop_mouse_callback, noop_node_callback, CallbackKind, FunctionRegistry, MouseCallback,
    NodeCallback,
};
use super::TypeId;
use crate::codec::{HashView, MapHeader, Reader, RelocatedArray, Span};
use crate::geometry::{Offset, Region};
use crate::platform::FileSystem;
use crate::tree::{BehaviorFlags, NodeClass};

/// Resource table sizes from the schema header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub sounds: u32,
    pub brushes: u32,
    pub icons: u32,
    pub images: u32,
}

/// Location of one sparse map inside the owned schema bytes.
#[derive(Debug, Clone, Copy, Default)]
struct MapRegion {
    header: MapHeader,
    values_at: usize,
}

impl MapRegion {
    /// Consume the map's payload from `reader`, remembering where it starts.
    fn read<V: Pod>(reader: &mut Reader<'_>, header: MapHeader) -> Self {
        let values_at = reader.position();
        let view = HashView::<V>::read(reader, header);
        if view.is_empty() {
            return Self::default();
        }
        Self { header, values_at }
    }

    fn view<'a, V: Pod>(&self, bytes: &'a [u8]) -> HashView<'a, V> {
        if self.header.value_count == 0 {
            return HashView::empty();
        }
        HashView::read(&mut Reader::at(bytes, self.values_at), self.header)
    }
}

/// Sparse map regions in file order.
#[derive(Debug, Clone, Copy, Default)]
struct SparseMaps {
    divider_index: MapRegion,
    horizontal_orientation: MapRegion,
    column_properties: MapRegion,
    page_ui: MapRegion,
    text_information: MapRegion,
    interaction_sound: MapRegion,
    image_information: MapRegion,
    child_data_type: MapRegion,
    grid_properties: MapRegion,
}

/// The loaded schema.
///
/// Owns the raw bytes; flat arrays are copied out at load time, sparse maps
/// and relocated arrays are probed over the bytes on each lookup. All
/// accessors are total: unknown type ids and absent keys read as zero values.
pub struct SchemaStore {
    bytes: Box<[u8]>,
    type_count: usize,
    resources: ResourceCounts,
    icon_position: Vec<Point16>,
    default_position: Vec<Rect16>,
    interactable: Vec<InteractableDefinition>,
    icon: Vec<u16>,
    class_id: Vec<u16>,
    behavior_flags: Vec<u32>,
    brushes: Vec<BrushSet>,
    fixed_children: MapRegion,
    window_children: MapRegion,
    slots: Vec<RelocatedArray>,
    variable_words: Vec<u16>,
    background: Vec<BackgroundDefinition>,
    sparse: SparseMaps,
    callback_names: [MapRegion; CallbackKind::COUNT],
    registry: FunctionRegistry,
    node_callbacks: Vec<OnceCell<NodeCallback>>,
    mouse_callbacks: Vec<OnceCell<MouseCallback>>,
}

impl SchemaStore {
    /// A schema with no types.
    pub fn empty() -> Self {
        Self::load(Vec::new())
    }

    /// Parse a runtime schema blob with no callback functions registered.
    pub fn load(bytes: impl Into<Box<[u8]>>) -> Self {
        Self::load_with(bytes, FunctionRegistry::new())
    }

    /// Parse a runtime schema blob, resolving callbacks through `registry`.
    ///
    /// Never fails: truncated input yields zeroed fields past the cut.
    pub fn load_with(bytes: impl Into<Box<[u8]>>, registry: FunctionRegistry) -> Self {
        let bytes: Box<[u8]> = bytes.into();
        let mut r = Reader::new(&bytes);

        let type_count = r.read::<u32>() as usize;
        let resources = ResourceCounts {
            sounds: r.read(),
            brushes: r.read(),
            icons: r.read(),
            images: r.read(),
        };

        let icon_position = r.read_fixed::<Point16>(type_count).to_vec();
        let default_position = r.read_fixed::<Rect16>(type_count).to_vec();
        let interactable = r.read_fixed::<InteractableDefinition>(type_count).to_vec();
        let icon = r.read_fixed::<u16>(type_count).to_vec();
        let class_id = r.read_fixed::<u16>(type_count).to_vec();
        let behavior_flags = r.read_fixed::<u32>(type_count).to_vec();
        let foreground = r.read_fixed::<u16>(type_count);
        let background_brush = r.read_fixed::<u16>(type_count);
        let highlight = r.read_fixed::<u16>(type_count);
        let info = r.read_fixed::<u16>(type_count);
        let brushes = (0..foreground.len())
            .map(|i| BrushSet {
                foreground: foreground.get(i).unwrap_or_default(),
                background: background_brush.get(i).unwrap_or_default(),
                highlight: highlight.get(i).unwrap_or_default(),
                info: info.get(i).unwrap_or_default(),
            })
            .collect();

        let fixed_header = r.read::<MapHeader>();
        let window_header = r.read::<MapHeader>();
        let fixed_children = MapRegion::read::<RelocatedArray>(&mut r, fixed_header);
        let window_children = MapRegion::read::<RelocatedArray>(&mut r, window_header);

        let slots = r.read_fixed::<RelocatedArray>(type_count).to_vec();
        let variable_words = r.read_fixed::<u16>(type_count).to_vec();
        let background = r.read_fixed::<BackgroundDefinition>(type_count).to_vec();

        let headers: [MapHeader; 9] = std::array::from_fn(|_| r.read::<MapHeader>());
        let sparse = SparseMaps {
            divider_index: MapRegion::read::<i32>(&mut r, headers[0]),
            horizontal_orientation: MapRegion::read::<u8>(&mut r, headers[1]),
            column_properties: MapRegion::read::<ColumnProperties>(&mut r, headers[2]),
            page_ui: MapRegion::read::<PageUiDefinitions>(&mut r, headers[3]),
            text_information: MapRegion::read::<TextInformation>(&mut r, headers[4]),
            interaction_sound: MapRegion::read::<u16>(&mut r, headers[5]),
            image_information: MapRegion::read::<ImageInformation>(&mut r, headers[6]),
            child_data_type: MapRegion::read::<u16>(&mut r, headers[7]),
            grid_properties: MapRegion::read::<GridProperties>(&mut r, headers[8]),
        };

        let name_headers: [MapHeader; CallbackKind::COUNT] =
            std::array::from_fn(|_| r.read::<MapHeader>());
        let callback_names = name_headers.map(|header| MapRegion::read::<RelocatedArray>(&mut r, header));

        if r.is_truncated() {
            log::warn!(
                "schema data truncated at byte {} of {}; missing fields read as defaults",
                r.position(),
                bytes.len()
            );
        }

        let node_callbacks = std::iter::repeat_with(OnceCell::new)
            .take(type_count.min(icon_position.len()) * CallbackKind::COUNT)
            .collect();
        let mouse_callbacks = std::iter::repeat_with(OnceCell::new)
            .take(type_count.min(icon_position.len()))
            .collect();

        Self {
            bytes,
            type_count: type_count.min(icon_position.len()),
            resources,
            icon_position,
            default_position,
            interactable,
            icon,
            class_id,
            behavior_flags,
            brushes,
            fixed_children,
            window_children,
            slots,
            variable_words,
            background,
            sparse,
            callback_names,
            registry,
            node_callbacks,
            mouse_callbacks,
        }
    }

    /// Read a runtime schema through the file abstraction.
    pub fn load_from_file(
        fs: &dyn FileSystem,
        path: &Path,
        registry: FunctionRegistry,
    ) -> Result<Self, SchemaFileError> {
        let bytes = fs.read(path)?;
        log::debug!("loading schema {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::load_with(bytes, registry))
    }

    /// Number of types that have at least their first flat array entry.
    pub fn type_count(&self) -> usize {
        self.type_count
    }

    pub fn contains_type(&self, type_id: TypeId) -> bool {
        (type_id as usize) < self.type_count
    }

    pub fn resources(&self) -> ResourceCounts {
        self.resources
    }

    /// The registry callbacks are resolved through.
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Flat arrays
    // -----------------------------------------------------------------------

    pub fn get_icon_position(&self, type_id: TypeId) -> Offset {
        flat(&self.icon_position, type_id).into()
    }

    pub fn get_default_position(&self, type_id: TypeId) -> Region {
        flat(&self.default_position, type_id).into()
    }

    pub fn get_interactable_definition(&self, type_id: TypeId) -> InteractableDefinition {
        flat(&self.interactable, type_id)
    }

    pub fn get_icon(&self, type_id: TypeId) -> u16 {
        flat(&self.icon, type_id)
    }

    pub fn get_class_id(&self, type_id: TypeId) -> u16 {
        flat(&self.class_id, type_id)
    }

    /// The node class, or `None` for an unknown class id.
    pub fn get_class(&self, type_id: TypeId) -> Option<NodeClass> {
        NodeClass::from_id(self.get_class_id(type_id))
    }

    /// Default behavior flags; unknown bits are dropped.
    pub fn get_behavior_flags(&self, type_id: TypeId) -> BehaviorFlags {
        BehaviorFlags::from_bits_truncate(flat(&self.behavior_flags, type_id))
    }

    pub fn get_brushes(&self, type_id: TypeId) -> BrushSet {
        flat(&self.brushes, type_id)
    }

    /// Variable storage size in 8-byte words.
    pub fn get_variable_words(&self, type_id: TypeId) -> usize {
        usize::from(flat(&self.variable_words, type_id))
    }

    pub fn get_background(&self, type_id: TypeId) -> BackgroundDefinition {
        flat(&self.background, type_id)
    }

    /// Variable-slot table of a type.
    pub fn get_slots(&self, type_id: TypeId) -> Span<'_, SlotDefinition> {
        match self.slots.get(type_id as usize) {
            Some(array) => array.resolve(&self.bytes),
            None => Span::empty(),
        }
    }

    // -----------------------------------------------------------------------
    // Children
    // -----------------------------------------------------------------------

    /// Types of the children created with every instance.
    pub fn get_fixed_children(&self, type_id: TypeId) -> Span<'_, TypeId> {
        self.relocated(self.fixed_children, type_id)
    }

    /// Proportionally anchored children of a window type.
    pub fn get_window_children(&self, type_id: TypeId) -> Span<'_, WindowChild> {
        self.relocated(self.window_children, type_id)
    }

    fn relocated<T: Pod>(&self, region: MapRegion, type_id: TypeId) -> Span<'_, T> {
        match region.view::<RelocatedArray>(&self.bytes).find(type_id) {
            Some(array) => array.resolve(&self.bytes),
            None => Span::empty(),
        }
    }

    // -----------------------------------------------------------------------
    // Sparse overrides
    // -----------------------------------------------------------------------

    pub fn get_divider_index(&self, type_id: TypeId) -> i32 {
        self.sparse(self.sparse.divider_index, type_id)
    }

    /// Defaults to vertical (`false`).
    pub fn get_horizontal_orientation(&self, type_id: TypeId) -> bool {
        self.sparse::<u8>(self.sparse.horizontal_orientation, type_id) != 0
    }

    pub fn get_column_properties(&self, type_id: TypeId) -> ColumnProperties {
        self.sparse(self.sparse.column_properties, type_id)
    }

    pub fn get_page_ui_definitions(&self, type_id: TypeId) -> PageUiDefinitions {
        self.sparse(self.sparse.page_ui, type_id)
    }

    pub fn get_text_information(&self, type_id: TypeId) -> TextInformation {
        self.sparse(self.sparse.text_information, type_id)
    }

    /// Sound played on interaction; zero means none.
    pub fn get_interaction_sound(&self, type_id: TypeId) -> u16 {
        self.sparse(self.sparse.interaction_sound, type_id)
    }

    pub fn get_image_information(&self, type_id: TypeId) -> ImageInformation {
        self.sparse(self.sparse.image_information, type_id)
    }

    /// Data type id of the elements a container is bound to.
    pub fn get_child_data_type(&self, type_id: TypeId) -> u16 {
        self.sparse(self.sparse.child_data_type, type_id)
    }

    pub fn get_grid_properties(&self, type_id: TypeId) -> GridProperties {
        self.sparse(self.sparse.grid_properties, type_id)
    }

    fn sparse<V: Pod>(&self, region: MapRegion, type_id: TypeId) -> V {
        region.view::<V>(&self.bytes).get_or_zero(type_id)
    }

    // -----------------------------------------------------------------------
    // Callbacks
    // -----------------------------------------------------------------------

    /// The stored function name for a hook, if the type names one.
    pub fn get_callback_name(&self, kind: CallbackKind, type_id: TypeId) -> Option<&[u8]> {
        let region = self.callback_names[kind.index()];
        region
            .view::<RelocatedArray>(&self.bytes)
            .find(type_id)
            .map(|array| array.bytes(&self.bytes))
    }

    /// Whether the type names a hook of `kind` (resolvable or not).
    pub fn has_callback(&self, kind: CallbackKind, type_id: TypeId) -> bool {
        self.get_callback_name(kind, type_id).is_some()
    }

    /// Resolve a node hook, caching the result per type id.
    ///
    /// Unknown names and unknown types resolve to a no-op.
    pub fn node_callback(&self, kind: CallbackKind, type_id: TypeId) -> NodeCallback {
        if kind.is_mouse() {
            return noop_node_callback;
        }
        let index = (type_id as usize)
            .checked_mul(CallbackKind::COUNT)
            .and_then(|base| base.checked_add(kind.index()));
        let Some(cell) = index.and_then(|i| self.node_callbacks.get(i)) else {
            return noop_node_callback;
        };
        *cell.get_or_init(|| self.resolve_node(kind, type_id))
    }

    fn resolve_node(&self, kind: CallbackKind, type_id: TypeId) -> NodeCallback {
        let Some(name) = self.get_callback_name(kind, type_id) else {
            return noop_node_callback;
        };
        self.registry.node_fn(name).unwrap_or_else(|| {
            log::warn!(
                "type {type_id}: {kind:?} callback {:?} is not registered",
                String::from_utf8_lossy(name)
            );
            noop_node_callback
        })
    }

    pub fn get_on_update(&self, type_id: TypeId) -> NodeCallback {
        self.node_callback(CallbackKind::Update, type_id)
    }

    pub fn get_on_gain_focus(&self, type_id: TypeId) -> NodeCallback {
        self.node_callback(CallbackKind::GainFocus, type_id)
    }

    pub fn get_on_lose_focus(&self, type_id: TypeId) -> NodeCallback {
        self.node_callback(CallbackKind::LoseFocus, type_id)
    }

    pub fn get_on_visible(&self, type_id: TypeId) -> NodeCallback {
        self.node_callback(CallbackKind::Visible, type_id)
    }

    pub fn get_on_hide(&self, type_id: TypeId) -> NodeCallback {
        self.node_callback(CallbackKind::Hide, type_id)
    }

    pub fn get_on_create(&self, type_id: TypeId) -> NodeCallback {
        self.node_callback(CallbackKind::Create, type_id)
    }

    pub fn get_user_fn_a(&self, type_id: TypeId) -> NodeCallback {
        self.node_callback(CallbackKind::UserFnA, type_id)
    }

    pub fn get_user_fn_b(&self, type_id: TypeId) -> NodeCallback {
        self.node_callback(CallbackKind::UserFnB, type_id)
    }

    /// Mouse hook of a type, cached like the node hooks.
    pub fn get_user_mouse_fn_a(&self, type_id: TypeId) -> MouseCallback {
        let Some(cell) = self.mouse_callbacks.get(type_id as usize) else {
            return noop_mouse_callback;
        };
        *cell.get_or_init(|| {
            let Some(name) = self.get_callback_name(CallbackKind::UserMouseFnA, type_id) else {
                return noop_mouse_callback;
            };
            self.registry.mouse_fn(name).unwrap_or_else(|| {
                log::warn!(
                    "type {type_id}: mouse callback {:?} is not registered",
                    String::from_utf8_lossy(name)
                );
                noop_mouse_callback
            })
        })
    }
}

fn flat<T: Copy + Default>(array: &[T], type_id: TypeId) -> T {
    array.get(type_id as usize).copied().unwrap_or_default()
}

impl Default for SchemaStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for SchemaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaStore")
            .field("bytes", &self.bytes.len())
            .field("type_count", &self.type_count)
            .field("resources", &self.resources)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
