//! The `Ui` runtime: owns the schema, the node tree, focus and the event queue.
//!
//! [`Ui`] is driven synchronously by the host: feed it input through
//! [`handle_input`](Ui::handle_input), tick it with [`update`](Ui::update),
//! draw it with [`render`](Ui::render) and drain [`UiEvent`]s afterwards.
//! Schema callbacks receive `&mut Ui` and may call back into any of these.

use crate::event::{
    InputEvent, KeyBindingRegistry, MouseAction, MouseBtn, MouseEvent, NavigationCommand, UiEvent,
};
use crate::event::EventQueue;
use crate::focus::FocusState;
use crate::geometry::{Offset, Size};
use crate::platform::{NoText, TextProvider};
use crate::schema::{CallbackKind, SchemaStore, TypeId};
use crate::tree::{AllocError, BehaviorFlags, NodeId, NodeKind, NodeRepository};

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiConfig {
    /// Size of the workspace the root is laid out in.
    pub workspace: Size,
    /// Whether hovering moves focus and frames release when the pointer leaves.
    pub mouse_tracking: bool,
    /// Slack added to a frame's tracking margin before it is released.
    pub focus_release_distance: i32,
    /// Box of an interactable marker, used to place external markers.
    pub marker_size: Size,
    /// Whether activations queue [`UiEvent::PlaySound`].
    pub play_sounds: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            workspace: Size::new(80, 24),
            mouse_tracking: false,
            focus_release_distance: 2,
            marker_size: Size::new(3, 1),
            play_sounds: true,
        }
    }
}

impl UiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workspace(mut self, workspace: Size) -> Self {
        self.workspace = workspace;
        self
    }

    pub fn with_mouse_tracking(mut self, enabled: bool) -> Self {
        self.mouse_tracking = enabled;
        self
    }

    pub fn with_focus_release_distance(mut self, distance: i32) -> Self {
        self.focus_release_distance = distance;
        self
    }

    pub fn with_marker_size(mut self, size: Size) -> Self {
        self.marker_size = size;
        self
    }

    pub fn with_sounds(mut self, enabled: bool) -> Self {
        self.play_sounds = enabled;
        self
    }
}

// ---------------------------------------------------------------------------
// Ui
// ---------------------------------------------------------------------------

/// Pointer bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseState {
    pub position: Offset,
    /// Node under the pointer at the last probe.
    pub hover: Option<NodeId>,
}

/// A schema-driven UI instance.
pub struct Ui {
    pub(crate) schema: SchemaStore,
    pub(crate) nodes: NodeRepository,
    pub(crate) focus: FocusState,
    pub(crate) events: EventQueue,
    pub(crate) bindings: KeyBindingRegistry,
    pub(crate) config: UiConfig,
    pub(crate) root: Option<NodeId>,
    pub(crate) mouse: MouseState,
    pub(crate) text: Box<dyn TextProvider>,
}

impl Ui {
    /// Runtime over `schema` with the default configuration.
    pub fn new(schema: SchemaStore) -> Self {
        Self::with_config(schema, UiConfig::default())
    }

    pub fn with_config(schema: SchemaStore, config: UiConfig) -> Self {
        Self {
            schema,
            nodes: NodeRepository::new(),
            focus: FocusState::default(),
            events: EventQueue::new(),
            bindings: KeyBindingRegistry::with_defaults(),
            config,
            root: None,
            mouse: MouseState::default(),
            text: Box::new(NoText),
        }
    }

    /// Set the provider of static strings (builder).
    pub fn with_text_provider(mut self, provider: impl TextProvider + 'static) -> Self {
        self.text = Box::new(provider);
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn schema(&self) -> &SchemaStore {
        &self.schema
    }

    pub fn nodes(&self) -> &NodeRepository {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut NodeRepository {
        &mut self.nodes
    }

    pub fn focus(&self) -> &FocusState {
        &self.focus
    }

    /// Node on top of the focus stack.
    pub fn focused(&self) -> Option<NodeId> {
        self.focus.top()
    }

    pub fn config(&self) -> &UiConfig {
        &self.config
    }

    pub fn bindings_mut(&mut self) -> &mut KeyBindingRegistry {
        &mut self.bindings
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn mouse(&self) -> MouseState {
        self.mouse
    }

    /// Take every queued [`UiEvent`], oldest first.
    pub fn drain_events(&mut self) -> Vec<UiEvent> {
        self.events.drain()
    }

    // -----------------------------------------------------------------------
    // Root
    // -----------------------------------------------------------------------

    /// Build the root from `type_id`, replacing (and releasing) any previous
    /// root, and lay it out over the workspace.
    pub fn create_root(&mut self, type_id: TypeId) -> Result<NodeId, AllocError> {
        if let Some(old) = self.root {
            self.release_node(old);
        }
        let root = self.make_control_by_type(None, type_id)?;
        self.set_root(root);
        Ok(root)
    }

    /// Make an existing parentless node the root.
    pub fn set_root(&mut self, id: NodeId) {
        if !self.nodes.contains(id) {
            return;
        }
        self.root = Some(id);
        let workspace = self.config.workspace;
        self.force_resize(id, workspace.width, workspace.height);
        self.focus.stack.clear();
        self.repopulate_key_actions();
    }

    // -----------------------------------------------------------------------
    // Hooks
    // -----------------------------------------------------------------------

    /// Run the schema hook `kind` of `id`'s type, if it has one.
    pub(crate) fn fire(&mut self, kind: CallbackKind, id: NodeId) {
        let Some(type_id) = self.nodes.get(id).map(|n| n.type_id) else {
            return;
        };
        if !self.schema.has_callback(kind, type_id) {
            return;
        }
        let callback = self.schema.node_callback(kind, type_id);
        callback(self, id);
    }

    /// Nodes reachable from the root, pre-order.
    fn live_tree(&self) -> Vec<NodeId> {
        self.root
            .map(|root| self.nodes.walk_depth_first(root))
            .unwrap_or_default()
    }

    /// Periodic tick: the update hook of every node in the tree.
    pub fn update(&mut self) {
        for id in self.live_tree() {
            if self.nodes.contains(id) {
                self.fire(CallbackKind::Update, id);
            }
        }
    }

    /// Refresh content without rebuilding the tree: text nodes re-read their
    /// strings, then layout and key actions are recomputed.
    pub fn reload(&mut self) {
        for id in self.live_tree() {
            self.on_reload(id);
        }
        if let Some(root) = self.root {
            self.relayout(root);
        }
        self.refresh_focus();
    }

    /// Content refresh of one node. Text nodes take the provider's current
    /// string for their key, dropping any content set since.
    pub fn on_reload(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if !matches!(node.kind, NodeKind::Text { .. }) {
            return;
        }
        let key = self.schema.get_text_information(node.type_id).text_key;
        let fresh = self.text.text(key);
        if let Some(NodeKind::Text { content }) = self.nodes.get_mut(id).map(|n| &mut n.kind) {
            if fresh.is_some() {
                *content = fresh;
            }
        }
    }

    /// Show or hide `id`, firing the visible/hide hooks on a change.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if node.flags.contains(BehaviorFlags::HIDDEN) != visible {
            return;
        }
        node.flags.set(BehaviorFlags::HIDDEN, !visible);
        self.fire(if visible { CallbackKind::Visible } else { CallbackKind::Hide }, id);
        if let Some(parent) = self.nodes.parent(id) {
            self.relayout(parent);
        }
        self.refresh_focus();
    }

    /// Replace the content of a text or edit-text node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Text { content }) => *content = Some(text.into()),
            Some(NodeKind::EditText { buffer, cursor }) => {
                *buffer = text.into();
                *cursor = buffer.len();
            }
            _ => {}
        }
    }

    /// Displayed text of a text node: explicit content, else the provider's
    /// string for the type's text key.
    pub fn text_of(&self, id: NodeId) -> Option<String> {
        let node = self.nodes.get(id)?;
        match &node.kind {
            NodeKind::Text { content: Some(text) } => Some(text.clone()),
            NodeKind::Text { content: None } => {
                let key = self.schema.get_text_information(node.type_id).text_key;
                self.text.text(key)
            }
            NodeKind::EditText { buffer, .. } => Some(buffer.clone()),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Route one input event. Returns whether anything consumed it.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::Key(key) => match self.bindings.resolve(&key) {
                Some(command) => self.run_command(command),
                None => false,
            },
            InputEvent::Command(command) => self.run_command(command),
            InputEvent::Mouse(mouse) => self.handle_mouse(mouse),
            InputEvent::Resize { width, height } => {
                self.config.workspace = Size::new(width, height);
                if let Some(root) = self.root {
                    self.force_resize(root, width, height);
                }
                self.refresh_focus();
                true
            }
        }
    }

    fn run_command(&mut self, command: NavigationCommand) -> bool {
        match command {
            NavigationCommand::Button(index) => self.press_button(usize::from(index)),
            NavigationCommand::Escape => {
                let had_focus = !self.focus.stack.is_empty();
                self.take_escape_action();
                had_focus
            }
            NavigationCommand::PageForward => self.page_focused(true),
            NavigationCommand::PageBack => self.page_focused(false),
        }
    }

    /// Press group button `index`: navigate, or activate a single interactable.
    pub fn press_button(&mut self, index: usize) -> bool {
        if index >= self.focus.actions.valid_count {
            return false;
        }
        match self.take_key_action(index) {
            Some(node) => self.on_lbutton(node),
            None => true,
        }
    }

    /// Page the nearest paginated node around the current scope.
    fn page_focused(&mut self, forward: bool) -> bool {
        let scope = self.focused().or(self.root);
        let Some(scope) = scope else {
            return false;
        };
        let mut candidates = vec![scope];
        candidates.extend(self.nodes.ancestors(scope));
        candidates.extend(self.nodes.walk_depth_first(scope).into_iter().skip(1));
        let target = candidates.into_iter().find(|&id| {
            self.nodes.get(id).is_some_and(|n| n.is_shown() && n.kind.paged().is_some())
        });
        let Some(target) = target else {
            return false;
        };
        self.step_page(target, forward)
    }

    fn step_page(&mut self, id: NodeId, forward: bool) -> bool {
        let Some(info) = self.get_page_information(id) else {
            return false;
        };
        let page = if forward {
            info.current + 1
        } else {
            match info.current.checked_sub(1) {
                Some(page) => page,
                None => return false,
            }
        };
        self.change_page(id, page)
    }

    /// Primary activation of `id`.
    ///
    /// Page arrows turn their parent's page. Every activation queues the
    /// type's interaction sound and an [`UiEvent::Activated`], then runs the
    /// type's first user function.
    pub fn on_lbutton(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if !node.is_shown() {
            return false;
        }
        let flags = node.flags;
        let sound = self.schema.get_interaction_sound(node.type_id);

        if sound != 0 && self.config.play_sounds {
            self.events.push(UiEvent::PlaySound { sound });
        }
        self.events.push(UiEvent::Activated { node: id });
        if flags.intersects(BehaviorFlags::PAGE_BACK | BehaviorFlags::PAGE_FORWARD) {
            if let Some(parent) = self.nodes.parent(id) {
                self.step_page(parent, flags.contains(BehaviorFlags::PAGE_FORWARD));
            }
        }
        self.fire(CallbackKind::UserFnA, id);
        true
    }

    /// Secondary (info) activation of `id`.
    pub fn on_rbutton(&mut self, id: NodeId) -> bool {
        let info = self
            .nodes
            .get(id)
            .is_some_and(|n| n.is_shown() && n.flags.contains(BehaviorFlags::INFO));
        if info {
            self.fire(CallbackKind::UserFnB, id);
        }
        info
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> bool {
        let position = event.position;
        match event.kind {
            MouseAction::Moved | MouseAction::Drag(_) => {
                self.update_mouse_tracking(position);
                self.mouse.hover = self.probe(position).hover;
                false
            }
            MouseAction::Down(button) => {
                self.mouse.position = position;
                let Some(target) = self.probe(position).primary else {
                    return false;
                };
                if self.run_mouse_hook(target, event) {
                    return true;
                }
                match button {
                    MouseBtn::Left => self.on_lbutton(target),
                    MouseBtn::Right => self.on_rbutton(target),
                    MouseBtn::Middle => false,
                }
            }
            MouseAction::ScrollUp | MouseAction::ScrollDown => {
                let Some(target) = self.probe(position).scroll else {
                    return false;
                };
                if self.run_mouse_hook(target, event) {
                    return true;
                }
                self.step_page(target, event.kind == MouseAction::ScrollDown)
            }
            MouseAction::Up(_) => false,
        }
    }

    fn run_mouse_hook(&mut self, id: NodeId, event: MouseEvent) -> bool {
        let Some(type_id) = self.nodes.get(id).map(|n| n.type_id) else {
            return false;
        };
        if !self.schema.has_callback(CallbackKind::UserMouseFnA, type_id) {
            return false;
        }
        let callback = self.schema.get_user_mouse_fn_a(type_id);
        callback(self, id, event)
    }

    /// Drop pointer references into a subtree about to be released.
    pub(crate) fn forget_pointer_targets(&mut self, id: NodeId) {
        if self.mouse.hover.is_some_and(|h| self.nodes.is_within(h, id)) {
            self.mouse.hover = None;
        }
    }
}

impl std::fmt::Debug for Ui {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ui")
            .field("root", &self.root)
            .field("live_nodes", &self.nodes.live_count())
            .field("focus", &self.focus.stack())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Key, KeyEvent};
    use crate::schema::{
        FunctionRegistry, HorizontalAlign, PageUiDefinitions, SchemaDefinition, SlotDefinition,
        TextInformation, TypeDefinition,
    };
    use crate::tree::{DataType, NodeClass};
    use pretty_assertions::assert_eq;

    const BUTTON: u32 = 0;
    const INFO: u32 = 1;
    const LABEL: u32 = 2;
    const ROOT: u32 = 3;
    const ARROW: u32 = 4;
    const COLUMN: u32 = 5;
    const PAGED_ROOT: u32 = 6;

    fn bump(ui: &mut Ui, id: NodeId) {
        if let Some(n) = ui.get_local_data_mut::<i64>(id, 1) {
            *n += 1;
        }
    }

    fn schema() -> SchemaStore {
        let mut def = SchemaDefinition::new();
        def.sound_count = 2;
        def.push(
            TypeDefinition::new(NodeClass::Icon)
                .with_position(0, 0, 10, 2)
                .with_flags(BehaviorFlags::CLICKABLE)
                .with_interaction_sound(2)
                .with_slot(SlotDefinition::constructed(1, DataType::Int.id(), 0))
                .with_callback(CallbackKind::UserFnA, "bump")
                .with_callback(CallbackKind::Update, "bump"),
        );
        def.push(
            TypeDefinition::new(NodeClass::Icon)
                .with_position(0, 4, 10, 2)
                .with_flags(BehaviorFlags::INFO)
                .with_slot(SlotDefinition::constructed(1, DataType::Int.id(), 0))
                .with_callback(CallbackKind::UserFnB, "bump"),
        );
        def.push(
            TypeDefinition::new(NodeClass::Text)
                .with_position(0, 8, 10, 1)
                .with_text(TextInformation::new(7, 0, 10, HorizontalAlign::Left)),
        );
        def.push(
            TypeDefinition::new(NodeClass::Container)
                .with_position(0, 0, 40, 20)
                .with_child(BUTTON)
                .with_child(INFO)
                .with_child(LABEL),
        );
        def.push(
            TypeDefinition::new(NodeClass::Icon)
                .with_position(0, 0, 2, 1)
                .with_flags(BehaviorFlags::CLICKABLE),
        );
        let mut column = TypeDefinition::new(NodeClass::DynamicColumn)
            .with_position(0, 0, 20, 5)
            .with_page_ui(PageUiDefinitions::new(Some(ARROW), Some(ARROW), None));
        for _ in 0..4 {
            column = column.with_child(BUTTON);
        }
        def.push(column);
        def.push(
            TypeDefinition::new(NodeClass::Container)
                .with_position(0, 0, 40, 20)
                .with_child(COLUMN),
        );
        let registry = FunctionRegistry::new().with_node_fn("bump", bump);
        SchemaStore::load_with(def.write_runtime(), registry)
    }

    fn counter(ui: &Ui, id: NodeId) -> i64 {
        ui.get_local_data::<i64>(id, 1).copied().unwrap_or(-1)
    }

    #[test]
    fn buttons_activate_and_queue_events() {
        let mut ui = Ui::new(schema());
        let root = ui.create_root(ROOT).unwrap();
        let button = ui.nodes().children(root)[0];
        ui.drain_events();

        assert!(ui.handle_input(InputEvent::Key(KeyEvent::plain(Key::F(1)))));
        assert_eq!(counter(&ui, button), 1);
        assert_eq!(
            ui.drain_events(),
            vec![UiEvent::PlaySound { sound: 2 }, UiEvent::Activated { node: button }]
        );
    }

    #[test]
    fn sounds_can_be_disabled() {
        let mut ui = Ui::with_config(schema(), UiConfig::default().with_sounds(false));
        let root = ui.create_root(ROOT).unwrap();
        let button = ui.nodes().children(root)[0];
        ui.drain_events();
        ui.on_lbutton(button);
        assert_eq!(ui.drain_events(), vec![UiEvent::Activated { node: button }]);
    }

    #[test]
    fn right_click_runs_info_hook() {
        let mut ui = Ui::new(schema());
        let root = ui.create_root(ROOT).unwrap();
        let info = ui.nodes().children(root)[1];
        let click = MouseEvent::new(MouseAction::Down(MouseBtn::Right), 1, 5);
        assert!(ui.handle_input(InputEvent::Mouse(click)));
        assert_eq!(counter(&ui, info), 1);
        // The button is not an info node.
        let button = ui.nodes().children(root)[0];
        assert!(!ui.on_rbutton(button));
    }

    #[test]
    fn left_click_hits_the_button() {
        let mut ui = Ui::new(schema());
        let root = ui.create_root(ROOT).unwrap();
        let button = ui.nodes().children(root)[0];
        let click = MouseEvent::new(MouseAction::Down(MouseBtn::Left), 3, 1);
        assert!(ui.handle_input(InputEvent::Mouse(click)));
        assert_eq!(counter(&ui, button), 1);
        let miss = MouseEvent::new(MouseAction::Down(MouseBtn::Left), 30, 15);
        assert!(!ui.handle_input(InputEvent::Mouse(miss)));
    }

    #[test]
    fn update_ticks_every_node() {
        let mut ui = Ui::new(schema());
        let root = ui.create_root(ROOT).unwrap();
        let button = ui.nodes().children(root)[0];
        ui.update();
        ui.update();
        assert_eq!(counter(&ui, button), 2);
    }

    #[test]
    fn hidden_nodes_leave_the_focus_walk() {
        let mut ui = Ui::new(schema());
        let root = ui.create_root(ROOT).unwrap();
        assert_eq!(ui.focus().actions().valid_count, 2);
        let button = ui.nodes().children(root)[0];
        ui.set_visible(button, false);
        assert_eq!(ui.focus().actions().valid_count, 1);
        assert!(!ui.on_lbutton(button));
        ui.set_visible(button, true);
        assert_eq!(ui.focus().actions().valid_count, 2);
    }

    #[test]
    fn text_comes_from_provider_until_overridden() {
        let provider = |key: u32| (key == 7).then(|| "Hello".to_string());
        let mut ui = Ui::new(schema()).with_text_provider(provider);
        let root = ui.create_root(ROOT).unwrap();
        let label = ui.nodes().children(root)[2];
        assert_eq!(ui.text_of(label).as_deref(), Some("Hello"));
        ui.set_text(label, "Bye");
        assert_eq!(ui.text_of(label).as_deref(), Some("Bye"));
        ui.reload();
        assert_eq!(ui.text_of(label).as_deref(), Some("Hello"));
    }

    #[test]
    fn page_keys_turn_the_nearest_column() {
        let mut ui = Ui::new(schema());
        let root = ui.create_root(PAGED_ROOT).unwrap();
        let column = ui.nodes().children(root)[0];
        let info = ui.get_page_information(column).unwrap();
        assert_eq!(info.total, 2);

        assert!(ui.handle_input(InputEvent::Command(NavigationCommand::PageForward)));
        assert_eq!(ui.get_page_information(column).unwrap().current, 1);
        assert!(!ui.handle_input(InputEvent::Command(NavigationCommand::PageForward)));
        assert!(ui.handle_input(InputEvent::Key(KeyEvent::plain(Key::PageUp))));
        assert_eq!(ui.get_page_information(column).unwrap().current, 0);
    }

    #[test]
    fn resize_relayouts_root() {
        let mut ui = Ui::new(schema());
        let root = ui.create_root(ROOT).unwrap();
        ui.handle_input(InputEvent::Resize { width: 100, height: 30 });
        assert_eq!(ui.nodes().get(root).unwrap().position.size(), Size::new(100, 30));
        assert_eq!(ui.config().workspace, Size::new(100, 30));
    }
}
