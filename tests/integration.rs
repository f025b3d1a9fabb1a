//! Integration tests for schemata.
//!
//! These tests exercise the public API from outside the crate: schemas are
//! authored, serialized and loaded, then driven through a headless [`Pilot`].

use pretty_assertions::assert_eq;

use schemata::codec::{build_buckets, HashView, MapHeader, Reader, SerializationBuffer};
use schemata::event::UiEvent;
use schemata::focus::{interactables, make_top_groups, reaches, GroupingRange, KeyAction};
use schemata::platform::{FileSystem, NativeFileSystem};
use schemata::schema::{
    load_project, read_project, write_project, CallbackKind, ColumnProperties, FunctionRegistry,
    HorizontalAlign, PageUiDefinitions, SchemaDefinition, SchemaStore, TextInformation,
    TypeDefinition, TypeId,
};
use schemata::testing::{DrawCall, Pilot};
use schemata::tree::{BehaviorFlags, NodeClass, NodeId, PageInfo};
use schemata::{Offset, Size, Ui, UiConfig};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn button_row(count: usize) -> (SchemaStore, TypeId) {
    let mut def = SchemaDefinition::new();
    let button = def.push(
        TypeDefinition::new(NodeClass::Icon)
            .with_position(0, 0, 3, 1)
            .with_flags(BehaviorFlags::CLICKABLE),
    );
    let mut root = TypeDefinition::new(NodeClass::Container).with_position(0, 0, 80, 24);
    for _ in 0..count {
        root = root.with_child(button);
    }
    let root = def.push(root);
    (SchemaStore::load(def.write_runtime()), root)
}

fn assert_stack_reachable(ui: &Ui) {
    let stack = ui.focus().stack();
    for pair in stack.windows(2) {
        assert!(
            reaches(ui.nodes(), pair[0].node, pair[1].node),
            "{:?} cannot reach {:?}",
            pair[0].node,
            pair[1].node
        );
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

#[test]
fn twenty_five_interactables_make_twelve_groups() {
    let (schema, root_type) = button_row(25);
    let pilot = Pilot::new(schema, root_type).unwrap();
    let root = pilot.root().unwrap();

    let groups = make_top_groups(pilot.ui().nodes(), root);
    let sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
    assert_eq!(sizes, vec![3, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2]);
    assert_eq!(sizes.iter().sum::<usize>(), 25);
    for pair in groups.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
    assert_eq!(pilot.ui().focus().actions().valid_count, 12);
}

#[test]
fn buttons_zoom_then_invoke() {
    let (schema, root_type) = button_row(25);
    let mut pilot = Pilot::new(schema, root_type).unwrap();
    let root = pilot.root().unwrap();

    assert!(pilot.button(0));
    assert_eq!(focus_range(pilot.ui()), Some(GroupingRange::new(0, 3)));
    assert_eq!(pilot.ui().focus().actions().valid_count, 3);
    assert_stack_reachable(pilot.ui());

    let third = pilot.ui().nodes().children(root)[2];
    assert_eq!(pilot.ui().focus().actions().buttons[2], KeyAction::InvokeInteraction(third));
    pilot.events();
    assert!(pilot.button(2));
    assert!(pilot.events().contains(&UiEvent::Activated { node: third }));

    assert!(pilot.escape());
    assert_eq!(pilot.focused(), None);
    assert_eq!(pilot.ui().focus().actions().valid_count, 12);
}

fn focus_range(ui: &Ui) -> Option<GroupingRange> {
    ui.focus().stack().last().and_then(|f| f.range)
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[test]
fn five_rows_in_four_and_a_half_page_twice() {
    let mut def = SchemaDefinition::new();
    let row = def.push(
        TypeDefinition::new(NodeClass::Icon)
            .with_position(0, 0, 20, 10)
            .with_flags(BehaviorFlags::CLICKABLE),
    );
    let mut column = TypeDefinition::new(NodeClass::DynamicColumn)
        .with_position(0, 0, 20, 45)
        .with_column_properties(ColumnProperties::new(20, 0, 1));
    for _ in 0..5 {
        column = column.with_child(row);
    }
    let column = def.push(column);

    let config = UiConfig::default().with_workspace(Size::new(20, 45));
    let mut pilot = Pilot::with_config(SchemaStore::load(def.write_runtime()), column, config).unwrap();
    let root = pilot.root().unwrap();
    let rows = pilot.ui().nodes().children(root).to_vec();

    assert_eq!(
        pilot.ui().get_page_information(root),
        Some(PageInfo { current: 0, total: 2 })
    );
    let on_page = |ui: &Ui| -> Vec<bool> {
        rows.iter()
            .map(|&r| !ui.nodes().get(r).unwrap().flags.contains(BehaviorFlags::OFF_PAGE))
            .collect()
    };
    assert_eq!(on_page(pilot.ui()), vec![true, true, true, true, false]);

    assert!(pilot.ui_mut().change_page(root, 1));
    assert_eq!(on_page(pilot.ui()), vec![false, false, false, false, true]);
    assert_eq!(pilot.events(), vec![UiEvent::PageChanged { node: root, page: 1 }]);
    assert!(!pilot.ui_mut().change_page(root, 2));
}

#[test]
fn page_arrows_turn_the_column() {
    let mut def = SchemaDefinition::new();
    let row = def.push(
        TypeDefinition::new(NodeClass::Icon)
            .with_position(0, 0, 20, 10)
            .with_flags(BehaviorFlags::CLICKABLE),
    );
    let arrow = def.push(
        TypeDefinition::new(NodeClass::Icon)
            .with_position(0, 0, 2, 1)
            .with_flags(BehaviorFlags::CLICKABLE),
    );
    let mut column = TypeDefinition::new(NodeClass::DynamicColumn)
        .with_position(0, 0, 20, 30)
        .with_page_ui(PageUiDefinitions::new(Some(arrow), Some(arrow), None));
    for _ in 0..4 {
        column = column.with_child(row);
    }
    let column = def.push(column);

    let config = UiConfig::default().with_workspace(Size::new(20, 30));
    let mut pilot = Pilot::with_config(SchemaStore::load(def.write_runtime()), column, config).unwrap();
    let root = pilot.root().unwrap();
    assert_eq!(pilot.ui().get_page_information(root).map(|p| p.total), Some(2));

    // The forward arrow sits in the bottom-right corner.
    assert!(pilot.click(19, 29));
    assert_eq!(pilot.ui().get_page_information(root).map(|p| p.current), Some(1));
    assert!(pilot.click(0, 29));
    assert_eq!(pilot.ui().get_page_information(root).map(|p| p.current), Some(0));
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

#[test]
fn sparse_map_view_finds_written_keys() {
    let entries = [(3u32, 0xAAAA_u32), (7, 0xBBBB)];
    let buckets = build_buckets(entries.iter().map(|(k, _)| *k));
    let mut buf = SerializationBuffer::new();
    buf.write(&MapHeader {
        bucket_count: buckets.len() as u32,
        value_count: entries.len() as u32,
    });
    buf.write_map_values(&entries);
    buf.write_map_buckets(&buckets);
    let bytes = buf.finalize();

    let mut reader = Reader::new(&bytes);
    let header = reader.read::<MapHeader>();
    let map = HashView::<u32>::read(&mut reader, header);
    assert_eq!(map.find(3), Some(0xAAAA));
    assert_eq!(map.find(7), Some(0xBBBB));
    assert_eq!(map.find(5), None);
}

// ---------------------------------------------------------------------------
// Schema files
// ---------------------------------------------------------------------------

fn noop(_: &mut Ui, _: NodeId) {}

fn authored() -> SchemaDefinition {
    let mut def = SchemaDefinition::new();
    def.sound_count = 4;
    let label = def.push(
        TypeDefinition::new(NodeClass::Text)
            .with_position(1, 1, 10, 1)
            .with_text(TextInformation::new(42, 1, 10, HorizontalAlign::Center))
            .with_callback(CallbackKind::Update, "noop"),
    );
    def.push(
        TypeDefinition::new(NodeClass::Container)
            .with_position(0, 0, 30, 10)
            .with_child(label)
            .with_divider_index(1)
            .with_interaction_sound(2),
    );
    def
}

#[test]
fn authored_schema_survives_both_formats() {
    let def = authored();
    assert_eq!(read_project(&write_project(&def)).unwrap(), def);

    let registry = FunctionRegistry::new().with_node_fn("noop", noop);
    let store = SchemaStore::load_with(def.write_runtime(), registry);
    assert_eq!(store.type_count(), 2);
    assert_eq!(store.get_text_information(0).text_key, 42);
    assert_eq!(store.get_text_information(1), TextInformation::default());
    assert_eq!(store.get_divider_index(1), 1);
    assert_eq!(store.get_interaction_sound(1), 2);
    assert_eq!(store.get_fixed_children(1).to_vec(), vec![0]);
    assert!(store.has_callback(CallbackKind::Update, 0));
    assert!(!store.has_callback(CallbackKind::Update, 1));
    assert_eq!(store.resources().sounds, 4);
}

#[test]
fn schema_files_load_through_the_file_system() {
    let dir = std::env::temp_dir().join(format!("schemata-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let def = authored();
    std::fs::write(dir.join("ui.proj"), write_project(&def)).unwrap();
    std::fs::write(dir.join("ui.bin"), def.write_runtime()).unwrap();

    let fs = NativeFileSystem;
    assert_eq!(fs.list_dir(&dir).unwrap().len(), 2);
    assert_eq!(load_project(&fs, &dir.join("ui.proj")).unwrap(), def);
    let store = SchemaStore::load_from_file(&fs, &dir.join("ui.bin"), FunctionRegistry::new()).unwrap();
    assert_eq!(store.get_text_information(0).text_key, 42);
    assert!(SchemaStore::load_from_file(&fs, &dir.join("missing.bin"), FunctionRegistry::new()).is_err());

    std::fs::remove_dir_all(&dir).unwrap();
}

// ---------------------------------------------------------------------------
// Allocation and focus
// ---------------------------------------------------------------------------

#[test]
fn released_nodes_are_recycled_not_reallocated() {
    let (schema, root_type) = button_row(3);
    let mut ui = Ui::new(schema);
    let root = ui.create_root(root_type).unwrap();
    let first = ui.nodes().children(root)[0];
    let allocated = ui.nodes().allocation_count();

    ui.release_node(first);
    assert!(!ui.nodes().contains(first));
    assert_eq!(ui.nodes().children(root).len(), 2);
    assert_eq!(ui.nodes().free_count(0), 1);

    let again = ui.make_control_by_type(Some(root), 0).unwrap();
    assert_ne!(again, first);
    assert_eq!(ui.nodes().free_count(0), 0);
    assert_eq!(ui.nodes().allocation_count(), allocated);
    assert_eq!(ui.nodes().parent(again), Some(root));
}

#[test]
fn releasing_the_focused_leaf_clears_it_from_the_stack() {
    let (schema, root_type) = button_row(3);
    let mut ui = Ui::new(schema);
    let root = ui.create_root(root_type).unwrap();
    let leaf = ui.nodes().children(root)[1];

    ui.set_window_focus(leaf);
    assert_eq!(ui.focused(), Some(leaf));
    ui.release_node(leaf);
    assert!(ui.focus().stack().iter().all(|f| f.node != leaf));
    ui.repopulate_key_actions();
    assert_eq!(ui.focus().actions().valid_count, 2);
}

#[test]
fn nodes_added_to_a_live_tree_get_a_button() {
    let (schema, root_type) = button_row(1);
    let mut pilot = Pilot::new(schema, root_type).unwrap();
    let root = pilot.root().unwrap();
    assert_eq!(pilot.ui().focus().actions().valid_count, 1);

    let added = pilot.ui_mut().make_control_by_type(Some(root), 0).unwrap();
    assert_eq!(pilot.ui().focus().actions().valid_count, 2);
    assert_eq!(pilot.ui().focus().actions().buttons[1], KeyAction::InvokeInteraction(added));

    pilot.events();
    assert!(pilot.button(1));
    assert!(pilot.events().contains(&UiEvent::Activated { node: added }));
}

#[test]
fn rows_added_to_a_full_column_start_off_page() {
    let mut def = SchemaDefinition::new();
    let row = def.push(
        TypeDefinition::new(NodeClass::Icon)
            .with_position(0, 0, 20, 10)
            .with_flags(BehaviorFlags::CLICKABLE),
    );
    let mut column = TypeDefinition::new(NodeClass::DynamicColumn)
        .with_position(0, 0, 20, 45)
        .with_column_properties(ColumnProperties::new(20, 0, 1));
    for _ in 0..4 {
        column = column.with_child(row);
    }
    let column = def.push(column);

    let config = UiConfig::default().with_workspace(Size::new(20, 45));
    let mut pilot = Pilot::with_config(SchemaStore::load(def.write_runtime()), column, config).unwrap();
    let root = pilot.root().unwrap();
    assert_eq!(pilot.ui().get_page_information(root).map(|p| p.total), Some(1));

    let added = pilot.ui_mut().make_control_by_type(Some(root), row).unwrap();
    assert_eq!(
        pilot.ui().get_page_information(root),
        Some(PageInfo { current: 0, total: 2 })
    );
    assert!(pilot.ui().nodes().get(added).unwrap().flags.contains(BehaviorFlags::OFF_PAGE));
    assert_eq!(pilot.ui().focus().actions().valid_count, 4);
}

/// Stack frames reach each other and every button points at a live,
/// shown node.
fn assert_focus_consistent(ui: &Ui) {
    assert_stack_reachable(ui);
    let live_shown = |id: NodeId| ui.nodes().get(id).is_some_and(|n| n.is_shown());
    for frame in ui.focus().stack() {
        assert!(live_shown(frame.node), "stale frame {:?}", frame.node);
    }
    let actions = ui.focus().actions();
    for action in &actions.buttons[..actions.valid_count] {
        match *action {
            KeyAction::DescendIntoGroup { node, range } => {
                assert!(live_shown(node), "stale group owner {node:?}");
                assert!(range.end <= interactables(ui.nodes(), node).len());
            }
            KeyAction::MoveFocusToNode(node) | KeyAction::InvokeInteraction(node) => {
                assert!(live_shown(node), "stale button target {node:?}");
            }
            KeyAction::None | KeyAction::PopOneLevel => panic!("unexpected {action:?} on a button"),
        }
    }
    assert!(actions.buttons[actions.valid_count..].iter().all(|a| *a == KeyAction::None));
}

#[test]
fn focus_stays_consistent_through_tree_mutations() {
    let mut def = SchemaDefinition::new();
    let button = def.push(
        TypeDefinition::new(NodeClass::Icon)
            .with_position(0, 0, 3, 1)
            .with_flags(BehaviorFlags::CLICKABLE),
    );
    let mut panel = TypeDefinition::new(NodeClass::Container)
        .with_position(0, 0, 40, 10)
        .with_flags(BehaviorFlags::FOCUS);
    for _ in 0..13 {
        panel = panel.with_child(button);
    }
    let panel = def.push(panel);
    let root = def.push(
        TypeDefinition::new(NodeClass::Container)
            .with_position(0, 0, 80, 24)
            .with_child(panel)
            .with_child(button),
    );
    let mut pilot = Pilot::new(SchemaStore::load(def.write_runtime()), root).unwrap();
    let root = pilot.root().unwrap();
    let panel = pilot.ui().nodes().children(root)[0];
    let outer = pilot.ui().nodes().children(root)[1];
    assert_focus_consistent(pilot.ui());
    assert_eq!(pilot.ui().focus().actions().buttons[0], KeyAction::MoveFocusToNode(panel));

    // Enter the panel.
    assert!(pilot.button(0));
    assert_eq!(pilot.focused(), Some(panel));
    assert_focus_consistent(pilot.ui());

    // Allocate under the focused parent: the new button is addressable.
    let added = pilot.ui_mut().make_control_by_type(Some(panel), button).unwrap();
    assert_focus_consistent(pilot.ui());
    assert_eq!(pilot.ui().focus().actions().buttons[11], KeyAction::InvokeInteraction(added));

    // Descend into the first group.
    assert!(pilot.button(0));
    assert_eq!(focus_range(pilot.ui()), Some(GroupingRange::new(0, 2)));
    assert_eq!(pilot.ui().focus().stack().len(), 2);
    assert_focus_consistent(pilot.ui());

    // Release a member of the focused group.
    let first = pilot.ui().nodes().children(panel)[0];
    pilot.ui_mut().release_node(first);
    assert_focus_consistent(pilot.ui());
    let actions = pilot.ui().focus().actions();
    assert!(actions.buttons.iter().all(|a| *a != KeyAction::InvokeInteraction(first)));

    // Pop back to the panel.
    pilot.escape();
    assert_eq!(pilot.ui().focus().stack().len(), 1);
    assert_focus_consistent(pilot.ui());

    // Release the focused node itself.
    pilot.ui_mut().release_node(panel);
    assert!(pilot.ui().focus().stack().is_empty());
    assert_focus_consistent(pilot.ui());
    assert_eq!(pilot.ui().focus().actions().valid_count, 1);
    assert_eq!(pilot.ui().focus().actions().buttons[0], KeyAction::InvokeInteraction(outer));

    pilot.escape();
    assert_focus_consistent(pilot.ui());
}

#[test]
fn mouse_tracking_keeps_the_stack_reachable() {
    let mut def = SchemaDefinition::new();
    let button = def.push(
        TypeDefinition::new(NodeClass::Icon)
            .with_position(1, 1, 3, 1)
            .with_flags(BehaviorFlags::CLICKABLE | BehaviorFlags::FOCUS),
    );
    let panel = def.push(
        TypeDefinition::new(NodeClass::Container)
            .with_position(0, 0, 10, 5)
            .with_flags(BehaviorFlags::FOCUS)
            .with_child(button),
    );
    let outer = def.push(
        TypeDefinition::new(NodeClass::Icon)
            .with_position(20, 10, 3, 1)
            .with_flags(BehaviorFlags::CLICKABLE | BehaviorFlags::FOCUS),
    );
    let root = def.push(
        TypeDefinition::new(NodeClass::Container)
            .with_position(0, 0, 40, 20)
            .with_child(panel)
            .with_child(outer),
    );
    let config = UiConfig::default().with_mouse_tracking(true);
    let mut pilot = Pilot::with_config(SchemaStore::load(def.write_runtime()), root, config).unwrap();
    let root = pilot.root().unwrap();
    let panel = pilot.ui().nodes().children(root)[0];
    let inner = pilot.ui().nodes().children(panel)[0];

    let path = [(5, 4), (2, 1), (2, 1), (8, 3), (30, 15), (2, 1), (1, 1), (39, 19)];
    for (x, y) in path {
        pilot.move_mouse(x, y);
        assert_stack_reachable(pilot.ui());
    }

    pilot.move_mouse(5, 4);
    assert_eq!(pilot.focused(), Some(panel));
    pilot.move_mouse(2, 1);
    assert_eq!(pilot.focused(), Some(inner));
    let nodes: Vec<NodeId> = pilot.ui().focus().stack().iter().map(|f| f.node).collect();
    assert_eq!(nodes, vec![panel, inner]);
}

#[test]
fn hover_focus_stops_at_the_first_focus_ancestor() {
    let mut def = SchemaDefinition::new();
    let leaf = def.push(
        TypeDefinition::new(NodeClass::Icon)
            .with_position(1, 1, 3, 1)
            .with_flags(BehaviorFlags::CLICKABLE),
    );
    let group = def.push(
        TypeDefinition::new(NodeClass::Container)
            .with_position(2, 2, 10, 5)
            .with_flags(BehaviorFlags::FOCUS | BehaviorFlags::TRANSPARENT_TO_FOCUS)
            .with_child(leaf),
    );
    let root = def.push(
        TypeDefinition::new(NodeClass::Container)
            .with_position(0, 0, 40, 20)
            .with_child(group),
    );
    let pilot = Pilot::new(SchemaStore::load(def.write_runtime()), root).unwrap();
    let root = pilot.root().unwrap();
    let group = pilot.ui().nodes().children(root)[0];
    let leaf = pilot.ui().nodes().children(group)[0];

    // A clickable leaf carries non-zero flags but is not itself a focus target.
    assert_eq!(pilot.ui().effective_focus_target(leaf), Some(group));
    assert_eq!(pilot.ui().probe(Offset::new(4, 3)).focus, Some(group));
    assert_eq!(pilot.ui().effective_focus_target(root), None);
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[test]
fn text_nodes_draw_provider_strings() {
    let def = authored();
    let mut ui = Ui::new(SchemaStore::load(def.write_runtime()))
        .with_text_provider(|key: u32| (key == 42).then(|| "hello".to_string()));
    let root = ui.create_root(1).unwrap();
    let label = ui.nodes().children(root)[0];

    let pilot = Pilot::from_ui(ui);
    let texts: Vec<String> = pilot
        .render()
        .into_iter()
        .filter_map(|c| match c {
            DrawCall::Text { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["hello".to_string()]);
    assert_eq!(pilot.ui().text_of(label).as_deref(), Some("hello"));
}
