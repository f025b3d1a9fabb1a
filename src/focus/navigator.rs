//! Focus stack, key actions and focus transitions.
//!
//! The stack holds the path of scopes the user has drilled into. Its top
//! frame (or the root when the stack is empty) is the current scope; the
//! scope's interactables in the frame's range are split into button groups,
//! and each group becomes one [`KeyAction`].

use super::grouping::{find_group_containing, interactables, reaches, split, GroupLookup, GroupingRange, MAX_GROUPS};
use crate::event::UiEvent;
use crate::geometry::{Offset, Region};
use crate::schema::{CallbackKind, InteractableOrientation, InteractablePlacement};
use crate::tree::{BehaviorFlags, NodeId};
use crate::ui::Ui;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// One focus stack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredFocus {
    pub node: NodeId,
    /// Subrange of the node's interactables in view; `None` is all of them.
    pub range: Option<GroupingRange>,
    /// Pointer distance to the node's box when focus was taken by the mouse.
    pub tracking_margin: Option<i32>,
}

impl StoredFocus {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            range: None,
            tracking_margin: None,
        }
    }
}

/// What pressing a button does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyAction {
    #[default]
    None,
    /// Push a frame narrowing `node`'s view to `range`.
    DescendIntoGroup { node: NodeId, range: GroupingRange },
    /// Make the node the single focus frame.
    MoveFocusToNode(NodeId),
    /// Hand the node back to the caller for activation.
    InvokeInteraction(NodeId),
    PopOneLevel,
}

/// On-screen marker of a group button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub node: NodeId,
    pub at: Offset,
    pub orientation: InteractableOrientation,
}

/// Actions for the current scope, rebuilt by
/// [`repopulate_key_actions`](Ui::repopulate_key_actions).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyActions {
    pub escape: KeyAction,
    pub buttons: [KeyAction; MAX_GROUPS],
    pub markers: [Option<Marker>; MAX_GROUPS],
    /// Number of leading buttons that carry an action.
    pub valid_count: usize,
}

/// Focus stack plus the derived key actions.
#[derive(Debug, Clone, Default)]
pub struct FocusState {
    pub(crate) stack: Vec<StoredFocus>,
    pub(crate) actions: KeyActions,
}

impl FocusState {
    pub fn stack(&self) -> &[StoredFocus] {
        &self.stack
    }

    pub fn actions(&self) -> &KeyActions {
        &self.actions
    }

    /// Node of the top frame.
    pub fn top(&self) -> Option<NodeId> {
        self.stack.last().map(|f| f.node)
    }
}

// ---------------------------------------------------------------------------
// Ui: navigation
// ---------------------------------------------------------------------------

impl Ui {
    /// Current scope: the top frame's node and range, or the whole root.
    fn focus_scope(&self) -> Option<(NodeId, Option<GroupingRange>)> {
        match self.focus.stack.last() {
            Some(frame) => Some((frame.node, frame.range)),
            None => self.root.map(|root| (root, None)),
        }
    }

    /// Rebuild the button actions and markers for the current scope.
    pub fn repopulate_key_actions(&mut self) {
        let mut actions = KeyActions {
            escape: if self.focus.stack.is_empty() {
                KeyAction::None
            } else {
                KeyAction::PopOneLevel
            },
            ..KeyActions::default()
        };

        if let Some((scope, range)) = self.focus_scope() {
            let members = interactables(&self.nodes, scope);
            let whole = GroupingRange::new(0, members.len());
            let range = range.filter(|r| whole.contains(*r)).unwrap_or(whole);
            let groups = split(range);
            for (i, group) in groups.iter().enumerate() {
                let first = members[group.start];
                actions.buttons[i] = if group.len() > 1 {
                    KeyAction::DescendIntoGroup { node: scope, range: *group }
                } else if self.is_activatable(first) {
                    KeyAction::InvokeInteraction(first)
                } else {
                    KeyAction::MoveFocusToNode(first)
                };
                actions.markers[i] = self.place_marker(first);
            }
            actions.valid_count = groups.len();
        }
        self.focus.actions = actions;
    }

    fn is_activatable(&self, id: NodeId) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|n| n.flags.intersects(BehaviorFlags::CLICKABLE | BehaviorFlags::INFO))
    }

    /// Marker position for an interactable, flipped to stay in the workspace.
    fn place_marker(&self, id: NodeId) -> Option<Marker> {
        let type_id = self.nodes.get(id)?.type_id;
        let def = self.schema.get_interactable_definition(type_id);
        let region = self.nodes.absolute_region(id);
        let offset = Offset::from(def.offset);
        let orientation = def.orientation();
        match def.placement() {
            InteractablePlacement::Suppressed => None,
            InteractablePlacement::Internal => Some(Marker {
                node: id,
                at: region.offset() + offset,
                orientation,
            }),
            InteractablePlacement::External => {
                let (at, orientation) = self.external_marker(region, offset, orientation);
                Some(Marker { node: id, at, orientation })
            }
        }
    }

    fn external_marker(
        &self,
        region: Region,
        offset: Offset,
        orientation: InteractableOrientation,
    ) -> (Offset, InteractableOrientation) {
        use InteractableOrientation::{Above, Below, Left, Right};
        let marker = self.config.marker_size;
        let workspace = self.config.workspace;
        let left = Offset::new(region.x - marker.width, region.y + offset.y);
        let right = Offset::new(region.right(), region.y + offset.y);
        let above = Offset::new(region.x + offset.x, region.y - marker.height);
        let below = Offset::new(region.x + offset.x, region.bottom());
        match orientation {
            Left if left.x < 0 => (right, Right),
            Left => (left, Left),
            Right if right.x + marker.width > workspace.width => (left, Left),
            Right => (right, Right),
            Above if above.y < 0 => (below, Below),
            Above => (above, Above),
            Below if below.y + marker.height > workspace.height => (above, Above),
            Below => (below, Below),
        }
    }

    /// Deepest node shared by the self-and-ancestor chains of `a` and `b`.
    pub fn find_common_root(&self, a: Option<NodeId>, b: Option<NodeId>) -> Option<NodeId> {
        let chain_b = self.chain(b?);
        self.chain(a?).into_iter().find(|n| chain_b.contains(n))
    }

    /// `id` followed by its ancestors.
    fn chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        chain.extend(self.nodes.ancestors(id));
        chain
    }

    /// Fire lose-focus up the old chain and gain-focus down the new one,
    /// stopping at their common root.
    fn transition_focus(&mut self, from: Option<NodeId>, to: Option<NodeId>) {
        if from == to {
            return;
        }
        let common = self.find_common_root(from, to);
        let losing: Vec<NodeId> = from
            .map(|f| self.chain(f).into_iter().take_while(|n| Some(*n) != common).collect())
            .unwrap_or_default();
        let mut gaining: Vec<NodeId> = to
            .map(|t| self.chain(t).into_iter().take_while(|n| Some(*n) != common).collect())
            .unwrap_or_default();
        gaining.reverse();

        log::trace!("focus {from:?} -> {to:?} (common {common:?})");
        for node in losing {
            self.fire(CallbackKind::LoseFocus, node);
        }
        for node in gaining {
            self.fire(CallbackKind::GainFocus, node);
        }
        self.events.push(UiEvent::FocusChanged { from, to });
    }

    /// Focus `target`.
    ///
    /// No-op when `target` already tops the stack. Without mouse tracking the
    /// stack is replaced by a single frame; with it, frames that cannot reach
    /// `target` are dropped and a frame remembering the pointer distance is
    /// pushed.
    pub fn set_window_focus(&mut self, target: NodeId) {
        if !self.nodes.contains(target) {
            return;
        }
        let current = self.focus.top();
        if current == Some(target) {
            return;
        }
        self.transition_focus(current, Some(target));

        let mut frame = StoredFocus::new(target);
        if self.config.mouse_tracking {
            frame.tracking_margin = Some(self.nodes.absolute_region(target).distance_to(self.mouse.position));
            let keep = self
                .focus
                .stack
                .iter()
                .take_while(|f| reaches(&self.nodes, f.node, target))
                .count();
            self.focus.stack.truncate(keep);
        } else {
            self.focus.stack.clear();
        }
        self.focus.stack.push(frame);
        self.repopulate_key_actions();
    }

    /// Empty the stack.
    pub fn clear_focus(&mut self) {
        let current = self.focus.top();
        self.transition_focus(current, None);
        self.focus.stack.clear();
        self.repopulate_key_actions();
    }

    /// Run button `index`. Returns the node to activate for
    /// [`KeyAction::InvokeInteraction`]; out-of-range buttons do nothing.
    pub fn take_key_action(&mut self, index: usize) -> Option<NodeId> {
        if index >= self.focus.actions.valid_count {
            return None;
        }
        let action = self.focus.actions.buttons.get(index).copied()?;
        self.apply_key_action(action)
    }

    /// Run the escape action.
    pub fn take_escape_action(&mut self) -> Option<NodeId> {
        let action = self.focus.actions.escape;
        self.apply_key_action(action)
    }

    fn apply_key_action(&mut self, action: KeyAction) -> Option<NodeId> {
        match action {
            KeyAction::None => None,
            KeyAction::DescendIntoGroup { node, range } => {
                let current = self.focus.top();
                self.transition_focus(current, Some(node));
                self.focus.stack.push(StoredFocus {
                    range: Some(range),
                    ..StoredFocus::new(node)
                });
                self.repopulate_key_actions();
                None
            }
            KeyAction::MoveFocusToNode(node) => {
                let current = self.focus.top();
                self.transition_focus(current, Some(node));
                self.focus.stack.clear();
                self.focus.stack.push(StoredFocus::new(node));
                self.repopulate_key_actions();
                None
            }
            KeyAction::InvokeInteraction(node) => Some(node),
            KeyAction::PopOneLevel => {
                if self.focus.stack.len() <= 1 {
                    self.clear_focus();
                } else {
                    let popped = self.focus.stack.pop().map(|f| f.node);
                    let top = self.focus.top();
                    self.transition_focus(popped, top);
                    self.repopulate_key_actions();
                }
                None
            }
        }
    }

    /// Drop every frame at or below `id` before it leaves the tree.
    pub(crate) fn evict_focus(&mut self, id: NodeId) {
        let Some(first) = self
            .focus
            .stack
            .iter()
            .position(|f| self.nodes.is_within(f.node, id))
        else {
            return;
        };
        let current = self.focus.top();
        self.focus.stack.truncate(first);
        let top = self.focus.top();
        log::trace!("evicted focus below {id:?}, {} frame(s) left", self.focus.stack.len());
        self.transition_focus(current, top);
        self.repopulate_key_actions();
    }

    /// Drop frames whose node is no longer shown or whose range outgrew the
    /// node's interactables, then rebuild the actions.
    pub(crate) fn refresh_focus(&mut self) {
        let stale = self.focus.stack.iter().position(|f| {
            let shown = self.chain(f.node).iter().all(|&n| self.nodes.get(n).is_some_and(|n| n.is_shown()));
            let count = interactables(&self.nodes, f.node).len();
            !shown || f.range.is_some_and(|r| r.end > count)
        });
        if let Some(first) = stale {
            let current = self.focus.top();
            self.focus.stack.truncate(first);
            let top = self.focus.top();
            self.transition_focus(current, top);
        }
        self.repopulate_key_actions();
    }

    /// Record the pointer and release sticky frames it moved away from.
    ///
    /// A frame taken by the mouse is released once the pointer is further
    /// from the frame's box than its tracking margin plus the configured
    /// release distance.
    pub fn update_mouse_tracking(&mut self, position: Offset) {
        self.mouse.position = position;
        if !self.config.mouse_tracking {
            return;
        }
        while let Some(frame) = self.focus.stack.last().copied() {
            let Some(margin) = frame.tracking_margin else {
                break;
            };
            let distance = self.nodes.absolute_region(frame.node).distance_to(position);
            if distance <= margin + self.config.focus_release_distance {
                break;
            }
            self.apply_key_action(KeyAction::PopOneLevel);
        }
        if let Some(target) = self.probe(position).focus {
            self.set_window_focus(target);
        }
    }

    /// Focus the smallest group around interactable `id`, so its buttons
    /// address `id` and its neighbours. Returns whether focus moved.
    pub fn focus_group_around(&mut self, id: NodeId) -> bool {
        let Some((scope, index)) = self.nodes.ancestors(id).into_iter().find_map(|a| {
            let index = interactables(&self.nodes, a).iter().position(|&n| n == id)?;
            Some((a, index))
        }) else {
            return false;
        };
        match find_group_containing(&self.nodes, scope, GroupingRange::single(index)) {
            GroupLookup::NotFound => false,
            GroupLookup::Whole => {
                self.set_window_focus(scope);
                true
            }
            GroupLookup::Found(range) => {
                self.set_window_focus(scope);
                if let Some(top) = self.focus.stack.last_mut().filter(|f| f.node == scope) {
                    top.range = Some(range);
                }
                self.repopulate_key_actions();
                true
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::schema::{
        InteractableDefinition, Point16, SchemaDefinition, SchemaStore, TypeDefinition,
    };
    use crate::tree::NodeClass;
    use crate::ui::UiConfig;
    use pretty_assertions::assert_eq;

    const LEAF: u32 = 0;
    const PANEL: u32 = 1;
    const ROOT: u32 = 2;

    /// Root holding `count` clickable leaves and one focusable panel of three.
    fn schema(count: usize) -> SchemaStore {
        let mut def = SchemaDefinition::new();
        def.push(
            TypeDefinition::new(NodeClass::Icon)
                .with_position(0, 0, 4, 2)
                .with_flags(BehaviorFlags::CLICKABLE),
        );
        def.push(
            TypeDefinition::new(NodeClass::Container)
                .with_position(0, 10, 20, 4)
                .with_flags(BehaviorFlags::FOCUS)
                .with_child(LEAF)
                .with_child(LEAF)
                .with_child(LEAF),
        );
        let mut root = TypeDefinition::new(NodeClass::Container).with_position(0, 0, 80, 24);
        for _ in 0..count {
            root = root.with_child(LEAF);
        }
        def.push(root.with_child(PANEL));
        SchemaStore::load(def.write_runtime())
    }

    fn ui(count: usize) -> (Ui, NodeId) {
        let mut ui = Ui::new(schema(count));
        let root = ui.create_root(ROOT).unwrap();
        (ui, root)
    }

    #[test]
    fn root_scope_actions() {
        let (ui, root) = ui(2);
        let actions = ui.focus().actions();
        assert_eq!(actions.valid_count, 3);
        assert_eq!(actions.escape, KeyAction::None);
        let kids = ui.nodes().children(root).to_vec();
        assert_eq!(actions.buttons[0], KeyAction::InvokeInteraction(kids[0]));
        assert_eq!(actions.buttons[2], KeyAction::MoveFocusToNode(kids[2]));
        assert_eq!(actions.buttons[3], KeyAction::None);
    }

    #[test]
    fn move_then_pop() {
        let (mut ui, root) = ui(2);
        let panel = ui.nodes().children(root)[2];
        assert_eq!(ui.take_key_action(2), None);
        assert_eq!(ui.focus().top(), Some(panel));
        assert_eq!(ui.focus().actions().valid_count, 3);
        assert_eq!(ui.focus().actions().escape, KeyAction::PopOneLevel);

        ui.take_escape_action();
        assert!(ui.focus().stack().is_empty());
        assert_eq!(ui.focus().actions().valid_count, 3);
    }

    #[test]
    fn descend_narrows_scope() {
        let (mut ui, root) = ui(24);
        // 25 interactables: first group has three members.
        assert_eq!(
            ui.focus().actions().buttons[0],
            KeyAction::DescendIntoGroup { node: root, range: GroupingRange::new(0, 3) }
        );
        ui.take_key_action(0);
        assert_eq!(ui.focus().stack().len(), 1);
        assert_eq!(ui.focus().actions().valid_count, 3);
        let first = ui.nodes().children(root)[0];
        assert_eq!(ui.take_key_action(0), Some(first));

        // Pop with one frame clears focus.
        ui.take_escape_action();
        assert!(ui.focus().stack().is_empty());
    }

    #[test]
    fn out_of_range_buttons_are_noops() {
        let (mut ui, _root) = ui(2);
        assert_eq!(ui.take_key_action(3), None);
        assert_eq!(ui.take_key_action(99), None);
        assert!(ui.focus().stack().is_empty());
    }

    #[test]
    fn set_window_focus_is_idempotent_and_emits_events() {
        let (mut ui, root) = ui(1);
        let panel = ui.nodes().children(root)[1];
        ui.drain_events();
        ui.set_window_focus(panel);
        ui.set_window_focus(panel);
        assert_eq!(
            ui.drain_events(),
            vec![UiEvent::FocusChanged { from: None, to: Some(panel) }]
        );
        assert_eq!(ui.focus().stack().len(), 1);
    }

    #[test]
    fn common_root_of_siblings_is_parent() {
        let (ui, root) = ui(2);
        let kids = ui.nodes().children(root).to_vec();
        let inner = ui.nodes().children(kids[2])[0];
        assert_eq!(ui.find_common_root(Some(kids[0]), Some(inner)), Some(root));
        assert_eq!(ui.find_common_root(Some(inner), Some(kids[2])), Some(kids[2]));
        assert_eq!(ui.find_common_root(None, Some(inner)), None);
    }

    #[test]
    fn focus_group_around_zooms() {
        let (mut ui, root) = ui(24);
        let fourth = ui.nodes().children(root)[4];
        assert!(ui.focus_group_around(fourth));
        assert_eq!(ui.focus().stack()[0].range, Some(GroupingRange::new(3, 5)));
        assert_eq!(ui.focus().actions().buttons[1], KeyAction::InvokeInteraction(fourth));
    }

    #[test]
    fn external_markers_flip_at_workspace_edge() {
        let mut def = SchemaDefinition::new();
        def.push(TypeDefinition::new(NodeClass::Icon));
        def.push(
            TypeDefinition::new(NodeClass::Icon)
                .with_position(78, 0, 2, 2)
                .with_flags(BehaviorFlags::CLICKABLE)
                .with_interactable(InteractableDefinition::new(
                    Point16::new(0, 0),
                    InteractableOrientation::Right,
                    InteractablePlacement::External,
                )),
        );
        def.push(
            TypeDefinition::new(NodeClass::Container)
                .with_position(0, 0, 80, 24)
                .with_child(1),
        );
        let config = UiConfig::default()
            .with_workspace(Size::new(80, 24))
            .with_marker_size(Size::new(2, 1));
        let mut ui = Ui::with_config(SchemaStore::load(def.write_runtime()), config);
        ui.create_root(2).unwrap();
        let marker = ui.focus().actions().markers[0].unwrap();
        assert_eq!(marker.orientation, InteractableOrientation::Left);
        assert_eq!(marker.at, Offset::new(76, 0));
    }
}
