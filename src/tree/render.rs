//! Drawing and hit-testing of the node tree.
//!
//! Both passes walk the tree depth-first from the root. Children flagged
//! [`POPUP`](BehaviorFlags::POPUP) are not visited in place: they are pushed
//! onto a postponed list together with their parent's absolute offset and
//! handled after the rest of the tree, in the order they were met, so later
//! pop-ups draw and hit-test on top.

use super::node::{BehaviorFlags, NodeId, NodeKind};
use crate::geometry::{Offset, Region};
use crate::platform::RenderBackend;
use crate::schema::BackgroundFill;
use crate::ui::Ui;

/// Pop-ups met during a pass: node and its parent's absolute offset.
pub type Postponed = Vec<(NodeId, Offset)>;

/// Per-channel result of a mouse probe. Each channel keeps the last
/// (topmost) node that claimed it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeResult {
    /// Clickable or info node: receives button presses.
    pub primary: Option<NodeId>,
    /// Scroll target or paginated node: receives the wheel.
    pub scroll: Option<NodeId>,
    /// Topmost node under the pointer.
    pub hover: Option<NodeId>,
    /// Focus target enclosing the hit.
    pub focus: Option<NodeId>,
}

impl Ui {
    /// Draw the tree, then pop-ups, then the button markers.
    pub fn render(&self, backend: &mut dyn RenderBackend) {
        let Some(root) = self.root else {
            return;
        };
        let mut postponed = Postponed::new();
        self.render_node(root, Offset::default(), &mut postponed, backend);
        let mut next = 0;
        while let Some(&(popup, offset)) = postponed.get(next) {
            self.render_popup(popup, offset, &mut postponed, backend);
            next += 1;
        }

        for (button, marker) in self.focus.actions.markers.iter().enumerate() {
            if let Some(marker) = marker {
                backend.draw_interactable(marker.at, button, marker.orientation);
            }
        }
    }

    fn render_popup(
        &self,
        id: NodeId,
        offset: Offset,
        postponed: &mut Postponed,
        backend: &mut dyn RenderBackend,
    ) {
        self.draw_self(id, offset, backend);
        if let Some(node) = self.nodes.get(id) {
            self.render_children(id, offset + node.position.offset(), postponed, backend);
        }
    }

    /// Draw `id` at `offset` (its parent's absolute position) and its subtree.
    pub fn render_node(
        &self,
        id: NodeId,
        offset: Offset,
        postponed: &mut Postponed,
        backend: &mut dyn RenderBackend,
    ) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if !node.is_shown() {
            return;
        }
        self.draw_self(id, offset, backend);
        self.render_children(id, offset + node.position.offset(), postponed, backend);
    }

    fn render_children(
        &self,
        id: NodeId,
        origin: Offset,
        postponed: &mut Postponed,
        backend: &mut dyn RenderBackend,
    ) {
        for &child in self.nodes.children(id) {
            let popup = self
                .nodes
                .get(child)
                .is_some_and(|c| c.is_shown() && c.flags.contains(BehaviorFlags::POPUP));
            if popup {
                postponed.push((child, origin));
            } else {
                self.render_node(child, origin, postponed, backend);
            }
        }
        self.draw_divider(id, origin, backend);
    }

    fn draw_self(&self, id: NodeId, offset: Offset, backend: &mut dyn RenderBackend) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let type_id = node.type_id;
        let region = node.position.translate(offset);
        let brushes = self.schema.get_brushes(type_id);
        let focused = self.focus.top() == Some(id);

        let background = self.schema.get_background(type_id);
        match background.fill() {
            BackgroundFill::Brush(brush) => {
                let brush = if focused && brushes.highlight != 0 { brushes.highlight } else { brush };
                backend.draw_rect(region, brush);
            }
            BackgroundFill::Image(image) => backend.draw_image(region, image, true),
            BackgroundFill::None if focused && brushes.highlight != 0 => {
                backend.draw_rect(region, brushes.highlight);
            }
            BackgroundFill::None => {}
        }

        let icon = self.schema.get_icon(type_id);
        if icon != 0 {
            let at = region.offset() + self.schema.get_icon_position(type_id);
            backend.draw_icon(at, icon, brushes.foreground);
        }

        let inner = Region::new(
            region.x + i32::from(background.border_x),
            region.y + i32::from(background.border_y),
            (region.width - 2 * i32::from(background.border_x)).max(0),
            (region.height - 2 * i32::from(background.border_y)).max(0),
        );
        match &node.kind {
            NodeKind::Image => {
                let info = self.schema.get_image_information(type_id);
                backend.draw_image(inner, info.image, info.stretches());
            }
            NodeKind::Text { .. } | NodeKind::EditText { .. } => {
                if let Some(text) = self.text_of(id) {
                    let info = self.schema.get_text_information(type_id);
                    backend.draw_text(inner, &text, &info, brushes.foreground);
                }
            }
            _ => {}
        }
    }

    /// Separator line ahead of child `divider_index` of a container.
    fn draw_divider(&self, id: NodeId, origin: Offset, backend: &mut dyn RenderBackend) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let Ok(index) = usize::try_from(self.schema.get_divider_index(node.type_id)) else {
            return;
        };
        if index == 0 {
            return;
        }
        let Some(child) = node.get_child(index).and_then(|c| self.nodes.get(c)) else {
            return;
        };
        let brush = self.schema.get_brushes(node.type_id).foreground;
        let at = origin + child.position.offset();
        if self.schema.get_horizontal_orientation(node.type_id) {
            let from = Offset::new(at.x - 1, origin.y);
            backend.draw_line(from, Offset::new(at.x - 1, origin.y + node.position.height), brush);
        } else {
            let from = Offset::new(origin.x, at.y - 1);
            backend.draw_line(from, Offset::new(origin.x + node.position.width, at.y - 1), brush);
        }
    }

    // -----------------------------------------------------------------------
    // Mouse probe
    // -----------------------------------------------------------------------

    /// Hit-test the whole tree at workspace `point`.
    pub fn probe(&self, point: Offset) -> ProbeResult {
        let mut result = ProbeResult::default();
        let Some(root) = self.root else {
            return result;
        };
        let mut postponed = Postponed::new();
        self.mouse_probe(root, point, Offset::default(), &mut postponed, &mut result);
        let mut next = 0;
        while let Some(&(popup, offset)) = postponed.get(next) {
            self.probe_popup(popup, point, offset, &mut postponed, &mut result);
            next += 1;
        }
        result
    }

    /// Hit-test `id` (positioned relative to `offset`) and its subtree,
    /// overwriting each channel of `result` the hit claims.
    pub fn mouse_probe(
        &self,
        id: NodeId,
        point: Offset,
        offset: Offset,
        postponed: &mut Postponed,
        result: &mut ProbeResult,
    ) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if !node.is_shown() {
            return;
        }
        self.probe_popup(id, point, offset, postponed, result);
    }

    fn probe_popup(
        &self,
        id: NodeId,
        point: Offset,
        offset: Offset,
        postponed: &mut Postponed,
        result: &mut ProbeResult,
    ) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let region = node.position.translate(offset);
        if !region.contains(point) {
            self.postpone_popups(id, region.offset(), postponed);
            return;
        }
        if !node.flags.contains(BehaviorFlags::MOUSE_TRANSPARENT) {
            if node.flags.intersects(BehaviorFlags::CLICKABLE | BehaviorFlags::INFO) {
                result.primary = Some(id);
            }
            if node.flags.contains(BehaviorFlags::SCROLL_TARGET) || node.kind.paged().is_some() {
                result.scroll = Some(id);
            }
            result.hover = Some(id);
            if let Some(target) = self.effective_focus_target(id) {
                result.focus = Some(target);
            }
        }

        let origin = region.offset();
        for &child in node.children.iter() {
            let popup = self
                .nodes
                .get(child)
                .is_some_and(|c| c.is_shown() && c.flags.contains(BehaviorFlags::POPUP));
            if popup {
                postponed.push((child, origin));
            } else {
                self.mouse_probe(child, point, origin, postponed, result);
            }
        }
    }

    /// Queue the shown pop-ups below a missed node. Pop-ups draw outside
    /// their parent's box, so a miss on the parent does not rule them out.
    fn postpone_popups(&self, id: NodeId, origin: Offset, postponed: &mut Postponed) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        for &child in node.children.iter() {
            let Some(c) = self.nodes.get(child).filter(|c| c.is_shown()) else {
                continue;
            };
            if c.flags.contains(BehaviorFlags::POPUP) {
                postponed.push((child, origin));
            } else {
                self.postpone_popups(child, c.position.translate(origin).offset(), postponed);
            }
        }
    }

    /// `id` or its nearest ancestor flagged [`FOCUS`](BehaviorFlags::FOCUS).
    pub fn effective_focus_target(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.nodes.get(node_id)?;
            if node.flags.contains(BehaviorFlags::FOCUS) {
                return Some(node_id);
            }
            current = node.parent;
        }
        None
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BackgroundDefinition, BrushSet, Point16, SchemaDefinition, SchemaStore, TypeDefinition};
    use crate::testing::{DrawCall, RecordingBackend};
    use crate::tree::NodeClass;
    use pretty_assertions::assert_eq;

    const BUTTON: u32 = 0;
    const POPUP: u32 = 1;
    const PANEL: u32 = 2;
    const ROOT: u32 = 3;

    fn schema() -> SchemaStore {
        let mut def = SchemaDefinition::new();
        def.push(
            TypeDefinition::new(NodeClass::Icon)
                .with_position(2, 2, 6, 2)
                .with_flags(BehaviorFlags::CLICKABLE)
                .with_icon(5, Point16::new(1, 0)),
        );
        def.push(
            TypeDefinition::new(NodeClass::Container)
                .with_position(0, 0, 10, 10)
                .with_flags(BehaviorFlags::POPUP | BehaviorFlags::CLICKABLE)
                .with_background(BackgroundDefinition::new(BackgroundFill::Brush(9), 0, 0)),
        );
        def.push(
            TypeDefinition::new(NodeClass::Container)
                .with_position(10, 0, 20, 10)
                .with_flags(BehaviorFlags::FOCUS | BehaviorFlags::TRANSPARENT_TO_FOCUS)
                .with_brushes(BrushSet { highlight: 4, ..BrushSet::default() })
                .with_child(BUTTON),
        );
        def.push(
            TypeDefinition::new(NodeClass::Container)
                .with_position(0, 0, 40, 20)
                .with_child(POPUP)
                .with_child(PANEL),
        );
        SchemaStore::load(def.write_runtime())
    }

    fn ui() -> (Ui, NodeId) {
        let mut ui = Ui::new(schema());
        let root = ui.create_root(ROOT).unwrap();
        (ui, root)
    }

    #[test]
    fn popups_draw_after_siblings() {
        let (ui, _root) = ui();
        let mut backend = RecordingBackend::new();
        ui.render(&mut backend);
        let calls: Vec<DrawCall> = backend
            .calls()
            .iter()
            .filter(|c| !matches!(c, DrawCall::Interactable { .. }))
            .cloned()
            .collect();
        assert_eq!(
            calls,
            vec![
                DrawCall::Icon { at: Offset::new(13, 2), icon: 5, brush: 0 },
                DrawCall::Rect { region: Region::new(0, 0, 10, 10), brush: 9 },
            ]
        );
    }

    #[test]
    fn focused_node_draws_highlight() {
        let (mut ui, root) = ui();
        let panel = ui.nodes().children(root)[1];
        ui.set_window_focus(panel);
        let mut backend = RecordingBackend::new();
        ui.render(&mut backend);
        assert!(backend
            .calls()
            .contains(&DrawCall::Rect { region: Region::new(10, 0, 20, 10), brush: 4 }));
    }

    #[test]
    fn probe_channels() {
        let (ui, root) = ui();
        let popup = ui.nodes().children(root)[0];
        let panel = ui.nodes().children(root)[1];
        let button = ui.nodes().children(panel)[0];

        let hit = ui.probe(Offset::new(13, 3));
        assert_eq!(hit.primary, Some(button));
        assert_eq!(hit.hover, Some(button));
        assert_eq!(hit.focus, Some(panel));
        assert_eq!(hit.scroll, None);

        // The pop-up is probed last and wins where it overlaps the root.
        let hit = ui.probe(Offset::new(1, 1));
        assert_eq!(hit.primary, Some(popup));
        assert_eq!(hit.focus, None);

        assert_eq!(ui.probe(Offset::new(39, 19)).hover, Some(root));
        assert_eq!(ui.probe(Offset::new(50, 50)), ProbeResult::default());
    }

    #[test]
    fn popups_outside_their_parent_are_hit() {
        let mut def = SchemaDefinition::new();
        let menu = def.push(
            TypeDefinition::new(NodeClass::Icon)
                .with_position(12, 0, 4, 2)
                .with_flags(BehaviorFlags::POPUP | BehaviorFlags::CLICKABLE),
        );
        let anchor = def.push(
            TypeDefinition::new(NodeClass::Container)
                .with_position(0, 0, 10, 10)
                .with_child(menu),
        );
        let root_type = def.push(
            TypeDefinition::new(NodeClass::Container)
                .with_position(0, 0, 40, 20)
                .with_child(anchor),
        );
        let mut ui = Ui::new(SchemaStore::load(def.write_runtime()));
        let root = ui.create_root(root_type).unwrap();
        let anchor = ui.nodes().children(root)[0];
        let menu = ui.nodes().children(anchor)[0];

        let hit = ui.probe(Offset::new(13, 1));
        assert_eq!(hit.primary, Some(menu));
        assert_eq!(hit.hover, Some(menu));

        // Outside the root too.
        if let Some(node) = ui.nodes_mut().get_mut(menu) {
            node.position.x = 45;
        }
        assert_eq!(ui.probe(Offset::new(46, 1)).primary, Some(menu));
        assert_eq!(ui.probe(Offset::new(44, 1)), ProbeResult::default());
    }

    #[test]
    fn focus_target_requires_the_focus_bit() {
        let (ui, root) = ui();
        let panel = ui.nodes().children(root)[1];
        let button = ui.nodes().children(panel)[0];
        // The button has non-zero flags but no FOCUS bit: ascend to the panel.
        assert_eq!(ui.effective_focus_target(button), Some(panel));
        assert_eq!(ui.effective_focus_target(panel), Some(panel));
        assert_eq!(ui.effective_focus_target(root), None);
    }

    #[test]
    fn hidden_subtrees_are_skipped() {
        let (mut ui, root) = ui();
        let panel = ui.nodes().children(root)[1];
        ui.set_visible(panel, false);
        let mut backend = RecordingBackend::new();
        ui.render(&mut backend);
        assert!(!backend.calls().iter().any(|c| matches!(c, DrawCall::Icon { .. })));
        assert_eq!(ui.probe(Offset::new(13, 3)).primary, None);
    }
}
