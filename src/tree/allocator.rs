//! Schema-driven node construction, recycling and release.

use thiserror::Error;

use super::node::{AnchoredChild, BehaviorFlags, Node, NodeId, NodeKind};
use super::slots::{slot_offset, LocalStorage, SlotPayload};
use crate::schema::{CallbackKind, TypeId};
use crate::ui::Ui;

/// Why a node could not be built from the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("type {type_id} is not defined by the schema")]
    UnknownType { type_id: TypeId },

    #[error("type {type_id} names unknown class id {class_id}")]
    UnknownClass { type_id: TypeId, class_id: u16 },

    #[error("type {type_id}, slot {slot_id}: unknown data type id {data_type}")]
    UnknownDataType {
        type_id: TypeId,
        slot_id: u32,
        data_type: u16,
    },

    #[error("type {type_id}, slot {slot_id}: slot overlaps another or exceeds variable storage")]
    InvalidSlotLayout { type_id: TypeId, slot_id: u32 },
}

impl Ui {
    /// Build (or recycle) an instance of `type_id` and attach it under `parent`.
    ///
    /// A parked instance of the same type is preferred: its schema defaults
    /// and variable slots are restored in place, it is resized to its default
    /// box and its update hook fires. Otherwise a new node is built, its
    /// fixed children, window children and page controls are created, and
    /// its create hook fires.
    ///
    /// Attaching under a parent re-lays out a paginated parent and rebuilds
    /// the key actions, so the new node is placed and addressable at once.
    pub fn make_control_by_type(
        &mut self,
        parent: Option<NodeId>,
        type_id: TypeId,
    ) -> Result<NodeId, AllocError> {
        let id = self.build_control(parent, type_id)?;
        if let Some(parent) = parent {
            if self.nodes.get(parent).is_some_and(|p| p.kind.paged().is_some()) {
                self.relayout(parent);
            }
            self.refresh_focus();
        }
        Ok(id)
    }

    /// Allocation without the parent relayout and focus refresh; used while
    /// a node builds its own children.
    pub(crate) fn build_control(
        &mut self,
        parent: Option<NodeId>,
        type_id: TypeId,
    ) -> Result<NodeId, AllocError> {
        if !self.schema.contains_type(type_id) {
            return Err(AllocError::UnknownType { type_id });
        }
        if let Some(node) = self.nodes.pop_free(type_id) {
            return self.recycle(parent, node);
        }

        let class_id = self.schema.get_class_id(type_id);
        let class = self
            .schema
            .get_class(type_id)
            .ok_or(AllocError::UnknownClass { type_id, class_id })?;
        let locals = LocalStorage::construct(
            type_id,
            self.schema.get_slots(type_id),
            self.schema.get_variable_words(type_id),
        )?;

        let mut node = Node::new(type_id, NodeKind::new(class), locals);
        node.flags = self.schema.get_behavior_flags(type_id);
        node.position = self.schema.get_default_position(type_id);
        let id = self.nodes.insert(node);
        if let Some(parent) = parent {
            self.nodes.attach(parent, id);
        }
        log::debug!("allocated {id:?} (type {type_id}, {class:?})");

        self.create_children(id, type_id)?;
        let size = self.schema.get_default_position(type_id).size();
        self.force_resize(id, size.width, size.height);
        self.fire(CallbackKind::Create, id);
        Ok(id)
    }

    fn recycle(&mut self, parent: Option<NodeId>, mut node: Node) -> Result<NodeId, AllocError> {
        let type_id = node.type_id;
        node.parent = None;
        node.flags = self.schema.get_behavior_flags(type_id);
        node.position = self.schema.get_default_position(type_id);
        node.kind.reset_content();
        node.locals.reconstruct(
            type_id,
            self.schema.get_slots(type_id),
            self.schema.get_variable_words(type_id),
        )?;

        let children = node.children.clone();
        let id = self.nodes.reinsert(node);
        for child in children {
            if let Some(c) = self.nodes.get_mut(child) {
                c.parent = Some(id);
            }
        }
        if let Some(parent) = parent {
            self.nodes.attach(parent, id);
        }
        log::debug!("recycled {id:?} (type {type_id})");

        let size = self.schema.get_default_position(type_id).size();
        self.force_resize(id, size.width, size.height);
        self.fire(CallbackKind::Update, id);
        Ok(id)
    }

    /// Built-in creation: fixed children, window children, page controls.
    fn create_children(&mut self, id: NodeId, type_id: TypeId) -> Result<(), AllocError> {
        let is_monotype = matches!(
            self.nodes.get(id).map(|n| &n.kind),
            Some(NodeKind::MonotypeColumn(_))
        );
        // A monotype column's first fixed child is its element template.
        if !is_monotype {
            let fixed = self.schema.get_fixed_children(type_id).to_vec();
            for child_type in fixed {
                self.build_control(Some(id), child_type)?;
            }
        }

        let window = self.schema.get_window_children(type_id).to_vec();
        for (anchor, child) in window.iter().enumerate() {
            let node = self.build_control(Some(id), child.child_type)?;
            if let Some(NodeKind::ProportionalWindow { anchored }) =
                self.nodes.get_mut(id).map(|n| &mut n.kind)
            {
                anchored.push(AnchoredChild { node, anchor });
            }
        }

        let page_ui = self.schema.get_page_ui_definitions(type_id);
        let paginated = self
            .nodes
            .get(id)
            .is_some_and(|n| n.kind.paged().is_some());
        if paginated && !page_ui.is_empty() {
            let back = page_ui
                .back_type()
                .map(|t| self.make_page_control(id, t, BehaviorFlags::PAGE_BACK))
                .transpose()?;
            let forward = page_ui
                .forward_type()
                .map(|t| self.make_page_control(id, t, BehaviorFlags::PAGE_FORWARD))
                .transpose()?;
            let text = page_ui
                .text_type()
                .map(|t| self.make_page_control(id, t, BehaviorFlags::empty()))
                .transpose()?;
            if let Some(paged) = self.nodes.get_mut(id).and_then(|n| n.kind.paged_mut()) {
                paged.controls.back = back;
                paged.controls.forward = forward;
                paged.controls.text = text;
            }
        }
        Ok(())
    }

    fn make_page_control(
        &mut self,
        parent: NodeId,
        type_id: TypeId,
        role: BehaviorFlags,
    ) -> Result<NodeId, AllocError> {
        let id = self.build_control(Some(parent), type_id)?;
        if let Some(node) = self.nodes.get_mut(id) {
            node.flags |= role;
        }
        Ok(id)
    }

    /// Retire `id`: drop it from focus, detach it and park it for reuse.
    ///
    /// The node keeps its subtree; a later allocation of the same type takes
    /// the whole thing back. Unknown or already released ids are ignored.
    pub fn release_node(&mut self, id: NodeId) {
        if !self.nodes.contains(id) {
            return;
        }
        self.evict_focus(id);
        self.forget_pointer_targets(id);

        if let Some(parent) = self.nodes.parent(id) {
            if let Some(p) = self.nodes.get_mut(parent) {
                match &mut p.kind {
                    NodeKind::ProportionalWindow { anchored } => {
                        anchored.retain(|a| a.node != id);
                    }
                    NodeKind::MonotypeColumn(state) => {
                        state.elements.retain(|(node, _)| *node != id);
                    }
                    _ => {}
                }
                if let Some(paged) = p.kind.paged_mut() {
                    for control in [
                        &mut paged.controls.back,
                        &mut paged.controls.forward,
                        &mut paged.controls.text,
                    ] {
                        if *control == Some(id) {
                            *control = None;
                        }
                    }
                }
            }
        }
        self.nodes.detach(id);
        if self.root == Some(id) {
            self.root = None;
        }
        if let Some(node) = self.nodes.remove(id) {
            log::debug!("released {id:?} (type {})", node.type_id);
            self.nodes.push_free(node);
        }
        self.repopulate_key_actions();
    }

    /// Typed view of a variable slot, or `None` when the type lacks the slot
    /// or the payload has another type.
    pub fn get_local_data<T: SlotPayload>(&self, id: NodeId, slot_id: u32) -> Option<&T> {
        let node = self.nodes.get(id)?;
        let offset = slot_offset(self.schema.get_slots(node.type_id), slot_id)?;
        T::from_slot(node.locals.cell(offset)?)
    }

    pub fn get_local_data_mut<T: SlotPayload>(&mut self, id: NodeId, slot_id: u32) -> Option<&mut T> {
        let type_id = self.nodes.get(id)?.type_id;
        let offset = slot_offset(self.schema.get_slots(type_id), slot_id)?;
        T::from_slot_mut(self.nodes.get_mut(id)?.locals.cell_mut(offset)?)
    }
}
