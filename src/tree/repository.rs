//! Node repository: slotmap arena plus per-type free lists.

use std::collections::HashMap;

use slotmap::SlotMap;

use super::node::{Node, NodeId};
use crate::geometry::Region;
use crate::schema::TypeId;

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// Exclusive owner of every node instance.
///
/// Live nodes sit in a `SlotMap`. A released node leaves the map (so its id
/// goes stale) and waits on its type's free list until a later allocation of
/// the same type takes it back. Nothing is dropped before the repository is.
#[derive(Debug, Default)]
pub struct NodeRepository {
    nodes: SlotMap<NodeId, Node>,
    free_lists: HashMap<TypeId, Vec<Node>>,
    allocations: usize,
}

impl NodeRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly built node.
    pub fn insert(&mut self, node: Node) -> NodeId {
        self.allocations += 1;
        self.nodes.insert(node)
    }

    /// Put a node taken from a free list back into service under a new id.
    pub(crate) fn reinsert(&mut self, node: Node) -> NodeId {
        self.nodes.insert(node)
    }

    /// Take a node out of service; returns it so it can be parked.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.remove(id)
    }

    /// Park a released node on its type's free list.
    pub(crate) fn push_free(&mut self, node: Node) {
        self.free_lists.entry(node.type_id).or_default().push(node);
    }

    /// Most recently released node of `type_id`, if any.
    pub(crate) fn pop_free(&mut self, type_id: TypeId) -> Option<Node> {
        self.free_lists.get_mut(&type_id)?.pop()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes in service.
    pub fn live_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of parked nodes of `type_id`.
    pub fn free_count(&self, type_id: TypeId) -> usize {
        self.free_lists.get(&type_id).map_or(0, Vec::len)
    }

    /// Number of parked nodes across all types.
    pub fn total_free(&self) -> usize {
        self.free_lists.values().map(Vec::len).sum()
    }

    /// Number of nodes ever built (recycling does not count).
    pub fn allocation_count(&self) -> usize {
        self.allocations
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    /// Children of a node; empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Append `child` to `parent`'s children and point it back.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
    }

    /// Unlink `child` from its parent, if it has one.
    pub(crate) fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get_mut(child).and_then(|c| c.parent.take()) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
    }

    /// Walk from `id` up to the root. Excludes `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            result.push(p);
            current = self.parent(p);
        }
        result
    }

    /// Whether `id` is `ancestor` or lies below it.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        id == ancestor || self.ancestors(id).contains(&ancestor)
    }

    /// Box of `id` in workspace coordinates.
    pub fn absolute_region(&self, id: NodeId) -> Region {
        let Some(node) = self.nodes.get(id) else {
            return Region::EMPTY;
        };
        self.ancestors(id)
            .iter()
            .filter_map(|&a| self.nodes.get(a))
            .fold(node.position, |region, a| region.translate(a.position.offset()))
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }

    /// Iterate live nodes in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }
}
