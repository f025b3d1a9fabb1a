//! Partitioning a node's interactable descendants into button groups.
//!
//! The interactables of a node are found by a depth-first walk that skips
//! hidden subtrees, stops at every interactable node and only descends
//! through nodes flagged [`TRANSPARENT_TO_FOCUS`](BehaviorFlags::TRANSPARENT_TO_FOCUS).
//! Any index range over that list splits into at most [`MAX_GROUPS`]
//! contiguous groups, one per button.

use crate::tree::{BehaviorFlags, NodeId, NodeRepository};

/// Number of groups a range splits into at most (one per button).
pub const MAX_GROUPS: usize = 12;

/// Half-open index range `[start, end)` over a node's interactables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupingRange {
    pub start: usize,
    pub end: usize,
}

impl GroupingRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The single index `i`.
    pub const fn single(index: usize) -> Self {
        Self::new(index, index + 1)
    }

    pub const fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(self) -> bool {
        self.end <= self.start
    }

    pub const fn contains(self, other: GroupingRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Contains `other` and is larger than it.
    pub fn strictly_contains(self, other: GroupingRange) -> bool {
        self.contains(other) && self != other
    }
}

/// Result of [`find_group_containing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupLookup {
    /// Smallest group strictly containing the target.
    Found(GroupingRange),
    /// Only the node's whole interactable list encloses the target.
    Whole,
    /// The target is empty or lies outside the interactable list.
    NotFound,
}

/// Interactable descendants of `id`, in walk order. `id` itself is excluded.
pub fn interactables(nodes: &NodeRepository, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect(nodes, id, &mut out);
    out
}

fn collect(nodes: &NodeRepository, id: NodeId, out: &mut Vec<NodeId>) {
    for &child in nodes.children(id) {
        let Some(node) = nodes.get(child) else {
            continue;
        };
        if !node.is_shown() {
            continue;
        }
        if node.flags.is_interactable() {
            out.push(child);
        } else if node.flags.contains(BehaviorFlags::TRANSPARENT_TO_FOCUS) {
            collect(nodes, child, out);
        }
    }
}

/// Whether `target` is `scope` or is found by repeatedly taking interactables:
/// every node between them must be shown and either interactable or
/// transparent to focus, and `target` itself must be interactable.
pub fn reaches(nodes: &NodeRepository, scope: NodeId, target: NodeId) -> bool {
    if scope == target {
        return true;
    }
    match nodes.get(target) {
        Some(node) if node.is_shown() && node.flags.is_interactable() => {}
        _ => return false,
    }
    let mut current = target;
    while let Some(parent) = nodes.parent(current) {
        if parent == scope {
            return true;
        }
        let Some(node) = nodes.get(parent) else {
            return false;
        };
        let passable = node.flags.is_interactable()
            || node.flags.contains(BehaviorFlags::TRANSPARENT_TO_FOCUS);
        if !node.is_shown() || !passable {
            return false;
        }
        current = parent;
    }
    false
}

/// Split `range` into at most [`MAX_GROUPS`] contiguous, non-empty groups.
///
/// Group `i` starts at `ceil(i * n / 12)`, so larger groups come first.
pub fn split(range: GroupingRange) -> Vec<GroupingRange> {
    let n = range.len();
    let bound = |i: usize| range.start + (i * n).div_ceil(MAX_GROUPS);
    (0..MAX_GROUPS)
        .map(|i| GroupingRange::new(bound(i), bound(i + 1)))
        .filter(|g| !g.is_empty())
        .collect()
}

/// Top-level groups of `id`'s interactables.
pub fn make_top_groups(nodes: &NodeRepository, id: NodeId) -> Vec<GroupingRange> {
    split(GroupingRange::new(0, interactables(nodes, id).len()))
}

/// Zoom from the whole interactable list of `id` into the smallest group that
/// strictly contains `target`.
pub fn find_group_containing(nodes: &NodeRepository, id: NodeId, target: GroupingRange) -> GroupLookup {
    let whole = GroupingRange::new(0, interactables(nodes, id).len());
    if target.is_empty() || !whole.contains(target) {
        return GroupLookup::NotFound;
    }
    let mut best = whole;
    while let Some(group) = split(best).into_iter().find(|g| g.strictly_contains(target)) {
        best = group;
    }
    if best == whole {
        GroupLookup::Whole
    } else {
        GroupLookup::Found(best)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
