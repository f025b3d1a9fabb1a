//! Controller-style focus navigation.
//!
//! A node's interactables are split into at most twelve groups, one per
//! button. Buttons descend into groups, move focus into focusable subtrees
//! or activate single interactables; escape pops back out.

pub mod grouping;
pub mod navigator;

pub use grouping::{
    find_group_containing, interactables, make_top_groups, reaches, split, GroupLookup,
    GroupingRange, MAX_GROUPS,
};
pub use navigator::{FocusState, KeyAction, KeyActions, Marker, StoredFocus};
