//! Resize protocol and pagination.
//!
//! `force_resize` assigns a box size and lays the node's children out;
//! paginated kinds run a packer that assigns every content child a page and a
//! position, then flag the children outside the current page as
//! [`BehaviorFlags::OFF_PAGE`].

use std::collections::HashMap;
use std::ops::Range;

use super::node::{BehaviorFlags, NodeClass, NodeId, NodeKind, PageControls};
use crate::event::UiEvent;
use crate::geometry::{Region, Size};
use crate::schema::{CallbackKind, ColumnProperties, GridProperties, HorizontalAlign, VerticalAlign};
use crate::ui::Ui;

// ---------------------------------------------------------------------------
// Packing
// ---------------------------------------------------------------------------

/// Size and grouping of one item handed to a packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackItem {
    pub width: i32,
    pub height: i32,
    /// Opens a group kept together in one column when possible.
    pub starts_group: bool,
}

impl PackItem {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height, starts_group: false }
    }

    pub fn starting_group(mut self) -> Self {
        self.starts_group = true;
        self
    }
}

/// Where a packer put one item, relative to the container's content box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Placement {
    pub page: usize,
    pub x: i32,
    pub y: i32,
}

/// Output of a packer: one placement per input item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packing {
    pub placements: Vec<Placement>,
    pub page_count: usize,
}

impl Packing {
    /// Pages assigned to each item, in input order.
    pub fn pages(&self) -> Vec<usize> {
        self.placements.iter().map(|p| p.page).collect()
    }
}

/// Current page number and number of pages of a paginated node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub current: usize,
    pub total: usize,
}

/// Split items into packing units: each start-group item opens a unit that
/// absorbs the following items up to the next start-group item. Items ahead
/// of the first group are units of their own.
fn group_units(items: &[PackItem]) -> Vec<Range<usize>> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut in_group = false;
    for (i, item) in items.iter().enumerate() {
        if item.starts_group || !in_group {
            if i > start {
                units.push(start..i);
            }
            start = i;
            in_group |= item.starts_group;
        }
    }
    if items.len() > start {
        units.push(start..items.len());
    }
    units
}

struct ColumnCursor {
    height: i32,
    gap: i32,
    max_columns: usize,
    page: usize,
    column: usize,
    used: i32,
    empty: bool,
    page_has_items: bool,
    close_page: bool,
}

impl ColumnCursor {
    fn fits(&self, height: i32) -> bool {
        if self.close_page {
            return false;
        }
        let needed = if self.empty { height } else { self.used + self.gap + height };
        needed <= self.height
    }

    fn next_column(&mut self) {
        self.column += 1;
        self.used = 0;
        self.empty = true;
        if self.column >= self.max_columns || self.close_page {
            self.new_page();
        }
    }

    fn new_page(&mut self) {
        self.page += 1;
        self.column = 0;
        self.used = 0;
        self.empty = true;
        self.page_has_items = false;
        self.close_page = false;
    }

    fn place(&mut self, height: i32) -> (usize, usize, i32) {
        let y = if self.empty { 0 } else { self.used + self.gap };
        self.used = y + height;
        self.empty = false;
        self.page_has_items = true;
        (self.page, self.column, y)
    }

    fn place_single(&mut self, height: i32) -> (usize, usize, i32) {
        if !self.fits(height) && !self.empty {
            self.next_column();
        }
        if self.fits(height) {
            self.place(height)
        } else {
            self.place_alone(height)
        }
    }

    /// An item too tall for any column gets a page to itself.
    fn place_alone(&mut self, height: i32) -> (usize, usize, i32) {
        if self.page_has_items {
            self.new_page();
        }
        let slot = self.place(height);
        self.close_page = true;
        slot
    }
}

/// Greedy column packing with atomic groups.
///
/// Units go into the current column while they fit, then into the next
/// column, then onto the next page. A group taller than a whole column is
/// flattened and packed item by item; a single item taller than a column is
/// put on a page of its own.
pub fn pack_columns(items: &[PackItem], area: Size, props: &ColumnProperties) -> Packing {
    let gap = i32::from(props.gap).max(0);
    let column_width = if props.column_width > 0 {
        i32::from(props.column_width)
    } else {
        area.width.max(0)
    };
    let fit = if column_width + gap > 0 {
        ((area.width + gap) / (column_width + gap)).max(1) as usize
    } else {
        1
    };
    let max_columns = match props.max_columns {
        0 => fit,
        m => fit.min(usize::from(m)),
    };

    let mut cursor = ColumnCursor {
        height: area.height,
        gap,
        max_columns,
        page: 0,
        column: 0,
        used: 0,
        empty: true,
        page_has_items: false,
        close_page: false,
    };
    let mut slots = vec![(0usize, 0usize, 0i32); items.len()];

    for unit in group_units(items) {
        let height = items[unit.clone()].iter().map(|i| i.height).sum::<i32>()
            + gap * (unit.len() as i32 - 1);
        if !cursor.fits(height) && !cursor.empty {
            cursor.next_column();
        }
        if cursor.fits(height) {
            for i in unit {
                slots[i] = cursor.place(items[i].height);
            }
        } else if unit.len() > 1 {
            for i in unit {
                slots[i] = cursor.place_single(items[i].height);
            }
        } else {
            slots[unit.start] = cursor.place_alone(items[unit.start].height);
        }
    }

    let mut column_used: HashMap<(usize, usize), i32> = HashMap::new();
    let mut page_columns: HashMap<usize, usize> = HashMap::new();
    for (i, &(page, column, y)) in slots.iter().enumerate() {
        let bottom = y + items[i].height;
        let used = column_used.entry((page, column)).or_insert(0);
        *used = (*used).max(bottom);
        let columns = page_columns.entry(page).or_insert(0);
        *columns = (*columns).max(column + 1);
    }

    let placements = slots
        .iter()
        .map(|&(page, column, y)| {
            let columns = page_columns.get(&page).copied().unwrap_or(1) as i32;
            let block = columns * (column_width + gap) - gap;
            let x_offset = match props.horizontal_align() {
                HorizontalAlign::Left => 0,
                HorizontalAlign::Center => (area.width - block) / 2,
                HorizontalAlign::Right => area.width - block,
            }
            .max(0);
            let used = column_used.get(&(page, column)).copied().unwrap_or(0);
            let y_offset = match props.vertical_align() {
                VerticalAlign::Top => 0,
                VerticalAlign::Center => (area.height - used) / 2,
                VerticalAlign::Bottom => area.height - used,
            }
            .max(0);
            Placement {
                page,
                x: x_offset + column as i32 * (column_width + gap),
                y: y_offset + y,
            }
        })
        .collect();

    Packing {
        placements,
        page_count: slots.last().map_or(1, |&(page, _, _)| page + 1),
    }
}

/// Row-major grid packing into fixed cells.
///
/// A zero cell dimension falls back to the largest item in that dimension.
pub fn pack_grid(items: &[PackItem], area: Size, grid: &GridProperties) -> Packing {
    let gap = i32::from(grid.gap).max(0);
    let cell_width = match grid.cell_width {
        w if w > 0 => i32::from(w),
        _ => items.iter().map(|i| i.width).max().unwrap_or(0),
    };
    let cell_height = match grid.cell_height {
        h if h > 0 => i32::from(h),
        _ => items.iter().map(|i| i.height).max().unwrap_or(0),
    };
    let per_row = per_line(area.width, cell_width, gap);
    let per_page = per_row * per_line(area.height, cell_height, gap);

    let placements = (0..items.len())
        .map(|i| {
            let k = i % per_page;
            Placement {
                page: i / per_page,
                x: (k % per_row) as i32 * (cell_width + gap),
                y: (k / per_row) as i32 * (cell_height + gap),
            }
        })
        .collect();
    Packing {
        placements,
        page_count: items.len().div_ceil(per_page).max(1),
    }
}

/// How many cells of `cell` fit in `extent`; at least one.
fn per_line(extent: i32, cell: i32, gap: i32) -> usize {
    if cell + gap <= 0 {
        return 1;
    }
    ((extent + gap) / (cell + gap)).max(1) as usize
}

// ---------------------------------------------------------------------------
// Ui: resize protocol
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Packer {
    Columns,
    Grid,
}

impl Ui {
    /// Assign `id` its size and lay out its children.
    pub fn force_resize(&mut self, id: NodeId, width: i32, height: i32) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        node.position.width = width.max(0);
        node.position.height = height.max(0);
        match node.class() {
            NodeClass::ProportionalWindow => self.layout_window(id),
            NodeClass::DynamicColumn => self.layout_paged(id, Packer::Columns),
            NodeClass::DynamicGrid => self.layout_paged(id, Packer::Grid),
            NodeClass::MonotypeColumn => self.layout_monotype(id),
            _ => self.relayout_children(id, &[]),
        }
    }

    /// Negotiate a size within `[minimum, max_space]`, then [`force_resize`](Self::force_resize).
    ///
    /// When the minimum exceeds the space offered, the minimum wins.
    pub fn resize(&mut self, id: NodeId, max_space: Size, desired_width: i32, desired_height: i32) {
        let width = desired_width.min(max_space.width).max(self.minimum_width(id));
        let height = desired_height.min(max_space.height).max(self.minimum_height(id));
        self.force_resize(id, width, height);
    }

    /// Re-run layout at the node's current size.
    pub fn relayout(&mut self, id: NodeId) {
        if let Some(size) = self.nodes.get(id).map(|n| n.position.size()) {
            self.force_resize(id, size.width, size.height);
        }
    }

    pub fn minimum_width(&self, id: NodeId) -> i32 {
        self.minimum_extent(id, |r| r.x, |r| r.width, |ui, c| ui.minimum_width(c))
    }

    pub fn minimum_height(&self, id: NodeId) -> i32 {
        self.minimum_extent(id, |r| r.y, |r| r.height, |ui, c| ui.minimum_height(c))
    }

    fn minimum_extent(
        &self,
        id: NodeId,
        origin: fn(Region) -> i32,
        extent: fn(Region) -> i32,
        child_minimum: fn(&Ui, NodeId) -> i32,
    ) -> i32 {
        let Some(node) = self.nodes.get(id) else {
            return 0;
        };
        let shown = |c: &NodeId| self.nodes.get(*c).is_some_and(|n| !n.flags.contains(BehaviorFlags::HIDDEN));
        match &node.kind {
            NodeKind::Text { .. } | NodeKind::EditText { .. } | NodeKind::Icon | NodeKind::Image => {
                extent(self.schema.get_default_position(node.type_id))
            }
            NodeKind::Container | NodeKind::ProportionalWindow { .. } => node
                .children
                .iter()
                .filter(|c| shown(c))
                .filter_map(|&c| {
                    let child = self.nodes.get(c)?;
                    Some(origin(child.position) + child_minimum(self, c))
                })
                .max()
                .unwrap_or(0),
            NodeKind::MonotypeColumn(_) => self
                .template_type(id)
                .map_or(0, |t| extent(self.schema.get_default_position(t))),
            NodeKind::DynamicColumn(p) | NodeKind::DynamicGrid(p) => node
                .children
                .iter()
                .filter(|c| shown(c) && !p.controls.contains(**c))
                .map(|&c| child_minimum(self, c))
                .max()
                .unwrap_or(0),
        }
    }

    fn relayout_children(&mut self, id: NodeId, skip: &[NodeId]) {
        let children: Vec<NodeId> = self
            .nodes
            .children(id)
            .iter()
            .copied()
            .filter(|c| !skip.contains(c))
            .collect();
        for child in children {
            self.relayout(child);
        }
    }

    fn layout_window(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let NodeKind::ProportionalWindow { anchored } = &node.kind else {
            return;
        };
        let (width, height) = (node.position.width, node.position.height);
        let defs = self.schema.get_window_children(node.type_id);
        let placements: Vec<(NodeId, Region)> = anchored
            .iter()
            .filter_map(|a| {
                let def = defs.get(a.anchor)?;
                let left = def.left.resolve(width);
                let top = def.top.resolve(height);
                let right = def.right.resolve(width);
                let bottom = def.bottom.resolve(height);
                Some((a.node, Region::new(left, top, (right - left).max(0), (bottom - top).max(0))))
            })
            .collect();

        let skip: Vec<NodeId> = placements.iter().map(|(n, _)| *n).collect();
        for (child, region) in placements {
            if let Some(c) = self.nodes.get_mut(child) {
                c.position.x = region.x;
                c.position.y = region.y;
            }
            self.force_resize(child, region.width, region.height);
        }
        self.relayout_children(id, &skip);
    }

    // -----------------------------------------------------------------------
    // Pagination
    // -----------------------------------------------------------------------

    /// Content children (everything but page controls) and the controls.
    fn paged_parts(&self, id: NodeId) -> Option<(Vec<NodeId>, PageControls)> {
        let node = self.nodes.get(id)?;
        let controls = node.kind.paged()?.controls;
        let content = node
            .children
            .iter()
            .copied()
            .filter(|c| !controls.contains(*c))
            .collect();
        Some((content, controls))
    }

    /// Height reserved at the bottom for page controls.
    fn control_band(&self, controls: &PageControls) -> i32 {
        [controls.back, controls.forward, controls.text]
            .into_iter()
            .flatten()
            .filter_map(|c| self.nodes.get(c))
            .map(|n| n.position.height)
            .max()
            .unwrap_or(0)
    }

    fn layout_paged(&mut self, id: NodeId, packer: Packer) {
        let Some((content, controls)) = self.paged_parts(id) else {
            return;
        };
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let area = node.position.size();
        let type_id = node.type_id;

        let packed: Vec<NodeId> = content
            .iter()
            .copied()
            .filter(|c| self.nodes.get(*c).is_some_and(|n| !n.flags.contains(BehaviorFlags::HIDDEN)))
            .collect();
        let items: Vec<PackItem> = packed
            .iter()
            .filter_map(|&c| self.nodes.get(c))
            .map(|n| PackItem {
                width: n.position.width,
                height: n.position.height,
                starts_group: n.flags.contains(BehaviorFlags::START_GROUP),
            })
            .collect();
        let run = |area: Size| match packer {
            Packer::Columns => pack_columns(&items, area, &self.schema.get_column_properties(type_id)),
            Packer::Grid => pack_grid(&items, area, &self.schema.get_grid_properties(type_id)),
        };

        let mut packing = run(area);
        let band = self.control_band(&controls);
        if packing.page_count > 1 && band > 0 {
            packing = run(Size::new(area.width, (area.height - band).max(0)));
        }

        let current = {
            let Some(paged) = self.nodes.get_mut(id).and_then(|n| n.kind.paged_mut()) else {
                return;
            };
            paged.page_count = packing.page_count;
            paged.current_page = paged.current_page.min(packing.page_count - 1);
            paged.current_page
        };

        for (&child, placement) in packed.iter().zip(&packing.placements) {
            if let Some(c) = self.nodes.get_mut(child) {
                c.position.x = placement.x;
                c.position.y = placement.y;
                c.flags.set(BehaviorFlags::OFF_PAGE, placement.page != current);
            }
        }
        self.place_page_controls(id, area, &controls);
        for child in packed {
            self.relayout(child);
        }
    }

    fn place_page_controls(&mut self, id: NodeId, area: Size, controls: &PageControls) {
        let Some(info) = self.get_page_information(id) else {
            return;
        };
        let single = info.total <= 1;
        let place = |ui: &mut Ui, control: Option<NodeId>, x_of: &dyn Fn(i32) -> i32, off: bool| {
            let Some(c) = control.and_then(|c| ui.nodes.get_mut(c)) else {
                return;
            };
            c.position.x = x_of(c.position.width);
            c.position.y = area.height - c.position.height;
            c.flags.set(BehaviorFlags::OFF_PAGE, off);
        };
        place(self, controls.back, &|_| 0, single || info.current == 0);
        place(self, controls.forward, &|w| area.width - w, single || info.current + 1 >= info.total);
        place(self, controls.text, &|w| (area.width - w) / 2, single);
        if let Some(text) = controls.text {
            self.set_text(text, format!("{}/{}", info.current + 1, info.total));
        }
    }

    /// Type instantiated for each element of a monotype column.
    fn template_type(&self, id: NodeId) -> Option<u32> {
        let node = self.nodes.get(id)?;
        self.schema.get_fixed_children(node.type_id).get(0)
    }

    fn layout_monotype(&mut self, id: NodeId) {
        let Some(template) = self.template_type(id) else {
            return;
        };
        let Some((_, controls)) = self.paged_parts(id) else {
            return;
        };
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let NodeKind::MonotypeColumn(state) = &node.kind else {
            return;
        };
        let area = node.position.size();
        let count = state.element_count;
        let props = self.schema.get_column_properties(node.type_id);
        let element = self.schema.get_default_position(template).size();

        let capacity = |height: i32| {
            let probe = vec![PackItem::new(element.width, element.height); count.max(1)];
            let packing = pack_columns(&probe, Size::new(area.width, height), &props);
            packing.pages().iter().filter(|&&p| p == 0).count().max(1)
        };
        let mut per_page = capacity(area.height);
        let band = self.control_band(&controls);
        if count > per_page && band > 0 {
            per_page = capacity((area.height - band).max(0));
        }
        let total = count.div_ceil(per_page).max(1);

        let (current, live) = {
            let Some(NodeKind::MonotypeColumn(state)) = self.nodes.get_mut(id).map(|n| &mut n.kind)
            else {
                return;
            };
            state.paged.page_count = total;
            state.paged.current_page = state.paged.current_page.min(total - 1);
            (state.paged.current_page, state.elements.clone())
        };

        let wanted: Vec<usize> = (current * per_page..count.min((current + 1) * per_page)).collect();
        let live_indices: Vec<usize> = live.iter().map(|(_, i)| *i).collect();
        if live_indices != wanted {
            for (node, _) in &live {
                self.release_node(*node);
            }
            for &index in &wanted {
                match self.build_control(Some(id), template) {
                    Ok(node) => {
                        if let Some(NodeKind::MonotypeColumn(state)) =
                            self.nodes.get_mut(id).map(|n| &mut n.kind)
                        {
                            state.elements.push((node, index));
                        }
                    }
                    Err(err) => {
                        log::warn!("monotype column {id:?}: cannot build element {index}: {err}");
                        break;
                    }
                }
            }
        }

        let elements = match self.nodes.get(id).map(|n| &n.kind) {
            Some(NodeKind::MonotypeColumn(state)) => state.elements.clone(),
            _ => return,
        };
        let items = vec![PackItem::new(element.width, element.height); elements.len()];
        let reserved = if total > 1 { band } else { 0 };
        let packing = pack_columns(&items, Size::new(area.width, area.height - reserved), &props);
        for ((node, _), placement) in elements.iter().zip(&packing.placements) {
            if let Some(n) = self.nodes.get_mut(*node) {
                n.position.x = placement.x;
                n.position.y = placement.y;
            }
        }
        self.place_page_controls(id, area, &controls);
    }

    /// Page position of a paginated node; `None` for other kinds.
    pub fn get_page_information(&self, id: NodeId) -> Option<PageInfo> {
        let paged = self.nodes.get(id)?.kind.paged()?;
        Some(PageInfo {
            current: paged.current_page,
            total: paged.page_count.max(1),
        })
    }

    /// Show page `page` of a paginated node.
    ///
    /// Fires the hide hook on the children leaving view and the visible hook
    /// on those entering it. Out-of-range pages and the current page are
    /// no-ops; returns whether the page changed.
    pub fn change_page(&mut self, id: NodeId, page: usize) -> bool {
        let Some(info) = self.get_page_information(id) else {
            return false;
        };
        if page >= info.total || page == info.current {
            return false;
        }

        for child in self.page_members(id) {
            self.fire(CallbackKind::Hide, child);
        }
        if let Some(paged) = self.nodes.get_mut(id).and_then(|n| n.kind.paged_mut()) {
            paged.current_page = page;
        }
        self.relayout(id);
        for child in self.page_members(id) {
            self.fire(CallbackKind::Visible, child);
        }

        log::debug!("{id:?}: page {} -> {page} of {}", info.current, info.total);
        self.events.push(UiEvent::PageChanged { node: id, page });
        self.refresh_focus();
        true
    }

    /// Content children shown on the current page.
    fn page_members(&self, id: NodeId) -> Vec<NodeId> {
        let Some((content, _)) = self.paged_parts(id) else {
            return Vec::new();
        };
        content
            .into_iter()
            .filter(|c| self.nodes.get(*c).is_some_and(|n| n.is_shown()))
            .collect()
    }

    /// Set how many elements a monotype column presents.
    pub fn set_element_count(&mut self, id: NodeId, count: usize) {
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::MonotypeColumn(state)) => state.element_count = count,
            _ => return,
        }
        self.relayout(id);
        self.refresh_focus();
    }

    /// Element index of a live monotype element.
    pub fn element_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.nodes.parent(id)?;
        match &self.nodes.get(parent)?.kind {
            NodeKind::MonotypeColumn(state) => state
                .elements
                .iter()
                .find(|(node, _)| *node == id)
                .map(|(_, index)| *index),
            _ => None,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
