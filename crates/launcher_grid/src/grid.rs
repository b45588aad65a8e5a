//! The paginated item collection and its cross-page reorder algorithms.
//!
//! A [`Grid`] owns three things: the [`PageArena`] holding the linked page sequence, the item
//! store keyed by [`ItemId`], and the item index in append order. Every mutation re-derives the
//! placement fields of the items it touched from the pages, so an item is always either unplaced
//! or sitting exactly in the slot its page reports.
//!
//! Positions are global: `page_index * capacity + slot_index`, counted in link order.

use std::collections::{HashMap, HashSet};

use launcher_host::OrderingRecord;
use log::{debug, error, warn};

use crate::{
    config::LauncherConfig,
    error::GridError,
    item::{self, Item},
    model::{ItemId, PageId, Placement},
    page::{Page, PageArena},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Outcome of [`Grid::read_list`].
pub struct ReadListReport {
    /// Items kept in place whose metadata was refreshed.
    pub updated: usize,
    /// Items newly packed at the tail, in target order.
    pub added: Vec<ItemId>,
    /// App ids unpacked and destroyed because the target no longer lists them.
    pub removed: Vec<String>,
}

#[derive(Debug, Clone)]
/// Ordered sequence of fixed-capacity pages holding launcher items.
pub struct Grid {
    pages: PageArena,
    items: HashMap<ItemId, Item>,
    index: Vec<ItemId>,
    by_app: HashMap<String, ItemId>,
    next_item_id: u64,
}

type PageSnapshot = Vec<(PageId, Vec<Option<ItemId>>)>;

impl Grid {
    /// Creates an empty grid sized by `config`.
    pub fn new(config: &LauncherConfig) -> Self {
        Self::with_limits(config.page_capacity, config.max_pages)
    }

    /// Creates an empty grid with explicit page capacity and page limit (both at least 1).
    pub fn with_limits(page_capacity: usize, max_pages: usize) -> Self {
        Self {
            pages: PageArena::new(page_capacity.max(1), max_pages.max(1)),
            items: HashMap::new(),
            index: Vec::new(),
            by_app: HashMap::new(),
            next_item_id: 1,
        }
    }

    /// Slots per page.
    pub fn page_capacity(&self) -> usize {
        self.pages.page_capacity()
    }

    /// The linked page sequence.
    pub fn pages(&self) -> &PageArena {
        &self.pages
    }

    /// Live page by id.
    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.get(id)
    }

    /// Stored item by id, placed or not.
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Item id holding `app_id`. Virtual items are never found.
    pub fn find_by_app_id(&self, app_id: &str) -> Option<ItemId> {
        self.by_app.get(app_id).copied()
    }

    /// Packs `item` into the tail page, linking a new tail page when the current one is full.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::DuplicateApp`] when the app already has an item, and
    /// [`GridError::PageLimitReached`] when a new page is needed but not allowed. Nothing is
    /// linked or stored on error.
    pub fn append_item(&mut self, item: Item) -> Result<ItemId, GridError> {
        if !item.is_virtual() && self.by_app.contains_key(&item.app_id) {
            return Err(GridError::DuplicateApp(item.app_id));
        }
        let page_id = self.tail_with_space()?;
        let id = self.allocate_id();
        let page = self
            .pages
            .get_mut(page_id)
            .ok_or(GridError::PageNotFound(page_id))?;
        let slot = page.pack(id)?;
        self.register(id, item, Placement { page: page_id, slot });
        Ok(id)
    }

    /// Stores `item` directly at `slot` of `page`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::PageNotFound`], [`GridError::Occupied`],
    /// [`GridError::SlotOutOfRange`], or [`GridError::DuplicateApp`]; nothing is stored on error.
    pub fn insert_item_at(
        &mut self,
        item: Item,
        page: PageId,
        slot: usize,
    ) -> Result<ItemId, GridError> {
        if !item.is_virtual() && self.by_app.contains_key(&item.app_id) {
            return Err(GridError::DuplicateApp(item.app_id));
        }
        let id = ItemId(self.next_item_id);
        self.pages
            .get_mut(page)
            .ok_or(GridError::PageNotFound(page))?
            .pack_at(id, slot)?;
        self.next_item_id += 1;
        self.register(id, item, Placement { page, slot });
        Ok(id)
    }

    /// Unpacks `id` from whichever page holds it and drops it from the item index.
    ///
    /// The returned item is unplaced; releasing it is the caller's job. The slot it leaves is not
    /// compacted until [`Grid::trim`].
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ItemNotFound`] for an unknown id.
    pub fn remove_item(&mut self, id: ItemId) -> Result<Item, GridError> {
        if !self.items.contains_key(&id) {
            return Err(GridError::ItemNotFound);
        }
        for page_id in self.pages.ids() {
            if let Some(page) = self.pages.get_mut(page_id) {
                if page.unpack(id).is_ok() {
                    break;
                }
            }
        }
        self.index.retain(|entry| *entry != id);
        let mut item = self.items.remove(&id).ok_or(GridError::ItemNotFound)?;
        if !item.is_virtual() {
            self.by_app.remove(&item.app_id);
        }
        item.clear_placement();
        item.ordering = None;
        Ok(item)
    }

    /// Number of linked pages.
    pub fn count_pages(&self) -> usize {
        self.pages.len()
    }

    /// Number of placed real items. Virtual placeholders and items lifted out of their slot are
    /// excluded.
    pub fn count_items(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|page| page.slots().iter().flatten())
            .filter(|id| self.items.get(*id).is_some_and(|item| !item.is_virtual()))
            .count()
    }

    /// Stored items that sit in no slot, such as the item a move evicted.
    pub fn unplaced_items(&self) -> Vec<ItemId> {
        self.index
            .iter()
            .copied()
            .filter(|id| self.items.get(id).is_some_and(|item| !item.is_placed()))
            .collect()
    }

    /// Number of occupied slots, virtual placeholders included.
    pub fn count_occupied_slots(&self) -> usize {
        self.pages.iter().map(Page::occupied_count).sum()
    }

    /// Page holding `id`.
    pub fn has_item(&self, id: ItemId) -> Option<PageId> {
        self.pages
            .iter()
            .find(|page| page.find_slot(id).is_some())
            .map(Page::id)
    }

    /// Global position of `id`: `page_index * capacity + slot_index`.
    pub fn position_of(&self, id: ItemId) -> Option<usize> {
        let capacity = self.page_capacity();
        self.pages
            .iter()
            .enumerate()
            .find_map(|(page_index, page)| {
                page.find_slot(id).map(|slot| page_index * capacity + slot)
            })
    }

    /// Page and slot addressed by a global position, occupied or not.
    pub fn slot_at_position(&self, position: usize) -> Option<Placement> {
        let capacity = self.page_capacity();
        let page = self.pages.iter().nth(position / capacity)?;
        Some(Placement {
            page: page.id(),
            slot: position % capacity,
        })
    }

    /// Occupant of a global position.
    pub fn item_at_position(&self, position: usize) -> Option<ItemId> {
        let placement = self.slot_at_position(position)?;
        self.pages.get(placement.page)?.item_at(placement.slot)
    }

    /// Occupied slots in link order, virtual placeholders included.
    pub fn items_in_order(&self) -> Vec<ItemId> {
        self.pages
            .iter()
            .flat_map(|page| page.slots().iter().flatten().copied())
            .collect()
    }

    /// Ids of the virtual placeholders currently stored.
    pub fn virtual_items(&self) -> Vec<ItemId> {
        self.index
            .iter()
            .copied()
            .filter(|id| self.items.get(id).is_some_and(Item::is_virtual))
            .collect()
    }

    /// Page ids in link order.
    pub fn page_ids(&self) -> Vec<PageId> {
        self.pages.ids()
    }

    /// Snapshot of every page's slots in link order.
    pub fn page_layout(&self) -> Vec<Vec<Option<ItemId>>> {
        self.pages.iter().map(|page| page.slots().to_vec()).collect()
    }

    /// Like [`Grid::page_layout`], with app ids in place of item ids.
    pub fn app_layout(&self) -> Vec<Vec<Option<String>>> {
        self.pages
            .iter()
            .map(|page| {
                page.slots()
                    .iter()
                    .map(|slot| {
                        slot.and_then(|id| self.items.get(&id))
                            .map(|item| item.app_id.clone())
                    })
                    .collect()
            })
            .collect()
    }

    /// Moves the closed range `[from, to]` one slot toward the head and places `appended` right
    /// after `to`.
    ///
    /// Pages from the one holding `from` to the one holding `to` are shifted tail-most first,
    /// each page's evicted item feeding the next page as its incoming item. A missing endpoint
    /// extends the span to the first or last page. The item evicted from the head-most page is
    /// returned unplaced.
    ///
    /// On an empty grid, or when `appended` is unknown or already placed, nothing moves and
    /// `appended` is handed back.
    pub fn move_item_toward_head(
        &mut self,
        from: Option<ItemId>,
        to: Option<ItemId>,
        appended: Option<ItemId>,
    ) -> Option<ItemId> {
        let Some(span) = self.move_span(from, to, appended) else {
            return appended;
        };
        let snapshot = self.snapshot_pages(&span);
        let mut carry = appended;
        for page_id in span.iter().rev() {
            if let Some(page) = self.pages.get_mut(*page_id) {
                let (from_slot, to_slot) = page.resolve_span(from, to);
                carry = page.shift_toward_head(from_slot, to_slot, carry);
            }
        }
        self.finish_move(snapshot, appended, carry)
    }

    /// Moves the closed range `[from, to]` one slot toward the tail and places `inserted` right
    /// before `from`.
    ///
    /// Mirror image of [`Grid::move_item_toward_head`]: pages are shifted head-most first and the
    /// item evicted from the tail-most page is returned unplaced.
    pub fn move_item_toward_tail(
        &mut self,
        from: Option<ItemId>,
        to: Option<ItemId>,
        inserted: Option<ItemId>,
    ) -> Option<ItemId> {
        let Some(span) = self.move_span(from, to, inserted) else {
            return inserted;
        };
        let snapshot = self.snapshot_pages(&span);
        let mut carry = inserted;
        for page_id in &span {
            if let Some(page) = self.pages.get_mut(*page_id) {
                let (from_slot, to_slot) = page.resolve_span(from, to);
                carry = page.shift_toward_tail(from_slot, to_slot, carry);
            }
        }
        self.finish_move(snapshot, inserted, carry)
    }

    /// Lifts a placed item out of its slot, keeping it in the store.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ItemNotFound`] when the item is unknown or not placed.
    pub fn unpack_item(&mut self, id: ItemId) -> Result<Placement, GridError> {
        let page_id = self.has_item(id).ok_or(GridError::ItemNotFound)?;
        let page = self
            .pages
            .get_mut(page_id)
            .ok_or(GridError::PageNotFound(page_id))?;
        let slot = page.unpack(id)?;
        if let Some(item) = self.items.get_mut(&id) {
            item.clear_placement();
        }
        Ok(Placement {
            page: page_id,
            slot,
        })
    }

    /// Packs a stored, unplaced item at `placement`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ItemNotFound`] for an unknown id, [`GridError::InvariantViolation`]
    /// when the item is already placed, and the page's `pack_at` errors otherwise.
    pub fn pack_item_at(&mut self, id: ItemId, placement: Placement) -> Result<(), GridError> {
        let item = self.items.get(&id).ok_or(GridError::ItemNotFound)?;
        if item.is_placed() {
            return Err(GridError::InvariantViolation(format!(
                "item `{}` is already placed",
                item.app_id
            )));
        }
        self.pages
            .get_mut(placement.page)
            .ok_or(GridError::PageNotFound(placement.page))?
            .pack_at(id, placement.slot)?;
        if let Some(item) = self.items.get_mut(&id) {
            item.page_ref = Some(placement.page);
            item.slot_index = Some(placement.slot);
        }
        Ok(())
    }

    /// Packs a stored, unplaced item into the tail page, linking a new tail page when the current
    /// one is full.
    ///
    /// # Errors
    ///
    /// Same as [`Grid::pack_item_at`], plus [`GridError::PageLimitReached`].
    pub fn pack_item_at_tail(&mut self, id: ItemId) -> Result<Placement, GridError> {
        if self.items.get(&id).ok_or(GridError::ItemNotFound)?.is_placed() {
            return Err(GridError::InvariantViolation(format!(
                "item {id:?} is already placed"
            )));
        }
        let page = self.tail_with_space()?;
        let slot = self
            .pages
            .get(page)
            .and_then(|page| page.slots().iter().position(Option::is_none))
            .ok_or(GridError::Full)?;
        let placement = Placement { page, slot };
        self.pack_item_at(id, placement)?;
        Ok(placement)
    }

    /// Re-packs every item densely from the front, preserving relative order, and destroys the
    /// pages left empty. Returns the number of destroyed pages.
    pub fn trim(&mut self) -> usize {
        let ordered = self.items_in_order();
        let page_ids = self.pages.ids();
        let capacity = self.page_capacity();

        for page_id in &page_ids {
            if let Some(page) = self.pages.get_mut(*page_id) {
                page.clear();
            }
        }
        for (position, id) in ordered.iter().enumerate() {
            let packed = page_ids
                .get(position / capacity)
                .and_then(|page_id| self.pages.get_mut(*page_id))
                .map(|page| page.pack_at(*id, position % capacity));
            if !matches!(packed, Some(Ok(()))) {
                error!("trim could not repack item {id:?} at position {position}");
            }
        }

        let needed = ordered.len().div_ceil(capacity);
        let mut destroyed = 0;
        for page_id in page_ids.into_iter().skip(needed) {
            if self.pages.destroy(page_id).is_ok() {
                destroyed += 1;
            }
        }
        self.resync_placements();
        if destroyed > 0 {
            debug!("trim destroyed {destroyed} empty page(s)");
        }
        destroyed
    }

    /// Assigns dense zero-based orderings to the real items in slot order and returns them as
    /// store records. Virtual placeholders are skipped and keep no ordering.
    pub fn write_orderings(&mut self) -> Vec<OrderingRecord> {
        let ordered = self.items_in_order();
        for item in self.items.values_mut() {
            item.ordering = None;
        }

        let mut records = Vec::with_capacity(ordered.len());
        let mut next = 0_u32;
        for id in ordered {
            let Some(item) = self.items.get_mut(&id) else {
                continue;
            };
            if item.is_virtual() {
                continue;
            }
            item.ordering = Some(next);
            records.push(OrderingRecord::new(item.app_id.clone(), next));
            next += 1;
        }
        records
    }

    /// Reconciles the grid against an authoritative item list, matched by app id.
    ///
    /// Items in both keep their id and slot and adopt the target's metadata. Items only in the
    /// grid are removed, destroyed, and the gaps compacted. Items only in the target are appended
    /// in target order. The target's own order never moves existing items.
    ///
    /// # Errors
    ///
    /// Returns the first [`Grid::append_item`] failure; earlier changes stay applied and the grid
    /// remains valid.
    pub fn read_list(&mut self, target: Vec<Item>) -> Result<ReadListReport, GridError> {
        let wanted = target
            .iter()
            .filter(|item| !item.is_virtual())
            .map(|item| item.app_id.clone())
            .collect::<HashSet<_>>();
        let stale = self
            .index
            .iter()
            .copied()
            .filter(|id| {
                self.items
                    .get(id)
                    .is_some_and(|item| !item.is_virtual() && !wanted.contains(&item.app_id))
            })
            .collect::<Vec<_>>();

        let mut report = ReadListReport::default();
        for id in stale {
            let removed = self.remove_item(id)?;
            report.removed.push(removed.app_id.clone());
            item::destroy(removed);
        }
        if !report.removed.is_empty() {
            self.trim();
        }

        let mut seen = HashSet::new();
        for incoming in target {
            if incoming.is_virtual() {
                continue;
            }
            if !seen.insert(incoming.app_id.clone()) {
                warn!("read_list: duplicate target entry `{}` ignored", incoming.app_id);
                continue;
            }
            match self.by_app.get(&incoming.app_id).copied() {
                Some(id) => {
                    if let Some(existing) = self.items.get_mut(&id) {
                        existing.adopt_metadata(&incoming);
                        report.updated += 1;
                    }
                }
                None => report.added.push(self.append_item(incoming)?),
            }
        }
        Ok(report)
    }

    /// Verifies link, capacity, and placement invariants.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvariantViolation`] describing the first breach found.
    pub fn check_invariants(&self) -> Result<(), GridError> {
        let violation = |message: String| Err(GridError::InvariantViolation(message));

        let mut walked = 0;
        let mut prev = None;
        let mut cursor = self.pages.head();
        while let Some(page_id) = cursor {
            let Some(page) = self.pages.get(page_id) else {
                return violation(format!("link to dead page {page_id:?}"));
            };
            if page.prev() != prev {
                return violation(format!("page {page_id:?} has a stale prev link"));
            }
            if page.capacity() != self.page_capacity() {
                return violation(format!("page {page_id:?} has the wrong capacity"));
            }
            walked += 1;
            if walked > self.pages.len() {
                return violation("page links form a cycle".to_string());
            }
            prev = Some(page_id);
            cursor = page.next();
        }
        if walked != self.pages.len() || self.pages.tail() != prev {
            return violation("page sequence does not end at the tail".to_string());
        }

        self.check_slots_unique()?;
        for page in self.pages.iter() {
            for (slot, occupant) in page.slots().iter().enumerate() {
                let Some(id) = occupant else {
                    continue;
                };
                let placed = self.items.get(id).is_some_and(|item| {
                    item.page_ref == Some(page.id()) && item.slot_index == Some(slot)
                });
                if !placed {
                    return violation(format!("item {id:?} disagrees with its slot"));
                }
            }
        }
        for (id, item) in &self.items {
            let consistent = match (item.page_ref, item.slot_index) {
                (None, None) => true,
                (Some(page), Some(slot)) => {
                    self.pages.get(page).and_then(|page| page.item_at(slot)) == Some(*id)
                }
                _ => false,
            };
            if !consistent {
                return violation(format!("item `{}` has a dangling placement", item.app_id));
            }
        }
        if self.index.len() != self.items.len()
            || self.index.iter().any(|id| !self.items.contains_key(id))
        {
            return violation("item index out of sync with the store".to_string());
        }
        Ok(())
    }

    fn tail_with_space(&mut self) -> Result<PageId, GridError> {
        let tail = self.pages.tail();
        if let Some(page) = tail.and_then(|id| self.pages.get(id)) {
            if !page.is_full() {
                return Ok(page.id());
            }
        }
        self.pages.create(tail, None)
    }

    fn allocate_id(&mut self) -> ItemId {
        let id = ItemId(self.next_item_id);
        self.next_item_id += 1;
        id
    }

    fn register(&mut self, id: ItemId, mut item: Item, placement: Placement) {
        item.page_ref = Some(placement.page);
        item.slot_index = Some(placement.slot);
        item.ordering = None;
        if !item.is_virtual() {
            self.by_app.insert(item.app_id.clone(), id);
        }
        self.index.push(id);
        self.items.insert(id, item);
    }

    fn move_span(
        &self,
        from: Option<ItemId>,
        to: Option<ItemId>,
        carried: Option<ItemId>,
    ) -> Option<Vec<PageId>> {
        let page_ids = self.pages.ids();
        if page_ids.is_empty() {
            debug!("move on an empty grid ignored");
            return None;
        }
        if let Some(carried) = carried {
            if !self.items.contains_key(&carried) || self.has_item(carried).is_some() {
                error!("move rejected: carried item {carried:?} is unknown or still placed");
                return None;
            }
        }
        let page_index = |endpoint: Option<ItemId>| {
            endpoint
                .and_then(|id| self.has_item(id))
                .and_then(|page| page_ids.iter().position(|candidate| *candidate == page))
        };
        let first = page_index(from).unwrap_or(0);
        let last = page_index(to).unwrap_or(page_ids.len() - 1);
        if first > last {
            warn!("move rejected: `from` lies after `to`");
            return None;
        }
        Some(page_ids[first..=last].to_vec())
    }

    fn snapshot_pages(&self, span: &[PageId]) -> PageSnapshot {
        span.iter()
            .filter_map(|id| self.pages.get(*id).map(|page| (*id, page.slots().to_vec())))
            .collect()
    }

    fn finish_move(
        &mut self,
        snapshot: PageSnapshot,
        carried: Option<ItemId>,
        evicted: Option<ItemId>,
    ) -> Option<ItemId> {
        if let Err(err) = self.check_slots_unique() {
            error!("move aborted and rolled back: {err}");
            for (page_id, slots) in snapshot {
                if let Some(page) = self.pages.get_mut(page_id) {
                    page.restore_slots(slots);
                }
            }
            self.resync_placements();
            return carried;
        }
        self.resync_placements();
        evicted
    }

    fn check_slots_unique(&self) -> Result<(), GridError> {
        let mut seen = HashSet::new();
        for id in self.pages.iter().flat_map(|page| page.slots().iter().flatten()) {
            if !self.items.contains_key(id) {
                return Err(GridError::InvariantViolation(format!(
                    "slot holds unknown item {id:?}"
                )));
            }
            if !seen.insert(*id) {
                return Err(GridError::InvariantViolation(format!(
                    "item {id:?} occupies more than one slot"
                )));
            }
        }
        Ok(())
    }

    fn resync_placements(&mut self) {
        for item in self.items.values_mut() {
            item.clear_placement();
        }
        for page in self.pages.iter() {
            for (slot, occupant) in page.slots().iter().enumerate() {
                if let Some(item) = occupant.and_then(|id| self.items.get_mut(&id)) {
                    item.page_ref = Some(page.id());
                    item.slot_index = Some(slot);
                }
            }
        }
    }
}
