//! Fixed-capacity slot pages and the arena that links them into the grid's page sequence.
//!
//! Pages are doubly linked through `prev`/`next` ids into a [`PageArena`] instead of references,
//! so unlinking a page can never leave a dangling neighbour. Ids are never reused.

use log::{debug, error};

use crate::{
    error::GridError,
    model::{ItemId, PageId},
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// One page of the grid: `capacity` ordered slots, each holding at most one item.
pub struct Page {
    id: PageId,
    slots: Vec<Option<ItemId>>,
    prev: Option<PageId>,
    next: Option<PageId>,
}

impl Page {
    fn new(id: PageId, capacity: usize) -> Self {
        Self {
            id,
            slots: vec![None; capacity],
            prev: None,
            next: None,
        }
    }

    /// Arena id of this page.
    pub fn id(&self) -> PageId {
        self.id
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Previous page in link order.
    pub fn prev(&self) -> Option<PageId> {
        self.prev
    }

    /// Next page in link order.
    pub fn next(&self) -> Option<PageId> {
        self.next
    }

    /// Slot contents in index order.
    pub fn slots(&self) -> &[Option<ItemId>] {
        &self.slots
    }

    /// Places `item` in the first empty slot and returns that slot.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Full`] without mutating when no slot is free.
    pub fn pack(&mut self, item: ItemId) -> Result<usize, GridError> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(GridError::Full)?;
        self.slots[slot] = Some(item);
        Ok(slot)
    }

    /// Places `item` at `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::SlotOutOfRange`] or [`GridError::Occupied`]; the caller must unpack
    /// an occupied slot first.
    pub fn pack_at(&mut self, item: ItemId, slot: usize) -> Result<(), GridError> {
        let capacity = self.capacity();
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(GridError::SlotOutOfRange { slot, capacity })?;
        if entry.is_some() {
            return Err(GridError::Occupied { slot });
        }
        *entry = Some(item);
        Ok(())
    }

    /// Clears the slot holding `item` and returns that slot.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ItemNotFound`] when the item is not on this page.
    pub fn unpack(&mut self, item: ItemId) -> Result<usize, GridError> {
        let slot = self.find_slot(item).ok_or(GridError::ItemNotFound)?;
        self.slots[slot] = None;
        Ok(slot)
    }

    /// Clears `slot` and returns its former occupant.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::SlotOutOfRange`] or [`GridError::Empty`].
    pub fn unpack_at(&mut self, slot: usize) -> Result<ItemId, GridError> {
        let capacity = self.capacity();
        self.slots
            .get_mut(slot)
            .ok_or(GridError::SlotOutOfRange { slot, capacity })?
            .take()
            .ok_or(GridError::Empty { slot })
    }

    /// Number of occupied slots.
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.occupied_count() == self.capacity()
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Occupant of `slot`; `None` for an empty or out-of-range slot.
    pub fn item_at(&self, slot: usize) -> Option<ItemId> {
        self.slots.get(slot).copied().flatten()
    }

    /// Slot holding `item`.
    pub fn find_slot(&self, item: ItemId) -> Option<usize> {
        self.slots.iter().position(|slot| *slot == Some(item))
    }

    /// Resolves the slot span a cross-page move covers on this page.
    ///
    /// An endpoint item that is not on this page clamps to slot 0 (`from`) or the last slot
    /// (`to`), which lets a move span pages holding neither boundary item.
    pub fn resolve_span(&self, from: Option<ItemId>, to: Option<ItemId>) -> (usize, usize) {
        let from_slot = from.and_then(|item| self.find_slot(item)).unwrap_or(0);
        let to_slot = to
            .and_then(|item| self.find_slot(item))
            .unwrap_or(self.capacity().saturating_sub(1));
        (from_slot, to_slot)
    }

    /// Moves the occupants of `from_slot..=to_slot` one slot toward the head.
    ///
    /// `incoming` lands in `to_slot`; the former occupant of `from_slot` falls off the head end
    /// and is returned. An inverted or out-of-range span leaves the page untouched and hands
    /// `incoming` straight back.
    pub fn shift_toward_head(
        &mut self,
        from_slot: usize,
        to_slot: usize,
        incoming: Option<ItemId>,
    ) -> Option<ItemId> {
        if !self.span_is_valid(from_slot, to_slot) {
            return incoming;
        }
        let outgoing = self.slots[from_slot].take();
        self.slots[from_slot..=to_slot].rotate_left(1);
        self.slots[to_slot] = incoming;
        outgoing
    }

    /// Moves the occupants of `from_slot..=to_slot` one slot toward the tail.
    ///
    /// `incoming` lands in `from_slot`; the former occupant of `to_slot` falls off the tail end
    /// and is returned. An inverted or out-of-range span leaves the page untouched and hands
    /// `incoming` straight back.
    pub fn shift_toward_tail(
        &mut self,
        from_slot: usize,
        to_slot: usize,
        incoming: Option<ItemId>,
    ) -> Option<ItemId> {
        if !self.span_is_valid(from_slot, to_slot) {
            return incoming;
        }
        let outgoing = self.slots[to_slot].take();
        self.slots[from_slot..=to_slot].rotate_right(1);
        self.slots[from_slot] = incoming;
        outgoing
    }

    fn span_is_valid(&self, from_slot: usize, to_slot: usize) -> bool {
        let valid = from_slot <= to_slot && to_slot < self.capacity();
        if !valid {
            error!(
                "page {:?}: rejected shift span {from_slot}..={to_slot} (capacity {})",
                self.id,
                self.capacity()
            );
        }
        valid
    }

    pub(crate) fn clear(&mut self) -> Vec<ItemId> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }

    pub(crate) fn restore_slots(&mut self, slots: Vec<Option<ItemId>>) {
        self.slots = slots;
    }
}

#[derive(Debug, Clone)]
/// Owner of every page and of the head/tail links of the page sequence.
pub struct PageArena {
    pages: Vec<Option<Page>>,
    free: Vec<PageId>,
    head: Option<PageId>,
    tail: Option<PageId>,
    live: usize,
    capacity: usize,
    max_pages: usize,
}

impl PageArena {
    /// Creates an empty arena for pages of `capacity` slots, allowing at most `max_pages`.
    pub fn new(capacity: usize, max_pages: usize) -> Self {
        Self {
            pages: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            live: 0,
            capacity,
            max_pages,
        }
    }

    /// Allocates an empty page and splices it between the adjacent pages `prev` and `next`.
    /// Ids of destroyed pages are reused before the arena grows.
    ///
    /// `(None, None)` is only valid for an empty sequence; `(Some(tail), None)` appends and
    /// `(None, Some(head))` prepends.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::PageLimitReached`] when the limit is hit and
    /// [`GridError::InvariantViolation`] when `prev` and `next` are not neighbours. Nothing is
    /// linked on error.
    pub fn create(
        &mut self,
        prev: Option<PageId>,
        next: Option<PageId>,
    ) -> Result<PageId, GridError> {
        if self.live >= self.max_pages {
            return Err(GridError::PageLimitReached {
                max_pages: self.max_pages,
            });
        }
        self.check_adjacent(prev, next)?;

        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                let id = PageId(u32::try_from(self.pages.len()).map_err(|_| {
                    GridError::InvariantViolation("page id space exhausted".to_string())
                })?);
                self.pages.push(None);
                id
            }
        };
        let mut page = Page::new(id, self.capacity);
        page.prev = prev;
        page.next = next;
        self.pages[id.index()] = Some(page);
        self.live += 1;

        match prev {
            Some(prev) => self.link_next(prev, Some(id)),
            None => self.head = Some(id),
        }
        match next {
            Some(next) => self.link_prev(next, Some(id)),
            None => self.tail = Some(id),
        }
        debug!("created page {id:?} between {prev:?} and {next:?}");
        Ok(id)
    }

    /// Unlinks and returns a page, relinking its neighbours. Head and tail pages move the
    /// sequence's head/tail id instead.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::PageNotFound`] (logged) for an unknown or already destroyed page.
    pub fn destroy(&mut self, id: PageId) -> Result<Page, GridError> {
        let Some(page) = self.pages.get_mut(id.index()).and_then(Option::take) else {
            error!("destroy of unknown page {id:?}");
            return Err(GridError::PageNotFound(id));
        };
        self.live -= 1;
        self.free.push(id);

        match page.prev {
            Some(prev) => self.link_next(prev, page.next),
            None => {
                debug!("destroying head page {id:?}");
                self.head = page.next;
            }
        }
        match page.next {
            Some(next) => self.link_prev(next, page.prev),
            None => {
                debug!("destroying tail page {id:?}");
                self.tail = page.prev;
            }
        }
        Ok(page)
    }

    /// Live page by id.
    pub fn get(&self, id: PageId) -> Option<&Page> {
        self.pages.get(id.index()).and_then(Option::as_ref)
    }

    /// Live page by id, mutably.
    pub fn get_mut(&mut self, id: PageId) -> Option<&mut Page> {
        self.pages.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// First page in link order.
    pub fn head(&self) -> Option<PageId> {
        self.head
    }

    /// Last page in link order.
    pub fn tail(&self) -> Option<PageId> {
        self.tail
    }

    /// Number of live pages.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no page is linked.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Slots per page.
    pub fn page_capacity(&self) -> usize {
        self.capacity
    }

    /// Maximum number of live pages.
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Walks the sequence from the head.
    pub fn iter(&self) -> PageIter<'_> {
        PageIter {
            arena: self,
            cursor: self.head,
            remaining: self.live,
        }
    }

    /// Page ids in link order.
    pub fn ids(&self) -> Vec<PageId> {
        self.iter().map(Page::id).collect()
    }

    fn check_adjacent(&self, prev: Option<PageId>, next: Option<PageId>) -> Result<(), GridError> {
        let adjacent = match (prev, next) {
            (None, None) => self.is_empty(),
            (Some(prev), None) => self.tail == Some(prev),
            (None, Some(next)) => self.head == Some(next),
            (Some(prev), Some(next)) => {
                self.get(prev).and_then(Page::next) == Some(next)
                    && self.get(next).and_then(Page::prev) == Some(prev)
            }
        };
        if adjacent {
            Ok(())
        } else {
            Err(GridError::InvariantViolation(format!(
                "pages {prev:?} and {next:?} are not adjacent"
            )))
        }
    }

    fn link_next(&mut self, id: PageId, next: Option<PageId>) {
        if let Some(page) = self.get_mut(id) {
            page.next = next;
        }
    }

    fn link_prev(&mut self, id: PageId, prev: Option<PageId>) {
        if let Some(page) = self.get_mut(id) {
            page.prev = prev;
        }
    }
}

/// Iterator over live pages in link order.
pub struct PageIter<'a> {
    arena: &'a PageArena,
    cursor: Option<PageId>,
    remaining: usize,
}

impl<'a> Iterator for PageIter<'a> {
    type Item = &'a Page;

    fn next(&mut self) -> Option<Self::Item> {
        // Bounded by the live count so a corrupted cycle cannot spin forever.
        if self.remaining == 0 {
            return None;
        }
        let page = self.arena.get(self.cursor?)?;
        self.remaining -= 1;
        self.cursor = page.next;
        Some(page)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ids(raw: &[Option<u64>]) -> Vec<Option<ItemId>> {
        raw.iter().map(|slot| slot.map(ItemId)).collect()
    }

    fn page_with(raw: &[Option<u64>]) -> Page {
        let mut page = Page::new(PageId(0), raw.len());
        page.restore_slots(ids(raw));
        page
    }

    #[test]
    fn pack_fills_first_empty_slot_and_reports_full_without_mutation() {
        let mut page = page_with(&[None, Some(1), None]);
        assert_eq!(page.pack(ItemId(2)), Ok(0));
        assert_eq!(page.pack(ItemId(3)), Ok(2));
        let before = page.clone();
        assert_eq!(page.pack(ItemId(4)), Err(GridError::Full));
        assert_eq!(page, before);
        assert!(page.is_full());
    }

    #[test]
    fn pack_at_rejects_occupied_and_out_of_range_slots() {
        let mut page = page_with(&[Some(1), None]);
        assert_eq!(
            page.pack_at(ItemId(2), 0),
            Err(GridError::Occupied { slot: 0 })
        );
        assert_eq!(
            page.pack_at(ItemId(2), 5),
            Err(GridError::SlotOutOfRange {
                slot: 5,
                capacity: 2
            })
        );
        page.pack_at(ItemId(2), 1).expect("pack_at");
        assert_eq!(page.item_at(1), Some(ItemId(2)));
    }

    #[test]
    fn unpack_variants_report_missing_items() {
        let mut page = page_with(&[Some(1), Some(2)]);
        assert_eq!(page.unpack(ItemId(2)), Ok(1));
        assert_eq!(page.unpack(ItemId(2)), Err(GridError::ItemNotFound));
        assert_eq!(page.unpack_at(0), Ok(ItemId(1)));
        assert_eq!(page.unpack_at(0), Err(GridError::Empty { slot: 0 }));
        assert!(page.is_empty());
        assert_eq!(page.occupied_count(), 0);
    }

    #[test]
    fn shift_toward_head_drops_from_slot_and_takes_incoming_at_to_slot() {
        let mut page = page_with(&[Some(1), Some(2), Some(3), Some(4)]);
        let out = page.shift_toward_head(1, 3, Some(ItemId(9)));
        assert_eq!(out, Some(ItemId(2)));
        assert_eq!(page.slots(), ids(&[Some(1), Some(3), Some(4), Some(9)]).as_slice());
    }

    #[test]
    fn shift_toward_tail_drops_to_slot_and_takes_incoming_at_from_slot() {
        let mut page = page_with(&[Some(1), Some(2), Some(3), Some(4)]);
        let out = page.shift_toward_tail(0, 2, Some(ItemId(9)));
        assert_eq!(out, Some(ItemId(3)));
        assert_eq!(page.slots(), ids(&[Some(9), Some(1), Some(2), Some(4)]).as_slice());
    }

    #[test]
    fn single_slot_shift_swaps_incoming_for_occupant() {
        let mut page = page_with(&[Some(1), Some(2)]);
        assert_eq!(page.shift_toward_head(1, 1, None), Some(ItemId(2)));
        assert_eq!(page.slots(), ids(&[Some(1), None]).as_slice());
    }

    #[test]
    fn invalid_span_returns_incoming_untouched() {
        let mut page = page_with(&[Some(1), Some(2)]);
        assert_eq!(page.shift_toward_head(1, 0, Some(ItemId(9))), Some(ItemId(9)));
        assert_eq!(page.shift_toward_tail(0, 4, Some(ItemId(9))), Some(ItemId(9)));
        assert_eq!(page.slots(), ids(&[Some(1), Some(2)]).as_slice());
    }

    #[test]
    fn resolve_span_clamps_missing_endpoints() {
        let page = page_with(&[Some(1), Some(2), Some(3)]);
        assert_eq!(page.resolve_span(Some(ItemId(2)), Some(ItemId(3))), (1, 2));
        assert_eq!(page.resolve_span(None, Some(ItemId(2))), (0, 1));
        assert_eq!(page.resolve_span(Some(ItemId(7)), None), (0, 2));
    }

    #[test]
    fn arena_links_appended_and_inserted_pages() {
        let mut arena = PageArena::new(2, 8);
        let a = arena.create(None, None).expect("first");
        let c = arena.create(Some(a), None).expect("append");
        let b = arena.create(Some(a), Some(c)).expect("insert");
        let head = arena.create(None, Some(a)).expect("prepend");

        assert_eq!(arena.ids(), vec![head, a, b, c]);
        assert_eq!(arena.head(), Some(head));
        assert_eq!(arena.tail(), Some(c));
        assert_eq!(arena.get(b).and_then(Page::prev), Some(a));
        assert_eq!(arena.get(b).and_then(Page::next), Some(c));
    }

    #[test]
    fn arena_rejects_non_adjacent_splice_and_page_limit() {
        let mut arena = PageArena::new(2, 2);
        let a = arena.create(None, None).expect("first");
        assert!(matches!(
            arena.create(None, None),
            Err(GridError::InvariantViolation(_))
        ));
        let b = arena.create(Some(a), None).expect("second");
        assert_eq!(
            arena.create(Some(b), None),
            Err(GridError::PageLimitReached { max_pages: 2 })
        );
        assert_eq!(arena.ids(), vec![a, b]);
    }

    #[test]
    fn arena_destroy_relinks_middle_head_and_tail() {
        let mut arena = PageArena::new(1, 8);
        let a = arena.create(None, None).expect("a");
        let b = arena.create(Some(a), None).expect("b");
        let c = arena.create(Some(b), None).expect("c");
        let d = arena.create(Some(c), None).expect("d");

        arena.destroy(b).expect("middle");
        assert_eq!(arena.ids(), vec![a, c, d]);
        assert_eq!(arena.get(c).and_then(Page::prev), Some(a));

        arena.destroy(a).expect("head");
        assert_eq!(arena.head(), Some(c));
        assert_eq!(arena.get(c).and_then(Page::prev), None);

        arena.destroy(d).expect("tail");
        assert_eq!(arena.tail(), Some(c));
        assert_eq!(arena.ids(), vec![c]);

        assert_eq!(arena.destroy(b), Err(GridError::PageNotFound(b)));
        arena.destroy(c).expect("last");
        assert!(arena.is_empty());
        assert_eq!(arena.head(), None);
        assert_eq!(arena.tail(), None);
    }

    #[test]
    fn arena_reuses_destroyed_slots_under_churn() {
        let mut arena = PageArena::new(1, 4);
        let head = arena.create(None, None).expect("head");
        for _ in 0..1000 {
            let tail = arena.create(Some(head), None).expect("tail");
            arena.destroy(tail).expect("destroy");
        }
        assert_eq!(arena.pages.len(), 2);
        assert_eq!(arena.ids(), vec![head]);

        let reused = arena.create(Some(head), None).expect("reused");
        assert_eq!(reused, PageId(1));
        assert_eq!(arena.get(reused).and_then(Page::prev), Some(head));
        assert_eq!(arena.get(reused).map(Page::occupied_count), Some(0));
    }
}
