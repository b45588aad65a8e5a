//! Edit-mode controller: pads every page with virtual placeholders while the user rearranges
//! items, so cross-page shifts always work against a full, uniform page shape.

use launcher_host::OrderingRecord;
use log::debug;

use crate::{
    error::GridError,
    grid::Grid,
    item::{self, Item},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Edit-mode flag plus the serial source for placeholder app ids.
pub struct EditMode {
    active: bool,
    next_serial: u64,
}

impl EditMode {
    /// Whether edit mode is on.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Turns edit mode on and fills every empty slot with a virtual item. Returns the number of
    /// placeholders created. Calling it again only tops up pages linked since.
    ///
    /// # Errors
    ///
    /// Propagates [`Grid::insert_item_at`] failures; placeholders inserted before the failure
    /// stay and are cleaned up by [`EditMode::exit_edit`].
    pub fn enter_edit(&mut self, grid: &mut Grid) -> Result<usize, GridError> {
        self.active = true;
        let filled = self.fill(grid)?;
        debug!("edit mode on, {filled} placeholder(s) added");
        Ok(filled)
    }

    /// Fills empty slots with placeholders while active; a no-op otherwise.
    ///
    /// # Errors
    ///
    /// Propagates [`Grid::insert_item_at`] failures.
    pub fn fill(&mut self, grid: &mut Grid) -> Result<usize, GridError> {
        if !self.active {
            return Ok(0);
        }
        let mut filled = 0;
        for page_id in grid.page_ids() {
            let empty_slots = grid
                .page(page_id)
                .map(|page| {
                    page.slots()
                        .iter()
                        .enumerate()
                        .filter(|(_, slot)| slot.is_none())
                        .map(|(index, _)| index)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            for slot in empty_slots {
                self.next_serial += 1;
                grid.insert_item_at(Item::virtual_placeholder(self.next_serial), page_id, slot)?;
                filled += 1;
            }
        }
        Ok(filled)
    }

    /// Turns edit mode off: destroys every virtual item, compacts the grid, and returns the
    /// fresh orderings to hand to persistence.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ItemNotFound`] if a placeholder vanished mid-removal.
    pub fn exit_edit(&mut self, grid: &mut Grid) -> Result<Vec<OrderingRecord>, GridError> {
        self.active = false;
        let placeholders = grid.virtual_items();
        let removed = placeholders.len();
        for id in placeholders {
            item::destroy(grid.remove_item(id)?);
        }
        grid.trim();
        debug!("edit mode off, {removed} placeholder(s) removed");
        Ok(grid.write_orderings())
    }
}
