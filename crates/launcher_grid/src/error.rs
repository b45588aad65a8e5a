//! Error taxonomy for grid, page, and item operations.

use thiserror::Error;

use crate::model::PageId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors returned by low-level page and grid operations.
pub enum GridError {
    /// The item id is not known to the grid.
    #[error("item not found")]
    ItemNotFound,
    /// The application is not installed, hidden, or disabled.
    #[error("app `{0}` not found")]
    AppNotFound(String),
    /// The page id does not refer to a live page.
    #[error("page {0:?} not found")]
    PageNotFound(PageId),
    /// Every slot of the page is occupied.
    #[error("page is full")]
    Full,
    /// The requested slot already holds an item.
    #[error("slot {slot} is occupied")]
    Occupied {
        /// Occupied slot index.
        slot: usize,
    },
    /// The requested slot is empty.
    #[error("slot {slot} is empty")]
    Empty {
        /// Empty slot index.
        slot: usize,
    },
    /// The slot index is outside `0..capacity`.
    #[error("slot {slot} out of range for page capacity {capacity}")]
    SlotOutOfRange {
        /// Requested slot index.
        slot: usize,
        /// Page capacity.
        capacity: usize,
    },
    /// A new page would exceed the configured page limit.
    #[error("page limit of {max_pages} reached")]
    PageLimitReached {
        /// Configured maximum number of pages.
        max_pages: usize,
    },
    /// The application already has an item on the grid.
    #[error("app `{0}` is already placed")]
    DuplicateApp(String),
    /// The catalog lookup itself failed.
    #[error("catalog lookup failed: {0}")]
    Catalog(String),
    /// A structural invariant did not hold; the operation was aborted.
    #[error("grid invariant violated: {0}")]
    InvariantViolation(String),
}
