//! Identifiers and state containers shared by the grid, its pages, and the reducer.

use serde::{Deserialize, Serialize};

use crate::{badge::BadgeOverlay, config::LauncherConfig, edit_mode::EditMode, grid::Grid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Stable identifier of an item stored in a [`crate::grid::Grid`].
pub struct ItemId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Stable identifier of a page in the grid's page arena. Ids are never reused.
pub struct PageId(pub u32);

impl PageId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Placement of an item: owning page and slot index.
pub struct Placement {
    /// Owning page.
    pub page: PageId,
    /// Slot within the page.
    pub slot: usize,
}

#[derive(Debug, Clone)]
/// Everything the reducer mutates: the grid plus the edit-mode and badge mirrors around it.
pub struct LauncherState {
    /// Active configuration.
    pub config: LauncherConfig,
    /// Paginated item collection.
    pub grid: Grid,
    /// Edit-mode controller.
    pub edit_mode: EditMode,
    /// Badge mirror.
    pub badges: BadgeOverlay,
}

impl LauncherState {
    /// Creates an empty launcher state sized by `config`.
    pub fn new(config: LauncherConfig) -> Self {
        Self {
            grid: Grid::new(&config),
            edit_mode: EditMode::default(),
            badges: BadgeOverlay::new(config.badge_display_cap),
            config,
        }
    }
}

impl Default for LauncherState {
    fn default() -> Self {
        Self::new(LauncherConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// An item drag in progress.
pub struct DragSession {
    /// Item following the pointer.
    pub item: ItemId,
    /// Position the item was picked up from.
    pub origin_position: usize,
    /// Number of reorders applied so far.
    pub reorders: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Pointer interaction phase.
///
/// `Idle -> Pressed -> (long press enters edit mode) -> Dragging -> (hover reorders) ->
/// Dragging -> (release settles) -> Idle`. Inside edit mode a press starts dragging at once.
pub enum DragPhase {
    /// No pointer interaction.
    #[default]
    Idle,
    /// Pointer down on an item, hold threshold not reached yet.
    Pressed {
        /// Pressed item.
        item: ItemId,
        /// Press timestamp, unix milliseconds.
        pressed_at_ms: u64,
    },
    /// Item lifted and following the pointer.
    Dragging(DragSession),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Transient pointer interaction state, kept apart from [`LauncherState`].
pub struct InteractionState {
    /// Current drag phase.
    pub drag: DragPhase,
}

impl InteractionState {
    /// Whether no press or drag is in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self.drag, DragPhase::Idle)
    }

    /// Active drag session, if any.
    pub fn drag_session(&self) -> Option<DragSession> {
        match self.drag {
            DragPhase::Dragging(session) => Some(session),
            _ => None,
        }
    }
}
