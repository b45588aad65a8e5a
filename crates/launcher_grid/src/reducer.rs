//! Reducer actions, side-effect intents, and transition logic for the launcher grid.

use launcher_host::{elapsed_ms, CatalogRecord, OrderingRecord};
use log::{debug, error, warn};
use thiserror::Error;

use crate::{
    badge::{BadgeRender, BadgeSnapshot, BadgeVisual},
    error::GridError,
    item::{self, Item},
    model::{DragPhase, DragSession, InteractionState, ItemId, LauncherState},
};

#[derive(Debug, Clone, PartialEq)]
/// Actions accepted by [`reduce_launcher`] to mutate [`LauncherState`].
pub enum LauncherAction {
    /// Append one catalog record during incremental placement.
    PlaceItem {
        /// Record to place.
        record: CatalogRecord,
    },
    /// Write orderings for the current layout and persist them.
    CommitOrderings,
    /// Reconcile the grid against an authoritative record list.
    ApplyList {
        /// Records in target order.
        records: Vec<CatalogRecord>,
    },
    /// A package was installed.
    PackageInstalled {
        /// Resolved record of the new app.
        record: CatalogRecord,
    },
    /// A package was removed.
    PackageUninstalled {
        /// Removed application id.
        app_id: String,
    },
    /// A package changed.
    PackageUpdated {
        /// Freshly resolved record.
        record: CatalogRecord,
    },
    /// Pointer went down on an item.
    Press {
        /// Pressed item.
        item: ItemId,
        /// Press timestamp, unix milliseconds.
        at_ms: u64,
    },
    /// Pointer still down; checks the long-press threshold.
    Hold {
        /// Current timestamp, unix milliseconds.
        now_ms: u64,
    },
    /// Dragged item hovers over a global grid position.
    HoverPosition {
        /// Hovered position.
        position: usize,
    },
    /// Pointer released.
    Release,
    /// Drag aborted; the item returns to where it was picked up.
    CancelDrag,
    /// Enter edit mode explicitly.
    EnterEditMode,
    /// Leave edit mode, compacting and persisting the layout.
    ExitEditMode,
    /// Deferred badge lookup finished.
    BadgeResolved {
        /// Application id.
        app_id: String,
        /// Service state at lookup time.
        snapshot: BadgeSnapshot,
    },
}

#[derive(Debug, Clone, PartialEq)]
/// Side-effect intents emitted by [`reduce_launcher`] for the runtime to execute.
pub enum LauncherEffect {
    /// Write the orderings to the store in one transaction.
    PersistOrderings(Vec<OrderingRecord>),
    /// Look up badge registration asynchronously, then dispatch
    /// [`LauncherAction::BadgeResolved`].
    CheckBadgeRegistration {
        /// Application id.
        app_id: String,
    },
    /// Draw a badge on an item.
    ShowBadge {
        /// Badged item.
        item: ItemId,
        /// Rendered badge.
        render: BadgeRender,
    },
    /// Clear an item's badge.
    HideBadge {
        /// Item to clear.
        item: ItemId,
    },
    /// Stop badge change notifications for an app that left the grid.
    ReleaseBadge {
        /// Application id.
        app_id: String,
    },
    /// An item was placed on the grid.
    ItemPlaced {
        /// New item.
        item: ItemId,
        /// Its application id.
        app_id: String,
    },
    /// An item left the grid.
    ItemRemoved {
        /// Application id of the removed item.
        app_id: String,
    },
    /// Edit mode toggled.
    EditModeChanged {
        /// New edit-mode flag.
        active: bool,
    },
    /// An item was lifted for dragging.
    DragStarted {
        /// Dragged item.
        item: ItemId,
    },
    /// The dragged item moved to a new position.
    ItemMoved {
        /// Dragged item.
        item: ItemId,
        /// New global position.
        position: usize,
    },
    /// A drag ended and the layout was written.
    DragSettled {
        /// Dragged item.
        item: ItemId,
        /// Final global position.
        position: usize,
    },
    /// A drag was aborted.
    DragCancelled {
        /// Dragged item.
        item: ItemId,
    },
    /// A tap asked to open an app.
    LaunchApp {
        /// Application id.
        app_id: String,
        /// Open through a direct launch request.
        direct_launch: bool,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Reducer errors for actions that do not apply to the current state.
pub enum ReducerError {
    /// A grid operation failed.
    #[error(transparent)]
    Grid(#[from] GridError),
    /// A press or drag is active; layout-changing actions must wait for it to settle.
    #[error("an item press or drag is in progress")]
    InteractionInProgress,
    /// The action needs edit mode.
    #[error("edit mode is not active")]
    NotInEditMode,
    /// The action needs an active drag.
    #[error("no item is being dragged")]
    NoActiveDrag,
}

/// Applies a [`LauncherAction`] to the launcher state and collects resulting side effects.
///
/// Grid mutations happen synchronously here; everything that touches host services is returned
/// as a [`LauncherEffect`] for the runtime to execute afterwards.
///
/// # Errors
///
/// Returns [`ReducerError::InteractionInProgress`] for layout changes during a press or drag,
/// [`ReducerError::NoActiveDrag`] / [`ReducerError::NotInEditMode`] for drag actions out of
/// phase, and [`ReducerError::Grid`] when the underlying grid operation fails.
pub fn reduce_launcher(
    state: &mut LauncherState,
    interaction: &mut InteractionState,
    action: LauncherAction,
) -> Result<Vec<LauncherEffect>, ReducerError> {
    let mut effects = Vec::new();
    match action {
        LauncherAction::PlaceItem { record } => {
            ensure_idle(interaction)?;
            if let Some(id) = state.grid.find_by_app_id(&record.app_id) {
                if state.grid.item(id).is_some_and(Item::is_placed) {
                    debug!("app `{}` already placed", record.app_id);
                    return Ok(effects);
                }
                state.grid.pack_item_at_tail(id)?;
                state.edit_mode.fill(&mut state.grid)?;
                effects.push(LauncherEffect::ItemPlaced {
                    item: id,
                    app_id: record.app_id,
                });
                return Ok(effects);
            }
            let id = state.grid.append_item(Item::create(&record)?)?;
            state.edit_mode.fill(&mut state.grid)?;
            push_placed(state, &mut effects, id, record.app_id);
        }
        LauncherAction::CommitOrderings => {
            ensure_idle(interaction)?;
            effects.push(LauncherEffect::PersistOrderings(
                state.grid.write_orderings(),
            ));
        }
        LauncherAction::ApplyList { records } => {
            ensure_idle(interaction)?;
            let target = records
                .iter()
                .filter_map(|record| match Item::create(record) {
                    Ok(item) => Some(item),
                    Err(err) => {
                        debug!("apply list skipped `{}`: {err}", record.app_id);
                        None
                    }
                })
                .collect();
            let report = state.grid.read_list(target)?;
            for app_id in report.removed {
                push_removed(state, &mut effects, app_id);
            }
            for id in report.added {
                if let Some(app_id) = state.grid.item(id).map(|item| item.app_id.clone()) {
                    push_placed(state, &mut effects, id, app_id);
                }
            }
            state.edit_mode.fill(&mut state.grid)?;
            effects.push(LauncherEffect::PersistOrderings(
                state.grid.write_orderings(),
            ));
        }
        LauncherAction::PackageInstalled { record } => {
            ensure_idle(interaction)?;
            if state.grid.find_by_app_id(&record.app_id).is_some() {
                return reduce_launcher(
                    state,
                    interaction,
                    LauncherAction::PackageUpdated { record },
                );
            }
            let id = state.grid.append_item(Item::create(&record)?)?;
            state.edit_mode.fill(&mut state.grid)?;
            push_placed(state, &mut effects, id, record.app_id);
            effects.push(LauncherEffect::PersistOrderings(
                state.grid.write_orderings(),
            ));
        }
        LauncherAction::PackageUninstalled { app_id } => {
            ensure_idle(interaction)?;
            let id = state
                .grid
                .find_by_app_id(&app_id)
                .ok_or_else(|| GridError::AppNotFound(app_id.clone()))?;
            item::destroy(state.grid.remove_item(id)?);
            push_removed(state, &mut effects, app_id);
            state.grid.trim();
            state.edit_mode.fill(&mut state.grid)?;
            effects.push(LauncherEffect::PersistOrderings(
                state.grid.write_orderings(),
            ));
        }
        LauncherAction::PackageUpdated { record } => {
            ensure_idle(interaction)?;
            let replacement = Item::create(&record);
            let Some(id) = state.grid.find_by_app_id(&record.app_id) else {
                return match replacement {
                    Ok(_) => reduce_launcher(
                        state,
                        interaction,
                        LauncherAction::PackageInstalled { record },
                    ),
                    Err(_) => Ok(effects),
                };
            };
            item::destroy(state.grid.remove_item(id)?);
            match replacement {
                Ok(item) => {
                    state.grid.trim();
                    let id = state.grid.append_item(item)?;
                    push_placed(state, &mut effects, id, record.app_id);
                }
                Err(err) => {
                    debug!("updated app `{}` left the grid: {err}", record.app_id);
                    push_removed(state, &mut effects, record.app_id);
                    state.grid.trim();
                }
            }
            state.edit_mode.fill(&mut state.grid)?;
            effects.push(LauncherEffect::PersistOrderings(
                state.grid.write_orderings(),
            ));
        }
        LauncherAction::Press { item, at_ms } => {
            ensure_idle(interaction)?;
            let pressed = state.grid.item(item).ok_or(GridError::ItemNotFound)?;
            if !pressed.is_placed() {
                return Err(GridError::ItemNotFound.into());
            }
            if pressed.is_virtual() {
                return Ok(effects);
            }
            if state.edit_mode.is_active() {
                start_drag(state, interaction, &mut effects, item)?;
            } else {
                interaction.drag = DragPhase::Pressed {
                    item,
                    pressed_at_ms: at_ms,
                };
            }
        }
        LauncherAction::Hold { now_ms } => {
            let DragPhase::Pressed {
                item,
                pressed_at_ms,
            } = interaction.drag
            else {
                return Ok(effects);
            };
            if elapsed_ms(pressed_at_ms, now_ms) < state.config.long_press_ms {
                return Ok(effects);
            }
            if !state.edit_mode.is_active() {
                state.edit_mode.enter_edit(&mut state.grid)?;
                effects.push(LauncherEffect::EditModeChanged { active: true });
            }
            start_drag(state, interaction, &mut effects, item)?;
        }
        LauncherAction::HoverPosition { position } => {
            let mut session = interaction
                .drag_session()
                .ok_or(ReducerError::NoActiveDrag)?;
            if !state.edit_mode.is_active() {
                return Err(ReducerError::NotInEditMode);
            }
            if reorder(state, session.item, position)? {
                session.reorders += 1;
                interaction.drag = DragPhase::Dragging(session);
                effects.push(LauncherEffect::ItemMoved {
                    item: session.item,
                    position,
                });
            }
        }
        LauncherAction::Release => match interaction.drag {
            DragPhase::Idle => {}
            DragPhase::Pressed { item, .. } => {
                interaction.drag = DragPhase::Idle;
                if let Some(tapped) = state.grid.item(item) {
                    effects.push(LauncherEffect::LaunchApp {
                        app_id: tapped.app_id.clone(),
                        direct_launch: tapped.open_via_direct_launch,
                    });
                }
            }
            DragPhase::Dragging(session) => {
                interaction.drag = DragPhase::Idle;
                let position = state
                    .grid
                    .position_of(session.item)
                    .unwrap_or(session.origin_position);
                effects.push(LauncherEffect::DragSettled {
                    item: session.item,
                    position,
                });
                effects.push(LauncherEffect::PersistOrderings(
                    state.grid.write_orderings(),
                ));
            }
        },
        LauncherAction::CancelDrag => match interaction.drag {
            DragPhase::Idle => {}
            DragPhase::Pressed { .. } => interaction.drag = DragPhase::Idle,
            DragPhase::Dragging(session) => {
                interaction.drag = DragPhase::Idle;
                if let Err(err) = reorder(state, session.item, session.origin_position) {
                    warn!("cancelled drag left item {:?} in place: {err}", session.item);
                }
                effects.push(LauncherEffect::DragCancelled { item: session.item });
            }
        },
        LauncherAction::EnterEditMode => {
            ensure_idle(interaction)?;
            let was_active = state.edit_mode.is_active();
            state.edit_mode.enter_edit(&mut state.grid)?;
            if !was_active {
                effects.push(LauncherEffect::EditModeChanged { active: true });
            }
        }
        LauncherAction::ExitEditMode => {
            ensure_idle(interaction)?;
            if !state.edit_mode.is_active() {
                return Err(ReducerError::NotInEditMode);
            }
            let records = state.edit_mode.exit_edit(&mut state.grid)?;
            effects.push(LauncherEffect::EditModeChanged { active: false });
            effects.push(LauncherEffect::PersistOrderings(records));
        }
        LauncherAction::BadgeResolved { app_id, snapshot } => {
            let visual = state.badges.resolve(&app_id, snapshot);
            let Some(id) = state.grid.find_by_app_id(&app_id) else {
                state.badges.forget(&app_id);
                return Ok(effects);
            };
            effects.push(match visual {
                BadgeVisual::Shown(render) => LauncherEffect::ShowBadge { item: id, render },
                BadgeVisual::Hidden => LauncherEffect::HideBadge { item: id },
            });
        }
    }
    Ok(effects)
}

fn ensure_idle(interaction: &InteractionState) -> Result<(), ReducerError> {
    if interaction.is_idle() {
        Ok(())
    } else {
        Err(ReducerError::InteractionInProgress)
    }
}

fn push_placed(
    state: &mut LauncherState,
    effects: &mut Vec<LauncherEffect>,
    item: ItemId,
    app_id: String,
) {
    if state.badges.request_registration(&app_id) {
        effects.push(LauncherEffect::CheckBadgeRegistration {
            app_id: app_id.clone(),
        });
    }
    effects.push(LauncherEffect::ItemPlaced { item, app_id });
}

fn push_removed(state: &mut LauncherState, effects: &mut Vec<LauncherEffect>, app_id: String) {
    state.badges.forget(&app_id);
    effects.push(LauncherEffect::ReleaseBadge {
        app_id: app_id.clone(),
    });
    effects.push(LauncherEffect::ItemRemoved { app_id });
}

fn start_drag(
    state: &LauncherState,
    interaction: &mut InteractionState,
    effects: &mut Vec<LauncherEffect>,
    item: ItemId,
) -> Result<(), ReducerError> {
    let origin_position = state
        .grid
        .position_of(item)
        .ok_or(GridError::ItemNotFound)?;
    interaction.drag = DragPhase::Dragging(DragSession {
        item,
        origin_position,
        reorders: 0,
    });
    effects.push(LauncherEffect::DragStarted { item });
    Ok(())
}

/// Moves the dragged item to `target_position`, shifting everything in between by one slot.
/// Returns `false` when there is nothing to do.
fn reorder(
    state: &mut LauncherState,
    dragged: ItemId,
    target_position: usize,
) -> Result<bool, GridError> {
    let grid = &mut state.grid;
    let current = grid.position_of(dragged).ok_or(GridError::ItemNotFound)?;
    let Some(target) = grid.item_at_position(target_position) else {
        return Ok(false);
    };
    if target == dragged {
        return Ok(false);
    }

    let vacated = grid.unpack_item(dragged)?;
    let displaced = if target_position > current {
        let from = grid.item_at_position(current + 1);
        grid.move_item_toward_head(from, Some(target), Some(dragged))
    } else {
        let to = grid.item_at_position(current - 1);
        grid.move_item_toward_tail(Some(target), to, Some(dragged))
    };

    let Some(refill) = displaced else {
        return Ok(true);
    };
    if let Err(err) = grid.pack_item_at(refill, vacated) {
        error!("reorder could not refill vacated slot: {err}");
        return Err(err);
    }
    Ok(refill != dragged)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::LauncherConfig;

    fn record(app_id: &str) -> CatalogRecord {
        CatalogRecord::native(format!("pkg.{app_id}"), app_id, app_id.to_uppercase())
    }

    fn launcher(apps: &[&str]) -> (LauncherState, InteractionState) {
        let mut state = LauncherState::new(LauncherConfig::default());
        let mut interaction = InteractionState::default();
        for app_id in apps {
            reduce_launcher(
                &mut state,
                &mut interaction,
                LauncherAction::PlaceItem {
                    record: record(app_id),
                },
            )
            .expect("place");
        }
        (state, interaction)
    }

    fn order(state: &LauncherState) -> Vec<String> {
        state
            .grid
            .items_in_order()
            .into_iter()
            .filter_map(|id| state.grid.item(id))
            .filter(|item| !item.is_virtual())
            .map(|item| item.app_id.clone())
            .collect()
    }

    fn id(state: &LauncherState, app_id: &str) -> ItemId {
        state.grid.find_by_app_id(app_id).expect("placed")
    }

    fn persisted(effects: &[LauncherEffect]) -> Option<Vec<OrderingRecord>> {
        effects.iter().find_map(|effect| match effect {
            LauncherEffect::PersistOrderings(records) => Some(records.clone()),
            _ => None,
        })
    }

    #[test]
    fn placing_a_stranded_app_packs_it_back_instead_of_skipping() {
        let (mut state, mut interaction) = launcher(&["a", "b", "c"]);
        let b = id(&state, "b");
        let evicted = state
            .grid
            .move_item_toward_head(Some(b), Some(id(&state, "c")), None);
        assert_eq!(evicted, Some(b));
        assert_eq!(order(&state), vec!["a", "c"]);

        let effects = reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::PlaceItem { record: record("b") },
        )
        .expect("place stranded");
        assert_eq!(
            effects,
            vec![LauncherEffect::ItemPlaced {
                item: b,
                app_id: "b".to_string(),
            }]
        );
        assert_eq!(order(&state), vec!["a", "c", "b"]);
        assert_eq!(state.grid.count_items(), 3);
        state.grid.check_invariants().expect("invariants");
    }

    #[test]
    fn placing_items_requests_badge_checks_once() {
        let (mut state, mut interaction) = launcher(&["a"]);
        let effects = reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::PlaceItem {
                record: record("b"),
            },
        )
        .expect("place");
        assert_eq!(
            effects[0],
            LauncherEffect::CheckBadgeRegistration {
                app_id: "b".to_string()
            }
        );
        let again = reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::PlaceItem {
                record: record("b"),
            },
        )
        .expect("duplicate place");
        assert!(again.is_empty());
        assert_eq!(state.grid.count_items(), 2);
    }

    #[test]
    fn long_press_enters_edit_mode_and_starts_drag() {
        let (mut state, mut interaction) = launcher(&["a", "b", "c"]);
        let a = id(&state, "a");
        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::Press { item: a, at_ms: 1_000 },
        )
        .expect("press");
        let early = reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::Hold { now_ms: 1_200 },
        )
        .expect("hold");
        assert!(early.is_empty());

        let effects = reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::Hold { now_ms: 1_500 },
        )
        .expect("hold");
        assert_eq!(
            effects,
            vec![
                LauncherEffect::EditModeChanged { active: true },
                LauncherEffect::DragStarted { item: a },
            ]
        );
        assert!(state.edit_mode.is_active());
        assert_eq!(state.grid.count_occupied_slots(), 4);
    }

    #[test]
    fn tap_release_launches_app() {
        let (mut state, mut interaction) = launcher(&["a"]);
        let a = id(&state, "a");
        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::Press { item: a, at_ms: 0 },
        )
        .expect("press");
        let effects =
            reduce_launcher(&mut state, &mut interaction, LauncherAction::Release).expect("tap");
        assert_eq!(
            effects,
            vec![LauncherEffect::LaunchApp {
                app_id: "a".to_string(),
                direct_launch: false
            }]
        );
        assert!(interaction.is_idle());
    }

    #[test]
    fn dragging_toward_tail_and_back_reorders_across_pages() {
        let (mut state, mut interaction) = launcher(&["a", "b", "c", "d"]);
        reduce_launcher(&mut state, &mut interaction, LauncherAction::EnterEditMode)
            .expect("edit");
        let a = id(&state, "a");
        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::Press { item: a, at_ms: 0 },
        )
        .expect("press");

        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::HoverPosition { position: 2 },
        )
        .expect("hover");
        assert_eq!(order(&state), vec!["b", "c", "a", "d"]);

        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::HoverPosition { position: 3 },
        )
        .expect("hover");
        assert_eq!(order(&state), vec!["b", "c", "d", "a"]);

        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::HoverPosition { position: 0 },
        )
        .expect("hover");
        assert_eq!(order(&state), vec!["a", "b", "c", "d"]);
        assert_eq!(interaction.drag_session().map(|s| s.reorders), Some(3));
        state.grid.check_invariants().expect("invariants");
    }

    #[test]
    fn release_settles_and_persists_dense_orderings() {
        let (mut state, mut interaction) = launcher(&["a", "b", "c"]);
        reduce_launcher(&mut state, &mut interaction, LauncherAction::EnterEditMode)
            .expect("edit");
        let c = id(&state, "c");
        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::Press { item: c, at_ms: 0 },
        )
        .expect("press");
        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::HoverPosition { position: 0 },
        )
        .expect("hover");

        let effects =
            reduce_launcher(&mut state, &mut interaction, LauncherAction::Release).expect("release");
        assert_eq!(
            effects[0],
            LauncherEffect::DragSettled {
                item: c,
                position: 0
            }
        );
        assert_eq!(
            persisted(&effects).expect("persist"),
            vec![
                OrderingRecord::new("c", 0),
                OrderingRecord::new("a", 1),
                OrderingRecord::new("b", 2),
            ]
        );
        assert!(interaction.is_idle());
        assert!(state.edit_mode.is_active());
    }

    #[test]
    fn hovering_a_placeholder_slot_moves_into_it() {
        let (mut state, mut interaction) = launcher(&["a", "b", "c"]);
        reduce_launcher(&mut state, &mut interaction, LauncherAction::EnterEditMode)
            .expect("edit");
        let a = id(&state, "a");
        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::Press { item: a, at_ms: 0 },
        )
        .expect("press");
        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::HoverPosition { position: 3 },
        )
        .expect("hover");
        assert_eq!(state.grid.position_of(a), Some(3));
        assert_eq!(order(&state), vec!["b", "c", "a"]);

        reduce_launcher(&mut state, &mut interaction, LauncherAction::Release).expect("release");
        let effects =
            reduce_launcher(&mut state, &mut interaction, LauncherAction::ExitEditMode)
                .expect("exit");
        assert_eq!(
            persisted(&effects).expect("persist"),
            vec![
                OrderingRecord::new("b", 0),
                OrderingRecord::new("c", 1),
                OrderingRecord::new("a", 2),
            ]
        );
        assert!(state.grid.virtual_items().is_empty());
        state.grid.check_invariants().expect("invariants");
    }

    #[test]
    fn cancel_drag_returns_item_to_origin() {
        let (mut state, mut interaction) = launcher(&["a", "b", "c", "d"]);
        reduce_launcher(&mut state, &mut interaction, LauncherAction::EnterEditMode)
            .expect("edit");
        let b = id(&state, "b");
        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::Press { item: b, at_ms: 0 },
        )
        .expect("press");
        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::HoverPosition { position: 3 },
        )
        .expect("hover");
        let effects =
            reduce_launcher(&mut state, &mut interaction, LauncherAction::CancelDrag)
                .expect("cancel");
        assert_eq!(effects, vec![LauncherEffect::DragCancelled { item: b }]);
        assert_eq!(order(&state), vec!["a", "b", "c", "d"]);
        assert!(persisted(&effects).is_none());
    }

    #[test]
    fn package_events_are_refused_while_dragging() {
        let (mut state, mut interaction) = launcher(&["a", "b"]);
        reduce_launcher(&mut state, &mut interaction, LauncherAction::EnterEditMode)
            .expect("edit");
        let a = id(&state, "a");
        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::Press { item: a, at_ms: 0 },
        )
        .expect("press");
        assert_eq!(
            reduce_launcher(
                &mut state,
                &mut interaction,
                LauncherAction::PackageUninstalled {
                    app_id: "b".to_string()
                },
            ),
            Err(ReducerError::InteractionInProgress)
        );
        assert_eq!(state.grid.count_items(), 2);
    }

    #[test]
    fn uninstall_compacts_and_persists() {
        let (mut state, mut interaction) = launcher(&["a", "b", "c"]);
        let effects = reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::PackageUninstalled {
                app_id: "a".to_string(),
            },
        )
        .expect("uninstall");
        assert!(effects.contains(&LauncherEffect::ReleaseBadge {
            app_id: "a".to_string()
        }));
        assert_eq!(
            persisted(&effects).expect("persist"),
            vec![OrderingRecord::new("b", 0), OrderingRecord::new("c", 1)]
        );
        assert_eq!(state.grid.count_pages(), 1);
        assert_eq!(
            reduce_launcher(
                &mut state,
                &mut interaction,
                LauncherAction::PackageUninstalled {
                    app_id: "a".to_string()
                },
            ),
            Err(ReducerError::Grid(GridError::AppNotFound("a".to_string())))
        );
    }

    #[test]
    fn update_reappends_and_hidden_update_removes() {
        let (mut state, mut interaction) = launcher(&["a", "b", "c"]);
        let effects = reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::PackageUpdated {
                record: record("a"),
            },
        )
        .expect("update");
        assert_eq!(order(&state), vec!["b", "c", "a"]);
        assert!(persisted(&effects).is_some());

        let mut hidden = record("b");
        hidden.hidden = true;
        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::PackageUpdated { record: hidden },
        )
        .expect("hidden update");
        assert_eq!(order(&state), vec!["c", "a"]);
        state.grid.check_invariants().expect("invariants");
    }

    #[test]
    fn install_of_known_app_is_treated_as_update() {
        let (mut state, mut interaction) = launcher(&["a", "b"]);
        let mut renamed = record("a");
        renamed.label = "Alpha".to_string();
        reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::PackageInstalled { record: renamed },
        )
        .expect("install");
        assert_eq!(state.grid.count_items(), 2);
        assert_eq!(
            state.grid.item(id(&state, "a")).expect("a").display_name,
            "Alpha"
        );
    }

    #[test]
    fn exit_edit_mode_requires_edit_mode() {
        let (mut state, mut interaction) = launcher(&["a"]);
        assert_eq!(
            reduce_launcher(&mut state, &mut interaction, LauncherAction::ExitEditMode),
            Err(ReducerError::NotInEditMode)
        );
        assert_eq!(
            reduce_launcher(
                &mut state,
                &mut interaction,
                LauncherAction::HoverPosition { position: 0 }
            ),
            Err(ReducerError::NoActiveDrag)
        );
    }

    #[test]
    fn badge_resolution_shows_and_hides_badges() {
        let (mut state, mut interaction) = launcher(&["mail"]);
        let mail = id(&state, "mail");
        let effects = reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::BadgeResolved {
                app_id: "mail".to_string(),
                snapshot: BadgeSnapshot {
                    registered: true,
                    count: 1500,
                    display_enabled: true,
                },
            },
        )
        .expect("badge");
        let [LauncherEffect::ShowBadge { item, render }] = effects.as_slice() else {
            panic!("expected a single badge effect, got {effects:?}");
        };
        assert_eq!(*item, mail);
        assert_eq!(render.text, "999+");

        let effects = reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::BadgeResolved {
                app_id: "mail".to_string(),
                snapshot: BadgeSnapshot::default(),
            },
        )
        .expect("badge");
        assert_eq!(effects, vec![LauncherEffect::HideBadge { item: mail }]);
    }

    #[test]
    fn apply_list_reports_removed_and_added_apps() {
        let (mut state, mut interaction) = launcher(&["a", "b"]);
        let effects = reduce_launcher(
            &mut state,
            &mut interaction,
            LauncherAction::ApplyList {
                records: vec![record("b"), record("c")],
            },
        )
        .expect("apply");
        assert!(effects.contains(&LauncherEffect::ItemRemoved {
            app_id: "a".to_string()
        }));
        assert!(effects.iter().any(|effect| matches!(
            effect,
            LauncherEffect::ItemPlaced { app_id, .. } if app_id == "c"
        )));
        assert_eq!(
            persisted(&effects).expect("persist"),
            vec![OrderingRecord::new("b", 0), OrderingRecord::new("c", 1)]
        );
    }
}
