//! Launcher runtime: owns the reducer state and executes [`LauncherEffect`] values against the
//! injected host services.
//!
//! Everything runs on the owning thread. Host futures are awaited in effect order, and follow-up
//! actions (badge resolution) are reduced and their effects queued behind the current batch.
//! Badge registration checks are queued rather than awaited, so placement never waits on the
//! badge service; [`LauncherRuntime::pump_badge_registrations`] resolves them. Package
//! notifications that arrive during a press or drag are deferred until the interaction settles.

use std::{collections::VecDeque, rc::Rc};

use launcher_host::{
    AppCatalog, BadgeService, CatalogFilter, MemoryAppCatalog, MemoryBadgeService,
    MemoryOrderingStore, NoopAppCatalog, NoopBadgeService, NoopOrderingStore, OrderingStore,
    PackageBusReceiver, PackageEvent, SeedEntry,
};
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::{
    badge::fetch_badge_snapshot,
    catalog_sync::{sync_catalog, CatalogSyncSession, SyncError},
    config::LauncherConfig,
    lifecycle::{LifecycleDispatcher, LifecycleNotice, LifecycleStage, SubscriberHandle},
    model::{InteractionState, LauncherState},
    persistence::{bootstrap_from_seed, persist_orderings},
    placement::PlacementQueue,
    reducer::{reduce_launcher, LauncherAction, LauncherEffect, ReducerError},
};

#[derive(Clone)]
/// Host service bundle for launcher side effects.
pub struct LauncherHostContext {
    catalog: Rc<dyn AppCatalog>,
    store: Rc<dyn OrderingStore>,
    badges: Rc<dyn BadgeService>,
}

impl Default for LauncherHostContext {
    fn default() -> Self {
        Self {
            catalog: Rc::new(NoopAppCatalog),
            store: Rc::new(NoopOrderingStore),
            badges: Rc::new(NoopBadgeService),
        }
    }
}

impl LauncherHostContext {
    /// Bundles explicit service implementations.
    pub fn new(
        catalog: Rc<dyn AppCatalog>,
        store: Rc<dyn OrderingStore>,
        badges: Rc<dyn BadgeService>,
    ) -> Self {
        Self {
            catalog,
            store,
            badges,
        }
    }

    /// In-memory services for headless hosts and tests. The adapters share state with the
    /// handles passed in.
    pub fn memory(
        catalog: &MemoryAppCatalog,
        store: &MemoryOrderingStore,
        badges: &MemoryBadgeService,
    ) -> Self {
        Self::new(
            Rc::new(catalog.clone()),
            Rc::new(store.clone()),
            Rc::new(badges.clone()),
        )
    }

    /// Returns the configured application catalog.
    pub fn app_catalog(&self) -> Rc<dyn AppCatalog> {
        self.catalog.clone()
    }

    /// Returns the configured ordering store.
    pub fn ordering_store(&self) -> Rc<dyn OrderingStore> {
        self.store.clone()
    }

    /// Returns the configured badge service.
    pub fn badge_service(&self) -> Rc<dyn BadgeService> {
        self.badges.clone()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors surfaced by runtime entry points.
pub enum RuntimeError {
    /// The reducer refused an action.
    #[error(transparent)]
    Reducer(#[from] ReducerError),
    /// Catalog or store access failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Long-lived launcher container: state, interaction, lifecycle subscribers, and sync session.
pub struct LauncherRuntime {
    host: LauncherHostContext,
    state: LauncherState,
    interaction: InteractionState,
    lifecycle: LifecycleDispatcher,
    sync: CatalogSyncSession,
    deferred: VecDeque<PackageEvent>,
    badge_checks: VecDeque<String>,
}

impl LauncherRuntime {
    /// Creates an empty runtime. Nothing touches the host until [`LauncherRuntime::boot`].
    pub fn new(host: LauncherHostContext, config: LauncherConfig) -> Self {
        Self {
            host,
            state: LauncherState::new(config),
            interaction: InteractionState::default(),
            lifecycle: LifecycleDispatcher::default(),
            sync: CatalogSyncSession::default(),
            deferred: VecDeque::new(),
            badge_checks: VecDeque::new(),
        }
    }

    /// Current launcher state.
    pub fn state(&self) -> &LauncherState {
        &self.state
    }

    /// Current pointer interaction.
    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    /// Catalog sync bookkeeping.
    pub fn sync_session(&self) -> &CatalogSyncSession {
        &self.sync
    }

    /// Host services.
    pub fn host(&self) -> &LauncherHostContext {
        &self.host
    }

    /// Package notifications waiting for the current interaction to settle.
    pub fn deferred_events(&self) -> usize {
        self.deferred.len()
    }

    /// Badge registration checks queued for the next
    /// [`LauncherRuntime::pump_badge_registrations`].
    pub fn pending_badge_checks(&self) -> usize {
        self.badge_checks.len()
    }

    /// Registers a lifecycle subscriber.
    pub fn subscribe(
        &mut self,
        stage: LifecycleStage,
        subscriber: impl FnMut(&LifecycleNotice) + 'static,
    ) -> SubscriberHandle {
        self.lifecycle.subscribe(stage, subscriber)
    }

    /// Removes a lifecycle subscriber.
    pub fn unsubscribe(&mut self, handle: SubscriberHandle) -> bool {
        self.lifecycle.unsubscribe(handle)
    }

    /// Boots the launcher:
    /// 1. seed an empty store from `seed`
    /// 2. reconcile the store against the catalog
    /// 3. place every visible app in persisted order and commit the layout
    /// 4. resolve the badge registrations the placements queued
    ///
    /// Store failures in the first two steps are logged and boot continues from the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Sync`] when the catalog cannot be enumerated and
    /// [`RuntimeError::Reducer`] when a placement is refused.
    pub async fn boot(&mut self, seed: &[SeedEntry]) -> Result<usize, RuntimeError> {
        let store = self.host.ordering_store();
        match bootstrap_from_seed(store.as_ref(), seed).await {
            Ok(0) => {}
            Ok(seeded) => info!("ordering store seeded with {seeded} record(s)"),
            Err(err) => warn!("ordering seed failed: {err}"),
        }
        let catalog = self.host.app_catalog();
        if let Err(err) = sync_catalog(&mut self.sync, catalog.as_ref(), store.as_ref()).await {
            warn!("boot catalog sync failed: {err}");
        }

        let mut queue = self.placement_queue().await?;
        for action in queue.by_ref() {
            self.dispatch(action).await?;
        }
        let placed = queue.yielded();
        self.pump_badge_registrations().await;
        info!("launcher booted with {placed} app(s)");
        Ok(placed)
    }

    /// Builds a placement queue over the visible catalog in persisted order, for hosts that
    /// place incrementally instead of through [`LauncherRuntime::boot`].
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Sync`] when the catalog cannot be enumerated.
    pub async fn placement_queue(&self) -> Result<PlacementQueue, RuntimeError> {
        let mut records = self
            .host
            .catalog
            .enumerate(CatalogFilter::launcher())
            .await
            .map_err(SyncError::Catalog)?;
        records.retain(|record| record.enabled && !record.hidden);
        let orderings = match self.host.store.list().await {
            Ok(orderings) => orderings,
            Err(err) => {
                warn!("ordering store unreadable, placing in catalog order: {err}");
                Vec::new()
            }
        };
        Ok(PlacementQueue::in_store_order(records, &orderings))
    }

    /// Reduces `action` and executes every resulting effect, including follow-ups. Deferred
    /// package notifications are replayed once the interaction is idle again.
    ///
    /// # Errors
    ///
    /// Returns the reducer error for `action`; effect failures are logged.
    pub async fn dispatch(&mut self, action: LauncherAction) -> Result<(), ReducerError> {
        let effects = reduce_launcher(&mut self.state, &mut self.interaction, action)?;
        self.run_effects(effects).await;
        if self.interaction.is_idle() && !self.deferred.is_empty() {
            self.replay_deferred().await;
        }
        Ok(())
    }

    /// Drains the package bus and applies each notification, deferring them while an item is
    /// pressed or dragged. Returns the number applied now.
    pub async fn handle_package_events(&mut self, bus: &mut PackageBusReceiver) -> usize {
        let events = bus.drain();
        let mut applied = 0;
        for event in events {
            self.sync.note_event(&event);
            if self.interaction.is_idle() {
                self.apply_package_event(event).await;
                applied += 1;
            } else {
                debug!(
                    "package {} for `{}` deferred until the drag settles",
                    event.token(),
                    event.app_id()
                );
                self.deferred.push_back(event);
            }
        }
        self.settle_sync().await;
        self.pump_badge_registrations().await;
        applied
    }

    /// Resolves every queued badge registration check, including checks queued while
    /// resolving. Returns the number of apps resolved.
    pub async fn pump_badge_registrations(&mut self) -> usize {
        let badges = self.host.badge_service();
        let mut resolved = 0;
        while let Some(app_id) = self.badge_checks.pop_front() {
            if self.state.grid.find_by_app_id(&app_id).is_none() {
                debug!("badge check for `{app_id}` dropped, app left the grid");
                continue;
            }
            match fetch_badge_snapshot(badges.as_ref(), &app_id).await {
                Ok(snapshot) => {
                    let mut queue = VecDeque::new();
                    self.follow_up(LauncherAction::BadgeResolved { app_id, snapshot }, &mut queue);
                    self.drain_effects(queue).await;
                    resolved += 1;
                }
                Err(err) => warn!("badge registration check for `{app_id}` failed: {err}"),
            }
        }
        resolved
    }

    /// Re-reads badge state for every app the badge service reported as changed. Returns the
    /// number of apps refreshed.
    pub async fn pump_badge_changes(&mut self) -> usize {
        let badges = self.host.badge_service();
        let mut refreshed = 0;
        for app_id in badges.take_changes() {
            if self.state.grid.find_by_app_id(&app_id).is_none() {
                continue;
            }
            match fetch_badge_snapshot(badges.as_ref(), &app_id).await {
                Ok(snapshot) => {
                    let mut queue = VecDeque::new();
                    self.follow_up(LauncherAction::BadgeResolved { app_id, snapshot }, &mut queue);
                    self.drain_effects(queue).await;
                    refreshed += 1;
                }
                Err(err) => warn!("badge refresh for `{app_id}` failed: {err}"),
            }
        }
        refreshed
    }

    async fn replay_deferred(&mut self) {
        while let Some(event) = self.deferred.pop_front() {
            self.apply_package_event(event).await;
        }
        self.settle_sync().await;
        self.pump_badge_registrations().await;
    }

    async fn settle_sync(&mut self) {
        if !self.sync.has_pending() || !self.deferred.is_empty() {
            return;
        }
        let catalog = self.host.app_catalog();
        let store = self.host.ordering_store();
        if let Err(err) = sync_catalog(&mut self.sync, catalog.as_ref(), store.as_ref()).await {
            warn!("catalog sync after package change failed: {err}");
        }
    }

    async fn apply_package_event(&mut self, event: PackageEvent) {
        let action = match &event {
            PackageEvent::Uninstall { app_id } => {
                if self.state.grid.find_by_app_id(app_id).is_none() {
                    debug!("uninstalled app `{app_id}` was not on the grid");
                    return;
                }
                LauncherAction::PackageUninstalled {
                    app_id: app_id.clone(),
                }
            }
            PackageEvent::Install { app_id } | PackageEvent::Update { app_id } => {
                let resolved = match self.host.catalog.resolve(app_id).await {
                    Ok(resolved) => resolved,
                    Err(err) => {
                        warn!("package {} for `{app_id}` unresolved: {err}", event.token());
                        return;
                    }
                };
                match (resolved, &event) {
                    (Some(record), PackageEvent::Update { .. }) => {
                        LauncherAction::PackageUpdated { record }
                    }
                    (Some(record), _) if record.enabled && !record.hidden => {
                        LauncherAction::PackageInstalled { record }
                    }
                    (None, PackageEvent::Update { .. })
                        if self.state.grid.find_by_app_id(app_id).is_some() =>
                    {
                        LauncherAction::PackageUninstalled {
                            app_id: app_id.clone(),
                        }
                    }
                    _ => {
                        debug!("package {} for `{app_id}` has nothing to show", event.token());
                        return;
                    }
                }
            }
        };
        match reduce_launcher(&mut self.state, &mut self.interaction, action) {
            Ok(effects) => self.run_effects(effects).await,
            Err(err) => warn!("package {} for `{}` refused: {err}", event.token(), event.app_id()),
        }
    }

    async fn run_effects(&mut self, effects: Vec<LauncherEffect>) {
        self.drain_effects(effects.into()).await;
    }

    async fn drain_effects(&mut self, mut queue: VecDeque<LauncherEffect>) {
        while let Some(effect) = queue.pop_front() {
            match effect {
                LauncherEffect::PersistOrderings(records) => {
                    let store = self.host.ordering_store();
                    match persist_orderings(store.as_ref(), &records).await {
                        Ok(report) => self.notify(LifecycleNotice::OrderingsPersisted {
                            count: report.upserted + report.removed,
                        }),
                        Err(err) => error!("ordering write-back dropped: {err}"),
                    }
                }
                LauncherEffect::CheckBadgeRegistration { app_id } => {
                    self.host.badges.subscribe(&app_id);
                    if !self.badge_checks.contains(&app_id) {
                        self.badge_checks.push_back(app_id);
                    }
                }
                LauncherEffect::ReleaseBadge { app_id } => {
                    self.host.badges.unsubscribe(&app_id);
                }
                LauncherEffect::ShowBadge { item, render } => {
                    self.notify(LifecycleNotice::BadgeChanged {
                        item,
                        render: Some(render),
                    });
                }
                LauncherEffect::HideBadge { item } => {
                    self.notify(LifecycleNotice::BadgeChanged { item, render: None });
                }
                LauncherEffect::ItemPlaced { item, app_id } => {
                    self.notify(LifecycleNotice::ItemPlaced { item, app_id });
                }
                LauncherEffect::ItemRemoved { app_id } => {
                    self.notify(LifecycleNotice::ItemRemoved { app_id });
                }
                LauncherEffect::EditModeChanged { active } => {
                    self.notify(LifecycleNotice::EditModeChanged { active });
                }
                LauncherEffect::DragStarted { item } => debug!("drag started on {item:?}"),
                LauncherEffect::ItemMoved { item, position } => {
                    debug!("{item:?} moved to position {position}");
                }
                LauncherEffect::DragSettled { item, position } => {
                    self.notify(LifecycleNotice::DragEnded {
                        item,
                        position: Some(position),
                    });
                }
                LauncherEffect::DragCancelled { item } => {
                    self.notify(LifecycleNotice::DragEnded {
                        item,
                        position: None,
                    });
                }
                LauncherEffect::LaunchApp {
                    app_id,
                    direct_launch,
                } => self.notify(LifecycleNotice::LaunchRequested {
                    app_id,
                    direct_launch,
                }),
            }
        }
    }

    fn follow_up(&mut self, action: LauncherAction, queue: &mut VecDeque<LauncherEffect>) {
        match reduce_launcher(&mut self.state, &mut self.interaction, action) {
            Ok(effects) => queue.extend(effects),
            Err(err) => warn!("follow-up action refused: {err}"),
        }
    }

    fn notify(&mut self, notice: LifecycleNotice) {
        self.lifecycle.dispatch(&notice);
    }
}
