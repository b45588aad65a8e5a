//! Launcher application grid core.
//!
//! Items live in fixed-capacity pages linked into a chain; the [`grid::Grid`] moves items across
//! page boundaries, compacts gaps, and writes dense orderings for persistence. Pointer
//! interaction, package notifications, edit mode, and badge resolution all go through
//! [`reducer::reduce_launcher`], which mutates [`model::LauncherState`] synchronously and returns
//! [`reducer::LauncherEffect`] values. [`runtime::LauncherRuntime`] executes those effects against
//! the host services defined in `launcher_host`.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod badge;
pub mod catalog_sync;
pub mod config;
pub mod edit_mode;
pub mod error;
pub mod grid;
pub mod item;
pub mod lifecycle;
pub mod model;
pub mod page;
pub mod persistence;
pub mod placement;
pub mod reducer;
pub mod runtime;

pub use badge::{
    fetch_badge_snapshot, render_badge, BadgeOverlay, BadgeRender, BadgeSnapshot, BadgeTier,
    BadgeVisual,
};
pub use catalog_sync::{
    apply_ops, diff_catalog, sync_catalog, trim_orderings, CatalogSyncSession, SyncError, SyncOp,
    SyncReport,
};
pub use config::{ConfigError, LauncherConfig};
pub use edit_mode::EditMode;
pub use error::GridError;
pub use grid::{Grid, ReadListReport};
pub use item::{resolve_item, Item};
pub use lifecycle::{LifecycleDispatcher, LifecycleNotice, LifecycleStage, SubscriberHandle};
pub use model::*;
pub use page::{Page, PageArena};
pub use persistence::{
    backup_to_seed, bootstrap_from_seed, persist_orderings, reset_to_seed, PersistReport,
};
pub use placement::PlacementQueue;
pub use reducer::{reduce_launcher, LauncherAction, LauncherEffect, ReducerError};
pub use runtime::{LauncherHostContext, LauncherRuntime, RuntimeError};
