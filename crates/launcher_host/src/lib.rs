//! Typed host-domain contracts for the launcher application grid.
//!
//! This crate is the API-first boundary between the grid core and everything it treats as an
//! external collaborator: the installed-application catalog, the ordering persistence store, the
//! badge/notification service, the package lifecycle signal bus, and the XML ordering seed file.
//! Every async service is an object-safe trait returning a boxed future, with a no-op adapter for
//! unsupported targets and an in-memory adapter for tests and headless hosts.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod catalog;
pub mod notifications;
pub mod package_bus;
pub mod storage;
pub mod time;

pub use catalog::{
    AppCatalog, AppCatalogFuture, AppKind, CatalogFilter, CatalogRecord, MemoryAppCatalog,
    NoopAppCatalog,
};
pub use notifications::{BadgeFuture, BadgeService, MemoryBadgeService, NoopBadgeService};
pub use package_bus::{package_bus, PackageBusReceiver, PackageBusSender, PackageEvent};
pub use storage::{
    load_seed_file, parse_seed_xml, save_seed_file, try_parse_seed_xml, write_seed_xml,
    MemoryOrderingStore, NoopOrderingStore, OrderingRecord, OrderingStore, OrderingStoreFuture,
    SeedEntry,
};
pub use time::{elapsed_ms, unix_time_ms_now};
