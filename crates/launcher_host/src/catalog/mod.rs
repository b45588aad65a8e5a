//! Installed-application catalog contracts and lightweight test adapters.

mod service;

pub use service::{
    AppCatalog, AppCatalogFuture, AppKind, CatalogFilter, CatalogRecord, MemoryAppCatalog,
    NoopAppCatalog,
};
