//! Installed-application catalog service contracts and adapters.

use std::{cell::RefCell, collections::BTreeMap, future::Future, pin::Pin, rc::Rc};

use serde::{Deserialize, Serialize};

/// Object-safe boxed future used by [`AppCatalog`] async methods.
pub type AppCatalogFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Kind of installed application.
pub enum AppKind {
    /// Natively packaged application.
    Native,
    /// Web application wrapper.
    Web,
    /// Home-screen widget provider.
    Widget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One installed application as reported by the catalog.
pub struct CatalogRecord {
    /// Owning package identifier.
    pub package_id: String,
    /// Unique application identifier.
    pub app_id: String,
    /// Localized launcher label.
    pub label: String,
    /// Registered icon resource, if any.
    #[serde(default)]
    pub icon: Option<String>,
    /// Application kind.
    pub kind: AppKind,
    /// Whether the application can currently be launched.
    pub enabled: bool,
    /// Whether the application asked to stay off the launcher.
    #[serde(default)]
    pub hidden: bool,
    /// Whether the label supports text-to-speech.
    #[serde(default)]
    pub tts_supported: bool,
    /// Whether the app opens through a direct launch request instead of the default handler.
    #[serde(default)]
    pub open_via_direct_launch: bool,
}

impl CatalogRecord {
    /// Builds an enabled, visible native app record with no icon.
    pub fn native(
        package_id: impl Into<String>,
        app_id: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            app_id: app_id.into(),
            label: label.into(),
            icon: None,
            kind: AppKind::Native,
            enabled: true,
            hidden: false,
            tts_supported: false,
            open_via_direct_launch: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Filter applied by [`AppCatalog::enumerate`].
pub struct CatalogFilter {
    /// Skip applications flagged as hidden.
    pub exclude_hidden: bool,
}

impl CatalogFilter {
    /// Filter used by the launcher grid: hidden apps never reach the grid.
    pub const fn launcher() -> Self {
        Self {
            exclude_hidden: true,
        }
    }
}

/// Host registry of installed applications.
pub trait AppCatalog {
    /// Enumerates installed applications sorted by `app_id`.
    fn enumerate<'a>(
        &'a self,
        filter: CatalogFilter,
    ) -> AppCatalogFuture<'a, Result<Vec<CatalogRecord>, String>>;

    /// Resolves a single application by id. `Ok(None)` means not installed.
    fn resolve<'a>(
        &'a self,
        app_id: &'a str,
    ) -> AppCatalogFuture<'a, Result<Option<CatalogRecord>, String>>;
}

#[derive(Debug, Clone, Copy, Default)]
/// No-op catalog for unsupported targets and baseline tests.
pub struct NoopAppCatalog;

impl AppCatalog for NoopAppCatalog {
    fn enumerate<'a>(
        &'a self,
        _filter: CatalogFilter,
    ) -> AppCatalogFuture<'a, Result<Vec<CatalogRecord>, String>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn resolve<'a>(
        &'a self,
        _app_id: &'a str,
    ) -> AppCatalogFuture<'a, Result<Option<CatalogRecord>, String>> {
        Box::pin(async { Ok(None) })
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory catalog keyed by app id. Clones share the same registry.
pub struct MemoryAppCatalog {
    inner: Rc<RefCell<BTreeMap<String, CatalogRecord>>>,
}

impl MemoryAppCatalog {
    /// Creates a catalog pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = CatalogRecord>) -> Self {
        let catalog = Self::default();
        for record in records {
            catalog.install(record);
        }
        catalog
    }

    /// Installs or replaces an application.
    pub fn install(&self, record: CatalogRecord) {
        self.inner
            .borrow_mut()
            .insert(record.app_id.clone(), record);
    }

    /// Removes an application. Returns the removed record when it was installed.
    pub fn uninstall(&self, app_id: &str) -> Option<CatalogRecord> {
        self.inner.borrow_mut().remove(app_id)
    }

    /// Returns the number of installed applications, hidden ones included.
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Returns `true` when nothing is installed.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl AppCatalog for MemoryAppCatalog {
    fn enumerate<'a>(
        &'a self,
        filter: CatalogFilter,
    ) -> AppCatalogFuture<'a, Result<Vec<CatalogRecord>, String>> {
        Box::pin(async move {
            Ok(self
                .inner
                .borrow()
                .values()
                .filter(|record| !(filter.exclude_hidden && record.hidden))
                .cloned()
                .collect())
        })
    }

    fn resolve<'a>(
        &'a self,
        app_id: &'a str,
    ) -> AppCatalogFuture<'a, Result<Option<CatalogRecord>, String>> {
        Box::pin(async move { Ok(self.inner.borrow().get(app_id).cloned()) })
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn memory_catalog_enumerates_sorted_and_filters_hidden() {
        let mut hidden = CatalogRecord::native("pkg.b", "app.b", "B");
        hidden.hidden = true;
        let catalog = MemoryAppCatalog::with_records([
            CatalogRecord::native("pkg.c", "app.c", "C"),
            hidden,
            CatalogRecord::native("pkg.a", "app.a", "A"),
        ]);
        let catalog_obj: &dyn AppCatalog = &catalog;

        let visible =
            block_on(catalog_obj.enumerate(CatalogFilter::launcher())).expect("enumerate");
        let ids = visible.iter().map(|r| r.app_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["app.a", "app.c"]);

        let all = block_on(catalog_obj.enumerate(CatalogFilter::default())).expect("enumerate");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn memory_catalog_resolve_tracks_install_and_uninstall() {
        let catalog = MemoryAppCatalog::default();
        catalog.install(CatalogRecord::native("pkg.a", "app.a", "A"));
        assert!(block_on(catalog.resolve("app.a")).expect("resolve").is_some());

        catalog.uninstall("app.a");
        assert_eq!(block_on(catalog.resolve("app.a")).expect("resolve"), None);
        assert!(catalog.is_empty());
    }

    #[test]
    fn catalog_record_serialization_uses_kebab_case_kind() {
        let mut record = CatalogRecord::native("pkg.web", "app.web", "Web");
        record.kind = AppKind::Web;
        let value = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(value["kind"], serde_json::json!("web"));
        assert_eq!(value["app_id"], serde_json::json!("app.web"));
    }

    #[test]
    fn noop_catalog_is_empty() {
        let catalog = NoopAppCatalog;
        assert!(block_on(catalog.enumerate(CatalogFilter::launcher()))
            .expect("enumerate")
            .is_empty());
        assert_eq!(block_on(catalog.resolve("app.a")).expect("resolve"), None);
    }
}
