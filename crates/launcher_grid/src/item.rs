//! Launcher items: one placed (or placeable) application icon record.

use launcher_host::{AppCatalog, AppKind, CatalogRecord};
use log::debug;

use crate::{error::GridError, model::PageId};

/// Icon used when the catalog registers none, or an empty one.
pub const DEFAULT_ICON_REFERENCE: &str = "launcher/default_app_icon.png";

/// Prefix of synthesized app ids for edit-mode placeholders.
pub const VIRTUAL_APP_ID_PREFIX: &str = "virtual:";

#[derive(Debug, Clone, PartialEq, Eq)]
/// One application icon: catalog identity plus grid placement.
///
/// Placement fields are owned by the [`crate::grid::Grid`] and only change through grid
/// operations, so an item is either unplaced or sits exactly where its page says it does.
pub struct Item {
    /// Owning package identifier.
    pub package_id: String,
    /// Unique application identifier.
    pub app_id: String,
    /// Launcher label.
    pub display_name: String,
    /// Icon resource reference.
    pub icon_reference: String,
    /// Application kind.
    pub kind: AppKind,
    /// Label supports text-to-speech.
    pub tts_supported: bool,
    /// Opens through a direct launch request.
    pub open_via_direct_launch: bool,
    pub(crate) page_ref: Option<PageId>,
    pub(crate) slot_index: Option<usize>,
    pub(crate) ordering: Option<u32>,
    pub(crate) is_virtual: bool,
}

impl Item {
    /// Builds an unplaced item from a resolved catalog record.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::AppNotFound`] when the app is hidden or disabled.
    pub fn create(record: &CatalogRecord) -> Result<Self, GridError> {
        if record.hidden || !record.enabled {
            debug!(
                "skipping app `{}` (hidden={}, enabled={})",
                record.app_id, record.hidden, record.enabled
            );
            return Err(GridError::AppNotFound(record.app_id.clone()));
        }
        Ok(Self {
            package_id: record.package_id.clone(),
            app_id: record.app_id.clone(),
            display_name: record.label.clone(),
            icon_reference: icon_or_default(record.icon.as_deref()),
            kind: record.kind,
            tts_supported: record.tts_supported,
            open_via_direct_launch: record.open_via_direct_launch,
            page_ref: None,
            slot_index: None,
            ordering: None,
            is_virtual: false,
        })
    }

    /// Creates the edit-mode placeholder numbered `serial`.
    pub fn virtual_placeholder(serial: u64) -> Self {
        Self {
            package_id: String::new(),
            app_id: format!("{VIRTUAL_APP_ID_PREFIX}{serial}"),
            display_name: String::new(),
            icon_reference: DEFAULT_ICON_REFERENCE.to_string(),
            kind: AppKind::Native,
            tts_supported: false,
            open_via_direct_launch: false,
            page_ref: None,
            slot_index: None,
            ordering: None,
            is_virtual: true,
        }
    }

    /// Owning page, when placed.
    pub fn page_ref(&self) -> Option<PageId> {
        self.page_ref
    }

    /// Slot within the owning page, when placed.
    pub fn slot_index(&self) -> Option<usize> {
        self.slot_index
    }

    /// Last ordering assigned by `write_orderings`. Always `None` for virtual items.
    pub fn ordering(&self) -> Option<u32> {
        self.ordering
    }

    /// Whether this is an edit-mode placeholder.
    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    /// Whether the item currently occupies a slot.
    pub fn is_placed(&self) -> bool {
        self.page_ref.is_some()
    }

    /// Copies catalog metadata from `other`, keeping identity and placement.
    pub(crate) fn adopt_metadata(&mut self, other: &Item) {
        self.package_id.clone_from(&other.package_id);
        self.display_name.clone_from(&other.display_name);
        self.icon_reference.clone_from(&other.icon_reference);
        self.kind = other.kind;
        self.tts_supported = other.tts_supported;
        self.open_via_direct_launch = other.open_via_direct_launch;
    }

    pub(crate) fn clear_placement(&mut self) {
        self.page_ref = None;
        self.slot_index = None;
    }
}

fn icon_or_default(icon: Option<&str>) -> String {
    match icon.map(str::trim) {
        Some(icon) if !icon.is_empty() => icon.to_string(),
        _ => DEFAULT_ICON_REFERENCE.to_string(),
    }
}

/// Resolves `app_id` through the catalog and builds an unplaced item.
///
/// # Errors
///
/// Returns [`GridError::AppNotFound`] when the app is not installed, hidden, or disabled, and
/// [`GridError::Catalog`] when the lookup itself fails.
pub async fn resolve_item(catalog: &dyn AppCatalog, app_id: &str) -> Result<Item, GridError> {
    let record = catalog
        .resolve(app_id)
        .await
        .map_err(GridError::Catalog)?
        .ok_or_else(|| GridError::AppNotFound(app_id.to_string()))?;
    Item::create(&record)
}

/// Releases an item. Placement bookkeeping is the caller's responsibility.
pub fn destroy(item: Item) {
    debug!(
        "destroying item `{}` (virtual={})",
        item.app_id, item.is_virtual
    );
    drop(item);
}
