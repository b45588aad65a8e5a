//! Ordering write-back and seed-file flows against the [`OrderingStore`].
//!
//! Every write batch runs inside one store transaction. Failures are logged and rolled back and
//! never retried here; the next settle or sync pass reconciles.

use std::collections::HashMap;

use launcher_host::{OrderingRecord, OrderingStore, SeedEntry};
use log::{debug, error, warn};

use crate::{catalog_sync::SyncError, grid::Grid};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Store writes performed by one batch.
pub struct PersistReport {
    /// Records inserted or renumbered.
    pub upserted: usize,
    /// Records removed.
    pub removed: usize,
}

/// Writes a grid ordering snapshot: upserts changed records and removes store entries the
/// snapshot no longer contains.
///
/// # Errors
///
/// Returns [`SyncError::Persistence`] after rolling back when any store call fails.
pub async fn persist_orderings(
    store: &dyn OrderingStore,
    records: &[OrderingRecord],
) -> Result<PersistReport, SyncError> {
    let stored = store
        .list()
        .await
        .map_err(SyncError::Persistence)?
        .into_iter()
        .map(|record| (record.app_id, record.ordering))
        .collect::<HashMap<_, _>>();

    let upserts = records
        .iter()
        .filter(|record| stored.get(&record.app_id) != Some(&record.ordering))
        .cloned()
        .collect::<Vec<_>>();
    let mut removals = stored
        .keys()
        .filter(|app_id| !records.iter().any(|record| &record.app_id == *app_id))
        .cloned()
        .collect::<Vec<_>>();
    removals.sort();

    if upserts.is_empty() && removals.is_empty() {
        debug!("ordering write-back: store already current");
        return Ok(PersistReport::default());
    }
    run_batch(store, &upserts, &removals).await?;
    Ok(PersistReport {
        upserted: upserts.len(),
        removed: removals.len(),
    })
}

/// Seeds an empty store with the default layout. A non-empty store is left alone.
///
/// # Errors
///
/// Returns [`SyncError::Persistence`] after rolling back when any store call fails.
pub async fn bootstrap_from_seed(
    store: &dyn OrderingStore,
    entries: &[SeedEntry],
) -> Result<usize, SyncError> {
    if store.count().await.map_err(SyncError::Persistence)? > 0 {
        debug!("ordering store already populated, seed skipped");
        return Ok(0);
    }
    if entries.is_empty() {
        warn!("ordering seed is empty, first boot starts from catalog order");
        return Ok(0);
    }
    run_batch(store, &seed_records(entries), &[]).await?;
    Ok(entries.len())
}

/// Replaces the whole store with the seed layout (restore/reset).
///
/// # Errors
///
/// Returns [`SyncError::Persistence`] after rolling back when any store call fails.
pub async fn reset_to_seed(
    store: &dyn OrderingStore,
    entries: &[SeedEntry],
) -> Result<PersistReport, SyncError> {
    let removals = store
        .list()
        .await
        .map_err(SyncError::Persistence)?
        .into_iter()
        .map(|record| record.app_id)
        .collect::<Vec<_>>();
    let upserts = seed_records(entries);
    run_batch(store, &upserts, &removals).await?;
    Ok(PersistReport {
        upserted: upserts.len(),
        removed: removals.len(),
    })
}

/// Seed entries describing the grid's current layout, for the XML backup path.
pub fn backup_to_seed(grid: &Grid) -> Vec<SeedEntry> {
    grid.items_in_order()
        .into_iter()
        .filter_map(|id| grid.item(id))
        .filter(|item| !item.is_virtual())
        .zip(0_u32..)
        .map(|(item, ordering)| SeedEntry::new(&item.package_id, &item.app_id, ordering))
        .collect()
}

fn seed_records(entries: &[SeedEntry]) -> Vec<OrderingRecord> {
    entries
        .iter()
        .map(|entry| OrderingRecord::new(&entry.app_id, entry.ordering))
        .collect()
}

async fn run_batch(
    store: &dyn OrderingStore,
    upserts: &[OrderingRecord],
    removals: &[String],
) -> Result<(), SyncError> {
    store.begin().await.map_err(SyncError::Persistence)?;
    if let Err(err) = write_batch(store, upserts, removals).await {
        error!("ordering write-back failed, rolling back: {err}");
        if let Err(rollback_err) = store.rollback().await {
            error!("ordering rollback failed: {rollback_err}");
        }
        return Err(SyncError::Persistence(err));
    }
    if let Err(err) = store.commit().await {
        error!("ordering commit failed, rolling back: {err}");
        if let Err(rollback_err) = store.rollback().await {
            error!("ordering rollback failed: {rollback_err}");
        }
        return Err(SyncError::Persistence(err));
    }
    Ok(())
}

async fn write_batch(
    store: &dyn OrderingStore,
    upserts: &[OrderingRecord],
    removals: &[String],
) -> Result<(), String> {
    for app_id in removals {
        store.remove(app_id).await?;
    }
    for record in upserts {
        store.upsert(&record.app_id, record.ordering).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use launcher_host::{CatalogRecord, MemoryOrderingStore};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::item::Item;

    #[test]
    fn persist_writes_only_changes_and_drops_stale_entries() {
        let store = MemoryOrderingStore::with_records([
            OrderingRecord::new("a", 0),
            OrderingRecord::new("b", 1),
            OrderingRecord::new("gone", 2),
        ]);
        let report = block_on(persist_orderings(
            &store,
            &[OrderingRecord::new("b", 0), OrderingRecord::new("a", 1)],
        ))
        .expect("persist");
        assert_eq!(
            report,
            PersistReport {
                upserted: 2,
                removed: 1
            }
        );
        assert_eq!(
            store.snapshot(),
            vec![OrderingRecord::new("b", 0), OrderingRecord::new("a", 1)]
        );

        let again = block_on(persist_orderings(
            &store,
            &[OrderingRecord::new("b", 0), OrderingRecord::new("a", 1)],
        ))
        .expect("persist");
        assert_eq!(again, PersistReport::default());
    }

    #[test]
    fn persist_failure_rolls_back() {
        let store = MemoryOrderingStore::with_records([OrderingRecord::new("a", 0)]);
        store.set_fail_writes(true);
        let err = block_on(persist_orderings(&store, &[OrderingRecord::new("a", 4)]))
            .expect_err("write fails");
        assert!(matches!(err, SyncError::Persistence(_)));
        assert!(!store.in_transaction());
        assert_eq!(store.snapshot(), vec![OrderingRecord::new("a", 0)]);
    }

    #[test]
    fn persist_commit_failure_rolls_back() {
        let store = MemoryOrderingStore::with_records([OrderingRecord::new("a", 0)]);
        store.set_fail_commit(true);
        let err = block_on(persist_orderings(&store, &[OrderingRecord::new("a", 4)]))
            .expect_err("commit fails");
        assert!(matches!(err, SyncError::Persistence(_)));
        assert!(!store.in_transaction());
        assert_eq!(store.snapshot(), vec![OrderingRecord::new("a", 0)]);
    }

    #[test]
    fn bootstrap_only_seeds_an_empty_store() {
        let seed = vec![SeedEntry::new("pkg.a", "a", 0), SeedEntry::new("pkg.b", "b", 1)];
        let store = MemoryOrderingStore::default();
        assert_eq!(block_on(bootstrap_from_seed(&store, &seed)).expect("seed"), 2);
        assert_eq!(block_on(bootstrap_from_seed(&store, &seed)).expect("seed"), 0);
        assert_eq!(store.upsert_count(), 2);
    }

    #[test]
    fn reset_replaces_every_record() {
        let store = MemoryOrderingStore::with_records([
            OrderingRecord::new("x", 0),
            OrderingRecord::new("a", 1),
        ]);
        let report = block_on(reset_to_seed(&store, &[SeedEntry::new("pkg.a", "a", 0)]))
            .expect("reset");
        assert_eq!(report.removed, 2);
        assert_eq!(store.snapshot(), vec![OrderingRecord::new("a", 0)]);
    }

    #[test]
    fn backup_lists_real_items_in_grid_order() {
        let mut grid = Grid::with_limits(2, 8);
        for app_id in ["b", "a"] {
            grid.append_item(
                Item::create(&CatalogRecord::native(format!("pkg.{app_id}"), app_id, app_id))
                    .expect("item"),
            )
            .expect("append");
        }
        grid.append_item(Item::virtual_placeholder(1)).expect("virtual");
        assert_eq!(grid.count_pages(), 2);

        assert_eq!(
            backup_to_seed(&grid),
            vec![SeedEntry::new("pkg.b", "b", 0), SeedEntry::new("pkg.a", "a", 1)]
        );
    }
}
