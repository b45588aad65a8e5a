//! Catalog sync: reconciles the persisted ordering store with the installed-application catalog.
//!
//! Both inputs are full snapshots sorted by app id, so reconciliation is a single sorted
//! merge-diff followed by a dense renumbering of the surviving orderings.

use std::{cmp::Ordering, collections::BTreeSet};

use launcher_host::{
    AppCatalog, CatalogFilter, CatalogRecord, OrderingRecord, OrderingStore, PackageEvent,
};
use log::{debug, error, info};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Catalog sync and persistence failures. Never retried; the next pass reconciles.
pub enum SyncError {
    /// A store read or write failed; the batch was rolled back.
    #[error("ordering store failure: {0}")]
    Persistence(String),
    /// The catalog could not be enumerated.
    #[error("catalog failure: {0}")]
    Catalog(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One store mutation produced by [`diff_catalog`].
pub enum SyncOp {
    /// Newly installed app unknown to the store.
    Insert {
        /// Application id.
        app_id: String,
        /// Ordering past every existing one.
        ordering: u32,
    },
    /// Stored app that is no longer installed.
    Remove {
        /// Application id.
        app_id: String,
    },
}

/// Merge-diffs persisted orderings against installed apps, both sorted by app id.
///
/// New apps are inserted after the current maximum ordering (from 0 on an empty store), in app id
/// order; stale store entries are removed; matching ids are left alone.
pub fn diff_catalog(persisted: &[OrderingRecord], installed: &[CatalogRecord]) -> Vec<SyncOp> {
    let mut next_ordering = persisted
        .iter()
        .map(|record| record.ordering)
        .max()
        .map_or(0, |max| max.saturating_add(1));
    let mut ops = Vec::new();
    let mut pkgs = installed.iter().peekable();
    let mut dbs = persisted.iter().peekable();

    loop {
        let step = match (pkgs.peek(), dbs.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(pkg), Some(db)) => pkg.app_id.cmp(&db.app_id),
        };
        match step {
            Ordering::Less => {
                if let Some(pkg) = pkgs.next() {
                    ops.push(SyncOp::Insert {
                        app_id: pkg.app_id.clone(),
                        ordering: next_ordering,
                    });
                    next_ordering = next_ordering.saturating_add(1);
                }
            }
            Ordering::Greater => {
                if let Some(db) = dbs.next() {
                    ops.push(SyncOp::Remove {
                        app_id: db.app_id.clone(),
                    });
                }
            }
            Ordering::Equal => {
                pkgs.next();
                dbs.next();
            }
        }
    }
    ops
}

/// Applies `ops` to a copy of `persisted`, in memory.
pub fn apply_ops(persisted: &[OrderingRecord], ops: &[SyncOp]) -> Vec<OrderingRecord> {
    let mut records = persisted.to_vec();
    for op in ops {
        match op {
            SyncOp::Insert { app_id, ordering } => {
                records.push(OrderingRecord::new(app_id.clone(), *ordering));
            }
            SyncOp::Remove { app_id } => records.retain(|record| &record.app_id != app_id),
        }
    }
    records
}

/// Renumbers `records` densely from 0 in (ordering, app id) order and returns only the records
/// whose ordering changed.
pub fn trim_orderings(records: &[OrderingRecord]) -> Vec<OrderingRecord> {
    let mut sorted = records.iter().collect::<Vec<_>>();
    sorted.sort_by(|a, b| {
        a.ordering
            .cmp(&b.ordering)
            .then_with(|| a.app_id.cmp(&b.app_id))
    });
    sorted
        .into_iter()
        .zip(0_u32..)
        .filter(|(record, dense)| record.ordering != *dense)
        .map(|(record, dense)| OrderingRecord::new(record.app_id.clone(), dense))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Summary of one [`sync_catalog`] pass.
pub struct SyncReport {
    /// App ids inserted into the store.
    pub inserted: Vec<String>,
    /// App ids removed from the store.
    pub removed: Vec<String>,
    /// Records whose ordering was renumbered.
    pub renumbered: usize,
}

impl SyncReport {
    /// Total store writes performed.
    pub fn writes(&self) -> usize {
        self.inserted.len() + self.removed.len() + self.renumbered
    }
}

#[derive(Debug, Clone, Default)]
/// Install/uninstall request tracking owned by the launcher, passed into each sync pass.
pub struct CatalogSyncSession {
    pending_installs: BTreeSet<String>,
    pending_uninstalls: BTreeSet<String>,
    last_report: Option<SyncReport>,
    passes: usize,
}

impl CatalogSyncSession {
    /// Records a package notification until the next sync pass settles it.
    pub fn note_event(&mut self, event: &PackageEvent) {
        let app_id = event.app_id().to_string();
        match event {
            PackageEvent::Install { .. } | PackageEvent::Update { .. } => {
                self.pending_uninstalls.remove(&app_id);
                self.pending_installs.insert(app_id);
            }
            PackageEvent::Uninstall { .. } => {
                self.pending_installs.remove(&app_id);
                self.pending_uninstalls.insert(app_id);
            }
        }
    }

    /// Whether any notification arrived since the last pass.
    pub fn has_pending(&self) -> bool {
        !self.pending_installs.is_empty() || !self.pending_uninstalls.is_empty()
    }

    /// Install or update notifications awaiting a pass.
    pub fn pending_installs(&self) -> impl Iterator<Item = &str> {
        self.pending_installs.iter().map(String::as_str)
    }

    /// Uninstall notifications awaiting a pass.
    pub fn pending_uninstalls(&self) -> impl Iterator<Item = &str> {
        self.pending_uninstalls.iter().map(String::as_str)
    }

    /// Report of the most recent successful pass.
    pub fn last_report(&self) -> Option<&SyncReport> {
        self.last_report.as_ref()
    }

    /// Number of successful passes.
    pub fn passes(&self) -> usize {
        self.passes
    }

    fn settle(&mut self, report: SyncReport) {
        self.pending_installs.clear();
        self.pending_uninstalls.clear();
        self.passes += 1;
        self.last_report = Some(report);
    }
}

/// Runs one sync pass: enumerate visible enabled apps, merge-diff against the store, and write
/// the inserts, removals, and dense renumbering in a single store transaction.
///
/// # Errors
///
/// Returns [`SyncError::Catalog`] when enumeration fails and [`SyncError::Persistence`] when a
/// store call fails; the transaction is rolled back and the session keeps its pending requests.
pub async fn sync_catalog(
    session: &mut CatalogSyncSession,
    catalog: &dyn AppCatalog,
    store: &dyn OrderingStore,
) -> Result<SyncReport, SyncError> {
    let mut installed = catalog
        .enumerate(CatalogFilter::launcher())
        .await
        .map_err(SyncError::Catalog)?;
    installed.retain(|record| record.enabled && !record.hidden);
    installed.sort_by(|a, b| a.app_id.cmp(&b.app_id));

    let mut persisted = store.list().await.map_err(SyncError::Persistence)?;
    persisted.sort_by(|a, b| a.app_id.cmp(&b.app_id));

    let ops = diff_catalog(&persisted, &installed);
    let renumber = trim_orderings(&apply_ops(&persisted, &ops));
    if ops.is_empty() && renumber.is_empty() {
        debug!("catalog sync: store already matches catalog");
        let report = SyncReport::default();
        session.settle(report.clone());
        return Ok(report);
    }

    store.begin().await.map_err(SyncError::Persistence)?;
    let report = match write_sync(store, &ops, &renumber).await {
        Ok(report) => report,
        Err(err) => {
            error!("catalog sync failed, rolling back: {err}");
            if let Err(rollback_err) = store.rollback().await {
                error!("catalog sync rollback failed: {rollback_err}");
            }
            return Err(SyncError::Persistence(err));
        }
    };
    if let Err(err) = store.commit().await {
        error!("catalog sync commit failed, rolling back: {err}");
        if let Err(rollback_err) = store.rollback().await {
            error!("catalog sync rollback failed: {rollback_err}");
        }
        return Err(SyncError::Persistence(err));
    }

    info!(
        "catalog sync: {} inserted, {} removed, {} renumbered",
        report.inserted.len(),
        report.removed.len(),
        report.renumbered
    );
    session.settle(report.clone());
    Ok(report)
}

async fn write_sync(
    store: &dyn OrderingStore,
    ops: &[SyncOp],
    renumber: &[OrderingRecord],
) -> Result<SyncReport, String> {
    let mut report = SyncReport::default();
    for op in ops {
        match op {
            SyncOp::Insert { app_id, ordering } => {
                // Inserts that renumbering would move are written once, at their final value.
                let ordering = renumber
                    .iter()
                    .find(|record| &record.app_id == app_id)
                    .map_or(*ordering, |record| record.ordering);
                store.upsert(app_id, ordering).await?;
                report.inserted.push(app_id.clone());
            }
            SyncOp::Remove { app_id } => {
                store.remove(app_id).await?;
                report.removed.push(app_id.clone());
            }
        }
    }
    for record in renumber {
        if report.inserted.contains(&record.app_id) {
            continue;
        }
        store.upsert(&record.app_id, record.ordering).await?;
        report.renumbered += 1;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use launcher_host::{MemoryAppCatalog, MemoryOrderingStore};
    use pretty_assertions::assert_eq;

    use super::*;

    fn installed(ids: &[&str]) -> Vec<CatalogRecord> {
        ids.iter()
            .map(|id| CatalogRecord::native(format!("pkg.{id}"), *id, *id))
            .collect()
    }

    #[test]
    fn diff_inserts_new_removes_stale_and_skips_matches() {
        let persisted = vec![
            OrderingRecord::new("b", 0),
            OrderingRecord::new("d", 4),
            OrderingRecord::new("e", 1),
        ];
        let ops = diff_catalog(&persisted, &installed(&["a", "b", "c", "e"]));
        assert_eq!(
            ops,
            vec![
                SyncOp::Insert {
                    app_id: "a".to_string(),
                    ordering: 5
                },
                SyncOp::Insert {
                    app_id: "c".to_string(),
                    ordering: 6
                },
                SyncOp::Remove {
                    app_id: "d".to_string()
                },
            ]
        );
    }

    #[test]
    fn diff_against_empty_store_starts_at_zero() {
        let ops = diff_catalog(&[], &installed(&["a", "b"]));
        assert_eq!(
            ops,
            vec![
                SyncOp::Insert {
                    app_id: "a".to_string(),
                    ordering: 0
                },
                SyncOp::Insert {
                    app_id: "b".to_string(),
                    ordering: 1
                },
            ]
        );
        assert!(diff_catalog(&[], &[]).is_empty());
    }

    #[test]
    fn trim_renumbers_densely_and_reports_only_changes() {
        let records = vec![
            OrderingRecord::new("a", 0),
            OrderingRecord::new("c", 7),
            OrderingRecord::new("b", 3),
        ];
        assert_eq!(
            trim_orderings(&records),
            vec![OrderingRecord::new("b", 1), OrderingRecord::new("c", 2)]
        );
        assert!(trim_orderings(&[OrderingRecord::new("a", 0)]).is_empty());
    }

    #[test]
    fn sync_applies_changes_then_is_idempotent() {
        let catalog = MemoryAppCatalog::with_records(installed(&["a", "b", "c"]));
        let store = MemoryOrderingStore::with_records([
            OrderingRecord::new("b", 2),
            OrderingRecord::new("gone", 0),
        ]);
        let mut session = CatalogSyncSession::default();

        let report = block_on(sync_catalog(&mut session, &catalog, &store)).expect("sync");
        assert_eq!(report.inserted, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(report.removed, vec!["gone".to_string()]);
        assert_eq!(
            store.snapshot(),
            vec![
                OrderingRecord::new("b", 0),
                OrderingRecord::new("a", 1),
                OrderingRecord::new("c", 2),
            ]
        );

        let writes = store.upsert_count() + store.remove_count();
        let second = block_on(sync_catalog(&mut session, &catalog, &store)).expect("sync");
        assert_eq!(second.writes(), 0);
        assert_eq!(store.upsert_count() + store.remove_count(), writes);
        assert_eq!(session.passes(), 2);
    }

    #[test]
    fn sync_skips_disabled_apps() {
        let mut records = installed(&["a", "b"]);
        records[1].enabled = false;
        let catalog = MemoryAppCatalog::with_records(records);
        let store = MemoryOrderingStore::default();
        let mut session = CatalogSyncSession::default();

        block_on(sync_catalog(&mut session, &catalog, &store)).expect("sync");
        assert_eq!(store.snapshot(), vec![OrderingRecord::new("a", 0)]);
    }

    #[test]
    fn failed_sync_rolls_back_and_keeps_pending_requests() {
        let catalog = MemoryAppCatalog::with_records(installed(&["a"]));
        let store = MemoryOrderingStore::with_records([OrderingRecord::new("old", 0)]);
        store.set_fail_writes(true);
        let mut session = CatalogSyncSession::default();
        session.note_event(&PackageEvent::Install {
            app_id: "a".to_string(),
        });

        let err = block_on(sync_catalog(&mut session, &catalog, &store)).expect_err("fails");
        assert!(matches!(err, SyncError::Persistence(_)));
        assert!(!store.in_transaction());
        assert_eq!(store.snapshot(), vec![OrderingRecord::new("old", 0)]);
        assert!(session.has_pending());
        assert_eq!(session.passes(), 0);
    }

    #[test]
    fn failed_commit_rolls_back_and_closes_the_batch() {
        let catalog = MemoryAppCatalog::with_records(installed(&["a"]));
        let store = MemoryOrderingStore::with_records([OrderingRecord::new("old", 0)]);
        store.set_fail_commit(true);
        let mut session = CatalogSyncSession::default();

        let err = block_on(sync_catalog(&mut session, &catalog, &store)).expect_err("fails");
        assert!(matches!(err, SyncError::Persistence(_)));
        assert!(!store.in_transaction());
        assert_eq!(store.snapshot(), vec![OrderingRecord::new("old", 0)]);
        assert_eq!(session.passes(), 0);
    }

    #[test]
    fn session_tracks_latest_request_per_app() {
        let mut session = CatalogSyncSession::default();
        session.note_event(&PackageEvent::Install {
            app_id: "a".to_string(),
        });
        session.note_event(&PackageEvent::Uninstall {
            app_id: "a".to_string(),
        });
        session.note_event(&PackageEvent::Update {
            app_id: "b".to_string(),
        });
        assert_eq!(session.pending_uninstalls().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(session.pending_installs().collect::<Vec<_>>(), vec!["b"]);
    }
}
