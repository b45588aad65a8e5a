//! Ordering persistence store contracts and adapters.

use std::{cell::RefCell, collections::BTreeMap, future::Future, pin::Pin, rc::Rc};

use serde::{Deserialize, Serialize};

/// Object-safe boxed future used by [`OrderingStore`] async methods.
pub type OrderingStoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Persisted grid position of one application.
pub struct OrderingRecord {
    /// Application identifier.
    pub app_id: String,
    /// Global zero-based grid ordering.
    pub ordering: u32,
}

impl OrderingRecord {
    /// Creates a record.
    pub fn new(app_id: impl Into<String>, ordering: u32) -> Self {
        Self {
            app_id: app_id.into(),
            ordering,
        }
    }
}

/// Durable store for the launcher grid ordering.
///
/// Writes driven by the grid are batched between [`OrderingStore::begin`] and
/// [`OrderingStore::commit`]; [`OrderingStore::rollback`] discards everything since `begin`.
pub trait OrderingStore {
    /// Lists every record sorted by ordering.
    fn list<'a>(&'a self) -> OrderingStoreFuture<'a, Result<Vec<OrderingRecord>, String>>;

    /// Inserts or replaces the ordering for `app_id`.
    fn upsert<'a>(
        &'a self,
        app_id: &'a str,
        ordering: u32,
    ) -> OrderingStoreFuture<'a, Result<(), String>>;

    /// Removes `app_id`. Removing an unknown id is not an error.
    fn remove<'a>(&'a self, app_id: &'a str) -> OrderingStoreFuture<'a, Result<(), String>>;

    /// Returns the number of stored records.
    fn count<'a>(&'a self) -> OrderingStoreFuture<'a, Result<usize, String>>;

    /// Returns the highest stored ordering, or `None` for an empty store.
    fn max_ordering<'a>(&'a self) -> OrderingStoreFuture<'a, Result<Option<u32>, String>>;

    /// Starts a write batch.
    fn begin<'a>(&'a self) -> OrderingStoreFuture<'a, Result<(), String>>;

    /// Commits the current write batch.
    fn commit<'a>(&'a self) -> OrderingStoreFuture<'a, Result<(), String>>;

    /// Discards the current write batch.
    fn rollback<'a>(&'a self) -> OrderingStoreFuture<'a, Result<(), String>>;
}

#[derive(Debug, Clone, Copy, Default)]
/// No-op ordering store for unsupported targets and baseline tests.
pub struct NoopOrderingStore;

impl OrderingStore for NoopOrderingStore {
    fn list<'a>(&'a self) -> OrderingStoreFuture<'a, Result<Vec<OrderingRecord>, String>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn upsert<'a>(
        &'a self,
        _app_id: &'a str,
        _ordering: u32,
    ) -> OrderingStoreFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn remove<'a>(&'a self, _app_id: &'a str) -> OrderingStoreFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn count<'a>(&'a self) -> OrderingStoreFuture<'a, Result<usize, String>> {
        Box::pin(async { Ok(0) })
    }

    fn max_ordering<'a>(&'a self) -> OrderingStoreFuture<'a, Result<Option<u32>, String>> {
        Box::pin(async { Ok(None) })
    }

    fn begin<'a>(&'a self) -> OrderingStoreFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn commit<'a>(&'a self) -> OrderingStoreFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn rollback<'a>(&'a self) -> OrderingStoreFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Default)]
struct MemoryOrderingInner {
    records: BTreeMap<String, u32>,
    snapshot: Option<BTreeMap<String, u32>>,
    upserts: usize,
    removes: usize,
    fail_writes: bool,
    fail_commit: bool,
}

#[derive(Debug, Clone, Default)]
/// In-memory ordering store keyed by app id. Clones share the same table.
///
/// Write counters and an injectable write failure make it usable as a test double for
/// persistence-failure paths.
pub struct MemoryOrderingStore {
    inner: Rc<RefCell<MemoryOrderingInner>>,
}

impl MemoryOrderingStore {
    /// Creates a store pre-populated with `records`. Seeding does not count as writes.
    pub fn with_records(records: impl IntoIterator<Item = OrderingRecord>) -> Self {
        let store = Self::default();
        {
            let mut inner = store.inner.borrow_mut();
            for record in records {
                inner.records.insert(record.app_id, record.ordering);
            }
        }
        store
    }

    /// Number of `upsert` calls accepted so far.
    pub fn upsert_count(&self) -> usize {
        self.inner.borrow().upserts
    }

    /// Number of `remove` calls accepted so far.
    pub fn remove_count(&self) -> usize {
        self.inner.borrow().removes
    }

    /// Makes every subsequent write fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }

    /// Makes every subsequent commit fail, leaving the batch open, until reset.
    pub fn set_fail_commit(&self, fail: bool) {
        self.inner.borrow_mut().fail_commit = fail;
    }

    /// Returns `true` while a write batch is open.
    pub fn in_transaction(&self) -> bool {
        self.inner.borrow().snapshot.is_some()
    }

    /// Synchronous view of the current table sorted by ordering, then app id.
    pub fn snapshot(&self) -> Vec<OrderingRecord> {
        sorted_records(&self.inner.borrow().records)
    }
}

fn sorted_records(records: &BTreeMap<String, u32>) -> Vec<OrderingRecord> {
    let mut out = records
        .iter()
        .map(|(app_id, ordering)| OrderingRecord::new(app_id.clone(), *ordering))
        .collect::<Vec<_>>();
    out.sort_by(|a, b| a.ordering.cmp(&b.ordering).then_with(|| a.app_id.cmp(&b.app_id)));
    out
}

impl OrderingStore for MemoryOrderingStore {
    fn list<'a>(&'a self) -> OrderingStoreFuture<'a, Result<Vec<OrderingRecord>, String>> {
        Box::pin(async move { Ok(self.snapshot()) })
    }

    fn upsert<'a>(
        &'a self,
        app_id: &'a str,
        ordering: u32,
    ) -> OrderingStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let mut inner = self.inner.borrow_mut();
            if inner.fail_writes {
                return Err(format!("upsert rejected for `{app_id}`"));
            }
            inner.records.insert(app_id.to_string(), ordering);
            inner.upserts += 1;
            Ok(())
        })
    }

    fn remove<'a>(&'a self, app_id: &'a str) -> OrderingStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let mut inner = self.inner.borrow_mut();
            if inner.fail_writes {
                return Err(format!("remove rejected for `{app_id}`"));
            }
            inner.records.remove(app_id);
            inner.removes += 1;
            Ok(())
        })
    }

    fn count<'a>(&'a self) -> OrderingStoreFuture<'a, Result<usize, String>> {
        Box::pin(async move { Ok(self.inner.borrow().records.len()) })
    }

    fn max_ordering<'a>(&'a self) -> OrderingStoreFuture<'a, Result<Option<u32>, String>> {
        Box::pin(async move { Ok(self.inner.borrow().records.values().copied().max()) })
    }

    fn begin<'a>(&'a self) -> OrderingStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let mut inner = self.inner.borrow_mut();
            if inner.snapshot.is_some() {
                return Err("transaction already open".to_string());
            }
            inner.snapshot = Some(inner.records.clone());
            Ok(())
        })
    }

    fn commit<'a>(&'a self) -> OrderingStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let mut inner = self.inner.borrow_mut();
            if inner.snapshot.is_none() {
                return Err("no open transaction".to_string());
            }
            if inner.fail_commit {
                return Err("commit rejected".to_string());
            }
            inner.snapshot = None;
            Ok(())
        })
    }

    fn rollback<'a>(&'a self) -> OrderingStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let mut inner = self.inner.borrow_mut();
            let Some(snapshot) = inner.snapshot.take() else {
                return Err("no open transaction".to_string());
            };
            inner.records = snapshot;
            Ok(())
        })
    }
}
