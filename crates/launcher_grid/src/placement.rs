//! Incremental bulk placement.
//!
//! Placing hundreds of items in one go would stall the owning thread, so the host pulls one
//! [`LauncherAction::PlaceItem`] per tick from a [`PlacementQueue`] and dispatches it. The queue
//! ends with a single [`LauncherAction::CommitOrderings`]. Dropping the queue cancels the
//! placement; every item placed so far is fully placed.

use std::collections::{HashMap, VecDeque};

use launcher_host::{CatalogRecord, OrderingRecord};

use crate::reducer::LauncherAction;

#[derive(Debug, Clone, Default)]
/// Resumable iterator over records still waiting to be placed.
pub struct PlacementQueue {
    pending: VecDeque<CatalogRecord>,
    yielded: usize,
    committed: bool,
}

impl PlacementQueue {
    /// Queues `records` in the given order.
    pub fn new(records: impl IntoIterator<Item = CatalogRecord>) -> Self {
        Self {
            pending: records.into_iter().collect(),
            yielded: 0,
            committed: false,
        }
    }

    /// Queues `records` in persisted order. Apps the store does not know yet follow, by app id.
    pub fn in_store_order(records: Vec<CatalogRecord>, orderings: &[OrderingRecord]) -> Self {
        let rank = orderings
            .iter()
            .map(|record| (record.app_id.as_str(), record.ordering))
            .collect::<HashMap<_, _>>();
        let mut records = records;
        records.sort_by(|a, b| {
            let key_a = rank.get(a.app_id.as_str()).copied().unwrap_or(u32::MAX);
            let key_b = rank.get(b.app_id.as_str()).copied().unwrap_or(u32::MAX);
            key_a.cmp(&key_b).then_with(|| a.app_id.cmp(&b.app_id))
        });
        Self::new(records)
    }

    /// Records not yet handed out.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Place actions handed out so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Whether the final commit was handed out.
    pub fn is_finished(&self) -> bool {
        self.committed
    }
}

impl Iterator for PlacementQueue {
    type Item = LauncherAction;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.pending.pop_front() {
            self.yielded += 1;
            return Some(LauncherAction::PlaceItem { record });
        }
        if self.committed {
            return None;
        }
        self.committed = true;
        Some(LauncherAction::CommitOrderings)
    }
}
