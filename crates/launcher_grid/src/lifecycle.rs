//! Typed lifecycle dispatch table: subscribers registered per [`LifecycleStage`] and invoked
//! synchronously, in registration order, for every matching [`LifecycleNotice`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{badge::BadgeRender, model::ItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Launcher lifecycle stages subscribers can observe.
pub enum LifecycleStage {
    /// An item was placed on the grid.
    ItemPlaced,
    /// An item left the grid.
    ItemRemoved,
    /// Edit mode was entered or left.
    EditModeChanged,
    /// A drag ended, settled or cancelled.
    DragEnded,
    /// An ordering batch reached the store.
    OrderingsPersisted,
    /// A badge was shown or hidden.
    BadgeChanged,
    /// A tap asked to open an app.
    LaunchRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Payload delivered to subscribers.
pub enum LifecycleNotice {
    /// An item was placed.
    ItemPlaced {
        /// Placed item.
        item: ItemId,
        /// Its application id.
        app_id: String,
    },
    /// An item was removed.
    ItemRemoved {
        /// Application id.
        app_id: String,
    },
    /// Edit mode toggled.
    EditModeChanged {
        /// New flag.
        active: bool,
    },
    /// A drag ended; `position` is `None` when it was cancelled.
    DragEnded {
        /// Dragged item.
        item: ItemId,
        /// Settled position.
        position: Option<usize>,
    },
    /// Orderings were written.
    OrderingsPersisted {
        /// Records written.
        count: usize,
    },
    /// Badge visual changed.
    BadgeChanged {
        /// Badged item.
        item: ItemId,
        /// Rendered badge, `None` when hidden.
        render: Option<BadgeRender>,
    },
    /// Launch request.
    LaunchRequested {
        /// Application id.
        app_id: String,
        /// Open through a direct launch request.
        direct_launch: bool,
    },
}

impl LifecycleNotice {
    /// Stage this notice is dispatched under.
    pub fn stage(&self) -> LifecycleStage {
        match self {
            Self::ItemPlaced { .. } => LifecycleStage::ItemPlaced,
            Self::ItemRemoved { .. } => LifecycleStage::ItemRemoved,
            Self::EditModeChanged { .. } => LifecycleStage::EditModeChanged,
            Self::DragEnded { .. } => LifecycleStage::DragEnded,
            Self::OrderingsPersisted { .. } => LifecycleStage::OrderingsPersisted,
            Self::BadgeChanged { .. } => LifecycleStage::BadgeChanged,
            Self::LaunchRequested { .. } => LifecycleStage::LaunchRequested,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Handle returned by [`LifecycleDispatcher::subscribe`].
pub struct SubscriberHandle {
    stage: LifecycleStage,
    id: u64,
}

impl SubscriberHandle {
    /// Stage the subscriber is registered under.
    pub fn stage(&self) -> LifecycleStage {
        self.stage
    }
}

type Subscriber = Box<dyn FnMut(&LifecycleNotice)>;

#[derive(Default)]
/// Mapping from stage to its ordered subscriber list.
pub struct LifecycleDispatcher {
    subscribers: BTreeMap<LifecycleStage, Vec<(u64, Subscriber)>>,
    next_id: u64,
}

impl std::fmt::Debug for LifecycleDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleDispatcher")
            .field(
                "subscribers",
                &self
                    .subscribers
                    .iter()
                    .map(|(stage, list)| (*stage, list.len()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl LifecycleDispatcher {
    /// Registers `subscriber` for `stage`; it runs after every earlier subscriber of that stage.
    pub fn subscribe(
        &mut self,
        stage: LifecycleStage,
        subscriber: impl FnMut(&LifecycleNotice) + 'static,
    ) -> SubscriberHandle {
        self.next_id += 1;
        let id = self.next_id;
        self.subscribers
            .entry(stage)
            .or_default()
            .push((id, Box::new(subscriber)));
        SubscriberHandle { stage, id }
    }

    /// Removes a subscriber. Returns `false` for a stale handle.
    pub fn unsubscribe(&mut self, handle: SubscriberHandle) -> bool {
        let Some(list) = self.subscribers.get_mut(&handle.stage) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| *id != handle.id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.subscribers.remove(&handle.stage);
        }
        removed
    }

    /// Number of subscribers for `stage`.
    pub fn subscriber_count(&self, stage: LifecycleStage) -> usize {
        self.subscribers.get(&stage).map_or(0, Vec::len)
    }

    /// Invokes every subscriber of the notice's stage, in registration order.
    pub fn dispatch(&mut self, notice: &LifecycleNotice) {
        if let Some(list) = self.subscribers.get_mut(&notice.stage()) {
            for (_, subscriber) in list.iter_mut() {
                subscriber(notice);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn subscribers_run_in_registration_order_for_their_stage_only() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = LifecycleDispatcher::default();
        for label in ["first", "second"] {
            let calls = Rc::clone(&calls);
            dispatcher.subscribe(LifecycleStage::EditModeChanged, move |_| {
                calls.borrow_mut().push(label);
            });
        }
        let other = Rc::clone(&calls);
        dispatcher.subscribe(LifecycleStage::ItemRemoved, move |_| {
            other.borrow_mut().push("removed");
        });

        dispatcher.dispatch(&LifecycleNotice::EditModeChanged { active: true });
        assert_eq!(*calls.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_handle() {
        let hits = Rc::new(RefCell::new(0));
        let mut dispatcher = LifecycleDispatcher::default();
        let counter = Rc::clone(&hits);
        let handle = dispatcher.subscribe(LifecycleStage::OrderingsPersisted, move |_| {
            *counter.borrow_mut() += 1;
        });
        let kept = Rc::clone(&hits);
        dispatcher.subscribe(LifecycleStage::OrderingsPersisted, move |_| {
            *kept.borrow_mut() += 10;
        });

        assert!(dispatcher.unsubscribe(handle));
        assert!(!dispatcher.unsubscribe(handle));
        dispatcher.dispatch(&LifecycleNotice::OrderingsPersisted { count: 3 });
        assert_eq!(*hits.borrow(), 10);
        assert_eq!(
            dispatcher.subscriber_count(LifecycleStage::OrderingsPersisted),
            1
        );
    }

    #[test]
    fn stages_serialize_as_kebab_case_tokens() {
        assert_eq!(
            serde_json::to_string(&LifecycleStage::OrderingsPersisted).expect("encode"),
            "\"orderings-persisted\""
        );
        let stage: LifecycleStage = serde_json::from_str("\"drag-ended\"").expect("decode");
        assert_eq!(stage, LifecycleStage::DragEnded);
    }

    #[test]
    fn notices_map_to_their_stage() {
        assert_eq!(
            LifecycleNotice::DragEnded {
                item: ItemId(1),
                position: None
            }
            .stage(),
            LifecycleStage::DragEnded
        );
        assert_eq!(
            LifecycleNotice::ItemRemoved {
                app_id: "a".to_string()
            }
            .stage(),
            LifecycleStage::ItemRemoved
        );
    }
}
