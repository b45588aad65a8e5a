//! Badge (notification count) service contracts and adapters.

use std::{
    cell::RefCell,
    collections::{BTreeSet, HashMap},
    future::Future,
    pin::Pin,
    rc::Rc,
};

/// Object-safe boxed future used by [`BadgeService`] async methods.
pub type BadgeFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Host notification service that owns per-app badge counts.
///
/// Change notifications are queued per subscribed app id and drained by the owning thread with
/// [`BadgeService::take_changes`].
pub trait BadgeService {
    /// Returns whether `app_id` registered for badges.
    fn is_registered<'a>(&'a self, app_id: &'a str) -> BadgeFuture<'a, Result<bool, String>>;

    /// Returns the current badge count for `app_id`.
    fn get_count<'a>(&'a self, app_id: &'a str) -> BadgeFuture<'a, Result<u32, String>>;

    /// Returns whether badge display is enabled for `app_id`.
    fn get_display_enabled<'a>(
        &'a self,
        app_id: &'a str,
    ) -> BadgeFuture<'a, Result<bool, String>>;

    /// Subscribes to change notifications for `app_id`.
    fn subscribe(&self, app_id: &str);

    /// Cancels the subscription for `app_id`.
    fn unsubscribe(&self, app_id: &str);

    /// Drains queued change notifications, oldest first, one entry per changed app id.
    fn take_changes(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, Default)]
/// No-op badge service: nothing is ever registered.
pub struct NoopBadgeService;

impl BadgeService for NoopBadgeService {
    fn is_registered<'a>(&'a self, _app_id: &'a str) -> BadgeFuture<'a, Result<bool, String>> {
        Box::pin(async { Ok(false) })
    }

    fn get_count<'a>(&'a self, _app_id: &'a str) -> BadgeFuture<'a, Result<u32, String>> {
        Box::pin(async { Ok(0) })
    }

    fn get_display_enabled<'a>(
        &'a self,
        _app_id: &'a str,
    ) -> BadgeFuture<'a, Result<bool, String>> {
        Box::pin(async { Ok(false) })
    }

    fn subscribe(&self, _app_id: &str) {}

    fn unsubscribe(&self, _app_id: &str) {}

    fn take_changes(&self) -> Vec<String> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BadgeEntry {
    count: u32,
    display_enabled: bool,
}

#[derive(Debug, Default)]
struct MemoryBadgeInner {
    entries: HashMap<String, BadgeEntry>,
    subscribed: BTreeSet<String>,
    changes: Vec<String>,
}

impl MemoryBadgeInner {
    fn notify(&mut self, app_id: &str) {
        if self.subscribed.contains(app_id) && !self.changes.iter().any(|id| id == app_id) {
            self.changes.push(app_id.to_string());
        }
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory badge service. Clones share the same state.
pub struct MemoryBadgeService {
    inner: Rc<RefCell<MemoryBadgeInner>>,
}

impl MemoryBadgeService {
    /// Registers `app_id` for badges with display enabled and a zero count.
    pub fn register(&self, app_id: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.entries.insert(
            app_id.to_string(),
            BadgeEntry {
                count: 0,
                display_enabled: true,
            },
        );
        inner.notify(app_id);
    }

    /// Removes the badge registration for `app_id`.
    pub fn unregister(&self, app_id: &str) {
        let mut inner = self.inner.borrow_mut();
        if inner.entries.remove(app_id).is_some() {
            inner.notify(app_id);
        }
    }

    /// Sets the count for a registered app. Unregistered apps are ignored.
    pub fn set_count(&self, app_id: &str, count: u32) {
        let mut inner = self.inner.borrow_mut();
        let Some(entry) = inner.entries.get_mut(app_id) else {
            return;
        };
        if entry.count != count {
            entry.count = count;
            inner.notify(app_id);
        }
    }

    /// Enables or suppresses badge display for a registered app.
    pub fn set_display_enabled(&self, app_id: &str, enabled: bool) {
        let mut inner = self.inner.borrow_mut();
        let Some(entry) = inner.entries.get_mut(app_id) else {
            return;
        };
        if entry.display_enabled != enabled {
            entry.display_enabled = enabled;
            inner.notify(app_id);
        }
    }

    /// Returns whether `app_id` currently has a subscription.
    pub fn is_subscribed(&self, app_id: &str) -> bool {
        self.inner.borrow().subscribed.contains(app_id)
    }
}

impl BadgeService for MemoryBadgeService {
    fn is_registered<'a>(&'a self, app_id: &'a str) -> BadgeFuture<'a, Result<bool, String>> {
        Box::pin(async move { Ok(self.inner.borrow().entries.contains_key(app_id)) })
    }

    fn get_count<'a>(&'a self, app_id: &'a str) -> BadgeFuture<'a, Result<u32, String>> {
        Box::pin(async move {
            self.inner
                .borrow()
                .entries
                .get(app_id)
                .map(|entry| entry.count)
                .ok_or_else(|| format!("badge not registered for `{app_id}`"))
        })
    }

    fn get_display_enabled<'a>(
        &'a self,
        app_id: &'a str,
    ) -> BadgeFuture<'a, Result<bool, String>> {
        Box::pin(async move {
            Ok(self
                .inner
                .borrow()
                .entries
                .get(app_id)
                .map(|entry| entry.display_enabled)
                .unwrap_or(false))
        })
    }

    fn subscribe(&self, app_id: &str) {
        self.inner.borrow_mut().subscribed.insert(app_id.to_string());
    }

    fn unsubscribe(&self, app_id: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.subscribed.remove(app_id);
        inner.changes.retain(|id| id != app_id);
    }

    fn take_changes(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.borrow_mut().changes)
    }
}
