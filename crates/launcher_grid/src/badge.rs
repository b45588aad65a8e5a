//! Badge overlay: mirrors per-app notification counts from the badge service onto items.
//!
//! Registration is checked lazily. Placing an item only records a pending check; the runtime
//! resolves it through the service later and feeds the resulting [`BadgeSnapshot`] back, so
//! placement never waits on the service.

use std::collections::{BTreeSet, HashMap};

use launcher_host::BadgeService;
use serde::{Deserialize, Serialize};

use crate::item::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Rendering tier derived from the clamped count.
pub enum BadgeTier {
    /// 1 through 9.
    Single,
    /// 10 through 99.
    Double,
    /// 100 and above.
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Presentational badge for one item.
pub struct BadgeRender {
    /// Live count, unclamped.
    pub count: u32,
    /// Tier of the clamped count.
    pub tier: BadgeTier,
    /// Text to draw: the count, or `"{cap}+"` beyond the display cap.
    pub text: String,
}

/// Renders `count` against `cap`. Zero yields no badge.
pub fn render_badge(count: u32, cap: u32) -> Option<BadgeRender> {
    if count == 0 {
        return None;
    }
    let shown = count.min(cap.max(1));
    let tier = match shown {
        0..=9 => BadgeTier::Single,
        10..=99 => BadgeTier::Double,
        _ => BadgeTier::Overflow,
    };
    let text = if count > shown {
        format!("{shown}+")
    } else {
        count.to_string()
    };
    Some(BadgeRender { count, tier, text })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Badge service state for one app at resolution time.
pub struct BadgeSnapshot {
    /// App registered for badges.
    pub registered: bool,
    /// Live count.
    pub count: u32,
    /// Display not suppressed.
    pub display_enabled: bool,
}

/// Reads the badge service state for `app_id`. An unregistered app skips the count lookups.
///
/// # Errors
///
/// Returns the service error text of the first failing call.
pub async fn fetch_badge_snapshot(
    service: &dyn BadgeService,
    app_id: &str,
) -> Result<BadgeSnapshot, String> {
    if !service.is_registered(app_id).await? {
        return Ok(BadgeSnapshot::default());
    }
    Ok(BadgeSnapshot {
        registered: true,
        count: service.get_count(app_id).await?,
        display_enabled: service.get_display_enabled(app_id).await?,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Visual state the overlay wants applied to an item.
pub enum BadgeVisual {
    /// No badge drawn.
    Hidden,
    /// Badge drawn as rendered.
    Shown(BadgeRender),
}

#[derive(Debug, Clone)]
/// Mirror of badge service state keyed by app id.
pub struct BadgeOverlay {
    cap: u32,
    resolved: HashMap<String, BadgeSnapshot>,
    pending: BTreeSet<String>,
}

impl BadgeOverlay {
    /// Creates an overlay clamping counts at `cap`.
    pub fn new(cap: u32) -> Self {
        Self {
            cap,
            resolved: HashMap::new(),
            pending: BTreeSet::new(),
        }
    }

    /// Display cap.
    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// Queues a deferred registration check. Returns `false` when one is already queued or the
    /// app was resolved before.
    pub fn request_registration(&mut self, app_id: &str) -> bool {
        if self.resolved.contains_key(app_id) {
            return false;
        }
        self.pending.insert(app_id.to_string())
    }

    /// Whether a registration check for `app_id` is outstanding.
    pub fn is_pending(&self, app_id: &str) -> bool {
        self.pending.contains(app_id)
    }

    /// Stores a fresh service snapshot and returns the visual to apply.
    pub fn resolve(&mut self, app_id: &str, snapshot: BadgeSnapshot) -> BadgeVisual {
        self.pending.remove(app_id);
        self.resolved.insert(app_id.to_string(), snapshot);
        self.visual_for(app_id)
    }

    /// Effective count: 0 when unregistered, unresolved, or suppressed.
    pub fn count(&self, item: &Item) -> u32 {
        self.count_for(&item.app_id)
    }

    /// Renders `count` for `item`.
    pub fn show(&self, _item: &Item, count: u32) -> BadgeVisual {
        render_badge(count, self.cap).map_or(BadgeVisual::Hidden, BadgeVisual::Shown)
    }

    /// Hidden visual for `item`.
    pub fn hide(&self, _item: &Item) -> BadgeVisual {
        BadgeVisual::Hidden
    }

    /// Current visual for an app id.
    pub fn visual_for(&self, app_id: &str) -> BadgeVisual {
        render_badge(self.count_for(app_id), self.cap)
            .map_or(BadgeVisual::Hidden, BadgeVisual::Shown)
    }

    /// Drops all state for an app that left the grid.
    pub fn forget(&mut self, app_id: &str) {
        self.pending.remove(app_id);
        self.resolved.remove(app_id);
    }

    fn count_for(&self, app_id: &str) -> u32 {
        self.resolved
            .get(app_id)
            .filter(|snapshot| snapshot.registered && snapshot.display_enabled)
            .map_or(0, |snapshot| snapshot.count)
    }
}
