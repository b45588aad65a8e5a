//! Notification-domain contracts: badge counts mirrored onto launcher icons.

mod badge;

pub use badge::{BadgeFuture, BadgeService, MemoryBadgeService, NoopBadgeService};
