//! Package lifecycle signal bus: install/uninstall/update notifications from the package manager.
//!
//! Producers may live on any task; the launcher drains the receiver on its owning thread so grid
//! mutation never races a drag in progress.

use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    StreamExt,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
/// One package manager notification.
pub enum PackageEvent {
    /// A new application was installed.
    Install {
        /// Installed application id.
        app_id: String,
    },
    /// An application was removed.
    Uninstall {
        /// Removed application id.
        app_id: String,
    },
    /// An installed application changed (label, icon, flags).
    Update {
        /// Updated application id.
        app_id: String,
    },
}

impl PackageEvent {
    /// Returns the application id the event refers to.
    pub fn app_id(&self) -> &str {
        match self {
            Self::Install { app_id } | Self::Uninstall { app_id } | Self::Update { app_id } => {
                app_id
            }
        }
    }

    /// Returns a stable token for logging.
    pub const fn token(&self) -> &'static str {
        match self {
            Self::Install { .. } => "install",
            Self::Uninstall { .. } => "uninstall",
            Self::Update { .. } => "update",
        }
    }

    /// Decodes an event from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error when `raw` is not a valid event payload.
    pub fn from_json(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }

    /// Encodes the event in its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization fails.
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone)]
/// Producer half of the package bus.
pub struct PackageBusSender {
    tx: UnboundedSender<PackageEvent>,
}

impl PackageBusSender {
    /// Publishes an event.
    ///
    /// # Errors
    ///
    /// Returns an error when the receiving side was dropped.
    pub fn publish(&self, event: PackageEvent) -> Result<(), String> {
        self.tx
            .unbounded_send(event)
            .map_err(|e| format!("package bus closed: {e}"))
    }
}

#[derive(Debug)]
/// Consumer half of the package bus.
pub struct PackageBusReceiver {
    rx: UnboundedReceiver<PackageEvent>,
    closed: bool,
}

impl PackageBusReceiver {
    /// Returns every queued event without waiting.
    pub fn drain(&mut self) -> Vec<PackageEvent> {
        let mut events = Vec::new();
        while !self.closed {
            match self.rx.try_next() {
                Ok(Some(event)) => events.push(event),
                Ok(None) => self.closed = true,
                Err(_) => break,
            }
        }
        events
    }

    /// Waits for the next event. `None` once every sender is gone.
    pub async fn next_event(&mut self) -> Option<PackageEvent> {
        let next = self.rx.next().await;
        if next.is_none() {
            self.closed = true;
        }
        next
    }

    /// Returns `true` once every sender was dropped and the queue is empty.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Creates a connected sender/receiver pair.
pub fn package_bus() -> (PackageBusSender, PackageBusReceiver) {
    let (tx, rx) = mpsc::unbounded();
    (
        PackageBusSender { tx },
        PackageBusReceiver { rx, closed: false },
    )
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn drain_returns_events_in_publish_order() {
        let (tx, mut rx) = package_bus();
        tx.publish(PackageEvent::Install {
            app_id: "app.a".to_string(),
        })
        .expect("publish");
        tx.publish(PackageEvent::Uninstall {
            app_id: "app.b".to_string(),
        })
        .expect("publish");

        let events = rx.drain();
        assert_eq!(
            events.iter().map(PackageEvent::token).collect::<Vec<_>>(),
            vec!["install", "uninstall"]
        );
        assert!(rx.drain().is_empty());
        assert!(!rx.is_closed());
    }

    #[test]
    fn receiver_reports_closed_after_senders_drop() {
        let (tx, mut rx) = package_bus();
        tx.publish(PackageEvent::Update {
            app_id: "app.a".to_string(),
        })
        .expect("publish");
        drop(tx);

        assert_eq!(
            block_on(rx.next_event()),
            Some(PackageEvent::Update {
                app_id: "app.a".to_string()
            })
        );
        assert_eq!(block_on(rx.next_event()), None);
        assert!(rx.is_closed());
    }

    #[test]
    fn publish_fails_once_receiver_is_gone() {
        let (tx, rx) = package_bus();
        drop(rx);
        assert!(tx
            .publish(PackageEvent::Install {
                app_id: "app.a".to_string()
            })
            .is_err());
    }

    #[test]
    fn json_wire_form_is_tagged() {
        let event = PackageEvent::Install {
            app_id: "app.a".to_string(),
        };
        let raw = event.to_json().expect("encode");
        assert_eq!(raw, r#"{"kind":"install","app_id":"app.a"}"#);
        assert_eq!(PackageEvent::from_json(&raw).expect("decode"), event);
        assert!(PackageEvent::from_json(r#"{"kind":"reboot"}"#).is_err());
    }
}
