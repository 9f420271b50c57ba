//! Push notifications
//!
//! Services talk to a [`Notifier`]; [`ChannelRegistry`] is the in-process
//! implementation, holding one live channel per user.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Events pushed to connected users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    TransferReceived {
        transfer_id: String,
        sender_name: String,
        amount: Decimal,
        currency: String,
    },
    RequestReceived {
        request_id: String,
        from_user_id: String,
        /// Signed: positive = you receive, negative = you pay
        amount: Decimal,
        currency: String,
    },
    RequestAccepted {
        request_id: String,
    },
    RequestDeclined {
        request_id: String,
    },
    RequestCancelled {
        request_id: String,
    },
    PartyInvite {
        party_id: String,
        host_user_id: String,
        amount: Decimal,
    },
    PartyCompleted {
        party_id: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification channel already open for {0}")]
    ChannelAlreadyOpen(String),
}

/// Delivery seam used by the services. Returns false when nothing was delivered.
pub trait Notifier: Send + Sync {
    fn notify(&self, user_id: &str, event: PushEvent) -> bool;
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _user_id: &str, _event: PushEvent) -> bool {
        false
    }
}

/// In-process registry of per-user channels
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<String, UnboundedSender<PushEvent>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the user's channel. A second open for the same user is an error.
    pub fn register(&self, user_id: &str) -> Result<UnboundedReceiver<PushEvent>, NotifyError> {
        let mut channels = self.channels.write();
        if let Some(existing) = channels.get(user_id) {
            if !existing.is_closed() {
                return Err(NotifyError::ChannelAlreadyOpen(user_id.to_string()));
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        channels.insert(user_id.to_string(), tx);
        Ok(rx)
    }

    pub fn unregister(&self, user_id: &str) -> bool {
        self.channels.write().remove(user_id).is_some()
    }

    /// Deliver to the user's channel. A channel whose receiver is gone is dropped.
    pub fn send(&self, user_id: &str, event: PushEvent) -> bool {
        let delivered = match self.channels.read().get(user_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => return false,
        };

        if !delivered {
            self.channels.write().remove(user_id);
        }
        delivered
    }

    pub fn is_connected(&self, user_id: &str) -> bool {
        self.channels
            .read()
            .get(user_id)
            .map_or(false, |tx| !tx.is_closed())
    }

    pub fn count(&self) -> usize {
        self.channels.read().len()
    }
}

impl Notifier for ChannelRegistry {
    fn notify(&self, user_id: &str, event: PushEvent) -> bool {
        self.send(user_id, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn accepted() -> PushEvent {
        PushEvent::RequestAccepted {
            request_id: "REQ_1".to_string(),
        }
    }

    #[test]
    fn test_register_and_send() {
        let registry = ChannelRegistry::new();
        let mut rx = registry.register("alice").unwrap();

        assert!(registry.send("alice", accepted()));
        assert_eq!(rx.try_recv().unwrap(), accepted());
        assert!(!registry.send("bob", accepted()));
    }

    #[test]
    fn test_second_channel_rejected() {
        let registry = ChannelRegistry::new();
        let _rx = registry.register("alice").unwrap();

        assert_eq!(
            registry.register("alice").unwrap_err(),
            NotifyError::ChannelAlreadyOpen("alice".to_string())
        );
    }

    #[test]
    fn test_dead_channel_is_replaced() {
        let registry = ChannelRegistry::new();
        let rx = registry.register("alice").unwrap();
        drop(rx);

        assert!(!registry.is_connected("alice"));
        assert!(!registry.send("alice", accepted()));
        assert_eq!(registry.count(), 0);
        assert!(registry.register("alice").is_ok());
    }

    #[test]
    fn test_unregister() {
        let registry = ChannelRegistry::new();
        let _rx = registry.register("alice").unwrap();
        assert!(registry.unregister("alice"));
        assert!(!registry.unregister("alice"));
    }

    #[test]
    fn test_push_event_json() {
        let event = PushEvent::PartyInvite {
            party_id: "PTY_1".to_string(),
            host_user_id: "host".to_string(),
            amount: dec!(10),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"party_invite""#));
    }
}
