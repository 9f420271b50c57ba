//! # Paybank Core
//!
//! Domain types for the ledger transfer & settlement engine.
//!
//! ## Modules
//!
//! - [`money`] - Currency codes
//! - [`account`] / [`ledger`] - Accounts and the balance-mutation primitives
//! - [`exchange`] - Static currency exchange table
//! - [`transfer`] - Immutable transfer records
//! - [`request`] - Pending money requests (Send / Request)
//! - [`party`] - Bill-split parties and their members
//! - [`feed`] - Activity feed entries and the timestamp merge
//! - [`event`] - Audit events appended after commit
//! - [`user`] - Read-only user handle supplied by the session subsystem

pub mod account;
pub mod error;
pub mod event;
pub mod exchange;
pub mod feed;
pub mod ledger;
pub mod money;
pub mod party;
pub mod request;
pub mod transfer;
pub mod user;

pub use account::Account;
pub use error::{CoreError, CoreResult};
pub use event::{Event, EventKind};
pub use exchange::{ExchangeRate, ExchangeTable};
pub use feed::{
    compose_feed, merge_descending, ActivityEntry, ActivityFeed, CardSpend, FeedMode,
    PartyPreview, Timestamped,
};
pub use money::Currency;
pub use party::{MemberStatus, Party, PartyMember, PartyShare};
pub use request::{RequestKind, RequestStatus, TransferRequest};
pub use transfer::{Counterparty, Transfer};
pub use user::User;

use uuid::Uuid;

/// Generate a prefixed opaque identifier, e.g. `TRF_3f2c...`.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_prefix() {
        let id = new_id("ACC");
        assert!(id.starts_with("ACC_"));
        assert_eq!(id.len(), 4 + 32);
        assert_ne!(new_id("ACC"), id);
    }
}
