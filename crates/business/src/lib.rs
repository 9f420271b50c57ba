//! # Paybank Business
//!
//! Transfer executor, transfer-request protocol, party settlement and
//! activity feed. Every operation runs in one database transaction;
//! audit events and push notifications follow the commit.

pub mod account;
pub mod context;
pub mod error;
pub mod feed;
pub mod notify;
pub mod party;
pub mod request;
pub mod transfer;

pub use account::AccountService;
pub use context::ServiceContext;
pub use error::{BusinessError, BusinessResult};
pub use feed::{CardActivity, FeedService, NoCardActivity, StaticCardActivity};
pub use notify::{ChannelRegistry, Notifier, NotifyError, NullNotifier, PushEvent};
pub use party::{PartyDetails, PartyService};
pub use request::{AcceptOutcome, RequestService, SendOutcome};
pub use transfer::{TransferService, EXTERNAL_ACTOR};
