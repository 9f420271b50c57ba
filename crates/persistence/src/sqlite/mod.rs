//! SQLite persistence module
//!
//! Repositories take `&mut SqliteConnection`, so callers decide whether a
//! call runs on a pooled connection or inside an open transaction.

pub mod repos;
pub mod schema;

pub use repos::{
    create_pool, create_pool_in_memory, run_migrations, AccountRepo, PartyMemberRepo, PartyRepo,
    RequestRepo, TransferRepo, UserRepo,
};
pub use schema::{
    AccountRow, PartyMemberRow, PartyRow, TransferRequestRow, TransferRow, UserRow,
};
