//! # Paybank Persistence
//!
//! SQLite state plus a JSONL audit log.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Database                    │
//! │  ┌────────────┐  ┌──────────┐  ┌──────────┐  │
//! │  │   SQLite   │  │  JSONL   │  │  Repos   │  │
//! │  │  (state)   │  │ (audit)  │  │ (queries)│  │
//! │  └────────────┘  └──────────┘  └──────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ```rust,ignore
//! use paybank_persistence::{AccountRepo, Database};
//!
//! let db = Database::open("sqlite:data/paybank.db", Some("data/events")).await?;
//! let mut tx = db.pool().begin().await?;
//! let account = AccountRepo::get_by_id(&mut tx, "ACC_...").await?;
//! tx.commit().await?;
//! ```

pub mod error;
pub mod events;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
pub use events::{EventFilter, EventReader, EventStore};
pub use sqlite::schema::{
    AccountRow, PartyMemberRow, PartyRow, TransferRequestRow, TransferRow, UserRow,
};
pub use sqlite::{
    create_pool, create_pool_in_memory, run_migrations, AccountRepo, PartyMemberRepo, PartyRepo,
    RequestRepo, TransferRepo, UserRepo,
};

use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

/// Database facade: migrated pool plus optional audit log
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    event_store: Option<Arc<EventStore>>,
}

impl Database {
    /// Open a file database, run migrations, and attach the audit log if a
    /// directory is given.
    ///
    /// # Arguments
    /// * `db_url` - SQLite URL (e.g. "sqlite:data/paybank.db")
    /// * `events_path` - JSONL audit directory
    pub async fn open<Q: AsRef<Path>>(
        db_url: &str,
        events_path: Option<Q>,
    ) -> PersistenceResult<Self> {
        let pool = create_pool(db_url).await?;
        run_migrations(&pool).await?;

        let event_store = match events_path {
            Some(path) => Some(Arc::new(EventStore::new(path)?)),
            None => None,
        };

        Ok(Self { pool, event_store })
    }

    /// Migrated in-memory database without an audit log.
    pub async fn in_memory() -> PersistenceResult<Self> {
        let pool = create_pool_in_memory().await?;
        run_migrations(&pool).await?;
        Ok(Self {
            pool,
            event_store: None,
        })
    }

    pub fn with_event_store(mut self, store: EventStore) -> Self {
        self.event_store = Some(Arc::new(store));
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn events(&self) -> Option<&Arc<EventStore>> {
        self.event_store.as_ref()
    }
}
