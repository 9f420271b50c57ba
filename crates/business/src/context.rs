//! Service context: shared handles for every business service

use crate::error::BusinessResult;
use crate::notify::{Notifier, NullNotifier, PushEvent};
use paybank_core::{Event, ExchangeTable};
use paybank_persistence::{Database, EventStore};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use tracing::{debug, warn};

/// Context for business operations
#[derive(Clone)]
pub struct ServiceContext {
    pool: SqlitePool,
    exchange: Arc<ExchangeTable>,
    notifier: Arc<dyn Notifier>,
    events: Option<Arc<EventStore>>,
}

impl ServiceContext {
    /// Context over a database, with an empty exchange table and no push transport.
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
            exchange: Arc::new(ExchangeTable::new()),
            notifier: Arc::new(NullNotifier),
            events: db.events().cloned(),
        }
    }

    pub fn with_exchange(mut self, exchange: ExchangeTable) -> Self {
        self.exchange = Arc::new(exchange);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn exchange(&self) -> &ExchangeTable {
        &self.exchange
    }

    /// Open the transaction that scopes one operation.
    pub async fn begin(&self) -> BusinessResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    // === Post-commit side effects ===
    // Only call these after `commit()`. Failures never surface to the caller.

    /// Append an audit event built from a fresh event id.
    pub fn record(&self, build: impl FnOnce(&str) -> Event) {
        let Some(store) = &self.events else {
            return;
        };
        let event = build(&store.next_event_id());
        if let Err(e) = store.append(&event) {
            warn!(event_id = %event.event_id, kind = %event.kind, "Audit append failed: {}", e);
        }
    }

    /// Push to a user's live channel, if any.
    pub fn push(&self, user_id: &str, event: PushEvent) {
        if !self.notifier.notify(user_id, event) {
            debug!(user_id, "No live channel, push dropped");
        }
    }
}
