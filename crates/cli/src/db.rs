//! Database session for one CLI invocation

use anyhow::{Context, Result};
use paybank_business::{ChannelRegistry, ServiceContext};
use paybank_persistence::Database;
use std::sync::Arc;

use crate::config::{self, Settings};

/// Opened database plus the service context built on it
pub struct Session {
    pub db: Database,
    pub ctx: ServiceContext,
}

impl Session {
    pub async fn open(settings: &Settings) -> Result<Self> {
        if let Some(parent) = settings.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }

        let db = Database::open(&settings.db_url(), Some(&settings.events_dir))
            .await
            .with_context(|| format!("Failed to open database {}", settings.db_path.display()))?;

        let rates = config::load_rates(&settings.rates_path)?;
        // Nobody listens from a one-shot process; the registry just drops pushes
        let ctx = ServiceContext::new(&db)
            .with_exchange(rates)
            .with_notifier(Arc::new(ChannelRegistry::new()));

        Ok(Self { db, ctx })
    }

    pub async fn close(self) {
        self.db.pool().close().await;
    }
}

/// Show row counts
pub async fn show_status(session: &Session) -> Result<()> {
    println!("📊 Database Status");
    println!();

    for table in [
        "users",
        "accounts",
        "transfers",
        "transfer_requests",
        "parties",
        "party_members",
    ] {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(session.db.pool())
            .await
            .with_context(|| format!("Failed to count {}", table))?;
        println!("   {:<18} {}", table, count.0);
    }
    Ok(())
}
