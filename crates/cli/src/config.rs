//! Runtime settings: CLI flags with environment fallbacks, plus the
//! exchange rate table loaded at startup.

use anyhow::{Context, Result};
use paybank_core::ExchangeTable;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::Cli;

#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub events_dir: PathBuf,
    pub rates_path: PathBuf,
    pub actor: Option<String>,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            db_path: cli.db.clone(),
            events_dir: cli.events_dir.clone(),
            rates_path: cli.rates.clone(),
            actor: cli.actor.clone(),
        }
    }

    pub fn db_url(&self) -> String {
        format!("sqlite:{}", self.db_path.display())
    }
}

/// Load the exchange table. A missing file yields an empty table.
pub fn load_rates(path: &Path) -> Result<ExchangeTable> {
    if !path.exists() {
        warn!(path = %path.display(), "Rate file not found, cross-currency transfers disabled");
        return Ok(ExchangeTable::new());
    }

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rate file {}", path.display()))?;
    let table = ExchangeTable::from_json(&json)
        .with_context(|| format!("Invalid rate file {}", path.display()))?;

    info!(path = %path.display(), rates = table.len(), "Exchange rates loaded");
    Ok(table)
}

pub fn require_actor(actor: Option<&str>) -> Result<&str> {
    actor.context("This command needs an acting user: pass --actor or set PAYBANK_USER")
}

#[cfg(test)]
mod tests {
    use super::*;
    use paybank_core::Currency;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[test]
    fn test_missing_rate_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let table = load_rates(&dir.path().join("nope.json")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_rates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rates.json");
        std::fs::write(&path, r#"[{"from": "EUR", "to": "RON", "rate": "5.0"}]"#).unwrap();

        let table = load_rates(&path).unwrap();
        assert_eq!(table.rate(&Currency::eur(), &Currency::ron()), Some(dec!(5.0)));
    }

    #[test]
    fn test_broken_rate_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rates.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_rates(&path).is_err());
    }

    #[test]
    fn test_require_actor() {
        assert_eq!(require_actor(Some("alice")).unwrap(), "alice");
        assert!(require_actor(None).is_err());
    }
}
