//! Command handlers

pub mod account;
pub mod audit;
pub mod feed;
pub mod money;
pub mod party;
pub mod request;
pub mod user;

use anyhow::Result;
use serde::Serialize;

/// Pretty-print a value as JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
