//! Feed and statement commands

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use paybank_business::{FeedService, NoCardActivity};
use paybank_core::FeedMode;

use crate::commands::print_json;
use crate::db::Session;

pub async fn feed(session: &Session, actor: &str, long: bool) -> Result<()> {
    let mode = if long { FeedMode::Long } else { FeedMode::Short };
    let cards = NoCardActivity;
    let feed = FeedService::new(&session.ctx, &cards).feed(actor, mode).await?;
    print_json(&feed)
}

pub async fn statement(session: &Session, account_id: &str, from: &str, to: &str) -> Result<()> {
    let from = parse_day(from)?;
    let to = parse_day(to)?;
    let cards = NoCardActivity;
    let entries = FeedService::new(&session.ctx, &cards)
        .statement(account_id, from, to)
        .await?;
    print_json(&entries)
}

/// Midnight UTC of a `YYYY-MM-DD` date.
fn parse_day(s: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day() {
        let day = parse_day("2026-10-18").unwrap();
        assert_eq!(day.to_rfc3339(), "2026-10-18T00:00:00+00:00");
        assert!(parse_day("18/10/2026").is_err());
    }
}
