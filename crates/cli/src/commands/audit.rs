//! Audit log command

use anyhow::{Context, Result};
use paybank_persistence::EventFilter;

use crate::db::Session;

pub fn show(session: &Session, user: Option<String>, subject: Option<String>) -> Result<()> {
    let store = session
        .db
        .events()
        .context("Audit log is not configured")?;

    let mut filter = EventFilter::new();
    if let Some(user) = &user {
        filter = filter.actor(user);
    }
    if let Some(subject) = &subject {
        filter = filter.subject(subject);
    }

    let events = store.reader().read_filtered(&filter)?;
    println!("🔍 {} event(s)", events.len());
    for event in &events {
        let amount = match (&event.amount, &event.currency) {
            (Some(amount), Some(currency)) => format!("{} {}", amount, currency),
            _ => String::new(),
        };
        println!(
            "  {}  {}  {:<28} {:<10} {}  {}",
            event.event_id,
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.kind,
            event.actor_id,
            event.subject_id,
            amount
        );
    }
    Ok(())
}
