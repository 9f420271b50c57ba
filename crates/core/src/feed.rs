//! # Feed Module
//!
//! Activity feed entries and the timestamp merge used to interleave
//! transfers with card spend entries.

use crate::money::Currency;
use crate::request::TransferRequest;
use crate::transfer::Transfer;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for Transfer {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timestamped for TransferRequest {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Card spend entry supplied read-only by the card subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSpend {
    pub id: String,
    pub account_id: String,
    pub merchant: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Timestamped for CardSpend {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityEntry {
    Transfer(Transfer),
    CardSpend(CardSpend),
}

impl Timestamped for ActivityEntry {
    fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ActivityEntry::Transfer(t) => t.timestamp(),
            ActivityEntry::CardSpend(s) => s.timestamp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyPreview {
    pub party_id: String,
    pub host_user_id: String,
    pub note: String,
    pub total: Decimal,
    pub completed: bool,
    pub member_count: usize,
    pub pending_count: usize,
    pub created_at: DateTime<Utc>,
}

impl Timestamped for PartyPreview {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Merge two timestamp-descending sequences.
///
/// Takes the head of `left` only when it is strictly newer; on ties the
/// head of `right` goes first.
pub fn merge_descending<T: Timestamped>(left: Vec<T>, right: Vec<T>) -> Vec<T> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => l.timestamp() > r.timestamp(),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };

        let next = if take_left { left.next() } else { right.next() };
        merged.extend(next);
    }

    merged
}

fn sort_descending<T: Timestamped>(items: &mut [T]) {
    items.sort_by_key(|item| std::cmp::Reverse(item.timestamp()));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Notifications digest: the newest [`FeedMode::SHORT_LIMIT`] transfers, card
    /// spends and parties each (so up to twice that in `activity`), plus all
    /// pending requests
    Short,
    /// Full history, no pending requests
    Long,
}

impl FeedMode {
    pub const SHORT_LIMIT: usize = 3;
    pub const COMPLETED_PARTY_LIMIT: usize = 10;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityFeed {
    pub requests: Vec<TransferRequest>,
    pub activity: Vec<ActivityEntry>,
    pub parties: Vec<PartyPreview>,
}

impl ActivityFeed {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.activity.is_empty() && self.parties.is_empty()
    }
}

/// Assemble a feed from already-loaded entities.
pub fn compose_feed(
    mode: FeedMode,
    mut transfers: Vec<Transfer>,
    mut spends: Vec<CardSpend>,
    mut requests: Vec<TransferRequest>,
    parties: Vec<PartyPreview>,
) -> ActivityFeed {
    sort_descending(&mut transfers);
    sort_descending(&mut spends);
    sort_descending(&mut requests);

    if mode == FeedMode::Short {
        transfers.truncate(FeedMode::SHORT_LIMIT);
        spends.truncate(FeedMode::SHORT_LIMIT);
    }

    let activity = merge_descending(
        transfers.into_iter().map(ActivityEntry::Transfer).collect(),
        spends.into_iter().map(ActivityEntry::CardSpend).collect(),
    );

    let (mut pending, mut completed): (Vec<_>, Vec<_>) =
        parties.into_iter().partition(|p| !p.completed);
    sort_descending(&mut pending);
    sort_descending(&mut completed);

    match mode {
        FeedMode::Short => {
            let mut parties = pending;
            parties.extend(completed);
            parties.truncate(FeedMode::SHORT_LIMIT);

            ActivityFeed {
                requests: requests.into_iter().filter(|r| r.is_pending()).collect(),
                activity,
                parties,
            }
        }
        FeedMode::Long => {
            completed.truncate(FeedMode::COMPLETED_PARTY_LIMIT);
            let mut parties = pending;
            parties.extend(completed);

            ActivityFeed {
                requests: Vec::new(),
                activity,
                parties,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::request::RequestKind;
    use crate::transfer::Counterparty;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    fn transfer(hour: u32) -> Transfer {
        let account = Account::open("USR_1", Currency::ron(), Decimal::ZERO).unwrap();
        let mut t = Transfer::new(
            Counterparty::internal(&account, "Ana"),
            Counterparty::external("Shop", "RO49BANK0000000000000001"),
            dec!(1),
            Currency::ron(),
            None,
            "",
        );
        t.created_at = at(hour);
        t
    }

    fn spend(hour: u32) -> CardSpend {
        CardSpend {
            id: format!("CRD_{}", hour),
            account_id: "ACC_1".to_string(),
            merchant: "Coffee".to_string(),
            amount: dec!(3),
            currency: Currency::ron(),
            created_at: at(hour),
        }
    }

    fn preview(id: &str, hour: u32, completed: bool) -> PartyPreview {
        PartyPreview {
            party_id: id.to_string(),
            host_user_id: "USR_1".to_string(),
            note: "dinner".to_string(),
            total: dec!(25),
            completed,
            member_count: 2,
            pending_count: if completed { 0 } else { 1 },
            created_at: at(hour),
        }
    }

    fn hours(entries: &[ActivityEntry]) -> Vec<(char, u32)> {
        use chrono::Timelike;
        entries
            .iter()
            .map(|e| match e {
                ActivityEntry::Transfer(t) => ('t', t.created_at.hour()),
                ActivityEntry::CardSpend(s) => ('x', s.created_at.hour()),
            })
            .collect()
    }

    #[test]
    fn test_merge_interleaves() {
        let merged = merge_descending(
            vec![
                ActivityEntry::Transfer(transfer(12)),
                ActivityEntry::Transfer(transfer(10)),
            ],
            vec![ActivityEntry::CardSpend(spend(11))],
        );
        assert_eq!(hours(&merged), vec![('t', 12), ('x', 11), ('t', 10)]);
    }

    #[test]
    fn test_merge_ties_take_right_first() {
        let merged = merge_descending(
            vec![ActivityEntry::Transfer(transfer(12))],
            vec![
                ActivityEntry::CardSpend(spend(12)),
                ActivityEntry::CardSpend(spend(9)),
            ],
        );
        assert_eq!(hours(&merged), vec![('x', 12), ('t', 12), ('x', 9)]);
    }

    #[test]
    fn test_merge_with_empty_side() {
        let merged: Vec<ActivityEntry> =
            merge_descending(vec![], vec![ActivityEntry::CardSpend(spend(8))]);
        assert_eq!(merged.len(), 1);
        assert!(merge_descending::<ActivityEntry>(vec![], vec![]).is_empty());
    }

    #[test]
    fn test_short_feed_limits() {
        let transfers = vec![transfer(9), transfer(13), transfer(8), transfer(11)];
        let spends = vec![spend(12), spend(10)];
        let request = TransferRequest::new(
            "USR_2", "ACC_2", "USR_1", RequestKind::Request, dec!(5), Currency::ron(), "", None,
        )
        .unwrap();
        let parties = vec![
            preview("PTY_old_done", 1, true),
            preview("PTY_new_done", 20, true),
            preview("PTY_open_a", 2, false),
            preview("PTY_open_b", 3, false),
        ];

        let feed = compose_feed(FeedMode::Short, transfers, spends, vec![request], parties);

        // Oldest transfer dropped; spends kept since there are only two
        assert_eq!(
            hours(&feed.activity),
            vec![('t', 13), ('x', 12), ('t', 11), ('x', 10), ('t', 9)]
        );
        assert_eq!(feed.requests.len(), 1);
        let ids: Vec<_> = feed.parties.iter().map(|p| p.party_id.as_str()).collect();
        assert_eq!(ids, vec!["PTY_open_b", "PTY_open_a", "PTY_new_done"]);
    }

    #[test]
    fn test_long_feed_has_full_history_without_requests() {
        let transfers = (1..=6).map(transfer).collect();
        let request = TransferRequest::new(
            "USR_2", "ACC_2", "USR_1", RequestKind::Send, dec!(5), Currency::ron(), "", None,
        )
        .unwrap();
        let parties = (0..12).map(|h| preview(&format!("PTY_{}", h), h, true)).collect();

        let feed = compose_feed(FeedMode::Long, transfers, vec![], vec![request], parties);

        assert_eq!(feed.activity.len(), 6);
        assert!(feed.requests.is_empty());
        assert_eq!(feed.parties.len(), FeedMode::COMPLETED_PARTY_LIMIT);
        assert_eq!(feed.parties[0].party_id, "PTY_11");
    }
}
