//! Activity feed and account statements

use crate::context::ServiceContext;
use crate::error::BusinessResult;
use crate::transfer::load_account;
use chrono::{DateTime, Utc};
use paybank_core::{
    compose_feed, merge_descending, ActivityEntry, ActivityFeed, CardSpend, FeedMode,
    PartyPreview, Timestamped, Transfer,
};
use paybank_persistence::{AccountRepo, PartyMemberRepo, PartyRepo, RequestRepo, TransferRepo};
use std::collections::HashSet;
use tracing::debug;

/// Read-only view of the card subsystem.
///
/// Implementations return entries newest first.
pub trait CardActivity: Send + Sync {
    fn spends_for_account(&self, account_id: &str) -> Vec<CardSpend>;
}

/// No cards anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCardActivity;

impl CardActivity for NoCardActivity {
    fn spends_for_account(&self, _account_id: &str) -> Vec<CardSpend> {
        Vec::new()
    }
}

/// Fixed set of spends, e.g. loaded from a file
#[derive(Debug, Default, Clone)]
pub struct StaticCardActivity {
    spends: Vec<CardSpend>,
}

impl StaticCardActivity {
    pub fn new(spends: Vec<CardSpend>) -> Self {
        Self { spends }
    }
}

impl CardActivity for StaticCardActivity {
    fn spends_for_account(&self, account_id: &str) -> Vec<CardSpend> {
        let mut spends: Vec<CardSpend> = self
            .spends
            .iter()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect();
        spends.sort_by_key(|s| std::cmp::Reverse(s.created_at));
        spends
    }
}

/// Feed Service - per-user activity feed and per-account statements
pub struct FeedService<'a> {
    ctx: &'a ServiceContext,
    cards: &'a dyn CardActivity,
}

impl<'a> FeedService<'a> {
    pub fn new(ctx: &'a ServiceContext, cards: &'a dyn CardActivity) -> Self {
        Self { ctx, cards }
    }

    pub async fn feed(&self, user_id: &str, mode: FeedMode) -> BusinessResult<ActivityFeed> {
        let mut conn = self.ctx.pool().acquire().await?;

        let accounts = AccountRepo::get_by_owner(&mut conn, user_id).await?;

        // Transfers between two of the user's own accounts show up twice
        let mut seen = HashSet::new();
        let mut transfers = Vec::new();
        let mut spends = Vec::new();
        for account in &accounts {
            for transfer in TransferRepo::get_by_account(&mut conn, &account.id).await? {
                if seen.insert(transfer.id.clone()) {
                    transfers.push(transfer);
                }
            }
            spends.extend(self.cards.spends_for_account(&account.id));
        }

        let requests = match mode {
            FeedMode::Short => RequestRepo::get_pending_for_user(&mut conn, user_id).await?,
            FeedMode::Long => Vec::new(),
        };

        let mut previews = Vec::new();
        for party in PartyRepo::get_for_user(&mut conn, user_id).await? {
            let members = PartyMemberRepo::get_by_party(&mut conn, &party.id).await?;
            previews.push(PartyPreview {
                party_id: party.id,
                host_user_id: party.host_user_id,
                note: party.note,
                total: party.total,
                completed: party.completed,
                member_count: members.len(),
                pending_count: members.iter().filter(|m| !m.status.is_resolved()).count(),
                created_at: party.created_at,
            });
        }

        debug!(
            user_id,
            ?mode,
            transfers = transfers.len(),
            spends = spends.len(),
            parties = previews.len(),
            "Composing feed"
        );
        Ok(compose_feed(mode, transfers, spends, requests, previews))
    }

    /// Transfers and card spends of one account with `from <= t < to`, newest first.
    pub async fn statement(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> BusinessResult<Vec<ActivityEntry>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let account = load_account(&mut conn, account_id).await?;

        let transfers: Vec<Transfer> =
            TransferRepo::get_by_account_between(&mut conn, &account.id, from, to).await?;
        let spends: Vec<CardSpend> = self
            .cards
            .spends_for_account(&account.id)
            .into_iter()
            .filter(|s| s.timestamp() >= from && s.timestamp() < to)
            .collect();

        debug!(account_id, from = %from, to = %to, "Building statement");
        Ok(merge_descending(
            transfers.into_iter().map(ActivityEntry::Transfer).collect(),
            spends.into_iter().map(ActivityEntry::CardSpend).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use paybank_core::Currency;
    use rust_decimal_macros::dec;

    fn spend(account_id: &str, hour: u32) -> CardSpend {
        CardSpend {
            id: format!("CRD_{}", hour),
            account_id: account_id.to_string(),
            merchant: "Cafe".to_string(),
            amount: dec!(4.5),
            currency: Currency::ron(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_static_card_activity_filters_and_sorts() {
        let cards = StaticCardActivity::new(vec![
            spend("ACC_1", 9),
            spend("ACC_2", 10),
            spend("ACC_1", 11),
        ]);

        let spends = cards.spends_for_account("ACC_1");
        assert_eq!(spends.len(), 2);
        assert_eq!(spends[0].id, "CRD_11");
        assert!(NoCardActivity.spends_for_account("ACC_1").is_empty());
    }
}
