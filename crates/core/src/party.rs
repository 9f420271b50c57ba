//! # Party Module
//!
//! Host-initiated bill split. A party fans out one transfer request per
//! member; it is `completed` once every member has resolved and stays so.

use crate::error::{CoreError, CoreResult};
use crate::request::RequestStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Member input for party creation. Amount follows the request sign
/// convention (positive = member receives, negative = member owes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyShare {
    pub user_id: String,
    pub amount: Decimal,
}

impl PartyShare {
    pub fn new(user_id: &str, amount: Decimal) -> Self {
        Self {
            user_id: user_id.to_string(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Pending,
    Accepted,
    Declined,
}

impl MemberStatus {
    /// A cancelled request counts as a declined member.
    pub fn from_request(status: RequestStatus) -> Self {
        match status {
            RequestStatus::Pending => MemberStatus::Pending,
            RequestStatus::Accepted => MemberStatus::Accepted,
            RequestStatus::Declined | RequestStatus::Cancelled => MemberStatus::Declined,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, MemberStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Pending => "pending",
            MemberStatus::Accepted => "accepted",
            MemberStatus::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(MemberStatus::Pending),
            "accepted" => Ok(MemberStatus::Accepted),
            "declined" => Ok(MemberStatus::Declined),
            _ => Err(CoreError::invalid_value("member_status", s)),
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyMember {
    pub id: String,
    pub party_id: String,
    pub user_id: String,
    /// Signed, mirrors the request convention
    pub amount: Decimal,
    pub request_id: Option<String>,
    pub status: MemberStatus,
}

impl PartyMember {
    pub fn new(party_id: &str, share: &PartyShare) -> Self {
        Self {
            id: crate::new_id("PMB"),
            party_id: party_id.to_string(),
            user_id: share.user_id.clone(),
            amount: share.amount,
            request_id: None,
            status: MemberStatus::Pending,
        }
    }
}

fn checked_sum(amounts: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    amounts.fold(Some(Decimal::ZERO), |acc, amount| acc?.checked_add(amount))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub id: String,
    pub host_account_id: String,
    pub host_user_id: String,
    /// Sum of member amounts
    pub total: Decimal,
    pub note: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Party {
    /// Validate the member list and build the party with its total.
    pub fn new(
        host_user_id: &str,
        host_account_id: &str,
        note: &str,
        shares: &[PartyShare],
    ) -> CoreResult<Self> {
        if shares.is_empty() {
            return Err(CoreError::ValidationError(
                "A party needs at least one member".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for share in shares {
            if share.amount.is_zero() {
                return Err(CoreError::InvalidAmount(format!(
                    "Share of {} must not be zero",
                    share.user_id
                )));
            }
            if share.user_id == host_user_id {
                return Err(CoreError::ValidationError(
                    "The host cannot be a member of their own party".to_string(),
                ));
            }
            if !seen.insert(share.user_id.as_str()) {
                return Err(CoreError::ValidationError(format!(
                    "Duplicate party member: {}",
                    share.user_id
                )));
            }
        }

        let total = checked_sum(shares.iter().map(|s| s.amount)).ok_or_else(|| {
            CoreError::InvalidAmount("Party total is out of range".to_string())
        })?;

        Ok(Self {
            id: crate::new_id("PTY"),
            host_account_id: host_account_id.to_string(),
            host_user_id: host_user_id.to_string(),
            total,
            note: note.to_string(),
            completed: false,
            created_at: Utc::now(),
        })
    }

    /// Data-integrity check: total must equal the member sum.
    pub fn verify_total(&self, members: &[PartyMember]) -> CoreResult<()> {
        let sum = checked_sum(members.iter().map(|m| m.amount));
        if sum != Some(self.total) {
            return Err(CoreError::ValidationError(format!(
                "Party {} total {} does not match member sum {:?}",
                self.id, self.total, sum
            )));
        }
        Ok(())
    }

    /// Set `completed` when every member is resolved. Never resets it.
    /// Returns true when this call flipped the flag.
    pub fn refresh_completion(&mut self, members: &[PartyMember]) -> bool {
        if self.completed {
            return false;
        }
        if members.iter().all(|m| m.status.is_resolved()) {
            self.completed = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn shares() -> Vec<PartyShare> {
        vec![PartyShare::new("USR_A", dec!(10)), PartyShare::new("USR_B", dec!(15))]
    }

    fn members(party: &Party) -> Vec<PartyMember> {
        shares().iter().map(|s| PartyMember::new(&party.id, s)).collect()
    }

    #[test]
    fn test_party_total() {
        let party = Party::new("USR_X", "ACC_X", "dinner", &shares()).unwrap();
        assert_eq!(party.total, dec!(25));
        assert!(!party.completed);
        assert!(party.verify_total(&members(&party)).is_ok());
    }

    #[test]
    fn test_party_validation() {
        assert!(Party::new("USR_X", "ACC_X", "", &[]).is_err());
        assert!(Party::new("USR_X", "ACC_X", "", &[PartyShare::new("USR_A", dec!(0))]).is_err());
        assert!(Party::new("USR_X", "ACC_X", "", &[PartyShare::new("USR_X", dec!(5))]).is_err());
        assert!(Party::new(
            "USR_X",
            "ACC_X",
            "",
            &[PartyShare::new("USR_A", dec!(5)), PartyShare::new("USR_A", dec!(6))]
        )
        .is_err());
        assert!(matches!(
            Party::new(
                "USR_X",
                "ACC_X",
                "",
                &[PartyShare::new("USR_A", Decimal::MAX), PartyShare::new("USR_B", Decimal::MAX)]
            ),
            Err(CoreError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_verify_total_mismatch() {
        let mut party = Party::new("USR_X", "ACC_X", "dinner", &shares()).unwrap();
        party.total = dec!(30);
        assert!(matches!(
            party.verify_total(&members(&party)),
            Err(CoreError::ValidationError(_))
        ));
    }

    #[test]
    fn test_completion_is_monotonic() {
        let mut party = Party::new("USR_X", "ACC_X", "dinner", &shares()).unwrap();
        let mut members = members(&party);

        members[0].status = MemberStatus::Accepted;
        assert!(!party.refresh_completion(&members));
        assert!(!party.completed);

        members[1].status = MemberStatus::Declined;
        assert!(party.refresh_completion(&members));
        assert!(party.completed);

        members[1].status = MemberStatus::Pending;
        assert!(!party.refresh_completion(&members));
        assert!(party.completed);
    }

    #[test]
    fn test_member_status_from_request() {
        assert_eq!(MemberStatus::from_request(RequestStatus::Cancelled), MemberStatus::Declined);
        assert_eq!(MemberStatus::from_request(RequestStatus::Accepted), MemberStatus::Accepted);
        assert!(!MemberStatus::from_request(RequestStatus::Pending).is_resolved());
    }
}
