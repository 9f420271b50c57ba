//! Database schema definitions
//!
//! Row types for sqlx mapping from SQLite tables.
//! Schema is defined in migrations/20261018000000_init.sql

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Utc};
use paybank_core::{
    Account, Currency, MemberStatus, Party, PartyMember, RequestKind, RequestStatus, Transfer,
    TransferRequest, User,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Decimals are stored as TEXT to keep full precision.
pub(crate) fn parse_decimal(field: &str, value: &str) -> PersistenceResult<Decimal> {
    Decimal::from_str(value).map_err(|_| PersistenceError::InvalidDecimal {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Row type for table `users`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub default_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row type for table `accounts`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AccountRow {
    pub id: String,
    pub owner_id: String,
    pub currency: String,
    pub balance: String,      // Decimal stored as TEXT
    pub credit_limit: String, // Decimal stored as TEXT
    pub iban: String,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Row type for table `transfers`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TransferRow {
    pub id: String,
    pub source_account_id: Option<String>,
    pub recipient_account_id: Option<String>,
    pub sender_name: String,
    pub sender_iban: String,
    pub recipient_name: String,
    pub recipient_iban: String,
    pub amount: String,
    pub currency: String,
    pub exchanged_amount: Option<String>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// Row type for table `transfer_requests`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TransferRequestRow {
    pub id: String,
    pub source_user_id: String,
    pub source_account_id: String,
    pub target_user_id: String,
    pub kind: String,
    pub amount: String,
    pub currency: String,
    pub note: String,
    pub party_id: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Row type for table `parties`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PartyRow {
    pub id: String,
    pub host_account_id: String,
    pub host_user_id: String,
    pub total: String,
    pub note: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Row type for table `party_members`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PartyMemberRow {
    pub id: String,
    pub party_id: String,
    pub user_id: String,
    pub amount: String,
    pub request_id: Option<String>,
    pub status: String,
}

// === Conversion implementations ===

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            default_account_id: row.default_account_id,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = PersistenceError;

    fn try_from(row: AccountRow) -> PersistenceResult<Self> {
        let balance = parse_decimal("accounts.balance", &row.balance)?;
        let credit_limit = parse_decimal("accounts.credit_limit", &row.credit_limit)?;

        Ok(Account::restore(
            row.id,
            row.owner_id,
            Currency::new(&row.currency),
            balance,
            credit_limit,
            row.iban,
            row.disabled,
            row.created_at,
        )?)
    }
}

impl TryFrom<TransferRow> for Transfer {
    type Error = PersistenceError;

    fn try_from(row: TransferRow) -> PersistenceResult<Self> {
        let exchanged_amount = row
            .exchanged_amount
            .as_deref()
            .map(|v| parse_decimal("transfers.exchanged_amount", v))
            .transpose()?;

        Ok(Self {
            amount: parse_decimal("transfers.amount", &row.amount)?,
            exchanged_amount,
            id: row.id,
            source_account_id: row.source_account_id,
            recipient_account_id: row.recipient_account_id,
            sender_name: row.sender_name,
            sender_iban: row.sender_iban,
            recipient_name: row.recipient_name,
            recipient_iban: row.recipient_iban,
            currency: Currency::new(&row.currency),
            note: row.note,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<TransferRequestRow> for TransferRequest {
    type Error = PersistenceError;

    fn try_from(row: TransferRequestRow) -> PersistenceResult<Self> {
        Ok(Self {
            kind: RequestKind::parse(&row.kind)?,
            status: RequestStatus::parse(&row.status)?,
            amount: parse_decimal("transfer_requests.amount", &row.amount)?,
            id: row.id,
            source_user_id: row.source_user_id,
            source_account_id: row.source_account_id,
            target_user_id: row.target_user_id,
            currency: Currency::new(&row.currency),
            note: row.note,
            party_id: row.party_id,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

impl TryFrom<PartyRow> for Party {
    type Error = PersistenceError;

    fn try_from(row: PartyRow) -> PersistenceResult<Self> {
        Ok(Self {
            total: parse_decimal("parties.total", &row.total)?,
            id: row.id,
            host_account_id: row.host_account_id,
            host_user_id: row.host_user_id,
            note: row.note,
            completed: row.completed,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<PartyMemberRow> for PartyMember {
    type Error = PersistenceError;

    fn try_from(row: PartyMemberRow) -> PersistenceResult<Self> {
        Ok(Self {
            amount: parse_decimal("party_members.amount", &row.amount)?,
            status: MemberStatus::parse(&row.status)?,
            id: row.id,
            party_id: row.party_id,
            user_id: row.user_id,
            request_id: row.request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_account_row_conversion() {
        let row = AccountRow {
            id: "ACC_1".to_string(),
            owner_id: "USR_1".to_string(),
            currency: "ron".to_string(),
            balance: "-12.50".to_string(),
            credit_limit: "100".to_string(),
            iban: "RO49PAYB0000000000000001".to_string(),
            disabled: false,
            created_at: Utc::now(),
        };

        let account = Account::try_from(row).unwrap();
        assert_eq!(account.balance(), dec!(-12.50));
        assert_eq!(account.currency, Currency::ron());
    }

    #[test]
    fn test_bad_decimal_rejected() {
        let row = PartyMemberRow {
            id: "PMB_1".to_string(),
            party_id: "PTY_1".to_string(),
            user_id: "USR_1".to_string(),
            amount: "ten".to_string(),
            request_id: None,
            status: "pending".to_string(),
        };

        let err = PartyMember::try_from(row).unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidDecimal { .. }));
    }

    #[test]
    fn test_bad_status_rejected() {
        let row = TransferRequestRow {
            id: "REQ_1".to_string(),
            source_user_id: "USR_1".to_string(),
            source_account_id: "ACC_1".to_string(),
            target_user_id: "USR_2".to_string(),
            kind: "send".to_string(),
            amount: "5".to_string(),
            currency: "RON".to_string(),
            note: String::new(),
            party_id: None,
            status: "lost".to_string(),
            created_at: Utc::now(),
            resolved_at: None,
        };

        let err = TransferRequest::try_from(row).unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidRow(_)));
    }
}
