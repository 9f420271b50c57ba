//! # Transfer Module
//!
//! Immutable record of money having moved. Created exactly once, inside the
//! committing transaction, and never mutated afterwards.

use crate::account::Account;
use crate::money::Currency;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One side of a transfer: a managed account or an external IBAN snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    /// None = outside the bank
    pub account_id: Option<String>,
    pub name: String,
    pub iban: String,
}

impl Counterparty {
    pub fn internal(account: &Account, owner_name: &str) -> Self {
        Self {
            account_id: Some(account.id.clone()),
            name: owner_name.to_string(),
            iban: account.iban.clone(),
        }
    }

    pub fn external(name: &str, iban: &str) -> Self {
        Self {
            account_id: None,
            name: name.to_string(),
            iban: iban.trim().to_uppercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub source_account_id: Option<String>,
    pub recipient_account_id: Option<String>,
    pub sender_name: String,
    pub sender_iban: String,
    pub recipient_name: String,
    pub recipient_iban: String,
    /// Always in the source's currency
    pub amount: Decimal,
    pub currency: Currency,
    /// Credited amount in the recipient's currency, cross-currency only
    pub exchanged_amount: Option<Decimal>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    pub fn new(
        sender: Counterparty,
        recipient: Counterparty,
        amount: Decimal,
        currency: Currency,
        exchanged_amount: Option<Decimal>,
        note: &str,
    ) -> Self {
        Self {
            id: crate::new_id("TRF"),
            source_account_id: sender.account_id,
            recipient_account_id: recipient.account_id,
            sender_name: sender.name,
            sender_iban: sender.iban,
            recipient_name: recipient.name,
            recipient_iban: recipient.iban,
            amount,
            currency,
            exchanged_amount,
            note: note.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn involves_account(&self, account_id: &str) -> bool {
        self.source_account_id.as_deref() == Some(account_id)
            || self.recipient_account_id.as_deref() == Some(account_id)
    }

    /// Amount that landed on the recipient side.
    pub fn credited_amount(&self) -> Decimal {
        self.exchanged_amount.unwrap_or(self.amount)
    }

    pub fn is_exchanged(&self) -> bool {
        self.exchanged_amount.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transfer_snapshots() {
        let source = Account::open("USR_1", Currency::eur(), Decimal::ZERO).unwrap();
        let transfer = Transfer::new(
            Counterparty::internal(&source, "Ana"),
            Counterparty::external("Utility Co", " ro49bank0000000000000042 "),
            dec!(10),
            Currency::eur(),
            None,
            "invoice",
        );

        assert!(transfer.id.starts_with("TRF_"));
        assert_eq!(transfer.source_account_id.as_deref(), Some(source.id.as_str()));
        assert_eq!(transfer.recipient_account_id, None);
        assert_eq!(transfer.recipient_iban, "RO49BANK0000000000000042");
        assert!(transfer.involves_account(&source.id));
        assert_eq!(transfer.credited_amount(), dec!(10));
        assert!(!transfer.is_exchanged());
    }
}
