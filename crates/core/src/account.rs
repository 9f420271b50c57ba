//! # Account Module
//!
//! A user-owned balance in a single currency, optionally with a credit
//! limit. The balance is private: only the ledger primitives in
//! [`crate::ledger`] move it.

use crate::error::{CoreError, CoreResult};
use crate::money::Currency;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bank account.
///
/// Invariant: `balance >= -credit_limit` at all times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// ID of the owning user
    pub owner_id: String,
    /// Fixed at creation
    pub currency: Currency,
    pub(crate) balance: Decimal,
    /// 0 for non-credit accounts
    pub credit_limit: Decimal,
    pub iban: String,
    /// Soft delete; disabled accounts cannot send or receive
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account with a zero balance.
    pub fn open(owner_id: &str, currency: Currency, credit_limit: Decimal) -> CoreResult<Self> {
        if credit_limit < Decimal::ZERO {
            return Err(CoreError::InvalidAmount(format!(
                "Credit limit must not be negative: {}",
                credit_limit
            )));
        }

        Ok(Self {
            id: crate::new_id("ACC"),
            owner_id: owner_id.to_string(),
            currency,
            balance: Decimal::ZERO,
            credit_limit,
            iban: generate_iban(),
            disabled: false,
            created_at: Utc::now(),
        })
    }

    /// Rebuild an account from storage.
    ///
    /// Refuses a stored state that already breaks the credit-limit invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: String,
        owner_id: String,
        currency: Currency,
        balance: Decimal,
        credit_limit: Decimal,
        iban: String,
        disabled: bool,
        created_at: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if balance < -credit_limit {
            return Err(CoreError::ValidationError(format!(
                "Account {} balance {} is below credit limit {}",
                id, balance, credit_limit
            )));
        }

        Ok(Self {
            id,
            owner_id,
            currency,
            balance,
            credit_limit,
            iban,
            disabled,
            created_at,
        })
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Spendable amount including the credit line. Saturates at `Decimal::MAX`.
    pub fn available(&self) -> Decimal {
        self.balance.saturating_add(self.credit_limit)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    pub fn with_iban(mut self, iban: &str) -> Self {
        self.iban = iban.to_string();
        self
    }
}

/// Generate a Paybank IBAN (`RO` + check digits + `PAYB` + 16 digits).
pub fn generate_iban() -> String {
    let digits = Uuid::new_v4().as_u128() % 10u128.pow(16);
    format!("RO49PAYB{:016}", digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_open_account() {
        let account = Account::open("USR_1", Currency::ron(), dec!(500)).unwrap();
        assert!(account.id.starts_with("ACC_"));
        assert_eq!(account.balance(), Decimal::ZERO);
        assert_eq!(account.available(), dec!(500));
        assert!(account.iban.starts_with("RO49PAYB"));
        assert_eq!(account.iban.len(), 24);
        assert!(!account.disabled);
    }

    #[test]
    fn test_negative_credit_limit_rejected() {
        let err = Account::open("USR_1", Currency::ron(), dec!(-1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount(_)));
    }

    #[test]
    fn test_restore_checks_invariant() {
        let ok = Account::restore(
            "ACC_1".into(),
            "USR_1".into(),
            Currency::eur(),
            dec!(-50),
            dec!(50),
            "RO49PAYB0000000000000001".into(),
            false,
            Utc::now(),
        );
        assert!(ok.is_ok());

        let broken = Account::restore(
            "ACC_1".into(),
            "USR_1".into(),
            Currency::eur(),
            dec!(-51),
            dec!(50),
            "RO49PAYB0000000000000001".into(),
            false,
            Utc::now(),
        );
        assert!(matches!(broken, Err(CoreError::ValidationError(_))));
    }
}
