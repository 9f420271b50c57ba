//! # Ledger Module
//!
//! Balance-mutation primitives. Nothing else writes `Account::balance`.
//!
//! Callers check [`Account::can_debit`] and then [`Account::debit`] inside
//! the same database transaction; `debit` re-checks and refuses without
//! mutating.

use crate::account::Account;
use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;

fn ensure_positive(amount: Decimal) -> CoreResult<()> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::InvalidAmount(format!(
            "Amount must be positive: {}",
            amount
        )));
    }
    Ok(())
}

fn overflow(amount: Decimal) -> CoreError {
    CoreError::InvalidAmount(format!("Amount out of range: {}", amount))
}

impl Account {
    /// True iff `balance - amount >= -credit_limit`. Overflow is never debitable.
    pub fn can_debit(&self, amount: Decimal) -> bool {
        self.balance
            .checked_sub(amount)
            .map_or(false, |after| after >= -self.credit_limit)
    }

    /// Decrease the balance.
    pub fn debit(&mut self, amount: Decimal) -> CoreResult<()> {
        ensure_positive(amount)?;

        if !self.can_debit(amount) {
            return Err(CoreError::InsufficientFunds {
                account_id: self.id.clone(),
                required: amount,
                available: self.available(),
            });
        }

        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or_else(|| overflow(amount))?;
        Ok(())
    }

    /// Increase the balance. Receiving money never breaks the lower bound.
    pub fn credit(&mut self, amount: Decimal) -> CoreResult<()> {
        ensure_positive(amount)?;
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| overflow(amount))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use rust_decimal_macros::dec;

    fn account(balance: Decimal, credit_limit: Decimal) -> Account {
        let mut account = Account::open("USR_1", Currency::ron(), credit_limit).unwrap();
        account.balance = balance;
        account
    }

    #[test]
    fn test_can_debit_boundary() {
        let acc = account(dec!(100), dec!(0));
        assert!(acc.can_debit(dec!(100)));
        assert!(!acc.can_debit(dec!(100.01)));

        let credit = account(dec!(100), dec!(50));
        assert!(credit.can_debit(dec!(150)));
        assert!(!credit.can_debit(dec!(150.01)));
    }

    #[test]
    fn test_debit_insufficient_leaves_balance() {
        let mut acc = account(dec!(100), dec!(0));
        let err = acc.debit(dec!(150)).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientFunds {
                account_id: acc.id.clone(),
                required: dec!(150),
                available: dec!(100),
            }
        );
        assert_eq!(acc.balance(), dec!(100));
    }

    #[test]
    fn test_debit_into_credit_line() {
        let mut acc = account(dec!(10), dec!(100));
        acc.debit(dec!(60)).unwrap();
        assert_eq!(acc.balance(), dec!(-50));
        assert_eq!(acc.available(), dec!(50));
        assert!(acc.balance() >= -acc.credit_limit);
    }

    #[test]
    fn test_credit() {
        let mut acc = account(dec!(-20), dec!(50));
        acc.credit(dec!(45.5)).unwrap();
        assert_eq!(acc.balance(), dec!(25.5));
    }

    #[test]
    fn test_huge_amounts_do_not_overflow() {
        let mut acc = account(dec!(-50), dec!(100));
        assert!(!acc.can_debit(Decimal::MAX));
        assert!(acc.debit(Decimal::MAX).unwrap_err().is_insufficient_funds());
        assert_eq!(acc.balance(), dec!(-50));

        let mut rich = account(Decimal::MAX, dec!(0));
        assert!(matches!(rich.credit(dec!(1)), Err(CoreError::InvalidAmount(_))));
        assert_eq!(rich.balance(), Decimal::MAX);
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let mut acc = account(dec!(100), dec!(0));
        assert!(matches!(acc.debit(dec!(0)), Err(CoreError::InvalidAmount(_))));
        assert!(matches!(acc.credit(dec!(-5)), Err(CoreError::InvalidAmount(_))));
        assert_eq!(acc.balance(), dec!(100));
    }
}
