//! # Error Module
//!
//! Domain errors for Paybank, built on thiserror.

use rust_decimal::Decimal;
use thiserror::Error;

/// Core domain errors.
///
/// Business rule violations only; nothing here knows about storage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    // === Money errors ===
    #[error("Insufficient funds on {account_id}: need {required}, available {available}")]
    InsufficientFunds {
        account_id: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    #[error("Invalid exchange table: {0}")]
    InvalidExchangeTable(String),

    // === State errors ===
    #[error("Request {request_id} already resolved ({status})")]
    RequestAlreadyResolved { request_id: String, status: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type alias with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, CoreError::InsufficientFunds { .. })
    }

    pub fn invalid_value(field: &str, value: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_display() {
        let err = CoreError::InsufficientFunds {
            account_id: "ACC_1".to_string(),
            required: dec!(150),
            available: dec!(100),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds on ACC_1: need 150, available 100"
        );
        assert!(err.is_insufficient_funds());

        let err = CoreError::invalid_value("status", "bogus");
        assert_eq!(err.to_string(), "Invalid value for status: bogus");
        assert!(!err.is_insufficient_funds());
    }
}
