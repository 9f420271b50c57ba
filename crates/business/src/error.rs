//! Business layer errors
//!
//! Business failures are plain values callers translate into user messages;
//! `Integrity` and wrapped lower-layer errors are fatal.

use paybank_core::CoreError;
use paybank_persistence::PersistenceError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Business operation errors
#[derive(Debug, Error)]
pub enum BusinessError {
    // === Money ===
    #[error("Insufficient funds in {account_id}: required {required}, available {available}")]
    InsufficientFunds {
        account_id: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    #[error("No exchange rate from {from} to {to}")]
    ExchangeRateUnavailable { from: String, to: String },

    // === Lookup ===
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown recipient: {0}")]
    UnknownRecipient(String),

    #[error("Transfer request not found: {0}")]
    RequestNotFound(String),

    #[error("Party not found: {0}")]
    PartyNotFound(String),

    // === Permission / state ===
    #[error("Account disabled: {0}")]
    AccountDisabled(String),

    #[error("{actor} is not permitted to {operation}")]
    NotPermitted { actor: String, operation: String },

    #[error("Request {request_id} is not pending (status: {status})")]
    RequestNotPending { request_id: String, status: String },

    #[error("Invalid party: {0}")]
    InvalidParty(String),

    // === Fatal ===
    #[error("Data integrity violation: {0}")]
    Integrity(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Core error: {0}")]
    Core(CoreError),
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;

impl From<CoreError> for BusinessError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientFunds {
                account_id,
                required,
                available,
            } => Self::InsufficientFunds {
                account_id,
                required,
                available,
            },
            CoreError::InvalidAmount(msg) => Self::InvalidAmount(msg),
            CoreError::CurrencyMismatch { expected, actual } => {
                Self::CurrencyMismatch { expected, actual }
            }
            CoreError::RequestAlreadyResolved { request_id, status } => {
                Self::RequestNotPending { request_id, status }
            }
            other => Self::Core(other),
        }
    }
}

impl From<sqlx::Error> for BusinessError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(PersistenceError::Database(err))
    }
}

impl BusinessError {
    pub fn not_permitted(actor: &str, operation: &str) -> Self {
        Self::NotPermitted {
            actor: actor.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn rate_unavailable(from: &str, to: &str) -> Self {
        Self::ExchangeRateUnavailable {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, Self::InsufficientFunds { .. })
    }

    /// Expected outcomes of user input, as opposed to fatal faults.
    pub fn is_business_failure(&self) -> bool {
        !matches!(
            self,
            Self::Integrity(_) | Self::Persistence(_) | Self::Core(_)
        )
    }

    /// Stable code for user-facing messages. None for fatal errors.
    pub fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InsufficientFunds { .. } => "balance_low",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::CurrencyMismatch { .. } => "currency_mismatch",
            Self::ExchangeRateUnavailable { .. } => "exchange_unavailable",
            Self::UnknownUser(_) => "unknown_user",
            Self::UnknownAccount(_) => "unknown_account",
            Self::UnknownRecipient(_) => "unknown_recipient",
            Self::RequestNotFound(_) => "request_not_found",
            Self::PartyNotFound(_) => "party_not_found",
            Self::AccountDisabled(_) => "account_disabled",
            Self::NotPermitted { .. } => "not_permitted",
            Self::RequestNotPending { .. } => "request_not_pending",
            Self::InvalidParty(_) => "invalid_party",
            Self::Integrity(_) | Self::Persistence(_) | Self::Core(_) => return None,
        };
        Some(code)
    }
}

/// Map `NotFound` to a domain-specific lookup failure, keep everything else.
pub(crate) fn or_missing(
    err: PersistenceError,
    missing: impl FnOnce() -> BusinessError,
) -> BusinessError {
    if err.is_not_found() {
        missing()
    } else {
        BusinessError::Persistence(err)
    }
}
