//! # Request Module
//!
//! Pending, reversible proposals to move money between two users.
//!
//! ```text
//!         create
//! (none) ------------> Pending
//! Pending --accept---> Accepted   (money moved)
//! Pending --decline--> Declined   (no money moved)
//! Pending --cancel---> Cancelled  (sender-initiated, no money moved)
//! ```

use crate::error::{CoreError, CoreResult};
use crate::money::Currency;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a request.
///
/// Replaces the signed-amount convention: a positive signed amount is a
/// `Send` (target receives from source), a negative one is a `Request`
/// (target owes source).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Send,
    Request,
}

impl RequestKind {
    /// Split a signed amount into kind + magnitude. Zero has no direction.
    pub fn from_signed(amount: Decimal) -> Option<(Self, Decimal)> {
        if amount > Decimal::ZERO {
            Some((RequestKind::Send, amount))
        } else if amount < Decimal::ZERO {
            Some((RequestKind::Request, -amount))
        } else {
            None
        }
    }

    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            RequestKind::Send => amount,
            RequestKind::Request => -amount,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Send => "send",
            RequestKind::Request => "request",
        }
    }

    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.to_lowercase().as_str() {
            "send" => Ok(RequestKind::Send),
            "request" => Ok(RequestKind::Request),
            _ => Err(CoreError::invalid_value("request_kind", s)),
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

impl RequestStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Declined => "declined",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "declined" => Ok(RequestStatus::Declined),
            "cancelled" => Ok(RequestStatus::Cancelled),
            _ => Err(CoreError::invalid_value("request_status", s)),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub id: String,
    pub source_user_id: String,
    /// The source user's account the money leaves (Send) or lands on (Request)
    pub source_account_id: String,
    pub target_user_id: String,
    pub kind: RequestKind,
    /// Magnitude, always > 0
    pub amount: Decimal,
    pub currency: Currency,
    pub note: String,
    pub party_id: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TransferRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_user_id: &str,
        source_account_id: &str,
        target_user_id: &str,
        kind: RequestKind,
        amount: Decimal,
        currency: Currency,
        note: &str,
        party_id: Option<&str>,
    ) -> CoreResult<Self> {
        if amount <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(format!(
                "Request amount must be positive: {}",
                amount
            )));
        }
        if source_user_id == target_user_id {
            return Err(CoreError::ValidationError(
                "Cannot send a request to yourself".to_string(),
            ));
        }

        Ok(Self {
            id: crate::new_id("REQ"),
            source_user_id: source_user_id.to_string(),
            source_account_id: source_account_id.to_string(),
            target_user_id: target_user_id.to_string(),
            kind,
            amount,
            currency,
            note: note.to_string(),
            party_id: party_id.map(str::to_string),
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// Amount with the legacy sign convention applied.
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }

    /// Leave `Pending`. Happens exactly once.
    pub fn resolve(&mut self, status: RequestStatus) -> CoreResult<()> {
        if !self.is_pending() {
            return Err(CoreError::RequestAlreadyResolved {
                request_id: self.id.clone(),
                status: self.status.to_string(),
            });
        }
        if status.is_pending() {
            return Err(CoreError::ValidationError(
                "A request cannot be resolved back to pending".to_string(),
            ));
        }

        self.status = status;
        self.resolved_at = Some(Utc::now());
        Ok(())
    }

    pub fn involves_user(&self, user_id: &str) -> bool {
        self.source_user_id == user_id || self.target_user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(kind: RequestKind) -> TransferRequest {
        TransferRequest::new(
            "USR_A",
            "ACC_A",
            "USR_B",
            kind,
            dec!(25),
            Currency::ron(),
            "pizza",
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_kind_from_signed() {
        assert_eq!(
            RequestKind::from_signed(dec!(10)),
            Some((RequestKind::Send, dec!(10)))
        );
        assert_eq!(
            RequestKind::from_signed(dec!(-7.5)),
            Some((RequestKind::Request, dec!(7.5)))
        );
        assert_eq!(RequestKind::from_signed(Decimal::ZERO), None);
        assert_eq!(RequestKind::Request.signed(dec!(3)), dec!(-3));
    }

    #[test]
    fn test_resolve_once() {
        let mut req = request(RequestKind::Request);
        assert!(req.is_pending());
        assert_eq!(req.signed_amount(), dec!(-25));

        req.resolve(RequestStatus::Declined).unwrap();
        assert_eq!(req.status, RequestStatus::Declined);
        assert!(req.resolved_at.is_some());

        let err = req.resolve(RequestStatus::Accepted).unwrap_err();
        assert!(matches!(err, CoreError::RequestAlreadyResolved { .. }));
        assert_eq!(req.status, RequestStatus::Declined);
    }

    #[test]
    fn test_resolve_to_pending_rejected() {
        let mut req = request(RequestKind::Send);
        assert!(req.resolve(RequestStatus::Pending).is_err());
        assert!(req.is_pending());
    }

    #[test]
    fn test_invalid_requests() {
        let zero = TransferRequest::new(
            "USR_A", "ACC_A", "USR_B", RequestKind::Send, dec!(0), Currency::ron(), "", None,
        );
        assert!(matches!(zero, Err(CoreError::InvalidAmount(_))));

        let to_self = TransferRequest::new(
            "USR_A", "ACC_A", "USR_A", RequestKind::Send, dec!(1), Currency::ron(), "", None,
        );
        assert!(matches!(to_self, Err(CoreError::ValidationError(_))));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(RequestStatus::parse("Cancelled").unwrap(), RequestStatus::Cancelled);
        assert!(RequestStatus::parse("done").is_err());
        assert_eq!(RequestKind::parse("SEND").unwrap(), RequestKind::Send);
    }
}
