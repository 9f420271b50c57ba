//! # Event Module
//!
//! Audit events. Appended to the JSONL audit log after the owning database
//! transaction has committed; never used to rebuild balances.

use crate::party::Party;
use crate::request::TransferRequest;
use crate::transfer::Transfer;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    // === Account events ===
    AccountOpened,
    AccountDisabled,

    // === Money movement ===
    TransferExecuted,
    ExternalTransferReceived,

    // === Request protocol ===
    RequestCreated,
    RequestAccepted,
    RequestDeclined,
    RequestCancelled,

    // === Parties ===
    PartyCreated,
    PartyCancelled,
    PartyCompleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AccountOpened => "account_opened",
            EventKind::AccountDisabled => "account_disabled",
            EventKind::TransferExecuted => "transfer_executed",
            EventKind::ExternalTransferReceived => "external_transfer_received",
            EventKind::RequestCreated => "request_created",
            EventKind::RequestAccepted => "request_accepted",
            EventKind::RequestDeclined => "request_declined",
            EventKind::RequestCancelled => "request_cancelled",
            EventKind::PartyCreated => "party_created",
            EventKind::PartyCancelled => "party_cancelled",
            EventKind::PartyCompleted => "party_completed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// EVT_000001, EVT_000002, ...
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    /// Authenticated user that triggered the change (or "external")
    pub actor_id: String,
    /// ID of the transfer / request / party / account concerned
    pub subject_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Event {
    pub fn new(event_id: &str, kind: EventKind, actor_id: &str, subject_id: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            timestamp: Utc::now(),
            kind,
            actor_id: actor_id.to_string(),
            subject_id: subject_id.to_string(),
            amount: None,
            currency: None,
            description: None,
        }
    }

    pub fn with_amount(mut self, amount: Decimal, currency: &str) -> Self {
        self.amount = Some(amount);
        self.currency = Some(currency.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    // === Factory methods ===

    pub fn transfer(event_id: &str, actor_id: &str, transfer: &Transfer) -> Self {
        let kind = if transfer.source_account_id.is_none() {
            EventKind::ExternalTransferReceived
        } else {
            EventKind::TransferExecuted
        };
        let description = match transfer.exchanged_amount {
            Some(exchanged) => format!(
                "{} -> {} (credited {})",
                transfer.sender_iban, transfer.recipient_iban, exchanged
            ),
            None => format!("{} -> {}", transfer.sender_iban, transfer.recipient_iban),
        };

        Self::new(event_id, kind, actor_id, &transfer.id)
            .with_amount(transfer.amount, transfer.currency.code())
            .with_description(&description)
    }

    pub fn request(
        event_id: &str,
        kind: EventKind,
        actor_id: &str,
        request: &TransferRequest,
    ) -> Self {
        Self::new(event_id, kind, actor_id, &request.id)
            .with_amount(request.signed_amount(), request.currency.code())
    }

    pub fn party(event_id: &str, kind: EventKind, actor_id: &str, party: &Party) -> Self {
        Self::new(event_id, kind, actor_id, &party.id).with_description(&party.note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::money::Currency;
    use crate::request::RequestKind;
    use crate::transfer::Counterparty;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transfer_event() {
        let acc = Account::open("USR_1", Currency::eur(), Decimal::ZERO).unwrap();
        let transfer = Transfer::new(
            Counterparty::external("Employer", "DE89370400440532013000"),
            Counterparty::internal(&acc, "Ana"),
            dec!(1200),
            Currency::eur(),
            None,
            "salary",
        );

        let event = Event::transfer("EVT_000001", "external", &transfer);
        assert_eq!(event.kind, EventKind::ExternalTransferReceived);
        assert_eq!(event.amount, Some(dec!(1200)));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"external_transfer_received\""));
        assert!(json.contains("\"amount\":\"1200\""));
    }

    #[test]
    fn test_request_event_uses_signed_amount() {
        let req = TransferRequest::new(
            "USR_A", "ACC_A", "USR_B", RequestKind::Request, dec!(8), Currency::ron(), "", None,
        )
        .unwrap();
        let event = Event::request("EVT_000002", EventKind::RequestCreated, "USR_A", &req);
        assert_eq!(event.amount, Some(dec!(-8)));
        assert!(event.description.is_none());
    }
}
