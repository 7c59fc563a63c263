//! Ticket Entity
//!
//! The record and credential proving a user's (or team member's) accepted
//! participation or purchase. Tickets are never physically deleted, only
//! status-transitioned; attendance is marked exactly once.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::VariantSelector;
use crate::token::TicketCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketType {
    Registration,
    Merchandise,
}

impl TicketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "REGISTRATION",
            Self::Merchandise => "MERCHANDISE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    PendingApproval,
    Confirmed,
    Rejected,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Confirmed => "CONFIRMED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Ticket entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Entity identity (uuid)
    #[serde(rename = "_id")]
    pub id: String,

    /// Presentable, globally unique token printed on the credential
    pub ticket_code: String,

    pub event_id: String,

    pub user_id: String,

    /// Set on tickets issued through team registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,

    pub ticket_type: TicketType,

    pub status: TicketStatus,

    /// Participant answers to the event's custom form
    #[serde(default)]
    pub form_data: serde_json::Map<String, serde_json::Value>,

    /// Merchandise orders: selected variant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantSelector>,

    /// Merchandise orders: ordered quantity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,

    /// Merchandise orders: URL of the uploaded payment proof
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_proof_url: Option<String>,

    /// Signed credential payload; present only while status is Confirmed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_credential: Option<String>,

    #[serde(default)]
    pub attended: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance_timestamp: Option<DateTime<Utc>>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Confirmed single-participant registration ticket.
    pub fn new_registration(
        event_id: impl Into<String>,
        user_id: impl Into<String>,
        form_data: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ticket_code: TicketCode::generate(),
            event_id: event_id.into(),
            user_id: user_id.into(),
            team_id: None,
            ticket_type: TicketType::Registration,
            status: TicketStatus::Confirmed,
            form_data,
            variant: None,
            quantity: None,
            payment_proof_url: None,
            qr_credential: None,
            attended: false,
            attendance_timestamp: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merchandise order awaiting organizer review. No credential is issued
    /// and no stock is committed until approval.
    pub fn new_merch_order(
        event_id: impl Into<String>,
        user_id: impl Into<String>,
        variant: Option<VariantSelector>,
        quantity: u32,
        payment_proof_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ticket_code: TicketCode::generate(),
            event_id: event_id.into(),
            user_id: user_id.into(),
            team_id: None,
            ticket_type: TicketType::Merchandise,
            status: TicketStatus::PendingApproval,
            form_data: serde_json::Map::new(),
            variant,
            quantity: Some(quantity),
            payment_proof_url,
            qr_credential: None,
            attended: false,
            attendance_timestamp: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Confirmed ticket issued to one member through team registration.
    pub fn new_team_ticket(
        event_id: impl Into<String>,
        user_id: impl Into<String>,
        team_id: impl Into<String>,
    ) -> Self {
        let mut ticket = Self::new_registration(event_id, user_id, serde_json::Map::new());
        ticket.team_id = Some(team_id.into());
        ticket
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.qr_credential = Some(credential.into());
        self
    }

    /// Active tickets block re-registration for the same event.
    pub fn is_active(&self) -> bool {
        self.status != TicketStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_ticket_defaults() {
        let ticket = Ticket::new_registration("evt-1", "user-1", serde_json::Map::new());
        assert_eq!(ticket.status, TicketStatus::Confirmed);
        assert_eq!(ticket.ticket_type, TicketType::Registration);
        assert!(ticket.qr_credential.is_none());
        assert!(!ticket.attended);
        assert!(TicketCode::is_valid(&ticket.ticket_code));
        assert_ne!(ticket.id, ticket.ticket_code);
    }

    #[test]
    fn test_merch_order_pends_approval_without_credential() {
        let ticket = Ticket::new_merch_order("evt-1", "user-1", None, 2, None);
        assert_eq!(ticket.status, TicketStatus::PendingApproval);
        assert_eq!(ticket.quantity, Some(2));
        assert!(ticket.qr_credential.is_none());
    }

    #[test]
    fn test_team_ticket_carries_team() {
        let ticket = Ticket::new_team_ticket("evt-1", "user-1", "team-1");
        assert_eq!(ticket.team_id.as_deref(), Some("team-1"));
        assert_eq!(ticket.status, TicketStatus::Confirmed);
    }

    #[test]
    fn test_active_statuses() {
        let mut ticket = Ticket::new_registration("evt-1", "user-1", serde_json::Map::new());
        assert!(ticket.is_active());
        ticket.status = TicketStatus::Rejected;
        assert!(ticket.is_active());
        ticket.status = TicketStatus::Cancelled;
        assert!(!ticket.is_active());
    }
}
