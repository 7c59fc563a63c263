//! Check-In Service
//!
//! Idempotent attendance marking from a scanned credential or a manually
//! typed ticket code. The first scan wins through an atomic
//! attended-flag flip; every later scan fails with a duplicate-scan error
//! that discloses the original timestamp so staff can resolve disputes on
//! the spot.

use std::sync::Arc;

use tracing::info;

use crate::domain::{Event, Ticket, TicketStatus};
use crate::error::{Result, TesseraError};
use crate::repository::{EventRepository, TicketRepository};
use crate::service::authorization::{checks, AuthContext};
use crate::service::credential::CredentialSigner;

#[derive(Clone)]
pub struct CheckInService {
    tickets: Arc<TicketRepository>,
    events: Arc<EventRepository>,
    signer: Arc<CredentialSigner>,
}

impl CheckInService {
    pub fn new(
        tickets: Arc<TicketRepository>,
        events: Arc<EventRepository>,
        signer: Arc<CredentialSigner>,
    ) -> Self {
        Self {
            tickets,
            events,
            signer,
        }
    }

    /// Check in from scanner input: either a full signed credential or a
    /// bare ticket code typed by staff. A credential with a bad signature
    /// is rejected before any lookup; a supplied event id must match the
    /// ticket's event to block cross-event replay of a valid credential.
    pub async fn scan(
        &self,
        auth: &AuthContext,
        input: &str,
        expected_event_id: Option<&str>,
    ) -> Result<Ticket> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TesseraError::validation("Ticket code is required"));
        }

        let ticket_code = if CredentialSigner::looks_like_credential(input) {
            self.signer.verify(input)?.ticket_code
        } else {
            input.to_uppercase()
        };

        let ticket = self
            .tickets
            .find_by_code(&ticket_code)
            .await?
            .ok_or_else(|| TesseraError::not_found("Ticket", &ticket_code))?;

        self.complete(auth, ticket, expected_event_id).await
    }

    /// Manual fallback for staff without a scanner, addressed by ticket id.
    pub async fn manual_mark_attendance(
        &self,
        auth: &AuthContext,
        ticket_id: &str,
    ) -> Result<Ticket> {
        let ticket = self
            .tickets
            .find_by_id(ticket_id)
            .await?
            .ok_or_else(|| TesseraError::not_found("Ticket", ticket_id))?;

        self.complete(auth, ticket, None).await
    }

    async fn complete(
        &self,
        auth: &AuthContext,
        ticket: Ticket,
        expected_event_id: Option<&str>,
    ) -> Result<Ticket> {
        let event = self.load_event(&ticket.event_id).await?;

        // A scan against another organizer's event is an explicit
        // authorization failure naming the event, not a generic not-found.
        checks::can_manage_event(auth, &event)?;

        if let Some(expected) = expected_event_id {
            if expected != ticket.event_id {
                return Err(TesseraError::validation(format!(
                    "Ticket belongs to event '{}', not the event being scanned",
                    event.name
                )));
            }
        }

        if ticket.status != TicketStatus::Confirmed {
            return Err(TesseraError::state(format!(
                "Ticket is {} and cannot be checked in",
                ticket.status.as_str()
            )));
        }

        if ticket.attended {
            return Err(duplicate_scan(&ticket));
        }

        match self.tickets.mark_attended(&ticket.id).await? {
            Some(updated) => {
                info!(
                    ticket_code = %updated.ticket_code,
                    event_id = %updated.event_id,
                    "Attendance marked"
                );
                Ok(updated)
            }
            None => {
                // Lost the race: either a concurrent scan won or the status
                // changed under us. Re-read and report precisely.
                let current = self
                    .tickets
                    .find_by_id(&ticket.id)
                    .await?
                    .ok_or_else(|| TesseraError::not_found("Ticket", &ticket.id))?;
                if current.attended {
                    Err(duplicate_scan(&current))
                } else {
                    Err(TesseraError::state(format!(
                        "Ticket is {} and cannot be checked in",
                        current.status.as_str()
                    )))
                }
            }
        }
    }

    async fn load_event(&self, event_id: &str) -> Result<Event> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| TesseraError::not_found("Event", event_id))
    }
}

fn duplicate_scan(ticket: &Ticket) -> TesseraError {
    TesseraError::DuplicateScan {
        attended_at: ticket.attendance_timestamp.unwrap_or(ticket.updated_at),
    }
}
