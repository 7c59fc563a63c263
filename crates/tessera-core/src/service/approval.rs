//! Approval Workflow
//!
//! Human-gated decision on pending merchandise orders, restricted to the
//! event's organizer or an admin. Approval re-validates stock at decision
//! time with a conditional decrement, then flips the order status
//! atomically; a second decision on the same order is a conflict, never a
//! silent repeat.

use std::sync::Arc;

use tracing::info;

use crate::domain::{Ticket, TicketStatus, TicketType};
use crate::error::{Result, TesseraError};
use crate::repository::{EventRepository, TicketRepository};
use crate::service::authorization::{checks, AuthContext};
use crate::service::credential::{CredentialSigner, QrPayload};
use crate::service::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Clone)]
pub struct ApprovalService {
    tickets: Arc<TicketRepository>,
    events: Arc<EventRepository>,
    signer: Arc<CredentialSigner>,
    notifier: Notifier,
}

impl ApprovalService {
    pub fn new(
        tickets: Arc<TicketRepository>,
        events: Arc<EventRepository>,
        signer: Arc<CredentialSigner>,
        notifier: Notifier,
    ) -> Self {
        Self {
            tickets,
            events,
            signer,
            notifier,
        }
    }

    pub async fn review(
        &self,
        auth: &AuthContext,
        ticket_id: &str,
        decision: Decision,
    ) -> Result<Ticket> {
        let ticket = self
            .tickets
            .find_by_id(ticket_id)
            .await?
            .ok_or_else(|| TesseraError::not_found("Order", ticket_id))?;

        if ticket.ticket_type != TicketType::Merchandise {
            return Err(TesseraError::validation("Not a merchandise order"));
        }

        let event = self
            .events
            .find_by_id(&ticket.event_id)
            .await?
            .ok_or_else(|| TesseraError::not_found("Event", &ticket.event_id))?;
        checks::can_manage_event(auth, &event)?;

        if ticket.status != TicketStatus::PendingApproval {
            return Err(TesseraError::conflict(format!(
                "Order already decided: status is {}",
                ticket.status.as_str()
            )));
        }

        let decided = match decision {
            Decision::Approve => self.approve(&ticket, &event).await?,
            Decision::Reject => self.reject(&ticket).await?,
        };

        info!(
            ticket_code = %decided.ticket_code,
            event_id = %event.id,
            decision = ?decision,
            "Merchandise order decided"
        );
        self.notifier
            .order_decided(&decided, &event.name, decision == Decision::Approve);

        Ok(decided)
    }

    /// Stock is committed here, not at order time: the conditional
    /// decrement asserts sufficient remaining stock in its filter, so
    /// concurrent approvals can never drive stock negative.
    async fn approve(&self, ticket: &Ticket, event: &crate::domain::Event) -> Result<Ticket> {
        let quantity = ticket.quantity.unwrap_or(1);
        let track_total = event.total_stock.is_some();

        let committed = self
            .events
            .decrement_stock(&event.id, ticket.variant.as_ref(), quantity, track_total)
            .await?;
        if !committed {
            return Err(TesseraError::capacity(
                "Insufficient stock remaining to approve this order",
            ));
        }

        let credential = self.signer.sign(&QrPayload {
            ticket_code: ticket.ticket_code.clone(),
            event_name: event.name.clone(),
            team_name: None,
        })?;

        match self
            .tickets
            .decide(&ticket.id, TicketStatus::Confirmed, Some(credential))
            .await?
        {
            Some(decided) => Ok(decided),
            None => {
                // A concurrent decision won; hand the committed stock back.
                self.events
                    .restore_stock(&event.id, ticket.variant.as_ref(), quantity, track_total)
                    .await?;
                Err(self.already_decided(&ticket.id).await?)
            }
        }
    }

    async fn reject(&self, ticket: &Ticket) -> Result<Ticket> {
        // No stock was held for a pending order, so nothing to release.
        match self
            .tickets
            .decide(&ticket.id, TicketStatus::Rejected, None)
            .await?
        {
            Some(decided) => Ok(decided),
            None => Err(self.already_decided(&ticket.id).await?),
        }
    }

    async fn already_decided(&self, ticket_id: &str) -> Result<TesseraError> {
        let current = self
            .tickets
            .find_by_id(ticket_id)
            .await?
            .ok_or_else(|| TesseraError::not_found("Order", ticket_id))?;
        Ok(TesseraError::conflict(format!(
            "Order already decided: status is {}",
            current.status.as_str()
        )))
    }

    /// Pending orders across every event the caller manages.
    pub async fn pending_orders(&self, auth: &AuthContext) -> Result<Vec<Ticket>> {
        checks::require_staff(auth)?;

        let events = if auth.is_admin() {
            // limit 0 = unbounded
            self.events.find_filtered(None, None, 0).await?
        } else {
            self.events.find_by_organizer(&auth.user_id).await?
        };

        let event_ids: Vec<String> = events.into_iter().map(|e| e.id).collect();
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.tickets.find_pending_orders(&event_ids).await
    }
}
