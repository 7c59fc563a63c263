//! Registration Service
//!
//! Issues tickets for single participants: confirmed registrations for
//! normal events and pending merchandise orders. The capacity claim is an
//! atomic slot reservation; the (event, user) uniqueness race is closed by
//! the storage index, with a compensating release when the insert loses.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::{Event, EventType, Ticket, VariantSelector};
use crate::error::{Result, TesseraError};
use crate::repository::{EventRepository, TicketRepository};
use crate::service::credential::{CredentialSigner, QrPayload};
use crate::service::notify::Notifier;

#[derive(Clone)]
pub struct RegistrationService {
    events: Arc<EventRepository>,
    tickets: Arc<TicketRepository>,
    signer: Arc<CredentialSigner>,
    notifier: Notifier,
}

impl RegistrationService {
    pub fn new(
        events: Arc<EventRepository>,
        tickets: Arc<TicketRepository>,
        signer: Arc<CredentialSigner>,
        notifier: Notifier,
    ) -> Self {
        Self {
            events,
            tickets,
            signer,
            notifier,
        }
    }

    /// Register one participant for a normal event. On success the ticket
    /// is Confirmed with a signed credential attached.
    pub async fn register(
        &self,
        user_id: &str,
        event_id: &str,
        form_data: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Ticket> {
        let event = self.load_event(event_id).await?;

        match event.event_type {
            EventType::Normal => {}
            EventType::Merchandise => {
                return Err(TesseraError::validation(
                    "Merchandise events take orders, not registrations",
                ));
            }
            EventType::TeamCompetition => {
                return Err(TesseraError::validation(
                    "Team competition events are registered through teams",
                ));
            }
        }

        self.check_open(&event)?;
        event.validate_form_data(&form_data)?;

        // Claim a slot before inserting; capacity can never oversell. The
        // insert below may still lose the (event, user) uniqueness race, in
        // which case the claimed slot is handed back.
        self.reserve_one(&event).await?;

        let ticket = Ticket::new_registration(event_id, user_id, form_data);
        let credential = self.signer.sign(&QrPayload {
            ticket_code: ticket.ticket_code.clone(),
            event_name: event.name.clone(),
            team_name: None,
        })?;
        let ticket = ticket.with_credential(credential);

        if let Err(e) = self.tickets.insert(&ticket).await {
            self.events.release_slots(event_id, 1).await?;
            return match e {
                TesseraError::Conflict { .. } => Err(TesseraError::conflict(
                    "Already registered for this event",
                )),
                other => Err(other),
            };
        }

        info!(
            event_id,
            user_id,
            ticket_code = %ticket.ticket_code,
            "Registration confirmed"
        );
        self.notifier.ticket_confirmed(&ticket, &event.name);

        Ok(ticket)
    }

    /// Place a merchandise order. The order is accepted (and counted)
    /// immediately, but stock is only committed at approval time; the
    /// stock check here is advisory so obvious oversells fail fast.
    pub async fn order_merchandise(
        &self,
        user_id: &str,
        event_id: &str,
        variant: Option<VariantSelector>,
        quantity: u32,
        payment_proof_url: Option<String>,
    ) -> Result<Ticket> {
        let event = self.load_event(event_id).await?;

        if event.event_type != EventType::Merchandise {
            return Err(TesseraError::validation("Not a merchandise event"));
        }
        self.check_open(&event)?;

        if quantity == 0 {
            return Err(TesseraError::validation("Quantity must be at least 1"));
        }

        if let Some(selector) = &variant {
            if event.variants.is_empty() {
                return Err(TesseraError::validation(
                    "This event does not sell variants",
                ));
            }
            let known = event.find_variant(selector).ok_or_else(|| {
                TesseraError::validation(format!(
                    "Unknown variant '{} {} {}'",
                    selector.name, selector.size, selector.color
                ))
            })?;
            if known.stock < quantity {
                return Err(TesseraError::capacity(format!(
                    "Insufficient stock for variant '{} {} {}'",
                    selector.name, selector.size, selector.color
                )));
            }
        } else if !event.variants.is_empty() {
            return Err(TesseraError::validation("A variant must be selected"));
        }

        // Purchase limit counts every non-rejected order, pending included.
        let already_ordered = self.tickets.ordered_quantity(event_id, user_id).await?;
        if already_ordered + quantity > event.purchase_limit_per_user {
            return Err(TesseraError::capacity(format!(
                "Purchase limit is {} per user; {} already ordered",
                event.purchase_limit_per_user, already_ordered
            )));
        }

        if let Some(total) = event.total_stock {
            if total < quantity {
                return Err(TesseraError::capacity("Insufficient stock"));
            }
        }

        self.reserve_one(&event).await?;

        let ticket =
            Ticket::new_merch_order(event_id, user_id, variant, quantity, payment_proof_url);

        if let Err(e) = self.tickets.insert(&ticket).await {
            self.events.release_slots(event_id, 1).await?;
            return Err(e);
        }

        info!(
            event_id,
            user_id,
            ticket_code = %ticket.ticket_code,
            quantity,
            "Merchandise order placed"
        );

        Ok(ticket)
    }

    pub async fn my_tickets(&self, user_id: &str) -> Result<Vec<Ticket>> {
        self.tickets.find_by_user(user_id).await
    }

    async fn load_event(&self, event_id: &str) -> Result<Event> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| TesseraError::not_found("Event", event_id))
    }

    fn check_open(&self, event: &Event) -> Result<()> {
        if !event.is_open() {
            return Err(TesseraError::state(format!(
                "Event is {} and not open for registration",
                event.status.as_str()
            )));
        }
        if !event.registration_open_at(Utc::now()) {
            return Err(TesseraError::state("Registration deadline has passed"));
        }
        Ok(())
    }

    /// Claim one slot; on failure re-read the event to report the precise
    /// failure (the document may have closed or filled since the load).
    async fn reserve_one(&self, event: &Event) -> Result<()> {
        if self.events.reserve_slots(&event.id, 1).await?.is_some() {
            return Ok(());
        }

        match self.events.find_by_id(&event.id).await? {
            None => Err(TesseraError::not_found("Event", &event.id)),
            Some(current) if !current.is_open() => Err(TesseraError::state(format!(
                "Event is {} and not open for registration",
                current.status.as_str()
            ))),
            Some(_) => Err(TesseraError::capacity("Event is at capacity")),
        }
    }
}
