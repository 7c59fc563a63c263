//! Event Catalog Service
//!
//! Owns event lifecycle and mutation rules: status transitions along the
//! DAG, per-status editable-field allow-lists, the announce side effect on
//! publishing, deletion guards, and the attendance aggregation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::{Event, EventField, EventStatus, EventType, FormField, Variant};
use crate::error::{Result, TesseraError};
use crate::repository::{EventRepository, TicketRepository};
use crate::service::authorization::{checks, AuthContext};
use crate::service::notify::Notifier;

/// Partial update; absent fields stay untouched. Each provided field is
/// checked against the current status's allow-list before anything is
/// written.
#[derive(Debug, Default)]
pub struct EventUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub capacity_limit: Option<u32>,
    pub form_fields: Option<Vec<FormField>>,
    pub price: Option<f64>,
    pub total_stock: Option<u32>,
    pub purchase_limit_per_user: Option<u32>,
    pub variants: Option<Vec<Variant>>,
    pub min_team_size: Option<u32>,
    pub max_team_size: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct AttendanceSummary {
    pub confirmed: u64,
    pub attended: u64,
}

#[derive(Clone)]
pub struct EventCatalogService {
    events: Arc<EventRepository>,
    tickets: Arc<TicketRepository>,
    notifier: Notifier,
}

impl EventCatalogService {
    pub fn new(
        events: Arc<EventRepository>,
        tickets: Arc<TicketRepository>,
        notifier: Notifier,
    ) -> Self {
        Self {
            events,
            tickets,
            notifier,
        }
    }

    pub async fn create(&self, auth: &AuthContext, event: Event) -> Result<Event> {
        checks::require_staff(auth)?;

        if event.name.trim().is_empty() {
            return Err(TesseraError::validation("Event name is required"));
        }
        if event.event_type == EventType::Merchandise && event.purchase_limit_per_user == 0 {
            return Err(TesseraError::validation(
                "Purchase limit must be at least 1",
            ));
        }
        if let (Some(min), Some(max)) = (event.min_team_size, event.max_team_size) {
            if min == 0 || min > max {
                return Err(TesseraError::validation(
                    "Team size bounds must satisfy 1 <= min <= max",
                ));
            }
        }

        self.events.insert(&event).await?;
        info!(event_id = %event.id, name = %event.name, "Event created");
        Ok(event)
    }

    pub async fn get(&self, event_id: &str) -> Result<Event> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| TesseraError::not_found("Event", event_id))
    }

    pub async fn list(
        &self,
        event_type: Option<EventType>,
        status: Option<EventStatus>,
        limit: i64,
    ) -> Result<Vec<Event>> {
        self.events.find_filtered(event_type, status, limit).await
    }

    pub async fn update(
        &self,
        auth: &AuthContext,
        event_id: &str,
        update: EventUpdate,
    ) -> Result<Event> {
        let mut event = self.get(event_id).await?;
        checks::can_manage_event(auth, &event)?;

        apply_field(&mut event, EventField::Name, update.name, |e, v| e.name = v)?;
        apply_field(&mut event, EventField::Description, update.description, |e, v| {
            e.description = v
        })?;
        apply_field(&mut event, EventField::Schedule, update.start_date, |e, v| {
            e.start_date = Some(v)
        })?;
        apply_field(&mut event, EventField::Schedule, update.end_date, |e, v| {
            e.end_date = Some(v)
        })?;
        apply_field(
            &mut event,
            EventField::RegistrationDeadline,
            update.registration_deadline,
            |e, v| e.registration_deadline = Some(v),
        )?;
        apply_field(
            &mut event,
            EventField::CapacityLimit,
            update.capacity_limit,
            |e, v| e.capacity_limit = Some(v),
        )?;
        apply_field(&mut event, EventField::FormFields, update.form_fields, |e, v| {
            e.form_fields = v
        })?;
        apply_field(&mut event, EventField::Price, update.price, |e, v| {
            e.price = Some(v)
        })?;
        apply_field(&mut event, EventField::Stock, update.total_stock, |e, v| {
            e.total_stock = Some(v)
        })?;
        apply_field(
            &mut event,
            EventField::PurchaseLimit,
            update.purchase_limit_per_user,
            |e, v| e.purchase_limit_per_user = v,
        )?;
        apply_field(&mut event, EventField::Variants, update.variants, |e, v| {
            e.variants = v
        })?;
        apply_field(&mut event, EventField::TeamSize, update.min_team_size, |e, v| {
            e.min_team_size = Some(v)
        })?;
        apply_field(&mut event, EventField::TeamSize, update.max_team_size, |e, v| {
            e.max_team_size = Some(v)
        })?;

        event.updated_at = Utc::now();
        self.events.update(&event).await?;
        Ok(event)
    }

    /// Transition along the DAG; publishing a draft announces the event.
    pub async fn transition(
        &self,
        auth: &AuthContext,
        event_id: &str,
        target: EventStatus,
    ) -> Result<Event> {
        let event = self.get(event_id).await?;
        checks::can_manage_event(auth, &event)?;

        let current = event.status;
        if !current.can_transition_to(target) {
            return Err(TesseraError::state(format!(
                "Cannot transition event from {} to {}",
                current.as_str(),
                target.as_str()
            )));
        }

        let updated = self
            .events
            .transition(event_id, current, target)
            .await?
            .ok_or_else(|| {
                TesseraError::conflict("Event status changed concurrently; reload and retry")
            })?;

        info!(event_id, from = current.as_str(), to = target.as_str(), "Event transitioned");

        if current == EventStatus::Draft && target == EventStatus::Published {
            self.notifier.event_announced(&updated);
        }

        Ok(updated)
    }

    /// Deletion is refused once registrations exist: live tickets must not
    /// be orphaned.
    pub async fn delete(&self, auth: &AuthContext, event_id: &str) -> Result<()> {
        let event = self.get(event_id).await?;
        checks::can_manage_event(auth, &event)?;

        let ticket_count = self.tickets.count_by_event(event_id).await?;
        if ticket_count > 0 {
            return Err(TesseraError::state(
                "Cannot delete an event that has registrations",
            ));
        }

        self.events.delete(event_id).await?;
        info!(event_id, "Event deleted");
        Ok(())
    }

    pub async fn attendance(
        &self,
        auth: &AuthContext,
        event_id: &str,
    ) -> Result<AttendanceSummary> {
        let event = self.get(event_id).await?;
        checks::can_manage_event(auth, &event)?;

        Ok(AttendanceSummary {
            confirmed: self.tickets.count_confirmed(event_id).await?,
            attended: self.tickets.count_attended(event_id).await?,
        })
    }
}

fn apply_field<T>(
    event: &mut Event,
    field: EventField,
    value: Option<T>,
    set: impl FnOnce(&mut Event, T),
) -> Result<()> {
    if let Some(v) = value {
        if !event.can_edit(field) {
            return Err(TesseraError::state(format!(
                "Field cannot be edited while event is {}",
                event.status.as_str()
            )));
        }
        set(event, v);
    }
    Ok(())
}
