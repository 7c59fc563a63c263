//! Events API
//!
//! REST endpoints for the event catalog, participant registration,
//! merchandise ordering, QR scanning, and attendance aggregation.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::api::common::{PaginationParams, SuccessResponse};
use crate::api::middleware::Authenticated;
use crate::api::tickets::TicketResponse;
use crate::domain::{Event, EventStatus, EventType, FormField, Variant, VariantSelector};
use crate::error::TesseraError;
use crate::service::{
    checks, CheckInService, EventCatalogService, EventUpdate, RegistrationService,
};

/// Create event request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub event_type: EventType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_deadline: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_limit: Option<u32>,

    #[serde(default)]
    pub form_fields: Vec<FormField>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_stock: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_limit_per_user: Option<u32>,

    #[serde(default)]
    pub variants: Vec<Variant>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_team_size: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_team_size: Option<u32>,
}

/// Update event request; absent fields stay untouched. A provided status
/// is applied as a lifecycle transition after the field edits.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
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
    pub status: Option<EventStatus>,
}

impl UpdateEventRequest {
    fn has_field_edits(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
            || self.registration_deadline.is_some()
            || self.capacity_limit.is_some()
            || self.form_fields.is_some()
            || self.price.is_some()
            || self.total_stock.is_some()
            || self.purchase_limit_per_user.is_some()
            || self.variants.is_some()
            || self.min_team_size.is_some()
            || self.max_team_size.is_some()
    }
}

/// Event response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub event_type: String,
    pub status: String,
    pub organizer_id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub registration_deadline: Option<String>,
    pub capacity_limit: Option<u32>,
    pub registration_count: u32,
    pub form_fields: Vec<FormField>,
    pub form_locked: bool,
    pub price: Option<f64>,
    pub total_stock: Option<u32>,
    pub purchase_limit_per_user: u32,
    pub variants: Vec<Variant>,
    pub min_team_size: Option<u32>,
    pub max_team_size: Option<u32>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Event> for EventResponse {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            name: e.name,
            description: e.description,
            event_type: e.event_type.as_str().to_string(),
            status: e.status.as_str().to_string(),
            organizer_id: e.organizer_id,
            start_date: e.start_date.map(|d| d.to_rfc3339()),
            end_date: e.end_date.map(|d| d.to_rfc3339()),
            registration_deadline: e.registration_deadline.map(|d| d.to_rfc3339()),
            capacity_limit: e.capacity_limit,
            registration_count: e.registration_count,
            form_fields: e.form_fields,
            form_locked: e.form_locked,
            price: e.price,
            total_stock: e.total_stock,
            purchase_limit_per_user: e.purchase_limit_per_user,
            variants: e.variants,
            min_team_size: e.min_team_size,
            max_team_size: e.max_team_size,
            created_at: e.created_at.to_rfc3339(),
            updated_at: e.updated_at.to_rfc3339(),
        }
    }
}

/// Query parameters for events list
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EventsQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,

    /// Filter by event type
    pub event_type: Option<EventType>,

    /// Filter by status
    pub status: Option<EventStatus>,
}

/// Register request with the participant's answers to the custom form
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub form_data: serde_json::Map<String, serde_json::Value>,
}

/// Merchandise order request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MerchOrderRequest {
    pub variant: Option<VariantSelector>,

    #[serde(default = "default_quantity")]
    pub quantity: u32,

    /// URL of the uploaded payment proof (file storage is external)
    pub payment_proof_url: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

/// Scan request: a full signed credential or a bare ticket code
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub ticket_id: String,

    /// When supplied, the ticket must belong to this event
    pub event_id: Option<String>,
}

/// Attendance aggregation response
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceResponse {
    pub confirmed: u64,
    pub attended: u64,
}

/// Events service state
#[derive(Clone)]
pub struct EventsState {
    pub catalog: Arc<EventCatalogService>,
    pub registration: Arc<RegistrationService>,
    pub checkin: Arc<CheckInService>,
}

/// Create a new event (starts in Draft)
#[utoipa::path(
    post,
    path = "",
    tag = "events",
    request_body = CreateEventRequest,
    responses(
        (status = 200, description = "Event created", body = EventResponse),
        (status = 403, description = "Organizer or admin role required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_event(
    State(state): State<EventsState>,
    auth: Authenticated,
    Json(req): Json<CreateEventRequest>,
) -> Result<Json<EventResponse>, TesseraError> {
    let mut event = Event::new(req.name, req.event_type, &auth.0.user_id)
        .with_description(req.description)
        .with_schedule(req.start_date, req.end_date, req.registration_deadline)
        .with_form_fields(req.form_fields)
        .with_variants(req.variants);

    if let Some(limit) = req.capacity_limit {
        event = event.with_capacity_limit(limit);
    }
    if req.event_type == EventType::Merchandise {
        event = event.with_stock(req.total_stock, req.purchase_limit_per_user.unwrap_or(1));
        event.price = req.price;
    }
    if let (Some(min), Some(max)) = (req.min_team_size, req.max_team_size) {
        event = event.with_team_size(min, max);
    }

    let created = state.catalog.create(&auth.0, event).await?;
    Ok(Json(created.into()))
}

/// List events
#[utoipa::path(
    get,
    path = "",
    tag = "events",
    params(EventsQuery),
    responses(
        (status = 200, description = "List of events", body = Vec<EventResponse>)
    )
)]
pub async fn list_events(
    State(state): State<EventsState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<EventResponse>>, TesseraError> {
    let events = state
        .catalog
        .list(query.event_type, query.status, query.pagination.limit as i64)
        .await?;
    Ok(Json(events.into_iter().map(Into::into).collect()))
}

/// Get event by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "events",
    params(
        ("id" = String, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event found", body = EventResponse),
        (status = 404, description = "Event not found")
    )
)]
pub async fn get_event(
    State(state): State<EventsState>,
    Path(id): Path<String>,
) -> Result<Json<EventResponse>, TesseraError> {
    let event = state.catalog.get(&id).await?;
    Ok(Json(event.into()))
}

/// Update an event within the current status's editable-field set
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "events",
    params(
        ("id" = String, Path, description = "Event ID")
    ),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = EventResponse),
        (status = 403, description = "Not the owning organizer"),
        (status = 409, description = "Field not editable in the current status")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_event(
    State(state): State<EventsState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<EventResponse>, TesseraError> {
    let mut event = if req.has_field_edits() {
        let update = EventUpdate {
            name: req.name,
            description: req.description,
            start_date: req.start_date,
            end_date: req.end_date,
            registration_deadline: req.registration_deadline,
            capacity_limit: req.capacity_limit,
            form_fields: req.form_fields,
            price: req.price,
            total_stock: req.total_stock,
            purchase_limit_per_user: req.purchase_limit_per_user,
            variants: req.variants,
            min_team_size: req.min_team_size,
            max_team_size: req.max_team_size,
        };
        state.catalog.update(&auth.0, &id, update).await?
    } else {
        state.catalog.get(&id).await?
    };

    if let Some(target) = req.status {
        if target != event.status {
            event = state.catalog.transition(&auth.0, &id, target).await?;
        }
    }

    Ok(Json(event.into()))
}

/// Delete an event (refused once registrations exist)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "events",
    params(
        ("id" = String, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event deleted", body = SuccessResponse),
        (status = 409, description = "Event has registrations")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_event(
    State(state): State<EventsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, TesseraError> {
    state.catalog.delete(&auth.0, &id).await?;
    Ok(Json(SuccessResponse::with_message("Event deleted")))
}

/// Register the caller for an event
#[utoipa::path(
    post,
    path = "/{id}/register",
    tag = "events",
    params(
        ("id" = String, Path, description = "Event ID")
    ),
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Ticket confirmed", body = TicketResponse),
        (status = 409, description = "Duplicate registration or event at capacity")
    ),
    security(("bearer_auth" = []))
)]
pub async fn register(
    State(state): State<EventsState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<TicketResponse>, TesseraError> {
    checks::require_participant(&auth.0)?;

    let ticket = state
        .registration
        .register(&auth.0.user_id, &id, req.form_data)
        .await?;
    Ok(Json(ticket.into()))
}

/// Place a merchandise order (pending organizer approval)
#[utoipa::path(
    post,
    path = "/{id}/merch-order",
    tag = "events",
    params(
        ("id" = String, Path, description = "Event ID")
    ),
    request_body = MerchOrderRequest,
    responses(
        (status = 200, description = "Order placed", body = TicketResponse),
        (status = 409, description = "Purchase limit or stock exceeded")
    ),
    security(("bearer_auth" = []))
)]
pub async fn order_merchandise(
    State(state): State<EventsState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(req): Json<MerchOrderRequest>,
) -> Result<Json<TicketResponse>, TesseraError> {
    checks::require_participant(&auth.0)?;

    let ticket = state
        .registration
        .order_merchandise(
            &auth.0.user_id,
            &id,
            req.variant,
            req.quantity,
            req.payment_proof_url,
        )
        .await?;
    Ok(Json(ticket.into()))
}

/// Check in a ticket from scanner input
#[utoipa::path(
    post,
    path = "/scan-qr",
    tag = "events",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Attendance marked", body = TicketResponse),
        (status = 403, description = "Ticket belongs to another organizer's event"),
        (status = 409, description = "Duplicate scan")
    ),
    security(("bearer_auth" = []))
)]
pub async fn scan_qr(
    State(state): State<EventsState>,
    auth: Authenticated,
    Json(req): Json<ScanRequest>,
) -> Result<Json<TicketResponse>, TesseraError> {
    checks::require_staff(&auth.0)?;

    let ticket = state
        .checkin
        .scan(&auth.0, &req.ticket_id, req.event_id.as_deref())
        .await?;
    Ok(Json(ticket.into()))
}

/// Attendance aggregation for one event
#[utoipa::path(
    get,
    path = "/{id}/attendance",
    tag = "events",
    params(
        ("id" = String, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Attendance summary", body = AttendanceResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn attendance(
    State(state): State<EventsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<AttendanceResponse>, TesseraError> {
    let summary = state.catalog.attendance(&auth.0, &id).await?;
    Ok(Json(AttendanceResponse {
        confirmed: summary.confirmed,
        attended: summary.attended,
    }))
}

/// Create events router
pub fn events_router(state: EventsState) -> Router {
    Router::new()
        .route("/", post(create_event).get(list_events))
        .route("/scan-qr", post(scan_qr))
        .route(
            "/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/:id/register", post(register))
        .route("/:id/merch-order", post(order_merchandise))
        .route("/:id/attendance", get(attendance))
        .with_state(state)
}
