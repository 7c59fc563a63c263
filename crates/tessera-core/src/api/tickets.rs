//! Tickets API
//!
//! Participant ticket listing and the manual attendance fallback for staff
//! without a scanner.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::middleware::Authenticated;
use crate::domain::{Ticket, VariantSelector};
use crate::error::TesseraError;
use crate::service::{checks, CheckInService, RegistrationService};

/// Ticket response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub id: String,
    pub ticket_code: String,
    pub event_id: String,
    pub user_id: String,
    pub team_id: Option<String>,
    pub ticket_type: String,
    pub status: String,
    #[schema(value_type = Object)]
    pub form_data: serde_json::Value,
    pub variant: Option<VariantSelector>,
    pub quantity: Option<u32>,
    pub payment_proof_url: Option<String>,
    pub qr_credential: Option<String>,
    pub attended: bool,
    pub attendance_timestamp: Option<String>,
    pub created_at: String,
}

impl From<Ticket> for TicketResponse {
    fn from(t: Ticket) -> Self {
        Self {
            id: t.id,
            ticket_code: t.ticket_code,
            event_id: t.event_id,
            user_id: t.user_id,
            team_id: t.team_id,
            ticket_type: t.ticket_type.as_str().to_string(),
            status: t.status.as_str().to_string(),
            form_data: serde_json::Value::Object(t.form_data),
            variant: t.variant,
            quantity: t.quantity,
            payment_proof_url: t.payment_proof_url,
            qr_credential: t.qr_credential,
            attended: t.attended,
            attendance_timestamp: t.attendance_timestamp.map(|ts| ts.to_rfc3339()),
            created_at: t.created_at.to_rfc3339(),
        }
    }
}

/// Tickets service state
#[derive(Clone)]
pub struct TicketsState {
    pub registration: Arc<RegistrationService>,
    pub checkin: Arc<CheckInService>,
}

/// List the caller's tickets, newest first
#[utoipa::path(
    get,
    path = "/mine",
    tag = "tickets",
    responses(
        (status = 200, description = "Caller's tickets", body = Vec<TicketResponse>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_tickets(
    State(state): State<TicketsState>,
    auth: Authenticated,
) -> Result<Json<Vec<TicketResponse>>, TesseraError> {
    let tickets = state.registration.my_tickets(&auth.0.user_id).await?;
    Ok(Json(tickets.into_iter().map(Into::into).collect()))
}

/// Manually mark a ticket attended (staff fallback without a scanner)
#[utoipa::path(
    put,
    path = "/{id}/attend",
    tag = "tickets",
    params(
        ("id" = String, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Attendance marked", body = TicketResponse),
        (status = 404, description = "Ticket not found"),
        (status = 409, description = "Duplicate scan or invalid ticket status")
    ),
    security(("bearer_auth" = []))
)]
pub async fn manual_attend(
    State(state): State<TicketsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<TicketResponse>, TesseraError> {
    checks::require_staff(&auth.0)?;

    let ticket = state.checkin.manual_mark_attendance(&auth.0, &id).await?;
    Ok(Json(ticket.into()))
}

/// Create tickets router
pub fn tickets_router(state: TicketsState) -> Router {
    Router::new()
        .route("/mine", get(my_tickets))
        .route("/:id/attend", put(manual_attend))
        .with_state(state)
}
