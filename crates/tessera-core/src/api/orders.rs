//! Merchandise Orders API
//!
//! Organizer/admin review of pending merchandise orders.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::middleware::Authenticated;
use crate::api::tickets::TicketResponse;
use crate::error::TesseraError;
use crate::service::{ApprovalService, Decision};

/// Review request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOrderRequest {
    /// `approve` or `reject`
    pub action: String,
}

/// Orders service state
#[derive(Clone)]
pub struct OrdersState {
    pub approval: Arc<ApprovalService>,
}

/// List pending orders across the caller's events
#[utoipa::path(
    get,
    path = "",
    tag = "orders",
    responses(
        (status = 200, description = "Pending merchandise orders", body = Vec<TicketResponse>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_pending_orders(
    State(state): State<OrdersState>,
    auth: Authenticated,
) -> Result<Json<Vec<TicketResponse>>, TesseraError> {
    let orders = state.approval.pending_orders(&auth.0).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// Approve or reject a pending order
#[utoipa::path(
    put,
    path = "/{ticket_id}",
    tag = "orders",
    params(
        ("ticket_id" = String, Path, description = "Order ticket ID")
    ),
    request_body = ReviewOrderRequest,
    responses(
        (status = 200, description = "Order decided", body = TicketResponse),
        (status = 403, description = "Not the owning organizer"),
        (status = 409, description = "Order already decided or stock exhausted")
    ),
    security(("bearer_auth" = []))
)]
pub async fn review_order(
    State(state): State<OrdersState>,
    auth: Authenticated,
    Path(ticket_id): Path<String>,
    Json(req): Json<ReviewOrderRequest>,
) -> Result<Json<TicketResponse>, TesseraError> {
    let decision = match req.action.as_str() {
        "approve" => Decision::Approve,
        "reject" => Decision::Reject,
        other => {
            return Err(TesseraError::validation(format!(
                "Unknown action '{}'; expected approve or reject",
                other
            )))
        }
    };

    let ticket = state.approval.review(&auth.0, &ticket_id, decision).await?;
    Ok(Json(ticket.into()))
}

/// Create orders router
pub fn orders_router(state: OrdersState) -> Router {
    Router::new()
        .route("/", get(list_pending_orders))
        .route("/:ticket_id", put(review_order))
        .with_state(state)
}
