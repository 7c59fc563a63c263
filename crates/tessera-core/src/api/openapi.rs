//! OpenAPI Documentation

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::{common, events, orders, teams, tickets};
use crate::domain::{
    EventStatus, EventType, FormField, FormFieldType, TicketStatus, TicketType, Variant,
    VariantSelector,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tessera API",
        description = "Registration and ticket lifecycle engine"
    ),
    paths(
        events::create_event,
        events::list_events,
        events::get_event,
        events::update_event,
        events::delete_event,
        events::register,
        events::order_merchandise,
        events::scan_qr,
        events::attendance,
        teams::create_team,
        teams::join_team,
        teams::my_teams,
        teams::register_team,
        teams::leave_team,
        teams::delete_team,
        orders::list_pending_orders,
        orders::review_order,
        tickets::my_tickets,
        tickets::manual_attend,
    ),
    components(schemas(
        common::ApiError,
        common::SuccessResponse,
        common::CreatedResponse,
        events::CreateEventRequest,
        events::UpdateEventRequest,
        events::EventResponse,
        events::RegisterRequest,
        events::MerchOrderRequest,
        events::ScanRequest,
        events::AttendanceResponse,
        teams::CreateTeamRequest,
        teams::JoinTeamRequest,
        teams::TeamResponse,
        teams::RegisterTeamResponse,
        orders::ReviewOrderRequest,
        tickets::TicketResponse,
        EventType,
        EventStatus,
        FormField,
        FormFieldType,
        Variant,
        VariantSelector,
        TicketType,
        TicketStatus,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "events", description = "Event catalog, registration, and check-in"),
        (name = "teams", description = "Team formation and registration"),
        (name = "orders", description = "Merchandise order approval"),
        (name = "tickets", description = "Participant tickets and manual attendance"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
