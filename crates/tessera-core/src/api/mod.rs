//! API Layer
//!
//! REST API endpoints for the registration and ticket lifecycle engine.

pub mod common;
pub mod middleware;

pub mod events;
pub mod teams;
pub mod orders;
pub mod tickets;
pub mod openapi;

pub use common::*;
pub use middleware::{AppState, Authenticated, TokenVerifier};

pub use events::{events_router, EventsState};
pub use teams::{teams_router, TeamsState};
pub use orders::{orders_router, OrdersState};
pub use tickets::{tickets_router, TicketsState};
pub use openapi::ApiDoc;
