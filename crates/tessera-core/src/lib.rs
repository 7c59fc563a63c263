//! Tessera Core
//!
//! Registration and ticket lifecycle engine:
//! - Event catalog with capacity/stock counters and status lifecycle
//! - Participant registration and merchandise ordering
//! - Team formation for team-based competitions
//! - Organizer approval workflow for merchandise orders
//! - Scannable ticket credentials and idempotent check-in

pub mod domain;
pub mod repository;
pub mod service;
pub mod api;
pub mod error;
pub mod token;

pub use domain::*;
pub use error::TesseraError;
pub use token::{TicketCode, InviteCode};
