//! Service Layer
//!
//! Business logic for the registration and ticket lifecycle engine:
//! catalog management, registration, team formation, order approval,
//! check-in, plus the shared authorization capability, credential signing,
//! and fire-and-forget notifications.

pub mod authorization;
pub mod credential;
pub mod notify;
pub mod catalog;
pub mod registration;
pub mod team;
pub mod approval;
pub mod checkin;

pub use authorization::{AuthContext, Role, checks};
pub use credential::{CredentialSigner, QrPayload};
pub use notify::Notifier;
pub use catalog::{EventCatalogService, EventUpdate, AttendanceSummary};
pub use registration::RegistrationService;
pub use team::TeamService;
pub use approval::{ApprovalService, Decision};
pub use checkin::CheckInService;
