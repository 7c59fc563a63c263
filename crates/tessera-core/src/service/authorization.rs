//! Authorization
//!
//! Verified caller identity plus the single reusable "can manage event"
//! capability. Every organizer-facing operation (order review, check-in,
//! event mutation) goes through the same check instead of repeating the
//! role/ownership comparison inline.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Event;
use crate::error::{Result, TesseraError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Participant,
    Organizer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Organizer => "organizer",
            Self::Admin => "admin",
        }
    }
}

/// Verified caller identity, built by the auth middleware from a validated
/// bearer token. Token issuance belongs to the external auth service.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub name: String,
    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Organizer | Role::Admin)
    }

    /// Admins manage every event; organizers only their own.
    pub fn can_manage_event(&self, event: &Event) -> bool {
        self.is_admin() || (self.role == Role::Organizer && event.organizer_id == self.user_id)
    }
}

/// Authorization checks shared across services and API handlers.
pub mod checks {
    use super::*;

    pub fn require_participant(auth: &AuthContext) -> Result<()> {
        if auth.role == Role::Participant {
            Ok(())
        } else {
            Err(TesseraError::forbidden("Participant role required"))
        }
    }

    pub fn require_staff(auth: &AuthContext) -> Result<()> {
        if auth.is_staff() {
            Ok(())
        } else {
            Err(TesseraError::forbidden("Organizer or admin role required"))
        }
    }

    /// The error names the owning event so a legitimate operator scanning
    /// the wrong ticket sees exactly what happened, rather than a 404.
    pub fn can_manage_event(auth: &AuthContext, event: &Event) -> Result<()> {
        if auth.can_manage_event(event) {
            Ok(())
        } else {
            Err(TesseraError::forbidden(format!(
                "Not authorized to manage event '{}'",
                event.name
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventType;

    fn ctx(user_id: &str, role: Role) -> AuthContext {
        AuthContext {
            user_id: user_id.to_string(),
            name: "Test User".to_string(),
            role,
        }
    }

    #[test]
    fn test_admin_manages_any_event() {
        let event = Event::new("Hacknight", EventType::Normal, "org-1");
        assert!(ctx("someone-else", Role::Admin).can_manage_event(&event));
    }

    #[test]
    fn test_organizer_manages_only_own_events() {
        let event = Event::new("Hacknight", EventType::Normal, "org-1");
        assert!(ctx("org-1", Role::Organizer).can_manage_event(&event));
        assert!(!ctx("org-2", Role::Organizer).can_manage_event(&event));
    }

    #[test]
    fn test_participant_manages_nothing() {
        let event = Event::new("Hacknight", EventType::Normal, "user-1");
        assert!(!ctx("user-1", Role::Participant).can_manage_event(&event));
    }

    #[test]
    fn test_cross_organizer_error_names_event() {
        let event = Event::new("Robotics Finale", EventType::Normal, "org-1");
        let err = checks::can_manage_event(&ctx("org-2", Role::Organizer), &event).unwrap_err();
        assert!(err.to_string().contains("Robotics Finale"));
    }
}
