//! Engine Integration Tests
//!
//! Tests for domain rules, credentials, authorization, and error handling.

use chrono::{Duration, Utc};

use tessera_core::domain::{
    Event, EventField, EventStatus, EventType, FormField, FormFieldType, Team, TeamStatus, Ticket,
    TicketStatus, Variant, VariantSelector,
};
use tessera_core::service::authorization::{checks, AuthContext, Role};
use tessera_core::service::{CredentialSigner, QrPayload};
use tessera_core::{InviteCode, TesseraError, TicketCode};

fn participant(id: &str) -> AuthContext {
    AuthContext {
        user_id: id.to_string(),
        name: "Participant".to_string(),
        role: Role::Participant,
    }
}

fn organizer(id: &str) -> AuthContext {
    AuthContext {
        user_id: id.to_string(),
        name: "Organizer".to_string(),
        role: Role::Organizer,
    }
}

fn admin() -> AuthContext {
    AuthContext {
        user_id: "admin-1".to_string(),
        name: "Admin".to_string(),
        role: Role::Admin,
    }
}

// Event lifecycle tests
mod event_lifecycle_tests {
    use super::*;

    #[test]
    fn test_new_event_starts_draft_and_unlocked() {
        let event = Event::new("Hacknight", EventType::Normal, "org-1");
        assert_eq!(event.status, EventStatus::Draft);
        assert!(!event.form_locked);
        assert_eq!(event.registration_count, 0);
        assert!(!event.is_open());
    }

    #[test]
    fn test_only_published_and_ongoing_accept_registrations() {
        let mut event = Event::new("Hacknight", EventType::Normal, "org-1");
        for (status, open) in [
            (EventStatus::Draft, false),
            (EventStatus::Published, true),
            (EventStatus::Ongoing, true),
            (EventStatus::Completed, false),
            (EventStatus::Closed, false),
        ] {
            event.status = status;
            assert_eq!(event.is_open(), open, "status {:?}", status);
        }
    }

    #[test]
    fn test_closed_is_terminal() {
        use EventStatus::*;
        for target in [Draft, Published, Ongoing, Completed, Closed] {
            assert!(!Closed.can_transition_to(target));
        }
    }

    #[test]
    fn test_published_restricts_edits_to_allow_list() {
        let mut event = Event::new("Hacknight", EventType::Normal, "org-1");
        event.status = EventStatus::Published;

        for field in [
            EventField::Description,
            EventField::RegistrationDeadline,
            EventField::CapacityLimit,
        ] {
            assert!(event.can_edit(field), "{:?} should be editable", field);
        }
        for field in [
            EventField::Name,
            EventField::Schedule,
            EventField::FormFields,
            EventField::Stock,
            EventField::Variants,
            EventField::TeamSize,
        ] {
            assert!(!event.can_edit(field), "{:?} should be frozen", field);
        }
    }

    #[test]
    fn test_deadline_boundary_is_closed() {
        let deadline = Utc::now();
        let event = Event::new("Talk", EventType::Normal, "org-1").with_schedule(
            None,
            None,
            Some(deadline),
        );
        // At the exact deadline instant registration is already closed
        assert!(!event.registration_open_at(deadline));
        assert!(event.registration_open_at(deadline - Duration::seconds(1)));
    }
}

// Credential tests
mod credential_tests {
    use super::*;

    #[test]
    fn test_credential_binds_ticket_event_and_team() {
        let signer = CredentialSigner::new("secret");
        let payload = QrPayload {
            ticket_code: TicketCode::generate(),
            event_name: "RoboWars".to_string(),
            team_name: Some("Crustaceans".to_string()),
        };

        let credential = signer.sign(&payload).unwrap();
        let decoded = signer.verify(&credential).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_credential_rejects_any_byte_flip() {
        let signer = CredentialSigner::new("secret");
        let credential = signer
            .sign(&QrPayload {
                ticket_code: "TKT-0123456789".to_string(),
                event_name: "RoboWars".to_string(),
                team_name: None,
            })
            .unwrap();

        // Flip one character in the payload half
        let mut tampered: Vec<char> = credential.chars().collect();
        tampered[2] = if tampered[2] == 'A' { 'B' } else { 'A' };
        let tampered: String = tampered.into_iter().collect();

        assert!(signer.verify(&tampered).is_err());
    }

    #[test]
    fn test_bare_ticket_code_is_not_a_credential() {
        assert!(!CredentialSigner::looks_like_credential("TKT-0123456789"));

        let signer = CredentialSigner::new("secret");
        let signed = signer
            .sign(&QrPayload {
                ticket_code: "TKT-0123456789".to_string(),
                event_name: "RoboWars".to_string(),
                team_name: None,
            })
            .unwrap();
        assert!(CredentialSigner::looks_like_credential(&signed));
    }
}

// Authorization tests
mod authorization_tests {
    use super::*;

    #[test]
    fn test_capability_matrix() {
        let event = Event::new("RoboWars", EventType::Normal, "org-1");

        assert!(checks::can_manage_event(&admin(), &event).is_ok());
        assert!(checks::can_manage_event(&organizer("org-1"), &event).is_ok());
        assert!(checks::can_manage_event(&organizer("org-2"), &event).is_err());
        assert!(checks::can_manage_event(&participant("user-1"), &event).is_err());
    }

    #[test]
    fn test_cross_organizer_scan_error_names_event() {
        let event = Event::new("Robotics Finale", EventType::Normal, "org-1");
        let err = checks::can_manage_event(&organizer("org-2"), &event).unwrap_err();
        match err {
            TesseraError::Forbidden { ref message } => {
                assert!(message.contains("Robotics Finale"));
            }
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn test_role_gates() {
        assert!(checks::require_participant(&participant("u")).is_ok());
        assert!(checks::require_participant(&organizer("o")).is_err());
        assert!(checks::require_staff(&organizer("o")).is_ok());
        assert!(checks::require_staff(&admin()).is_ok());
        assert!(checks::require_staff(&participant("u")).is_err());
    }
}

// Team membership tests
mod team_tests {
    use super::*;

    #[test]
    fn test_full_team_rejects_joins_with_capacity_error() {
        let mut team = Team::new("Crustaceans", "evt-1", "leader", 2, "AB12CD");
        team.member_ids.push("member-2".to_string());

        match team.join_check("member-3").unwrap_err() {
            TesseraError::Capacity { message } => assert!(message.contains("full")),
            other => panic!("expected Capacity, got {:?}", other),
        }
    }

    #[test]
    fn test_registered_team_is_immutable() {
        let mut team = Team::new("Crustaceans", "evt-1", "leader", 4, "AB12CD");
        team.member_ids.push("member-2".to_string());
        team.status = TeamStatus::Registered;

        assert!(team.join_check("member-3").is_err());
        assert!(team.leave_check("member-2").is_err());
        assert!(matches!(
            team.register_check("leader", 2).unwrap_err(),
            TesseraError::Conflict { .. }
        ));
    }

    #[test]
    fn test_register_below_minimum_is_capacity_error() {
        let team = Team::new("Solo", "evt-1", "leader", 4, "AB12CD");
        assert!(matches!(
            team.register_check("leader", 2).unwrap_err(),
            TesseraError::Capacity { .. }
        ));
    }

    #[test]
    fn test_invite_codes_normalize_for_lookup() {
        assert_eq!(InviteCode::normalize("ab12cd"), "AB12CD");
        assert_eq!(InviteCode::normalize(" AB12CD "), "AB12CD");
    }
}

// Error handling tests
mod error_tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_error_codes() {
        assert_eq!(TesseraError::validation("x").code(), "VALIDATION_ERROR");
        assert_eq!(TesseraError::conflict("x").code(), "CONFLICT");
        assert_eq!(TesseraError::capacity("x").code(), "CAPACITY_EXCEEDED");
        assert_eq!(TesseraError::forbidden("x").code(), "FORBIDDEN");
        assert_eq!(TesseraError::state("x").code(), "INVALID_STATE");
        assert_eq!(TesseraError::not_found("Event", "e1").code(), "NOT_FOUND");
    }

    #[test]
    fn test_http_status_mapping() {
        use axum::http::StatusCode;

        let cases: Vec<(TesseraError, StatusCode)> = vec![
            (TesseraError::validation("bad"), StatusCode::BAD_REQUEST),
            (TesseraError::unauthorized("no"), StatusCode::UNAUTHORIZED),
            (TesseraError::forbidden("no"), StatusCode::FORBIDDEN),
            (TesseraError::not_found("Event", "e"), StatusCode::NOT_FOUND),
            (TesseraError::conflict("dup"), StatusCode::CONFLICT),
            (TesseraError::capacity("full"), StatusCode::CONFLICT),
            (TesseraError::state("nope"), StatusCode::CONFLICT),
            (TesseraError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_duplicate_scan_discloses_original_timestamp() {
        let attended_at = Utc::now() - Duration::minutes(10);
        let err = TesseraError::DuplicateScan { attended_at };

        assert_eq!(err.code(), "DUPLICATE_SCAN");
        assert!(err.to_string().contains("already scanned"));

        let response = err.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::CONFLICT);
    }

    #[test]
    fn test_capacity_is_never_an_internal_error() {
        // Expected outcomes of concurrent legitimate use must not surface
        // as 500s
        let err = TesseraError::capacity("Event is at capacity");
        let response = err.into_response();
        assert!(response.status().is_client_error());
    }
}

// Ticket state tests
mod ticket_tests {
    use super::*;

    #[test]
    fn test_ticket_code_distinct_from_identity() {
        let ticket = Ticket::new_registration("evt-1", "user-1", serde_json::Map::new());
        assert!(TicketCode::is_valid(&ticket.ticket_code));
        assert!(uuid::Uuid::parse_str(&ticket.id).is_ok());
    }

    #[test]
    fn test_rejected_tickets_still_block_reregistration() {
        let mut ticket = Ticket::new_registration("evt-1", "user-1", serde_json::Map::new());
        ticket.status = TicketStatus::Rejected;
        assert!(ticket.is_active());
    }

    #[test]
    fn test_variant_selector_equality_is_exact() {
        let variant = Variant {
            name: "Hoodie".to_string(),
            size: "M".to_string(),
            color: "Black".to_string(),
            stock: 5,
        };
        let selector = VariantSelector {
            name: "Hoodie".to_string(),
            size: "M".to_string(),
            color: "Black".to_string(),
        };
        let wrong_size = VariantSelector {
            size: "L".to_string(),
            ..selector.clone()
        };

        assert!(selector.matches(&variant));
        assert!(!wrong_size.matches(&variant));
    }
}

// Form schema tests
mod form_tests {
    use super::*;

    fn event_with_form() -> Event {
        Event::new("Workshop", EventType::Normal, "org-1").with_form_fields(vec![
            FormField {
                label: "College".to_string(),
                field_type: FormFieldType::Text,
                required: true,
            },
            FormField {
                label: "Resume".to_string(),
                field_type: FormFieldType::File,
                required: false,
            },
        ])
    }

    #[test]
    fn test_optional_fields_may_be_omitted() {
        let event = event_with_form();
        let data = serde_json::json!({"College": "IIIT"});
        assert!(event
            .validate_form_data(data.as_object().unwrap())
            .is_ok());
    }

    #[test]
    fn test_file_fields_take_url_strings() {
        let event = event_with_form();
        let data = serde_json::json!({
            "College": "IIIT",
            "Resume": "https://files.example/resume.pdf",
        });
        assert!(event
            .validate_form_data(data.as_object().unwrap())
            .is_ok());
    }

    #[test]
    fn test_error_names_the_offending_field() {
        let event = event_with_form();
        let data = serde_json::json!({"Resume": "https://files.example/r.pdf"});
        let err = event
            .validate_form_data(data.as_object().unwrap())
            .unwrap_err();
        assert!(err.to_string().contains("College"));
    }
}
