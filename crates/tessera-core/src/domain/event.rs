//! Event Entity
//!
//! Single source of truth for an event's type, lifecycle status, capacity
//! and stock counters, and time windows. The counters are only ever mutated
//! through the conditional updates in `repository::event`; the entity holds
//! the pure rules (transition DAG, editable-field sets, form validation).

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Result, TesseraError};

/// Event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Single-participant registration event
    Normal,
    /// Limited-stock merchandise sale with human-reviewed orders
    Merchandise,
    /// Team-based competition (hackathon-style)
    TeamCompetition,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Merchandise => "MERCHANDISE",
            Self::TeamCompetition => "TEAM_COMPETITION",
        }
    }
}

/// Event lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Draft,
    Published,
    Ongoing,
    Completed,
    Closed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
            Self::Ongoing => "ONGOING",
            Self::Completed => "COMPLETED",
            Self::Closed => "CLOSED",
        }
    }

    /// Forward-only transition DAG. Draft may be published or closed
    /// directly; every later status moves only toward Closed.
    pub fn can_transition_to(&self, target: EventStatus) -> bool {
        use EventStatus::*;
        matches!(
            (self, target),
            (Draft, Published)
                | (Draft, Closed)
                | (Published, Ongoing)
                | (Published, Closed)
                | (Ongoing, Completed)
                | (Ongoing, Closed)
                | (Completed, Closed)
        )
    }
}

/// Custom registration form field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FormFieldType {
    Text,
    Number,
    File,
}

/// Custom registration form field declared by the organizer
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub label: String,
    pub field_type: FormFieldType,
    #[serde(default)]
    pub required: bool,
}

/// Merchandise variant with its own stock counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub name: String,
    pub size: String,
    pub color: String,
    pub stock: u32,
}

/// Variant selector carried on merchandise orders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariantSelector {
    pub name: String,
    pub size: String,
    pub color: String,
}

impl VariantSelector {
    pub fn matches(&self, variant: &Variant) -> bool {
        self.name == variant.name && self.size == variant.size && self.color == variant.color
    }
}

/// Editable event fields, grouped the way the per-status allow-lists cut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventField {
    Name,
    Description,
    Schedule,
    RegistrationDeadline,
    CapacityLimit,
    FormFields,
    Price,
    Stock,
    Variants,
    PurchaseLimit,
    TeamSize,
}

/// Event entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Entity identity (uuid)
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub event_type: EventType,

    pub status: EventStatus,

    /// Owning organizer (creator)
    pub organizer_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_deadline: Option<DateTime<Utc>>,

    /// Maximum accepted registrations; absent = unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_limit: Option<u32>,

    /// Accepted-registration counter; mutated only via conditional updates
    #[serde(default)]
    pub registration_count: u32,

    /// Custom registration form schema
    #[serde(default)]
    pub form_fields: Vec<FormField>,

    /// Set on first registration; freezes the form schema
    #[serde(default)]
    pub form_locked: bool,

    /// Merchandise: unit price for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Merchandise: total sellable units; absent = untracked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_stock: Option<u32>,

    /// Merchandise: maximum units per user across non-rejected orders
    #[serde(default = "default_purchase_limit")]
    pub purchase_limit_per_user: u32,

    #[serde(default)]
    pub variants: Vec<Variant>,

    /// Team competition: minimum members required to register
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_team_size: Option<u32>,

    /// Team competition: maximum members per team
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_team_size: Option<u32>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

fn default_purchase_limit() -> u32 {
    1
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        event_type: EventType,
        organizer_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            event_type,
            status: EventStatus::Draft,
            organizer_id: organizer_id.into(),
            start_date: None,
            end_date: None,
            registration_deadline: None,
            capacity_limit: None,
            registration_count: 0,
            form_fields: Vec::new(),
            form_locked: false,
            price: None,
            total_stock: None,
            purchase_limit_per_user: default_purchase_limit(),
            variants: Vec::new(),
            min_team_size: None,
            max_team_size: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_schedule(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        deadline: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_date = start;
        self.end_date = end;
        self.registration_deadline = deadline;
        self
    }

    pub fn with_capacity_limit(mut self, limit: u32) -> Self {
        self.capacity_limit = Some(limit);
        self
    }

    pub fn with_form_fields(mut self, fields: Vec<FormField>) -> Self {
        self.form_fields = fields;
        self
    }

    pub fn with_stock(mut self, total: Option<u32>, purchase_limit: u32) -> Self {
        self.total_stock = total;
        self.purchase_limit_per_user = purchase_limit;
        self
    }

    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
        self.variants = variants;
        self
    }

    pub fn with_team_size(mut self, min: u32, max: u32) -> Self {
        self.min_team_size = Some(min);
        self.max_team_size = Some(max);
        self
    }

    /// Whether the event accepts new registrations/orders at all.
    pub fn is_open(&self) -> bool {
        matches!(self.status, EventStatus::Published | EventStatus::Ongoing)
    }

    /// Deadline check; a missing deadline never closes registration.
    pub fn registration_open_at(&self, now: DateTime<Utc>) -> bool {
        match self.registration_deadline {
            Some(deadline) => now < deadline,
            None => true,
        }
    }

    pub fn find_variant(&self, selector: &VariantSelector) -> Option<&Variant> {
        self.variants.iter().find(|v| selector.matches(v))
    }

    /// Per-status editable-field allow-list. Draft allows full edits,
    /// Published keeps description/deadline/limit open, later statuses are
    /// status-only (handled by the caller transitioning, not editing).
    /// `form_locked` blocks form-schema edits at any status.
    pub fn can_edit(&self, field: EventField) -> bool {
        if field == EventField::FormFields && self.form_locked {
            return false;
        }
        match self.status {
            EventStatus::Draft => true,
            EventStatus::Published => matches!(
                field,
                EventField::Description
                    | EventField::RegistrationDeadline
                    | EventField::CapacityLimit
            ),
            _ => false,
        }
    }

    /// Validate participant form data against the declared field schema.
    /// Unknown keys, missing required fields, and type mismatches are each
    /// rejected with field-level detail.
    pub fn validate_form_data(&self, data: &serde_json::Map<String, serde_json::Value>) -> Result<()> {
        for field in &self.form_fields {
            match data.get(&field.label) {
                None | Some(serde_json::Value::Null) => {
                    if field.required {
                        return Err(TesseraError::validation(format!(
                            "Missing required field '{}'",
                            field.label
                        )));
                    }
                }
                Some(value) => match field.field_type {
                    FormFieldType::Number => {
                        if !value.is_number() {
                            return Err(TesseraError::validation(format!(
                                "Field '{}' must be a number",
                                field.label
                            )));
                        }
                    }
                    FormFieldType::Text | FormFieldType::File => {
                        let ok = value.as_str().map(|s| !s.trim().is_empty()).unwrap_or(false);
                        if !ok {
                            return Err(TesseraError::validation(format!(
                                "Field '{}' must be a non-empty string",
                                field.label
                            )));
                        }
                    }
                },
            }
        }

        if let Some(unknown) = data
            .keys()
            .find(|k| !self.form_fields.iter().any(|f| &f.label == *k))
        {
            return Err(TesseraError::validation(format!(
                "Unknown form field '{}'",
                unknown
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_transition_dag_forward_only() {
        use EventStatus::*;
        assert!(Draft.can_transition_to(Published));
        assert!(Draft.can_transition_to(Closed));
        assert!(Published.can_transition_to(Ongoing));
        assert!(Ongoing.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Closed));

        // No backward or skipping transitions
        assert!(!Published.can_transition_to(Draft));
        assert!(!Draft.can_transition_to(Ongoing));
        assert!(!Closed.can_transition_to(Published));
        assert!(!Completed.can_transition_to(Ongoing));
        assert!(!Ongoing.can_transition_to(Ongoing));
    }

    #[test]
    fn test_editable_fields_by_status() {
        let mut event = Event::new("GameJam", EventType::Normal, "org-1");
        assert!(event.can_edit(EventField::Name));
        assert!(event.can_edit(EventField::FormFields));

        event.status = EventStatus::Published;
        assert!(event.can_edit(EventField::Description));
        assert!(event.can_edit(EventField::RegistrationDeadline));
        assert!(event.can_edit(EventField::CapacityLimit));
        assert!(!event.can_edit(EventField::Name));
        assert!(!event.can_edit(EventField::FormFields));

        event.status = EventStatus::Closed;
        assert!(!event.can_edit(EventField::Description));
    }

    #[test]
    fn test_form_lock_blocks_schema_edits_in_draft() {
        let mut event = Event::new("GameJam", EventType::Normal, "org-1");
        event.form_locked = true;
        assert!(!event.can_edit(EventField::FormFields));
        assert!(event.can_edit(EventField::Name));
    }

    #[test]
    fn test_registration_deadline() {
        let now = Utc::now();
        let event = Event::new("Talk", EventType::Normal, "org-1")
            .with_schedule(None, None, Some(now + chrono::Duration::hours(1)));
        assert!(event.registration_open_at(now));
        assert!(!event.registration_open_at(now + chrono::Duration::hours(1)));
        assert!(!event.registration_open_at(now + chrono::Duration::hours(2)));

        let no_deadline = Event::new("Talk", EventType::Normal, "org-1");
        assert!(no_deadline.registration_open_at(now + chrono::Duration::days(365)));
    }

    #[test]
    fn test_form_validation_required_and_types() {
        let event = Event::new("Workshop", EventType::Normal, "org-1").with_form_fields(vec![
            FormField {
                label: "College".into(),
                field_type: FormFieldType::Text,
                required: true,
            },
            FormField {
                label: "Age".into(),
                field_type: FormFieldType::Number,
                required: false,
            },
        ]);

        assert!(event
            .validate_form_data(&map(json!({"College": "IIIT", "Age": 21})))
            .is_ok());
        assert!(event.validate_form_data(&map(json!({"Age": 21}))).is_err());
        assert!(event
            .validate_form_data(&map(json!({"College": ""})))
            .is_err());
        assert!(event
            .validate_form_data(&map(json!({"College": "IIIT", "Age": "x"})))
            .is_err());
    }

    #[test]
    fn test_form_validation_rejects_unknown_fields() {
        let event = Event::new("Workshop", EventType::Normal, "org-1");
        let err = event
            .validate_form_data(&map(json!({"Anything": "value"})))
            .unwrap_err();
        assert!(err.to_string().contains("Anything"));
    }

    #[test]
    fn test_variant_lookup() {
        let event = Event::new("Merch Drop", EventType::Merchandise, "org-1").with_variants(vec![
            Variant {
                name: "Hoodie".into(),
                size: "M".into(),
                color: "Black".into(),
                stock: 10,
            },
        ]);

        let hit = VariantSelector {
            name: "Hoodie".into(),
            size: "M".into(),
            color: "Black".into(),
        };
        let miss = VariantSelector {
            name: "Hoodie".into(),
            size: "L".into(),
            color: "Black".into(),
        };
        assert!(event.find_variant(&hit).is_some());
        assert!(event.find_variant(&miss).is_none());
    }
}
