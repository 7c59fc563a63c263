//! Notification Delivery
//!
//! Fire-and-forget webhook notifications. Delivery runs on a detached task;
//! failures are logged and swallowed and never convert into an error for
//! the primary operation.

use tracing::{debug, warn};

use crate::domain::{Event, Ticket};

#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// No-op notifier for deployments without a webhook target.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn event_announced(&self, event: &Event) {
        self.dispatch(
            "event.announced",
            serde_json::json!({
                "eventId": event.id,
                "eventName": event.name,
                "eventType": event.event_type,
            }),
        );
    }

    pub fn ticket_confirmed(&self, ticket: &Ticket, event_name: &str) {
        self.dispatch(
            "ticket.confirmed",
            serde_json::json!({
                "ticketId": ticket.ticket_code,
                "eventId": ticket.event_id,
                "eventName": event_name,
                "userId": ticket.user_id,
            }),
        );
    }

    pub fn order_decided(&self, ticket: &Ticket, event_name: &str, approved: bool) {
        self.dispatch(
            "order.decided",
            serde_json::json!({
                "ticketId": ticket.ticket_code,
                "eventId": ticket.event_id,
                "eventName": event_name,
                "userId": ticket.user_id,
                "approved": approved,
            }),
        );
    }

    fn dispatch(&self, kind: &'static str, payload: serde_json::Value) {
        let Some(url) = self.webhook_url.clone() else {
            debug!(kind, "Notification skipped: no webhook configured");
            return;
        };

        let client = self.client.clone();
        let body = serde_json::json!({ "kind": kind, "data": payload });

        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) if !response.status().is_success() => {
                    warn!(kind, status = %response.status(), "Notification delivery rejected");
                }
                Ok(_) => debug!(kind, "Notification delivered"),
                Err(e) => warn!(kind, error = %e, "Notification delivery failed"),
            }
        });
    }
}
