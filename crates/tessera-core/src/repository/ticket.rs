//! Ticket Repository
//!
//! The partial unique index on (eventId, userId) — see `indexes` — makes
//! the storage layer reject duplicate active registrations; the insert here
//! translates that rejection into a ConflictError. Decision and attendance
//! updates are conditional on the expected prior state, so re-deciding an
//! order or re-scanning a ticket can never silently succeed.

use chrono::{SecondsFormat, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson};
use mongodb::options::{FindOptions, ReturnDocument};
use mongodb::{Collection, Database};

use crate::domain::{Ticket, TicketStatus, TicketType};
use crate::error::{Result, TesseraError};
use crate::repository::is_duplicate_key;

pub struct TicketRepository {
    collection: Collection<Ticket>,
}

impl TicketRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("tickets"),
        }
    }

    /// Insert a ticket. A unique-index violation means the user already
    /// holds an active ticket for this event.
    pub async fn insert(&self, ticket: &Ticket) -> Result<()> {
        match self.collection.insert_one(ticket).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(TesseraError::conflict(
                "User already holds an active ticket for this event",
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Ticket>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_by_code(&self, ticket_code: &str) -> Result<Option<Ticket>> {
        Ok(self
            .collection
            .find_one(doc! { "ticketCode": ticket_code })
            .await?)
    }

    /// Active (non-cancelled) registration ticket for one (event, user).
    pub async fn find_active_registration(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Option<Ticket>> {
        Ok(self
            .collection
            .find_one(doc! {
                "eventId": event_id,
                "userId": user_id,
                "ticketType": TicketType::Registration.as_str(),
                "status": { "$ne": TicketStatus::Cancelled.as_str() },
            })
            .await?)
    }

    pub async fn find_by_user(&self, user_id: &str) -> Result<Vec<Ticket>> {
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let cursor = self
            .collection
            .find(doc! { "userId": user_id })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// Pending merchandise orders across a set of events, oldest first.
    pub async fn find_pending_orders(&self, event_ids: &[String]) -> Result<Vec<Ticket>> {
        let options = FindOptions::builder().sort(doc! { "createdAt": 1 }).build();
        let cursor = self
            .collection
            .find(doc! {
                "eventId": { "$in": event_ids },
                "ticketType": TicketType::Merchandise.as_str(),
                "status": TicketStatus::PendingApproval.as_str(),
            })
            .with_options(options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// Total merchandise quantity this user has ordered for an event across
    /// non-rejected, non-cancelled orders (the purchase-limit basis).
    pub async fn ordered_quantity(&self, event_id: &str, user_id: &str) -> Result<u32> {
        let pipeline = vec![
            doc! { "$match": {
                "eventId": event_id,
                "userId": user_id,
                "ticketType": TicketType::Merchandise.as_str(),
                "status": { "$nin": [
                    TicketStatus::Rejected.as_str(),
                    TicketStatus::Cancelled.as_str(),
                ] },
            } },
            doc! { "$group": { "_id": Bson::Null, "total": { "$sum": "$quantity" } } },
        ];

        let mut cursor = self.collection.aggregate(pipeline).await?;
        if let Some(result) = cursor.try_next().await? {
            let total = result.get_i64("total").unwrap_or_else(|_| {
                result.get_i32("total").map(i64::from).unwrap_or(0)
            });
            return Ok(total.max(0) as u32);
        }
        Ok(0)
    }

    /// Atomically decide a pending order. The filter pins the expected
    /// PendingApproval status, so a second decision finds nothing and the
    /// caller reports the conflict with the actual current status.
    pub async fn decide(
        &self,
        ticket_id: &str,
        to: TicketStatus,
        qr_credential: Option<String>,
    ) -> Result<Option<Ticket>> {
        let mut set = doc! {
            "status": to.as_str(),
            "updatedAt": bson::DateTime::now(),
        };
        if let Some(credential) = qr_credential {
            set.insert("qrCredential", credential);
        }

        Ok(self
            .collection
            .find_one_and_update(
                doc! {
                    "_id": ticket_id,
                    "status": TicketStatus::PendingApproval.as_str(),
                },
                doc! { "$set": set },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// First scan wins: flips `attended` only when it is still false on a
    /// confirmed ticket. `None` means the precondition did not hold and the
    /// caller classifies (wrong status vs. duplicate scan).
    pub async fn mark_attended(&self, ticket_id: &str) -> Result<Option<Ticket>> {
        let stamped = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Ok(self
            .collection
            .find_one_and_update(
                doc! {
                    "_id": ticket_id,
                    "status": TicketStatus::Confirmed.as_str(),
                    "attended": false,
                },
                doc! { "$set": {
                    "attended": true,
                    "attendanceTimestamp": stamped,
                    "updatedAt": bson::DateTime::now(),
                } },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    pub async fn count_confirmed(&self, event_id: &str) -> Result<u64> {
        Ok(self
            .collection
            .count_documents(doc! {
                "eventId": event_id,
                "status": TicketStatus::Confirmed.as_str(),
            })
            .await?)
    }

    pub async fn count_attended(&self, event_id: &str) -> Result<u64> {
        Ok(self
            .collection
            .count_documents(doc! {
                "eventId": event_id,
                "status": TicketStatus::Confirmed.as_str(),
                "attended": true,
            })
            .await?)
    }

    pub async fn count_by_event(&self, event_id: &str) -> Result<u64> {
        Ok(self
            .collection
            .count_documents(doc! { "eventId": event_id })
            .await?)
    }
}
