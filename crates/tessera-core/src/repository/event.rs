//! Event Repository
//!
//! Owns the capacity and stock counters. The reserve/release/decrement
//! primitives are compare-and-swap style updates: the filter carries the
//! precondition and the update applies the mutation in the same command,
//! so concurrent registrations can never oversell a limit.

use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{FindOptions, ReturnDocument};
use mongodb::{Collection, Database};

use crate::domain::{Event, EventStatus, EventType, VariantSelector};
use crate::error::Result;

pub struct EventRepository {
    collection: Collection<Event>,
}

impl EventRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("events"),
        }
    }

    pub async fn insert(&self, event: &Event) -> Result<()> {
        self.collection.insert_one(event).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Event>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_filtered(
        &self,
        event_type: Option<EventType>,
        status: Option<EventStatus>,
        limit: i64,
    ) -> Result<Vec<Event>> {
        let mut filter = doc! {};
        if let Some(t) = event_type {
            filter.insert("eventType", t.as_str());
        }
        if let Some(s) = status {
            filter.insert("status", s.as_str());
        }

        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .limit(limit)
            .build();

        let cursor = self.collection.find(filter).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn find_by_organizer(&self, organizer_id: &str) -> Result<Vec<Event>> {
        let cursor = self
            .collection
            .find(doc! { "organizerId": organizer_id })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn update(&self, event: &Event) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &event.id }, event)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    /// Atomically claim `quantity` registration slots. The filter requires
    /// an open status and, when a capacity limit is set, room for the whole
    /// claim; the update increments the counter and locks the form schema.
    /// Returns the updated event, or `None` when no document satisfied the
    /// precondition (caller re-reads to classify the failure).
    pub async fn reserve_slots(&self, event_id: &str, quantity: u32) -> Result<Option<Event>> {
        let qty = quantity as i64;
        let filter = doc! {
            "_id": event_id,
            "status": { "$in": [EventStatus::Published.as_str(), EventStatus::Ongoing.as_str()] },
            "$or": [
                { "capacityLimit": Bson::Null },
                { "$expr": { "$lte": [
                    { "$add": ["$registrationCount", qty] },
                    "$capacityLimit",
                ] } },
            ],
        };
        let update = doc! {
            "$inc": { "registrationCount": qty },
            "$set": { "formLocked": true, "updatedAt": bson::DateTime::now() },
        };

        Ok(self
            .collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// Compensating release for slots claimed by `reserve_slots` when the
    /// subsequent ticket insert loses the uniqueness race.
    pub async fn release_slots(&self, event_id: &str, quantity: u32) -> Result<()> {
        let qty = quantity as i64;
        self.collection
            .update_one(
                doc! { "_id": event_id, "registrationCount": { "$gte": qty } },
                doc! {
                    "$inc": { "registrationCount": -qty },
                    "$set": { "updatedAt": bson::DateTime::now() },
                },
            )
            .await?;
        Ok(())
    }

    /// Atomically commit merchandise stock at approval time. The filter
    /// asserts sufficient remaining stock on the event total (when tracked)
    /// and on the named variant (when one was ordered); returns false when
    /// the precondition no longer holds.
    pub async fn decrement_stock(
        &self,
        event_id: &str,
        variant: Option<&VariantSelector>,
        quantity: u32,
        track_total: bool,
    ) -> Result<bool> {
        let qty = quantity as i64;

        let mut filter = doc! { "_id": event_id };
        let mut inc = Document::new();

        if track_total {
            filter.insert("totalStock", doc! { "$gte": qty });
            inc.insert("totalStock", -qty);
        }
        if let Some(selector) = variant {
            filter.insert(
                "variants",
                doc! { "$elemMatch": {
                    "name": &selector.name,
                    "size": &selector.size,
                    "color": &selector.color,
                    "stock": { "$gte": qty },
                } },
            );
            inc.insert("variants.$.stock", -qty);
        }

        if inc.is_empty() {
            // Untracked stock, nothing to commit.
            return Ok(true);
        }

        let update = doc! { "$inc": inc, "$set": { "updatedAt": bson::DateTime::now() } };
        let result = self.collection.update_one(filter, update).await?;
        Ok(result.modified_count > 0)
    }

    /// Reverse a committed stock decrement. Used as compensation when a
    /// concurrent decision wins between the decrement and the status write.
    pub async fn restore_stock(
        &self,
        event_id: &str,
        variant: Option<&VariantSelector>,
        quantity: u32,
        track_total: bool,
    ) -> Result<()> {
        let qty = quantity as i64;

        let mut filter = doc! { "_id": event_id };
        let mut inc = Document::new();

        if track_total {
            inc.insert("totalStock", qty);
        }
        if let Some(selector) = variant {
            filter.insert(
                "variants",
                doc! { "$elemMatch": {
                    "name": &selector.name,
                    "size": &selector.size,
                    "color": &selector.color,
                } },
            );
            inc.insert("variants.$.stock", qty);
        }

        if inc.is_empty() {
            return Ok(());
        }

        self.collection
            .update_one(
                filter,
                doc! { "$inc": inc, "$set": { "updatedAt": bson::DateTime::now() } },
            )
            .await?;
        Ok(())
    }

    /// Unconditional registration counter bump for team ticket issuance,
    /// where the count follows the tickets actually written.
    pub async fn add_registrations(&self, event_id: &str, quantity: u32) -> Result<()> {
        let qty = quantity as i64;
        self.collection
            .update_one(
                doc! { "_id": event_id },
                doc! {
                    "$inc": { "registrationCount": qty },
                    "$set": { "formLocked": true, "updatedAt": bson::DateTime::now() },
                },
            )
            .await?;
        Ok(())
    }

    /// Atomic status transition guarded on the expected current status.
    pub async fn transition(
        &self,
        event_id: &str,
        from: EventStatus,
        to: EventStatus,
    ) -> Result<Option<Event>> {
        Ok(self
            .collection
            .find_one_and_update(
                doc! { "_id": event_id, "status": from.as_str() },
                doc! { "$set": { "status": to.as_str(), "updatedAt": bson::DateTime::now() } },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }
}
