//! Team Repository
//!
//! Membership mutations use aggregation-pipeline updates so the size check,
//! the member push/pull, and the Forming/Complete status derivation land in
//! one atomic command. Two users racing for the last seat can never both
//! get in.

use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

use crate::domain::{Team, TeamStatus};
use crate::error::{Result, TesseraError};
use crate::repository::is_duplicate_key;

pub struct TeamRepository {
    collection: Collection<Team>,
}

impl TeamRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("teams"),
        }
    }

    /// Insert a team. A unique-index violation on the invite code surfaces
    /// as a ConflictError; the team service retries with a fresh code.
    pub async fn insert(&self, team: &Team) -> Result<()> {
        match self.collection.insert_one(team).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                Err(TesseraError::conflict("Invite code already in use"))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Team>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    /// Lookup by invite code; callers normalize case first.
    pub async fn find_by_invite_code(&self, invite_code: &str) -> Result<Option<Team>> {
        Ok(self
            .collection
            .find_one(doc! { "inviteCode": invite_code })
            .await?)
    }

    /// A user's team for one event, if any (one team per event per user).
    pub async fn find_by_event_and_member(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Option<Team>> {
        Ok(self
            .collection
            .find_one(doc! { "eventId": event_id, "memberIds": user_id })
            .await?)
    }

    pub async fn find_by_member(&self, user_id: &str) -> Result<Vec<Team>> {
        let cursor = self.collection.find(doc! { "memberIds": user_id }).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Atomic join: the filter requires a joinable team with room and the
    /// pipeline appends the member, then derives Complete when the team
    /// just reached capacity. Returns the updated team, or `None` when the
    /// precondition did not hold.
    pub async fn join(&self, team_id: &str, user_id: &str) -> Result<Option<Team>> {
        let filter = doc! {
            "_id": team_id,
            "status": { "$ne": TeamStatus::Registered.as_str() },
            "memberIds": { "$ne": user_id },
            "$expr": { "$lt": [{ "$size": "$memberIds" }, "$maxMembers"] },
        };
        let update = vec![
            doc! { "$set": {
                "memberIds": { "$concatArrays": ["$memberIds", [user_id]] },
                "updatedAt": "$$NOW",
            } },
            doc! { "$set": {
                "status": { "$cond": [
                    { "$gte": [{ "$size": "$memberIds" }, "$maxMembers"] },
                    TeamStatus::Complete.as_str(),
                    "$status",
                ] },
            } },
        ];

        Ok(self
            .collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// Atomic leave: removes the member and reverts Complete to Forming.
    /// The filter excludes registered teams and the leader.
    pub async fn leave(&self, team_id: &str, user_id: &str) -> Result<Option<Team>> {
        let filter = doc! {
            "_id": team_id,
            "status": { "$ne": TeamStatus::Registered.as_str() },
            "memberIds": user_id,
            "leaderId": { "$ne": user_id },
        };
        let update = vec![
            doc! { "$set": {
                "memberIds": { "$filter": {
                    "input": "$memberIds",
                    "cond": { "$ne": ["$$this", user_id] },
                } },
                "status": { "$cond": [
                    { "$eq": ["$status", TeamStatus::Complete.as_str()] },
                    TeamStatus::Forming.as_str(),
                    "$status",
                ] },
                "updatedAt": "$$NOW",
            } },
        ];

        Ok(self
            .collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// Atomic finalization: only the leader, only once, only at or above
    /// the minimum size. A second call finds nothing to update.
    pub async fn register(
        &self,
        team_id: &str,
        leader_id: &str,
        min_team_size: u32,
    ) -> Result<Option<Team>> {
        let min = min_team_size as i64;
        let filter = doc! {
            "_id": team_id,
            "leaderId": leader_id,
            "status": { "$ne": TeamStatus::Registered.as_str() },
            "$expr": { "$gte": [{ "$size": "$memberIds" }, min] },
        };

        Ok(self
            .collection
            .find_one_and_update(
                filter,
                doc! { "$set": {
                    "status": TeamStatus::Registered.as_str(),
                    "updatedAt": bson::DateTime::now(),
                } },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// Delete a team unless it has been registered.
    pub async fn delete(&self, team_id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! {
                "_id": team_id,
                "status": { "$ne": TeamStatus::Registered.as_str() },
            })
            .await?;
        Ok(result.deleted_count > 0)
    }
}
