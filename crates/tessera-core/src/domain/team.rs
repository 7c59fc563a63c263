//! Team Entity
//!
//! Multi-member team assembly for team-based competition events. Membership
//! mutations happen through the conditional updates in `repository::team`;
//! this module holds the pure membership rules.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Result, TesseraError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamStatus {
    /// Accepting members
    Forming,
    /// At max capacity; reverts to Forming if someone leaves
    Complete,
    /// Finalized by the leader; terminal, membership frozen
    Registered,
}

impl TeamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forming => "FORMING",
            Self::Complete => "COMPLETE",
            Self::Registered => "REGISTERED",
        }
    }
}

/// Team entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Entity identity (uuid)
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    pub event_id: String,

    /// Creator; immutable, always a member, may not leave
    pub leader_id: String,

    pub member_ids: Vec<String>,

    pub max_members: u32,

    /// Short unique join token, stored uppercase
    pub invite_code: String,

    pub status: TeamStatus,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub fn new(
        name: impl Into<String>,
        event_id: impl Into<String>,
        leader_id: impl Into<String>,
        max_members: u32,
        invite_code: impl Into<String>,
    ) -> Self {
        let leader = leader_id.into();
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            event_id: event_id.into(),
            leader_id: leader.clone(),
            member_ids: vec![leader],
            max_members,
            invite_code: invite_code.into(),
            status: TeamStatus::Forming,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|m| m == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.member_ids.len() as u32 >= self.max_members
    }

    pub fn member_count(&self) -> u32 {
        self.member_ids.len() as u32
    }

    /// Join preconditions, each a distinct failure kind.
    pub fn join_check(&self, user_id: &str) -> Result<()> {
        if self.status == TeamStatus::Registered {
            return Err(TesseraError::state("Team is already registered"));
        }
        if self.is_member(user_id) {
            return Err(TesseraError::conflict("Already a member of this team"));
        }
        if self.is_full() {
            return Err(TesseraError::capacity("Team is full"));
        }
        Ok(())
    }

    /// Leave preconditions. The leader deletes the team instead of leaving.
    pub fn leave_check(&self, user_id: &str) -> Result<()> {
        if self.status == TeamStatus::Registered {
            return Err(TesseraError::state("Cannot leave a registered team"));
        }
        if !self.is_member(user_id) {
            return Err(TesseraError::validation("Not a member of this team"));
        }
        if self.leader_id == user_id {
            return Err(TesseraError::state(
                "Leader cannot leave; delete the team instead",
            ));
        }
        Ok(())
    }

    /// Finalization preconditions checked by the team service before the
    /// atomic status transition.
    pub fn register_check(&self, actor_id: &str, min_team_size: u32) -> Result<()> {
        if self.leader_id != actor_id {
            return Err(TesseraError::forbidden("Only the team leader can register the team"));
        }
        if self.status == TeamStatus::Registered {
            return Err(TesseraError::conflict("Team is already registered"));
        }
        if self.member_count() < min_team_size {
            return Err(TesseraError::capacity(format!(
                "Team needs at least {} members to register",
                min_team_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team() -> Team {
        let mut t = Team::new("Rustaceans", "evt-1", "leader", 3, "AB12CD");
        t.member_ids.push("member-2".to_string());
        t
    }

    #[test]
    fn test_leader_is_initial_member() {
        let t = Team::new("Rustaceans", "evt-1", "leader", 4, "AB12CD");
        assert!(t.is_member("leader"));
        assert_eq!(t.member_count(), 1);
        assert_eq!(t.status, TeamStatus::Forming);
    }

    #[test]
    fn test_join_checks() {
        let mut t = team();
        assert!(t.join_check("member-3").is_ok());

        assert!(matches!(
            t.join_check("member-2").unwrap_err(),
            TesseraError::Conflict { .. }
        ));

        t.member_ids.push("member-3".to_string());
        assert!(matches!(
            t.join_check("member-4").unwrap_err(),
            TesseraError::Capacity { .. }
        ));

        t.status = TeamStatus::Registered;
        assert!(matches!(
            t.join_check("member-4").unwrap_err(),
            TesseraError::State { .. }
        ));
    }

    #[test]
    fn test_leave_checks() {
        let mut t = team();
        assert!(t.leave_check("member-2").is_ok());
        assert!(t.leave_check("leader").is_err());
        assert!(t.leave_check("stranger").is_err());

        t.status = TeamStatus::Registered;
        assert!(matches!(
            t.leave_check("member-2").unwrap_err(),
            TesseraError::State { .. }
        ));
    }

    #[test]
    fn test_register_checks() {
        let t = team();
        assert!(t.register_check("leader", 2).is_ok());

        assert!(matches!(
            t.register_check("member-2", 2).unwrap_err(),
            TesseraError::Forbidden { .. }
        ));
        assert!(matches!(
            t.register_check("leader", 3).unwrap_err(),
            TesseraError::Capacity { .. }
        ));

        let mut registered = team();
        registered.status = TeamStatus::Registered;
        assert!(matches!(
            registered.register_check("leader", 2).unwrap_err(),
            TesseraError::Conflict { .. }
        ));
    }
}
