//! Team Formation Service
//!
//! Assembles teams for team-competition events: creation with a unique
//! invite code (bounded collision retry), invite-code joins, leaves, and
//! the leader-only finalization that issues member tickets.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{Event, EventType, Team, Ticket};
use crate::error::{Result, TesseraError};
use crate::repository::{EventRepository, TeamRepository, TicketRepository};
use crate::service::authorization::AuthContext;
use crate::service::credential::{CredentialSigner, QrPayload};
use crate::service::notify::Notifier;
use crate::token::InviteCode;

const DEFAULT_MAX_MEMBERS: u32 = 4;
const INVITE_CODE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct TeamService {
    teams: Arc<TeamRepository>,
    events: Arc<EventRepository>,
    tickets: Arc<TicketRepository>,
    signer: Arc<CredentialSigner>,
    notifier: Notifier,
}

impl TeamService {
    pub fn new(
        teams: Arc<TeamRepository>,
        events: Arc<EventRepository>,
        tickets: Arc<TicketRepository>,
        signer: Arc<CredentialSigner>,
        notifier: Notifier,
    ) -> Self {
        Self {
            teams,
            events,
            tickets,
            signer,
            notifier,
        }
    }

    /// Create a team for a team-competition event; the creator becomes the
    /// leader. Invite-code collisions are retried a bounded number of
    /// times and then fail explicitly.
    pub async fn create_team(
        &self,
        user_id: &str,
        event_id: &str,
        name: &str,
        max_members: Option<u32>,
    ) -> Result<Team> {
        let event = self.load_event(event_id).await?;

        if event.event_type != EventType::TeamCompetition {
            return Err(TesseraError::validation(
                "Teams can only be created for team competition events",
            ));
        }
        if !event.is_open() {
            return Err(TesseraError::state(format!(
                "Event is {} and not open for team formation",
                event.status.as_str()
            )));
        }
        if name.trim().is_empty() {
            return Err(TesseraError::validation("Team name is required"));
        }

        if let Some(existing) = self
            .teams
            .find_by_event_and_member(event_id, user_id)
            .await?
        {
            return Err(TesseraError::conflict(format!(
                "Already in team '{}' for this event",
                existing.name
            )));
        }

        let event_max = event.max_team_size.unwrap_or(DEFAULT_MAX_MEMBERS);
        let max = max_members.unwrap_or(event_max);
        if max == 0 || max > event_max {
            return Err(TesseraError::validation(format!(
                "Team size must be between 1 and {}",
                event_max
            )));
        }

        for _ in 0..INVITE_CODE_ATTEMPTS {
            let team = Team::new(name.trim(), event_id, user_id, max, InviteCode::generate());
            match self.teams.insert(&team).await {
                Ok(()) => {
                    info!(team_id = %team.id, event_id, leader = user_id, "Team created");
                    return Ok(team);
                }
                Err(TesseraError::Conflict { .. }) => {
                    warn!(event_id, "Invite code collision, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(TesseraError::internal(
            "Could not allocate a unique invite code",
        ))
    }

    /// Join a team by invite code. The membership write is atomic: the
    /// filter re-checks capacity, so two users racing for the last seat
    /// cannot both get in. Reaching capacity marks the team Complete.
    pub async fn join_team(&self, user_id: &str, invite_code: &str) -> Result<Team> {
        let code = InviteCode::normalize(invite_code);
        let team = self
            .teams
            .find_by_invite_code(&code)
            .await?
            .ok_or_else(|| TesseraError::not_found("Team", &code))?;

        // Precise precondition errors first; the atomic update is the
        // authority under concurrency.
        team.join_check(user_id)?;

        if let Some(existing) = self
            .teams
            .find_by_event_and_member(&team.event_id, user_id)
            .await?
        {
            return Err(TesseraError::conflict(format!(
                "Already in team '{}' for this event",
                existing.name
            )));
        }

        match self.teams.join(&team.id, user_id).await? {
            Some(updated) => {
                info!(team_id = %updated.id, user_id, status = updated.status.as_str(), "Member joined team");
                Ok(updated)
            }
            None => {
                // Lost a race; classify against the current document.
                let current = self
                    .teams
                    .find_by_id(&team.id)
                    .await?
                    .ok_or_else(|| TesseraError::not_found("Team", &team.id))?;
                current.join_check(user_id)?;
                Err(TesseraError::capacity("Team is full"))
            }
        }
    }

    /// Leave a team. The leader cannot leave (deletes the team instead);
    /// leaving a Complete team reverts it to Forming.
    pub async fn leave_team(&self, user_id: &str, team_id: &str) -> Result<Team> {
        let team = self.load_team(team_id).await?;
        team.leave_check(user_id)?;

        match self.teams.leave(team_id, user_id).await? {
            Some(updated) => {
                info!(team_id, user_id, "Member left team");
                Ok(updated)
            }
            None => {
                let current = self.load_team(team_id).await?;
                current.leave_check(user_id)?;
                Err(TesseraError::conflict("Team changed concurrently"))
            }
        }
    }

    /// Finalize the team: leader-only, at or above the event's minimum
    /// size, exactly once. Issues a confirmed team ticket to every member
    /// who does not already hold an active ticket for the event.
    pub async fn register_team(
        &self,
        user_id: &str,
        team_id: &str,
    ) -> Result<(Team, Vec<Ticket>)> {
        let team = self.load_team(team_id).await?;
        let event = self.load_event(&team.event_id).await?;
        let min_size = event.min_team_size.unwrap_or(1);

        team.register_check(user_id, min_size)?;

        let registered = match self.teams.register(team_id, user_id, min_size).await? {
            Some(t) => t,
            None => {
                let current = self.load_team(team_id).await?;
                current.register_check(user_id, min_size)?;
                return Err(TesseraError::conflict("Team changed concurrently"));
            }
        };

        let mut issued = Vec::new();
        for member_id in &registered.member_ids {
            if self
                .tickets
                .find_active_registration(&event.id, member_id)
                .await?
                .is_some()
            {
                // Member already holds a ticket for this event; skip, never
                // double-count.
                continue;
            }

            let ticket = Ticket::new_team_ticket(&event.id, member_id, team_id);
            let credential = self.signer.sign(&QrPayload {
                ticket_code: ticket.ticket_code.clone(),
                event_name: event.name.clone(),
                team_name: Some(registered.name.clone()),
            })?;
            let ticket = ticket.with_credential(credential);

            match self.tickets.insert(&ticket).await {
                Ok(()) => {
                    self.notifier.ticket_confirmed(&ticket, &event.name);
                    issued.push(ticket);
                }
                // A racing individual registration got there first.
                Err(TesseraError::Conflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        if !issued.is_empty() {
            self.events
                .add_registrations(&event.id, issued.len() as u32)
                .await?;
        }

        info!(
            team_id,
            event_id = %event.id,
            tickets_issued = issued.len(),
            "Team registered"
        );

        Ok((registered, issued))
    }

    /// Delete a team. Leader or admin only; a registered team is immutable
    /// and cannot be deleted.
    pub async fn delete_team(&self, auth: &AuthContext, team_id: &str) -> Result<()> {
        let team = self.load_team(team_id).await?;

        if team.leader_id != auth.user_id && !auth.is_admin() {
            return Err(TesseraError::forbidden(
                "Only the team leader can delete the team",
            ));
        }
        if !self.teams.delete(team_id).await? {
            return Err(TesseraError::state("Cannot delete a registered team"));
        }

        info!(team_id, "Team deleted");
        Ok(())
    }

    pub async fn my_teams(&self, user_id: &str) -> Result<Vec<Team>> {
        self.teams.find_by_member(user_id).await
    }

    pub async fn get(&self, team_id: &str) -> Result<Team> {
        self.load_team(team_id).await
    }

    async fn load_team(&self, team_id: &str) -> Result<Team> {
        self.teams
            .find_by_id(team_id)
            .await?
            .ok_or_else(|| TesseraError::not_found("Team", team_id))
    }

    async fn load_event(&self, event_id: &str) -> Result<Event> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| TesseraError::not_found("Event", event_id))
    }
}
