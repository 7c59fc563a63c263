//! Teams API
//!
//! REST endpoints for team formation: create, invite-code join, leave,
//! leader-only registration, and deletion.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::common::SuccessResponse;
use crate::api::middleware::Authenticated;
use crate::api::tickets::TicketResponse;
use crate::domain::Team;
use crate::error::TesseraError;
use crate::service::{checks, TeamService};

/// Create team request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    pub name: String,
    pub event_id: String,

    /// Defaults to the event's maximum team size
    pub max_members: Option<u32>,
}

/// Join team request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinTeamRequest {
    pub invite_code: String,
}

/// Team response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamResponse {
    pub id: String,
    pub name: String,
    pub event_id: String,
    pub leader_id: String,
    pub member_ids: Vec<String>,
    pub max_members: u32,
    pub invite_code: String,
    pub status: String,
    pub created_at: String,
}

impl From<Team> for TeamResponse {
    fn from(t: Team) -> Self {
        Self {
            id: t.id,
            name: t.name,
            event_id: t.event_id,
            leader_id: t.leader_id,
            member_ids: t.member_ids,
            max_members: t.max_members,
            invite_code: t.invite_code,
            status: t.status.as_str().to_string(),
            created_at: t.created_at.to_rfc3339(),
        }
    }
}

/// Team registration response: the finalized team plus the member tickets
/// issued by this call
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTeamResponse {
    pub team: TeamResponse,
    pub tickets: Vec<TicketResponse>,
}

/// Teams service state
#[derive(Clone)]
pub struct TeamsState {
    pub team_service: Arc<TeamService>,
}

/// Create a team; the caller becomes the leader
#[utoipa::path(
    post,
    path = "",
    tag = "teams",
    request_body = CreateTeamRequest,
    responses(
        (status = 200, description = "Team created", body = TeamResponse),
        (status = 409, description = "Already in a team for this event")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_team(
    State(state): State<TeamsState>,
    auth: Authenticated,
    Json(req): Json<CreateTeamRequest>,
) -> Result<Json<TeamResponse>, TesseraError> {
    checks::require_participant(&auth.0)?;

    let team = state
        .team_service
        .create_team(&auth.0.user_id, &req.event_id, &req.name, req.max_members)
        .await?;
    Ok(Json(team.into()))
}

/// Join a team by invite code
#[utoipa::path(
    post,
    path = "/join",
    tag = "teams",
    request_body = JoinTeamRequest,
    responses(
        (status = 200, description = "Joined", body = TeamResponse),
        (status = 404, description = "Invalid invite code"),
        (status = 409, description = "Team full or already a member")
    ),
    security(("bearer_auth" = []))
)]
pub async fn join_team(
    State(state): State<TeamsState>,
    auth: Authenticated,
    Json(req): Json<JoinTeamRequest>,
) -> Result<Json<TeamResponse>, TesseraError> {
    checks::require_participant(&auth.0)?;

    let team = state
        .team_service
        .join_team(&auth.0.user_id, &req.invite_code)
        .await?;
    Ok(Json(team.into()))
}

/// List the caller's teams
#[utoipa::path(
    get,
    path = "/mine",
    tag = "teams",
    responses(
        (status = 200, description = "Caller's teams", body = Vec<TeamResponse>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_teams(
    State(state): State<TeamsState>,
    auth: Authenticated,
) -> Result<Json<Vec<TeamResponse>>, TesseraError> {
    let teams = state.team_service.my_teams(&auth.0.user_id).await?;
    Ok(Json(teams.into_iter().map(Into::into).collect()))
}

/// Finalize the team and issue member tickets (leader only)
#[utoipa::path(
    post,
    path = "/{id}/register",
    tag = "teams",
    params(
        ("id" = String, Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Team registered", body = RegisterTeamResponse),
        (status = 403, description = "Caller is not the leader"),
        (status = 409, description = "Team already registered or below minimum size")
    ),
    security(("bearer_auth" = []))
)]
pub async fn register_team(
    State(state): State<TeamsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<RegisterTeamResponse>, TesseraError> {
    checks::require_participant(&auth.0)?;

    let (team, tickets) = state.team_service.register_team(&auth.0.user_id, &id).await?;
    Ok(Json(RegisterTeamResponse {
        team: team.into(),
        tickets: tickets.into_iter().map(Into::into).collect(),
    }))
}

/// Leave a team (the leader deletes the team instead)
#[utoipa::path(
    post,
    path = "/{id}/leave",
    tag = "teams",
    params(
        ("id" = String, Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Left the team", body = TeamResponse),
        (status = 409, description = "Team registered or leader leaving")
    ),
    security(("bearer_auth" = []))
)]
pub async fn leave_team(
    State(state): State<TeamsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<TeamResponse>, TesseraError> {
    checks::require_participant(&auth.0)?;

    let team = state.team_service.leave_team(&auth.0.user_id, &id).await?;
    Ok(Json(team.into()))
}

/// Delete a team (leader or admin; not once registered)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "teams",
    params(
        ("id" = String, Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Team deleted", body = SuccessResponse),
        (status = 409, description = "Registered teams cannot be deleted")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_team(
    State(state): State<TeamsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, TesseraError> {
    state.team_service.delete_team(&auth.0, &id).await?;
    Ok(Json(SuccessResponse::with_message("Team deleted")))
}

/// Create teams router
pub fn teams_router(state: TeamsState) -> Router {
    Router::new()
        .route("/", post(create_team))
        .route("/join", post(join_team))
        .route("/mine", get(my_teams))
        .route("/:id/register", post(register_team))
        .route("/:id/leave", post(leave_team))
        .route("/:id", delete(delete_team))
        .with_state(state)
}
