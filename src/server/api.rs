use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::LeagueError;
use crate::league::{self, MatchDetails, MatchRecord, PlayerRecord, QueryKind, TeamRecord};
use crate::server::AppState;
use crate::simulation::{rng, MatchEvent, SimulationSource};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    extra: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            extra: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "status": "error",
            "message": self.message,
        });
        if let (Some(Value::Object(extra)), Some(object)) = (self.extra, body.as_object_mut()) {
            object.extend(extra);
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<LeagueError> for ApiError {
    fn from(err: LeagueError) -> Self {
        let status = match &err {
            LeagueError::TeamNotFound(_)
            | LeagueError::PlayerNotFound(_)
            | LeagueError::MatchNotFound(_) => StatusCode::NOT_FOUND,
            LeagueError::NotParticipant => StatusCode::FORBIDDEN,
            LeagueError::PlayerAlreadySigned(_)
            | LeagueError::AlreadyFinished
            | LeagueError::InProgress => StatusCode::CONFLICT,
            LeagueError::MissingEmail
            | LeagueError::MissingTeamName
            | LeagueError::PlayerNotInRoster(_)
            | LeagueError::BudgetExceeded { .. }
            | LeagueError::SameTeam
            | LeagueError::NotReady { .. } => StatusCode::BAD_REQUEST,
        };
        let extra = match &err {
            LeagueError::NotReady { home_ready, away_ready } => Some(json!({
                "home_ready": home_ready,
                "away_ready": away_ready,
            })),
            _ => None,
        };
        Self {
            status,
            message: err.to_string(),
            extra,
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(ApiError::from)
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "calcio-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "llm_configured": state.simulator().remote_configured(),
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Route not found")
}

#[derive(Debug, Deserialize)]
pub struct InitTeamRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

pub async fn init_team(
    State(state): State<AppState>,
    payload: Result<Json<InitTeamRequest>, JsonRejection>,
) -> ApiResult<TeamRecord> {
    let req = body(payload)?;
    let email = req.email.unwrap_or_default();
    let team = state.league_mut().init_team(&email, req.name.as_deref())?;
    Ok(Json(team))
}

pub async fn roster(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Vec<PlayerRecord>> {
    Ok(Json(state.league().roster(&email)?))
}

#[derive(Debug, Deserialize)]
pub struct SignPlayerRequest {
    pub player_id: u32,
}

pub async fn sign_player(
    State(state): State<AppState>,
    Path(email): Path<String>,
    payload: Result<Json<SignPlayerRequest>, JsonRejection>,
) -> ApiResult<PlayerRecord> {
    let req = body(payload)?;
    let player = state.league_mut().sign_player(&email, req.player_id)?;
    Ok(Json(player))
}

pub async fn release_player(
    State(state): State<AppState>,
    Path((email, player_id)): Path<(String, u32)>,
) -> ApiResult<Value> {
    state.league_mut().release_player(&email, player_id)?;
    Ok(Json(json!({ "status": "ok", "released": player_id })))
}

#[derive(Debug, Deserialize)]
pub struct QueryCheckRequest {
    pub email: String,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryCheckResponse {
    pub accepted: bool,
    pub kind: QueryKind,
    pub team_id: u32,
}

pub async fn check_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryCheckRequest>, JsonRejection>,
) -> ApiResult<QueryCheckResponse> {
    let req = body(payload)?;
    let team_id = state.league().team_by_email(&req.email)?.id;
    let kind = league::check_query(&req.query, team_id)
        .map_err(|rejection| ApiError::bad_request(rejection.to_string()))?;
    Ok(Json(QueryCheckResponse {
        accepted: true,
        kind,
        team_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleMatchRequest {
    pub home_email: String,
    pub away_email: String,
}

pub async fn schedule_match(
    State(state): State<AppState>,
    payload: Result<Json<ScheduleMatchRequest>, JsonRejection>,
) -> ApiResult<MatchRecord> {
    let req = body(payload)?;
    let record = state
        .league_mut()
        .schedule_match(&req.home_email, &req.away_email)?;
    Ok(Json(record))
}

pub async fn matches(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Vec<MatchDetails>> {
    Ok(Json(state.league().matches_for(&email)?))
}

pub async fn match_details(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> ApiResult<MatchDetails> {
    Ok(Json(state.league().match_details(id)?))
}

pub async fn timeline(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> ApiResult<Vec<MatchEvent>> {
    Ok(Json(state.league().timeline(id)?))
}

#[derive(Debug, Deserialize)]
pub struct ReadyRequest {
    pub email: String,
    pub tactic: Option<String>,
}

pub async fn set_ready(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    payload: Result<Json<ReadyRequest>, JsonRejection>,
) -> ApiResult<MatchDetails> {
    let req = body(payload)?;
    let details = state
        .league_mut()
        .set_ready(id, &req.email, req.tactic.as_deref())?;
    Ok(Json(details))
}

#[derive(Debug, Deserialize)]
pub struct StartMatchRequest {
    pub id_partita: u32,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct StartMatchResponse {
    pub success: bool,
    pub source: SimulationSource,
    pub partita: MatchSummary,
    pub events: Vec<MatchEvent>,
}

#[derive(Debug, Serialize)]
pub struct MatchSummary {
    pub id_partita: u32,
    pub goals_team_1: u32,
    pub goals_team_2: u32,
    pub score_string: String,
}

/// Releases the in-progress mark if the handler ends before the result is
/// recorded, including when the request future is dropped.
struct KickoffClaim {
    state: AppState,
    match_id: u32,
}

impl Drop for KickoffClaim {
    fn drop(&mut self) {
        self.state.league_mut().abandon_kickoff(self.match_id);
    }
}

pub async fn start_match(
    State(state): State<AppState>,
    payload: Result<Json<StartMatchRequest>, JsonRejection>,
) -> ApiResult<StartMatchResponse> {
    let req = body(payload)?;
    let kickoff = state.league_mut().start_kickoff(req.id_partita, &req.email)?;
    let _claim = KickoffClaim {
        state: state.clone(),
        match_id: kickoff.match_id,
    };
    tracing::info!(
        match_id = kickoff.match_id,
        home = %kickoff.home.name,
        away = %kickoff.away.name,
        "starting match simulation"
    );

    let mut rng = rng::from_entropy();
    let outcome = state
        .simulator()
        .simulate_seeded(
            &kickoff.home,
            &kickoff.away,
            &kickoff.home_tactic,
            &kickoff.away_tactic,
            &mut rng,
        )
        .await;

    state
        .league_mut()
        .record_result(kickoff.match_id, &outcome.result, outcome.source)?;
    tracing::info!(
        match_id = kickoff.match_id,
        score = %outcome.result.score_string,
        source = ?outcome.source,
        "match completed"
    );

    let result = outcome.result;
    Ok(Json(StartMatchResponse {
        success: true,
        source: outcome.source,
        partita: MatchSummary {
            id_partita: kickoff.match_id,
            goals_team_1: result.goals_team_1,
            goals_team_2: result.goals_team_2,
            score_string: result.score_string,
        },
        events: result.events,
    }))
}
