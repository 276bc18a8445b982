//! Session lobby, staking and gameplay handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use games_xiangqi::Position;
use match_core::{MatchError, SessionId, Status};
use std::sync::Arc;
use tracing::warn;

use crate::metrics;
use crate::types::{
    CreateSessionRequest, JoinRequest, MoveRequest, MoveResponse, MovesQuery, PoolRequest,
    PossibleMovesResponse, SessionListResponse, SessionResponse, StakeRequest, StatusRequest,
};
use crate::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Map a session error onto an HTTP status with a readable message.
pub fn error_response(err: MatchError) -> (StatusCode, String) {
    let status = match &err {
        MatchError::IllegalMove(_)
        | MatchError::InvalidAmount { .. }
        | MatchError::InvalidConfig { .. } => StatusCode::BAD_REQUEST,
        MatchError::InvalidPassword { .. } => StatusCode::FORBIDDEN,
        MatchError::NotFound { .. } => StatusCode::NOT_FOUND,
        MatchError::SessionFull { .. }
        | MatchError::GameNotActive { .. }
        | MatchError::InvalidTransition { .. } => StatusCode::CONFLICT,
        MatchError::Closed => StatusCode::SERVICE_UNAVAILABLE,
    };
    if status.is_server_error() {
        warn!("Request rejected: {}", err);
    }
    (status, err.to_string())
}

fn refresh_gauges(state: &AppState) {
    metrics::SESSIONS_ACTIVE.set(state.registry.count_with_status(Status::Active) as i64);
    metrics::SESSIONS_WAITING.set(state.registry.count_with_status(Status::Waiting) as i64);
}

/// List every session.
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionListResponse> {
    Json(state.registry.list_all().into())
}

/// Public lobby: open, Waiting sessions with a free seat.
pub async fn list_available(State(state): State<Arc<AppState>>) -> Json<SessionListResponse> {
    Json(state.registry.list_available().into())
}

pub async fn list_active(State(state): State<Arc<AppState>>) -> Json<SessionListResponse> {
    Json(state.registry.list_active().into())
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), (StatusCode, String)> {
    let config = req.into_config(state.default_max_players);
    let session = state.registry.create(config).map_err(error_response)?;
    metrics::SESSIONS_CREATED.inc();
    refresh_gauges(&state);
    Ok((StatusCode::CREATED, Json(session.into())))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
) -> ApiResult<SessionResponse> {
    state
        .registry
        .get(id)
        .map(|s| Json(s.into()))
        .ok_or_else(|| error_response(MatchError::NotFound { id }))
}

pub async fn join_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
    Json(req): Json<JoinRequest>,
) -> ApiResult<SessionResponse> {
    let session = state
        .registry
        .join_public(id, &req.wallet, req.password.as_deref())
        .map_err(error_response)?;
    refresh_gauges(&state);
    Ok(Json(session.into()))
}

/// Record a confirmed stake. Activates the session once enough stakes are in.
pub async fn record_stake(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
    Json(req): Json<StakeRequest>,
) -> ApiResult<SessionResponse> {
    let session = state
        .registry
        .record_stake(id, &req.wallet, req.amount)
        .map_err(error_response)?;
    metrics::STAKES_RECORDED.inc();
    refresh_gauges(&state);
    Ok(Json(session.into()))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<SessionResponse> {
    let session = state
        .registry
        .update_status(id, req.status)
        .map_err(error_response)?;
    // Finished -> Finished is rejected, so success here is a real transition
    if req.status == Status::Finished {
        metrics::SESSIONS_FINISHED.inc();
    }
    refresh_gauges(&state);
    Ok(Json(session.into()))
}

pub async fn update_pool(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
    Json(req): Json<PoolRequest>,
) -> ApiResult<SessionResponse> {
    let session = state
        .registry
        .update_pool(id, req.amount)
        .map_err(error_response)?;
    Ok(Json(session.into()))
}

pub async fn join_spectator(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
) -> ApiResult<SessionResponse> {
    let session = state
        .registry
        .join_as_spectator(id)
        .map_err(error_response)?;
    Ok(Json(session.into()))
}

pub async fn leave_spectator(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
) -> ApiResult<SessionResponse> {
    let session = state
        .registry
        .leave_as_spectator(id)
        .map_err(error_response)?;
    Ok(Json(session.into()))
}

/// Apply a move. A move that captures a General also finishes the session.
pub async fn make_move(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<MoveResponse> {
    let outcome = state
        .registry
        .apply_move(id, req.from, req.to)
        .map_err(error_response)?;
    metrics::MOVES_PLAYED.inc();

    if outcome.terminal.finished {
        metrics::SESSIONS_FINISHED.inc();
        refresh_gauges(&state);
    }

    Ok(Json(outcome.into()))
}

/// Destinations for the piece on `(x, y)`. Empty when the square is empty
/// or the piece is not the side to move.
pub async fn possible_moves(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
    Query(query): Query<MovesQuery>,
) -> ApiResult<PossibleMovesResponse> {
    let from = Position::new(query.x, query.y);
    let moves = state
        .registry
        .possible_moves(id, from)
        .map_err(error_response)?;
    Ok(Json(PossibleMovesResponse { from, moves }))
}
