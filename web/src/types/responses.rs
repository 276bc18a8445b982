//! Response types for the web API.

use chrono::{DateTime, Utc};
use games_xiangqi::{Color, Move, PieceDescriptor, Position};
use match_core::{MoveOutcome, Session, SessionId, Status};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions: usize,
}

/// Client view of a session. The password is never included.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: SessionId,
    pub title: String,
    pub stake_amount: f64,
    pub players: Vec<String>,
    pub max_players: usize,
    pub status: Status,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub host: String,
    pub spectators: u32,
    pub pool_amount: f64,
    pub stake_count: u32,
    /// 10 rows of 9 cells, row 0 is Black's back rank
    pub board: Vec<Vec<Option<PieceDescriptor>>>,
    pub current_player: Color,
    pub move_count: usize,
    pub last_move: Option<Move>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        let board = session.board();
        Self {
            id: session.id(),
            title: session.title().to_string(),
            stake_amount: session.stake_amount(),
            players: session.players().to_vec(),
            max_players: session.max_players(),
            status: session.status(),
            is_private: session.is_private(),
            created_at: session.created_at(),
            host: session.host().to_string(),
            spectators: session.spectator_count(),
            pool_amount: session.pool_amount(),
            stake_count: session.stake_count(),
            board: board.cells(),
            current_player: board.current_player(),
            move_count: board.moves().len(),
            last_move: board.last_move().cloned(),
        }
    }
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self::from(&session)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionResponse>,
}

impl From<Vec<Session>> for SessionListResponse {
    fn from(sessions: Vec<Session>) -> Self {
        Self {
            sessions: sessions.iter().map(SessionResponse::from).collect(),
        }
    }
}

/// Result of a move request.
#[derive(Debug, Serialize, Deserialize)]
pub struct MoveResponse {
    #[serde(rename = "move")]
    pub record: Move,
    pub finished: bool,
    pub winner: Option<Color>,
    pub session: SessionResponse,
}

impl From<MoveOutcome> for MoveResponse {
    fn from(outcome: MoveOutcome) -> Self {
        Self {
            record: outcome.record,
            finished: outcome.terminal.finished,
            winner: outcome.terminal.winner,
            session: SessionResponse::from(&outcome.session),
        }
    }
}

/// Destinations reachable from one square.
#[derive(Debug, Serialize, Deserialize)]
pub struct PossibleMovesResponse {
    pub from: Position,
    pub moves: Vec<Position>,
}
