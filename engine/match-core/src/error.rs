//! Error taxonomy for session and registry operations.
//!
//! Every variant is a local, synchronous failure. A failed operation leaves
//! the session exactly as it was before the call.

use games_xiangqi::XiangqiError;

use crate::session::{SessionId, Status};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    /// Rules violation on the board
    #[error(transparent)]
    IllegalMove(#[from] XiangqiError),

    #[error("session {id} is not active (status: {status})")]
    GameNotActive { id: SessionId, status: Status },

    #[error("session {id} is full")]
    SessionFull { id: SessionId },

    #[error("invalid password for session {id}")]
    InvalidPassword { id: SessionId },

    #[error("session {id} not found")]
    NotFound { id: SessionId },

    #[error("invalid status transition for session {id}: {from} -> {to}")]
    InvalidTransition {
        id: SessionId,
        from: Status,
        to: Status,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("invalid session config: {reason}")]
    InvalidConfig { reason: String },

    #[error("session registry is closed")]
    Closed,
}
