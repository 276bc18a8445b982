//! Request types for the web API.

use games_xiangqi::Position;
use match_core::{SessionConfig, Status};
use serde::Deserialize;

/// Request to open a new session.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub title: String,
    pub stake_amount: f64,
    /// Wallet address of the creator
    pub host: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub password: Option<String>,
    /// Falls back to `session.max_players` from the server config
    #[serde(default)]
    pub max_players: Option<usize>,
}

impl CreateSessionRequest {
    pub fn into_config(self, default_max_players: usize) -> SessionConfig {
        SessionConfig {
            title: self.title,
            stake_amount: self.stake_amount,
            is_private: self.is_private,
            password: self.password,
            host: self.host,
            max_players: self.max_players.unwrap_or(default_max_players),
        }
    }
}

/// Take a seat without staking.
#[derive(Deserialize)]
pub struct JoinRequest {
    pub wallet: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// A confirmed on-chain stake.
#[derive(Deserialize)]
pub struct StakeRequest {
    pub wallet: String,
    pub amount: f64,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: Status,
}

/// Reconciled pool balance.
#[derive(Deserialize)]
pub struct PoolRequest {
    pub amount: f64,
}

#[derive(Deserialize)]
pub struct MoveRequest {
    pub from: Position,
    pub to: Position,
}

/// Query for `/sessions/:id/moves?x=&y=`.
#[derive(Deserialize)]
pub struct MovesQuery {
    pub x: u8,
    pub y: u8,
}
