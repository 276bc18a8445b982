//! One staked match: board, membership and the staking ledger.
//!
//! Status moves `Waiting -> Active -> Finished`. A session becomes Active on
//! its own once `stake_count` reaches `max_players`. Finished is only ever
//! entered through `set_status`; the registry calls it when a move leaves
//! `Board::terminal` finished.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use games_xiangqi::{Board, Move, Position, Terminal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::MatchError;

/// Players per match unless configured otherwise.
pub const DEFAULT_MAX_PLAYERS: usize = 2;

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Waiting,
    Active,
    Finished,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Waiting => write!(f, "waiting"),
            Status::Active => write!(f, "active"),
            Status::Finished => write!(f, "finished"),
        }
    }
}

fn default_max_players() -> usize {
    DEFAULT_MAX_PLAYERS
}

/// Parameters for a new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub title: String,
    pub stake_amount: f64,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub password: Option<String>,
    /// Wallet address of the creator
    pub host: String,
    #[serde(default = "default_max_players")]
    pub max_players: usize,
}

impl SessionConfig {
    pub fn new(title: impl Into<String>, stake_amount: f64, host: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            stake_amount,
            is_private: false,
            password: None,
            host: host.into(),
            max_players: DEFAULT_MAX_PLAYERS,
        }
    }

    /// Make the session private behind `password`.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.is_private = true;
        self.password = Some(password.into());
        self
    }

    pub fn with_max_players(mut self, max_players: usize) -> Self {
        self.max_players = max_players;
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        let invalid = |reason: &str| {
            Err(MatchError::InvalidConfig {
                reason: reason.to_string(),
            })
        };

        if self.title.trim().is_empty() {
            return invalid("title cannot be empty");
        }
        if self.host.trim().is_empty() {
            return invalid("host cannot be empty");
        }
        if !self.stake_amount.is_finite() || self.stake_amount < 0.0 {
            return invalid("stake_amount must be a non-negative number");
        }
        if self.max_players < 2 {
            return invalid("max_players must be at least 2");
        }
        if self.is_private && self.password.as_deref().map_or(true, str::is_empty) {
            return invalid("private sessions require a password");
        }
        Ok(())
    }
}

/// A single match. Fields are only changed through the methods below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: SessionId,
    title: String,
    stake_amount: f64,
    max_players: usize,
    is_private: bool,
    password: Option<String>,
    host: String,
    status: Status,
    players: Vec<String>,
    stake_count: u32,
    pool_amount: f64,
    spectator_count: u32,
    created_at: DateTime<Utc>,
    board: Board,
}

impl Session {
    /// Create a Waiting session with a fresh board.
    pub fn create(config: SessionConfig) -> Result<Self, MatchError> {
        Self::create_at(config, Utc::now())
    }

    /// Same as `create` with an explicit creation time.
    pub fn create_at(config: SessionConfig, created_at: DateTime<Utc>) -> Result<Self, MatchError> {
        config.validate()?;

        Ok(Self {
            id: SessionId::new(),
            title: config.title,
            stake_amount: config.stake_amount,
            max_players: config.max_players,
            is_private: config.is_private,
            password: config.password.filter(|_| config.is_private),
            host: config.host,
            status: Status::Waiting,
            players: Vec::new(),
            stake_count: 0,
            pool_amount: 0.0,
            spectator_count: 0,
            created_at,
            board: Board::new(),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn stake_amount(&self) -> f64 {
        self.stake_amount
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn players(&self) -> &[String] {
        &self.players
    }

    pub fn stake_count(&self) -> u32 {
        self.stake_count
    }

    pub fn pool_amount(&self) -> f64 {
        self.pool_amount
    }

    pub fn spectator_count(&self) -> u32 {
        self.spectator_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn has_player(&self, wallet: &str) -> bool {
        self.players.iter().any(|p| p == wallet)
    }

    /// Listed in the public lobby: public, Waiting, with a free seat.
    pub fn is_available(&self) -> bool {
        !self.is_private && self.status == Status::Waiting && self.players.len() < self.max_players
    }

    /// Waiting for longer than `ttl` as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.status == Status::Waiting && now - self.created_at > ttl
    }

    fn is_full_for(&self, wallet: &str) -> bool {
        !self.has_player(wallet) && self.players.len() >= self.max_players
    }

    /// Count a confirmed stake from `wallet`.
    ///
    /// Re-staking by an enrolled wallet is always accepted; it tops up the
    /// pool and the stake count without adding a second seat. This is what
    /// lets one wallet act from several browser sessions.
    pub fn record_stake(&mut self, wallet: &str, amount: f64) -> Result<(), MatchError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(MatchError::InvalidAmount { amount });
        }
        if !self.has_player(wallet)
            && (self.stake_count as usize >= self.max_players || self.is_full_for(wallet))
        {
            return Err(MatchError::SessionFull { id: self.id });
        }

        self.stake_count = self.stake_count.saturating_add(1);
        if !self.has_player(wallet) {
            self.players.push(wallet.to_string());
        }
        self.pool_amount += amount;
        debug!(
            session_id = %self.id,
            wallet,
            amount,
            stake_count = self.stake_count,
            pool_amount = self.pool_amount,
            "Stake recorded"
        );

        if self.status == Status::Waiting && self.stake_count as usize >= self.max_players {
            self.status = Status::Active;
            info!(session_id = %self.id, pool_amount = self.pool_amount, "Session activated");
        }
        Ok(())
    }

    /// Take a seat without staking. Idempotent for enrolled wallets.
    pub fn join_public(&mut self, wallet: &str, password: Option<&str>) -> Result<(), MatchError> {
        if self.is_private && self.password.as_deref() != password {
            return Err(MatchError::InvalidPassword { id: self.id });
        }
        if self.is_full_for(wallet) {
            return Err(MatchError::SessionFull { id: self.id });
        }
        if !self.has_player(wallet) {
            self.players.push(wallet.to_string());
            debug!(session_id = %self.id, wallet, "Player joined");
        }
        Ok(())
    }

    pub fn join_as_spectator(&mut self) {
        self.spectator_count = self.spectator_count.saturating_add(1);
    }

    pub fn leave_as_spectator(&mut self) {
        self.spectator_count = self.spectator_count.saturating_sub(1);
    }

    /// Change status. Re-setting the current status is a no-op; Finished is final.
    pub fn set_status(&mut self, next: Status) -> Result<(), MatchError> {
        let allowed = matches!(
            (self.status, next),
            (Status::Waiting, Status::Waiting)
                | (Status::Waiting, Status::Active)
                | (Status::Waiting, Status::Finished)
                | (Status::Active, Status::Active)
                | (Status::Active, Status::Finished)
        );
        if !allowed {
            return Err(MatchError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        if self.status != next {
            info!(session_id = %self.id, from = %self.status, to = %next, "Session status changed");
            self.status = next;
        }
        Ok(())
    }

    /// Overwrite the pool with a reconciled amount (e.g. an on-chain balance).
    pub fn update_pool(&mut self, amount: f64) -> Result<(), MatchError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(MatchError::InvalidAmount { amount });
        }
        self.pool_amount = amount;
        Ok(())
    }

    pub fn apply_move(&mut self, from: Position, to: Position) -> Result<Move, MatchError> {
        if self.status != Status::Active {
            return Err(MatchError::GameNotActive {
                id: self.id,
                status: self.status,
            });
        }
        let record = self.board.apply_move(from, to)?;
        debug!(
            session_id = %self.id,
            from = %from,
            to = %to,
            sequence = record.sequence_number,
            "Move applied"
        );
        Ok(record)
    }

    pub fn possible_moves(&self, pos: Position) -> Vec<Position> {
        self.board.possible_moves(pos)
    }

    pub fn terminal(&self) -> Terminal {
        self.board.terminal()
    }
}
