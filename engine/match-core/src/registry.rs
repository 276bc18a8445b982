//! Process-wide store of live sessions.
//!
//! The map sits behind an `RwLock` and every session behind its own `Mutex`.
//! Per-session operations take the map read lock and the session lock, so
//! two wallets staking into the same session are serialized while unrelated
//! sessions proceed in parallel. Inserting and removing sessions takes the
//! write lock, which also excludes every in-flight per-session operation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use games_xiangqi::{Move, Position, Terminal};
use tracing::{debug, info};

use crate::error::MatchError;
use crate::session::{Session, SessionConfig, SessionId, Status};

/// Waiting sessions older than this are dropped by `cleanup`.
pub const DEFAULT_WAITING_TTL_HOURS: i64 = 24;

/// Result of a successful move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub record: Move,
    pub terminal: Terminal,
    /// Session state right after the move
    pub session: Session,
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Mutex<Session>>>,
    waiting_ttl: Duration,
    closed: AtomicBool,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(cell: &Mutex<Session>) -> MutexGuard<'_, Session> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_waiting_ttl(Duration::hours(DEFAULT_WAITING_TTL_HOURS))
    }

    pub fn with_waiting_ttl(waiting_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            waiting_ttl,
            closed: AtomicBool::new(false),
        }
    }

    pub fn waiting_ttl(&self) -> Duration {
        self.waiting_ttl
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, Mutex<Session>>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, Mutex<Session>>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<(), MatchError> {
        if self.is_closed() {
            return Err(MatchError::Closed);
        }
        Ok(())
    }

    /// Run `op` against one session while holding its lock.
    ///
    /// `op` must leave the session untouched when it returns an error.
    fn with_session<T>(
        &self,
        id: SessionId,
        op: impl FnOnce(&mut Session) -> Result<T, MatchError>,
    ) -> Result<T, MatchError> {
        let sessions = self.read();
        self.ensure_open()?;
        let cell = sessions.get(&id).ok_or(MatchError::NotFound { id })?;
        let mut session = lock(cell);
        op(&mut session)
    }

    fn collect(&self, filter: impl Fn(&Session) -> bool) -> Vec<Session> {
        let sessions = self.read();
        let mut out: Vec<Session> = sessions
            .values()
            .filter_map(|cell| {
                let session = lock(cell);
                filter(&session).then(|| session.clone())
            })
            .collect();
        out.sort_by_key(|s| s.created_at());
        out
    }

    pub fn create(&self, config: SessionConfig) -> Result<Session, MatchError> {
        let session = Session::create(config)?;
        let mut sessions = self.write();
        self.ensure_open()?;
        sessions.insert(session.id(), Mutex::new(session.clone()));
        info!(
            session_id = %session.id(),
            title = session.title(),
            host = session.host(),
            stake_amount = session.stake_amount(),
            is_private = session.is_private(),
            "Session created"
        );
        Ok(session)
    }

    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.read().get(&id).map(|cell| lock(cell).clone())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of sessions currently in `status`.
    pub fn count_with_status(&self, status: Status) -> usize {
        self.read()
            .values()
            .filter(|cell| lock(cell).status() == status)
            .count()
    }

    /// Every session, oldest first.
    pub fn list_all(&self) -> Vec<Session> {
        self.collect(|_| true)
    }

    /// Public Waiting sessions with a free seat, oldest first.
    pub fn list_available(&self) -> Vec<Session> {
        self.collect(Session::is_available)
    }

    pub fn list_active(&self) -> Vec<Session> {
        self.collect(|s| s.status() == Status::Active)
    }

    pub fn join_public(
        &self,
        id: SessionId,
        wallet: &str,
        password: Option<&str>,
    ) -> Result<Session, MatchError> {
        self.with_session(id, |s| {
            s.join_public(wallet, password)?;
            Ok(s.clone())
        })
    }

    pub fn record_stake(
        &self,
        id: SessionId,
        wallet: &str,
        amount: f64,
    ) -> Result<Session, MatchError> {
        self.with_session(id, |s| {
            s.record_stake(wallet, amount)?;
            Ok(s.clone())
        })
    }

    pub fn join_as_spectator(&self, id: SessionId) -> Result<Session, MatchError> {
        self.with_session(id, |s| {
            s.join_as_spectator();
            Ok(s.clone())
        })
    }

    pub fn leave_as_spectator(&self, id: SessionId) -> Result<Session, MatchError> {
        self.with_session(id, |s| {
            s.leave_as_spectator();
            Ok(s.clone())
        })
    }

    pub fn update_status(&self, id: SessionId, status: Status) -> Result<Session, MatchError> {
        self.with_session(id, |s| {
            s.set_status(status)?;
            Ok(s.clone())
        })
    }

    pub fn update_pool(&self, id: SessionId, amount: f64) -> Result<Session, MatchError> {
        self.with_session(id, |s| {
            s.update_pool(amount)?;
            Ok(s.clone())
        })
    }

    /// Apply a move. A move that ends the game also finishes the session
    /// under the same lock, so no later move can land on a decided board.
    pub fn apply_move(
        &self,
        id: SessionId,
        from: Position,
        to: Position,
    ) -> Result<MoveOutcome, MatchError> {
        self.with_session(id, |s| {
            let record = s.apply_move(from, to)?;
            let terminal = s.terminal();
            if terminal.finished {
                s.set_status(Status::Finished)?;
            }
            Ok(MoveOutcome {
                record,
                terminal,
                session: s.clone(),
            })
        })
    }

    pub fn possible_moves(&self, id: SessionId, pos: Position) -> Result<Vec<Position>, MatchError> {
        self.with_session(id, |s| Ok(s.possible_moves(pos)))
    }

    pub fn terminal(&self, id: SessionId) -> Result<Terminal, MatchError> {
        self.with_session(id, |s| Ok(s.terminal()))
    }

    /// Drop Waiting sessions older than the TTL. Returns the removed ids.
    ///
    /// Expiry is judged under the write lock, so a session that was activated
    /// by a concurrent stake is never removed.
    pub fn cleanup(&self, now: DateTime<Utc>) -> Vec<SessionId> {
        let ttl = self.waiting_ttl;
        let mut removed = Vec::new();
        let mut sessions = self.write();
        sessions.retain(|id, cell| {
            let session = cell.get_mut().unwrap_or_else(PoisonError::into_inner);
            if session.is_expired(now, ttl) {
                removed.push(*id);
                false
            } else {
                true
            }
        });
        drop(sessions);

        if !removed.is_empty() {
            info!(count = removed.len(), "Expired waiting sessions removed");
        }
        removed
    }

    /// Copy of every session, for persistence.
    pub fn snapshot(&self) -> Vec<Session> {
        self.list_all()
    }

    /// Load previously persisted sessions. Existing entries with the same id
    /// are replaced. Returns how many sessions were loaded.
    pub fn restore(&self, restored: Vec<Session>) -> Result<usize, MatchError> {
        let mut sessions = self.write();
        self.ensure_open()?;
        let count = restored.len();
        for session in restored {
            debug!(session_id = %session.id(), status = %session.status(), "Session restored");
            sessions.insert(session.id(), Mutex::new(session));
        }
        Ok(count)
    }

    /// Refuse further mutations and hand back the final state.
    pub fn shutdown(&self) -> Vec<Session> {
        let sessions = self.write();
        self.closed.store(true, Ordering::SeqCst);
        let mut out: Vec<Session> = sessions.values().map(|cell| lock(cell).clone()).collect();
        drop(sessions);
        out.sort_by_key(|s| s.created_at());
        info!(sessions = out.len(), "Session registry closed");
        out
    }
}
