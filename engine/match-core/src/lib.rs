//! Staked Xiangqi matches.
//!
//! A [`Session`] pairs a [`games_xiangqi::Board`] with membership and a
//! staking ledger. The [`SessionRegistry`] owns every live session and is the
//! only way the web layer reaches them.
//!
//! ```text
//!   create ──► Waiting ──(stake_count reaches max_players)──► Active ──► Finished
//!                 │                                                        ▲
//!                 └────────────────────── set_status ──────────────────────┘
//! ```

pub mod error;
pub mod registry;
pub mod session;

pub use error::MatchError;
pub use registry::{MoveOutcome, SessionRegistry, DEFAULT_WAITING_TTL_HOURS};
pub use session::{Session, SessionConfig, SessionId, Status, DEFAULT_MAX_PLAYERS};
