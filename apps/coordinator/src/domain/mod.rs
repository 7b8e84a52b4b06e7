//! Pure game model: players, games, phase rules and client snapshots.
//!
//! Nothing in here performs I/O or takes locks; the session coordinator owns
//! the concurrency around these types.

pub mod game;
pub mod player;
pub mod snapshot;
pub mod transition;

pub use game::{Game, GamePhase, LobbyCode, MatchSettings, Member, Orchestration, RoundLocation, ScoreDelta};
pub use player::{Guess, Player, PlayerId, UiMode, Username};
pub use snapshot::{compute_snapshot, PlayerLookup, PlayerView, Snapshot};
pub use transition::{next_phase, plan_advance, AdvancePlan, PhaseTrigger};
