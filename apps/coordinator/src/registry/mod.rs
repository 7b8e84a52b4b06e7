//! In-memory registries owned by the session coordinator.

pub mod games;
pub mod players;

pub use games::{GameCell, GameRegistry, GameSlot};
pub use players::PlayerDirectory;
