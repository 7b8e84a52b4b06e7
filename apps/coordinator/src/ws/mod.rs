pub mod hub;
pub mod protocol;
pub mod session;

pub use hub::{ConnId, ConnectionRegistry};
pub use protocol::{ClientMsg, ServerMsg};
