pub mod session;

pub use session::SessionCoordinator;
