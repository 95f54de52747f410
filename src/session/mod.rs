//! Study sessions over a list of cards

pub mod controller;
pub mod errors;
pub mod models;

pub use controller::SessionController;
pub use errors::{SessionError, SessionResult};
pub use models::*;
