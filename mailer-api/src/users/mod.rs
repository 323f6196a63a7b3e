//! API users: credentials, API keys and the quota counters attached to them

pub mod manager;
pub mod types;

pub use manager::UserManager;
pub use types::{RegisterRequest, User};
