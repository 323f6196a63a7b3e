pub mod auth;
pub mod emails;
pub mod handlers;
pub mod server;
pub mod templates;
pub mod users;

pub use handlers::AppState;
pub use server::ApiServer;
