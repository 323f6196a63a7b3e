//! mailer-api: transactional email over HTTP
//!
//! Authenticated clients submit raw or templated send requests. Each send is
//! checked against the caller's daily quota, recorded, and handed to an SMTP
//! relay; the record then reflects whether the relay accepted it.
//!
//! # Example
//!
//! ```no_run
//! use mailer_api::api::{ApiServer, AppState};
//! use mailer_api::config::Config;
//! use mailer_api::transport::SmtpRelay;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let pool = mailer_api::db::connect(&config.database.url, config.database.max_connections).await?;
//!     let transport = Arc::new(SmtpRelay::new(&config.smtp)?);
//!
//!     let state = Arc::new(AppState::build(pool, &config, transport).await?);
//!     ApiServer::new(state, config.server.listen_addr.clone(), config.server.max_body_bytes)
//!         .run()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`api`]: axum routes, API key middleware, response envelopes
//! - [`emails`]: send records and the dispatch pipeline
//! - [`quota`]: daily send limits
//! - [`templates`]: stored templates and `{{placeholder}}` rendering
//! - [`transport`]: SMTP relay and test transport
//! - [`users`]: accounts and API keys

pub mod api;
pub mod config;
pub mod db;
pub mod emails;
pub mod error;
pub mod logging;
pub mod quota;
pub mod templates;
pub mod transport;
pub mod users;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{MailerError, Result};
