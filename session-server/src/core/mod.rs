//! Core module - configuration, state, server and startup errors
//!
//! - [`Config`] - environment configuration
//! - [`ServerState`] - shared services injected into handlers
//! - [`Server`] - HTTP server lifecycle
//! - [`ServerError`] - startup failures

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::{Config, ConfigError, IdentityStrategy, SeedUser};
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
