//! Session Server - credential-to-session authentication
//!
//! # Overview
//!
//! Authenticates users, issues signed session tokens carried in HttpOnly
//! cookies and revokes them on logout through a shared revocation store
//! that is consulted on every authenticated request.
//!
//! # Module layout
//!
//! ```text
//! session-server/src/
//! ├── core/          # config, state, server, errors
//! ├── auth/          # credentials, JWT, revocation, cookies, middleware
//! ├── audit/         # login/logout audit trail
//! ├── db/            # identity store
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # logging, client metadata
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod core;
pub mod db;
pub mod utils;

pub use api::build_app;
pub use auth::{CurrentUser, JwtService, Principal, ResolvedIdentity};
pub use crate::core::{Config, Server, ServerError, ServerState};

pub use shared::error::{AppError, ErrorCode, ErrorResponse};

pub use utils::logger::init_logger;

// Security logging macro - writes to the `security` target
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}
