//! Authentication Routes
//!
//! | Path | Method | Identity |
//! |------|--------|----------|
//! | /api/auth/login | POST | none, rate limited per IP |
//! | /api/auth/logout | POST | reads the token itself |
//! | /api/auth/me | GET | required |
//! | /api/auth/check | GET | required |
//! | /api/auth/permissions | GET | required |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::{login_rate_limit, resolve_identity};
use crate::core::ServerState;

/// Build authentication router
pub fn router(state: ServerState) -> Router<ServerState> {
    let login = Router::new()
        .route("/api/auth/login", post(handler::login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login_rate_limit,
        ));

    let queries = Router::new()
        .route("/api/auth/me", get(handler::me))
        .route("/api/auth/check", get(handler::check_auth))
        .route("/api/auth/permissions", get(handler::permissions))
        .route_layer(middleware::from_fn_with_state(state, resolve_identity));

    Router::new()
        .route("/api/auth/logout", post(handler::logout))
        .merge(login)
        .merge(queries)
}
