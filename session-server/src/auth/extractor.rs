//! CurrentUser extractor
//!
//! Reads the identity the middleware resolved; never verifies anything itself.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::AppError;
use crate::auth::identity::{AuthenticatedUser, ResolvedIdentity};

/// Authenticated caller of a protected handler
///
/// Rejects with 401 carrying the reason the identity was not resolved.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<ResolvedIdentity>() {
            Some(ResolvedIdentity::Authenticated(user)) => Ok(Self(user.clone())),
            Some(ResolvedIdentity::Anonymous(reason)) => Err((*reason).into()),
            // Route is not behind resolve_identity
            None => Err(AppError::not_authenticated()),
        }
    }
}

impl std::ops::Deref for CurrentUser {
    type Target = AuthenticatedUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
