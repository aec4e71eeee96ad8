//! Resolved request identity
//!
//! The claim extraction middleware places exactly one [`ResolvedIdentity`]
//! on every request it handles. Handlers read it through
//! [`CurrentUser`](crate::auth::CurrentUser) and never verify tokens again.

use shared::error::{AppError, ErrorCode};

use crate::auth::Principal;
use crate::core::config::IdentityStrategy;

/// Why a request carries no identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymousReason {
    MissingToken,
    Expired,
    Invalid,
    Revoked,
    /// Revocation status could not be confirmed
    StoreUnavailable,
}

impl AnonymousReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::Expired => "expired",
            Self::Invalid => "invalid",
            Self::Revoked => "revoked",
            Self::StoreUnavailable => "store_unavailable",
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingToken => ErrorCode::NotAuthenticated,
            Self::Expired => ErrorCode::TokenExpired,
            Self::Invalid => ErrorCode::TokenInvalid,
            Self::Revoked => ErrorCode::TokenRevoked,
            Self::StoreUnavailable => ErrorCode::RevocationUnavailable,
        }
    }
}

impl From<AnonymousReason> for AppError {
    fn from(reason: AnonymousReason) -> Self {
        AppError::new(reason.error_code())
    }
}

/// A principal together with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub principal: Principal,
    pub source: IdentityStrategy,
    /// Unix seconds, known only for locally verified tokens
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedIdentity {
    Authenticated(AuthenticatedUser),
    Anonymous(AnonymousReason),
}

impl ResolvedIdentity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous(_) => None,
        }
    }
}
