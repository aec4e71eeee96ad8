//! Authentication
//!
//! - [`CredentialValidator`] - username/password verification
//! - [`JwtService`] - session token issuing and verification
//! - [`Revocations`] - shared revocation store
//! - [`SessionCookies`] - cookie transport
//! - [`resolve_identity`] - claim extraction middleware
//! - [`CurrentUser`] - extractor for protected handlers

pub mod credential;
pub mod extractor;
pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod rate_limit;
pub mod revocation;
pub mod session;

pub use credential::{AuthFailure, CredentialValidator, FailureReason};
pub use extractor::CurrentUser;
pub use identity::{AnonymousReason, AuthenticatedUser, ResolvedIdentity};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService, Principal, SessionToken, TokenIdentity};
pub use middleware::resolve_identity;
pub use rate_limit::{RateLimiter, login_rate_limit};
pub use revocation::{
    MemoryRevocationStore, PgRevocationStore, RevocationError, RevocationOutcome,
    RevocationReason, RevocationRecord, RevocationStore, Revocations,
};
pub use session::{CookieConfig, SessionCookies, bearer_token};
