//! Claim extraction middleware
//!
//! Resolves the caller's identity with the configured [`IdentityStrategy`]
//! and stores a [`ResolvedIdentity`] in the request extensions. Only one
//! strategy runs per request. Failures never short-circuit the request:
//! handlers decide whether anonymous access is acceptable.
//!
//! | Strategy | Source |
//! |----------|--------|
//! | `local-verify` | `auth_token` cookie or `Authorization: Bearer`, verified here, then the revocation store |
//! | `trusted-header` | `x-user-*` headers set by the upstream gateway |

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::HeaderMap;
use sha2::{Digest, Sha256};

use crate::auth::identity::{AnonymousReason, AuthenticatedUser, ResolvedIdentity};
use crate::auth::jwt::JwtError;
use crate::auth::session::bearer_token;
use crate::auth::Principal;
use crate::core::ServerState;
use crate::core::config::IdentityStrategy;
use crate::security_log;

pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USERNAME: &str = "x-username";
pub const HEADER_USER_ROLES: &str = "x-user-roles";
pub const HEADER_USER_PERMISSIONS: &str = "x-user-permissions";
pub const HEADER_DEPARTMENT_ID: &str = "x-department-id";
pub const HEADER_USER_LEVEL: &str = "x-user-level";
pub const HEADER_SESSION_ID: &str = "x-session-id";
pub const HEADER_GATEWAY_SECRET: &str = "x-gateway-secret";

/// Identity resolution middleware
pub async fn resolve_identity(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = match state.config.identity_strategy {
        IdentityStrategy::LocalVerify => verify_local(&state, req.headers()).await,
        IdentityStrategy::TrustedHeader => {
            from_trusted_headers(req.headers(), state.config.trusted_gateway_secret.as_deref())
        }
    };

    if let ResolvedIdentity::Anonymous(reason) = &identity
        && *reason != AnonymousReason::MissingToken
    {
        security_log!(
            "WARN",
            "identity_rejected",
            reason = reason.as_str(),
            strategy = state.config.identity_strategy.as_str(),
            uri = req.uri().path()
        );
    }

    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// Verify the presented token and check it has not been revoked
async fn verify_local(state: &ServerState, headers: &HeaderMap) -> ResolvedIdentity {
    let Some(token) = bearer_token(headers) else {
        return ResolvedIdentity::Anonymous(AnonymousReason::MissingToken);
    };

    let claims = match state.jwt_service.verify(&token) {
        Ok(claims) => claims,
        Err(JwtError::ExpiredToken) => {
            return ResolvedIdentity::Anonymous(AnonymousReason::Expired);
        }
        Err(e) => {
            tracing::debug!(error = %e, "Token verification failed");
            return ResolvedIdentity::Anonymous(AnonymousReason::Invalid);
        }
    };

    match state.revocations.is_revoked(&claims.jti).await {
        Ok(false) => {}
        Ok(true) => return ResolvedIdentity::Anonymous(AnonymousReason::Revoked),
        Err(e) => {
            // Fail closed
            tracing::error!(target: "security", error = %e, jti = %claims.jti, "Revocation check failed");
            return ResolvedIdentity::Anonymous(AnonymousReason::StoreUnavailable);
        }
    }

    let issued_at = claims.iat;
    let expires_at = claims.exp;
    ResolvedIdentity::Authenticated(AuthenticatedUser {
        principal: Principal::from(claims),
        source: IdentityStrategy::LocalVerify,
        issued_at: Some(issued_at),
        expires_at: Some(expires_at),
    })
}

/// Build the identity forwarded by the gateway
pub fn from_trusted_headers(headers: &HeaderMap, gateway_secret: Option<&str>) -> ResolvedIdentity {
    if let Some(expected) = gateway_secret {
        let presented = header_str(headers, HEADER_GATEWAY_SECRET).unwrap_or_default();
        if !secrets_match(presented, expected) {
            return ResolvedIdentity::Anonymous(AnonymousReason::Invalid);
        }
    }

    let (Some(id), Some(username)) = (
        header_str(headers, HEADER_USER_ID),
        header_str(headers, HEADER_USERNAME),
    ) else {
        return ResolvedIdentity::Anonymous(AnonymousReason::MissingToken);
    };

    let level = match header_str(headers, HEADER_USER_LEVEL) {
        Some(raw) => match raw.parse() {
            Ok(level) => Some(level),
            Err(_) => return ResolvedIdentity::Anonymous(AnonymousReason::Invalid),
        },
        None => None,
    };

    ResolvedIdentity::Authenticated(AuthenticatedUser {
        principal: Principal {
            id: id.to_string(),
            username: username.to_string(),
            roles: header_list(headers, HEADER_USER_ROLES),
            permissions: header_list(headers, HEADER_USER_PERMISSIONS),
            department_id: header_str(headers, HEADER_DEPARTMENT_ID).map(str::to_string),
            level,
            session_id: header_str(headers, HEADER_SESSION_ID)
                .unwrap_or_default()
                .to_string(),
        },
        source: IdentityStrategy::TrustedHeader,
        issued_at: None,
        expires_at: None,
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn header_list(headers: &HeaderMap, name: &str) -> Vec<String> {
    header_str(headers, name)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Compare digests so neither length nor content leaks through timing
fn secrets_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn gateway_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_USER_ID, HeaderValue::from_static("u42"));
        headers.insert(HEADER_USERNAME, HeaderValue::from_static("carol"));
        headers.insert(HEADER_USER_ROLES, HeaderValue::from_static("staff, manager"));
        headers.insert(HEADER_USER_PERMISSIONS, HeaderValue::from_static("orders:*"));
        headers.insert(HEADER_USER_LEVEL, HeaderValue::from_static("4"));
        headers.insert(HEADER_SESSION_ID, HeaderValue::from_static("gw-session"));
        headers
    }

    #[test]
    fn test_trusted_headers_resolve_identity() {
        let identity = from_trusted_headers(&gateway_headers(), None);
        let user = identity.user().unwrap();

        assert_eq!(user.principal.id, "u42");
        assert_eq!(user.principal.roles, vec!["staff", "manager"]);
        assert_eq!(user.principal.level, Some(4));
        assert_eq!(user.principal.session_id, "gw-session");
        assert_eq!(user.source, IdentityStrategy::TrustedHeader);
        assert!(user.expires_at.is_none());
    }

    #[test]
    fn test_gateway_secret_enforced() {
        let mut headers = gateway_headers();
        assert_eq!(
            from_trusted_headers(&headers, Some("s3cret")),
            ResolvedIdentity::Anonymous(AnonymousReason::Invalid)
        );

        headers.insert(HEADER_GATEWAY_SECRET, HeaderValue::from_static("wrong"));
        assert!(!from_trusted_headers(&headers, Some("s3cret")).is_authenticated());

        headers.insert(HEADER_GATEWAY_SECRET, HeaderValue::from_static("s3cret"));
        assert!(from_trusted_headers(&headers, Some("s3cret")).is_authenticated());
    }

    #[test]
    fn test_missing_identity_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_USER_ID, HeaderValue::from_static("u42"));
        assert_eq!(
            from_trusted_headers(&headers, None),
            ResolvedIdentity::Anonymous(AnonymousReason::MissingToken)
        );
    }

    #[test]
    fn test_malformed_level_rejected() {
        let mut headers = gateway_headers();
        headers.insert(HEADER_USER_LEVEL, HeaderValue::from_static("high"));
        assert_eq!(
            from_trusted_headers(&headers, None),
            ResolvedIdentity::Anonymous(AnonymousReason::Invalid)
        );
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("abc", "abc"));
        assert!(!secrets_match("abc", "abd"));
        assert!(!secrets_match("", "abc"));
    }
}
