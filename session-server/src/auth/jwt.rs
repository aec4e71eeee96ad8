//! JWT token service
//!
//! Issues and verifies HS256 session tokens and derives the identifier the
//! revocation store keys on.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared::client::UserView;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Signing key (at least 32 bytes)
    pub secret: String,
    /// Token issuer
    pub issuer: String,
    /// Token audience
    pub audience: String,
    /// Default token lifetime (seconds)
    pub session_ttl_secs: i64,
    /// Token lifetime when remember-me is requested (seconds)
    pub remember_me_ttl_secs: i64,
}

impl JwtConfig {
    /// Token lifetime for a login
    pub fn ttl_for(&self, remember_me: bool) -> i64 {
        if remember_me {
            self.remember_me_ttl_secs
        } else {
            self.session_ttl_secs
        }
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("remember_me_ttl_secs", &self.remember_me_ttl_secs)
            .finish()
    }
}

/// Claims stored in the token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// User ID (Subject)
    pub sub: String,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    /// Token ID, equal to the session ID
    pub jti: String,
    /// Expiration (unix seconds)
    pub exp: i64,
    /// Issued at (unix seconds)
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    ExpiredToken,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token generation failed: {0}")]
    GenerationFailed(String),
}

/// Authenticated identity carried inside a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub department_id: Option<String>,
    pub level: Option<i32>,
    /// Unique per login, doubles as the token ID
    pub session_id: String,
}

impl Principal {
    /// Client view with the full permission list, session id omitted
    pub fn to_view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            username: self.username.clone(),
            roles: self.roles.clone(),
            permissions: self.permissions.clone(),
            department_id: self.department_id.clone(),
            level: self.level,
            session_id: None,
        }
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            roles: claims.roles,
            permissions: claims.permissions,
            department_id: claims.department_id,
            level: claims.level,
            session_id: claims.jti,
        }
    }
}

/// A freshly issued token
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub session_id: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub ttl_secs: i64,
}

/// Revocation key of a token this service signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    /// `jti` claim
    pub id: String,
    /// `exp` claim; the revocation record is purgeable after it
    pub expires_at: i64,
    /// `sub` claim
    pub subject: String,
}

/// Generate a printable signing key (development only)
pub fn generate_secure_printable_jwt_secret() -> String {
    const ALLOWED: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-_=+[]{}|;:,.<>?";

    let rng = SystemRandom::new();
    let mut bytes = [0u8; 64];
    if rng.fill(&mut bytes).is_err() {
        // Fall back to a per-process value; still unusable outside development
        return format!(
            "session-server-dev-{}-{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
    }

    bytes
        .iter()
        .map(|b| ALLOWED[*b as usize % ALLOWED.len()] as char)
        .collect()
}

/// JWT token service
#[derive(Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Sign a token for `principal` valid for `ttl_secs`
    pub fn issue(&self, principal: &Principal, ttl_secs: i64) -> Result<SessionToken, JwtError> {
        let now = Utc::now().timestamp();
        let expires_at = now
            .checked_add(ttl_secs)
            .ok_or_else(|| JwtError::GenerationFailed(format!("ttl {ttl_secs}s out of range")))?;

        let claims = Claims {
            sub: principal.id.clone(),
            username: principal.username.clone(),
            roles: principal.roles.clone(),
            permissions: principal.permissions.clone(),
            department_id: principal.department_id.clone(),
            level: principal.level,
            jti: principal.session_id.clone(),
            exp: expires_at,
            iat: now,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))?;

        Ok(SessionToken {
            token,
            session_id: principal.session_id.clone(),
            issued_at: now,
            expires_at,
            ttl_secs,
        })
    }

    /// Verify signature, expiry, issuer and audience
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation(true))
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                ErrorKind::InvalidToken => JwtError::InvalidToken(e.to_string()),
                _ => JwtError::InvalidToken(format!("Token validation failed: {}", e)),
            })
    }

    /// Revocation key for a presented token.
    ///
    /// The signature is still checked so a forged token cannot name another
    /// session's `jti`; expiry is ignored so an expired token can still be
    /// revoked on logout. `None` when the token was not signed by this
    /// service: no session could ever resolve from it.
    pub fn token_id(&self, token: &str) -> Option<TokenIdentity> {
        decode::<Claims>(token, &self.decoding_key, &self.validation(false))
            .ok()
            .map(|data| TokenIdentity {
                id: data.claims.jti,
                expires_at: data.claims.exp,
                subject: data.claims.sub,
            })
    }

    fn validation(&self, validate_exp: bool) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud", "jti"]);
        validation.validate_exp = validate_exp;
        validation.leeway = 0;
        validation
    }

    /// Extract the token from an Authorization header value
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
