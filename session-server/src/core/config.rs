//! Server configuration

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::auth::jwt::{JwtConfig, generate_secure_printable_jwt_secret};
use crate::auth::session::CookieConfig;

/// Minimum signing key length in bytes
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Upper bound for either token lifetime (one year)
pub const MAX_TOKEN_TTL_SECS: i64 = 366 * 24 * 3600;

/// Seed account used when running without a database in development
const DEFAULT_DEV_SEED_USERS: &str = "admin:admin123:admin:all";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in {1} environment")]
    MissingSecret(&'static str, String),

    #[error("{0} must not be empty in {1} environment")]
    EmptySecret(&'static str, String),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// How the claim extraction middleware resolves identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStrategy {
    /// Verify the session token locally and consult the revocation store
    LocalVerify,
    /// Trust identity headers forwarded by an upstream gateway
    TrustedHeader,
}

impl IdentityStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalVerify => "local-verify",
            Self::TrustedHeader => "trusted-header",
        }
    }
}

impl fmt::Display for IdentityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentityStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "local-verify" => Ok(Self::LocalVerify),
            "trusted-header" => Ok(Self::TrustedHeader),
            other => Err(ConfigError::invalid(
                "IDENTITY_STRATEGY",
                format!("expected local-verify or trusted-header, got {other:?}"),
            )),
        }
    }
}

/// Development account seeded into the in-memory identity store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl FromStr for SeedUser {
    type Err = ConfigError;

    /// `username:password[:role|role[:perm|perm]]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(4, ':');
        let username = parts.next().unwrap_or_default().trim();
        let password = parts.next().unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return Err(ConfigError::invalid(
                "DEV_SEED_USERS",
                "entries must look like username:password[:roles[:permissions]]",
            ));
        }
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            roles: split_list(parts.next().unwrap_or_default(), '|'),
            permissions: split_list(parts.next().unwrap_or_default(), '|'),
        })
    }
}

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | ENVIRONMENT | development | development, staging or production |
/// | HTTP_PORT | 8080 | HTTP listen port |
/// | DATABASE_URL | - | PostgreSQL URL (required outside development) |
/// | DB_MAX_CONNECTIONS | 10 | Pool size |
/// | JWT_SECRET | random in development | HS256 signing key, at least 32 bytes |
/// | JWT_ISSUER | session-server | `iss` claim |
/// | JWT_AUDIENCE | session-clients | `aud` claim |
/// | SESSION_TTL_SECS | 3600 | Default token lifetime |
/// | REMEMBER_ME_TTL_SECS | 604800 | Token lifetime with remember-me (at most one year) |
/// | IDENTITY_STRATEGY | local-verify | local-verify or trusted-header |
/// | TRUSTED_GATEWAY_SECRET | - | Shared secret expected in `x-gateway-secret` |
/// | COOKIE_SECURE | true outside development | Add `Secure` to cookies |
/// | AUX_SESSION_COOKIES | - | Extra cookie names cleared on logout |
/// | CORS_ALLOWED_ORIGINS | - | Origins allowed to send credentials |
/// | REVOCATION_TIMEOUT_MS | 50 | Revocation lookup deadline |
/// | REVOCATION_WRITE_TIMEOUT_MS | 1000 | Revocation write deadline on logout |
/// | REVOCATION_PURGE_INTERVAL_SECS | 600 | Expired revocation purge period |
/// | LOGIN_RATE_LIMIT_PER_MINUTE | 10 | Login attempts per client IP |
/// | TRUST_FORWARDED_FOR | false | Take the client IP from the proxy-appended `X-Forwarded-For` entry |
/// | LOGIN_PERMISSION_PREVIEW_LIMIT | 20 | Permissions listed in the login response |
/// | AUDIT_BUFFER_SIZE | 1024 | Audit channel capacity |
/// | DEV_SEED_USERS | admin:admin123:admin:all | Accounts seeded without a database |
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP port
    pub http_port: u16,
    /// PostgreSQL connection URL, in-memory stores when absent
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Token signing and lifetime settings
    pub jwt: JwtConfig,
    pub identity_strategy: IdentityStrategy,
    pub trusted_gateway_secret: Option<String>,
    pub cookies: CookieConfig,
    pub cors_allowed_origins: Vec<String>,
    pub revocation_timeout_ms: u64,
    pub revocation_write_timeout_ms: u64,
    pub revocation_purge_interval_secs: u64,
    pub login_rate_limit_per_minute: u32,
    /// Only enable behind a proxy that appends the peer address
    pub trust_forwarded_for: bool,
    pub login_permission_preview_limit: usize,
    pub audit_buffer_size: usize,
    pub dev_seed_users: Vec<SeedUser>,
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".into());
        let is_development = environment == "development";

        let database_url = lookup("DATABASE_URL").filter(|s| !s.is_empty());
        if database_url.is_none() && !is_development {
            return Err(ConfigError::MissingSecret("DATABASE_URL", environment));
        }

        let secret = match Self::require_secret(&lookup, "JWT_SECRET", &environment)? {
            Some(secret) => secret,
            None => {
                tracing::warn!(
                    "JWT_SECRET not set! Generating a temporary key for development; \
                     tokens will not survive a restart"
                );
                generate_secure_printable_jwt_secret()
            }
        };
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::invalid(
                "JWT_SECRET",
                format!("must be at least {MIN_JWT_SECRET_LEN} bytes long"),
            ));
        }

        let session_ttl_secs: i64 = parse_or(&lookup, "SESSION_TTL_SECS", 3600)?;
        let remember_me_ttl_secs: i64 = parse_or(&lookup, "REMEMBER_ME_TTL_SECS", 604_800)?;
        if session_ttl_secs <= 0 {
            return Err(ConfigError::invalid("SESSION_TTL_SECS", "must be positive"));
        }
        if remember_me_ttl_secs <= session_ttl_secs {
            return Err(ConfigError::invalid(
                "REMEMBER_ME_TTL_SECS",
                "must be greater than SESSION_TTL_SECS",
            ));
        }
        if remember_me_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::invalid(
                "REMEMBER_ME_TTL_SECS",
                format!("must be at most {MAX_TOKEN_TTL_SECS}"),
            ));
        }

        let identity_strategy = match lookup("IDENTITY_STRATEGY") {
            Some(value) => value.parse()?,
            None => IdentityStrategy::LocalVerify,
        };
        let trusted_gateway_secret = lookup("TRUSTED_GATEWAY_SECRET").filter(|s| !s.is_empty());
        if identity_strategy == IdentityStrategy::TrustedHeader
            && trusted_gateway_secret.is_none()
            && !is_development
        {
            tracing::warn!(
                "trusted-header identity without TRUSTED_GATEWAY_SECRET; \
                 this service must only be reachable through the gateway"
            );
        }

        let aux_cookies = split_list(&lookup("AUX_SESSION_COOKIES").unwrap_or_default(), ',');
        if let Some(bad) = aux_cookies.iter().find(|name| !is_cookie_name(name)) {
            return Err(ConfigError::invalid(
                "AUX_SESSION_COOKIES",
                format!("{bad:?} is not a valid cookie name"),
            ));
        }

        let revocation_timeout_ms: u64 = parse_or(&lookup, "REVOCATION_TIMEOUT_MS", 50)?;
        if revocation_timeout_ms == 0 {
            return Err(ConfigError::invalid("REVOCATION_TIMEOUT_MS", "must be positive"));
        }
        let revocation_write_timeout_ms: u64 =
            parse_or(&lookup, "REVOCATION_WRITE_TIMEOUT_MS", 1000)?;
        if revocation_write_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "REVOCATION_WRITE_TIMEOUT_MS",
                "must be positive",
            ));
        }
        let revocation_purge_interval_secs: u64 =
            parse_or(&lookup, "REVOCATION_PURGE_INTERVAL_SECS", 600)?;
        if revocation_purge_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "REVOCATION_PURGE_INTERVAL_SECS",
                "must be positive",
            ));
        }

        let dev_seed_users = if is_development {
            lookup("DEV_SEED_USERS")
                .unwrap_or_else(|| DEFAULT_DEV_SEED_USERS.into())
                .split(',')
                .filter(|entry| !entry.trim().is_empty())
                .map(str::parse)
                .collect::<Result<Vec<SeedUser>, _>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            http_port: parse_or(&lookup, "HTTP_PORT", 8080)?,
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            jwt: JwtConfig {
                secret,
                issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "session-server".into()),
                audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "session-clients".into()),
                session_ttl_secs,
                remember_me_ttl_secs,
            },
            identity_strategy,
            trusted_gateway_secret,
            cookies: CookieConfig {
                secure: parse_or(&lookup, "COOKIE_SECURE", !is_development)?,
                aux_cookies,
            },
            cors_allowed_origins: split_list(
                &lookup("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
                ',',
            ),
            revocation_timeout_ms,
            revocation_write_timeout_ms,
            revocation_purge_interval_secs,
            login_rate_limit_per_minute: parse_or(&lookup, "LOGIN_RATE_LIMIT_PER_MINUTE", 10)?,
            trust_forwarded_for: parse_or(&lookup, "TRUST_FORWARDED_FOR", false)?,
            login_permission_preview_limit: parse_or(
                &lookup,
                "LOGIN_PERMISSION_PREVIEW_LIMIT",
                20,
            )?,
            audit_buffer_size: parse_or(&lookup, "AUDIT_BUFFER_SIZE", 1024)?.max(1),
            dev_seed_users,
            environment,
        })
    }

    /// Require a secret: must be set and non-empty outside development.
    ///
    /// Returns `None` only in development when the variable is absent.
    fn require_secret<F>(
        lookup: &F,
        name: &'static str,
        environment: &str,
    ) -> Result<Option<String>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(name) {
            Some(val) if val.is_empty() && environment != "development" => {
                Err(ConfigError::EmptySecret(name, environment.to_string()))
            }
            Some(val) if val.is_empty() => Ok(None),
            Some(val) => Ok(Some(val)),
            None if environment != "development" => {
                Err(ConfigError::MissingSecret(name, environment.to_string()))
            }
            None => Ok(None),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(name, e.to_string())),
        _ => Ok(default),
    }
}

fn split_list(raw: &str, sep: char) -> Vec<String> {
    raw.split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// RFC 6265 token characters
fn is_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_development_defaults() {
        let config = load(&[("JWT_SECRET", SECRET)]).unwrap();
        assert!(config.is_development());
        assert_eq!(config.jwt.session_ttl_secs, 3600);
        assert_eq!(config.jwt.remember_me_ttl_secs, 604_800);
        assert_eq!(config.identity_strategy, IdentityStrategy::LocalVerify);
        assert_eq!(config.revocation_timeout_ms, 50);
        assert_eq!(config.revocation_write_timeout_ms, 1000);
        assert!(!config.trust_forwarded_for);
        assert_eq!(config.login_permission_preview_limit, 20);
        assert!(!config.cookies.secure);
        assert!(config.database_url.is_none());
        assert_eq!(config.dev_seed_users.len(), 1);
        assert_eq!(config.dev_seed_users[0].username, "admin");
    }

    #[test]
    fn test_development_generates_secret() {
        let config = load(&[]).unwrap();
        assert!(config.jwt.secret.len() >= MIN_JWT_SECRET_LEN);
    }

    #[test]
    fn test_production_requires_secrets() {
        let err = load(&[("ENVIRONMENT", "production"), ("DATABASE_URL", "postgres://x")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("JWT_SECRET", _)));

        let err = load(&[("ENVIRONMENT", "production"), ("JWT_SECRET", SECRET)]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("DATABASE_URL", _)));

        let config = load(&[
            ("ENVIRONMENT", "production"),
            ("JWT_SECRET", SECRET),
            ("DATABASE_URL", "postgres://x"),
        ])
        .unwrap();
        assert!(config.cookies.secure);
        assert!(config.dev_seed_users.is_empty());
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = load(&[("JWT_SECRET", "too-short")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "JWT_SECRET", .. }));
    }

    #[test]
    fn test_remember_me_ttl_must_exceed_default() {
        let err = load(&[
            ("JWT_SECRET", SECRET),
            ("SESSION_TTL_SECS", "3600"),
            ("REMEMBER_ME_TTL_SECS", "3600"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "REMEMBER_ME_TTL_SECS",
                ..
            }
        ));
    }

    #[test]
    fn test_token_lifetimes_are_bounded() {
        let err = load(&[
            ("JWT_SECRET", SECRET),
            ("REMEMBER_ME_TTL_SECS", "9223372036854775807"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "REMEMBER_ME_TTL_SECS",
                ..
            }
        ));

        let max = MAX_TOKEN_TTL_SECS.to_string();
        let config = load(&[("JWT_SECRET", SECRET), ("REMEMBER_ME_TTL_SECS", &max)]).unwrap();
        assert_eq!(config.jwt.remember_me_ttl_secs, MAX_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_identity_strategy_parsing() {
        let config = load(&[
            ("JWT_SECRET", SECRET),
            ("IDENTITY_STRATEGY", "trusted-header"),
            ("TRUSTED_GATEWAY_SECRET", "gw"),
        ])
        .unwrap();
        assert_eq!(config.identity_strategy, IdentityStrategy::TrustedHeader);
        assert_eq!(config.trusted_gateway_secret.as_deref(), Some("gw"));

        assert!(load(&[("JWT_SECRET", SECRET), ("IDENTITY_STRATEGY", "both")]).is_err());
    }

    #[test]
    fn test_aux_cookie_names_validated() {
        let config = load(&[("JWT_SECRET", SECRET), ("AUX_SESSION_COOKIES", "csrf, ui_state")])
            .unwrap();
        assert_eq!(config.cookies.aux_cookies, vec!["csrf", "ui_state"]);

        assert!(load(&[("JWT_SECRET", SECRET), ("AUX_SESSION_COOKIES", "bad;name")]).is_err());
    }

    #[test]
    fn test_seed_user_parsing() {
        let user: SeedUser = "alice:pw:staff|manager:orders:*".parse().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.password, "pw");
        assert_eq!(user.roles, vec!["staff", "manager"]);
        assert_eq!(user.permissions, vec!["orders:*"]);

        let user: SeedUser = "bob:secret".parse().unwrap();
        assert!(user.roles.is_empty());

        assert!("nopassword".parse::<SeedUser>().is_err());
    }

    #[test]
    fn test_invalid_number_reported() {
        let err = load(&[("JWT_SECRET", SECRET), ("HTTP_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "HTTP_PORT", .. }));
    }
}
