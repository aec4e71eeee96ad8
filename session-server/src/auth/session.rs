//! Session cookies
//!
//! The session token travels in an HttpOnly `auth_token` cookie whose
//! `Max-Age` matches the token lifetime. A readable `remember_me` flag lets
//! client code show persistent-login state without seeing the token.

use http::header::{AUTHORIZATION, COOKIE, InvalidHeaderValue, SET_COOKIE};
use http::{HeaderMap, HeaderValue};

use crate::auth::jwt::{JwtService, SessionToken};

pub const AUTH_COOKIE: &str = "auth_token";
pub const REMEMBER_ME_COOKIE: &str = "remember_me";

const EPOCH: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Debug, Clone, Default)]
pub struct CookieConfig {
    /// Append `Secure`
    pub secure: bool,
    /// Extra session-scoped cookies cleared on logout
    pub aux_cookies: Vec<String>,
}

/// Writes and clears the session cookies on a response
#[derive(Debug, Clone)]
pub struct SessionCookies {
    config: CookieConfig,
}

impl SessionCookies {
    pub fn new(config: CookieConfig) -> Self {
        Self { config }
    }

    /// Bind `token` to the response
    pub fn attach(
        &self,
        headers: &mut HeaderMap,
        token: &SessionToken,
        remember_me: bool,
    ) -> Result<(), InvalidHeaderValue> {
        let max_age = token.ttl_secs.max(0);

        headers.append(
            SET_COOKIE,
            HeaderValue::from_str(&self.cookie(AUTH_COOKIE, &token.token, max_age, true))?,
        );

        if remember_me {
            headers.append(
                SET_COOKIE,
                HeaderValue::from_str(&self.cookie(REMEMBER_ME_COOKIE, "true", max_age, false))?,
            );
        } else {
            // A previous remember-me login may have left the flag behind
            headers.append(
                SET_COOKIE,
                HeaderValue::from_str(&self.expired(REMEMBER_ME_COOKIE, false))?,
            );
        }
        Ok(())
    }

    /// Expire every session cookie
    pub fn clear(&self, headers: &mut HeaderMap) {
        let names = [AUTH_COOKIE, REMEMBER_ME_COOKIE]
            .into_iter()
            .chain(self.config.aux_cookies.iter().map(String::as_str));

        for name in names {
            match HeaderValue::from_str(&self.expired(name, name == AUTH_COOKIE)) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(e) => tracing::warn!(cookie = name, error = %e, "Skipping unclearable cookie"),
            }
        }
    }

    fn cookie(&self, name: &str, value: &str, max_age: i64, http_only: bool) -> String {
        let mut cookie = format!("{name}={value}; Path=/; Max-Age={max_age}");
        self.push_attributes(&mut cookie, http_only);
        cookie
    }

    fn expired(&self, name: &str, http_only: bool) -> String {
        let mut cookie = format!("{name}=; Path=/; Max-Age=0; Expires={EPOCH}");
        self.push_attributes(&mut cookie, http_only);
        cookie
    }

    fn push_attributes(&self, cookie: &mut String, http_only: bool) {
        if http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie.push_str("; SameSite=Strict");
        if self.config.secure {
            cookie.push_str("; Secure");
        }
    }
}

/// Session token presented by the client: `auth_token` cookie first, then
/// `Authorization: Bearer`
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, AUTH_COOKIE)
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(JwtService::extract_from_header)
        })
        .map(str::to_string)
}

/// Value of the named cookie across all `Cookie` headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v)
}
