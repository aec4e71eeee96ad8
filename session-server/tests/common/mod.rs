//! Shared fixtures: in-memory stores, a router and request helpers

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use http::{HeaderMap, Method, Request, Response, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use session_server::audit::{AuditAction, AuditEvent, AuditService, AuditWorker, MemoryAuditSink};
use session_server::auth::{
    MemoryRevocationStore, RevocationError, RevocationRecord, RevocationStore,
};
use session_server::db::{MemoryUserStore, UserRecord};
use session_server::{Config, ServerState, build_app};

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

pub struct TestApp {
    pub app: Router,
    pub state: ServerState,
    pub users: Arc<MemoryUserStore>,
    pub audit: MemoryAuditSink,
}

pub fn config(extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("JWT_SECRET".to_string(), SECRET.to_string()),
        ("LOGIN_RATE_LIMIT_PER_MINUTE".to_string(), "1000".to_string()),
        ("DEV_SEED_USERS".to_string(), String::new()),
    ]);
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    Config::from_vars(|name| vars.get(name).cloned()).expect("test config")
}

/// Argon2 with minimal cost so tests stay fast
pub fn cheap_hash(password: &str) -> String {
    let params = Params::new(8, 1, 1, None).unwrap();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
        .unwrap()
        .to_string()
}

pub fn user(id: &str, username: &str, password: &str) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        username: username.to_string(),
        password_hash: cheap_hash(password),
        roles: vec!["staff".to_string()],
        permissions: vec!["orders:read".to_string(), "orders:write".to_string()],
        department_id: Some("dept-1".to_string()),
        level: Some(2),
        display_name: Some(format!("{username} (display)")),
        email: Some(format!("{username}@example.com")),
        is_active: true,
        created_at: 1_700_000_000_000,
    }
}

pub async fn spawn_app(extra: &[(&str, &str)]) -> TestApp {
    spawn_app_with(config(extra), Arc::new(MemoryRevocationStore::new())).await
}

pub async fn spawn_app_with(config: Config, revocations: Arc<dyn RevocationStore>) -> TestApp {
    let users = Arc::new(MemoryUserStore::new());
    users.insert(user("u-alice", "alice", "wonderland")).unwrap();

    let audit = MemoryAuditSink::new();
    let (audit_service, rx) = AuditService::new(64);
    tokio::spawn(AuditWorker::new(Arc::new(audit.clone())).run(rx));

    let state = ServerState::new(config, users.clone(), revocations, audit_service);
    TestApp {
        app: build_app(state.clone()),
        state,
        users,
        audit,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn login(&self, username: &str, password: &str, remember_me: bool) -> Response<Body> {
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "rememberMe": remember_me,
        });
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Log in and return the issued token
    pub async fn login_token(&self, username: &str, password: &str) -> String {
        let response = self.login(username, password, false).await;
        assert_eq!(response.status(), 200);
        cookie(response.headers(), "auth_token").expect("auth_token cookie")
    }

    pub async fn get_with_cookie(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, format!("auth_token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn logout(&self, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/logout");
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("auth_token={token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Wait until the audit worker has persisted `count` events of `action`
    pub async fn audit_events(&self, action: AuditAction, count: usize) -> Vec<AuditEvent> {
        for _ in 0..100 {
            let events = self.audit.by_action(action);
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} {action} audit events");
    }
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Value of a cookie set by the response, `None` when absent or cleared
pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    set_cookies(headers).into_iter().find_map(|c| {
        let (pair, _) = c.split_once(';').unwrap_or((c.as_str(), ""));
        let (k, v) = pair.split_once('=')?;
        (k == name && !v.is_empty()).then(|| v.to_string())
    })
}

pub fn max_age(headers: &HeaderMap, name: &str) -> Option<i64> {
    set_cookies(headers)
        .into_iter()
        .find(|c| c.starts_with(&format!("{name}=")))?
        .split(';')
        .find_map(|attr| attr.trim().strip_prefix("Max-Age=")?.parse().ok())
}

/// Revocation store that never answers successfully
pub struct FailingRevocationStore;

#[async_trait]
impl RevocationStore for FailingRevocationStore {
    async fn add(&self, _record: RevocationRecord) -> Result<bool, RevocationError> {
        Err(RevocationError::Unavailable("connection refused".into()))
    }

    async fn is_revoked(&self, _token_id: &str) -> Result<bool, RevocationError> {
        Err(RevocationError::Unavailable("connection refused".into()))
    }

    async fn purge_expired(&self, _now: i64) -> Result<u64, RevocationError> {
        Err(RevocationError::Unavailable("connection refused".into()))
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}

/// Revocation store whose writes never complete
pub struct HangingRevocationStore;

#[async_trait]
impl RevocationStore for HangingRevocationStore {
    async fn add(&self, _record: RevocationRecord) -> Result<bool, RevocationError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(true)
    }

    async fn is_revoked(&self, _token_id: &str) -> Result<bool, RevocationError> {
        Ok(false)
    }

    async fn purge_expired(&self, _now: i64) -> Result<u64, RevocationError> {
        Ok(0)
    }

    fn backend(&self) -> &'static str {
        "hanging"
    }
}
