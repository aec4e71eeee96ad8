//! Login rate limiting per client IP

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::AppError;
use crate::core::ServerState;
use crate::security_log;
use crate::utils::client::client_ip;

const WINDOW: Duration = Duration::from_secs(60);
const STALE_AFTER: Duration = Duration::from_secs(300);

struct IpEntry {
    count: u32,
    window_start: Instant,
}

/// Fixed one-minute window counter keyed by client IP
#[derive(Clone, Default)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<String, IpEntry>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the request is allowed
    pub async fn check(&self, ip: &str, max_per_window: u32) -> bool {
        let mut map = self.inner.lock().await;
        let now = Instant::now();

        let entry = map.entry(ip.to_owned()).or_insert_with(|| IpEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= WINDOW {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        entry.count <= max_per_window
    }

    /// Drop entries whose window started more than five minutes ago
    pub async fn cleanup(&self) {
        let now = Instant::now();
        self.inner
            .lock()
            .await
            .retain(|_, entry| now.duration_since(entry.window_start) < STALE_AFTER);
    }

    pub async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}

/// Rate limit middleware for login; a limit of 0 disables it
pub async fn login_rate_limit(
    State(state): State<ServerState>,
    request: Request,
    next: Next,
) -> Response {
    let limit = state.config.login_rate_limit_per_minute;
    if limit > 0 {
        let ip = client_ip(
            request.headers(),
            request.extensions(),
            state.config.trust_forwarded_for,
        );
        if !state.rate_limiter.check(&ip, limit).await {
            security_log!("WARN", "login_rate_limited", ip = ip.as_str());
            return AppError::too_many_attempts().into_response();
        }
    }
    next.run(request).await
}
