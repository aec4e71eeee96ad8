//! Authentication Handlers
//!
//! Login and logout change session state; me, check and permissions only
//! read the identity resolved by the middleware.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use http::HeaderMap;
use serde_json::json;

use crate::AppError;
use crate::audit::{AuditAction, AuditEvent};
use crate::auth::permissions::{preview, summarize};
use crate::auth::{
    AuthFailure, CurrentUser, RevocationOutcome, RevocationReason, bearer_token,
};
use crate::core::ServerState;
use crate::security_log;
use crate::utils::ClientInfo;
use shared::client::{
    CheckAuthResponse, LoginRequest, LoginResponse, LogoutResponse, MeResponse,
    PermissionsResponse, SessionInfo,
};
use shared::error::ErrorCode;

/// Login handler
///
/// Verifies credentials, issues a session token and binds it to cookies.
/// Every outcome is audited.
pub async fn login(
    State(state): State<ServerState>,
    client: ClientInfo,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<LoginResponse>), AppError> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Malformed login body");
            audit_login_failure(&state, &client, "", "invalid_input").await;
            return Err(AppError::invalid_request("Invalid login request"));
        }
    };

    let principal = match state.validator.validate(&req.username, &req.password).await {
        Ok(principal) => principal,
        Err(AuthFailure::InvalidInput) => {
            audit_login_failure(&state, &client, req.username.trim(), "invalid_input").await;
            return Err(AppError::invalid_request(
                "Username and password are required",
            ));
        }
        Err(AuthFailure::InvalidCredentials(reason)) => {
            audit_login_failure(&state, &client, req.username.trim(), reason.as_str()).await;
            security_log!(
                "WARN",
                "login_failed",
                username = req.username.trim(),
                ip = client.ip.as_str()
            );
            return Err(AppError::invalid_credentials());
        }
        Err(AuthFailure::Store(e)) => {
            tracing::error!(error = %e, "Identity store lookup failed during login");
            audit_login_failure(&state, &client, req.username.trim(), "store_error").await;
            return Err(AppError::new(ErrorCode::InternalError));
        }
    };

    let ttl = state.jwt_service.config.ttl_for(req.remember_me);
    let token = state.jwt_service.issue(&principal, ttl).map_err(|e| {
        tracing::error!(error = %e, user_id = %principal.id, "Token issuing failed");
        AppError::new(ErrorCode::InternalError)
    })?;

    let mut headers = HeaderMap::new();
    state
        .cookies
        .attach(&mut headers, &token, req.remember_me)
        .map_err(|e| {
            tracing::error!(error = %e, "Session cookie rejected");
            AppError::new(ErrorCode::InternalError)
        })?;

    state
        .audit_service
        .log(
            AuditEvent::new(AuditAction::LoginSuccess, true)
                .actor(principal.id.as_str())
                .client(client.ip.as_str(), client.user_agent.clone())
                .details(json!({
                    "username": principal.username,
                    "sessionId": token.session_id,
                    "rememberMe": req.remember_me,
                    "expiresAt": token.expires_at,
                })),
        )
        .await;

    tracing::info!(
        user_id = %principal.id,
        username = %principal.username,
        remember_me = req.remember_me,
        "User logged in"
    );

    let mut user = principal.to_view();
    user.permissions = preview(
        &principal.permissions,
        state.config.login_permission_preview_limit,
    );

    Ok((
        headers,
        Json(LoginResponse {
            user,
            remember_me: req.remember_me,
        }),
    ))
}

async fn audit_login_failure(state: &ServerState, client: &ClientInfo, username: &str, reason: &str) {
    state
        .audit_service
        .log(
            AuditEvent::new(AuditAction::LoginFailed, false)
                .actor(username)
                .client(client.ip.as_str(), client.user_agent.clone())
                .details(json!({ "reason": reason })),
        )
        .await;
}

/// Logout handler
///
/// Revokes the presented token when this service signed it and always
/// clears cookies. Store failures and the write deadline are logged, never
/// returned.
pub async fn logout(
    State(state): State<ServerState>,
    client: ClientInfo,
    headers: HeaderMap,
) -> (HeaderMap, Json<LogoutResponse>) {
    let token = bearer_token(&headers);

    let mut actor = None;
    let mut revoked = false;
    let mut already_revoked = false;
    let mut unverifiable = false;
    let mut store_error = false;

    match token.as_deref().map(|t| state.jwt_service.token_id(t)) {
        None => {}
        // Not ours: nothing could authenticate with it, so nothing is stored
        Some(None) => unverifiable = true,
        Some(Some(identity)) => {
            match state
                .revocations
                .revoke_identity(&identity, RevocationReason::Logout)
                .await
            {
                Ok(RevocationOutcome::Revoked) => revoked = true,
                Ok(RevocationOutcome::AlreadyRevoked) => already_revoked = true,
                Err(e) => {
                    store_error = true;
                    tracing::error!(
                        target: "security",
                        error = %e,
                        token_id = %identity.id,
                        "Failed to revoke token on logout"
                    );
                }
            }
            actor = Some(identity.subject);
        }
    }

    let mut response_headers = HeaderMap::new();
    state.cookies.clear(&mut response_headers);

    state
        .audit_service
        .log(
            AuditEvent::new(AuditAction::Logout, !store_error)
                .actor(actor.clone().unwrap_or_default())
                .client(client.ip.as_str(), client.user_agent.clone())
                .details(json!({
                    "hadToken": token.is_some(),
                    "revoked": revoked,
                    "alreadyRevoked": already_revoked,
                    "unverifiable": unverifiable,
                    "storeError": store_error,
                })),
        )
        .await;

    tracing::info!(
        user_id = actor.as_deref().unwrap_or("-"),
        had_token = token.is_some(),
        revoked,
        "User logged out"
    );

    (
        response_headers,
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    )
}

/// Get current user info
///
/// Profile fields come from the identity store when it answers; claims
/// alone are returned otherwise.
pub async fn me(State(state): State<ServerState>, user: CurrentUser) -> Json<MeResponse> {
    let profile = match state.users.find_by_id(&user.principal.id).await {
        Ok(Some(record)) => Some(record.profile()),
        Ok(None) => {
            tracing::debug!(user_id = %user.principal.id, "No stored profile for user");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user.principal.id, "Profile lookup failed");
            None
        }
    };

    let mut view = user.principal.to_view();
    view.session_id = Some(user.principal.session_id.clone());

    Json(MeResponse {
        user: view,
        profile,
    })
}

pub async fn check_auth(user: CurrentUser) -> Json<CheckAuthResponse> {
    Json(CheckAuthResponse {
        is_authenticated: true,
        user: user.principal.to_view(),
        session: SessionInfo {
            session_id: user.principal.session_id.clone(),
            issued_at: user.issued_at,
            expires_at: user.expires_at,
            source: user.source.as_str().to_string(),
        },
    })
}

pub async fn permissions(user: CurrentUser) -> Json<PermissionsResponse> {
    let principal = &user.principal;
    Json(PermissionsResponse {
        permission_summary: summarize(&principal.permissions, &principal.roles),
        permissions: principal.permissions.clone(),
        roles: principal.roles.clone(),
    })
}
