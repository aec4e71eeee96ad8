//! Credential validation
//!
//! Turns a username/password pair into a [`Principal`] for a new session.
//! Every rejection the client can observe is the same
//! [`AuthFailure::InvalidCredentials`]; the underlying [`FailureReason`] is
//! only for the audit trail.

use std::sync::Arc;

use thiserror::Error;

use crate::auth::Principal;
use crate::auth::password::{verify_dummy, verify_password};
use crate::db::{UserStore, UserStoreError};

/// Why a credential was rejected (audit only, never sent to the client)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    UserNotFound,
    WrongPassword,
    AccountDisabled,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserNotFound => "user_not_found",
            Self::WrongPassword => "invalid_password",
            Self::AccountDisabled => "account_disabled",
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("username and password are required")]
    InvalidInput,

    #[error("invalid username or password")]
    InvalidCredentials(FailureReason),

    #[error("identity store error: {0}")]
    Store(#[from] UserStoreError),
}

/// Verifies credentials against the identity store
#[derive(Clone)]
pub struct CredentialValidator {
    users: Arc<dyn UserStore>,
}

impl CredentialValidator {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Validate a credential and build the principal for a new session
    pub async fn validate(&self, username: &str, password: &str) -> Result<Principal, AuthFailure> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthFailure::InvalidInput);
        }

        let Some(user) = self.users.find_by_username(username).await? else {
            verify_dummy(password);
            return Err(AuthFailure::InvalidCredentials(FailureReason::UserNotFound));
        };

        if !verify_password(password, &user.password_hash) {
            return Err(AuthFailure::InvalidCredentials(FailureReason::WrongPassword));
        }

        // Checked after the hash so a disabled account costs the same as any other
        if !user.is_active {
            return Err(AuthFailure::InvalidCredentials(
                FailureReason::AccountDisabled,
            ));
        }

        Ok(Principal {
            id: user.id,
            username: user.username,
            roles: user.roles,
            permissions: user.permissions,
            department_id: user.department_id,
            level: user.level,
            session_id: uuid::Uuid::new_v4().to_string(),
        })
    }
}
