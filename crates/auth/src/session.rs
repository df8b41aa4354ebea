use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fieldquote_core::{DomainResult, UserId};

/// An authenticated session, threaded explicitly into every domain operation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    user_id: UserId,
    email: String,
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        access_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            email: email.into(),
            access_token: access_token.into(),
            expires_at,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Bearer token handed to the persistence backend.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Deterministically validate the session against `now`.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), AuthError> {
        if now >= self.expires_at {
            return Err(AuthError::Expired);
        }
        Ok(())
    }

    /// Admission check run at the top of every domain entry point.
    pub fn admit(&self) -> DomainResult<()> {
        self.validate(Utc::now()).map_err(|e| {
            tracing::warn!(user_id = %self.user_id, "rejected operation: {e}");
            e.into()
        })
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Email/password sign-in input.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("no active session")]
    NoSession,

    #[error("session has expired")]
    Expired,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("auth backend error: {0}")]
    Backend(String),
}
