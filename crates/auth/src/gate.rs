//! Session gate: the collaborator that authenticates callers.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{Duration, Utc};
use uuid::Uuid;

use fieldquote_core::UserId;

use crate::session::{AuthError, Credentials, Session};

/// Source of sessions (external auth service, or in-memory for tests/dev).
#[async_trait::async_trait]
pub trait SessionGate: Send + Sync {
    /// The session currently held by this gate, if any.
    async fn current_session(&self) -> Option<Session>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The current session, or an error when there is none or it expired.
    ///
    /// Absence is always reported; callers never proceed without a session.
    async fn require_session(&self) -> Result<Session, AuthError> {
        let session = self.current_session().await.ok_or(AuthError::NoSession)?;
        session.validate(Utc::now())?;
        Ok(session)
    }
}

/// In-memory gate with a fixed account list.
#[derive(Debug)]
pub struct InMemorySessionGate {
    accounts: HashMap<String, (UserId, String)>,
    ttl: Duration,
    current: RwLock<Option<Session>>,
}

impl InMemorySessionGate {
    pub fn new(ttl: Duration) -> Self {
        Self {
            accounts: HashMap::new(),
            ttl,
            current: RwLock::new(None),
        }
    }

    /// Register an account that `sign_in` will accept.
    pub fn with_account(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.accounts
            .insert(email.into().to_lowercase(), (UserId::new(), password.into()));
        self
    }

    /// Start with an already-established session.
    pub fn with_session(mut self, session: Session) -> Self {
        if let Ok(current) = self.current.get_mut() {
            *current = Some(session);
        }
        self
    }
}

impl Default for InMemorySessionGate {
    fn default() -> Self {
        Self::new(Duration::hours(1))
    }
}

#[async_trait::async_trait]
impl SessionGate for InMemorySessionGate {
    async fn current_session(&self) -> Option<Session> {
        self.current.read().ok()?.clone()
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let email = credentials.email.trim().to_lowercase();
        let (user_id, password) = self
            .accounts
            .get(&email)
            .ok_or(AuthError::InvalidCredentials)?;
        if *password != credentials.password {
            return Err(AuthError::InvalidCredentials);
        }

        let session = Session::new(
            *user_id,
            email,
            Uuid::now_v7().to_string(),
            Utc::now() + self.ttl,
        );

        let mut current = self
            .current
            .write()
            .map_err(|_| AuthError::Backend("session lock poisoned".into()))?;
        *current = Some(session.clone());

        tracing::info!(user_id = %session.user_id(), "signed in");
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let mut current = self
            .current
            .write()
            .map_err(|_| AuthError::Backend("session lock poisoned".into()))?;
        *current = None;
        Ok(())
    }
}
