//! Session gate backed by the hosted auth service (GoTrue-compatible).
//!
//! Sign-in uses the password grant at `/auth/v1/token?grant_type=password`;
//! sign-out revokes the token at `/auth/v1/logout`. The current session is
//! kept in memory only.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fieldquote_auth::{AuthError, Credentials, Session, SessionGate};
use fieldquote_core::UserId;

use crate::config::StoreConfig;

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    /// Lifetime in seconds.
    expires_in: i64,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    pub(crate) fn into_session(self, fallback_email: &str, now: DateTime<Utc>) -> Session {
        Session::new(
            UserId::from_uuid(self.user.id),
            self.user.email.unwrap_or_else(|| fallback_email.to_string()),
            self.access_token,
            now + Duration::seconds(self.expires_in),
        )
    }
}

pub struct RestSessionGate {
    client: Client,
    base_url: String,
    api_key: String,
    current: RwLock<Option<Session>>,
}

impl RestSessionGate {
    pub fn new(config: &StoreConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::Backend(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            current: RwLock::new(None),
        })
    }

    fn store_session(&self, session: Option<Session>) -> Result<(), AuthError> {
        let mut current = self
            .current
            .write()
            .map_err(|_| AuthError::Backend("session lock poisoned".into()))?;
        *current = session;
        Ok(())
    }
}

impl core::fmt::Debug for RestSessionGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RestSessionGate")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl SessionGate for RestSessionGate {
    async fn current_session(&self) -> Option<Session> {
        self.current.read().ok()?.clone()
    }

    #[tracing::instrument(skip_all, fields(email = %credentials.email), err)]
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let email = credentials.email.trim();
        let response = self
            .client
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&PasswordGrant {
                email,
                password: &credentials.password,
            })
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(sign_in_error(status, &body));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Backend(format!("token response: {e}")))?;
        let session = token.into_session(email, Utc::now());
        self.store_session(Some(session.clone()))?;

        tracing::info!(user_id = %session.user_id(), "signed in");
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.current_session().await else {
            return Ok(());
        };

        let response = self
            .client
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(session.access_token())
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        // an already-revoked token still ends the local session
        if !response.status().is_success() && response.status() != StatusCode::UNAUTHORIZED {
            return Err(AuthError::Backend(format!("logout: {}", response.status())));
        }

        self.store_session(None)?;
        tracing::info!(user_id = %session.user_id(), "signed out");
        Ok(())
    }
}

fn sign_in_error(status: StatusCode, body: &str) -> AuthError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => AuthError::InvalidCredentials,
        _ => AuthError::Backend(format!("{status}: {}", body.trim())),
    }
}
