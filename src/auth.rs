//! Shared-password login with time-limited sessions
//!
//! There is a single password, stored as a SHA-256 hex digest. A successful
//! login hands out a random bearer token valid for the configured timeout.

use crate::config::{hash_password, Settings};
use crate::error::{AllocError, AllocResult};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Below this many minutes left, session info carries a warning
pub const SESSION_WARNING_MINUTES: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is still valid at exactly the timeout; it expires after it
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whole minutes left, never negative
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_minutes().max(0)
    }

    pub fn info(&self, now: DateTime<Utc>) -> SessionInfo {
        let remaining = self.remaining_minutes(now);
        let message = if remaining < SESSION_WARNING_MINUTES {
            format!("Session expires in {} minutes", remaining)
        } else {
            format!("Session time remaining: {} minutes", remaining)
        };
        SessionInfo {
            expires_at: self.expires_at,
            remaining_minutes: remaining,
            warning: remaining < SESSION_WARNING_MINUTES,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub expires_at: DateTime<Utc>,
    pub remaining_minutes: i64,
    pub warning: bool,
    pub message: String,
}

#[derive(Debug)]
pub struct SessionStore {
    password_sha256: String,
    timeout: Duration,
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new(password_sha256: impl Into<String>, timeout_minutes: i64) -> Self {
        Self {
            password_sha256: password_sha256.into().to_lowercase(),
            timeout: Duration::minutes(timeout_minutes),
            sessions: HashMap::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.password_sha256.clone(),
            settings.session_timeout_minutes,
        )
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        hash_password(candidate) == self.password_sha256
    }

    pub fn login(&mut self, password: &str, now: DateTime<Utc>) -> AllocResult<Session> {
        if !self.verify_password(password) {
            tracing::warn!("login rejected");
            return Err(AllocError::Auth(
                "Incorrect password. Please try again.".to_string(),
            ));
        }
        self.purge_expired(now);
        let session = Session {
            token: Uuid::new_v4().to_string(),
            created_at: now,
            expires_at: now + self.timeout,
        };
        self.sessions.insert(session.token.clone(), session.clone());
        tracing::info!(expires_at = %session.expires_at, "session started");
        Ok(session)
    }

    /// Look up a live session; an expired one is dropped
    pub fn validate(&mut self, token: &str, now: DateTime<Utc>) -> AllocResult<Session> {
        let session = self
            .sessions
            .get(token)
            .cloned()
            .ok_or_else(|| AllocError::Auth("Not logged in".to_string()))?;
        if session.is_expired(now) {
            self.sessions.remove(token);
            tracing::info!("session timed out");
            return Err(AllocError::Auth(
                "Your session has timed out. Please log in again.".to_string(),
            ));
        }
        Ok(session)
    }

    pub fn logout(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired(now));
        before - self.sessions.len()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PASSWORD;

    fn store() -> SessionStore {
        SessionStore::new(hash_password(DEFAULT_PASSWORD), 60)
    }

    #[test]
    fn test_login_with_default_password() {
        let mut store = store();
        let now = Utc::now();
        assert!(store.login("wrong", now).is_err());
        let session = store.login(DEFAULT_PASSWORD, now).unwrap();
        assert_eq!(session.remaining_minutes(now), 60);
        assert!(store.validate(&session.token, now).is_ok());
    }

    #[test]
    fn test_session_expires_after_timeout() {
        let mut store = store();
        let start = Utc::now();
        let session = store.login(DEFAULT_PASSWORD, start).unwrap();

        let at_limit = start + Duration::minutes(60);
        assert!(store.validate(&session.token, at_limit).is_ok());

        let later = start + Duration::minutes(61);
        assert!(matches!(
            store.validate(&session.token, later),
            Err(AllocError::Auth(_))
        ));
        assert_eq!(store.active_sessions(), 0);
    }

    #[test]
    fn test_warning_below_ten_minutes() {
        let mut store = store();
        let start = Utc::now();
        let session = store.login(DEFAULT_PASSWORD, start).unwrap();

        let info = session.info(start + Duration::minutes(45));
        assert!(!info.warning);
        assert_eq!(info.remaining_minutes, 15);

        let info = session.info(start + Duration::minutes(51));
        assert!(info.warning);
        assert_eq!(info.message, "Session expires in 9 minutes");
    }

    #[test]
    fn test_logout_removes_session() {
        let mut store = store();
        let now = Utc::now();
        let session = store.login(DEFAULT_PASSWORD, now).unwrap();
        assert!(store.logout(&session.token));
        assert!(!store.logout(&session.token));
        assert!(store.validate(&session.token, now).is_err());
    }
}
