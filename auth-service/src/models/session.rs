//! Refresh session model - one entry per outstanding refresh token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

/// Server-side record tying a live refresh token to an identity.
///
/// The refresh token string itself is the primary key; a user may hold any
/// number of sessions at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub refresh_token: String,
    pub identity_key: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        refresh_token: String,
        identity_key: String,
        role: Role,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            refresh_token,
            identity_key,
            role,
            created_at,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whole seconds left before expiry, zero once expired.
    pub fn remaining_seconds(&self) -> u64 {
        (self.expires_at - Utc::now()).num_seconds().max(0) as u64
    }

    pub fn record(&self) -> SessionRecord {
        SessionRecord {
            identity_key: self.identity_key.clone(),
            role: self.role,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }

    pub fn from_record(refresh_token: String, record: SessionRecord) -> Self {
        Self {
            refresh_token,
            identity_key: record.identity_key,
            role: record.role,
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}

/// Persisted form of a session; the key is held outside the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub identity_key: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration) -> Session {
        let now = Utc::now();
        Session::new(
            "token_abc".to_string(),
            "a@x.com".to_string(),
            Role::User,
            now,
            now + expires_in,
        )
    }

    #[test]
    fn test_session_expiry() {
        let live = session(Duration::days(7));
        assert!(!live.is_expired());
        assert!(live.remaining_seconds() > 0);

        let stale = session(Duration::seconds(-1));
        assert!(stale.is_expired());
        assert_eq!(stale.remaining_seconds(), 0);
    }

    #[test]
    fn test_record_keeps_everything_but_the_key() {
        let original = session(Duration::days(1));
        let json = serde_json::to_string(&original.record()).unwrap();
        assert!(!json.contains("token_abc"));

        let record: SessionRecord = serde_json::from_str(&json).unwrap();
        let restored = Session::from_record("token_abc".to_string(), record);
        assert_eq!(restored, original);
    }
}
