//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Login session; `id` doubles as the bearer token handed to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (token)
    pub id: String,
    /// Associated user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Issue a fresh session for `user_id` that lives for `ttl`
    pub fn issue(user_id: i64, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_generates_unique_tokens() {
        let a = Session::issue(1, Duration::days(7));
        let b = Session::issue(1, Duration::days(7));

        assert_ne!(a.id, b.id);
        assert_eq!(a.user_id, 1);
        assert!(!a.is_expired());
    }

    #[test]
    fn test_negative_ttl_is_expired() {
        let session = Session::issue(1, Duration::seconds(-1));
        assert!(session.is_expired());
    }
}
