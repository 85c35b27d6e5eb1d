//! User model
//!
//! A registered backer or campaign owner. The password is stored as an
//! argon2 hash and never serialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Free-text occupation shown on the profile
    pub occupation: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Stored avatar path, if one was uploaded
    pub avatar: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new, not yet persisted user.
    ///
    /// The password must already be hashed (see `services::password::hash_password`).
    pub fn new(name: String, occupation: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            name,
            occupation,
            email,
            password_hash,
            avatar: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this user owns a record whose owner column is `owner_id`
    pub fn owns(&self, owner_id: i64) -> bool {
        self.id == owner_id
    }
}

/// Canonical form used to store and look up emails: trimmed and lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration command, already validated by the transport layer
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserInput {
    pub name: String,
    pub occupation: String,
    pub email: String,
    pub password: String,
}

impl RegisterUserInput {
    pub fn new(
        name: impl Into<String>,
        occupation: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            occupation: occupation.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Login command
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Email availability check
#[derive(Debug, Clone, Deserialize)]
pub struct CheckEmailInput {
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Ada@Example.COM "), "ada@example.com");
        assert_eq!(normalize_email("ada@example.com"), "ada@example.com");
    }

    #[test]
    fn test_new_user_has_no_id_or_avatar() {
        let user = User::new(
            "Ada".to_string(),
            "Engineer".to_string(),
            "ada@example.com".to_string(),
            "hash".to_string(),
        );

        assert_eq!(user.id, 0);
        assert!(user.avatar.is_none());
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new(
            "Ada".to_string(),
            "Engineer".to_string(),
            "ada@example.com".to_string(),
            "secret-hash".to_string(),
        );

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("secret-hash"));
    }

    #[test]
    fn test_owns() {
        let mut user = User::new(
            "Ada".to_string(),
            "Engineer".to_string(),
            "ada@example.com".to_string(),
            "hash".to_string(),
        );
        user.id = 7;

        assert!(user.owns(7));
        assert!(!user.owns(8));
    }
}
