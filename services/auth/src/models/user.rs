//! Account models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Durable caller identity returned by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: String,
    pub email: Option<String>,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            subject_id: user.id.to_string(),
            email: Some(user.email),
        }
    }
}

/// Sign-up payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: String,
    /// Guest subject being upgraded, taken from the caller's session, never from the body
    #[serde(skip)]
    pub guest_subject_id: Option<String>,
}

/// Sign-in payload
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}
