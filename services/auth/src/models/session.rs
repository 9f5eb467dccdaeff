//! Verified session contents

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a verified session credential says about the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// Opaque caller identifier
    pub subject_id: String,
    /// Guest caller with no durable account
    pub is_ephemeral: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
