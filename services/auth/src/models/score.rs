//! Game payloads accepted by the guarded endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A finished puzzle attempt
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub puzzle_id: Uuid,
    pub attempts: u32,
    pub solved: bool,
    pub duration_ms: u64,
}

/// Acknowledgement for a stored score
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReceipt {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
}

/// Profile changes a player may make
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: String,
}
