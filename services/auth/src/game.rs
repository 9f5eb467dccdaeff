//! Contract with the game data store

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ProfileUpdate, ScoreReceipt, ScoreSubmission};

#[async_trait]
pub trait GameStore: Send + Sync {
    async fn submit_score(&self, subject_id: &str, score: &ScoreSubmission) -> Result<ScoreReceipt>;

    async fn update_profile(&self, subject_id: &str, profile: &ProfileUpdate) -> Result<()>;
}
