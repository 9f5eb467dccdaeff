//! Scores and profiles in PostgreSQL

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    game::GameStore,
    models::{ProfileUpdate, ScoreReceipt, ScoreSubmission},
};

#[derive(Clone)]
pub struct PgGameStore {
    pool: PgPool,
}

impl PgGameStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GameStore for PgGameStore {
    async fn submit_score(&self, subject_id: &str, score: &ScoreSubmission) -> Result<ScoreReceipt> {
        let subject_id = Uuid::parse_str(subject_id).context("Invalid subject id")?;
        let attempts = i32::try_from(score.attempts).context("Attempts out of range")?;
        let duration_ms = i64::try_from(score.duration_ms).context("Duration out of range")?;

        let row = sqlx::query(
            r#"
            INSERT INTO scores (id, subject_id, puzzle_id, attempts, solved, duration_ms)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(subject_id)
        .bind(score.puzzle_id)
        .bind(attempts)
        .bind(score.solved)
        .bind(duration_ms)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert score")?;

        let recorded_at: DateTime<Utc> = row.get("created_at");
        Ok(ScoreReceipt {
            id: row.get("id"),
            recorded_at,
        })
    }

    async fn update_profile(&self, subject_id: &str, profile: &ProfileUpdate) -> Result<()> {
        let subject_id = Uuid::parse_str(subject_id).context("Invalid subject id")?;

        sqlx::query(
            r#"
            INSERT INTO profiles (subject_id, display_name)
            VALUES ($1, $2)
            ON CONFLICT (subject_id)
            DO UPDATE SET display_name = EXCLUDED.display_name, updated_at = NOW()
            "#,
        )
        .bind(subject_id)
        .bind(profile.display_name.trim())
        .execute(&self.pool)
        .await
        .context("Failed to update profile")?;

        Ok(())
    }
}
