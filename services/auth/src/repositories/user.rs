//! Account storage and password verification in PostgreSQL

use anyhow::{Context, Result};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::{
    identity::{IdentityError, IdentityProvider},
    models::{Credentials, Identity, NewAccount, User},
};

/// Identity provider backed by the `users` table
#[derive(Clone)]
pub struct PgIdentityProvider {
    pool: PgPool,
}

impl PgIdentityProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(hash)
}

fn verify_password(user: &User, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn sign_up(&self, account: &NewAccount) -> Result<Identity, IdentityError> {
        let email = normalize_email(&account.email);
        let id = account
            .guest_subject_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id).ok())
            .unwrap_or_else(Uuid::new_v4);
        let password_hash = hash_password(&account.password)?;

        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => {
                info!("Created account {}", user.id);
                Ok(user.into())
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(IdentityError::AlreadyExists)
            }
            Err(e) => Err(anyhow::Error::new(e)
                .context("Failed to insert user")
                .into()),
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Option<Identity>, IdentityError> {
        let email = normalize_email(&credentials.email);

        let Some(user) = self.find_by_email(&email).await? else {
            return Ok(None);
        };

        if verify_password(&user, &credentials.password)? {
            Ok(Some(user.into()))
        } else {
            Ok(None)
        }
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let email = normalize_email(email);

        let Some(user) = self.find_by_email(&email).await? else {
            return Ok(());
        };

        // The mailer picks up unprocessed rows and sends the reset link.
        sqlx::query(
            r#"
            INSERT INTO password_reset_requests (id, user_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .execute(&self.pool)
        .await
        .context("Failed to queue password reset")?;

        info!("Queued password reset for account {}", user.id);
        Ok(())
    }

    async fn update_password(
        &self,
        subject_id: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        let id = Uuid::parse_str(subject_id).map_err(|_| IdentityError::UnknownSubject)?;
        let password_hash = hash_password(new_password)?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&password_hash)
        .execute(&self.pool)
        .await
        .context("Failed to update password")?
        .rows_affected();

        if updated == 0 {
            return Err(IdentityError::UnknownSubject);
        }

        info!("Updated password for account {}", id);
        Ok(())
    }
}
