//! Contract with the identity provider
//!
//! The service never stores or checks passwords itself; it asks an
//! [`IdentityProvider`] and only keeps the subject identifier it gets back,
//! inside the signed session.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Credentials, Identity, NewAccount};

#[derive(Error, Debug)]
pub enum IdentityError {
    /// An account with this email already exists
    #[error("Account already exists")]
    AlreadyExists,

    /// The subject does not exist
    #[error("Unknown subject")]
    UnknownSubject,

    /// Anything else from the backend
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a durable account. When `guest_subject_id` is set the guest's
    /// subject id is kept so its history carries over.
    async fn sign_up(&self, account: &NewAccount) -> Result<Identity, IdentityError>;

    /// `Ok(None)` means the credentials did not match
    async fn sign_in(&self, credentials: &Credentials) -> Result<Option<Identity>, IdentityError>;

    /// Start a reset for `email`. Unknown addresses succeed silently.
    async fn request_password_reset(&self, email: &str) -> Result<(), IdentityError>;

    async fn update_password(&self, subject_id: &str, new_password: &str)
    -> Result<(), IdentityError>;
}
