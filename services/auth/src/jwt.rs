//! Signed, self-contained session credentials
//!
//! Credentials are HS256 JWTs signed with the process-wide session secret. The
//! payload carries the absolute expiry, so a cookie replayed after that instant
//! is rejected even if the browser still holds it. There is no server-side
//! session table and no revocation list.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{models::SessionData, settings::SessionSecret};

/// Lifetime of a session credential
pub const SESSION_TTL_DAYS: i64 = 30;

/// Signed payload
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject identifier
    pub sub: String,
    /// Guest caller with no durable identity
    #[serde(rename = "isEphemeral")]
    pub is_ephemeral: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Issued at, unix seconds
    pub iat: i64,
    /// Expires at, unix seconds. Always `iat` + 30 days.
    pub exp: i64,
}

/// Issues and verifies session credentials
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionCodec {
    pub fn new(secret: &SessionSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `verify_at` against its own clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a credential for a subject, valid for 30 days from now
    pub fn issue(
        &self,
        subject_id: &str,
        is_ephemeral: bool,
        email: Option<&str>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(subject_id, is_ephemeral, email, Utc::now())
    }

    fn issue_at(
        &self,
        subject_id: &str,
        is_ephemeral: bool,
        email: Option<&str>,
        issued_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let expires_at = issued_at + Duration::days(SESSION_TTL_DAYS);

        let claims = SessionClaims {
            sub: subject_id.to_string(),
            is_ephemeral,
            email: email.map(str::to_string),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// Verify a credential.
    ///
    /// Returns `None` for a bad signature, a malformed token and an elapsed
    /// expiry alike; callers cannot tell these apart.
    pub fn verify(&self, credential: &str) -> Option<SessionData> {
        self.verify_at(credential, Utc::now())
    }

    fn verify_at(&self, credential: &str, now: DateTime<Utc>) -> Option<SessionData> {
        let claims = match decode::<SessionClaims>(credential, &self.decoding_key, &self.validation)
        {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("Session credential rejected: {}", e);
                return None;
            }
        };

        if now.timestamp() >= claims.exp {
            debug!("Session credential rejected: expired");
            return None;
        }

        Some(SessionData {
            subject_id: claims.sub,
            is_ephemeral: claims.is_ephemeral,
            email: claims.email,
            issued_at: DateTime::from_timestamp(claims.iat, 0)?,
            expires_at: DateTime::from_timestamp(claims.exp, 0)?,
        })
    }
}
