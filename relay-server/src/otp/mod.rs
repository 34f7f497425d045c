//! One-time password verification for email registration.
//!
//! ```text
//! request_code(email) → store {code, expires_at} → mail (or log) code
//! verify_code(email, code) → NotFound | Expired | Mismatch | Verified (record removed)
//! ```

pub mod email;
pub mod mailer;
pub mod store;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

pub use email::normalize_email;
pub use mailer::{CodeMailer, MailerError, SmtpMailer};
pub use store::{generate_code, OtpRecord, OtpStore};

/// Failures of the OTP flow. Every variant is scoped to a single request.
#[derive(Debug, Error)]
pub enum OtpError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("No pending verification code for this email")]
    NotFound,

    #[error("Verification code has expired")]
    Expired,

    #[error("Invalid verification code")]
    Mismatch,

    #[error("Failed to send verification code: {0}")]
    Delivery(#[from] MailerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Issued {
    pub issued: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verified {
    pub verified: bool,
}

/// Issues and verifies codes. Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct OtpService {
    store: OtpStore,
    mailer: Arc<CodeMailer>,
}

impl OtpService {
    pub fn new(store: OtpStore, mailer: CodeMailer) -> Self {
        Self {
            store,
            mailer: Arc::new(mailer),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, MailerError> {
        let mailer = CodeMailer::from_settings(config.smtp.as_ref())?;
        let store = OtpStore::new(Duration::from_secs(config.otp_ttl_secs));
        Ok(Self::new(store, mailer))
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &OtpStore {
        &self.store
    }

    /// Issue a fresh code for `email`, replacing any pending one, and deliver it.
    ///
    /// If delivery fails the record stays; the next request overwrites it.
    pub async fn request_code(&self, email: &str) -> Result<Issued, OtpError> {
        let email = normalize_email(email)?;
        let record = self
            .store
            .insert_at(&email, generate_code(), Instant::now())
            .await;

        info!(
            email = %email,
            ttl_seconds = self.store.ttl().as_secs(),
            smtp = self.mailer.is_smtp(),
            "otp_issued"
        );

        if let Err(e) = self
            .mailer
            .deliver(&email, &record.code, self.store.ttl())
            .await
        {
            warn!(email = %email, error = %e, "otp_delivery_failed");
            return Err(e.into());
        }

        Ok(Issued { issued: true })
    }

    /// Check a submitted code. Success consumes the pending record.
    pub async fn verify_code(&self, email: &str, submitted: &str) -> Result<Verified, OtpError> {
        let email = normalize_email(email)?;
        let submitted = submitted.trim();
        if submitted.is_empty() {
            return Err(OtpError::InvalidInput("OTP is required".to_string()));
        }

        match self.store.verify_at(&email, submitted, Instant::now()).await {
            Ok(()) => {
                info!(email = %email, "otp_verified");
                Ok(Verified { verified: true })
            }
            Err(e) => {
                warn!(email = %email, reason = %e, "otp_verify_rejected");
                Err(e)
            }
        }
    }
}
