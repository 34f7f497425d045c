//! In-memory store of pending verification codes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::Mutex;
use tracing::debug;

use super::OtpError;

/// A pending code for one email address.
#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub email: String,
    pub code: String,
    pub expires_at: Instant,
}

impl OtpRecord {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Generate a uniformly random, zero-padded 6-digit code.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

/// Pending codes keyed by normalized email.
///
/// At most one record per email; issuing again replaces it. Each operation
/// takes the lock once, so a concurrent verify can succeed at most once.
#[derive(Clone)]
pub struct OtpStore {
    inner: Arc<Mutex<HashMap<String, OtpRecord>>>,
    ttl: Duration,
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `code` for `email`, replacing any pending record.
    ///
    /// Expired records of every email are dropped under the same lock, so the
    /// map only holds codes that can still verify.
    pub async fn insert_at(&self, email: &str, code: String, now: Instant) -> OtpRecord {
        let record = OtpRecord {
            email: email.to_string(),
            code,
            expires_at: now + self.ttl,
        };

        let mut records = self.inner.lock().await;
        let before = records.len();
        records.retain(|_, r| !r.is_expired(now));
        let purged = before - records.len();
        if purged > 0 {
            debug!(purged = purged, pending = records.len(), "otp_expired_purged");
        }
        records.insert(email.to_string(), record.clone());

        record
    }

    /// Check `submitted` against the pending code for `email`.
    ///
    /// A match or an expired record removes the entry; a mismatch keeps it.
    pub async fn verify_at(&self, email: &str, submitted: &str, now: Instant) -> Result<(), OtpError> {
        let mut records = self.inner.lock().await;

        let record = records.get(email).ok_or(OtpError::NotFound)?;

        if record.is_expired(now) {
            records.remove(email);
            return Err(OtpError::Expired);
        }

        if !constant_time_compare(&record.code, submitted) {
            return Err(OtpError::Mismatch);
        }

        records.remove(email);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    #[cfg(test)]
    pub(crate) async fn pending_code(&self, email: &str) -> Option<String> {
        self.inner.lock().await.get(email).map(|r| r.code.clone())
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
