//! Storefront relay - OTP email verification and n8n webhook forwarding.
//!
//! This library backs the `storefront-relay` binary:
//! - `otp`: issues and verifies one-time codes for registration
//! - `relay`: forwards form submissions to external workflow webhooks
//! - `web`: HTTP surface with permissive CORS for the browser client
//!
//! ## Architecture
//!
//! ```text
//! Browser → /send-otp, /verify-otp → OtpService → SMTP (or log)
//! Browser → /webhook/{channel}     → Relay      → n8n primary → fallback
//! ```

pub mod config;
pub mod otp;
pub mod relay;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError, SmtpSettings};
pub use otp::{OtpError, OtpService, OtpStore};
pub use relay::{Channel, Relay, RelayError, RelayOutcome, RelayTarget};
pub use web::{router, AppError, AppState};
