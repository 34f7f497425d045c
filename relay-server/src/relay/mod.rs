//! Webhook relay module.
//!
//! Browser form submissions are posted here and forwarded verbatim to the
//! n8n webhooks configured for their channel:
//!
//! ```text
//! Browser → /webhook/{channel} → Relay → primary URL ─(transport error)→ fallback URL
//! ```

pub mod channel;
pub mod forwarder;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{Channel, RelayTarget, UnknownChannel};
pub use forwarder::{build_client, Relay, RelayError, RelayOutcome};
