//! Sequential webhook forwarding with transport-level fallback.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use reqwest::{header::CONTENT_TYPE, redirect, Client, StatusCode};
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use super::channel::{Channel, RelayTarget};
use crate::config::Config;

/// Upstream bodies longer than this are cut in logs.
const LOG_BODY_LIMIT: usize = 1000;

/// Relay failures. A reachable upstream answering with an error status is
/// not one of them: that response is returned as the outcome.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no relay targets configured for channel {0}")]
    NoTargets(Channel),

    #[error("all {attempts} targets for channel {channel} are unreachable")]
    AllTargetsUnreachable { channel: Channel, attempts: usize },
}

/// Response of the first target that answered.
#[derive(Debug, Clone)]
pub struct RelayOutcome {
    /// URL that produced the response
    pub target: Url,
    /// Upstream status, passed through unchanged
    pub status: StatusCode,
    /// Upstream `Content-Type`, if any
    pub content_type: Option<String>,
    /// Upstream response body
    pub body: Bytes,
}

impl RelayOutcome {
    /// Whether the upstream accepted the submission with a 2xx status.
    pub fn is_upstream_ok(&self) -> bool {
        self.status.is_success()
    }
}

/// Stateless forwarder holding the shared HTTP client and the per-channel
/// target lists.
#[derive(Clone)]
pub struct Relay {
    client: Client,
    targets: Arc<HashMap<Channel, RelayTarget>>,
}

impl Relay {
    pub fn new(client: Client, targets: Vec<RelayTarget>) -> Self {
        let targets = targets.into_iter().map(|t| (t.channel, t)).collect();
        Self {
            client,
            targets: Arc::new(targets),
        }
    }

    /// Build a relay with a client using the configured per-attempt timeout.
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let client = build_client(Duration::from_millis(config.relay_timeout_ms))?;
        Ok(Self::new(client, config.relay_targets.clone()))
    }

    pub fn target(&self, channel: Channel) -> Option<&RelayTarget> {
        self.targets.get(&channel)
    }

    /// Forward `payload` to the targets of `channel`, in order.
    ///
    /// The first target that returns any HTTP response ends the loop.
    /// Transport failures (refused, timeout, DNS) move on to the next target;
    /// no target is tried twice.
    pub async fn forward(&self, channel: Channel, payload: Bytes) -> Result<RelayOutcome, RelayError> {
        let urls = match self.target(channel) {
            Some(target) if !target.urls.is_empty() => &target.urls,
            _ => {
                warn!(channel = %channel, "relay_no_targets");
                return Err(RelayError::NoTargets(channel));
            }
        };

        for (attempt, url) in urls.iter().enumerate() {
            info!(
                channel = %channel,
                target = %url,
                attempt = attempt + 1,
                payload_length = payload.len(),
                "relay_attempt"
            );

            match post_once(&self.client, url, payload.clone()).await {
                Ok(outcome) => {
                    if outcome.is_upstream_ok() {
                        info!(
                            channel = %channel,
                            target = %url,
                            status_code = outcome.status.as_u16(),
                            body = %truncate_for_log(&outcome.body),
                            "relay_delivered"
                        );
                    } else {
                        warn!(
                            channel = %channel,
                            target = %url,
                            status_code = outcome.status.as_u16(),
                            body = %truncate_for_log(&outcome.body),
                            "relay_upstream_non_ok"
                        );
                    }
                    return Ok(outcome);
                }
                Err(e) => {
                    warn!(
                        channel = %channel,
                        target = %url,
                        is_timeout = e.is_timeout(),
                        is_connect = e.is_connect(),
                        error = %e,
                        "relay_target_unreachable"
                    );
                }
            }
        }

        error!(channel = %channel, attempts = urls.len(), "relay_all_targets_unreachable");

        Err(RelayError::AllTargetsUnreachable {
            channel,
            attempts: urls.len(),
        })
    }
}

/// HTTP client for relaying.
///
/// Redirects are not followed: a 3xx is the upstream's answer and is
/// returned as the outcome like any other status.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .redirect(redirect::Policy::none())
        .build()
}

/// POST the payload to a single URL.
///
/// Only a failure to obtain a response is an error. A body that cannot be
/// read after the status arrived still counts as a response.
async fn post_once(client: &Client, url: &Url, payload: Bytes) -> reqwest::Result<RelayOutcome> {
    let resp = client
        .post(url.clone())
        .header(CONTENT_TYPE, "application/json")
        .body(payload)
        .send()
        .await?;

    let status = resp.status();
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = match resp.bytes().await {
        Ok(body) => body,
        Err(e) => {
            warn!(target = %url, status_code = status.as_u16(), error = %e, "relay_body_read_failed");
            Bytes::new()
        }
    };

    Ok(RelayOutcome {
        target: url.clone(),
        status,
        content_type,
        body,
    })
}

fn truncate_for_log(body: &[u8]) -> String {
    String::from_utf8_lossy(body).chars().take(LOG_BODY_LIMIT).collect()
}
