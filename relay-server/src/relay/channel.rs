//! Relay channels and their destination lists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

/// Logical form-submission channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Order,
    Quotation,
    Complaint,
    Review,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Order,
        Channel::Quotation,
        Channel::Complaint,
        Channel::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Order => "order",
            Channel::Quotation => "quotation",
            Channel::Complaint => "complaint",
            Channel::Review => "review",
        }
    }

    /// Environment variable holding the comma-separated target list.
    pub fn env_var(&self) -> &'static str {
        match self {
            Channel::Order => "ORDER_WEBHOOK_URLS",
            Channel::Quotation => "QUOTATION_WEBHOOK_URLS",
            Channel::Complaint => "COMPLAINT_WEBHOOK_URLS",
            Channel::Review => "REVIEW_WEBHOOK_URLS",
        }
    }

    /// Hosted n8n webhook used when no targets are configured.
    pub fn default_url(&self) -> &'static str {
        match self {
            Channel::Order => "https://techy.app.n8n.cloud/webhook/tally-sales-order",
            Channel::Quotation => "https://techy.app.n8n.cloud/webhook/generate-invoice",
            Channel::Complaint => "https://techy.app.n8n.cloud/webhook/sales-complaint",
            Channel::Review => "https://techy.app.n8n.cloud/webhook/submit-your-review",
        }
    }

    /// Human label used in submission acknowledgements.
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Order => "Order",
            Channel::Quotation => "Quotation",
            Channel::Complaint => "Complaint",
            Channel::Review => "Review",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a path segment names no known channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown channel: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}

/// Ordered destinations for one channel. The first entry is the primary,
/// the rest are fallbacks tried only on transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTarget {
    pub channel: Channel,
    pub urls: Vec<Url>,
}

impl RelayTarget {
    pub fn new(channel: Channel, urls: Vec<Url>) -> Self {
        Self { channel, urls }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_from_str() {
        assert_eq!("order".parse::<Channel>(), Ok(Channel::Order));
        assert_eq!("review".parse::<Channel>(), Ok(Channel::Review));
        assert_eq!(
            "Order".parse::<Channel>(),
            Err(UnknownChannel("Order".to_string()))
        );
        assert!("invoice".parse::<Channel>().is_err());
    }

    #[test]
    fn test_channel_serde_lowercase() {
        let json = serde_json::to_string(&Channel::Complaint).unwrap();
        assert_eq!(json, "\"complaint\"");
    }

    #[test]
    fn test_default_urls_parse() {
        for channel in Channel::ALL {
            assert!(Url::parse(channel.default_url()).is_ok(), "{}", channel);
        }
    }
}
