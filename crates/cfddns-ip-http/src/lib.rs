// # HTTP IP Source
//
// This crate provides the HTTP IP-echo address resolver for cfddns.
//
// ## Architecture
//
// One plain GET per call against a service that answers with the caller's
// public address as a bare text body (ipify by default). No caching: the
// update loop decides how often to ask.
//
// ## Answer handling
//
// The body is trimmed and must parse as an IPv4 address. The trimmed text is
// returned as-is, so the comparison with the stored address stays
// byte-for-byte.

use cfddns_core::traits::IpSource;
use cfddns_core::{Error, Result};

use std::net::Ipv4Addr;
use std::time::Duration;

/// Default IP-echo service
pub const DEFAULT_IP_SOURCE_URL: &str = "https://api.ipify.org/";

/// Default request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// HTTP IP-echo resolver
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch the address from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: Service URL (e.g., "https://api.ipify.org/")
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Service URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for HttpIpSource {
    fn default() -> Self {
        Self::new(DEFAULT_IP_SOURCE_URL)
    }
}

/// Check a raw response body and return the trimmed address text
fn parse_answer(body: &str) -> Result<String> {
    let text = body.trim();

    if text.is_empty() {
        return Err(Error::ip_source("IP-echo service returned an empty body"));
    }

    text.parse::<Ipv4Addr>()
        .map_err(|_| Error::ip_source(format!("Not an IPv4 address: {:?}", text)))?;

    Ok(text.to_string())
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(format!("{} answered {}", self.url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response: {}", e)))?;

        let address = parse_answer(&body)?;
        tracing::debug!("{} reported {}", self.url, address);
        Ok(address)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
