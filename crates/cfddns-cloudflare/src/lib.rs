// # Cloudflare DNS Record Client
//
// This crate provides the Cloudflare implementation of `DnsRecordClient`.
//
// ## Behavior
//
// - One HTTP request per call: a GET for lookup, a PUT for update
// - No retry, backoff or caching; the scheduler's next tick is the retry
// - Credentials come from each `RecordConfig`, so one client serves every
//   configured record and account
// - HTTP timeout configured (30 seconds)
// - Dry-run mode: lookups run, updates are logged and skipped
//
// ## Security Requirements
//
// - The API key NEVER appears in logs or error messages
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
//
// Every request carries `X-Auth-Email`, `X-Auth-Key` and
// `Content-Type: application/json`. Zone and record identifiers are appended
// as percent-encoded path segments, never spliced into the URL as text.

use async_trait::async_trait;
use cfddns_core::traits::{DnsRecord, DnsRecordClient, UpdateRequest};
use cfddns_core::{Error, RecordConfig, Result};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// Envelope shared by every Cloudflare v4 response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// The fields of a DNS record this client reads
#[derive(Debug, Deserialize)]
struct RecordResult {
    id: String,
    #[serde(default)]
    content: String,
}

impl<T> ApiResponse<T> {
    /// Turn `success: false` into a provider error
    fn into_result(self, context: &str) -> Result<Option<T>> {
        if self.success {
            return Ok(self.result);
        }

        let message = if self.errors.is_empty() {
            "no error details".to_string()
        } else {
            self.errors
                .iter()
                .map(|e| format!("[{}] {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ")
        };

        Err(Error::provider(PROVIDER, format!("{}: {}", context, message)))
    }
}

/// Cloudflare DNS record client
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the client will:
/// - Perform lookups normally
/// - Log the intended PUT payload
/// - **NOT** modify DNS records
pub struct CloudflareClient {
    /// API base URL, without trailing slash
    base_url: Url,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform lookups but skip updates
    dry_run: bool,
}

impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("base_url", &self.base_url.as_str())
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl CloudflareClient {
    /// Create a new Cloudflare client against the public API
    ///
    /// # Parameters
    ///
    /// - `dry_run`: If true, perform lookups but skip updates
    pub fn new(dry_run: bool) -> Result<Self> {
        Self::with_base_url(CLOUDFLARE_API_BASE, dry_run)
    }

    /// Create a client against a custom API base (proxies, tests)
    pub fn with_base_url(base_url: impl Into<String>, dry_run: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into();
        let trimmed = base_url.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(Error::config("Cloudflare API base URL cannot be empty"));
        }

        let base_url = Url::parse(trimmed).map_err(|e| {
            Error::config(format!("Invalid Cloudflare API base URL {}: {}", trimmed, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "Cloudflare API base URL cannot hold a path: {}",
                base_url
            )));
        }

        Ok(Self {
            base_url,
            client,
            dry_run,
        })
    }

    /// Create a new Cloudflare client (production/live mode)
    pub fn new_live() -> Result<Self> {
        Self::new(false)
    }

    /// Create a new Cloudflare client (dry-run mode)
    pub fn new_dry_run() -> Result<Self> {
        Self::new(true)
    }

    /// Whether updates are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// `<base>/zones/<zone>/dns_records[/<record>]`
    fn records_url(&self, zone_identifier: &str, record_id: Option<&str>) -> Result<Url> {
        let zone = path_segment(zone_identifier, "zone identifier")?;
        let record = record_id
            .map(|id| path_segment(id, "record identifier"))
            .transpose()?;

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("Cannot extend base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(["zones", zone, "dns_records"])
            .extend(record);

        Ok(url)
    }

    fn authed(
        &self,
        builder: reqwest::RequestBuilder,
        config: &RecordConfig,
    ) -> reqwest::RequestBuilder {
        builder
            .header("X-Auth-Email", &config.auth_email)
            .header("X-Auth-Key", &config.auth_key)
            .header("Content-Type", "application/json")
    }

    /// Send a request and decode the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<ApiResponse<T>> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::network(format!("{}: HTTP request failed: {}", context, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("{}: failed to read response: {}", context, e)))?;

        if !status.is_success() {
            return Err(status_error(status, &body, context));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::invalid_response(format!("{}: failed to parse response: {}", context, e))
        })
    }
}

/// Map a non-success HTTP status to an error
fn status_error(status: StatusCode, body: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::provider(
            PROVIDER,
            format!(
                "{}: Authentication failed: Invalid email/key or insufficient permissions. Status: {}",
                context, status
            ),
        ),
        404 => Error::not_found(format!("{}: {}", context, status)),
        429 => Error::provider(
            PROVIDER,
            format!(
                "{}: Rate limit exceeded. Please retry later. Status: {}",
                context, status
            ),
        ),
        500..=599 => Error::http(format!(
            "{}: Cloudflare server error (transient): {} - {}",
            context, status, body
        )),
        _ => Error::http(format!("{}: {} - {}", context, status, body)),
    }
}

/// Reject identifiers that would name the wrong resource even once encoded
fn path_segment<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    match value {
        "" | "." | ".." => Err(Error::invalid_response(format!(
            "Refusing to address {} {:?}",
            what, value
        ))),
        _ => Ok(value),
    }
}

#[async_trait]
impl DnsRecordClient for CloudflareClient {
    /// Look up a record by name
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=home.example.com
    /// X-Auth-Email: <email>
    /// X-Auth-Key: <key>
    /// ```
    async fn lookup_record(&self, config: &RecordConfig) -> Result<DnsRecord> {
        let context = format!("Record lookup for {}", config.record_name);
        tracing::debug!("Looking up record {}", config.record_name);

        let request = self
            .client
            .get(self.records_url(&config.zone_identifier, None)?)
            .query(&[("name", config.record_name.as_str())]);

        let records = self
            .send::<Vec<RecordResult>>(self.authed(request, config), &context)
            .await?
            .into_result(&context)?
            .unwrap_or_default();

        let record = records.into_iter().next().ok_or_else(|| {
            Error::not_found(format!("DNS record not found: {}", config.record_name))
        })?;

        tracing::info!(
            "Cloudflare record {} (id {}) holds {}",
            config.record_name,
            record.id,
            record.content
        );

        Ok(DnsRecord {
            id: record.id,
            content: record.content,
        })
    }

    /// Overwrite a record
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// {
    ///   "id": "<zone_id>",
    ///   "type": "A",
    ///   "proxied": false,
    ///   "name": "home.example.com",
    ///   "content": "1.2.3.4",
    ///   "ttl": 120
    /// }
    /// ```
    async fn update_record(
        &self,
        config: &RecordConfig,
        new_ip: &str,
        record_id: &str,
    ) -> Result<()> {
        let payload = UpdateRequest::new(config, new_ip);
        let url = self.records_url(&config.zone_identifier, Some(record_id))?;

        tracing::info!(
            "Updating Cloudflare DNS record: {} -> {} [mode: {}]",
            config.record_name,
            new_ip,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(&payload)?
            );
            return Ok(());
        }

        let context = format!("Record update for {}", config.record_name);
        let request = self.authed(self.client.put(url), config).json(&payload);

        self.send::<serde_json::Value>(request, &context)
            .await?
            .into_result(&context)?;

        tracing::info!(
            "DNS record updated successfully: {} -> {}",
            config.record_name,
            new_ip
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ZONE: &str = "023e105f4ecef8ad9ca31a8372d0c353";

    fn record() -> RecordConfig {
        RecordConfig::new("admin@example.com", "secret-key-123", ZONE, "home.example.com")
    }

    fn client(server: &MockServer, dry_run: bool) -> CloudflareClient {
        CloudflareClient::with_base_url(server.uri(), dry_run).unwrap()
    }

    fn list_path() -> String {
        format!("/zones/{}/dns_records", ZONE)
    }

    #[tokio::test]
    async fn test_lookup_sends_credentials_and_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(list_path()))
            .and(query_param("name", "home.example.com"))
            .and(header("X-Auth-Email", "admin@example.com"))
            .and(header("X-Auth-Key", "secret-key-123"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": [
                    {"id": "rec-1", "content": "203.0.113.7", "type": "A"},
                    {"id": "rec-2", "content": "198.51.100.1", "type": "A"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let found = client(&server, false).lookup_record(&record()).await.unwrap();

        assert_eq!(
            found,
            DnsRecord {
                id: "rec-1".to_string(),
                content: "203.0.113.7".to_string(),
            },
            "only the first match is used"
        );
    }

    #[tokio::test]
    async fn test_lookup_empty_result_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(list_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": []
            })))
            .mount(&server)
            .await;

        let err = client(&server, false).lookup_record(&record()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_lookup_success_false_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(list_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "errors": [{"code": 7003, "message": "Could not route to /zones/bad"}],
                "result": null
            })))
            .mount(&server)
            .await;

        let err = client(&server, false).lookup_record(&record()).await.unwrap_err();
        match err {
            Error::Provider { provider, message } => {
                assert_eq!(provider, "cloudflare");
                assert!(message.contains("7003"));
                assert!(message.contains("Could not route"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_maps_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(list_path()))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = client(&server, false).lookup_record(&record()).await.unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
        assert!(!err.to_string().contains("secret-key-123"));
    }

    #[tokio::test]
    async fn test_lookup_garbage_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(list_path()))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server, false).lookup_record(&record()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_update_sends_fixed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("{}/rec-1", list_path())))
            .and(header("X-Auth-Key", "secret-key-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": {"id": "rec-1", "content": "1.2.3.5"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = record().with_proxy(true);
        client(&server, false)
            .update_record(&config, "1.2.3.5", "rec-1")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);

        let body: serde_json::Value = requests[0].body_json().unwrap();
        assert_eq!(
            body,
            json!({
                "id": ZONE,
                "type": "A",
                "proxied": true,
                "name": "home.example.com",
                "content": "1.2.3.5",
                "ttl": 120
            })
        );
    }

    #[tokio::test]
    async fn test_update_success_false_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "errors": [{"code": 9005, "message": "Content for A record is invalid"}],
                "result": null
            })))
            .mount(&server)
            .await;

        let err = client(&server, false)
            .update_record(&record(), "1.2.3.5", "rec-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }

    #[tokio::test]
    async fn test_update_server_error_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client(&server, false)
            .update_record(&record(), "1.2.3.5", "rec-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[tokio::test]
    async fn test_dry_run_skips_put() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        client(&server, true)
            .update_record(&record(), "1.2.3.5", "rec-1")
            .await
            .unwrap();

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_dry_run_mode() {
        assert!(CloudflareClient::new_dry_run().unwrap().is_dry_run());
        assert!(!CloudflareClient::new_live().unwrap().is_dry_run());
    }

    #[test]
    fn test_provider_name() {
        let client = CloudflareClient::new(false).unwrap();
        assert_eq!(client.provider_name(), "cloudflare");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = CloudflareClient::with_base_url("http://localhost:1/v4/", false).unwrap();
        assert_eq!(
            client.records_url("zone", None).unwrap().as_str(),
            "http://localhost:1/v4/zones/zone/dns_records"
        );
        assert_eq!(
            client.records_url("zone", Some("rec-1")).unwrap().as_str(),
            "http://localhost:1/v4/zones/zone/dns_records/rec-1"
        );
        assert!(CloudflareClient::with_base_url("/", false).is_err());
        assert!(CloudflareClient::with_base_url("not a url", false).is_err());
        assert!(CloudflareClient::with_base_url("mailto:ops@example.com", false).is_err());
    }

    #[test]
    fn test_identifiers_are_percent_encoded() {
        let client = CloudflareClient::with_base_url("http://localhost:1/v4", false).unwrap();

        let url = client.records_url("a/b?c", Some("x#y")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1/v4/zones/a%2Fb%3Fc/dns_records/x%23y"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        assert!(client.records_url("..", None).is_err());
        assert!(client.records_url("zone", Some("")).is_err());
    }

    #[tokio::test]
    async fn test_update_with_unsafe_record_id_stays_under_zone() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("{}/rec%2F..%2Fother", list_path())))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server, false)
            .update_record(&record(), "1.2.3.4", "rec/../other")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_with_dot_dot_record_id_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server, false)
            .update_record(&record(), "1.2.3.4", "..")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[test]
    fn test_debug_output() {
        let client = CloudflareClient::new(true).unwrap();
        let debug_str = format!("{:?}", client);
        assert!(debug_str.contains("CloudflareClient"));
        assert!(debug_str.contains("dry_run: true"));
    }
}
