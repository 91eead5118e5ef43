// # DNS Record Client Trait
//
// Defines the interface for reading and writing a DNS record at the provider.
//
// ## Implementations
//
// - Cloudflare: `cfddns-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::DnsRecordClient;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let client = /* DnsRecordClient implementation */;
//
//     let record = client.lookup_record(&config).await?;
//     client.update_record(&config, "203.0.113.7", &record.id).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RecordConfig;

/// Record type written on every update
pub const RECORD_TYPE: &str = "A";

/// TTL written on every update, in seconds
pub const RECORD_TTL_SECS: u32 = 120;

/// A record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Opaque provider-assigned record identifier
    pub id: String,
    /// Address currently stored at the provider
    pub content: String,
}

/// Payload of a record update
///
/// Record type and TTL are fixed; nothing in [`RecordConfig`] can change them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Target zone identifier
    #[serde(rename = "id")]
    pub zone_identifier: String,
    /// Always [`RECORD_TYPE`]
    #[serde(rename = "type")]
    pub record_type: String,
    /// Proxy flag from the record configuration
    pub proxied: bool,
    /// Record name
    pub name: String,
    /// New address
    pub content: String,
    /// Always [`RECORD_TTL_SECS`]
    pub ttl: u32,
}

impl UpdateRequest {
    /// Build the update payload for a record and a new address
    pub fn new(config: &RecordConfig, new_ip: &str) -> Self {
        Self {
            zone_identifier: config.zone_identifier.clone(),
            record_type: RECORD_TYPE.to_string(),
            proxied: config.proxy,
            name: config.record_name.clone(),
            content: new_ip.to_string(),
            ttl: RECORD_TTL_SECS,
        }
    }
}

/// Trait for the DNS provider's record API
///
/// Lookup is a pure read and update is an explicit write; the orchestrator
/// decides when to call each. Implementations make a single attempt per call
/// and return errors instead of retrying; the next scheduler tick is the
/// retry.
#[async_trait]
pub trait DnsRecordClient: Send + Sync {
    /// Look up a record by name within the configured zone
    ///
    /// Only the first match is considered.
    ///
    /// # Returns
    ///
    /// - `Ok(DnsRecord)`: Identifier and current content of the first match
    /// - `Err(Error)`: Transport/decode failure, `success: false`, or no match
    async fn lookup_record(&self, config: &RecordConfig) -> Result<DnsRecord, crate::Error>;

    /// Overwrite a record's content, proxy flag and TTL
    ///
    /// # Parameters
    ///
    /// - `config`: Record configuration (credentials, zone, name, proxy flag)
    /// - `new_ip`: The new address
    /// - `record_id`: Identifier returned by [`lookup_record`](Self::lookup_record)
    async fn update_record(
        &self,
        config: &RecordConfig,
        new_ip: &str,
        record_id: &str,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
