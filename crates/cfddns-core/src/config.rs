//! Configuration types for cfddns
//!
//! Two kinds of configuration exist:
//! - [`RecordConfig`]: one entry per managed DNS record, loaded once from a
//!   JSON file at startup and never mutated afterwards
//! - [`SchedulerConfig`]: timing for the update and resync loops

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// One managed DNS record
///
/// Deserialized from the record file:
///
/// ```json
/// [
///   {
///     "authEmail": "admin@example.com",
///     "authKey": "0123456789abcdef",
///     "zoneIdentifier": "023e105f4ecef8ad9ca31a8372d0c353",
///     "recordName": "home.example.com",
///     "proxy": false
///   }
/// ]
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordConfig {
    /// Account email sent as `X-Auth-Email`
    pub auth_email: String,

    /// API key sent as `X-Auth-Key`
    /// ⚠️ NEVER log this value
    pub auth_key: String,

    /// Provider-assigned zone identifier
    pub zone_identifier: String,

    /// Fully-qualified record name, also the local storage key
    pub record_name: String,

    /// Whether the provider should proxy traffic for this record
    #[serde(default)]
    pub proxy: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for RecordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordConfig")
            .field("auth_email", &self.auth_email)
            .field("auth_key", &"<REDACTED>")
            .field("zone_identifier", &self.zone_identifier)
            .field("record_name", &self.record_name)
            .field("proxy", &self.proxy)
            .finish()
    }
}

impl RecordConfig {
    /// Create a new record configuration with proxying disabled
    pub fn new(
        auth_email: impl Into<String>,
        auth_key: impl Into<String>,
        zone_identifier: impl Into<String>,
        record_name: impl Into<String>,
    ) -> Self {
        Self {
            auth_email: auth_email.into(),
            auth_key: auth_key.into(),
            zone_identifier: zone_identifier.into(),
            record_name: record_name.into(),
            proxy: false,
        }
    }

    /// Enable or disable proxying
    pub fn with_proxy(mut self, proxy: bool) -> Self {
        self.proxy = proxy;
        self
    }

    /// Validate a single entry
    pub fn validate(&self) -> Result<()> {
        validate_record_name(&self.record_name)?;

        if self.auth_email.trim().is_empty() {
            return Err(Error::config(format!(
                "authEmail is empty for record {}",
                self.record_name
            )));
        }
        if self.auth_key.trim().is_empty() {
            return Err(Error::config(format!(
                "authKey is empty for record {}",
                self.record_name
            )));
        }
        if self.zone_identifier.trim().is_empty() {
            return Err(Error::config(format!(
                "zoneIdentifier is empty for record {}",
                self.record_name
            )));
        }
        if !self
            .zone_identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::config(format!(
                "zoneIdentifier for record {} may only contain letters, digits, '-' and '_'",
                self.record_name
            )));
        }

        Ok(())
    }
}

/// Load and validate the record file
///
/// The file holds a JSON array of [`RecordConfig`] objects. Order is
/// preserved; the scheduler processes entries in file order.
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<RecordConfig>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let records = parse_records(&content)
        .map_err(|e| Error::config(format!("Failed to load {}: {}", path.display(), e)))?;

    tracing::debug!("Loaded {} record(s) from {}", records.len(), path.display());
    Ok(records)
}

/// Parse and validate record entries from JSON text
pub fn parse_records(json: &str) -> Result<Vec<RecordConfig>> {
    let records: Vec<RecordConfig> = serde_json::from_str(json)?;
    validate_records(&records)?;
    Ok(records)
}

/// Validate the full record set
///
/// Record names double as storage keys, so two entries with the same name
/// would overwrite each other's stored address.
pub fn validate_records(records: &[RecordConfig]) -> Result<()> {
    if records.is_empty() {
        return Err(Error::config("No records configured"));
    }

    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        record.validate()?;

        if !seen.insert(record.record_name.to_ascii_lowercase()) {
            return Err(Error::config(format!(
                "Duplicate recordName: {}",
                record.record_name
            )));
        }
    }

    Ok(())
}

/// Validate that a string is a usable DNS record name
///
/// Basic RFC 1035 checks. A leading `*` wildcard label is accepted.
pub fn validate_record_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::config("recordName cannot be empty"));
    }

    if name.len() > 253 {
        return Err(Error::config(format!(
            "recordName too long: {} chars (max 253). Got: {}",
            name.len(),
            name
        )));
    }

    for (i, label) in name.split('.').enumerate() {
        if label.is_empty() {
            return Err(Error::config(format!(
                "recordName has empty label: '{}'",
                name
            )));
        }

        if i == 0 && label == "*" {
            continue;
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "recordName label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::config(format!(
                "recordName label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "recordName label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

/// Timing for the two periodic workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Period of the change-detection loop
    pub update_interval: Duration,

    /// Period of the provider-side resync loop
    pub poll_interval: Duration,

    /// How long shutdown waits for both workers to acknowledge
    pub shutdown_timeout: Duration,
}

impl SchedulerConfig {
    /// Validate the timing values
    pub fn validate(&self) -> Result<()> {
        if self.update_interval.is_zero() {
            return Err(Error::config("Update interval must be > 0"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::config("Poll interval must be > 0"));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(Error::config("Shutdown timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(default_update_interval_secs()),
            poll_interval: Duration::from_secs(default_poll_interval_secs()),
            shutdown_timeout: Duration::from_secs(default_shutdown_timeout_secs()),
        }
    }
}

/// Default update loop period in seconds
pub fn default_update_interval_secs() -> u64 {
    10
}

/// Default resync loop period in seconds
pub fn default_poll_interval_secs() -> u64 {
    300
}

/// Default shutdown acknowledgement bound in seconds
pub fn default_shutdown_timeout_secs() -> u64 {
    30
}
