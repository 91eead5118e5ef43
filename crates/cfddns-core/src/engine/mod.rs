//! Update orchestration
//!
//! The [`Updater`] runs one cycle for one configured record:
//! - Resolving the current address via IpSource
//! - Comparing it with the stored address
//! - Looking up and updating the DNS record via DnsRecordClient
//! - Persisting the new address after a successful update
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────┐
//!                     │  Scheduler   │  update tick / resync tick
//!                     └──────────────┘
//!                            │
//!                            ▼
//!                     ┌──────────────┐
//!                     │   Updater    │
//!                     └──────────────┘
//!                            │
//!        ┌───────────────────┼─────────────────────┐
//!        │                   │                     │
//!        ▼                   ▼                     ▼
//! ┌─────────────┐    ┌───────────────┐    ┌─────────────────┐
//! │  IpSource   │    │ AddressStore  │    │ DnsRecordClient │
//! │ (resolve)   │    │ (compare)     │    │ (lookup/update) │
//! └─────────────┘    └───────────────┘    └─────────────────┘
//! ```
//!
//! ## Failure handling
//!
//! Every step returns a `Result`. A failed cycle is reported to the caller
//! and leaves the stored address untouched, so the next tick retries it.

pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerHandle};

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::RecordConfig;
use crate::error::{Error, Result};
use crate::traits::{AddressStore, DnsRecordClient, IpSource};

/// Result of one change-detection cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Current and stored addresses match; nothing was sent to the provider
    Unchanged {
        /// The current address
        address: String,
    },

    /// The record was updated and the new address stored
    Updated {
        /// Previously stored address, if any
        previous: Option<String>,
        /// The address written to the provider and the store
        current: String,
        /// Provider record identifier that was updated
        record_id: String,
    },
}

/// Result of one provider-side resync
///
/// Both variants mean the record was rewritten; they only differ in whether
/// the provider's content already matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResyncOutcome {
    /// Provider content already equalled the current address; proxy flag and
    /// TTL were re-applied
    Reapplied {
        /// The current address
        address: String,
    },

    /// Provider content differed and was overwritten
    Corrected {
        /// Content the provider held before
        previous: String,
        /// The address written to the provider
        current: String,
    },
}

/// Orchestrates one record's update cycle
///
/// Cheap to share: all collaborators are behind `Arc`, and the scheduler
/// hands one `Arc<Updater>` to both workers.
pub struct Updater {
    /// Address resolver
    ip_source: Arc<dyn IpSource>,

    /// DNS provider record API
    client: Arc<dyn DnsRecordClient>,

    /// Last-known address per record
    store: Arc<dyn AddressStore>,
}

impl Updater {
    /// Create a new updater
    pub fn new(
        ip_source: Arc<dyn IpSource>,
        client: Arc<dyn DnsRecordClient>,
        store: Arc<dyn AddressStore>,
    ) -> Self {
        Self {
            ip_source,
            client,
            store,
        }
    }

    /// Run one change-detection cycle for a record
    ///
    /// 1. Resolve the current address (failure ends the cycle)
    /// 2. Read the stored address (failure is logged and treated as unknown)
    /// 3. Compare the resolved address with the stored contents exactly as
    ///    read; `"1.2.3.4"` and `"1.2.3.4\n"` differ. A missing or empty
    ///    file is unknown and always differs.
    /// 4. If they differ: look up the record, update it, then store the address
    pub async fn try_update(&self, config: &RecordConfig) -> Result<UpdateOutcome> {
        let record_name = config.record_name.as_str();

        let current = self.resolve_current().await?;
        info!("Current public IPv4 address: {}", current);

        let stored = match self.store.read_stored(record_name).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Failed to read stored address for {}: {}", record_name, e);
                None
            }
        };
        let previous = stored.filter(|s| !s.is_empty());

        if previous.as_deref() == Some(current.as_str()) {
            info!(
                "Current and previous addresses match for {}, nothing to do",
                record_name
            );
            return Ok(UpdateOutcome::Unchanged { address: current });
        }

        info!(
            "Address change for {}: {} -> {}",
            record_name,
            previous.as_deref().unwrap_or("<none>"),
            current
        );

        let record = self.client.lookup_record(config).await?;
        info!("DNS record id for {}: {}", record_name, record.id);

        self.client
            .update_record(config, &current, &record.id)
            .await?;

        self.store.write_stored(record_name, &current).await?;
        info!("Updated {} -> {}", record_name, current);

        Ok(UpdateOutcome::Updated {
            previous,
            current,
            record_id: record.id,
        })
    }

    /// Reconcile the provider-side record with the current address
    ///
    /// Always looks the record up and always rewrites it, regardless of what
    /// the stored address says, so content, proxy flag and TTL are all
    /// re-applied every pass. The stored address is not read or written here.
    pub async fn resync(&self, config: &RecordConfig) -> Result<ResyncOutcome> {
        let record_name = config.record_name.as_str();

        let record = self.client.lookup_record(config).await?;
        info!("Fetched ipv4 address for {}: {}", record_name, record.content);

        let current = self.resolve_current().await?;

        if record.content != current {
            warn!(
                "Provider record {} out of sync: {} (current {})",
                record_name, record.content, current
            );
        }

        self.client
            .update_record(config, &current, &record.id)
            .await?;

        if record.content == current {
            debug!("Re-applied {} -> {}", record_name, current);
            Ok(ResyncOutcome::Reapplied { address: current })
        } else {
            info!("Resynced {} -> {}", record_name, current);
            Ok(ResyncOutcome::Corrected {
                previous: record.content,
                current,
            })
        }
    }

    /// Resolve the current address, rejecting blank answers
    async fn resolve_current(&self) -> Result<String> {
        let current = self.ip_source.current().await?;
        let current = current.trim();

        if current.is_empty() {
            return Err(Error::ip_source(format!(
                "{} returned an empty address",
                self.ip_source.source_name()
            )));
        }

        Ok(current.to_string())
    }
}

impl std::fmt::Debug for Updater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("ip_source", &self.ip_source.source_name())
            .field("provider", &self.client.provider_name())
            .finish_non_exhaustive()
    }
}
