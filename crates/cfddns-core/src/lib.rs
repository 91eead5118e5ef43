// # cfddns-core
//
// Core library for the Cloudflare dynamic DNS updater.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping A records in
// step with the host's public IPv4 address:
// - **IpSource**: Trait for resolving the current public address
// - **DnsRecordClient**: Trait for looking up and updating a record at the provider
// - **AddressStore**: Trait for the last-known address per record
// - **Updater**: Runs one change-detection or resync cycle for one record
// - **Scheduler**: Drives the update and resync loops until cancelled
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Polling**: Two fixed-period loops, no push notifications
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Retry by Tick**: A failed cycle is logged and retried on the next tick

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod state;

// Re-export core types for convenience
pub use traits::{AddressStore, DnsRecord, DnsRecordClient, IpSource, UpdateRequest};
pub use engine::{ResyncOutcome, Scheduler, SchedulerHandle, UpdateOutcome, Updater};
pub use config::{RecordConfig, SchedulerConfig};
pub use error::{Error, Result};
pub use state::{FileAddressStore, MemoryAddressStore};
