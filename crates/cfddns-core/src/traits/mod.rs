//! Core traits for cfddns
//!
//! This module defines the seams between the orchestrator and the outside
//! world.
//!
//! - [`IpSource`]: Resolve the current public address
//! - [`DnsRecordClient`]: Look up and update a DNS record at the provider
//! - [`AddressStore`]: Last-known address per record

pub mod ip_source;
pub mod dns_client;
pub mod state_store;

pub use ip_source::IpSource;
pub use dns_client::{DnsRecord, DnsRecordClient, RECORD_TTL_SECS, RECORD_TYPE, UpdateRequest};
pub use state_store::AddressStore;
