// # Address Store Trait
//
// Defines the interface for the last-known-address snapshot kept per record.
//
// ## Purpose
//
// The snapshot is what the orchestrator compares the freshly resolved
// address against. It is written only after the provider accepted an update,
// so a failed update is retried on the next tick.
//
// ## Implementations
//
// - File-based: one plain-text file per record (`FileAddressStore`)
// - In-memory: `MemoryAddressStore`

use async_trait::async_trait;

/// Trait for address store implementations
///
/// Implementations must be thread-safe and usable across async tasks.
/// Values are stored and returned verbatim; no trimming or parsing.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Read the stored address for a record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(String))`: The stored contents, exactly as written
    /// - `Ok(None)`: Nothing stored yet for this record
    /// - `Err(Error)`: Storage error
    async fn read_stored(&self, record_name: &str) -> Result<Option<String>, crate::Error>;

    /// Create or overwrite the stored address for a record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Successfully written
    /// - `Err(Error)`: Storage error
    async fn write_stored(&self, record_name: &str, address: &str) -> Result<(), crate::Error>;
}
