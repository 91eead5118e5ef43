// # IP Source Trait
//
// Defines the interface for resolving the caller's current public address.
//
// ## Implementations
//
// - HTTP IP-echo service: `cfddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let current = source.current().await?;
//     println!("public address: {}", current);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for address resolver implementations
///
/// The caller trims the returned string and then compares it byte-for-byte
/// with the stored address, so implementations must not normalize it.
///
/// # Failure
///
/// An empty or unusable answer is an error, never an empty `Ok`. Callers
/// treat any error as "address unknown" and skip the cycle.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Resolve the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The address as reported by the service, trimmed
    /// - `Err(Error)`: Transport failure, bad status, or empty/invalid body
    async fn current(&self) -> Result<String, crate::Error>;

    /// Name used in log lines
    fn source_name(&self) -> &'static str {
        "ip-source"
    }
}
