// # Memory Address Store
//
// In-memory implementation of AddressStore.
//
// Nothing survives a restart, so the first cycle after startup always sees
// "no stored address" and pushes an update. Useful for tests and for
// embedding where a redundant first update is harmless.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::AddressStore;

/// In-memory address store
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryAddressStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryAddressStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one entry
    pub fn with_entry(record_name: impl Into<String>, address: impl Into<String>) -> Self {
        let mut map = HashMap::new();
        map.insert(record_name.into(), address.into());
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl AddressStore for MemoryAddressStore {
    async fn read_stored(&self, record_name: &str) -> Result<Option<String>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(record_name).cloned())
    }

    async fn write_stored(&self, record_name: &str, address: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(record_name.to_string(), address.to_string());
        Ok(())
    }
}
