//! Test doubles and common utilities for contract tests
//!
//! Every double counts its calls so a test can assert exactly which
//! collaborator was touched during a cycle.

#![allow(dead_code)]

use cfddns_core::error::{Error, Result};
use cfddns_core::traits::{AddressStore, DnsRecord, DnsRecordClient, IpSource, UpdateRequest};
use cfddns_core::{MemoryAddressStore, RecordConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An IpSource whose answer the test can change between ticks
pub struct ScriptedIpSource {
    /// Address to return, or `None` to fail
    answer: Arc<Mutex<Option<String>>>,
    /// Call counter for current()
    call_count: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    /// Create a source that answers with `address`
    pub fn new(address: &str) -> Self {
        Self {
            answer: Arc::new(Mutex::new(Some(address.to_string()))),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a source that fails every call until told otherwise
    pub fn failing() -> Self {
        Self {
            answer: Arc::new(Mutex::new(None)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer with `address` from now on
    pub fn set_address(&self, address: &str) {
        *self.answer.lock().unwrap() = Some(address.to_string());
    }

    /// Fail every call from now on
    pub fn set_failing(&self) {
        *self.answer.lock().unwrap() = None;
    }

    /// Get the number of times current() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Create a new ScriptedIpSource that shares state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            answer: Arc::clone(&other.answer),
            call_count: Arc::clone(&other.call_count),
        }
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.answer
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::network("scripted failure"))
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A mock DnsRecordClient that tracks calls
///
/// Holds one remote record per name. A successful update overwrites the
/// remote content, like the real provider would.
pub struct MockDnsClient {
    /// Call counter for lookup_record()
    lookup_count: Arc<AtomicUsize>,
    /// Call counter for update_record()
    update_count: Arc<AtomicUsize>,
    /// Record names in lookup order
    looked_up: Arc<Mutex<Vec<String>>>,
    /// Payloads of accepted updates
    updates: Arc<Mutex<Vec<UpdateRequest>>>,
    /// Remote content per record name
    remote: Arc<Mutex<std::collections::HashMap<String, String>>>,
    /// Fail lookups with a provider error
    fail_lookup: Arc<AtomicBool>,
    /// Fail updates with a provider error
    fail_update: Arc<AtomicBool>,
    /// Delay applied to every call
    delay: Duration,
}

impl MockDnsClient {
    pub fn new() -> Self {
        Self {
            lookup_count: Arc::new(AtomicUsize::new(0)),
            update_count: Arc::new(AtomicUsize::new(0)),
            looked_up: Arc::new(Mutex::new(Vec::new())),
            updates: Arc::new(Mutex::new(Vec::new())),
            remote: Arc::new(Mutex::new(std::collections::HashMap::new())),
            fail_lookup: Arc::new(AtomicBool::new(false)),
            fail_update: Arc::new(AtomicBool::new(false)),
            delay: Duration::ZERO,
        }
    }

    /// Seed the remote content of a record
    pub fn with_remote(self, record_name: &str, content: &str) -> Self {
        self.set_remote(record_name, content);
        self
    }

    /// Delay every call by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_remote(&self, record_name: &str, content: &str) {
        self.remote
            .lock()
            .unwrap()
            .insert(record_name.to_string(), content.to_string());
    }

    pub fn remote(&self, record_name: &str) -> Option<String> {
        self.remote.lock().unwrap().get(record_name).cloned()
    }

    pub fn set_fail_lookup(&self, fail: bool) {
        self.fail_lookup.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    /// Get the number of times lookup_record() was called
    pub fn lookup_count(&self) -> usize {
        self.lookup_count.load(Ordering::SeqCst)
    }

    /// Get the number of times update_record() was called
    pub fn update_count(&self) -> usize {
        self.update_count.load(Ordering::SeqCst)
    }

    /// Record names in the order they were looked up
    pub fn looked_up(&self) -> Vec<String> {
        self.looked_up.lock().unwrap().clone()
    }

    /// Payloads of every update call, accepted or not
    pub fn updates(&self) -> Vec<UpdateRequest> {
        self.updates.lock().unwrap().clone()
    }

    /// Create a new MockDnsClient that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            lookup_count: Arc::clone(&other.lookup_count),
            update_count: Arc::clone(&other.update_count),
            looked_up: Arc::clone(&other.looked_up),
            updates: Arc::clone(&other.updates),
            remote: Arc::clone(&other.remote),
            fail_lookup: Arc::clone(&other.fail_lookup),
            fail_update: Arc::clone(&other.fail_update),
            delay: other.delay,
        }
    }
}

#[async_trait::async_trait]
impl DnsRecordClient for MockDnsClient {
    async fn lookup_record(&self, config: &RecordConfig) -> Result<DnsRecord> {
        self.lookup_count.fetch_add(1, Ordering::SeqCst);
        self.looked_up
            .lock()
            .unwrap()
            .push(config.record_name.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(Error::provider("mock", "lookup rejected"));
        }

        let content = self
            .remote
            .lock()
            .unwrap()
            .get(&config.record_name)
            .cloned()
            .ok_or_else(|| Error::not_found(config.record_name.clone()))?;

        Ok(DnsRecord {
            id: format!("rec-{}", config.record_name),
            content,
        })
    }

    async fn update_record(
        &self,
        config: &RecordConfig,
        new_ip: &str,
        record_id: &str,
    ) -> Result<()> {
        self.update_count.fetch_add(1, Ordering::SeqCst);
        self.updates
            .lock()
            .unwrap()
            .push(UpdateRequest::new(config, new_ip));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        assert_eq!(record_id, format!("rec-{}", config.record_name));

        if self.fail_update.load(Ordering::SeqCst) {
            return Err(Error::provider("mock", "update rejected"));
        }

        self.set_remote(&config.record_name, new_ip);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// An AddressStore whose reads and writes can be made to fail
#[derive(Clone, Default)]
pub struct FlakyAddressStore {
    inner: MemoryAddressStore,
    fail_read: Arc<AtomicBool>,
    fail_write: Arc<AtomicBool>,
    write_count: Arc<AtomicUsize>,
}

impl FlakyAddressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_read(&self, fail: bool) {
        self.fail_read.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_write(&self, fail: bool) {
        self.fail_write.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Read straight from the backing map, ignoring failure flags
    pub async fn peek(&self, record_name: &str) -> Option<String> {
        self.inner.read_stored(record_name).await.unwrap()
    }
}

#[async_trait::async_trait]
impl AddressStore for FlakyAddressStore {
    async fn read_stored(&self, record_name: &str) -> Result<Option<String>> {
        if self.fail_read.load(Ordering::SeqCst) {
            return Err(Error::state_store("read refused"));
        }
        self.inner.read_stored(record_name).await
    }

    async fn write_stored(&self, record_name: &str, address: &str) -> Result<()> {
        self.write_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(Error::state_store("write refused"));
        }
        self.inner.write_stored(record_name, address).await
    }
}

/// Helper to create a minimal RecordConfig for testing
pub fn minimal_record(record_name: &str) -> RecordConfig {
    RecordConfig::new("admin@example.com", "test-key", "zone-1", record_name)
}

/// Poll `condition` until it holds or `limit` elapses
pub async fn wait_until<F: Fn() -> bool>(limit: Duration, condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
