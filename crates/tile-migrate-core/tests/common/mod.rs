// crates/tile-migrate-core/tests/common/mod.rs
// =============================================================================
// Module: Core Test Helpers
// Description: Record builders and fault-injecting registry fakes.
// Purpose: Share deterministic fixtures across tile-migrate-core suites.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tile_migrate_core::AccountId;
use tile_migrate_core::DestinationRegistry;
use tile_migrate_core::InMemoryRegistry;
use tile_migrate_core::PipelineConfig;
use tile_migrate_core::Record;
use tile_migrate_core::RegistryError;
use tile_migrate_core::RetryPolicy;
use tile_migrate_core::SourceRegistry;
use tile_migrate_core::TileId;

/// Builds a record with deterministic fields derived from `id`.
pub fn record(id: u64, owner: &str) -> Record {
    Record {
        id: TileId::new(id),
        owner: AccountId::new(owner),
        metadata_ref: format!("ipfs://tile/{id}"),
        payment_flag: id % 2 == 0,
        created_at: 1_700_000_000 + id,
        original_buyer: AccountId::new(format!("buyer-{id}")),
    }
}

/// Builds records for `ids`, all owned by `owner`.
pub fn records(ids: &[u64], owner: &str) -> Vec<Record> {
    ids.iter().map(|id| record(*id, owner)).collect()
}

/// Returns tile ids for raw values.
pub fn ids(raw: &[u64]) -> Vec<TileId> {
    raw.iter().copied().map(TileId::new).collect()
}

/// Pipeline config with zero delays and the given batch size.
pub fn fast_config(batch_size: usize) -> PipelineConfig {
    PipelineConfig {
        batch_size,
        ..PipelineConfig::default()
    }
    .without_delays()
}

/// Pipeline config with the reference pacing and retry delays.
pub fn paced_config(batch_size: usize) -> PipelineConfig {
    PipelineConfig {
        batch_size,
        retry: RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        },
        item_delay: Duration::from_millis(200),
        batch_delay: Duration::from_secs(5),
        ..PipelineConfig::default()
    }
}

// ============================================================================
// SECTION: Flaky Source
// ============================================================================

/// Source whose `get_record` fails transiently a set number of times per id.
#[derive(Clone)]
pub struct FlakySource {
    /// Backing records.
    inner: InMemoryRegistry,
    /// Remaining injected failures per id.
    failures: Arc<Mutex<BTreeMap<TileId, u32>>>,
    /// Ids for which reads fail permanently.
    fatal: Arc<Mutex<BTreeSet<TileId>>>,
    /// Number of `get_record` calls per id.
    calls: Arc<Mutex<BTreeMap<TileId, u32>>>,
}

impl FlakySource {
    /// Wraps `inner` with no injected failures.
    pub fn new(inner: InMemoryRegistry) -> Self {
        Self {
            inner,
            failures: Arc::new(Mutex::new(BTreeMap::new())),
            fatal: Arc::new(Mutex::new(BTreeSet::new())),
            calls: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Makes the next `count` reads of `id` fail transiently.
    pub fn fail_transiently(&self, id: u64, count: u32) {
        self.failures.lock().unwrap().insert(TileId::new(id), count);
    }

    /// Makes every read of `id` fail with a fatal error.
    pub fn fail_fatally(&self, id: u64) {
        self.fatal.lock().unwrap().insert(TileId::new(id));
    }

    /// Returns how many times `id` was fetched.
    pub fn calls(&self, id: u64) -> u32 {
        self.calls.lock().unwrap().get(&TileId::new(id)).copied().unwrap_or(0)
    }
}

impl SourceRegistry for FlakySource {
    fn list_all_ids(&self) -> Result<Vec<TileId>, RegistryError> {
        self.inner.list_all_ids()
    }

    fn get_record(&self, id: TileId) -> Result<Record, RegistryError> {
        *self.calls.lock().unwrap().entry(id).or_insert(0) += 1;
        if self.fatal.lock().unwrap().contains(&id) {
            return Err(RegistryError::Fatal(format!("record {id} unreadable")));
        }
        let mut failures = self.failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(&id)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(RegistryError::Transient(format!("timeout fetching {id}")));
        }
        drop(failures);
        SourceRegistry::get_record(&self.inner, id)
    }

    fn total_count(&self) -> Result<u64, RegistryError> {
        SourceRegistry::total_count(&self.inner)
    }
}

// ============================================================================
// SECTION: Failing Destination
// ============================================================================

/// Destination whose N-th `write_batch` call fails fatally once.
#[derive(Clone)]
pub struct FailingDestination {
    /// Backing registry.
    inner: InMemoryRegistry,
    /// One-based write call that fails, if any.
    fail_on_write: Arc<Mutex<Option<usize>>>,
    /// Write calls observed, including rejected ones.
    write_calls: Arc<Mutex<usize>>,
    /// Number of `exists` calls observed.
    exists_calls: Arc<Mutex<usize>>,
}

impl FailingDestination {
    /// Wraps `inner`; the `fail_on_write`-th write call is rejected.
    pub fn new(inner: InMemoryRegistry, fail_on_write: Option<usize>) -> Self {
        Self {
            inner,
            fail_on_write: Arc::new(Mutex::new(fail_on_write)),
            write_calls: Arc::new(Mutex::new(0)),
            exists_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Clears the injected write failure.
    pub fn heal(&self) {
        *self.fail_on_write.lock().unwrap() = None;
    }

    /// Returns the number of write calls observed.
    pub fn write_calls(&self) -> usize {
        *self.write_calls.lock().unwrap()
    }

    /// Returns the number of `exists` calls observed.
    pub fn exists_calls(&self) -> usize {
        *self.exists_calls.lock().unwrap()
    }
}

impl DestinationRegistry for FailingDestination {
    fn list_existing_ids(&self) -> Result<BTreeSet<TileId>, RegistryError> {
        self.inner.list_existing_ids()
    }

    fn exists(&self, id: TileId) -> Result<bool, RegistryError> {
        *self.exists_calls.lock().unwrap() += 1;
        self.inner.exists(id)
    }

    fn get_record(&self, id: TileId) -> Result<Record, RegistryError> {
        DestinationRegistry::get_record(&self.inner, id)
    }

    fn write_batch(&self, records: &[Record]) -> Result<(), RegistryError> {
        let mut calls = self.write_calls.lock().unwrap();
        *calls += 1;
        if *self.fail_on_write.lock().unwrap() == Some(*calls) {
            return Err(RegistryError::Fatal("write rejected: gas estimation failed".to_string()));
        }
        drop(calls);
        self.inner.write_batch(records)
    }

    fn is_finalized(&self) -> Result<bool, RegistryError> {
        self.inner.is_finalized()
    }

    fn total_count(&self) -> Result<u64, RegistryError> {
        DestinationRegistry::total_count(&self.inner)
    }
}
