// crates/tile-migrate-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Registry
// Description: Shared in-memory registry implementing both registry ports.
// Purpose: Provide a deterministic registry for tests and embedding hosts.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`InMemoryRegistry`] keeps records in a shared ordered map. Clones share
//! state, so a test can hand one clone to the orchestrator and inspect
//! another afterwards. Batch writes are all-or-nothing and honor the
//! finalize flag exactly like a remote destination would.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::Record;
use crate::core::TileId;
use crate::interfaces::DestinationRegistry;
use crate::interfaces::RegistryError;
use crate::interfaces::SourceRegistry;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry state protected by the registry mutex.
#[derive(Debug, Default)]
struct RegistryState {
    /// Records keyed by id.
    records: BTreeMap<TileId, Record>,
    /// Finalize flag.
    finalized: bool,
    /// Ids of every accepted batch, in write order.
    writes: Vec<Vec<TileId>>,
}

/// In-memory registry for tests and examples.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    /// Shared registry state.
    state: Arc<Mutex<RegistryState>>,
}

impl InMemoryRegistry {
    /// Creates an empty, non-finalized registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the given records.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let registry = Self::new();
        if let Ok(mut state) = registry.state.lock() {
            for record in records {
                state.records.insert(record.id, record);
            }
        }
        registry
    }

    /// Inserts or replaces a record directly, bypassing batch semantics.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Fatal`] when the registry lock is poisoned.
    pub fn insert(&self, record: Record) -> Result<(), RegistryError> {
        self.lock()?.records.insert(record.id, record);
        Ok(())
    }

    /// Sets the finalize flag.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Fatal`] when the registry lock is poisoned.
    pub fn set_finalized(&self, finalized: bool) -> Result<(), RegistryError> {
        self.lock()?.finalized = finalized;
        Ok(())
    }

    /// Returns the ids of every accepted batch, in write order.
    #[must_use]
    pub fn write_log(&self) -> Vec<Vec<TileId>> {
        self.state.lock().map(|state| state.writes.clone()).unwrap_or_default()
    }

    /// Returns a snapshot of every stored record, ordered by id.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.state.lock().map(|state| state.records.values().cloned().collect()).unwrap_or_default()
    }

    /// Acquires the state lock.
    fn lock(&self) -> Result<MutexGuard<'_, RegistryState>, RegistryError> {
        self.state.lock().map_err(|_| RegistryError::Fatal("registry mutex poisoned".to_string()))
    }
}

impl SourceRegistry for InMemoryRegistry {
    fn list_all_ids(&self) -> Result<Vec<TileId>, RegistryError> {
        Ok(self.lock()?.records.keys().copied().collect())
    }

    fn get_record(&self, id: TileId) -> Result<Record, RegistryError> {
        self.lock()?.records.get(&id).cloned().ok_or(RegistryError::NotFound(id))
    }

    fn total_count(&self) -> Result<u64, RegistryError> {
        count_records(&*self.lock()?)
    }
}

impl DestinationRegistry for InMemoryRegistry {
    fn list_existing_ids(&self) -> Result<BTreeSet<TileId>, RegistryError> {
        Ok(self.lock()?.records.keys().copied().collect())
    }

    fn exists(&self, id: TileId) -> Result<bool, RegistryError> {
        Ok(self.lock()?.records.contains_key(&id))
    }

    fn get_record(&self, id: TileId) -> Result<Record, RegistryError> {
        SourceRegistry::get_record(self, id)
    }

    fn write_batch(&self, records: &[Record]) -> Result<(), RegistryError> {
        let mut state = self.lock()?;
        if state.finalized {
            return Err(RegistryError::Finalized);
        }
        if records.is_empty() {
            return Err(RegistryError::Fatal("batch is empty".to_string()));
        }
        let mut seen = BTreeSet::new();
        for record in records {
            if !seen.insert(record.id) || state.records.contains_key(&record.id) {
                return Err(RegistryError::Fatal(format!("duplicate record id {}", record.id)));
            }
        }
        for record in records {
            state.records.insert(record.id, record.clone());
        }
        state.writes.push(records.iter().map(|record| record.id).collect());
        drop(state);
        Ok(())
    }

    fn is_finalized(&self) -> Result<bool, RegistryError> {
        Ok(self.lock()?.finalized)
    }

    fn total_count(&self) -> Result<u64, RegistryError> {
        count_records(&*self.lock()?)
    }
}

/// Returns the record count as `u64`.
fn count_records(state: &RegistryState) -> Result<u64, RegistryError> {
    u64::try_from(state.records.len())
        .map_err(|_| RegistryError::Fatal("record count exceeds u64".to_string()))
}
