// crates/tile-migrate-core/src/runtime/planner.rs
// ============================================================================
// Module: Migration Planner
// Description: Computes the pending set of keys to migrate.
// Purpose: Diff source keys against live destination state on every run.
// Dependencies: crate::{core, interfaces, runtime::context}
// ============================================================================

//! ## Overview
//! The pending set is `source.list_all_ids()` filtered to keys the
//! destination does not hold, in source enumeration order. It is recomputed
//! from scratch on every run and never cached: this is what makes re-running
//! the pipeline after a failed batch safe.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::MigrationEvent;
use crate::core::PlanStrategy;
use crate::core::TileId;
use crate::interfaces::DestinationRegistry;
use crate::interfaces::SourceRegistry;
use crate::runtime::context::ReadError;
use crate::runtime::context::StageContext;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Planner output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Distinct keys enumerated from the source.
    pub source_ids: usize,
    /// Keys absent from the destination, in source order.
    pub pending: Vec<TileId>,
}

impl Plan {
    /// Returns true when there is nothing to migrate.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ============================================================================
// SECTION: Planner
// ============================================================================

/// Migration planner over borrowed registries.
pub struct Planner<'a, S: ?Sized, D: ?Sized> {
    /// Source registry.
    source: &'a S,
    /// Destination registry.
    destination: &'a D,
    /// Shared stage context.
    ctx: StageContext<'a>,
}

impl<'a, S, D> Planner<'a, S, D>
where
    S: SourceRegistry + ?Sized,
    D: DestinationRegistry + ?Sized,
{
    /// Creates a planner.
    #[must_use]
    pub const fn new(source: &'a S, destination: &'a D, ctx: StageContext<'a>) -> Self {
        Self {
            source,
            destination,
            ctx,
        }
    }

    /// Computes the pending set.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] when a registry read fails after retries.
    pub fn plan(&self) -> Result<Plan, ReadError> {
        let listed = self.ctx.read("list_source_ids", None, || self.source.list_all_ids())?.value;
        let source_ids = dedup_preserving_order(listed);
        let strategy = self.ctx.config.plan_strategy;
        let pending = match strategy {
            PlanStrategy::PerId => self.pending_per_id(&source_ids)?,
            PlanStrategy::Bulk => self.pending_bulk(&source_ids)?,
        };
        self.ctx.events.record(&MigrationEvent::PlanCompleted {
            source_ids: source_ids.len(),
            pending: pending.len(),
            strategy,
        });
        Ok(Plan {
            source_ids: source_ids.len(),
            pending,
        })
    }

    /// Filters keys with one paced existence check per key.
    fn pending_per_id(&self, source_ids: &[TileId]) -> Result<Vec<TileId>, ReadError> {
        let mut pacer = self.ctx.item_pacer();
        let mut pending = Vec::new();
        for &id in source_ids {
            pacer.tick();
            let exists =
                self.ctx.read("destination_exists", Some(id), || self.destination.exists(id))?;
            if !exists.value {
                pending.push(id);
            }
        }
        Ok(pending)
    }

    /// Filters keys against a single destination listing.
    fn pending_bulk(&self, source_ids: &[TileId]) -> Result<Vec<TileId>, ReadError> {
        let existing = self
            .ctx
            .read("list_destination_ids", None, || self.destination.list_existing_ids())?
            .value;
        Ok(source_ids.iter().copied().filter(|id| !existing.contains(id)).collect())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Drops repeated keys, keeping the first occurrence.
fn dedup_preserving_order(ids: Vec<TileId>) -> Vec<TileId> {
    let mut seen = BTreeSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
