// crates/tile-migrate-core/src/runtime/verifier.rs
// ============================================================================
// Module: Migration Verifier
// Description: Compares source and destination registries record by record.
// Purpose: Prove completeness and field fidelity before finalization.
// Dependencies: crate::{core, interfaces, runtime::context}
// ============================================================================

//! ## Overview
//! Verification is a read-only comparison. A source key is `missing` when
//! the destination does not hold it; a key present on both sides is a
//! mismatch when any record field differs. Destination keys unknown to the
//! source are reported as `unexpected` but only the aggregate count check
//! reflects them in the verdict.
//!
//! Security posture: the verdict gates an irreversible finalize step, so any
//! read failure is surfaced as an error instead of a partial report.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::MigrationEvent;
use crate::core::RecordMismatch;
use crate::core::TileId;
use crate::core::VerificationReport;
use crate::interfaces::DestinationRegistry;
use crate::interfaces::SourceRegistry;
use crate::runtime::context::ReadError;
use crate::runtime::context::StageContext;

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Read-only registry comparator.
pub struct Verifier<'a, S: ?Sized, D: ?Sized> {
    /// Source registry.
    source: &'a S,
    /// Destination registry.
    destination: &'a D,
    /// Shared stage context.
    ctx: StageContext<'a>,
}

impl<'a, S, D> Verifier<'a, S, D>
where
    S: SourceRegistry + ?Sized,
    D: DestinationRegistry + ?Sized,
{
    /// Creates a verifier.
    #[must_use]
    pub const fn new(source: &'a S, destination: &'a D, ctx: StageContext<'a>) -> Self {
        Self {
            source,
            destination,
            ctx,
        }
    }

    /// Compares both registries.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] when any registry read fails after retries.
    pub fn verify(&self) -> Result<VerificationReport, ReadError> {
        let listed = self.ctx.read("list_source_ids", None, || self.source.list_all_ids())?.value;
        let existing = self
            .ctx
            .read("list_destination_ids", None, || self.destination.list_existing_ids())?
            .value;

        let mut seen = BTreeSet::new();
        let mut missing = Vec::new();
        let mut present = Vec::new();
        for id in listed {
            if !seen.insert(id) {
                continue;
            }
            if existing.contains(&id) {
                present.push(id);
            } else {
                missing.push(id);
            }
        }
        let unexpected: Vec<TileId> =
            existing.iter().copied().filter(|id| !seen.contains(id)).collect();

        let mismatches = self.compare(&present)?;

        let source_count =
            self.ctx.read("source_total_count", None, || self.source.total_count())?.value;
        let destination_count = self
            .ctx
            .read("destination_total_count", None, || self.destination.total_count())?
            .value;
        let counts_match = source_count == destination_count;
        let success = missing.is_empty() && mismatches.is_empty() && counts_match;

        let report = VerificationReport {
            missing,
            mismatches,
            unexpected,
            checked: present.len(),
            source_count,
            destination_count,
            counts_match,
            success,
        };
        self.ctx.events.record(&MigrationEvent::VerificationCompleted {
            checked: report.checked,
            missing: report.missing.len(),
            mismatches: report.mismatches.len(),
            unexpected: report.unexpected.len(),
            source_count,
            destination_count,
            success,
        });
        Ok(report)
    }

    /// Fetches each shared key from both sides and diffs the records.
    fn compare(&self, ids: &[TileId]) -> Result<Vec<RecordMismatch>, ReadError> {
        let mut pacer = self.ctx.item_pacer();
        let mut mismatches = Vec::new();
        for &id in ids {
            pacer.tick();
            let source =
                self.ctx.read("source_get_record", Some(id), || self.source.get_record(id))?.value;
            let destination = self
                .ctx
                .read("destination_get_record", Some(id), || self.destination.get_record(id))?
                .value;
            let fields = source.diff(&destination);
            if !fields.is_empty() {
                mismatches.push(RecordMismatch {
                    id,
                    fields,
                    source,
                    destination,
                });
            }
        }
        Ok(mismatches)
    }
}
