// crates/tile-migrate-core/tests/verifier.rs
// ============================================================================
// Module: Verifier Tests
// Description: Completeness, field fidelity, and count checks.
// Purpose: Ensure verification never reports success over a divergent copy.
// Dependencies: tile-migrate-core
// ============================================================================
//! ## Overview
//! Exercises [`Verifier`] with hand-built registry states covering missing
//! keys, field mismatches, count drift, and read failures.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use tile_migrate_core::AccountId;
use tile_migrate_core::CollectingEventSink;
use tile_migrate_core::ErrorKind;
use tile_migrate_core::InMemoryRegistry;
use tile_migrate_core::ManualClock;
use tile_migrate_core::MigrationEvent;
use tile_migrate_core::RecordField;
use tile_migrate_core::StageContext;
use tile_migrate_core::TileId;
use tile_migrate_core::Verifier;

use crate::common::FlakySource;
use crate::common::fast_config;
use crate::common::ids;
use crate::common::record;
use crate::common::records;

/// Verifies identical registries pass verification.
#[test]
fn identical_registries_verify() {
    let source = InMemoryRegistry::with_records(records(&[1, 2, 3], "alice"));
    let destination = InMemoryRegistry::with_records(records(&[1, 2, 3], "alice"));
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(25);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = Verifier::new(&source, &destination, ctx).verify().unwrap();

    assert!(report.success);
    assert_eq!(report.checked, 3);
    assert_eq!(report.source_count, 3);
    assert!(report.counts_match);
}

/// Verifies a differing owner yields exactly one mismatch and no missing keys.
#[test]
fn owner_difference_is_reported_as_mismatch() {
    let source = InMemoryRegistry::with_records(vec![record(1, "alice"), record(2, "bob")]);
    let destination = InMemoryRegistry::with_records(vec![record(1, "alice"), record(2, "xavier")]);
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(25);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = Verifier::new(&source, &destination, ctx).verify().unwrap();

    assert!(!report.success);
    assert!(report.missing.is_empty());
    assert_eq!(report.mismatches.len(), 1);
    let mismatch = &report.mismatches[0];
    assert_eq!(mismatch.id, TileId::new(2));
    assert_eq!(mismatch.fields, vec![RecordField::Owner]);
    assert_eq!(mismatch.source.owner, AccountId::new("bob"));
    assert_eq!(mismatch.destination.owner, AccountId::new("xavier"));
}

/// Verifies an absent key is reported as missing and fails the counts.
#[test]
fn absent_key_is_reported_as_missing() {
    let source = InMemoryRegistry::with_records(records(&[1, 2, 3], "alice"));
    let destination = InMemoryRegistry::with_records(records(&[1, 2], "alice"));
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(25);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = Verifier::new(&source, &destination, ctx).verify().unwrap();

    assert!(!report.success);
    assert_eq!(report.missing, ids(&[3]));
    assert!(report.mismatches.is_empty());
    assert!(!report.counts_match);
    assert_eq!(report.checked, 2);
}

/// Verifies extra destination keys break the count check.
#[test]
fn unexpected_destination_keys_fail_count_check() {
    let source = InMemoryRegistry::with_records(records(&[1, 2], "alice"));
    let destination = InMemoryRegistry::with_records(records(&[1, 2, 9], "alice"));
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(25);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = Verifier::new(&source, &destination, ctx).verify().unwrap();

    assert!(report.missing.is_empty());
    assert!(report.mismatches.is_empty());
    assert_eq!(report.unexpected, ids(&[9]));
    assert_eq!((report.source_count, report.destination_count), (2, 3));
    assert!(!report.success);
}

/// Verifies every differing field is named in declaration order.
#[test]
fn mismatch_lists_all_differing_fields() {
    let source = InMemoryRegistry::with_records(vec![record(4, "alice")]);
    let mut altered = record(4, "alice");
    altered.metadata_ref = "ipfs://tile/other".to_string();
    altered.payment_flag = !altered.payment_flag;
    let destination = InMemoryRegistry::with_records(vec![altered]);
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(25);
    let ctx = StageContext::new(&clock, &events, &config);

    let report = Verifier::new(&source, &destination, ctx).verify().unwrap();

    assert_eq!(
        report.mismatches[0].fields,
        vec![RecordField::MetadataRef, RecordField::PaymentFlag]
    );
}

/// Verifies a read failure is an error, not a verdict.
#[test]
fn read_failure_is_surfaced_as_error() {
    let source = FlakySource::new(InMemoryRegistry::with_records(records(&[1, 2], "alice")));
    source.fail_fatally(2);
    let destination = InMemoryRegistry::with_records(records(&[1, 2], "alice"));
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(25);
    let ctx = StageContext::new(&clock, &events, &config);

    let error = Verifier::new(&source, &destination, ctx).verify().unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Fatal);
    assert_eq!(error.id, Some(TileId::new(2)));
    assert!(events.events().is_empty());
}

/// Verifies the completion event mirrors the report.
#[test]
fn verification_emits_completion_event() {
    let source = InMemoryRegistry::with_records(records(&[1, 2], "alice"));
    let destination = InMemoryRegistry::with_records(records(&[1], "alice"));
    let clock = ManualClock::new();
    let events = CollectingEventSink::new();
    let config = fast_config(25);
    let ctx = StageContext::new(&clock, &events, &config);

    Verifier::new(&source, &destination, ctx).verify().unwrap();

    assert_eq!(
        events.events(),
        vec![MigrationEvent::VerificationCompleted {
            checked: 1,
            missing: 1,
            mismatches: 0,
            unexpected: 0,
            source_count: 2,
            destination_count: 1,
            success: false,
        }]
    );
}
