// crates/tile-migrate-core/src/core/record.rs
// ============================================================================
// Module: Tile Records
// Description: Canonical record model shared by source and destination registries.
// Purpose: Provide strongly typed, serializable tile records with field-level comparison.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Record`] is the unit of migration: one tile's ownership and metadata
//! entry keyed by a [`TileId`]. Records are immutable from the pipeline's
//! point of view. The only behavior attached to them is field-level diffing,
//! which the verifier uses to prove byte-for-byte equality across registries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Tile identifier, the primary key of a registry.
///
/// # Invariants
/// - Unique within a registry.
/// - Adjacent identifiers are not assumed to be contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(u64);

impl TileId {
    /// Creates a tile identifier from its raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for TileId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Account identifier as reported by a registry.
///
/// # Invariants
/// - Opaque UTF-8 string; compared exactly, with no case folding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Creates a new account identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SECTION: Record
// ============================================================================

/// Tile ownership and metadata entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Primary key.
    pub id: TileId,
    /// Current owner account.
    pub owner: AccountId,
    /// Opaque pointer to off-store content; may be empty.
    pub metadata_ref: String,
    /// Payment flag carried from the source registry.
    pub payment_flag: bool,
    /// Creation timestamp in unix seconds.
    pub created_at: u64,
    /// Account that first bought the tile.
    pub original_buyer: AccountId,
}

impl Record {
    /// Returns every field whose value differs between `self` and `other`.
    ///
    /// Fields are reported in declaration order. An empty result means the
    /// two records are identical.
    #[must_use]
    pub fn diff(&self, other: &Self) -> Vec<RecordField> {
        let mut fields = Vec::new();
        if self.id != other.id {
            fields.push(RecordField::Id);
        }
        if self.owner != other.owner {
            fields.push(RecordField::Owner);
        }
        if self.metadata_ref != other.metadata_ref {
            fields.push(RecordField::MetadataRef);
        }
        if self.payment_flag != other.payment_flag {
            fields.push(RecordField::PaymentFlag);
        }
        if self.created_at != other.created_at {
            fields.push(RecordField::CreatedAt);
        }
        if self.original_buyer != other.original_buyer {
            fields.push(RecordField::OriginalBuyer);
        }
        fields
    }
}

/// Named record field used in mismatch reports.
///
/// # Invariants
/// - Variants are stable for report labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    /// `id` field.
    Id,
    /// `owner` field.
    Owner,
    /// `metadata_ref` field.
    MetadataRef,
    /// `payment_flag` field.
    PaymentFlag,
    /// `created_at` field.
    CreatedAt,
    /// `original_buyer` field.
    OriginalBuyer,
}

impl RecordField {
    /// Returns a stable label for the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Owner => "owner",
            Self::MetadataRef => "metadata_ref",
            Self::PaymentFlag => "payment_flag",
            Self::CreatedAt => "created_at",
            Self::OriginalBuyer => "original_buyer",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
