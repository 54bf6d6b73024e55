//! Write-once outcome commitments per condition.
//!
//! A resolution is a merkle root committing the set of winning leaves for a
//! condition. Once recorded it is immutable; there is no re-resolution path.
//! Verification is read-only and returns `false` rather than erroring so
//! callers can tell "unresolved" and "bad proof" apart from real failures.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::crypto::{merkle, tagged_hash, Hash32};
use crate::domain::{ConditionId, Outcome};
use crate::error::LedgerError;

const RESOLUTION_LEAF_TAG: &str = "matchbook/resolution-leaf/v1";

/// The leaf committing `outcome` as a winner of `condition`.
#[must_use]
pub fn winning_leaf(condition: &ConditionId, outcome: Outcome) -> Hash32 {
    tagged_hash(
        RESOLUTION_LEAF_TAG,
        &[condition.hash().as_bytes(), &[outcome.index()]],
    )
}

/// A recorded resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    root: Hash32,
    resolved_at: DateTime<Utc>,
}

impl Resolution {
    /// The committed merkle root.
    #[must_use]
    pub fn root(&self) -> Hash32 {
        self.root
    }

    /// When the resolution was recorded.
    #[must_use]
    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }
}

/// Append-only store of resolutions keyed by condition.
#[derive(Debug, Clone, Default)]
pub struct MarketResolver {
    resolutions: HashMap<ConditionId, Resolution>,
}

impl MarketResolver {
    /// Create an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolution. Fails if the condition is already resolved.
    pub fn resolve(
        &mut self,
        condition: ConditionId,
        root: Hash32,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if self.resolutions.contains_key(&condition) {
            return Err(LedgerError::AlreadyResolved { condition });
        }
        info!(%condition, root = %root, "condition resolved");
        self.resolutions.insert(
            condition,
            Resolution {
                root,
                resolved_at: now,
            },
        );
        Ok(())
    }

    /// Record several resolutions, all-or-nothing.
    pub fn resolve_batch(
        &mut self,
        items: &[(ConditionId, Hash32)],
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let snapshot = self.clone();
        for (condition, root) in items {
            if let Err(e) = self.resolve(*condition, *root, now) {
                *self = snapshot;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Returns true if the condition has a recorded resolution.
    #[must_use]
    pub fn is_resolved(&self, condition: &ConditionId) -> bool {
        self.resolutions.contains_key(condition)
    }

    /// The recorded resolution, if any.
    #[must_use]
    pub fn resolution(&self, condition: &ConditionId) -> Option<Resolution> {
        self.resolutions.get(condition).copied()
    }

    /// Check a proof that `outcome` won `condition`.
    ///
    /// Returns false if the condition is unresolved or the proof does not
    /// verify; never an error.
    #[must_use]
    pub fn verify(&self, condition: &ConditionId, outcome: Outcome, proof: &[Hash32]) -> bool {
        let Some(resolution) = self.resolutions.get(condition) else {
            return false;
        };
        merkle::verify(proof, resolution.root, winning_leaf(condition, outcome))
    }
}
