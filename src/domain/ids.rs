//! Domain identifier types with proper encapsulation.
//!
//! String-shaped identities (`UserId`, `QuestionId`) are opaque names; the
//! hash-shaped ones (`ConditionId`, `PositionTokenId`) are deterministically
//! derived so every participant computes the same ids without coordination.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::{tagged_hash, Hash32};

const CONDITION_TAG: &str = "matchbook/condition/v1";
const POSITION_TOKEN_TAG: &str = "matchbook/position-token/v1";

/// User identity - newtype for type safety.
///
/// The inner String is private to ensure all construction goes through
/// the defined constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a new `UserId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the user ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Question identifier - newtype for type safety.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionId(String);

impl QuestionId {
    /// Create a new `QuestionId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the question ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for QuestionId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for QuestionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Outcome index within a question (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outcome(u8);

impl Outcome {
    /// Create an outcome index.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Get the 0-based index.
    #[must_use]
    pub const fn index(&self) -> u8 {
        self.0
    }

    /// The complementary outcome of a binary market.
    #[must_use]
    pub const fn binary_complement(&self) -> Self {
        Self(1 - self.0)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "outcome-{}", self.0)
    }
}

/// The unit of collateral locking and resolution: one (oracle, question,
/// outcome-count, epoch) tuple, condensed to a hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConditionId(Hash32);

impl ConditionId {
    /// Derive the condition id for a question epoch.
    #[must_use]
    pub fn derive(oracle: &UserId, question: &QuestionId, outcome_count: u8, epoch: u64) -> Self {
        Self(tagged_hash(
            CONDITION_TAG,
            &[
                oracle.as_str().as_bytes(),
                question.as_str().as_bytes(),
                &[outcome_count],
                &epoch.to_le_bytes(),
            ],
        ))
    }

    /// The underlying hash.
    #[must_use]
    pub const fn hash(&self) -> Hash32 {
        self.0
    }
}

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one outcome-share asset: hash of (condition, outcome).
///
/// Distinct (condition, outcome) pairs colliding is treated as a
/// cryptographic impossibility, not something the ledger checks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionTokenId(Hash32);

impl PositionTokenId {
    /// Derive the token id for an outcome of a condition.
    #[must_use]
    pub fn derive(condition: &ConditionId, outcome: Outcome) -> Self {
        Self(tagged_hash(
            POSITION_TOKEN_TAG,
            &[condition.hash().as_bytes(), &[outcome.index()]],
        ))
    }

    /// The underlying hash.
    #[must_use]
    pub const fn hash(&self) -> Hash32 {
        self.0
    }
}

impl fmt::Display for PositionTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an executed trade, for audit records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeId(String);

impl TradeId {
    /// Create a new `TradeId` with a generated UUID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the trade ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
