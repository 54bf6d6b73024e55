//! Error types for the crate.
//!
//! [`LedgerError`] is the settlement taxonomy: every kind a failed ledger or
//! settlement operation can abort with. A failed operation leaves all
//! balances, locks, and token ledgers exactly as they were before the
//! attempt; that guarantee is enforced by the engine's snapshot discipline,
//! not by these types, but every variant here implies it.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Amount, Bps, ConditionId, Outcome, PositionTokenId, QuestionId, Role, UserId};

/// Errors from ledger and settlement operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance for {user}: available {available}, requested {requested}")]
    InsufficientBalance {
        user: UserId,
        available: Amount,
        requested: Amount,
    },

    #[error("locked pool for condition {condition} holds {locked}, requested {requested}")]
    InsufficientLocked {
        condition: ConditionId,
        locked: Amount,
        requested: Amount,
    },

    #[error("invalid amount: {reason}")]
    InvalidAmount { reason: &'static str },

    #[error("balance arithmetic overflow")]
    BalanceOverflow,

    #[error("{user} lacks required role {required}")]
    Unauthorized { user: UserId, required: Role },

    #[error("order expired at {expires_at}, now {now}")]
    OrderExpired {
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("nonce {nonce} already bound to a different order for {user}")]
    NonceReused { user: UserId, nonce: u64 },

    #[error("order signature invalid")]
    InvalidSignature,

    #[error("orders cannot match: {reason}")]
    OrderMismatch { reason: &'static str },

    #[error("prices do not cross: buy {buy} < sell {sell}")]
    PriceMismatch { buy: Bps, sell: Bps },

    #[error("market {question} is closed")]
    MarketClosed { question: QuestionId },

    #[error("trading is paused")]
    TradingPaused,

    #[error("condition {condition} already resolved")]
    AlreadyResolved { condition: ConditionId },

    #[error("proof does not verify for condition {condition}")]
    InvalidProof { condition: ConditionId },

    #[error("{user} already claimed winnings for condition {condition}")]
    AlreadyClaimed { user: UserId, condition: ConditionId },

    #[error("fee rate {requested} exceeds maximum {max}")]
    FeeRateExceedsMaximum { requested: Bps, max: Bps },

    #[error("batch array length mismatch: {left} vs {right}")]
    ArrayLengthMismatch { left: usize, right: usize },

    #[error("{holder} holds {balance} of token {token}, swap requires {requested}")]
    InsufficientInventory {
        holder: UserId,
        token: PositionTokenId,
        balance: Amount,
        requested: Amount,
    },

    #[error("{outcome} is out of range for a market with {outcome_count} outcomes")]
    OutcomeOutOfRange { outcome: Outcome, outcome_count: u8 },

    #[error("unknown market {question}")]
    UnknownMarket { question: QuestionId },

    #[error("market {question} already exists")]
    MarketAlreadyExists { question: QuestionId },

    #[error("market {question} advances epochs by time, not manually")]
    ManualAdvanceUnavailable { question: QuestionId },

    #[error("condition {condition} is not resolved")]
    NotResolved { condition: ConditionId },

    #[error("{user} holds no winning shares for condition {condition}")]
    NothingToClaim { user: UserId, condition: ConditionId },

    #[error("settlement asset transfer failed: {reason}")]
    AssetTransfer { reason: String },
}

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
