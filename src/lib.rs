//! matchbook - a collateral-backed settlement engine for prediction markets.
//!
//! Users deposit an external settlement currency into a vault, makers sign
//! orders over outcome shares, and a matcher submits crossing pairs for
//! settlement. A fill either mints fresh outcome-share pairs against locked
//! collateral (JIT minting) or swaps existing inventory for collateral
//! (token swap), whichever the seller's holdings allow. Once the oracle
//! commits a merkle root over the winning outcomes, holders of winning
//! shares claim the locked collateral, minus a claim fee.
//!
//! # Architecture
//!
//! - [`domain`] - identities, money, orders, fees, roles
//! - [`crypto`] - hashing, merkle proofs, order signatures
//! - [`ledger`] - the collateral vault and the outcome-share ledger
//! - [`market`] - market configuration, epochs, resolution records
//! - [`engine`] - fill math and the orchestrating settlement engine
//! - [`app`] - shared state wiring for the binary
//! - [`config`] - TOML configuration and logging setup

pub mod app;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod market;

#[cfg(feature = "testkit")]
pub mod testkit;

pub use error::{Error, LedgerError, Result};
