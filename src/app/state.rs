//! Shared application state.
//!
//! The engine models a serially-consistent ledger: every mutating operation
//! must observe every earlier one completely applied. A single mutex around
//! the whole engine is that model, verbatim. There is deliberately no finer
//! locking; serial total order is the contract, not an implementation
//! shortcut.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};

use crate::config::Config;
use crate::crypto::Ed25519Verifier;
use crate::engine::SettlementEngine;
use crate::ledger::{InMemoryAsset, SettlementAsset};

/// Shared application state accessible by all entry points.
pub struct AppState {
    engine: Mutex<SettlementEngine>,
    collateral_decimals: u32,
    started_at: DateTime<Utc>,
}

impl AppState {
    /// Build an engine from config with the given settlement asset.
    #[must_use]
    pub fn new(config: &Config, asset: Box<dyn SettlementAsset>) -> Self {
        let engine = SettlementEngine::new(
            config.oracle(),
            config.admin(),
            config.treasury(),
            config.fee_schedule(),
            Box::new(Ed25519Verifier),
            asset,
        );
        Self {
            engine: Mutex::new(engine),
            collateral_decimals: config.engine.collateral_decimals,
            started_at: Utc::now(),
        }
    }

    /// Build from config with an in-memory settlement asset (demo, tests).
    #[must_use]
    pub fn in_memory(config: &Config) -> (Self, Arc<InMemoryAsset>) {
        let asset = Arc::new(InMemoryAsset::new());
        let state = Self::new(config, Box::new(asset.clone()));
        (state, asset)
    }

    /// Exclusive access to the engine. All mutations serialize here.
    pub fn engine(&self) -> MutexGuard<'_, SettlementEngine> {
        self.engine.lock()
    }

    /// Display precision for collateral amounts.
    #[must_use]
    pub fn collateral_decimals(&self) -> u32 {
        self.collateral_decimals
    }

    /// When this state was constructed.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, UserId};

    #[test]
    fn in_memory_state_wires_engine_and_asset() {
        let config = Config::default();
        let (state, asset) = AppState::in_memory(&config);
        let alice = UserId::new("alice");
        asset.fund(alice.clone(), Amount::new(1000));

        state.engine().deposit(&alice, Amount::new(600)).unwrap();
        assert_eq!(
            state.engine().available_balance(&alice),
            Amount::new(600)
        );
        assert_eq!(asset.wallet(&alice), Amount::new(400));
    }
}
