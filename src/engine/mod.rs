//! The settlement core: pure fill math plus the orchestrating engine.

mod controller;
mod settlement;

pub use controller::{ClaimRequest, SettlementEngine, Trade};
pub use settlement::{
    check_price_band, decide_mode, execution_price, split_contributions, JitSplit, SettlementMode,
};
