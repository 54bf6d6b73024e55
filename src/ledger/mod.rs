//! Ledger components: the collateral vault and the outcome-share ledger.

mod asset;
mod positions;
mod vault;

pub use asset::{InMemoryAsset, SettlementAsset};
pub use positions::PositionLedger;
pub use vault::Vault;
