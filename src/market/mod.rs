//! Market configuration, epoch derivation, and resolution records.

mod registry;
mod resolver;

pub use registry::{EpochMode, MarketInfo, MarketRegistry};
pub use resolver::{winning_leaf, MarketResolver, Resolution};
