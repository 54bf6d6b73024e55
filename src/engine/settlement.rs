//! Pure settlement math: mode decision, contribution split, price banding.
//!
//! Everything here is side-effect free; the controller owns the ledgers and
//! calls into these functions so the arithmetic stays independently testable.

use serde::{Deserialize, Serialize};

use crate::domain::{Amount, Bps, Outcome};
use crate::error::LedgerError;

/// How a matched fill settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementMode {
    /// Neither party holds inventory: mint a fresh complete set from both
    /// parties' proportional contributions.
    JitMint,
    /// The seller holds sufficient inventory: move existing tokens, no new
    /// collateral locked.
    TokenSwap,
}

/// The two collateral contributions backing a JIT-minted complete set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitSplit {
    /// Buyer's contribution: `fill * price / 10000`, floored.
    pub buyer: Amount,
    /// Seller's contribution: the exact remainder, `fill - buyer`.
    pub seller: Amount,
}

/// Decide how a fill settles: swap when the seller's inventory covers it,
/// JIT minting otherwise.
#[must_use]
pub fn decide_mode(seller_inventory: Amount, fill: Amount) -> SettlementMode {
    if seller_inventory >= fill {
        SettlementMode::TokenSwap
    } else {
        SettlementMode::JitMint
    }
}

/// Split a fill into buyer and seller contributions at the executed price.
///
/// The seller side is derived by subtraction so the two always sum to
/// exactly `fill`. Either side rounding to zero is rejected: a zero
/// contribution would let one party mint a complete set against the other's
/// collateral for free.
pub fn split_contributions(fill: Amount, price: Bps) -> Result<JitSplit, LedgerError> {
    let buyer = fill.mul_bps(price);
    let seller = fill
        .checked_sub(buyer)
        .expect("buyer contribution cannot exceed fill");
    if buyer.is_zero() || seller.is_zero() {
        return Err(LedgerError::InvalidAmount {
            reason: "fill too small for the price: one side's contribution rounds to zero",
        });
    }
    Ok(JitSplit { buyer, seller })
}

/// The executed price for a pair match: the resting (maker) order's price.
///
/// Using the maker price as the deterministic tie-break keeps the
/// contribution split reconciling exactly and matches taker-crosses-maker
/// book semantics.
#[must_use]
pub fn execution_price(maker_price: Bps) -> Bps {
    maker_price
}

/// Check an outcome index actually exists on the market.
///
/// Orders are signed off-ledger, so nothing upstream guarantees the index;
/// an out-of-range one must become a typed error before any derivation
/// treats it as a real outcome.
pub fn check_outcome(outcome: Outcome, outcome_count: u8) -> Result<(), LedgerError> {
    if outcome.index() >= outcome_count {
        return Err(LedgerError::OutcomeOutOfRange {
            outcome,
            outcome_count,
        });
    }
    Ok(())
}

/// Check the buy limit crosses the sell limit and the executed price lies
/// inside `[sell, buy]`.
pub fn check_price_band(exec: Bps, buy: Bps, sell: Bps) -> Result<(), LedgerError> {
    if buy < sell || exec < sell || exec > buy {
        return Err(LedgerError::PriceMismatch { buy, sell });
    }
    Ok(())
}
