//! Fee schedule: global default rates with per-user overrides.
//!
//! Two independent fee types exist, collected at different lifecycle stages:
//! the trade fee is taken from collateral contributions at execution time,
//! the claim fee from the gross payout at resolution time. Every rate is
//! capped at 1,000 bps (10%).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

use super::{Bps, UserId};

/// The hard cap on every fee rate: 10%.
pub const MAX_FEE_BPS: Bps = Bps::new(1_000);

/// The two fee types the engine collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeKind {
    /// Deducted from a party's contribution or payment at order execution.
    Trade,
    /// Deducted from a winning payout at claim time.
    Claim,
}

/// Default fee rates plus per-user overrides, consulted at execution time.
#[derive(Debug, Clone)]
pub struct FeeSchedule {
    default_trade: Bps,
    default_claim: Bps,
    trade_overrides: HashMap<UserId, Bps>,
    claim_overrides: HashMap<UserId, Bps>,
}

impl FeeSchedule {
    /// Create a schedule with the given default rates.
    pub fn new(default_trade: Bps, default_claim: Bps) -> Result<Self, LedgerError> {
        check_cap(default_trade)?;
        check_cap(default_claim)?;
        Ok(Self {
            default_trade,
            default_claim,
            trade_overrides: HashMap::new(),
            claim_overrides: HashMap::new(),
        })
    }

    /// Set a global default rate.
    pub fn set_default(&mut self, kind: FeeKind, rate: Bps) -> Result<(), LedgerError> {
        check_cap(rate)?;
        match kind {
            FeeKind::Trade => self.default_trade = rate,
            FeeKind::Claim => self.default_claim = rate,
        }
        Ok(())
    }

    /// Set a per-user override for one fee type.
    pub fn set_override(
        &mut self,
        kind: FeeKind,
        user: UserId,
        rate: Bps,
    ) -> Result<(), LedgerError> {
        check_cap(rate)?;
        self.overrides_mut(kind).insert(user, rate);
        Ok(())
    }

    /// Remove a per-user override, falling back to the global default.
    pub fn clear_override(&mut self, kind: FeeKind, user: &UserId) {
        self.overrides_mut(kind).remove(user);
    }

    /// The rate that applies to a user: override if set, else default.
    #[must_use]
    pub fn effective(&self, kind: FeeKind, user: &UserId) -> Bps {
        let (overrides, default) = match kind {
            FeeKind::Trade => (&self.trade_overrides, self.default_trade),
            FeeKind::Claim => (&self.claim_overrides, self.default_claim),
        };
        overrides.get(user).copied().unwrap_or(default)
    }

    /// The global default for one fee type.
    #[must_use]
    pub fn default_rate(&self, kind: FeeKind) -> Bps {
        match kind {
            FeeKind::Trade => self.default_trade,
            FeeKind::Claim => self.default_claim,
        }
    }

    fn overrides_mut(&mut self, kind: FeeKind) -> &mut HashMap<UserId, Bps> {
        match kind {
            FeeKind::Trade => &mut self.trade_overrides,
            FeeKind::Claim => &mut self.claim_overrides,
        }
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            default_trade: Bps::ZERO,
            default_claim: Bps::ZERO,
            trade_overrides: HashMap::new(),
            claim_overrides: HashMap::new(),
        }
    }
}

fn check_cap(rate: Bps) -> Result<(), LedgerError> {
    if rate > MAX_FEE_BPS {
        return Err(LedgerError::FeeRateExceedsMaximum {
            requested: rate,
            max: MAX_FEE_BPS,
        });
    }
    Ok(())
}
