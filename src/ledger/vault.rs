//! The collateral vault: authoritative ledger of available and locked funds.
//!
//! Available balances are per user; locked collateral is an aggregate total
//! per condition. There is deliberately no per-user lock accounting: unlock
//! may credit any user, which is what lets claim payouts redistribute the
//! pool, and the engine compensates by checking pool sufficiency before
//! every claim.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{Amount, ConditionId, UserId};
use crate::error::LedgerError;

use super::asset::SettlementAsset;

/// Per-user available balances and per-condition locked totals.
#[derive(Debug, Clone, Default)]
pub struct Vault {
    available: HashMap<UserId, Amount>,
    locked: HashMap<ConditionId, Amount>,
}

impl Vault {
    /// Create an empty vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A user's available (unlocked) balance.
    #[must_use]
    pub fn available(&self, user: &UserId) -> Amount {
        self.available.get(user).copied().unwrap_or(Amount::ZERO)
    }

    /// Total locked collateral for a condition, across all holders.
    #[must_use]
    pub fn total_locked(&self, condition: &ConditionId) -> Amount {
        self.locked
            .get(condition)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Move external funds into vault custody and credit the depositor.
    pub(crate) fn deposit(
        &mut self,
        user: &UserId,
        amount: Amount,
        asset: &dyn SettlementAsset,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                reason: "deposit amount must be positive",
            });
        }
        // Credit only after the external transfer succeeded.
        asset.transfer_in(user, amount)?;
        self.credit(user, amount)?;
        debug!(%user, %amount, "collateral deposited");
        Ok(())
    }

    /// Debit the caller and move funds back out of vault custody.
    pub(crate) fn withdraw(
        &mut self,
        user: &UserId,
        amount: Amount,
        asset: &dyn SettlementAsset,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                reason: "withdrawal amount must be positive",
            });
        }
        self.debit(user, amount)?;
        if let Err(e) = asset.transfer_out(user, amount) {
            // External leg failed; restore the ledger before surfacing it.
            self.credit(user, amount)?;
            return Err(e);
        }
        debug!(%user, %amount, "collateral withdrawn");
        Ok(())
    }

    /// Move funds from a user's available balance into a condition's pool.
    pub(crate) fn lock(
        &mut self,
        condition: &ConditionId,
        user: &UserId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                reason: "lock amount must be positive",
            });
        }
        self.debit(user, amount)?;
        let pool = self.locked.entry(*condition).or_insert(Amount::ZERO);
        *pool = pool.checked_add(amount).ok_or(LedgerError::BalanceOverflow)?;
        debug!(%user, %condition, %amount, "collateral locked");
        Ok(())
    }

    /// Move funds from a condition's pool to a user's available balance.
    ///
    /// The credited user need not be one who locked funds for the condition;
    /// the only constraint is the aggregate pool.
    pub(crate) fn unlock(
        &mut self,
        condition: &ConditionId,
        user: &UserId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                reason: "unlock amount must be positive",
            });
        }
        let locked = self.total_locked(condition);
        let remaining = locked
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientLocked {
                condition: *condition,
                locked,
                requested: amount,
            })?;
        self.locked.insert(*condition, remaining);
        self.credit(user, amount)?;
        debug!(%user, %condition, %amount, "collateral unlocked");
        Ok(())
    }

    /// Move available funds between two users.
    pub(crate) fn transfer_between(
        &mut self,
        condition: &ConditionId,
        from: &UserId,
        to: &UserId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            // Zero transfers happen legitimately (a rate of 0bps); no-op.
            return Ok(());
        }
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        debug!(%from, %to, %condition, %amount, "collateral transferred");
        Ok(())
    }

    /// Lock for many users against one condition, all-or-nothing.
    pub(crate) fn lock_batch(
        &mut self,
        condition: &ConditionId,
        users: &[UserId],
        amounts: &[Amount],
    ) -> Result<(), LedgerError> {
        if users.len() != amounts.len() {
            return Err(LedgerError::ArrayLengthMismatch {
                left: users.len(),
                right: amounts.len(),
            });
        }
        let snapshot = self.clone();
        for (user, amount) in users.iter().zip(amounts) {
            if let Err(e) = self.lock(condition, user, *amount) {
                *self = snapshot;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Unlock to many users from one condition's pool, all-or-nothing.
    pub(crate) fn unlock_batch(
        &mut self,
        condition: &ConditionId,
        users: &[UserId],
        amounts: &[Amount],
    ) -> Result<(), LedgerError> {
        if users.len() != amounts.len() {
            return Err(LedgerError::ArrayLengthMismatch {
                left: users.len(),
                right: amounts.len(),
            });
        }
        let snapshot = self.clone();
        for (user, amount) in users.iter().zip(amounts) {
            if let Err(e) = self.unlock(condition, user, *amount) {
                *self = snapshot;
                return Err(e);
            }
        }
        Ok(())
    }

    fn credit(&mut self, user: &UserId, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.available.entry(user.clone()).or_insert(Amount::ZERO);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        Ok(())
    }

    fn debit(&mut self, user: &UserId, amount: Amount) -> Result<(), LedgerError> {
        let available = self.available(user);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                user: user.clone(),
                available,
                requested: amount,
            })?;
        self.available.insert(user.clone(), remaining);
        Ok(())
    }
}
