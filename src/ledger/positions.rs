//! The outcome-share ledger: balances per (holder, token id).
//!
//! A pure ledger. No business rules live here beyond arithmetic safety; mint
//! and burn are `pub(crate)` so only the settlement engine can reach them,
//! which is the in-process analogue of a single authorized caller.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{Amount, PositionTokenId, UserId};
use crate::error::LedgerError;

/// Multi-asset share ledger with per-token total supply.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    balances: HashMap<(UserId, PositionTokenId), Amount>,
    supply: HashMap<PositionTokenId, Amount>,
}

impl PositionLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A holder's balance of one token.
    #[must_use]
    pub fn balance_of(&self, holder: &UserId, token: &PositionTokenId) -> Amount {
        self.balances
            .get(&(holder.clone(), *token))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Total minted minus total burned for one token.
    #[must_use]
    pub fn total_supply(&self, token: &PositionTokenId) -> Amount {
        self.supply.get(token).copied().unwrap_or(Amount::ZERO)
    }

    /// Mint several tokens to one holder, all-or-nothing.
    pub(crate) fn mint_batch(
        &mut self,
        to: &UserId,
        tokens: &[PositionTokenId],
        amounts: &[Amount],
    ) -> Result<(), LedgerError> {
        if tokens.len() != amounts.len() {
            return Err(LedgerError::ArrayLengthMismatch {
                left: tokens.len(),
                right: amounts.len(),
            });
        }
        let snapshot = self.clone();
        for (token, amount) in tokens.iter().zip(amounts) {
            if let Err(e) = self.mint(to, token, *amount) {
                *self = snapshot;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Burn one token from a holder.
    pub(crate) fn burn(
        &mut self,
        from: &UserId,
        token: &PositionTokenId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                reason: "burn amount must be positive",
            });
        }
        let balance = self.balance_of(from, token);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientInventory {
                holder: from.clone(),
                token: *token,
                balance,
                requested: amount,
            })?;
        self.balances.insert((from.clone(), *token), remaining);
        let supply = self.total_supply(token);
        // Supply >= any single balance, so this subtraction cannot fail.
        self.supply
            .insert(*token, supply.checked_sub(amount).unwrap_or(Amount::ZERO));
        debug!(%from, %token, %amount, "position tokens burned");
        Ok(())
    }

    /// Burn several tokens from one holder, all-or-nothing.
    pub(crate) fn burn_batch(
        &mut self,
        from: &UserId,
        tokens: &[PositionTokenId],
        amounts: &[Amount],
    ) -> Result<(), LedgerError> {
        if tokens.len() != amounts.len() {
            return Err(LedgerError::ArrayLengthMismatch {
                left: tokens.len(),
                right: amounts.len(),
            });
        }
        let snapshot = self.clone();
        for (token, amount) in tokens.iter().zip(amounts) {
            if let Err(e) = self.burn(from, token, *amount) {
                *self = snapshot;
                return Err(e);
            }
        }
        Ok(())
    }

    pub(crate) fn mint(
        &mut self,
        to: &UserId,
        token: &PositionTokenId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                reason: "mint amount must be positive",
            });
        }
        let balance = self
            .balances
            .entry((to.clone(), *token))
            .or_insert(Amount::ZERO);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        let supply = self.supply.entry(*token).or_insert(Amount::ZERO);
        *supply = supply
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        debug!(%to, %token, %amount, "position tokens minted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConditionId, Outcome, QuestionId};

    fn token(outcome: u8) -> PositionTokenId {
        let condition =
            ConditionId::derive(&UserId::new("oracle"), &QuestionId::new("q-1"), 2, 1);
        PositionTokenId::derive(&condition, Outcome::new(outcome))
    }

    #[test]
    fn mint_and_burn_track_balance_and_supply() {
        let mut ledger = PositionLedger::new();
        let alice = UserId::new("alice");
        let yes = token(0);

        ledger.mint(&alice, &yes, Amount::new(1000)).unwrap();
        assert_eq!(ledger.balance_of(&alice, &yes), Amount::new(1000));
        assert_eq!(ledger.total_supply(&yes), Amount::new(1000));

        ledger.burn(&alice, &yes, Amount::new(400)).unwrap();
        assert_eq!(ledger.balance_of(&alice, &yes), Amount::new(600));
        assert_eq!(ledger.total_supply(&yes), Amount::new(600));
    }

    #[test]
    fn burn_exceeding_balance_fails_cleanly() {
        let mut ledger = PositionLedger::new();
        let alice = UserId::new("alice");
        let yes = token(0);
        ledger.mint(&alice, &yes, Amount::new(100)).unwrap();

        let err = ledger.burn(&alice, &yes, Amount::new(101));
        assert!(matches!(err, Err(LedgerError::InsufficientInventory { .. })));
        assert_eq!(ledger.balance_of(&alice, &yes), Amount::new(100));
        assert_eq!(ledger.total_supply(&yes), Amount::new(100));
    }

    #[test]
    fn mint_batch_is_atomic() {
        let mut ledger = PositionLedger::new();
        let alice = UserId::new("alice");

        let err = ledger.mint_batch(
            &alice,
            &[token(0), token(1)],
            &[Amount::new(10), Amount::ZERO],
        );
        assert!(matches!(err, Err(LedgerError::InvalidAmount { .. })));
        assert_eq!(ledger.balance_of(&alice, &token(0)), Amount::ZERO);
    }

    #[test]
    fn burn_batch_is_atomic() {
        let mut ledger = PositionLedger::new();
        let alice = UserId::new("alice");
        ledger.mint(&alice, &token(0), Amount::new(10)).unwrap();
        ledger.mint(&alice, &token(1), Amount::new(5)).unwrap();

        let err = ledger.burn_batch(
            &alice,
            &[token(0), token(1)],
            &[Amount::new(10), Amount::new(6)],
        );
        assert!(matches!(err, Err(LedgerError::InsufficientInventory { .. })));
        assert_eq!(ledger.balance_of(&alice, &token(0)), Amount::new(10));
        assert_eq!(ledger.balance_of(&alice, &token(1)), Amount::new(5));
    }

    #[test]
    fn batch_length_mismatch_rejected() {
        let mut ledger = PositionLedger::new();
        let err = ledger.mint_batch(&UserId::new("a"), &[token(0)], &[]);
        assert!(matches!(
            err,
            Err(LedgerError::ArrayLengthMismatch { left: 1, right: 0 })
        ));
    }

    #[test]
    fn balances_are_scoped_per_token_and_holder() {
        let mut ledger = PositionLedger::new();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        ledger.mint(&alice, &token(0), Amount::new(10)).unwrap();

        assert_eq!(ledger.balance_of(&alice, &token(1)), Amount::ZERO);
        assert_eq!(ledger.balance_of(&bob, &token(0)), Amount::ZERO);
    }
}
