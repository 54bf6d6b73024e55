//! The external settlement-currency interface.
//!
//! The vault never holds the real asset; it only assumes a transfer
//! capability with clean failure semantics. [`InMemoryAsset`] is the bundled
//! implementation backing the demo and tests, standing in for an external
//! token contract.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::domain::{Amount, UserId};
use crate::error::LedgerError;

/// Transfer capability for the external settlement currency.
pub trait SettlementAsset: Send + Sync {
    /// Pull `amount` from the user's external wallet into vault custody.
    fn transfer_in(&self, from: &UserId, amount: Amount) -> Result<(), LedgerError>;

    /// Push `amount` from vault custody to the user's external wallet.
    fn transfer_out(&self, to: &UserId, amount: Amount) -> Result<(), LedgerError>;
}

/// An in-memory settlement currency with per-user external wallets.
#[derive(Debug, Default)]
pub struct InMemoryAsset {
    wallets: Mutex<HashMap<UserId, Amount>>,
}

impl InMemoryAsset {
    /// Create an asset with no funded wallets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a user's external wallet.
    pub fn fund(&self, user: UserId, amount: Amount) {
        let mut wallets = self.wallets.lock();
        let balance = wallets.entry(user).or_insert(Amount::ZERO);
        *balance = balance
            .checked_add(amount)
            .expect("funding overflowed a test wallet");
    }

    /// A user's external wallet balance.
    #[must_use]
    pub fn wallet(&self, user: &UserId) -> Amount {
        self.wallets
            .lock()
            .get(user)
            .copied()
            .unwrap_or(Amount::ZERO)
    }
}

impl<T: SettlementAsset + ?Sized> SettlementAsset for std::sync::Arc<T> {
    fn transfer_in(&self, from: &UserId, amount: Amount) -> Result<(), LedgerError> {
        (**self).transfer_in(from, amount)
    }

    fn transfer_out(&self, to: &UserId, amount: Amount) -> Result<(), LedgerError> {
        (**self).transfer_out(to, amount)
    }
}

impl SettlementAsset for InMemoryAsset {
    fn transfer_in(&self, from: &UserId, amount: Amount) -> Result<(), LedgerError> {
        let mut wallets = self.wallets.lock();
        let balance = wallets.entry(from.clone()).or_insert(Amount::ZERO);
        let held = *balance;
        *balance = held
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::AssetTransfer {
                reason: format!("wallet of {from} holds {held}, transfer needs {amount}"),
            })?;
        Ok(())
    }

    fn transfer_out(&self, to: &UserId, amount: Amount) -> Result<(), LedgerError> {
        let mut wallets = self.wallets.lock();
        let balance = wallets.entry(to.clone()).or_insert(Amount::ZERO);
        *balance = balance.checked_add(amount).ok_or(LedgerError::BalanceOverflow)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_in_debits_wallet() {
        let asset = InMemoryAsset::new();
        let alice = UserId::new("alice");
        asset.fund(alice.clone(), Amount::new(100));

        asset.transfer_in(&alice, Amount::new(60)).unwrap();
        assert_eq!(asset.wallet(&alice), Amount::new(40));
    }

    #[test]
    fn transfer_in_fails_on_unfunded_wallet() {
        let asset = InMemoryAsset::new();
        let alice = UserId::new("alice");

        let err = asset.transfer_in(&alice, Amount::new(1));
        assert!(matches!(err, Err(LedgerError::AssetTransfer { .. })));
    }

    #[test]
    fn transfer_out_credits_wallet() {
        let asset = InMemoryAsset::new();
        let alice = UserId::new("alice");

        asset.transfer_out(&alice, Amount::new(25)).unwrap();
        assert_eq!(asset.wallet(&alice), Amount::new(25));
    }
}
