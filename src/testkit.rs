//! Fixtures for integration tests (feature `testkit`).
//!
//! [`Harness`] wires a [`SettlementEngine`] to an [`InMemoryAsset`] with the
//! standard cast of control identities, and [`TestUser`] wraps an ed25519
//! keypair with order-building shorthand.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::crypto::{Ed25519Signer, Ed25519Verifier};
use crate::domain::{
    Amount, Bps, FeeSchedule, Order, OrderSide, Outcome, QuestionId, Role, SignedOrder, UserId,
};
use crate::engine::SettlementEngine;
use crate::ledger::InMemoryAsset;
use crate::market::{winning_leaf, EpochMode};

/// A keypair-backed market participant.
pub struct TestUser {
    signer: Ed25519Signer,
}

impl TestUser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            signer: Ed25519Signer::generate(),
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.signer.user_id()
    }

    /// Sign an order expiring one hour after `now`.
    #[must_use]
    pub fn order(
        &self,
        question: &QuestionId,
        side: OrderSide,
        outcome: u8,
        amount: u64,
        price: u16,
        nonce: u64,
        now: DateTime<Utc>,
    ) -> SignedOrder {
        self.signer.sign(Order {
            maker: self.id(),
            question_id: question.clone(),
            outcome: Outcome::new(outcome),
            amount: Amount::new(amount),
            price: Bps::new(price),
            nonce,
            expires_at: now + Duration::hours(1),
            side,
        })
    }

    #[must_use]
    pub fn buy(
        &self,
        question: &QuestionId,
        outcome: u8,
        amount: u64,
        price: u16,
        nonce: u64,
        now: DateTime<Utc>,
    ) -> SignedOrder {
        self.order(question, OrderSide::Buy, outcome, amount, price, nonce, now)
    }

    #[must_use]
    pub fn sell(
        &self,
        question: &QuestionId,
        outcome: u8,
        amount: u64,
        price: u16,
        nonce: u64,
        now: DateTime<Utc>,
    ) -> SignedOrder {
        self.order(question, OrderSide::Sell, outcome, amount, price, nonce, now)
    }
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new()
    }
}

/// An engine with funded wallets and the standard control identities.
pub struct Harness {
    pub engine: SettlementEngine,
    pub asset: Arc<InMemoryAsset>,
    pub admin: UserId,
    pub oracle: UserId,
    pub treasury: UserId,
    pub matcher: UserId,
}

impl Harness {
    /// Build a harness with the given default fee rates.
    #[must_use]
    pub fn new(trade_bps: u16, claim_bps: u16) -> Self {
        let admin = UserId::new("admin");
        let oracle = UserId::new("oracle");
        let treasury = UserId::new("treasury");
        let matcher = UserId::new("matcher");

        let fees = FeeSchedule::new(Bps::new(trade_bps), Bps::new(claim_bps))
            .expect("harness fee rates exceed the cap");
        let asset = Arc::new(InMemoryAsset::new());
        let mut engine = SettlementEngine::new(
            oracle.clone(),
            admin.clone(),
            treasury.clone(),
            fees,
            Box::new(Ed25519Verifier),
            Box::new(asset.clone()),
        );
        engine
            .grant_role(&admin, matcher.clone(), Role::Matcher)
            .expect("admin holds the admin role");

        Self {
            engine,
            asset,
            admin,
            oracle,
            treasury,
            matcher,
        }
    }

    /// Fund a user's external wallet and deposit the whole balance.
    pub fn fund(&mut self, user: &UserId, units: u64) {
        self.asset.fund(user.clone(), Amount::new(units));
        self.engine
            .deposit(user, Amount::new(units))
            .expect("deposit of freshly funded wallet");
    }

    /// Create a manual-epoch binary market.
    pub fn binary_market(&mut self, name: &str, now: DateTime<Utc>) -> QuestionId {
        let question = QuestionId::new(name);
        self.engine
            .create_market(&self.admin, question.clone(), 2, None, EpochMode::Manual, now)
            .expect("market creation with valid parameters");
        question
    }

    /// Resolve a question epoch with a single-leaf root naming `outcome`
    /// the winner. The matching claim proof is empty.
    pub fn resolve(&mut self, question: &QuestionId, epoch: u64, outcome: u8, now: DateTime<Utc>) {
        let condition = self
            .engine
            .condition_id(question, epoch)
            .expect("resolving a known market");
        let root = winning_leaf(&condition, Outcome::new(outcome));
        self.engine
            .resolve_market_epoch(&self.oracle, question, epoch, root, now)
            .expect("oracle resolution of an unresolved epoch");
    }
}
