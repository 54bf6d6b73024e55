//! The settlement engine: order matching, fee collection, and claims.
//!
//! `SettlementEngine` owns every ledger (vault, position ledger, market
//! registry, resolver) and is the only component that mutates them. Each
//! entry point validates fully before touching state, and every compound
//! mutation runs under a snapshot that is committed whole or discarded, so a
//! failed operation leaves all balances, locks, and token ledgers exactly as
//! they were.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::crypto::{Hash32, OrderVerifier};
use crate::domain::{
    Amount, Bps, ConditionId, FeeKind, FeeSchedule, Order, Outcome, PositionTokenId, QuestionId,
    Role, RoleTable, SignedOrder, TradeId, UserId,
};
use crate::error::LedgerError;
use crate::ledger::{PositionLedger, SettlementAsset, Vault};
use crate::market::{EpochMode, MarketRegistry, MarketResolver};

use super::settlement::{
    check_outcome, check_price_band, decide_mode, execution_price, split_contributions,
    SettlementMode,
};

/// Audit record of one executed settlement.
#[derive(Debug, Clone, Serialize)]
pub struct Trade {
    pub id: TradeId,
    pub question_id: QuestionId,
    pub epoch: u64,
    pub condition: ConditionId,
    pub outcome: Outcome,
    pub mode: SettlementMode,
    pub fill: Amount,
    pub price: Bps,
    pub buyer: UserId,
    pub seller: UserId,
    pub buyer_fee: Amount,
    pub seller_fee: Amount,
    pub executed_at: DateTime<Utc>,
}

/// One entry of a batch claim.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub question_id: QuestionId,
    pub epoch: u64,
    pub outcome: Outcome,
    pub proof: Vec<Hash32>,
}

/// Snapshot of every ledger a compound operation can touch.
struct EngineSnapshot {
    vault: Vault,
    positions: PositionLedger,
    resolver: MarketResolver,
    nonces: HashMap<(UserId, u64), Hash32>,
    fills: HashMap<Hash32, Amount>,
    claimed: HashSet<(UserId, ConditionId)>,
}

/// The orchestrating settlement service.
pub struct SettlementEngine {
    oracle: UserId,
    treasury: UserId,
    vault: Vault,
    positions: PositionLedger,
    registry: MarketRegistry,
    resolver: MarketResolver,
    fees: FeeSchedule,
    roles: RoleTable,
    verifier: Box<dyn OrderVerifier>,
    asset: Box<dyn SettlementAsset>,
    /// First use binds a (user, nonce) pair to one order digest for good.
    nonces: HashMap<(UserId, u64), Hash32>,
    /// Cumulative filled amount per order digest.
    fills: HashMap<Hash32, Amount>,
    claimed: HashSet<(UserId, ConditionId)>,
    trading_paused: bool,
}

impl SettlementEngine {
    /// Create an engine. `admin` holds the administrative surface, `oracle`
    /// both resolves and is part of every condition derivation.
    pub fn new(
        oracle: UserId,
        admin: UserId,
        treasury: UserId,
        fees: FeeSchedule,
        verifier: Box<dyn OrderVerifier>,
        asset: Box<dyn SettlementAsset>,
    ) -> Self {
        let mut roles = RoleTable::new();
        roles.grant(admin, Role::Admin);
        roles.grant(oracle.clone(), Role::Oracle);
        Self {
            oracle,
            treasury,
            vault: Vault::new(),
            positions: PositionLedger::new(),
            registry: MarketRegistry::new(),
            resolver: MarketResolver::new(),
            fees,
            roles,
            verifier,
            asset,
            nonces: HashMap::new(),
            fills: HashMap::new(),
            claimed: HashSet::new(),
            trading_paused: false,
        }
    }

    // ------------------------------------------------------------------
    // Collateral

    /// Deposit external funds into the caller's available balance.
    pub fn deposit(&mut self, caller: &UserId, amount: Amount) -> Result<(), LedgerError> {
        self.vault.deposit(caller, amount, self.asset.as_ref())
    }

    /// Withdraw from the caller's available balance to their external wallet.
    pub fn withdraw(&mut self, caller: &UserId, amount: Amount) -> Result<(), LedgerError> {
        self.vault.withdraw(caller, amount, self.asset.as_ref())
    }

    // ------------------------------------------------------------------
    // Administration

    /// Grant a role. Admin only.
    pub fn grant_role(
        &mut self,
        caller: &UserId,
        user: UserId,
        role: Role,
    ) -> Result<(), LedgerError> {
        self.roles.require(caller, Role::Admin)?;
        self.roles.grant(user, role);
        Ok(())
    }

    /// Revoke a role. Admin only.
    pub fn revoke_role(
        &mut self,
        caller: &UserId,
        user: &UserId,
        role: Role,
    ) -> Result<(), LedgerError> {
        self.roles.require(caller, Role::Admin)?;
        self.roles.revoke(user, role);
        Ok(())
    }

    /// Replace the treasury identity. Admin only.
    pub fn set_treasury(&mut self, caller: &UserId, treasury: UserId) -> Result<(), LedgerError> {
        self.roles.require(caller, Role::Admin)?;
        self.treasury = treasury;
        Ok(())
    }

    /// Set the global trading pause. Admin only. Overrides per-market flags.
    pub fn set_global_pause(&mut self, caller: &UserId, paused: bool) -> Result<(), LedgerError> {
        self.roles.require(caller, Role::Admin)?;
        info!(paused, "global trading pause set");
        self.trading_paused = paused;
        Ok(())
    }

    /// Set one market's pause flag. Admin only.
    pub fn set_market_pause(
        &mut self,
        caller: &UserId,
        question: &QuestionId,
        paused: bool,
    ) -> Result<(), LedgerError> {
        self.roles.require(caller, Role::Admin)?;
        self.registry.set_paused(question, paused)
    }

    /// Set a global default fee rate. Admin only, capped at 10%.
    pub fn set_default_fee(
        &mut self,
        caller: &UserId,
        kind: FeeKind,
        rate: Bps,
    ) -> Result<(), LedgerError> {
        self.roles.require(caller, Role::Admin)?;
        self.fees.set_default(kind, rate)
    }

    /// Set a per-user fee override. Admin only, capped at 10%.
    pub fn set_user_fee(
        &mut self,
        caller: &UserId,
        kind: FeeKind,
        user: UserId,
        rate: Bps,
    ) -> Result<(), LedgerError> {
        self.roles.require(caller, Role::Admin)?;
        self.fees.set_override(kind, user, rate)
    }

    /// Clear a per-user fee override. Admin only.
    pub fn clear_user_fee(
        &mut self,
        caller: &UserId,
        kind: FeeKind,
        user: &UserId,
    ) -> Result<(), LedgerError> {
        self.roles.require(caller, Role::Admin)?;
        self.fees.clear_override(kind, user);
        Ok(())
    }

    /// Create a market. Admin only.
    pub fn create_market(
        &mut self,
        caller: &UserId,
        question: QuestionId,
        outcome_count: u8,
        resolution_time: Option<DateTime<Utc>>,
        epoch_mode: EpochMode,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.roles.require(caller, Role::Admin)?;
        self.registry
            .create(question, outcome_count, resolution_time, epoch_mode, now)
    }

    /// Advance a manual-mode market's epoch. Admin only.
    pub fn advance_epoch(
        &mut self,
        caller: &UserId,
        question: &QuestionId,
    ) -> Result<u64, LedgerError> {
        self.roles.require(caller, Role::Admin)?;
        self.registry.advance_epoch(question)
    }

    // ------------------------------------------------------------------
    // Resolution

    /// Record the merkle root resolving one question epoch.
    ///
    /// Restricted to the oracle or an emergency resolver.
    pub fn resolve_market_epoch(
        &mut self,
        caller: &UserId,
        question: &QuestionId,
        epoch: u64,
        root: Hash32,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.roles
            .require_any(caller, &[Role::Oracle, Role::EmergencyResolver])?;
        let condition = self.condition_id(question, epoch)?;
        self.resolver.resolve(condition, root, now)
    }

    /// Resolve several question epochs, all-or-nothing.
    pub fn resolve_batch(
        &mut self,
        caller: &UserId,
        items: &[(QuestionId, u64, Hash32)],
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.roles
            .require_any(caller, &[Role::Oracle, Role::EmergencyResolver])?;
        // Derivations can fail on unknown markets; do them all before any
        // mutation so the batch stays atomic.
        let mut derived = Vec::with_capacity(items.len());
        for (question, epoch, root) in items {
            derived.push((self.condition_id(question, *epoch)?, *root));
        }
        self.resolver.resolve_batch(&derived, now)
    }

    // ------------------------------------------------------------------
    // Settlement

    /// Match two signed counter-orders and settle the fill.
    ///
    /// The first order is the resting (maker) order; its price is the
    /// executed price.
    pub fn execute_order_match(
        &mut self,
        caller: &UserId,
        maker: &SignedOrder,
        taker: &SignedOrder,
        fill: Amount,
        now: DateTime<Utc>,
    ) -> Result<Trade, LedgerError> {
        self.roles.require(caller, Role::Matcher)?;
        self.check_signer(maker)?;
        self.check_signer(taker)?;

        let m = &maker.order;
        let t = &taker.order;
        if m.question_id != t.question_id || m.outcome != t.outcome {
            return Err(LedgerError::OrderMismatch {
                reason: "orders reference different questions or outcomes",
            });
        }
        if m.side == t.side {
            return Err(LedgerError::OrderMismatch {
                reason: "orders are on the same side of the book",
            });
        }
        m.validate(now)?;
        t.validate(now)?;

        let (buy, sell) = if m.is_buy() { (m, t) } else { (t, m) };
        let exec = execution_price(m.price);
        check_price_band(exec, buy.price, sell.price)?;

        self.check_market_open(&m.question_id, now)?;
        self.check_fill(m, fill)?;
        self.check_fill(t, fill)?;
        self.check_nonce(m)?;
        self.check_nonce(t)?;

        let (outcome_count, epoch) = self.market_epoch(&m.question_id, now)?;
        let buyer = buy.maker.clone();
        let seller = sell.maker.clone();
        let question = m.question_id.clone();
        let outcome = m.outcome;
        let digests = [m.digest(), t.digest()];
        let bindings = [(m.maker.clone(), m.nonce), (t.maker.clone(), t.nonce)];

        self.transactional(move |this| {
            let trade = this.settle_fill(
                question,
                epoch,
                outcome_count,
                outcome,
                buyer,
                seller,
                fill,
                exec,
                now,
            )?;
            for (digest, binding) in digests.iter().zip(bindings.iter().cloned()) {
                this.record_fill(*digest, binding, fill)?;
            }
            Ok(trade)
        })
    }

    /// Settle one signed order against a designated counterparty.
    ///
    /// With `assume_swap`, a counterparty lacking the inventory for a token
    /// swap is an `InsufficientInventory` error rather than a silent fall
    /// back to JIT minting against their collateral.
    pub fn execute_single_order(
        &mut self,
        caller: &UserId,
        signed: &SignedOrder,
        counterparty: &UserId,
        fill: Amount,
        assume_swap: bool,
        now: DateTime<Utc>,
    ) -> Result<Trade, LedgerError> {
        self.roles.require(caller, Role::Matcher)?;
        self.check_signer(signed)?;

        let order = &signed.order;
        order.validate(now)?;
        self.check_market_open(&order.question_id, now)?;
        self.check_fill(order, fill)?;
        self.check_nonce(order)?;

        let (outcome_count, epoch) = self.market_epoch(&order.question_id, now)?;
        check_outcome(order.outcome, outcome_count)?;
        let (buyer, seller) = if order.is_buy() {
            (order.maker.clone(), counterparty.clone())
        } else {
            (counterparty.clone(), order.maker.clone())
        };

        if assume_swap {
            let condition = ConditionId::derive(
                &self.oracle,
                &order.question_id,
                outcome_count,
                epoch,
            );
            let token = PositionTokenId::derive(&condition, order.outcome);
            let inventory = self.positions.balance_of(&seller, &token);
            if inventory < fill {
                return Err(LedgerError::InsufficientInventory {
                    holder: seller,
                    token,
                    balance: inventory,
                    requested: fill,
                });
            }
        }

        let question = order.question_id.clone();
        let outcome = order.outcome;
        let exec = order.price;
        let digest = order.digest();
        let binding = (order.maker.clone(), order.nonce);

        self.transactional(move |this| {
            let trade = this.settle_fill(
                question,
                epoch,
                outcome_count,
                outcome,
                buyer,
                seller,
                fill,
                exec,
                now,
            )?;
            this.record_fill(digest, binding, fill)?;
            Ok(trade)
        })
    }

    // ------------------------------------------------------------------
    // Claims

    /// Claim winnings for one resolved condition.
    ///
    /// Claims bypass both pause gates. Returns the net payout after the
    /// claim fee.
    pub fn claim_winnings(
        &mut self,
        caller: &UserId,
        question: &QuestionId,
        epoch: u64,
        outcome: Outcome,
        proof: &[Hash32],
        now: DateTime<Utc>,
    ) -> Result<Amount, LedgerError> {
        let request = ClaimRequest {
            question_id: question.clone(),
            epoch,
            outcome,
            proof: proof.to_vec(),
        };
        self.transactional(|this| this.claim_one(caller, &request, now))
    }

    /// Claim several resolved conditions, all-or-nothing.
    ///
    /// Returns the total net payout across all entries.
    pub fn batch_claim_winnings(
        &mut self,
        caller: &UserId,
        claims: &[ClaimRequest],
        now: DateTime<Utc>,
    ) -> Result<Amount, LedgerError> {
        self.transactional(|this| {
            let mut total = Amount::ZERO;
            for request in claims {
                let net = this.claim_one(caller, request, now)?;
                total = total.checked_add(net).ok_or(LedgerError::BalanceOverflow)?;
            }
            Ok(total)
        })
    }

    // ------------------------------------------------------------------
    // Queries (read-only, side-effect free)

    /// A user's available collateral.
    #[must_use]
    pub fn available_balance(&self, user: &UserId) -> Amount {
        self.vault.available(user)
    }

    /// Total locked collateral for a condition.
    #[must_use]
    pub fn total_locked(&self, condition: &ConditionId) -> Amount {
        self.vault.total_locked(condition)
    }

    /// A holder's balance of one position token.
    #[must_use]
    pub fn position_balance(&self, holder: &UserId, token: &PositionTokenId) -> Amount {
        self.positions.balance_of(holder, token)
    }

    /// Total outstanding supply of one position token.
    #[must_use]
    pub fn token_supply(&self, token: &PositionTokenId) -> Amount {
        self.positions.total_supply(token)
    }

    /// The epoch of a market at `now`.
    pub fn current_epoch(
        &self,
        question: &QuestionId,
        now: DateTime<Utc>,
    ) -> Result<u64, LedgerError> {
        self.registry.current_epoch(question, now)
    }

    /// Derive the condition id for a question epoch.
    pub fn condition_id(
        &self,
        question: &QuestionId,
        epoch: u64,
    ) -> Result<ConditionId, LedgerError> {
        let outcome_count = self.registry.get(question)?.outcome_count();
        Ok(ConditionId::derive(
            &self.oracle,
            question,
            outcome_count,
            epoch,
        ))
    }

    /// Derive the token id for an outcome of a question epoch.
    pub fn token_id(
        &self,
        question: &QuestionId,
        epoch: u64,
        outcome: Outcome,
    ) -> Result<PositionTokenId, LedgerError> {
        Ok(PositionTokenId::derive(
            &self.condition_id(question, epoch)?,
            outcome,
        ))
    }

    /// Whether a condition has a recorded resolution.
    #[must_use]
    pub fn is_resolved(&self, condition: &ConditionId) -> bool {
        self.resolver.is_resolved(condition)
    }

    /// Unfilled remainder of an order.
    #[must_use]
    pub fn remaining(&self, order: &Order) -> Amount {
        let filled = self
            .fills
            .get(&order.digest())
            .copied()
            .unwrap_or(Amount::ZERO);
        order.amount.checked_sub(filled).unwrap_or(Amount::ZERO)
    }

    /// The effective fee rate for a user.
    #[must_use]
    pub fn effective_fee(&self, kind: FeeKind, user: &UserId) -> Bps {
        self.fees.effective(kind, user)
    }

    /// The treasury identity fees accrue to.
    #[must_use]
    pub fn treasury(&self) -> &UserId {
        &self.treasury
    }

    /// The oracle identity used in condition derivation.
    #[must_use]
    pub fn oracle(&self) -> &UserId {
        &self.oracle
    }

    // ------------------------------------------------------------------
    // Internals

    /// Apply the ledger effects of one fill. Runs inside a transaction.
    #[allow(clippy::too_many_arguments)]
    fn settle_fill(
        &mut self,
        question: QuestionId,
        epoch: u64,
        outcome_count: u8,
        outcome: Outcome,
        buyer: UserId,
        seller: UserId,
        fill: Amount,
        exec: Bps,
        now: DateTime<Utc>,
    ) -> Result<Trade, LedgerError> {
        if fill.is_zero() {
            return Err(LedgerError::InvalidAmount {
                reason: "fill amount must be positive",
            });
        }
        check_outcome(outcome, outcome_count)?;
        let condition = ConditionId::derive(&self.oracle, &question, outcome_count, epoch);
        let token = PositionTokenId::derive(&condition, outcome);
        let mode = decide_mode(self.positions.balance_of(&seller, &token), fill);
        let treasury = self.treasury.clone();

        let (buyer_fee, seller_fee) = match mode {
            SettlementMode::JitMint => {
                if outcome_count != 2 {
                    return Err(LedgerError::InvalidAmount {
                        reason: "JIT minting requires a binary market",
                    });
                }
                let split = split_contributions(fill, exec)?;
                let buyer_fee = split.buyer.mul_bps(self.fees.effective(FeeKind::Trade, &buyer));
                let seller_fee = split
                    .seller
                    .mul_bps(self.fees.effective(FeeKind::Trade, &seller));

                self.vault.lock(&condition, &buyer, split.buyer)?;
                self.vault.lock(&condition, &seller, split.seller)?;
                self.vault
                    .transfer_between(&condition, &buyer, &treasury, buyer_fee)?;
                self.vault
                    .transfer_between(&condition, &seller, &treasury, seller_fee)?;

                let complement = PositionTokenId::derive(&condition, outcome.binary_complement());
                self.positions.mint(&buyer, &token, fill)?;
                self.positions.mint(&seller, &complement, fill)?;
                (buyer_fee, seller_fee)
            }
            SettlementMode::TokenSwap => {
                // The buyer pays for existing inventory; fee liability
                // follows the collateral payer. Locked pool is untouched.
                let payment = fill.mul_bps(exec);
                let buyer_fee = payment.mul_bps(self.fees.effective(FeeKind::Trade, &buyer));

                self.positions.burn(&seller, &token, fill)?;
                self.positions.mint(&buyer, &token, fill)?;
                self.vault
                    .transfer_between(&condition, &buyer, &seller, payment)?;
                self.vault
                    .transfer_between(&condition, &buyer, &treasury, buyer_fee)?;
                (buyer_fee, Amount::ZERO)
            }
        };

        let trade = Trade {
            id: TradeId::new(),
            question_id: question,
            epoch,
            condition,
            outcome,
            mode,
            fill,
            price: exec,
            buyer,
            seller,
            buyer_fee,
            seller_fee,
            executed_at: now,
        };
        info!(
            trade = %trade.id,
            question = %trade.question_id,
            epoch,
            ?mode,
            %fill,
            price = %exec,
            buyer = %trade.buyer,
            seller = %trade.seller,
            "fill settled"
        );
        Ok(trade)
    }

    fn claim_one(
        &mut self,
        caller: &UserId,
        request: &ClaimRequest,
        now: DateTime<Utc>,
    ) -> Result<Amount, LedgerError> {
        let condition = self.condition_id(&request.question_id, request.epoch)?;
        let outcome_count = self.registry.get(&request.question_id)?.outcome_count();
        check_outcome(request.outcome, outcome_count)?;
        if !self.resolver.is_resolved(&condition) {
            return Err(LedgerError::NotResolved { condition });
        }
        if !self.resolver.verify(&condition, request.outcome, &request.proof) {
            return Err(LedgerError::InvalidProof { condition });
        }
        if self.claimed.contains(&(caller.clone(), condition)) {
            return Err(LedgerError::AlreadyClaimed {
                user: caller.clone(),
                condition,
            });
        }

        let token = PositionTokenId::derive(&condition, request.outcome);
        let gross = self.positions.balance_of(caller, &token);
        if gross.is_zero() {
            return Err(LedgerError::NothingToClaim {
                user: caller.clone(),
                condition,
            });
        }

        // Aggregate-only lock accounting means nothing ties this claimant to
        // the funds they locked; the pool-sufficiency check is what stops an
        // early claim from draining funds a later rightful claim needs.
        let locked = self.vault.total_locked(&condition);
        if locked < gross {
            return Err(LedgerError::InsufficientLocked {
                condition,
                locked,
                requested: gross,
            });
        }

        let fee = gross.mul_bps(self.fees.effective(FeeKind::Claim, caller));
        let net = gross
            .checked_sub(fee)
            .expect("claim fee is capped at 10% of gross");

        let treasury = self.treasury.clone();
        self.positions.burn(caller, &token, gross)?;
        self.vault.unlock(&condition, caller, net)?;
        if !fee.is_zero() {
            self.vault.unlock(&condition, &treasury, fee)?;
        }
        self.claimed.insert((caller.clone(), condition));

        info!(%caller, %condition, %gross, %fee, %net, epoch = request.epoch, "winnings claimed");
        Ok(net)
    }

    /// Verify the signature and require the recovered identity to be the
    /// order's stated maker.
    ///
    /// The maker check lives here, not in the verifier: an `OrderVerifier`
    /// only attests who signed, and trusting it to also compare identities
    /// would let a permissive implementation open order spoofing.
    fn check_signer(&self, signed: &SignedOrder) -> Result<(), LedgerError> {
        let identity = self.verifier.verify(signed)?;
        if identity != signed.order.maker {
            return Err(LedgerError::InvalidSignature);
        }
        Ok(())
    }

    fn check_market_open(
        &self,
        question: &QuestionId,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let market = self.registry.get(question)?;
        if market.is_closed(now) {
            return Err(LedgerError::MarketClosed {
                question: question.clone(),
            });
        }
        // Global pause overrides; the per-market flag only matters when the
        // global gate is clear.
        if self.trading_paused || market.is_paused() {
            return Err(LedgerError::TradingPaused);
        }
        Ok(())
    }

    fn market_epoch(
        &self,
        question: &QuestionId,
        now: DateTime<Utc>,
    ) -> Result<(u8, u64), LedgerError> {
        let market = self.registry.get(question)?;
        Ok((market.outcome_count(), market.current_epoch(now)))
    }

    fn check_fill(&self, order: &Order, fill: Amount) -> Result<(), LedgerError> {
        if fill.is_zero() {
            return Err(LedgerError::InvalidAmount {
                reason: "fill amount must be positive",
            });
        }
        if fill > self.remaining(order) {
            return Err(LedgerError::InvalidAmount {
                reason: "fill exceeds the order's remaining unfilled amount",
            });
        }
        Ok(())
    }

    fn check_nonce(&self, order: &Order) -> Result<(), LedgerError> {
        let key = (order.maker.clone(), order.nonce);
        match self.nonces.get(&key) {
            Some(digest) if *digest != order.digest() => Err(LedgerError::NonceReused {
                user: order.maker.clone(),
                nonce: order.nonce,
            }),
            _ => Ok(()),
        }
    }

    fn record_fill(
        &mut self,
        digest: Hash32,
        binding: (UserId, u64),
        fill: Amount,
    ) -> Result<(), LedgerError> {
        let filled = self.fills.entry(digest).or_insert(Amount::ZERO);
        *filled = filled.checked_add(fill).ok_or(LedgerError::BalanceOverflow)?;
        self.nonces.insert(binding, digest);
        Ok(())
    }

    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            vault: self.vault.clone(),
            positions: self.positions.clone(),
            resolver: self.resolver.clone(),
            nonces: self.nonces.clone(),
            fills: self.fills.clone(),
            claimed: self.claimed.clone(),
        }
    }

    fn restore(&mut self, snapshot: EngineSnapshot) {
        self.vault = snapshot.vault;
        self.positions = snapshot.positions;
        self.resolver = snapshot.resolver;
        self.nonces = snapshot.nonces;
        self.fills = snapshot.fills;
        self.claimed = snapshot.claimed;
    }

    /// Run a compound mutation all-or-nothing.
    fn transactional<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let snapshot = self.snapshot();
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.restore(snapshot);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderSide;
    use crate::ledger::InMemoryAsset;
    use chrono::Duration;

    struct TrustingVerifier;

    impl OrderVerifier for TrustingVerifier {
        fn verify(&self, signed: &SignedOrder) -> Result<UserId, LedgerError> {
            Ok(signed.order.maker.clone())
        }
    }

    /// A verifier that attests a fixed signer regardless of the order.
    struct FixedIdentityVerifier(UserId);

    impl OrderVerifier for FixedIdentityVerifier {
        fn verify(&self, _signed: &SignedOrder) -> Result<UserId, LedgerError> {
            Ok(self.0.clone())
        }
    }

    fn signed(order: Order) -> SignedOrder {
        SignedOrder {
            order,
            public_key: [0; 32],
            signature: Vec::new(),
        }
    }

    fn order(maker: &str, question: &QuestionId, side: OrderSide) -> Order {
        Order {
            maker: UserId::new(maker),
            question_id: question.clone(),
            outcome: Outcome::new(0),
            amount: Amount::new(1000),
            price: Bps::new(6000),
            nonce: 1,
            expires_at: Utc::now() + Duration::hours(1),
            side,
        }
    }

    fn engine() -> SettlementEngine {
        SettlementEngine::new(
            UserId::new("oracle"),
            UserId::new("admin"),
            UserId::new("treasury"),
            FeeSchedule::default(),
            Box::new(TrustingVerifier),
            Box::new(InMemoryAsset::new()),
        )
    }

    #[test]
    fn admin_surface_requires_admin_role() {
        let mut eng = engine();
        let mallory = UserId::new("mallory");

        assert!(matches!(
            eng.set_global_pause(&mallory, true),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert!(matches!(
            eng.set_default_fee(&mallory, FeeKind::Trade, Bps::new(1)),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert!(matches!(
            eng.grant_role(&mallory, mallory.clone(), Role::Matcher),
            Err(LedgerError::Unauthorized { .. })
        ));
    }

    #[test]
    fn resolution_requires_oracle_or_emergency_role() {
        let mut eng = engine();
        let admin = UserId::new("admin");
        let q = QuestionId::new("q-1");
        eng.create_market(&admin, q.clone(), 2, None, EpochMode::Manual, Utc::now())
            .unwrap();

        // Admin alone cannot resolve.
        assert!(matches!(
            eng.resolve_market_epoch(&admin, &q, 1, Hash32::ZERO, Utc::now()),
            Err(LedgerError::Unauthorized { .. })
        ));

        let medic = UserId::new("medic");
        eng.grant_role(&admin, medic.clone(), Role::EmergencyResolver)
            .unwrap();
        assert!(eng
            .resolve_market_epoch(&medic, &q, 1, Hash32::ZERO, Utc::now())
            .is_ok());
    }

    #[test]
    fn fee_setters_enforce_cap_via_engine() {
        let mut eng = engine();
        let admin = UserId::new("admin");

        assert!(matches!(
            eng.set_default_fee(&admin, FeeKind::Claim, Bps::new(1_001)),
            Err(LedgerError::FeeRateExceedsMaximum { .. })
        ));
        assert_eq!(
            eng.effective_fee(FeeKind::Claim, &UserId::new("anyone")),
            Bps::ZERO
        );
    }

    #[test]
    fn verified_identity_must_match_the_stated_maker() {
        // A verifier written to the trait's letter only attests who signed;
        // the engine itself must refuse an order whose stated maker is
        // someone else.
        let mut eng = SettlementEngine::new(
            UserId::new("oracle"),
            UserId::new("admin"),
            UserId::new("treasury"),
            FeeSchedule::default(),
            Box::new(FixedIdentityVerifier(UserId::new("mallory"))),
            Box::new(InMemoryAsset::new()),
        );
        let admin = UserId::new("admin");
        let now = Utc::now();
        eng.grant_role(&admin, admin.clone(), Role::Matcher).unwrap();
        let q = QuestionId::new("q-1");
        eng.create_market(&admin, q.clone(), 2, None, EpochMode::Manual, now)
            .unwrap();

        let buy = signed(order("alice", &q, OrderSide::Buy));
        let sell = signed(order("bob", &q, OrderSide::Sell));
        assert!(matches!(
            eng.execute_order_match(&admin, &buy, &sell, Amount::new(1000), now),
            Err(LedgerError::InvalidSignature)
        ));
        assert!(matches!(
            eng.execute_single_order(
                &admin,
                &buy,
                &UserId::new("bob"),
                Amount::new(1000),
                false,
                now
            ),
            Err(LedgerError::InvalidSignature)
        ));
    }

    #[test]
    fn set_treasury_redirects_future_fees() {
        let mut eng = engine();
        let admin = UserId::new("admin");
        eng.set_treasury(&admin, UserId::new("new-treasury")).unwrap();
        assert_eq!(eng.treasury(), &UserId::new("new-treasury"));
    }
}
