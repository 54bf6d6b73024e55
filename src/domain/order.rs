//! Signed limit orders: the ephemeral, off-ledger input to settlement.
//!
//! An order exists only as signed data until the engine consumes it. The
//! canonical digest doubles as the signing payload and as the key for
//! cumulative fill tracking, and each (maker, nonce) pair binds to a single
//! digest so a nonce can never be reused for a different order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{tagged_hash, Hash32};
use crate::error::LedgerError;

use super::{Amount, Bps, Outcome, QuestionId, UserId};

const ORDER_TAG: &str = "matchbook/order/v1";

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    /// Buying outcome shares.
    Buy,
    /// Selling outcome shares.
    Sell,
}

impl OrderSide {
    fn as_byte(self) -> u8 {
        match self {
            OrderSide::Buy => 0,
            OrderSide::Sell => 1,
        }
    }
}

/// A limit order over one outcome of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// The user who signed the order.
    pub maker: UserId,
    /// The question being traded.
    pub question_id: QuestionId,
    /// The outcome the order buys or sells.
    pub outcome: Outcome,
    /// Total share count the order is good for.
    pub amount: Amount,
    /// Limit price in basis points, strictly inside (0, 10000).
    pub price: Bps,
    /// Maker-chosen replay-protection value.
    pub nonce: u64,
    /// Instant after which the order is no longer executable.
    pub expires_at: DateTime<Utc>,
    /// Buy or sell.
    pub side: OrderSide,
}

impl Order {
    /// Canonical digest: the signing payload and the fill-tracking key.
    #[must_use]
    pub fn digest(&self) -> Hash32 {
        tagged_hash(
            ORDER_TAG,
            &[
                self.maker.as_str().as_bytes(),
                self.question_id.as_str().as_bytes(),
                &[self.outcome.index()],
                &self.amount.units().to_le_bytes(),
                &self.price.value().to_le_bytes(),
                &self.nonce.to_le_bytes(),
                &self.expires_at.timestamp_millis().to_le_bytes(),
                &[self.side.as_byte()],
            ],
        )
    }

    /// Validate the order's intrinsic constraints at execution time.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.amount.is_zero() {
            return Err(LedgerError::InvalidAmount {
                reason: "order amount must be positive",
            });
        }
        if !self.price.is_valid_price() {
            return Err(LedgerError::InvalidAmount {
                reason: "order price must lie strictly inside (0, 10000)",
            });
        }
        if self.expires_at <= now {
            return Err(LedgerError::OrderExpired {
                expires_at: self.expires_at,
                now,
            });
        }
        Ok(())
    }

    /// Returns true if this order is a buy.
    #[must_use]
    pub fn is_buy(&self) -> bool {
        self.side == OrderSide::Buy
    }
}

/// An order together with its signature envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOrder {
    /// The signed payload.
    pub order: Order,
    /// Signer's verifying key bytes.
    pub public_key: [u8; 32],
    /// Signature over the order digest.
    pub signature: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn order() -> Order {
        Order {
            maker: UserId::new("alice"),
            question_id: QuestionId::new("q-1"),
            outcome: Outcome::new(0),
            amount: Amount::new(1000),
            price: Bps::new(6000),
            nonce: 1,
            expires_at: Utc::now() + Duration::hours(1),
            side: OrderSide::Buy,
        }
    }

    #[test]
    fn digest_is_deterministic() {
        let o = order();
        assert_eq!(o.digest(), o.clone().digest());
    }

    #[test]
    fn digest_changes_with_any_field() {
        let base = order();

        let mut o = order();
        o.nonce = 2;
        assert_ne!(base.digest(), o.digest());

        let mut o = order();
        o.price = Bps::new(6001);
        assert_ne!(base.digest(), o.digest());

        let mut o = order();
        o.side = OrderSide::Sell;
        assert_ne!(base.digest(), o.digest());
    }

    #[test]
    fn validate_accepts_well_formed_order() {
        assert!(order().validate(Utc::now()).is_ok());
    }

    #[test]
    fn validate_rejects_zero_amount() {
        let mut o = order();
        o.amount = Amount::ZERO;
        assert!(matches!(
            o.validate(Utc::now()),
            Err(LedgerError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn validate_rejects_boundary_prices() {
        for price in [Bps::ZERO, Bps::MAX] {
            let mut o = order();
            o.price = price;
            assert!(matches!(
                o.validate(Utc::now()),
                Err(LedgerError::InvalidAmount { .. })
            ));
        }
    }

    #[test]
    fn validate_rejects_expired_order() {
        let o = order();
        let later = o.expires_at + Duration::seconds(1);
        assert!(matches!(
            o.validate(later),
            Err(LedgerError::OrderExpired { .. })
        ));
    }
}
