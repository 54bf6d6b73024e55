//! Market metadata and epoch derivation.
//!
//! A market is created once and then only ever moves forward: epochs rise
//! monotonically, and a market with a resolution time closes for good when
//! that instant passes. Automatic-epoch markets never need a mutating
//! "advance" call; their current epoch is a pure function of the instant the
//! caller queries at.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use tracing::info;

use crate::domain::QuestionId;
use crate::error::LedgerError;

/// How a market's epochs move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochMode {
    /// Epochs advance only via an explicit call.
    Manual,
    /// Epochs advance with wall-clock time, one per `duration`.
    Auto { duration: Duration },
}

/// Per-question configuration and epoch state.
#[derive(Debug, Clone)]
pub struct MarketInfo {
    question_id: QuestionId,
    outcome_count: u8,
    resolution_time: Option<DateTime<Utc>>,
    epoch_mode: EpochMode,
    created_at: DateTime<Utc>,
    manual_epoch: u64,
    paused: bool,
}

impl MarketInfo {
    /// The question this market trades.
    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    /// Number of outcomes.
    #[must_use]
    pub fn outcome_count(&self) -> u8 {
        self.outcome_count
    }

    /// When the market stops trading, if ever.
    #[must_use]
    pub fn resolution_time(&self) -> Option<DateTime<Utc>> {
        self.resolution_time
    }

    /// The epoch in effect at `now`.
    ///
    /// Automatic markets derive it from elapsed time; nothing is stored and
    /// no transaction is needed for the transition.
    #[must_use]
    pub fn current_epoch(&self, now: DateTime<Utc>) -> u64 {
        match self.epoch_mode {
            EpochMode::Manual => self.manual_epoch,
            EpochMode::Auto { duration } => {
                let elapsed = now - self.created_at;
                if elapsed < Duration::zero() {
                    return 1;
                }
                let span = duration.num_milliseconds().max(1);
                (elapsed.num_milliseconds() / span) as u64 + 1
            }
        }
    }

    /// Returns true once a non-zero resolution time has elapsed.
    #[must_use]
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        self.resolution_time.is_some_and(|t| now >= t)
    }

    /// Per-market trading pause flag.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

/// Registry of all configured markets.
#[derive(Debug, Clone, Default)]
pub struct MarketRegistry {
    markets: HashMap<QuestionId, MarketInfo>,
}

impl MarketRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a new market. Manual-mode markets start at epoch 1.
    pub fn create(
        &mut self,
        question_id: QuestionId,
        outcome_count: u8,
        resolution_time: Option<DateTime<Utc>>,
        epoch_mode: EpochMode,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if outcome_count < 2 {
            return Err(LedgerError::InvalidAmount {
                reason: "a market needs at least two outcomes",
            });
        }
        if let EpochMode::Auto { duration } = epoch_mode {
            if duration <= Duration::zero() {
                return Err(LedgerError::InvalidAmount {
                    reason: "automatic epoch duration must be positive",
                });
            }
        }
        if self.markets.contains_key(&question_id) {
            return Err(LedgerError::MarketAlreadyExists {
                question: question_id,
            });
        }
        info!(question = %question_id, outcome_count, ?epoch_mode, "market created");
        self.markets.insert(
            question_id.clone(),
            MarketInfo {
                question_id,
                outcome_count,
                resolution_time,
                epoch_mode,
                created_at: now,
                manual_epoch: 1,
                paused: false,
            },
        );
        Ok(())
    }

    /// Look up a market.
    pub fn get(&self, question: &QuestionId) -> Result<&MarketInfo, LedgerError> {
        self.markets
            .get(question)
            .ok_or_else(|| LedgerError::UnknownMarket {
                question: question.clone(),
            })
    }

    /// The epoch of a market at `now`.
    pub fn current_epoch(
        &self,
        question: &QuestionId,
        now: DateTime<Utc>,
    ) -> Result<u64, LedgerError> {
        Ok(self.get(question)?.current_epoch(now))
    }

    /// Advance a manual-mode market's epoch by one.
    ///
    /// Calling this on an automatic-epoch market is an error, not a no-op;
    /// silently accepting it would mask an operator mistake.
    pub fn advance_epoch(&mut self, question: &QuestionId) -> Result<u64, LedgerError> {
        let market = self.get_mut(question)?;
        match market.epoch_mode {
            EpochMode::Manual => {
                market.manual_epoch += 1;
                info!(question = %question, epoch = market.manual_epoch, "epoch advanced");
                Ok(market.manual_epoch)
            }
            EpochMode::Auto { .. } => Err(LedgerError::ManualAdvanceUnavailable {
                question: question.clone(),
            }),
        }
    }

    /// Set the per-market pause flag.
    pub fn set_paused(&mut self, question: &QuestionId, paused: bool) -> Result<(), LedgerError> {
        self.get_mut(question)?.paused = paused;
        Ok(())
    }

    fn get_mut(&mut self, question: &QuestionId) -> Result<&mut MarketInfo, LedgerError> {
        self.markets
            .get_mut(question)
            .ok_or_else(|| LedgerError::UnknownMarket {
                question: question.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> QuestionId {
        QuestionId::new(s)
    }

    #[test]
    fn create_rejects_bad_parameters() {
        let mut reg = MarketRegistry::new();
        let now = Utc::now();

        assert!(matches!(
            reg.create(q("one-outcome"), 1, None, EpochMode::Manual, now),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(matches!(
            reg.create(
                q("zero-duration"),
                2,
                None,
                EpochMode::Auto {
                    duration: Duration::zero()
                },
                now
            ),
            Err(LedgerError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn create_is_once_only() {
        let mut reg = MarketRegistry::new();
        let now = Utc::now();
        reg.create(q("q-1"), 2, None, EpochMode::Manual, now).unwrap();

        assert!(matches!(
            reg.create(q("q-1"), 2, None, EpochMode::Manual, now),
            Err(LedgerError::MarketAlreadyExists { .. })
        ));
    }

    #[test]
    fn manual_epoch_advances_only_explicitly() {
        let mut reg = MarketRegistry::new();
        let now = Utc::now();
        reg.create(q("q-1"), 2, None, EpochMode::Manual, now).unwrap();

        assert_eq!(reg.current_epoch(&q("q-1"), now).unwrap(), 1);
        // Time passing does nothing for manual markets.
        let later = now + Duration::days(365);
        assert_eq!(reg.current_epoch(&q("q-1"), later).unwrap(), 1);

        assert_eq!(reg.advance_epoch(&q("q-1")).unwrap(), 2);
        assert_eq!(reg.current_epoch(&q("q-1"), now).unwrap(), 2);
    }

    #[test]
    fn auto_epoch_is_pure_function_of_time() {
        let mut reg = MarketRegistry::new();
        let now = Utc::now();
        reg.create(
            q("q-1"),
            2,
            None,
            EpochMode::Auto {
                duration: Duration::hours(1),
            },
            now,
        )
        .unwrap();

        assert_eq!(reg.current_epoch(&q("q-1"), now).unwrap(), 1);
        assert_eq!(
            reg.current_epoch(&q("q-1"), now + Duration::minutes(59))
                .unwrap(),
            1
        );
        assert_eq!(
            reg.current_epoch(&q("q-1"), now + Duration::hours(1)).unwrap(),
            2
        );
        assert_eq!(
            reg.current_epoch(&q("q-1"), now + Duration::hours(5)).unwrap(),
            6
        );
        // Clock earlier than creation clamps to epoch 1.
        assert_eq!(
            reg.current_epoch(&q("q-1"), now - Duration::hours(2)).unwrap(),
            1
        );
    }

    #[test]
    fn advance_fails_on_automatic_market() {
        let mut reg = MarketRegistry::new();
        reg.create(
            q("q-1"),
            2,
            None,
            EpochMode::Auto {
                duration: Duration::hours(1),
            },
            Utc::now(),
        )
        .unwrap();

        assert!(matches!(
            reg.advance_epoch(&q("q-1")),
            Err(LedgerError::ManualAdvanceUnavailable { .. })
        ));
    }

    #[test]
    fn close_follows_resolution_time() {
        let mut reg = MarketRegistry::new();
        let now = Utc::now();
        let closes = now + Duration::hours(2);
        reg.create(q("q-1"), 2, Some(closes), EpochMode::Manual, now)
            .unwrap();
        reg.create(q("open-ended"), 2, None, EpochMode::Manual, now)
            .unwrap();

        let market = reg.get(&q("q-1")).unwrap();
        assert!(!market.is_closed(now));
        assert!(market.is_closed(closes));

        let open_ended = reg.get(&q("open-ended")).unwrap();
        assert!(!open_ended.is_closed(now + Duration::days(10_000)));
    }

    #[test]
    fn unknown_market_is_an_error() {
        let reg = MarketRegistry::new();
        assert!(matches!(
            reg.get(&q("missing")),
            Err(LedgerError::UnknownMarket { .. })
        ));
    }

    #[test]
    fn pause_flag_round_trips() {
        let mut reg = MarketRegistry::new();
        reg.create(q("q-1"), 2, None, EpochMode::Manual, Utc::now())
            .unwrap();

        assert!(!reg.get(&q("q-1")).unwrap().is_paused());
        reg.set_paused(&q("q-1"), true).unwrap();
        assert!(reg.get(&q("q-1")).unwrap().is_paused());
        reg.set_paused(&q("q-1"), false).unwrap();
        assert!(!reg.get(&q("q-1")).unwrap().is_paused());
    }
}
