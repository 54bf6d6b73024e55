//! Exchange-agnostic domain types: identities, money, orders, fees, roles.

mod fees;
mod ids;
mod money;
mod order;
mod roles;

pub use fees::{FeeKind, FeeSchedule, MAX_FEE_BPS};
pub use ids::{ConditionId, Outcome, PositionTokenId, QuestionId, TradeId, UserId};
pub use money::{Amount, Bps, BPS_SCALE};
pub use order::{Order, OrderSide, SignedOrder};
pub use roles::{Role, RoleTable};
