//! Pure computation engine(s) for costs, rights replay and gain/loss.

pub mod costs;
pub mod gain_loss;
pub mod rights;

pub use costs::{actual_cost_price, actual_sell_price, buy_costs, sell_costs, CostError, CostSchedule};
pub use gain_loss::{position_disposal, realized_gain_loss, unrealized_gain_loss};
pub use rights::{
    adjust_position, normalize_records, replay, replay_lot, EventWindow, ReplayMode, ReplayOutcome,
    RightsError, RightsProcessor,
};
