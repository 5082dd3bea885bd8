//! Realized and unrealized gain/loss with transaction costs.

use crate::domain::{Decimal, GainLossMode, Position, RealizedResult};
use crate::engine::costs::{overflow, CostError, CostSchedule};

impl CostSchedule {
    /// Net result of buying `shares` at `buy_price` and selling them at `sell_price`.
    pub fn realized(&self, shares: i64, buy_price: Decimal, sell_price: Decimal) -> Result<RealizedResult, CostError> {
        let buy_costs = self.buy(shares, buy_price)?;
        let sell_costs = self.sell(shares, sell_price)?;

        let difference = |sell: Decimal, buy: Decimal| sell.checked_sub(buy).ok_or_else(overflow);

        Ok(RealizedResult {
            gross_gain_loss: difference(sell_costs.gross_amount, buy_costs.gross_amount)?,
            net_gain_loss: difference(sell_costs.net_amount, buy_costs.net_amount)?,
            total_transaction_costs: buy_costs
                .total_costs
                .checked_add(sell_costs.total_costs)
                .ok_or_else(overflow)?,
            transaction_tax_rate: self.tax_rate_percent,
            buy_costs,
            sell_costs,
        })
    }
}

/// Realized gain/loss; the usual stock tax rate is 0.3%.
pub fn realized_gain_loss(
    shares: i64,
    buy_price: Decimal,
    sell_price: Decimal,
    fee_rate_percent: Decimal,
    tax_rate_percent: Decimal,
) -> Result<RealizedResult, CostError> {
    CostSchedule::new(fee_rate_percent, tax_rate_percent).realized(shares, buy_price, sell_price)
}

/// Result of selling `shares` of `position` at `sell_price`, using its
/// adjusted cost price as the buy price.
pub fn position_disposal(
    position: &Position,
    shares: i64,
    sell_price: Decimal,
    schedule: &CostSchedule,
) -> Result<RealizedResult, CostError> {
    if shares > position.shares {
        return Err(CostError::InvalidInput(format!(
            "cannot sell {} shares of a {} share position",
            shares, position.shares
        )));
    }
    schedule.realized(shares, position.adjusted_cost_price, sell_price)
}

/// Unrealized gain/loss of the whole position at its current price.
///
/// - `ExcludingRights`: the original lot bought at the original cost and sold
///   at the current price, as if no rights events happened.
/// - `CashDividendOnly`: as above, plus cash dividends received.
/// - `FullRights`: the current share count at the adjusted cost price.
///
/// Returns None when the position has no shares or no usable price.
pub fn unrealized_gain_loss(position: &Position, mode: GainLossMode, schedule: &CostSchedule) -> Option<Decimal> {
    let price = position.current_price;
    match mode {
        GainLossMode::ExcludingRights => {
            let shares = position.rights.original_shares;
            schedule.realized(shares, position.cost_price, price).ok().map(|r| r.net_gain_loss)
        }
        GainLossMode::CashDividendOnly => {
            let shares = position.rights.original_shares;
            schedule
                .realized(shares, position.cost_price, price)
                .ok()
                .and_then(|r| r.net_gain_loss.checked_add(position.rights.cash_income))
        }
        GainLossMode::FullRights => {
            if !position.adjusted_cost_price.is_positive() {
                // Basis fully recovered by dividends: everything is gain.
                let sell = schedule.sell(position.shares, price).ok()?;
                return Some(sell.net_amount);
            }
            schedule
                .realized(position.shares, position.adjusted_cost_price, price)
                .ok()
                .map(|r| r.net_gain_loss)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, BasisMode, RightsEvent, Symbol, TimeMs};
    use crate::engine::rights::adjust_position;
    use chrono::NaiveDate;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_realized_reference_scenario() {
        let result = realized_gain_loss(1000, d("45.45"), d("60"), d("0.1425"), d("0.3")).unwrap();
        assert_eq!(result.buy_costs.gross_amount, d("45450"));
        assert_eq!(result.buy_costs.brokerage_fee, d("65"));
        assert_eq!(result.buy_costs.net_amount, d("45515"));
        assert_eq!(result.sell_costs.brokerage_fee, d("86"));
        assert_eq!(result.sell_costs.transaction_tax, d("180"));
        assert_eq!(result.sell_costs.net_amount, d("59734"));
        assert_eq!(result.gross_gain_loss, d("14550"));
        assert_eq!(result.net_gain_loss, d("14219"));
        assert_eq!(result.total_transaction_costs, d("331"));
        assert_eq!(result.transaction_tax_rate, d("0.3"));
    }

    #[test]
    fn test_realized_with_exact_adjusted_cost() {
        let cost = d("50000") / d("1100");
        let result = realized_gain_loss(1000, cost, d("60"), d("0.1425"), d("0.3")).unwrap();
        let buy_gross = Decimal::from_i64(1000) * cost;
        assert_eq!(result.buy_costs.gross_amount, buy_gross);
        assert_eq!(result.buy_costs.brokerage_fee, d("65"));
        assert_eq!(result.net_gain_loss, d("59734") - (buy_gross + d("65")));
    }

    #[test]
    fn test_realized_loss() {
        let result = realized_gain_loss(1000, d("100"), d("90"), d("0.1425"), d("0.3")).unwrap();
        assert!(result.net_gain_loss.is_negative());
        assert!(result.net_gain_loss < result.gross_gain_loss);
    }

    fn adjusted_position() -> Position {
        let mut position = Position::new(
            AccountId::new("acc".to_string()),
            Symbol::new("2330"),
            String::new(),
            1000,
            d("50"),
            date(2023, 1, 5),
            BasisMode::ExcludeCash,
        )
        .unwrap();
        position.current_price = d("60");
        let events = vec![
            RightsEvent::cash_dividend(date(2024, 6, 1), d("2"), "c".into()),
            RightsEvent::stock_dividend(date(2024, 7, 1), d("0.1"), "s".into()),
        ];
        adjust_position(&position, events, date(2024, 12, 31), false, TimeMs::new(1))
            .unwrap()
            .0
    }

    #[test]
    fn test_disposal_uses_adjusted_cost() {
        let position = adjusted_position();
        let schedule = CostSchedule::default();
        let result = position_disposal(&position, 1000, d("60"), &schedule).unwrap();
        assert_eq!(result.buy_costs.gross_amount, d("1000") * (d("50000") / d("1100")));

        assert!(position_disposal(&position, 1101, d("60"), &schedule).is_err());
    }

    #[test]
    fn test_unrealized_modes() {
        let position = adjusted_position();
        let schedule = CostSchedule::default();

        let excluding = unrealized_gain_loss(&position, GainLossMode::ExcludingRights, &schedule).unwrap();
        let expected = realized_gain_loss(1000, d("50"), d("60"), d("0.1425"), d("0.3"))
            .unwrap()
            .net_gain_loss;
        assert_eq!(excluding, expected);

        let cash_only = unrealized_gain_loss(&position, GainLossMode::CashDividendOnly, &schedule).unwrap();
        assert_eq!(cash_only, expected + d("2000"));

        let full = unrealized_gain_loss(&position, GainLossMode::FullRights, &schedule).unwrap();
        let expected_full = realized_gain_loss(1100, d("50000") / d("1100"), d("60"), d("0.1425"), d("0.3"))
            .unwrap()
            .net_gain_loss;
        assert_eq!(full, expected_full);
        assert!(full > excluding);
    }

    #[test]
    fn test_unrealized_without_price_is_none() {
        let mut position = adjusted_position();
        position.current_price = Decimal::zero();
        assert!(unrealized_gain_loss(&position, GainLossMode::FullRights, &CostSchedule::default()).is_none());
    }
}
