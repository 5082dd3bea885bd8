//! Taiwan-market transaction costs: brokerage fee on both sides, securities
//! transaction tax on sells.
//!
//! Fee and tax are each rounded to a whole currency unit; the gross amount is
//! never rounded.

use crate::domain::{Account, Decimal, Position, SecurityClass, Side, TradeCosts};
use crate::domain::account::{default_fee_rate, default_tax_rate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CostError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Rates applied to a trade. Rates are percentages (0.1425 means 0.1425%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSchedule {
    pub fee_rate_percent: Decimal,
    pub tax_rate_percent: Decimal,
    /// Floor for a non-zero brokerage fee; zero disables it.
    #[serde(default)]
    pub min_brokerage_fee: Decimal,
}

impl Default for CostSchedule {
    fn default() -> Self {
        Self {
            fee_rate_percent: default_fee_rate(),
            tax_rate_percent: default_tax_rate(),
            min_brokerage_fee: Decimal::zero(),
        }
    }
}

impl CostSchedule {
    pub fn new(fee_rate_percent: Decimal, tax_rate_percent: Decimal) -> Self {
        Self {
            fee_rate_percent,
            tax_rate_percent,
            min_brokerage_fee: Decimal::zero(),
        }
    }

    pub fn with_min_fee(mut self, min_brokerage_fee: Decimal) -> Self {
        self.min_brokerage_fee = min_brokerage_fee;
        self
    }

    /// Rates for trading `position` in `account`.
    ///
    /// Tax precedence: the position's own override, then the statutory rate for
    /// bond ETFs, then the account rate.
    pub fn for_position(account: &Account, position: &Position, min_brokerage_fee: Decimal) -> Self {
        let tax_rate_percent = position.transaction_tax_rate.unwrap_or_else(|| {
            match position.security_class() {
                SecurityClass::Stock => account.transaction_tax_rate,
                class => class.default_tax_rate(),
            }
        });
        Self {
            fee_rate_percent: account.brokerage_fee_rate,
            tax_rate_percent,
            min_brokerage_fee,
        }
    }

    pub fn buy(&self, shares: i64, price: Decimal) -> Result<TradeCosts, CostError> {
        self.validate_rates()?;
        let gross = gross_amount(shares, price)?;
        let brokerage_fee = self.brokerage_fee(gross)?;
        let transaction_tax = Decimal::zero();
        let total_costs = brokerage_fee;

        Ok(TradeCosts {
            side: Side::Buy,
            gross_amount: gross,
            brokerage_fee,
            transaction_tax,
            total_costs,
            net_amount: gross.checked_add(total_costs).ok_or_else(overflow)?,
        })
    }

    pub fn sell(&self, shares: i64, price: Decimal) -> Result<TradeCosts, CostError> {
        self.validate_rates()?;
        let gross = gross_amount(shares, price)?;
        let brokerage_fee = self.brokerage_fee(gross)?;
        let transaction_tax = rate_of(gross, self.tax_rate_percent)?;
        let total_costs = brokerage_fee.checked_add(transaction_tax).ok_or_else(overflow)?;

        Ok(TradeCosts {
            side: Side::Sell,
            gross_amount: gross,
            brokerage_fee,
            transaction_tax,
            total_costs,
            net_amount: gross.checked_sub(total_costs).ok_or_else(overflow)?,
        })
    }

    pub fn costs(&self, side: Side, shares: i64, price: Decimal) -> Result<TradeCosts, CostError> {
        match side {
            Side::Buy => self.buy(shares, price),
            Side::Sell => self.sell(shares, price),
        }
    }

    fn brokerage_fee(&self, gross: Decimal) -> Result<Decimal, CostError> {
        let fee = rate_of(gross, self.fee_rate_percent)?;
        if self.fee_rate_percent.is_positive() && fee < self.min_brokerage_fee {
            Ok(self.min_brokerage_fee)
        } else {
            Ok(fee)
        }
    }

    fn validate_rates(&self) -> Result<(), CostError> {
        if self.fee_rate_percent.is_negative() {
            return Err(CostError::InvalidInput(format!(
                "fee rate must be >= 0, got {}",
                self.fee_rate_percent
            )));
        }
        if self.tax_rate_percent.is_negative() {
            return Err(CostError::InvalidInput(format!(
                "tax rate must be >= 0, got {}",
                self.tax_rate_percent
            )));
        }
        if self.min_brokerage_fee.is_negative() {
            return Err(CostError::InvalidInput(
                "minimum brokerage fee must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn gross_amount(shares: i64, price: Decimal) -> Result<Decimal, CostError> {
    if shares <= 0 {
        return Err(CostError::InvalidInput(format!(
            "shares must be > 0, got {}",
            shares
        )));
    }
    if !price.is_positive() {
        return Err(CostError::InvalidInput(format!(
            "price must be > 0, got {}",
            price
        )));
    }
    Decimal::lot_value(shares, price).ok_or_else(overflow)
}

/// `rate_percent` of `amount`, rounded to a whole currency unit.
fn rate_of(amount: Decimal, rate_percent: Decimal) -> Result<Decimal, CostError> {
    amount
        .checked_mul(rate_percent.percent())
        .map(|v| v.round_currency())
        .ok_or_else(overflow)
}

pub(crate) fn overflow() -> CostError {
    CostError::InvalidInput("trade amount is too large".to_string())
}

/// Cost of buying `shares` at `price` with a brokerage fee of `fee_rate_percent`.
pub fn buy_costs(shares: i64, price: Decimal, fee_rate_percent: Decimal) -> Result<TradeCosts, CostError> {
    CostSchedule::new(fee_rate_percent, Decimal::zero()).buy(shares, price)
}

/// Proceeds of selling `shares` at `price`. The usual stock tax rate is 0.3%.
pub fn sell_costs(
    shares: i64,
    price: Decimal,
    fee_rate_percent: Decimal,
    tax_rate_percent: Decimal,
) -> Result<TradeCosts, CostError> {
    CostSchedule::new(fee_rate_percent, tax_rate_percent).sell(shares, price)
}

/// Per-share cost including the buy-side fee.
pub fn actual_cost_price(shares: i64, price: Decimal, fee_rate_percent: Decimal) -> Result<Decimal, CostError> {
    let costs = buy_costs(shares, price, fee_rate_percent)?;
    Ok(costs.net_amount / Decimal::from_i64(shares))
}

/// Per-share proceeds after the sell-side fee and tax.
pub fn actual_sell_price(
    shares: i64,
    price: Decimal,
    fee_rate_percent: Decimal,
    tax_rate_percent: Decimal,
) -> Result<Decimal, CostError> {
    let costs = sell_costs(shares, price, fee_rate_percent, tax_rate_percent)?;
    Ok(costs.net_amount / Decimal::from_i64(shares))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, BasisMode, Symbol};
    use chrono::NaiveDate;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_buy_costs_reference_scenario() {
        let costs = buy_costs(1000, d("100"), d("0.1425")).unwrap();
        assert_eq!(costs.gross_amount, d("100000"));
        assert_eq!(costs.brokerage_fee, d("143"));
        assert_eq!(costs.transaction_tax, Decimal::zero());
        assert_eq!(costs.total_costs, d("143"));
        assert_eq!(costs.net_amount, d("100143"));
    }

    #[test]
    fn test_sell_costs_reference_scenario() {
        let costs = sell_costs(1000, d("100"), d("0.1425"), d("0.3")).unwrap();
        assert_eq!(costs.brokerage_fee, d("143"));
        assert_eq!(costs.transaction_tax, d("300"));
        assert_eq!(costs.total_costs, d("443"));
        assert_eq!(costs.net_amount, d("99557"));
    }

    #[test]
    fn test_fee_rounds_at_fee_level_not_gross() {
        // gross 1234.5 * 0.1425% = 1.7591625 -> 2
        let costs = buy_costs(1, d("1234.5"), d("0.1425")).unwrap();
        assert_eq!(costs.gross_amount, d("1234.5"));
        assert_eq!(costs.brokerage_fee, d("2"));
        assert_eq!(costs.net_amount, d("1236.5"));
    }

    #[test]
    fn test_rejects_non_positive_inputs() {
        assert!(matches!(
            buy_costs(0, d("100"), d("0.1425")),
            Err(CostError::InvalidInput(_))
        ));
        assert!(matches!(
            buy_costs(10, d("0"), d("0.1425")),
            Err(CostError::InvalidInput(_))
        ));
        assert!(matches!(
            sell_costs(10, d("10"), d("-0.1"), d("0.3")),
            Err(CostError::InvalidInput(_))
        ));
        assert!(matches!(
            sell_costs(10, d("10"), d("0.1425"), d("-0.3")),
            Err(CostError::InvalidInput(_))
        ));
        assert!(actual_cost_price(0, d("10"), d("0.1425")).is_err());
    }

    #[test]
    fn test_oversized_trade_is_invalid_input() {
        let huge = d("100000000000");
        assert!(matches!(
            buy_costs(i64::MAX, huge, d("0.1425")),
            Err(CostError::InvalidInput(_))
        ));
        assert!(matches!(
            sell_costs(i64::MAX, huge, d("0.1425"), d("0.3")),
            Err(CostError::InvalidInput(_))
        ));
        // Gross fits but a fee rate above 100% pushes the total past the limit.
        let near_max = d("7900000000000000000000000000");
        assert!(matches!(
            buy_costs(1, near_max, d("1000")),
            Err(CostError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_buy_net_never_below_gross_and_sell_net_never_above() {
        let prices = ["0.01", "9.87", "100", "523.5", "1085"];
        let shares = [1_i64, 7, 999, 1000, 123_456];
        let fee_rates = ["0", "0.0285", "0.1425"];
        let tax_rates = ["0", "0.1", "0.3"];

        for price in prices {
            for &n in &shares {
                for fee in fee_rates {
                    let gross = Decimal::from_i64(n) * d(price);
                    let buy = buy_costs(n, d(price), d(fee)).unwrap();
                    assert!(buy.net_amount >= gross, "buy {} @ {} fee {}", n, price, fee);
                    for tax in tax_rates {
                        let sell = sell_costs(n, d(price), d(fee), d(tax)).unwrap();
                        assert!(sell.net_amount <= gross, "sell {} @ {} fee {} tax {}", n, price, fee, tax);
                    }
                }
            }
        }
    }

    #[test]
    fn test_actual_prices() {
        assert_eq!(actual_cost_price(1000, d("100"), d("0.1425")).unwrap(), d("100.143"));
        assert_eq!(
            actual_sell_price(1000, d("100"), d("0.1425"), d("0.3")).unwrap(),
            d("99.557")
        );
    }

    #[test]
    fn test_min_fee_applies_only_when_fee_is_charged() {
        let schedule = CostSchedule::new(d("0.1425"), d("0.3")).with_min_fee(d("20"));
        let small = schedule.buy(1, d("50")).unwrap();
        assert_eq!(small.brokerage_fee, d("20"));
        let large = schedule.buy(1000, d("100")).unwrap();
        assert_eq!(large.brokerage_fee, d("143"));

        let free = CostSchedule::new(d("0"), d("0.3")).with_min_fee(d("20"));
        assert!(free.buy(1, d("50")).unwrap().brokerage_fee.is_zero());
    }

    #[test]
    fn test_schedule_for_bond_etf_uses_statutory_tax() {
        let account = Account::new("main".to_string());
        let mut position = Position::new(
            AccountId::new("acc".to_string()),
            Symbol::new("00679B"),
            String::new(),
            1000,
            d("30"),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            BasisMode::ExcludeCash,
        )
        .unwrap();
        let schedule = CostSchedule::for_position(&account, &position, Decimal::zero());
        assert!(schedule.tax_rate_percent.is_zero());

        position.transaction_tax_rate = Some(d("0.1"));
        let schedule = CostSchedule::for_position(&account, &position, Decimal::zero());
        assert_eq!(schedule.tax_rate_percent, d("0.1"));

        position.symbol = Symbol::new("2330");
        position.transaction_tax_rate = None;
        let schedule = CostSchedule::for_position(&account, &position, Decimal::zero());
        assert_eq!(schedule.tax_rate_percent, d("0.3"));
    }
}
