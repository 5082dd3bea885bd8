use chrono::NaiveDate;
use std::str::FromStr;
use tokio_test::{assert_err, assert_ok};
use twfolio::domain::{BasisMode, Decimal, RightsEvent, RightsLedger};
use twfolio::engine::{
    actual_cost_price, actual_sell_price, buy_costs, replay, replay_lot, sell_costs, CostSchedule,
    EventWindow, ReplayMode,
};

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn history() -> Vec<RightsEvent> {
    vec![
        RightsEvent::cash_dividend(date(2022, 7, 1), d("1.5"), "c22".into()),
        RightsEvent::stock_dividend(date(2022, 7, 1), d("0.05"), "s22".into()),
        RightsEvent::cash_dividend(date(2023, 7, 3), d("2"), "c23".into()),
        RightsEvent::split(date(2024, 1, 15), d("1"), "x24".into()),
        RightsEvent::stock_dividend(date(2024, 7, 1), d("0.1"), "s24".into()),
    ]
}

#[test]
fn test_buy_net_never_below_gross_and_sell_net_never_above() {
    let fee_rates = ["0", "0.1425", "0.0285", "1"];
    let tax_rates = ["0", "0.1", "0.3"];
    let prices = ["0.01", "9.99", "45.45", "100", "1085"];
    let shares = [1, 999, 1000, 123_456];

    for fee in fee_rates {
        for tax in tax_rates {
            for price in prices {
                for n in shares {
                    let buy = assert_ok!(buy_costs(n, d(price), d(fee)));
                    assert!(buy.net_amount >= buy.gross_amount);
                    let sell = assert_ok!(sell_costs(n, d(price), d(fee), d(tax)));
                    assert!(sell.net_amount <= sell.gross_amount);
                }
            }
        }
    }
}

#[test]
fn test_reference_cost_scenarios() {
    let buy = buy_costs(1000, d("100"), d("0.1425")).unwrap();
    assert_eq!(buy.brokerage_fee, d("143"));
    assert_eq!(buy.net_amount, d("100143"));

    let sell = sell_costs(1000, d("100"), d("0.1425"), d("0.3")).unwrap();
    assert_eq!(sell.total_costs, d("443"));
    assert_eq!(sell.net_amount, d("99557"));

    assert_eq!(actual_cost_price(1000, d("100"), d("0.1425")).unwrap(), d("100.143"));
    assert_eq!(
        actual_sell_price(1000, d("100"), d("0.1425"), d("0.3")).unwrap(),
        d("99.557")
    );
}

#[test]
fn test_invalid_cost_inputs_are_rejected() {
    assert_err!(buy_costs(0, d("100"), d("0.1425")));
    assert_err!(buy_costs(-5, d("100"), d("0.1425")));
    assert_err!(buy_costs(1000, d("0"), d("0.1425")));
    assert_err!(sell_costs(1000, d("100"), d("-0.1"), d("0.3")));
    assert_err!(sell_costs(1000, d("100"), d("0.1425"), d("-0.3")));
}

#[test]
fn test_oversized_inputs_are_errors_not_panics() {
    let huge_price = d("100000000000");
    assert_err!(buy_costs(i64::MAX, huge_price, d("0.1425")));
    assert_err!(sell_costs(i64::MAX, huge_price, d("0.1425"), d("0.3")));
    assert_err!(actual_cost_price(i64::MAX, huge_price, d("0.1425")));

    let split = vec![RightsEvent::split(date(2024, 1, 15), d("1"), "x".into())];
    assert_err!(replay_lot(i64::MAX, d("1000000000000"), split.clone(), BasisMode::ExcludeCash));
    assert_err!(replay_lot(i64::MAX, d("1"), split, BasisMode::ExcludeCash));
    assert_err!(RightsLedger::new(i64::MAX, d("1000000000000"), BasisMode::ExcludeCash));
}

#[test]
fn test_minimum_fee_applies_to_small_trades() {
    let schedule = CostSchedule::new(d("0.1425"), d("0.3")).with_min_fee(d("20"));
    let small = schedule.buy(10, d("50")).unwrap();
    assert_eq!(small.brokerage_fee, d("20"));
    let large = schedule.buy(1000, d("100")).unwrap();
    assert_eq!(large.brokerage_fee, d("143"));
}

#[test]
fn test_replay_is_idempotent() {
    let once = replay_lot(1000, d("50"), history(), BasisMode::ExcludeCash).unwrap();
    let again = replay(&once, history(), EventWindow::since(date(2000, 1, 1)), false).unwrap();
    assert_eq!(again.applied, 0);
    assert_eq!(again.ledger, once);
}

#[test]
fn test_incremental_matches_full_replay() {
    let full = replay_lot(1000, d("50"), history(), BasisMode::IncomeInclusive).unwrap();

    let mut ledger = RightsLedger::new(1000, d("50"), BasisMode::IncomeInclusive).unwrap();
    let events = history();
    for cut in 1..=events.len() {
        let outcome = replay(
            &ledger,
            events[..cut].to_vec(),
            EventWindow::since(date(2000, 1, 1)),
            false,
        )
        .unwrap();
        assert_eq!(outcome.mode, ReplayMode::Incremental);
        ledger = outcome.ledger;
    }
    assert_eq!(ledger, full);
}

#[test]
fn test_basis_conserved_when_cash_excluded() {
    let ledger = replay_lot(1000, d("50"), history(), BasisMode::ExcludeCash).unwrap();
    assert_eq!(ledger.cost_basis, d("50000"));
    assert!(ledger.current_shares > 1000);
    assert!(ledger.cash_income.is_positive());
}

#[test]
fn test_cash_dividends_never_move_shares_or_basis_by_default() {
    let events = vec![
        RightsEvent::cash_dividend(date(2023, 7, 3), d("2"), "c23".into()),
        RightsEvent::cash_dividend(date(2024, 7, 3), d("3"), "c24".into()),
    ];
    let ledger = replay_lot(1000, d("50"), events, BasisMode::ExcludeCash).unwrap();
    assert_eq!(ledger.current_shares, 1000);
    assert_eq!(ledger.adjusted_cost_price(), d("50"));
    assert_eq!(ledger.cash_income, d("5000"));
}

#[test]
fn test_late_event_triggers_full_replay() {
    let events = history();
    let without_first: Vec<RightsEvent> = events[2..].to_vec();
    let partial = replay_lot(1000, d("50"), without_first, BasisMode::ExcludeCash).unwrap();

    let outcome = replay(&partial, events, EventWindow::since(date(2000, 1, 1)), false).unwrap();
    assert_eq!(outcome.mode, ReplayMode::Full);
    assert_eq!(
        outcome.ledger,
        replay_lot(1000, d("50"), history(), BasisMode::ExcludeCash).unwrap()
    );
}
