use crate::report::Summary;
use core_types::{Trade, dedupe_latest};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::time::Duration;

/// Sample size at which the edge score stops being dampened.
const EDGE_FULL_CONFIDENCE_TRADES: u32 = 20;

/// Floor applied to the profit factor before taking its logarithm.
const PROFIT_FACTOR_FLOOR: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Computes the summary statistics for a batch of trades.
///
/// Records sharing an id are collapsed (last write wins) before anything is counted.
/// The function is pure and total: an empty batch yields `Summary::new()`, sums
/// saturate at the `Decimal` range, and every ratio falls back to zero when the
/// divisor is zero or the quotient does not fit.
pub fn compute_summary(trades: &[Trade]) -> Summary {
    summarize(&dedupe_latest(trades))
}

/// Summary over an already de-duplicated set.
pub(crate) fn summarize(trades: &[&Trade]) -> Summary {
    let mut summary = Summary::new();

    if trades.is_empty() {
        return summary;
    }

    calculate_profitability(trades, &mut summary);
    calculate_ratios(&mut summary);
    calculate_holding_period(trades, &mut summary);

    summary
}

/// Counts, sums and per-side means.
fn calculate_profitability(trades: &[&Trade], summary: &mut Summary) {
    let mut win_pct_sum = Decimal::ZERO;
    let mut loss_pct_sum = Decimal::ZERO;
    let mut loss_usd_sum = Decimal::ZERO;
    let mut pct_sum = Decimal::ZERO;

    summary.n = trades.len();

    for trade in trades {
        let pnl = trade.pnl_usd;
        summary.total_pnl = summary.total_pnl.saturating_add(pnl);
        pct_sum = pct_sum.saturating_add(trade.pnl_percent);

        if pnl > Decimal::ZERO {
            summary.wins += 1;
            summary.gross_win = summary.gross_win.saturating_add(pnl);
            win_pct_sum = win_pct_sum.saturating_add(trade.pnl_percent);
        } else if pnl < Decimal::ZERO {
            summary.losses += 1;
            loss_usd_sum = loss_usd_sum.saturating_add(pnl);
            loss_pct_sum = loss_pct_sum.saturating_add(trade.pnl_percent);
        }
        // Break-even trades stay in `n` only.
    }

    let n = Decimal::from(summary.n);
    summary.gross_loss = loss_usd_sum.abs();
    summary.win_rate = ratio(Decimal::from(summary.wins), n);
    summary.avg_return = ratio(pct_sum, n);
    summary.avg_return_usd = ratio(summary.total_pnl, n);

    if summary.wins > 0 {
        let wins = Decimal::from(summary.wins);
        summary.avg_win_pct = ratio(win_pct_sum, wins);
        summary.avg_win_usd = ratio(summary.gross_win, wins);
    }

    if summary.losses > 0 {
        let losses = Decimal::from(summary.losses);
        summary.avg_loss_pct = ratio(loss_pct_sum, losses);
        summary.avg_loss_usd = ratio(loss_usd_sum, losses);
    }
}

/// Profit factor, risk:reward, expectancy and edge score.
fn calculate_ratios(summary: &mut Summary) {
    summary.profit_factor = ratio(summary.gross_win, summary.gross_loss);
    summary.rr = ratio(summary.avg_win_pct, summary.avg_loss_pct).abs();

    // win_rate is a fraction here, not a percentage.
    summary.expectancy = summary.win_rate
        .saturating_mul(summary.avg_win_pct)
        .saturating_add((Decimal::ONE - summary.win_rate).saturating_mul(summary.avg_loss_pct));

    summary.edge_score = edge_score(summary.expectancy, summary.profit_factor, summary.n);
}

/// `expectancy * (1 + log10(max(pf, 0.01))) * min(n / 20, 1)`.
///
/// The last factor dampens scores computed from fewer than 20 trades.
pub fn edge_score(expectancy: Decimal, profit_factor: Decimal, n: usize) -> Decimal {
    let pf = profit_factor.max(PROFIT_FACTOR_FLOOR);
    let log_pf = pf.checked_log10().unwrap_or(Decimal::ZERO);
    let confidence = (Decimal::from(n) / Decimal::from(EDGE_FULL_CONFIDENCE_TRADES)).min(Decimal::ONE);

    expectancy
        .saturating_mul(Decimal::ONE + log_pf)
        .saturating_mul(confidence)
}

/// `numerator / denominator`, or zero when the divisor is zero or the quotient
/// overflows.
pub(crate) fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

fn calculate_holding_period(trades: &[&Trade], summary: &mut Summary) {
    let periods: Vec<i128> = trades
        .iter()
        .filter_map(|t| t.holding_period())
        .map(|d| i128::from(d.num_milliseconds()))
        .collect();

    if periods.is_empty() {
        return;
    }

    let avg_ms = periods.iter().sum::<i128>() / periods.len() as i128;
    summary.average_holding_period = Duration::from_millis(u64::try_from(avg_ms.max(0)).unwrap_or(u64::MAX));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use core_types::{OrderSide, TradeMode, TradeStatus};
    use rust_decimal_macros::dec;

    fn trade(id: &str, pnl_usd: Decimal, pnl_percent: Decimal) -> Trade {
        Trade {
            id: id.to_string(),
            agent_id: "alpha".to_string(),
            mode: TradeMode::Live,
            token: "BONK".to_string(),
            token_address: "DezX".to_string(),
            entry_price: dec!(1),
            exit_price: Some(dec!(1)),
            quantity: dec!(100),
            side: OrderSide::Buy,
            pnl_usd,
            pnl_percent,
            status: TradeStatus::Closed,
            current_price: None,
            signal_type: None,
            signal_strength: None,
            signal_id: None,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            entry_time: None,
            exit_time: None,
        }
    }

    #[test]
    fn empty_input_returns_zero_summary() {
        let summary = compute_summary(&[]);
        assert_eq!(summary, Summary::new());
        assert_eq!(summary.edge_score, Decimal::ZERO);
    }

    #[test]
    fn one_win_one_loss() {
        let trades = vec![trade("a", dec!(100), dec!(20)), trade("b", dec!(-50), dec!(-10))];
        let s = compute_summary(&trades);

        assert_eq!(s.n, 2);
        assert_eq!(s.wins, 1);
        assert_eq!(s.losses, 1);
        assert_eq!(s.win_rate, dec!(0.5));
        assert_eq!(s.win_rate_pct(), dec!(50));
        assert_eq!(s.avg_win_usd, dec!(100));
        assert_eq!(s.avg_loss_usd, dec!(-50));
        assert_eq!(s.gross_win, dec!(100));
        assert_eq!(s.gross_loss, dec!(50));
        assert_eq!(s.profit_factor, dec!(2));
        assert_eq!(s.avg_win_pct, dec!(20));
        assert_eq!(s.avg_loss_pct, dec!(-10));
        assert_eq!(s.rr, dec!(2));
        assert_eq!(s.expectancy, dec!(5));
        assert_eq!(s.total_pnl, dec!(50));
        assert_eq!(s.avg_return, dec!(5));
        assert_eq!(s.avg_return_usd, dec!(25));
    }

    #[test]
    fn all_losses() {
        let trades = vec![trade("a", dec!(-10), dec!(-5)), trade("b", dec!(-20), dec!(-8))];
        let s = compute_summary(&trades);

        assert_eq!(s.win_rate, Decimal::ZERO);
        assert_eq!(s.profit_factor, Decimal::ZERO);
        assert_eq!(s.avg_loss_pct, dec!(-6.5));
        assert_eq!(s.expectancy, dec!(-6.5));
        assert_eq!(s.rr, Decimal::ZERO);
        assert_eq!(s.gross_loss, dec!(30));
    }

    #[test]
    fn all_wins_has_zero_profit_factor_and_rr() {
        let trades = vec![trade("a", dec!(10), dec!(5)), trade("b", dec!(30), dec!(15))];
        let s = compute_summary(&trades);

        assert_eq!(s.win_rate, Decimal::ONE);
        assert_eq!(s.gross_loss, Decimal::ZERO);
        assert_eq!(s.profit_factor, Decimal::ZERO);
        assert_eq!(s.rr, Decimal::ZERO);
        assert_eq!(s.expectancy, dec!(10));
    }

    #[test]
    fn break_even_trades_count_toward_n_only() {
        // Zero-P&L trades dilute every rate; this is intentional.
        let trades = vec![
            trade("a", dec!(10), dec!(10)),
            trade("b", Decimal::ZERO, Decimal::ZERO),
            trade("c", Decimal::ZERO, Decimal::ZERO),
            trade("d", dec!(-10), dec!(-10)),
        ];
        let s = compute_summary(&trades);

        assert_eq!(s.n, 4);
        assert_eq!(s.wins + s.losses, 2);
        assert_eq!(s.break_even(), 2);
        assert_eq!(s.win_rate, dec!(0.25));
        // 0.25 * 10 + 0.75 * -10
        assert_eq!(s.expectancy, dec!(-5));
        assert_eq!(s.avg_return, Decimal::ZERO);
    }

    #[test]
    fn duplicate_ids_are_collapsed_last_write_wins() {
        let trades = vec![trade("a", dec!(-10), dec!(-1)), trade("a", dec!(40), dec!(4))];
        let s = compute_summary(&trades);

        assert_eq!(s.n, 1);
        assert_eq!(s.wins, 1);
        assert_eq!(s.total_pnl, dec!(40));
    }

    fn assert_close(actual: Decimal, expected: Decimal) {
        assert!(
            (actual - expected).abs() < dec!(0.000001),
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn edge_score_is_dampened_below_twenty_trades() {
        // pf = 10 => log10 = 1 => factor 2
        assert_close(edge_score(dec!(5), dec!(10), 10), dec!(5));
        assert_close(edge_score(dec!(5), dec!(10), 20), dec!(10));
        assert_close(edge_score(dec!(5), dec!(10), 200), dec!(10));
    }

    #[test]
    fn edge_score_floors_profit_factor() {
        // max(0, 0.01) => log10 = -2 => factor -1
        assert_close(edge_score(dec!(-6), Decimal::ZERO, 20), dec!(6));
    }

    #[test]
    fn holding_period_averages_trades_with_both_bounds() {
        let mut a = trade("a", dec!(1), dec!(1));
        a.entry_time = Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        a.exit_time = Some(Utc.timestamp_opt(1_700_000_060, 0).unwrap());
        let mut b = trade("b", dec!(1), dec!(1));
        b.entry_time = Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        b.exit_time = Some(Utc.timestamp_opt(1_700_000_180, 0).unwrap());
        let c = trade("c", dec!(1), dec!(1));

        let s = compute_summary(&[a, b, c]);
        assert_eq!(s.average_holding_period, Duration::from_secs(120));
    }

    #[test]
    fn extreme_magnitudes_do_not_panic() {
        // gross_win / gross_loss = 1e30, past the Decimal range.
        let tiny_loss = Decimal::from_i128_with_scale(-1, 20);
        let trades = vec![trade("a", dec!(10000000000), dec!(5)), trade("b", tiny_loss, dec!(-1))];
        let s = compute_summary(&trades);

        assert_eq!(s.n, 2);
        assert_eq!(s.wins, 1);
        assert_eq!(s.losses, 1);
        assert_eq!(s.profit_factor, Decimal::ZERO);
        assert_eq!(s.rr, dec!(5));
    }

    #[test]
    fn sums_saturate_instead_of_overflowing() {
        let trades = vec![
            trade("a", Decimal::MAX, Decimal::MAX),
            trade("b", Decimal::MAX, Decimal::MAX),
            trade("c", Decimal::MIN, Decimal::MIN),
        ];
        let s = compute_summary(&trades);

        assert_eq!(s.gross_win, Decimal::MAX);
        assert_eq!(s.gross_loss, Decimal::MAX);
        assert_eq!(s.profit_factor, Decimal::ONE);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let trades = vec![trade("a", dec!(7), dec!(3)), trade("b", dec!(-2), dec!(-1))];
        assert_eq!(compute_summary(&trades), compute_summary(&trades));
    }
}
