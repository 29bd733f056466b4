use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Decision-grade statistics for one set of trades.
///
/// A `Summary` is a value object: it is recomputed from scratch on every call and
/// never patched in place. Every field is zero for an empty input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    // I. Counts
    /// Total trades, including break-even ones.
    pub n: usize,
    pub wins: usize,
    pub losses: usize,

    // II. Rates
    /// Fraction of trades that won, 0..=1. Break-even trades count in the denominator.
    pub win_rate: Decimal,

    // III. Magnitudes
    pub avg_win_pct: Decimal,
    pub avg_loss_pct: Decimal,
    pub avg_win_usd: Decimal,
    /// Mean dollar P&L of losing trades. Negative.
    pub avg_loss_usd: Decimal,
    pub gross_win: Decimal,
    /// Absolute value of summed losing P&L. Never negative.
    pub gross_loss: Decimal,

    // IV. Composites
    /// Zero when there are no losses. Display layers that want "undefined" must
    /// check `gross_loss == 0` themselves.
    pub profit_factor: Decimal,
    /// Expected percent return per trade.
    pub expectancy: Decimal,
    pub rr: Decimal,
    pub edge_score: Decimal,

    // V. Totals
    pub total_pnl: Decimal,
    pub avg_return: Decimal,
    pub avg_return_usd: Decimal,

    // VI. Time-Based Metrics
    #[serde(with = "humantime_serde")]
    pub average_holding_period: Duration,
}

impl Summary {
    /// Creates a new, zeroed-out Summary.
    pub fn new() -> Self {
        Self {
            n: 0,
            wins: 0,
            losses: 0,
            win_rate: Decimal::ZERO,
            avg_win_pct: Decimal::ZERO,
            avg_loss_pct: Decimal::ZERO,
            avg_win_usd: Decimal::ZERO,
            avg_loss_usd: Decimal::ZERO,
            gross_win: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            profit_factor: Decimal::ZERO,
            expectancy: Decimal::ZERO,
            rr: Decimal::ZERO,
            edge_score: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            avg_return: Decimal::ZERO,
            avg_return_usd: Decimal::ZERO,
            average_holding_period: Duration::ZERO,
        }
    }

    /// Win rate on a 0..=100 scale.
    pub fn win_rate_pct(&self) -> Decimal {
        self.win_rate * Decimal::ONE_HUNDRED
    }

    /// Trades that were neither wins nor losses.
    pub fn break_even(&self) -> usize {
        self.n - self.wins - self.losses
    }
}

impl Default for Summary {
    fn default() -> Self {
        Self::new()
    }
}
