use crate::engine::ratio;
use chrono::{DateTime, Utc};
use core_types::{Trade, dedupe_latest};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// One step of a cumulative-P&L curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    /// 0-based position in the curve.
    pub sequence_index: usize,
    pub trade_id: String,
    pub timestamp: DateTime<Utc>,
    /// P&L contributed by this trade.
    pub pnl: Decimal,
    /// Balance after this trade, starting from the curve's baseline.
    pub cumulative_pnl: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EquityCurveOptions {
    /// Balance the curve starts from, e.g. a configured starting balance.
    pub baseline: Decimal,
    /// Per-period risk-free return used by `compute_risk_metrics`.
    pub risk_free_rate: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Drawdown {
    /// Largest peak-to-trough drop in dollars. Never negative.
    pub max_drawdown: Decimal,
    /// The same drop as a percentage of the peak it fell from.
    pub max_drawdown_percent: Decimal,
}

/// Consecutive win/loss run lengths. Winning runs are positive, losing runs negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Streaks {
    pub current: i64,
    pub best: i64,
    pub worst: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RiskMetrics {
    pub drawdown: Drawdown,
    pub streaks: Streaks,
    pub sharpe_ratio: Decimal,
}

/// Closed trades in chronological order. The sort is stable, so trades sharing a
/// timestamp keep their input order.
fn chronological_closed(trades: &[Trade]) -> Vec<&Trade> {
    let mut closed: Vec<&Trade> = dedupe_latest(trades)
        .into_iter()
        .filter(|t| t.is_closed())
        .collect();
    closed.sort_by_key(|t| t.sort_time());
    closed
}

fn accumulate<'a>(trades: impl IntoIterator<Item = &'a Trade>, baseline: Decimal) -> Vec<EquityPoint> {
    let mut balance = baseline;
    trades
        .into_iter()
        .enumerate()
        .map(|(sequence_index, trade)| {
            balance = balance.saturating_add(trade.pnl_usd);
            EquityPoint {
                sequence_index,
                trade_id: trade.id.clone(),
                timestamp: trade.sort_time(),
                pnl: trade.pnl_usd,
                cumulative_pnl: balance,
            }
        })
        .collect()
}

/// Builds the global equity curve: one point per closed trade.
pub fn build_equity_curve(trades: &[Trade], options: &EquityCurveOptions) -> Vec<EquityPoint> {
    accumulate(chronological_closed(trades), options.baseline)
}

/// Builds one curve per agent in `agents`.
///
/// Each agent keeps its own running total. Trades from agents not in `agents` are
/// skipped rather than pooled, so no agent's curve picks up another's P&L.
pub fn build_agent_equity_curves(
    trades: &[Trade],
    agents: &[String],
    options: &EquityCurveOptions,
) -> BTreeMap<String, Vec<EquityPoint>> {
    let mut per_agent: HashMap<&str, Vec<&Trade>> =
        agents.iter().map(|a| (a.as_str(), Vec::new())).collect();

    for trade in chronological_closed(trades) {
        match per_agent.get_mut(trade.agent_id.as_str()) {
            Some(bucket) => bucket.push(trade),
            None => tracing::trace!(trade_id = %trade.id, agent = %trade.agent_id, "Skipping trade from agent outside view"),
        }
    }

    per_agent
        .into_iter()
        .map(|(agent, bucket)| (agent.to_string(), accumulate(bucket, options.baseline)))
        .collect()
}

/// Largest peak-to-trough decline of a curve.
///
/// The running peak starts at the balance before the first point, so a curve that
/// opens with a loss already has a drawdown. The percentage is taken relative to the
/// peak at the time of the largest dollar drop; it is zero when that peak is not
/// positive.
pub fn compute_drawdown(curve: &[EquityPoint]) -> Drawdown {
    let Some(first) = curve.first() else {
        return Drawdown::default();
    };

    let mut peak = first.cumulative_pnl.saturating_sub(first.pnl);
    let mut result = Drawdown::default();

    for point in curve {
        if point.cumulative_pnl > peak {
            peak = point.cumulative_pnl;
        }
        let decline = peak.saturating_sub(point.cumulative_pnl);
        if decline > result.max_drawdown {
            result.max_drawdown = decline;
            result.max_drawdown_percent = if peak > Decimal::ZERO {
                ratio(decline, peak).saturating_mul(Decimal::ONE_HUNDRED)
            } else {
                Decimal::ZERO
            };
        }
    }

    result
}

/// Win/loss streaks over closed trades in chronological order.
///
/// Break-even trades neither extend nor reset a streak.
pub fn compute_streaks(trades: &[Trade]) -> Streaks {
    let mut streaks = Streaks::default();

    for trade in chronological_closed(trades) {
        let pnl = trade.pnl_usd;
        if pnl > Decimal::ZERO {
            streaks.current = if streaks.current > 0 { streaks.current + 1 } else { 1 };
        } else if pnl < Decimal::ZERO {
            streaks.current = if streaks.current < 0 { streaks.current - 1 } else { -1 };
        } else {
            continue;
        }
        streaks.best = streaks.best.max(streaks.current);
        streaks.worst = streaks.worst.min(streaks.current);
    }

    streaks
}

/// Mean excess return divided by the sample standard deviation of returns.
///
/// Returns zero for fewer than two observations or zero variance.
pub fn sharpe_ratio(returns: &[Decimal], risk_free_rate: Decimal) -> Decimal {
    if returns.len() < 2 {
        return Decimal::ZERO;
    }

    let count = Decimal::from(returns.len());
    let sum = returns.iter().fold(Decimal::ZERO, |acc, r| acc.saturating_add(*r));
    let mean = ratio(sum, count);

    let squares = returns.iter().fold(Decimal::ZERO, |acc, r| {
        let deviation = r.saturating_sub(mean);
        acc.saturating_add(deviation.saturating_mul(deviation))
    });
    let variance = ratio(squares, count - Decimal::ONE);

    if variance <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    match variance.sqrt() {
        Some(std_dev) if std_dev > Decimal::ZERO => ratio(mean.saturating_sub(risk_free_rate), std_dev),
        _ => Decimal::ZERO,
    }
}

/// Drawdown, streaks and the per-trade Sharpe ratio of the global curve.
pub fn compute_risk_metrics(trades: &[Trade], options: &EquityCurveOptions) -> RiskMetrics {
    let curve = build_equity_curve(trades, options);
    let returns: Vec<Decimal> = chronological_closed(trades)
        .iter()
        .map(|t| t.pnl_percent)
        .collect();

    RiskMetrics {
        drawdown: compute_drawdown(&curve),
        streaks: compute_streaks(trades),
        sharpe_ratio: sharpe_ratio(&returns, options.risk_free_rate),
    }
}
