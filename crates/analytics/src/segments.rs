use crate::engine::summarize;
use crate::report::Summary;
use core_types::{Trade, dedupe_latest};
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Key used for trades that carry no value for the grouped dimension.
pub const UNKNOWN_KEY: &str = "?";

/// The metric segments are ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMetric {
    #[default]
    Expectancy,
    AvgReturn,
    EdgeScore,
    WinRate,
    ProfitFactor,
    TotalPnl,
    TradeCount,
    /// Group key only.
    Key,
}

impl SortMetric {
    fn value(&self, summary: &Summary) -> Decimal {
        match self {
            SortMetric::Expectancy => summary.expectancy,
            SortMetric::AvgReturn => summary.avg_return,
            SortMetric::EdgeScore => summary.edge_score,
            SortMetric::WinRate => summary.win_rate,
            SortMetric::ProfitFactor => summary.profit_factor,
            SortMetric::TotalPnl => summary.total_pnl,
            SortMetric::TradeCount => Decimal::from(summary.n),
            SortMetric::Key => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Groups with fewer trades are left out of the result. They still count in
    /// the ungrouped total, which callers compute separately.
    pub min_samples: usize,
    pub sort_by: SortMetric,
    pub descending: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            min_samples: 1,
            sort_by: SortMetric::Expectancy,
            descending: true,
        }
    }
}

impl AggregateOptions {
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn sorted_by(mut self, sort_by: SortMetric, descending: bool) -> Self {
        self.sort_by = sort_by;
        self.descending = descending;
        self
    }
}

/// A subset of trades sharing one dimension value, with its own statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment<K> {
    pub key: K,
    pub summary: Summary,
}

/// Groups `trades` by `key_fn`, summarizes each group and ranks the groups.
///
/// Ties on the sort metric are broken by key ascending so the order is deterministic.
pub fn aggregate_by<K, F>(trades: &[Trade], key_fn: F, options: &AggregateOptions) -> Vec<Segment<K>>
where
    K: Ord,
    F: Fn(&Trade) -> K,
{
    let mut groups: BTreeMap<K, Vec<&Trade>> = BTreeMap::new();
    for trade in dedupe_latest(trades) {
        groups.entry(key_fn(trade)).or_default().push(trade);
    }

    let mut segments: Vec<Segment<K>> = groups
        .into_iter()
        .filter(|(_, group)| group.len() >= options.min_samples)
        .map(|(key, group)| Segment {
            key,
            summary: summarize(&group),
        })
        .collect();

    segments.sort_by(|a, b| compare_segments(a, b, options));
    segments
}

fn compare_segments<K: Ord>(a: &Segment<K>, b: &Segment<K>, options: &AggregateOptions) -> Ordering {
    let (va, vb) = (options.sort_by.value(&a.summary), options.sort_by.value(&b.summary));
    let by_metric = if options.descending { vb.cmp(&va) } else { va.cmp(&vb) };

    match options.sort_by {
        SortMetric::Key if options.descending => b.key.cmp(&a.key),
        SortMetric::Key => a.key.cmp(&b.key),
        _ => by_metric.then_with(|| a.key.cmp(&b.key)),
    }
}

// --- Key functions ---

pub fn agent_key(trade: &Trade) -> String {
    non_empty_or_unknown(Some(trade.agent_id.as_str()))
}

pub fn signal_type_key(trade: &Trade) -> String {
    non_empty_or_unknown(trade.signal_type.as_deref())
}

/// `None` plays the role of the unknown key and sorts before every strength.
pub fn signal_strength_key(trade: &Trade) -> Option<u32> {
    trade.signal_strength
}

pub fn strength_label(strength: Option<u32>) -> String {
    strength.map_or_else(|| UNKNOWN_KEY.to_string(), |s| s.to_string())
}

fn non_empty_or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN_KEY.to_string(),
    }
}

pub fn by_agent(trades: &[Trade], options: &AggregateOptions) -> Vec<Segment<String>> {
    aggregate_by(trades, agent_key, options)
}

pub fn by_signal_type(trades: &[Trade], options: &AggregateOptions) -> Vec<Segment<String>> {
    aggregate_by(trades, signal_type_key, options)
}

// --- Signal strength ---

/// Average win and loss percentages of a group and their ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskReward {
    pub avg_win_pct: Decimal,
    pub avg_loss_pct: Decimal,
    pub rr: Decimal,
}

impl From<&Summary> for RiskReward {
    fn from(summary: &Summary) -> Self {
        Self {
            avg_win_pct: summary.avg_win_pct,
            avg_loss_pct: summary.avg_loss_pct,
            rr: summary.rr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrengthSegment {
    pub strength: Option<u32>,
    pub summary: Summary,
    pub risk_reward: RiskReward,
}

/// Breakdown by signal strength, ordered from unknown, then weakest to strongest.
pub fn aggregate_by_signal_strength(trades: &[Trade], min_samples: usize) -> Vec<StrengthSegment> {
    let options = AggregateOptions::default()
        .with_min_samples(min_samples)
        .sorted_by(SortMetric::Key, false);

    aggregate_by(trades, signal_strength_key, &options)
        .into_iter()
        .map(|segment| StrengthSegment {
            strength: segment.key,
            risk_reward: RiskReward::from(&segment.summary),
            summary: segment.summary,
        })
        .collect()
}

// --- Cross tabulation ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossCell<R, C> {
    pub row: R,
    pub column: C,
    pub summary: Summary,
}

/// Two-dimensional breakdown, e.g. agent x signal type.
///
/// Cells below `options.min_samples` are dropped; single-trade cells are usually noise.
pub fn cross_tabulate<R, C, FR, FC>(
    trades: &[Trade],
    row_fn: FR,
    column_fn: FC,
    options: &AggregateOptions,
) -> Vec<CrossCell<R, C>>
where
    R: Ord,
    C: Ord,
    FR: Fn(&Trade) -> R,
    FC: Fn(&Trade) -> C,
{
    aggregate_by(trades, |t| (row_fn(t), column_fn(t)), options)
        .into_iter()
        .map(|segment| {
            let (row, column) = segment.key;
            CrossCell {
                row,
                column,
                summary: segment.summary,
            }
        })
        .collect()
}
