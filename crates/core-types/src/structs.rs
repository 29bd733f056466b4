use crate::enums::{OrderSide, TradeMode, TradeStatus};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single normalized trade record as handed to the core by the ingestion layer.
///
/// Numeric fields that are absent in the source record deserialize as zero so that
/// every computation downstream stays total over partially populated records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    // --- Identity ---
    pub id: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub mode: TradeMode,

    // --- Execution facts ---
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub token_address: String,
    #[serde(default)]
    pub entry_price: Decimal,
    /// Absent (or zero) while the position is still open.
    #[serde(default)]
    pub exit_price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub side: OrderSide,

    // --- Outcome ---
    /// Signed dollar P&L. Realized for closed trades, unrealized for open ones.
    #[serde(default)]
    pub pnl_usd: Decimal,
    /// Signed percent change. Agrees with `pnl_usd` in sign only.
    #[serde(default)]
    pub pnl_percent: Decimal,
    pub status: TradeStatus,
    /// Mark-to-market price of an open position, written only by the analytics layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Decimal>,

    // --- Signal context ---
    #[serde(default)]
    pub signal_type: Option<String>,
    #[serde(default)]
    pub signal_strength: Option<u32>,
    #[serde(default)]
    pub signal_id: Option<String>,

    // --- Timing ---
    #[serde(default)]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub entry_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exit_time: Option<DateTime<Utc>>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// The best available instant for chronological ordering.
    pub fn sort_time(&self) -> DateTime<Utc> {
        self.exit_time.unwrap_or(self.timestamp)
    }

    /// Time between entry and exit, when both are known and correctly ordered.
    pub fn holding_period(&self) -> Option<Duration> {
        match (self.entry_time, self.exit_time) {
            (Some(entry), Some(exit)) if exit >= entry => Some(exit - entry),
            _ => None,
        }
    }
}

/// Collapses records sharing an `id` so that the last occurrence wins.
///
/// The result keeps the position at which each id was first seen, which keeps the
/// output stable across refreshes that only update existing records.
pub fn dedupe_latest(trades: &[Trade]) -> Vec<&Trade> {
    let mut slots: HashMap<&str, usize> = HashMap::with_capacity(trades.len());
    let mut out: Vec<&Trade> = Vec::with_capacity(trades.len());

    for trade in trades {
        match slots.get(trade.id.as_str()) {
            Some(&slot) => out[slot] = trade,
            None => {
                slots.insert(trade.id.as_str(), out.len());
                out.push(trade);
            }
        }
    }

    out
}

/// The most recently accepted price for one open trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub trade_id: String,
    pub price: Decimal,
    /// Position of the producing source in the priority cascade. Lower wins.
    pub source_rank: u8,
    pub fetched_at: DateTime<Utc>,
}

/// Read access to current prices keyed by trade id.
///
/// A missing entry is not an error: readers fall back to the entry price.
pub trait PriceLookup {
    fn current_price(&self, trade_id: &str) -> Option<Decimal>;
}

impl PriceLookup for HashMap<String, Decimal> {
    fn current_price(&self, trade_id: &str) -> Option<Decimal> {
        self.get(trade_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn trade(id: &str, pnl: Decimal) -> Trade {
        Trade {
            id: id.to_string(),
            agent_id: "alpha".to_string(),
            mode: TradeMode::Live,
            token: "SOL".to_string(),
            token_address: "So111".to_string(),
            entry_price: dec!(10),
            exit_price: None,
            quantity: dec!(1),
            side: OrderSide::Buy,
            pnl_usd: pnl,
            pnl_percent: Decimal::ZERO,
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
    fn dedupe_keeps_last_write_at_first_position() {
        let trades = vec![trade("a", dec!(1)), trade("b", dec!(2)), trade("a", dec!(3))];
        let deduped = dedupe_latest(&trades);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].id, "a");
        assert_eq!(deduped[0].pnl_usd, dec!(3));
        assert_eq!(deduped[1].id, "b");
    }

    #[test]
    fn sort_time_prefers_exit_time() {
        let mut t = trade("a", dec!(1));
        assert_eq!(t.sort_time(), t.timestamp);

        let exit = Utc.timestamp_opt(1_700_000_500, 0).unwrap();
        t.exit_time = Some(exit);
        assert_eq!(t.sort_time(), exit);
    }

    #[test]
    fn holding_period_requires_ordered_bounds() {
        let mut t = trade("a", dec!(1));
        t.entry_time = Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        t.exit_time = Some(Utc.timestamp_opt(1_700_003_600, 0).unwrap());
        assert_eq!(t.holding_period(), Some(Duration::hours(1)));

        t.exit_time = Some(Utc.timestamp_opt(1_600_000_000, 0).unwrap());
        assert_eq!(t.holding_period(), None);
    }

    #[test]
    fn sparse_record_deserializes_with_zeroed_numerics() {
        let json = r#"{ "id": "t-1", "status": "OPEN", "agentId": "alpha" }"#;
        let t: Trade = serde_json::from_str(json).unwrap();

        assert_eq!(t.pnl_usd, Decimal::ZERO);
        assert_eq!(t.entry_price, Decimal::ZERO);
        assert!(t.is_open());
        assert_eq!(t.mode, TradeMode::Live);
    }
}
