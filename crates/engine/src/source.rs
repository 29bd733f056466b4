use crate::error::EngineError;
use async_trait::async_trait;
use core_types::Trade;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;

/// One provider of current prices for open trades.
///
/// Sources are registered with the reconciler in priority order; the position in that
/// list is the source's rank (0 is the most trusted). A source is only ever handed
/// trades for which `is_candidate` holds and no higher-ranked source holds a fresh
/// quote.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Time between two polling cycles.
    fn interval(&self) -> Duration;

    fn is_candidate(&self, trade: &Trade) -> bool;

    /// Whether an external "new scan" notification should trigger an extra cycle.
    fn follows_scan_events(&self) -> bool {
        false
    }

    /// Fetches prices for `trades`, keyed by trade id. Trades the source could not
    /// price are simply absent.
    async fn try_fetch(&self, trades: &[Trade]) -> Result<HashMap<String, Decimal>, EngineError>;
}

/// Distinct non-empty token addresses of `trades`, in first-seen order.
pub(crate) fn distinct_addresses(trades: &[Trade]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    trades
        .iter()
        .map(|t| t.token_address.trim())
        .filter(|a| !a.is_empty())
        .filter(|a| seen.insert(a.to_ascii_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Spreads per-address prices back onto the trades holding those tokens.
pub(crate) fn prices_by_trade(
    trades: &[Trade],
    by_address: &HashMap<String, Decimal>,
) -> HashMap<String, Decimal> {
    let lowered: HashMap<String, Decimal> = by_address
        .iter()
        .map(|(address, price)| (address.to_ascii_lowercase(), *price))
        .collect();

    trades
        .iter()
        .filter_map(|t| {
            lowered
                .get(&t.token_address.trim().to_ascii_lowercase())
                .map(|price| (t.id.clone(), *price))
        })
        .collect()
}
