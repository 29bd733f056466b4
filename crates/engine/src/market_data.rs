use crate::error::EngineError;
use crate::source::{PriceSource, distinct_addresses, prices_by_trade};
use api_client::{MarketDataClient, best_pair_price};
use async_trait::async_trait;
use core_types::Trade;
use futures::future::join_all;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Last-resort pricing from a public market-data service, one query per token.
///
/// The service is rate limited, so each cycle queries at most `batch_size` distinct
/// tokens. A rotating cursor makes sure a long tail of unpriced trades is eventually
/// covered instead of the same first few tokens being queried every time.
pub struct MarketDataSource {
    client: Arc<dyn MarketDataClient>,
    interval: Duration,
    batch_size: usize,
    cursor: Mutex<usize>,
}

impl MarketDataSource {
    pub fn new(client: Arc<dyn MarketDataClient>, interval: Duration, batch_size: usize) -> Self {
        Self {
            client,
            interval,
            batch_size: batch_size.max(1),
            cursor: Mutex::new(0),
        }
    }

    /// The next window of addresses and where it starts. The cursor only moves in
    /// `advance_past`, once the window has been answered.
    fn next_batch(&self, addresses: &[String]) -> (usize, Vec<String>) {
        if addresses.len() <= self.batch_size {
            return (0, addresses.to_vec());
        }
        let start = *self.cursor.lock() % addresses.len();
        let batch = addresses
            .iter()
            .cycle()
            .skip(start)
            .take(self.batch_size)
            .cloned()
            .collect();
        (start, batch)
    }

    fn advance_past(&self, start: usize, total: usize) {
        if total > self.batch_size {
            *self.cursor.lock() = (start + self.batch_size) % total;
        }
    }
}

#[async_trait]
impl PriceSource for MarketDataSource {
    fn name(&self) -> &'static str {
        "market-data"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn is_candidate(&self, trade: &Trade) -> bool {
        !trade.token_address.trim().is_empty()
    }

    async fn try_fetch(&self, trades: &[Trade]) -> Result<HashMap<String, Decimal>, EngineError> {
        let addresses = distinct_addresses(trades);
        let (start, batch) = self.next_batch(&addresses);
        if batch.is_empty() {
            return Ok(HashMap::new());
        }

        let lookups = batch.iter().map(|address| async move {
            let pairs = self.client.get_token_pairs(address).await;
            (address, pairs)
        });

        let mut by_address = HashMap::new();
        let mut first_error = None;
        let mut failures = 0usize;
        for (address, result) in join_all(lookups).await {
            match result {
                Ok(pairs) => {
                    if let Some(price) = best_pair_price(&pairs, address) {
                        by_address.insert(address.clone(), price);
                    }
                }
                Err(e) => {
                    debug!(token = %address, error = %e, "Market data lookup failed");
                    failures += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        // Partial answers still count; only a batch where every lookup failed is an error
        // and gets retried next cycle.
        if failures == batch.len() {
            if let Some(e) = first_error {
                return Err(e.into());
            }
        }
        self.advance_past(start, addresses.len());
        Ok(prices_by_trade(trades, &by_address))
    }
}
