use crate::error::EngineError;
use crate::source::{PriceSource, distinct_addresses, prices_by_trade};
use api_client::SimulatorClient;
use async_trait::async_trait;
use core_types::{Trade, TradeMode};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Prices simulated agents' trades from the market simulator.
pub struct SimulatedMarketSource {
    client: Arc<dyn SimulatorClient>,
    interval: Duration,
}

impl SimulatedMarketSource {
    pub fn new(client: Arc<dyn SimulatorClient>, interval: Duration) -> Self {
        Self { client, interval }
    }
}

#[async_trait]
impl PriceSource for SimulatedMarketSource {
    fn name(&self) -> &'static str {
        "simulator"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn is_candidate(&self, trade: &Trade) -> bool {
        trade.mode == TradeMode::Simulation && !trade.token_address.trim().is_empty()
    }

    fn follows_scan_events(&self) -> bool {
        true
    }

    async fn try_fetch(&self, trades: &[Trade]) -> Result<HashMap<String, Decimal>, EngineError> {
        let addresses = distinct_addresses(trades);
        if addresses.is_empty() {
            return Ok(HashMap::new());
        }
        let by_address = self.client.get_prices(&addresses).await?;
        Ok(prices_by_trade(trades, &by_address))
    }
}
