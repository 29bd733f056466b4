use crate::error::EngineError;
use crate::source::PriceSource;
use api_client::{AgentClient, AgentPosition};
use async_trait::async_trait;
use core_types::{Trade, TradeMode};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Prices the connected live agent's trades from the agent's own positions.
pub struct LiveAgentSource {
    client: Arc<dyn AgentClient>,
    interval: Duration,
}

impl LiveAgentSource {
    pub fn new(client: Arc<dyn AgentClient>, interval: Duration) -> Self {
        Self { client, interval }
    }
}

#[async_trait]
impl PriceSource for LiveAgentSource {
    fn name(&self) -> &'static str {
        "live-agent"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn is_candidate(&self, trade: &Trade) -> bool {
        trade.mode == TradeMode::Live && trade.agent_id == self.client.agent_id()
    }

    async fn try_fetch(&self, trades: &[Trade]) -> Result<HashMap<String, Decimal>, EngineError> {
        let positions = self.client.get_positions().await?;
        Ok(match_positions(trades, &positions))
    }
}

/// Matches each trade to a position by token address first, then by trade id.
fn match_positions(trades: &[Trade], positions: &[AgentPosition]) -> HashMap<String, Decimal> {
    let mut by_address = HashMap::new();
    let mut by_id = HashMap::new();
    for position in positions.iter().filter(|p| p.current_price > Decimal::ZERO) {
        if let Some(address) = position.token_address.as_deref() {
            by_address.insert(address.trim().to_ascii_lowercase(), position.current_price);
        }
        if let Some(id) = position.id.as_deref() {
            by_id.insert(id.to_string(), position.current_price);
        }
    }

    trades
        .iter()
        .filter_map(|t| {
            by_address
                .get(&t.token_address.trim().to_ascii_lowercase())
                .or_else(|| by_id.get(&t.id))
                .map(|price| (t.id.clone(), *price))
        })
        .collect()
}
