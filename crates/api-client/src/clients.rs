use crate::error::ApiError;
use crate::responses::{PositionsPayload, SimulatedPricesResponse, TokenPairsResponse};
use crate::{AgentClient, AgentPosition, MarketDataClient, PairQuote, SimulatorClient, get_json};
use async_trait::async_trait;
use configuration::{ApiConfig, LiveAgentConfig};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;

fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// HTTP client for the market simulator.
#[derive(Clone)]
pub struct SimulatorHttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl SimulatorHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: trim_base(base_url),
        })
    }

    pub fn from_config(api: &ApiConfig, timeout: Duration) -> Result<Self, ApiError> {
        Self::new(&api.simulator_url, timeout)
    }
}

#[async_trait]
impl SimulatorClient for SimulatorHttpClient {
    async fn get_prices(&self, token_addresses: &[String]) -> Result<HashMap<String, Decimal>, ApiError> {
        let url = format!("{}/prices", self.base_url);
        let response: SimulatedPricesResponse =
            get_json(&self.client, &url, &[("addresses", token_addresses.join(","))]).await?;

        Ok(response
            .prices
            .into_iter()
            .map(|p| (p.token_address, p.price))
            .collect())
    }
}

/// HTTP client for a connected live agent.
#[derive(Clone)]
pub struct AgentHttpClient {
    client: reqwest::Client,
    agent_id: String,
    base_url: String,
}

impl AgentHttpClient {
    pub fn new(agent: &LiveAgentConfig, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            agent_id: agent.agent_id.clone(),
            base_url: trim_base(&agent.base_url),
        })
    }
}

#[async_trait]
impl AgentClient for AgentHttpClient {
    fn agent_id(&self) -> &str {
        &self.agent_id
    }

    async fn get_positions(&self) -> Result<Vec<AgentPosition>, ApiError> {
        let url = format!("{}/positions", self.base_url);
        let payload: PositionsPayload = get_json(&self.client, &url, &[]).await?;
        Ok(payload.into_positions())
    }
}

/// HTTP client for the public market-data service.
#[derive(Clone)]
pub struct MarketDataHttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl MarketDataHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: trim_base(base_url),
        })
    }

    pub fn from_config(api: &ApiConfig, timeout: Duration) -> Result<Self, ApiError> {
        Self::new(&api.market_data_url, timeout)
    }
}

#[async_trait]
impl MarketDataClient for MarketDataHttpClient {
    async fn get_token_pairs(&self, token_address: &str) -> Result<Vec<PairQuote>, ApiError> {
        if token_address.is_empty() {
            return Err(ApiError::InvalidData("empty token address".to_string()));
        }
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, token_address);
        let response: TokenPairsResponse = get_json(&self.client, &url, &[]).await?;
        Ok(response.pairs.unwrap_or_default())
    }
}
