//! # Edgeboard API Client
//!
//! Async interfaces to the three external price sources used by the live price
//! reconciler, plus their HTTP implementations:
//!
//! - `SimulatorClient`: the market simulator that prices simulated agents' trades.
//! - `AgentClient`: a connected live agent's own positions endpoint.
//! - `MarketDataClient`: a public market-data service queried by token address.
//!
//! The engine only ever sees the traits, so tests substitute in-memory fakes.

use crate::error::ApiError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

pub mod clients;
pub mod error;
pub mod responses;

// --- Public API ---
pub use clients::{AgentHttpClient, MarketDataHttpClient, SimulatorHttpClient};
pub use responses::{AgentPosition, PairQuote, best_pair_price};

#[async_trait]
pub trait SimulatorClient: Send + Sync {
    /// Current simulated prices keyed by token address. Addresses the simulator
    /// does not know are simply absent from the map.
    async fn get_prices(&self, token_addresses: &[String]) -> Result<HashMap<String, Decimal>, ApiError>;
}

#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Id of the agent behind this client.
    fn agent_id(&self) -> &str;

    /// All positions the agent currently holds open.
    async fn get_positions(&self) -> Result<Vec<AgentPosition>, ApiError>;
}

#[async_trait]
pub trait MarketDataClient: Send + Sync {
    /// Every trading pair listing `token_address`.
    async fn get_token_pairs(&self, token_address: &str) -> Result<Vec<PairQuote>, ApiError>;
}

/// Issues a GET and decodes a JSON body, turning non-2xx answers into `ApiError::Status`.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, ApiError> {
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    let text = response.text().await?;
    tracing::debug!(url, status = status.as_u16(), bytes = text.len(), "GET completed");

    if status.is_success() {
        serde_json::from_str::<T>(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            body: text,
        })
    }
}
