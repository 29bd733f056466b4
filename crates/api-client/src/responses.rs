use rust_decimal::Decimal;
use serde::Deserialize;

// Using `#[serde(rename_all = "camelCase")]` to automatically map from JSON camelCase to Rust snake_case.

// --- Simulator ---

/// The response from `GET {simulator}/prices?addresses=...`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatedPricesResponse {
    #[serde(default)]
    pub prices: Vec<SimulatedPrice>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedPrice {
    pub token_address: String,
    pub price: Decimal,
}

// --- Live agent ---

/// A single open position reported by a live agent's `GET /positions`.
///
/// Agents identify positions either by token address or by the trade id they were
/// opened with; at least one of the two is expected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPosition {
    #[serde(default, alias = "tradeId")]
    pub id: Option<String>,
    #[serde(default)]
    pub token_address: Option<String>,
    pub current_price: Decimal,
}

/// Agents answer with either a bare array or `{ "positions": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum PositionsPayload {
    Wrapped { positions: Vec<AgentPosition> },
    Bare(Vec<AgentPosition>),
}

impl PositionsPayload {
    pub(crate) fn into_positions(self) -> Vec<AgentPosition> {
        match self {
            PositionsPayload::Wrapped { positions } => positions,
            PositionsPayload::Bare(positions) => positions,
        }
    }
}

// --- Public market data ---

/// The response from `GET {market_data}/latest/dex/tokens/{address}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPairsResponse {
    /// `null` when the token has no listed pairs.
    #[serde(default)]
    pub pairs: Option<Vec<PairQuote>>,
}

/// One trading pair quoting the requested token.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairQuote {
    #[serde(default)]
    pub price_usd: Option<Decimal>,
    #[serde(default)]
    pub liquidity: Option<Liquidity>,
    #[serde(default)]
    pub base_token: Option<PairToken>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Liquidity {
    #[serde(default)]
    pub usd: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairToken {
    pub address: String,
}

impl PairQuote {
    pub fn liquidity_usd(&self) -> Decimal {
        self.liquidity
            .as_ref()
            .and_then(|l| l.usd)
            .unwrap_or(Decimal::ZERO)
    }

    fn is_base(&self, token_address: &str) -> bool {
        self.base_token
            .as_ref()
            .is_some_and(|t| t.address.eq_ignore_ascii_case(token_address))
    }
}

/// Price of the most liquid priced pair for `token_address`.
///
/// Pairs where the token is the base asset are preferred, since only their
/// `priceUsd` is the token's own price. Pairs without a positive price are ignored.
pub fn best_pair_price(pairs: &[PairQuote], token_address: &str) -> Option<Decimal> {
    let priced = || {
        pairs
            .iter()
            .filter(|p| p.price_usd.is_some_and(|price| price > Decimal::ZERO))
    };

    let has_base = priced().any(|p| p.is_base(token_address));

    priced()
        .filter(|p| !has_base || p.is_base(token_address))
        .max_by(|a, b| a.liquidity_usd().cmp(&b.liquidity_usd()))
        .and_then(|p| p.price_usd)
}
