use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analytics: AnalyticsConfig,
    pub reconciler: ReconcilerConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Rejects settings that would make the reconciler spin or never fetch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.reconciler;
        let intervals = [
            ("simulated_interval_ms", r.simulated_interval_ms),
            ("live_agent_interval_ms", r.live_agent_interval_ms),
            ("market_data_interval_ms", r.market_data_interval_ms),
            ("request_timeout_ms", r.request_timeout_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "reconciler.{name} must be greater than zero"
                )));
            }
        }
        if r.market_data_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "reconciler.market_data_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.analytics.starting_balance.is_sign_negative() {
            return Err(ConfigError::ValidationError(
                "analytics.starting_balance cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters for the statistics views.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Baseline the equity curve starts from.
    pub starting_balance: Decimal,
    /// Per-period risk-free return subtracted before computing the Sharpe ratio,
    /// in the same percent unit as `pnl_percent`.
    pub risk_free_rate: Decimal,
    /// Groups smaller than this are dropped from the agent x signal type cross-tab.
    pub cross_tab_min_samples: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::ZERO,
            risk_free_rate: Decimal::ZERO,
            cross_tab_min_samples: 3,
        }
    }
}

/// Cadence and limits of the live price reconciler.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Master switch. When false no source issues any request.
    pub enabled: bool,
    pub simulated_interval_ms: u64,
    pub live_agent_interval_ms: u64,
    pub market_data_interval_ms: u64,
    /// Distinct token addresses queried per market-data cycle.
    pub market_data_batch_size: usize,
    pub request_timeout_ms: u64,
    /// How long a quote from a higher-priority source shields a trade from
    /// being overwritten by a lower-priority one.
    pub priority_window_ms: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            simulated_interval_ms: 2_000,
            live_agent_interval_ms: 5_000,
            market_data_interval_ms: 30_000,
            market_data_batch_size: 5,
            request_timeout_ms: 8_000,
            priority_window_ms: 60_000,
        }
    }
}

impl ReconcilerConfig {
    pub fn simulated_interval(&self) -> Duration {
        Duration::from_millis(self.simulated_interval_ms)
    }

    pub fn live_agent_interval(&self) -> Duration {
        Duration::from_millis(self.live_agent_interval_ms)
    }

    pub fn market_data_interval(&self) -> Duration {
        Duration::from_millis(self.market_data_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn priority_window(&self) -> Duration {
        Duration::from_millis(self.priority_window_ms)
    }
}

/// Endpoints of the external price interfaces.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the market simulator that prices simulated agents' trades.
    pub simulator_url: String,
    /// The connected live agent, if any. Without one the live-agent source stays idle.
    pub live_agent: Option<LiveAgentConfig>,
    /// Base URL of the public market-data service used as the last resort.
    pub market_data_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            simulator_url: "http://127.0.0.1:8787".to_string(),
            live_agent: None,
            market_data_url: "https://api.dexscreener.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveAgentConfig {
    pub agent_id: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set.
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}
