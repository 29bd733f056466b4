use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_logging;
pub use settings::{
    AnalyticsConfig, ApiConfig, Config, LiveAgentConfig, LoggingConfig, ReconcilerConfig,
};

/// Prefix for environment overrides, e.g. `EDGE__RECONCILER__ENABLED=false`.
const ENV_PREFIX: &str = "EDGE";

/// Loads the application configuration.
///
/// Sources, lowest precedence first: built-in defaults, the optional TOML file at
/// `path` (a missing file is not an error), then `EDGE__*` environment variables.
/// The result is validated before it is returned.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("definitely-not-here.toml")).unwrap();
        assert!(config.reconciler.enabled);
        assert_eq!(config.analytics.cross_tab_min_samples, 3);
        assert!(config.api.live_agent.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[analytics]
starting_balance = "1000"

[reconciler]
market_data_batch_size = 3

[api.live_agent]
agent_id = "atlas"
base_url = "http://localhost:9000"
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.analytics.starting_balance, dec!(1000));
        assert_eq!(config.reconciler.market_data_batch_size, 3);
        assert_eq!(config.reconciler.simulated_interval_ms, 2_000);
        let agent = config.api.live_agent.unwrap();
        assert_eq!(agent.agent_id, "atlas");
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[reconciler]\nmarket_data_batch_size = 0").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
