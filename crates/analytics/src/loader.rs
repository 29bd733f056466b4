use crate::error::AnalyticsError;
use core_types::Trade;
use std::path::Path;

/// Decodes a JSON array of normalized trade records.
pub fn parse_trades(json: &str) -> Result<Vec<Trade>, AnalyticsError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_trades(path: &Path) -> Result<Vec<Trade>, AnalyticsError> {
    let json = std::fs::read_to_string(path)?;
    let trades = parse_trades(&json)?;
    tracing::debug!(count = trades.len(), path = %path.display(), "Loaded trade records");
    Ok(trades)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_numbers_and_strings_as_decimals() {
        let json = r#"[
            { "id": "a", "status": "CLOSED", "pnlUsd": 12.5, "pnlPercent": "4.2", "signalStrength": 3 },
            { "id": "b", "status": "OPEN", "entryPrice": "0.0041", "quantity": 1000, "side": "sell" }
        ]"#;
        let trades = parse_trades(json).unwrap();

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].pnl_usd, dec!(12.5));
        assert_eq!(trades[0].pnl_percent, dec!(4.2));
        assert_eq!(trades[0].signal_strength, Some(3));
        assert!(trades[1].is_open());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(parse_trades("{"), Err(AnalyticsError::Decode(_))));
    }
}
