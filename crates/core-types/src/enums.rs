use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    #[default]
    Buy,
    Sell,
}

impl OrderSide {
    /// +1 for a long position, -1 for a short one. Multiplying a raw price move by
    /// this yields the move in the position's favour.
    pub fn direction(&self) -> Decimal {
        match self {
            OrderSide::Buy => Decimal::ONE,
            OrderSide::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

/// Whether a trade was executed by a live agent or by the market simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeMode {
    #[default]
    Live,
    Simulation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
    Failed,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeStatus::Open => "OPEN",
            TradeStatus::Closed => "CLOSED",
            TradeStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

impl FromStr for TradeStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Ok(TradeStatus::Open),
            "CLOSED" => Ok(TradeStatus::Closed),
            "FAILED" => Ok(TradeStatus::Failed),
            _ => Err(CoreError::UnknownStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("open".parse::<TradeStatus>().unwrap(), TradeStatus::Open);
        assert_eq!("CLOSED".parse::<TradeStatus>().unwrap(), TradeStatus::Closed);
        assert!(matches!(
            "pending".parse::<TradeStatus>(),
            Err(CoreError::UnknownStatus(s)) if s == "pending"
        ));
    }

    #[test]
    fn short_side_inverts_direction() {
        assert_eq!(OrderSide::Buy.direction(), Decimal::ONE);
        assert_eq!(OrderSide::Sell.direction(), Decimal::NEGATIVE_ONE);
    }
}
