use crate::error::EventsError;
use chrono::{DateTime, Utc};
use core_types::PriceQuote;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A newly accepted price for one open trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub trade_id: String,
    pub price: Decimal,
    pub source_rank: u8,
    pub fetched_at: DateTime<Utc>,
}

impl From<&PriceQuote> for PriceUpdate {
    fn from(quote: &PriceQuote) -> Self {
        Self {
            trade_id: quote.trade_id.clone(),
            price: quote.price,
            source_rank: quote.source_rank,
            fetched_at: quote.fetched_at,
        }
    }
}

/// Everything a price-map subscriber can be told.
///
/// Serialized with an adjacent tag so a UI bridge can forward it verbatim, e.g.
/// `{ "type": "Updated", "payload": { "trade_id": "...", ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum PriceEvent {
    /// A price was accepted into the map.
    Updated(PriceUpdate),
    /// Trades left the open set and their prices were dropped.
    Removed(Vec<String>),
}

impl PriceEvent {
    pub fn to_json(&self) -> Result<String, EventsError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn removed_event_serializes_with_tag() {
        let event = PriceEvent::Removed(vec!["t-1".to_string()]);
        let json = event.to_json().unwrap();
        assert_eq!(json, r#"{"type":"Removed","payload":["t-1"]}"#);
    }

    #[test]
    fn update_copies_quote_fields() {
        let quote = PriceQuote {
            trade_id: "t-9".to_string(),
            price: dec!(1.25),
            source_rank: 2,
            fetched_at: Utc::now(),
        };
        let update = PriceUpdate::from(&quote);
        assert_eq!(update.trade_id, "t-9");
        assert_eq!(update.price, dec!(1.25));
        assert_eq!(update.source_rank, 2);
    }
}
