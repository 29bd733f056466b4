//! # Edgeboard Core Types
//!
//! Layer 0 of the workspace. Defines the normalized `Trade` record that every other
//! crate consumes, the `PriceQuote` produced by the live price reconciler, and the
//! `PriceLookup` seam through which analytics reads current prices without knowing
//! where they come from.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{OrderSide, TradeMode, TradeStatus};
pub use error::CoreError;
pub use structs::{PriceLookup, PriceQuote, Trade, dedupe_latest};
