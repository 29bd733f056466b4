//! # Edgeboard Engine
//!
//! The live price reconciler: a set of polling loops that keep a shared
//! `trade id -> current price` map up to date for every open trade.
//!
//! Three sources feed the map, in priority order:
//!
//! 1. `SimulatedMarketSource` prices simulated agents' trades.
//! 2. `LiveAgentSource` prices the connected live agent's trades from its positions.
//! 3. `MarketDataSource` is the rate-limited public fallback for anything still unpriced.
//!
//! Only the reconciler writes to the `PriceStore`; readers poll it or subscribe to
//! its `PriceEvent` stream.

pub mod error;
pub mod live_agent;
pub mod market_data;
pub mod price_store;
pub mod reconciler;
pub mod simulated;
pub mod source;

// --- Public API ---
pub use error::EngineError;
pub use live_agent::LiveAgentSource;
pub use market_data::MarketDataSource;
pub use price_store::PriceStore;
pub use reconciler::{PriceReconciler, ReconcilerHandle};
pub use simulated::SimulatedMarketSource;
pub use source::PriceSource;
