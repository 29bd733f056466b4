//! # Edgeboard Analytics
//!
//! This crate turns a batch of normalized trade records into decision-grade
//! statistics. It acts as the "unbiased judge" of the agents feeding it.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of external
//!   systems and depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** Every entry point is a pure function of its input.
//!   Results are recomputed from scratch on each call, so they can be re-derived
//!   whenever the trade set or a view filter changes.
//! - **Total Functions:** No metric panics, errors or divides by zero. Degenerate
//!   samples produce zeros.
//!
//! ## Public API
//!
//! - `compute_summary`: the Statistics Engine, `&[Trade] -> Summary`.
//! - `aggregate_by` and friends: per-segment summaries (agent, signal type, strength).
//! - `build_equity_curve`, `compute_drawdown`, `compute_streaks`, `sharpe_ratio`.
//! - `mark_to_market`: re-prices open trades from a `PriceLookup`.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod equity;
pub mod error;
pub mod loader;
pub mod mark;
pub mod report;
pub mod segments;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{compute_summary, edge_score};
pub use equity::{
    Drawdown, EquityCurveOptions, EquityPoint, RiskMetrics, Streaks, build_agent_equity_curves,
    build_equity_curve, compute_drawdown, compute_risk_metrics, compute_streaks, sharpe_ratio,
};
pub use error::AnalyticsError;
pub use loader::{load_trades, parse_trades};
pub use mark::mark_to_market;
pub use report::Summary;
pub use segments::{
    AggregateOptions, CrossCell, RiskReward, Segment, SortMetric, StrengthSegment, UNKNOWN_KEY,
    agent_key, aggregate_by, aggregate_by_signal_strength, by_agent, by_signal_type, cross_tabulate,
    signal_strength_key, signal_type_key, strength_label,
};
