//! # Edgeboard Events
//!
//! This crate defines the messages published whenever the live price map changes.
//! Subscribers (summary recomputation, a UI bridge, a log sink) receive them over a
//! broadcast channel owned by the engine's `PriceStore`.
//!
//! As a Layer 0 crate, it depends only on `core-types`.

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{PriceEvent, PriceUpdate};
