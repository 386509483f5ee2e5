//! Tactician - Real-Time Combat Decision Engine
//!
//! Given perception of the current encounter, selects and sequences
//! actions under cooldown and priority constraints, and mines historical
//! encounter outcomes into per-situation tactical recommendations that
//! feed back into the real-time loop.

pub mod catalog;
pub mod core;
pub mod engine;
pub mod history;
pub mod learning;
pub mod metrics;
pub mod perception;
