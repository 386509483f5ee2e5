pub mod config;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use error::{CombatError, Result};
pub use types::{ActionId, SessionId, Situation, TargetId, Tick};
