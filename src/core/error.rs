use thiserror::Error;

use crate::core::types::ActionId;

#[derive(Error, Debug)]
pub enum CombatError {
    /// Perception stayed stale past the bound; the tracker forces Idle.
    #[error("perception stale for {consecutive_ticks} consecutive ticks (last frame {age_ms}ms old)")]
    PerceptionTimeout {
        consecutive_ticks: u32,
        age_ms: u64,
    },

    /// The issuance collaborator reported failure or the ack timed out.
    /// The cooldown is still applied to prevent retry storms.
    #[error("action issuance failed: {0}")]
    ActionIssuanceFailure(ActionId),

    /// Not enough historical samples to back a learned answer at this tier.
    #[error("insufficient training data: {0}")]
    InsufficientTrainingData(String),

    /// A history record failed validation during batch ingest; it is
    /// skipped with a warning and never aborts the batch.
    #[error("corrupt history record: {0}")]
    CorruptHistoryRecord(String),

    /// Fatal at session start: no valid profile means no session.
    #[error("profile load error: {0}")]
    ProfileLoad(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CombatError {
    /// Only profile loading is fatal; everything else degrades in place.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CombatError::ProfileLoad(_)
                | CombatError::Io(_)
                | CombatError::TomlParse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CombatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_variants_are_not_fatal() {
        let timeout = CombatError::PerceptionTimeout {
            consecutive_ticks: 4,
            age_ms: 900,
        };
        assert!(!timeout.is_fatal());
        assert!(timeout.to_string().contains("4 consecutive ticks"));

        let issuance = CombatError::ActionIssuanceFailure(ActionId::new("rifle_shot"));
        assert!(!issuance.is_fatal());
        assert!(issuance.to_string().contains("rifle_shot"));

        let starved = CombatError::InsufficientTrainingData("no tables".into());
        assert!(!starved.is_fatal());
    }

    #[test]
    fn test_profile_load_is_fatal() {
        assert!(CombatError::ProfileLoad("bad catalog".into()).is_fatal());
    }
}
