//! Metrics export for the observability collaborator

use serde::{Deserialize, Serialize};

use crate::history::{CombatSession, SessionResult};
use crate::learning::RecommendationTables;

/// Periodic snapshot of combat performance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub sessions: u32,
    /// Victories over decided sessions (fled/aborted excluded)
    pub win_rate: f32,
    pub avg_damage_dealt: f32,
    pub avg_damage_taken: f32,
    pub most_effective_weapon: Option<String>,
    /// "<action> vs <enemy> (<situation>)" of the most confident insight
    pub most_effective_tactic: Option<String>,
}

/// Compute a snapshot from finalized sessions and the published tables
pub fn snapshot(sessions: &[CombatSession], tables: &RecommendationTables) -> MetricsSnapshot {
    let decided: Vec<&CombatSession> = sessions
        .iter()
        .filter(|s| matches!(s.result, SessionResult::Victory | SessionResult::Defeat))
        .collect();
    let wins = decided
        .iter()
        .filter(|s| s.result == SessionResult::Victory)
        .count();

    let win_rate = if decided.is_empty() {
        0.0
    } else {
        wins as f32 / decided.len() as f32
    };

    let (avg_dealt, avg_taken) = if sessions.is_empty() {
        (0.0, 0.0)
    } else {
        let dealt: f32 = sessions.iter().map(|s| s.total_damage_dealt()).sum();
        let taken: f32 = sessions.iter().map(|s| s.total_damage_taken()).sum();
        (
            dealt / sessions.len() as f32,
            taken / sessions.len() as f32,
        )
    };

    MetricsSnapshot {
        sessions: sessions.len() as u32,
        win_rate,
        avg_damage_dealt: avg_dealt,
        avg_damage_taken: avg_taken,
        most_effective_weapon: tables.most_effective_weapon().map(str::to_string),
        most_effective_tactic: tables.most_effective_tactic().map(|i| {
            format!(
                "{} vs {} ({})",
                i.recommended_action, i.enemy_type, i.situation
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::test_fixtures::{event, session};
    use crate::history::EventOutcome;

    #[test]
    fn test_win_rate_ignores_fled_and_aborted() {
        let sessions = vec![
            session(SessionResult::Victory, vec![]),
            session(SessionResult::Defeat, vec![]),
            session(SessionResult::Fled, vec![]),
            session(SessionResult::Aborted, vec![]),
        ];
        let snap = snapshot(&sessions, &RecommendationTables::default());
        assert!((snap.win_rate - 0.5).abs() < 1e-6);
        assert_eq!(snap.sessions, 4);
    }

    #[test]
    fn test_damage_averages() {
        let sessions = vec![
            session(
                SessionResult::Victory,
                vec![event("rifle_shot", 0.0, EventOutcome::Success)],
            ),
            session(SessionResult::Defeat, vec![]),
        ];
        let snap = snapshot(&sessions, &RecommendationTables::default());
        // Fixture event deals 40, takes 10; averaged over two sessions
        assert!((snap.avg_damage_dealt - 20.0).abs() < 1e-6);
        assert!((snap.avg_damage_taken - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_cold_start_snapshot_is_quiet() {
        let snap = snapshot(&[], &RecommendationTables::default());
        assert_eq!(snap.win_rate, 0.0);
        assert!(snap.most_effective_weapon.is_none());
        assert!(snap.most_effective_tactic.is_none());
    }
}
