//! Historical combat records
//!
//! Append-only events and finalized sessions. The real-time loop is the
//! single writer; the batch learners read up to a last-known-complete
//! cursor so a rebuild never observes a half-written session. Storage
//! technology is the persistence collaborator's concern; the in-memory
//! store here backs tests, replays, and the batch worker.

use serde::{Deserialize, Serialize};

use crate::core::types::{ActionId, SessionId};

/// Outcome of a single executed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    Success,
    Failure,
    Aborted,
}

/// One executed (or aborted) action, as recorded for learning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatEvent {
    /// Seconds since session start
    pub timestamp_secs: f64,
    pub action: ActionId,
    pub damage_dealt: f32,
    /// Estimated from own health-percent deltas between frames
    pub damage_taken: f32,
    pub enemy_type: String,
    pub self_health_percent: f32,
    pub target_health_percent: f32,
    pub outcome: EventOutcome,
}

/// How an encounter ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionResult {
    Victory,
    Defeat,
    Fled,
    Aborted,
}

/// One finalized encounter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatSession {
    pub id: SessionId,
    pub build: String,
    pub enemy_type: String,
    pub result: SessionResult,
    pub events: Vec<CombatEvent>,
}

impl CombatSession {
    /// Fraction of events that succeeded
    pub fn success_rate(&self) -> f32 {
        if self.events.is_empty() {
            return 0.0;
        }
        let successes = self
            .events
            .iter()
            .filter(|e| e.outcome == EventOutcome::Success)
            .count();
        successes as f32 / self.events.len() as f32
    }

    /// Damage dealt per point of damage taken
    pub fn damage_efficiency(&self) -> f32 {
        let dealt: f32 = self.events.iter().map(|e| e.damage_dealt).sum();
        let taken: f32 = self.events.iter().map(|e| e.damage_taken).sum();
        dealt / taken.max(1.0)
    }

    pub fn total_damage_dealt(&self) -> f32 {
        self.events.iter().map(|e| e.damage_dealt).sum()
    }

    pub fn total_damage_taken(&self) -> f32 {
        self.events.iter().map(|e| e.damage_taken).sum()
    }
}

/// Position in the session log up to which a reader has consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryCursor(pub u64);

/// Append-only history boundary
///
/// `append_event` records mid-encounter; `append_session` finalizes an
/// encounter (including aborted ones). `read_since` returns only
/// finalized sessions so batch readers never see a torn record.
pub trait HistoryStore {
    fn append_event(&mut self, session: SessionId, event: &CombatEvent);
    fn append_session(&mut self, session: CombatSession);
    fn read_since(&self, cursor: HistoryCursor) -> (Vec<CombatSession>, HistoryCursor);
}

/// In-memory store for tests, replays, and the batch worker
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    sessions: Vec<CombatSession>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[CombatSession] {
        &self.sessions
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append_event(&mut self, _session: SessionId, _event: &CombatEvent) {
        // Events live inside their session until finalization; the
        // in-memory store only retains finalized sessions.
    }

    fn append_session(&mut self, session: CombatSession) {
        self.sessions.push(session);
    }

    fn read_since(&self, cursor: HistoryCursor) -> (Vec<CombatSession>, HistoryCursor) {
        let start = (cursor.0 as usize).min(self.sessions.len());
        let batch = self.sessions[start..].to_vec();
        (batch, HistoryCursor(self.sessions.len() as u64))
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    pub fn event(action: &str, t: f64, outcome: EventOutcome) -> CombatEvent {
        CombatEvent {
            timestamp_secs: t,
            action: action.into(),
            damage_dealt: 40.0,
            damage_taken: 10.0,
            enemy_type: "stormtrooper".into(),
            self_health_percent: 80.0,
            target_health_percent: 50.0,
            outcome,
        }
    }

    pub fn session(result: SessionResult, events: Vec<CombatEvent>) -> CombatSession {
        CombatSession {
            id: SessionId::new(),
            build: "medic".into(),
            enemy_type: "stormtrooper".into(),
            result,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;

    #[test]
    fn test_success_rate_counts_successes() {
        let s = session(
            SessionResult::Victory,
            vec![
                event("rifle_shot", 0.0, EventOutcome::Success),
                event("rifle_shot", 1.0, EventOutcome::Failure),
            ],
        );
        assert!((s.success_rate() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_success_rate_empty_session() {
        let s = session(SessionResult::Aborted, vec![]);
        assert_eq!(s.success_rate(), 0.0);
    }

    #[test]
    fn test_damage_efficiency_guards_zero_taken() {
        let mut e = event("rifle_shot", 0.0, EventOutcome::Success);
        e.damage_taken = 0.0;
        let s = session(SessionResult::Victory, vec![e]);
        assert_eq!(s.damage_efficiency(), 40.0);
    }

    #[test]
    fn test_cursor_advances_without_rereading() {
        let mut store = MemoryHistoryStore::new();
        store.append_session(session(SessionResult::Victory, vec![]));
        store.append_session(session(SessionResult::Defeat, vec![]));

        let (first, cursor) = store.read_since(HistoryCursor::default());
        assert_eq!(first.len(), 2);

        let (rest, cursor2) = store.read_since(cursor);
        assert!(rest.is_empty());

        store.append_session(session(SessionResult::Fled, vec![]));
        let (newer, _) = store.read_since(cursor2);
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].result, SessionResult::Fled);
    }
}
