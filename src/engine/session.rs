//! Session context
//!
//! One encounter's explicit state: id, build, enemy, accumulated events,
//! and the health bookkeeping needed to estimate incoming damage. Passed
//! into every component call; there is no ambient "current session".

use crate::core::config::EngineConfig;
use crate::core::types::{SessionId, Situation, Tick};
use crate::history::{CombatEvent, CombatSession, EventOutcome, HistoryStore, SessionResult};

/// Explicit per-encounter context
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub id: SessionId,
    pub build: String,
    pub enemy_type: String,
    tick: Tick,
    tick_seconds: f32,
    events: Vec<CombatEvent>,
    last_self_health: Option<f32>,
}

impl SessionContext {
    pub fn new(build: impl Into<String>, enemy_type: impl Into<String>, config: &EngineConfig) -> Self {
        Self {
            id: SessionId::new(),
            build: build.into(),
            enemy_type: enemy_type.into(),
            tick: 0,
            tick_seconds: config.tick_seconds(),
            events: Vec::new(),
            last_self_health: None,
        }
    }

    /// Seconds since encounter start
    pub fn elapsed_secs(&self) -> f64 {
        self.tick as f64 * self.tick_seconds as f64
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    /// Advance session time by one perception tick and update the
    /// damage-taken estimate from the observed health percent.
    ///
    /// Returns the estimated damage taken since the previous tick.
    pub fn advance(&mut self, self_health_percent: f32, config: &EngineConfig) -> f32 {
        self.tick += 1;
        let taken = match self.last_self_health {
            Some(prev) if self_health_percent < prev => {
                (prev - self_health_percent) / 100.0 * config.nominal_health_pool
            }
            _ => 0.0,
        };
        self.last_self_health = Some(self_health_percent);
        taken
    }

    /// Record an executed action
    pub fn record(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    /// Damage taken over the trailing window ending now
    pub fn recent_damage_taken(&self, window_secs: f64) -> f32 {
        let cutoff = self.elapsed_secs() - window_secs;
        self.events
            .iter()
            .filter(|e| e.timestamp_secs >= cutoff)
            .map(|e| e.damage_taken)
            .sum()
    }

    /// Situation bucket for the next decision
    pub fn situation(&self, self_health_percent: f32, config: &EngineConfig) -> Situation {
        if self.events.is_empty() || self.elapsed_secs() < config.opening_window_secs {
            Situation::Opening
        } else if self_health_percent < config.low_health_percent {
            Situation::LowHealth
        } else if self.recent_damage_taken(config.incoming_damage_window_secs)
            > config.incoming_damage_threshold
        {
            Situation::HighIncomingDamage
        } else {
            Situation::Normal
        }
    }

    /// Finalize the encounter and hand the session to the history store
    pub fn finalize(mut self, result: SessionResult, store: &mut dyn HistoryStore) -> CombatSession {
        let session = CombatSession {
            id: self.id,
            build: self.build.clone(),
            enemy_type: self.enemy_type.clone(),
            result,
            events: std::mem::take(&mut self.events),
        };
        store.append_session(session.clone());
        tracing::info!(
            session = ?session.id,
            ?result,
            events = session.events.len(),
            "session finalized"
        );
        session
    }

    /// Cancellation path: flush a terminal aborted event, then finalize
    /// with the given result. Must run before anything else touches
    /// this session context.
    pub fn abort_with(mut self, result: SessionResult, store: &mut dyn HistoryStore) -> CombatSession {
        let terminal = CombatEvent {
            timestamp_secs: self.elapsed_secs(),
            action: crate::core::types::ActionId::new("__abort__"),
            damage_dealt: 0.0,
            damage_taken: 0.0,
            enemy_type: self.enemy_type.clone(),
            self_health_percent: self.last_self_health.unwrap_or(0.0),
            target_health_percent: 0.0,
            outcome: EventOutcome::Aborted,
        };
        self.record(terminal);
        self.finalize(result, store)
    }

    /// Forced stop / disconnect
    pub fn abort(self, store: &mut dyn HistoryStore) -> CombatSession {
        self.abort_with(SessionResult::Aborted, store)
    }
}
