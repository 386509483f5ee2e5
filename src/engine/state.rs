//! Combat state machine
//!
//! Derives the encounter state from perception signals each tick.
//! Executor callbacks drive the casting/cooldown legs; perception drives
//! everything else. Dead is terminal until an external respawn signal.

use serde::{Deserialize, Serialize};

use crate::core::config::EngineConfig;
use crate::core::error::CombatError;
use crate::perception::PerceptionFrame;

/// Current encounter state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatState {
    #[default]
    Idle,
    Targeting,
    Casting,
    Cooldown,
    Dead,
    Fleeing,
}

/// Tracks state transitions from perception and executor signals
#[derive(Debug, Clone)]
pub struct CombatStateTracker {
    state: CombatState,
    stale_run: u32,
    staleness_bound_ms: u64,
    stale_ticks_to_idle: u32,
}

impl CombatStateTracker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: CombatState::Idle,
            stale_run: 0,
            staleness_bound_ms: config.staleness_bound_ms,
            stale_ticks_to_idle: config.stale_ticks_to_idle,
        }
    }

    pub fn state(&self) -> CombatState {
        self.state
    }

    /// Feed one perception frame and return the resulting state
    pub fn observe(&mut self, frame: &PerceptionFrame) -> CombatState {
        // Death wins over everything, including stale frames
        if frame.self_health_percent <= 0.0 {
            self.state = CombatState::Dead;
            self.stale_run = 0;
            return self.state;
        }

        match self.state {
            // Terminal until an external signal
            CombatState::Dead | CombatState::Fleeing => return self.state,
            _ => {}
        }

        if self.check_staleness(frame) {
            return self.state;
        }

        self.state = match self.state {
            CombatState::Idle if frame.target_present => CombatState::Targeting,
            CombatState::Targeting if !frame.target_present => CombatState::Idle,
            // Ready for the next decision once nothing is in flight
            CombatState::Cooldown if !frame.cast_busy => {
                if frame.target_present {
                    CombatState::Targeting
                } else {
                    CombatState::Idle
                }
            }
            other => other,
        };

        self.state
    }

    /// Returns true when staleness forced a transition to Idle
    fn check_staleness(&mut self, frame: &PerceptionFrame) -> bool {
        if frame.perception_age_ms <= self.staleness_bound_ms {
            self.stale_run = 0;
            return false;
        }

        self.stale_run += 1;
        if self.stale_run >= self.stale_ticks_to_idle {
            let error = CombatError::PerceptionTimeout {
                consecutive_ticks: self.stale_run,
                age_ms: frame.perception_age_ms,
            };
            tracing::warn!(%error, "forcing idle");
            self.state = CombatState::Idle;
            self.stale_run = 0;
            return true;
        }

        false
    }

    /// Executor issued an action
    pub fn on_cast_started(&mut self) {
        self.state = CombatState::Casting;
    }

    /// Action completed (or failed after the ack timeout)
    pub fn on_cast_finished(&mut self) {
        if self.state == CombatState::Casting {
            self.state = CombatState::Cooldown;
        }
    }

    /// External respawn signal
    pub fn on_respawn(&mut self) {
        if self.state == CombatState::Dead {
            self.state = CombatState::Idle;
            self.stale_run = 0;
        }
    }

    /// No eligible target remained this tick; normal control flow
    pub fn on_no_target(&mut self) {
        if self.state == CombatState::Targeting {
            self.state = CombatState::Idle;
        }
    }

    /// Explicit flee decision
    pub fn on_flee(&mut self) {
        self.state = CombatState::Fleeing;
    }

    /// Session teardown: back to idle regardless of prior state
    pub fn reset(&mut self) {
        self.state = CombatState::Idle;
        self.stale_run = 0;
    }
}
