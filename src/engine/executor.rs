//! Tick execution
//!
//! Pops the first ready action from the queue, hands it to the issuance
//! sink, rolls damage, applies the cooldown, and emits a combat event.
//! Issuance failure still applies the cooldown: retrying a failed action
//! every tick is how retry storms start.

use ahash::AHashMap;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

use crate::catalog::{AbilityCatalog, Action};
use crate::core::config::EngineConfig;
use crate::core::error::CombatError;
use crate::core::types::ActionId;
use crate::engine::state::CombatStateTracker;
use crate::engine::targeting::Target;
use crate::history::{CombatEvent, EventOutcome};

/// Remaining cooldown per action, in seconds
#[derive(Debug, Clone, Default)]
pub struct CooldownClock {
    remaining: AHashMap<ActionId, f32>,
}

impl CooldownClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance simulated time, expiring finished cooldowns
    pub fn advance(&mut self, dt_seconds: f32) {
        self.remaining.retain(|_, remaining| {
            *remaining -= dt_seconds;
            *remaining > 0.0
        });
    }

    pub fn is_ready(&self, id: &ActionId) -> bool {
        self.remaining(id) <= 0.0
    }

    pub fn remaining(&self, id: &ActionId) -> f32 {
        self.remaining.get(id).copied().unwrap_or(0.0)
    }

    /// Start an action's cooldown
    pub fn trigger(&mut self, action: &Action) {
        if action.cooldown_seconds > 0.0 {
            self.remaining
                .insert(action.id.clone(), action.cooldown_seconds);
        }
    }
}

/// Result of handing an action to the input-emulation collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueResult {
    Acknowledged,
    Failed,
    TimedOut,
}

/// Action issuance boundary (input emulation lives behind it)
pub trait ActionSink {
    /// Issue an action and wait up to `ack_timeout` for acknowledgment
    fn issue(&mut self, action: &ActionId, ack_timeout: Duration) -> IssueResult;
}

/// Sink that always acknowledges immediately; used in tests and replays
#[derive(Debug, Default)]
pub struct InstantAckSink;

impl ActionSink for InstantAckSink {
    fn issue(&mut self, _action: &ActionId, _ack_timeout: Duration) -> IssueResult {
        IssueResult::Acknowledged
    }
}

/// Damage rolling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageRollMode {
    /// Uniform within the action's damage range
    Uniform,
    /// Range midpoint, for deterministic replays and tests
    Midpoint,
}

/// Per-tick inputs the executor needs beyond the queue itself
#[derive(Debug, Clone, Copy)]
pub struct TickInputs {
    /// Seconds since session start
    pub now_secs: f64,
    pub self_health_percent: f32,
    /// Damage-taken estimate for this tick (from health-percent deltas)
    pub damage_taken: f32,
}

/// Executes at most one action per tick
#[derive(Debug)]
pub struct Executor {
    mode: DamageRollMode,
    rng: ChaCha8Rng,
    /// Floor for acknowledgment timeouts; zero-cast instants still get
    /// one tick of bounded waiting
    min_ack_timeout: Duration,
}

impl Executor {
    pub fn new(config: &EngineConfig, seed: u64) -> Self {
        let mode = if config.deterministic_damage {
            DamageRollMode::Midpoint
        } else {
            DamageRollMode::Uniform
        };
        Self {
            mode,
            rng: ChaCha8Rng::seed_from_u64(seed),
            min_ack_timeout: Duration::from_millis(config.tick_interval_ms),
        }
    }

    /// Advance one tick: pop the first ready action, execute it, emit
    /// the event. Returns None when nothing in the queue is ready (the
    /// tick is a no-op and the state machine is left untouched).
    pub fn tick(
        &mut self,
        queue: &[ActionId],
        catalog: &AbilityCatalog,
        clock: &mut CooldownClock,
        target: &Target,
        tracker: &mut CombatStateTracker,
        sink: &mut dyn ActionSink,
        inputs: TickInputs,
    ) -> Option<CombatEvent> {
        let action = queue
            .iter()
            .filter_map(|id| catalog.get(id))
            .find(|a| self.is_ready(a, clock, target))?;

        tracker.on_cast_started();

        let ack_timeout = self
            .min_ack_timeout
            .max(Duration::from_secs_f32(action.cast_time_seconds * 2.0));
        let issued = sink.issue(&action.id, ack_timeout);

        let (outcome, damage_dealt) = match issued {
            IssueResult::Acknowledged => (EventOutcome::Success, self.roll_damage(action)),
            IssueResult::Failed | IssueResult::TimedOut => {
                let error = CombatError::ActionIssuanceFailure(action.id.clone());
                tracing::warn!(%error, ?issued, "cooldown applied anyway");
                (EventOutcome::Failure, 0.0)
            }
        };

        // Cooldown applies on failure too
        clock.trigger(action);
        tracker.on_cast_finished();

        tracing::debug!(
            action = %action.id,
            damage = damage_dealt,
            ?outcome,
            t = inputs.now_secs,
            "executed action"
        );

        Some(CombatEvent {
            timestamp_secs: inputs.now_secs,
            action: action.id.clone(),
            damage_dealt,
            damage_taken: inputs.damage_taken,
            enemy_type: target.classification.clone(),
            self_health_percent: inputs.self_health_percent,
            target_health_percent: target.health_percent,
            outcome,
        })
    }

    fn is_ready(&self, action: &Action, clock: &CooldownClock, target: &Target) -> bool {
        // Heals are self-targeted; the range gate only applies to
        // actions aimed at the target
        clock.is_ready(&action.id)
            && (action.is_heal() || target.distance_meters <= action.range_meters)
    }

    fn roll_damage(&mut self, action: &Action) -> f32 {
        match self.mode {
            DamageRollMode::Midpoint => action.damage.midpoint(),
            DamageRollMode::Uniform => {
                if action.damage.max > action.damage.min {
                    self.rng.gen_range(action.damage.min..=action.damage.max)
                } else {
                    action.damage.min
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_fixtures::small_catalog;
    use crate::core::types::TargetId;

    struct FailingSink;
    impl ActionSink for FailingSink {
        fn issue(&mut self, _action: &ActionId, _timeout: Duration) -> IssueResult {
            IssueResult::Failed
        }
    }

    struct RecordingSink {
        issued: Vec<(ActionId, Duration)>,
    }
    impl ActionSink for RecordingSink {
        fn issue(&mut self, action: &ActionId, timeout: Duration) -> IssueResult {
            self.issued.push((action.clone(), timeout));
            IssueResult::Acknowledged
        }
    }

    fn deterministic_config() -> EngineConfig {
        EngineConfig {
            deterministic_damage: true,
            ..Default::default()
        }
    }

    fn target_at(distance: f32) -> Target {
        Target {
            id: TargetId::new(),
            health_percent: 60.0,
            distance_meters: distance,
            threat_level: 3.0,
            classification: "stormtrooper".into(),
        }
    }

    fn inputs() -> TickInputs {
        TickInputs {
            now_secs: 0.0,
            self_health_percent: 100.0,
            damage_taken: 0.0,
        }
    }

    #[test]
    fn test_executes_first_ready_action() {
        let catalog = small_catalog();
        let config = deterministic_config();
        let mut executor = Executor::new(&config, 7);
        let mut clock = CooldownClock::new();
        let mut tracker = CombatStateTracker::new(&config);

        let queue: Vec<ActionId> = vec!["head_shot".into(), "rifle_shot".into()];
        let event = executor
            .tick(
                &queue,
                &catalog,
                &mut clock,
                &target_at(10.0),
                &mut tracker,
                &mut InstantAckSink,
                inputs(),
            )
            .unwrap();

        assert_eq!(event.action.as_str(), "head_shot");
        assert_eq!(event.outcome, EventOutcome::Success);
        // Midpoint of 80..120
        assert_eq!(event.damage_dealt, 100.0);
        assert!(!clock.is_ready(&"head_shot".into()));
    }

    #[test]
    fn test_skips_out_of_range_head_of_queue() {
        let catalog = small_catalog();
        let config = deterministic_config();
        let mut executor = Executor::new(&config, 7);
        let mut clock = CooldownClock::new();
        let mut tracker = CombatStateTracker::new(&config);

        // basic_strike reaches only 5m; rifle_shot reaches 30m
        let queue: Vec<ActionId> = vec!["basic_strike".into(), "rifle_shot".into()];
        let event = executor
            .tick(
                &queue,
                &catalog,
                &mut clock,
                &target_at(20.0),
                &mut tracker,
                &mut InstantAckSink,
                inputs(),
            )
            .unwrap();
        assert_eq!(event.action.as_str(), "rifle_shot");
    }

    #[test]
    fn test_no_ready_action_is_noop() {
        let catalog = small_catalog();
        let config = deterministic_config();
        let mut executor = Executor::new(&config, 7);
        let mut clock = CooldownClock::new();
        clock.trigger(catalog.get(&"rifle_shot".into()).unwrap());
        let mut tracker = CombatStateTracker::new(&config);
        let state_before = tracker.state();

        let queue: Vec<ActionId> = vec!["rifle_shot".into()];
        let event = executor.tick(
            &queue,
            &catalog,
            &mut clock,
            &target_at(10.0),
            &mut tracker,
            &mut InstantAckSink,
            inputs(),
        );
        assert!(event.is_none());
        assert_eq!(tracker.state(), state_before);
    }

    #[test]
    fn test_failure_still_applies_cooldown() {
        let catalog = small_catalog();
        let config = deterministic_config();
        let mut executor = Executor::new(&config, 7);
        let mut clock = CooldownClock::new();
        let mut tracker = CombatStateTracker::new(&config);

        let queue: Vec<ActionId> = vec!["rifle_shot".into()];
        let event = executor
            .tick(
                &queue,
                &catalog,
                &mut clock,
                &target_at(10.0),
                &mut tracker,
                &mut FailingSink,
                inputs(),
            )
            .unwrap();

        assert_eq!(event.outcome, EventOutcome::Failure);
        assert_eq!(event.damage_dealt, 0.0);
        assert!(!clock.is_ready(&"rifle_shot".into()));
    }

    #[test]
    fn test_ack_timeout_is_twice_cast_time_with_tick_floor() {
        let catalog = small_catalog();
        let config = deterministic_config();
        let mut executor = Executor::new(&config, 7);
        let mut clock = CooldownClock::new();
        let mut tracker = CombatStateTracker::new(&config);
        let mut sink = RecordingSink { issued: vec![] };

        // All fixture actions are instant, so the floor applies
        let queue: Vec<ActionId> = vec!["rifle_shot".into()];
        executor.tick(
            &queue,
            &catalog,
            &mut clock,
            &target_at(10.0),
            &mut tracker,
            &mut sink,
            inputs(),
        );
        assert_eq!(
            sink.issued[0].1,
            Duration::from_millis(config.tick_interval_ms)
        );
    }

    #[test]
    fn test_cooldown_clock_expires() {
        let catalog = small_catalog();
        let mut clock = CooldownClock::new();
        let rifle = catalog.get(&"rifle_shot".into()).unwrap();
        clock.trigger(rifle);
        assert!(!clock.is_ready(&rifle.id));

        clock.advance(1.0);
        assert!(!clock.is_ready(&rifle.id));
        clock.advance(0.6);
        assert!(clock.is_ready(&rifle.id));
    }

    #[test]
    fn test_zero_cooldown_never_enters_clock() {
        let catalog = small_catalog();
        let mut clock = CooldownClock::new();
        clock.trigger(catalog.fallback());
        assert!(clock.is_ready(catalog.fallback_id()));
    }
}
