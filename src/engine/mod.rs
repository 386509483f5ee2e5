//! Real-time combat decision loop
//!
//! One tick: observe perception -> select target -> build queue ->
//! execute at most one action. Single-threaded and cooperative; nothing
//! here blocks past the bounded acknowledgment timeout.

pub mod executor;
pub mod sequence;
pub mod session;
pub mod state;
pub mod targeting;

pub use executor::{
    ActionSink, CooldownClock, DamageRollMode, Executor, InstantAckSink, IssueResult, TickInputs,
};
pub use sequence::build_queue;
pub use session::SessionContext;
pub use state::{CombatState, CombatStateTracker};
pub use targeting::{select_target, Target};

use std::sync::Arc;

use crate::catalog::{AbilityCatalog, CombatProfile};
use crate::core::config::EngineConfig;
use crate::core::error::{CombatError, Result};
use crate::history::{CombatEvent, CombatSession, HistoryStore, SessionResult};
use crate::learning::RecommendationService;
use crate::perception::PerceptionFrame;

/// What one tick did
#[derive(Debug, Clone)]
pub struct TickReport {
    pub state: CombatState,
    pub executed: Option<CombatEvent>,
}

/// One character's combat decision engine
///
/// Independent instances share nothing mutable except the read-only
/// recommendation tables behind the shared service.
pub struct CombatEngine {
    config: EngineConfig,
    catalog: AbilityCatalog,
    profile: CombatProfile,
    tracker: CombatStateTracker,
    clock: CooldownClock,
    executor: Executor,
    recommender: Arc<RecommendationService>,
}

impl CombatEngine {
    /// Fails only on an invalid config or a profile that does not match
    /// the catalog; a session cannot start without both.
    pub fn new(
        catalog: AbilityCatalog,
        profile: CombatProfile,
        config: EngineConfig,
        recommender: Arc<RecommendationService>,
        seed: u64,
    ) -> Result<Self> {
        config.validate().map_err(CombatError::ProfileLoad)?;
        profile.validate_against(&catalog)?;

        let tracker = CombatStateTracker::new(&config);
        let executor = Executor::new(&config, seed);

        Ok(Self {
            config,
            catalog,
            profile,
            tracker,
            clock: CooldownClock::new(),
            executor,
            recommender,
        })
    }

    pub fn state(&self) -> CombatState {
        self.tracker.state()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &AbilityCatalog {
        &self.catalog
    }

    /// Begin a new encounter: fresh session context, fresh cooldowns
    pub fn start_session(&mut self, enemy_type: &str) -> SessionContext {
        self.tracker.reset();
        self.clock = CooldownClock::new();
        tracing::info!(
            profile = %self.profile.name,
            enemy = enemy_type,
            "starting combat session"
        );
        SessionContext::new(self.profile.name.clone(), enemy_type, &self.config)
    }

    /// Advance one perception tick
    pub fn tick(
        &mut self,
        frame: &PerceptionFrame,
        targets: &[Target],
        session: &mut SessionContext,
        sink: &mut dyn ActionSink,
        store: &mut dyn HistoryStore,
    ) -> TickReport {
        self.clock.advance(self.config.tick_seconds());
        let damage_taken = session.advance(frame.self_health_percent, &self.config);
        let state = self.tracker.observe(frame);

        match state {
            CombatState::Targeting => {}
            // Dead, fleeing, idle, or mid-cast: no decision this tick
            _ => {
                return TickReport {
                    state,
                    executed: None,
                }
            }
        }

        let Some(target) = select_target(
            targets,
            &self.profile,
            &self.catalog,
            &self.clock,
            &self.config,
        ) else {
            self.tracker.on_no_target();
            return TickReport {
                state: self.tracker.state(),
                executed: None,
            };
        };
        let target = target.clone();

        let situation = session.situation(frame.self_health_percent, &self.config);
        let recommendation = self.recommender.optimal_action(
            &session.enemy_type,
            &session.build,
            situation,
            frame.self_health_percent,
            target.health_percent,
            &self.catalog,
            &self.clock,
            &self.config,
        );

        let queue = build_queue(
            &self.profile,
            &self.catalog,
            &self.clock,
            &target,
            Some(&recommendation),
            frame.self_health_percent,
        );

        let executed = self.executor.tick(
            &queue,
            &self.catalog,
            &mut self.clock,
            &target,
            &mut self.tracker,
            sink,
            TickInputs {
                now_secs: session.elapsed_secs(),
                self_health_percent: frame.self_health_percent,
                damage_taken,
            },
        );

        if let Some(event) = &executed {
            store.append_event(session.id, event);
            session.record(event.clone());
        }

        TickReport {
            state: self.tracker.state(),
            executed,
        }
    }

    /// End the encounter normally
    pub fn end_session(
        &mut self,
        session: SessionContext,
        result: SessionResult,
        store: &mut dyn HistoryStore,
    ) -> CombatSession {
        self.tracker.reset();
        session.finalize(result, store)
    }

    /// Flee: flush the terminal aborted event, record the session as
    /// fled, and leave the state machine in Fleeing
    pub fn flee(
        &mut self,
        session: SessionContext,
        store: &mut dyn HistoryStore,
    ) -> CombatSession {
        self.tracker.on_flee();
        session.abort_with(SessionResult::Fled, store)
    }

    /// Forced stop or disconnect mid-encounter
    pub fn abort(
        &mut self,
        session: SessionContext,
        store: &mut dyn HistoryStore,
    ) -> CombatSession {
        let finalized = session.abort(store);
        self.tracker.reset();
        finalized
    }

    /// External respawn signal after death
    pub fn respawn(&mut self) {
        self.tracker.on_respawn();
    }
}
