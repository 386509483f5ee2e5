//! Historical learning pipeline
//!
//! Offline batch path: snapshot the history store up to its
//! last-complete cursor, recompute both learner tables in full, and
//! publish them to the recommendation service in one atomic swap. The
//! real-time loop never waits on any of this.

pub mod effectiveness;
pub mod insight;
pub mod recommend;

pub use effectiveness::{EffectivenessLearner, WeaponClassMap, WeaponEffectiveness};
pub use insight::{wilson_lower_bound, TacticalInsight, TacticalInsightMiner};
pub use recommend::{RecommendationService, RecommendationTables};

use ahash::AHashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::catalog::AbilityCatalog;
use crate::core::error::{CombatError, Result};
use crate::core::types::ActionId;
use crate::history::{CombatSession, HistoryCursor, HistoryStore};

/// Both learners plus the publish thresholds they share
#[derive(Debug, Clone)]
pub struct BatchLearner {
    pub effectiveness: EffectivenessLearner,
    pub miner: TacticalInsightMiner,
}

impl BatchLearner {
    pub fn new(effectiveness: EffectivenessLearner, miner: TacticalInsightMiner) -> Self {
        Self {
            effectiveness,
            miner,
        }
    }
}

/// Reject records that would poison the learners
///
/// Corrupt records are skipped with a warning during batch ingest; they
/// never abort the batch.
pub fn validate_session(session: &CombatSession) -> Result<()> {
    let corrupt = |reason: String| Err(CombatError::CorruptHistoryRecord(reason));

    if session.enemy_type.is_empty() || session.build.is_empty() {
        return corrupt(format!("session {:?} missing enemy type or build", session.id));
    }

    for event in &session.events {
        if !event.timestamp_secs.is_finite() || event.timestamp_secs < 0.0 {
            return corrupt(format!(
                "session {:?} has event with bad timestamp {}",
                session.id, event.timestamp_secs
            ));
        }
        if !event.damage_dealt.is_finite()
            || event.damage_dealt < 0.0
            || !event.damage_taken.is_finite()
            || event.damage_taken < 0.0
        {
            return corrupt(format!(
                "session {:?} has event with bad damage values",
                session.id
            ));
        }
        if !(0.0..=100.0).contains(&event.self_health_percent) {
            return corrupt(format!(
                "session {:?} has event with health percent {}",
                session.id, event.self_health_percent
            ));
        }
    }

    Ok(())
}

/// One full recomputation: validate, run both learners, derive the
/// per-enemy default actions, and assemble fresh tables
pub fn rebuild_tables(
    learner: &BatchLearner,
    sessions: &[CombatSession],
    catalog: &AbilityCatalog,
) -> RecommendationTables {
    let clean: Vec<&CombatSession> = sessions
        .iter()
        .filter(|s| match validate_session(s) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "skipping corrupt history record");
                false
            }
        })
        .collect();
    let clean: Vec<CombatSession> = clean.into_iter().cloned().collect();

    let (table, insights) = rayon::join(
        || learner.effectiveness.ingest(&clean),
        || learner.miner.analyze(&clean),
    );

    let defaults = derive_default_actions(&table, learner.effectiveness.weapon_map(), catalog);

    tracing::info!(
        sessions = clean.len(),
        effectiveness_pairs = table.len(),
        insights = insights.len(),
        "rebuilt recommendation tables"
    );

    RecommendationTables::from_learned(insights, &table, defaults)
}

/// Concrete default action per enemy class: the hardest-hitting catalog
/// action within the best sufficient weapon class
fn derive_default_actions(
    table: &[WeaponEffectiveness],
    map: &WeaponClassMap,
    catalog: &AbilityCatalog,
) -> AHashMap<String, ActionId> {
    let mut best_class: AHashMap<&str, (&str, f32)> = AHashMap::new();
    for entry in table {
        if !entry.sufficient {
            continue;
        }
        let current = best_class.get(entry.enemy_class.as_str());
        if current.map_or(true, |(_, score)| entry.score > *score) {
            best_class.insert(&entry.enemy_class, (&entry.weapon_class, entry.score));
        }
    }

    best_class
        .into_iter()
        .filter_map(|(enemy, (class, _))| {
            catalog
                .actions()
                .filter(|a| !a.is_heal() && map.classify(&a.id) == class)
                .max_by(|a, b| {
                    a.damage
                        .max
                        .partial_cmp(&b.damage.max)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|a| (enemy.to_string(), a.id.clone()))
        })
        .collect()
}

/// Periodic batch worker: read newly finalized sessions past the
/// cursor, fold them into the corpus, rebuild, publish
pub fn spawn_refresh_loop<S>(
    service: Arc<RecommendationService>,
    store: Arc<Mutex<S>>,
    learner: BatchLearner,
    catalog: AbilityCatalog,
    interval: Duration,
) -> tokio::task::JoinHandle<()>
where
    S: HistoryStore + Send + 'static,
{
    tokio::spawn(async move {
        let mut cursor = HistoryCursor::default();
        let mut corpus: Vec<CombatSession> = Vec::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let fresh = {
                let guard = store.lock().expect("history lock poisoned");
                let (batch, next) = guard.read_since(cursor);
                cursor = next;
                batch
            };

            if fresh.is_empty() {
                continue;
            }
            corpus.extend(fresh);

            let tables = rebuild_tables(&learner, &corpus, &catalog);
            service.publish(tables);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_fixtures::small_catalog;
    use crate::core::config::EngineConfig;
    use crate::history::test_fixtures::{event, session};
    use crate::history::{EventOutcome, SessionResult};
    use std::collections::BTreeMap;

    fn learner() -> BatchLearner {
        let config = EngineConfig::default();
        let mut classes = BTreeMap::new();
        classes.insert(
            "rifle".to_string(),
            vec!["rifle_shot".to_string(), "head_shot".to_string()],
        );
        classes.insert("medical".to_string(), vec!["bacta_heal".to_string()]);
        let map = WeaponClassMap::from_classes("unarmed".into(), classes);
        BatchLearner::new(
            EffectivenessLearner::new(map, &config),
            TacticalInsightMiner::new(&config),
        )
    }

    #[test]
    fn test_corrupt_session_rejected() {
        let mut bad = session(SessionResult::Victory, vec![]);
        bad.enemy_type.clear();
        assert!(validate_session(&bad).is_err());

        let mut bad_event = event("rifle_shot", 0.0, EventOutcome::Success);
        bad_event.self_health_percent = 250.0;
        let bad = session(SessionResult::Victory, vec![bad_event]);
        assert!(validate_session(&bad).is_err());

        let mut nan_event = event("rifle_shot", 0.0, EventOutcome::Success);
        nan_event.damage_dealt = f32::NAN;
        let bad = session(SessionResult::Victory, vec![nan_event]);
        assert!(validate_session(&bad).is_err());
    }

    #[test]
    fn test_corrupt_records_do_not_abort_rebuild() {
        let good_events: Vec<_> = (0..12)
            .map(|i| event("rifle_shot", i as f64, EventOutcome::Success))
            .collect();
        let good = session(SessionResult::Victory, good_events);

        let mut bad_event = event("rifle_shot", 0.0, EventOutcome::Success);
        bad_event.damage_taken = -5.0;
        let bad = session(SessionResult::Victory, vec![bad_event]);

        let catalog = small_catalog();
        let tables = rebuild_tables(&learner(), &[bad, good], &catalog);
        // The clean session alone is enough for a sufficient rifle pair
        assert!(tables.best_weapon("stormtrooper").is_some());
    }

    #[test]
    fn test_default_action_derived_from_best_class() {
        let events: Vec<_> = (0..12)
            .map(|i| event("rifle_shot", i as f64, EventOutcome::Success))
            .collect();
        let catalog = small_catalog();
        let tables = rebuild_tables(
            &learner(),
            &[session(SessionResult::Victory, events)],
            &catalog,
        );

        // head_shot hits harder than rifle_shot within the rifle class
        assert_eq!(
            tables.default_action("stormtrooper").unwrap().as_str(),
            "head_shot"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_loop_publishes_after_interval() {
        let config = EngineConfig::default();
        let service = Arc::new(RecommendationService::new());
        let store = Arc::new(Mutex::new(crate::history::MemoryHistoryStore::new()));
        let catalog = small_catalog();

        {
            let events: Vec<_> = (0..12)
                .map(|i| event("rifle_shot", i as f64, EventOutcome::Success))
                .collect();
            let mut guard = store.lock().unwrap();
            guard.append_session(session(SessionResult::Victory, events));
        }

        let handle = spawn_refresh_loop(
            service.clone(),
            store.clone(),
            learner(),
            catalog,
            Duration::from_secs(config.batch_interval_secs),
        );

        // First interval tick fires immediately under a paused clock
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(service.snapshot().best_weapon("stormtrooper").is_some());
        handle.abort();
    }
}
