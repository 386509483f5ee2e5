//! Weapon effectiveness learning
//!
//! Aggregates historical events into per-(weapon class, enemy class)
//! effectiveness scores. Action-to-weapon-class classification goes
//! through a table loaded from configuration, never inline string
//! matching, so it stays testable in isolation.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::core::config::EngineConfig;
use crate::core::types::ActionId;
use crate::history::{CombatSession, EventOutcome};

/// Data-driven action-to-weapon-class lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponClassMap {
    by_action: AHashMap<ActionId, String>,
    default_class: String,
}

impl WeaponClassMap {
    /// Build the reverse index from a class -> action-ids table
    pub fn from_classes(default_class: String, classes: BTreeMap<String, Vec<String>>) -> Self {
        let mut by_action = AHashMap::new();
        for (class, action_ids) in classes {
            for id in action_ids {
                by_action.insert(ActionId::new(id), class.clone());
            }
        }
        Self {
            by_action,
            default_class,
        }
    }

    pub fn classify(&self, id: &ActionId) -> &str {
        self.by_action
            .get(id)
            .map(String::as_str)
            .unwrap_or(&self.default_class)
    }

    pub fn default_class(&self) -> &str {
        &self.default_class
    }
}

/// Learned performance of one weapon class against one enemy class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponEffectiveness {
    pub weapon_class: String,
    pub enemy_class: String,
    /// Normalized damage ratio, always in [0, 1]
    pub score: f32,
    pub sample_size: u32,
    /// Below the configured sample minimum: computed but withheld from
    /// the recommendation service
    pub sufficient: bool,
    pub last_updated: SystemTime,
}

#[derive(Debug, Default, Clone, Copy)]
struct PairAccumulator {
    dealt: f64,
    taken: f64,
    samples: u32,
}

/// Recomputes the effectiveness table from a session corpus
#[derive(Debug, Clone)]
pub struct EffectivenessLearner {
    map: WeaponClassMap,
    min_samples: u32,
}

impl EffectivenessLearner {
    pub fn new(map: WeaponClassMap, config: &EngineConfig) -> Self {
        Self {
            map,
            min_samples: config.min_effectiveness_samples,
        }
    }

    pub fn weapon_map(&self) -> &WeaponClassMap {
        &self.map
    }

    /// Full recomputation over the given corpus
    pub fn ingest(&self, sessions: &[CombatSession]) -> Vec<WeaponEffectiveness> {
        let mut pairs: BTreeMap<(String, String), PairAccumulator> = BTreeMap::new();

        for session in sessions {
            for event in &session.events {
                if event.outcome == EventOutcome::Aborted {
                    continue;
                }
                let weapon = self.map.classify(&event.action).to_string();
                let acc = pairs
                    .entry((weapon, event.enemy_type.clone()))
                    .or_default();
                acc.dealt += event.damage_dealt as f64;
                acc.taken += event.damage_taken as f64;
                acc.samples += 1;
            }
        }

        let now = SystemTime::now();
        pairs
            .into_iter()
            .map(|((weapon_class, enemy_class), acc)| WeaponEffectiveness {
                weapon_class,
                enemy_class,
                score: normalize_ratio(acc.dealt, acc.taken),
                sample_size: acc.samples,
                sufficient: acc.samples >= self.min_samples,
                last_updated: now,
            })
            .collect()
    }
}

/// Map a damage-dealt/damage-taken ratio onto [0, 1]
///
/// ratio / (ratio + 1): 0 damage dealt scores 0, an even trade scores
/// 0.5, and the score approaches 1 as the ratio grows. Clamped anyway
/// against non-finite input.
pub fn normalize_ratio(dealt: f64, taken: f64) -> f32 {
    let ratio = dealt.max(0.0) / taken.max(1.0);
    let score = ratio / (ratio + 1.0);
    score.clamp(0.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::test_fixtures::{event, session};
    use crate::history::SessionResult;
    use proptest::prelude::*;

    fn map() -> WeaponClassMap {
        let mut classes = BTreeMap::new();
        classes.insert(
            "rifle".to_string(),
            vec!["rifle_shot".to_string(), "head_shot".to_string()],
        );
        classes.insert("medical".to_string(), vec!["bacta_heal".to_string()]);
        WeaponClassMap::from_classes("unarmed".into(), classes)
    }

    fn learner() -> EffectivenessLearner {
        EffectivenessLearner::new(map(), &EngineConfig::default())
    }

    #[test]
    fn test_classification_is_table_driven() {
        let map = map();
        assert_eq!(map.classify(&"rifle_shot".into()), "rifle");
        assert_eq!(map.classify(&"bacta_heal".into()), "medical");
        assert_eq!(map.classify(&"force_lightning".into()), "unarmed");
    }

    #[test]
    fn test_ingest_accumulates_per_pair() {
        let sessions = vec![session(
            SessionResult::Victory,
            vec![
                event("rifle_shot", 0.0, EventOutcome::Success),
                event("head_shot", 1.0, EventOutcome::Success),
                event("bacta_heal", 2.0, EventOutcome::Success),
            ],
        )];

        let table = learner().ingest(&sessions);
        let rifle = table
            .iter()
            .find(|e| e.weapon_class == "rifle")
            .unwrap();
        assert_eq!(rifle.sample_size, 2);
        assert_eq!(rifle.enemy_class, "stormtrooper");
        assert!(!rifle.sufficient); // default minimum is 10
    }

    #[test]
    fn test_sufficiency_flag_at_minimum() {
        let events: Vec<_> = (0..10)
            .map(|i| event("rifle_shot", i as f64, EventOutcome::Success))
            .collect();
        let sessions = vec![session(SessionResult::Victory, events)];

        let table = learner().ingest(&sessions);
        assert!(table[0].sufficient);
    }

    #[test]
    fn test_aborted_events_excluded() {
        let sessions = vec![session(
            SessionResult::Aborted,
            vec![event("rifle_shot", 0.0, EventOutcome::Aborted)],
        )];
        assert!(learner().ingest(&sessions).is_empty());
    }

    #[test]
    fn test_zero_dealt_scores_zero() {
        assert_eq!(normalize_ratio(0.0, 500.0), 0.0);
    }

    #[test]
    fn test_even_trade_scores_half() {
        assert!((normalize_ratio(100.0, 100.0) - 0.5).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_score_always_in_unit_interval(
            dealt in 0.0f64..1e12,
            taken in 0.0f64..1e12,
        ) {
            let score = normalize_ratio(dealt, taken);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn prop_more_damage_never_lowers_score(
            dealt in 0.0f64..1e6,
            extra in 0.0f64..1e6,
            taken in 0.0f64..1e6,
        ) {
            prop_assert!(
                normalize_ratio(dealt + extra, taken) >= normalize_ratio(dealt, taken)
            );
        }
    }
}
