//! Recommendation service
//!
//! One bounded-latency query unifying both learners: exact tactical
//! insight first, effectiveness-informed default second, static
//! heuristic last. Total: the query never returns an absent value,
//! including cold start with no history at all.
//!
//! Readers take an `Arc` snapshot of the active tables; the batch job
//! publishes a fully rebuilt replacement in one swap, so a query never
//! observes a partially rebuilt table.

use ahash::AHashMap;
use std::sync::{Arc, RwLock};

use crate::catalog::AbilityCatalog;
use crate::core::config::EngineConfig;
use crate::core::error::CombatError;
use crate::core::types::{ActionId, Situation};
use crate::engine::executor::CooldownClock;
use crate::learning::effectiveness::WeaponEffectiveness;
use crate::learning::insight::TacticalInsight;

/// Immutable lookup tables produced by one batch rebuild
#[derive(Debug, Default)]
pub struct RecommendationTables {
    insights: AHashMap<(String, String, Situation), TacticalInsight>,
    /// Best sufficient weapon class per enemy class, with its score
    best_weapon_by_enemy: AHashMap<String, (String, f32)>,
    /// Concrete default action per enemy class, derived from the best
    /// weapon class
    default_action_by_enemy: AHashMap<String, ActionId>,
}

impl RecommendationTables {
    pub fn from_learned(
        insights: Vec<TacticalInsight>,
        effectiveness: &[WeaponEffectiveness],
        default_actions: AHashMap<String, ActionId>,
    ) -> Self {
        let mut insight_map = AHashMap::with_capacity(insights.len());
        for insight in insights {
            insight_map.insert(
                (
                    insight.enemy_type.clone(),
                    insight.build.clone(),
                    insight.situation,
                ),
                insight,
            );
        }

        let mut best_weapon: AHashMap<String, (String, f32)> = AHashMap::new();
        for entry in effectiveness {
            // Insufficient pairs are computed but never exposed here
            if !entry.sufficient {
                continue;
            }
            let current = best_weapon.get(&entry.enemy_class);
            if current.map_or(true, |(_, score)| entry.score > *score) {
                best_weapon.insert(
                    entry.enemy_class.clone(),
                    (entry.weapon_class.clone(), entry.score),
                );
            }
        }

        Self {
            insights: insight_map,
            best_weapon_by_enemy: best_weapon,
            default_action_by_enemy: default_actions,
        }
    }

    pub fn insight(
        &self,
        enemy_type: &str,
        build: &str,
        situation: Situation,
    ) -> Option<&TacticalInsight> {
        self.insights
            .get(&(enemy_type.to_string(), build.to_string(), situation))
    }

    pub fn default_action(&self, enemy_type: &str) -> Option<&ActionId> {
        self.default_action_by_enemy.get(enemy_type)
    }

    pub fn best_weapon(&self, enemy_type: &str) -> Option<&(String, f32)> {
        self.best_weapon_by_enemy.get(enemy_type)
    }

    /// Highest-scoring published weapon class overall (metrics)
    pub fn most_effective_weapon(&self) -> Option<&str> {
        self.best_weapon_by_enemy
            .values()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(class, _)| class.as_str())
    }

    /// Most confident published insight (metrics)
    pub fn most_effective_tactic(&self) -> Option<&TacticalInsight> {
        self.insights.values().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    pub fn insight_count(&self) -> usize {
        self.insights.len()
    }
}

/// Shared, swap-on-publish recommendation endpoint
#[derive(Debug, Default)]
pub struct RecommendationService {
    tables: RwLock<Arc<RecommendationTables>>,
}

impl RecommendationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the active tables
    pub fn publish(&self, tables: RecommendationTables) {
        let fresh = Arc::new(tables);
        let mut guard = self.tables.write().expect("recommendation lock poisoned");
        *guard = fresh;
    }

    /// Snapshot of the active tables; stays valid across later swaps
    pub fn snapshot(&self) -> Arc<RecommendationTables> {
        self.tables
            .read()
            .expect("recommendation lock poisoned")
            .clone()
    }

    /// Best known action for the situation. Never absent: falls through
    /// insight -> effectiveness default -> static heuristic.
    pub fn optimal_action(
        &self,
        enemy_type: &str,
        build: &str,
        situation: Situation,
        self_health_percent: f32,
        target_health_percent: f32,
        catalog: &AbilityCatalog,
        clock: &CooldownClock,
        config: &EngineConfig,
    ) -> ActionId {
        let tables = self.snapshot();

        // Tier 1: exact insight match
        if let Some(insight) = tables.insight(enemy_type, build, situation) {
            if catalog.get(&insight.recommended_action).is_some() {
                return insight.recommended_action.clone();
            }
        }

        // Tier 2: effectiveness-informed default for this enemy
        if let Some(action) = tables.default_action(enemy_type) {
            if catalog.get(action).is_some() {
                tracing::debug!(
                    enemy = enemy_type,
                    %situation,
                    "no tactical insight, using effectiveness default"
                );
                return action.clone();
            }
        }

        // Tier 3: static situational heuristic (cold start)
        let error = CombatError::InsufficientTrainingData(format!(
            "no tables cover {enemy_type} ({situation})"
        ));
        tracing::debug!(%error, "using static heuristic");
        static_heuristic(
            self_health_percent,
            target_health_percent,
            catalog,
            clock,
            config,
        )
    }
}

/// Cold-start policy: heal when critical, finish wounded targets with
/// the biggest single hit, otherwise the best sustained damage. The
/// zero-cooldown fallback guarantees a result.
fn static_heuristic(
    self_health_percent: f32,
    target_health_percent: f32,
    catalog: &AbilityCatalog,
    clock: &CooldownClock,
    config: &EngineConfig,
) -> ActionId {
    if self_health_percent < config.critical_health_percent {
        if let Some(heal) = catalog
            .actions()
            .find(|a| a.is_heal() && clock.is_ready(&a.id))
        {
            return heal.id.clone();
        }
    }

    let ready_offense = catalog
        .actions()
        .filter(|a| !a.is_heal() && clock.is_ready(&a.id));

    let pick = if target_health_percent <= config.kill_secure_health_percent {
        ready_offense.max_by(|a, b| {
            a.damage
                .max
                .partial_cmp(&b.damage.max)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    } else {
        ready_offense.max_by(|a, b| {
            a.damage
                .midpoint()
                .partial_cmp(&b.damage.midpoint())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    };

    pick.map(|a| a.id.clone())
        .unwrap_or_else(|| catalog.fallback_id().clone())
}
