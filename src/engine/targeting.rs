//! Target selection
//!
//! Scores eligible targets on threat, proximity, and kill security.
//! Ties break by distance then id so replays are deterministic. An empty
//! result means "go idle", never an error.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::catalog::{AbilityCatalog, CombatProfile, TargetingPreference};
use crate::core::config::EngineConfig;
use crate::core::types::TargetId;
use crate::engine::executor::CooldownClock;

const DISTANCE_EPSILON: f32 = 0.5;

/// One perceived enemy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub health_percent: f32,
    pub distance_meters: f32,
    pub threat_level: f32,
    /// Enemy classification tag from the recognition collaborator
    pub classification: String,
}

impl Target {
    pub fn is_dead(&self) -> bool {
        self.health_percent <= 0.0
    }
}

/// Scoring weights resolved from config plus the profile's preference bias
#[derive(Debug, Clone, Copy)]
struct ResolvedWeights {
    threat: f32,
    proximity: f32,
    kill_secure: f32,
}

fn resolve_weights(config: &EngineConfig, preference: TargetingPreference) -> ResolvedWeights {
    let mut w = ResolvedWeights {
        threat: config.threat_weight,
        proximity: config.proximity_weight,
        kill_secure: config.kill_secure_weight,
    };
    match preference {
        TargetingPreference::HighestThreat => w.threat *= config.preference_bias,
        TargetingPreference::Nearest => w.proximity *= config.preference_bias,
        TargetingPreference::LowestHealth => w.kill_secure *= config.preference_bias,
    }
    w
}

/// Pick the best eligible target, or None when nothing is worth engaging
pub fn select_target<'a>(
    targets: &'a [Target],
    profile: &CombatProfile,
    catalog: &AbilityCatalog,
    clock: &CooldownClock,
    config: &EngineConfig,
) -> Option<&'a Target> {
    let weights = resolve_weights(config, profile.targeting);
    let lethal_available = best_ready_damage(catalog, clock);

    targets
        .iter()
        .filter(|t| !t.is_dead() && t.distance_meters <= profile.max_effective_range)
        .max_by_key(|t| {
            let score = score_target(t, weights, lethal_available, config);
            // max_by_key keeps the later element on ties; invert distance
            // and id so the nearest (then lowest id) wins instead.
            (
                OrderedFloat(score),
                std::cmp::Reverse(OrderedFloat(t.distance_meters)),
                std::cmp::Reverse(t.id),
            )
        })
}

fn score_target(
    target: &Target,
    weights: ResolvedWeights,
    best_ready_damage: f32,
    config: &EngineConfig,
) -> f32 {
    let mut score = weights.threat * target.threat_level
        + weights.proximity / target.distance_meters.max(DISTANCE_EPSILON);

    if kill_securable(target, best_ready_damage, config) {
        score += weights.kill_secure;
    }

    score
}

/// A kill is securable when the target is near death and some ready
/// action could plausibly finish it (max damage covers the remaining
/// fraction of a nominal health pool).
fn kill_securable(target: &Target, best_ready_damage: f32, config: &EngineConfig) -> bool {
    if target.health_percent > config.kill_secure_health_percent {
        return false;
    }
    let remaining = target.health_percent / 100.0 * config.nominal_health_pool;
    best_ready_damage >= remaining
}

/// Highest max-damage among off-cooldown actions
fn best_ready_damage(catalog: &AbilityCatalog, clock: &CooldownClock) -> f32 {
    catalog
        .actions()
        .filter(|a| !a.is_heal() && clock.is_ready(&a.id))
        .map(|a| a.damage.max)
        .fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::profile::test_fixtures::medic_profile;
    use crate::catalog::test_fixtures::small_catalog;
    use uuid::Uuid;

    fn target(health: f32, distance: f32, threat: f32) -> Target {
        Target {
            id: TargetId::new(),
            health_percent: health,
            distance_meters: distance,
            threat_level: threat,
            classification: "stormtrooper".into(),
        }
    }

    fn select<'a>(targets: &'a [Target]) -> Option<&'a Target> {
        let catalog = small_catalog();
        let clock = CooldownClock::new();
        select_target(
            targets,
            &medic_profile(),
            &catalog,
            &clock,
            &EngineConfig::default(),
        )
    }

    #[test]
    fn test_empty_field_yields_none() {
        assert!(select(&[]).is_none());
    }

    #[test]
    fn test_dead_and_out_of_range_filtered() {
        let targets = vec![target(0.0, 5.0, 10.0), target(100.0, 200.0, 10.0)];
        assert!(select(&targets).is_none());
    }

    #[test]
    fn test_higher_threat_wins_at_equal_distance() {
        let targets = vec![target(100.0, 10.0, 1.0), target(100.0, 10.0, 8.0)];
        let chosen = select(&targets).unwrap();
        assert_eq!(chosen.threat_level, 8.0);
    }

    #[test]
    fn test_tie_broken_by_distance() {
        let targets = vec![target(100.0, 20.0, 5.0), target(100.0, 19.0, 5.0)];
        // Nearer target scores higher on proximity alone, but even with
        // equal scores the comparator prefers the smaller distance.
        let chosen = select(&targets).unwrap();
        assert_eq!(chosen.distance_meters, 19.0);
    }

    #[test]
    fn test_tie_broken_by_id_for_determinism() {
        let mut a = target(100.0, 10.0, 5.0);
        let mut b = target(100.0, 10.0, 5.0);
        a.id = TargetId(Uuid::from_u128(1));
        b.id = TargetId(Uuid::from_u128(2));

        let forward = vec![a.clone(), b.clone()];
        let reversed = vec![b, a];
        assert_eq!(select(&forward).unwrap().id, select(&reversed).unwrap().id);
        assert_eq!(select(&forward).unwrap().id, TargetId(Uuid::from_u128(1)));
    }

    #[test]
    fn test_kill_secure_bonus_prefers_wounded_target() {
        // Wounded target slightly farther: without the bonus the nearer
        // full-health enemy would win.
        let targets = vec![target(100.0, 10.0, 5.0), target(10.0, 11.0, 5.0)];
        let chosen = select(&targets).unwrap();
        assert_eq!(chosen.health_percent, 10.0);
    }

    #[test]
    fn test_nearest_preference_biases_proximity() {
        let config = EngineConfig::default();
        let catalog = small_catalog();
        let clock = CooldownClock::new();
        let mut profile = medic_profile();
        profile.targeting = TargetingPreference::Nearest;

        // High threat far away vs low threat nearby
        let targets = vec![target(100.0, 30.0, 9.0), target(100.0, 2.0, 2.0)];
        let chosen = select_target(&targets, &profile, &catalog, &clock, &config).unwrap();
        assert_eq!(chosen.distance_meters, 2.0);
    }
}
