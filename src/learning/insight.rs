//! Tactical insight mining
//!
//! Groups historical sessions by (enemy type, build), buckets their
//! events into situations, and recommends the empirically best action
//! per bucket. Confidence is a Wilson lower bound so small samples
//! cannot masquerade as certainty; buckets failing the publish
//! thresholds are discarded, not retried.

use ahash::AHashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::core::config::EngineConfig;
use crate::core::types::{ActionId, Situation};
use crate::history::{CombatEvent, CombatSession, EventOutcome};

/// Published recommendation for one (enemy, build, situation) key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TacticalInsight {
    pub enemy_type: String,
    pub build: String,
    pub situation: Situation,
    pub recommended_action: ActionId,
    pub success_rate: f32,
    /// Wilson lower bound on the success rate
    pub confidence: f32,
    pub sample_size: u32,
    pub last_updated: SystemTime,
}

/// Lower bound of the Wilson score interval for a Bernoulli proportion
///
/// Returns 0 for empty samples.
pub fn wilson_lower_bound(successes: u32, samples: u32, z: f32) -> f32 {
    if samples == 0 {
        return 0.0;
    }
    let n = samples as f64;
    let p = successes as f64 / n;
    let z = z as f64;
    let z2 = z * z;

    let denom = 1.0 + z2 / n;
    let center = p + z2 / (2.0 * n);
    let spread = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();

    (((center - spread) / denom).clamp(0.0, 1.0)) as f32
}

#[derive(Debug, Default, Clone, Copy)]
struct ActionTally {
    successes: u32,
    samples: u32,
}

/// Mines per-situation recommendations from a session corpus
#[derive(Debug, Clone)]
pub struct TacticalInsightMiner {
    opening_window_secs: f64,
    low_health_percent: f32,
    incoming_damage_window_secs: f64,
    incoming_damage_threshold: f32,
    min_samples: u32,
    min_confidence: f32,
    wilson_z: f32,
}

impl TacticalInsightMiner {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            opening_window_secs: config.opening_window_secs,
            low_health_percent: config.low_health_percent,
            incoming_damage_window_secs: config.incoming_damage_window_secs,
            incoming_damage_threshold: config.incoming_damage_threshold,
            min_samples: config.min_insight_samples,
            min_confidence: config.min_insight_confidence,
            wilson_z: config.wilson_z,
        }
    }

    /// Full recomputation over the given corpus
    pub fn analyze(&self, sessions: &[CombatSession]) -> Vec<TacticalInsight> {
        // (enemy, build, situation) -> action -> tally. BTreeMap keys
        // keep the output deterministically ordered.
        let mut buckets: BTreeMap<(String, String, Situation), AHashMap<ActionId, ActionTally>> =
            BTreeMap::new();

        for session in sessions {
            for (index, event) in session.events.iter().enumerate() {
                if event.outcome == EventOutcome::Aborted {
                    continue;
                }
                let situation = self.bucket_event(session, index, event);
                let tally = buckets
                    .entry((
                        session.enemy_type.clone(),
                        session.build.clone(),
                        situation,
                    ))
                    .or_default()
                    .entry(event.action.clone())
                    .or_default();
                tally.samples += 1;
                if event.outcome == EventOutcome::Success {
                    tally.successes += 1;
                }
            }
        }

        let now = SystemTime::now();
        buckets
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .filter_map(|((enemy_type, build, situation), tallies)| {
                self.pick_best(tallies).and_then(|(action, tally)| {
                    let confidence =
                        wilson_lower_bound(tally.successes, tally.samples, self.wilson_z);
                    if tally.samples < self.min_samples || confidence < self.min_confidence {
                        tracing::debug!(
                            enemy = %enemy_type,
                            %build,
                            %situation,
                            samples = tally.samples,
                            confidence,
                            "insight below publish thresholds, discarded"
                        );
                        return None;
                    }
                    Some(TacticalInsight {
                        enemy_type,
                        build,
                        situation,
                        recommended_action: action,
                        success_rate: tally.successes as f32 / tally.samples as f32,
                        confidence,
                        sample_size: tally.samples,
                        last_updated: now,
                    })
                })
            })
            .collect()
    }

    /// Arg-max action by success rate; ties break by sample size then id
    fn pick_best(&self, tallies: AHashMap<ActionId, ActionTally>) -> Option<(ActionId, ActionTally)> {
        tallies.into_iter().max_by(|(id_a, a), (id_b, b)| {
            let rate_a = a.successes as f64 / a.samples.max(1) as f64;
            let rate_b = b.successes as f64 / b.samples.max(1) as f64;
            rate_a
                .partial_cmp(&rate_b)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.samples.cmp(&b.samples))
                .then(id_b.as_str().cmp(id_a.as_str()))
        })
    }

    /// Situation bucket for one historical event
    fn bucket_event(&self, session: &CombatSession, index: usize, event: &CombatEvent) -> Situation {
        if index == 0 || event.timestamp_secs < self.opening_window_secs {
            return Situation::Opening;
        }
        if event.self_health_percent < self.low_health_percent {
            return Situation::LowHealth;
        }

        let window_start = event.timestamp_secs - self.incoming_damage_window_secs;
        let recent_taken: f32 = session.events[..index]
            .iter()
            .filter(|e| e.timestamp_secs >= window_start)
            .map(|e| e.damage_taken)
            .sum();
        if recent_taken > self.incoming_damage_threshold {
            return Situation::HighIncomingDamage;
        }

        Situation::Normal
    }
}
