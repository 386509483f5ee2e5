//! Engine configuration with documented constants
//!
//! All tuning values are collected here with explanations of their purpose
//! and how they interact with each other.

/// Configuration for the combat decision engine and its learning path
///
/// These values have been tuned against replay traces. Changing them
/// shifts how aggressively the engine reacts and how cautious the
/// learned recommendations are.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // === PERCEPTION ===
    /// Expected interval between perception ticks (milliseconds)
    ///
    /// Drives the cooldown clock and the floor for acknowledgment
    /// timeouts. The recognition collaborator should deliver frames
    /// at roughly this cadence.
    pub tick_interval_ms: u64,

    /// Age beyond which a perception frame counts as stale (milliseconds)
    ///
    /// Must exceed tick_interval_ms, otherwise every frame that arrives
    /// slightly late would count against the staleness run.
    pub staleness_bound_ms: u64,

    /// Consecutive stale ticks before the tracker forces Idle
    ///
    /// At the default (4) with a 250ms tick, one second of blind
    /// perception drops the engine out of combat decisions.
    pub stale_ticks_to_idle: u32,

    // === TARGET SCORING ===
    /// Weight on a target's threat level (w1)
    pub threat_weight: f32,

    /// Weight on inverse distance (w2)
    ///
    /// At 10.0, a target 2m away contributes 5.0 before threat,
    /// roughly equal to a mid-threat enemy at range.
    pub proximity_weight: f32,

    /// Weight on the kill-securable bonus (w3)
    ///
    /// Applied when a target is near death and a lethal action is off
    /// cooldown. Finishing wounded targets shortens encounters.
    pub kill_secure_weight: f32,

    /// Target health percent at or below which a kill is "securable"
    pub kill_secure_health_percent: f32,

    /// Bias multiplier applied to the weight matching the profile's
    /// targeting preference (nearest boosts proximity, etc.)
    pub preference_bias: f32,

    // === SITUATION BUCKETING ===
    /// Seconds from session start that still count as the opening
    pub opening_window_secs: f64,

    /// Own health percent below which the situation is LowHealth
    pub low_health_percent: f32,

    /// Window over which incoming damage is summed (seconds)
    pub incoming_damage_window_secs: f64,

    /// Summed damage taken over the window that flips the situation
    /// to HighIncomingDamage
    pub incoming_damage_threshold: f32,

    /// Own health percent below which the static heuristic prefers a
    /// heal/defensive action (recommendation tier 3)
    pub critical_health_percent: f32,

    // === LEARNING ===
    /// Minimum events before a (weapon, enemy) effectiveness pair is
    /// exposed to the recommendation service
    pub min_effectiveness_samples: u32,

    /// Minimum sessions-worth of events before a tactical insight is
    /// published
    pub min_insight_samples: u32,

    /// Minimum Wilson lower bound for a published insight
    pub min_insight_confidence: f32,

    /// z value for the Wilson lower bound (1.0 ~ 84% one-sided)
    ///
    /// Deliberately loose: at 1.96 a 9-of-10 bucket would bound below
    /// 0.7 and nothing would publish until corpora grow very large.
    pub wilson_z: f32,

    /// Interval between batch table rebuilds (seconds)
    pub batch_interval_secs: u64,

    // === EXECUTION ===
    /// Roll damage at the range midpoint instead of uniformly
    ///
    /// Replay/test mode only; live sessions roll uniformly.
    pub deterministic_damage: bool,

    /// Nominal health pool used to convert health-percent deltas into
    /// damage-taken estimates for history events
    pub nominal_health_pool: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Perception
            tick_interval_ms: 250,
            staleness_bound_ms: 750,
            stale_ticks_to_idle: 4,

            // Target scoring
            threat_weight: 1.0,
            proximity_weight: 10.0,
            kill_secure_weight: 5.0,
            kill_secure_health_percent: 25.0,
            preference_bias: 2.0,

            // Situations
            opening_window_secs: 10.0,
            low_health_percent: 30.0,
            incoming_damage_window_secs: 5.0,
            incoming_damage_threshold: 150.0,
            critical_health_percent: 35.0,

            // Learning
            min_effectiveness_samples: 10,
            min_insight_samples: 5,
            min_insight_confidence: 0.7,
            wilson_z: 1.0,
            batch_interval_secs: 300,

            // Execution
            deterministic_damage: false,
            nominal_health_pool: 1000.0,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.staleness_bound_ms <= self.tick_interval_ms {
            return Err(format!(
                "staleness_bound_ms ({}) must exceed tick_interval_ms ({})",
                self.staleness_bound_ms, self.tick_interval_ms
            ));
        }

        if self.stale_ticks_to_idle == 0 {
            return Err("stale_ticks_to_idle must be at least 1".into());
        }

        if self.threat_weight < 0.0
            || self.proximity_weight < 0.0
            || self.kill_secure_weight < 0.0
        {
            return Err("scoring weights must be non-negative".into());
        }

        if !(0.0..=100.0).contains(&self.low_health_percent)
            || !(0.0..=100.0).contains(&self.critical_health_percent)
            || !(0.0..=100.0).contains(&self.kill_secure_health_percent)
        {
            return Err("health thresholds must lie in [0, 100]".into());
        }

        if !(0.0..=1.0).contains(&self.min_insight_confidence) {
            return Err(format!(
                "min_insight_confidence ({}) must lie in [0, 1]",
                self.min_insight_confidence
            ));
        }

        if self.min_insight_samples == 0 {
            return Err("min_insight_samples must be at least 1".into());
        }

        if self.wilson_z <= 0.0 {
            return Err(format!(
                "wilson_z ({}) must be positive",
                self.wilson_z
            ));
        }

        Ok(())
    }

    /// One perception tick expressed in seconds
    pub fn tick_seconds(&self) -> f32 {
        self.tick_interval_ms as f32 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_staleness_must_exceed_tick() {
        let config = EngineConfig {
            staleness_bound_ms: 100,
            tick_interval_ms: 250,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_confidence_bounds_checked() {
        let config = EngineConfig {
            min_insight_confidence: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wilson_z_must_be_positive() {
        let config = EngineConfig {
            wilson_z: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
