//! Combat profiles: per-build rotation and emergency mapping
//!
//! A profile names the ordered rotation, the health-threshold emergency
//! actions, the targeting preference, and the fallback action. Loaded
//! once per session alongside the catalog and read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::catalog::AbilityCatalog;
use crate::core::error::{CombatError, Result};
use crate::core::types::ActionId;

/// How the target selector biases its scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetingPreference {
    HighestThreat,
    Nearest,
    LowestHealth,
}

/// Health threshold mapped to a reactive action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyAction {
    /// Fires when own health percent drops to or below this value
    pub health_threshold: f32,
    pub action: ActionId,
}

/// Per-build combat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatProfile {
    pub name: String,
    pub rotation: Vec<ActionId>,
    /// Kept sorted descending by threshold after `normalize`
    #[serde(rename = "emergency", default)]
    pub emergency_actions: Vec<EmergencyAction>,
    pub targeting: TargetingPreference,
    pub max_effective_range: f32,
    pub fallback_action: ActionId,
}

impl CombatProfile {
    /// Sort emergency thresholds descending so the first crossed entry
    /// is the highest threshold
    pub fn normalize(&mut self) {
        self.emergency_actions.sort_by(|a, b| {
            b.health_threshold
                .partial_cmp(&a.health_threshold)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// All emergency actions whose threshold the given health crosses
    pub fn crossed_emergencies(&self, self_health_percent: f32) -> impl Iterator<Item = &EmergencyAction> {
        self.emergency_actions
            .iter()
            .filter(move |e| self_health_percent <= e.health_threshold)
    }

    /// Check every referenced action id against the catalog
    pub fn validate_against(&self, catalog: &AbilityCatalog) -> Result<()> {
        if self.rotation.is_empty() {
            return Err(CombatError::ProfileLoad(format!(
                "profile '{}' has an empty rotation",
                self.name
            )));
        }

        for id in &self.rotation {
            if catalog.get(id).is_none() {
                return Err(CombatError::ProfileLoad(format!(
                    "profile '{}' rotation references unknown action '{}'",
                    self.name, id
                )));
            }
        }

        for emergency in &self.emergency_actions {
            if catalog.get(&emergency.action).is_none() {
                return Err(CombatError::ProfileLoad(format!(
                    "profile '{}' emergency references unknown action '{}'",
                    self.name, emergency.action
                )));
            }
            if !(0.0..=100.0).contains(&emergency.health_threshold) {
                return Err(CombatError::ProfileLoad(format!(
                    "profile '{}' emergency threshold {} outside [0, 100]",
                    self.name, emergency.health_threshold
                )));
            }
        }

        if &self.fallback_action != catalog.fallback_id() {
            return Err(CombatError::ProfileLoad(format!(
                "profile '{}' fallback '{}' does not match catalog fallback '{}'",
                self.name,
                self.fallback_action,
                catalog.fallback_id()
            )));
        }

        if self.max_effective_range <= 0.0 {
            return Err(CombatError::ProfileLoad(format!(
                "profile '{}' max_effective_range must be positive",
                self.name
            )));
        }

        Ok(())
    }
}
