//! Ability catalog: the immutable per-session table of usable actions
//!
//! Loaded once at session start and read-only thereafter. Validation
//! guarantees the fallback invariant: exactly one action sits in the
//! Fallback tier and it has zero cooldown, so the sequence builder can
//! always produce a non-empty queue.

pub mod action;
pub mod loader;
pub mod profile;

pub use action::{Action, ActionFlags, DamageRange, DamageType, PriorityTier};
pub use loader::{load_build, LoadedBuild};
pub use profile::{CombatProfile, EmergencyAction, TargetingPreference};

use ahash::AHashMap;

use crate::core::error::{CombatError, Result};
use crate::core::types::ActionId;

/// Immutable table of usable actions for one session
#[derive(Debug, Clone)]
pub struct AbilityCatalog {
    actions: AHashMap<ActionId, Action>,
    /// Declared order, used as the final tie-break when building queues
    order: Vec<ActionId>,
    fallback: ActionId,
}

impl AbilityCatalog {
    /// Build a catalog, enforcing the fallback invariant
    pub fn new(actions: Vec<Action>) -> Result<Self> {
        if actions.is_empty() {
            return Err(CombatError::ProfileLoad("catalog has no actions".into()));
        }

        for action in &actions {
            if !action.is_valid() {
                return Err(CombatError::ProfileLoad(format!(
                    "action '{}' has invalid cooldown, cast time, range, or damage bounds",
                    action.id
                )));
            }
        }

        let fallbacks: Vec<&Action> = actions
            .iter()
            .filter(|a| a.tier == PriorityTier::Fallback)
            .collect();

        let fallback = match fallbacks.as_slice() {
            [single] => {
                if single.cooldown_seconds != 0.0 {
                    return Err(CombatError::ProfileLoad(format!(
                        "fallback action '{}' must have zero cooldown (has {})",
                        single.id, single.cooldown_seconds
                    )));
                }
                single.id.clone()
            }
            [] => {
                return Err(CombatError::ProfileLoad(
                    "catalog has no fallback-tier action".into(),
                ))
            }
            many => {
                return Err(CombatError::ProfileLoad(format!(
                    "catalog has {} fallback-tier actions, expected exactly one",
                    many.len()
                )))
            }
        };

        let order: Vec<ActionId> = actions.iter().map(|a| a.id.clone()).collect();
        let mut map = AHashMap::with_capacity(actions.len());
        for action in actions {
            if map.insert(action.id.clone(), action).is_some() {
                return Err(CombatError::ProfileLoad(
                    "catalog contains duplicate action ids".into(),
                ));
            }
        }

        Ok(Self {
            actions: map,
            order,
            fallback,
        })
    }

    pub fn get(&self, id: &ActionId) -> Option<&Action> {
        self.actions.get(id)
    }

    /// The guaranteed zero-cooldown action
    pub fn fallback(&self) -> &Action {
        &self.actions[&self.fallback]
    }

    pub fn fallback_id(&self) -> &ActionId {
        &self.fallback
    }

    /// Declared position of an action, used for deterministic ordering
    pub fn declared_index(&self, id: &ActionId) -> usize {
        self.order.iter().position(|a| a == id).unwrap_or(usize::MAX)
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.order.iter().filter_map(|id| self.actions.get(id))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
