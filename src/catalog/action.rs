//! Action definitions
//!
//! An action is one usable combat option: cooldown, cast time, damage
//! profile, range, and the priority tier used to order the rotation.

use serde::{Deserialize, Serialize};

use crate::core::types::ActionId;

/// Damage category an action deals (or Heal for restorative actions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    Kinetic,
    Energy,
    Heat,
    Cold,
    Electricity,
    Acid,
    Stun,
    Heal,
}

/// Coarse ranking used to order otherwise-equal candidate actions
///
/// Declared lowest-to-highest so the derived `Ord` makes Critical the
/// maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
    Fallback,
    Low,
    Medium,
    High,
    Critical,
}

/// Inclusive damage bounds for one use of an action
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DamageRange {
    pub min: f32,
    pub max: f32,
}

impl DamageRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> f32 {
        (self.min + self.max) / 2.0
    }

    pub fn is_valid(&self) -> bool {
        self.min >= 0.0 && self.min <= self.max
    }
}

/// Behavioral flags for an action
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ActionFlags {
    #[serde(default)]
    pub area_effect: bool,
    #[serde(default)]
    pub heal: bool,
    #[serde(default)]
    pub utility: bool,
}

/// One usable combat option
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub display_name: String,
    pub cooldown_seconds: f32,
    pub cast_time_seconds: f32,
    pub damage: DamageRange,
    pub damage_type: DamageType,
    pub range_meters: f32,
    pub tier: PriorityTier,
    #[serde(default)]
    pub flags: ActionFlags,
}

impl Action {
    /// Heals count whether flagged or typed as such
    pub fn is_heal(&self) -> bool {
        self.flags.heal || self.damage_type == DamageType::Heal
    }

    pub fn is_instant(&self) -> bool {
        self.cast_time_seconds <= 0.0
    }

    /// Structural validity independent of the containing catalog
    pub fn is_valid(&self) -> bool {
        self.cooldown_seconds >= 0.0
            && self.cast_time_seconds >= 0.0
            && self.range_meters >= 0.0
            && self.damage.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn strike() -> Action {
        Action {
            id: ActionId::new("strike"),
            display_name: "Strike".into(),
            cooldown_seconds: 0.0,
            cast_time_seconds: 0.0,
            damage: DamageRange::new(10.0, 20.0),
            damage_type: DamageType::Kinetic,
            range_meters: 5.0,
            tier: PriorityTier::Fallback,
            flags: ActionFlags::default(),
        }
    }

    #[test]
    fn test_tier_ordering() {
        assert!(PriorityTier::Critical > PriorityTier::High);
        assert!(PriorityTier::High > PriorityTier::Medium);
        assert!(PriorityTier::Medium > PriorityTier::Low);
        assert!(PriorityTier::Low > PriorityTier::Fallback);
    }

    #[test]
    fn test_damage_range_midpoint() {
        assert_eq!(DamageRange::new(10.0, 20.0).midpoint(), 15.0);
    }

    #[test]
    fn test_inverted_range_invalid() {
        let mut action = strike();
        action.damage = DamageRange::new(20.0, 10.0);
        assert!(!action.is_valid());
    }

    #[test]
    fn test_heal_by_type_or_flag() {
        let mut action = strike();
        assert!(!action.is_heal());
        action.damage_type = DamageType::Heal;
        assert!(action.is_heal());

        let mut action = strike();
        action.flags.heal = true;
        assert!(action.is_heal());
    }
}
