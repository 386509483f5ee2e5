//! Action queue construction
//!
//! Builds the ordered queue for one tick: cooldown-filtered rotation in
//! priority order, emergency actions first, learned recommendation next,
//! fallback always last. Emergency conditions take precedence over any
//! learned recommendation.

use crate::catalog::{AbilityCatalog, Action, CombatProfile};
use crate::core::types::ActionId;
use crate::engine::executor::CooldownClock;
use crate::engine::targeting::Target;

/// Build the ordered action queue for the current tick
///
/// The returned queue is never empty: the profile's zero-cooldown
/// fallback is always appended when not already present.
pub fn build_queue(
    profile: &CombatProfile,
    catalog: &AbilityCatalog,
    clock: &CooldownClock,
    target: &Target,
    recommendation: Option<&ActionId>,
    self_health_percent: f32,
) -> Vec<ActionId> {
    // 1. Rotation minus anything still cooling down
    let mut queue: Vec<ActionId> = profile
        .rotation
        .iter()
        .filter(|id| clock.is_ready(id))
        .cloned()
        .collect();

    // 4. Priority tier first, declared order as the stable tie-break
    queue.sort_by(|a, b| {
        let tier_a = catalog.get(a).map(|x| x.tier);
        let tier_b = catalog.get(b).map(|x| x.tier);
        tier_b
            .cmp(&tier_a)
            .then_with(|| catalog.declared_index(a).cmp(&catalog.declared_index(b)))
    });

    // 2. Emergencies always win over any learned recommendation
    let mut crossed: Vec<&ActionId> = profile
        .crossed_emergencies(self_health_percent)
        .map(|e| &e.action)
        .collect();

    if !crossed.is_empty() {
        // Simultaneous thresholds resolve by the actions' own tiers
        crossed.sort_by(|a, b| {
            let tier_a = catalog.get(a).map(|x| x.tier);
            let tier_b = catalog.get(b).map(|x| x.tier);
            tier_b.cmp(&tier_a)
        });
        crossed.dedup();
        for id in crossed.into_iter().rev() {
            promote_to_front(&mut queue, id);
        }
    } else if let Some(rec) = recommendation {
        // 3. Recommendation goes first when it is actually usable
        if recommendation_usable(catalog, clock, target, rec) {
            promote_to_front(&mut queue, rec);
        }
    }

    // 5. The queue is never empty
    if !queue.contains(profile_fallback(catalog)) {
        queue.push(profile_fallback(catalog).clone());
    }

    queue
}

fn profile_fallback(catalog: &AbilityCatalog) -> &ActionId {
    catalog.fallback_id()
}

fn promote_to_front(queue: &mut Vec<ActionId>, id: &ActionId) {
    queue.retain(|q| q != id);
    queue.insert(0, id.clone());
}

fn recommendation_usable(
    catalog: &AbilityCatalog,
    clock: &CooldownClock,
    target: &Target,
    id: &ActionId,
) -> bool {
    let Some(action) = catalog.get(id) else {
        return false;
    };
    clock.is_ready(id) && in_range(action, target)
}

fn in_range(action: &Action, target: &Target) -> bool {
    // Heals are self-targeted and ignore target distance
    action.is_heal() || target.distance_meters <= action.range_meters
}
