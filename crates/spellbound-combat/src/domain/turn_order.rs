//! Speed-ranked turn order.

use spellbound_core::rng::DeterministicRng;

use super::combatant::Combatant;

/// Names of `combatants`, fastest first.
///
/// Combatants are shuffled before a stable descending sort, so equal speeds
/// come out in a fresh random order on every call while distinct speeds are
/// always strictly ordered.
pub fn order_by_speed(combatants: &[&Combatant], rng: &mut dyn DeterministicRng) -> Vec<String> {
    let mut ranked: Vec<&Combatant> = combatants.to_vec();

    // Fisher–Yates.
    for i in (1..ranked.len()).rev() {
        let bound = u32::try_from(i).unwrap_or(u32::MAX);
        let j = rng.next_u32_range(0, bound) as usize;
        ranked.swap(i, j.min(i));
    }

    ranked.sort_by(|a, b| b.stats.speed.cmp(&a.stats.speed));
    ranked.into_iter().map(|c| c.name.clone()).collect()
}
