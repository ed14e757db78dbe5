//! Ability use for AI ships.

use super::targeting::count_weapons_in_range;
use crate::ability::AbilityKind;
use crate::ship::Ship;
use crate::types::AiProfile;

/// Any opposing weapon above this base damage makes evasion worthwhile.
const HEAVY_WEAPON_DAMAGE: f64 = 45.0;

/// Pick at most one ability slot to activate before moving.
///
/// Priority: shield surge, then evasive maneuver, then weapon overcharge.
pub fn choose_enemy_ability(ship: &Ship, target: Option<&Ship>) -> Option<usize> {
    if ship.abilities.is_empty() {
        return None;
    }

    let hull_ratio = if ship.max_hull > 0.0 {
        ship.hull / ship.max_hull
    } else {
        1.0
    };
    let shield_ratio = ship.shield_ratio();
    let profile = ship.ai_profile;

    if let Some(index) = ship.find_ability(AbilityKind::ShieldSurge) {
        if shield_ratio < 0.4 || hull_ratio < 0.5 || profile == AiProfile::Anchor {
            return Some(index);
        }
    }

    if let Some(index) = ship.find_ability(AbilityKind::EvasiveManeuver) {
        let fragile = if profile == AiProfile::Cautious { 0.55 } else { 0.35 };
        let heavy_guns = target.is_some_and(|t| {
            t.weapons.iter().any(|w| w.damage > HEAVY_WEAPON_DAMAGE)
        });
        if hull_ratio < fragile || heavy_guns {
            return Some(index);
        }
    }

    if let Some(index) = ship.find_ability(AbilityKind::WeaponOvercharge) {
        if profile != AiProfile::Cautious
            && hull_ratio > 0.4
            && ship.energy > ship.max_energy * 0.4
        {
            let ap_after = ship.action_points as i64 - ship.abilities[index].ap_cost as i64;
            let available = target.map_or(0, |t| count_weapons_in_range(ship, t).available);
            if ap_after >= 1 && (available > 0 || ap_after >= 2) {
                return Some(index);
            }
        }
    }

    None
}
