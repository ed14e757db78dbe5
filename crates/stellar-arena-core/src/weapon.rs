//! Weapons and the weapon library.

use crate::types::{DamageType, WeaponFamily};
use serde::{Deserialize, Serialize};

/// A mounted weapon. Only `cooldown_remaining` changes during a battle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weapon {
    pub name: String,
    /// Matchup family used by AI heuristics.
    #[serde(rename = "type", default)]
    pub family: WeaponFamily,
    /// Base damage before allocation scaling.
    pub damage: f64,
    pub energy_cost: f64,
    pub ap_cost: u32,
    /// Turns between shots.
    pub cooldown: u32,
    #[serde(default)]
    pub cooldown_remaining: u32,
    #[serde(default)]
    pub min_range: u32,
    pub max_range: u32,
    #[serde(default)]
    pub damage_type: DamageType,
}

impl Weapon {
    /// Whether a target at `distance` lies inside the range band (inclusive).
    pub fn in_range(&self, distance: u32) -> bool {
        distance >= self.min_range && distance <= self.max_range
    }

    /// Whether the weapon is off cooldown.
    pub fn is_ready(&self) -> bool {
        self.cooldown_remaining == 0
    }

    /// Tick the cooldown once at the start of the owner's turn.
    pub fn tick_cooldown(&mut self) {
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(1);
    }

    /// Middle of the range band, rounded toward the minimum.
    pub fn optimal_range(&self) -> u32 {
        self.min_range + self.max_range.saturating_sub(self.min_range) / 2
    }
}

/// Known weapon designs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeaponKind {
    LightLaser,
    PulseCannon,
    Missiles,
    HeavyCannon,
    PointDefense,
    IonDisruptor,
}

impl WeaponKind {
    /// Build a fresh weapon instance of this design.
    pub fn create(&self) -> Weapon {
        match self {
            WeaponKind::LightLaser => Weapon::energy("Light Laser", 20.0, 25.0, 1, 0, (0, 6)),
            WeaponKind::PulseCannon => Weapon::energy("Pulse Cannon", 30.0, 35.0, 1, 0, (0, 6)),
            WeaponKind::Missiles => Weapon::missile("Missiles", 55.0, 50.0, 1, 2, (2, 9)),
            WeaponKind::HeavyCannon => Weapon::kinetic("Heavy Cannon", 65.0, 60.0, 1, 1, (0, 7)),
            WeaponKind::PointDefense => Weapon::energy("Point Defense", 15.0, 20.0, 0, 0, (0, 4)),
            WeaponKind::IonDisruptor => Weapon::energy("Ion Disruptor", 30.0, 30.0, 1, 2, (1, 5))
                .with_damage_type(DamageType::Emp),
        }
    }
}

impl Weapon {
    /// Create an energy-family weapon.
    pub fn energy(
        name: &str,
        damage: f64,
        energy_cost: f64,
        ap_cost: u32,
        cooldown: u32,
        range: (u32, u32),
    ) -> Self {
        Self::design(
            name,
            WeaponFamily::Energy,
            DamageType::Energy,
            damage,
            energy_cost,
            ap_cost,
            cooldown,
            range,
        )
    }

    /// Create a kinetic-family weapon.
    pub fn kinetic(
        name: &str,
        damage: f64,
        energy_cost: f64,
        ap_cost: u32,
        cooldown: u32,
        range: (u32, u32),
    ) -> Self {
        Self::design(
            name,
            WeaponFamily::Kinetic,
            DamageType::Kinetic,
            damage,
            energy_cost,
            ap_cost,
            cooldown,
            range,
        )
    }

    /// Create a missile-family weapon with explosive warheads.
    pub fn missile(
        name: &str,
        damage: f64,
        energy_cost: f64,
        ap_cost: u32,
        cooldown: u32,
        range: (u32, u32),
    ) -> Self {
        Self::design(
            name,
            WeaponFamily::Missile,
            DamageType::Explosive,
            damage,
            energy_cost,
            ap_cost,
            cooldown,
            range,
        )
    }

    /// Replace the damage type, keeping the family.
    pub fn with_damage_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    #[allow(clippy::too_many_arguments)]
    fn design(
        name: &str,
        family: WeaponFamily,
        damage_type: DamageType,
        damage: f64,
        energy_cost: f64,
        ap_cost: u32,
        cooldown: u32,
        (min_range, max_range): (u32, u32),
    ) -> Self {
        Self {
            name: name.to_string(),
            family,
            damage,
            energy_cost,
            ap_cost,
            cooldown,
            cooldown_remaining: 0,
            min_range,
            max_range,
            damage_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_band_inclusive() {
        let mut weapon = WeaponKind::LightLaser.create();
        weapon.min_range = 2;
        weapon.max_range = 6;
        assert!(!weapon.in_range(1));
        assert!(weapon.in_range(2));
        assert!(weapon.in_range(4));
        assert!(weapon.in_range(6));
        assert!(!weapon.in_range(7));
    }

    #[test]
    fn test_optimal_range() {
        assert_eq!(WeaponKind::Missiles.create().optimal_range(), 5);
        assert_eq!(WeaponKind::LightLaser.create().optimal_range(), 3);
        assert_eq!(WeaponKind::HeavyCannon.create().optimal_range(), 3);
    }

    #[test]
    fn test_cooldown_tick_floors_at_zero() {
        let mut weapon = WeaponKind::Missiles.create();
        weapon.cooldown_remaining = 1;
        weapon.tick_cooldown();
        assert!(weapon.is_ready());
        weapon.tick_cooldown();
        assert_eq!(weapon.cooldown_remaining, 0);
    }

    #[test]
    fn test_library_creates_fresh_instances() {
        let mut first = WeaponKind::HeavyCannon.create();
        first.cooldown_remaining = 3;
        let second = WeaponKind::HeavyCannon.create();
        assert_eq!(second.cooldown_remaining, 0);
        assert_eq!(second.damage_type, DamageType::Kinetic);
    }

    #[test]
    fn test_weapon_json_field_names() {
        let json = serde_json::to_value(WeaponKind::Missiles.create()).unwrap();
        assert_eq!(json["type"], "missile");
        assert_eq!(json["damageType"], "explosive");
        assert_eq!(json["minRange"], 2);
        assert_eq!(json["cooldownRemaining"], 0);
    }
}
