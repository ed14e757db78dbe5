//! Persistent ship upgrades earned between battles.
//!
//! Picking upgrades is the campaign's job. This module only knows what each
//! upgrade does to a ship and how it is keyed in saved data.

use crate::ship::Ship;
use serde::{Deserialize, Serialize};

/// Broad grouping shown in upgrade pickers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeCategory {
    Weapon,
    Defense,
    Mobility,
    Utility,
}

/// Known upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpgradeKind {
    ReinforcedBarrel,
    EfficientCapacitors,
    RapidReloader,
    ExtendedRange,
    ReinforcedHull,
    ShieldBooster,
    ReactiveArmor,
    ThrusterUpgrade,
    ImprovedReactor,
    AgileManeuvers,
    AdvancedSensors,
    EmergencyRepair,
}

impl UpgradeKind {
    pub const fn all() -> &'static [UpgradeKind] {
        &[
            UpgradeKind::ReinforcedBarrel,
            UpgradeKind::EfficientCapacitors,
            UpgradeKind::RapidReloader,
            UpgradeKind::ExtendedRange,
            UpgradeKind::ReinforcedHull,
            UpgradeKind::ShieldBooster,
            UpgradeKind::ReactiveArmor,
            UpgradeKind::ThrusterUpgrade,
            UpgradeKind::ImprovedReactor,
            UpgradeKind::AgileManeuvers,
            UpgradeKind::AdvancedSensors,
            UpgradeKind::EmergencyRepair,
        ]
    }

    /// Key used in saved ship records.
    pub const fn key(&self) -> &'static str {
        match self {
            UpgradeKind::ReinforcedBarrel => "reinforcedBarrel",
            UpgradeKind::EfficientCapacitors => "efficientCapacitors",
            UpgradeKind::RapidReloader => "rapidReloader",
            UpgradeKind::ExtendedRange => "extendedRange",
            UpgradeKind::ReinforcedHull => "reinforcedHull",
            UpgradeKind::ShieldBooster => "shieldBooster",
            UpgradeKind::ReactiveArmor => "reactiveArmor",
            UpgradeKind::ThrusterUpgrade => "thrusterUpgrade",
            UpgradeKind::ImprovedReactor => "improvedReactor",
            UpgradeKind::AgileManeuvers => "agileManeuvers",
            UpgradeKind::AdvancedSensors => "advancedSensors",
            UpgradeKind::EmergencyRepair => "emergencyRepair",
        }
    }

    pub fn from_key(key: &str) -> Option<UpgradeKind> {
        Self::all().iter().copied().find(|u| u.key() == key)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            UpgradeKind::ReinforcedBarrel => "Reinforced Barrel",
            UpgradeKind::EfficientCapacitors => "Efficient Capacitors",
            UpgradeKind::RapidReloader => "Rapid Reloader",
            UpgradeKind::ExtendedRange => "Extended Range",
            UpgradeKind::ReinforcedHull => "Reinforced Hull",
            UpgradeKind::ShieldBooster => "Shield Booster",
            UpgradeKind::ReactiveArmor => "Reactive Armor",
            UpgradeKind::ThrusterUpgrade => "Thruster Upgrade",
            UpgradeKind::ImprovedReactor => "Improved Reactor",
            UpgradeKind::AgileManeuvers => "Agile Maneuvers",
            UpgradeKind::AdvancedSensors => "Advanced Sensors",
            UpgradeKind::EmergencyRepair => "Emergency Repair",
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            UpgradeKind::ReinforcedBarrel => "+10% weapon damage",
            UpgradeKind::EfficientCapacitors => "-20% weapon energy cost",
            UpgradeKind::RapidReloader => "-1 turn cooldown on all weapons",
            UpgradeKind::ExtendedRange => "+2 weapon range",
            UpgradeKind::ReinforcedHull => "+20% max hull",
            UpgradeKind::ShieldBooster => "+30% max shields",
            UpgradeKind::ReactiveArmor => "+5 armor",
            UpgradeKind::ThrusterUpgrade => "+1 action point",
            UpgradeKind::ImprovedReactor => "+20 max energy & +10 reactor output",
            UpgradeKind::AgileManeuvers => "+1 speed",
            UpgradeKind::AdvancedSensors => "+15 initiative roll",
            UpgradeKind::EmergencyRepair => "Restore 30% hull",
        }
    }

    pub const fn category(&self) -> UpgradeCategory {
        match self {
            UpgradeKind::ReinforcedBarrel
            | UpgradeKind::EfficientCapacitors
            | UpgradeKind::RapidReloader
            | UpgradeKind::ExtendedRange => UpgradeCategory::Weapon,
            UpgradeKind::ReinforcedHull | UpgradeKind::ShieldBooster | UpgradeKind::ReactiveArmor => {
                UpgradeCategory::Defense
            }
            UpgradeKind::ThrusterUpgrade
            | UpgradeKind::ImprovedReactor
            | UpgradeKind::AgileManeuvers => UpgradeCategory::Mobility,
            UpgradeKind::AdvancedSensors | UpgradeKind::EmergencyRepair => UpgradeCategory::Utility,
        }
    }
}

impl Ship {
    /// Apply an upgrade and record it. Stat bonuses round down.
    pub fn apply_upgrade(&mut self, upgrade: UpgradeKind) {
        match upgrade {
            UpgradeKind::ReinforcedBarrel => {
                for weapon in &mut self.weapons {
                    weapon.damage = (weapon.damage * 1.1).floor();
                }
            }
            UpgradeKind::EfficientCapacitors => {
                for weapon in &mut self.weapons {
                    weapon.energy_cost = (weapon.energy_cost * 0.8).floor().max(1.0);
                }
            }
            UpgradeKind::RapidReloader => {
                for weapon in &mut self.weapons {
                    weapon.cooldown = weapon.cooldown.saturating_sub(1);
                }
            }
            UpgradeKind::ExtendedRange => {
                for weapon in &mut self.weapons {
                    weapon.max_range += 2;
                }
            }
            UpgradeKind::ReinforcedHull => {
                let bonus = (self.max_hull * 0.2).floor();
                self.max_hull += bonus;
                if !self.is_destroyed {
                    self.hull = (self.hull + bonus).min(self.max_hull);
                }
            }
            UpgradeKind::ShieldBooster => {
                let bonus = (self.max_shield * 0.3).floor();
                self.max_shield += bonus;
                self.shield = (self.shield + bonus).min(self.max_shield);
            }
            UpgradeKind::ReactiveArmor => self.armor += 5.0,
            UpgradeKind::ThrusterUpgrade => {
                self.max_action_points += 1;
                self.action_points += 1;
            }
            UpgradeKind::ImprovedReactor => {
                self.max_energy += 20.0;
                self.reactor_output += 10.0;
                self.energy = (self.energy + 20.0).min(self.max_energy);
            }
            UpgradeKind::AgileManeuvers => self.max_speed += 1.0,
            UpgradeKind::AdvancedSensors => self.sensors += 15,
            UpgradeKind::EmergencyRepair => {
                self.repair_hull((self.max_hull * 0.3).floor());
            }
        }
        self.upgrades.push(upgrade);
        tracing::debug!(ship = %self.id, upgrade = upgrade.key(), "applied upgrade");
    }
}
