//! Ships: the resource and state entity of a battle.
//!
//! A ship carries hull, shield and armor, an energy pool with a discrete
//! three-way allocation, action points, a drift velocity and its loadout.
//! The turn manager drives `start_turn`/`end_turn`; everything else is an
//! action that either succeeds completely or fails with an [`ActionError`]
//! and leaves the ship untouched.

use crate::ability::{Ability, AbilityKind};
use crate::hex::HexCoord;
use crate::types::{AiProfile, ShipClass, ShipId, Team, ALLOCATION_TOTAL};
use crate::upgrades::UpgradeKind;
use crate::weapon::{Weapon, WeaponKind};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Shield regeneration per turn as a fraction of reactor output at full allocation.
const SHIELD_REGEN_RATE: f64 = 0.5;
/// Velocity gained per hex moved, scaled by engine allocation.
const THRUST_FACTOR: f64 = 0.3;
/// Velocity retained at the end of each turn.
const DRIFT_FRICTION: f64 = 0.9;
/// Velocity components below this snap to zero.
const DRIFT_CUTOFF: f64 = 0.1;
const OVERCHARGE_MULTIPLIER: f64 = 1.25;
const EVASIVE_MULTIPLIER: f64 = 0.7;
/// Fraction of armor subtracted from damage that reaches the hull.
const ARMOR_FACTOR: f64 = 0.5;
/// Exclusive upper bound of the random part of an initiative roll.
const INITIATIVE_DIE: u32 = 20;

/// Errors returned by ship and battle actions.
///
/// Every failing action leaves state unmodified.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("not enough energy (need {needed}, have {available})")]
    InsufficientEnergy { needed: f64, available: f64 },
    #[error("not enough action points (need {needed}, have {available})")]
    InsufficientActionPoints { needed: u32, available: u32 },
    #[error("{0} is still on cooldown")]
    OnCooldown(String),
    #[error("target at distance {distance} is outside range {min}-{max}")]
    OutOfRange { distance: u32, min: u32, max: u32 },
    #[error("energy allocation must sum to 10, got {0}")]
    InvalidAllocation(u32),
    #[error("path is empty")]
    EmptyPath,
    #[error("path of {len} hexes exceeds {available} action points")]
    PathTooLong { len: usize, available: u32 },
    #[error("path is blocked")]
    PathBlocked,
    #[error("no line of sight to target")]
    NoLineOfSight,
    #[error("no weapon in slot {0}")]
    UnknownWeapon(usize),
    #[error("no ability in slot {0}")]
    UnknownAbility(usize),
    #[error("ship is not active")]
    NotActive,
    #[error("ship is destroyed")]
    Destroyed,
    #[error("{0} needs a battle grid")]
    MissingContext(String),
    #[error("ship not found: {0}")]
    ShipNotFound(ShipId),
    #[error("hex {0} is occupied or invalid")]
    HexUnavailable(HexCoord),
    #[error("cannot target a friendly ship")]
    FriendlyTarget,
    #[error("it is not this ship's turn")]
    NotYourTurn,
    #[error("the battle is over")]
    BattleOver,
}

/// Discrete split of reactor power.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyAllocation {
    pub weapons: u32,
    pub shields: u32,
    pub engines: u32,
}

impl EnergyAllocation {
    pub const fn new(weapons: u32, shields: u32, engines: u32) -> Self {
        Self {
            weapons,
            shields,
            engines,
        }
    }

    /// Sum of all three systems.
    pub const fn total(&self) -> u32 {
        self.weapons + self.shields + self.engines
    }

    pub const fn is_valid(&self) -> bool {
        self.total() == ALLOCATION_TOTAL
    }

    pub fn weapon_fraction(&self) -> f64 {
        self.weapons as f64 / ALLOCATION_TOTAL as f64
    }

    pub fn shield_fraction(&self) -> f64 {
        self.shields as f64 / ALLOCATION_TOTAL as f64
    }

    pub fn engine_fraction(&self) -> f64 {
        self.engines as f64 / ALLOCATION_TOTAL as f64
    }
}

impl Default for EnergyAllocation {
    fn default() -> Self {
        Self::new(3, 3, 4)
    }
}

/// Continuous drift vector in axial space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub q: f64,
    pub r: f64,
}

impl Velocity {
    pub const fn new(q: f64, r: f64) -> Self {
        Self { q, r }
    }

    pub fn is_zero(&self) -> bool {
        self.q == 0.0 && self.r == 0.0
    }

    pub fn magnitude(&self) -> f64 {
        (self.q * self.q + self.r * self.r).sqrt()
    }

    /// Nearest whole-hex displacement. Halves round up.
    pub fn rounded(&self) -> HexCoord {
        HexCoord::new(
            (self.q + 0.5).floor() as i32,
            (self.r + 0.5).floor() as i32,
        )
    }

    /// Scale down to `max` magnitude if faster.
    fn clamp(&mut self, max: f64) {
        let speed = self.magnitude();
        if speed > max && speed > 0.0 {
            self.q = self.q / speed * max;
            self.r = self.r / speed * max;
        }
    }

    /// Apply one turn of friction.
    fn decay(&mut self) {
        self.q *= DRIFT_FRICTION;
        self.r *= DRIFT_FRICTION;
        if self.q.abs() < DRIFT_CUTOFF {
            self.q = 0.0;
        }
        if self.r.abs() < DRIFT_CUTOFF {
            self.r = 0.0;
        }
    }
}

/// Counted buffs consumed by the next qualifying action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEffects {
    /// Each charge cuts one incoming hit by 30%.
    pub evasive_charges: u32,
    /// Each shot adds 25% damage to one weapon discharge.
    pub overcharge_shots: u32,
}

/// A fired shot, handed to the damage resolver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attack {
    pub attacker: ShipId,
    pub attacker_team: Team,
    pub target: ShipId,
    pub weapon_index: usize,
    /// Snapshot of the weapon as fired.
    pub weapon: Weapon,
    /// Raw damage after allocation scaling and overcharge.
    pub damage: f64,
    pub overcharged: bool,
}

/// How incoming damage was split.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageReport {
    pub shield_damage: f64,
    pub hull_damage: f64,
    pub destroyed: bool,
}

impl DamageReport {
    pub fn total(&self) -> f64 {
        self.shield_damage + self.hull_damage
    }
}

/// A passive position change at end of turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Drift {
    pub from: HexCoord,
    pub to: HexCoord,
}

/// Base stats and loadout of a ship class.
#[derive(Clone, Debug, PartialEq)]
pub struct ShipPreset {
    pub ship_class: ShipClass,
    /// Purchase price in the campaign shop.
    pub credit_cost: u32,
    pub max_hull: f64,
    pub max_shield: f64,
    pub armor: f64,
    pub max_energy: f64,
    pub reactor_output: f64,
    pub max_action_points: u32,
    pub max_speed: f64,
    pub sensors: u32,
    pub weapons: Vec<WeaponKind>,
    pub abilities: Vec<AbilityKind>,
}

impl ShipClass {
    /// The preset for this class.
    pub fn preset(&self) -> ShipPreset {
        match self {
            ShipClass::Interceptor => ShipPreset {
                ship_class: *self,
                credit_cost: 200,
                max_hull: 80.0,
                max_shield: 40.0,
                armor: 5.0,
                max_energy: 100.0,
                reactor_output: 50.0,
                max_action_points: 4,
                max_speed: 4.0,
                sensors: 60,
                weapons: vec![WeaponKind::LightLaser],
                abilities: vec![AbilityKind::EvasiveManeuver, AbilityKind::BurstEngines],
            },
            ShipClass::Corvette => ShipPreset {
                ship_class: *self,
                credit_cost: 400,
                max_hull: 140.0,
                max_shield: 65.0,
                armor: 12.0,
                max_energy: 120.0,
                reactor_output: 60.0,
                max_action_points: 3,
                max_speed: 3.0,
                sensors: 50,
                weapons: vec![WeaponKind::PulseCannon, WeaponKind::Missiles],
                abilities: vec![AbilityKind::ShieldSurge, AbilityKind::WeaponOvercharge],
            },
            ShipClass::Destroyer => ShipPreset {
                ship_class: *self,
                credit_cost: 700,
                max_hull: 200.0,
                max_shield: 80.0,
                armor: 25.0,
                max_energy: 140.0,
                reactor_output: 70.0,
                max_action_points: 2,
                max_speed: 2.0,
                sensors: 40,
                weapons: vec![WeaponKind::HeavyCannon, WeaponKind::PointDefense],
                abilities: vec![AbilityKind::ShieldSurge, AbilityKind::EmpBurst],
            },
        }
    }
}

/// Per-instance overrides merged over a class preset. Set fields win.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShipOverrides {
    pub hull: Option<f64>,
    pub max_hull: Option<f64>,
    pub shield: Option<f64>,
    pub max_shield: Option<f64>,
    pub armor: Option<f64>,
    pub energy: Option<f64>,
    pub max_energy: Option<f64>,
    pub reactor_output: Option<f64>,
    pub energy_allocation: Option<EnergyAllocation>,
    pub max_action_points: Option<u32>,
    pub max_speed: Option<f64>,
    pub sensors: Option<u32>,
    pub weapons: Option<Vec<Weapon>>,
    pub abilities: Option<Vec<AbilityKind>>,
    pub status_effects: Option<StatusEffects>,
    pub ai_profile: Option<AiProfile>,
    /// Upgrades applied in order after the merge.
    pub upgrades: Vec<UpgradeKind>,
}

/// Builds a ship from a class preset plus overrides.
#[derive(Clone, Debug)]
pub struct ShipBuilder {
    id: ShipId,
    name: String,
    team: Team,
    ship_class: ShipClass,
    position: HexCoord,
    overrides: ShipOverrides,
}

impl ShipBuilder {
    pub fn new(id: impl Into<ShipId>, ship_class: ShipClass, team: Team) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            team,
            ship_class,
            position: HexCoord::default(),
            overrides: ShipOverrides::default(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn position(mut self, position: HexCoord) -> Self {
        self.position = position;
        self
    }

    pub fn ai_profile(mut self, profile: AiProfile) -> Self {
        self.overrides.ai_profile = Some(profile);
        self
    }

    pub fn overrides(mut self, overrides: ShipOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Merge the preset and overrides into a fresh ship.
    pub fn build(self) -> Ship {
        let preset = self.ship_class.preset();
        let o = self.overrides;

        let max_hull = o.max_hull.unwrap_or(preset.max_hull);
        let max_shield = o.max_shield.unwrap_or(preset.max_shield);
        let max_energy = o.max_energy.unwrap_or(preset.max_energy);
        let max_action_points = o.max_action_points.unwrap_or(preset.max_action_points);

        let weapons = o
            .weapons
            .unwrap_or_else(|| preset.weapons.iter().map(WeaponKind::create).collect());
        let abilities = o
            .abilities
            .unwrap_or(preset.abilities)
            .iter()
            .map(AbilityKind::create)
            .collect();

        let mut ship = Ship {
            id: self.id,
            name: self.name,
            team: self.team,
            ship_class: self.ship_class,
            hull: o.hull.unwrap_or(max_hull).clamp(0.0, max_hull),
            max_hull,
            shield: o.shield.unwrap_or(max_shield).clamp(0.0, max_shield),
            max_shield,
            armor: o.armor.unwrap_or(preset.armor),
            energy: o.energy.unwrap_or(max_energy).clamp(0.0, max_energy),
            max_energy,
            reactor_output: o.reactor_output.unwrap_or(preset.reactor_output),
            energy_allocation: o
                .energy_allocation
                .filter(EnergyAllocation::is_valid)
                .unwrap_or_default(),
            action_points: max_action_points,
            max_action_points,
            position: self.position,
            velocity: Velocity::default(),
            max_speed: o.max_speed.unwrap_or(preset.max_speed),
            sensors: o.sensors.unwrap_or(preset.sensors),
            initiative: 0,
            weapons,
            abilities,
            status_effects: o.status_effects.unwrap_or_default(),
            is_destroyed: false,
            is_active: false,
            ai_profile: o.ai_profile.unwrap_or_default(),
            upgrades: Vec::new(),
        };

        for upgrade in o.upgrades {
            ship.apply_upgrade(upgrade);
        }
        ship.is_destroyed = ship.hull <= 0.0;
        ship
    }
}

/// A ship in battle.
#[derive(Clone, Debug, PartialEq)]
pub struct Ship {
    pub id: ShipId,
    pub name: String,
    pub team: Team,
    pub ship_class: ShipClass,

    pub hull: f64,
    pub max_hull: f64,
    pub shield: f64,
    pub max_shield: f64,
    /// Flat mitigation against hull damage.
    pub armor: f64,

    pub energy: f64,
    pub max_energy: f64,
    /// Energy regenerated per turn.
    pub reactor_output: f64,
    pub energy_allocation: EnergyAllocation,

    pub action_points: u32,
    pub max_action_points: u32,

    /// Authoritative hex position.
    pub position: HexCoord,
    pub velocity: Velocity,
    pub max_speed: f64,

    pub sensors: u32,
    /// Last initiative roll.
    pub initiative: u32,

    pub weapons: Vec<Weapon>,
    pub abilities: Vec<Ability>,
    pub status_effects: StatusEffects,

    pub is_destroyed: bool,
    /// Set while it is this ship's turn.
    pub is_active: bool,
    pub ai_profile: AiProfile,
    /// Upgrades applied so far, in order.
    pub upgrades: Vec<UpgradeKind>,
}

impl Ship {
    /// Start building a ship of the given class.
    pub fn builder(id: impl Into<ShipId>, ship_class: ShipClass, team: Team) -> ShipBuilder {
        ShipBuilder::new(id, ship_class, team)
    }

    /// A preset ship with no overrides.
    pub fn from_preset(
        id: impl Into<ShipId>,
        ship_class: ShipClass,
        team: Team,
        position: HexCoord,
    ) -> Self {
        ShipBuilder::new(id, ship_class, team)
            .position(position)
            .build()
    }

    pub fn is_alive(&self) -> bool {
        !self.is_destroyed
    }

    pub fn hull_ratio(&self) -> f64 {
        self.hull / self.max_hull.max(1.0)
    }

    pub fn shield_ratio(&self) -> f64 {
        if self.max_shield > 0.0 {
            self.shield / self.max_shield
        } else {
            0.0
        }
    }

    pub fn energy_ratio(&self) -> f64 {
        if self.max_energy > 0.0 {
            self.energy / self.max_energy
        } else {
            0.0
        }
    }

    pub fn distance_to(&self, other: &Ship) -> u32 {
        self.position.distance(&other.position)
    }

    // =========================================================================
    // Turn lifecycle
    // =========================================================================

    /// Begin this ship's turn: refill AP, regenerate energy and shields,
    /// tick cooldowns and decay overcharge.
    pub fn start_turn(&mut self) {
        self.is_active = true;
        self.action_points = self.max_action_points;

        self.energy = (self.energy + self.reactor_output).min(self.max_energy);

        let regen = self.energy_allocation.shield_fraction() * self.reactor_output * SHIELD_REGEN_RATE;
        self.shield = (self.shield + regen).min(self.max_shield);

        for weapon in &mut self.weapons {
            weapon.tick_cooldown();
        }
        for ability in &mut self.abilities {
            ability.tick_cooldown();
        }

        self.status_effects.overcharge_shots = self.status_effects.overcharge_shots.saturating_sub(1);
    }

    /// End this ship's turn and apply drift.
    ///
    /// Drift does not check for collisions. Returns the position change, if
    /// any, so the grid can follow.
    pub fn end_turn(&mut self) -> Option<Drift> {
        self.is_active = false;

        if self.velocity.is_zero() {
            return None;
        }

        let delta = self.velocity.rounded();
        let from = self.position;
        if delta != HexCoord::default() {
            self.position = self.position.add(delta);
        }
        self.velocity.decay();

        (self.position != from).then_some(Drift {
            from,
            to: self.position,
        })
    }

    // =========================================================================
    // Energy
    // =========================================================================

    /// Change the energy allocation. Costs 1 AP while the ship is active.
    pub fn set_energy_allocation(
        &mut self,
        weapons: u32,
        shields: u32,
        engines: u32,
    ) -> Result<(), ActionError> {
        let allocation = EnergyAllocation::new(weapons, shields, engines);
        if !allocation.is_valid() {
            return Err(ActionError::InvalidAllocation(allocation.total()));
        }
        if self.is_active {
            if self.action_points < 1 {
                return Err(ActionError::InsufficientActionPoints {
                    needed: 1,
                    available: self.action_points,
                });
            }
            self.action_points -= 1;
        }
        self.energy_allocation = allocation;
        Ok(())
    }

    /// Change the energy allocation without spending AP (pre-battle setup).
    pub fn set_energy_allocation_free(
        &mut self,
        weapons: u32,
        shields: u32,
        engines: u32,
    ) -> Result<(), ActionError> {
        let allocation = EnergyAllocation::new(weapons, shields, engines);
        if !allocation.is_valid() {
            return Err(ActionError::InvalidAllocation(allocation.total()));
        }
        self.energy_allocation = allocation;
        Ok(())
    }

    /// Remove up to `amount` energy. Returns how much was drained.
    pub fn drain_energy(&mut self, amount: f64) -> f64 {
        let drained = amount.max(0.0).min(self.energy);
        self.energy -= drained;
        drained
    }

    /// Add up to `amount` shield. Returns how much was restored.
    pub fn restore_shield(&mut self, amount: f64) -> f64 {
        let before = self.shield;
        self.shield = (self.shield + amount.max(0.0)).min(self.max_shield);
        self.shield - before
    }

    /// Add up to `amount` hull. Returns how much was repaired.
    pub fn repair_hull(&mut self, amount: f64) -> f64 {
        if self.is_destroyed {
            return 0.0;
        }
        let before = self.hull;
        self.hull = (self.hull + amount.max(0.0)).min(self.max_hull);
        self.hull - before
    }

    // =========================================================================
    // Movement
    // =========================================================================

    /// Check that a path can be paid for. Occupancy is the grid's concern.
    pub fn check_move(&self, path: &[HexCoord]) -> Result<(), ActionError> {
        if self.is_destroyed {
            return Err(ActionError::Destroyed);
        }
        if path.is_empty() {
            return Err(ActionError::EmptyPath);
        }
        if path.len() > self.action_points as usize {
            return Err(ActionError::PathTooLong {
                len: path.len(),
                available: self.action_points,
            });
        }
        Ok(())
    }

    /// Relocate to the end of `path`, pay AP and build momentum.
    ///
    /// Callers must run [`Ship::check_move`] first; [`crate::grid::Grid::move_ship`]
    /// does both and keeps occupancy in sync.
    pub(crate) fn advance_along(&mut self, path: &[HexCoord]) {
        let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
            return;
        };

        self.position = last;
        self.action_points -= path.len() as u32;

        let thrust = self.energy_allocation.engine_fraction() * THRUST_FACTOR;
        self.velocity.q += (last.q - first.q) as f64 * thrust;
        self.velocity.r += (last.r - first.r) as f64 * thrust;
        self.velocity.clamp(self.max_speed);
    }

    // =========================================================================
    // Weapons
    // =========================================================================

    /// Check every precondition for firing weapon `index` at `target`.
    pub fn check_fire(&self, index: usize, target: HexCoord) -> Result<&Weapon, ActionError> {
        if self.is_destroyed {
            return Err(ActionError::Destroyed);
        }
        let weapon = self
            .weapons
            .get(index)
            .ok_or(ActionError::UnknownWeapon(index))?;
        if self.energy < weapon.energy_cost {
            return Err(ActionError::InsufficientEnergy {
                needed: weapon.energy_cost,
                available: self.energy,
            });
        }
        if self.action_points < weapon.ap_cost {
            return Err(ActionError::InsufficientActionPoints {
                needed: weapon.ap_cost,
                available: self.action_points,
            });
        }
        if !weapon.is_ready() {
            return Err(ActionError::OnCooldown(weapon.name.clone()));
        }
        let distance = self.position.distance(&target);
        if !weapon.in_range(distance) {
            return Err(ActionError::OutOfRange {
                distance,
                min: weapon.min_range,
                max: weapon.max_range,
            });
        }
        Ok(weapon)
    }

    /// Whether weapon `index` could fire at a target standing on `target`.
    pub fn can_fire_weapon(&self, index: usize, target: HexCoord) -> bool {
        self.check_fire(index, target).is_ok()
    }

    /// Fire weapon `index` at the ship `target_id` standing on `target_position`.
    pub fn fire_weapon(
        &mut self,
        index: usize,
        target_id: &str,
        target_position: HexCoord,
    ) -> Result<Attack, ActionError> {
        self.check_fire(index, target_position)?;

        let overcharged = self.status_effects.overcharge_shots > 0;
        let allocation = self.energy_allocation.weapon_fraction();
        let weapon = &mut self.weapons[index];

        let mut damage = weapon.damage * allocation;
        if overcharged {
            damage *= OVERCHARGE_MULTIPLIER;
        }

        self.energy -= weapon.energy_cost;
        self.action_points -= weapon.ap_cost;
        weapon.cooldown_remaining = weapon.cooldown;
        let snapshot = weapon.clone();

        if overcharged {
            self.status_effects.overcharge_shots -= 1;
        }

        Ok(Attack {
            attacker: self.id.clone(),
            attacker_team: self.team,
            target: target_id.to_string(),
            weapon_index: index,
            weapon: snapshot,
            damage,
            overcharged,
        })
    }

    /// Fire weapon `index` at `target`.
    pub fn fire_at(&mut self, index: usize, target: &Ship) -> Result<Attack, ActionError> {
        self.fire_weapon(index, &target.id, target.position)
    }

    // =========================================================================
    // Abilities
    // =========================================================================

    /// Check every precondition for ability `index`.
    pub fn check_ability(&self, index: usize) -> Result<AbilityKind, ActionError> {
        if self.is_destroyed {
            return Err(ActionError::Destroyed);
        }
        if !self.is_active {
            return Err(ActionError::NotActive);
        }
        let ability = self
            .abilities
            .get(index)
            .ok_or(ActionError::UnknownAbility(index))?;
        if self.energy < ability.energy_cost {
            return Err(ActionError::InsufficientEnergy {
                needed: ability.energy_cost,
                available: self.energy,
            });
        }
        if self.action_points < ability.ap_cost {
            return Err(ActionError::InsufficientActionPoints {
                needed: ability.ap_cost,
                available: self.action_points,
            });
        }
        if !ability.is_ready() {
            return Err(ActionError::OnCooldown(ability.name.clone()));
        }
        Ok(ability.kind)
    }

    pub fn can_use_ability(&self, index: usize) -> bool {
        self.check_ability(index).is_ok()
    }

    /// Index of the first usable ability of `kind`.
    pub fn find_ability(&self, kind: AbilityKind) -> Option<usize> {
        (0..self.abilities.len())
            .find(|&i| self.abilities[i].kind == kind && self.can_use_ability(i))
    }

    /// Pay for ability `index` and start its cooldown.
    pub(crate) fn spend_ability(&mut self, index: usize) {
        if let Some(ability) = self.abilities.get_mut(index) {
            self.energy -= ability.energy_cost;
            self.action_points -= ability.ap_cost;
            ability.cooldown_remaining = ability.cooldown;
        }
    }

    // =========================================================================
    // Damage
    // =========================================================================

    /// Apply incoming damage: evasion, then shields, then armored hull.
    pub fn take_damage(&mut self, amount: f64) -> DamageReport {
        let mut incoming = amount.max(0.0);

        if self.status_effects.evasive_charges > 0 && incoming > 0.0 {
            incoming *= EVASIVE_MULTIPLIER;
            self.status_effects.evasive_charges -= 1;
        }

        let shield_damage = incoming.min(self.shield);
        self.shield -= shield_damage;
        let remaining = incoming - shield_damage;

        let mut hull_damage = 0.0;
        if remaining > 0.0 {
            // Armor never fully negates a hit, but never adds to it either.
            let mitigated = (remaining - self.armor * ARMOR_FACTOR)
                .max(1.0)
                .min(remaining);
            hull_damage = mitigated.min(self.hull);
            self.hull -= hull_damage;
        }

        if self.hull <= 0.0 {
            self.hull = 0.0;
            self.is_destroyed = true;
        }

        DamageReport {
            shield_damage,
            hull_damage,
            destroyed: self.is_destroyed,
        }
    }

    /// Roll `sensors + [0, 20)` and store it.
    pub fn roll_initiative(&mut self, rng: &mut dyn RngCore) -> u32 {
        self.initiative = self.sensors + rng.gen_range(0..INITIATIVE_DIE);
        self.initiative
    }

    /// Sum of base damage across all weapons.
    pub fn total_weapon_damage(&self) -> f64 {
        self.weapons.iter().map(|w| w.damage).sum()
    }
}

// =============================================================================
// Serialization
// =============================================================================

/// Persisted ability state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityRecord {
    pub key: String,
    #[serde(default)]
    pub cooldown_remaining: u32,
}

/// Plain snapshot of a ship for save/load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipRecord {
    pub id: ShipId,
    pub name: String,
    pub position: HexCoord,
    pub team: Team,
    pub ship_class: ShipClass,
    pub hull: f64,
    pub max_hull: f64,
    pub shield: f64,
    pub max_shield: f64,
    pub armor: f64,
    pub energy: f64,
    pub max_energy: f64,
    pub reactor_output: f64,
    pub energy_allocation: EnergyAllocation,
    pub action_points: u32,
    pub max_action_points: u32,
    #[serde(default)]
    pub velocity: Velocity,
    pub max_speed: f64,
    pub sensors: u32,
    #[serde(default)]
    pub initiative: u32,
    pub weapons: Vec<Weapon>,
    #[serde(default)]
    pub abilities: Vec<AbilityRecord>,
    #[serde(default)]
    pub status_effects: StatusEffects,
    #[serde(default)]
    pub ai_profile: AiProfile,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default)]
    pub is_destroyed: bool,
}

/// A snapshot that cannot describe a consistent ship.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("ship id is empty")]
    EmptyId,
    #[error("{field} is not a finite, non-negative number")]
    InvalidNumber { field: &'static str },
    #[error("{field} ({value}) exceeds its maximum ({max})")]
    ExceedsMaximum {
        field: &'static str,
        value: f64,
        max: f64,
    },
    #[error("energy allocation sums to {0}, expected 10")]
    InvalidAllocation(u32),
    #[error("weapon {0} has min range above max range")]
    InvalidWeaponRange(String),
    #[error("destroyed flag does not match hull {0}")]
    InconsistentDestroyed(f64),
    #[error("malformed ship record: {0}")]
    Malformed(String),
}

impl Ship {
    /// Snapshot this ship.
    pub fn to_record(&self) -> ShipRecord {
        ShipRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            position: self.position,
            team: self.team,
            ship_class: self.ship_class,
            hull: self.hull,
            max_hull: self.max_hull,
            shield: self.shield,
            max_shield: self.max_shield,
            armor: self.armor,
            energy: self.energy,
            max_energy: self.max_energy,
            reactor_output: self.reactor_output,
            energy_allocation: self.energy_allocation,
            action_points: self.action_points,
            max_action_points: self.max_action_points,
            velocity: self.velocity,
            max_speed: self.max_speed,
            sensors: self.sensors,
            initiative: self.initiative,
            weapons: self.weapons.clone(),
            abilities: self
                .abilities
                .iter()
                .map(|a| AbilityRecord {
                    key: a.kind.key().to_string(),
                    cooldown_remaining: a.cooldown_remaining,
                })
                .collect(),
            status_effects: self.status_effects,
            ai_profile: self.ai_profile,
            upgrades: self.upgrades.iter().map(|u| u.key().to_string()).collect(),
            is_destroyed: self.is_destroyed,
        }
    }

    /// Rebuild a ship from a snapshot.
    ///
    /// Inconsistent snapshots are rejected. Unknown ability and upgrade keys
    /// are skipped with a warning.
    pub fn from_record(record: ShipRecord) -> Result<Ship, RecordError> {
        if record.id.is_empty() {
            return Err(RecordError::EmptyId);
        }

        let gauges = [
            ("hull", record.hull, record.max_hull),
            ("shield", record.shield, record.max_shield),
            ("energy", record.energy, record.max_energy),
        ];
        for (field, value, max) in gauges {
            check_number(field, value)?;
            check_number(field, max)?;
            if value > max {
                return Err(RecordError::ExceedsMaximum { field, value, max });
            }
        }
        check_number("armor", record.armor)?;
        check_number("reactorOutput", record.reactor_output)?;
        check_number("maxSpeed", record.max_speed)?;
        if !record.velocity.q.is_finite() || !record.velocity.r.is_finite() {
            return Err(RecordError::InvalidNumber { field: "velocity" });
        }
        if record.action_points > record.max_action_points {
            return Err(RecordError::ExceedsMaximum {
                field: "actionPoints",
                value: record.action_points as f64,
                max: record.max_action_points as f64,
            });
        }
        if !record.energy_allocation.is_valid() {
            return Err(RecordError::InvalidAllocation(
                record.energy_allocation.total(),
            ));
        }
        if record.is_destroyed != (record.hull <= 0.0) {
            return Err(RecordError::InconsistentDestroyed(record.hull));
        }
        for weapon in &record.weapons {
            check_number("weapon damage", weapon.damage)?;
            check_number("weapon energyCost", weapon.energy_cost)?;
            if weapon.min_range > weapon.max_range {
                return Err(RecordError::InvalidWeaponRange(weapon.name.clone()));
            }
        }

        let abilities = record
            .abilities
            .iter()
            .filter_map(|saved| match AbilityKind::from_key(&saved.key) {
                Some(kind) => {
                    let mut ability = kind.create();
                    ability.cooldown_remaining = saved.cooldown_remaining;
                    Some(ability)
                }
                None => {
                    tracing::warn!(ship = %record.id, key = %saved.key, "skipping unknown ability");
                    None
                }
            })
            .collect();

        let upgrades = record
            .upgrades
            .iter()
            .filter_map(|key| {
                let upgrade = UpgradeKind::from_key(key);
                if upgrade.is_none() {
                    tracing::warn!(ship = %record.id, key = %key, "skipping unknown upgrade");
                }
                upgrade
            })
            .collect();

        Ok(Ship {
            id: record.id,
            name: record.name,
            team: record.team,
            ship_class: record.ship_class,
            hull: record.hull,
            max_hull: record.max_hull,
            shield: record.shield,
            max_shield: record.max_shield,
            armor: record.armor,
            energy: record.energy,
            max_energy: record.max_energy,
            reactor_output: record.reactor_output,
            energy_allocation: record.energy_allocation,
            action_points: record.action_points,
            max_action_points: record.max_action_points,
            position: record.position,
            velocity: record.velocity,
            max_speed: record.max_speed,
            sensors: record.sensors,
            initiative: record.initiative,
            weapons: record.weapons,
            abilities,
            status_effects: record.status_effects,
            is_destroyed: record.is_destroyed,
            is_active: false,
            ai_profile: record.ai_profile,
            upgrades,
        })
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_record())
    }

    /// Parse and validate a JSON snapshot.
    pub fn from_json(json: &str) -> Result<Ship, RecordError> {
        let record: ShipRecord =
            serde_json::from_str(json).map_err(|e| RecordError::Malformed(e.to_string()))?;
        Ship::from_record(record)
    }
}

fn check_number(field: &'static str, value: f64) -> Result<(), RecordError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(RecordError::InvalidNumber { field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn corvette() -> Ship {
        Ship::from_preset("c1", ShipClass::Corvette, Team::Player, HexCoord::new(0, 0))
    }

    #[test]
    fn test_preset_defaults() {
        let ship = corvette();
        assert_eq!(ship.max_hull, 140.0);
        assert_eq!(ship.hull, 140.0);
        assert_eq!(ship.shield, 65.0);
        assert_eq!(ship.energy, 120.0);
        assert_eq!(ship.action_points, 3);
        assert_eq!(ship.weapons.len(), 2);
        assert_eq!(ship.energy_allocation, EnergyAllocation::new(3, 3, 4));
        assert!(!ship.is_active);
        assert_eq!(ship.name, "c1");
    }

    #[test]
    fn test_overrides_win() {
        let ship = Ship::builder("x", ShipClass::Destroyer, Team::Enemy)
            .name("Hammer")
            .overrides(ShipOverrides {
                hull: Some(50.0),
                sensors: Some(99),
                ai_profile: Some(AiProfile::Anchor),
                ..Default::default()
            })
            .build();
        assert_eq!(ship.name, "Hammer");
        assert_eq!(ship.hull, 50.0);
        assert_eq!(ship.max_hull, 200.0);
        assert_eq!(ship.sensors, 99);
        assert_eq!(ship.ai_profile, AiProfile::Anchor);
    }

    #[test]
    fn test_override_hull_clamped_to_max() {
        let ship = Ship::builder("x", ShipClass::Interceptor, Team::Player)
            .overrides(ShipOverrides {
                hull: Some(500.0),
                ..Default::default()
            })
            .build();
        assert_eq!(ship.hull, 80.0);
    }

    #[test]
    fn test_start_turn_regenerates() {
        let mut ship = corvette();
        ship.energy = 10.0;
        ship.shield = 0.0;
        ship.action_points = 0;
        ship.weapons[1].cooldown_remaining = 2;
        ship.status_effects.overcharge_shots = 2;

        ship.start_turn();

        assert!(ship.is_active);
        assert_eq!(ship.action_points, 3);
        assert_eq!(ship.energy, 70.0);
        // 3/10 * 60 * 0.5
        assert!((ship.shield - 9.0).abs() < 1e-9);
        assert_eq!(ship.weapons[1].cooldown_remaining, 1);
        assert_eq!(ship.status_effects.overcharge_shots, 1);
    }

    #[test]
    fn test_start_turn_caps_at_max() {
        let mut ship = corvette();
        ship.start_turn();
        assert_eq!(ship.energy, ship.max_energy);
        assert_eq!(ship.shield, ship.max_shield);
    }

    #[test]
    fn test_end_turn_without_velocity() {
        let mut ship = corvette();
        ship.start_turn();
        assert_eq!(ship.end_turn(), None);
        assert!(!ship.is_active);
    }

    #[test]
    fn test_drift_moves_and_decays() {
        let mut ship = corvette();
        ship.velocity = Velocity::new(1.0, 0.0);
        let drift = ship.end_turn();
        assert_eq!(
            drift,
            Some(Drift {
                from: HexCoord::new(0, 0),
                to: HexCoord::new(1, 0)
            })
        );
        assert!((ship.velocity.q - 0.9).abs() < 1e-9);
        assert_eq!(ship.velocity.r, 0.0);
    }

    #[test]
    fn test_small_drift_snaps_to_zero() {
        let mut ship = corvette();
        ship.velocity = Velocity::new(0.105, -0.05);
        assert_eq!(ship.end_turn(), None);
        assert!(ship.velocity.is_zero());
    }

    #[test]
    fn test_allocation_requires_total() {
        let mut ship = corvette();
        assert_eq!(
            ship.set_energy_allocation(5, 5, 5),
            Err(ActionError::InvalidAllocation(15))
        );
        assert_eq!(ship.energy_allocation, EnergyAllocation::new(3, 3, 4));
        assert!(ship.set_energy_allocation(6, 2, 2).is_ok());
        assert_eq!(ship.energy_allocation, EnergyAllocation::new(6, 2, 2));
    }

    #[test]
    fn test_allocation_costs_ap_when_active() {
        let mut ship = corvette();
        ship.start_turn();
        ship.set_energy_allocation(4, 4, 2).unwrap();
        assert_eq!(ship.action_points, 2);

        ship.action_points = 0;
        assert!(matches!(
            ship.set_energy_allocation(2, 4, 4),
            Err(ActionError::InsufficientActionPoints { .. })
        ));
        assert_eq!(ship.energy_allocation, EnergyAllocation::new(4, 4, 2));
    }

    #[test]
    fn test_range_gating() {
        let mut ship = corvette();
        ship.weapons[0].min_range = 2;
        ship.weapons[0].max_range = 6;
        assert!(!ship.can_fire_weapon(0, HexCoord::new(1, 0)));
        assert!(ship.can_fire_weapon(0, HexCoord::new(4, 0)));
        assert!(!ship.can_fire_weapon(0, HexCoord::new(7, 0)));
    }

    #[test]
    fn test_fire_weapon_spends_and_scales() {
        let mut ship = corvette();
        ship.start_turn();
        let attack = ship.fire_weapon(1, "t", HexCoord::new(4, 0)).unwrap();
        // Missiles: 55 * 3/10
        assert!((attack.damage - 16.5).abs() < 1e-9);
        assert_eq!(ship.energy, 70.0);
        assert_eq!(ship.action_points, 2);
        assert_eq!(ship.weapons[1].cooldown_remaining, 2);
        assert!(!attack.overcharged);

        assert!(matches!(
            ship.fire_weapon(1, "t", HexCoord::new(4, 0)),
            Err(ActionError::OnCooldown(_))
        ));
    }

    #[test]
    fn test_fire_weapon_failure_leaves_state() {
        let mut ship = corvette();
        ship.energy = 5.0;
        let before = ship.clone();
        assert!(matches!(
            ship.fire_weapon(0, "t", HexCoord::new(1, 0)),
            Err(ActionError::InsufficientEnergy { .. })
        ));
        assert!(matches!(
            ship.fire_weapon(9, "t", HexCoord::new(1, 0)),
            Err(ActionError::UnknownWeapon(9))
        ));
        assert_eq!(ship, before);
    }

    #[test]
    fn test_overcharge_consumed_on_fire() {
        let mut ship = corvette();
        ship.status_effects.overcharge_shots = 1;
        let attack = ship.fire_weapon(0, "t", HexCoord::new(1, 0)).unwrap();
        assert!(attack.overcharged);
        assert!((attack.damage - 30.0 * 0.3 * 1.25).abs() < 1e-9);
        assert_eq!(ship.status_effects.overcharge_shots, 0);
    }

    #[test]
    fn test_take_damage_shield_then_hull() {
        let mut ship = corvette();
        let report = ship.take_damage(100.0);
        assert_eq!(report.shield_damage, 65.0);
        // 35 remaining - 12 * 0.5
        assert_eq!(report.hull_damage, 29.0);
        assert_eq!(ship.hull, 111.0);
        assert_eq!(ship.shield, 0.0);
        assert!(!report.destroyed);
    }

    #[test]
    fn test_armor_never_fully_negates() {
        let mut ship = corvette();
        ship.shield = 0.0;
        let report = ship.take_damage(3.0);
        assert_eq!(report.hull_damage, 1.0);
    }

    #[test]
    fn test_evasive_reduces_and_consumes() {
        let mut ship = corvette();
        ship.status_effects.evasive_charges = 1;
        let report = ship.take_damage(50.0);
        assert!((report.shield_damage - 35.0).abs() < 1e-9);
        assert_eq!(ship.status_effects.evasive_charges, 0);
    }

    #[test]
    fn test_destruction_floors_hull() {
        let mut ship = corvette();
        ship.shield = 0.0;
        let report = ship.take_damage(1000.0);
        assert!(report.destroyed);
        assert!(ship.is_destroyed);
        assert_eq!(ship.hull, 0.0);
        assert_eq!(report.hull_damage, 140.0);
    }

    #[test]
    fn test_damage_conservation_sweep() {
        for amount in [0.0, 0.4, 1.0, 7.5, 64.0, 66.0, 90.0, 300.0] {
            let mut ship = corvette();
            let report = ship.take_damage(amount);
            assert!(report.total() <= amount + 1e-9, "amount {amount}");
            assert!(ship.hull >= 0.0 && ship.shield >= 0.0);
            assert_eq!(report.destroyed, ship.hull == 0.0);
        }
    }

    #[test]
    fn test_roll_initiative_with_fixed_rng() {
        let mut ship = corvette();
        let mut rng = StepRng::new(0, 0);
        assert_eq!(ship.roll_initiative(&mut rng), 50);
        assert_eq!(ship.initiative, 50);
    }

    #[test]
    fn test_move_builds_velocity() {
        let mut ship = corvette();
        ship.start_turn();
        let path = [HexCoord::new(1, 0), HexCoord::new(2, 0), HexCoord::new(3, 0)];
        ship.check_move(&path).unwrap();
        ship.advance_along(&path);
        assert_eq!(ship.position, HexCoord::new(3, 0));
        assert_eq!(ship.action_points, 0);
        // (3 - 1) * 0.4 * 0.3
        assert!((ship.velocity.q - 0.24).abs() < 1e-9);
    }

    #[test]
    fn test_velocity_clamped_to_max_speed() {
        let mut ship = corvette();
        ship.max_speed = 0.1;
        ship.start_turn();
        let path = [HexCoord::new(1, 0), HexCoord::new(2, 0)];
        ship.advance_along(&path);
        assert!((ship.velocity.magnitude() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_check_move_rejects() {
        let ship = corvette();
        assert_eq!(ship.check_move(&[]), Err(ActionError::EmptyPath));
        let long = [HexCoord::new(1, 0); 4];
        assert!(matches!(
            ship.check_move(&long),
            Err(ActionError::PathTooLong { len: 4, .. })
        ));
    }

    #[test]
    fn test_record_roundtrip() {
        let mut ship = corvette();
        ship.hull = 77.5;
        ship.shield = 12.25;
        ship.energy = 33.0;
        ship.weapons[1].cooldown_remaining = 2;
        ship.abilities[0].cooldown_remaining = 1;
        ship.status_effects.evasive_charges = 2;
        ship.velocity = Velocity::new(0.5, -0.3);

        let json = ship.to_json().unwrap();
        let restored = Ship::from_json(&json).unwrap();
        assert_eq!(restored, ship);
    }

    #[test]
    fn test_record_rejects_inconsistent() {
        let mut record = corvette().to_record();
        record.hull = 500.0;
        assert!(matches!(
            Ship::from_record(record),
            Err(RecordError::ExceedsMaximum { field: "hull", .. })
        ));

        let mut record = corvette().to_record();
        record.energy_allocation = EnergyAllocation::new(1, 1, 1);
        assert_eq!(
            Ship::from_record(record),
            Err(RecordError::InvalidAllocation(3))
        );

        let mut record = corvette().to_record();
        record.shield = f64::NAN;
        assert!(Ship::from_record(record).is_err());

        assert!(matches!(
            Ship::from_json("{\"id\": 3}"),
            Err(RecordError::Malformed(_))
        ));
    }

    #[test]
    fn test_record_skips_unknown_keys() {
        let mut record = corvette().to_record();
        record.abilities.push(AbilityRecord {
            key: "warpSpeed".to_string(),
            cooldown_remaining: 0,
        });
        record.upgrades.push("goldPlating".to_string());
        let ship = Ship::from_record(record).unwrap();
        assert_eq!(ship.abilities.len(), 2);
        assert!(ship.upgrades.is_empty());
    }
}
