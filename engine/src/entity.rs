// ═══════════════════════════════════════════════════════════════════════
// Placed objects: map features (feature layer) and units (unit layer)
//
// Both families are closed enums dispatched by exhaustive matching. The
// grid owns every instance; everything else refers to them by ObjectId.
// ═══════════════════════════════════════════════════════════════════════

use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ── Unit archetypes ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Soldier,
    Medic,
    Infected,
}

/// Fixed per-archetype numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStats {
    pub max_health: i32,
    pub fov_range: u32,
    /// Cone width in degrees; 360 or more is full-circle vision.
    pub fov_angle: u32,
    pub attack_range: u32,
    pub attack_damage: i32,
    /// Rounds the special attack is unavailable after use.
    pub special_cooldown: u32,
    /// Soldier: blast damage. Medic: heal amount. Infected: unused.
    pub special_power: i32,
    pub cost: u32,
    pub kill_score: u32,
}

impl UnitKind {
    pub const ALL: [UnitKind; 3] = [UnitKind::Soldier, UnitKind::Medic, UnitKind::Infected];

    pub const fn stats(self) -> UnitStats {
        match self {
            UnitKind::Soldier => UnitStats {
                max_health: 10,
                fov_range: 5,
                fov_angle: 90,
                attack_range: 4,
                attack_damage: 3,
                special_cooldown: 4,
                special_power: 2,
                cost: 50,
                kill_score: 10,
            },
            UnitKind::Medic => UnitStats {
                max_health: 6,
                fov_range: 4,
                fov_angle: 120,
                attack_range: 2,
                attack_damage: 1,
                special_cooldown: 3,
                special_power: 4,
                cost: 40,
                kill_score: 15,
            },
            UnitKind::Infected => UnitStats {
                max_health: 4,
                fov_range: 3,
                fov_angle: 360,
                attack_range: 1,
                attack_damage: 2,
                special_cooldown: 2,
                special_power: 0,
                cost: 30,
                kill_score: 5,
            },
        }
    }
}

// ── Unit ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: ObjectId,
    pub kind: UnitKind,
    pub owner: PlayerId,
    pub location: Location,
    pub health: Health,
    pub facing: Direction,
    /// Rounds until the special attack is available again.
    pub cooldown: u32,
    /// Cells seen at the last vision refresh.
    pub visible: HashSet<Location>,
}

impl Unit {
    pub(crate) fn new(
        id: ObjectId,
        kind: UnitKind,
        owner: PlayerId,
        location: Location,
        facing: Direction,
    ) -> Self {
        Self {
            id,
            kind,
            owner,
            location,
            health: Health::full(kind.stats().max_health),
            facing,
            cooldown: 0,
            visible: HashSet::new(),
        }
    }

    pub fn stats(&self) -> UnitStats {
        self.kind.stats()
    }

    pub fn is_dead(&self) -> bool {
        self.health.is_dead()
    }

    pub fn sees(&self, location: Location) -> bool {
        self.visible.contains(&location)
    }
}

// ── Structures ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    Base,
    Stronghold,
    Outpost,
    Objective,
}

impl StructureKind {
    /// `None` means indestructible.
    pub fn max_health(self) -> Option<i32> {
        match self {
            StructureKind::Base => Some(30),
            StructureKind::Stronghold => Some(20),
            StructureKind::Outpost => Some(12),
            StructureKind::Objective => None,
        }
    }

    /// Match completion counts these.
    pub fn is_command_center(self) -> bool {
        matches!(self, StructureKind::Base | StructureKind::Stronghold)
    }

    pub fn is_capturable(self) -> bool {
        !matches!(self, StructureKind::Base)
    }

    pub fn can_spawn(self) -> bool {
        !matches!(self, StructureKind::Objective)
    }

    /// Resources granted to the controller per income grant.
    pub fn income(self) -> u32 {
        match self {
            StructureKind::Base => 10,
            StructureKind::Stronghold => 6,
            StructureKind::Outpost => 4,
            StructureKind::Objective => 0,
        }
    }

    /// Score granted to the controller per income grant.
    pub fn score_yield(self) -> u32 {
        match self {
            StructureKind::Stronghold => 1,
            StructureKind::Objective => 3,
            StructureKind::Base | StructureKind::Outpost => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub kind: StructureKind,
    pub controller: Option<PlayerId>,
    /// Cell new units appear on. Resolved at setup.
    pub spawn: Option<Location>,
}

// ── Door ───────────────────────────────────────────────────────────────

/// How long a door stays open is a match rule (`RulesConfig::door_open_rounds`),
/// handed in when the door is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Door {
    /// Remaining open rounds; closed at zero.
    pub timer: u32,
}

impl Door {
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.timer > 0
    }

    pub fn open(&mut self, rounds: u32) {
        self.timer = rounds.max(1);
    }

    pub fn advance(&mut self) {
        self.timer = self.timer.saturating_sub(1);
    }
}

// ── Feature ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Off-limits terrain.
    Space,
    Floor,
    Wall,
    Door(Door),
    Structure(Structure),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: ObjectId,
    pub location: Location,
    /// `None` for indestructible features.
    pub health: Option<Health>,
    pub kind: FeatureKind,
}

impl Feature {
    pub(crate) fn new(id: ObjectId, location: Location, kind: FeatureKind) -> Self {
        let health = match &kind {
            FeatureKind::Structure(s) => s.kind.max_health().map(Health::full),
            FeatureKind::Space | FeatureKind::Floor | FeatureKind::Wall | FeatureKind::Door(_) => None,
        };
        Self { id, location, health, kind }
    }

    pub fn is_walkable(&self) -> bool {
        match self.kind {
            FeatureKind::Floor | FeatureKind::Door(_) | FeatureKind::Structure(_) => true,
            FeatureKind::Space | FeatureKind::Wall => false,
        }
    }

    pub fn blocks_light(&self) -> bool {
        match &self.kind {
            FeatureKind::Wall => true,
            FeatureKind::Door(door) => !door.is_open(),
            FeatureKind::Space | FeatureKind::Floor | FeatureKind::Structure(_) => false,
        }
    }

    pub fn is_destructible(&self) -> bool {
        self.health.is_some()
    }

    pub fn is_dead(&self) -> bool {
        self.health.is_some_and(|h| h.is_dead())
    }

    pub fn is_wall(&self) -> bool {
        matches!(self.kind, FeatureKind::Wall)
    }

    pub fn structure(&self) -> Option<&Structure> {
        match &self.kind {
            FeatureKind::Structure(s) => Some(s),
            _ => None,
        }
    }

    pub fn structure_mut(&mut self) -> Option<&mut Structure> {
        match &mut self.kind {
            FeatureKind::Structure(s) => Some(s),
            _ => None,
        }
    }

    pub fn door(&self) -> Option<&Door> {
        match &self.kind {
            FeatureKind::Door(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_command_center(&self) -> bool {
        self.structure().is_some_and(|s| s.kind.is_command_center())
    }
}
