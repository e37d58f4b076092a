// ═══════════════════════════════════════════════════════════════════════
// Grid: two-layer occupancy over an arena of placed objects
//
// The grid is the only owner of features and units. Each cell has one
// slot per layer holding an ObjectId; the objects themselves live in two
// maps keyed by identity. Everything outside the grid (players, orders)
// refers to objects by identity only, so a clone of the grid is a full
// deep copy with identities preserved.
//
// Layer contents change only through the operations below.
// ═══════════════════════════════════════════════════════════════════════

use crate::entity::*;
use crate::error::{GridError, InvariantViolation};
use crate::fov::{self, LightMap};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, trace};

/// A unit that died (or was removed dead) and who owned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Casualty {
    pub id: ObjectId,
    pub kind: UnitKind,
    pub owner: PlayerId,
}

/// What a single hit on a cell did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DamageReport {
    /// Feature destroyed by this hit.
    pub feature_destroyed: Option<ObjectId>,
    /// Unit killed by this hit.
    pub killed: Option<Casualty>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyedStructure {
    pub id: ObjectId,
    pub kind: StructureKind,
    pub controller: Option<PlayerId>,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub structure: ObjectId,
    pub from: Option<PlayerId>,
    pub to: PlayerId,
}

/// Everything an end-of-turn tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub removed_units: Vec<Casualty>,
    pub destroyed_structures: Vec<DestroyedStructure>,
    pub captures: Vec<Capture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    /// Next identity to hand out. Shared by both layers.
    next_id: u32,
    feature_layer: Vec<Option<ObjectId>>,
    unit_layer: Vec<Option<ObjectId>>,
    features: BTreeMap<ObjectId, Feature>,
    units: BTreeMap<ObjectId, Unit>,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyGrid);
        }
        let cells = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            next_id: 1,
            feature_layer: vec![None; cells],
            unit_layer: vec![None; cells],
            features: BTreeMap::new(),
            units: BTreeMap::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.feature_layer.len()
    }

    pub fn contains(&self, location: Location) -> bool {
        location.x < self.width && location.y < self.height
    }

    pub fn index_of(&self, location: Location) -> Option<usize> {
        self.contains(location).then(|| location.to_index(self.width))
    }

    pub fn location_of(&self, index: usize) -> Option<Location> {
        (index < self.cell_count()).then(|| Location::from_index(index, self.width))
    }

    /// The identity the next placed object will receive.
    pub fn next_id(&self) -> ObjectId {
        ObjectId(self.next_id)
    }

    fn issue_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    fn checked_index(&self, location: Location) -> Result<usize, GridError> {
        self.index_of(location).ok_or(GridError::OutOfBounds(location))
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn feature(&self, id: ObjectId) -> Option<&Feature> {
        self.features.get(&id)
    }

    pub fn unit(&self, id: ObjectId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn feature_id_at(&self, location: Location) -> Option<ObjectId> {
        self.index_of(location).and_then(|i| self.feature_layer[i])
    }

    pub fn unit_id_at(&self, location: Location) -> Option<ObjectId> {
        self.index_of(location).and_then(|i| self.unit_layer[i])
    }

    pub fn feature_at(&self, location: Location) -> Option<&Feature> {
        self.feature_id_at(location).and_then(|id| self.features.get(&id))
    }

    pub fn unit_at(&self, location: Location) -> Option<&Unit> {
        self.unit_id_at(location).and_then(|id| self.units.get(&id))
    }

    /// Units in ascending identity order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Features in ascending identity order.
    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    pub fn structures(&self) -> impl Iterator<Item = (&Feature, &Structure)> {
        self.features.values().filter_map(|f| f.structure().map(|s| (f, s)))
    }

    pub fn command_centers(&self) -> usize {
        self.features.values().filter(|f| f.is_command_center()).count()
    }

    /// Raw layer slots, row-major. Used by the invariant checker.
    pub fn layers(&self) -> (&[Option<ObjectId>], &[Option<ObjectId>]) {
        (&self.feature_layer, &self.unit_layer)
    }

    pub fn is_walkable(&self, location: Location) -> bool {
        self.feature_at(location).is_some_and(Feature::is_walkable)
    }

    /// On the grid, walkable, and free of units.
    pub fn is_traversable(&self, location: Location) -> bool {
        self.is_walkable(location) && self.unit_id_at(location).is_none()
    }

    pub fn blocks_light(&self, location: Location) -> bool {
        self.feature_at(location).is_some_and(Feature::blocks_light)
    }

    /// Orthogonally adjacent on-grid cells, in N, E, S, W order.
    pub fn neighbours(&self, location: Location) -> Vec<Location> {
        Direction::ALL
            .iter()
            .filter_map(|&d| location.step(d))
            .filter(|&l| self.contains(l))
            .collect()
    }

    /// The surrounding on-grid cells of the 3×3 block around `location`,
    /// optionally including `location` itself.
    pub fn area_around(&self, location: Location, include_center: bool) -> Vec<Location> {
        let mut cells = Vec::with_capacity(9);
        for dy in -1..=1i64 {
            for dx in -1..=1i64 {
                if dx == 0 && dy == 0 && !include_center {
                    continue;
                }
                if let Some(l) = location.offset(dx, dy) {
                    if self.contains(l) {
                        cells.push(l);
                    }
                }
            }
        }
        cells
    }

    // ── Placement ──────────────────────────────────────────────────────

    pub fn place_feature(&mut self, kind: FeatureKind, location: Location) -> Result<ObjectId, GridError> {
        let index = self.checked_index(location)?;
        if self.feature_layer[index].is_some() {
            return Err(GridError::FeatureOccupied(location));
        }
        let id = self.issue_id();
        self.feature_layer[index] = Some(id);
        self.features.insert(id, Feature::new(id, location, kind));
        Ok(id)
    }

    /// Place a new unit. The cell must be walkable and free of units.
    pub fn place_unit(
        &mut self,
        kind: UnitKind,
        owner: PlayerId,
        facing: Direction,
        location: Location,
    ) -> Result<ObjectId, GridError> {
        let index = self.checked_index(location)?;
        if self.unit_layer[index].is_some() {
            return Err(GridError::UnitOccupied(location));
        }
        if !self.is_walkable(location) {
            return Err(GridError::NotWalkable(location));
        }
        let id = self.issue_id();
        self.unit_layer[index] = Some(id);
        self.units.insert(id, Unit::new(id, kind, owner, location, facing));
        Ok(id)
    }

    pub fn remove_feature(&mut self, id: ObjectId) -> Result<Feature, GridError> {
        let feature = self.features.remove(&id).ok_or(GridError::UnknownObject(id))?;
        let index = feature.location.to_index(self.width);
        self.feature_layer[index] = None;
        Ok(feature)
    }

    pub fn remove_unit(&mut self, id: ObjectId) -> Result<Unit, GridError> {
        let unit = self.units.remove(&id).ok_or(GridError::UnknownObject(id))?;
        let index = unit.location.to_index(self.width);
        self.unit_layer[index] = None;
        Ok(unit)
    }

    // ── Movement ───────────────────────────────────────────────────────

    /// Destination of a one-cell move, if the move is legal.
    pub fn check_move(&self, id: ObjectId, direction: Direction) -> Result<Location, GridError> {
        let unit = self.units.get(&id).ok_or(GridError::UnknownObject(id))?;
        let to = unit
            .location
            .step(direction)
            .filter(|&l| self.contains(l))
            .ok_or(GridError::OutOfBounds(unit.location))?;
        if !self.is_walkable(to) {
            return Err(GridError::NotWalkable(to));
        }
        if self.unit_id_at(to).is_some() {
            return Err(GridError::UnitOccupied(to));
        }
        Ok(to)
    }

    /// Move a unit one cell. Validated up front, so the vacate/occupy pair
    /// cannot fail halfway; if it somehow does, the unit is put back and the
    /// inconsistency is reported. A door at the destination opens for
    /// `door_open_rounds`.
    pub fn move_unit(
        &mut self,
        id: ObjectId,
        direction: Direction,
        door_open_rounds: u32,
    ) -> Result<Location, MoveError> {
        let to = self.check_move(id, direction)?;
        let from = self.vacate(id)?;
        if let Err(err) = self.occupy(id, to) {
            self.occupy(id, from)?;
            return Err(MoveError::Invariant(InvariantViolation::new(format!(
                "validated move of {id} to {to} failed: {err}"
            ))));
        }
        if let Some(Feature { kind: FeatureKind::Door(door), .. }) = self.feature_mut_at(to) {
            door.open(door_open_rounds);
            trace!(%to, rounds = door.timer, "door opened");
        }
        Ok(to)
    }

    fn vacate(&mut self, id: ObjectId) -> Result<Location, GridError> {
        let location = self.units.get(&id).ok_or(GridError::UnknownObject(id))?.location;
        let index = self.checked_index(location)?;
        self.unit_layer[index] = None;
        Ok(location)
    }

    fn occupy(&mut self, id: ObjectId, location: Location) -> Result<(), GridError> {
        let index = self.checked_index(location)?;
        if self.unit_layer[index].is_some() {
            return Err(GridError::UnitOccupied(location));
        }
        let unit = self.units.get_mut(&id).ok_or(GridError::UnknownObject(id))?;
        unit.location = location;
        self.unit_layer[index] = Some(id);
        Ok(())
    }

    fn feature_mut_at(&mut self, location: Location) -> Option<&mut Feature> {
        let id = self.feature_id_at(location)?;
        self.features.get_mut(&id)
    }

    pub fn rotate_unit(&mut self, id: ObjectId, rotation: Rotation) -> Result<Direction, GridError> {
        let unit = self.units.get_mut(&id).ok_or(GridError::UnknownObject(id))?;
        unit.facing = unit.facing.rotated(rotation);
        Ok(unit.facing)
    }

    // ── Combat ─────────────────────────────────────────────────────────

    /// Hit a cell: the feature first if it is destructible, then the unit.
    pub fn damage(&mut self, location: Location, amount: i32) -> DamageReport {
        let mut report = DamageReport::default();
        if let Some(feature) = self.feature_mut_at(location) {
            if let Some(health) = feature.health.as_mut() {
                if health.damage(amount) {
                    report.feature_destroyed = Some(feature.id);
                }
            }
        }
        if let Some(id) = self.unit_id_at(location) {
            if let Some(unit) = self.units.get_mut(&id) {
                if unit.health.damage(amount) {
                    report.killed = Some(Casualty { id, kind: unit.kind, owner: unit.owner });
                }
            }
        }
        report
    }

    /// Returns the amount actually restored.
    pub fn heal_unit(&mut self, id: ObjectId, amount: i32) -> Result<i32, GridError> {
        let unit = self.units.get_mut(&id).ok_or(GridError::UnknownObject(id))?;
        Ok(unit.health.heal(amount))
    }

    pub fn start_cooldown(&mut self, id: ObjectId) -> Result<(), GridError> {
        let unit = self.units.get_mut(&id).ok_or(GridError::UnknownObject(id))?;
        unit.cooldown = unit.stats().special_cooldown;
        Ok(())
    }

    pub fn set_spawn(&mut self, structure: ObjectId, spawn: Location) -> Result<(), GridError> {
        let feature = self.features.get_mut(&structure).ok_or(GridError::UnknownObject(structure))?;
        let s = feature.structure_mut().ok_or(GridError::NotStructure(structure))?;
        s.spawn = Some(spawn);
        Ok(())
    }

    // ── Round / turn processing ────────────────────────────────────────

    /// Once per round: door timers and special-attack cooldowns count down.
    pub fn advance_timers(&mut self) {
        for feature in self.features.values_mut() {
            if let FeatureKind::Door(door) = &mut feature.kind {
                door.advance();
            }
        }
        for unit in self.units.values_mut() {
            unit.cooldown = unit.cooldown.saturating_sub(1);
        }
    }

    /// End-of-turn lifecycle: remove the dead, re-evaluate structure control,
    /// refresh every unit's vision.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        let dead_units: Vec<ObjectId> = self.units.values().filter(|u| u.is_dead()).map(|u| u.id).collect();
        for id in dead_units {
            if let Ok(unit) = self.remove_unit(id) {
                report.removed_units.push(Casualty { id, kind: unit.kind, owner: unit.owner });
            }
        }

        let dead_features: Vec<ObjectId> =
            self.features.values().filter(|f| f.is_dead()).map(|f| f.id).collect();
        for id in dead_features {
            let Ok(feature) = self.remove_feature(id) else { continue };
            if let FeatureKind::Structure(s) = &feature.kind {
                report.destroyed_structures.push(DestroyedStructure {
                    id,
                    kind: s.kind,
                    controller: s.controller,
                    location: feature.location,
                });
            }
            // Rubble: the cell stays walkable.
            if let Err(err) = self.place_feature(FeatureKind::Floor, feature.location) {
                debug!(%err, "could not lay floor over destroyed feature");
            }
        }

        let occupied: Vec<(ObjectId, PlayerId)> = self
            .structures()
            .filter(|(_, s)| s.kind.is_capturable())
            .filter_map(|(f, s)| {
                let occupant = self.unit_at(f.location)?;
                (s.controller != Some(occupant.owner)).then_some((f.id, occupant.owner))
            })
            .collect();
        for (id, owner) in occupied {
            if let Some(s) = self.features.get_mut(&id).and_then(Feature::structure_mut) {
                report.captures.push(Capture { structure: id, from: s.controller, to: owner });
                s.controller = Some(owner);
            }
        }

        self.refresh_vision();
        report
    }

    // ── Vision ─────────────────────────────────────────────────────────

    pub fn field_of_view(&self, origin: Location, range: u32, facing: Direction, angle: u32) -> HashSet<Location> {
        let mut sight = Sight { grid: self, seen: HashSet::new() };
        fov::compute(&mut sight, origin, range, facing, angle);
        sight.seen
    }

    fn unit_field_of_view(&self, unit: &Unit) -> HashSet<Location> {
        let stats = unit.stats();
        self.field_of_view(unit.location, stats.fov_range, unit.facing, stats.fov_angle)
    }

    pub fn refresh_vision(&mut self) {
        let updates: Vec<(ObjectId, HashSet<Location>)> =
            self.units.values().map(|u| (u.id, self.unit_field_of_view(u))).collect();
        for (id, seen) in updates {
            if let Some(unit) = self.units.get_mut(&id) {
                unit.visible = seen;
            }
        }
    }

    pub fn refresh_unit_vision(&mut self, id: ObjectId) -> Result<(), GridError> {
        let unit = self.units.get(&id).ok_or(GridError::UnknownObject(id))?;
        let seen = self.unit_field_of_view(unit);
        if let Some(unit) = self.units.get_mut(&id) {
            unit.visible = seen;
        }
        Ok(())
    }
}

/// A failed move: either illegal, or (never expected) a broken layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error(transparent)]
    Illegal(#[from] GridError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

/// Binds the shadow caster to one grid's content for a single query.
struct Sight<'g> {
    grid: &'g Grid,
    seen: HashSet<Location>,
}

impl Sight<'_> {
    fn on_grid(&self, x: i64, y: i64) -> Option<Location> {
        Location::from_signed(x, y).filter(|&l| self.grid.contains(l))
    }
}

impl LightMap for Sight<'_> {
    fn blocks_light(&self, x: i64, y: i64) -> bool {
        self.on_grid(x, y).map_or(true, |l| self.grid.blocks_light(l))
    }

    fn set_visible(&mut self, x: i64, y: i64) {
        if let Some(l) = self.on_grid(x, y) {
            self.seen.insert(l);
        }
    }
}
