// ═══════════════════════════════════════════════════════════════════════
// Error taxonomy
//
//   ActionError        - whole action rejected, state untouched
//   OrderError         - one order rejected, the rest of the action goes on
//   GridError          - a placement/removal/move could not be carried out
//   SetupError         - the map could not be populated
//   InvariantViolation - the core is in a state it should never reach
// ═══════════════════════════════════════════════════════════════════════

use crate::entity::UnitKind;
use crate::types::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("it is {expected}'s turn, not {actual}'s")]
    NotActivePlayer { expected: PlayerId, actual: PlayerId },

    #[error("action is for round {actual} but the match is in round {expected}")]
    WrongRound { expected: u32, actual: u32 },

    #[error("the match is already finished")]
    Finished,

    #[error("the match has no players")]
    NoPlayers,
}

/// Why a single order was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum OrderError {
    #[error("no structure {0}")]
    UnknownStructure(ObjectId),

    #[error("no unit {0}")]
    UnknownUnit(ObjectId),

    #[error("unit {0} is dead")]
    UnitDead(ObjectId),

    #[error("{object} is not controlled by the acting player")]
    NotControlled { object: ObjectId },

    #[error("order names a {declared:?} but the unit is a {actual:?}")]
    WrongUnitKind { declared: UnitKind, actual: UnitKind },

    #[error("structure {0} cannot spawn units")]
    SpawnDisabled(ObjectId),

    #[error("structure {0} has no spawn direction")]
    NoSpawnDirection(ObjectId),

    #[error("needs {needed} resources, has {available}")]
    InsufficientResources { needed: u32, available: u32 },

    #[error("spawn cell {0} is not traversable")]
    SpawnBlocked(Location),

    #[error("order requires a location")]
    MissingLocation,

    #[error("{target} cannot be entered by a step {direction:?}")]
    UnreachableTarget { target: Location, direction: Direction },

    #[error("no unit at {0}")]
    NoUnitAt(Location),

    #[error("unit at {location} is {found}, not {expected}")]
    UnitMismatch { location: Location, expected: ObjectId, found: ObjectId },

    #[error("cannot move from {from} towards {direction:?}")]
    IllegalMove { from: Location, direction: Direction },

    #[error("{0} is outside the player's field of view")]
    NotVisible(Location),

    #[error("{target} is {distance} away, range is {range}")]
    OutOfRange { target: Location, distance: u32, range: u32 },

    #[error("special attack cooling down for {0} more rounds")]
    OnCooldown(u32),

    #[error("{0:?} special attack cannot be ordered")]
    NoSpecialAttack(UnitKind),

    #[error("no living unit to heal at {0}")]
    NothingToHeal(Location),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid dimensions must be non-zero")]
    EmptyGrid,

    #[error("{0} is off the grid")]
    OutOfBounds(Location),

    #[error("{0} already holds a feature")]
    FeatureOccupied(Location),

    #[error("{0} already holds a unit")]
    UnitOccupied(Location),

    #[error("{0} is not walkable")]
    NotWalkable(Location),

    #[error("no object {0}")]
    UnknownObject(ObjectId),

    #[error("{0} is not a structure")]
    NotStructure(ObjectId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("map has no rows")]
    EmptyMap,

    #[error("row {row} is {len} cells wide, expected {expected}")]
    RaggedRow { row: usize, len: usize, expected: usize },

    #[error("unknown symbol {symbol:?} at {location}")]
    UnknownSymbol { symbol: char, location: Location },

    #[error("section {0} has no player")]
    UnknownSection(usize),

    #[error("structure at {0} has no walkable neighbour to spawn on")]
    NoSpawnCell(Location),

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// A broken core invariant. Never caused by player input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violation: {message}")]
pub struct InvariantViolation {
    pub message: String,
}

impl InvariantViolation {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
