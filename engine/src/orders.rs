// ═══════════════════════════════════════════════════════════════════════
// Orders and actions
//
// An Action is everything one player submits for one turn: at most one
// order per object, keyed by the object's identity. Keying by identity
// also fixes the application order (ascending identity).
// ═══════════════════════════════════════════════════════════════════════

use crate::entity::UnitKind;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a unit is told to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    RotateClockwise,
    RotateCounterClockwise,
    /// One step in a cardinal direction onto the order's location.
    Move(Direction),
    Attack,
    SpecialAttack,
}

impl Command {
    /// Whether orders with this command carry a location.
    pub fn needs_location(self) -> bool {
        !matches!(self, Command::RotateClockwise | Command::RotateCounterClockwise)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureOrder {
    pub structure: ObjectId,
    pub spawn: UnitKind,
    /// Set once the order has been adjudicated.
    #[serde(default)]
    pub accepted: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOrder {
    pub unit: ObjectId,
    /// The archetype the submitter believes the unit to be.
    pub kind: UnitKind,
    pub command: Command,
    /// Move: the destination cell. Attack / special: the target cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub accepted: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Structure(StructureOrder),
    Unit(UnitOrder),
}

impl Order {
    pub fn spawn(structure: ObjectId, kind: UnitKind) -> Self {
        Order::Structure(StructureOrder { structure, spawn: kind, accepted: None })
    }

    pub fn rotate(unit: ObjectId, kind: UnitKind, rotation: Rotation) -> Self {
        let command = match rotation {
            Rotation::Clockwise => Command::RotateClockwise,
            Rotation::CounterClockwise => Command::RotateCounterClockwise,
        };
        Self::unit(unit, kind, command, None)
    }

    /// Move one step in `direction`, landing on `to`.
    pub fn movement(unit: ObjectId, kind: UnitKind, to: Location, direction: Direction) -> Self {
        Self::unit(unit, kind, Command::Move(direction), Some(to))
    }

    /// Move from `from` one step in `direction`. `None` when the step would
    /// leave the non-negative quadrant.
    pub fn step(unit: ObjectId, kind: UnitKind, from: Location, direction: Direction) -> Option<Self> {
        from.step(direction).map(|to| Self::movement(unit, kind, to, direction))
    }

    pub fn attack(unit: ObjectId, kind: UnitKind, target: Location) -> Self {
        Self::unit(unit, kind, Command::Attack, Some(target))
    }

    pub fn special(unit: ObjectId, kind: UnitKind, target: Location) -> Self {
        Self::unit(unit, kind, Command::SpecialAttack, Some(target))
    }

    fn unit(unit: ObjectId, kind: UnitKind, command: Command, location: Option<Location>) -> Self {
        let location = location.filter(|_| command.needs_location());
        Order::Unit(UnitOrder { unit, kind, command, location, accepted: None })
    }

    /// Identity of the object this order targets.
    pub fn target(&self) -> ObjectId {
        match self {
            Order::Structure(o) => o.structure,
            Order::Unit(o) => o.unit,
        }
    }

    pub fn accepted(&self) -> Option<bool> {
        match self {
            Order::Structure(o) => o.accepted,
            Order::Unit(o) => o.accepted,
        }
    }

    pub(crate) fn set_accepted(&mut self, accepted: bool) {
        match self {
            Order::Structure(o) => o.accepted = Some(accepted),
            Order::Unit(o) => o.accepted = Some(accepted),
        }
    }
}

/// One player's submission for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub player: PlayerId,
    pub round: u32,
    orders: BTreeMap<ObjectId, Order>,
}

impl Action {
    pub fn new(player: PlayerId, round: u32) -> Self {
        Self { player, round, orders: BTreeMap::new() }
    }

    /// Add an order. Returns false (and keeps the first) if the object
    /// already has one.
    pub fn push(&mut self, order: Order) -> bool {
        let target = order.target();
        if self.orders.contains_key(&target) {
            return false;
        }
        self.orders.insert(target, order);
        true
    }

    pub fn with(mut self, order: Order) -> Self {
        self.push(order);
        self
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Orders in application order.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub(crate) fn orders_mut(&mut self) -> impl Iterator<Item = &mut Order> {
        self.orders.values_mut()
    }

    pub fn order_for(&self, object: ObjectId) -> Option<&Order> {
        self.orders.get(&object)
    }
}
