// ═══════════════════════════════════════════════════════════════════════
// Core types: identities, grid coordinates, facing, health
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Identities ─────────────────────────────────────────────────────────

/// Identity of an object placed on a grid. Issued by the grid, never reused
/// within a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

// ── Location ───────────────────────────────────────────────────────────

/// A cell coordinate. `x` grows east, `y` grows south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub x: u32,
    pub y: u32,
}

impl Location {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Row-major index of this cell for a grid of the given width.
    pub fn to_index(self, width: u32) -> usize {
        self.y as usize * width as usize + self.x as usize
    }

    /// Inverse of [`Location::to_index`].
    pub fn from_index(index: usize, width: u32) -> Self {
        let width = width as usize;
        Self::new((index % width) as u32, (index / width) as u32)
    }

    /// Build a location from signed coordinates; `None` if either is negative
    /// or does not fit.
    pub fn from_signed(x: i64, y: i64) -> Option<Self> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        Some(Self::new(x, y))
    }

    /// The adjacent cell in `direction`. Only the lower bound is checked here;
    /// the grid is responsible for the upper bound.
    pub fn step(self, direction: Direction) -> Option<Self> {
        let (dx, dy) = direction.offset();
        self.offset(dx, dy)
    }

    pub fn offset(self, dx: i64, dy: i64) -> Option<Self> {
        Self::from_signed(i64::from(self.x) + dx, i64::from(self.y) + dy)
    }

    pub fn manhattan(self, other: Location) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Cardinal direction from `self` to `other` when both lie on the same
    /// row or column (and differ).
    pub fn direction_to(self, other: Location) -> Option<Direction> {
        if self == other {
            return None;
        }
        if self.x == other.x {
            Some(if other.y < self.y { Direction::North } else { Direction::South })
        } else if self.y == other.y {
            Some(if other.x > self.x { Direction::East } else { Direction::West })
        } else {
            None
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ── Direction ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    /// Clockwise order starting at north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit step in grid coordinates (y grows south).
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// Facing angle in degrees, counter-clockwise from east.
    pub fn degrees(self) -> f64 {
        match self {
            Direction::East => 0.0,
            Direction::North => 90.0,
            Direction::West => 180.0,
            Direction::South => 270.0,
        }
    }

    pub fn clockwise(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    pub fn counter_clockwise(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    pub fn opposite(self) -> Self {
        self.clockwise().clockwise()
    }

    pub fn rotated(self, rotation: Rotation) -> Self {
        match rotation {
            Rotation::Clockwise => self.clockwise(),
            Rotation::CounterClockwise => self.counter_clockwise(),
        }
    }
}

// ── Health ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }

    /// Apply damage. Returns true if this hit took the object from alive to dead.
    pub fn damage(&mut self, amount: i32) -> bool {
        let was_alive = !self.is_dead();
        self.current = self.current.saturating_sub(amount);
        was_alive && self.is_dead()
    }

    /// Restore health, capped at max. Returns the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = self.current.saturating_add(amount).min(self.max);
        self.current - before
    }
}
