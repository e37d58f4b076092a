// ═══════════════════════════════════════════════════════════════════════
// Field of view: recursive shadow casting with beveled wall corners
//
// One first-octant sweep is reused for all eight 45° octants through a
// coordinate transform. Each sector is bounded by two rational slopes
// (`top` and `bottom`); the sweep walks columns outwards from the origin
// and narrows or splits the sector at every clear/opaque transition.
//
// Octant k covers the angles [45k, 45k + 45] measured counter-clockwise
// from east, with north at 90°. Inside an octant `x` is the distance along
// the primary axis and `y` the distance along the secondary axis, y <= x.
//
// The engine is a pure function of its inputs: all state lives in the
// caller's LightMap and in locals of a single `compute` call.
// ═══════════════════════════════════════════════════════════════════════

use crate::types::{Direction, Location};

/// Cone widths at or above this are full-circle vision.
pub const FULL_CIRCLE: u32 = 360;

/// Absorbs floating-point error for cells exactly on the cone edge.
const ANGLE_EPSILON: f64 = 1e-6;

/// Capabilities the shadow caster needs from whatever it is looking at.
/// Coordinates are absolute and may fall outside the map.
pub trait LightMap {
    /// Off-map cells must report true.
    fn blocks_light(&self, x: i64, y: i64) -> bool;

    /// Record a cell as visible. Off-map cells must be ignored.
    fn set_visible(&mut self, x: i64, y: i64);

    /// Distance of an offset from the origin, compared against the range.
    fn distance(&self, dx: i64, dy: i64) -> i64 {
        dx.abs() + dy.abs()
    }
}

/// Mark every cell visible from `origin` on `map`.
///
/// `range` is compared against [`LightMap::distance`] (Manhattan by
/// default). `angle` is the width of the vision cone centred on `facing`;
/// [`FULL_CIRCLE`] or more disables the cone. The origin is always visible.
pub fn compute<M: LightMap>(map: &mut M, origin: Location, range: u32, facing: Direction, angle: u32) {
    let ox = i64::from(origin.x);
    let oy = i64::from(origin.y);
    map.set_visible(ox, oy);

    let cone = Cone::new(facing, angle);
    for octant in 0..8u8 {
        if cone.skips_octant(octant) {
            continue;
        }
        let mut caster = Caster {
            map: &mut *map,
            ox,
            oy,
            octant,
            range: i64::from(range),
            cone,
        };
        caster.cast(1, Slope::new(1, 1), Slope::new(0, 1));
    }
}

// ── Angles ─────────────────────────────────────────────────────────────

/// Smallest absolute difference between two angles, in [0, 180].
fn angular_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

#[derive(Debug, Clone, Copy)]
struct Cone {
    facing: f64,
    half: f64,
    full: bool,
}

impl Cone {
    fn new(facing: Direction, angle: u32) -> Self {
        Self {
            facing: facing.degrees(),
            half: f64::from(angle) / 2.0,
            full: angle >= FULL_CIRCLE,
        }
    }

    /// An octant is skipped when even its closest edge is outside the cone.
    fn skips_octant(&self, octant: u8) -> bool {
        if self.full {
            return false;
        }
        let start = 45.0 * f64::from(octant);
        let end = start + 45.0;
        let inside = (self.facing - start).rem_euclid(360.0) <= 45.0;
        let nearest = if inside {
            0.0
        } else {
            angular_difference(self.facing, start).min(angular_difference(self.facing, end))
        };
        nearest > self.half + ANGLE_EPSILON
    }

    /// `dx` grows east, `dy` grows north.
    fn contains(&self, dx: i64, dy: i64) -> bool {
        if self.full || (dx == 0 && dy == 0) {
            return true;
        }
        let angle = (dy as f64).atan2(dx as f64).to_degrees();
        angular_difference(angle, self.facing) <= self.half + ANGLE_EPSILON
    }
}

// ── Slopes ─────────────────────────────────────────────────────────────

/// The rational slope y/x.
#[derive(Debug, Clone, Copy)]
struct Slope {
    y: i64,
    x: i64,
}

impl Slope {
    fn new(y: i64, x: i64) -> Self {
        Self { y, x }
    }

    fn greater(self, y: i64, x: i64) -> bool {
        self.y * x > self.x * y
    }

    fn greater_or_equal(self, y: i64, x: i64) -> bool {
        self.y * x >= self.x * y
    }

    fn less_or_equal(self, y: i64, x: i64) -> bool {
        self.y * x <= self.x * y
    }
}

// ── Octant sweep ───────────────────────────────────────────────────────

struct Caster<'m, M: LightMap> {
    map: &'m mut M,
    ox: i64,
    oy: i64,
    octant: u8,
    range: i64,
    cone: Cone,
}

impl<M: LightMap> Caster<'_, M> {
    fn translate(&self, x: i64, y: i64) -> (i64, i64) {
        let (ox, oy) = (self.ox, self.oy);
        match self.octant {
            0 => (ox + x, oy - y),
            1 => (ox + y, oy - x),
            2 => (ox - y, oy - x),
            3 => (ox - x, oy - y),
            4 => (ox - x, oy + y),
            5 => (ox - y, oy + x),
            6 => (ox + y, oy + x),
            _ => (ox + x, oy + y),
        }
    }

    fn in_cone(&self, nx: i64, ny: i64) -> bool {
        self.cone.contains(nx - self.ox, self.oy - ny)
    }

    /// Cells outside the cone behave like walls so the cone edge casts shadow.
    fn blocks_light(&self, x: i64, y: i64) -> bool {
        let (nx, ny) = self.translate(x, y);
        !self.in_cone(nx, ny) || self.map.blocks_light(nx, ny)
    }

    fn set_visible(&mut self, x: i64, y: i64) {
        let (nx, ny) = self.translate(x, y);
        if self.in_cone(nx, ny) {
            self.map.set_visible(nx, ny);
        }
    }

    fn cast(&mut self, mut x: i64, mut top: Slope, mut bottom: Slope) {
        while x <= self.range {
            // Topmost row the sector touches in this column. A top of ?/1 can
            // only be 1/1, which is the untouched starting slope.
            let top_y = if top.x == 1 {
                x
            } else {
                // Row entered from the left edge of the column.
                let mut top_y = ((x * 2 - 1) * top.y + top.x) / (top.x * 2);
                if self.blocks_light(x, top_y) {
                    // Light slips into the row above only past a beveled top-left corner.
                    if top.greater_or_equal(top_y * 2 + 1, x * 2) && !self.blocks_light(x, top_y + 1) {
                        top_y += 1;
                    }
                } else {
                    // Compare against the bottom-right corner of the cell above when
                    // the cell above-right is a wall, otherwise its bottom centre.
                    let mut ax = x * 2;
                    if self.blocks_light(x + 1, top_y + 1) {
                        ax += 1;
                    }
                    if top.greater(top_y * 2 + 1, ax) {
                        top_y += 1;
                    }
                }
                top_y
            };

            let bottom_y = if bottom.y == 0 {
                0
            } else {
                let mut bottom_y = ((x * 2 - 1) * bottom.y + bottom.x) / (bottom.x * 2);
                // A wall is only lit if the bottom vector actually hits its shape.
                if bottom.greater_or_equal(bottom_y * 2 + 1, x * 2)
                    && self.blocks_light(x, bottom_y)
                    && !self.blocks_light(x, bottom_y + 1)
                {
                    bottom_y += 1;
                }
                bottom_y
            };

            let mut was_opaque: Option<bool> = None;
            let mut y = top_y;
            while y >= bottom_y {
                if self.map.distance(x, y) <= self.range {
                    let is_opaque = self.blocks_light(x, y);
                    // Interior rows are always lit; a clear boundary row is lit when
                    // the boundary slope reaches its centre.
                    let is_visible = is_opaque
                        || ((y != top_y || top.greater_or_equal(y, x))
                            && (y != bottom_y || bottom.less_or_equal(y, x)));
                    if is_visible {
                        self.set_visible(x, y);
                    }

                    // The last column never feeds another one.
                    if x != self.range {
                        if is_opaque {
                            if was_opaque == Some(false) {
                                // Clear -> opaque: the part of the sector above this wall
                                // continues in the next column with a raised bottom.
                                let mut nx = x * 2;
                                let ny = y * 2 + 1;
                                if self.blocks_light(x, y + 1) {
                                    nx -= 1;
                                }
                                if top.greater(ny, nx) {
                                    if y == bottom_y {
                                        bottom = Slope::new(ny, nx);
                                        break;
                                    }
                                    self.cast(x + 1, top, Slope::new(ny, nx));
                                } else if y == bottom_y {
                                    return;
                                }
                            }
                            was_opaque = Some(true);
                        } else {
                            if was_opaque == Some(true) {
                                // Opaque -> clear: lower the top to the wall's bottom edge.
                                let mut nx = x * 2;
                                let ny = y * 2 + 1;
                                if self.blocks_light(x + 1, y + 1) {
                                    nx += 1;
                                }
                                if bottom.greater_or_equal(ny, nx) {
                                    return;
                                }
                                top = Slope::new(ny, nx);
                            }
                            was_opaque = Some(false);
                        }
                    }
                }
                y -= 1;
            }

            // Only a column that ends on a clear cell continues the sector.
            if was_opaque != Some(false) {
                break;
            }
            x += 1;
        }
    }
}
