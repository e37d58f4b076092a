// ═══════════════════════════════════════════════════════════════════════
// Match setup: populates a grid from rows of map symbols
//
// Map authoring (templates, mirroring, catalogs) lives outside the core.
// What the core owns is the population contract: for every cell, a
// Legend is handed the symbol, the location and the cell's section index,
// and places the right objects through an explicit SetupContext.
// ═══════════════════════════════════════════════════════════════════════

use crate::config::RulesConfig;
use crate::entity::*;
use crate::error::SetupError;
use crate::grid::Grid;
use crate::state::State;
use crate::types::*;
use tracing::debug;

/// Everything a legend may touch while populating one grid.
pub struct SetupContext<'a> {
    pub grid: &'a mut Grid,
    /// Player for each section index.
    pub sections: &'a [PlayerId],
}

impl SetupContext<'_> {
    pub fn player_for(&self, section: usize) -> Result<PlayerId, SetupError> {
        self.sections.get(section).copied().ok_or(SetupError::UnknownSection(section))
    }

    pub fn floor(&mut self, location: Location) -> Result<ObjectId, SetupError> {
        Ok(self.grid.place_feature(FeatureKind::Floor, location)?)
    }

    pub fn structure(
        &mut self,
        kind: StructureKind,
        controller: Option<PlayerId>,
        location: Location,
    ) -> Result<ObjectId, SetupError> {
        let structure = Structure { kind, controller, spawn: None };
        Ok(self.grid.place_feature(FeatureKind::Structure(structure), location)?)
    }

    pub fn unit(&mut self, kind: UnitKind, owner: PlayerId, location: Location) -> Result<ObjectId, SetupError> {
        Ok(self.grid.place_unit(kind, owner, Direction::North, location)?)
    }
}

/// Per-cell population callback.
pub trait Legend {
    fn place(
        &self,
        ctx: &mut SetupContext<'_>,
        symbol: char,
        location: Location,
        section: usize,
    ) -> Result<(), SetupError>;
}

/// The stock symbol set.
///
/// | symbol | places |
/// |--------|--------|
/// | `' '`  | space |
/// | `.`    | floor |
/// | `#`    | wall |
/// | `+`    | closed door |
/// | `B` `H`| base / stronghold controlled by the section's player |
/// | `O` `*`| uncontrolled outpost / objective |
/// | `S` `M` `I` | soldier / medic / infected of the section's player, on floor |
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLegend;

impl Legend for StandardLegend {
    fn place(
        &self,
        ctx: &mut SetupContext<'_>,
        symbol: char,
        location: Location,
        section: usize,
    ) -> Result<(), SetupError> {
        match symbol {
            ' ' => {
                ctx.grid.place_feature(FeatureKind::Space, location)?;
            }
            '.' => {
                ctx.floor(location)?;
            }
            '#' => {
                ctx.grid.place_feature(FeatureKind::Wall, location)?;
            }
            '+' => {
                ctx.grid.place_feature(FeatureKind::Door(Door::closed()), location)?;
            }
            'B' | 'H' => {
                let kind = if symbol == 'B' { StructureKind::Base } else { StructureKind::Stronghold };
                let owner = ctx.player_for(section)?;
                ctx.structure(kind, Some(owner), location)?;
            }
            'O' => {
                ctx.structure(StructureKind::Outpost, None, location)?;
            }
            '*' => {
                ctx.structure(StructureKind::Objective, None, location)?;
            }
            'S' | 'M' | 'I' => {
                let kind = match symbol {
                    'S' => UnitKind::Soldier,
                    'M' => UnitKind::Medic,
                    _ => UnitKind::Infected,
                };
                let owner = ctx.player_for(section)?;
                ctx.floor(location)?;
                ctx.unit(kind, owner, location)?;
            }
            _ => return Err(SetupError::UnknownSymbol { symbol, location }),
        }
        Ok(())
    }
}

/// Split a grid into `count` vertical strips of (nearly) equal width;
/// strip 0 is the westmost.
pub fn column_sections(width: u32, count: usize) -> impl Fn(Location) -> usize {
    let count = count.max(1);
    move |location: Location| {
        let strip = location.x as usize * count / width.max(1) as usize;
        strip.min(count - 1)
    }
}

/// Populate a grid from equally long rows of symbols.
pub fn build_grid<L, F>(
    rows: &[&str],
    sections: &[PlayerId],
    section_of: F,
    legend: &L,
) -> Result<Grid, SetupError>
where
    L: Legend,
    F: Fn(Location) -> usize,
{
    let first = rows.first().ok_or(SetupError::EmptyMap)?;
    let width = first.chars().count();
    if width == 0 {
        return Err(SetupError::EmptyMap);
    }
    let mut grid = Grid::new(width as u32, rows.len() as u32)?;

    {
        let mut ctx = SetupContext { grid: &mut grid, sections };
        for (y, row) in rows.iter().enumerate() {
            let len = row.chars().count();
            if len != width {
                return Err(SetupError::RaggedRow { row: y, len, expected: width });
            }
            for (x, symbol) in row.chars().enumerate() {
                let location = Location::new(x as u32, y as u32);
                legend.place(&mut ctx, symbol, location, section_of(location))?;
            }
        }
    }

    assign_spawn_cells(&mut grid)?;
    debug!(
        width = grid.width(),
        height = grid.height(),
        objects = grid.next_id().0 - 1,
        "grid populated"
    );
    Ok(grid)
}

/// Give every spawning structure without a spawn cell its first walkable
/// orthogonal neighbour, checked in N, E, S, W order.
pub fn assign_spawn_cells(grid: &mut Grid) -> Result<(), SetupError> {
    let pending: Vec<(ObjectId, Location)> = grid
        .structures()
        .filter(|(_, s)| s.kind.can_spawn() && s.spawn.is_none())
        .map(|(f, _)| (f.id, f.location))
        .collect();
    for (id, location) in pending {
        let cell = grid
            .neighbours(location)
            .into_iter()
            .find(|&n| grid.is_walkable(n))
            .ok_or(SetupError::NoSpawnCell(location))?;
        grid.set_spawn(id, cell)?;
    }
    Ok(())
}

/// Build a ready-to-play match with the stock legend. Section `i` belongs
/// to `roster[i]`, and the roster is also the turn order.
pub fn create_match<F>(rows: &[&str], roster: &[PlayerId], section_of: F, config: RulesConfig) -> Result<State, SetupError>
where
    F: Fn(Location) -> usize,
{
    let grid = build_grid(rows, roster, section_of, &StandardLegend)?;
    Ok(State::new(grid, roster, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GridError;

    const P1: PlayerId = PlayerId(1);
    const P2: PlayerId = PlayerId(2);

    #[test]
    fn standard_legend_populates_every_cell() {
        let rows = ["#####", "#B.H#", "#S+M#", "#####"];
        let grid = build_grid(&rows, &[P1, P2], column_sections(5, 2), &StandardLegend).unwrap();

        assert_eq!((grid.width(), grid.height()), (5, 4));
        for index in 0..grid.cell_count() {
            let location = grid.location_of(index).unwrap();
            assert!(grid.feature_at(location).is_some(), "no feature at {location}");
        }

        let base = grid.feature_at(Location::new(1, 1)).unwrap().structure().unwrap();
        assert_eq!(base.kind, StructureKind::Base);
        assert_eq!(base.controller, Some(P1));
        let stronghold = grid.feature_at(Location::new(3, 1)).unwrap().structure().unwrap();
        assert_eq!(stronghold.controller, Some(P2));

        let soldier = grid.unit_at(Location::new(1, 2)).unwrap();
        assert_eq!((soldier.kind, soldier.owner, soldier.facing), (UnitKind::Soldier, P1, Direction::North));
        assert!(grid.feature_at(Location::new(2, 2)).unwrap().door().is_some());
    }

    #[test]
    fn spawn_cell_prefers_north_then_clockwise() {
        // North of the base is wall, east is floor.
        let rows = ["###", "#B.", "#.."];
        let grid = build_grid(&rows, &[P1], |_| 0, &StandardLegend).unwrap();
        let base = grid.feature_at(Location::new(1, 1)).unwrap().structure().unwrap();
        assert_eq!(base.spawn, Some(Location::new(2, 1)));
    }

    #[test]
    fn walled_in_structure_is_rejected() {
        let rows = ["###", "#O#", "###"];
        let err = build_grid(&rows, &[P1], |_| 0, &StandardLegend).unwrap_err();
        assert_eq!(err, SetupError::NoSpawnCell(Location::new(1, 1)));
    }

    #[test]
    fn objective_needs_no_spawn_cell() {
        let rows = ["###", "#*#", "###"];
        assert!(build_grid(&rows, &[], |_| 0, &StandardLegend).is_ok());
    }

    #[test]
    fn malformed_maps_are_rejected() {
        assert_eq!(build_grid(&[], &[P1], |_| 0, &StandardLegend).unwrap_err(), SetupError::EmptyMap);
        assert_eq!(
            build_grid(&["...", ".."], &[P1], |_| 0, &StandardLegend).unwrap_err(),
            SetupError::RaggedRow { row: 1, len: 2, expected: 3 }
        );
        assert_eq!(
            build_grid(&[".?."], &[P1], |_| 0, &StandardLegend).unwrap_err(),
            SetupError::UnknownSymbol { symbol: '?', location: Location::new(1, 0) }
        );
        assert_eq!(
            build_grid(&[".S."], &[], |_| 0, &StandardLegend).unwrap_err(),
            SetupError::UnknownSection(0)
        );
    }

    #[test]
    fn custom_legend_can_stack_objects() {
        struct Doubled;
        impl Legend for Doubled {
            fn place(&self, ctx: &mut SetupContext<'_>, _: char, location: Location, _: usize) -> Result<(), SetupError> {
                ctx.floor(location)?;
                ctx.floor(location)?;
                Ok(())
            }
        }
        let err = build_grid(&["."], &[], |_| 0, &Doubled).unwrap_err();
        assert_eq!(err, SetupError::Grid(GridError::FeatureOccupied(Location::new(0, 0))));
    }

    #[test]
    fn create_match_hands_out_starting_resources() {
        let rows = ["B...H"];
        let config = RulesConfig::default().with_starting_resources(75);
        let state = create_match(&rows, &[P1, P2], column_sections(5, 2), config).unwrap();
        assert_eq!(state.round, 1);
        assert_eq!(state.active_player(), Some(P1));
        for player in &state.players {
            assert_eq!(player.resources, 75);
            assert_eq!(player.structures.len(), 1);
        }
    }

    #[test]
    fn column_sections_split_evenly() {
        let section_of = column_sections(6, 3);
        let sections: Vec<usize> = (0..6).map(|x| section_of(Location::new(x, 0))).collect();
        assert_eq!(sections, vec![0, 0, 1, 1, 2, 2]);
    }
}
