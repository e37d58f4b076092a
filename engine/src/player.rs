// ═══════════════════════════════════════════════════════════════════════
// Player: resources, score, and identities of what the player owns
// ═══════════════════════════════════════════════════════════════════════

use crate::grid::Grid;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub resources: u32,
    pub score: u32,
    /// Living units in this player's squad.
    pub units: BTreeSet<ObjectId>,
    /// Structures this player currently controls.
    pub structures: BTreeSet<ObjectId>,
    /// Union of every squad member's visible cells.
    pub fov: HashSet<Location>,
}

impl Player {
    pub fn new(id: PlayerId, resources: u32) -> Self {
        Self {
            id,
            resources,
            score: 0,
            units: BTreeSet::new(),
            structures: BTreeSet::new(),
            fov: HashSet::new(),
        }
    }

    pub fn can_see(&self, location: Location) -> bool {
        self.fov.contains(&location)
    }

    /// Debit `amount` if affordable.
    pub fn spend(&mut self, amount: u32) -> bool {
        match self.resources.checked_sub(amount) {
            Some(left) => {
                self.resources = left;
                true
            }
            None => false,
        }
    }

    /// Rebuild the combined field of view from the squad's cached vision.
    pub fn recompute_fov(&mut self, grid: &Grid) {
        self.fov = self
            .units
            .iter()
            .filter_map(|&id| grid.unit(id))
            .flat_map(|u| u.visible.iter().copied())
            .collect();
    }

    /// Rebuild squad and structure sets from grid ownership.
    pub fn sync_from(&mut self, grid: &Grid) {
        self.units = grid.units().filter(|u| u.owner == self.id).map(|u| u.id).collect();
        self.structures = grid
            .structures()
            .filter(|(_, s)| s.controller == Some(self.id))
            .map(|(f, _)| f.id)
            .collect();
    }
}
