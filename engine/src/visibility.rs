// ═══════════════════════════════════════════════════════════════════════
// Visibility / Information Model
//
// Information in a match is split between:
//   PUBLIC  - visible to all players at all times
//   PRIVATE - known only to the owning player
//   HIDDEN  - outside the player's combined field of view
//
// This module produces a "player view" of the match state that only
// contains information that player is legally allowed to know.
// External policies should receive PlayerView, never the raw State.
// ═══════════════════════════════════════════════════════════════════════

use crate::entity::{Feature, Unit};
use crate::state::State;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ── What is PUBLIC ─────────────────────────────────────────────────────
//
// • Terrain and structures: every feature on the grid, including doors
//   (and whether they are open) and who controls each structure
// • Grid dimensions, current round, turn order, whose turn it is
// • Every player's score
// • Whether the match has finished, and the ranking once it has
//
// ── What is PRIVATE (per player) ───────────────────────────────────────
//
// • Your own resources
// • Your own units: health, facing, cooldowns, what each one sees
// • Your combined field of view
//
// ── What is HIDDEN ─────────────────────────────────────────────────────
//
// • Enemy units standing outside your combined field of view
// • Other players' resources
//

/// The view of the match a specific player is allowed to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    // ── Public info ────────────────────────────────────────
    pub viewer: PlayerId,
    pub round: u32,
    pub active_player: Option<PlayerId>,
    pub turn_order: Vec<PlayerId>,
    pub width: u32,
    pub height: u32,
    /// All features by identity.
    pub features: BTreeMap<ObjectId, Feature>,
    pub scores: BTreeMap<PlayerId, u32>,
    pub ranking: Option<Vec<PlayerId>>,

    // ── Private info (only for the viewer) ─────────────────
    pub resources: u32,
    pub my_units: Vec<Unit>,
    pub my_structures: Vec<ObjectId>,
    pub fov: HashSet<Location>,

    /// Enemy units currently standing inside `fov`. Their own vision is
    /// stripped.
    pub visible_enemies: Vec<Unit>,
}

impl PlayerView {
    pub fn is_my_turn(&self) -> bool {
        self.active_player == Some(self.viewer)
    }

    pub fn can_see(&self, location: Location) -> bool {
        self.fov.contains(&location)
    }

    pub fn enemy_at(&self, location: Location) -> Option<&Unit> {
        self.visible_enemies.iter().find(|u| u.location == location)
    }

    pub fn feature_at(&self, location: Location) -> Option<&Feature> {
        self.features.values().find(|f| f.location == location)
    }
}

/// Build the PlayerView for a specific player. `None` if the player is not
/// on the roster.
pub fn player_view(state: &State, viewer: PlayerId) -> Option<PlayerView> {
    let me = state.player(viewer)?;

    let features = state.grid.features().map(|f| (f.id, f.clone())).collect();
    let scores = state.players.iter().map(|p| (p.id, p.score)).collect();

    let my_units = me.units.iter().filter_map(|&id| state.grid.unit(id)).cloned().collect();

    let visible_enemies = state
        .grid
        .units()
        .filter(|u| u.owner != viewer && me.can_see(u.location))
        .map(|u| Unit { visible: HashSet::new(), ..u.clone() })
        .collect();

    Some(PlayerView {
        viewer,
        round: state.round,
        active_player: state.active_player(),
        turn_order: state.players.iter().map(|p| p.id).collect(),
        width: state.grid.width(),
        height: state.grid.height(),
        features,
        scores,
        ranking: state.ranking.clone(),
        resources: me.resources,
        my_units,
        my_structures: me.structures.iter().copied().collect(),
        fov: me.fov.clone(),
        visible_enemies,
    })
}
