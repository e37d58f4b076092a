// ═══════════════════════════════════════════════════════════════════════
// Match state: round, turn order, roster, grid
// ═══════════════════════════════════════════════════════════════════════

use crate::config::RulesConfig;
use crate::grid::Grid;
use crate::player::Player;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    /// Starts at 1; increments when the turn order wraps.
    pub round: u32,
    /// Index into `players` of whoever acts next.
    pub active: usize,
    /// Roster in turn order.
    pub players: Vec<Player>,
    pub grid: Grid,
    pub config: RulesConfig,
    /// Final placement (index 0 = winner), set once the match completes.
    pub ranking: Option<Vec<PlayerId>>,
}

impl State {
    /// Wrap a populated grid. Squads, controlled structures and every
    /// player's combined field of view are derived from the grid.
    pub fn new(mut grid: Grid, roster: &[PlayerId], config: RulesConfig) -> Self {
        grid.refresh_vision();
        let players = roster
            .iter()
            .map(|&id| {
                let mut player = Player::new(id, config.starting_resources);
                player.sync_from(&grid);
                player.recompute_fov(&grid);
                player
            })
            .collect();
        Self { round: 1, active: 0, players, grid, config, ranking: None }
    }

    pub fn is_finished(&self) -> bool {
        self.ranking.is_some()
    }

    pub fn active_player(&self) -> Option<PlayerId> {
        self.players.get(self.active).map(|p| p.id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// True when the active player is last in turn order.
    pub fn is_last_in_round(&self) -> bool {
        self.active + 1 >= self.players.len()
    }

    /// Deep copy for external policies. Identities are preserved; nothing
    /// in the copy aliases the original.
    pub fn snapshot(&self) -> State {
        self.clone()
    }

    /// Players by descending score, ties broken by ascending identity.
    pub fn standings(&self) -> Vec<PlayerId> {
        let mut order: Vec<&Player> = self.players.iter().collect();
        order.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        order.into_iter().map(|p| p.id).collect()
    }
}
