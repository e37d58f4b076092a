// ═══════════════════════════════════════════════════════════════════════
// Rules configuration
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};

/// Tunable match rules. Archetype stats are fixed per kind and live on
/// `UnitKind` / `StructureKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Resources each player starts with.
    pub starting_resources: u32,
    /// Rounds between income grants. Never zero.
    pub income_interval: u32,
    /// Rounds a door stays open after a unit walks onto it. Never zero.
    pub door_open_rounds: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            starting_resources: 100,
            income_interval: 1,
            door_open_rounds: 3,
        }
    }
}

impl RulesConfig {
    pub fn with_starting_resources(mut self, resources: u32) -> Self {
        self.starting_resources = resources;
        self
    }

    pub fn with_income_interval(mut self, rounds: u32) -> Self {
        self.income_interval = rounds.max(1);
        self
    }

    pub fn with_door_open_rounds(mut self, rounds: u32) -> Self {
        self.door_open_rounds = rounds.max(1);
        self
    }

    /// True when income is granted at the end of `round`.
    pub fn is_income_round(&self, round: u32) -> bool {
        round % self.income_interval.max(1) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_clamps_intervals() {
        let config = RulesConfig::default()
            .with_income_interval(0)
            .with_door_open_rounds(0)
            .with_starting_resources(7);
        assert_eq!(config.income_interval, 1);
        assert_eq!(config.door_open_rounds, 1);
        assert_eq!(config.starting_resources, 7);
    }

    #[test]
    fn income_rounds() {
        let config = RulesConfig::default().with_income_interval(3);
        assert!(!config.is_income_round(1));
        assert!(config.is_income_round(3));
        assert!(config.is_income_round(6));
    }
}
