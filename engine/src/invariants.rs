//! Core invariants - sanity checks that detect bugs.
//!
//! None of these can be broken by player input. If one triggers, the grid
//! or the rules engine has a bug.

use crate::error::InvariantViolation;
use crate::grid::Grid;
use crate::state::State;
use crate::types::ObjectId;
use std::collections::BTreeSet;

/// Check the occupancy layers against the object arena.
#[must_use]
pub fn check_grid(grid: &Grid) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let (feature_layer, unit_layer) = grid.layers();

    for (index, (feature, unit)) in feature_layer.iter().zip(unit_layer).enumerate() {
        let Some(cell) = grid.location_of(index) else { continue };
        if let Some(id) = feature {
            match grid.feature(*id) {
                Some(f) if f.location == cell => {}
                Some(f) => violations.push(InvariantViolation::new(format!(
                    "feature {id} is listed at {cell} but thinks it is at {}",
                    f.location
                ))),
                None => violations.push(InvariantViolation::new(format!(
                    "feature layer at {cell} references missing object {id}"
                ))),
            }
        }
        if let Some(id) = unit {
            match grid.unit(*id) {
                Some(u) if u.location == cell => {}
                Some(u) => violations.push(InvariantViolation::new(format!(
                    "unit {id} is listed at {cell} but thinks it is at {}",
                    u.location
                ))),
                None => violations.push(InvariantViolation::new(format!(
                    "unit layer at {cell} references missing object {id}"
                ))),
            }
        }
    }

    for feature in grid.features() {
        if grid.feature_id_at(feature.location) != Some(feature.id) {
            violations.push(InvariantViolation::new(format!(
                "feature {} is not on the feature layer at {}",
                feature.id, feature.location
            )));
        }
        if let Some(health) = feature.health {
            if health.current > health.max {
                violations.push(InvariantViolation::new(format!(
                    "feature {} has health {} over max {}",
                    feature.id, health.current, health.max
                )));
            }
        }
    }

    let mut seen: BTreeSet<ObjectId> = grid.features().map(|f| f.id).collect();
    for unit in grid.units() {
        if !seen.insert(unit.id) {
            violations.push(InvariantViolation::new(format!(
                "identity {} is used by both a feature and a unit",
                unit.id
            )));
        }
        if grid.unit_id_at(unit.location) != Some(unit.id) {
            violations.push(InvariantViolation::new(format!(
                "unit {} is not on the unit layer at {}",
                unit.id, unit.location
            )));
        }
        if unit.health.current > unit.health.max {
            violations.push(InvariantViolation::new(format!(
                "unit {} has health {} over max {}",
                unit.id, unit.health.current, unit.health.max
            )));
        }
    }

    if let Some(highest) = seen.last() {
        if *highest >= grid.next_id() {
            violations.push(InvariantViolation::new(format!(
                "identity {highest} was never issued (next is {})",
                grid.next_id()
            )));
        }
    }

    violations
}

/// Check everything that must hold between turns.
#[must_use]
pub fn check_invariants(state: &State) -> Vec<InvariantViolation> {
    let mut violations = check_grid(&state.grid);

    for unit in state.grid.units().filter(|u| u.is_dead()) {
        violations.push(InvariantViolation::new(format!(
            "dead unit {} at {} survived the tick",
            unit.id, unit.location
        )));
    }

    for player in &state.players {
        let squad: BTreeSet<ObjectId> =
            state.grid.units().filter(|u| u.owner == player.id).map(|u| u.id).collect();
        if squad != player.units {
            violations.push(InvariantViolation::new(format!(
                "{} squad {:?} does not match grid ownership {:?}",
                player.id, player.units, squad
            )));
        }
        let controlled: BTreeSet<ObjectId> = state
            .grid
            .structures()
            .filter(|(_, s)| s.controller == Some(player.id))
            .map(|(f, _)| f.id)
            .collect();
        if controlled != player.structures {
            violations.push(InvariantViolation::new(format!(
                "{} structures {:?} do not match grid control {:?}",
                player.id, player.structures, controlled
            )));
        }
    }

    if state.active >= state.players.len() && !state.players.is_empty() {
        violations.push(InvariantViolation::new(format!(
            "active index {} out of {} players",
            state.active,
            state.players.len()
        )));
    }

    violations
}

/// Assert all invariants hold, panicking if any are violated.
///
/// Only active in debug builds. No-op in release builds.
///
/// # Panics
///
/// Panics with every violation listed.
#[cfg(debug_assertions)]
pub fn assert_invariants(state: &State) {
    let violations = check_invariants(state);
    if !violations.is_empty() {
        let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
        panic!("core invariant violations:\n  - {}", messages.join("\n  - "));
    }
}

/// No-op in release builds.
#[cfg(not(debug_assertions))]
pub fn assert_invariants(_state: &State) {}
