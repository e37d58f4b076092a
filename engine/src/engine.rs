// ═══════════════════════════════════════════════════════════════════════
// Rules Engine: turn adjudication
//
// Architecture:
//   The engine is a pure state machine. It never does I/O or calls agents.
//   A driver submits one Action for the active player via `handle()`;
//   the engine validates it, applies its orders, runs the post-turn
//   lifecycle and reports what happened.
//
// Flow of one `handle()` call:
//   1. Validate: match not finished, acting player is active, round matches.
//      Any failure rejects the whole action and leaves the state untouched.
//   2. Apply orders in ascending object identity. Each order is accepted
//      or rejected on its own; rejections are collected, never fatal.
//   3. Post-turn: timers (once per round), grid tick, squad/FOV upkeep,
//      income and round increment when the turn order wraps.
//   4. Advance the active player and check for completion.
// ═══════════════════════════════════════════════════════════════════════

use crate::entity::{Feature, UnitKind};
use crate::error::{ActionError, OrderError};
use crate::grid::{Casualty, MoveError, TickReport};
use crate::orders::{Action, Command, Order, StructureOrder, UnitOrder};
use crate::state::State;
use crate::types::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

/// One rejected order and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub object: ObjectId,
    pub reason: OrderError,
}

/// Outcome of a handled action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    pub player: PlayerId,
    pub round: u32,
    /// Orders applied.
    pub accepted: usize,
    pub rejections: Vec<Rejection>,
    pub tick: TickReport,
    pub finished: bool,
    /// Final standings (index 0 = first place) once finished.
    pub ranking: Option<Vec<PlayerId>>,
}

impl TurnReport {
    /// Zero-based placement of `player` in the final ranking.
    pub fn placement(&self, player: PlayerId) -> Option<usize> {
        self.ranking.as_ref()?.iter().position(|&p| p == player)
    }

    /// Human-readable summary listing every rejected order.
    pub fn diagnostics(&self) -> String {
        let mut out = format!(
            "{} round {}: {} accepted, {} rejected",
            self.player,
            self.round,
            self.accepted,
            self.rejections.len()
        );
        for rejection in &self.rejections {
            out.push_str(&format!("\n  {}: {}", rejection.object, rejection.reason));
        }
        out
    }
}

/// Adjudicate one action against the state. Acceptance flags are written
/// back onto the action's orders.
pub fn handle(state: &mut State, action: &mut Action) -> Result<TurnReport, ActionError> {
    if let Err(err) = validate(state, action) {
        warn!(player = %action.player, round = action.round, %err, "action rejected");
        return Err(err);
    }
    let acting = state.active;

    let mut accepted = 0;
    let mut rejections = Vec::new();
    for order in action.orders_mut() {
        let outcome = match &*order {
            Order::Structure(o) => spawn(state, acting, o),
            Order::Unit(o) => command_unit(state, acting, o),
        };
        let target = order.target();
        match outcome {
            Ok(()) => {
                order.set_accepted(true);
                accepted += 1;
                trace!(object = %target, "order applied");
            }
            Err(reason) => {
                order.set_accepted(false);
                debug!(object = %target, %reason, "order rejected");
                rejections.push(Rejection { object: target, reason });
            }
        }
    }

    let round = state.round;
    let tick = end_turn(state);
    check_completion(state);

    #[cfg(debug_assertions)]
    crate::invariants::assert_invariants(state);

    Ok(TurnReport {
        player: action.player,
        round,
        accepted,
        rejections,
        tick,
        finished: state.is_finished(),
        ranking: state.ranking.clone(),
    })
}

fn validate(state: &State, action: &Action) -> Result<(), ActionError> {
    if state.is_finished() {
        return Err(ActionError::Finished);
    }
    let expected = state.active_player().ok_or(ActionError::NoPlayers)?;
    if action.player != expected {
        return Err(ActionError::NotActivePlayer { expected, actual: action.player });
    }
    if action.round != state.round {
        return Err(ActionError::WrongRound { expected: state.round, actual: action.round });
    }
    Ok(())
}

// ── Structure orders ───────────────────────────────────────────────────

fn spawn(state: &mut State, acting: usize, order: &StructureOrder) -> Result<(), OrderError> {
    let player = state.players[acting].id;
    let feature = state
        .grid
        .feature(order.structure)
        .ok_or(OrderError::UnknownStructure(order.structure))?;
    let structure = feature.structure().ok_or(OrderError::UnknownStructure(order.structure))?;
    if structure.controller != Some(player) {
        return Err(OrderError::NotControlled { object: order.structure });
    }
    if !structure.kind.can_spawn() {
        return Err(OrderError::SpawnDisabled(order.structure));
    }
    let cell = structure
        .spawn
        .filter(|&cell| feature.location.manhattan(cell) == 1)
        .ok_or(OrderError::NoSpawnDirection(order.structure))?;
    let facing = feature
        .location
        .direction_to(cell)
        .ok_or(OrderError::NoSpawnDirection(order.structure))?;

    let cost = order.spawn.stats().cost;
    let available = state.players[acting].resources;
    if available < cost {
        return Err(OrderError::InsufficientResources { needed: cost, available });
    }
    if !state.grid.is_traversable(cell) {
        return Err(OrderError::SpawnBlocked(cell));
    }
    let id = state
        .grid
        .place_unit(order.spawn, player, facing, cell)
        .map_err(|_| OrderError::SpawnBlocked(cell))?;

    let owner = &mut state.players[acting];
    owner.spend(cost);
    owner.units.insert(id);
    enlist_vision(state, acting, id);
    trace!(%player, unit = %id, kind = ?order.spawn, %cell, "unit spawned");
    Ok(())
}

/// Compute a freshly placed unit's vision and fold it into its owner's FOV.
fn enlist_vision(state: &mut State, acting: usize, id: ObjectId) {
    if let Err(err) = state.grid.refresh_unit_vision(id) {
        error!(%err, "new unit vanished before its vision was computed");
        return;
    }
    state.players[acting].recompute_fov(&state.grid);
}

// ── Unit orders ────────────────────────────────────────────────────────

fn command_unit(state: &mut State, acting: usize, order: &UnitOrder) -> Result<(), OrderError> {
    let unit = state.grid.unit(order.unit).ok_or(OrderError::UnknownUnit(order.unit))?;
    // Killed earlier in this action; removed at the tick.
    if unit.is_dead() {
        return Err(OrderError::UnitDead(order.unit));
    }
    if unit.owner != state.players[acting].id {
        return Err(OrderError::NotControlled { object: order.unit });
    }
    if unit.kind != order.kind {
        return Err(OrderError::WrongUnitKind { declared: order.kind, actual: unit.kind });
    }
    match order.command {
        Command::RotateClockwise => rotate(state, order.unit, Rotation::Clockwise),
        Command::RotateCounterClockwise => rotate(state, order.unit, Rotation::CounterClockwise),
        Command::Move(direction) => move_unit(state, order, direction),
        Command::Attack => attack(state, acting, order),
        Command::SpecialAttack => special_attack(state, acting, order),
    }
}

fn rotate(state: &mut State, unit: ObjectId, rotation: Rotation) -> Result<(), OrderError> {
    state
        .grid
        .rotate_unit(unit, rotation)
        .map(|_| ())
        .map_err(|_| OrderError::UnknownUnit(unit))
}

/// The order names the destination; the origin it implies must hold the
/// ordered unit.
fn move_unit(state: &mut State, order: &UnitOrder, direction: Direction) -> Result<(), OrderError> {
    let target = order.location.ok_or(OrderError::MissingLocation)?;
    let from = target
        .step(direction.opposite())
        .ok_or(OrderError::UnreachableTarget { target, direction })?;
    let found = state.grid.unit_id_at(from).ok_or(OrderError::NoUnitAt(from))?;
    if found != order.unit {
        return Err(OrderError::UnitMismatch { location: from, expected: order.unit, found });
    }
    match state.grid.move_unit(order.unit, direction, state.config.door_open_rounds) {
        Ok(_) => Ok(()),
        Err(MoveError::Illegal(_)) => Err(OrderError::IllegalMove { from, direction }),
        Err(MoveError::Invariant(violation)) => {
            error!(%violation, "move left the grid inconsistent");
            Err(OrderError::IllegalMove { from, direction })
        }
    }
}

/// Target location of an attack-like order, checked against the acting
/// player's combined FOV and the unit's attack range.
fn aim(state: &State, acting: usize, order: &UnitOrder) -> Result<Location, OrderError> {
    let target = order.location.ok_or(OrderError::MissingLocation)?;
    let unit = state.grid.unit(order.unit).ok_or(OrderError::UnknownUnit(order.unit))?;
    if !state.players[acting].can_see(target) {
        return Err(OrderError::NotVisible(target));
    }
    let distance = unit.location.manhattan(target);
    let range = unit.stats().attack_range;
    if distance > range {
        return Err(OrderError::OutOfRange { target, distance, range });
    }
    Ok(target)
}

fn attack(state: &mut State, acting: usize, order: &UnitOrder) -> Result<(), OrderError> {
    let target = aim(state, acting, order)?;
    let (kind, facing, cooldown) = {
        let unit = state.grid.unit(order.unit).ok_or(OrderError::UnknownUnit(order.unit))?;
        (unit.kind, unit.facing, unit.cooldown)
    };
    let hit = state.grid.damage(target, kind.stats().attack_damage);
    if let Some(destroyed) = hit.feature_destroyed {
        debug!(feature = %destroyed, "feature destroyed");
    }
    let Some(casualty) = hit.killed else { return Ok(()) };

    if kind == UnitKind::Infected && casualty.kind != UnitKind::Infected && cooldown == 0 {
        infect(state, acting, order.unit, casualty, target, facing);
    } else {
        credit_kill(state, acting, casualty);
    }
    Ok(())
}

/// An Infected's victim rises on the attacker's side.
fn infect(state: &mut State, acting: usize, attacker: ObjectId, victim: Casualty, at: Location, facing: Direction) {
    if let Err(err) = state.grid.remove_unit(victim.id) {
        error!(%err, "infection victim missing from grid");
        return;
    }
    if let Some(owner) = state.player_mut(victim.owner) {
        owner.units.remove(&victim.id);
    }
    credit_kill(state, acting, victim);

    let player = state.players[acting].id;
    match state.grid.place_unit(UnitKind::Infected, player, facing, at) {
        Ok(id) => {
            state.players[acting].units.insert(id);
            enlist_vision(state, acting, id);
            debug!(victim = %victim.id, infected = %id, %at, "unit infected");
        }
        Err(err) => debug!(%err, "no room for the infected"),
    }
    if let Err(err) = state.grid.start_cooldown(attacker) {
        error!(%err, "attacker missing after infection");
    }
}

fn credit_kill(state: &mut State, acting: usize, casualty: Casualty) {
    let player = &mut state.players[acting];
    if casualty.owner == player.id {
        return;
    }
    player.score += casualty.kind.stats().kill_score;
    trace!(player = %player.id, victim = %casualty.id, score = player.score, "kill credited");
}

fn special_attack(state: &mut State, acting: usize, order: &UnitOrder) -> Result<(), OrderError> {
    if order.kind == UnitKind::Infected {
        return Err(OrderError::NoSpecialAttack(order.kind));
    }
    let cooldown = state.grid.unit(order.unit).map_or(0, |u| u.cooldown);
    if cooldown > 0 {
        return Err(OrderError::OnCooldown(cooldown));
    }
    let target = aim(state, acting, order)?;
    let power = order.kind.stats().special_power;

    match order.kind {
        UnitKind::Medic => {
            let patient = state
                .grid
                .unit_at(target)
                .filter(|u| !u.is_dead())
                .map(|u| u.id)
                .ok_or(OrderError::NothingToHeal(target))?;
            state
                .grid
                .heal_unit(patient, power)
                .map_err(|_| OrderError::NothingToHeal(target))?;
        }
        UnitKind::Soldier => {
            let blast: Vec<Location> = state
                .grid
                .area_around(target, true)
                .into_iter()
                .filter(|&cell| !state.grid.feature_at(cell).is_some_and(Feature::is_wall))
                .collect();
            for cell in blast {
                if let Some(casualty) = state.grid.damage(cell, power).killed {
                    credit_kill(state, acting, casualty);
                }
            }
        }
        UnitKind::Infected => return Err(OrderError::NoSpecialAttack(order.kind)),
    }

    state
        .grid
        .start_cooldown(order.unit)
        .map_err(|_| OrderError::UnknownUnit(order.unit))
}

// ── Post-turn lifecycle ────────────────────────────────────────────────

fn end_turn(state: &mut State) -> TickReport {
    let wrapped = state.is_last_in_round();
    if wrapped {
        state.grid.advance_timers();
    }

    let tick = state.grid.tick();
    apply_tick(state, &tick);
    debug!(
        removed = tick.removed_units.len(),
        destroyed = tick.destroyed_structures.len(),
        captured = tick.captures.len(),
        "tick"
    );

    if wrapped {
        if state.config.is_income_round(state.round) {
            grant_income(state);
        }
        state.round += 1;
        state.active = 0;
    } else {
        state.active += 1;
    }
    tick
}

/// Bring the roster in line with what the tick changed on the grid.
fn apply_tick(state: &mut State, tick: &TickReport) {
    for casualty in &tick.removed_units {
        if let Some(owner) = state.player_mut(casualty.owner) {
            owner.units.remove(&casualty.id);
        }
    }
    for destroyed in &tick.destroyed_structures {
        if let Some(owner) = controller_of(state, destroyed.controller) {
            owner.structures.remove(&destroyed.id);
        }
    }
    for capture in &tick.captures {
        if let Some(previous) = controller_of(state, capture.from) {
            previous.structures.remove(&capture.structure);
        }
        if let Some(captor) = state.player_mut(capture.to) {
            captor.structures.insert(capture.structure);
        }
    }
    let State { players, grid, .. } = state;
    for player in players.iter_mut() {
        player.recompute_fov(grid);
    }
}

fn controller_of(state: &mut State, controller: Option<PlayerId>) -> Option<&mut crate::player::Player> {
    state.player_mut(controller?)
}

fn grant_income(state: &mut State) {
    let grants: Vec<(PlayerId, u32, u32)> = state
        .grid
        .structures()
        .filter_map(|(_, s)| s.controller.map(|c| (c, s.kind.income(), s.kind.score_yield())))
        .collect();
    for (controller, income, score) in grants {
        if let Some(player) = state.player_mut(controller) {
            player.resources += income;
            player.score += score;
        }
    }
}

fn check_completion(state: &mut State) {
    if state.is_finished() || state.grid.command_centers() > 1 {
        return;
    }
    let ranking = state.standings();
    info!(round = state.round, winner = ?ranking.first(), "match finished");
    state.ranking = Some(ranking);
}
