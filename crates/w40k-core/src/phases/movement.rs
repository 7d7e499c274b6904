//! Movement phase (§4.2 "move").

use crate::action::Action;
use crate::hexgrid;
use crate::phases::ExecResult;
use crate::state::{GameState, Phase};
use crate::unit::UnitId;

pub fn phase_start(state: &mut GameState) {
    state.phase = Phase::Move;
    state.pending_movement_destinations.clear();
    for unit in state.living_units_of(state.current_player).map(|u| u.id).collect::<Vec<_>>() {
        let dests = compute_destinations(state, unit);
        state.pending_movement_destinations.insert(unit, dests);
    }
}

fn compute_destinations(state: &GameState, unit_id: UnitId) -> Vec<hexgrid::Hex> {
    let unit = state.unit(unit_id);
    let budget = unit.stats.move_;
    let occupied = state.occupied_hexes_excluding(unit_id);
    let reached = hexgrid::bfs_flood(unit.pos, budget, &state.board, &occupied);

    let fleeing_start = state.is_adjacent_to_enemy(unit_id);
    if fleeing_start {
        return reached;
    }

    reached
        .into_iter()
        .filter(|dest| {
            !state
                .living_enemies_of(unit.player)
                .any(|e| hexgrid::distance(*dest, e.pos) == 1)
        })
        .collect()
}

pub fn eligible_units(state: &GameState) -> Vec<UnitId> {
    state
        .living_units_of(state.current_player)
        .filter(|u| !state.units_moved.contains(&u.id))
        .map(|u| u.id)
        .collect()
}

pub fn execute_action(state: &mut GameState, action: Action) -> ExecResult {
    match action {
        Action::Move { unit, dest } => {
            let valid = state
                .pending_movement_destinations
                .get(&unit)
                .map(|d| d.contains(&dest))
                .unwrap_or(false);
            if !valid {
                return ExecResult::fail("illegal destination");
            }
            let was_adjacent_to_enemy = state.is_adjacent_to_enemy(unit);
            state.unit_mut(unit).pos = dest;
            state.units_moved.insert(unit);
            if was_adjacent_to_enemy {
                state.units_fled.insert(unit);
            }
            state.log(unit, "move", true, format!("moved to {:?}", dest));
            finish(state, unit)
        }
        Action::Skip { unit } => {
            state.units_moved.insert(unit);
            state.log(unit, "skip", true, "skipped movement");
            finish(state, unit)
        }
        _ => ExecResult::fail("wrong action type for movement phase"),
    }
}

fn finish(state: &mut GameState, _unit: UnitId) -> ExecResult {
    super::rebuild_pool(state);
    if state.activation_pool.is_empty() {
        ExecResult::ok("moved").with_phase_complete(Phase::Shoot)
    } else {
        ExecResult::ok("moved")
    }
}
