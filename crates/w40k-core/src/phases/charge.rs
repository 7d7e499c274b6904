//! Charge phase (§4.2 "charge").

use rand::Rng;

use crate::action::Action;
use crate::hexgrid::{self, Hex};
use crate::phases::ExecResult;
use crate::state::{GameState, Phase};
use crate::unit::UnitId;

const CHARGE_RANGE_BONUS: i32 = 6;

pub fn phase_start(state: &mut GameState) {
    state.phase = Phase::Charge;
    state.charge_roll_values.clear();
    state.charge_destination_pool.clear();
}

fn has_charge_target(state: &GameState, unit_id: UnitId) -> bool {
    let unit = state.unit(unit_id);
    let max_range = unit.stats.move_ + CHARGE_RANGE_BONUS;
    state
        .living_enemies_of(unit.player)
        .any(|e| hexgrid::distance(unit.pos, e.pos) <= max_range)
}

pub fn eligible_units(state: &GameState) -> Vec<UnitId> {
    let player = state.current_player;
    state
        .living_units_of(player)
        .filter(|u| {
            !state.units_charged.contains(&u.id)
                && !state.units_fled.contains(&u.id)
                && !state.is_adjacent_to_enemy(u.id)
                && has_charge_target(state, u.id)
        })
        .map(|u| u.id)
        .collect()
}

fn compute_charge_destinations(state: &GameState, unit_id: UnitId, roll: i32) -> Vec<Hex> {
    let unit = state.unit(unit_id);
    let occupied = state.occupied_hexes_excluding(unit_id);
    let reached = hexgrid::bfs_flood(unit.pos, roll, &state.board, &occupied);
    reached
        .into_iter()
        .filter(|dest| {
            state
                .living_enemies_of(unit.player)
                .any(|e| hexgrid::distance(*dest, e.pos) == 1)
        })
        .collect()
}

pub fn execute_action(state: &mut GameState, action: Action) -> ExecResult {
    match action {
        Action::ChargeRoll { unit } => {
            if state.charge_roll_values.contains_key(&unit) {
                return ExecResult::fail("charge already rolled this activation");
            }
            let roll = state.rng.gen_range(1..=6) + state.rng.gen_range(1..=6);
            state.charge_roll_values.insert(unit, roll);
            let dests = compute_charge_destinations(state, unit, roll);
            state.charge_destination_pool.insert(unit, dests);
            state.log(unit, "charge_roll", true, format!("roll={roll}"));
            finish(state)
        }
        Action::Charge { unit, dest } => {
            let valid = state
                .charge_destination_pool
                .get(&unit)
                .map(|d| d.contains(&dest))
                .unwrap_or(false);
            if !valid {
                return ExecResult::fail("illegal charge destination");
            }
            state.unit_mut(unit).pos = dest;
            state.units_charged.insert(unit);
            state.charge_order.push(unit);
            state.log(unit, "charge", true, format!("charged to {:?}", dest));
            finish(state)
        }
        Action::Skip { unit } => {
            state.units_charged.insert(unit);
            state.log(unit, "skip", true, "declined charge");
            finish(state)
        }
        _ => ExecResult::fail("wrong action type for charge phase"),
    }
}

fn finish(state: &mut GameState) -> ExecResult {
    super::rebuild_pool(state);
    if state.activation_pool.is_empty() {
        ExecResult::ok("charged").with_phase_complete(Phase::Fight)
    } else {
        ExecResult::ok("charged")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hexgrid::Board;
    use crate::unit::{Unit, UnitStats};

    fn stats(move_: i32) -> UnitStats {
        UnitStats {
            hp_max: 2,
            move_,
            toughness: 4,
            armor_save: 3,
            invul_save: None,
            rng_nb: 1,
            rng_rng: 24,
            rng_atk: 3,
            rng_str: 4,
            rng_ap: 1,
            rng_dmg: 1,
            cc_nb: 1,
            cc_rng: 1,
            cc_atk: 3,
            cc_str: 4,
            cc_ap: 0,
            cc_dmg: 1,
            oc: 1,
            ld: 7,
            value: 10,
        }
    }

    fn unit(id: UnitId, player: u8, pos: Hex, move_: i32) -> Unit {
        Unit {
            id,
            external_id: format!("u{id}"),
            player,
            unit_type: "t".into(),
            pos,
            hp_cur: 2,
            stats: stats(move_),
            shoot_left: 1,
            attack_left: 1,
        }
    }

    #[test]
    fn charge_success_scenario() {
        // Unit at (0,0) MOVE=6, enemy at (3,0), roll=5.
        let units = vec![unit(0, 0, Hex::new(0, 0), 6), unit(1, 1, Hex::new(3, 0), 6)];
        let state = GameState::new(Board::new(10, 10), units, 1, 5);
        let dests = compute_charge_destinations(&state, 0, 5);
        assert!(dests.contains(&Hex::new(2, 0)));
        assert!(!dests.contains(&Hex::new(3, 0)));
    }

    #[test]
    fn eligible_requires_target_within_move_plus_six() {
        let units = vec![unit(0, 0, Hex::new(0, 0), 2), unit(1, 1, Hex::new(50, 0), 2)];
        let state = GameState::new(Board::new(60, 10), units, 1, 5);
        assert!(eligible_units(&state).is_empty());
    }

    #[test]
    fn skip_marks_charged_without_rolling() {
        let units = vec![unit(0, 0, Hex::new(0, 0), 6), unit(1, 1, Hex::new(3, 0), 6)];
        let mut state = GameState::new(Board::new(10, 10), units, 1, 5);
        phase_start(&mut state);
        super::super::rebuild_pool(&mut state);
        let res = execute_action(&mut state, Action::Skip { unit: 0 });
        assert!(res.success);
        assert!(state.units_charged.contains(&0));
    }
}
