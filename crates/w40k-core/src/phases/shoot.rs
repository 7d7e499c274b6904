//! Shooting phase (§4.2 "shoot").

use crate::action::Action;
use crate::combat::{resolve_attack, AttackProfile};
use crate::hexgrid;
use crate::phases::{build_target_pool, ExecResult};
use crate::state::{GameState, Phase};
use crate::unit::UnitId;

pub fn phase_start(state: &mut GameState) {
    state.phase = Phase::Shoot;
    state.target_pool.clear();
    let player = state.current_player;
    for unit in state.living_units_of(player).map(|u| u.id).collect::<Vec<_>>() {
        refresh_targets(state, unit);
    }
}

fn candidate_targets(state: &GameState, unit_id: UnitId) -> Vec<UnitId> {
    let unit = state.unit(unit_id);
    state
        .living_enemies_of(unit.player)
        .filter(|enemy| {
            hexgrid::distance(unit.pos, enemy.pos) <= unit.stats.rng_rng
                && hexgrid::line_of_sight(unit.pos, enemy.pos, &state.board.walls)
                && !state.is_adjacent_to_friendly_of(unit.player, enemy.pos, unit_id)
        })
        .map(|e| e.id)
        .collect()
}

fn refresh_targets(state: &mut GameState, unit_id: UnitId) {
    let candidates = candidate_targets(state, unit_id);
    let pool = build_target_pool(state, unit_id, candidates.into_iter());
    state.target_pool.insert(unit_id, pool);
}

pub fn eligible_units(state: &GameState) -> Vec<UnitId> {
    let player = state.current_player;
    state
        .living_units_of(player)
        .filter(|u| {
            u.shoot_left > 0
                && !state.units_fled.contains(&u.id)
                && !state.is_adjacent_to_enemy(u.id)
                && state
                    .target_pool
                    .get(&u.id)
                    .map(|t| !t.is_empty())
                    .unwrap_or(false)
        })
        .map(|u| u.id)
        .collect()
}

pub fn execute_action(state: &mut GameState, action: Action) -> ExecResult {
    match action {
        Action::Shoot { unit, target } => {
            let legal = state
                .target_pool
                .get(&unit)
                .map(|t| t.contains(&target))
                .unwrap_or(false);
            if !legal {
                return ExecResult::fail("illegal shoot target");
            }
            let profile = {
                let shooter = state.unit(unit);
                AttackProfile {
                    atk: shooter.stats.rng_atk,
                    strength: shooter.stats.rng_str,
                    ap: shooter.stats.rng_ap,
                    dmg: shooter.stats.rng_dmg,
                }
            };
            let (toughness, save_target) = {
                let defender = state.unit(target);
                (defender.stats.toughness, defender.save_target(profile.ap))
            };
            let mut hp = state.unit(target).hp_cur;
            let outcome = resolve_attack(&mut state.rng, profile, toughness, save_target, &mut hp);
            state.unit_mut(target).hp_cur = hp;
            state.unit_mut(unit).shoot_left -= 1;
            state.log(
                unit,
                "shoot",
                true,
                format!("target={target} hit={} wound={} saved={} dmg={}", outcome.hit, outcome.wounded, outcome.saved, outcome.damage_dealt),
            );

            let shots_left = state.unit(unit).shoot_left;
            if shots_left <= 0 {
                state.units_shot.insert(unit);
            } else {
                refresh_targets(state, unit);
            }
            finish(state)
        }
        Action::Skip { unit } => {
            state.units_shot.insert(unit);
            state.log(unit, "skip", true, "skipped shooting");
            finish(state)
        }
        _ => ExecResult::fail("wrong action type for shooting phase"),
    }
}

fn finish(state: &mut GameState) -> ExecResult {
    super::rebuild_pool(state);
    if state.activation_pool.is_empty() {
        ExecResult::ok("shot").with_phase_complete(Phase::Charge)
    } else {
        ExecResult::ok("shot")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hexgrid::{Board, Hex};
    use crate::unit::{Unit, UnitStats};

    fn stats() -> UnitStats {
        UnitStats {
            hp_max: 2,
            move_: 6,
            toughness: 4,
            armor_save: 3,
            invul_save: None,
            rng_nb: 2,
            rng_rng: 10,
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

    fn unit(id: UnitId, player: u8, pos: Hex) -> Unit {
        Unit {
            id,
            external_id: format!("u{id}"),
            player,
            unit_type: "t".into(),
            pos,
            hp_cur: 2,
            stats: stats(),
            shoot_left: 2,
            attack_left: 1,
        }
    }

    #[test]
    fn friendly_fire_guard_masks_target_adjacent_to_ally() {
        // Ally A at (3,3), ally B at (4,3), enemy at (4,4): B's shot on the
        // enemy is masked because it's adjacent to ally A.
        let units = vec![
            unit(0, 0, Hex::new(3, 3)), // ally A
            unit(1, 0, Hex::new(4, 3)), // ally B, shooter
            unit(2, 1, Hex::new(4, 4)), // enemy
        ];
        let state = GameState::new(Board::new(10, 10), units, 1, 5);
        let candidates = candidate_targets(&state, 1);
        assert!(!candidates.contains(&2));
    }

    #[test]
    fn shooting_decrements_shoot_left_and_stays_eligible_with_shots_remaining() {
        let units = vec![unit(0, 0, Hex::new(0, 0)), unit(1, 1, Hex::new(2, 0))];
        let mut state = GameState::new(Board::new(10, 10), units, 42, 5);
        phase_start(&mut state);
        assert!(eligible_units(&state).contains(&0));
        let res = execute_action(&mut state, Action::Shoot { unit: 0, target: 1 });
        assert!(res.success);
        assert_eq!(state.unit(0).shoot_left, 1);
        assert!(!state.units_shot.contains(&0));
    }

    #[test]
    fn out_of_range_target_is_not_a_candidate() {
        let units = vec![unit(0, 0, Hex::new(0, 0)), unit(1, 1, Hex::new(9, 9))];
        let state = GameState::new(Board::new(10, 10), units, 1, 5);
        assert!(candidate_targets(&state, 0).is_empty());
    }
}
