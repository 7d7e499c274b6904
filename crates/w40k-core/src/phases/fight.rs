//! Fight phase (§4.2 "fight"): charging units first, then both players
//! alternate over remaining engaged units, starting with `current_player`.

use crate::action::Action;
use crate::combat::{resolve_attack, AttackProfile};
use crate::hexgrid;
use crate::phases::{build_target_pool, ExecResult};
use crate::state::{FightSubphase, GameState, Phase};
use crate::unit::UnitId;

pub fn phase_start(state: &mut GameState) {
    state.phase = Phase::Fight;
    state.fight_subphase = Some(FightSubphase::ChargingUnits);
    state.target_pool.clear();
}

fn engaged_eligible(state: &GameState, id: UnitId) -> bool {
    let unit = state.unit(id);
    unit.alive()
        && !state.units_attacked.contains(&id)
        && unit.attack_left > 0
        && state.is_adjacent_to_enemy(id)
}

fn side_pool(state: &GameState, player: u8) -> Vec<UnitId> {
    state
        .living_units_of(player)
        .filter(|u| engaged_eligible(state, u.id))
        .map(|u| u.id)
        .collect()
}

pub fn eligible_units(state: &GameState) -> Vec<UnitId> {
    match state.fight_subphase.unwrap_or(FightSubphase::ChargingUnits) {
        FightSubphase::ChargingUnits => state
            .charge_order
            .iter()
            .copied()
            .filter(|id| engaged_eligible(state, *id))
            .collect(),
        FightSubphase::AlternatingActive => side_pool(state, state.current_player),
        FightSubphase::AlternatingNonActive => side_pool(state, 1 - state.current_player),
        FightSubphase::Cleanup => Vec::new(),
    }
}

fn melee_candidates(state: &GameState, unit_id: UnitId) -> Vec<UnitId> {
    let unit = state.unit(unit_id);
    state
        .living_enemies_of(unit.player)
        .filter(|e| hexgrid::distance(unit.pos, e.pos) == 1)
        .map(|e| e.id)
        .collect()
}

fn refresh_targets(state: &mut GameState, unit_id: UnitId) {
    let candidates = melee_candidates(state, unit_id);
    let pool = build_target_pool(state, unit_id, candidates.into_iter());
    state.target_pool.insert(unit_id, pool);
}

pub fn execute_action(state: &mut GameState, action: Action) -> ExecResult {
    match action {
        Action::Fight { unit, target } => {
            if state.target_pool.get(&unit).is_none() {
                refresh_targets(state, unit);
            }
            let legal = state
                .target_pool
                .get(&unit)
                .map(|t| t.contains(&target))
                .unwrap_or(false);
            if !legal {
                return ExecResult::fail("illegal fight target");
            }
            let profile = {
                let attacker = state.unit(unit);
                AttackProfile {
                    atk: attacker.stats.cc_atk,
                    strength: attacker.stats.cc_str,
                    ap: attacker.stats.cc_ap,
                    dmg: attacker.stats.cc_dmg,
                }
            };
            let (toughness, save_target) = {
                let defender = state.unit(target);
                (defender.stats.toughness, defender.save_target(profile.ap))
            };
            let mut hp = state.unit(target).hp_cur;
            let outcome = resolve_attack(&mut state.rng, profile, toughness, save_target, &mut hp);
            state.unit_mut(target).hp_cur = hp;
            state.unit_mut(unit).attack_left -= 1;
            state.log(
                unit,
                "fight",
                true,
                format!("target={target} hit={} wound={} saved={} dmg={}", outcome.hit, outcome.wounded, outcome.saved, outcome.damage_dealt),
            );

            if state.unit(unit).attack_left <= 0 {
                state.units_attacked.insert(unit);
            } else {
                refresh_targets(state, unit);
            }
            finish(state)
        }
        Action::Skip { unit } => {
            state.units_attacked.insert(unit);
            state.log(unit, "skip", true, "declined fight");
            finish(state)
        }
        _ => ExecResult::fail("wrong action type for fight phase"),
    }
}

/// Advance the sub-phase machine: recompute the current sub-phase's pool;
/// if empty, move on (a side with no eligible unit forfeits its slot),
/// finally reaching `Cleanup`, which signals the fight phase (and this
/// player's activation segment) is complete.
fn finish(state: &mut GameState) -> ExecResult {
    if cascade_subphases(state) {
        ExecResult::ok("fought").with_phase_complete(Phase::Move)
    } else {
        ExecResult::ok("fought")
    }
}

/// Same sub-phase advance as `finish`, usable before any action has been
/// taken (e.g. right after `phase_start`, when the first sub-phase already
/// has nothing eligible). Returns `true` once `Cleanup` is reached.
pub(crate) fn cascade_subphases(state: &mut GameState) -> bool {
    loop {
        let pool = eligible_units(state);
        if !pool.is_empty() {
            state.activation_pool = pool.into_iter().collect();
            return false;
        }
        match state.fight_subphase {
            Some(FightSubphase::ChargingUnits) => {
                state.fight_subphase = Some(FightSubphase::AlternatingActive);
            }
            Some(FightSubphase::AlternatingActive) => {
                state.fight_subphase = Some(FightSubphase::AlternatingNonActive);
            }
            Some(FightSubphase::AlternatingNonActive) => {
                state.fight_subphase = Some(FightSubphase::Cleanup);
            }
            Some(FightSubphase::Cleanup) | None => {
                state.activation_pool.clear();
                return true;
            }
        }
    }
}
