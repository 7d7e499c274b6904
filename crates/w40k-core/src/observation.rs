//! Observation builder (C7): encodes `GameState` into a fixed-size,
//! `[0,1]`-normalised float vector (§4.5).

use crate::hexgrid::{self, Hex};
use crate::state::{GameState, Phase};
use crate::unit::{Unit, UnitId};

const GLOBAL_CTX_LEN: usize = 15;
const ACTIVE_UNIT_LEN: usize = 8;
const TERRAIN_LEN: usize = 32;
const ALLY_SLOTS: usize = 6;
const ALLY_LEN: usize = 12;
const ENEMY_SLOTS: usize = 6;
const ENEMY_LEN: usize = 23;
const TARGET_SLOTS: usize = 5;
const TARGET_LEN: usize = 7;

pub const OBS_SIZE: usize = GLOBAL_CTX_LEN
    + ACTIVE_UNIT_LEN
    + TERRAIN_LEN
    + ALLY_SLOTS * ALLY_LEN
    + ENEMY_SLOTS * ENEMY_LEN
    + TARGET_SLOTS * TARGET_LEN;

fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

fn norm(value: i32, scale: f32) -> f32 {
    clamp01(value as f32 / scale)
}

/// Build the full observation vector for the unit currently at the head of
/// the activation pool. Returns all zeros (a valid, if uninformative,
/// observation) when no unit is active — e.g. a freshly-reset empty pool.
pub fn build_observation(state: &GameState) -> Vec<f32> {
    let mut obs = Vec::with_capacity(OBS_SIZE);
    obs.extend(global_context(state));

    let active = state.activation_pool.front().copied();
    obs.extend(active_unit_features(state, active));
    obs.extend(directional_terrain(state, active));
    obs.extend(ally_slots(state, active));
    obs.extend(enemy_slots(state, active));
    obs.extend(valid_target_slots(state, active));

    debug_assert_eq!(obs.len(), OBS_SIZE);
    obs
}

fn global_context(state: &GameState) -> Vec<f32> {
    let mut v = vec![0.0f32; GLOBAL_CTX_LEN];
    let phase_idx = match state.phase {
        Phase::Move => 0,
        Phase::Shoot => 1,
        Phase::Charge => 2,
        Phase::Fight => 3,
    };
    v[phase_idx] = 1.0;
    v[4] = state.current_player as f32;
    v[5] = norm(state.turn as i32, state.max_turns.max(1) as f32);
    v[6] = norm(state.episode_steps as i32, (state.max_turns.max(1) * 40) as f32);
    v[7] = norm(state.living_units_of(state.current_player).count() as i32, 20.0);
    v[8] = norm(state.living_enemies_of(state.current_player).count() as i32, 20.0);

    for (slot, objective) in state.board.objectives.iter().take(6).enumerate() {
        let controlled = state
            .living_units_of(state.current_player)
            .any(|u| u.pos == *objective);
        v[9 + slot] = if controlled { 1.0 } else { 0.0 };
    }
    v
}

fn active_unit_features(state: &GameState, active: Option<UnitId>) -> Vec<f32> {
    let mut v = vec![0.0f32; ACTIVE_UNIT_LEN];
    let Some(id) = active else { return v };
    let u = state.unit(id);
    v[0] = clamp01(u.hp_cur as f32 / u.stats.hp_max.max(1) as f32);
    v[1] = norm(u.stats.move_, 12.0);
    v[2] = norm(u.stats.rng_rng, 24.0);
    v[3] = norm(u.stats.rng_dmg, 6.0);
    v[4] = norm(u.stats.cc_dmg, 6.0);
    v[5] = norm(u.shoot_left, u.stats.rng_nb.max(1) as f32);
    v[6] = norm(u.attack_left, u.stats.cc_nb.max(1) as f32);
    v[7] = if state.is_adjacent_to_enemy(id) { 1.0 } else { 0.0 };
    v
}

/// Openness (1.0 open, 0.0 wall/out-of-bounds) sampled at ring distances
/// 1..=5 in each of the six cube directions; the final two slots pad to 32.
fn directional_terrain(state: &GameState, active: Option<UnitId>) -> Vec<f32> {
    let mut v = vec![0.0f32; TERRAIN_LEN];
    let Some(id) = active else { return v };
    let origin = state.unit(id).pos;
    let mut idx = 0;
    for dir_hex in hexgrid::neighbours(origin, &state.board) {
        let (dcol, drow) = (dir_hex.col - origin.col, dir_hex.row - origin.row);
        for ring in 1..=5 {
            if idx >= 30 {
                break;
            }
            let sample = Hex::new(origin.col + dcol * ring, origin.row + drow * ring);
            let open = state.board.in_bounds(sample) && !state.board.is_wall(sample);
            v[idx] = if open { 1.0 } else { 0.0 };
            idx += 1;
        }
    }
    v
}

fn ally_slots(state: &GameState, active: Option<UnitId>) -> Vec<f32> {
    let mut v = vec![0.0f32; ALLY_SLOTS * ALLY_LEN];
    let Some(id) = active else { return v };
    let origin = state.unit(id).pos;
    let player = state.unit(id).player;
    let allies: Vec<&Unit> = state.living_units_of(player).filter(|u| u.id != id).collect();
    for (slot, ally) in allies.into_iter().take(ALLY_SLOTS).enumerate() {
        let base = slot * ALLY_LEN;
        v[base] = norm(ally.pos.col, state.board.cols.max(1) as f32);
        v[base + 1] = norm(ally.pos.row, state.board.rows.max(1) as f32);
        v[base + 2] = norm(hexgrid::distance(origin, ally.pos), 20.0);
        v[base + 3] = clamp01(ally.hp_cur as f32 / ally.stats.hp_max.max(1) as f32);
        v[base + 4] = norm(ally.stats.move_, 12.0);
        v[base + 5] = norm(ally.stats.rng_dmg, 6.0);
        v[base + 6] = norm(ally.stats.cc_dmg, 6.0);
        v[base + 7] = norm(ally.stats.oc, 4.0);
        v[base + 8] = norm(ally.shoot_left, ally.stats.rng_nb.max(1) as f32);
        v[base + 9] = norm(ally.attack_left, ally.stats.cc_nb.max(1) as f32);
        v[base + 10] = if state.units_moved.contains(&ally.id) { 1.0 } else { 0.0 };
        v[base + 11] = if state.units_fled.contains(&ally.id) { 1.0 } else { 0.0 };
    }
    v
}

fn hit_prob(atk: i32) -> f32 {
    clamp01(atk as f32 / 6.0)
}

fn wound_prob(strength: i32, toughness: i32) -> f32 {
    let target = crate::combat::wound_target(strength, toughness);
    clamp01((7 - target) as f32 / 6.0)
}

fn unsaved_prob(save_target: i32) -> f32 {
    clamp01((save_target - 1) as f32 / 6.0)
}

fn enemy_slots(state: &GameState, active: Option<UnitId>) -> Vec<f32> {
    let mut v = vec![0.0f32; ENEMY_SLOTS * ENEMY_LEN];
    let Some(id) = active else { return v };
    let actor = state.unit(id);
    let origin = actor.pos;
    let mut enemies: Vec<&Unit> = state.living_enemies_of(actor.player).collect();
    enemies.sort_by_key(|e| (hexgrid::distance(origin, e.pos), e.id));
    for (slot, enemy) in enemies.into_iter().take(ENEMY_SLOTS).enumerate() {
        let base = slot * ENEMY_LEN;
        let dist = hexgrid::distance(origin, enemy.pos);
        v[base] = norm(enemy.pos.col, state.board.cols.max(1) as f32);
        v[base + 1] = norm(enemy.pos.row, state.board.rows.max(1) as f32);
        v[base + 2] = norm(dist, 20.0);
        v[base + 3] = clamp01(enemy.hp_cur as f32 / enemy.stats.hp_max.max(1) as f32);
        v[base + 4] = norm(enemy.stats.move_, 12.0);
        v[base + 5] = norm(enemy.stats.rng_dmg, 6.0);
        v[base + 6] = norm(enemy.stats.rng_atk, 6.0);
        v[base + 7] = norm(enemy.stats.rng_ap, 4.0);
        v[base + 8] = norm(enemy.stats.cc_dmg, 6.0);
        v[base + 9] = norm(enemy.stats.cc_atk, 6.0);
        v[base + 10] = norm(enemy.stats.cc_ap, 4.0);
        v[base + 11] = norm(enemy.stats.toughness, 12.0);
        v[base + 12] = norm(enemy.stats.armor_save, 6.0);
        let our_range_ok = dist <= actor.stats.rng_rng;
        v[base + 13] = if our_range_ok { 1.0 } else { 0.0 };
        v[base + 14] = if hexgrid::line_of_sight(origin, enemy.pos, &state.board.walls) { 1.0 } else { 0.0 };
        v[base + 15] = if dist <= enemy.stats.rng_rng { 1.0 } else { 0.0 };
        let our_expected = hit_prob(actor.stats.rng_atk)
            * wound_prob(actor.stats.rng_str, enemy.stats.toughness)
            * unsaved_prob(enemy.save_target(actor.stats.rng_ap))
            * actor.stats.rng_dmg as f32;
        v[base + 16] = clamp01(our_expected / enemy.stats.hp_max.max(1) as f32);
        let their_expected = hit_prob(enemy.stats.rng_atk)
            * wound_prob(enemy.stats.rng_str, actor.stats.toughness)
            * unsaved_prob(actor.save_target(enemy.stats.rng_ap))
            * enemy.stats.rng_dmg as f32;
        v[base + 17] = clamp01(their_expected / actor.stats.hp_max.max(1) as f32);
        v[base + 18] = if dist == 1 { 1.0 } else { 0.0 };
        v[base + 19] = if state.units_fled.contains(&enemy.id) { 1.0 } else { 0.0 };
        v[base + 20] = if state.units_charged.contains(&enemy.id) { 1.0 } else { 0.0 };
        v[base + 21] = if state.units_attacked.contains(&enemy.id) { 1.0 } else { 0.0 };
        v[base + 22] = norm(enemy.stats.value, 20.0);
    }
    v
}

fn valid_target_slots(state: &GameState, active: Option<UnitId>) -> Vec<f32> {
    let mut v = vec![0.0f32; TARGET_SLOTS * TARGET_LEN];
    let Some(id) = active else { return v };
    let actor = state.unit(id);
    let origin = actor.pos;
    let Some(pool) = state.target_pool.get(&id) else { return v };

    let (atk, strength, ap, dmg) = match state.phase {
        Phase::Fight => (actor.stats.cc_atk, actor.stats.cc_str, actor.stats.cc_ap, actor.stats.cc_dmg),
        _ => (actor.stats.rng_atk, actor.stats.rng_str, actor.stats.rng_ap, actor.stats.rng_dmg),
    };

    for (slot, target_id) in pool.iter().take(TARGET_SLOTS).enumerate() {
        let target = state.unit(*target_id);
        let base = slot * TARGET_LEN;
        let dist = hexgrid::distance(origin, target.pos);
        let save_target = target.save_target(ap);
        let kill_prob = hit_prob(atk) * wound_prob(strength, target.stats.toughness) * unsaved_prob(save_target);
        let expected_dmg = kill_prob * dmg as f32;
        let their_expected = hit_prob(target.stats.rng_atk)
            * wound_prob(target.stats.rng_str, actor.stats.toughness)
            * unsaved_prob(actor.save_target(target.stats.rng_ap))
            * target.stats.rng_dmg as f32;

        v[base] = 1.0;
        v[base + 1] = clamp01(kill_prob);
        v[base + 2] = clamp01(their_expected / actor.stats.hp_max.max(1) as f32);
        v[base + 3] = norm(target.stats.value, 20.0);
        v[base + 4] = norm(dist, 20.0);
        v[base + 5] = clamp01(target.hp_cur as f32 / target.stats.hp_max.max(1) as f32);
        v[base + 6] = clamp01(expected_dmg / target.stats.hp_max.max(1) as f32);
    }
    v
}
