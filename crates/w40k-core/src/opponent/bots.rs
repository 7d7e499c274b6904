//! Scripted bot archetypes (Glossary: "Scripted bot"): uniform-random,
//! greedy and defensive.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::action::{decode_action, Action, ACTION_SPACE_SIZE};
use crate::combat::wound_target;
use crate::hexgrid;
use crate::state::GameState;

use super::{rng_from_seed, ScriptedBot};

fn legal_ids(mask: &[bool; ACTION_SPACE_SIZE]) -> Vec<u8> {
    (0..ACTION_SPACE_SIZE as u8).filter(|&id| mask[id as usize]).collect()
}

fn hit_prob(atk: i32) -> f32 {
    (atk as f32 / 6.0).clamp(0.0, 1.0)
}

fn unsaved_prob(save_target: i32) -> f32 {
    ((save_target - 1) as f32 / 6.0).clamp(0.0, 1.0)
}

/// Expected damage of a ranged/melee attack, used to rank candidate targets.
fn expected_damage(state: &GameState, attacker: crate::unit::UnitId, target: crate::unit::UnitId, melee: bool) -> f32 {
    let a = state.unit(attacker);
    let t = state.unit(target);
    let (atk, strength, ap, dmg) = if melee {
        (a.stats.cc_atk, a.stats.cc_str, a.stats.cc_ap, a.stats.cc_dmg)
    } else {
        (a.stats.rng_atk, a.stats.rng_str, a.stats.rng_ap, a.stats.rng_dmg)
    };
    let wound = (7 - wound_target(strength, t.stats.toughness)).max(0) as f32 / 6.0;
    hit_prob(atk) * wound * unsaved_prob(t.save_target(ap)) * dmg as f32
}

/// Picks uniformly at random among every currently legal action id.
pub struct RandomBot {
    rng: ChaCha8Rng,
}

impl RandomBot {
    pub fn new(seed: u64) -> Self {
        RandomBot { rng: rng_from_seed(seed) }
    }
}

impl ScriptedBot for RandomBot {
    fn select_action(&mut self, _state: &GameState, mask: &[bool; ACTION_SPACE_SIZE]) -> u8 {
        let ids = legal_ids(mask);
        let idx = self.rng.gen_range(0..ids.len());
        ids[idx]
    }
}

/// Maximises immediate expected value: prefers the highest-damage shot or
/// melee swing, otherwise closes distance, otherwise charges, otherwise
/// skips.
#[derive(Default)]
pub struct GreedyBot;

impl GreedyBot {
    pub fn new() -> Self {
        GreedyBot
    }
}

impl ScriptedBot for GreedyBot {
    fn select_action(&mut self, state: &GameState, mask: &[bool; ACTION_SPACE_SIZE]) -> u8 {
        let ids = legal_ids(mask);
        let mut best_id = *ids.last().unwrap_or(&11);
        let mut best_score = f32::MIN;

        for id in ids {
            let Some(action) = decode_action(state, id) else { continue };
            let score = match action {
                Action::Shoot { unit, target } => 10.0 + expected_damage(state, unit, target, false),
                Action::Fight { unit, target } => 10.0 + expected_damage(state, unit, target, true),
                Action::Move { unit, dest } => {
                    let player = state.unit(unit).player;
                    let before = state.living_enemies_of(player).map(|e| hexgrid::distance(state.unit(unit).pos, e.pos)).min();
                    let after = state.living_enemies_of(player).map(|e| hexgrid::distance(dest, e.pos)).min();
                    match (before, after) {
                        (Some(b), Some(a)) => (b - a) as f32,
                        _ => 0.0,
                    }
                }
                Action::ChargeRoll { .. } => 3.0,
                Action::Charge { .. } => 5.0,
                Action::Skip { .. } => -1.0,
            };
            if score > best_score {
                best_score = score;
                best_id = id;
            }
        }
        best_id
    }
}

/// Prioritises survival: shoots from range when it can, retreats from
/// adjacency otherwise, and declines to initiate or continue melee.
#[derive(Default)]
pub struct DefensiveBot;

impl DefensiveBot {
    pub fn new() -> Self {
        DefensiveBot
    }
}

impl ScriptedBot for DefensiveBot {
    fn select_action(&mut self, state: &GameState, mask: &[bool; ACTION_SPACE_SIZE]) -> u8 {
        let ids = legal_ids(mask);

        // Shooting: take the best available shot, same ranking as greedy.
        let shots: Vec<(u8, f32)> = ids
            .iter()
            .filter_map(|&id| match decode_action(state, id) {
                Some(Action::Shoot { unit, target }) => Some((id, expected_damage(state, unit, target, false))),
                _ => None,
            })
            .collect();
        if let Some(&(id, _)) = shots.iter().max_by(|a, b| a.1.total_cmp(&b.1)) {
            return id;
        }

        // Movement: retreat to the hex furthest from the nearest enemy.
        let moves: Vec<(u8, i32)> = ids
            .iter()
            .filter_map(|&id| match decode_action(state, id) {
                Some(Action::Move { unit, dest }) => {
                    let player = state.unit(unit).player;
                    let min_dist = state.living_enemies_of(player).map(|e| hexgrid::distance(dest, e.pos)).min().unwrap_or(0);
                    Some((id, min_dist))
                }
                _ => None,
            })
            .collect();
        if let Some(&(id, _)) = moves.iter().max_by_key(|(_, d)| *d) {
            return id;
        }

        // Never volunteers for charge or melee; falls back to skip.
        ids.into_iter().find(|&id| id == 11).unwrap_or(11)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hexgrid::{Board, Hex};
    use crate::state::{GameState, Phase};
    use crate::unit::{Unit, UnitStats};
    use std::collections::VecDeque;

    fn stats() -> UnitStats {
        UnitStats {
            hp_max: 2,
            move_: 6,
            toughness: 4,
            armor_save: 3,
            invul_save: None,
            rng_nb: 1,
            rng_rng: 24,
            rng_atk: 6,
            rng_str: 8,
            rng_ap: 3,
            rng_dmg: 2,
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

    fn unit(id: crate::unit::UnitId, player: u8, pos: Hex) -> Unit {
        Unit {
            id,
            external_id: format!("u{id}"),
            player,
            unit_type: "t".into(),
            pos,
            hp_cur: 2,
            stats: stats(),
            shoot_left: 1,
            attack_left: 1,
        }
    }

    #[test]
    fn greedy_bot_prefers_shooting_over_skip() {
        let units = vec![unit(0, 0, Hex::new(0, 0)), unit(1, 1, Hex::new(2, 0))];
        let mut state = GameState::new(Board::new(10, 10), units, 1, 5);
        state.phase = Phase::Shoot;
        state.activation_pool = VecDeque::from(vec![0]);
        let mut pool = fxhash::FxHashMap::default();
        pool.insert(0, vec![1]);
        state.target_pool = pool;
        let mask = crate::action::get_action_mask(&state);
        let mut bot = GreedyBot::new();
        let action_id = bot.select_action(&state, &mask);
        assert_eq!(action_id, 4);
    }

    #[test]
    fn random_bot_always_returns_a_legal_id() {
        let units = vec![unit(0, 0, Hex::new(0, 0))];
        let mut state = GameState::new(Board::new(10, 10), units, 1, 5);
        state.activation_pool = VecDeque::from(vec![0]);
        let mask = crate::action::get_action_mask(&state);
        let mut bot = RandomBot::new(3);
        for _ in 0..20 {
            let id = bot.select_action(&state, &mask);
            assert!(mask[id as usize]);
        }
    }

    #[test]
    fn defensive_bot_retreats_when_no_shot_available() {
        let units = vec![unit(0, 0, Hex::new(5, 5)), unit(1, 1, Hex::new(6, 5))];
        let mut state = GameState::new(Board::new(10, 10), units, 1, 5);
        state.phase = Phase::Move;
        state.activation_pool = VecDeque::from(vec![0]);
        let mut pending = fxhash::FxHashMap::default();
        pending.insert(0, vec![Hex::new(4, 5), Hex::new(3, 5)]);
        state.pending_movement_destinations = pending;
        let mask = crate::action::get_action_mask(&state);
        let mut bot = DefensiveBot::new();
        let id = bot.select_action(&state, &mask);
        let action = decode_action(&state, id).unwrap();
        assert!(matches!(action, Action::Move { dest, .. } if dest == Hex::new(3, 5)));
    }
}
