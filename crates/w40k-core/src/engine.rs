//! Engine façade (C9): the Gym-style `reset`/`step` loop (§4.7).

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::action::{decode_action, get_action_mask, Action, ACTION_SPACE_SIZE};
use crate::error::Result;
use crate::observation::{self, OBS_SIZE};
use crate::phases;
use crate::registry::UnitRegistry;
use crate::reward::{self, RewardConfig, StepOutcome};
use crate::scenario::{self, Scenario};
use crate::state::{GameState, Phase};
use crate::unit::UnitId;

#[derive(Debug, Clone, Serialize, Default)]
pub struct TacticalData {
    pub shots_fired: u32,
    pub hits: u32,
    pub damage_dealt: i32,
    pub kills: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepInfo {
    pub winner: Option<i8>,
    pub phase: Phase,
    pub turn: u32,
    pub success: bool,
    pub error: Option<String>,
    pub tactical_data: TacticalData,
    pub action_logs: Vec<crate::state::ActionLogEntry>,
    pub compliance_data: crate::state::ComplianceReport,
}

/// Agent-facing environment: one `GameState`, one rewards configuration,
/// one `UnitRegistry`. Owns the only mutable path into `GameState`
/// (Invariant 1) — nothing else clones or writes back a copy of it.
pub struct Engine {
    pub state: GameState,
    registry: UnitRegistry,
    scenario: Scenario,
    rewards: RewardConfig,
    tactical: TacticalData,
    opponent_safety_counter_limit: u32,
}

impl Engine {
    pub fn new(scenario: Scenario, registry: UnitRegistry, rewards: RewardConfig, seed: u64, max_turns: u32) -> Result<Self> {
        let board = scenario::build_board(&scenario);
        let units = scenario::build_units(&scenario, &registry)?;
        let mut state = GameState::new(board, units, seed, max_turns);
        start_phase_with_cascade(&mut state);
        Ok(Engine {
            state,
            registry,
            scenario,
            rewards,
            tactical: TacticalData::default(),
            opponent_safety_counter_limit: 500,
        })
    }

    /// Reseed the PRNG, reload units from the original scenario, clear all
    /// tracking sets and pools, and start the movement phase fresh.
    pub fn reset(&mut self, seed: u64) -> Result<(Vec<f32>, StepInfo)> {
        let board = scenario::build_board(&self.scenario);
        let units = scenario::build_units(&self.scenario, &self.registry)?;
        let max_turns = self.state.max_turns;
        self.state = GameState::new(board, units, seed, max_turns);
        self.tactical = TacticalData::default();
        start_phase_with_cascade(&mut self.state);
        info!(seed, "environment reset");
        let obs = observation::build_observation(&self.state);
        let info = self.build_info(true, None);
        Ok((obs, info))
    }

    pub fn action_mask(&self) -> [bool; ACTION_SPACE_SIZE] {
        get_action_mask(&self.state)
    }

    /// Iteration cap for the opponent wrapper's "drive until control
    /// returns" loop (§4.8).
    pub fn opponent_safety_counter_limit(&self) -> u32 {
        self.opponent_safety_counter_limit
    }

    /// One external step. See §4.7 for the six-step contract this follows.
    pub fn step(&mut self, agent_key: &str, action_id: u8) -> (Vec<f32>, f32, bool, bool, StepInfo) {
        if self.state.turn > self.state.max_turns {
            self.state.game_over = true;
            let obs = observation::build_observation(&self.state);
            let info = self.build_info(true, None);
            return (obs, 0.0, true, false, info);
        }

        let decoded = decode_action(&self.state, action_id);
        let Some(action) = decoded else {
            let obs = observation::build_observation(&self.state);
            let outcome = StepOutcome {
                action_illegal: true,
                ..Default::default()
            };
            let active = self.state.activation_pool.front().copied().unwrap_or(0);
            let penalty = reward::compute_reward(&self.rewards, agent_key, &self.state, active, &Action::Skip { unit: active }, &outcome);
            let info = self.build_info(false, Some("forbidden_in_phase".to_string()));
            return (obs, penalty, false, false, info);
        };

        let unit = action.unit();
        let pre_target_hp = target_of(&action).map(|t| self.state.unit(t).hp_cur);
        let lowest_hp_before = self.lowest_hp_enemy(unit);
        let other_actions_were_legal = {
            let mask = self.action_mask();
            mask[..ACTION_SPACE_SIZE - 1].iter().any(|&legal| legal)
        };

        let result = phases::execute_action(&mut self.state, action);

        if !result.success {
            let obs = observation::build_observation(&self.state);
            let outcome = StepOutcome {
                action_illegal: true,
                ..Default::default()
            };
            let penalty = reward::compute_reward(&self.rewards, agent_key, &self.state, unit, &action, &outcome);
            let info = self.build_info(false, Some(result.detail.clone()));
            return (obs, penalty, false, false, info);
        }

        self.state.episode_steps += 1;
        self.update_tactical(&action, unit, pre_target_hp);

        let damage_dealt = match (pre_target_hp, target_of(&action)) {
            (Some(before), Some(t)) => (before - self.state.unit(t).hp_cur).max(0),
            _ => 0,
        };
        let mut outcome = StepOutcome {
            damage_dealt,
            target_killed: self.target_killed(&action),
            target_was_lowest_hp: lowest_hp_before.map(|low| Some(low) == target_of(&action)).unwrap_or(false),
            ..Default::default()
        };
        outcome.target_overkilled = outcome.target_killed && damage_dealt > self.target_max_hp(&action);
        outcome.redundant_skip = matches!(action, Action::Skip { .. }) && other_actions_were_legal;

        if result.phase_complete {
            self.advance_phase(result.next_phase.expect("phase_complete implies next_phase"));
        }

        self.recompute_game_over();
        outcome.episode_terminated = self.state.game_over;
        outcome.episode_won = self.state.winner.map(|w| w == 0);
        outcome.hit_turn_limit = self.state.turn > self.state.max_turns;

        let reward_value = reward::compute_reward(&self.rewards, agent_key, &self.state, unit, &action, &outcome);
        let obs = observation::build_observation(&self.state);
        let info = self.build_info(true, None);
        debug!(unit, ?action, reward = reward_value, "step resolved");
        (obs, reward_value, self.state.game_over, false, info)
    }

    /// Advance phase/player/turn bookkeeping after a phase handler signals
    /// completion. Only the Fight->Move transition implies a player (or
    /// turn) handoff; the other three are a straight phase-to-phase move.
    fn advance_phase(&mut self, next: Phase) {
        if self.state.phase == Phase::Fight && next == Phase::Move {
            apply_fight_to_move_handoff(&mut self.state);
        } else {
            self.state.phase = next;
        }
        start_phase_with_cascade(&mut self.state);
    }

    fn recompute_game_over(&mut self) {
        let p0_alive = self.state.living_units_of(0).count();
        let p1_alive = self.state.living_units_of(1).count();
        if p0_alive == 0 && p1_alive == 0 {
            self.state.game_over = true;
            self.state.winner = None;
        } else if p0_alive == 0 {
            self.state.game_over = true;
            self.state.winner = Some(1);
        } else if p1_alive == 0 {
            self.state.game_over = true;
            self.state.winner = Some(0);
        } else if self.state.turn > self.state.max_turns {
            self.state.game_over = true;
            self.state.winner = self.score_by_objectives();
        }
        if self.state.game_over {
            if let Err(e) = self.state.check_invariants() {
                warn!(error = %e, "invariant violation detected at episode end");
            }
        }
    }

    /// Objective-based tiebreak at full-turn end (Open Question decision,
    /// §13): the side controlling more objective hexes wins; equal control
    /// or no objectives is a draw.
    fn score_by_objectives(&self) -> Option<i8> {
        if self.state.board.objectives.is_empty() {
            return None;
        }
        let p0 = self
            .state
            .board
            .objectives
            .iter()
            .filter(|o| self.state.living_units_of(0).any(|u| u.pos == **o))
            .count();
        let p1 = self
            .state
            .board
            .objectives
            .iter()
            .filter(|o| self.state.living_units_of(1).any(|u| u.pos == **o))
            .count();
        match p0.cmp(&p1) {
            std::cmp::Ordering::Greater => Some(0),
            std::cmp::Ordering::Less => Some(1),
            std::cmp::Ordering::Equal => None,
        }
    }

    fn lowest_hp_enemy(&self, unit: UnitId) -> Option<UnitId> {
        let player = self.state.units.get(unit)?.player;
        self.state
            .living_enemies_of(player)
            .min_by_key(|e| e.hp_cur)
            .map(|e| e.id)
    }

    fn target_max_hp(&self, action: &Action) -> i32 {
        target_of(action).map(|t| self.state.unit(t).stats.hp_max).unwrap_or(0)
    }

    fn target_killed(&self, action: &Action) -> bool {
        target_of(action).map(|t| !self.state.unit(t).alive()).unwrap_or(false)
    }

    fn update_tactical(&mut self, action: &Action, _unit: UnitId, pre_target_hp: Option<i32>) {
        if let Action::Shoot { .. } = action {
            self.tactical.shots_fired += 1;
        }
        if let (true, Some(target), Some(before)) = (
            matches!(action, Action::Shoot { .. } | Action::Fight { .. }),
            target_of(action),
            pre_target_hp,
        ) {
            let post_hp = self.state.unit(target).hp_cur;
            let dealt = (before - post_hp).max(0);
            if dealt > 0 {
                self.tactical.hits += 1;
                self.tactical.damage_dealt += dealt;
            }
            if !self.state.unit(target).alive() {
                self.tactical.kills += 1;
            }
        }
    }

    fn build_info(&self, success: bool, error: Option<String>) -> StepInfo {
        StepInfo {
            winner: self.state.winner,
            phase: self.state.phase,
            turn: self.state.turn,
            success,
            error,
            tactical_data: self.tactical.clone(),
            action_logs: self.state.action_logs.clone(),
            compliance_data: self.state.compliance_report(),
        }
    }
}

fn target_of(action: &Action) -> Option<UnitId> {
    match action {
        Action::Shoot { target, .. } | Action::Fight { target, .. } => Some(*target),
        _ => None,
    }
}

/// Player swap, or on wraparound to player 0 a full turn increment plus
/// clearing every per-turn tracking set (§4.2).
fn apply_fight_to_move_handoff(state: &mut GameState) {
    if state.current_player == 0 {
        state.current_player = 1;
    } else {
        state.current_player = 0;
        state.turn += 1;
        state.units_moved.clear();
        state.units_fled.clear();
        state.units_shot.clear();
        state.units_charged.clear();
        state.units_attacked.clear();
        state.charge_order.clear();
    }
    state.phase = Phase::Move;
}

/// Cascading phase start, recovering from the pathological case where even
/// the post-handoff Move phase comes up empty (both sides out of living
/// units at once) by forcing one more handoff rather than looping forever.
/// `recompute_game_over` ends the episode immediately afterwards in that
/// case.
fn start_phase_with_cascade(state: &mut GameState) {
    if phases::phase_start_cascading(state) {
        apply_fight_to_move_handoff(state);
        phases::phase_start_cascading(state);
    }
}

pub const _OBS_SIZE_CHECK: usize = OBS_SIZE;

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"
    {
        "INTERCESSOR": {
            "hp_max": 2, "MOVE": 6, "T": 4, "armor_save": 3, "invul_save": null,
            "rng_nb": 2, "rng_rng": 24, "rng_atk": 6, "rng_str": 8, "rng_ap": 3, "rng_dmg": 2,
            "cc_nb": 3, "cc_rng": 1, "cc_atk": 3, "cc_str": 4, "cc_ap": 0, "cc_dmg": 1,
            "OC": 2, "LD": 7, "value": 20
        }
    }
    "#;

    const SCENARIO: &str = r#"
    {
        "units": [
            {"id": "P0_A", "unit_type": "INTERCESSOR", "player": 0, "col": 1, "row": 1},
            {"id": "P1_A", "unit_type": "INTERCESSOR", "player": 1, "col": 8, "row": 8}
        ]
    }
    "#;

    fn build_engine() -> Engine {
        let registry = crate::registry::load_registry_str(REGISTRY).unwrap();
        let scenario = scenario::load_scenario_str(SCENARIO).unwrap();
        let rewards: RewardConfig = RewardConfig::default();
        Engine::new(scenario, registry, rewards, 7, 5).unwrap()
    }

    #[test]
    fn reset_starts_in_move_phase_with_fresh_steps() {
        let mut engine = build_engine();
        let (obs, _info) = engine.reset(42).unwrap();
        assert_eq!(obs.len(), OBS_SIZE);
        assert_eq!(engine.state.phase, Phase::Move);
        assert_eq!(engine.state.episode_steps, 0);
    }

    #[test]
    fn masked_action_does_not_increment_episode_steps() {
        let mut engine = build_engine();
        let before = engine.state.episode_steps;
        let (_obs, _r, _term, _trunc, info) = engine.step("agent_0", 10); // reserved id, always illegal
        assert!(!info.success);
        assert_eq!(engine.state.episode_steps, before);
    }

    #[test]
    fn skip_advances_episode_steps_and_logs() {
        let mut engine = build_engine();
        let (_obs, _r, _term, _trunc, info) = engine.step("agent_0", 11);
        assert!(info.success);
        assert_eq!(engine.state.episode_steps, 1);
        assert_eq!(engine.state.action_logs.len(), 1);
    }
}
