//! Reward calculator (C8): per-agent shaped reward (§4.6).
//!
//! Scalars are keyed by agent identity, not unit type, so two agents
//! controlling the same unit type can be shaped differently.

use std::path::Path;

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{EngineError, Result};
use crate::hexgrid;
use crate::state::GameState;
use crate::unit::UnitId;

pub type AgentKey = String;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BaseActions {
    #[serde(default)]
    pub ranged_attack: f32,
    #[serde(default)]
    pub melee_attack: f32,
    #[serde(default)]
    pub move_close: f32,
    #[serde(default)]
    pub move_away: f32,
    #[serde(default)]
    pub charge: f32,
    #[serde(default)]
    pub wait: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResultBonuses {
    #[serde(default)]
    pub damage_inflicted_per_point: f32,
    #[serde(default)]
    pub kill: f32,
    #[serde(default)]
    pub no_overkill_kill: f32,
    #[serde(default)]
    pub lowest_hp_kill: f32,
    #[serde(default)]
    pub objective_gained: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TacticalBonuses {
    #[serde(default)]
    pub optimal_range_ranged: f32,
    #[serde(default)]
    pub closing_to_move_melee: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SituationalModifiers {
    #[serde(default)]
    pub win: f32,
    #[serde(default)]
    pub lose: f32,
    #[serde(default)]
    pub draw: f32,
    #[serde(default)]
    pub turn_limit_penalty: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Penalties {
    #[serde(default)]
    pub illegal_action: f32,
    #[serde(default)]
    pub redundant_skip: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentRewardProfile {
    #[serde(default)]
    pub base_actions: BaseActions,
    #[serde(default)]
    pub result_bonuses: ResultBonuses,
    #[serde(default)]
    pub tactical_bonuses: TacticalBonuses,
    #[serde(default)]
    pub situational_modifiers: SituationalModifiers,
    #[serde(default)]
    pub penalties: Penalties,
}

pub type RewardConfig = FxHashMap<AgentKey, AgentRewardProfile>;

pub fn load_reward_config_str(raw: &str, is_yaml: bool) -> Result<RewardConfig> {
    let config: RewardConfig = if is_yaml {
        serde_yaml::from_str(raw).map_err(|e| EngineError::Config(format!("rewards parse error: {e}")))?
    } else {
        serde_json::from_str(raw).map_err(|e| EngineError::Config(format!("rewards parse error: {e}")))?
    };
    Ok(config)
}

pub fn load_reward_config(path: impl AsRef<Path>) -> Result<RewardConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| EngineError::Config(format!("cannot read rewards config {path:?}: {e}")))?;
    let is_yaml = matches!(path.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml"));
    load_reward_config_str(&raw, is_yaml)
}

/// Outcome facts the façade gathers while dispatching one action, handed to
/// the reward calculator so it never has to re-derive them from logs.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub action_illegal: bool,
    pub redundant_skip: bool,
    pub damage_dealt: i32,
    pub target_killed: bool,
    pub target_overkilled: bool,
    pub target_was_lowest_hp: bool,
    pub objective_gained: bool,
    pub episode_terminated: bool,
    pub episode_won: Option<bool>,
    pub hit_turn_limit: bool,
}

fn action_base_reward(profile: &AgentRewardProfile, action: &Action, state: &GameState, unit: UnitId) -> f32 {
    match action {
        Action::Shoot { .. } => profile.base_actions.ranged_attack,
        Action::Fight { .. } => profile.base_actions.melee_attack,
        Action::ChargeRoll { .. } | Action::Charge { .. } => profile.base_actions.charge,
        Action::Move { dest, .. } => {
            let origin = state.unit(unit).pos;
            let closest_enemy_before = state
                .living_enemies_of(state.unit(unit).player)
                .map(|e| hexgrid::distance(origin, e.pos))
                .min();
            let closest_enemy_after = state
                .living_enemies_of(state.unit(unit).player)
                .map(|e| hexgrid::distance(*dest, e.pos))
                .min();
            match (closest_enemy_before, closest_enemy_after) {
                (Some(before), Some(after)) if after < before => profile.base_actions.move_close,
                (Some(before), Some(after)) if after > before => profile.base_actions.move_away,
                _ => 0.0,
            }
        }
        Action::Skip { .. } => profile.base_actions.wait,
    }
}

fn tactical_bonus(profile: &AgentRewardProfile, state: &GameState, unit: UnitId) -> f32 {
    let u = state.unit(unit);
    let nearest_enemy_dist = state.living_enemies_of(u.player).map(|e| hexgrid::distance(u.pos, e.pos)).min();
    let Some(dist) = nearest_enemy_dist else { return 0.0 };

    let is_ranged = u.stats.rng_nb > 0;
    let is_melee = u.stats.cc_nb > 0;
    let mut bonus = 0.0;
    if is_ranged {
        let optimal = u.stats.rng_rng / 2;
        if (dist - optimal).abs() <= 2 {
            bonus += profile.tactical_bonuses.optimal_range_ranged;
        }
    }
    if is_melee && dist <= u.stats.move_ {
        bonus += profile.tactical_bonuses.closing_to_move_melee;
    }
    bonus
}

/// Compute the shaped reward for one resolved action, per §4.6.
pub fn compute_reward(
    config: &RewardConfig,
    agent_key: &str,
    state: &GameState,
    unit: UnitId,
    action: &Action,
    outcome: &StepOutcome,
) -> f32 {
    let Some(profile) = config.get(agent_key) else { return 0.0 };

    if outcome.action_illegal {
        return profile.penalties.illegal_action;
    }

    let mut reward = action_base_reward(profile, action, state, unit);
    reward += profile.result_bonuses.damage_inflicted_per_point * outcome.damage_dealt as f32;
    if outcome.target_killed {
        reward += profile.result_bonuses.kill;
    }
    if outcome.target_overkilled {
        reward -= profile.result_bonuses.no_overkill_kill;
    } else if outcome.target_killed {
        reward += profile.result_bonuses.no_overkill_kill;
    }
    if outcome.target_was_lowest_hp {
        reward += profile.result_bonuses.lowest_hp_kill;
    }
    if outcome.objective_gained {
        reward += profile.result_bonuses.objective_gained;
    }

    reward += tactical_bonus(profile, state, unit);

    if outcome.redundant_skip {
        reward -= profile.penalties.redundant_skip;
    }

    if outcome.episode_terminated {
        match outcome.episode_won {
            Some(true) => reward += profile.situational_modifiers.win,
            Some(false) => reward += profile.situational_modifiers.lose,
            None => reward += profile.situational_modifiers.draw,
        }
        if outcome.hit_turn_limit {
            reward += profile.situational_modifiers.turn_limit_penalty;
        }
    }

    reward
}
