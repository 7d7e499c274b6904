//! Opponent wrappers (C10): bot-controlled and frozen-self-play envelopes
//! around the façade (§4.8). Both wrappers preserve the single-`GameState`
//! invariant — they only drive additional `step` calls, never copy it.

mod bots;

pub use bots::{DefensiveBot, GreedyBot, RandomBot};

use rand_chacha::ChaCha8Rng;

use crate::action::ACTION_SPACE_SIZE;
use crate::engine::{Engine, StepInfo};
use crate::error::{EngineError, Result};
use crate::state::GameState;

/// External decision module returning a legal discrete action id given the
/// current state and action mask (Glossary: "Scripted bot").
pub trait ScriptedBot {
    fn select_action(&mut self, state: &GameState, mask: &[bool; ACTION_SPACE_SIZE]) -> u8;
}

/// A frozen snapshot of a learning policy, queried with the
/// masked-prediction interface so it can never emit an illegal action.
pub trait FrozenPolicy {
    fn masked_predict(&self, obs: &[f32], mask: &[bool; ACTION_SPACE_SIZE]) -> u8;
}

#[derive(Debug, Clone, Default)]
pub struct ShootDiagnostics {
    pub agent_shoot_opportunities: u32,
    pub agent_shoot_taken: u32,
    pub opponent_shoot_opportunities: u32,
    pub opponent_shoot_taken: u32,
}

impl ShootDiagnostics {
    fn record(&mut self, for_agent: bool, mask: &[bool; ACTION_SPACE_SIZE], action_id: u8) {
        let opportunity = mask[4..=8].iter().any(|&legal| legal);
        let taken = (4..=8).contains(&action_id);
        if for_agent {
            if opportunity {
                self.agent_shoot_opportunities += 1;
            }
            if taken {
                self.agent_shoot_taken += 1;
            }
        } else {
            if opportunity {
                self.opponent_shoot_opportunities += 1;
            }
            if taken {
                self.opponent_shoot_taken += 1;
            }
        }
    }
}

/// Wraps the façade so player 1's turn segment is driven entirely by a
/// scripted bot. Player 0 is always the learning agent.
pub struct BotControlledEnv {
    pub engine: Engine,
    bot: Box<dyn ScriptedBot + Send>,
    pub diagnostics: ShootDiagnostics,
}

impl BotControlledEnv {
    pub fn new(engine: Engine, bot: Box<dyn ScriptedBot + Send>) -> Self {
        BotControlledEnv {
            engine,
            bot,
            diagnostics: ShootDiagnostics::default(),
        }
    }

    pub fn reset(&mut self, seed: u64) -> Result<(Vec<f32>, StepInfo)> {
        self.diagnostics = ShootDiagnostics::default();
        self.engine.reset(seed)
    }

    /// Step the learning agent, then drive the bot for as long as control
    /// stays with player 1 and the episode is not over. The safety counter
    /// defends against a stuck bot loop (§4.8); exceeding it is an
    /// opponent failure, fatal for the episode (§7).
    pub fn step(&mut self, agent_key: &str, action_id: u8) -> Result<(Vec<f32>, f32, bool, bool, StepInfo)> {
        let agent_mask = self.engine.action_mask();
        self.diagnostics.record(true, &agent_mask, action_id);
        let (mut obs, mut reward, mut terminated, truncated, mut info) = self.engine.step(agent_key, action_id);

        let limit = self.engine.opponent_safety_counter_limit();
        let mut iterations = 0u32;
        while self.engine.state.current_player == 1 && !terminated {
            iterations += 1;
            if iterations > limit {
                return Err(EngineError::Opponent(format!(
                    "bot did not yield control within {limit} iterations (turn={}, phase={:?})",
                    self.engine.state.turn, self.engine.state.phase
                )));
            }
            let mask = self.engine.action_mask();
            let bot_action = self.bot.select_action(&self.engine.state, &mask);
            if !mask.get(bot_action as usize).copied().unwrap_or(false) {
                return Err(EngineError::Opponent(format!(
                    "scripted bot returned action {bot_action} not present in mask"
                )));
            }
            self.diagnostics.record(false, &mask, bot_action);
            let (bot_obs, bot_reward, bot_terminated, _bot_truncated, bot_info) = self.engine.step("opponent", bot_action);
            obs = bot_obs;
            reward += bot_reward;
            terminated = bot_terminated;
            info = bot_info;
        }

        Ok((obs, reward, terminated, truncated, info))
    }
}

/// Same shape as `BotControlledEnv`, but the opponent's action comes from a
/// frozen policy snapshot instead of a scripted bot.
pub struct SelfPlayEnv {
    pub engine: Engine,
    frozen_policy: Box<dyn FrozenPolicy + Send>,
    pub diagnostics: ShootDiagnostics,
}

impl SelfPlayEnv {
    pub fn new(engine: Engine, frozen_policy: Box<dyn FrozenPolicy + Send>) -> Self {
        SelfPlayEnv {
            engine,
            frozen_policy,
            diagnostics: ShootDiagnostics::default(),
        }
    }

    /// Swap in a newer frozen snapshot. Called by the orchestrator every N
    /// episodes; the environment never mutates the policy's weights itself.
    pub fn refresh_policy(&mut self, frozen_policy: Box<dyn FrozenPolicy + Send>) {
        self.frozen_policy = frozen_policy;
    }

    pub fn reset(&mut self, seed: u64) -> Result<(Vec<f32>, StepInfo)> {
        self.diagnostics = ShootDiagnostics::default();
        self.engine.reset(seed)
    }

    pub fn step(&mut self, agent_key: &str, action_id: u8) -> Result<(Vec<f32>, f32, bool, bool, StepInfo)> {
        let agent_mask = self.engine.action_mask();
        self.diagnostics.record(true, &agent_mask, action_id);
        let (mut obs, mut reward, mut terminated, truncated, mut info) = self.engine.step(agent_key, action_id);

        let limit = self.engine.opponent_safety_counter_limit();
        let mut iterations = 0u32;
        while self.engine.state.current_player == 1 && !terminated {
            iterations += 1;
            if iterations > limit {
                return Err(EngineError::Opponent(format!(
                    "frozen policy did not yield control within {limit} iterations"
                )));
            }
            let mask = self.engine.action_mask();
            let frozen_action = self.frozen_policy.masked_predict(&obs, &mask);
            if !mask.get(frozen_action as usize).copied().unwrap_or(false) {
                return Err(EngineError::Opponent(format!(
                    "frozen policy returned action {frozen_action} not present in mask"
                )));
            }
            self.diagnostics.record(false, &mask, frozen_action);
            let (bot_obs, bot_reward, bot_terminated, _bot_truncated, bot_info) = self.engine.step("frozen_opponent", frozen_action);
            obs = bot_obs;
            reward += bot_reward;
            terminated = bot_terminated;
            info = bot_info;
        }

        Ok((obs, reward, terminated, truncated, info))
    }
}

/// Seedable constructor helper shared by the bot implementations.
pub(crate) fn rng_from_seed(seed: u64) -> ChaCha8Rng {
    use rand::SeedableRng;
    ChaCha8Rng::seed_from_u64(seed)
}
