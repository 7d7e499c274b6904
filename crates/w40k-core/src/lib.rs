//! Core deterministic engine for the tactical-combat simulator: hex-grid
//! geometry, unit/registry/scenario loading, the single authoritative
//! `GameState`, dice combat resolution, the action decoder and mask, the
//! four phase handlers, the observation builder, the reward calculator,
//! the Gym-style façade, and the scripted/self-play opponent wrappers.

pub mod action;
pub mod combat;
pub mod engine;
pub mod error;
pub mod hexgrid;
pub mod observation;
pub mod opponent;
pub mod phases;
pub mod registry;
pub mod reward;
pub mod scenario;
pub mod state;
pub mod unit;

pub use action::{decode_action, get_action_mask, Action, ACTION_SPACE_SIZE};
pub use engine::{Engine, StepInfo, TacticalData};
pub use error::{EngineError, Result};
pub use hexgrid::{Board, Hex};
pub use observation::{build_observation, OBS_SIZE};
pub use registry::{load_registry, load_registry_str, UnitRegistry};
pub use reward::{load_reward_config, load_reward_config_str, RewardConfig};
pub use scenario::{build_board, build_units, load_scenario, load_scenario_str, Scenario};
pub use state::{GameState, Phase};
pub use unit::{PlayerId, Unit, UnitId, UnitStats};
