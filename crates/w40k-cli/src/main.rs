//! Training/evaluation orchestration CLI (C11): episode loop, vectorised
//! rollouts and bot-suite evaluation sweeps over the tactical engine.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing::{error, info};

use w40k_core::opponent::{BotControlledEnv, DefensiveBot, GreedyBot, RandomBot, ScriptedBot};
use w40k_core::{load_registry, load_reward_config, load_scenario, Engine, RewardConfig, Scenario, UnitRegistry};

#[derive(Parser)]
#[command(name = "w40k-cli")]
#[command(about = "Run, rollout, and evaluate the tactical-combat engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single episode against a scripted bot, printing a step trace.
    Run {
        #[arg(long)]
        scenario: PathBuf,
        #[arg(long)]
        registry: PathBuf,
        #[arg(long)]
        rewards: PathBuf,
        #[arg(long, default_value = "0")]
        seed: u64,
        #[arg(long, default_value = "5")]
        max_turns: u32,
        #[arg(long, default_value = "random")]
        bot: String,
        #[arg(long, default_value = "agent_0")]
        agent_key: String,
    },
    /// Run N independent episodes in parallel worker threads and report
    /// aggregate win/loss/draw counts.
    Rollout {
        #[arg(long)]
        scenario: PathBuf,
        #[arg(long)]
        registry: PathBuf,
        #[arg(long)]
        rewards: PathBuf,
        #[arg(long, default_value = "16")]
        n_envs: u32,
        #[arg(long, default_value = "5")]
        max_turns: u32,
        #[arg(long, default_value = "random")]
        bot: String,
        #[arg(long, default_value = "agent_0")]
        agent_key: String,
    },
    /// Evaluate the agent against every scripted bot archetype. Fails fast:
    /// if any episode in the sweep errors, the combined metric is refused
    /// (§7).
    Evaluate {
        #[arg(long)]
        scenario: PathBuf,
        #[arg(long)]
        registry: PathBuf,
        #[arg(long)]
        rewards: PathBuf,
        #[arg(long, default_value = "10")]
        episodes_per_bot: u32,
        #[arg(long, default_value = "5")]
        max_turns: u32,
        #[arg(long, default_value = "agent_0")]
        agent_key: String,
    },
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            scenario,
            registry,
            rewards,
            seed,
            max_turns,
            bot,
            agent_key,
        } => run_episode(&scenario, &registry, &rewards, seed, max_turns, &bot, &agent_key).map(|_| ()),
        Commands::Rollout {
            scenario,
            registry,
            rewards,
            n_envs,
            max_turns,
            bot,
            agent_key,
        } => rollout(&scenario, &registry, &rewards, n_envs, max_turns, &bot, &agent_key),
        Commands::Evaluate {
            scenario,
            registry,
            rewards,
            episodes_per_bot,
            max_turns,
            agent_key,
        } => evaluate(&scenario, &registry, &rewards, episodes_per_bot, max_turns, &agent_key),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) if e.downcast_ref::<ConfigError>().is_some() => {
            error!("configuration error: {e:#}");
            std::process::exit(1);
        }
        Err(e) => {
            error!("runtime error: {e:#}");
            std::process::exit(2);
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct ConfigError(String);

fn load_inputs(scenario: &PathBuf, registry: &PathBuf, rewards: &PathBuf) -> Result<(Scenario, UnitRegistry, RewardConfig)> {
    let scenario = load_scenario(scenario).map_err(|e| ConfigError(format!("loading scenario: {e}")))?;
    let registry = load_registry(registry).map_err(|e| ConfigError(format!("loading unit registry: {e}")))?;
    let rewards = load_reward_config(rewards).map_err(|e| ConfigError(format!("loading rewards configuration: {e}")))?;
    Ok((scenario, registry, rewards))
}

fn make_bot(name: &str, seed: u64) -> Box<dyn ScriptedBot + Send> {
    match name {
        "greedy" => Box::new(GreedyBot::new()),
        "defensive" => Box::new(DefensiveBot::new()),
        _ => Box::new(RandomBot::new(seed)),
    }
}

struct EpisodeOutcome {
    turns: u32,
    total_reward: f32,
    winner: Option<i8>,
}

fn run_episode(
    scenario: &PathBuf,
    registry: &PathBuf,
    rewards: &PathBuf,
    seed: u64,
    max_turns: u32,
    bot: &str,
    agent_key: &str,
) -> Result<EpisodeOutcome> {
    let (scenario, registry, rewards) = load_inputs(scenario, registry, rewards)?;
    let engine = Engine::new(scenario, registry, rewards, seed, max_turns).map_err(|e| ConfigError(e.to_string()))?;
    let mut env = BotControlledEnv::new(engine, make_bot(bot, seed));
    let (_obs, _info) = env.reset(seed).map_err(|e| ConfigError(e.to_string()))?;

    let mut total_reward = 0.0f32;
    let mut terminated = false;
    let mut safety = 0u32;
    while !terminated {
        safety += 1;
        if safety > max_turns * 200 {
            anyhow::bail!("episode did not terminate within the expected step budget");
        }
        let mask = env.engine.action_mask();
        let action_id = mask.iter().position(|&legal| legal).unwrap_or(11) as u8;
        let (_obs, reward, term, _trunc, _info) = env.step(agent_key, action_id)?;
        total_reward += reward;
        terminated = term;
    }

    let outcome = EpisodeOutcome {
        turns: env.engine.state.turn,
        total_reward,
        winner: env.engine.state.winner,
    };
    info!(turns = outcome.turns, reward = outcome.total_reward, winner = ?outcome.winner, "episode finished");
    Ok(outcome)
}

/// Spawn `n_envs` independent episodes on OS threads, each with its own
/// `GameState` and PRNG (§5: no shared mutable state between workers), and
/// reduce the results with rayon.
fn rollout(scenario: &PathBuf, registry: &PathBuf, rewards: &PathBuf, n_envs: u32, max_turns: u32, bot: &str, agent_key: &str) -> Result<()> {
    let (scenario, registry, rewards) = load_inputs(scenario, registry, rewards)?;
    let scenario = Arc::new(scenario);
    let registry = Arc::new(registry);
    let rewards = Arc::new(rewards);
    let bot = bot.to_string();
    let agent_key = agent_key.to_string();

    let outcomes: Vec<Result<EpisodeOutcome>> = (0..n_envs)
        .into_par_iter()
        .map(|i| {
            let engine = Engine::new((*scenario).clone(), (*registry).clone(), (*rewards).clone(), i as u64, max_turns)
                .map_err(|e| anyhow::anyhow!(ConfigError(e.to_string())))?;
            let mut env = BotControlledEnv::new(engine, make_bot(&bot, i as u64));
            env.reset(i as u64).map_err(|e| anyhow::anyhow!(ConfigError(e.to_string())))?;
            let mut total_reward = 0.0f32;
            let mut terminated = false;
            let mut safety = 0u32;
            while !terminated {
                safety += 1;
                if safety > max_turns * 200 {
                    anyhow::bail!("episode {i} did not terminate within the expected step budget");
                }
                let mask = env.engine.action_mask();
                let action_id = mask.iter().position(|&legal| legal).unwrap_or(11) as u8;
                let (_obs, reward, term, _trunc, _info) = env.step(&agent_key, action_id)?;
                total_reward += reward;
                terminated = term;
            }
            Ok(EpisodeOutcome {
                turns: env.engine.state.turn,
                total_reward,
                winner: env.engine.state.winner,
            })
        })
        .collect();

    let mut wins = 0u32;
    let mut losses = 0u32;
    let mut draws = 0u32;
    let mut mean_reward = 0.0f32;
    for outcome in outcomes {
        let outcome = outcome?;
        match outcome.winner {
            Some(0) => wins += 1,
            Some(_) => losses += 1,
            None => draws += 1,
        }
        mean_reward += outcome.total_reward;
    }
    mean_reward /= n_envs.max(1) as f32;
    info!(n_envs, wins, losses, draws, mean_reward, "rollout finished");
    println!("rollout: {n_envs} episodes, {wins} wins, {losses} losses, {draws} draws, mean_reward={mean_reward:.3}");
    Ok(())
}

/// Bot-suite evaluation sweep: any single failed episode refuses the
/// combined metric for that bot (§7 — evaluation must not silently
/// degrade).
fn evaluate(scenario: &PathBuf, registry: &PathBuf, rewards: &PathBuf, episodes_per_bot: u32, max_turns: u32, agent_key: &str) -> Result<()> {
    let archetypes = ["random", "greedy", "defensive"];
    for archetype in archetypes {
        let mut wins = 0u32;
        let mut episodes_run = 0u32;
        for seed in 0..episodes_per_bot {
            let outcome = run_episode(scenario, registry, rewards, seed as u64, max_turns, archetype, agent_key)
                .with_context(|| format!("evaluation sweep failed against '{archetype}' at seed {seed}"))?;
            if outcome.winner == Some(0) {
                wins += 1;
            }
            episodes_run += 1;
        }
        println!("evaluate[{archetype}]: {wins}/{episodes_run} wins");
    }
    Ok(())
}
