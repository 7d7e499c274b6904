//! Cross-cutting properties of the façade: determinism, action-mask
//! soundness/completeness, episode-step bookkeeping, and state invariants
//! under both an open board and a wall-obstructed one.

use w40k_core::{decode_action, load_registry, load_registry_str, load_reward_config_str, load_scenario, Engine, RewardConfig};

const REGISTRY_PATH: &str = "tests/fixtures/registry.json";
const PHASE1_SCENARIO: &str = "tests/fixtures/phase1_no_walls.json";
const PHASE2_SCENARIO: &str = "tests/fixtures/phase2_walls.json";

fn empty_rewards() -> RewardConfig {
    load_reward_config_str("{}", false).unwrap()
}

fn build_engine(scenario_path: &str, seed: u64, max_turns: u32) -> Engine {
    let registry = load_registry(REGISTRY_PATH).unwrap();
    let scenario = load_scenario(scenario_path).unwrap();
    Engine::new(scenario, registry, empty_rewards(), seed, max_turns).unwrap()
}

/// Always picks the lowest legal action id, falling back to skip. Purely
/// mechanical so two engines fed the same seed walk identical trajectories.
fn lowest_legal_id(engine: &Engine) -> u8 {
    let mask = engine.action_mask();
    (0..mask.len() as u8).find(|&id| mask[id as usize]).unwrap_or(11)
}

#[test]
fn determinism_given_same_seed_and_policy() {
    let mut a = build_engine(PHASE1_SCENARIO, 123, 6);
    let mut b = build_engine(PHASE1_SCENARIO, 123, 6);

    for _ in 0..80 {
        let id_a = lowest_legal_id(&a);
        let id_b = lowest_legal_id(&b);
        assert_eq!(id_a, id_b, "both engines must pick the same action given identical history");
        let (obs_a, reward_a, term_a, _trunc_a, _info_a) = a.step("agent_0", id_a);
        let (obs_b, reward_b, term_b, _trunc_b, _info_b) = b.step("agent_0", id_b);
        assert_eq!(obs_a, obs_b, "observations must match step-for-step under the same seed");
        assert_eq!(reward_a, reward_b);
        assert_eq!(term_a, term_b);
        if term_a {
            break;
        }
    }
}

#[test]
fn episode_steps_increment_only_on_legal_success() {
    let mut engine = build_engine(PHASE1_SCENARIO, 7, 5);
    let before = engine.state.episode_steps;

    let (_obs, _r, _term, _trunc, info) = engine.step("agent_0", 10); // reserved, always illegal
    assert!(!info.success);
    assert_eq!(engine.state.episode_steps, before);

    let id = lowest_legal_id(&engine);
    let (_obs, _r, _term, _trunc, info) = engine.step("agent_0", id);
    assert!(info.success);
    assert_eq!(engine.state.episode_steps, before + 1);
}

#[test]
fn action_mask_is_sound_and_complete_through_an_episode() {
    let mut engine = build_engine(PHASE1_SCENARIO, 42, 5);
    for _ in 0..60 {
        let mask = engine.action_mask();
        for id in 0u8..12 {
            let decoded = decode_action(&engine.state, id);
            assert_eq!(mask[id as usize], decoded.is_some(), "mask/decode mismatch at action {id}");
        }
        let id = lowest_legal_id(&engine);
        let (_obs, _r, term, _trunc, _info) = engine.step("agent_0", id);
        if term {
            break;
        }
    }
}

#[test]
fn no_unit_ever_occupies_a_wall_or_shares_a_hex_with_another() {
    let mut engine = build_engine(PHASE2_SCENARIO, 5, 6);
    for _ in 0..150 {
        let id = lowest_legal_id(&engine);
        let (_obs, _r, term, _trunc, _info) = engine.step("agent_0", id);
        engine.state.check_invariants().expect("state must stay structurally valid every step");
        for unit in engine.state.units.iter().filter(|u| u.alive()) {
            assert!(!engine.state.board.is_wall(unit.pos), "unit {} ended up on a wall hex", unit.id);
        }
        if term {
            break;
        }
    }
}

/// Regression test for the phase-cascade fix: with the units placed far
/// enough apart that neither can reach charge range this turn, Shoot and
/// Charge both start with nothing eligible and must cascade straight
/// through to Fight (also empty) and on to the next player without ever
/// requiring an external action. Exercises the full turn -> player swap ->
/// turn increment handoff and the per-turn tracking-set reset.
#[test]
fn empty_phases_cascade_and_a_full_round_clears_tracking_state() {
    let registry = load_registry_str(
        r#"{
        "SCOUT": {
            "hp_max": 2, "MOVE": 4, "T": 4, "armor_save": 3, "invul_save": null,
            "rng_nb": 0, "rng_rng": 0, "rng_atk": 0, "rng_str": 1, "rng_ap": 0, "rng_dmg": 1,
            "cc_nb": 1, "cc_rng": 1, "cc_atk": 3, "cc_str": 4, "cc_ap": 0, "cc_dmg": 1,
            "OC": 1, "LD": 7, "value": 10
        }
    }"#,
    )
    .unwrap();
    let scenario = w40k_core::load_scenario_str(
        r#"{
        "units": [
            {"id": "P0_A", "unit_type": "SCOUT", "player": 0, "col": 0, "row": 0},
            {"id": "P1_A", "unit_type": "SCOUT", "player": 1, "col": 15, "row": 0}
        ],
        "board_cols": 20,
        "board_rows": 10
    }"#,
    )
    .unwrap();
    let mut engine = Engine::new(scenario, registry, empty_rewards(), 1, 10).unwrap();

    let mut reached_turn_two = false;
    for _ in 0..40 {
        assert_eq!(engine.state.turn, 1, "no combat is possible this turn, so player counts must not change");
        let id = lowest_legal_id(&engine);
        let (_obs, _r, term, _trunc, _info) = engine.step("agent_0", id);
        assert!(!term, "two units that can never reach each other this turn cannot end the episode");
        if engine.state.turn == 2 {
            reached_turn_two = true;
            break;
        }
    }

    assert!(reached_turn_two, "turn must advance to 2 once both players complete a full phase cycle");
    assert_eq!(engine.state.current_player, 0);
    assert!(engine.state.units_moved.is_empty());
    assert!(engine.state.units_fled.is_empty());
    assert!(engine.state.units_shot.is_empty());
    assert!(engine.state.units_charged.is_empty());
    assert!(engine.state.units_attacked.is_empty());
    assert!(engine.state.charge_order.is_empty());
}
