//! Action decoder & mask (C6).
//!
//! The action space is a fixed `Discrete(12)`. Its semantic meaning depends
//! on the current phase and on the unit offered at the head of the
//! activation pool (Invariant 5). Both discrete ids (from the agent) and UI
//! dictionaries decode into this same closed sum type before any phase
//! handler sees them (design note: "dynamic typing -> tagged variants").

use serde::Serialize;

use crate::hexgrid::Hex;
use crate::state::{GameState, Phase};
use crate::unit::UnitId;

pub const ACTION_SPACE_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Action {
    Move { unit: UnitId, dest: Hex },
    Shoot { unit: UnitId, target: UnitId },
    ChargeRoll { unit: UnitId },
    Charge { unit: UnitId, dest: Hex },
    Fight { unit: UnitId, target: UnitId },
    Skip { unit: UnitId },
}

impl Action {
    pub fn unit(&self) -> UnitId {
        match self {
            Action::Move { unit, .. }
            | Action::Shoot { unit, .. }
            | Action::ChargeRoll { unit }
            | Action::Charge { unit, .. }
            | Action::Fight { unit, .. }
            | Action::Skip { unit } => *unit,
        }
    }
}

/// Decode a discrete action id (0..12) against the unit currently offered
/// at the head of the activation pool. Returns `None` if the id has no
/// legal meaning right now — the caller treats that as "forbidden_in_phase".
pub fn decode_action(state: &GameState, action_id: u8) -> Option<Action> {
    let unit = *state.activation_pool.front()?;

    if action_id == 11 {
        return Some(Action::Skip { unit });
    }
    if action_id == 10 {
        return None; // reserved, never legal
    }

    match state.phase {
        Phase::Move => {
            if action_id > 3 {
                return None;
            }
            let dests = state.pending_movement_destinations.get(&unit)?;
            dests.get(action_id as usize).map(|dest| Action::Move { unit, dest: *dest })
        }
        Phase::Shoot => {
            if !(4..=8).contains(&action_id) {
                return None;
            }
            let targets = state.target_pool.get(&unit)?;
            targets
                .get((action_id - 4) as usize)
                .map(|target| Action::Shoot { unit, target: *target })
        }
        Phase::Charge => {
            if action_id == 9 {
                if state.charge_roll_values.contains_key(&unit) {
                    return None; // already rolled this activation
                }
                return Some(Action::ChargeRoll { unit });
            }
            if action_id > 3 {
                return None;
            }
            let dests = state.charge_destination_pool.get(&unit)?;
            dests.get(action_id as usize).map(|dest| Action::Charge { unit, dest: *dest })
        }
        Phase::Fight => {
            if !(4..=8).contains(&action_id) {
                return None;
            }
            let targets = state.target_pool.get(&unit)?;
            targets
                .get((action_id - 4) as usize)
                .map(|target| Action::Fight { unit, target: *target })
        }
    }
}

/// Boolean vector of length 12: action id i is legal iff `decode_action`
/// would produce `Some` for it (P7: the mask is sound and complete).
pub fn get_action_mask(state: &GameState) -> [bool; ACTION_SPACE_SIZE] {
    let mut mask = [false; ACTION_SPACE_SIZE];
    if state.activation_pool.is_empty() {
        return mask;
    }
    for id in 0..ACTION_SPACE_SIZE as u8 {
        mask[id as usize] = decode_action(state, id).is_some();
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxhash::FxHashMap;
    use std::collections::VecDeque;

    fn minimal_state(phase: Phase) -> GameState {
        use crate::hexgrid::Board;
        use crate::unit::{Unit, UnitStats};

        let stats = UnitStats {
            hp_max: 2,
            move_: 6,
            toughness: 4,
            armor_save: 3,
            invul_save: None,
            rng_nb: 1,
            rng_rng: 24,
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
        };
        let unit = Unit {
            id: 0,
            external_id: "a".into(),
            player: 0,
            unit_type: "t".into(),
            pos: Hex::new(0, 0),
            hp_cur: 2,
            stats,
            shoot_left: 1,
            attack_left: 1,
        };
        let mut state = GameState::new(Board::new(10, 10), vec![unit], 1, 5);
        state.phase = phase;
        state.activation_pool.push_back(0);
        state
    }

    #[test]
    fn skip_always_legal_when_pool_nonempty() {
        let state = minimal_state(Phase::Move);
        assert_eq!(decode_action(&state, 11), Some(Action::Skip { unit: 0 }));
    }

    #[test]
    fn empty_pool_masks_everything() {
        let mut state = minimal_state(Phase::Move);
        state.activation_pool.clear();
        assert_eq!(get_action_mask(&state), [false; 12]);
    }

    #[test]
    fn move_destination_requires_pending_pool_entry() {
        let mut state = minimal_state(Phase::Move);
        assert_eq!(decode_action(&state, 0), None);
        let mut pend = FxHashMap::default();
        pend.insert(0, vec![Hex::new(1, 0)]);
        state.pending_movement_destinations = pend;
        assert_eq!(decode_action(&state, 0), Some(Action::Move { unit: 0, dest: Hex::new(1, 0) }));
        assert_eq!(decode_action(&state, 1), None);
    }

    #[test]
    fn action_id_10_never_legal() {
        let mut state = minimal_state(Phase::Charge);
        state.charge_roll_values.clear();
        assert_eq!(decode_action(&state, 10), None);
    }

    #[test]
    fn charge_roll_then_destination_sequencing() {
        let mut state = minimal_state(Phase::Charge);
        assert_eq!(decode_action(&state, 9), Some(Action::ChargeRoll { unit: 0 }));
        state.charge_roll_values.insert(0, 5);
        assert_eq!(decode_action(&state, 9), None);
        let mut dests = FxHashMap::default();
        dests.insert(0, vec![Hex::new(2, 0)]);
        state.charge_destination_pool = dests;
        assert_eq!(decode_action(&state, 0), Some(Action::Charge { unit: 0, dest: Hex::new(2, 0) }));
    }

    #[test]
    fn shoot_targets_map_to_ids_4_through_8() {
        let mut state = minimal_state(Phase::Shoot);
        let mut pool: FxHashMap<UnitId, Vec<UnitId>> = FxHashMap::default();
        pool.insert(0, vec![1, 2]);
        state.target_pool = pool;
        assert_eq!(decode_action(&state, 4), Some(Action::Shoot { unit: 0, target: 1 }));
        assert_eq!(decode_action(&state, 5), Some(Action::Shoot { unit: 0, target: 2 }));
        assert_eq!(decode_action(&state, 6), None);
        assert_eq!(decode_action(&state, 3), None);
    }

    #[test]
    fn mask_matches_decode_everywhere() {
        let mut state = minimal_state(Phase::Shoot);
        let mut pool: FxHashMap<UnitId, Vec<UnitId>> = FxHashMap::default();
        pool.insert(0, vec![1]);
        state.target_pool = pool;
        let mask = get_action_mask(&state);
        for id in 0..12u8 {
            assert_eq!(mask[id as usize], decode_action(&state, id).is_some());
        }
        let _ = VecDeque::<UnitId>::new();
    }
}
