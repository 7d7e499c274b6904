//! Phase handlers (C4): eligibility, activation pools, and per-phase action
//! execution. Each submodule exposes `phase_start`, `eligible_units` and
//! `execute_action`, matching §4.2.

pub mod charge;
pub mod fight;
pub mod movement;
pub mod shoot;

use crate::action::Action;
use crate::hexgrid;
use crate::state::{GameState, Phase};
use crate::unit::UnitId;

/// Result of one `execute_action` call. `phase_complete` tells the façade
/// to invoke the next phase's `phase_start`.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub success: bool,
    pub phase_complete: bool,
    pub next_phase: Option<Phase>,
    pub detail: String,
}

impl ExecResult {
    pub fn ok(detail: impl Into<String>) -> Self {
        ExecResult {
            success: true,
            detail: detail.into(),
            ..Default::default()
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        ExecResult {
            success: false,
            detail: detail.into(),
            ..Default::default()
        }
    }

    pub fn with_phase_complete(mut self, next: Phase) -> Self {
        self.phase_complete = true;
        self.next_phase = Some(next);
        self
    }
}

/// Recompute `state.activation_pool` from the current phase's eligibility
/// predicate. Phase completion is decided by this coming back empty, never
/// by a counter (design note).
pub fn rebuild_pool(state: &mut GameState) {
    let eligible = eligible_units(state);
    state.activation_pool = eligible.into_iter().collect();
}

pub fn eligible_units(state: &GameState) -> Vec<UnitId> {
    match state.phase {
        Phase::Move => movement::eligible_units(state),
        Phase::Shoot => shoot::eligible_units(state),
        Phase::Charge => charge::eligible_units(state),
        Phase::Fight => fight::eligible_units(state),
    }
}

pub fn phase_start(state: &mut GameState) {
    match state.phase {
        Phase::Move => movement::phase_start(state),
        Phase::Shoot => shoot::phase_start(state),
        Phase::Charge => charge::phase_start(state),
        Phase::Fight => fight::phase_start(state),
    }
    rebuild_pool(state);
}

/// Like `phase_start`, but keeps moving forward through any phase (or fight
/// sub-phase) that comes up with nothing eligible at all — e.g. no target in
/// range/LOS during Shoot, or no one adjacent during Charge/Fight. Returns
/// `true` if the cascade ran Fight all the way to Cleanup, meaning the
/// caller still owes the Fight->Move player handoff.
pub fn phase_start_cascading(state: &mut GameState) -> bool {
    loop {
        if state.phase == Phase::Fight {
            fight::phase_start(state);
            rebuild_pool(state);
            if !state.activation_pool.is_empty() {
                return false;
            }
            if fight::cascade_subphases(state) {
                return true;
            }
            return false;
        }
        phase_start(state);
        if !state.activation_pool.is_empty() {
            return false;
        }
        state.phase = match state.phase {
            Phase::Move => Phase::Shoot,
            Phase::Shoot => Phase::Charge,
            Phase::Charge => Phase::Fight,
            Phase::Fight => unreachable!(),
        };
    }
}

pub fn execute_action(state: &mut GameState, action: Action) -> ExecResult {
    match state.phase {
        Phase::Move => movement::execute_action(state, action),
        Phase::Shoot => shoot::execute_action(state, action),
        Phase::Charge => charge::execute_action(state, action),
        Phase::Fight => fight::execute_action(state, action),
    }
}

/// Build the stable 5-slot target pool shared by shooting and fighting:
/// living enemies, ordered by hex distance ascending then unit id
/// ascending, truncated to 5 entries (§4.2).
pub fn build_target_pool(state: &GameState, acting: UnitId, candidates: impl Iterator<Item = UnitId>) -> Vec<UnitId> {
    let origin = state.unit(acting).pos;
    let mut targets: Vec<UnitId> = candidates.collect();
    targets.sort_by_key(|id| (hexgrid::distance(origin, state.unit(*id).pos), *id));
    targets.truncate(5);
    targets
}
