//! The single authoritative `GameState` (C3).
//!
//! Exactly one `GameState` exists per environment instance (Invariant 1).
//! Wrappers and handlers mutate it in place; nothing ever clones it to
//! write back a modified copy.

use fxhash::{FxHashMap, FxHashSet};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::{EngineError, Result};
use crate::hexgrid::{Board, Hex};
use crate::unit::{Unit, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Move,
    Shoot,
    Charge,
    Fight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FightSubphase {
    ChargingUnits,
    AlternatingActive,
    AlternatingNonActive,
    Cleanup,
}

/// One resolved activation, appended to the append-only log (§3).
#[derive(Debug, Clone, Serialize)]
pub struct ActionLogEntry {
    pub turn: u32,
    pub player: u8,
    pub phase: Phase,
    pub unit: UnitId,
    pub action: String,
    pub success: bool,
    pub detail: String,
}

pub struct GameState {
    pub board: Board,
    pub units: Vec<Unit>,

    pub current_player: u8,
    pub turn: u32,
    pub phase: Phase,
    pub fight_subphase: Option<FightSubphase>,

    pub activation_pool: VecDeque<UnitId>,
    pub pending_movement_destinations: FxHashMap<UnitId, Vec<Hex>>,
    pub charge_roll_values: FxHashMap<UnitId, i32>,
    pub charge_destination_pool: FxHashMap<UnitId, Vec<Hex>>,
    pub target_pool: FxHashMap<UnitId, Vec<UnitId>>,

    pub units_moved: FxHashSet<UnitId>,
    pub units_fled: FxHashSet<UnitId>,
    pub units_shot: FxHashSet<UnitId>,
    pub units_charged: FxHashSet<UnitId>,
    pub units_attacked: FxHashSet<UnitId>,
    /// Insertion order of successful charges this turn, so the fight
    /// phase's `charging_units` sub-phase can offer them in that order.
    pub charge_order: Vec<UnitId>,

    pub episode_steps: u32,
    pub max_turns: u32,
    pub game_over: bool,
    pub winner: Option<i8>,

    pub action_logs: Vec<ActionLogEntry>,

    pub rng: ChaCha8Rng,
}

impl GameState {
    pub fn new(board: Board, units: Vec<Unit>, seed: u64, max_turns: u32) -> Self {
        GameState {
            board,
            units,
            current_player: 0,
            turn: 1,
            phase: Phase::Move,
            fight_subphase: None,
            activation_pool: VecDeque::new(),
            pending_movement_destinations: FxHashMap::default(),
            charge_roll_values: FxHashMap::default(),
            charge_destination_pool: FxHashMap::default(),
            target_pool: FxHashMap::default(),
            units_moved: FxHashSet::default(),
            units_fled: FxHashSet::default(),
            units_shot: FxHashSet::default(),
            units_charged: FxHashSet::default(),
            units_attacked: FxHashSet::default(),
            charge_order: Vec::new(),
            episode_steps: 0,
            max_turns,
            game_over: false,
            winner: None,
            action_logs: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id]
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut Unit {
        &mut self.units[id]
    }

    pub fn living_units_of(&self, player: u8) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.player == player && u.alive())
    }

    pub fn living_enemies_of(&self, player: u8) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(move |u| u.player != player && u.alive())
    }

    pub fn occupied_hexes_excluding(&self, exclude: UnitId) -> FxHashSet<Hex> {
        self.units
            .iter()
            .filter(|u| u.id != exclude && u.alive())
            .map(|u| u.pos)
            .collect()
    }

    pub fn is_adjacent_to_enemy(&self, unit_id: UnitId) -> bool {
        let unit = self.unit(unit_id);
        self.living_enemies_of(unit.player)
            .any(|e| crate::hexgrid::distance(unit.pos, e.pos) == 1)
    }

    pub fn is_adjacent_to_friendly(&self, unit_id: UnitId) -> bool {
        let unit = self.unit(unit_id);
        self.units
            .iter()
            .any(|o| o.id != unit_id && o.player == unit.player && o.alive() && crate::hexgrid::distance(unit.pos, o.pos) == 1)
    }

    /// Whether any living unit of `player` other than `exclude` sits adjacent
    /// to `pos`. Used to check a candidate target against the *acting* unit's
    /// side rather than the target's own side (§4.2 friendly-fire guard).
    pub fn is_adjacent_to_friendly_of(&self, player: u8, pos: Hex, exclude: UnitId) -> bool {
        self.units
            .iter()
            .any(|o| o.id != exclude && o.player == player && o.alive() && crate::hexgrid::distance(pos, o.pos) == 1)
    }

    /// Fatal corruption check (§7, §8 P4): no unit on a wall, no two living
    /// units sharing a hex, no negative HP, no duplicate pool entries.
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen_hexes = std::collections::HashSet::new();
        for u in &self.units {
            if u.hp_cur < 0 {
                return Err(EngineError::Corruption(format!(
                    "unit {} has negative HP_CUR {}",
                    u.id, u.hp_cur
                )));
            }
            if !u.alive() {
                continue;
            }
            if self.board.is_wall(u.pos) {
                return Err(EngineError::Corruption(format!(
                    "unit {} occupies wall hex {:?}",
                    u.id, u.pos
                )));
            }
            if !seen_hexes.insert(u.pos) {
                return Err(EngineError::Corruption(format!(
                    "two living units share hex {:?}",
                    u.pos
                )));
            }
        }
        let mut seen_pool = std::collections::HashSet::new();
        for id in &self.activation_pool {
            if !seen_pool.insert(*id) {
                return Err(EngineError::Corruption(format!(
                    "duplicate unit {id} in activation pool"
                )));
            }
        }
        Ok(())
    }

    /// Non-fatal diagnostic snapshot (`compliance_data` in the step info
    /// dict), distinct from the hard-fail invariant check above.
    pub fn compliance_report(&self) -> ComplianceReport {
        ComplianceReport {
            pool_corruption_detected: self.check_invariants().is_err(),
            units_activated_this_step: 0, // filled in by the façade per step
            phase_end_reason: None,
        }
    }

    pub fn log(&mut self, unit: UnitId, action: &str, success: bool, detail: impl Into<String>) {
        self.action_logs.push(ActionLogEntry {
            turn: self.turn,
            player: self.current_player,
            phase: self.phase,
            unit,
            action: action.to_string(),
            success,
            detail: detail.into(),
        });
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ComplianceReport {
    pub pool_corruption_detected: bool,
    pub units_activated_this_step: u32,
    pub phase_end_reason: Option<String>,
}
