//! Scenario file loading (C2): JSON placements + board geometry, resolved
//! against the unit registry into runtime `Unit`s.

use serde::Deserialize;
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::hexgrid::{Board, Hex};
use crate::registry::UnitRegistry;
use crate::unit::{Unit, UnitId};

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioUnit {
    pub id: String,
    pub unit_type: String,
    pub player: u8,
    pub col: i32,
    pub row: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub units: Vec<ScenarioUnit>,
    #[serde(default)]
    pub wall_hexes: Vec<[i32; 2]>,
    #[serde(default)]
    pub objectives: Vec<[i32; 2]>,
    #[serde(default = "default_board_cols")]
    pub board_cols: i32,
    #[serde(default = "default_board_rows")]
    pub board_rows: i32,
}

fn default_board_cols() -> i32 {
    10
}
fn default_board_rows() -> i32 {
    10
}

pub fn load_scenario_str(raw: &str) -> Result<Scenario> {
    let scenario: Scenario = serde_json::from_str(raw)
        .map_err(|e| EngineError::Config(format!("scenario parse error: {e}")))?;
    Ok(scenario)
}

pub fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| EngineError::Config(format!("cannot read scenario {path:?}: {e}")))?;
    load_scenario_str(&raw)
}

/// Build the board (walls/objectives/dimensions) from a loaded scenario.
pub fn build_board(scenario: &Scenario) -> Board {
    let mut board = Board::new(scenario.board_cols, scenario.board_rows);
    for [c, r] in &scenario.wall_hexes {
        board.walls.insert(Hex::new(*c, *r));
    }
    for [c, r] in &scenario.objectives {
        board.objectives.push(Hex::new(*c, *r));
    }
    board
}

/// Resolve scenario placements against the registry into runtime units.
/// `unit_type` must exist in the registry; an unknown type is a fatal
/// configuration error (§6).
pub fn build_units(scenario: &Scenario, registry: &UnitRegistry) -> Result<Vec<Unit>> {
    let mut units = Vec::with_capacity(scenario.units.len());
    let mut seen_hexes: std::collections::HashSet<(i32, i32)> = std::collections::HashSet::new();

    for (idx, su) in scenario.units.iter().enumerate() {
        let stats = registry.get(&su.unit_type).ok_or_else(|| {
            EngineError::Config(format!("unknown unit_type '{}'", su.unit_type))
        })?;
        if su.player > 1 {
            return Err(EngineError::Config(format!(
                "unit '{}' has invalid player {}",
                su.id, su.player
            )));
        }
        if !seen_hexes.insert((su.col, su.row)) {
            return Err(EngineError::Config(format!(
                "duplicate starting hex ({},{}) in scenario",
                su.col, su.row
            )));
        }
        let id: UnitId = idx;
        units.push(Unit {
            id,
            external_id: su.id.clone(),
            player: su.player,
            unit_type: su.unit_type.clone(),
            pos: Hex::new(su.col, su.row),
            hp_cur: stats.hp_max,
            stats: stats.clone(),
            shoot_left: stats.rng_nb,
            attack_left: stats.cc_nb,
        });
    }
    Ok(units)
}
