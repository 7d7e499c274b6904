//! Unit identity, stats and runtime mutable state (§3 Entities: Unit).

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::hexgrid::Hex;

/// Index into `GameState::units`. Stable for the lifetime of one episode.
pub type UnitId = usize;

pub type PlayerId = u8;

/// Immutable stat block resolved from the unit registry at scenario load.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, schemars::JsonSchema)]
pub struct UnitStats {
    #[validate(range(min = 1))]
    pub hp_max: i32,
    #[serde(rename = "MOVE")]
    #[validate(range(min = 0))]
    pub move_: i32,
    #[serde(rename = "T")]
    #[validate(range(min = 1))]
    pub toughness: i32,
    #[validate(range(min = 2))]
    pub armor_save: i32,
    #[serde(default)]
    pub invul_save: Option<i32>,

    #[validate(range(min = 0))]
    pub rng_nb: i32,
    #[validate(range(min = 0))]
    pub rng_rng: i32,
    #[validate(range(min = 0, max = 6))]
    pub rng_atk: i32,
    #[validate(range(min = 1))]
    pub rng_str: i32,
    #[validate(range(min = 0))]
    pub rng_ap: i32,
    #[validate(range(min = 1))]
    pub rng_dmg: i32,

    #[validate(range(min = 0))]
    pub cc_nb: i32,
    #[validate(range(min = 1))]
    pub cc_rng: i32,
    #[validate(range(min = 0, max = 6))]
    pub cc_atk: i32,
    #[validate(range(min = 1))]
    pub cc_str: i32,
    #[validate(range(min = 0))]
    pub cc_ap: i32,
    #[validate(range(min = 1))]
    pub cc_dmg: i32,

    #[serde(rename = "OC")]
    #[validate(range(min = 0))]
    pub oc: i32,
    #[serde(rename = "LD")]
    #[validate(range(min = 2))]
    pub ld: i32,
    #[validate(range(min = 0))]
    pub value: i32,
}

/// A single unit instance placed on the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub external_id: String,
    pub player: PlayerId,
    pub unit_type: String,
    pub pos: Hex,
    pub hp_cur: i32,
    pub stats: UnitStats,
    pub shoot_left: i32,
    pub attack_left: i32,
}

impl Unit {
    pub fn alive(&self) -> bool {
        self.hp_cur > 0
    }

    /// Armour/invulnerable save target against an incoming attack with the
    /// given armour-penetration value (§4.3 step 3).
    pub fn save_target(&self, ap: i32) -> i32 {
        let armor_target = self.stats.armor_save + ap;
        match self.stats.invul_save {
            Some(invul) => armor_target.min(invul),
            None => armor_target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> UnitStats {
        UnitStats {
            hp_max: 2,
            move_: 6,
            toughness: 4,
            armor_save: 3,
            invul_save: Some(5),
            rng_nb: 2,
            rng_rng: 24,
            rng_atk: 3,
            rng_str: 4,
            rng_ap: 1,
            rng_dmg: 1,
            cc_nb: 3,
            cc_rng: 1,
            cc_atk: 3,
            cc_str: 4,
            cc_ap: 0,
            cc_dmg: 1,
            oc: 2,
            ld: 7,
            value: 20,
        }
    }

    #[test]
    fn save_target_uses_invul_when_better() {
        let unit = Unit {
            id: 0,
            external_id: "x".into(),
            player: 0,
            unit_type: "t".into(),
            pos: Hex::new(0, 0),
            hp_cur: 2,
            stats: stats(),
            shoot_left: 2,
            attack_left: 3,
        };
        // armor_save 3 + ap 3 = 6, worse than invul 5 -> invul wins.
        assert_eq!(unit.save_target(3), 5);
        // armor_save 3 + ap 0 = 3, better than invul 5 -> armor wins.
        assert_eq!(unit.save_target(0), 3);
    }

    #[test]
    fn alive_iff_hp_positive() {
        let mut unit = Unit {
            id: 0,
            external_id: "x".into(),
            player: 0,
            unit_type: "t".into(),
            pos: Hex::new(0, 0),
            hp_cur: 1,
            stats: stats(),
            shoot_left: 0,
            attack_left: 0,
        };
        assert!(unit.alive());
        unit.hp_cur = 0;
        assert!(!unit.alive());
    }
}
