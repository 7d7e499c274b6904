//! Dice-based combat resolution (C5): hit → wound → save → damage.
//!
//! All rolls draw from the single `GameState` PRNG so that a fixed seed
//! plus a fixed action sequence reproduces byte-identical results (§4.3,
//! P6).

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Outcome of one resolved attack (one shot, or one melee swing).
#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct AttackOutcome {
    pub hit: bool,
    pub wounded: bool,
    pub saved: bool,
    pub damage_dealt: i32,
    pub killed: bool,
}

fn roll_d6(rng: &mut ChaCha8Rng) -> i32 {
    rng.gen_range(1..=6)
}

/// Wound target table (§4.3 step 2).
pub fn wound_target(strength: i32, toughness: i32) -> i32 {
    if strength >= 2 * toughness {
        2
    } else if strength > toughness {
        3
    } else if strength == toughness {
        4
    } else if 2 * strength <= toughness {
        6
    } else {
        5
    }
}

/// Profile of the attacking weapon/unit for a single attack instance.
#[derive(Debug, Clone, Copy)]
pub struct AttackProfile {
    pub atk: i32,
    pub strength: i32,
    pub ap: i32,
    pub dmg: i32,
}

/// Resolve one attack instance against a defender, mutating its HP.
/// `defender_toughness`/`defender_save_target` are passed explicitly so
/// this module has no dependency on `Unit` beyond what it mutates.
pub fn resolve_attack(
    rng: &mut ChaCha8Rng,
    profile: AttackProfile,
    defender_toughness: i32,
    defender_save_target: i32,
    defender_hp: &mut i32,
) -> AttackOutcome {
    let mut outcome = AttackOutcome::default();

    let hit_roll = roll_d6(rng);
    outcome.hit = hit_roll >= (7 - profile.atk);
    if !outcome.hit {
        return outcome;
    }

    let wound_roll = roll_d6(rng);
    let target = wound_target(profile.strength, defender_toughness);
    outcome.wounded = wound_roll >= target;
    if !outcome.wounded {
        return outcome;
    }

    let save_roll = roll_d6(rng);
    outcome.saved = save_roll >= defender_save_target;
    if outcome.saved {
        return outcome;
    }

    let damage = profile.dmg.min(*defender_hp);
    *defender_hp = (*defender_hp - profile.dmg).max(0);
    outcome.damage_dealt = damage;
    outcome.killed = *defender_hp == 0;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wound_table_matches_spec_examples() {
        assert_eq!(wound_target(8, 4), 2); // S >= 2T
        assert_eq!(wound_target(4, 8), 6); // 2S <= T
        assert_eq!(wound_target(4, 4), 4); // S == T
        assert_eq!(wound_target(5, 4), 3); // S > T
        assert_eq!(wound_target(3, 4), 5); // S < T, not <=T/2
    }

    #[test]
    fn resolve_attack_is_deterministic_given_seed() {
        use rand::SeedableRng;
        let profile = AttackProfile {
            atk: 3,
            strength: 4,
            ap: 1,
            dmg: 1,
        };
        let mut hp1 = 2;
        let mut rng1 = ChaCha8Rng::seed_from_u64(7);
        let o1 = resolve_attack(&mut rng1, profile, 4, 3, &mut hp1);

        let mut hp2 = 2;
        let mut rng2 = ChaCha8Rng::seed_from_u64(7);
        let o2 = resolve_attack(&mut rng2, profile, 4, 3, &mut hp2);

        assert_eq!(hp1, hp2);
        assert_eq!(o1.hit, o2.hit);
        assert_eq!(o1.damage_dealt, o2.damage_dealt);
    }

    #[test]
    fn damage_clamped_at_zero() {
        let profile = AttackProfile {
            atk: 6,
            strength: 10,
            ap: 0,
            dmg: 5,
        };
        let mut hp = 2;
        use rand::SeedableRng;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        // Force deterministic favourable rolls by trying seeds until a hit+wound+unsaved lands,
        // bounded so the test cannot loop forever.
        let mut killed = false;
        for seed in 0..200 {
            let mut hp_try = 2;
            let mut r = ChaCha8Rng::seed_from_u64(seed);
            let o = resolve_attack(&mut r, profile, 1, 2, &mut hp_try);
            if o.killed {
                killed = true;
                assert_eq!(hp_try, 0);
                break;
            }
        }
        let _ = (hp, rng.gen::<u8>());
        assert!(killed, "expected at least one seed to produce a kill with overwhelming stats");
    }
}
