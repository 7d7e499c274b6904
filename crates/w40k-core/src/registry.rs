//! Unit registry loading (C2): resolves `unit_type -> stat block`.
//!
//! Every UPPERCASE stat field named in §3 is required; a missing field is a
//! fatal configuration error caught either by `serde` (missing JSON/YAML
//! key) or by the `validator` pass below (present but out of range).

use fxhash::FxHashMap;
use std::path::Path;
use validator::Validate;

use crate::error::{EngineError, Result};
use crate::unit::UnitStats;

pub type UnitRegistry = FxHashMap<String, UnitStats>;

fn validate_registry(registry: &UnitRegistry) -> Result<()> {
    for (unit_type, stats) in registry {
        stats.validate().map_err(|e| {
            EngineError::Config(format!("unit_type '{unit_type}' failed validation: {e}"))
        })?;
        if stats.hp_max <= 0 {
            return Err(EngineError::Config(format!(
                "unit_type '{unit_type}': hp_max must be positive"
            )));
        }
        if stats.move_ < 0 {
            return Err(EngineError::Config(format!(
                "unit_type '{unit_type}': MOVE must be non-negative"
            )));
        }
        if !(1..=6).contains(&stats.rng_atk) && stats.rng_nb > 0 {
            return Err(EngineError::Config(format!(
                "unit_type '{unit_type}': RNG_ATK out of range"
            )));
        }
    }
    Ok(())
}

fn parse_registry(raw: &str, is_yaml: bool) -> Result<UnitRegistry> {
    let registry: UnitRegistry = if is_yaml {
        serde_yaml::from_str(raw)
            .map_err(|e| EngineError::Config(format!("registry parse error: {e}")))?
    } else {
        serde_json::from_str(raw)
            .map_err(|e| EngineError::Config(format!("registry parse error: {e}")))?
    };
    validate_registry(&registry)?;
    Ok(registry)
}

pub fn load_registry_str(raw: &str) -> Result<UnitRegistry> {
    parse_registry(raw, false)
}

pub fn load_registry(path: impl AsRef<Path>) -> Result<UnitRegistry> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| EngineError::Config(format!("cannot read registry {path:?}: {e}")))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    parse_registry(&raw, is_yaml)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
        "INTERCESSOR": {
            "hp_max": 2, "MOVE": 6, "T": 4, "armor_save": 3, "invul_save": null,
            "rng_nb": 2, "rng_rng": 24, "rng_atk": 3, "rng_str": 4, "rng_ap": 1, "rng_dmg": 1,
            "cc_nb": 3, "cc_rng": 1, "cc_atk": 3, "cc_str": 4, "cc_ap": 0, "cc_dmg": 1,
            "OC": 2, "LD": 7, "value": 20
        }
    }
    "#;

    #[test]
    fn loads_valid_registry() {
        let registry = load_registry_str(SAMPLE).unwrap();
        assert!(registry.contains_key("INTERCESSOR"));
        assert_eq!(registry["INTERCESSOR"].hp_max, 2);
    }

    #[test]
    fn missing_field_is_fatal() {
        let bad = r#"{"INTERCESSOR": {"hp_max": 2}}"#;
        assert!(load_registry_str(bad).is_err());
    }

    #[test]
    fn zero_hp_is_fatal() {
        let bad = SAMPLE.replace("\"hp_max\": 2,", "\"hp_max\": 0,");
        assert!(load_registry_str(&bad).is_err());
    }
}
