//! Load the ecology table (thresholds and simulation tunables) from TOML

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::config::SimulationConfig;
use crate::core::error::{BehaviorError, Result};
use crate::core::types::Species;
use crate::rules::thresholds::{PartialThresholds, ThresholdPolicy, ThresholdSet};

/// Contents of an ecology TOML file
#[derive(Debug, Clone, Default)]
pub struct EcologyTable {
    pub policy: ThresholdPolicy,
    pub config: SimulationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTable {
    #[serde(default)]
    defaults: PartialThresholds,
    #[serde(default)]
    species: BTreeMap<String, PartialThresholds>,
    #[serde(default)]
    simulation: Option<SimulationConfig>,
}

/// Load an ecology table from disk
pub fn load_ecology_table(path: &Path) -> Result<EcologyTable> {
    let content = fs::read_to_string(path)?;
    let table = parse_ecology_table(&content)?;
    tracing::info!(
        "Loaded ecology table from {} ({} species overrides)",
        path.display(),
        Species::ALL
            .iter()
            .filter(|s| table.policy.has_override(**s))
            .count()
    );
    Ok(table)
}

/// Parse an ecology table from TOML text
///
/// Species overrides are merged onto the file's defaults, which are in turn
/// merged onto the built-in defaults.
pub fn parse_ecology_table(content: &str) -> Result<EcologyTable> {
    let raw: RawTable = toml::from_str(content)?;

    let defaults = raw.defaults.apply_to(&ThresholdSet::default());
    let mut policy = ThresholdPolicy::new(defaults);

    for (key, partial) in &raw.species {
        let species: Species = key.parse().map_err(BehaviorError::Config)?;
        policy = policy.with_override(species, partial.apply_to(&defaults));
    }

    policy.validate().map_err(BehaviorError::Config)?;

    let config = raw.simulation.unwrap_or_default();
    config.validate().map_err(BehaviorError::Config)?;

    Ok(EcologyTable { policy, config })
}
