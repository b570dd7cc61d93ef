//! Named need thresholds with per-species overrides
//!
//! The hungry/satisfied and thirsty/hydrated pairs form a hysteresis band:
//! a need flag is raised below the lower line and only cleared once the value
//! climbs back over the upper line.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::core::types::Species;

/// Thresholds for one species (or the global default)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    /// Hunger below this raises `is_hungry`
    pub hungry: f32,
    /// Hunger at or above this clears `is_hungry`
    pub satisfied: f32,
    /// Thirst below this raises `is_thirsty`
    pub thirsty: f32,
    /// Thirst at or above this clears `is_thirsty`
    pub hydrated: f32,
    /// Hunger at or below this is starvation
    pub starving: f32,
    /// Thirst at or below this is dehydration
    pub dehydrated: f32,
    /// Hunger at or below which a predator will hunt; `hungry` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hunt: Option<f32>,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            hungry: 50.0,
            satisfied: 80.0,
            thirsty: 50.0,
            hydrated: 80.0,
            starving: 10.0,
            dehydrated: 10.0,
            hunt: None,
        }
    }
}

impl ThresholdSet {
    pub fn hunt_threshold(&self) -> f32 {
        self.hunt.unwrap_or(self.hungry)
    }

    pub fn validate(&self) -> Result<(), String> {
        let in_range = |name: &str, v: f32| {
            if (0.0..=100.0).contains(&v) {
                Ok(())
            } else {
                Err(format!("{} ({}) must lie in [0, 100]", name, v))
            }
        };
        in_range("hungry", self.hungry)?;
        in_range("satisfied", self.satisfied)?;
        in_range("thirsty", self.thirsty)?;
        in_range("hydrated", self.hydrated)?;
        in_range("starving", self.starving)?;
        in_range("dehydrated", self.dehydrated)?;
        if let Some(hunt) = self.hunt {
            in_range("hunt", hunt)?;
        }

        if self.starving >= self.hungry {
            return Err(format!(
                "starving ({}) should be < hungry ({})",
                self.starving, self.hungry
            ));
        }
        if self.hungry > self.satisfied {
            return Err(format!(
                "hungry ({}) should be <= satisfied ({})",
                self.hungry, self.satisfied
            ));
        }
        if self.dehydrated >= self.thirsty {
            return Err(format!(
                "dehydrated ({}) should be < thirsty ({})",
                self.dehydrated, self.thirsty
            ));
        }
        if self.thirsty > self.hydrated {
            return Err(format!(
                "thirsty ({}) should be <= hydrated ({})",
                self.thirsty, self.hydrated
            ));
        }
        Ok(())
    }
}

/// Species override where any field may be left to the default
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialThresholds {
    pub hungry: Option<f32>,
    pub satisfied: Option<f32>,
    pub thirsty: Option<f32>,
    pub hydrated: Option<f32>,
    pub starving: Option<f32>,
    pub dehydrated: Option<f32>,
    pub hunt: Option<f32>,
}

impl PartialThresholds {
    pub fn apply_to(&self, base: &ThresholdSet) -> ThresholdSet {
        ThresholdSet {
            hungry: self.hungry.unwrap_or(base.hungry),
            satisfied: self.satisfied.unwrap_or(base.satisfied),
            thirsty: self.thirsty.unwrap_or(base.thirsty),
            hydrated: self.hydrated.unwrap_or(base.hydrated),
            starving: self.starving.unwrap_or(base.starving),
            dehydrated: self.dehydrated.unwrap_or(base.dehydrated),
            hunt: self.hunt.or(base.hunt),
        }
    }
}

/// Process-wide threshold table: global defaults plus species overrides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdPolicy {
    defaults: ThresholdSet,
    overrides: AHashMap<Species, ThresholdSet>,
}

impl ThresholdPolicy {
    pub fn new(defaults: ThresholdSet) -> Self {
        Self {
            defaults,
            overrides: AHashMap::new(),
        }
    }

    pub fn with_override(mut self, species: Species, set: ThresholdSet) -> Self {
        self.overrides.insert(species, set);
        self
    }

    pub fn defaults(&self) -> &ThresholdSet {
        &self.defaults
    }

    pub fn has_override(&self, species: Species) -> bool {
        self.overrides.contains_key(&species)
    }

    /// Thresholds for a species; the override wins, the default is the fallback.
    ///
    /// Both the write path (flag derivation) and every read path go through
    /// this one lookup.
    pub fn for_species(&self, species: Species) -> &ThresholdSet {
        self.overrides.get(&species).unwrap_or(&self.defaults)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.defaults
            .validate()
            .map_err(|e| format!("defaults: {}", e))?;
        for (species, set) in &self.overrides {
            set.validate().map_err(|e| format!("{}: {}", species, e))?;
        }
        Ok(())
    }
}

// === GLOBAL POLICY ACCESS ===

static POLICY: OnceLock<ThresholdPolicy> = OnceLock::new();

/// Get the global threshold policy (initializes with defaults if not set)
pub fn policy() -> &'static ThresholdPolicy {
    POLICY.get_or_init(ThresholdPolicy::default)
}

/// Set the global threshold policy (can only be called once)
pub fn set_policy(policy: ThresholdPolicy) -> Result<(), ThresholdPolicy> {
    POLICY.set(policy)
}
