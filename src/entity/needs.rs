//! Hunger and thirst with derived flags
//!
//! Raw values and flags are only ever written together. The thresholds used
//! to derive the flags are bound to the state, so the write and read paths
//! can never consult different lines.

use serde::{Deserialize, Serialize};

use crate::core::error::BehaviorError;
use crate::core::types::EntityId;
use crate::rules::thresholds::ThresholdSet;

pub const MAX_NEED: f32 = 100.0;
pub const MIN_NEED: f32 = 0.0;
pub const DEFAULT_HUNGER: f32 = 80.0;
pub const DEFAULT_THIRST: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeedKind {
    Hunger,
    Thirst,
}

/// Capability of carrying a needs model
///
/// Only agent types that own a `NeedsState` implement this; code that needs
/// hunger or thirst takes `impl HasNeeds` instead of probing at runtime.
pub trait HasNeeds {
    fn needs(&self) -> &NeedsState;
    fn needs_mut(&mut self) -> &mut NeedsState;
}

/// Per-agent needs (0 = empty, 100 = full)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeedsState {
    hunger: f32,
    thirst: f32,
    is_hungry: bool,
    is_thirsty: bool,
    is_starving: bool,
    is_dehydrated: bool,
    is_retreating: bool,
    is_fleeing: bool,
    starving_ticks: u32,
    #[serde(skip)]
    thresholds: ThresholdSet,
}

impl NeedsState {
    pub fn new(thresholds: ThresholdSet) -> Self {
        Self::with_values(DEFAULT_HUNGER, DEFAULT_THIRST, thresholds)
    }

    pub fn with_values(hunger: f32, thirst: f32, thresholds: ThresholdSet) -> Self {
        let mut state = Self {
            hunger: clamp(hunger),
            thirst: clamp(thirst),
            is_hungry: false,
            is_thirsty: false,
            is_starving: false,
            is_dehydrated: false,
            is_retreating: false,
            is_fleeing: false,
            starving_ticks: 0,
            thresholds,
        };
        state.recompute(true);
        state
    }

    pub fn hunger(&self) -> f32 {
        self.hunger
    }

    pub fn thirst(&self) -> f32 {
        self.thirst
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    pub fn is_hungry(&self) -> bool {
        self.is_hungry
    }

    pub fn is_thirsty(&self) -> bool {
        self.is_thirsty
    }

    pub fn is_starving(&self) -> bool {
        self.is_starving
    }

    pub fn is_dehydrated(&self) -> bool {
        self.is_dehydrated
    }

    pub fn is_retreating(&self) -> bool {
        self.is_retreating
    }

    pub fn is_fleeing(&self) -> bool {
        self.is_fleeing
    }

    /// Hunger has reached the upper line of the hysteresis band
    pub fn is_satisfied(&self) -> bool {
        self.hunger >= self.thresholds.satisfied
    }

    /// Thirst has reached the upper line of the hysteresis band
    pub fn is_hydrated(&self) -> bool {
        self.thirst >= self.thresholds.hydrated
    }

    /// Hunger is low enough for a predator to go hunting
    pub fn wants_to_hunt(&self) -> bool {
        self.is_hungry && self.hunger <= self.thresholds.hunt_threshold()
    }

    pub fn starving_ticks(&self) -> u32 {
        self.starving_ticks
    }

    /// Direct override; flags are derived from scratch with no latch carried over
    pub fn set_hunger(&mut self, value: f32) {
        self.hunger = clamp(value);
        self.recompute(true);
    }

    /// Direct override; flags are derived from scratch with no latch carried over
    pub fn set_thirst(&mut self, value: f32) {
        self.thirst = clamp(value);
        self.recompute(true);
    }

    /// Passive loss for one tick
    pub fn decay(&mut self, hunger_loss: f32, thirst_loss: f32) {
        self.hunger = clamp(self.hunger - hunger_loss.max(0.0));
        self.thirst = clamp(self.thirst - thirst_loss.max(0.0));
        self.recompute(false);
    }

    /// Consumption: raise a need, clamped to the maximum
    pub fn restore(&mut self, kind: NeedKind, amount: f32) {
        match kind {
            NeedKind::Hunger => self.hunger = clamp(self.hunger + amount.max(0.0)),
            NeedKind::Thirst => self.thirst = clamp(self.thirst + amount.max(0.0)),
        }
        self.recompute(false);
    }

    /// Rebind to a (possibly different) species threshold set and rederive
    pub fn rebind(&mut self, thresholds: ThresholdSet) {
        self.thresholds = thresholds;
        self.recompute(false);
    }

    pub fn set_retreating(&mut self, health_fraction: f32, limit: f32) {
        self.is_retreating = health_fraction < limit;
    }

    pub(crate) fn set_fleeing(&mut self, fleeing: bool) {
        self.is_fleeing = fleeing;
    }

    /// Count consecutive starving ticks; returns the new count
    pub fn advance_starvation(&mut self) -> u32 {
        if self.is_starving {
            self.starving_ticks = self.starving_ticks.saturating_add(1);
        } else {
            self.starving_ticks = 0;
        }
        self.starving_ticks
    }

    /// Whether starvation damage is due this tick
    pub fn starvation_due(&self, grace_ticks: u32, interval: u32) -> bool {
        if !self.is_starving || self.starving_ticks <= grace_ticks {
            return false;
        }
        (self.starving_ticks - grace_ticks) % interval.max(1) == 0
    }

    /// Whether the stored flags agree with the raw values
    pub fn is_consistent(&self) -> bool {
        let t = &self.thresholds;
        let hunger_ok = if self.hunger < t.hungry {
            self.is_hungry
        } else if self.hunger >= t.satisfied {
            !self.is_hungry
        } else {
            true
        };
        let thirst_ok = if self.thirst < t.thirsty {
            self.is_thirsty
        } else if self.thirst >= t.hydrated {
            !self.is_thirsty
        } else {
            true
        };
        hunger_ok
            && thirst_ok
            && self.is_starving == (self.hunger <= t.starving)
            && self.is_dehydrated == (self.thirst <= t.dehydrated)
            && (0.0..=MAX_NEED).contains(&self.hunger)
            && (0.0..=MAX_NEED).contains(&self.thirst)
    }

    /// Force a recomputation when the flags disagree with the raw values
    ///
    /// The state is always consistent afterwards; the error reports that a
    /// repair was needed.
    pub fn ensure_consistent(&mut self, owner: EntityId) -> Result<(), BehaviorError> {
        if self.is_consistent() {
            return Ok(());
        }
        self.hunger = clamp(self.hunger);
        self.thirst = clamp(self.thirst);
        self.recompute(true);
        Err(BehaviorError::InconsistentNeedsState(owner))
    }

    fn recompute(&mut self, fresh: bool) {
        let t = self.thresholds;
        self.is_hungry = band_flag(self.is_hungry, self.hunger, t.hungry, t.satisfied, fresh);
        self.is_thirsty = band_flag(self.is_thirsty, self.thirst, t.thirsty, t.hydrated, fresh);
        self.is_starving = self.hunger <= t.starving;
        self.is_dehydrated = self.thirst <= t.dehydrated;
    }
}

fn band_flag(previous: bool, value: f32, low: f32, high: f32, fresh: bool) -> bool {
    if value < low {
        true
    } else if value >= high || fresh {
        false
    } else {
        previous
    }
}

fn clamp(value: f32) -> f32 {
    if value.is_nan() {
        return MIN_NEED;
    }
    value.clamp(MIN_NEED, MAX_NEED)
}
