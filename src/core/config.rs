//! Simulation configuration with documented constants
//!
//! Distances are in world units (one block), durations in ticks and speeds
//! are multipliers handed to the navigation collaborator.

use serde::{Deserialize, Serialize};

/// Configuration for the behavior core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === SPATIAL SYSTEM ===
    /// Size of each cell in the tick snapshot's spatial hash grid
    ///
    /// Radius queries visit `ceil(radius / cell)` rings of cells, so this
    /// should be close to the most common query radius.
    pub grid_cell_size: f32,

    /// Simulated seconds per tick, scales needs decay
    pub tick_dt: f32,

    // === THREATS ===
    /// Distance at which a prey animal notices a predator and flees
    pub flee_radius: f32,

    /// How far past its current position a fleeing agent aims
    pub flee_distance: f32,

    /// Health fraction below which an agent is retreating
    pub retreat_health_fraction: f32,

    /// Radius around a juvenile in which a protective adult watches for threats
    pub protect_radius: f32,

    // === FEEDING ===
    /// Search radius for water, forage and food items
    pub search_radius: f32,

    /// Distance at which an agent can eat, drink or pick up an item
    pub interact_distance: f32,

    /// Hunger restored per tick while grazing
    pub graze_rate: f32,

    /// Thirst restored per tick while drinking
    pub drink_rate: f32,

    /// Ticks spent eating a carried item before it is consumed
    pub carried_eat_ticks: u32,

    /// Hunger restored to a predator when its prey dies
    pub kill_nutrition: f32,

    /// Health restored per point of hunger regained from eating carried food
    pub feeding_heal_ratio: f32,

    // === STARVATION ===
    /// Ticks an agent must stay starving before damage starts
    pub starvation_grace_ticks: u32,

    /// Ticks between two starvation damage requests
    pub starvation_damage_interval: u32,

    /// Damage requested per starvation interval
    pub starvation_damage: f32,

    // === HUNTING ===
    /// Maximum distance at which a predator detects prey
    pub detection_radius: f32,

    /// Distance at which an attack can land
    pub strike_range: f32,

    /// Ticks between two attacks from the same agent
    pub attack_cooldown_ticks: u32,

    // === PACKS ===
    /// Hungry pack members required before a coordinated hunt
    pub pack_min_quorum: usize,

    /// Reach of pack communication, measured from the Alpha to each member
    /// (not pairwise between members); those further out do not take part
    pub pack_communication_range: f32,

    /// Radius around the prey at which flankers position themselves
    pub flank_radius: f32,

    /// Distance to the assigned flank point that counts as positioned
    pub flank_tolerance: f32,

    /// Ticks between two bearing assignments for the same pack
    pub recoordinate_interval: u64,

    /// Ticks a wolf waits before sharing food again
    pub share_cooldown_ticks: u32,

    // === MOVEMENT ===
    pub walk_speed: f32,
    pub flee_speed: f32,
    pub hunt_speed: f32,

    /// Ticks between two wander targets for idle agents
    pub wander_interval: u64,

    /// Maximum distance of a wander target
    pub wander_radius: f32,

    /// Ticks a goal stays suppressed after navigation reported no path
    pub unreachable_backoff_ticks: u64,

    // === PARALLELIZATION ===
    /// Minimum agent count before evaluation runs on the rayon pool
    pub parallel_threshold: usize,

    /// Seed mixed into every agent's wander RNG
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid_cell_size: 16.0,
            tick_dt: 1.0,

            flee_radius: 12.0,
            flee_distance: 16.0,
            retreat_health_fraction: 0.3,
            protect_radius: 16.0,

            search_radius: 24.0,
            interact_distance: 1.5,
            graze_rate: 2.0,
            drink_rate: 4.0,
            carried_eat_ticks: 40,
            kill_nutrition: 40.0,
            feeding_heal_ratio: 0.1,

            starvation_grace_ticks: 0,
            starvation_damage_interval: 20,
            starvation_damage: 1.0,

            detection_radius: 32.0,
            strike_range: 2.0,
            attack_cooldown_ticks: 20,

            pack_min_quorum: 3,
            pack_communication_range: 32.0,
            flank_radius: 8.0,
            flank_tolerance: 2.0,
            recoordinate_interval: 40,
            share_cooldown_ticks: 600,

            walk_speed: 1.0,
            flee_speed: 1.5,
            hunt_speed: 1.3,
            wander_interval: 120,
            wander_radius: 10.0,
            unreachable_backoff_ticks: 20,

            parallel_threshold: 512,
            seed: 0x5eed,
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.grid_cell_size <= 0.0 {
            return Err("grid_cell_size must be positive".into());
        }
        if self.tick_dt <= 0.0 {
            return Err("tick_dt must be positive".into());
        }
        if self.strike_range >= self.detection_radius {
            return Err(format!(
                "strike_range ({}) should be < detection_radius ({})",
                self.strike_range, self.detection_radius
            ));
        }
        if self.pack_min_quorum < 2 {
            return Err(format!(
                "pack_min_quorum ({}) must be at least 2",
                self.pack_min_quorum
            ));
        }
        if !(0.0..=1.0).contains(&self.retreat_health_fraction) {
            return Err("retreat_health_fraction must lie in [0, 1]".into());
        }
        if self.starvation_damage_interval == 0 {
            return Err("starvation_damage_interval must be at least 1".into());
        }
        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<SimulationConfig> = OnceLock::new();

/// Get the global simulation config (initializes with defaults if not set)
pub fn config() -> &'static SimulationConfig {
    CONFIG.get_or_init(SimulationConfig::default)
}

/// Set the global simulation config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: SimulationConfig) -> Result<(), SimulationConfig> {
    CONFIG.set(config)
}
