//! Collaborators the behavior core talks to
//!
//! The core decides what an agent wants and who it targets. Terrain queries,
//! locomotion, damage and storage all belong to the host, reached through the
//! traits in this module.

pub mod sandbox;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{EntityId, ItemId, Vec2};
use crate::entity::carry::{CarrySlot, FoodItem};
use crate::entity::needs::NeedsState;
use crate::entity::pack::PackMembership;
use crate::entity::species::Diet;

pub use sandbox::{MemoryPersistence, SandboxNavigation, SandboxWorld};

/// Read-only world facts, called synchronously during evaluation
pub trait WorldQuery: Sync {
    /// Whether a path from `from` to `to` is believed to exist
    fn can_reach(&self, _from: Vec2, _to: Vec2) -> bool {
        true
    }

    fn has_line_of_sight(&self, _from: Vec2, _to: Vec2) -> bool {
        true
    }

    fn nearest_water(&self, from: Vec2, radius: f32) -> Option<Vec2>;

    fn nearest_forage(&self, from: Vec2, radius: f32, diet: Diet) -> Option<Vec2>;

    /// Food items lying within `radius` of `from`
    fn food_items_near(&self, from: Vec2, radius: f32) -> Vec<FoodItem>;

    /// Current health as a fraction of maximum, `None` to keep the last value
    fn health_fraction(&self, _agent: EntityId) -> Option<f32> {
        None
    }
}

/// Where an agent wants to go and how fast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementIntent {
    pub target: Vec2,
    /// Multiplier on the host's base movement speed
    pub speed: f32,
}

impl MovementIntent {
    pub fn new(target: Vec2, speed: f32) -> Self {
        Self { target, speed }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationStatus {
    Accepted,
    Arrived,
    Unreachable,
}

/// Drives pathfinding and locomotion for submitted intents
pub trait Navigation {
    fn submit(&mut self, agent: EntityId, from: Vec2, intent: &MovementIntent) -> NavigationStatus;

    /// The agent no longer has anywhere to go
    fn stop(&mut self, agent: EntityId);
}

/// Side effects the core asks the host to carry out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectRequest {
    StarvationDamage { agent: EntityId, amount: f32 },
    Attack { attacker: EntityId, target: EntityId },
    /// Grazing or drinking at a world position
    ConsumeForage { agent: EntityId, position: Vec2 },
    /// An agent picked up a world item into its carry slot
    RemoveWorldItem { agent: EntityId, item: ItemId },
    HealFromFeeding { agent: EntityId, amount: f32 },
    /// A packmate hands its carried food to another
    ShareFood {
        from: EntityId,
        to: EntityId,
        nutrition: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectOutcome {
    Applied,
    /// The request killed an agent
    Killed { target: EntityId },
    /// The host refused or could not carry out the request
    Ignored,
}

/// Executes effect requests
pub trait EffectSink {
    fn apply(&mut self, request: &EffectRequest) -> EffectOutcome;
}

/// Logical shape of an agent's stored state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub needs: NeedsState,
    pub pack: Option<PackMembership>,
    #[serde(default)]
    pub carried: CarrySlot,
}

/// Keyed record storage used on world save/load
pub trait Persistence {
    fn save(&mut self, agent: EntityId, record: &AgentRecord) -> Result<()>;

    fn load(&self, agent: EntityId) -> Result<Option<AgentRecord>>;
}
