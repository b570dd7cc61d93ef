//! In-memory host used by the CLI, benches and tests

use ahash::AHashMap;
use ordered_float::OrderedFloat;

use crate::core::error::Result;
use crate::core::types::{EntityId, ItemId, Vec2};
use crate::ecs::world::Ecosystem;
use crate::entity::carry::FoodItem;
use crate::entity::species::Diet;

use super::{
    AgentRecord, EffectOutcome, EffectRequest, EffectSink, MovementIntent, Navigation, NavigationStatus,
    Persistence, WorldQuery,
};

/// Hit points every sandbox agent starts with
pub const SANDBOX_MAX_HEALTH: f32 = 20.0;

fn nearest_point(from: Vec2, radius: f32, points: impl Iterator<Item = Vec2>) -> Option<Vec2> {
    points
        .filter(|p| p.distance(&from) <= radius)
        .min_by_key(|p| (OrderedFloat(p.distance(&from)), OrderedFloat(p.x), OrderedFloat(p.y)))
}

/// Flat terrain with water, forage, loose items and blocked zones
#[derive(Debug, Clone)]
pub struct SandboxWorld {
    water: Vec<Vec2>,
    forage: Vec<(Vec2, Diet)>,
    items: Vec<FoodItem>,
    unreachable: Vec<(Vec2, f32)>,
    /// Hit points per agent; agents missing here are at full health
    health: AHashMap<EntityId, f32>,
    /// Hit points removed by one attack
    pub attack_damage: f32,
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self {
            water: Vec::new(),
            forage: Vec::new(),
            items: Vec::new(),
            unreachable: Vec::new(),
            health: AHashMap::new(),
            attack_damage: 10.0,
        }
    }

    pub fn add_water(&mut self, position: Vec2) {
        self.water.push(position);
    }

    pub fn add_forage(&mut self, position: Vec2, diet: Diet) {
        self.forage.push((position, diet));
    }

    pub fn add_item(&mut self, item: FoodItem) -> ItemId {
        let id = item.id;
        self.items.push(item);
        id
    }

    pub fn items(&self) -> &[FoodItem] {
        &self.items
    }

    /// Positions inside the circle cannot be reached from anywhere
    pub fn add_unreachable_zone(&mut self, center: Vec2, radius: f32) {
        self.unreachable.push((center, radius));
    }

    pub fn set_health(&mut self, agent: EntityId, hit_points: f32) {
        self.health.insert(agent, hit_points.clamp(0.0, SANDBOX_MAX_HEALTH));
    }

    pub fn health(&self, agent: EntityId) -> f32 {
        self.health.get(&agent).copied().unwrap_or(SANDBOX_MAX_HEALTH)
    }

    fn damage(&mut self, agent: EntityId, amount: f32) -> EffectOutcome {
        let remaining = (self.health(agent) - amount).max(0.0);
        self.health.insert(agent, remaining);
        if remaining <= 0.0 {
            EffectOutcome::Killed { target: agent }
        } else {
            EffectOutcome::Applied
        }
    }

    fn is_blocked(&self, position: Vec2) -> bool {
        self.unreachable
            .iter()
            .any(|(center, radius)| center.distance(&position) <= *radius)
    }
}

impl Default for SandboxWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldQuery for SandboxWorld {
    fn can_reach(&self, _from: Vec2, to: Vec2) -> bool {
        !self.is_blocked(to)
    }

    fn nearest_water(&self, from: Vec2, radius: f32) -> Option<Vec2> {
        nearest_point(from, radius, self.water.iter().copied())
    }

    fn nearest_forage(&self, from: Vec2, radius: f32, diet: Diet) -> Option<Vec2> {
        nearest_point(
            from,
            radius,
            self.forage.iter().filter(|(_, d)| *d == diet).map(|(p, _)| *p),
        )
    }

    fn food_items_near(&self, from: Vec2, radius: f32) -> Vec<FoodItem> {
        let mut items: Vec<FoodItem> = self
            .items
            .iter()
            .filter(|item| item.position.distance(&from) <= radius)
            .cloned()
            .collect();
        items.sort_by_key(|item| (OrderedFloat(item.position.distance(&from)), item.id));
        items
    }

    fn health_fraction(&self, agent: EntityId) -> Option<f32> {
        self.health.get(&agent).map(|hp| hp / SANDBOX_MAX_HEALTH)
    }
}

impl EffectSink for SandboxWorld {
    fn apply(&mut self, request: &EffectRequest) -> EffectOutcome {
        match *request {
            EffectRequest::StarvationDamage { agent, amount } => self.damage(agent, amount),
            EffectRequest::Attack { target, .. } => {
                if self.health(target) <= 0.0 {
                    return EffectOutcome::Ignored;
                }
                let damage = self.attack_damage;
                self.damage(target, damage)
            }
            EffectRequest::RemoveWorldItem { item, .. } => {
                match self.items.iter().position(|i| i.id == item) {
                    Some(index) => {
                        self.items.swap_remove(index);
                        EffectOutcome::Applied
                    }
                    None => EffectOutcome::Ignored,
                }
            }
            EffectRequest::HealFromFeeding { agent, amount } => {
                let healed = (self.health(agent) + amount).min(SANDBOX_MAX_HEALTH);
                self.health.insert(agent, healed);
                EffectOutcome::Applied
            }
            EffectRequest::ConsumeForage { .. } | EffectRequest::ShareFood { .. } => EffectOutcome::Applied,
        }
    }
}

/// Straight-line locomotion: each agent steps toward its intent target
#[derive(Debug, Clone, Default)]
pub struct SandboxNavigation {
    intents: AHashMap<EntityId, MovementIntent>,
    blocked: Vec<(Vec2, f32)>,
    /// Distance covered per tick at speed 1.0
    pub base_speed: f32,
}

impl SandboxNavigation {
    pub fn new(base_speed: f32) -> Self {
        Self {
            base_speed,
            ..Default::default()
        }
    }

    /// Targets inside the circle are reported unreachable
    pub fn add_blocked_zone(&mut self, center: Vec2, radius: f32) {
        self.blocked.push((center, radius));
    }

    pub fn intent(&self, agent: EntityId) -> Option<&MovementIntent> {
        self.intents.get(&agent)
    }

    /// Move every agent one step along its pending intent
    pub fn advance(&mut self, ecosystem: &mut Ecosystem) {
        for agent in ecosystem.agents_mut() {
            let Some(intent) = self.intents.get(&agent.id).copied() else {
                agent.velocity = Vec2::ZERO;
                continue;
            };

            let step = self.base_speed * intent.speed;
            let delta = intent.target - agent.position;
            let distance = delta.length();
            let movement = if distance <= step {
                self.intents.remove(&agent.id);
                delta
            } else {
                delta.normalize() * step
            };
            agent.position = agent.position + movement;
            agent.velocity = movement;
        }
    }
}

impl Navigation for SandboxNavigation {
    fn submit(&mut self, agent: EntityId, from: Vec2, intent: &MovementIntent) -> NavigationStatus {
        if self
            .blocked
            .iter()
            .any(|(center, radius)| center.distance(&intent.target) <= *radius)
        {
            self.intents.remove(&agent);
            return NavigationStatus::Unreachable;
        }
        if from.distance(&intent.target) < 1e-3 {
            self.intents.remove(&agent);
            return NavigationStatus::Arrived;
        }
        self.intents.insert(agent, *intent);
        NavigationStatus::Accepted
    }

    fn stop(&mut self, agent: EntityId) {
        self.intents.remove(&agent);
    }
}

/// Record store keeping serialized JSON in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    records: AHashMap<EntityId, String>,
}

impl MemoryPersistence {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw stored JSON for one agent
    pub fn raw(&self, agent: EntityId) -> Option<&str> {
        self.records.get(&agent).map(String::as_str)
    }

    pub fn insert_raw(&mut self, agent: EntityId, json: impl Into<String>) {
        self.records.insert(agent, json.into());
    }
}

impl Persistence for MemoryPersistence {
    fn save(&mut self, agent: EntityId, record: &AgentRecord) -> Result<()> {
        self.records.insert(agent, serde_json::to_string(record)?);
        Ok(())
    }

    fn load(&self, agent: EntityId) -> Result<Option<AgentRecord>> {
        self.records
            .get(&agent)
            .map(|json| serde_json::from_str(json))
            .transpose()
            .map_err(Into::into)
    }
}
