//! Ecosystem - owns every agent and the shared behavior tables

use ahash::AHashMap;
use std::sync::Arc;

use crate::core::config::{self, SimulationConfig};
use crate::core::error::{BehaviorError, Result};
use crate::core::types::{EntityId, PackId, Species, Tick, Vec2};
use crate::entity::agent::Agent;
use crate::entity::needs::{HasNeeds, NeedsState};
use crate::entity::pack::{self, PackMembership, PackRank, PackRoster};
use crate::entity::species::{ProfileBook, SpeciesProfile};
use crate::rules::loader::EcologyTable;
use crate::rules::thresholds::{self, ThresholdPolicy};
use crate::simulation::goal::Goal;
use crate::simulation::pack_hunt::{PackHuntCoordinator, PackHuntPlan};
use crate::simulation::scheduler::PriorityGoalScheduler;
use crate::simulation::snapshot::TickSnapshot;
use crate::world::{Persistence, WorldQuery};

/// The simulated population
pub struct Ecosystem {
    pub current_tick: Tick,
    pub(crate) config: SimulationConfig,
    pub(crate) policy: ThresholdPolicy,
    pub(crate) profiles: ProfileBook,
    schedulers: AHashMap<Species, Arc<PriorityGoalScheduler>>,
    pub(crate) agents: Vec<Agent>,
    index: AHashMap<EntityId, usize>,
    pub(crate) coordinator: PackHuntCoordinator,
}

impl Ecosystem {
    pub fn new(config: SimulationConfig, policy: ThresholdPolicy) -> Self {
        let profiles = ProfileBook::builtin(&config);
        let schedulers = Species::ALL
            .iter()
            .filter_map(|&species| {
                profiles
                    .get(species)
                    .map(|profile| (species, Arc::new(PriorityGoalScheduler::from_profile(profile))))
            })
            .collect();

        Self {
            current_tick: 0,
            coordinator: PackHuntCoordinator::from_config(&config),
            config,
            policy,
            profiles,
            schedulers,
            agents: Vec::new(),
            index: AHashMap::new(),
        }
    }

    /// Built from a loaded ecology table
    pub fn from_table(table: EcologyTable) -> Self {
        Self::new(table.config, table.policy)
    }

    /// Built from the process-wide config and threshold policy
    pub fn with_globals() -> Self {
        Self::new(config::config().clone(), thresholds::policy().clone())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }

    pub fn profiles(&self) -> &ProfileBook {
        &self.profiles
    }

    /// Replace a species profile; agents spawned afterwards use it
    pub fn set_profile(&mut self, profile: SpeciesProfile) {
        let species = profile.species;
        self.schedulers
            .insert(species, Arc::new(PriorityGoalScheduler::from_profile(&profile)));
        self.profiles.insert(profile);
    }

    // === SPAWNING ===

    pub fn spawn(&mut self, species: Species, position: Vec2) -> EntityId {
        let agent = self.build(species, position, None);
        self.insert(agent)
    }

    /// A juvenile that follows `parent` (or any adult of its species)
    pub fn spawn_juvenile(&mut self, species: Species, position: Vec2, parent: Option<EntityId>) -> EntityId {
        let mut agent = self.build(species, position, None);
        agent.juvenile = true;
        agent.parent = parent;
        agent.pack = None;
        self.insert(agent)
    }

    /// An agent with an explicit goal list instead of its species default
    pub fn spawn_with_goals(&mut self, species: Species, position: Vec2, goals: Vec<Goal>) -> EntityId {
        let scheduler = Arc::new(PriorityGoalScheduler::new(goals));
        let agent = self.build(species, position, Some(scheduler));
        self.insert(agent)
    }

    fn build(&self, species: Species, position: Vec2, goals: Option<Arc<PriorityGoalScheduler>>) -> Agent {
        let profile = match self.profiles.get(species) {
            Some(profile) => Arc::clone(profile),
            None => Arc::new(SpeciesProfile::builtin(species, &self.config)),
        };
        let goals = goals
            .or_else(|| self.schedulers.get(&species).cloned())
            .unwrap_or_else(|| Arc::new(PriorityGoalScheduler::from_profile(&profile)));
        let needs = NeedsState::new(*self.policy.for_species(species));
        let forms_packs = profile.forms_packs;

        let mut agent = Agent::new(EntityId::new(), position, needs, profile, goals);
        if forms_packs {
            agent.pack = Some(PackMembership::found());
        }
        agent
    }

    fn insert(&mut self, agent: Agent) -> EntityId {
        let id = agent.id;
        tracing::debug!("Spawned {} {:?} at ({:.1}, {:.1})", agent.species, id, agent.position.x, agent.position.y);
        self.index.insert(id, self.agents.len());
        self.agents.push(agent);
        id
    }

    /// Remove an agent; a pack that loses its Alpha gets a successor
    pub fn despawn(&mut self, id: EntityId) -> Option<Agent> {
        let index = self.index.remove(&id)?;
        let agent = self.agents.swap_remove(index);
        if let Some(moved) = self.agents.get(index) {
            self.index.insert(moved.id, index);
        }

        if let Some(membership) = agent.pack {
            if membership.is_alpha() {
                pack::appoint_successor(self, membership.pack_id);
            }
        }
        tracing::info!("Removed {} {:?}", agent.species, id);
        Some(agent)
    }

    // === ACCESS ===

    pub fn get(&self, id: EntityId) -> Option<&Agent> {
        self.index.get(&id).map(|&i| &self.agents[i])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Agent> {
        self.index.get(&id).map(|&i| &mut self.agents[i])
    }

    fn require_mut(&mut self, id: EntityId) -> Result<&mut Agent> {
        self.get_mut(id).ok_or(BehaviorError::EntityNotFound(id))
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn set_position(&mut self, id: EntityId, position: Vec2) -> Result<()> {
        self.require_mut(id)?.position = position;
        Ok(())
    }

    /// Host-reported health as a fraction of maximum
    pub fn set_health(&mut self, id: EntityId, fraction: f32) -> Result<()> {
        let limit = self.config.retreat_health_fraction;
        let agent = self.require_mut(id)?;
        agent.health = fraction.clamp(0.0, 1.0);
        let health = agent.health;
        agent.needs_mut().set_retreating(health, limit);
        Ok(())
    }

    /// Direct hunger override, flags rederived
    pub fn set_hunger(&mut self, id: EntityId, value: f32) -> Result<()> {
        self.require_mut(id)?.needs_mut().set_hunger(value);
        Ok(())
    }

    pub fn set_thirst(&mut self, id: EntityId, value: f32) -> Result<()> {
        self.require_mut(id)?.needs_mut().set_thirst(value);
        Ok(())
    }

    // === PACKS ===

    /// Make the agent Alpha of a fresh pack, leaving any previous one
    pub fn found_pack(&mut self, id: EntityId) -> Result<PackMembership> {
        let previous = self.require_mut(id)?.pack;
        let founded = PackMembership::found();
        self.set_membership(id, Some(founded));
        if let Some(old) = previous.filter(|m| m.is_alpha()) {
            pack::appoint_successor(self, old.pack_id);
        }
        Ok(founded)
    }

    pub fn join_pack_of(&mut self, follower: EntityId, leader: EntityId) -> Result<PackMembership> {
        pack::join_pack_of(self, follower, leader)
    }

    pub fn promote(&mut self, id: EntityId) -> Result<PackRank> {
        pack::promote(self, id)
    }

    pub fn are_packmates(&self, a: EntityId, b: EntityId) -> bool {
        match (self.get(a), self.get(b)) {
            (Some(a), Some(b)) => pack::are_packmates(a.pack.as_ref(), b.pack.as_ref()),
            _ => false,
        }
    }

    pub fn pack_alpha(&self, pack: PackId) -> Option<EntityId> {
        pack::alpha_of(self, pack)
    }

    // === SNAPSHOTS AND PLANS ===

    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot::capture(self.current_tick, self.config.grid_cell_size, &self.agents)
    }

    pub fn hunt_plan(&self, pack: PackId) -> Option<&PackHuntPlan> {
        self.coordinator.plan(pack)
    }

    /// Run pack coordination against the current state without storing it
    pub fn coordinate_pack(&self, pack: PackId, world: &dyn WorldQuery) -> Option<PackHuntPlan> {
        let alpha = self.get(self.pack_alpha(pack)?)?;
        let selector = self.profiles.get(alpha.species)?.pack_hunt.as_ref()?;
        self.coordinator
            .coordinate(pack, &self.snapshot(), world, selector)
    }

    // === PERSISTENCE ===

    pub fn save_agent(&self, id: EntityId, store: &mut dyn Persistence) -> Result<()> {
        let agent = self.get(id).ok_or(BehaviorError::EntityNotFound(id))?;
        store.save(id, &agent.record())
    }

    /// Load a stored record onto an existing agent; `false` if none was stored
    pub fn restore_agent(&mut self, id: EntityId, store: &dyn Persistence) -> Result<bool> {
        let Some(record) = store.load(id)? else {
            return Ok(false);
        };
        let species = self.get(id).ok_or(BehaviorError::EntityNotFound(id))?.species;
        let thresholds = *self.policy.for_species(species);
        let agent = self.require_mut(id)?;
        agent.apply_record(record, thresholds);
        if let Err(err) = agent.needs_mut().ensure_consistent(id) {
            tracing::warn!("Repaired stored needs: {}", err);
        }
        Ok(true)
    }
}

impl PackRoster for Ecosystem {
    fn membership(&self, id: EntityId) -> Option<Option<PackMembership>> {
        self.get(id).map(|agent| agent.pack)
    }

    fn set_membership(&mut self, id: EntityId, membership: Option<PackMembership>) {
        if let Some(agent) = self.get_mut(id) {
            agent.pack = membership;
        }
    }

    fn members_of(&self, pack: PackId) -> Vec<(EntityId, PackRank)> {
        self.agents
            .iter()
            .filter(|agent| agent.is_alive())
            .filter_map(|agent| agent.pack.filter(|m| m.pack_id == pack).map(|m| (agent.id, m.rank)))
            .collect()
    }
}

impl Default for Ecosystem {
    fn default() -> Self {
        Self::new(SimulationConfig::default(), ThresholdPolicy::default())
    }
}
