//! One simulated animal and its behavior state

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::core::types::{EntityId, Species, Tick, Vec2};
use crate::entity::carry::CarrySlot;
use crate::entity::needs::{HasNeeds, NeedsState};
use crate::entity::pack::PackMembership;
use crate::entity::species::SpeciesProfile;
use crate::rules::thresholds::ThresholdSet;
use crate::simulation::goal::{GoalKind, GoalRuntime};
use crate::simulation::scheduler::PriorityGoalScheduler;
use crate::world::AgentRecord;

/// Typed, species-specific data hung off an agent
pub trait AgentExtension: Any + Send + Sync + fmt::Debug {
    /// Called once per tick after needs have been updated
    fn on_tick(&mut self, _needs: &NeedsState, _tick: Tick) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Debug)]
pub struct Agent {
    pub id: EntityId,
    pub species: Species,
    pub position: Vec2,
    pub velocity: Vec2,
    pub juvenile: bool,
    pub parent: Option<EntityId>,
    /// Fraction of maximum health, kept in sync by the host
    pub health: f32,
    pub pack: Option<PackMembership>,
    pub carried: CarrySlot,
    /// Current prey, leader or food source
    pub target: Option<EntityId>,
    pub runtime: GoalRuntime,
    needs: NeedsState,
    profile: Arc<SpeciesProfile>,
    goals: Arc<PriorityGoalScheduler>,
    extensions: Vec<Box<dyn AgentExtension>>,
}

impl Agent {
    pub fn new(
        id: EntityId,
        position: Vec2,
        needs: NeedsState,
        profile: Arc<SpeciesProfile>,
        goals: Arc<PriorityGoalScheduler>,
    ) -> Self {
        Self {
            id,
            species: profile.species,
            position,
            velocity: Vec2::ZERO,
            juvenile: false,
            parent: None,
            health: 1.0,
            pack: None,
            carried: CarrySlot::empty(),
            target: None,
            runtime: GoalRuntime::default(),
            needs,
            profile,
            goals,
            extensions: Vec::new(),
        }
    }

    pub fn profile(&self) -> &SpeciesProfile {
        &self.profile
    }

    pub fn scheduler(&self) -> &Arc<PriorityGoalScheduler> {
        &self.goals
    }

    pub fn active_goal(&self) -> Option<GoalKind> {
        self.runtime
            .active
            .and_then(|i| self.goals.goals().get(i))
            .map(|goal| goal.kind)
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn add_extension<E: AgentExtension>(&mut self, extension: E) {
        self.extensions.push(Box::new(extension));
    }

    pub fn extension<E: AgentExtension>(&self) -> Option<&E> {
        self.extensions
            .iter()
            .find_map(|ext| ext.as_any().downcast_ref::<E>())
    }

    pub fn extension_mut<E: AgentExtension>(&mut self) -> Option<&mut E> {
        self.extensions
            .iter_mut()
            .find_map(|ext| ext.as_any_mut().downcast_mut::<E>())
    }

    pub fn tick_extensions(&mut self, tick: Tick) {
        for ext in &mut self.extensions {
            ext.on_tick(&self.needs, tick);
        }
    }

    /// Stored shape of this agent's needs, pack and carried item
    pub fn record(&self) -> AgentRecord {
        AgentRecord {
            needs: self.needs.clone(),
            pack: self.pack,
            carried: self.carried.clone(),
        }
    }

    /// Load a stored record, rebinding needs to the current thresholds
    pub fn apply_record(&mut self, record: AgentRecord, thresholds: ThresholdSet) {
        self.needs = record.needs;
        self.needs.rebind(thresholds);
        self.pack = record.pack;
        self.carried = record.carried;
    }
}

impl HasNeeds for Agent {
    fn needs(&self) -> &NeedsState {
        &self.needs
    }

    fn needs_mut(&mut self) -> &mut NeedsState {
        &mut self.needs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;

    #[derive(Debug, Default)]
    struct Den {
        visits: u32,
        last_hunger: f32,
    }

    impl AgentExtension for Den {
        fn on_tick(&mut self, needs: &NeedsState, _tick: Tick) {
            self.visits += 1;
            self.last_hunger = needs.hunger();
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn fox() -> Agent {
        let profile = Arc::new(SpeciesProfile::builtin(Species::Fox, &SimulationConfig::default()));
        let goals = Arc::new(PriorityGoalScheduler::from_profile(&profile));
        Agent::new(
            EntityId::from_u128(1),
            Vec2::ZERO,
            NeedsState::new(ThresholdSet::default()),
            profile,
            goals,
        )
    }

    #[test]
    fn test_typed_extension_lookup() {
        let mut agent = fox();
        assert!(agent.extension::<Den>().is_none());

        agent.add_extension(Den::default());
        agent.tick_extensions(1);
        agent.tick_extensions(2);

        let den = agent.extension::<Den>().unwrap();
        assert_eq!(den.visits, 2);
        assert_eq!(den.last_hunger, agent.needs().hunger());

        agent.extension_mut::<Den>().unwrap().visits = 0;
        assert_eq!(agent.extension::<Den>().unwrap().visits, 0);
    }

    #[test]
    fn test_record_round_trip_rebinds() {
        let mut agent = fox();
        agent.needs_mut().set_hunger(20.0);
        agent.pack = Some(PackMembership::found());

        let record = agent.record();
        let mut other = fox();
        other.apply_record(record, ThresholdSet::default());

        assert_eq!(other.needs().hunger(), 20.0);
        assert!(other.needs().is_hungry());
        assert_eq!(other.pack, agent.pack);
    }
}
