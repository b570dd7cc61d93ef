//! Hunger-gated prey selection

use ordered_float::OrderedFloat;
use std::fmt;
use std::sync::Arc;

use crate::core::error::{BehaviorError, Result};
use crate::core::types::{EntityId, Species};
use crate::entity::pack::are_packmates;
use crate::simulation::snapshot::{AgentView, TickSnapshot};
use crate::world::WorldQuery;

/// Which agents count as prey
#[derive(Clone)]
pub struct PreyFilter(Arc<dyn Fn(&AgentView) -> bool + Send + Sync>);

impl PreyFilter {
    pub fn new(filter: impl Fn(&AgentView) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(filter))
    }

    /// Any agent of the listed species
    pub fn species(prey: Vec<Species>) -> Self {
        Self::new(move |view| prey.contains(&view.species))
    }

    pub fn matches(&self, view: &AgentView) -> bool {
        (self.0)(view)
    }
}

impl fmt::Debug for PreyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PreyFilter(..)")
    }
}

#[derive(Debug, Clone)]
pub struct PredatorTargetSelector {
    pub detection_radius: f32,
    filter: PreyFilter,
}

impl PredatorTargetSelector {
    pub fn new(detection_radius: f32, filter: PreyFilter) -> Self {
        Self {
            detection_radius,
            filter,
        }
    }

    fn is_candidate(&self, hunter: &AgentView, prey: &AgentView, world: &dyn WorldQuery) -> bool {
        prey.id != hunter.id
            && prey.is_alive()
            && !are_packmates(hunter.pack.as_ref(), prey.pack.as_ref())
            && self.filter.matches(prey)
            && world.can_reach(hunter.position, prey.position)
            && world.has_line_of_sight(hunter.position, prey.position)
    }

    /// Nearest valid prey regardless of hunger; lowest id on ties
    pub fn nearest_candidate(
        &self,
        hunter: &AgentView,
        snapshot: &TickSnapshot,
        world: &dyn WorldQuery,
    ) -> Option<EntityId> {
        snapshot
            .neighbors(hunter.position, self.detection_radius)
            .filter(|prey| self.is_candidate(hunter, prey, world))
            .min_by_key(|prey| (OrderedFloat(hunter.position.distance(&prey.position)), prey.id))
            .map(|prey| prey.id)
    }

    /// Nearest valid prey, only for a hunter hungry enough to hunt
    pub fn select_target(
        &self,
        hunter: &AgentView,
        snapshot: &TickSnapshot,
        world: &dyn WorldQuery,
    ) -> Option<EntityId> {
        if !hunter.wants_to_hunt {
            return None;
        }
        self.nearest_candidate(hunter, snapshot, world)
    }

    /// Check a previously selected target is still worth chasing
    pub fn revalidate<'s>(
        &self,
        hunter: &AgentView,
        target: EntityId,
        snapshot: &'s TickSnapshot,
    ) -> Result<&'s AgentView> {
        let prey = snapshot
            .get(target)
            .filter(|prey| prey.is_alive())
            .ok_or(BehaviorError::TargetLost(target))?;
        if hunter.position.distance(&prey.position) > self.detection_radius {
            return Err(BehaviorError::TargetLost(target));
        }
        Ok(prey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec2;
    use crate::world::SandboxWorld;

    fn view(n: u128, species: Species, x: f32) -> AgentView {
        AgentView::at(EntityId::from_u128(n), species, Vec2::new(x, 0.0))
    }

    fn hungry_fox() -> AgentView {
        let mut fox = view(100, Species::Fox, 0.0);
        fox.is_hungry = true;
        fox.wants_to_hunt = true;
        fox
    }

    fn selector() -> PredatorTargetSelector {
        PredatorTargetSelector::new(32.0, PreyFilter::species(vec![Species::Chicken, Species::Rabbit]))
    }

    #[test]
    fn test_sated_hunter_selects_nothing() {
        let mut fox = hungry_fox();
        fox.wants_to_hunt = false;
        let snap = TickSnapshot::from_views(0, 16.0, vec![fox, view(1, Species::Chicken, 5.0)]);
        let world = SandboxWorld::new();
        assert!(selector().select_target(&fox, &snap, &world).is_none());
        assert!(selector().nearest_candidate(&fox, &snap, &world).is_some());
    }

    #[test]
    fn test_nearest_prey_with_id_tiebreak() {
        let fox = hungry_fox();
        let snap = TickSnapshot::from_views(
            0,
            16.0,
            vec![
                fox,
                view(7, Species::Rabbit, -6.0),
                view(3, Species::Chicken, 6.0),
                view(1, Species::Sheep, 1.0),
                view(2, Species::Chicken, 40.0),
            ],
        );
        let world = SandboxWorld::new();
        assert_eq!(
            selector().select_target(&fox, &snap, &world),
            Some(EntityId::from_u128(3))
        );
    }

    #[test]
    fn test_unreachable_prey_skipped() {
        let fox = hungry_fox();
        let snap = TickSnapshot::from_views(
            0,
            16.0,
            vec![fox, view(1, Species::Chicken, 5.0), view(2, Species::Rabbit, 10.0)],
        );
        let mut world = SandboxWorld::new();
        world.add_unreachable_zone(Vec2::new(5.0, 0.0), 1.0);
        assert_eq!(
            selector().select_target(&fox, &snap, &world),
            Some(EntityId::from_u128(2))
        );
    }

    #[test]
    fn test_revalidate_stale_target() {
        let fox = hungry_fox();
        let mut dead = view(1, Species::Chicken, 5.0);
        dead.health = 0.0;
        let snap = TickSnapshot::from_views(
            0,
            16.0,
            vec![fox, dead, view(2, Species::Chicken, 50.0), view(3, Species::Chicken, 4.0)],
        );
        let sel = selector();
        for stale in [1, 2, 99] {
            let err = sel.revalidate(&fox, EntityId::from_u128(stale), &snap).unwrap_err();
            assert!(matches!(err, BehaviorError::TargetLost(_)));
        }
        assert!(sel.revalidate(&fox, EntityId::from_u128(3), &snap).is_ok());
    }
}
