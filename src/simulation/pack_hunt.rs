//! Coordinated pack hunting
//!
//! The Alpha picks a large prey; every other hungry member in range gets a
//! bearing around the prey so the pack closes in from all sides. Bearings
//! are fixed for one coordination cycle; approach points follow the prey.

use ahash::AHashMap;
use std::f32::consts::TAU;

use crate::core::config::SimulationConfig;
use crate::core::types::{EntityId, PackId, Tick, Vec2};
use crate::entity::pack::PackRank;
use crate::entity::species::ProfileBook;
use crate::simulation::predator::PredatorTargetSelector;
use crate::simulation::snapshot::{AgentView, TickSnapshot};
use crate::world::WorldQuery;

pub type PackPlans = AHashMap<PackId, PackHuntPlan>;

#[derive(Debug, Clone, PartialEq)]
pub struct PackHuntPlan {
    pub pack_id: PackId,
    pub alpha: EntityId,
    pub target: EntityId,
    /// Subordinates in id order with their bearing (radians) around the prey
    pub flankers: Vec<(EntityId, f32)>,
    pub formed_at: Tick,
}

impl PackHuntPlan {
    pub fn includes(&self, id: EntityId) -> bool {
        self.alpha == id || self.flankers.iter().any(|(f, _)| *f == id)
    }

    pub fn bearing_of(&self, id: EntityId) -> Option<f32> {
        self.flankers
            .iter()
            .find(|(f, _)| *f == id)
            .map(|(_, bearing)| *bearing)
    }

    /// Where `id` should stand, `radius` from the prey's current position
    pub fn approach_point(&self, id: EntityId, prey: Vec2, radius: f32) -> Option<Vec2> {
        self.bearing_of(id)
            .map(|bearing| prey + Vec2::from_angle(bearing) * radius)
    }

    pub fn participants(&self) -> usize {
        1 + self.flankers.len()
    }
}

#[derive(Debug, Clone)]
pub struct PackHuntCoordinator {
    pub min_quorum: usize,
    pub communication_range: f32,
    pub recoordinate_interval: u64,
    plans: PackPlans,
}

impl PackHuntCoordinator {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            min_quorum: config.pack_min_quorum,
            communication_range: config.pack_communication_range,
            recoordinate_interval: config.recoordinate_interval,
            plans: PackPlans::new(),
        }
    }

    pub fn plan(&self, pack: PackId) -> Option<&PackHuntPlan> {
        self.plans.get(&pack)
    }

    pub fn plans(&self) -> &PackPlans {
        &self.plans
    }

    /// Form a hunt plan for one pack, or `None` when the pack lacks an
    /// Alpha, a hungry quorum within range of the Alpha, or a target
    pub fn coordinate(
        &self,
        pack: PackId,
        snapshot: &TickSnapshot,
        world: &dyn WorldQuery,
        selector: &PredatorTargetSelector,
    ) -> Option<PackHuntPlan> {
        let mut members: Vec<&AgentView> = snapshot
            .views()
            .iter()
            .filter(|v| v.is_alive() && v.pack.map(|p| p.pack_id) == Some(pack))
            .collect();
        members.sort_by_key(|v| v.id);

        let alpha = *members
            .iter()
            .find(|v| v.pack.map(|p| p.rank) == Some(PackRank::Alpha))?;

        let hunters: Vec<&AgentView> = members
            .iter()
            .copied()
            .filter(|v| {
                v.is_hungry && v.position.distance(&alpha.position) <= self.communication_range
            })
            .collect();
        if hunters.len() < self.min_quorum {
            tracing::debug!(
                "Pack {:?} below hunt quorum ({} of {})",
                pack,
                hunters.len(),
                self.min_quorum
            );
            return None;
        }

        let target = selector.select_target(alpha, snapshot, world)?;
        let prey = snapshot.get(target)?;

        let toward_prey = prey.position - alpha.position;
        let base = if toward_prey.length() > 0.0001 {
            toward_prey.angle()
        } else {
            0.0
        };

        let subordinates: Vec<EntityId> = hunters
            .iter()
            .filter(|v| v.id != alpha.id)
            .map(|v| v.id)
            .collect();
        let n = subordinates.len().max(1) as f32;
        let flankers = subordinates
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, base + (i as f32 / n) * TAU))
            .collect();

        tracing::debug!(
            "Pack {:?} hunting {:?} with {} members",
            pack,
            target,
            hunters.len()
        );

        Some(PackHuntPlan {
            pack_id: pack,
            alpha: alpha.id,
            target,
            flankers,
            formed_at: snapshot.tick,
        })
    }

    /// Bring every pack's plan up to date for this tick.
    ///
    /// A plan survives until its cycle ends, its target dies or its Alpha
    /// changes; then the pack is coordinated afresh.
    pub fn refresh(&mut self, snapshot: &TickSnapshot, world: &dyn WorldQuery, profiles: &ProfileBook) {
        let tick = snapshot.tick;
        let mut alphas: Vec<&AgentView> = snapshot
            .views()
            .iter()
            .filter(|v| v.is_alive() && v.pack.map(|p| p.rank) == Some(PackRank::Alpha))
            .collect();
        alphas.sort_by_key(|v| (v.pack.map(|p| p.pack_id), v.id));
        alphas.dedup_by_key(|v| v.pack.map(|p| p.pack_id));

        let mut next = PackPlans::new();
        for alpha in alphas {
            let Some(pack) = alpha.pack.map(|p| p.pack_id) else {
                continue;
            };

            if let Some(plan) = self.plans.get(&pack) {
                let fresh = tick < plan.formed_at + self.recoordinate_interval;
                let target_alive = snapshot.get(plan.target).is_some_and(|v| v.is_alive());
                if fresh && target_alive && plan.alpha == alpha.id {
                    next.insert(pack, plan.clone());
                    continue;
                }
            }

            let Some(selector) = profiles
                .get(alpha.species)
                .and_then(|profile| profile.pack_hunt.as_ref())
            else {
                continue;
            };
            if let Some(plan) = self.coordinate(pack, snapshot, world, selector) {
                next.insert(pack, plan);
            }
        }
        self.plans = next;
    }
}
