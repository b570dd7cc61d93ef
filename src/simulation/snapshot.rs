//! Read-only view of every agent, taken once per tick
//!
//! Goals only ever read other agents through the snapshot, so evaluation can
//! run in any order (or in parallel) without seeing half-applied updates.

use ahash::AHashMap;

use crate::core::types::{EntityId, Species, Tick, Vec2};
use crate::entity::agent::Agent;
use crate::entity::needs::HasNeeds;
use crate::entity::pack::PackMembership;
use crate::spatial::SparseHashGrid;

/// What other agents may observe about one agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentView {
    pub id: EntityId,
    pub species: Species,
    pub position: Vec2,
    pub velocity: Vec2,
    pub juvenile: bool,
    pub parent: Option<EntityId>,
    pub health: f32,
    pub is_hungry: bool,
    pub wants_to_hunt: bool,
    pub pack: Option<PackMembership>,
    pub target: Option<EntityId>,
    pub carrying: bool,
}

impl AgentView {
    /// A healthy, sated adult standing still
    pub fn at(id: EntityId, species: Species, position: Vec2) -> Self {
        Self {
            id,
            species,
            position,
            velocity: Vec2::ZERO,
            juvenile: false,
            parent: None,
            health: 1.0,
            is_hungry: false,
            wants_to_hunt: false,
            pack: None,
            target: None,
            carrying: false,
        }
    }

    pub fn of(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            species: agent.species,
            position: agent.position,
            velocity: agent.velocity,
            juvenile: agent.juvenile,
            parent: agent.parent,
            health: agent.health,
            is_hungry: agent.needs().is_hungry(),
            wants_to_hunt: agent.needs().wants_to_hunt(),
            pack: agent.pack,
            target: agent.target,
            carrying: !agent.carried.is_empty(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

#[derive(Debug, Clone)]
pub struct TickSnapshot {
    pub tick: Tick,
    views: Vec<AgentView>,
    index: AHashMap<EntityId, usize>,
    grid: SparseHashGrid,
}

impl TickSnapshot {
    pub fn capture<'a>(tick: Tick, cell_size: f32, agents: impl IntoIterator<Item = &'a Agent>) -> Self {
        Self::from_views(tick, cell_size, agents.into_iter().map(AgentView::of).collect())
    }

    pub fn from_views(tick: Tick, cell_size: f32, views: Vec<AgentView>) -> Self {
        let index = views.iter().enumerate().map(|(i, v)| (v.id, i)).collect();
        let mut grid = SparseHashGrid::new(cell_size);
        grid.rebuild(views.iter().map(|v| (v.id, v.position)));
        Self {
            tick,
            views,
            index,
            grid,
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&AgentView> {
        self.index.get(&id).map(|&i| &self.views[i])
    }

    pub fn views(&self) -> &[AgentView] {
        &self.views
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Living agents within `radius` of `center`, in id order
    pub fn neighbors(&self, center: Vec2, radius: f32) -> impl Iterator<Item = &AgentView> + '_ {
        self.grid
            .query_radius(center, radius)
            .into_iter()
            .filter_map(move |(id, _)| self.get(id))
            .filter(|view| view.is_alive())
    }
}
