//! Herd, school and pack cohesion
//!
//! Flock membership is never stored: every evaluation queries the snapshot
//! for compatible neighbors within the cohesion radius and works from that.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::core::types::{Species, Vec2};
use crate::entity::pack::are_packmates;
use crate::simulation::snapshot::{AgentView, TickSnapshot};
use crate::world::MovementIntent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlockSettings {
    /// Neighbors further than this are not part of the flock
    pub cohesion_radius: f32,
    /// Distance to the centroid an agent is content with
    pub comfort_radius: f32,
    /// Closer than this to the nearest neighbor triggers repulsion
    pub min_separation: f32,
    /// Fewest neighbors that still count as a flock
    pub min_herd_size: usize,
    /// Fraction of neighbors that must be moving before the rest follow
    pub quorum: f32,
    /// Speed above which a neighbor counts as moving
    pub movement_threshold: f32,
    /// Species that flock together; the agent's own species always does
    pub compatible: Vec<Species>,
    /// Only flock with members of the same pack
    pub packmates_only: bool,
    /// A juvenile further than this from its adult starts following
    pub follow_start: f32,
    /// Where a following juvenile stops, measured from the adult
    pub follow_stop: f32,
    /// Adults further than this are out of sight for a juvenile
    pub follow_lost: f32,
}

impl Default for FlockSettings {
    fn default() -> Self {
        Self {
            cohesion_radius: 20.0,
            comfort_radius: 4.0,
            min_separation: 2.5,
            min_herd_size: 1,
            quorum: 0.47,
            movement_threshold: 0.5,
            compatible: Vec::new(),
            packmates_only: false,
            follow_start: 6.0,
            follow_stop: 2.0,
            follow_lost: 24.0,
        }
    }
}

impl FlockSettings {
    pub fn herd(species: Species) -> Self {
        Self {
            compatible: vec![species],
            ..Default::default()
        }
    }

    pub fn school(species: Species) -> Self {
        Self {
            cohesion_radius: 12.0,
            comfort_radius: 3.0,
            min_separation: 1.0,
            compatible: vec![species],
            ..Default::default()
        }
    }

    pub fn pack() -> Self {
        Self {
            cohesion_radius: 24.0,
            comfort_radius: 6.0,
            compatible: vec![Species::Wolf],
            packmates_only: true,
            ..Default::default()
        }
    }

    fn accepts(&self, me: &AgentView, other: &AgentView) -> bool {
        let species_ok = other.species == me.species || self.compatible.contains(&other.species);
        let pack_ok = !self.packmates_only || are_packmates(me.pack.as_ref(), other.pack.as_ref());
        species_ok && pack_ok
    }
}

/// Computes cohesion intents for one flocking agent
#[derive(Debug, Clone, Copy)]
pub struct FlockCohesionEngine<'a> {
    settings: &'a FlockSettings,
}

impl<'a> FlockCohesionEngine<'a> {
    pub fn new(settings: &'a FlockSettings) -> Self {
        Self { settings }
    }

    /// Compatible living neighbors within the cohesion radius, in id order
    pub fn members<'s>(&self, me: &AgentView, snapshot: &'s TickSnapshot) -> Vec<&'s AgentView> {
        snapshot
            .neighbors(me.position, self.settings.cohesion_radius)
            .filter(|other| other.id != me.id && self.settings.accepts(me, other))
            .collect()
    }

    /// Separation first, then attraction to the centroid, then following a
    /// moving quorum. `None` when the agent has no flock or nothing to do.
    pub fn cohesion_vector(
        &self,
        me: &AgentView,
        snapshot: &TickSnapshot,
        target_speed: f32,
    ) -> Option<MovementIntent> {
        let s = self.settings;
        let members = self.members(me, snapshot);
        if members.is_empty() || members.len() < s.min_herd_size {
            return None;
        }

        let nearest = members
            .iter()
            .min_by_key(|other| (OrderedFloat(me.position.distance(&other.position)), other.id))?;
        let nearest_distance = me.position.distance(&nearest.position);
        if nearest_distance < s.min_separation {
            let away = me.position - nearest.position;
            let direction = if away.length() > 0.0001 {
                away.normalize()
            } else if me.id < nearest.id {
                Vec2::from_angle(0.0)
            } else {
                Vec2::from_angle(PI)
            };
            return Some(MovementIntent::new(
                nearest.position + direction * s.min_separation,
                target_speed * 0.5,
            ));
        }

        let centroid = Vec2::centroid(members.iter().map(|m| m.position))?;
        if me.position.distance(&centroid) > s.comfort_radius {
            return Some(MovementIntent::new(centroid, target_speed));
        }

        let moving: Vec<&&AgentView> = members
            .iter()
            .filter(|m| m.velocity.length() > s.movement_threshold)
            .collect();
        if !moving.is_empty() && moving.len() as f32 / members.len() as f32 >= s.quorum {
            let heading = moving
                .iter()
                .fold(Vec2::ZERO, |sum, m| sum + m.velocity)
                .normalize();
            if heading.length() > 0.0 {
                return Some(MovementIntent::new(
                    me.position + heading * s.comfort_radius,
                    target_speed * 0.5,
                ));
            }
        }

        None
    }

    /// The adult a juvenile should follow: its parent when in sight,
    /// otherwise the nearest adult of its species
    pub fn adult_to_follow<'s>(&self, me: &AgentView, snapshot: &'s TickSnapshot) -> Option<&'s AgentView> {
        let adults: Vec<&AgentView> = snapshot
            .neighbors(me.position, self.settings.follow_lost)
            .filter(|other| other.id != me.id && other.species == me.species && !other.juvenile)
            .collect();

        if let Some(parent) = me.parent {
            if let Some(found) = adults.iter().copied().find(|a| a.id == parent) {
                return Some(found);
            }
        }
        adults
            .into_iter()
            .min_by_key(|a| (OrderedFloat(me.position.distance(&a.position)), a.id))
    }

    /// Juvenile variant: head for an adult instead of the centroid
    pub fn follow_adult(
        &self,
        me: &AgentView,
        snapshot: &TickSnapshot,
        target_speed: f32,
    ) -> Option<MovementIntent> {
        let adult = self.adult_to_follow(me, snapshot)?;
        let distance = me.position.distance(&adult.position);
        if distance <= self.settings.follow_start {
            return None;
        }
        let toward = (adult.position - me.position).normalize();
        Some(MovementIntent::new(
            adult.position - toward * self.settings.follow_stop,
            target_speed,
        ))
    }
}
