//! Fauna - emergent animal behavior core
//!
//! Per-agent needs, a priority goal scheduler, herd cohesion, predator
//! targeting and pack hunting. The host world is reached through the traits
//! in [`world`].

pub mod core;
pub mod ecs;
pub mod entity;
pub mod rules;
pub mod simulation;
pub mod spatial;
pub mod world;

pub use crate::core::{BehaviorError, EntityId, Result, SimulationConfig, Species, Vec2};
pub use crate::ecs::Ecosystem;
pub use crate::simulation::{run_behavior_tick, TickReport};
