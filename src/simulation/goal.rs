//! Goal descriptors and their priority bands
//!
//! A goal is a stateless descriptor: a kind, a fixed priority band and a
//! behavior with precondition and start/tick/stop lifecycle. Anything a goal
//! needs to remember between ticks lives in the agent's `GoalRuntime`.

use derive_more::Display;
use std::fmt;
use std::sync::Arc;

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{PackId, Tick, Vec2};
use crate::entity::agent::Agent;
use crate::simulation::pack_hunt::PackPlans;
use crate::simulation::snapshot::TickSnapshot;
use crate::world::{EffectRequest, MovementIntent, WorldQuery};

/// Priority bands, lower value wins
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PriorityLevel {
    #[display(fmt = "FLEE")]
    Flee = 1,
    #[display(fmt = "CRITICAL")]
    Critical = 2,
    #[display(fmt = "NORMAL")]
    Normal = 3,
    #[display(fmt = "HUNT")]
    Hunt = 4,
    #[display(fmt = "SOCIAL")]
    Social = 5,
    #[display(fmt = "IDLE")]
    Idle = 6,
}

impl PriorityLevel {
    pub fn value(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoalKind {
    FleePredator,
    Retreat,
    ProtectOffspring,
    SeekWater,
    SeekFood,
    PickUpFood,
    EatCarried,
    Hunt,
    PackHunt,
    HerdCohesion,
    ShareFood,
    Wander,
    /// Host-defined goals registered next to the built-in ones
    Custom(&'static str),
}

impl GoalKind {
    /// Band a built-in goal is registered in
    pub fn default_priority(self) -> PriorityLevel {
        match self {
            GoalKind::FleePredator | GoalKind::Retreat => PriorityLevel::Flee,
            GoalKind::ProtectOffspring => PriorityLevel::Critical,
            GoalKind::SeekWater
            | GoalKind::SeekFood
            | GoalKind::PickUpFood
            | GoalKind::EatCarried => PriorityLevel::Normal,
            GoalKind::Hunt | GoalKind::PackHunt => PriorityLevel::Hunt,
            GoalKind::HerdCohesion | GoalKind::ShareFood => PriorityLevel::Social,
            GoalKind::Wander | GoalKind::Custom(_) => PriorityLevel::Idle,
        }
    }
}

/// Everything a goal may read while deciding or executing
pub struct GoalContext<'a> {
    pub tick: Tick,
    pub snapshot: &'a TickSnapshot,
    pub world: &'a dyn WorldQuery,
    pub config: &'a SimulationConfig,
    pub plans: &'a PackPlans,
}

/// Result of one goal tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalOutput {
    /// The goal has finished and should be released
    pub done: bool,
    pub intent: Option<MovementIntent>,
    pub effects: Vec<EffectRequest>,
}

impl GoalOutput {
    pub fn moving(intent: MovementIntent) -> Self {
        Self {
            intent: Some(intent),
            ..Default::default()
        }
    }

    /// Still running, standing still
    pub fn holding() -> Self {
        Self::default()
    }

    pub fn finished() -> Self {
        Self {
            done: true,
            ..Default::default()
        }
    }

    pub fn with_effect(mut self, effect: EffectRequest) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Executable part of a goal
pub trait GoalBehavior: Send + Sync + fmt::Debug {
    /// Whether the goal may run this tick
    fn can_use(&self, agent: &Agent, ctx: &GoalContext<'_>) -> bool;

    fn start(&self, _agent: &mut Agent, _ctx: &GoalContext<'_>) {}

    fn tick(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> Result<GoalOutput>;

    fn stop(&self, _agent: &mut Agent) {}
}

/// A behavior bound to its priority band
#[derive(Debug, Clone)]
pub struct Goal {
    pub kind: GoalKind,
    pub priority: PriorityLevel,
    pub behavior: Arc<dyn GoalBehavior>,
}

impl Goal {
    pub fn new(kind: GoalKind, priority: PriorityLevel, behavior: Arc<dyn GoalBehavior>) -> Self {
        Self {
            kind,
            priority,
            behavior,
        }
    }

    /// Built-in goal at its default band
    pub fn standard(kind: GoalKind) -> Self {
        Self::new(kind, kind.default_priority(), crate::simulation::behaviors::behavior_for(kind))
    }
}

/// Goal-scoped memory carried by each agent between ticks
#[derive(Debug, Clone, Default)]
pub struct GoalRuntime {
    /// Index of the active goal in the agent's scheduler
    pub active: Option<usize>,
    pub active_since: Tick,
    suppressed: Vec<(GoalKind, Tick)>,
    pub attack_cooldown: u32,
    pub eat_progress: u32,
    pub wander_target: Option<Vec2>,
    pub next_wander: Tick,
    /// Hunt plan (pack, formation tick) under which the flanker reached its bearing
    pub flank_positioned: Option<(PackId, Tick)>,
}

impl GoalRuntime {
    /// Keep `kind` from being selected before `until`
    pub fn suppress(&mut self, kind: GoalKind, until: Tick) {
        self.suppressed.retain(|(k, _)| *k != kind);
        self.suppressed.push((kind, until));
    }

    pub fn is_suppressed(&self, kind: GoalKind, now: Tick) -> bool {
        self.suppressed.iter().any(|(k, until)| *k == kind && now < *until)
    }

    pub fn prune(&mut self, now: Tick) {
        self.suppressed.retain(|(_, until)| now < *until);
    }

    pub fn tick_cooldowns(&mut self) {
        self.attack_cooldown = self.attack_cooldown.saturating_sub(1);
    }
}
