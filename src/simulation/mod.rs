pub mod behaviors;
pub mod flock;
pub mod goal;
pub mod pack_hunt;
pub mod predator;
pub mod scheduler;
pub mod snapshot;
pub mod tick;

pub use flock::{FlockCohesionEngine, FlockSettings};
pub use goal::{Goal, GoalBehavior, GoalContext, GoalKind, GoalOutput, GoalRuntime, PriorityLevel};
pub use pack_hunt::{PackHuntCoordinator, PackHuntPlan, PackPlans};
pub use predator::{PredatorTargetSelector, PreyFilter};
pub use scheduler::{AgentDecision, PriorityGoalScheduler};
pub use snapshot::{AgentView, TickSnapshot};
pub use tick::{run_behavior_tick, SimulationEvent, TickReport};
