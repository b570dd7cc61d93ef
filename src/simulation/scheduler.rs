//! Priority goal selection
//!
//! Every tick the scheduler walks the agent's goals in band order and runs
//! the first whose precondition holds. A higher band preempts whatever was
//! running on the same tick; ties within a band go to registration order.

use crate::core::error::{BehaviorError, Result};
use crate::core::types::{EntityId, Tick};
use crate::entity::agent::Agent;
use crate::entity::needs::HasNeeds;
use crate::entity::species::SpeciesProfile;
use crate::simulation::goal::{Goal, GoalContext, GoalKind, PriorityLevel};
use crate::world::{EffectRequest, MovementIntent};

/// What one agent decided this tick
#[derive(Debug)]
pub struct AgentDecision {
    pub agent: EntityId,
    pub goal: Option<GoalKind>,
    pub priority: Option<PriorityLevel>,
    pub intent: Option<MovementIntent>,
    pub effects: Vec<EffectRequest>,
    /// Errors handled inside this evaluation
    pub recovered: Vec<BehaviorError>,
}

impl AgentDecision {
    fn idle(agent: EntityId) -> Self {
        Self {
            agent,
            goal: None,
            priority: None,
            intent: None,
            effects: Vec::new(),
            recovered: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PriorityGoalScheduler {
    goals: Vec<Goal>,
}

impl PriorityGoalScheduler {
    pub fn new(mut goals: Vec<Goal>) -> Self {
        // Stable: equal bands keep registration order
        goals.sort_by_key(|goal| goal.priority);
        Self { goals }
    }

    /// Built-in goals listed by a species profile
    pub fn from_profile(profile: &SpeciesProfile) -> Self {
        Self::new(profile.goals.iter().map(|&kind| Goal::standard(kind)).collect())
    }

    /// Register one more goal behind any already in its band
    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goals.push(goal);
        Self::new(self.goals)
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// Index of the goal that should run now, if any
    pub fn select(&self, agent: &Agent, ctx: &GoalContext<'_>) -> Option<usize> {
        (0..self.goals.len()).find(|&index| self.check(index, agent, ctx).is_ok())
    }

    /// Whether the goal of `kind` could run for this agent right now
    pub fn precondition(&self, agent: &Agent, kind: GoalKind, ctx: &GoalContext<'_>) -> Result<()> {
        let index = self
            .goals
            .iter()
            .position(|goal| goal.kind == kind)
            .ok_or(BehaviorError::PreconditionUnmet(kind))?;
        self.check(index, agent, ctx)
    }

    fn check(&self, index: usize, agent: &Agent, ctx: &GoalContext<'_>) -> Result<()> {
        let goal = &self.goals[index];
        if agent.runtime.is_suppressed(goal.kind, ctx.tick) || !goal.behavior.can_use(agent, ctx) {
            return Err(BehaviorError::PreconditionUnmet(goal.kind));
        }
        Ok(())
    }

    /// Select, switch and tick the agent's goal for this tick
    pub fn evaluate(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> AgentDecision {
        agent.runtime.prune(ctx.tick);
        let selected = self.select(agent, ctx);
        let previous = agent.runtime.active.filter(|&i| i < self.goals.len());

        if previous != selected {
            if let Some(i) = previous {
                tracing::debug!(
                    "{:?} {:?}: {:?} -> {:?}",
                    agent.species,
                    agent.id,
                    self.goals[i].kind,
                    selected.map(|s| self.goals[s].kind)
                );
                self.goals[i].behavior.stop(agent);
            }
            agent.runtime.active = selected;
            if let Some(i) = selected {
                agent.runtime.active_since = ctx.tick;
                self.goals[i].behavior.start(agent, ctx);
            }
        }

        let mut decision = AgentDecision::idle(agent.id);
        let Some(index) = selected else {
            agent.needs_mut().set_fleeing(false);
            return decision;
        };

        let goal = &self.goals[index];
        agent.needs_mut().set_fleeing(goal.priority == PriorityLevel::Flee);
        decision.goal = Some(goal.kind);
        decision.priority = Some(goal.priority);

        match goal.behavior.tick(agent, ctx) {
            Ok(output) => {
                if output.done {
                    self.release(agent, index);
                }
                decision.intent = output.intent;
                decision.effects = output.effects;
            }
            Err(BehaviorError::TargetLost(target)) => {
                tracing::debug!("{:?} lost target {:?}", agent.id, target);
                agent.target = None;
                self.release(agent, index);
                decision.recovered.push(BehaviorError::TargetLost(target));
            }
            Err(err @ BehaviorError::NavigationUnreachable { .. }) => {
                agent
                    .runtime
                    .suppress(goal.kind, ctx.tick + ctx.config.unreachable_backoff_ticks);
                self.release(agent, index);
                decision.recovered.push(err);
            }
            Err(err) => {
                tracing::warn!("{:?} goal {:?} failed: {}", agent.id, goal.kind, err);
                self.release(agent, index);
                decision.recovered.push(err);
            }
        }

        decision
    }

    /// Navigation found no path for `kind`: stop it and keep it out of
    /// selection until the back-off expires
    pub fn report_unreachable(
        &self,
        agent: &mut Agent,
        kind: GoalKind,
        now: Tick,
        backoff: u64,
    ) -> BehaviorError {
        agent.runtime.suppress(kind, now + backoff);
        if let Some(index) = agent.runtime.active {
            if self.goals.get(index).map(|g| g.kind) == Some(kind) {
                self.release(agent, index);
            }
        }
        tracing::debug!("{:?} cannot reach target of {:?}, backing off", agent.id, kind);
        BehaviorError::NavigationUnreachable {
            agent: agent.id,
            goal: kind,
        }
    }

    fn release(&self, agent: &mut Agent, index: usize) {
        self.goals[index].behavior.stop(agent);
        agent.runtime.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{Species, Vec2};
    use crate::rules::thresholds::ThresholdSet;
    use crate::simulation::goal::{GoalBehavior, GoalOutput};
    use crate::simulation::pack_hunt::PackPlans;
    use crate::simulation::snapshot::TickSnapshot;
    use crate::world::SandboxWorld;
    use crate::entity::needs::NeedsState;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Outcome {
        Run,
        LoseTarget,
        Unreachable,
    }

    #[derive(Debug)]
    struct Probe {
        name: &'static str,
        enabled: Arc<AtomicBool>,
        outcome: Outcome,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl GoalBehavior for Probe {
        fn can_use(&self, _agent: &Agent, _ctx: &GoalContext<'_>) -> bool {
            self.enabled.load(Ordering::SeqCst)
        }

        fn start(&self, _agent: &mut Agent, _ctx: &GoalContext<'_>) {
            self.log.lock().unwrap().push(format!("start {}", self.name));
        }

        fn tick(&self, agent: &mut Agent, _ctx: &GoalContext<'_>) -> Result<GoalOutput> {
            match self.outcome {
                Outcome::Run => Ok(GoalOutput::moving(MovementIntent::new(Vec2::new(1.0, 0.0), 1.0))),
                Outcome::LoseTarget => Err(BehaviorError::TargetLost(agent.target.unwrap_or(agent.id))),
                Outcome::Unreachable => Err(BehaviorError::NavigationUnreachable {
                    agent: agent.id,
                    goal: GoalKind::Custom(self.name),
                }),
            }
        }

        fn stop(&self, _agent: &mut Agent) {
            self.log.lock().unwrap().push(format!("stop {}", self.name));
        }
    }

    struct Harness {
        log: Arc<Mutex<Vec<String>>>,
        switches: Vec<Arc<AtomicBool>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                log: Arc::new(Mutex::new(Vec::new())),
                switches: Vec::new(),
            }
        }

        fn goal(&mut self, name: &'static str, band: PriorityLevel, on: bool, outcome: Outcome) -> Goal {
            let enabled = Arc::new(AtomicBool::new(on));
            self.switches.push(Arc::clone(&enabled));
            Goal::new(
                GoalKind::Custom(name),
                band,
                Arc::new(Probe {
                    name,
                    enabled,
                    outcome,
                    log: Arc::clone(&self.log),
                }),
            )
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    fn agent(scheduler: &Arc<PriorityGoalScheduler>) -> Agent {
        let config = SimulationConfig::default();
        let profile = Arc::new(SpeciesProfile::builtin(Species::Wolf, &config));
        Agent::new(
            crate::core::types::EntityId::from_u128(1),
            Vec2::ZERO,
            NeedsState::new(ThresholdSet::default()),
            profile,
            Arc::clone(scheduler),
        )
    }

    fn run(scheduler: &PriorityGoalScheduler, agent: &mut Agent, tick: Tick) -> AgentDecision {
        let config = SimulationConfig::default();
        let snapshot = TickSnapshot::from_views(tick, 16.0, Vec::new());
        let world = SandboxWorld::new();
        let plans = PackPlans::new();
        let ctx = GoalContext {
            tick,
            snapshot: &snapshot,
            world: &world,
            config: &config,
            plans: &plans,
        };
        scheduler.evaluate(agent, &ctx)
    }

    #[test]
    fn test_flee_preempts_hunt_within_one_tick() {
        let mut h = Harness::new();
        let scheduler = Arc::new(PriorityGoalScheduler::new(vec![
            h.goal("social", PriorityLevel::Social, true, Outcome::Run),
            h.goal("hunt", PriorityLevel::Hunt, true, Outcome::Run),
            h.goal("flee", PriorityLevel::Flee, false, Outcome::Run),
        ]));
        let mut wolf = agent(&scheduler);

        let decision = run(&scheduler, &mut wolf, 0);
        assert_eq!(decision.goal, Some(GoalKind::Custom("hunt")));
        assert!(!wolf.needs().is_fleeing());

        // The threat appears
        h.switches[2].store(true, Ordering::SeqCst);
        let decision = run(&scheduler, &mut wolf, 1);
        assert_eq!(decision.goal, Some(GoalKind::Custom("flee")));
        assert_eq!(decision.priority, Some(PriorityLevel::Flee));
        assert!(wolf.needs().is_fleeing());
        assert_eq!(h.log(), vec!["start hunt", "stop hunt", "start flee"]);

        // And leaves again
        h.switches[2].store(false, Ordering::SeqCst);
        run(&scheduler, &mut wolf, 2);
        assert_eq!(wolf.active_goal(), Some(GoalKind::Custom("hunt")));
        assert!(!wolf.needs().is_fleeing());
    }

    #[test]
    fn test_ties_follow_registration_order() {
        let mut h = Harness::new();
        let scheduler = Arc::new(PriorityGoalScheduler::new(vec![
            h.goal("idle", PriorityLevel::Idle, true, Outcome::Run),
            h.goal("drink", PriorityLevel::Normal, true, Outcome::Run),
            h.goal("eat", PriorityLevel::Normal, true, Outcome::Run),
        ]));
        let mut cow = agent(&scheduler);
        assert_eq!(run(&scheduler, &mut cow, 0).goal, Some(GoalKind::Custom("drink")));

        h.switches[1].store(false, Ordering::SeqCst);
        assert_eq!(run(&scheduler, &mut cow, 1).goal, Some(GoalKind::Custom("eat")));
    }

    #[test]
    fn test_nothing_selectable_stays_idle() {
        let mut h = Harness::new();
        let scheduler = Arc::new(PriorityGoalScheduler::new(vec![h.goal(
            "hunt",
            PriorityLevel::Hunt,
            false,
            Outcome::Run,
        )]));
        let mut wolf = agent(&scheduler);
        let decision = run(&scheduler, &mut wolf, 0);
        assert!(decision.goal.is_none());
        assert!(decision.intent.is_none());
    }

    #[test]
    fn test_target_lost_clears_target() {
        let mut h = Harness::new();
        let scheduler = Arc::new(PriorityGoalScheduler::new(vec![h.goal(
            "chase",
            PriorityLevel::Hunt,
            true,
            Outcome::LoseTarget,
        )]));
        let mut wolf = agent(&scheduler);
        wolf.target = Some(crate::core::types::EntityId::from_u128(9));

        let decision = run(&scheduler, &mut wolf, 0);
        assert!(matches!(decision.recovered[..], [BehaviorError::TargetLost(_)]));
        assert!(wolf.target.is_none());
        assert!(wolf.active_goal().is_none());
        assert_eq!(h.log(), vec!["start chase", "stop chase"]);
    }

    #[test]
    fn test_unreachable_falls_through_until_backoff_expires() {
        let mut h = Harness::new();
        let scheduler = Arc::new(PriorityGoalScheduler::new(vec![
            h.goal("water", PriorityLevel::Normal, true, Outcome::Unreachable),
            h.goal("wander", PriorityLevel::Idle, true, Outcome::Run),
        ]));
        let mut cow = agent(&scheduler);
        let backoff = SimulationConfig::default().unreachable_backoff_ticks;

        let first = run(&scheduler, &mut cow, 0);
        assert_eq!(first.goal, Some(GoalKind::Custom("water")));
        assert!(first.intent.is_none());

        let next = run(&scheduler, &mut cow, 1);
        assert_eq!(next.goal, Some(GoalKind::Custom("wander")));

        let later = run(&scheduler, &mut cow, backoff);
        assert_eq!(later.goal, Some(GoalKind::Custom("water")));
    }

    #[test]
    fn test_precondition_reports_unmet_goals() {
        let mut h = Harness::new();
        let scheduler = Arc::new(PriorityGoalScheduler::new(vec![
            h.goal("drink", PriorityLevel::Normal, false, Outcome::Run),
            h.goal("wander", PriorityLevel::Idle, true, Outcome::Run),
        ]));
        let cow = agent(&scheduler);
        let config = SimulationConfig::default();
        let snapshot = TickSnapshot::from_views(0, 16.0, Vec::new());
        let world = SandboxWorld::new();
        let plans = PackPlans::new();
        let ctx = GoalContext {
            tick: 0,
            snapshot: &snapshot,
            world: &world,
            config: &config,
            plans: &plans,
        };

        assert!(matches!(
            scheduler.precondition(&cow, GoalKind::Custom("drink"), &ctx),
            Err(BehaviorError::PreconditionUnmet(GoalKind::Custom("drink")))
        ));
        assert!(scheduler.precondition(&cow, GoalKind::Custom("wander"), &ctx).is_ok());
        assert!(scheduler.precondition(&cow, GoalKind::Hunt, &ctx).is_err());
    }

    #[test]
    fn test_report_unreachable_stops_active_goal() {
        let mut h = Harness::new();
        let scheduler = Arc::new(PriorityGoalScheduler::new(vec![
            h.goal("graze", PriorityLevel::Normal, true, Outcome::Run),
            h.goal("wander", PriorityLevel::Idle, true, Outcome::Run),
        ]));
        let mut sheep = agent(&scheduler);
        run(&scheduler, &mut sheep, 0);

        let err = scheduler.report_unreachable(&mut sheep, GoalKind::Custom("graze"), 0, 20);
        assert!(matches!(err, BehaviorError::NavigationUnreachable { .. }));
        assert!(sheep.active_goal().is_none());
        assert_eq!(run(&scheduler, &mut sheep, 1).goal, Some(GoalKind::Custom("wander")));
    }

    #[test]
    fn test_with_goal_keeps_band_order() {
        let mut h = Harness::new();
        let scheduler = PriorityGoalScheduler::new(vec![
            h.goal("a", PriorityLevel::Normal, true, Outcome::Run),
            h.goal("z", PriorityLevel::Idle, true, Outcome::Run),
        ])
        .with_goal(h.goal("b", PriorityLevel::Normal, true, Outcome::Run));
        let kinds: Vec<GoalKind> = scheduler.goals().iter().map(|g| g.kind).collect();
        assert_eq!(
            kinds,
            vec![GoalKind::Custom("a"), GoalKind::Custom("b"), GoalKind::Custom("z")]
        );
    }
}
