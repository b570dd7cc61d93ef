//! Tick system - advances every agent one behavior step
//!
//! needs update -> snapshot -> pack coordination -> goal evaluation ->
//! effect application -> navigation
//!
//! Evaluation reads only the snapshot taken before it, so agents can be
//! evaluated in parallel with rayon once the population is large enough.

use ahash::AHashSet;
use rayon::prelude::*;
use std::sync::Arc;

use crate::core::config::SimulationConfig;
use crate::core::error::BehaviorError;
use crate::core::types::{EntityId, Tick};
use crate::ecs::world::Ecosystem;
use crate::entity::agent::Agent;
use crate::entity::needs::{HasNeeds, NeedKind};
use crate::simulation::goal::{GoalContext, GoalKind, PriorityLevel};
use crate::simulation::scheduler::AgentDecision;
use crate::simulation::snapshot::TickSnapshot;
use crate::world::{EffectOutcome, EffectRequest, EffectSink, Navigation, NavigationStatus, WorldQuery};

/// Events generated during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    /// An agent switched to a different active goal
    GoalStarted {
        agent: EntityId,
        goal: GoalKind,
        priority: PriorityLevel,
        tick: Tick,
    },
    /// An agent's goal ended or was released with nothing to replace it
    GoalIdle {
        agent: EntityId,
        goal: GoalKind,
        /// Ticks the goal stayed active
        ran_for: Tick,
        tick: Tick,
    },
    /// A request went to the host
    Effect {
        request: EffectRequest,
        outcome: EffectOutcome,
    },
    /// An agent died and was removed
    Died {
        agent: EntityId,
        killer: Option<EntityId>,
    },
    /// A pack formed or refreshed its hunt plan
    HuntPlanned {
        alpha: EntityId,
        target: EntityId,
        participants: usize,
    },
}

/// Summary of one tick
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: Tick,
    pub evaluated: usize,
    pub intents_submitted: usize,
    pub events: Vec<SimulationEvent>,
    /// Errors the tick absorbed instead of propagating
    pub recovered: Vec<BehaviorError>,
}

impl TickReport {
    pub fn deaths(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.events.iter().filter_map(|event| match event {
            SimulationEvent::Died { agent, .. } => Some(*agent),
            _ => None,
        })
    }

    pub fn effects(&self) -> impl Iterator<Item = (&EffectRequest, EffectOutcome)> + '_ {
        self.events.iter().filter_map(|event| match event {
            SimulationEvent::Effect { request, outcome } => Some((request, *outcome)),
            _ => None,
        })
    }

    /// Goal an agent switched to this tick, if it switched
    pub fn started_goal(&self, agent: EntityId) -> Option<GoalKind> {
        self.events.iter().find_map(|event| match event {
            SimulationEvent::GoalStarted { agent: a, goal, .. } if *a == agent => Some(*goal),
            _ => None,
        })
    }
}

/// Run one behavior tick
///
/// Order:
/// 1. Decay needs, sync health, tick cooldowns, queue starvation damage
/// 2. Remove agents the host reports dead
/// 3. Capture the snapshot every evaluation reads
/// 4. Refresh pack hunt plans
/// 5. Evaluate each agent's goals (parallel above the configured threshold)
/// 6. Send effect requests to the host and fold back their outcomes
/// 7. Submit movement intents, backing off goals whose targets are unreachable
/// 8. Advance the tick counter
pub fn run_behavior_tick<W, N>(eco: &mut Ecosystem, world: &mut W, nav: &mut N) -> TickReport
where
    W: WorldQuery + EffectSink,
    N: Navigation,
{
    let tick = eco.current_tick;
    let mut report = TickReport {
        tick,
        ..Default::default()
    };

    let starvation = update_needs(eco, &*world, &mut report);
    remove_dead(eco, &mut report);

    let snapshot = eco.snapshot();
    let previous_plans: Vec<_> = eco.coordinator.plans().values().map(|p| (p.pack_id, p.formed_at)).collect();
    eco.coordinator.refresh(&snapshot, &*world, &eco.profiles);
    for plan in eco.coordinator.plans().values() {
        if !previous_plans.contains(&(plan.pack_id, plan.formed_at)) {
            report.events.push(SimulationEvent::HuntPlanned {
                alpha: plan.alpha,
                target: plan.target,
                participants: plan.participants(),
            });
        }
    }

    let decisions = evaluate_agents(eco, &snapshot, &*world, &mut report);

    let requests = starvation
        .into_iter()
        .chain(decisions.iter().flat_map(|d| d.effects.iter().cloned()))
        .collect::<Vec<_>>();
    apply_effects(eco, world, requests, &mut report);

    submit_intents(eco, nav, &decisions, &mut report);

    eco.current_tick += 1;
    tracing::debug!(
        "Tick {} evaluated {} agents, {} events, {} recovered errors",
        tick,
        report.evaluated,
        report.events.len(),
        report.recovered.len()
    );
    report
}

/// Per-agent needs step; returns the starvation damage to request
fn update_agent(
    agent: &mut Agent,
    world: &dyn WorldQuery,
    config: &SimulationConfig,
    tick: Tick,
) -> (Option<EffectRequest>, Option<BehaviorError>) {
    let id = agent.id;
    if let Some(health) = world.health_fraction(id) {
        agent.health = health.clamp(0.0, 1.0);
    }

    let (hunger_loss, thirst_loss) = {
        let profile = agent.profile();
        (profile.hunger_decay * config.tick_dt, profile.thirst_decay * config.tick_dt)
    };
    let health = agent.health;
    let needs = agent.needs_mut();
    needs.decay(hunger_loss, thirst_loss);
    needs.set_retreating(health, config.retreat_health_fraction);
    let repaired = needs.ensure_consistent(id).err();

    needs.advance_starvation();
    let starvation = needs
        .starvation_due(config.starvation_grace_ticks, config.starvation_damage_interval)
        .then_some(EffectRequest::StarvationDamage {
            agent: id,
            amount: config.starvation_damage,
        });

    agent.runtime.tick_cooldowns();
    if let Some(membership) = agent.pack.as_mut() {
        membership.tick_cooldown();
    }
    agent.tick_extensions(tick);

    (starvation, repaired)
}

fn update_needs(eco: &mut Ecosystem, world: &dyn WorldQuery, report: &mut TickReport) -> Vec<EffectRequest> {
    let tick = eco.current_tick;
    let config = &eco.config;
    let results: Vec<_> = if eco.agents.len() >= config.parallel_threshold {
        eco.agents
            .par_iter_mut()
            .map(|agent| update_agent(agent, world, config, tick))
            .collect()
    } else {
        eco.agents
            .iter_mut()
            .map(|agent| update_agent(agent, world, config, tick))
            .collect()
    };

    let mut starvation = Vec::new();
    for (request, repaired) in results {
        starvation.extend(request);
        if let Some(error) = repaired {
            tracing::warn!("{}", error);
            report.recovered.push(error);
        }
    }
    starvation
}

fn remove_dead(eco: &mut Ecosystem, report: &mut TickReport) {
    let dead: Vec<EntityId> = eco
        .agents
        .iter()
        .filter(|agent| !agent.is_alive())
        .map(|agent| agent.id)
        .collect();
    for id in dead {
        eco.despawn(id);
        report.events.push(SimulationEvent::Died { agent: id, killer: None });
    }
}

fn evaluate_agents(
    eco: &mut Ecosystem,
    snapshot: &TickSnapshot,
    world: &dyn WorldQuery,
    report: &mut TickReport,
) -> Vec<AgentDecision> {
    let ctx = GoalContext {
        tick: eco.current_tick,
        snapshot,
        world,
        config: &eco.config,
        plans: eco.coordinator.plans(),
    };

    let evaluate = |agent: &mut Agent| {
        let before = agent.active_goal();
        let scheduler = Arc::clone(agent.scheduler());
        let decision = scheduler.evaluate(agent, &ctx);
        let still_active = agent.active_goal().is_some();
        (before, still_active, agent.runtime.active_since, decision)
    };

    let results: Vec<_> = if eco.agents.len() >= ctx.config.parallel_threshold {
        eco.agents.par_iter_mut().map(evaluate).collect()
    } else {
        eco.agents.iter_mut().map(evaluate).collect()
    };

    report.evaluated = results.len();
    let mut decisions = Vec::with_capacity(results.len());
    for (before, still_active, since, mut decision) in results {
        if let (Some(goal), Some(priority)) = (decision.goal, decision.priority) {
            if before != Some(goal) {
                report.events.push(SimulationEvent::GoalStarted {
                    agent: decision.agent,
                    goal,
                    priority,
                    tick: ctx.tick,
                });
            }
        }
        // Finished, released after an error, or preempted by nothing
        if let Some(goal) = decision.goal.or(before).filter(|_| !still_active) {
            report.events.push(SimulationEvent::GoalIdle {
                agent: decision.agent,
                goal,
                ran_for: ctx.tick.saturating_sub(since),
                tick: ctx.tick,
            });
        }
        report.recovered.append(&mut decision.recovered);
        decisions.push(decision);
    }
    decisions
}

fn apply_effects<W: EffectSink>(
    eco: &mut Ecosystem,
    world: &mut W,
    requests: Vec<EffectRequest>,
    report: &mut TickReport,
) {
    let mut killed: Vec<(EntityId, Option<EntityId>)> = Vec::new();
    let mut seen: AHashSet<EntityId> = AHashSet::new();

    for request in requests {
        let outcome = world.apply(&request);
        match (&request, outcome) {
            (EffectRequest::Attack { attacker, .. }, EffectOutcome::Killed { target }) => {
                let nutrition = eco.config.kill_nutrition;
                if let Some(hunter) = eco.get_mut(*attacker) {
                    hunter.needs_mut().restore(NeedKind::Hunger, nutrition);
                    hunter.target = None;
                }
                if seen.insert(target) {
                    killed.push((target, Some(*attacker)));
                }
            }
            (_, EffectOutcome::Killed { target }) => {
                if seen.insert(target) {
                    killed.push((target, None));
                }
            }
            (EffectRequest::ShareFood { to, nutrition, .. }, EffectOutcome::Applied) => {
                if let Some(receiver) = eco.get_mut(*to) {
                    receiver.needs_mut().restore(NeedKind::Hunger, *nutrition);
                }
            }
            (EffectRequest::RemoveWorldItem { agent, item }, EffectOutcome::Ignored) => {
                // Someone else got there first
                if let Some(picker) = eco.get_mut(*agent) {
                    if picker.carried.held().map(|held| held.id) == Some(*item) {
                        picker.carried.consume();
                    }
                }
            }
            _ => {}
        }
        report.events.push(SimulationEvent::Effect { request, outcome });
    }

    for (agent, killer) in killed {
        if eco.despawn(agent).is_some() {
            report.events.push(SimulationEvent::Died { agent, killer });
        }
    }
}

fn submit_intents<N: Navigation>(
    eco: &mut Ecosystem,
    nav: &mut N,
    decisions: &[AgentDecision],
    report: &mut TickReport,
) {
    let tick = eco.current_tick;
    let backoff = eco.config.unreachable_backoff_ticks;

    for decision in decisions {
        let Some(agent) = eco.get_mut(decision.agent) else {
            nav.stop(decision.agent);
            continue;
        };
        let Some(intent) = decision.intent else {
            nav.stop(agent.id);
            continue;
        };

        report.intents_submitted += 1;
        if nav.submit(agent.id, agent.position, &intent) == NavigationStatus::Unreachable {
            if let Some(goal) = decision.goal {
                let scheduler = Arc::clone(agent.scheduler());
                report
                    .recovered
                    .push(scheduler.report_unreachable(agent, goal, tick, backoff));
            }
        }
    }
}
