//! Built-in goal behaviors
//!
//! Each behavior is a unit struct; species differences come from the agent's
//! profile and goal-local memory lives in `GoalRuntime`.

use ordered_float::OrderedFloat;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f32::consts::TAU;
use std::sync::Arc;

use crate::core::error::{BehaviorError, Result};
use crate::core::types::Vec2;
use crate::entity::agent::Agent;
use crate::entity::needs::{HasNeeds, NeedKind};
use crate::entity::pack::are_packmates;
use crate::simulation::flock::FlockCohesionEngine;
use crate::simulation::goal::{GoalBehavior, GoalContext, GoalKind, GoalOutput};
use crate::simulation::snapshot::AgentView;
use crate::world::{EffectRequest, MovementIntent};

/// Behavior registered for a built-in goal kind
pub fn behavior_for(kind: GoalKind) -> Arc<dyn GoalBehavior> {
    match kind {
        GoalKind::FleePredator => Arc::new(FleePredator),
        GoalKind::Retreat => Arc::new(Retreat),
        GoalKind::ProtectOffspring => Arc::new(ProtectOffspring),
        GoalKind::SeekWater => Arc::new(SeekWater),
        GoalKind::SeekFood => Arc::new(SeekFood),
        GoalKind::PickUpFood => Arc::new(PickUpFood),
        GoalKind::EatCarried => Arc::new(EatCarried),
        GoalKind::Hunt => Arc::new(Hunt),
        GoalKind::PackHunt => Arc::new(PackHunt),
        GoalKind::HerdCohesion => Arc::new(HerdCohesion),
        GoalKind::ShareFood => Arc::new(ShareFood),
        GoalKind::Wander => Arc::new(Wander),
        GoalKind::Custom(_) => Arc::new(Inert),
    }
}

// === SHARED HELPERS ===

fn nearest<'s>(from: Vec2, candidates: impl Iterator<Item = &'s AgentView>) -> Option<&'s AgentView> {
    candidates.min_by_key(|v| (OrderedFloat(from.distance(&v.position)), v.id))
}

/// Nearest agent the agent's species fears within `radius` of `center`
fn predator_near<'a>(
    agent: &Agent,
    ctx: &GoalContext<'a>,
    center: Vec2,
    radius: f32,
) -> Option<&'a AgentView> {
    let profile = agent.profile();
    nearest(
        center,
        ctx.snapshot.neighbors(center, radius).filter(|v| {
            v.id != agent.id
                && profile.fears(v.species)
                && !are_packmates(agent.pack.as_ref(), v.pack.as_ref())
        }),
    )
}

/// Nearest non-packmate currently targeting the agent
fn attacker_near<'a>(agent: &Agent, ctx: &GoalContext<'a>, radius: f32) -> Option<&'a AgentView> {
    nearest(
        agent.position,
        ctx.snapshot.neighbors(agent.position, radius).filter(|v| {
            v.target == Some(agent.id) && !are_packmates(agent.pack.as_ref(), v.pack.as_ref())
        }),
    )
}

/// Point `distance` away from `threat`, straight through `from`
fn flee_point(from: Vec2, threat: Vec2, distance: f32) -> Vec2 {
    let away = (from - threat).normalize();
    let direction = if away.length() > 0.0 { away } else { Vec2::from_angle(0.0) };
    from + direction * distance
}

/// Close in on prey, attacking when in range and off cooldown
fn strike(agent: &mut Agent, prey: &AgentView, ctx: &GoalContext<'_>) -> GoalOutput {
    let output = GoalOutput::moving(MovementIntent::new(prey.position, ctx.config.hunt_speed));
    let in_range = agent.position.distance(&prey.position) <= ctx.config.strike_range;
    if in_range && agent.runtime.attack_cooldown == 0 {
        agent.runtime.attack_cooldown = ctx.config.attack_cooldown_ticks;
        return output.with_effect(EffectRequest::Attack {
            attacker: agent.id,
            target: prey.id,
        });
    }
    output
}

// === FLEE BAND ===

#[derive(Debug)]
pub struct FleePredator;

impl GoalBehavior for FleePredator {
    fn can_use(&self, agent: &Agent, ctx: &GoalContext<'_>) -> bool {
        predator_near(agent, ctx, agent.position, ctx.config.flee_radius).is_some()
    }

    fn start(&self, agent: &mut Agent, _ctx: &GoalContext<'_>) {
        agent.target = None;
    }

    fn tick(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> Result<GoalOutput> {
        let Some(threat) = predator_near(agent, ctx, agent.position, ctx.config.flee_radius) else {
            return Ok(GoalOutput::finished());
        };
        let target = flee_point(agent.position, threat.position, ctx.config.flee_distance);
        Ok(GoalOutput::moving(MovementIntent::new(target, ctx.config.flee_speed)))
    }
}

/// Low-health disengagement from whoever is attacking
#[derive(Debug)]
pub struct Retreat;

impl Retreat {
    fn threat<'a>(agent: &Agent, ctx: &GoalContext<'a>) -> Option<&'a AgentView> {
        attacker_near(agent, ctx, ctx.config.search_radius)
            .or_else(|| predator_near(agent, ctx, agent.position, ctx.config.flee_radius))
    }
}

impl GoalBehavior for Retreat {
    fn can_use(&self, agent: &Agent, ctx: &GoalContext<'_>) -> bool {
        agent.needs().is_retreating() && Self::threat(agent, ctx).is_some()
    }

    fn start(&self, agent: &mut Agent, _ctx: &GoalContext<'_>) {
        agent.target = None;
    }

    fn tick(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> Result<GoalOutput> {
        let Some(threat) = Self::threat(agent, ctx) else {
            return Ok(GoalOutput::finished());
        };
        let target = flee_point(agent.position, threat.position, ctx.config.flee_distance);
        Ok(GoalOutput::moving(MovementIntent::new(target, ctx.config.flee_speed)))
    }
}

// === CRITICAL BAND ===

/// Put the parent between its young and the nearest predator
#[derive(Debug)]
pub struct ProtectOffspring;

impl ProtectOffspring {
    fn threatened_young<'a>(agent: &Agent, ctx: &GoalContext<'a>) -> Option<(&'a AgentView, &'a AgentView)> {
        if !agent.profile().protects_young || agent.juvenile {
            return None;
        }
        let radius = ctx.config.protect_radius;
        ctx.snapshot
            .neighbors(agent.position, radius)
            .filter(|v| v.juvenile && v.parent == Some(agent.id))
            .find_map(|young| predator_near(agent, ctx, young.position, radius).map(|threat| (young, threat)))
    }
}

impl GoalBehavior for ProtectOffspring {
    fn can_use(&self, agent: &Agent, ctx: &GoalContext<'_>) -> bool {
        Self::threatened_young(agent, ctx).is_some()
    }

    fn tick(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> Result<GoalOutput> {
        let Some((young, threat)) = Self::threatened_young(agent, ctx) else {
            return Ok(GoalOutput::finished());
        };
        let toward_threat = (threat.position - young.position).normalize();
        let guard = young.position + toward_threat * (ctx.config.interact_distance * 2.0);
        agent.target = Some(threat.id);
        Ok(GoalOutput::moving(MovementIntent::new(guard, ctx.config.flee_speed)))
    }

    fn stop(&self, agent: &mut Agent) {
        agent.target = None;
    }
}

// === NORMAL BAND ===

#[derive(Debug)]
pub struct SeekWater;

impl GoalBehavior for SeekWater {
    fn can_use(&self, agent: &Agent, ctx: &GoalContext<'_>) -> bool {
        agent.profile().thirst_decay > 0.0
            && agent.needs().is_thirsty()
            && ctx
                .world
                .nearest_water(agent.position, ctx.config.search_radius)
                .is_some()
    }

    fn tick(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> Result<GoalOutput> {
        let Some(water) = ctx.world.nearest_water(agent.position, ctx.config.search_radius) else {
            return Ok(GoalOutput::finished());
        };
        if agent.position.distance(&water) > ctx.config.interact_distance {
            return Ok(GoalOutput::moving(MovementIntent::new(water, ctx.config.walk_speed)));
        }

        agent
            .needs_mut()
            .restore(NeedKind::Thirst, ctx.config.drink_rate * ctx.config.tick_dt);
        if agent.needs().is_thirsty() {
            Ok(GoalOutput::holding())
        } else {
            Ok(GoalOutput::finished())
        }
    }
}

/// Grazing and foraging for non-predators
#[derive(Debug)]
pub struct SeekFood;

impl GoalBehavior for SeekFood {
    fn can_use(&self, agent: &Agent, ctx: &GoalContext<'_>) -> bool {
        let profile = agent.profile();
        !profile.is_predator()
            && agent.needs().is_hungry()
            && ctx
                .world
                .nearest_forage(agent.position, ctx.config.search_radius, profile.diet)
                .is_some()
    }

    fn tick(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> Result<GoalOutput> {
        let diet = agent.profile().diet;
        let Some(forage) = ctx
            .world
            .nearest_forage(agent.position, ctx.config.search_radius, diet)
        else {
            return Ok(GoalOutput::finished());
        };
        if agent.position.distance(&forage) > ctx.config.interact_distance {
            return Ok(GoalOutput::moving(MovementIntent::new(forage, ctx.config.walk_speed)));
        }

        agent
            .needs_mut()
            .restore(NeedKind::Hunger, ctx.config.graze_rate * ctx.config.tick_dt);
        let output = if agent.needs().is_hungry() {
            GoalOutput::holding()
        } else {
            GoalOutput::finished()
        };
        Ok(output.with_effect(EffectRequest::ConsumeForage {
            agent: agent.id,
            position: forage,
        }))
    }
}

#[derive(Debug)]
pub struct PickUpFood;

impl GoalBehavior for PickUpFood {
    fn can_use(&self, agent: &Agent, ctx: &GoalContext<'_>) -> bool {
        let profile = agent.profile();
        profile.carries_items
            && agent.carried.is_empty()
            && (agent.needs().is_hungry() || profile.forms_packs)
            && !ctx
                .world
                .food_items_near(agent.position, ctx.config.search_radius)
                .is_empty()
    }

    fn tick(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> Result<GoalOutput> {
        let from = agent.position;
        let Some(item) = ctx
            .world
            .food_items_near(from, ctx.config.search_radius)
            .into_iter()
            .min_by_key(|item| (OrderedFloat(from.distance(&item.position)), item.id))
        else {
            return Ok(GoalOutput::finished());
        };

        if from.distance(&item.position) > ctx.config.interact_distance {
            return Ok(GoalOutput::moving(MovementIntent::new(item.position, ctx.config.walk_speed)));
        }

        agent.carried.pick_up(&item, agent.id)?;
        tracing::debug!("{:?} picked up {} ({:?})", agent.id, item.kind, item.id);
        Ok(GoalOutput::finished().with_effect(EffectRequest::RemoveWorldItem {
            agent: agent.id,
            item: item.id,
        }))
    }
}

#[derive(Debug)]
pub struct EatCarried;

impl GoalBehavior for EatCarried {
    fn can_use(&self, agent: &Agent, _ctx: &GoalContext<'_>) -> bool {
        agent.profile().carries_items && !agent.carried.is_empty() && agent.needs().is_hungry()
    }

    fn start(&self, agent: &mut Agent, _ctx: &GoalContext<'_>) {
        agent.runtime.eat_progress = 0;
    }

    fn tick(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> Result<GoalOutput> {
        agent.runtime.eat_progress += 1;
        if agent.runtime.eat_progress < ctx.config.carried_eat_ticks {
            return Ok(GoalOutput::holding());
        }

        let Some(item) = agent.carried.consume() else {
            return Ok(GoalOutput::finished());
        };
        agent.needs_mut().restore(NeedKind::Hunger, item.nutrition);
        Ok(GoalOutput::finished().with_effect(EffectRequest::HealFromFeeding {
            agent: agent.id,
            amount: item.nutrition * ctx.config.feeding_heal_ratio,
        }))
    }

    fn stop(&self, agent: &mut Agent) {
        agent.runtime.eat_progress = 0;
    }
}

// === HUNT BAND ===

/// Solo hunting with the species' prey selector
#[derive(Debug)]
pub struct Hunt;

impl GoalBehavior for Hunt {
    fn can_use(&self, agent: &Agent, ctx: &GoalContext<'_>) -> bool {
        let Some(selector) = agent.profile().hunt.as_ref() else {
            return false;
        };
        agent.needs().wants_to_hunt()
            && (agent.target.is_some()
                || selector
                    .select_target(&AgentView::of(agent), ctx.snapshot, ctx.world)
                    .is_some())
    }

    fn tick(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> Result<GoalOutput> {
        let me = AgentView::of(agent);
        let profile = agent.profile();
        let Some(selector) = profile.hunt.as_ref() else {
            return Ok(GoalOutput::finished());
        };

        let target = match agent.target {
            Some(target) => target,
            None => match selector.select_target(&me, ctx.snapshot, ctx.world) {
                Some(target) => target,
                None => return Ok(GoalOutput::finished()),
            },
        };
        let prey = selector.revalidate(&me, target, ctx.snapshot)?;
        agent.target = Some(target);
        Ok(strike(agent, prey, ctx))
    }

    fn stop(&self, agent: &mut Agent) {
        agent.target = None;
    }
}

/// Take part in the pack's coordinated hunt
#[derive(Debug)]
pub struct PackHunt;

impl GoalBehavior for PackHunt {
    fn can_use(&self, agent: &Agent, ctx: &GoalContext<'_>) -> bool {
        agent
            .pack
            .and_then(|pack| ctx.plans.get(&pack.pack_id))
            .is_some_and(|plan| plan.includes(agent.id))
    }

    fn tick(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> Result<GoalOutput> {
        let Some(plan) = agent.pack.and_then(|pack| ctx.plans.get(&pack.pack_id)) else {
            return Ok(GoalOutput::finished());
        };
        let prey = ctx
            .snapshot
            .get(plan.target)
            .filter(|prey| prey.is_alive())
            .ok_or(BehaviorError::TargetLost(plan.target))?;
        agent.target = Some(plan.target);

        let plan_key = (plan.pack_id, plan.formed_at);
        if agent.id == plan.alpha || agent.runtime.flank_positioned == Some(plan_key) {
            return Ok(strike(agent, prey, ctx));
        }

        let Some(point) = plan.approach_point(agent.id, prey.position, ctx.config.flank_radius) else {
            return Ok(strike(agent, prey, ctx));
        };
        if agent.position.distance(&point) <= ctx.config.flank_tolerance {
            agent.runtime.flank_positioned = Some(plan_key);
            return Ok(strike(agent, prey, ctx));
        }
        Ok(GoalOutput::moving(MovementIntent::new(point, ctx.config.hunt_speed)))
    }

    fn stop(&self, agent: &mut Agent) {
        agent.target = None;
        agent.runtime.flank_positioned = None;
    }
}

// === SOCIAL BAND ===

#[derive(Debug)]
pub struct HerdCohesion;

impl HerdCohesion {
    fn intent(agent: &Agent, ctx: &GoalContext<'_>) -> Option<MovementIntent> {
        let settings = agent.profile().flock.as_ref()?;
        let engine = FlockCohesionEngine::new(settings);
        let me = AgentView::of(agent);
        let speed = ctx.config.walk_speed;
        if agent.juvenile {
            engine
                .follow_adult(&me, ctx.snapshot, speed)
                .or_else(|| engine.cohesion_vector(&me, ctx.snapshot, speed))
        } else {
            engine.cohesion_vector(&me, ctx.snapshot, speed)
        }
    }
}

impl GoalBehavior for HerdCohesion {
    fn can_use(&self, agent: &Agent, ctx: &GoalContext<'_>) -> bool {
        Self::intent(agent, ctx).is_some()
    }

    fn tick(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> Result<GoalOutput> {
        Ok(match Self::intent(agent, ctx) {
            Some(intent) => GoalOutput::moving(intent),
            None => GoalOutput::finished(),
        })
    }
}

/// Carry food to the nearest hungry packmate
#[derive(Debug)]
pub struct ShareFood;

impl ShareFood {
    fn recipient<'a>(agent: &Agent, ctx: &GoalContext<'a>) -> Option<&'a AgentView> {
        nearest(
            agent.position,
            ctx.snapshot
                .neighbors(agent.position, ctx.config.search_radius)
                .filter(|v| {
                    v.id != agent.id
                        && v.is_hungry
                        && !v.carrying
                        && are_packmates(agent.pack.as_ref(), v.pack.as_ref())
                }),
        )
    }
}

impl GoalBehavior for ShareFood {
    fn can_use(&self, agent: &Agent, ctx: &GoalContext<'_>) -> bool {
        agent.profile().forms_packs
            && !agent.carried.is_empty()
            && !agent.needs().is_hungry()
            && agent.pack.is_some_and(|pack| pack.can_share())
            && Self::recipient(agent, ctx).is_some()
    }

    fn tick(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> Result<GoalOutput> {
        let Some(mate) = Self::recipient(agent, ctx) else {
            return Ok(GoalOutput::finished());
        };
        if agent.position.distance(&mate.position) > ctx.config.interact_distance {
            return Ok(GoalOutput::moving(MovementIntent::new(mate.position, ctx.config.walk_speed)));
        }

        let Some(item) = agent.carried.consume() else {
            return Ok(GoalOutput::finished());
        };
        if let Some(pack) = agent.pack.as_mut() {
            pack.share_cooldown = ctx.config.share_cooldown_ticks;
        }
        tracing::debug!("{:?} shares {} with {:?}", agent.id, item.kind, mate.id);
        Ok(GoalOutput::finished().with_effect(EffectRequest::ShareFood {
            from: agent.id,
            to: mate.id,
            nutrition: item.nutrition,
        }))
    }
}

// === IDLE BAND ===

#[derive(Debug)]
pub struct Wander;

impl Wander {
    fn rng(agent: &Agent, ctx: &GoalContext<'_>) -> ChaCha8Rng {
        let bits = agent.id.0.as_u128();
        let id_seed = (bits as u64) ^ ((bits >> 64) as u64);
        ChaCha8Rng::seed_from_u64(ctx.config.seed ^ id_seed ^ ctx.tick.wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }
}

impl GoalBehavior for Wander {
    fn can_use(&self, _agent: &Agent, _ctx: &GoalContext<'_>) -> bool {
        true
    }

    fn tick(&self, agent: &mut Agent, ctx: &GoalContext<'_>) -> Result<GoalOutput> {
        if agent.runtime.wander_target.is_none() || ctx.tick >= agent.runtime.next_wander {
            let mut rng = Self::rng(agent, ctx);
            let angle = rng.gen_range(0.0..TAU);
            let radius = ctx.config.wander_radius.max(1.0);
            let distance = rng.gen_range(radius * 0.25..=radius);
            agent.runtime.wander_target = Some(agent.position + Vec2::from_angle(angle) * distance);
            agent.runtime.next_wander = ctx.tick + ctx.config.wander_interval;
        }

        match agent.runtime.wander_target {
            Some(target) if agent.position.distance(&target) > ctx.config.interact_distance => Ok(
                GoalOutput::moving(MovementIntent::new(target, ctx.config.walk_speed)),
            ),
            _ => Ok(GoalOutput::holding()),
        }
    }

    fn stop(&self, agent: &mut Agent) {
        agent.runtime.wander_target = None;
    }
}

/// Placeholder for host goals registered by kind alone
#[derive(Debug)]
pub struct Inert;

impl GoalBehavior for Inert {
    fn can_use(&self, _agent: &Agent, _ctx: &GoalContext<'_>) -> bool {
        false
    }

    fn tick(&self, _agent: &mut Agent, _ctx: &GoalContext<'_>) -> Result<GoalOutput> {
        Ok(GoalOutput::finished())
    }
}
