//! Integration tests for needs, goal scheduling and herd behavior through the tick

use fauna::core::error::BehaviorError;
use fauna::core::types::{Species, Vec2};
use fauna::ecs::world::Ecosystem;
use fauna::entity::carry::FoodItem;
use fauna::entity::needs::{HasNeeds, NeedKind};
use fauna::entity::species::Diet;
use fauna::simulation::goal::{Goal, GoalKind};
use fauna::simulation::tick::{run_behavior_tick, SimulationEvent};
use fauna::world::{EffectRequest, MemoryPersistence, SandboxNavigation, SandboxWorld};

fn setup() -> (Ecosystem, SandboxWorld, SandboxNavigation) {
    (Ecosystem::default(), SandboxWorld::new(), SandboxNavigation::new(1.0))
}

fn max_pairwise(eco: &Ecosystem) -> f32 {
    let agents = eco.agents();
    let mut max = 0.0f32;
    for (i, a) in agents.iter().enumerate() {
        for b in &agents[i + 1..] {
            max = max.max(a.position.distance(&b.position));
        }
    }
    max
}

// ============================================================================
// Flocking
// ============================================================================

#[test]
fn test_herd_converges_under_cohesion_alone() {
    let (mut eco, mut world, mut nav) = setup();
    for position in [Vec2::new(0.0, 0.0), Vec2::new(15.0, 0.0), Vec2::new(7.5, 12.0)] {
        eco.spawn_with_goals(Species::Sheep, position, vec![Goal::standard(GoalKind::HerdCohesion)]);
    }

    let initial = max_pairwise(&eco);
    assert!(initial <= 20.0);

    for _ in 0..40 {
        run_behavior_tick(&mut eco, &mut world, &mut nav);
        nav.advance(&mut eco);
        assert!(max_pairwise(&eco) <= 20.0, "herd drifted apart");
    }

    assert!(max_pairwise(&eco) < 10.0);
    assert!(max_pairwise(&eco) < initial);
}

#[test]
fn test_juvenile_heads_for_its_parent() {
    let (mut eco, mut world, mut nav) = setup();
    let ewe = eco.spawn(Species::Sheep, Vec2::new(10.0, 0.0));
    let lamb = eco.spawn_juvenile(Species::Sheep, Vec2::ZERO, Some(ewe));

    let report = run_behavior_tick(&mut eco, &mut world, &mut nav);
    assert_eq!(report.started_goal(lamb), Some(GoalKind::HerdCohesion));

    let intent = nav.intent(lamb).expect("lamb should be moving");
    // Stops short of the parent
    assert!((intent.target.x - 8.0).abs() < 1e-4);
    assert!(intent.target.y.abs() < 1e-4);
}

// ============================================================================
// Priority preemption
// ============================================================================

#[test]
fn test_predator_preempts_grazing_within_one_tick() {
    let (mut eco, mut world, mut nav) = setup();
    world.add_forage(Vec2::ZERO, Diet::Grass);
    let sheep = eco.spawn(Species::Sheep, Vec2::ZERO);
    eco.set_hunger(sheep, 30.0).unwrap();

    let report = run_behavior_tick(&mut eco, &mut world, &mut nav);
    assert_eq!(report.started_goal(sheep), Some(GoalKind::SeekFood));
    assert!(report
        .effects()
        .any(|(request, _)| matches!(request, EffectRequest::ConsumeForage { .. })));

    eco.spawn(Species::Wolf, Vec2::new(5.0, 0.0));
    let report = run_behavior_tick(&mut eco, &mut world, &mut nav);
    assert_eq!(report.started_goal(sheep), Some(GoalKind::FleePredator));

    let agent = eco.get(sheep).unwrap();
    assert!(agent.needs().is_fleeing());
    let intent = nav.intent(sheep).expect("fleeing sheep should move");
    assert!(intent.target.x < 0.0, "sheep should run away from the wolf");
}

#[test]
fn test_unreachable_water_backs_off_then_retries() {
    let (mut eco, mut world, mut nav) = setup();
    world.add_water(Vec2::new(10.0, 0.0));
    nav.add_blocked_zone(Vec2::new(10.0, 0.0), 1.0);
    let backoff = eco.config().unreachable_backoff_ticks;

    let sheep = eco.spawn(Species::Sheep, Vec2::ZERO);
    eco.set_thirst(sheep, 30.0).unwrap();

    let report = run_behavior_tick(&mut eco, &mut world, &mut nav);
    assert!(report
        .recovered
        .iter()
        .any(|e| matches!(e, BehaviorError::NavigationUnreachable { goal: GoalKind::SeekWater, .. })));
    assert_eq!(eco.get(sheep).unwrap().active_goal(), None);

    for _ in 1..backoff {
        run_behavior_tick(&mut eco, &mut world, &mut nav);
        assert_ne!(eco.get(sheep).unwrap().active_goal(), Some(GoalKind::SeekWater));
    }

    let report = run_behavior_tick(&mut eco, &mut world, &mut nav);
    assert_eq!(report.started_goal(sheep), Some(GoalKind::SeekWater));
}

// ============================================================================
// Targeting
// ============================================================================

#[test]
fn test_stale_target_is_dropped_and_replaced() {
    let (mut eco, mut world, mut nav) = setup();
    let fox = eco.spawn(Species::Fox, Vec2::ZERO);
    eco.set_hunger(fox, 30.0).unwrap();
    let near = eco.spawn(Species::Chicken, Vec2::new(5.0, 0.0));
    let far = eco.spawn(Species::Chicken, Vec2::new(0.0, 10.0));

    run_behavior_tick(&mut eco, &mut world, &mut nav);
    assert_eq!(eco.get(fox).unwrap().target, Some(near));

    eco.despawn(near);
    let report = run_behavior_tick(&mut eco, &mut world, &mut nav);
    assert!(report
        .recovered
        .iter()
        .any(|e| matches!(e, BehaviorError::TargetLost(id) if *id == near)));
    assert_eq!(eco.get(fox).unwrap().target, None);

    run_behavior_tick(&mut eco, &mut world, &mut nav);
    assert_eq!(eco.get(fox).unwrap().target, Some(far));
}

#[test]
fn test_sated_predator_ignores_prey() {
    let (mut eco, mut world, mut nav) = setup();
    let fox = eco.spawn(Species::Fox, Vec2::ZERO);
    eco.spawn(Species::Rabbit, Vec2::new(3.0, 0.0));

    let report = run_behavior_tick(&mut eco, &mut world, &mut nav);
    assert_ne!(report.started_goal(fox), Some(GoalKind::Hunt));
    assert_eq!(eco.get(fox).unwrap().target, None);
}

// ============================================================================
// Carrying
// ============================================================================

#[test]
fn test_hungry_fox_picks_up_food_in_reach() {
    let (mut eco, mut world, mut nav) = setup();
    let item = world.add_item(FoodItem::new("berries", 15.0, Vec2::new(1.0, 0.0)));
    let fox = eco.spawn(Species::Fox, Vec2::ZERO);
    eco.set_hunger(fox, 30.0).unwrap();

    run_behavior_tick(&mut eco, &mut world, &mut nav);
    assert_eq!(eco.get(fox).unwrap().carried.held().map(|i| i.id), Some(item));
    assert!(world.items().is_empty());

    let report = run_behavior_tick(&mut eco, &mut world, &mut nav);
    assert_eq!(report.started_goal(fox), Some(GoalKind::EatCarried));
}

#[test]
fn test_carrying_fox_leaves_second_item_in_world() {
    let (mut eco, mut world, mut nav) = setup();
    let fox = eco.spawn(Species::Fox, Vec2::ZERO);
    let held = FoodItem::new("mutton", 20.0, Vec2::ZERO);
    eco.get_mut(fox).unwrap().carried.pick_up(&held, fox).unwrap();
    world.add_item(FoodItem::new("berries", 15.0, Vec2::new(1.0, 0.0)));

    for _ in 0..5 {
        run_behavior_tick(&mut eco, &mut world, &mut nav);
    }

    assert_eq!(world.items().len(), 1);
    assert_eq!(eco.get(fox).unwrap().carried.held().map(|i| i.id), Some(held.id));
}

// ============================================================================
// Needs over time
// ============================================================================

#[test]
fn test_starvation_damage_follows_interval() {
    let (mut eco, mut world, mut nav) = setup();
    let interval = eco.config().starvation_damage_interval as usize;
    let sheep = eco.spawn(Species::Sheep, Vec2::ZERO);
    eco.set_hunger(sheep, 5.0).unwrap();

    let mut damage = 0;
    for _ in 0..interval * 2 {
        let report = run_behavior_tick(&mut eco, &mut world, &mut nav);
        damage += report
            .effects()
            .filter(|(request, _)| matches!(request, EffectRequest::StarvationDamage { .. }))
            .count();
    }

    assert_eq!(damage, 2);
    assert!(eco.get(sheep).unwrap().health < 1.0);
}

#[test]
fn test_drinking_restores_thirst_until_hydrated() {
    let (mut eco, mut world, mut nav) = setup();
    world.add_water(Vec2::new(0.5, 0.0));
    let cow = eco.spawn(Species::Cow, Vec2::ZERO);
    eco.set_thirst(cow, 40.0).unwrap();

    for _ in 0..20 {
        run_behavior_tick(&mut eco, &mut world, &mut nav);
    }

    let needs = eco.get(cow).unwrap().needs();
    assert!(!needs.is_thirsty());
    assert!(needs.thirst() >= needs.thresholds().hydrated);
}

#[test]
fn test_finished_goal_reports_how_long_it_ran() {
    let (mut eco, mut world, mut nav) = setup();
    world.add_water(Vec2::new(0.5, 0.0));
    let cow = eco.spawn_with_goals(Species::Cow, Vec2::ZERO, vec![Goal::standard(GoalKind::SeekWater)]);
    eco.set_thirst(cow, 40.0).unwrap();

    let report = run_behavior_tick(&mut eco, &mut world, &mut nav);
    assert_eq!(report.started_goal(cow), Some(GoalKind::SeekWater));

    let mut idle = None;
    for _ in 0..20 {
        let report = run_behavior_tick(&mut eco, &mut world, &mut nav);
        idle = report.events.iter().find_map(|event| match event {
            SimulationEvent::GoalIdle { agent, goal, ran_for, tick } if *agent == cow => {
                Some((*goal, *ran_for, *tick))
            }
            _ => None,
        });
        if idle.is_some() {
            break;
        }
    }

    let (goal, ran_for, tick) = idle.expect("drinking should finish");
    assert_eq!(goal, GoalKind::SeekWater);
    assert!(ran_for > 0);
    assert_eq!(ran_for, tick);
    assert_eq!(eco.get(cow).unwrap().active_goal(), None);
}

#[test]
fn test_hysteresis_latch_survives_save_and_load() {
    let (mut eco, _, _) = setup();
    let wolf = eco.spawn(Species::Wolf, Vec2::ZERO);
    eco.set_hunger(wolf, 30.0).unwrap();
    eco.get_mut(wolf).unwrap().needs_mut().restore(NeedKind::Hunger, 30.0);
    assert!(eco.get(wolf).unwrap().needs().is_hungry());

    let mut store = MemoryPersistence::default();
    eco.save_agent(wolf, &mut store).unwrap();
    eco.set_hunger(wolf, 95.0).unwrap();

    assert!(eco.restore_agent(wolf, &store).unwrap());
    let needs = eco.get(wolf).unwrap().needs();
    assert_eq!(needs.hunger(), 60.0);
    assert!(needs.is_hungry());
}
