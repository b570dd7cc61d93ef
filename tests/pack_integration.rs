//! Integration tests for pack hierarchy and coordinated hunting

use fauna::core::error::BehaviorError;
use fauna::core::types::{EntityId, Species, Vec2};
use fauna::ecs::world::Ecosystem;
use fauna::entity::carry::FoodItem;
use fauna::entity::needs::HasNeeds;
use fauna::entity::pack::PackRank;
use fauna::simulation::goal::GoalKind;
use fauna::simulation::tick::{run_behavior_tick, SimulationEvent};
use fauna::world::{SandboxNavigation, SandboxWorld};

/// Alpha at the origin plus `followers` wolves close by, all joined
fn pack(eco: &mut Ecosystem, followers: usize) -> (EntityId, Vec<EntityId>) {
    let alpha = eco.spawn(Species::Wolf, Vec2::ZERO);
    let members = (0..followers)
        .map(|i| {
            let wolf = eco.spawn(Species::Wolf, Vec2::new(-3.0, i as f32 * 3.0));
            eco.join_pack_of(wolf, alpha).unwrap();
            wolf
        })
        .collect();
    (alpha, members)
}

fn rank(eco: &Ecosystem, id: EntityId) -> PackRank {
    eco.get(id).unwrap().pack.unwrap().rank
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn test_promotion_sequence() {
    let mut eco = Ecosystem::default();
    let (alpha, members) = pack(&mut eco, 2);
    let (a, b) = (members[0], members[1]);

    assert_eq!(rank(&eco, alpha), PackRank::Alpha);
    assert_eq!(rank(&eco, a), PackRank::Omega);

    assert_eq!(eco.promote(a).unwrap(), PackRank::Beta);
    assert_eq!(eco.promote(a).unwrap(), PackRank::Alpha);
    assert_eq!(rank(&eco, alpha), PackRank::Beta);
    assert_eq!(rank(&eco, b), PackRank::Omega);

    let pack_id = eco.get(a).unwrap().pack.unwrap().pack_id;
    assert_eq!(eco.pack_alpha(pack_id), Some(a));

    assert!(matches!(
        eco.promote(a),
        Err(BehaviorError::InvalidRankTransition { .. })
    ));
    assert_eq!(rank(&eco, a), PackRank::Alpha);
}

#[test]
fn test_joining_requires_leader_in_a_pack() {
    let mut eco = Ecosystem::default();
    let wolf = eco.spawn(Species::Wolf, Vec2::ZERO);
    let sheep = eco.spawn(Species::Sheep, Vec2::ZERO);

    assert!(matches!(
        eco.join_pack_of(wolf, sheep),
        Err(BehaviorError::NotPackMember(_))
    ));
}

#[test]
fn test_packmates_never_targeted() {
    let mut eco = Ecosystem::default();
    let (alpha, members) = pack(&mut eco, 1);
    eco.set_hunger(alpha, 20.0).unwrap();
    // A fox is wolf prey, a packmate is not
    let fox = eco.spawn(Species::Fox, Vec2::new(10.0, 0.0));

    let mut world = SandboxWorld::new();
    let mut nav = SandboxNavigation::new(1.0);
    run_behavior_tick(&mut eco, &mut world, &mut nav);

    let target = eco.get(alpha).unwrap().target;
    assert_eq!(target, Some(fox));
    assert_ne!(target, Some(members[0]));
}

// ============================================================================
// Coordinated hunting
// ============================================================================

#[test]
fn test_hunt_waits_for_quorum() {
    let mut eco = Ecosystem::default();
    let (alpha, members) = pack(&mut eco, 2);
    let cow = eco.spawn(Species::Cow, Vec2::new(10.0, 0.0));
    let world = SandboxWorld::new();
    let pack_id = eco.get(alpha).unwrap().pack.unwrap().pack_id;

    eco.set_hunger(alpha, 30.0).unwrap();
    eco.set_hunger(members[0], 30.0).unwrap();
    assert!(eco.coordinate_pack(pack_id, &world).is_none());

    eco.set_hunger(members[1], 30.0).unwrap();
    let plan = eco.coordinate_pack(pack_id, &world).expect("quorum reached");
    assert_eq!(plan.alpha, alpha);
    assert_eq!(plan.target, cow);
    assert_eq!(plan.participants(), 3);
}

#[test]
fn test_flankers_spread_around_prey() {
    let mut eco = Ecosystem::default();
    let (alpha, members) = pack(&mut eco, 2);
    let cow = eco.spawn(Species::Cow, Vec2::new(10.0, 0.0));
    for &id in std::iter::once(&alpha).chain(&members) {
        eco.set_hunger(id, 30.0).unwrap();
    }
    let pack_id = eco.get(alpha).unwrap().pack.unwrap().pack_id;

    let plan = eco
        .coordinate_pack(pack_id, &SandboxWorld::new())
        .expect("plan formed");
    let prey = eco.get(cow).unwrap().position;
    let radius = eco.config().flank_radius;

    let p0 = plan.approach_point(members[0], prey, radius).unwrap();
    let p1 = plan.approach_point(members[1], prey, radius).unwrap();
    assert!((p0.distance(&prey) - radius).abs() < 1e-3);
    assert!((p1.distance(&prey) - radius).abs() < 1e-3);
    // Two flankers sit on opposite sides
    assert!((p0.distance(&p1) - 2.0 * radius).abs() < 1e-3);
}

#[test]
fn test_tick_forms_plan_and_assigns_pack_hunt() {
    let mut eco = Ecosystem::default();
    let (alpha, members) = pack(&mut eco, 2);
    let cow = eco.spawn(Species::Cow, Vec2::new(10.0, 0.0));
    for &id in std::iter::once(&alpha).chain(&members) {
        eco.set_hunger(id, 30.0).unwrap();
    }
    let pack_id = eco.get(alpha).unwrap().pack.unwrap().pack_id;

    let mut world = SandboxWorld::new();
    let mut nav = SandboxNavigation::new(1.0);
    let report = run_behavior_tick(&mut eco, &mut world, &mut nav);

    assert!(report.events.iter().any(|e| matches!(
        e,
        SimulationEvent::HuntPlanned { alpha: a, target, .. } if *a == alpha && *target == cow
    )));
    assert_eq!(eco.hunt_plan(pack_id).map(|p| p.target), Some(cow));
    for &id in std::iter::once(&alpha).chain(&members) {
        assert_eq!(report.started_goal(id), Some(GoalKind::PackHunt));
        assert_eq!(eco.get(id).unwrap().target, Some(cow));
    }
}

#[test]
fn test_flankers_take_new_bearings_after_replan() {
    let mut eco = Ecosystem::default();
    let (alpha, members) = pack(&mut eco, 2);
    let first = eco.spawn(Species::Cow, Vec2::new(10.0, 0.0));
    for &id in std::iter::once(&alpha).chain(&members) {
        eco.set_hunger(id, 30.0).unwrap();
    }
    let pack_id = eco.get(alpha).unwrap().pack.unwrap().pack_id;
    let radius = eco.config().flank_radius;

    let mut world = SandboxWorld::new();
    let mut nav = SandboxNavigation::new(1.0);
    run_behavior_tick(&mut eco, &mut world, &mut nav);

    // Put both flankers on their bearings; the next tick they close in
    let plan = eco.hunt_plan(pack_id).cloned().expect("plan formed");
    let prey = eco.get(first).unwrap().position;
    for &id in &members {
        let point = plan.approach_point(id, prey, radius).unwrap();
        eco.set_position(id, point).unwrap();
    }
    run_behavior_tick(&mut eco, &mut world, &mut nav);
    for &id in &members {
        assert_eq!(nav.intent(id).unwrap().target, prey);
    }

    eco.despawn(first);
    let second = eco.spawn(Species::Cow, Vec2::new(-10.0, 0.0));
    run_behavior_tick(&mut eco, &mut world, &mut nav);

    let plan = eco.hunt_plan(pack_id).expect("pack re-planned");
    assert_eq!(plan.target, second);
    let prey = eco.get(second).unwrap().position;
    for &id in &members {
        let point = plan.approach_point(id, prey, radius).unwrap();
        let target = nav.intent(id).unwrap().target;
        assert!(
            target.distance(&point) < 1e-3,
            "flanker {:?} headed for {:?} instead of its bearing {:?}",
            id,
            target,
            point
        );
    }
}

#[test]
fn test_alpha_death_hands_pack_to_beta() {
    let mut eco = Ecosystem::default();
    let (alpha, members) = pack(&mut eco, 2);
    eco.promote(members[1]).unwrap();
    let pack_id = eco.get(alpha).unwrap().pack.unwrap().pack_id;

    let mut world = SandboxWorld::new();
    world.set_health(alpha, 0.0);
    let mut nav = SandboxNavigation::new(1.0);
    let report = run_behavior_tick(&mut eco, &mut world, &mut nav);

    assert!(report.deaths().any(|id| id == alpha));
    assert_eq!(eco.pack_alpha(pack_id), Some(members[1]));
    assert_eq!(rank(&eco, members[1]), PackRank::Alpha);
}

// ============================================================================
// Food sharing
// ============================================================================

#[test]
fn test_sated_wolf_shares_with_hungry_packmate() {
    let mut eco = Ecosystem::default();
    let (alpha, members) = pack(&mut eco, 1);
    let hungry = members[0];
    eco.set_position(hungry, Vec2::new(1.0, 0.0)).unwrap();
    eco.set_hunger(hungry, 30.0).unwrap();

    let meat = FoodItem::new("mutton", 25.0, Vec2::ZERO);
    eco.get_mut(alpha).unwrap().carried.pick_up(&meat, alpha).unwrap();

    let mut world = SandboxWorld::new();
    let mut nav = SandboxNavigation::new(1.0);
    let report = run_behavior_tick(&mut eco, &mut world, &mut nav);

    assert_eq!(report.started_goal(alpha), Some(GoalKind::ShareFood));
    let giver = eco.get(alpha).unwrap();
    assert!(giver.carried.is_empty());
    assert!(!giver.pack.unwrap().can_share());
    assert!(eco.get(hungry).unwrap().needs().hunger() > 50.0);
}
