use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fauna::core::types::{Species, Vec2};
use fauna::ecs::world::Ecosystem;
use fauna::entity::species::Diet;
use fauna::simulation::tick::run_behavior_tick;
use fauna::world::{SandboxNavigation, SandboxWorld};

fn build(count: usize) -> (Ecosystem, SandboxWorld) {
    let mut eco = Ecosystem::default();
    let mut world = SandboxWorld::new();
    for i in 0..count {
        let position = Vec2::new((i % 50) as f32 * 3.0, (i / 50) as f32 * 3.0);
        let species = if i % 20 == 0 { Species::Wolf } else { Species::Sheep };
        eco.spawn(species, position);
        if i % 10 == 0 {
            world.add_forage(position, Diet::Grass);
        }
    }
    world.add_water(Vec2::new(75.0, 75.0));
    (eco, world)
}

fn bench_behavior_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("behavior_tick");
    for &count in &[100usize, 1_000, 5_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let (mut eco, mut world) = build(count);
            let mut nav = SandboxNavigation::new(1.0);
            b.iter(|| {
                let report = run_behavior_tick(&mut eco, &mut world, &mut nav);
                nav.advance(&mut eco);
                black_box(report.evaluated)
            })
        });
    }
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let (eco, _) = build(2_000);
    c.bench_function("snapshot_2000", |b| b.iter(|| black_box(eco.snapshot().len())));
}

criterion_group!(benches, bench_behavior_tick, bench_snapshot);
criterion_main!(benches);
