//! Fauna - headless sandbox runner
//!
//! Spawns a grazing herd, a wolf pack and a few foxes with chickens into the
//! in-memory sandbox world and runs behavior ticks.

use std::path::PathBuf;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use ahash::AHashMap;
use fauna::core::error::Result;
use fauna::core::types::{EntityId, Species, Vec2};
use fauna::ecs::world::Ecosystem;
use fauna::entity::carry::FoodItem;
use fauna::entity::species::Diet;
use fauna::rules::loader::load_ecology_table;
use fauna::simulation::tick::{run_behavior_tick, SimulationEvent};
use fauna::world::{SandboxNavigation, SandboxWorld};

const DEFAULT_TABLE: &str = "data/ecology.toml";

/// Headless animal behavior sandbox
#[derive(Parser, Debug)]
#[command(name = "fauna")]
#[command(about = "Run the animal behavior core in an in-memory sandbox")]
struct Args {
    /// Number of ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Random seed for placement and wandering
    #[arg(long)]
    seed: Option<u64>,

    /// Sheep in the herd
    #[arg(long, default_value_t = 12)]
    herd: usize,

    /// Wolves in the pack
    #[arg(long, default_value_t = 4)]
    wolves: usize,

    /// Foxes, each with a few chickens nearby
    #[arg(long, default_value_t = 2)]
    foxes: usize,

    /// Ecology table (TOML) with thresholds and tuning [default: data/ecology.toml when present]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print every goal switch
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fauna=info")),
        )
        .init();

    let args = Args::parse();

    let table_path = args
        .config
        .clone()
        .or_else(|| Some(PathBuf::from(DEFAULT_TABLE)).filter(|p| p.exists()));
    let mut eco = match table_path {
        Some(path) => Ecosystem::from_table(load_ecology_table(&path)?),
        None => Ecosystem::with_globals(),
    };
    let seed = args.seed.unwrap_or(eco.config().seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    tracing::info!("Fauna sandbox starting (seed {})", seed);

    let mut world = SandboxWorld::new();
    let mut nav = SandboxNavigation::new(1.0);
    populate(&mut eco, &mut world, &args, &mut rng)?;

    let mut goal_switches = 0usize;
    let mut deaths: Vec<(EntityId, Option<EntityId>)> = Vec::new();
    let mut hunts = 0usize;

    for _ in 0..args.ticks {
        let report = run_behavior_tick(&mut eco, &mut world, &mut nav);
        nav.advance(&mut eco);

        for event in &report.events {
            match event {
                SimulationEvent::GoalStarted { agent, goal, priority, tick } => {
                    goal_switches += 1;
                    if args.verbose {
                        println!("[{:>5}] {:?} -> {:?} ({})", tick, agent, goal, priority);
                    }
                }
                SimulationEvent::Died { agent, killer } => deaths.push((*agent, *killer)),
                SimulationEvent::HuntPlanned { .. } => hunts += 1,
                _ => {}
            }
        }
    }

    print_summary(&eco, args.ticks, goal_switches, hunts, &deaths);
    Ok(())
}

fn scatter(rng: &mut ChaCha8Rng, center: Vec2, radius: f32) -> Vec2 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = rng.gen_range(0.0..=radius);
    center + Vec2::from_angle(angle) * distance
}

fn populate(eco: &mut Ecosystem, world: &mut SandboxWorld, args: &Args, rng: &mut ChaCha8Rng) -> Result<()> {
    let pasture = Vec2::new(0.0, 0.0);
    for _ in 0..20 {
        world.add_forage(scatter(rng, pasture, 30.0), Diet::Grass);
    }
    world.add_water(Vec2::new(-20.0, 10.0));
    world.add_water(Vec2::new(25.0, -15.0));

    for _ in 0..args.herd {
        let position = scatter(rng, pasture, 12.0);
        let sheep = eco.spawn(Species::Sheep, position);
        if rng.gen_bool(0.25) {
            eco.spawn_juvenile(Species::Sheep, position + Vec2::new(1.0, 0.0), Some(sheep));
        }
    }

    let den = Vec2::new(45.0, 5.0);
    let mut leader = None;
    for _ in 0..args.wolves {
        let wolf = eco.spawn(Species::Wolf, scatter(rng, den, 4.0));
        eco.set_hunger(wolf, rng.gen_range(20.0..45.0))?;
        match leader {
            None => leader = Some(wolf),
            Some(alpha) => {
                eco.join_pack_of(wolf, alpha)?;
            }
        }
    }

    for i in 0..args.foxes {
        let coop = Vec2::new(-40.0, -30.0 + i as f32 * 25.0);
        let fox = eco.spawn(Species::Fox, scatter(rng, coop, 10.0));
        eco.set_hunger(fox, 30.0)?;
        for _ in 0..3 {
            eco.spawn(Species::Chicken, scatter(rng, coop, 6.0));
        }
        world.add_forage(coop, Diet::Seeds);
        world.add_item(FoodItem::new("berries", 15.0, scatter(rng, coop, 8.0)));
    }

    tracing::info!("Spawned {} agents", eco.len());
    Ok(())
}

fn print_summary(
    eco: &Ecosystem,
    ticks: u64,
    goal_switches: usize,
    hunts: usize,
    deaths: &[(EntityId, Option<EntityId>)],
) {
    let mut population: AHashMap<Species, usize> = AHashMap::new();
    let mut active: AHashMap<String, usize> = AHashMap::new();
    for agent in eco.agents() {
        *population.entry(agent.species).or_default() += 1;
        let goal = agent
            .active_goal()
            .map(|g| format!("{:?}", g))
            .unwrap_or_else(|| "idle".to_string());
        *active.entry(goal).or_default() += 1;
    }

    println!("\n=== FAUNA SANDBOX ===");
    println!("Ticks run:      {}", ticks);
    println!("Goal switches:  {}", goal_switches);
    println!("Hunt plans:     {}", hunts);
    println!(
        "Deaths:         {} ({} kills)",
        deaths.len(),
        deaths.iter().filter(|(_, killer)| killer.is_some()).count()
    );

    println!("\nPopulation:");
    let mut species: Vec<_> = population.into_iter().collect();
    species.sort_by_key(|(s, _)| s.key());
    for (s, count) in species {
        println!("  {:<14} {}", s, count);
    }

    println!("\nActive goals:");
    let mut goals: Vec<_> = active.into_iter().collect();
    goals.sort();
    for (goal, count) in goals {
        println!("  {:<14} {}", goal, count);
    }
}
