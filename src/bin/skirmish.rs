//! Headless skirmish
//!
//! Loads a world document (or generates a small two-player map), hands out
//! harvest and attack orders, and runs the simulation for a number of ticks.

use clap::Parser;
use glam::Vec2;
use isles_sim::behavior::{Attack, Behavior, HarvestGold, HarvestLumber};
use isles_sim::core::error::Result;
use isles_sim::core::types::PlayerId;
use isles_sim::entity::player::Player;
use isles_sim::simulation::tick::{run_simulation_tick, SimulationEvent};
use isles_sim::world::game_world::FLAT_LANDSCAPE;
use isles_sim::world::persistence::{ObjectRecord, WorldBody, WorldDocument, WORLD_VERSION};
use isles_sim::{SimulationConfig, World, WorldLoader};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Headless skirmish - run a world without rendering
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Run an RTS world headless and log what happens")]
struct Args {
    /// World document to load; a small map is generated when omitted
    #[arg(long)]
    world: Option<PathBuf>,

    /// TOML file overriding simulation constants
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Seconds per tick
    #[arg(long, default_value_t = 0.1)]
    dt: f32,

    /// Random seed, overrides the config
    #[arg(long)]
    seed: Option<u64>,

    /// Write the final world document here
    #[arg(long)]
    save: Option<PathBuf>,
}

const RED: PlayerId = PlayerId(1);
const BLUE: PlayerId = PlayerId(2);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("isles_sim=debug")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let loader = WorldLoader::new(config)?;
    let mut world = match &args.world {
        Some(path) => loader.load_file(path)?,
        None => {
            let json = skirmish_document().to_json()?;
            let mut world = loader.load_str(&json)?;
            give_orders(&mut world);
            world
        }
    };

    let mut hits = 0;
    let mut deaths = 0;
    let mut deliveries = 0;
    for _ in 0..args.ticks {
        let report = run_simulation_tick(&mut world, args.dt);
        for event in &report.events {
            match event {
                SimulationEvent::CombatHit { .. } => hits += 1,
                SimulationEvent::EntityDied { .. } => deaths += 1,
                SimulationEvent::ResourceDeposited { .. } => deliveries += 1,
                _ => {}
            }
        }
        if report.tick % 100 == 0 {
            info!(
                "Tick {}: {} entities, {} hits, {} deaths, {} deliveries",
                report.tick,
                world.entities().len(),
                hits,
                deaths,
                deliveries
            );
        }
    }

    for player in world.players().iter() {
        info!(
            "{} (team {}): {} lumber, {} gold, {} objects",
            player.name,
            player.team,
            player.lumber,
            player.gold,
            player.object_count()
        );
    }

    if let Some(path) = &args.save {
        std::fs::write(path, world.save_json()?)?;
        info!("Saved world to {}", path.display());
    }
    Ok(())
}

/// Two bases at opposite corners of the flat map
fn skirmish_document() -> WorldDocument {
    let at = |x: f32, y: f32| format!("{} {}", x, y);
    let mut objects = vec![
        ObjectRecord::new("Townhall")
            .with("Name", "red-hall")
            .with("Owner", RED.0)
            .with("Position", at(200.0, 200.0)),
        ObjectRecord::new("Goldmine")
            .with("Name", "mine")
            .with("Position", at(200.0, 360.0)),
        ObjectRecord::new("Townhall")
            .with("Name", "blue-hall")
            .with("Owner", BLUE.0)
            .with("Position", at(800.0, 800.0)),
    ];
    for i in 0..3 {
        let y = 160.0 + i as f32 * 40.0;
        objects.push(
            ObjectRecord::new("Tree")
                .with("Name", format!("tree-{}", i))
                .with("Position", at(330.0, y)),
        );
        objects.push(
            ObjectRecord::new("Follower")
                .with("Name", format!("red-peon-{}", i))
                .with("Owner", RED.0)
                .with("Position", at(250.0, y)),
        );
    }
    for i in 0..2 {
        objects.push(
            ObjectRecord::new("Footman")
                .with("Owner", RED.0)
                .with("Position", at(260.0 + i as f32 * 10.0, 280.0)),
        );
    }
    for i in 0..4 {
        objects.push(
            ObjectRecord::new(if i % 2 == 0 { "Footman" } else { "Hunter" })
                .with("Name", format!("blue-raider-{}", i))
                .with("Owner", BLUE.0)
                .with("Position", at(720.0 + i as f32 * 12.0, 720.0)),
        );
    }

    WorldDocument {
        world: WorldBody {
            version: WORLD_VERSION,
            landscape: Some(FLAT_LANDSCAPE.to_string()),
            name: "Skirmish".to_string(),
            players: vec![Player::new(RED, "red", 0), Player::new(BLUE, "blue", 1)],
            objects: objects
                .iter()
                .filter_map(|record| serde_json::to_value(record).ok())
                .collect(),
        },
    }
}

/// Red peons harvest, blue raiders march on the red town hall
fn give_orders(world: &mut World) {
    let orders = [
        ("red-peon-0", "tree-0", false),
        ("red-peon-1", "tree-1", false),
        ("red-peon-2", "mine", true),
    ];
    for (peon, node, gold) in orders {
        if let (Some(peon), Some(node)) = (world.object_by_name(peon), world.object_by_name(node)) {
            let state = if gold {
                Behavior::HarvestGold(HarvestGold::goldmine(node))
            } else {
                Behavior::HarvestLumber(HarvestLumber::tree(node))
            };
            world.set_state(peon, Some(state));
        }
    }

    let Some(hall) = world
        .object_by_name("red-hall")
        .and_then(|id| world.entities().get(id))
        .map(|o| o.position_2d())
    else {
        return;
    };
    for i in 0..4 {
        if let Some(raider) = world.object_by_name(&format!("blue-raider-{}", i)) {
            let offset = Vec2::new(i as f32 * 8.0, 0.0);
            world.set_state(raider, Some(Behavior::Attack(Attack::position(hall + offset))));
        }
    }
}
