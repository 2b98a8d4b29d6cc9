//! Cloud Wars local match
//!
//! Generates an arena, spawns one pilot thread per player and ticks the world
//! in real time until the match is decided.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;

use cloudwars::sim::World;
use cloudwars::{Arena, LocalLink, Pilot, Settings, Ticker};

const TAGS: [&str; 6] = ["blue", "red", "green", "yellow", "purple", "orange"];

#[derive(Parser, Debug)]
#[command(name = "cloudwars", about = "Rollout-driven pilots in a cloud-physics arena")]
struct Args {
    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of pilots
    #[arg(short, long)]
    players: Option<u32>,

    /// World generation seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Decision cycle budget in milliseconds
    #[arg(long)]
    budget_ms: Option<u64>,

    /// Rollout workers per pilot
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(players) = args.players {
        settings.players = players;
    }
    if let Some(budget_ms) = args.budget_ms {
        settings.pilot.budget_ms = budget_ms;
    }
    if let Some(workers) = args.workers {
        settings.pilot.workers = Some(workers);
    }
    let seed = args.seed.or(settings.seed).unwrap_or_else(rand::random);

    log::info!(
        "Cloud Wars starting: {} players, seed {seed}, {}x{} arena",
        settings.players,
        settings.world.width,
        settings.world.height
    );

    let arena = Arc::new(Arena::new(World::generate(&settings.world, seed), seed));
    let names: Vec<String> = (0..settings.players).map(|i| format!("pilot-{i}")).collect();
    for (i, name) in names.iter().enumerate() {
        arena.add_player(name, TAGS[i % TAGS.len()], None, settings.player_mass);
    }

    let mut ticker = Ticker::start(Arc::clone(&arena))?;

    let mut pilots = Vec::with_capacity(names.len());
    for name in names {
        let link = LocalLink::new(Arc::clone(&arena), name.clone());
        let mut pilot = Pilot::new(link, name.clone(), settings.pilot.clone());
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || pilot.run())?;
        pilots.push((name, handle));
    }

    for (name, handle) in pilots {
        match handle.join() {
            Ok(Ok(outcome)) => log::info!("{name}: {outcome:?}"),
            Ok(Err(err)) => log::error!("{name}: {err}"),
            Err(_) => log::error!("{name}: pilot thread panicked"),
        }
    }

    match ticker.join() {
        Some(stats) => log::info!(
            "Match over after {} ticks, winner: {}",
            stats.iteration,
            stats.leader.as_deref().unwrap_or("nobody")
        ),
        None => log::warn!("Match ended without final stats"),
    }

    Ok(())
}
