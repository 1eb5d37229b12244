//! Headless flock runner
//!
//! Drives the simulation at a fixed frame time without a renderer, logs
//! flock statistics, and optionally dumps the final poses as JSON.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use birds_sim::{AgentPose, Flock, FlockSetup, Result};
use clap::Parser;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "flock-headless")]
#[command(about = "Run the boids flock without rendering and report its statistics")]
struct Args {
    /// TOML flock setup; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the number of agents
    #[arg(long)]
    count: Option<usize>,

    /// Override the seed (0 draws one from the OS)
    #[arg(long)]
    seed: Option<u64>,

    /// Ticks to simulate
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Frame time fed to every tick, in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Log statistics every N ticks (0 disables periodic reports)
    #[arg(long, default_value_t = 60)]
    report_every: u64,

    /// Write final poses to this JSON file
    #[arg(long)]
    dump: Option<PathBuf>,
}

#[derive(Serialize)]
struct Dump<'a> {
    tick: u64,
    setup: &'a FlockSetup,
    poses: Vec<AgentPose>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("birds_sim=info,flock_headless=info")),
        )
        .init();

    if let Err(err) = run(Args::parse()) {
        tracing::error!(%err, "flock run failed");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut setup = match &args.config {
        Some(path) => FlockSetup::load(path)?,
        None => FlockSetup::default(),
    };
    if let Some(count) = args.count {
        setup.count = count;
    }
    if let Some(seed) = args.seed {
        setup.seed = seed;
    }
    setup.validate()?;

    let mut flock = Flock::from_setup(&setup)?;
    tracing::info!(
        count = flock.len(),
        ticks = args.ticks,
        dt = args.dt,
        "starting headless run"
    );

    for _ in 0..args.ticks {
        let stats = flock.step(args.dt);
        if args.report_every > 0 && flock.tick() % args.report_every == 0 {
            let (cx, cy, cz) = flock.centroid();
            tracing::info!(
                tick = flock.tick(),
                mean_speed = flock.mean_speed(),
                polarization = flock.polarization(),
                centroid = ?(cx, cy, cz),
                neighbor_pairs = stats.neighbor_pairs,
                raised_to_min = stats.raised_to_min,
                clamped_to_max = stats.clamped_to_max,
                "flock report"
            );
        }
    }

    if let Some(path) = &args.dump {
        let dump = Dump {
            tick: flock.tick(),
            setup: &setup,
            poses: flock.poses().collect(),
        };
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &dump)?;
        tracing::info!(path = %path.display(), "wrote final poses");
    }

    Ok(())
}
