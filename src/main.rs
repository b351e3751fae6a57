use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;

use traffic_sim::simulation::{
    BroadcastMode, InMemoryTopology, JsonTopology, SimConfig, SimWorld, SimulationEngine,
    TopologySource, DEFAULT_CAR_SPEED, DEFAULT_LIGHT_PHASE_SECS, DEFAULT_MAX_CARS,
    DEFAULT_OBSERVER_BUFFER, DEFAULT_SPAWN_PROBABILITY, DEFAULT_TICK_PERIOD_MS,
};

#[derive(Parser)]
#[command(name = "traffic_sim")]
#[command(about = "Simulate cars on a road network and stream their positions")]
struct Cli {
    /// JSON topology file (intersections, roads, trafficLights)
    #[arg(long)]
    topology: Option<PathBuf>,

    /// Rows of the demo grid used when no topology file is given
    #[arg(long, default_value = "4")]
    grid_rows: usize,

    /// Columns of the demo grid used when no topology file is given
    #[arg(long, default_value = "4")]
    grid_cols: usize,

    /// Distance between neighboring grid intersections
    #[arg(long, default_value = "100.0")]
    grid_spacing: f64,

    /// Milliseconds between ticks
    #[arg(long, default_value_t = DEFAULT_TICK_PERIOD_MS)]
    tick_ms: u64,

    /// Maximum number of active cars
    #[arg(long, default_value_t = DEFAULT_MAX_CARS)]
    max_cars: usize,

    /// Probability of spawning a car on each tick
    #[arg(long, default_value_t = DEFAULT_SPAWN_PROBABILITY)]
    spawn_probability: f64,

    /// Car speed in distance units per tick
    #[arg(long, default_value_t = DEFAULT_CAR_SPEED)]
    speed: f64,

    /// Seconds per traffic light phase
    #[arg(long, default_value_t = DEFAULT_LIGHT_PHASE_SECS)]
    light_phase: f64,

    /// When snapshots are sent to observers
    #[arg(long, value_enum, default_value_t = BroadcastMode::Always)]
    broadcast: BroadcastMode,

    /// Seconds to run; 0 runs until Ctrl-C
    #[arg(long, default_value = "10")]
    duration: u64,

    /// Seed for reproducible spawning
    #[arg(long)]
    seed: Option<u64>,

    /// Seconds between summaries
    #[arg(long, default_value = "1")]
    summary_every: u64,
}

impl Cli {
    fn config(&self) -> SimConfig {
        SimConfig {
            tick_period_ms: self.tick_ms,
            max_cars: self.max_cars,
            spawn_probability: self.spawn_probability,
            car_speed: self.speed,
            light_phase_secs: self.light_phase,
            broadcast_mode: self.broadcast,
            observer_buffer: DEFAULT_OBSERVER_BUFFER,
        }
    }

    fn topology(&self) -> Result<Box<dyn TopologySource>> {
        Ok(match &self.topology {
            Some(path) => Box::new(JsonTopology::open(path)?),
            None => {
                info!(
                    "No topology file given, using a {}x{} demo grid",
                    self.grid_rows, self.grid_cols
                );
                Box::new(InMemoryTopology::grid(
                    self.grid_rows,
                    self.grid_cols,
                    self.grid_spacing,
                ))
            }
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let topology = cli.topology()?;
    let mut world =
        SimWorld::from_topology(topology.as_ref(), cli.config()).context("Failed to load map")?;
    if let Some(seed) = cli.seed {
        world = world.with_seed(seed);
    }

    let layout = world.map_layout().to_client_json()?;
    debug!("Map layout: {} bytes", layout.len());

    let engine = SimulationEngine::from_world(world);

    // Stand-in for a network client: log what would go over the wire
    let mut subscription = engine.broadcaster().subscribe();
    let observer = tokio::spawn(async move {
        let mut received = 0u64;
        while let Some(payload) = subscription.receiver.recv().await {
            received += 1;
            debug!("Snapshot {}: {} bytes", received, payload.len());
        }
        received
    });

    engine.start();
    run_until_done(&engine, cli.duration, cli.summary_every).await;
    engine.stop().await;

    engine.with_world(|world| {
        world.print_summary();
        world.stats().log_summary(world.car_count());
    });

    // Dropping the engine drops the broadcaster's sender, which ends the observer
    drop(engine);
    if let Ok(received) = observer.await {
        info!("Observer received {} snapshots", received);
    }
    Ok(())
}

async fn run_until_done(engine: &SimulationEngine, duration: u64, summary_every: u64) {
    let mut summaries = tokio::time::interval(Duration::from_secs(summary_every.max(1)));
    // The first tick fires immediately
    summaries.tick().await;

    let deadline = async {
        if duration == 0 {
            std::future::pending::<()>().await
        } else {
            tokio::time::sleep(Duration::from_secs(duration)).await
        }
    };
    tokio::pin!(deadline);

    // One handler for the whole run
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut ctrl_c => {
                info!("Interrupted, shutting down");
                break;
            }
            _ = summaries.tick() => engine.with_world(|world| world.print_summary()),
        }
    }
}
