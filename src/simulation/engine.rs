//! Fixed-rate scheduler driving a [`SimWorld`]
//!
//! A single tokio task owns ticking, so it is the only writer of car and
//! light state. Other tasks only take the world lock to read.

use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::broadcaster::{Broadcaster, PublishReport};
use super::config::BroadcastMode;
use super::world::{SimWorld, TickOutcome};

/// How long `stop` waits for the worker before aborting it
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

struct Worker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns a world and ticks it on a fixed period
pub struct SimulationEngine {
    world: Arc<Mutex<SimWorld>>,
    broadcaster: Arc<Broadcaster>,
    worker: Mutex<Option<Worker>>,
}

fn lock_world(world: &Mutex<SimWorld>) -> MutexGuard<'_, SimWorld> {
    world.lock().unwrap_or_else(|poisoned| {
        warn!("World lock was poisoned, recovering");
        PoisonError::into_inner(poisoned)
    })
}

/// Run one tick and publish its snapshot if the mode asks for it
fn step(
    world: &Mutex<SimWorld>,
    broadcaster: &Broadcaster,
    mode: BroadcastMode,
) -> (TickOutcome, Option<PublishReport>) {
    // The lock is released before publishing
    let outcome = lock_world(world).tick();

    let publish = match mode {
        BroadcastMode::Always => true,
        BroadcastMode::OnChange => outcome.state_changed,
    };
    let report = publish.then(|| broadcaster.publish(&outcome.snapshot));
    (outcome, report)
}

async fn run_ticks(
    world: Arc<Mutex<SimWorld>>,
    broadcaster: Arc<Broadcaster>,
    period: Duration,
    mode: BroadcastMode,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                let (outcome, report) = step(&world, &broadcaster, mode);
                if let Some(report) = report {
                    if report.dropped > 0 {
                        debug!("Tick {}: dropped {} observer(s)", outcome.tick, report.dropped);
                    }
                }
            }
        }
    }

    debug!("Tick worker exiting");
}

impl SimulationEngine {
    pub fn new(world: SimWorld, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            world: Arc::new(Mutex::new(world)),
            broadcaster,
            worker: Mutex::new(None),
        }
    }

    /// Engine with its own broadcaster sized from the world's config
    pub fn from_world(world: SimWorld) -> Self {
        let broadcaster = Arc::new(Broadcaster::new(world.config().observer_buffer));
        Self::new(world, broadcaster)
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(|poisoned| {
            warn!("Worker lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Start the tick worker on the current tokio runtime
    ///
    /// Returns `false` without doing anything if the worker is already
    /// running or there is no runtime to spawn on.
    pub fn start(&self) -> bool {
        let mut worker = self.lock_worker();
        if let Some(existing) = worker.as_ref() {
            if !existing.handle.is_finished() {
                warn!("Simulation loop already running");
                return false;
            }
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Cannot start simulation loop outside a tokio runtime: {}", e);
                return false;
            }
        };

        let (period, mode) = {
            let world = lock_world(&self.world);
            (world.config().tick_period(), world.config().broadcast_mode)
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(run_ticks(
            Arc::clone(&self.world),
            Arc::clone(&self.broadcaster),
            period,
            mode,
            shutdown_rx,
        ));
        *worker = Some(Worker { shutdown, handle });

        info!(
            "Simulation loop started ({} ms period, {:?} broadcast)",
            period.as_millis(),
            mode
        );
        true
    }

    /// Stop the tick worker and wait for it to exit
    ///
    /// A tick in progress always completes. Does nothing if not running.
    pub async fn stop(&self) {
        let Some(Worker { shutdown, mut handle }) = self.lock_worker().take() else {
            debug!("Simulation loop not running");
            return;
        };

        // Err only means the worker already exited
        let _ = shutdown.send(true);

        match time::timeout(SHUTDOWN_TIMEOUT, &mut handle).await {
            Ok(Ok(())) => info!("Simulation loop stopped"),
            Ok(Err(e)) => warn!("Simulation loop ended abnormally: {}", e),
            Err(_) => {
                warn!(
                    "Simulation loop did not stop within {:?}, aborting",
                    SHUTDOWN_TIMEOUT
                );
                handle.abort();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_worker()
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Run a single tick on the caller's thread
    ///
    /// Meant for hosts that drive time themselves; it should not be mixed
    /// with a running worker.
    pub fn tick_once(&self) -> TickOutcome {
        let mode = lock_world(&self.world).config().broadcast_mode;
        step(&self.world, &self.broadcaster, mode).0
    }

    /// Shared handle to the world, for reads
    pub fn world(&self) -> Arc<Mutex<SimWorld>> {
        Arc::clone(&self.world)
    }

    /// Run `f` with the world locked
    pub fn with_world<R>(&self, f: impl FnOnce(&SimWorld) -> R) -> R {
        f(&lock_world(&self.world))
    }

    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        Arc::clone(&self.broadcaster)
    }
}
