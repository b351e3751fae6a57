//! Runtime configuration for the simulation

use anyhow::{bail, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::{
    DEFAULT_CAR_SPEED, DEFAULT_LIGHT_PHASE_SECS, DEFAULT_MAX_CARS, DEFAULT_OBSERVER_BUFFER,
    DEFAULT_SPAWN_PROBABILITY, DEFAULT_TICK_PERIOD_MS,
};

/// When the engine hands a snapshot to the broadcaster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastMode {
    /// Publish every tick, even if nothing moved
    #[default]
    Always,
    /// Publish only on ticks that spawned, moved or removed a car
    OnChange,
}

/// Tunables for the simulation world and its scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tick_period_ms: u64,
    pub max_cars: usize,
    /// Probability in `[0, 1]` of attempting one spawn per tick
    pub spawn_probability: f64,
    /// Distance units travelled per tick
    pub car_speed: f64,
    pub light_phase_secs: f64,
    pub broadcast_mode: BroadcastMode,
    /// Snapshots buffered per observer before it is considered stalled
    pub observer_buffer: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: DEFAULT_TICK_PERIOD_MS,
            max_cars: DEFAULT_MAX_CARS,
            spawn_probability: DEFAULT_SPAWN_PROBABILITY,
            car_speed: DEFAULT_CAR_SPEED,
            light_phase_secs: DEFAULT_LIGHT_PHASE_SECS,
            broadcast_mode: BroadcastMode::Always,
            observer_buffer: DEFAULT_OBSERVER_BUFFER,
        }
    }
}

impl SimConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Simulated seconds that elapse per tick
    pub fn tick_delta_secs(&self) -> f64 {
        self.tick_period_ms as f64 / 1000.0
    }

    /// Reject values the scheduler or the motion law cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.tick_period_ms == 0 {
            bail!("tick period must be at least 1 ms");
        }
        if !(0.0..=1.0).contains(&self.spawn_probability) {
            bail!(
                "spawn probability must be within [0, 1], got {}",
                self.spawn_probability
            );
        }
        if !self.car_speed.is_finite() || self.car_speed <= 0.0 {
            bail!("car speed must be positive, got {}", self.car_speed);
        }
        if !self.light_phase_secs.is_finite() || self.light_phase_secs <= 0.0 {
            bail!(
                "traffic light phase must be positive, got {}",
                self.light_phase_secs
            );
        }
        if self.observer_buffer == 0 {
            bail!("observer buffer must hold at least one snapshot");
        }
        Ok(())
    }
}
