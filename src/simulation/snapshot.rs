//! Immutable per-tick view of the active cars
//!
//! This is what observers receive. It only carries flat intersection records
//! so serialization never follows references back into the world.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::car::SimCar;
use super::types::{CarId, Intersection};

/// Wire form of one car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarSnapshot {
    pub id: CarId,
    pub x: f64,
    pub y: f64,
    pub path: Vec<Intersection>,
    pub current_path_index: usize,
}

impl From<&SimCar> for CarSnapshot {
    fn from(car: &SimCar) -> Self {
        Self {
            id: car.id,
            x: car.position.x,
            y: car.position.y,
            path: car.path.clone(),
            current_path_index: car.current_path_index,
        }
    }
}

/// All active cars at the end of one tick
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tick: u64,
    pub cars: Arc<[CarSnapshot]>,
}

impl Snapshot {
    pub fn new(tick: u64, cars: Vec<CarSnapshot>) -> Self {
        Self {
            tick,
            cars: cars.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.cars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    /// JSON array of cars, as sent to observers
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&*self.cars)
            .with_context(|| format!("Failed to serialize snapshot for tick {}", self.tick))
    }
}
