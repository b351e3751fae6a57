//! Core types for the traffic simulation
//!
//! Identities, coordinates and the static map records loaded from a
//! topology source.

use serde::{Deserialize, Serialize};

/// A wrapper type for intersection IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntersectionId(pub u64);

/// A wrapper type for road IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoadId(pub u64);

/// A wrapper type for traffic light IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrafficLightId(pub u64);

/// A wrapper type for car IDs
///
/// Handed out by the owning world from a monotonic counter, so IDs are unique
/// for the lifetime of that world only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CarId(pub u64);

/// A 2D position in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Move exactly `step` units along the straight line towards `target`.
    ///
    /// The caller guarantees `step` is smaller than the remaining distance;
    /// a zero-length direction returns the position unchanged.
    pub fn step_towards(&self, target: &Position, step: f64) -> Position {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        let len = (dx * dx + dy * dy).sqrt();
        if len > 0.0 {
            Position {
                x: self.x + dx / len * step,
                y: self.y + dy / len * step,
            }
        } else {
            *self
        }
    }
}

/// A node of the road graph
///
/// Coordinates go over the wire as `xcoordinate`/`ycoordinate`, which is what
/// map clients read; `x`/`y` are accepted when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intersection {
    pub id: IntersectionId,
    #[serde(rename = "xcoordinate", alias = "x")]
    pub x: f64,
    #[serde(rename = "ycoordinate", alias = "y")]
    pub y: f64,
    #[serde(default)]
    pub has_traffic_light: bool,
}

impl Intersection {
    pub fn new(id: IntersectionId, x: f64, y: f64, has_traffic_light: bool) -> Self {
        Self {
            id,
            x,
            y,
            has_traffic_light,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    /// Euclidean distance between two intersections
    pub fn distance(&self, other: &Intersection) -> f64 {
        self.position().distance(&other.position())
    }
}

/// An undirected road between two intersections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Road {
    pub id: RoadId,
    pub start_intersection: IntersectionId,
    pub end_intersection: IntersectionId,
}

impl Road {
    pub fn new(id: RoadId, start: IntersectionId, end: IntersectionId) -> Self {
        Self {
            id,
            start_intersection: start,
            end_intersection: end,
        }
    }
}

/// A traffic light row as stored by the topology source
///
/// `current_state` is free text in storage; the simulation only understands
/// `"NS_GREEN"` and `"EW_GREEN"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficLightRecord {
    pub id: TrafficLightId,
    pub intersection_id: IntersectionId,
    #[serde(default)]
    pub current_state: Option<String>,
}

/// Default period between two ticks, in milliseconds (~30 Hz)
pub const DEFAULT_TICK_PERIOD_MS: u64 = 33;

/// Default cap on the number of active cars
pub const DEFAULT_MAX_CARS: usize = 50;

/// Default per-tick probability of spawning one car
pub const DEFAULT_SPAWN_PROBABILITY: f64 = 0.05;

/// Default car speed in distance units per tick
pub const DEFAULT_CAR_SPEED: f64 = 2.0;

/// Default duration of one traffic light phase, in simulated seconds
pub const DEFAULT_LIGHT_PHASE_SECS: f64 = 20.0;

/// Default number of snapshots buffered per observer
pub const DEFAULT_OBSERVER_BUFFER: usize = 16;
