//! Car movement logic for the traffic simulation

use super::types::{CarId, Intersection, Position};

/// Result of a car update indicating what action should be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarUpdateResult {
    Moved,           // Still travelling towards the current waypoint
    ReachedWaypoint, // Snapped onto an intermediate waypoint
    Arrived,         // Snapped onto the final waypoint
    Despawn,         // No resolvable target, car should be removed
}

impl CarUpdateResult {
    /// Whether the car leaves the active set after this update
    pub fn is_removal(self) -> bool {
        matches!(self, CarUpdateResult::Arrived | CarUpdateResult::Despawn)
    }
}

/// A car following a precomputed path
#[derive(Debug, Clone, PartialEq)]
pub struct SimCar {
    pub id: CarId,
    pub position: Position,
    pub path: Vec<Intersection>,
    /// Index of the next waypoint not yet reached
    pub current_path_index: usize,
}

impl SimCar {
    /// Place a car on the first waypoint of `path`, heading to the second
    ///
    /// Returns `None` for paths shorter than two waypoints.
    pub fn new(id: CarId, path: Vec<Intersection>) -> Option<Self> {
        if path.len() < 2 {
            return None;
        }
        let position = path[0].position();
        Some(Self {
            id,
            position,
            path,
            current_path_index: 1,
        })
    }

    /// The waypoint the car is driving towards
    pub fn current_target(&self) -> Option<&Intersection> {
        self.path.get(self.current_path_index)
    }

    pub fn has_reached_final_destination(&self) -> bool {
        self.current_path_index >= self.path.len()
    }

    /// Drive `speed` units towards the current waypoint
    ///
    /// If the waypoint is within `speed`, the car snaps onto it exactly and
    /// the cursor moves on; it never overshoots.
    pub fn advance(&mut self, speed: f64) -> CarUpdateResult {
        let Some(target) = self.current_target() else {
            return CarUpdateResult::Despawn;
        };
        let target = target.position();

        let distance = self.position.distance(&target);
        if distance <= speed {
            self.position = target;
            self.current_path_index += 1;
            if self.has_reached_final_destination() {
                CarUpdateResult::Arrived
            } else {
                CarUpdateResult::ReachedWaypoint
            }
        } else {
            self.position = self.position.step_towards(&target, speed);
            CarUpdateResult::Moved
        }
    }
}
