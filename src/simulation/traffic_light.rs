//! Traffic light timer
//!
//! Lights cycle on their own clock. Neither car motion nor pathfinding reads
//! the phase.

use serde::{Deserialize, Serialize};

use super::types::{IntersectionId, TrafficLightId, TrafficLightRecord};

/// Which axis currently has green
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightPhase {
    #[serde(rename = "NS_GREEN")]
    NsGreen,
    #[serde(rename = "EW_GREEN")]
    EwGreen,
}

impl LightPhase {
    pub fn toggled(self) -> Self {
        match self {
            LightPhase::NsGreen => LightPhase::EwGreen,
            LightPhase::EwGreen => LightPhase::NsGreen,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LightPhase::NsGreen => "NS_GREEN",
            LightPhase::EwGreen => "EW_GREEN",
        }
    }

    pub fn parse(state: &str) -> Option<Self> {
        match state.trim() {
            "NS_GREEN" => Some(LightPhase::NsGreen),
            "EW_GREEN" => Some(LightPhase::EwGreen),
            _ => None,
        }
    }
}

/// A two-phase traffic light
#[derive(Debug, Clone, PartialEq)]
pub struct SimTrafficLight {
    pub id: TrafficLightId,
    /// The intersection this light stands at (not owned)
    pub intersection_id: IntersectionId,
    pub phase: LightPhase,
    /// Seconds each phase lasts
    pub phase_duration: f64,
    /// Seconds spent in the current phase, always below `phase_duration`
    pub elapsed: f64,
}

impl SimTrafficLight {
    pub fn new(id: TrafficLightId, intersection_id: IntersectionId, phase_duration: f64) -> Self {
        Self {
            id,
            intersection_id,
            phase: LightPhase::NsGreen,
            phase_duration,
            elapsed: 0.0,
        }
    }

    /// Build from a stored row; unknown states start in `NsGreen`
    pub fn from_record(record: &TrafficLightRecord, phase_duration: f64) -> Self {
        let mut light = Self::new(record.id, record.intersection_id, phase_duration);
        if let Some(phase) = record.current_state.as_deref().and_then(LightPhase::parse) {
            light.phase = phase;
        }
        light
    }

    /// Advance the timer, returning whether the phase flipped
    ///
    /// Flips at most once per call, however large `delta_time` is.
    pub fn tick(&mut self, delta_time: f64) -> bool {
        self.elapsed += delta_time;
        if self.elapsed >= self.phase_duration {
            self.phase = self.phase.toggled();
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }

    /// Stored form with the live phase
    pub fn to_record(&self) -> TrafficLightRecord {
        TrafficLightRecord {
            id: self.id,
            intersection_id: self.intersection_id,
            current_state: Some(self.phase.as_str().to_string()),
        }
    }
}
