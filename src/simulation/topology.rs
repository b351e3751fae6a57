//! Map topology sources
//!
//! The simulation reads intersections, roads and traffic lights once at
//! startup through [`TopologySource`]. Where they are stored is up to the
//! implementation.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::types::{
    Intersection, IntersectionId, Road, RoadId, TrafficLightId, TrafficLightRecord,
};

/// Read-only access to the stored map
pub trait TopologySource {
    fn intersections(&self) -> Result<Vec<Intersection>>;
    fn roads(&self) -> Result<Vec<Road>>;
    fn traffic_lights(&self) -> Result<Vec<TrafficLightRecord>>;
}

/// Full map layout, as served to clients drawing the static map
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapLayout {
    pub intersections: Vec<Intersection>,
    pub roads: Vec<Road>,
    #[serde(default)]
    pub traffic_lights: Vec<TrafficLightRecord>,
}

/// On-disk topology document; same shape as [`MapLayout`]
pub type TopologyFile = MapLayout;

/// A road with both endpoints resolved, as map clients read it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRoad {
    pub id: RoadId,
    pub start_intersection: Intersection,
    pub end_intersection: Intersection,
}

/// A traffic light with its intersection record inlined
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTrafficLight {
    pub id: TrafficLightId,
    pub intersection: Intersection,
    pub current_state: Option<String>,
}

/// Map layout in the shape drawing clients expect
///
/// Intersection records are copied in by value, so nothing points back
/// into the world.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMapLayout {
    pub intersections: Vec<Intersection>,
    pub roads: Vec<ClientRoad>,
    pub traffic_lights: Vec<ClientTrafficLight>,
}

impl MapLayout {
    /// Resolve road and light references into full intersection records
    ///
    /// Entries pointing at unknown intersections are left out.
    pub fn to_client(&self) -> ClientMapLayout {
        let by_id: HashMap<IntersectionId, Intersection> =
            self.intersections.iter().map(|i| (i.id, *i)).collect();

        let roads = self
            .roads
            .iter()
            .filter_map(|road| {
                match (
                    by_id.get(&road.start_intersection),
                    by_id.get(&road.end_intersection),
                ) {
                    (Some(start), Some(end)) => Some(ClientRoad {
                        id: road.id,
                        start_intersection: *start,
                        end_intersection: *end,
                    }),
                    _ => {
                        warn!("Leaving road {:?} out of the layout: unknown endpoint", road.id);
                        None
                    }
                }
            })
            .collect();

        let traffic_lights = self
            .traffic_lights
            .iter()
            .filter_map(|light| match by_id.get(&light.intersection_id) {
                Some(intersection) => Some(ClientTrafficLight {
                    id: light.id,
                    intersection: *intersection,
                    current_state: light.current_state.clone(),
                }),
                None => {
                    warn!(
                        "Leaving traffic light {:?} out of the layout: unknown intersection",
                        light.id
                    );
                    None
                }
            })
            .collect();

        ClientMapLayout {
            intersections: self.intersections.clone(),
            roads,
            traffic_lights,
        }
    }

    /// JSON body for the map layout read
    pub fn to_client_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_client()).context("Failed to serialize map layout")
    }
}

/// Topology held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryTopology {
    pub layout: MapLayout,
}

impl InMemoryTopology {
    pub fn new(
        intersections: Vec<Intersection>,
        roads: Vec<Road>,
        traffic_lights: Vec<TrafficLightRecord>,
    ) -> Self {
        Self {
            layout: MapLayout {
                intersections,
                roads,
                traffic_lights,
            },
        }
    }

    /// A `rows` x `cols` grid with roads between orthogonal neighbors
    ///
    /// Interior intersections (four roads) get a traffic light.
    pub fn grid(rows: usize, cols: usize, spacing: f64) -> Self {
        let id_at = |row: usize, col: usize| IntersectionId((row * cols + col) as u64 + 1);

        let mut intersections = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let interior = row > 0 && col > 0 && row + 1 < rows && col + 1 < cols;
                intersections.push(Intersection::new(
                    id_at(row, col),
                    col as f64 * spacing,
                    row as f64 * spacing,
                    interior,
                ));
            }
        }

        let mut roads = Vec::new();
        let mut next_road = 1;
        for row in 0..rows {
            for col in 0..cols {
                if col + 1 < cols {
                    roads.push(Road::new(RoadId(next_road), id_at(row, col), id_at(row, col + 1)));
                    next_road += 1;
                }
                if row + 1 < rows {
                    roads.push(Road::new(RoadId(next_road), id_at(row, col), id_at(row + 1, col)));
                    next_road += 1;
                }
            }
        }

        let traffic_lights = intersections
            .iter()
            .filter(|i| i.has_traffic_light)
            .enumerate()
            .map(|(n, i)| TrafficLightRecord {
                id: TrafficLightId(n as u64 + 1),
                intersection_id: i.id,
                current_state: None,
            })
            .collect();

        Self::new(intersections, roads, traffic_lights)
    }
}

impl TopologySource for InMemoryTopology {
    fn intersections(&self) -> Result<Vec<Intersection>> {
        Ok(self.layout.intersections.clone())
    }

    fn roads(&self) -> Result<Vec<Road>> {
        Ok(self.layout.roads.clone())
    }

    fn traffic_lights(&self) -> Result<Vec<TrafficLightRecord>> {
        Ok(self.layout.traffic_lights.clone())
    }
}

/// Topology read from a JSON file
#[derive(Debug, Clone)]
pub struct JsonTopology {
    path: PathBuf,
    layout: MapLayout,
}

impl JsonTopology {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read topology file {}", path.display()))?;
        let layout = Self::parse(&data)
            .with_context(|| format!("Failed to parse topology file {}", path.display()))?;
        info!(
            "Loaded topology from {}: {} intersections, {} roads, {} traffic lights",
            path.display(),
            layout.intersections.len(),
            layout.roads.len(),
            layout.traffic_lights.len()
        );
        Ok(Self { path, layout })
    }

    pub fn parse(data: &str) -> Result<TopologyFile> {
        serde_json::from_str(data).context("Invalid topology JSON")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TopologySource for JsonTopology {
    fn intersections(&self) -> Result<Vec<Intersection>> {
        Ok(self.layout.intersections.clone())
    }

    fn roads(&self) -> Result<Vec<Road>> {
        Ok(self.layout.roads.clone())
    }

    fn traffic_lights(&self) -> Result<Vec<TrafficLightRecord>> {
        Ok(self.layout.traffic_lights.clone())
    }
}
