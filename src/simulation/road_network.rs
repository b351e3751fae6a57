//! Road network graph for pathfinding
//!
//! Adjacency is built once from the loaded intersections and roads. Every
//! road is treated as two-way.

use log::{info, warn};
use std::collections::HashMap;

use super::pathfinder;
use super::types::{Intersection, IntersectionId, Road};

/// Read-only road graph
#[derive(Debug, Clone, Default)]
pub struct SimRoadNetwork {
    /// Neighbor lists, in road input order
    adjacency: HashMap<IntersectionId, Vec<Intersection>>,

    /// Storage for intersection data
    intersections: HashMap<IntersectionId, Intersection>,

    /// Intersections sorted by ID, for stable random picks
    ordered: Vec<Intersection>,

    /// Roads that were actually applied to the graph
    road_count: usize,
}

impl SimRoadNetwork {
    /// Build the adjacency from intersections and roads
    ///
    /// Every intersection gets a key, even with no road attached. A road
    /// pointing at an unknown intersection is skipped.
    pub fn build(intersections: &[Intersection], roads: &[Road]) -> Self {
        let mut network = Self::default();

        if intersections.is_empty() {
            warn!("No intersections found. Cannot build road network.");
            return network;
        }
        if roads.is_empty() {
            warn!("No roads found. Vehicles will have nowhere to go.");
        }

        for intersection in intersections {
            network.intersections.insert(intersection.id, *intersection);
            network.adjacency.entry(intersection.id).or_default();
        }

        for road in roads {
            let (Some(start), Some(end)) = (
                network.intersections.get(&road.start_intersection).copied(),
                network.intersections.get(&road.end_intersection).copied(),
            ) else {
                warn!(
                    "Skipping road {:?}: endpoint {:?} or {:?} is not a known intersection",
                    road.id, road.start_intersection, road.end_intersection
                );
                continue;
            };

            network.adjacency.entry(start.id).or_default().push(end);
            network.adjacency.entry(end.id).or_default().push(start);
            network.road_count += 1;
        }

        network.ordered = network.intersections.values().copied().collect();
        network.ordered.sort_by_key(|i| i.id);

        info!(
            "Road network adjacency list built: {} intersections, {} roads",
            network.intersection_count(),
            network.road_count
        );
        network
    }

    /// Neighbors of an intersection, empty for unknown IDs
    pub fn neighbors(&self, id: IntersectionId) -> &[Intersection] {
        self.adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<&Intersection> {
        self.intersections.get(&id)
    }

    pub fn contains(&self, id: IntersectionId) -> bool {
        self.intersections.contains_key(&id)
    }

    /// All intersections, sorted by ID
    pub fn intersections(&self) -> &[Intersection] {
        &self.ordered
    }

    pub fn intersection_count(&self) -> usize {
        self.intersections.len()
    }

    pub fn road_count(&self) -> usize {
        self.road_count
    }

    pub fn is_empty(&self) -> bool {
        self.intersections.is_empty()
    }

    /// Shortest path between two intersections using A*
    ///
    /// Empty when there is no route, or start and end coincide.
    pub fn find_shortest_path(
        &self,
        start: IntersectionId,
        end: IntersectionId,
    ) -> Vec<Intersection> {
        pathfinder::find_shortest_path(self, start, end)
    }
}
