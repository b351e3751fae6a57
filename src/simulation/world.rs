//! Main simulation world that ties everything together
//!
//! `SimWorld` is the synchronous state machine behind the scheduler. One
//! call to [`SimWorld::tick`] spawns, moves and removes cars, advances the
//! traffic lights and returns the snapshot to broadcast, in that order.

use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashSet};

use super::car::{CarUpdateResult, SimCar};
use super::config::SimConfig;
use super::road_network::SimRoadNetwork;
use super::snapshot::{CarSnapshot, Snapshot};
use super::stats::SimStats;
use super::topology::{MapLayout, TopologySource};
use super::traffic_light::SimTrafficLight;
use super::types::{
    CarId, Intersection, IntersectionId, Road, TrafficLightId, TrafficLightRecord,
};

/// What happened during one tick
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub tick: u64,
    pub snapshot: Snapshot,
    /// A car was spawned, moved or removed
    pub state_changed: bool,
    pub spawned: Option<CarId>,
    pub arrived: Vec<CarId>,
    pub despawned: Vec<CarId>,
    pub light_changes: usize,
}

/// The main simulation world
pub struct SimWorld {
    /// Road network for pathfinding
    road_network: SimRoadNetwork,

    /// Roads as loaded, kept for the map layout
    roads: Vec<Road>,

    /// Active cars, iterated in ID order
    cars: BTreeMap<CarId, SimCar>,

    traffic_lights: Vec<SimTrafficLight>,

    config: SimConfig,

    /// Next car ID to assign
    next_car_id: u64,

    tick_count: u64,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,

    stats: SimStats,
}

impl SimWorld {
    /// Build a world from already loaded map data
    ///
    /// Fails when `config` does not validate; a world never holds a config
    /// the scheduler cannot run.
    pub fn new(
        intersections: Vec<Intersection>,
        roads: Vec<Road>,
        light_records: Vec<TrafficLightRecord>,
        config: SimConfig,
    ) -> Result<Self> {
        config.validate().context("Invalid simulation config")?;

        let road_network = SimRoadNetwork::build(&intersections, &roads);
        let traffic_lights = Self::build_traffic_lights(&road_network, &light_records, &config);

        if road_network.intersection_count() < 2 {
            warn!(
                "Only {} intersection(s) loaded; cars cannot be spawned",
                road_network.intersection_count()
            );
        }

        Ok(Self {
            road_network,
            roads,
            cars: BTreeMap::new(),
            traffic_lights,
            config,
            next_car_id: 0,
            tick_count: 0,
            rng: None,
            stats: SimStats::default(),
        })
    }

    /// Load the map from a topology source
    pub fn from_topology(source: &dyn TopologySource, config: SimConfig) -> Result<Self> {
        let intersections = source
            .intersections()
            .context("Failed to load intersections")?;
        let roads = source.roads().context("Failed to load roads")?;
        let lights = source
            .traffic_lights()
            .context("Failed to load traffic lights")?;
        Self::new(intersections, roads, lights, config)
    }

    /// Use a seeded RNG so spawn decisions are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    /// One light per stored record, plus one for every light-bearing
    /// intersection that has no record
    fn build_traffic_lights(
        road_network: &SimRoadNetwork,
        records: &[TrafficLightRecord],
        config: &SimConfig,
    ) -> Vec<SimTrafficLight> {
        let mut lights = Vec::new();
        let mut covered = HashSet::new();

        for record in records {
            if !road_network.contains(record.intersection_id) {
                warn!(
                    "Skipping traffic light {:?}: intersection {:?} does not exist",
                    record.id, record.intersection_id
                );
                continue;
            }
            if !covered.insert(record.intersection_id) {
                warn!(
                    "Skipping traffic light {:?}: intersection {:?} already has one",
                    record.id, record.intersection_id
                );
                continue;
            }
            lights.push(SimTrafficLight::from_record(record, config.light_phase_secs));
        }

        // Fresh IDs continue after the highest stored one; `None` once the
        // ID space is used up.
        let mut next_id = match records.iter().map(|r| r.id.0).max() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        };
        for intersection in road_network.intersections() {
            if !intersection.has_traffic_light || covered.contains(&intersection.id) {
                continue;
            }
            let Some(id) = next_id else {
                warn!(
                    "No traffic light ID left for intersection {:?}, leaving it without a light",
                    intersection.id
                );
                continue;
            };
            covered.insert(intersection.id);
            lights.push(SimTrafficLight::new(
                TrafficLightId(id),
                intersection.id,
                config.light_phase_secs,
            ));
            next_id = id.checked_add(1);
        }

        debug!("{} traffic light(s) created", lights.len());
        lights
    }

    /// Draw with probability `p`, using seeded RNG if available
    fn random_bool(&mut self, p: f64) -> bool {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        match &mut self.rng {
            Some(rng) => rng.random_bool(p),
            None => rand::rng().random_bool(p),
        }
    }

    /// Uniform index in `0..len`, using seeded RNG if available
    fn random_index(&mut self, len: usize) -> usize {
        match &mut self.rng {
            Some(rng) => rng.random_range(0..len),
            None => rand::rng().random_range(0..len),
        }
    }

    /// Choose a random element from a slice, using seeded RNG if available
    fn choose_random<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        match &mut self.rng {
            Some(rng) => slice.choose(rng),
            None => slice.choose(&mut rand::rng()),
        }
    }

    fn next_car_id(&mut self) -> CarId {
        let id = CarId(self.next_car_id);
        self.next_car_id += 1;
        id
    }

    /// Whether there are enough intersections for a trip
    pub fn can_spawn(&self) -> bool {
        self.road_network.intersection_count() >= 2
    }

    /// Try to spawn a car between two random distinct intersections
    ///
    /// Returns `None` when the map is too small, the population cap is
    /// reached or no route exists. None of these are errors.
    pub fn try_spawn_car(&mut self) -> Option<CarId> {
        if !self.can_spawn() {
            debug!("Cannot spawn car: need at least two intersections");
            return None;
        }

        let count = self.road_network.intersection_count();
        let start_index = self.random_index(count);
        // Pick among the other count - 1 intersections
        let mut end_index = self.random_index(count - 1);
        if end_index >= start_index {
            end_index += 1;
        }
        let start = self.road_network.intersections()[start_index].id;
        let end = self.road_network.intersections()[end_index].id;

        self.spawn_car_between(start, end)
    }

    /// Spawn a car on the shortest route from `start` to `end`
    pub fn spawn_car_between(
        &mut self,
        start: IntersectionId,
        end: IntersectionId,
    ) -> Option<CarId> {
        if self.cars.len() >= self.config.max_cars {
            debug!("Population cap of {} reached", self.config.max_cars);
            return None;
        }

        let path = self.road_network.find_shortest_path(start, end);
        if path.len() < 2 {
            debug!(
                "Could not find a valid path for a car from {:?} to {:?}",
                start, end
            );
            self.stats.failed_spawns += 1;
            return None;
        }

        let id = self.next_car_id();
        let car = SimCar::new(id, path)?;
        trace!(
            "Spawned car {:?} at ({:.1}, {:.1}), path length {}",
            id,
            car.position.x,
            car.position.y,
            car.path.len()
        );
        self.cars.insert(id, car);
        self.stats.total_spawned += 1;
        Some(id)
    }

    /// Spawn a car at a random intersection other than `start`
    ///
    /// Used by hosts that want to seed traffic at a given place.
    pub fn spawn_car_from(&mut self, start: IntersectionId) -> Option<CarId> {
        let candidates: Vec<IntersectionId> = self
            .road_network
            .intersections()
            .iter()
            .map(|i| i.id)
            .filter(|id| *id != start)
            .collect();
        let end = *self.choose_random(&candidates)?;
        self.spawn_car_between(start, end)
    }

    /// Advance every car one step
    ///
    /// Works on a copy of the current IDs and removes finished cars only
    /// after the pass. Returns (arrived, despawned, any_motion).
    fn update_cars(&mut self) -> (Vec<CarId>, Vec<CarId>, bool) {
        let speed = self.config.car_speed;
        let car_ids: Vec<CarId> = self.cars.keys().copied().collect();

        let mut arrived = Vec::new();
        let mut despawned = Vec::new();
        let mut moved = false;

        for car_id in car_ids {
            let Some(car) = self.cars.get_mut(&car_id) else {
                continue;
            };
            match car.advance(speed) {
                CarUpdateResult::Moved => moved = true,
                CarUpdateResult::ReachedWaypoint => {
                    moved = true;
                    trace!("Car {:?} reached waypoint {}", car_id, car.current_path_index - 1);
                }
                CarUpdateResult::Arrived => arrived.push(car_id),
                CarUpdateResult::Despawn => {
                    warn!("Car {:?} has no target waypoint, removing it", car_id);
                    despawned.push(car_id);
                }
            }
        }

        for car_id in arrived.iter().chain(despawned.iter()) {
            self.cars.remove(car_id);
        }
        if !arrived.is_empty() {
            trace!("{} car(s) arrived at their destination", arrived.len());
        }

        (arrived, despawned, moved)
    }

    /// Advance every traffic light, returning how many changed phase
    fn update_traffic_lights(&mut self, delta_secs: f64) -> usize {
        let mut changes = 0;
        for light in &mut self.traffic_lights {
            if light.tick(delta_secs) {
                trace!(
                    "Traffic light {:?} switched to {}",
                    light.id,
                    light.phase.as_str()
                );
                changes += 1;
            }
        }
        changes
    }

    /// Run one tick: spawn, move cars, tick lights, snapshot
    pub fn tick(&mut self) -> TickOutcome {
        self.tick_count += 1;
        self.stats.ticks += 1;

        let mut spawned = None;
        if self.cars.len() < self.config.max_cars
            && self.random_bool(self.config.spawn_probability)
        {
            spawned = self.try_spawn_car();
        }

        let (arrived, despawned, moved) = self.update_cars();
        self.stats.total_arrived += arrived.len() as u64;
        self.stats.total_despawned += despawned.len() as u64;

        let light_changes = self.update_traffic_lights(self.config.tick_delta_secs());
        self.stats.light_changes += light_changes as u64;

        let state_changed =
            spawned.is_some() || moved || !arrived.is_empty() || !despawned.is_empty();

        TickOutcome {
            tick: self.tick_count,
            snapshot: self.snapshot(),
            state_changed,
            spawned,
            arrived,
            despawned,
            light_changes,
        }
    }

    /// Immutable copy of the active cars
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(
            self.tick_count,
            self.cars.values().map(CarSnapshot::from).collect(),
        )
    }

    /// Intersections, roads and lights for drawing the static map
    pub fn map_layout(&self) -> MapLayout {
        MapLayout {
            intersections: self.road_network.intersections().to_vec(),
            roads: self.roads.clone(),
            traffic_lights: self
                .traffic_lights
                .iter()
                .map(SimTrafficLight::to_record)
                .collect(),
        }
    }

    pub fn road_network(&self) -> &SimRoadNetwork {
        &self.road_network
    }

    pub fn cars(&self) -> &BTreeMap<CarId, SimCar> {
        &self.cars
    }

    pub fn car(&self, id: CarId) -> Option<&SimCar> {
        self.cars.get(&id)
    }

    pub fn car_count(&self) -> usize {
        self.cars.len()
    }

    pub fn traffic_lights(&self) -> &[SimTrafficLight] {
        &self.traffic_lights
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        info!("=== Traffic Simulation Summary ===");
        info!(
            "Tick: {} ({:.2}s simulated)",
            self.tick_count,
            self.tick_count as f64 * self.config.tick_delta_secs()
        );
        info!(
            "Intersections: {}, Roads: {}, Traffic lights: {}",
            self.road_network.intersection_count(),
            self.road_network.road_count(),
            self.traffic_lights.len()
        );
        info!("Cars: {}/{}", self.cars.len(), self.config.max_cars);
        for car in self.cars.values() {
            debug!(
                "  Car {:?}: position=({:.1}, {:.1}), waypoint {}/{}",
                car.id.0,
                car.position.x,
                car.position.y,
                car.current_path_index,
                car.path.len()
            );
        }
    }
}
