//! Standalone traffic simulation module
//!
//! Road graph, A* pathfinding, cars and traffic lights, the per-tick world
//! state machine, and the scheduler that streams snapshots to observers.

mod broadcaster;
mod car;
mod config;
mod engine;
mod pathfinder;
mod road_network;
mod snapshot;
mod stats;
mod topology;
mod traffic_light;
mod types;
mod world;

pub use broadcaster::{Broadcaster, ObserverId, PublishReport, Subscription};
pub use car::{CarUpdateResult, SimCar};
pub use config::{BroadcastMode, SimConfig};
pub use engine::{SimulationEngine, SHUTDOWN_TIMEOUT};
pub use pathfinder::{find_shortest_path, path_length, PathNode};
pub use road_network::SimRoadNetwork;
pub use snapshot::{CarSnapshot, Snapshot};
pub use stats::SimStats;
pub use topology::{
    ClientMapLayout, ClientRoad, ClientTrafficLight, InMemoryTopology, JsonTopology, MapLayout,
    TopologyFile, TopologySource,
};
pub use traffic_light::{LightPhase, SimTrafficLight};
pub use types::{
    CarId, Intersection, IntersectionId, Position, Road, RoadId, TrafficLightId,
    TrafficLightRecord, DEFAULT_CAR_SPEED, DEFAULT_LIGHT_PHASE_SECS, DEFAULT_MAX_CARS,
    DEFAULT_OBSERVER_BUFFER, DEFAULT_SPAWN_PROBABILITY, DEFAULT_TICK_PERIOD_MS,
};
pub use world::{SimWorld, TickOutcome};
