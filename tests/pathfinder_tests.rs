//! Shortest path tests
//!
//! A* results are checked against petgraph's Dijkstra on the same graphs.

use petgraph::algo::dijkstra;
use petgraph::graph::{NodeIndex, UnGraph};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use traffic_sim::simulation::{
    find_shortest_path, path_length, Intersection, IntersectionId, Road, RoadId, SimRoadNetwork,
};

fn intersection(id: u64, x: f64, y: f64) -> Intersection {
    Intersection::new(IntersectionId(id), x, y, false)
}

fn road(id: u64, a: u64, b: u64) -> Road {
    Road::new(RoadId(id), IntersectionId(a), IntersectionId(b))
}

/// Square (0,0) (10,0) (10,10) (0,10) with its four sides as roads
fn square() -> (Vec<Intersection>, Vec<Road>) {
    let intersections = vec![
        intersection(1, 0.0, 0.0),
        intersection(2, 10.0, 0.0),
        intersection(3, 10.0, 10.0),
        intersection(4, 0.0, 10.0),
    ];
    let roads = vec![road(1, 1, 2), road(2, 2, 3), road(3, 3, 4), road(4, 4, 1)];
    (intersections, roads)
}

fn ids(path: &[Intersection]) -> Vec<u64> {
    path.iter().map(|i| i.id.0).collect()
}

/// Reference distance from petgraph, `None` when unreachable
fn reference_distance(
    intersections: &[Intersection],
    roads: &[Road],
    start: IntersectionId,
    end: IntersectionId,
) -> Option<f64> {
    let mut graph = UnGraph::<IntersectionId, f64>::new_undirected();
    let mut nodes: HashMap<IntersectionId, NodeIndex> = HashMap::new();
    let mut positions = HashMap::new();
    for i in intersections {
        nodes.insert(i.id, graph.add_node(i.id));
        positions.insert(i.id, *i);
    }
    for r in roads {
        let a = positions[&r.start_intersection];
        let b = positions[&r.end_intersection];
        graph.add_edge(nodes[&a.id], nodes[&b.id], a.distance(&b));
    }
    let distances = dijkstra(&graph, nodes[&start], Some(nodes[&end]), |e| *e.weight());
    distances.get(&nodes[&end]).copied()
}

fn assert_valid_route(network: &SimRoadNetwork, path: &[Intersection]) {
    for pair in path.windows(2) {
        assert!(
            network.neighbors(pair[0].id).iter().any(|n| n.id == pair[1].id),
            "{:?} and {:?} are not connected",
            pair[0].id,
            pair[1].id
        );
    }
}

#[test]
fn test_square_corner_to_corner() {
    let (intersections, roads) = square();
    let network = SimRoadNetwork::build(&intersections, &roads);

    let path = find_shortest_path(&network, IntersectionId(1), IntersectionId(3));
    assert_eq!(path.len(), 3);
    assert_eq!(path.first().map(|i| i.id), Some(IntersectionId(1)));
    assert_eq!(path.last().map(|i| i.id), Some(IntersectionId(3)));
    assert!((path_length(&path) - 20.0).abs() < 1e-9);

    let reference =
        reference_distance(&intersections, &roads, IntersectionId(1), IntersectionId(3));
    assert_eq!(reference, Some(20.0));
}

#[test]
fn test_square_with_diagonal_takes_diagonal() {
    let (intersections, mut roads) = square();
    roads.push(road(5, 1, 3));
    let network = SimRoadNetwork::build(&intersections, &roads);

    let path = network.find_shortest_path(IntersectionId(1), IntersectionId(3));
    assert_eq!(ids(&path), vec![1, 3]);

    let expected = 200.0_f64.sqrt();
    assert!((path_length(&path) - expected).abs() < 1e-9);
    let reference =
        reference_distance(&intersections, &roads, IntersectionId(1), IntersectionId(3))
            .expect("reachable");
    assert!((path_length(&path) - reference).abs() < 1e-9);
}

#[test]
fn test_equal_cost_routes_break_ties_by_insertion_order() {
    let (intersections, roads) = square();
    let network = SimRoadNetwork::build(&intersections, &roads);

    // Both sides cost 20; the neighbor reached through the first road wins
    let first = find_shortest_path(&network, IntersectionId(1), IntersectionId(3));
    let second = find_shortest_path(&network, IntersectionId(1), IntersectionId(3));
    assert_eq!(ids(&first), vec![1, 2, 3]);
    assert_eq!(first, second);
}

#[test]
fn test_same_start_and_end_is_empty() {
    let (intersections, roads) = square();
    let network = SimRoadNetwork::build(&intersections, &roads);
    assert!(find_shortest_path(&network, IntersectionId(2), IntersectionId(2)).is_empty());
}

#[test]
fn test_unknown_endpoints_are_empty() {
    let (intersections, roads) = square();
    let network = SimRoadNetwork::build(&intersections, &roads);
    assert!(find_shortest_path(&network, IntersectionId(1), IntersectionId(99)).is_empty());
    assert!(find_shortest_path(&network, IntersectionId(99), IntersectionId(1)).is_empty());
}

#[test]
fn test_disconnected_components_are_empty() {
    let intersections = vec![
        intersection(1, 0.0, 0.0),
        intersection(2, 5.0, 0.0),
        intersection(3, 50.0, 50.0),
        intersection(4, 55.0, 50.0),
    ];
    let roads = vec![road(1, 1, 2), road(2, 3, 4)];
    let network = SimRoadNetwork::build(&intersections, &roads);

    assert!(find_shortest_path(&network, IntersectionId(1), IntersectionId(4)).is_empty());
    assert_eq!(
        ids(&find_shortest_path(&network, IntersectionId(3), IntersectionId(4))),
        vec![3, 4]
    );
}

#[test]
fn test_no_roads_builds_isolated_graph() {
    let (intersections, _) = square();
    let network = SimRoadNetwork::build(&intersections, &[]);

    assert_eq!(network.intersection_count(), 4);
    assert_eq!(network.road_count(), 0);
    assert!(network.neighbors(IntersectionId(1)).is_empty());
    assert!(find_shortest_path(&network, IntersectionId(1), IntersectionId(2)).is_empty());
}

#[test]
fn test_adjacency_is_bidirectional_and_skips_bad_roads() {
    let (intersections, mut roads) = square();
    roads.push(road(9, 1, 42));
    let network = SimRoadNetwork::build(&intersections, &roads);

    assert_eq!(network.road_count(), 4);
    let neighbors: Vec<u64> = network
        .neighbors(IntersectionId(1))
        .iter()
        .map(|i| i.id.0)
        .collect();
    assert_eq!(neighbors, vec![2, 4]);
    assert!(network
        .neighbors(IntersectionId(2))
        .iter()
        .any(|i| i.id == IntersectionId(1)));
}

#[test]
fn test_matches_dijkstra_on_random_graphs() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..40 {
        let count = rng.random_range(2..10u64);
        let intersections: Vec<Intersection> = (1..=count)
            .map(|id| {
                intersection(
                    id,
                    rng.random_range(0..20) as f64,
                    rng.random_range(0..20) as f64,
                )
            })
            .collect();

        let mut roads = Vec::new();
        for a in 1..=count {
            for b in (a + 1)..=count {
                if rng.random_bool(0.35) {
                    roads.push(road(roads.len() as u64 + 1, a, b));
                }
            }
        }

        let network = SimRoadNetwork::build(&intersections, &roads);
        for start in 1..=count {
            for end in 1..=count {
                if start == end {
                    continue;
                }
                let (start, end) = (IntersectionId(start), IntersectionId(end));
                let path = find_shortest_path(&network, start, end);
                match reference_distance(&intersections, &roads, start, end) {
                    Some(expected) => {
                        assert!(path.len() >= 2, "missing path {:?} -> {:?}", start, end);
                        assert_eq!(path[0].id, start);
                        assert_eq!(path[path.len() - 1].id, end);
                        assert_valid_route(&network, &path);
                        assert!(
                            (path_length(&path) - expected).abs() < 1e-6,
                            "A* {} vs Dijkstra {}",
                            path_length(&path),
                            expected
                        );
                    }
                    None => assert!(path.is_empty()),
                }
            }
        }
    }
}
