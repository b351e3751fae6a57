//! A* shortest path over the road network
//!
//! Edge cost and heuristic are both the straight-line distance between
//! intersections, so the heuristic never overestimates and the first time
//! the goal is popped its path is optimal.
//!
//! `BinaryHeap` has no decrease-key, so relaxation uses lazy deletion: an
//! improved node is pushed again with its new f-cost and outdated heap
//! entries are skipped when popped. Entries with equal f-cost come out in
//! the order they were pushed.

use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use super::road_network::SimRoadNetwork;
use super::types::{Intersection, IntersectionId};

/// Search bookkeeping for one intersection
///
/// Lives only for the duration of a single search. `parent` indexes into the
/// search's node arena.
#[derive(Debug, Clone)]
pub struct PathNode {
    pub intersection: Intersection,
    pub parent: Option<usize>,
    pub g_cost: f64,
    pub h_cost: f64,
    pub f_cost: f64,
}

impl PathNode {
    fn new(intersection: Intersection) -> Self {
        Self {
            intersection,
            parent: None,
            g_cost: f64::INFINITY,
            h_cost: 0.0,
            f_cost: f64::INFINITY,
        }
    }
}

/// Heap entry; `BinaryHeap` is a max-heap so the ordering is reversed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenEntry {
    f_cost: OrderedFloat<f64>,
    seq: u64,
    node: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Search {
    nodes: Vec<PathNode>,
    index: HashMap<IntersectionId, usize>,
    open: BinaryHeap<OpenEntry>,
    next_seq: u64,
}

impl Search {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            open: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Node for an intersection, created on first encounter
    fn node_for(&mut self, intersection: &Intersection) -> usize {
        if let Some(&idx) = self.index.get(&intersection.id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(PathNode::new(*intersection));
        self.index.insert(intersection.id, idx);
        idx
    }

    fn push(&mut self, node: usize) {
        let entry = OpenEntry {
            f_cost: OrderedFloat(self.nodes[node].f_cost),
            seq: self.next_seq,
            node,
        };
        self.next_seq += 1;
        self.open.push(entry);
    }

    fn reconstruct(&self, goal: usize) -> Vec<Intersection> {
        let mut path = Vec::new();
        let mut current = Some(goal);
        while let Some(idx) = current {
            let node = &self.nodes[idx];
            path.push(node.intersection);
            current = node.parent;
        }
        path.reverse();
        path
    }
}

/// Find the shortest path from `start` to `end`, both endpoints included
///
/// Returns an empty path when `start == end`, when either intersection is
/// unknown, or when `end` is unreachable.
pub fn find_shortest_path(
    network: &SimRoadNetwork,
    start: IntersectionId,
    end: IntersectionId,
) -> Vec<Intersection> {
    if start == end {
        return Vec::new();
    }
    let (Some(start), Some(goal)) = (network.intersection(start), network.intersection(end))
    else {
        return Vec::new();
    };

    let mut search = Search::new();
    let mut closed: HashSet<IntersectionId> = HashSet::new();

    let start_idx = search.node_for(start);
    {
        let node = &mut search.nodes[start_idx];
        node.g_cost = 0.0;
        node.h_cost = start.distance(goal);
        node.f_cost = node.h_cost;
    }
    search.push(start_idx);

    while let Some(entry) = search.open.pop() {
        let current = search.nodes[entry.node].clone();

        // Stale entry left behind by a later improvement, or already final
        if closed.contains(&current.intersection.id)
            || entry.f_cost != OrderedFloat(current.f_cost)
        {
            continue;
        }

        if current.intersection.id == goal.id {
            return search.reconstruct(entry.node);
        }
        closed.insert(current.intersection.id);

        for neighbor in network.neighbors(current.intersection.id) {
            if closed.contains(&neighbor.id) {
                continue;
            }
            let neighbor_idx = search.node_for(neighbor);
            let tentative_g = current.g_cost + current.intersection.distance(neighbor);

            let node = &mut search.nodes[neighbor_idx];
            if tentative_g < node.g_cost {
                node.parent = Some(entry.node);
                node.g_cost = tentative_g;
                node.h_cost = neighbor.distance(goal);
                node.f_cost = node.g_cost + node.h_cost;
                search.push(neighbor_idx);
            }
        }
    }

    Vec::new()
}

/// Total Euclidean length of a path
pub fn path_length(path: &[Intersection]) -> f64 {
    path.windows(2).map(|pair| pair[0].distance(&pair[1])).sum()
}
