//! Best-first search over the waypoint graph
//!
//! The open list is a binary heap keyed by `(cost, id)` with a side map of
//! the best known cost per open node; heap entries that were superseded are
//! skipped when popped. Equal costs pop the lower id first.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ai::waypoint::{WayPoint, WayPointGraph};
use crate::foundation::math::Vec3;

/// Cost of traversing a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EdgeCost {
    /// Every link costs nothing; the first path found wins
    #[default]
    Uniform,
    /// Links cost the distance between their waypoint centres
    Euclidean,
}

impl EdgeCost {
    /// Cost of moving from `from` to `to`
    pub fn cost(self, from: &WayPoint, to: &WayPoint) -> f32 {
        match self {
            Self::Uniform => 0.0,
            Self::Euclidean => (to.centre - from.centre).magnitude(),
        }
    }
}

/// Pathfinding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Endpoint is not in the graph
    #[error("Unknown waypoint {0}")]
    UnknownWayPoint(u32),

    /// Target cannot be reached from the start
    #[error("No path from waypoint {from} to {to}")]
    NoPath {
        /// Start id
        from: u32,
        /// Target id
        to: u32,
    },

    /// Parent chain broken while rebuilding the path
    #[error("Path reconstruction failed at waypoint {0}")]
    Inconsistent(u32),

    /// Graph has no waypoints
    #[error("Waypoint graph is empty")]
    EmptyGraph,
}

/// Total order over path costs
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedCost(f32);

impl Eq for OrderedCost {}

impl PartialOrd for OrderedCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedCost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenRecord {
    cost: f32,
    parent: Option<u32>,
}

/// Path queries over a [`WayPointGraph`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Pathfinder {
    edge_cost: EdgeCost,
}

impl Pathfinder {
    /// Pathfinder using the given cost model
    pub fn new(edge_cost: EdgeCost) -> Self {
        Self { edge_cost }
    }

    /// Cost model in use
    pub fn edge_cost(&self) -> EdgeCost {
        self.edge_cost
    }

    /// Waypoint ids from `from` to `to`, both included
    ///
    /// Every consecutive pair in the result is a link of the graph. A path is
    /// either complete or an error; it is never partial.
    pub fn find_optimal_path(&self, graph: &WayPointGraph, from: u32, to: u32) -> Result<Vec<u32>, PathError> {
        if !graph.contains(from) {
            return Err(PathError::UnknownWayPoint(from));
        }
        if !graph.contains(to) {
            return Err(PathError::UnknownWayPoint(to));
        }
        if from == to {
            return Ok(vec![from]);
        }

        let mut heap = BinaryHeap::new();
        let mut open: HashMap<u32, OpenRecord> = HashMap::new();
        let mut closed: HashMap<u32, Option<u32>> = HashMap::new();

        heap.push(Reverse((OrderedCost(0.0), from)));
        open.insert(from, OpenRecord { cost: 0.0, parent: None });

        while let Some(Reverse((OrderedCost(cost), id))) = heap.pop() {
            if closed.contains_key(&id) {
                continue;
            }
            let Some(record) = open.remove(&id) else {
                continue;
            };
            closed.insert(id, record.parent);

            if id == to {
                return Self::reconstruct(&closed, to);
            }

            let Some(current) = graph.way_point(id) else {
                continue;
            };
            for link in graph.links_from(id) {
                if closed.contains_key(&link.to) {
                    continue;
                }
                let Some(next) = graph.way_point(link.to) else {
                    log::trace!("Link {} -> {} points at a missing waypoint", id, link.to);
                    continue;
                };

                let next_cost = cost + self.edge_cost.cost(current, next);
                match open.get_mut(&link.to) {
                    Some(existing) if existing.cost <= next_cost => continue,
                    Some(existing) => {
                        existing.cost = next_cost;
                        existing.parent = Some(id);
                    }
                    None => {
                        open.insert(link.to, OpenRecord { cost: next_cost, parent: Some(id) });
                    }
                }
                heap.push(Reverse((OrderedCost(next_cost), link.to)));
            }
        }

        Err(PathError::NoPath { from, to })
    }

    fn reconstruct(closed: &HashMap<u32, Option<u32>>, to: u32) -> Result<Vec<u32>, PathError> {
        let mut path = vec![to];
        let mut current = to;

        while let Some(parent) = *closed.get(&current).ok_or(PathError::Inconsistent(current))? {
            if path.len() > closed.len() {
                return Err(PathError::Inconsistent(parent));
            }
            path.push(parent);
            current = parent;
        }

        path.reverse();
        Ok(path)
    }

    /// Id of the waypoint nearest to `position`
    pub fn find_closest_node_id(graph: &WayPointGraph, position: &Vec3) -> Option<u32> {
        graph
            .way_points()
            .map(|(id, way_point)| (id, (way_point.centre - position).magnitude_squared()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Travel distance from `position` to waypoint `target`
    ///
    /// Straight line to the nearest waypoint, then along the optimal path's
    /// waypoint centres.
    pub fn find_distance_to_node_id(&self, graph: &WayPointGraph, position: &Vec3, target: u32) -> Result<f32, PathError> {
        let closest = Self::find_closest_node_id(graph, position).ok_or(PathError::EmptyGraph)?;
        let centre = |id: u32| {
            graph
                .way_point(id)
                .map(|way_point| way_point.centre)
                .ok_or(PathError::UnknownWayPoint(id))
        };

        let path = self.find_optimal_path(graph, closest, target)?;
        let mut distance = (centre(closest)? - position).magnitude();
        for step in path.windows(2) {
            distance += (centre(step[1])? - centre(step[0])?).magnitude();
        }
        Ok(distance)
    }
}
