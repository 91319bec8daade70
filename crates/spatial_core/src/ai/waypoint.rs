//! Waypoint graph
//!
//! Waypoints are keyed by id; links are directed and ordered by
//! `(from, to)`, so all links leaving a node are one contiguous range.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;

/// A navigation node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WayPoint {
    /// World-space centre
    pub centre: Vec3,
    /// Radius, used for display
    pub radius: f32,
}

impl WayPoint {
    /// Create a waypoint
    pub fn new(centre: Vec3, radius: f32) -> Self {
        Self { centre, radius }
    }
}

/// Directed edge between two waypoint ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WayPointLink {
    /// Source waypoint id
    pub from: u32,
    /// Destination waypoint id
    pub to: u32,
}

impl WayPointLink {
    /// Create a link
    pub const fn new(from: u32, to: u32) -> Self {
        Self { from, to }
    }
}

/// Waypoints and the directed links between them
#[derive(Debug, Clone, Default)]
pub struct WayPointGraph {
    way_points: BTreeMap<u32, WayPoint>,
    links: BTreeSet<WayPointLink>,
}

impl WayPointGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a waypoint; an existing id is overwritten
    pub fn add_way_point(&mut self, id: u32, way_point: WayPoint) {
        if self.way_points.insert(id, way_point).is_some() {
            log::debug!("Waypoint {} overwritten", id);
        }
    }

    /// Add a directed link
    pub fn add_way_point_link(&mut self, link: WayPointLink) {
        self.links.insert(link);
    }

    /// Remove a waypoint and every link touching it
    pub fn remove_way_point(&mut self, id: u32) -> Option<WayPoint> {
        let removed = self.way_points.remove(&id)?;
        self.links.retain(|link| link.from != id && link.to != id);
        Some(removed)
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.way_points.clear();
        self.links.clear();
    }

    /// Waypoint by id
    pub fn way_point(&self, id: u32) -> Option<&WayPoint> {
        self.way_points.get(&id)
    }

    /// Whether `id` exists
    pub fn contains(&self, id: u32) -> bool {
        self.way_points.contains_key(&id)
    }

    /// All waypoints in id order
    pub fn way_points(&self) -> impl Iterator<Item = (u32, &WayPoint)> {
        self.way_points.iter().map(|(&id, way_point)| (id, way_point))
    }

    /// All links in `(from, to)` order
    pub fn links(&self) -> impl Iterator<Item = &WayPointLink> {
        self.links.iter()
    }

    /// Links leaving `id`, in ascending `to` order
    pub fn links_from(&self, id: u32) -> impl Iterator<Item = &WayPointLink> {
        self.links.range(WayPointLink::new(id, 0)..=WayPointLink::new(id, u32::MAX))
    }

    /// Number of waypoints
    pub fn len(&self) -> usize {
        self.way_points.len()
    }

    /// Whether the graph has no waypoints
    pub fn is_empty(&self) -> bool {
        self.way_points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_from_is_a_range() {
        let mut graph = WayPointGraph::new();
        for link in [(2, 0), (1, 3), (1, 0), (0, 1), (1, 2)] {
            graph.add_way_point_link(WayPointLink::new(link.0, link.1));
        }

        let from_one: Vec<u32> = graph.links_from(1).map(|link| link.to).collect();
        assert_eq!(from_one, vec![0, 2, 3]);
        assert_eq!(graph.links_from(5).count(), 0);
    }

    #[test]
    fn test_duplicate_id_overwrites() {
        let mut graph = WayPointGraph::new();
        graph.add_way_point(4, WayPoint::new(Vec3::zeros(), 1.0));
        graph.add_way_point(4, WayPoint::new(Vec3::new(1.0, 0.0, 0.0), 2.0));
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.way_point(4).unwrap().radius, 2.0);
    }

    #[test]
    fn test_remove_drops_touching_links() {
        let mut graph = WayPointGraph::new();
        for id in 0..3 {
            graph.add_way_point(id, WayPoint::new(Vec3::new(id as f32, 0.0, 0.0), 0.5));
        }
        graph.add_way_point_link(WayPointLink::new(0, 1));
        graph.add_way_point_link(WayPointLink::new(1, 2));
        graph.add_way_point_link(WayPointLink::new(2, 0));

        assert!(graph.remove_way_point(1).is_some());
        assert!(graph.remove_way_point(1).is_none());
        let links: Vec<_> = graph.links().copied().collect();
        assert_eq!(links, vec![WayPointLink::new(2, 0)]);

        graph.clear();
        assert!(graph.is_empty());
    }
}
