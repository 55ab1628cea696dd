// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use log::debug;

use crate::osm::Profile;
use crate::Way;

/// Weight returned for node pairs without an edge.
pub const NOT_TRAVERSABLE: f32 = 0.0;

/// Directed edges between nodes for a single [Profile], weighted by preference.
///
/// Larger weights are more preferred: traversing an edge costs its length
/// divided by its weight. One-way inference and access rules are resolved
/// once, when a way is added, so an edge exists in a direction if and only if
/// the profile may travel in that direction.
///
/// Nodes and edges are kept in id order, so enumeration is stable for a given
/// graph state.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WeightedGraph(BTreeMap<i64, BTreeMap<i64, f32>>);

impl WeightedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes known to the graph.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the total number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.0.values().map(|edges| edges.len()).sum()
    }

    /// Adds edges between consecutive nodes of a way, as interpreted by the given [Profile].
    ///
    /// Returns the nodes made routable by the way: all of its nodes if the profile
    /// may use it (regardless of one-way restrictions), or an empty slice otherwise.
    /// Adding the same way again re-creates the same edges with the same weights.
    pub fn add_way<'w>(&mut self, way: &'w Way, profile: &Profile<'_>) -> &'w [i64] {
        let weight = profile.way_weight(&way.tags);
        if weight <= NOT_TRAVERSABLE {
            debug!("way {} is not usable by the {} profile", way.id, profile.name);
            return &[];
        }

        let direction = profile.way_direction(&way.tags);

        for pair in way.nodes.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            if left == right {
                continue;
            }

            // Both nodes become known, even if one of them has no outgoing edges
            self.0.entry(left).or_default();
            self.0.entry(right).or_default();

            if direction.allows_forward() {
                self.set_edge(left, right, weight);
            }
            if direction.allows_backward() {
                self.set_edge(right, left, weight);
            }
        }

        &way.nodes
    }

    /// Creates or overwrites an edge from one node to another.
    fn set_edge(&mut self, from: i64, to: i64, weight: f32) {
        self.0.entry(from).or_default().insert(to, weight);
    }

    /// Checks if the node is known to the graph.
    pub fn has_node(&self, id: i64) -> bool {
        self.0.contains_key(&id)
    }

    /// Checks if there is an edge from one node to another.
    pub fn has_edge(&self, from: i64, to: i64) -> bool {
        self.0.get(&from).is_some_and(|edges| edges.contains_key(&to))
    }

    /// Gets the weight of an edge from one node to another,
    /// or [NOT_TRAVERSABLE] if such an edge doesn't exist.
    pub fn weight(&self, from: i64, to: i64) -> f32 {
        self.0
            .get(&from)
            .and_then(|edges| edges.get(&to))
            .copied()
            .unwrap_or(NOT_TRAVERSABLE)
    }

    /// Enumerates all outgoing edges of a node as `(neighbor, weight)` pairs.
    pub fn edges(&self, from: i64) -> impl Iterator<Item = (i64, f32)> + '_ {
        self.0
            .get(&from)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(&to, &weight)| (to, weight)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::{BUS_PROFILE, CAR_PROFILE, FOOT_PROFILE};
    use std::collections::HashMap;

    macro_rules! tags {
        {$( $k:literal : $v:literal ),+} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
    }

    fn way(id: i64, nodes: &[i64], tags: crate::Tags) -> Way {
        Way {
            id,
            nodes: nodes.to_vec(),
            tags,
        }
    }

    #[test]
    fn add_two_way_road() {
        let mut g = WeightedGraph::new();
        let w = way(1, &[1, 2, 3], tags! {"highway": "primary"});

        assert_eq!(g.add_way(&w, &CAR_PROFILE), &[1, 2, 3]);
        assert_eq!(g.len(), 3);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.weight(1, 2), 2.0);
        assert_eq!(g.weight(2, 1), 2.0);
        assert_eq!(g.weight(2, 3), 2.0);
        assert_eq!(g.weight(3, 2), 2.0);
        assert_eq!(g.weight(1, 3), NOT_TRAVERSABLE);
    }

    #[test]
    fn add_unusable_way() {
        let mut g = WeightedGraph::new();

        let unknown_type = way(1, &[1, 2], tags! {"highway": "bus_guideway"});
        assert!(g.add_way(&unknown_type, &CAR_PROFILE).is_empty());

        let denied = way(2, &[1, 2], tags! {"highway": "primary", "motor_vehicle": "private"});
        assert!(g.add_way(&denied, &CAR_PROFILE).is_empty());

        let rail = way(3, &[1, 2], tags! {"railway": "rail"});
        assert!(g.add_way(&rail, &CAR_PROFILE).is_empty());

        let untagged = way(4, &[1, 2], HashMap::default());
        assert!(g.add_way(&untagged, &CAR_PROFILE).is_empty());

        assert!(g.is_empty());
        assert!(!g.has_edge(1, 2));
        assert!(!g.has_edge(2, 1));
    }

    #[test]
    fn add_way_with_profile_specific_access() {
        let tags = tags! {"highway": "service", "motor_vehicle": "no", "psv": "yes"};
        let w = way(1, &[1, 2], tags);

        let mut car = WeightedGraph::new();
        car.add_way(&w, &CAR_PROFILE);
        assert!(!car.has_edge(1, 2));

        let mut bus = WeightedGraph::new();
        bus.add_way(&w, &BUS_PROFILE);
        assert!(bus.has_edge(1, 2));
        assert_eq!(bus.weight(1, 2), 0.9);
    }

    #[test]
    fn add_roundabout() {
        let w = way(
            1,
            &[1, 2, 3, 4, 1],
            tags! {"highway": "primary", "junction": "roundabout"},
        );

        let mut car = WeightedGraph::new();
        car.add_way(&w, &CAR_PROFILE);
        assert!(car.has_edge(1, 2));
        assert!(car.has_edge(2, 3));
        assert!(car.has_edge(3, 4));
        assert!(car.has_edge(4, 1));
        assert!(!car.has_edge(2, 1));
        assert!(!car.has_edge(3, 2));
        assert!(!car.has_edge(4, 3));
        assert!(!car.has_edge(1, 4));

        let mut foot = WeightedGraph::new();
        foot.add_way(&w, &FOOT_PROFILE);
        assert!(foot.has_edge(1, 2));
        assert!(foot.has_edge(2, 1));
        assert!(foot.has_edge(4, 1));
        assert!(foot.has_edge(1, 4));
    }

    #[test]
    fn add_reverse_oneway() {
        let mut g = WeightedGraph::new();
        g.add_way(
            &way(1, &[1, 2], tags! {"highway": "residential", "oneway": "-1"}),
            &CAR_PROFILE,
        );

        assert!(!g.has_edge(1, 2));
        assert!(g.has_edge(2, 1));
        assert!(g.has_node(1));
        assert!(g.has_node(2));
        assert_eq!(g.edges(1).count(), 0);
    }

    #[test]
    fn add_way_twice() {
        let w = way(1, &[1, 2, 3], tags! {"highway": "residential", "oneway": "yes"});

        let mut once = WeightedGraph::new();
        once.add_way(&w, &CAR_PROFILE);

        let mut twice = WeightedGraph::new();
        twice.add_way(&w, &CAR_PROFILE);
        twice.add_way(&w, &CAR_PROFILE);

        assert_eq!(once, twice);
    }

    #[test]
    fn readding_edge_overwrites_weight() {
        let mut g = WeightedGraph::new();
        g.add_way(&way(1, &[1, 2], tags! {"highway": "primary"}), &CAR_PROFILE);
        g.add_way(&way(2, &[2, 1], tags! {"highway": "motorway"}), &CAR_PROFILE);

        assert_eq!(g.weight(2, 1), 10.0);
        assert_eq!(g.weight(1, 2), 2.0);
    }

    #[test]
    fn edges() {
        let mut g = WeightedGraph::new();
        g.add_way(&way(1, &[1, 2, 3], tags! {"highway": "primary"}), &CAR_PROFILE);
        g.add_way(&way(2, &[4, 2], tags! {"highway": "tertiary"}), &CAR_PROFILE);

        assert_eq!(
            g.edges(2).collect::<Vec<_>>(),
            vec![(1, 2.0), (3, 2.0), (4, 1.0)],
        );
        assert_eq!(g.edges(42).count(), 0);
    }
}
