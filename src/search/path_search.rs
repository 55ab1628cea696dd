// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BTreeSet, HashSet};

use futures::future::join_all;
use log::{debug, trace};

use super::frontier::{Candidate, Frontier};
use super::SearchError;
use crate::graph::NOT_TRAVERSABLE;
use crate::osm::TileId;
use crate::{DataProvider, Network, Node};

/// Outcome of a route search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Nodes of the found route, from the start to the end node.
    Success(Vec<i64>),

    /// The whole reachable network was searched, and the end node was not found.
    NoRoute,

    /// Search has exceeded its limit of steps. Either the nodes are really
    /// far apart, or no route exists - try again with a larger limit.
    GaveUp,
}

/// Best-first search for a route between two nodes of a [Network],
/// honoring turn restrictions and loading missing tiles from a [DataProvider].
///
/// Candidates are ordered by their cost plus the straight-line distance to the end node.
/// Unlike a textbook A*, a node is closed once it has been expanded without a turn
/// restriction getting in the way: a node where a forbidden sequence blocked an extension,
/// or where a mandatory sequence was entered, stays open so that it may be reached
/// again with a different history.
pub struct PathSearch<'n, 'p, D> {
    network: &'n mut Network<'p>,
    provider: &'n D,
    start: i64,
    goal: Node,
    frontier: Frontier,
    used: HashSet<i64>,
    steps: usize,
}

impl<'n, 'p, D: DataProvider> PathSearch<'n, 'p, D> {
    /// Prepares a search between two nodes of the network.
    ///
    /// Both nodes must be present in the graph and have a known position,
    /// otherwise [SearchError::InvalidReference] is returned.
    pub fn new(
        network: &'n mut Network<'p>,
        provider: &'n D,
        start: i64,
        end: i64,
    ) -> Result<Self, SearchError> {
        for id in [start, end] {
            if !network.graph().has_node(id) || network.node(id).is_none() {
                return Err(SearchError::InvalidReference(id));
            }
        }

        let goal = network
            .node(end)
            .copied()
            .ok_or(SearchError::InvalidReference(end))?;

        Ok(Self {
            network,
            provider,
            start,
            goal,
            frontier: Frontier::default(),
            used: HashSet::default(),
            steps: 0,
        })
    }

    /// Runs the search. `step_limit` limits how many nodes may be expanded
    /// before giving up with [Route::GaveUp].
    pub async fn find(mut self, step_limit: usize) -> Result<Route, SearchError> {
        if self.start == self.goal.id {
            return Ok(Route::NoRoute);
        }

        self.seed().await?;

        let route = loop {
            if let Some(route) = self.step(step_limit).await? {
                break route;
            }
        };

        debug!(
            "search {} -> {} finished after {} steps: {}",
            self.start,
            self.goal.id,
            self.steps,
            match &route {
                Route::Success(nodes) => format!("route with {} nodes", nodes.len()),
                Route::NoRoute => "no route".to_string(),
                Route::GaveUp => "gave up".to_string(),
            }
        );
        Ok(route)
    }

    /// Adds a candidate for every outgoing edge of the start node.
    async fn seed(&mut self) -> Result<(), SearchError> {
        self.used.insert(self.start);
        let targets = self.network.graph().edges(self.start).collect();
        self.expand(&Candidate::start(self.start), targets).await?;
        Ok(())
    }

    /// Expands the best candidate from the frontier.
    /// Returns `Some` once the search has concluded.
    async fn step(&mut self, step_limit: usize) -> Result<Option<Route>, SearchError> {
        let Some(c) = self.frontier.pop() else {
            return Ok(Some(Route::NoRoute));
        };

        let tail = c.tail();
        if self.used.contains(&tail) {
            // Superseded by a cheaper candidate expanded earlier
            return Ok(None);
        }

        if tail == self.goal.id {
            return Ok(Some(Route::Success(c.path)));
        }

        self.steps += 1;
        if self.steps > step_limit {
            return Ok(Some(Route::GaveUp));
        }

        trace!(
            "step {}: expanding {} (cost {}, score {}, {} queued)",
            self.steps,
            tail,
            c.cost,
            c.score,
            self.frontier.len(),
        );

        let graph = self.network.graph();
        let targets = match c.mandatory.first() {
            Some(&next) => vec![(next, graph.weight(tail, next))],
            None => graph
                .edges(tail)
                .filter(|(to, _)| !self.used.contains(to))
                .collect(),
        };

        if self.expand(&c, targets).await? {
            self.used.insert(tail);
        }
        Ok(None)
    }

    /// Tries to extend a candidate along the given `(node, weight)` edges.
    /// Returns false if the tail of the candidate must not be closed.
    async fn expand(&mut self, c: &Candidate, targets: Vec<(i64, f32)>) -> Result<bool, SearchError> {
        let mut close = true;
        let mut accepted = Vec::with_capacity(targets.len());

        for (to, weight) in targets {
            match self.extend(c, to, weight) {
                Extension::Accepted(candidate) => accepted.push(candidate),
                Extension::Forbidden => close = false,
                Extension::Rejected => {}
            }
        }

        self.load_tiles(&accepted).await?;

        let inherited = c.mandatory.get(1..).unwrap_or_default();
        for mut candidate in accepted {
            if inherited.is_empty() {
                let required = self.network.restrictions().required(&candidate.path);
                if !required.is_empty() {
                    close = false;
                    candidate.mandatory = required.to_vec();
                }
            } else {
                candidate.mandatory = inherited.to_vec();
            }

            self.frontier.push(candidate);
        }

        Ok(close)
    }

    fn extend(&mut self, c: &Candidate, to: i64, weight: f32) -> Extension {
        if weight <= NOT_TRAVERSABLE || weight.is_nan() || c.before_tail() == Some(to) {
            return Extension::Rejected;
        }

        let (Some(from_node), Some(to_node)) = (self.network.node(c.tail()), self.network.node(to))
        else {
            return Extension::Rejected;
        };

        let cost = c.cost + from_node.distance_to(to_node) / weight;
        let score = cost + to_node.distance_to(&self.goal);

        let mut path = Vec::with_capacity(c.path.len() + 1);
        path.extend_from_slice(&c.path);
        path.push(to);

        if self.network.restrictions().forbids(&path) {
            return Extension::Forbidden;
        }

        match self.frontier.cost_to(to) {
            Some(existing) if existing <= cost => return Extension::Rejected,
            Some(_) => self.frontier.remove(to),
            None => {}
        }

        Extension::Accepted(Candidate {
            path,
            cost,
            score,
            mandatory: Vec::default(),
        })
    }

    /// Makes sure that tiles around the tails of all candidates are loaded.
    /// All missing tiles are requested concurrently, and are only added
    /// to the network once every request has completed.
    async fn load_tiles(&mut self, candidates: &[Candidate]) -> Result<(), SearchError> {
        let zoom = self.network.zoom();
        let missing: BTreeSet<TileId> = candidates
            .iter()
            .filter_map(|c| self.network.node(c.tail()))
            .map(|n| TileId::containing(n.lat, n.lon, zoom))
            .filter(|&t| !self.network.is_loaded(t))
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        let provider = self.provider;
        let results = join_all(missing.iter().map(|&t| provider.load(t))).await;

        let mut loaded = Vec::with_capacity(results.len());
        for (tile, result) in missing.into_iter().zip(results) {
            match result {
                Ok(data) => loaded.push((tile, data)),
                Err(source) => return Err(SearchError::LoadFailed { tile, source }),
            }
        }

        for (tile, data) in loaded {
            debug!(
                "loaded tile {}: {} nodes, {} ways, {} relations",
                tile,
                data.nodes.len(),
                data.ways.len(),
                data.relations.len()
            );
            self.network.insert_tile(tile, &data);
        }

        Ok(())
    }
}

enum Extension {
    Accepted(Candidate),
    Forbidden,
    Rejected,
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use futures::executor::block_on;

    use super::*;
    use crate::osm::{Profile, CAR_PROFILE};
    use crate::{LoadError, Member, Preloaded, Relation, Role, Tile, Way};

    macro_rules! tags {
        {$( $k:literal : $v:expr ),+} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
    }

    fn tile(nodes: &[(i64, f32, f32)], ways: &[(i64, &[i64], &str)]) -> Tile {
        Tile {
            nodes: nodes
                .iter()
                .map(|&(id, lat, lon)| (id, Node { id, lat, lon }))
                .collect(),
            ways: ways
                .iter()
                .map(|&(id, nodes, highway)| Way {
                    id,
                    nodes: nodes.to_vec(),
                    tags: HashMap::from_iter([("highway".to_string(), highway.to_string())]),
                })
                .collect(),
            relations: Vec::default(),
        }
    }

    fn restriction(id: i64, kind: &str, from: &[i64], via: i64, to: &[i64]) -> Relation {
        Relation {
            id,
            members: vec![
                Member {
                    role: Role::From,
                    nodes: from.to_vec(),
                },
                Member {
                    role: Role::Via,
                    nodes: vec![via],
                },
                Member {
                    role: Role::To,
                    nodes: to.to_vec(),
                },
            ],
            tags: tags! {"type": "restriction", "restriction": kind},
        }
    }

    //     2
    //    / \
    //   1   4---5
    //    \ /
    //     3
    //
    // 1-2-4 is a primary road, 1-3-4 a residential one
    fn diamond() -> Tile {
        tile(
            &[
                (1, 0.0, 0.0),
                (2, 0.001, 0.001),
                (3, -0.001, 0.001),
                (4, 0.0, 0.002),
                (5, 0.0, 0.003),
            ],
            &[
                (10, &[1, 2, 4], "primary"),
                (11, &[1, 3, 4], "residential"),
                (12, &[4, 5], "residential"),
            ],
        )
    }

    fn network(profile: &'static Profile<'static>, t: &Tile) -> Network<'static> {
        let mut n = Network::new(profile);
        n.add_tile(t);
        n
    }

    fn find_with<D: DataProvider>(
        n: &mut Network<'_>,
        provider: &D,
        start: i64,
        end: i64,
        step_limit: usize,
    ) -> Result<Route, SearchError> {
        block_on(PathSearch::new(n, provider, start, end)?.find(step_limit))
    }

    fn find(n: &mut Network<'_>, start: i64, end: i64) -> Route {
        find_with(n, &Preloaded, start, end, 100).unwrap()
    }

    /// Provider recording requested tiles, serving data from a map.
    #[derive(Default)]
    struct Recording {
        tiles: HashMap<TileId, Tile>,
        requests: RefCell<Vec<TileId>>,
    }

    impl DataProvider for Recording {
        async fn load(&self, tile: TileId) -> Result<Tile, LoadError> {
            self.requests.borrow_mut().push(tile);
            Ok(self.tiles.get(&tile).cloned().unwrap_or_default())
        }
    }

    struct Failing;

    impl DataProvider for Failing {
        async fn load(&self, _: TileId) -> Result<Tile, LoadError> {
            Err(LoadError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn prefers_heavier_ways() {
        let mut n = network(&CAR_PROFILE, &diamond());
        assert_eq!(find(&mut n, 1, 5), Route::Success(vec![1, 2, 4, 5]));
        assert_eq!(find(&mut n, 5, 1), Route::Success(vec![5, 4, 2, 1]));
    }

    #[test]
    fn start_equals_end() {
        let provider = Recording::default();
        let mut n = network(&CAR_PROFILE, &diamond());
        assert_eq!(find_with(&mut n, &provider, 1, 1, 100).unwrap(), Route::NoRoute);
        assert!(provider.requests.borrow().is_empty());
    }

    #[test]
    fn invalid_reference() {
        let mut n = network(&CAR_PROFILE, &diamond());
        assert!(matches!(
            find_with(&mut n, &Preloaded, 42, 1, 100),
            Err(SearchError::InvalidReference(42))
        ));
        assert!(matches!(
            find_with(&mut n, &Preloaded, 1, 42, 100),
            Err(SearchError::InvalidReference(42))
        ));
    }

    #[test]
    fn no_route() {
        let mut t = diamond();
        t.nodes.insert(6, Node { id: 6, lat: 0.0, lon: 0.01 });
        t.nodes.insert(7, Node { id: 7, lat: 0.0, lon: 0.011 });
        t.ways.push(Way {
            id: 13,
            nodes: vec![6, 7],
            tags: tags! {"highway": "residential"},
        });
        t.ways.push(Way {
            id: 14,
            nodes: vec![5, 6],
            tags: tags! {"highway": "residential", "oneway": "-1"},
        });

        let mut n = network(&CAR_PROFILE, &t);
        assert_eq!(find(&mut n, 1, 7), Route::NoRoute);
        assert_eq!(find(&mut n, 7, 1), Route::Success(vec![7, 6, 5, 4, 2, 1]));
    }

    #[test]
    fn gives_up_after_step_limit() {
        let mut n = network(&CAR_PROFILE, &diamond());
        assert_eq!(find_with(&mut n, &Preloaded, 1, 5, 0).unwrap(), Route::GaveUp);
        assert_eq!(find_with(&mut n, &Preloaded, 1, 5, 1).unwrap(), Route::GaveUp);
        assert_eq!(
            find_with(&mut n, &Preloaded, 1, 5, 2).unwrap(),
            Route::Success(vec![1, 2, 4, 5])
        );
    }

    #[test]
    fn forbidden_sequence() {
        let mut t = diamond();
        t.relations.push(restriction(20, "no_straight_on", &[1, 2], 2, &[2, 4]));

        let mut n = network(&CAR_PROFILE, &t);
        assert_eq!(find(&mut n, 1, 5), Route::Success(vec![1, 3, 4, 5]));
        assert_eq!(find(&mut n, 2, 5), Route::Success(vec![2, 4, 5]));
    }

    #[test]
    fn mandatory_sequence() {
        let mut t = diamond();
        t.nodes.insert(6, Node { id: 6, lat: 0.001, lon: 0.002 });
        t.ways.push(Way {
            id: 13,
            nodes: vec![2, 6, 5],
            tags: tags! {"highway": "residential"},
        });
        t.relations.push(restriction(20, "only_right_turn", &[1, 2], 2, &[2, 6]));

        let mut n = network(&CAR_PROFILE, &t);
        assert_eq!(find(&mut n, 1, 4), Route::Success(vec![1, 3, 4]));
        assert_eq!(find(&mut n, 1, 5), Route::Success(vec![1, 2, 6, 5]));
    }

    #[test]
    fn forbidden_turn_keeps_node_open() {
        let mut t = diamond();
        t.nodes.insert(6, Node { id: 6, lat: 0.0, lon: 0.004 });
        t.ways.push(Way {
            id: 13,
            nodes: vec![5, 6],
            tags: tags! {"highway": "residential"},
        });
        t.relations.push(restriction(20, "no_straight_on", &[2, 4], 4, &[4, 5]));

        // 4 is first reached through 2, from where 5 can't be entered;
        // it must remain open to be reached again through 3
        let mut n = network(&CAR_PROFILE, &t);
        assert_eq!(find(&mut n, 1, 6), Route::Success(vec![1, 3, 4, 5, 6]));
    }

    //   1---2---3---6
    //    \  |  /    |
    //     \ 5 /     7
    //      \ /
    //       4
    //
    // 1-2-3-6 is a primary road, everything else is residential.
    // Only 1-4-3-2-5 is allowed, as 1-2-5 is forbidden.
    #[test]
    fn mandatory_turn_keeps_node_open() {
        let mut t = tile(
            &[
                (1, 0.0, 0.0),
                (2, 0.0, 0.001),
                (3, 0.0, 0.002),
                (4, -0.001, 0.001),
                (5, 0.001, 0.001),
                (6, 0.0, 0.003),
                (7, 0.001, 0.003),
            ],
            &[
                (10, &[1, 2, 3, 6], "primary"),
                (11, &[1, 4, 3], "residential"),
                (12, &[2, 5], "residential"),
                (13, &[6, 7], "residential"),
            ],
        );
        t.relations.push(restriction(20, "no_left_turn", &[1, 2], 2, &[2, 5]));
        t.relations.push(restriction(21, "only_left_turn", &[3, 6], 6, &[6, 7]));

        // 3 is first reached through 2, and entering 6 forces a turn into
        // the dead end at 7; 3 must remain open to be reached again through 4
        let mut n = network(&CAR_PROFILE, &t);
        assert_eq!(find(&mut n, 1, 5), Route::Success(vec![1, 4, 3, 2, 5]));
    }

    //   1---2---3
    //       |
    //       4
    #[test]
    fn u_turns_are_never_taken() {
        let mut t = tile(
            &[
                (1, 0.0, 0.0),
                (2, 0.0, 0.001),
                (3, 0.0, 0.002),
                (4, -0.001, 0.001),
            ],
            &[(10, &[1, 2, 3], "residential"), (11, &[2, 4], "residential")],
        );
        t.relations.push(restriction(20, "no_straight_on", &[1, 2], 2, &[2, 3]));

        let mut n = network(&CAR_PROFILE, &t);
        assert_eq!(find(&mut n, 1, 3), Route::NoRoute);
        assert_eq!(find(&mut n, 4, 3), Route::Success(vec![4, 2, 3]));
    }

    #[test]
    fn loads_missing_tiles() {
        let a = (1, 0.001_f32, 0.001_f32);
        let b = (2, 0.001_f32, 0.02_f32);
        let c = (3, 0.001_f32, 0.04_f32);
        let d = (4, 0.002_f32, 0.04_f32);

        let tile_of = |(_, lat, lon): (i64, f32, f32)| TileId::containing(lat, lon, 15);

        let mut provider = Recording::default();
        provider
            .tiles
            .insert(tile_of(b), tile(&[b, c], &[(11, &[2, 3], "residential")]));

        let mut n = network(
            &CAR_PROFILE,
            &tile(&[a, b, c, d], &[(10, &[1, 2], "residential"), (12, &[3, 4], "residential")]),
        );
        assert!(!n.graph().has_edge(2, 3));

        assert_eq!(
            find_with(&mut n, &provider, 1, 3, 100).unwrap(),
            Route::Success(vec![1, 2, 3])
        );
        assert!(n.graph().has_edge(2, 3));
        assert_eq!(*provider.requests.borrow(), vec![tile_of(b), tile_of(c)]);

        // Tiles are only requested once
        assert_eq!(
            find_with(&mut n, &provider, 1, 3, 100).unwrap(),
            Route::Success(vec![1, 2, 3])
        );
        assert_eq!(provider.requests.borrow().len(), 2);
    }

    #[test]
    fn load_failure() {
        let mut n = network(&CAR_PROFILE, &diamond());
        let err = find_with(&mut n, &Failing, 1, 5, 100).unwrap_err();
        assert!(matches!(
            err,
            SearchError::LoadFailed {
                source: LoadError::Unavailable(_),
                ..
            }
        ));
    }
}
