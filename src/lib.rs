// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Profile-aware routing over [OpenStreetMap](https://www.openstreetmap.org/) data.
//!
//! OSM ways are turned into a directed [WeightedGraph] for a single
//! [travel profile](crate::osm::Profile), turn restriction relations into a
//! [RestrictionSet] of forbidden and mandatory node sequences, and a best-first
//! search runs over both, pulling in additional map tiles through a
//! [DataProvider] as the frontier expands.
//!
//! # Example
//!
//! ```no_run
//! use wayfinder::{osm, Preloaded, Route, Router};
//!
//! let tile = osm::read_tile_from_file("path/to/monaco.osm", osm::FileFormat::Unknown)
//!     .expect("failed to load monaco.osm");
//!
//! let mut router = Router::new(&osm::CAR_PROFILE, Preloaded);
//! router.add_tile(&tile);
//!
//! let start = router.network().nearest_node(43.7384, 7.4246).unwrap();
//! let end = router.network().nearest_node(43.7478, 7.4323).unwrap();
//!
//! match router.find_blocking(start, end, wayfinder::DEFAULT_STEP_LIMIT) {
//!     Ok(Route::Success(nodes)) => println!("Route: {:?}", nodes),
//!     Ok(other) => println!("No route: {:?}", other),
//!     Err(e) => eprintln!("Search failed: {}", e),
//! }
//! ```

use std::collections::HashMap;

mod distance;
mod graph;
pub mod osm;
mod provider;
mod restriction;
mod router;
mod search;
mod sequence;

pub use distance::earth_distance;
pub use graph::WeightedGraph;
pub use provider::{DataProvider, LoadError, Preloaded, TileDirectory};
pub use restriction::{NodeSequence, RestrictionSet};
pub use router::{Network, Router};
pub use search::{PathSearch, Route, SearchError, DEFAULT_STEP_LIMIT};
pub use sequence::{Sequence, SequenceError};

/// Tags of an OSM element, mapping keys to values.
pub type Tags = HashMap<String, String>;

/// Single point of the map network.
///
/// Nodes are owned by the [Network] node cache and only ever referenced
/// by id from edges, ways, relations and search paths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lat: f32,
    pub lon: f32,
}

impl Node {
    /// Great-circle distance to another node, in kilometers.
    pub fn distance_to(&self, other: &Node) -> f32 {
        earth_distance(self.lat, self.lon, other.lat, other.lon)
    }
}

/// Ordered sequence of nodes representing a road, path or rail segment.
///
/// Ways are transient input for [WeightedGraph::add_way] and are not retained
/// once their edges are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Way {
    pub id: i64,
    pub nodes: Vec<i64>,
    pub tags: Tags,
}

/// Role of a turn restriction [Member].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    From,
    Via,
    To,
}

impl Role {
    /// Parses the OSM `role` attribute of a relation member.
    pub fn from_tag(role: &str) -> Option<Self> {
        match role {
            "from" => Some(Self::From),
            "via" => Some(Self::Via),
            "to" => Some(Self::To),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::From => write!(f, "from"),
            Self::Via => write!(f, "via"),
            Self::To => write!(f, "to"),
        }
    }
}

/// Member of a turn restriction [Relation], already resolved to the node ids
/// of the referenced way (or a single node for `via` nodes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub role: Role,
    pub nodes: Vec<i64>,
}

/// Tagged grouping of from/via/to members, encoding a turn restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub id: i64,
    pub members: Vec<Member>,
    pub tags: Tags,
}

/// A batch of map data, as produced by the [OSM reader](crate::osm)
/// or returned by a [DataProvider].
///
/// Ways and relations keep their feed order, as re-adding an edge
/// overwrites its weight.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Tile {
    pub nodes: HashMap<i64, Node>,
    pub ways: Vec<Way>,
    pub relations: Vec<Relation>,
}

impl Tile {
    /// Returns true if the tile carries no map data at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty() && self.relations.is_empty()
    }
}
