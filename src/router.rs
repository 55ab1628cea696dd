// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashSet};

use futures::executor::block_on;
use log::debug;

use crate::osm::{Profile, TileId, DEFAULT_ZOOM};
use crate::{
    earth_distance, DataProvider, Node, PathSearch, RestrictionSet, Route, SearchError, Tile,
    WeightedGraph,
};

/// Map data known for a single [Profile]: the routing graph, turn restrictions,
/// positions of routable nodes and the set of already loaded tiles.
#[derive(Debug, Clone)]
pub struct Network<'p> {
    profile: &'p Profile<'p>,
    graph: WeightedGraph,
    restrictions: RestrictionSet,
    nodes: BTreeMap<i64, Node>,
    loaded: HashSet<TileId>,
    zoom: u8,
}

impl<'p> Network<'p> {
    pub fn new(profile: &'p Profile<'p>) -> Self {
        Self {
            profile,
            graph: WeightedGraph::default(),
            restrictions: RestrictionSet::default(),
            nodes: BTreeMap::default(),
            loaded: HashSet::default(),
            zoom: DEFAULT_ZOOM,
        }
    }

    pub fn profile(&self) -> &'p Profile<'p> {
        self.profile
    }

    pub fn graph(&self) -> &WeightedGraph {
        &self.graph
    }

    pub fn restrictions(&self) -> &RestrictionSet {
        &self.restrictions
    }

    /// Returns a node from the node cache. Only nodes of ways usable
    /// by the profile are cached.
    pub fn node(&self, id: i64) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Number of cached nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Zoom level of [tiles](TileId) requested from a [DataProvider].
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom;
    }

    /// Adds ways and turn restrictions from a batch of map data.
    /// Positions of nodes of ways usable by the profile are cached.
    pub fn add_tile(&mut self, tile: &Tile) {
        for way in &tile.ways {
            for &id in self.graph.add_way(way, self.profile) {
                if let Some(&node) = tile.nodes.get(&id) {
                    self.nodes.insert(id, node);
                }
            }
        }

        for relation in &tile.relations {
            self.restrictions.add_relation(relation, self.profile);
        }
    }

    /// Adds data of a specific tile, marking it as loaded.
    pub fn insert_tile(&mut self, id: TileId, tile: &Tile) {
        self.loaded.insert(id);
        self.add_tile(tile);
    }

    /// Checks if data of the given tile was already provided by a [DataProvider].
    pub fn is_loaded(&self, id: TileId) -> bool {
        self.loaded.contains(&id)
    }

    /// Finds the closest cached node to the provided position.
    /// Returns None if no nodes are known.
    pub fn nearest_node(&self, lat: f32, lon: f32) -> Option<i64> {
        self.nodes
            .values()
            .map(|n| (n.id, earth_distance(lat, lon, n.lat, n.lon)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(id, _)| id)
    }
}

/// Entry point for finding routes: a [Network] for one [Profile]
/// paired with a [DataProvider] to extend it on demand.
pub struct Router<'p, D> {
    network: Network<'p>,
    provider: D,
}

impl<'p, D: DataProvider> Router<'p, D> {
    pub fn new(profile: &'p Profile<'p>, provider: D) -> Self {
        Self {
            network: Network::new(profile),
            provider,
        }
    }

    /// Sets the zoom level of tiles requested from the [DataProvider].
    pub fn with_zoom(mut self, zoom: u8) -> Self {
        self.network.set_zoom(zoom);
        self
    }

    pub fn network(&self) -> &Network<'p> {
        &self.network
    }

    pub fn provider(&self) -> &D {
        &self.provider
    }

    /// Adds preloaded map data to the network, see [Network::add_tile].
    pub fn add_tile(&mut self, tile: &Tile) {
        self.network.add_tile(tile);
    }

    /// Loads the tile containing the given position, unless it was loaded before.
    pub async fn ensure_tile(&mut self, lat: f32, lon: f32) -> Result<(), SearchError> {
        let tile = TileId::containing(lat, lon, self.network.zoom());
        if self.network.is_loaded(tile) {
            return Ok(());
        }

        let data = self
            .provider
            .load(tile)
            .await
            .map_err(|source| SearchError::LoadFailed { tile, source })?;

        debug!("loaded tile {} with {} ways", tile, data.ways.len());
        self.network.insert_tile(tile, &data);
        Ok(())
    }

    /// Finds the closest node usable by the profile, after making sure that
    /// the tile containing the position is loaded.
    pub async fn nearest_node(&mut self, lat: f32, lon: f32) -> Result<Option<i64>, SearchError> {
        self.ensure_tile(lat, lon).await?;
        Ok(self.network.nearest_node(lat, lon))
    }

    /// Finds a route between two nodes. `step_limit` limits how many nodes may be
    /// expanded before giving up, see [DEFAULT_STEP_LIMIT](crate::DEFAULT_STEP_LIMIT).
    pub async fn find(&mut self, start: i64, end: i64, step_limit: usize) -> Result<Route, SearchError> {
        PathSearch::new(&mut self.network, &self.provider, start, end)?
            .find(step_limit)
            .await
    }

    /// Same as [Router::find], but blocks the current thread until the search completes.
    pub fn find_blocking(&mut self, start: i64, end: i64, step_limit: usize) -> Result<Route, SearchError> {
        block_on(self.find(start, end, step_limit))
    }

    /// Finds a route between two positions, starting and ending at the nodes
    /// closest to them. Returns [Route::NoRoute] if there are no usable nodes
    /// around either of the positions.
    pub async fn route(
        &mut self,
        start: (f32, f32),
        end: (f32, f32),
        step_limit: usize,
    ) -> Result<Route, SearchError> {
        let start = self.nearest_node(start.0, start.1).await?;
        let end = self.nearest_node(end.0, end.1).await?;

        match (start, end) {
            (Some(start), Some(end)) => self.find(start, end, step_limit).await,
            _ => Ok(Route::NoRoute),
        }
    }
}
