// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::osm::TileId;
use crate::LoadError;

/// Recommended number of allowed node expansions in [PathSearch](crate::PathSearch)
/// before [Route::GaveUp](crate::Route::GaveUp) is returned.
pub const DEFAULT_STEP_LIMIT: usize = 100_000;

/// Fatal error conditions of a single route search.
///
/// Failing to find a route is not an error - see [Route](crate::Route).
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// The start or end nodes don't exist in the graph, or their position is unknown.
    #[error("invalid node: {0}")]
    InvalidReference(i64),

    /// The data provider was unable to supply a tile reached by the search.
    /// Whether a route exists can't be determined.
    #[error("unable to load data for tile {tile}: {source}")]
    LoadFailed {
        tile: TileId,
        #[source]
        source: LoadError,
    },
}
