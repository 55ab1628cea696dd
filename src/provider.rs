// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use futures::channel::oneshot;
use log::debug;

use crate::osm::{self, FileFormat, TileId};
use crate::Tile;

/// Error returned by a [DataProvider] which can't supply a tile.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: osm::Error,
    },

    /// Tile data exists, but can't be retrieved right now.
    #[error("tile unavailable: {0}")]
    Unavailable(String),
}

/// Source of map data, queried by the route search whenever
/// it reaches a [tile](TileId) which has not been loaded yet.
///
/// Each tile is requested at most once per [Network](crate::Network).
/// Loads for different tiles of a single search step run concurrently,
/// and the search only continues once all of them complete.
pub trait DataProvider {
    /// Retrieves all map data within the given tile. Returning an empty [Tile]
    /// signals that there is no (more) data in that area.
    fn load(&self, tile: TileId) -> impl Future<Output = Result<Tile, LoadError>>;
}

/// [DataProvider] for networks with all data added upfront.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preloaded;

impl DataProvider for Preloaded {
    async fn load(&self, _: TileId) -> Result<Tile, LoadError> {
        Ok(Tile::default())
    }
}

/// [DataProvider] reading tiles from OSM files laid out as
/// `ROOT/ZOOM/X,Y.osm`. Missing files are treated as empty tiles.
///
/// Every file is read and parsed on its own thread, so concurrent loads
/// don't block the executor or each other.
#[derive(Debug, Clone)]
pub struct TileDirectory {
    root: PathBuf,
    format: FileFormat,
}

impl TileDirectory {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            format: FileFormat::Unknown,
        }
    }

    /// Forces a specific format of the tile files, instead of detecting it from their content.
    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path to the file with data of the given tile.
    pub fn path_of(&self, tile: TileId) -> PathBuf {
        self.root
            .join(tile.zoom.to_string())
            .join(format!("{},{}.osm", tile.x, tile.y))
    }
}

impl DataProvider for TileDirectory {
    async fn load(&self, tile: TileId) -> Result<Tile, LoadError> {
        let path = self.path_of(tile);
        let format = self.format;
        let (tx, rx) = oneshot::channel();

        let worker_path = path.clone();
        let spawned = thread::Builder::new()
            .name(format!("tile-{tile}"))
            .spawn(move || {
                // The receiver is only gone if the search was dropped mid-step.
                let _ = tx.send(read_tile_file(&worker_path, format, tile));
            });

        if let Err(e) = spawned {
            return Err(LoadError::File {
                path,
                source: e.into(),
            });
        }

        rx.await.map_err(|_| {
            LoadError::Unavailable(format!("reader of {} exited early", path.display()))
        })?
    }
}

fn read_tile_file(path: &Path, format: FileFormat, tile: TileId) -> Result<Tile, LoadError> {
    let f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("no data for tile {tile} ({})", path.display());
            return Ok(Tile::default());
        }
        Err(e) => {
            return Err(LoadError::File {
                path: path.to_path_buf(),
                source: e.into(),
            })
        }
    };

    osm::read_tile_from_io(f, format).map_err(|source| LoadError::File {
        path: path.to_path_buf(),
        source,
    })
}
