// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;
use std::sync::Arc;

use tile_builder::TileBuilder;

use crate::Tile;

mod model;
mod tile_builder;
mod xml;

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// Unknown format - guess the compression based on the first bytes of the content,
    /// falling back to plain XML
    #[default]
    Unknown,

    /// Force uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,
}

impl FileFormat {
    /// Guesses the format from the magic bytes at the start of the content.
    pub fn detect(head: &[u8]) -> Self {
        if head.starts_with(b"\x1F\x8B") {
            Self::XmlGz
        } else if head.starts_with(b"BZh") {
            Self::XmlBz2
        } else {
            Self::Xml
        }
    }
}

/// Error which can occur when reading OSM data.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] Arc<io::Error>),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

/// Parse OSM features from a reader into a [Tile].
///
/// The provided stream will be automatically wrapped in a buffered reader when needed.
pub fn read_tile_from_io<R: io::Read>(reader: R, format: FileFormat) -> Result<Tile, Error> {
    let mut buffered = io::BufReader::new(reader);
    let format = match format {
        FileFormat::Unknown => FileFormat::detect(buffered.fill_buf()?),
        f => f,
    };
    read_detected(buffered, format)
}

fn read_detected<R: BufRead>(reader: R, format: FileFormat) -> Result<Tile, Error> {
    let mut b = TileBuilder::default();

    match format {
        FileFormat::Unknown | FileFormat::Xml => {
            b.add_features(xml::Reader::from_io(reader))?;
        }

        FileFormat::XmlGz => {
            let d = flate2::read::MultiGzDecoder::new(reader);
            b.add_features(xml::Reader::from_io(io::BufReader::new(d)))?;
        }

        FileFormat::XmlBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(reader);
            b.add_features(xml::Reader::from_io(io::BufReader::new(d)))?;
        }
    }

    Ok(b.finish())
}

/// Parse OSM features from a file at the provided path into a [Tile].
pub fn read_tile_from_file<P: AsRef<Path>>(path: P, format: FileFormat) -> Result<Tile, Error> {
    let f = File::open(path)?;
    read_tile_from_io(f, format)
}

/// Parse OSM features from a static buffer into a [Tile].
pub fn read_tile_from_buffer(data: &[u8], format: FileFormat) -> Result<Tile, Error> {
    let format = match format {
        FileFormat::Unknown => FileFormat::detect(data),
        f => f,
    };

    if format == FileFormat::Xml {
        // Fast path is available for in-memory XML data
        let mut b = TileBuilder::default();
        b.add_features(xml::Reader::from_buffer(data))?;
        Ok(b.finish())
    } else {
        read_tile_from_io(data, format)
    }
}
