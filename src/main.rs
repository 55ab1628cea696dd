// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use futures::executor::block_on;
use wayfinder::osm::{FileFormat, TravelMode};
use wayfinder::{DataProvider, Preloaded, Route, Router, TileDirectory};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct TileLoadError(PathBuf, #[source] wayfinder::osm::Error);

#[derive(Debug, thiserror::Error)]
#[error("no route between the given points ({0})")]
struct NoRouteError(&'static str);

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The path to the OSM file, or to the tile directory with --tiles
    osm_file: PathBuf,

    /// Latitude of the start point
    start_lat: f32,

    /// Longitude of the start point
    start_lon: f32,

    /// Latitude of the end point
    end_lat: f32,

    /// Longitude of the end point
    end_lon: f32,

    /// Mode of travel: car, bus, bicycle, horse, tram, train or foot
    #[arg(short, long, default_value = "car")]
    profile: TravelMode,

    /// Treat the OSM file as a directory with ZOOM/X,Y.osm tiles, loaded on demand
    #[arg(short, long)]
    tiles: bool,

    /// Force the format of the OSM file(s) instead of detecting it
    #[arg(short, long, value_parser = parse_format, default_value = "auto")]
    format: FileFormat,

    /// Maximum number of nodes to expand before giving up
    #[arg(short, long, default_value_t = wayfinder::DEFAULT_STEP_LIMIT)]
    step_limit: usize,
}

fn parse_format(s: &str) -> Result<FileFormat, String> {
    match s {
        "auto" => Ok(FileFormat::Unknown),
        "xml" => Ok(FileFormat::Xml),
        "xml.gz" | "gz" => Ok(FileFormat::XmlGz),
        "xml.bz2" | "bz2" => Ok(FileFormat::XmlBz2),
        _ => Err(format!("unknown file format: {s:?}")),
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();
    let profile = cli.profile.profile();

    if cli.tiles {
        let provider = TileDirectory::new(&cli.osm_file).with_format(cli.format);
        run(Router::new(profile, provider), &cli)
    } else {
        let tile = wayfinder::osm::read_tile_from_file(&cli.osm_file, cli.format)
            .map_err(|e| TileLoadError(cli.osm_file.clone(), e))?;

        let mut router = Router::new(profile, Preloaded);
        router.add_tile(&tile);
        run(router, &cli)
    }
}

fn run<D: DataProvider>(mut router: Router<'_, D>, cli: &Cli) -> Result<(), Box<dyn Error>> {
    let route = block_on(router.route(
        (cli.start_lat, cli.start_lon),
        (cli.end_lat, cli.end_lon),
        cli.step_limit,
    ))?;

    let nodes = match route {
        Route::Success(nodes) => nodes,
        Route::NoRoute => return Err(NoRouteError("not connected").into()),
        Route::GaveUp => return Err(NoRouteError("step limit exceeded").into()),
    };

    println!("{{");
    println!("  \"type\": \"FeatureCollection\",");
    println!("  \"features\": [");
    println!("    {{");
    println!("      \"type\": \"Feature\",");
    println!("      \"properties\": {{\"profile\": \"{}\"}},", cli.profile);

    println!("      \"geometry\": {{");
    println!("        \"type\": \"LineString\",");
    println!("        \"coordinates\": [");

    let mut nodes = nodes
        .iter()
        .filter_map(|&id| router.network().node(id))
        .peekable();
    while let Some(node) = nodes.next() {
        let suffix = if nodes.peek().is_some() { "," } else { "" };
        println!("          [{}, {}]{}", node.lon, node.lat, suffix);
    }

    println!("        ]");
    println!("      }}");
    println!("    }}");
    println!("  ]");
    println!("}}");

    Ok(())
}
