// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod profile;
mod reader;
mod tile;

pub use profile::{
    AccessKey, Direction, Profile, TravelMode, TurnRestriction, UnknownTravelMode, WayType,
    Weight, BICYCLE_PROFILE, BUS_PROFILE, CAR_PROFILE, FOOT_PROFILE, HORSE_PROFILE,
    TRAIN_PROFILE, TRAM_PROFILE,
};
pub use reader::{read_tile_from_buffer, read_tile_from_file, read_tile_from_io, Error, FileFormat};
pub use tile::{TileId, DEFAULT_ZOOM};
