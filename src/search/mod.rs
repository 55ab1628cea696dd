// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod error;
mod frontier;
mod path_search;

pub use error::{SearchError, DEFAULT_STEP_LIMIT};
pub use path_search::{PathSearch, Route};
