#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate resolution for spot records.
//!
//! Three independent pieces used by the correction pipeline:
//!
//! 1. **[`dms`]**: parses sexagesimal strings such as
//!    `5°23'36.8"N 100°12'22.6"E` without touching the network.
//! 2. **[`distance`]**: haversine great-circle distance and the
//!    "is this far enough off to fix?" verdict.
//! 3. **[`resolver`]**: the [`LocationResolver`] trait the pipeline
//!    depends on, with [`map_search::MapSearchResolver`] as the shipped
//!    implementation. It fetches a map-search results page and scrapes a
//!    coordinate out of the URL or page body ([`extract`]).
//!
//! Every coordinate that comes out of this crate has been checked against
//! a [`BoundingWindow`], which is what keeps the scraping heuristics from
//! returning numbers that merely look like coordinates.

pub mod distance;
pub mod dms;
pub mod extract;
pub mod map_search;
pub mod resolver;
pub mod service_registry;

use std::time::Duration;

pub use resolver::LocationResolver;
pub use spot_coords_models::{BoundingWindow, CoordinatePair};

/// A single lookup failed. Never fatal to a run: the caller records the
/// record as unresolved and moves on.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The lookup did not finish within its time budget.
    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    /// The map service answered 429.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The map service answered with a non-success status.
    #[error("Map search returned status {0}")]
    Status(u16),

    /// A search or result URL could not be built or followed.
    #[error("Navigation error: {message}")]
    Navigation {
        /// Description of what went wrong.
        message: String,
    },
}
