#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch correction of stored spot coordinates.
//!
//! Loads the spots collection, looks every eligible record up through a
//! [`LocationResolver`](spot_coords_geocoder::LocationResolver), and
//! overwrites the stored coordinates when the lookup lands further away
//! than the configured threshold. A byte-for-byte backup of the input is
//! written before anything else happens, and nothing is written back at
//! all when no record needed correcting.
//!
//! See [`pipeline::run`] for the entry point.

pub mod config;
pub mod dispatcher;
pub mod paths;
pub mod pipeline;
pub mod report;
pub mod store;

pub use config::{ConfigError, CorrectionConfig};
pub use pipeline::{CorrectionError, PipelineOptions, RunReport};
