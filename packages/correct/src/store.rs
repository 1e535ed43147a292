//! Reading and writing the spots collection.
//!
//! The collection is a JSON array of objects. It is read once, backed up
//! verbatim, and written back only when a run changed something. Every
//! write goes through a temporary sibling and a rename so a crash never
//! leaves a half-written file behind.

use std::path::{Path, PathBuf};

use spot_coords_models::{InvalidRecordError, LocationRecord};

use crate::paths;

/// The input could not be loaded. Fatal: the run stops before any write.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The input file does not exist.
    #[error("Input file {} not found", path.display())]
    Missing {
        /// Expected location.
        path: PathBuf,
    },

    /// The input file exists but could not be read.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The input is not valid JSON.
    #[error("Malformed JSON in {}: {source}", path.display())]
    Json {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// The input is JSON but not an array.
    #[error("Expected a JSON array of spots in {}", path.display())]
    NotAnArray {
        /// File that was being parsed.
        path: PathBuf,
    },

    /// An element of the array is not an object.
    #[error("Invalid spot in {}: {source}", path.display())]
    Record {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying error.
        source: InvalidRecordError,
    },
}

/// The safety copy could not be written. Fatal: the run stops before any
/// record is touched.
#[derive(Debug, thiserror::Error)]
#[error("Could not write backup {}: {source}", path.display())]
pub struct BackupError {
    /// Intended backup location.
    pub path: PathBuf,
    /// Underlying error.
    pub source: std::io::Error,
}

/// Writing results failed.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The collection could not be serialized. Nothing was written.
    #[error("Could not serialize spots: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The corrected copy could not be written. The original is untouched.
    #[error("Could not write corrected output {}: {source}", path.display())]
    Corrected {
        /// Intended corrected-output location.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The corrected copy was written but the original could not be
    /// replaced. The two files now disagree.
    #[error(
        "Corrected output written to {} but updating {} failed: {source}",
        corrected.display(),
        original.display()
    )]
    Partial {
        /// Corrected output that was written successfully.
        corrected: PathBuf,
        /// Original input that could not be replaced.
        original: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// A loaded collection together with the exact bytes it came from.
#[derive(Debug, Clone)]
pub struct LoadedCollection {
    /// File contents as read, used for the backup.
    pub raw: Vec<u8>,
    /// One record per array element, in file order.
    pub records: Vec<LocationRecord>,
}

/// Where a successful persist wrote to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    /// The `_corrected` sibling.
    pub corrected_path: PathBuf,
    /// The overwritten input.
    pub original_path: PathBuf,
}

/// Reads and parses the spots collection at `path`.
///
/// # Errors
///
/// Returns [`LoadError`] if the file is missing, unreadable, not JSON, not
/// an array, or contains a non-object element.
pub fn load(path: &Path) -> Result<LoadedCollection, LoadError> {
    let raw = std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let value: serde_json::Value =
        serde_json::from_slice(&raw).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let serde_json::Value::Array(items) = value else {
        return Err(LoadError::NotAnArray {
            path: path.to_path_buf(),
        });
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(id, item)| LocationRecord::from_value(id, item))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| LoadError::Record {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(LoadedCollection { raw, records })
}

/// Writes `raw` verbatim to `<input>.backup` and returns the backup path.
///
/// # Errors
///
/// Returns [`BackupError`] if the file cannot be written.
pub fn write_backup(input: &Path, raw: &[u8]) -> Result<PathBuf, BackupError> {
    let path = paths::backup_path(input);
    write_atomic(&path, raw).map_err(|source| BackupError {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Writes `records` to the `_corrected` sibling of `input`, then over
/// `input` itself.
///
/// # Errors
///
/// Returns [`PersistError::Corrected`] if the first write fails (nothing
/// changed on disk), or [`PersistError::Partial`] if only the second write
/// fails.
pub fn persist(records: &[LocationRecord], input: &Path) -> Result<PersistOutcome, PersistError> {
    let bytes = render(records)?;

    let corrected_path = paths::corrected_path(input);
    write_atomic(&corrected_path, &bytes).map_err(|source| PersistError::Corrected {
        path: corrected_path.clone(),
        source,
    })?;
    log::info!("Corrected data saved to {}", corrected_path.display());

    write_atomic(input, &bytes).map_err(|source| PersistError::Partial {
        corrected: corrected_path.clone(),
        original: input.to_path_buf(),
        source,
    })?;
    log::info!("Original file updated: {}", input.display());

    Ok(PersistOutcome {
        corrected_path,
        original_path: input.to_path_buf(),
    })
}

/// Serializes records as a pretty-printed JSON array in file order.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if serialization fails.
pub fn render(records: &[LocationRecord]) -> Result<Vec<u8>, serde_json::Error> {
    let values: Vec<serde_json::Value> = records.iter().map(LocationRecord::to_value).collect();
    serde_json::to_vec_pretty(&values)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = paths::temp_path(path);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use spot_coords_models::CoordinatePair;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("spot_coords_store_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const SAMPLE: &str = r#"[
  {
    "id": 1,
    "google_maps_data": { "place_name": "Kellie's Castle", "address": "Batu Gajah, Perak" },
    "latitude": 4.4747,
    "longitude": 101.0873,
    "suitable_for": ["photography"]
  },
  { "id": 2, "name": "Unknown", "latitude": 0, "longitude": 0 }
]"#;

    #[test]
    fn loads_records_in_file_order() {
        let dir = temp_dir("load");
        let input = dir.join("spots.json");
        std::fs::write(&input, SAMPLE).unwrap();

        let loaded = load(&input).unwrap();
        assert_eq!(loaded.raw, SAMPLE.as_bytes());
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[0].id, 0);
        assert_eq!(loaded.records[0].name, "Kellie's Castle");
        assert_eq!(loaded.records[1].name, "Unknown");
        assert!(loaded.records[1].coordinates.is_unset());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_reported_as_missing() {
        let dir = temp_dir("missing");
        assert!(matches!(
            load(&dir.join("nope.json")),
            Err(LoadError::Missing { .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_malformed_and_non_array_input() {
        let dir = temp_dir("malformed");
        let input = dir.join("spots.json");

        std::fs::write(&input, "[{\"id\": 1,").unwrap();
        assert!(matches!(load(&input), Err(LoadError::Json { .. })));

        std::fs::write(&input, "{\"spots\": []}").unwrap();
        assert!(matches!(load(&input), Err(LoadError::NotAnArray { .. })));

        std::fs::write(&input, "[{\"id\": 1}, 42]").unwrap();
        let err = load(&input).unwrap_err();
        assert!(matches!(err, LoadError::Record { .. }));
        assert!(err.to_string().contains("record 1"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn backup_is_byte_for_byte() {
        let dir = temp_dir("backup");
        let input = dir.join("spots.json");
        std::fs::write(&input, SAMPLE).unwrap();

        let loaded = load(&input).unwrap();
        let backup = write_backup(&input, &loaded.raw).unwrap();

        assert_eq!(backup, dir.join("spots.json.backup"));
        assert_eq!(std::fs::read(&backup).unwrap(), SAMPLE.as_bytes());
        assert!(!paths::temp_path(&backup).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn backup_into_missing_directory_fails() {
        let dir = temp_dir("backup_fail");
        let input = dir.join("missing_subdir").join("spots.json");
        let err = write_backup(&input, b"[]").unwrap_err();
        assert!(err.path.ends_with("spots.json.backup"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn persist_writes_corrected_and_original() {
        let dir = temp_dir("persist");
        let input = dir.join("spots.json");
        std::fs::write(&input, SAMPLE).unwrap();

        let mut loaded = load(&input).unwrap();
        loaded.records[0].set_coordinates(CoordinatePair::new(4.4744, 101.0869));

        let outcome = persist(&loaded.records, &input).unwrap();
        assert_eq!(outcome.corrected_path, dir.join("spots_corrected.json"));
        assert_eq!(outcome.original_path, input);

        let corrected = std::fs::read(&outcome.corrected_path).unwrap();
        let original = std::fs::read(&input).unwrap();
        assert_eq!(corrected, original);

        let reloaded = load(&input).unwrap();
        assert_eq!(
            reloaded.records[0].coordinates,
            CoordinatePair::new(4.4744, 101.0869)
        );
        let value: serde_json::Value = serde_json::from_slice(&original).unwrap();
        assert_eq!(value[0]["suitable_for"], serde_json::json!(["photography"]));
        assert_eq!(value[0]["google_maps_data"]["address"], "Batu Gajah, Perak");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn persist_reports_partial_write_when_original_cannot_be_replaced() {
        let dir = temp_dir("partial");
        let input = dir.join("spots.json");
        std::fs::write(&input, SAMPLE).unwrap();

        let mut loaded = load(&input).unwrap();
        loaded.records[0].set_coordinates(CoordinatePair::new(4.4744, 101.0869));

        // The original's staging file is occupied by a directory.
        std::fs::create_dir_all(paths::temp_path(&input)).unwrap();

        let err = persist(&loaded.records, &input).unwrap_err();
        let PersistError::Partial {
            corrected,
            original,
            ..
        } = &err
        else {
            panic!("expected a partial write, got {err:?}");
        };
        assert_eq!(corrected, &dir.join("spots_corrected.json"));
        assert_eq!(original, &input);
        assert!(err.to_string().contains("spots_corrected.json"));

        let written = load(corrected).unwrap();
        assert_eq!(
            written.records[0].coordinates,
            CoordinatePair::new(4.4744, 101.0869)
        );
        assert_eq!(std::fs::read(&input).unwrap(), SAMPLE.as_bytes());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn persist_keeps_non_ascii_unescaped() {
        let dir = temp_dir("unicode");
        let input = dir.join("spots.json");
        std::fs::write(
            &input,
            r#"[{"name": "Kampung Baru 甘榜峇鲁", "latitude": 3.16, "longitude": 101.70}]"#,
        )
        .unwrap();

        let loaded = load(&input).unwrap();
        let bytes = render(&loaded.records).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("甘榜峇鲁"));
        assert!(text.starts_with("[\n  {"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
