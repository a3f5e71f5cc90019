/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 09/06/2024
Last Modified: 14/12/2024
License: MIT
*/

//! Persisted workflow configuration. One JSON file describes a complete
//! clipping run so that it can be repeated without retyping the arguments.

use crate::crs::CrsPolicy;
use crate::tindex;
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;

/// File name used when a config path points at a directory or is omitted.
pub const DEFAULT_CONFIG_NAME: &str = "lasclip_config.json";

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),
    #[error("Error parsing config {0}: {1}")]
    Parse(String, String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Error {
        Error::new(ErrorKind::InvalidData, err.to_string())
    }
}

/// The full description of a clipping run. Optional members carry serde
/// defaults so that older config files keep loading as fields are added.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Polygon dataset path (GeoJSON).
    pub polygons: String,
    /// Layer within the polygon source, for formats that have layers.
    #[serde(default)]
    pub polygons_layer: Option<String>,
    /// Root directories scanned for point-cloud tiles when the index is
    /// (re)built.
    #[serde(default)]
    pub las_roots: Vec<String>,
    /// Tile index path.
    pub tindex_path: String,
    #[serde(default = "default_tindex_layer")]
    pub tindex_layer: String,
    /// Directory receiving the clipped outputs.
    pub output_dir: String,
    /// Attribute used to name outputs; feature id is the fallback.
    #[serde(default)]
    pub name_field: Option<String>,
    /// Extra token appended to every output name.
    #[serde(default)]
    pub suffix: Option<String>,
    /// Use bounding-box footprints instead of exact boundaries when indexing.
    #[serde(default = "default_fast_boundary")]
    pub fast_boundary: bool,
    /// Replace outputs (and the tile index) that already exist.
    #[serde(default)]
    pub overwrite: bool,
    /// Report what the run would write without invoking the clipping tool.
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub crs_policy: CrsPolicy,
}

fn default_tindex_layer() -> String {
    tindex::DEFAULT_LAYER.to_string()
}

fn default_fast_boundary() -> bool {
    true
}

/// Resolves a config path: a directory receives the default file name.
pub fn resolve_config_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(DEFAULT_CONFIG_NAME)
    } else {
        path.to_path_buf()
    }
}

/// Loads a run configuration. A missing file is an error rather than an
/// implicit default; runs should never silently operate on guesses.
pub fn get_config(path: &Path) -> Result<RunConfig, ConfigError> {
    let resolved = resolve_config_path(path);
    if !resolved.exists() {
        return Err(ConfigError::NotFound(resolved.display().to_string()));
    }
    let text = fs::read_to_string(&resolved)?;
    serde_json::from_str(&text)
        .map_err(|e| ConfigError::Parse(resolved.display().to_string(), e.to_string()))
}

/// Writes a run configuration, creating parent directories as needed.
pub fn save_config(config: &RunConfig, path: &Path) -> Result<PathBuf, ConfigError> {
    let resolved = resolve_config_path(path);
    if let Some(parent) = resolved.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let text = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::Parse(resolved.display().to_string(), e.to_string()))?;
    fs::write(&resolved, text)?;
    Ok(resolved)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crs::CrsPolicy;

    fn sample_config() -> RunConfig {
        RunConfig {
            polygons: "/data/stands.geojson".to_string(),
            polygons_layer: None,
            las_roots: vec!["/data/las".to_string()],
            tindex_path: "/data/tindex.json".to_string(),
            tindex_layer: tindex::DEFAULT_LAYER.to_string(),
            output_dir: "/data/clips".to_string(),
            name_field: Some("name".to_string()),
            suffix: Some("2024".to_string()),
            fast_boundary: true,
            overwrite: false,
            dry_run: false,
            crs_policy: CrsPolicy::Strict,
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.json");
        let written = save_config(&sample_config(), &path).unwrap();
        assert_eq!(written, path);
        let loaded = get_config(&path).unwrap();
        assert_eq!(loaded.polygons, "/data/stands.geojson");
        assert_eq!(loaded.name_field.as_deref(), Some("name"));
        assert_eq!(loaded.crs_policy, CrsPolicy::Strict);
    }

    #[test]
    fn test_directory_path_uses_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let written = save_config(&sample_config(), dir.path()).unwrap();
        assert_eq!(
            written.file_name().and_then(|n| n.to_str()),
            Some(DEFAULT_CONFIG_NAME)
        );
        assert!(get_config(dir.path()).is_ok());
    }

    #[test]
    fn test_missing_config_is_an_error() {
        assert!(matches!(
            get_config(Path::new("/no/such/lasclip.json")),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.json");
        std::fs::write(
            &path,
            r#"{
                "polygons": "/data/stands.geojson",
                "tindex_path": "/data/tindex.json",
                "output_dir": "/data/clips"
            }"#,
        )
        .unwrap();
        let loaded = get_config(&path).unwrap();
        assert_eq!(loaded.tindex_layer, tindex::DEFAULT_LAYER);
        assert!(loaded.fast_boundary);
        assert!(!loaded.overwrite);
        assert!(!loaded.dry_run);
        assert_eq!(loaded.crs_policy, CrsPolicy::Strict);
        assert!(loaded.las_roots.is_empty());
        assert_eq!(loaded.suffix, None);
    }

    #[test]
    fn test_dry_run_flag_round_trips() {
        let mut config = sample_config();
        config.dry_run = true;
        let dir = tempfile::tempdir().unwrap();
        let written = save_config(&config, dir.path()).unwrap();
        assert!(get_config(&written).unwrap().dry_run);
    }

    #[test]
    fn test_malformed_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        match get_config(&path) {
            Err(ConfigError::Parse(reported, _)) => {
                assert!(reported.ends_with("broken.json"))
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
