/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 02/06/2024
Last Modified: 03/02/2025
License: MIT
*/

//! The tile index: a persisted table of tile footprint geometry and source
//! file path, used to avoid opening every point-cloud file to test
//! intersection. Footprint derivation is delegated to an external boundary
//! tool; this module owns discovery, persistence, and validation.

use crate::crs;
use crate::structures::Point2D;
use crate::utils::ProgressReporter;
use crate::vector::{wkt, PolygonGeometry, VectorError};
use serde_json::{json, Value};
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error as ThisError;

/// Default layer name for newly built tile indexes.
pub const DEFAULT_LAYER: &str = "las_tiles";

/// Path-bearing column names recognized on load, normalized to the first.
pub const ACCEPTED_PATH_FIELDS: [&str; 4] = ["filepath", "location", "file", "path"];

/// Tile file extensions discovered under the root directories.
const TILE_EXTENSIONS: [&str; 3] = [".las", ".laz", ".zlidar"];

#[derive(Debug, ThisError)]
pub enum TindexError {
    #[error("At least one root directory is required to build a tile index")]
    NoRoots,
    #[error("Root directory does not exist: {0}")]
    RootNotFound(String),
    #[error("No tile files found under the given roots")]
    NoTilesFound,
    #[error("Tile index destination already exists: {0} (use overwrite to replace it)")]
    AlreadyExists(String),
    #[error("Tile index file not found: {0}")]
    NotFound(String),
    #[error("Layer '{0}' not found in tile index {1}")]
    LayerNotFound(String, String),
    #[error("Tile index '{0}' contains no records")]
    EmptyIndex(String),
    #[error("Tile index '{0}' has no recognizable path column (expected one of {1})")]
    MissingPathColumn(String, String),
    #[error("Tile index '{0}' has an undefined CRS; rebuild or annotate it")]
    UndefinedCrs(String),
    #[error("Boundary derivation failed for {path}: {message}")]
    Boundary { path: String, message: String },
    #[error("{0}")]
    Crs(#[from] crs::CrsError),
    #[error("Error parsing tile index: {0}")]
    Parse(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl From<VectorError> for TindexError {
    fn from(err: VectorError) -> TindexError {
        TindexError::Parse(err.to_string())
    }
}

impl From<TindexError> for Error {
    fn from(err: TindexError) -> Error {
        Error::new(ErrorKind::InvalidData, err.to_string())
    }
}

/// One indexed tile: its footprint and the source file it stands for.
#[derive(Clone, Debug)]
pub struct TileRecord {
    pub filepath: String,
    pub footprint: PolygonGeometry,
}

/// The loaded tile index. Read-only to the matching and execution stages.
#[derive(Clone, Debug)]
pub struct TileIndex {
    pub layer: String,
    pub crs: String,
    pub tiles: Vec<TileRecord>,
}

impl TileIndex {
    pub fn num_tiles(&self) -> usize {
        self.tiles.len()
    }
}

/// Derives a tile footprint through an external geometry tool. The second
/// return value is the tile's reported CRS, when the tool supplies one.
pub trait BoundaryEngine {
    fn tile_footprint(
        &self,
        path: &Path,
        fast: bool,
    ) -> Result<(PolygonGeometry, Option<String>), TindexError>;
}

/// PDAL-backed boundary derivation: `pdal info --boundary` for the precise
/// hull, `pdal info --summary` for the fast bounding-box variant.
pub struct PdalBoundaryEngine;

impl BoundaryEngine for PdalBoundaryEngine {
    fn tile_footprint(
        &self,
        path: &Path,
        fast: bool,
    ) -> Result<(PolygonGeometry, Option<String>), TindexError> {
        let mode = if fast { "--summary" } else { "--boundary" };
        let output = Command::new("pdal")
            .arg("info")
            .arg(mode)
            .arg(path)
            .output()
            .map_err(|e| TindexError::Boundary {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(TindexError::Boundary {
                path: path.display().to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let doc: Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            TindexError::Boundary {
                path: path.display().to_string(),
                message: format!("unreadable pdal info output: {}", e),
            }
        })?;
        let footprint = if fast {
            let bounds = &doc["summary"]["bounds"];
            match (
                bounds["minx"].as_f64(),
                bounds["maxx"].as_f64(),
                bounds["miny"].as_f64(),
                bounds["maxy"].as_f64(),
            ) {
                (Some(min_x), Some(max_x), Some(min_y), Some(max_y)) => {
                    PolygonGeometry::rectangle(min_x, max_x, min_y, max_y)
                }
                _ => {
                    return Err(TindexError::Boundary {
                        path: path.display().to_string(),
                        message: "pdal summary carried no bounds".to_string(),
                    })
                }
            }
        } else {
            let boundary = doc["boundary"]["boundary"].as_str().ok_or_else(|| {
                TindexError::Boundary {
                    path: path.display().to_string(),
                    message: "pdal info carried no boundary".to_string(),
                }
            })?;
            wkt::parse_polygon(boundary)?
        };
        // pdal's boundary output carries no usable authority code; the CRS
        // comes from the build options instead
        Ok((footprint, None))
    }
}

/// Build-time options. `crs` overrides the per-tile reported CRS; when both
/// are absent the index falls back to the EPSG:4326 convention of the
/// reference tooling.
pub struct TindexBuildOptions {
    pub layer: String,
    pub crs: Option<String>,
    pub fast_boundary: bool,
    pub overwrite: bool,
}

impl Default for TindexBuildOptions {
    fn default() -> TindexBuildOptions {
        TindexBuildOptions {
            layer: DEFAULT_LAYER.to_string(),
            crs: None,
            fast_boundary: true,
            overwrite: false,
        }
    }
}

/// Walks the root directories for tile files, derives a footprint per file,
/// and persists the index. Fails when no tile files are found or when the
/// destination exists and overwrite was not requested.
pub fn build_tile_index(
    roots: &[PathBuf],
    output: &Path,
    options: &TindexBuildOptions,
    engine: &dyn BoundaryEngine,
    reporter: &dyn ProgressReporter,
) -> Result<TileIndex, TindexError> {
    if roots.is_empty() {
        return Err(TindexError::NoRoots);
    }
    for root in roots {
        if !root.is_dir() {
            return Err(TindexError::RootNotFound(root.display().to_string()));
        }
    }
    if output.exists() && !options.overwrite {
        return Err(TindexError::AlreadyExists(output.display().to_string()));
    }

    let mut inputs = vec![];
    for root in roots {
        discover_tiles(root, &mut inputs)?;
    }
    inputs.sort();
    if inputs.is_empty() {
        return Err(TindexError::NoTilesFound);
    }

    let num_tiles = inputs.len();
    let mut tiles = Vec::with_capacity(num_tiles);
    let mut reported_crs: Vec<Option<String>> = Vec::with_capacity(num_tiles);
    for (i, input) in inputs.iter().enumerate() {
        let (footprint, srs) = engine.tile_footprint(input, options.fast_boundary)?;
        tiles.push(TileRecord {
            filepath: input.display().to_string(),
            footprint: footprint,
        });
        reported_crs.push(srs);
        reporter.progress(100 * (i + 1) / num_tiles);
    }

    let crs_text = match &options.crs {
        Some(value) => crs::canonicalize(Some(value))?.to_string(),
        None => {
            if reported_crs.iter().all(|c| c.is_none()) {
                "EPSG:4326".to_string()
            } else {
                crs::ensure_consistent(reported_crs.iter().map(|c| c.as_deref()))?.to_string()
            }
        }
    };

    let index = TileIndex {
        layer: options.layer.clone(),
        crs: crs_text,
        tiles: tiles,
    };
    write_tile_index(&index, output)?;
    reporter.log(&format!(
        "Indexed {} tiles into {}",
        index.num_tiles(),
        output.display()
    ));
    Ok(index)
}

fn discover_tiles(dir: &Path, inputs: &mut Vec<PathBuf>) -> Result<(), TindexError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            discover_tiles(&path, inputs)?;
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            let lowered = name.to_lowercase();
            if TILE_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext)) {
                inputs.push(path);
            }
        }
    }
    Ok(())
}

fn write_tile_index(index: &TileIndex, output: &Path) -> Result<(), TindexError> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tiles: Vec<Value> = index
        .tiles
        .iter()
        .map(|tile| {
            let rings: Vec<Value> = tile
                .footprint
                .rings()
                .iter()
                .map(|ring| {
                    Value::Array(ring.iter().map(|p| json!([p.x, p.y])).collect())
                })
                .collect();
            json!({ "filepath": tile.filepath, "footprint": rings })
        })
        .collect();
    let doc = json!({
        "layer": index.layer,
        "crs": index.crs,
        "tiles": tiles,
    });
    let text = serde_json::to_string_pretty(&doc).map_err(|e| TindexError::Parse(e.to_string()))?;
    fs::write(output, text)?;
    Ok(())
}

/// Loads a tile index back, normalizing the path column and validating that
/// the table is non-empty with a defined CRS.
pub fn read_tile_index(path: &Path, layer: Option<&str>) -> Result<TileIndex, TindexError> {
    if !path.exists() {
        return Err(TindexError::NotFound(path.display().to_string()));
    }
    let text = fs::read_to_string(path)?;
    let doc: Value = serde_json::from_str(&text).map_err(|e| TindexError::Parse(e.to_string()))?;

    let stored_layer = doc["layer"].as_str().unwrap_or(DEFAULT_LAYER).to_string();
    if let Some(requested) = layer {
        if requested != stored_layer {
            return Err(TindexError::LayerNotFound(
                requested.to_string(),
                path.display().to_string(),
            ));
        }
    }
    let crs_text = match doc["crs"].as_str() {
        Some(value) if !value.trim().is_empty() => value.to_string(),
        _ => return Err(TindexError::UndefinedCrs(path.display().to_string())),
    };
    let rows = doc["tiles"]
        .as_array()
        .ok_or_else(|| TindexError::Parse("'tiles' member is missing".to_string()))?;
    if rows.is_empty() {
        return Err(TindexError::EmptyIndex(path.display().to_string()));
    }

    let mut tiles = Vec::with_capacity(rows.len());
    for row in rows {
        let filepath = ACCEPTED_PATH_FIELDS
            .iter()
            .find_map(|field| row[*field].as_str())
            .ok_or_else(|| {
                TindexError::MissingPathColumn(
                    path.display().to_string(),
                    ACCEPTED_PATH_FIELDS.join(", "),
                )
            })?;
        let footprint = read_footprint(row)?;
        tiles.push(TileRecord {
            filepath: filepath.to_string(),
            footprint: footprint,
        });
    }
    Ok(TileIndex {
        layer: stored_layer,
        crs: crs_text,
        tiles: tiles,
    })
}

fn read_footprint(row: &Value) -> Result<PolygonGeometry, TindexError> {
    let rings_value = row["footprint"]
        .as_array()
        .ok_or_else(|| TindexError::Parse("tile row has no footprint".to_string()))?;
    let mut rings = Vec::with_capacity(rings_value.len());
    for ring_value in rings_value {
        let positions = ring_value
            .as_array()
            .ok_or_else(|| TindexError::Parse("malformed footprint ring".to_string()))?;
        let mut ring = Vec::with_capacity(positions.len());
        for position in positions {
            let coords = position
                .as_array()
                .ok_or_else(|| TindexError::Parse("malformed footprint position".to_string()))?;
            if coords.len() < 2 {
                return Err(TindexError::Parse(
                    "footprint position needs x and y".to_string(),
                ));
            }
            match (coords[0].as_f64(), coords[1].as_f64()) {
                (Some(x), Some(y)) => ring.push(Point2D::new(x, y)),
                _ => {
                    return Err(TindexError::Parse(
                        "non-numeric footprint coordinate".to_string(),
                    ))
                }
            }
        }
        rings.push(ring);
    }
    Ok(PolygonGeometry::new(rings)?)
}

/// Renders a human-readable description of an existing tile index.
pub fn describe_tile_index(path: &Path, layer: Option<&str>) -> Result<Vec<String>, TindexError> {
    let index = read_tile_index(path, layer)?;
    let mut lines = vec![
        format!("Tindex path: {}", path.display()),
        format!("Layer: {}", index.layer),
        format!("Features: {}", index.num_tiles()),
        format!("CRS: {}", index.crs),
    ];
    lines.push("Sample paths:".to_string());
    for tile in index.tiles.iter().take(5) {
        lines.push(format!("  - {}", tile.filepath));
    }
    Ok(lines)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::SilentReporter;
    use std::cell::RefCell;
    use std::fs::File;
    use std::io::Write;

    struct FixedBoundaryEngine {
        calls: RefCell<Vec<String>>,
    }

    impl FixedBoundaryEngine {
        fn new() -> FixedBoundaryEngine {
            FixedBoundaryEngine {
                calls: RefCell::new(vec![]),
            }
        }
    }

    impl BoundaryEngine for FixedBoundaryEngine {
        fn tile_footprint(
            &self,
            path: &Path,
            _fast: bool,
        ) -> Result<(PolygonGeometry, Option<String>), TindexError> {
            self.calls.borrow_mut().push(path.display().to_string());
            Ok((
                PolygonGeometry::rectangle(0.0, 1.0, 0.0, 1.0),
                Some("EPSG:26917".to_string()),
            ))
        }
    }

    fn touch(path: &Path) {
        File::create(path).unwrap();
    }

    #[test]
    fn test_build_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let tiles_dir = dir.path().join("tiles");
        std::fs::create_dir_all(tiles_dir.join("nested")).unwrap();
        touch(&tiles_dir.join("b.las"));
        touch(&tiles_dir.join("a.laz"));
        touch(&tiles_dir.join("nested").join("c.zlidar"));
        touch(&tiles_dir.join("notes.txt")); // ignored

        let output = dir.path().join("index").join("tindex.json");
        let engine = FixedBoundaryEngine::new();
        let built = build_tile_index(
            &[tiles_dir.clone()],
            &output,
            &TindexBuildOptions::default(),
            &engine,
            &SilentReporter,
        )
        .unwrap();
        assert_eq!(built.num_tiles(), 3);
        // discovery is sorted, so the build is deterministic
        let calls = engine.calls.borrow();
        assert!(calls[0].ends_with("a.laz"));
        assert!(calls[1].ends_with("b.las"));
        assert!(calls[2].ends_with("c.zlidar"));
        assert_eq!(built.crs, "EPSG:26917");

        let loaded = read_tile_index(&output, Some(DEFAULT_LAYER)).unwrap();
        assert_eq!(loaded.num_tiles(), 3);
        assert_eq!(loaded.crs, "EPSG:26917");
        assert_eq!(loaded.layer, DEFAULT_LAYER);
    }

    #[test]
    fn test_build_refuses_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let tiles_dir = dir.path().join("tiles");
        std::fs::create_dir_all(&tiles_dir).unwrap();
        touch(&tiles_dir.join("a.las"));
        let output = dir.path().join("tindex.json");
        touch(&output);

        let result = build_tile_index(
            &[tiles_dir],
            &output,
            &TindexBuildOptions::default(),
            &FixedBoundaryEngine::new(),
            &SilentReporter,
        );
        assert!(matches!(result, Err(TindexError::AlreadyExists(_))));
    }

    #[test]
    fn test_build_fails_without_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let tiles_dir = dir.path().join("tiles");
        std::fs::create_dir_all(&tiles_dir).unwrap();
        let result = build_tile_index(
            &[tiles_dir],
            &dir.path().join("tindex.json"),
            &TindexBuildOptions::default(),
            &FixedBoundaryEngine::new(),
            &SilentReporter,
        );
        assert!(matches!(result, Err(TindexError::NoTilesFound)));
    }

    #[test]
    fn test_read_normalizes_path_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tindex.json");
        let mut f = File::create(&path).unwrap();
        f.write_all(
            br#"{
                "layer": "las_tiles",
                "crs": "EPSG:4326",
                "tiles": [
                    {"location": "/data/a.las",
                     "footprint": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]}
                ]
            }"#,
        )
        .unwrap();
        let index = read_tile_index(&path, None).unwrap();
        assert_eq!(index.tiles[0].filepath, "/data/a.las");
    }

    #[test]
    fn test_read_rejects_missing_path_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tindex.json");
        let mut f = File::create(&path).unwrap();
        f.write_all(
            br#"{
                "layer": "las_tiles",
                "crs": "EPSG:4326",
                "tiles": [
                    {"source": "/data/a.las",
                     "footprint": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]}
                ]
            }"#,
        )
        .unwrap();
        assert!(matches!(
            read_tile_index(&path, None),
            Err(TindexError::MissingPathColumn(_, _))
        ));
    }

    #[test]
    fn test_read_rejects_undefined_crs_and_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let no_crs = dir.path().join("no_crs.json");
        std::fs::write(&no_crs, r#"{"layer": "las_tiles", "tiles": []}"#).unwrap();
        assert!(matches!(
            read_tile_index(&no_crs, None),
            Err(TindexError::UndefinedCrs(_))
        ));

        let empty = dir.path().join("empty.json");
        std::fs::write(
            &empty,
            r#"{"layer": "las_tiles", "crs": "EPSG:4326", "tiles": []}"#,
        )
        .unwrap();
        assert!(matches!(
            read_tile_index(&empty, None),
            Err(TindexError::EmptyIndex(_))
        ));
    }

    #[test]
    fn test_read_rejects_unknown_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tindex.json");
        std::fs::write(
            &path,
            r#"{"layer": "las_tiles", "crs": "EPSG:4326",
                "tiles": [{"filepath": "/a.las",
                           "footprint": [[[0,0],[1,0],[1,1],[0,0]]]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            read_tile_index(&path, Some("other_layer")),
            Err(TindexError::LayerNotFound(_, _))
        ));
    }
}
