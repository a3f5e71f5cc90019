/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 18/05/2024
Last Modified: 03/02/2025
License: MIT
*/

// private sub-modules defined in other files
mod geojson;
pub mod wkt;

pub use self::geojson::parse_feature_collection;

use crate::structures::{BoundingBox, Point2D};
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::Path;
use thiserror::Error as ThisError;

/// Polygon source formats the reader accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["geojson", "json"];

#[derive(Debug, ThisError)]
pub enum VectorError {
    #[error("Polygon source not found: {0}")]
    FileNotFound(String),
    #[error("Unsupported polygon format '{0}'. Supported: .geojson, .json")]
    UnsupportedFormat(String),
    #[error("Layer selection is not supported for GeoJSON sources")]
    LayerNotSupported,
    #[error("Polygon source '{0}' contains no features")]
    EmptyDataset(String),
    #[error("Error parsing polygon source: {0}")]
    Parse(String),
    #[error("Invalid polygon geometry: {0}")]
    Geometry(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl From<VectorError> for Error {
    fn from(err: VectorError) -> Error {
        Error::new(ErrorKind::InvalidData, err.to_string())
    }
}

/// A single attribute value. Matches the scalar types a GeoJSON `properties`
/// object can carry.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldData {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl FieldData {
    /// String form used for output naming; `Null` has no string form.
    pub fn as_string(&self) -> Option<String> {
        match self {
            FieldData::Null => None,
            FieldData::Int(v) => Some(v.to_string()),
            FieldData::Real(v) => Some(v.to_string()),
            FieldData::Text(v) => Some(v.clone()),
            FieldData::Bool(v) => Some(v.to_string()),
        }
    }
}

/// A polygon with one shell ring and zero or more hole rings. Rings are
/// stored closed (first vertex duplicated at the end).
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonGeometry {
    rings: Vec<Vec<Point2D>>,
}

impl PolygonGeometry {
    pub fn new(mut rings: Vec<Vec<Point2D>>) -> Result<PolygonGeometry, VectorError> {
        if rings.is_empty() {
            return Err(VectorError::Geometry("polygon has no rings".to_string()));
        }
        for ring in rings.iter_mut() {
            if ring.len() < 3 {
                return Err(VectorError::Geometry(format!(
                    "ring has only {} vertices",
                    ring.len()
                )));
            }
            let first = ring[0];
            if !ring[ring.len() - 1].nearly_equals(&first) {
                ring.push(first);
            }
        }
        Ok(PolygonGeometry { rings: rings })
    }

    /// Builds an axis-aligned rectangle polygon.
    pub fn rectangle(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> PolygonGeometry {
        PolygonGeometry {
            rings: vec![vec![
                Point2D::new(min_x, min_y),
                Point2D::new(max_x, min_y),
                Point2D::new(max_x, max_y),
                Point2D::new(min_x, max_y),
                Point2D::new(min_x, min_y),
            ]],
        }
    }

    /// The outer ring.
    pub fn shell(&self) -> &[Point2D] {
        &self.rings[0]
    }

    /// Hole rings, possibly empty.
    pub fn holes(&self) -> &[Vec<Point2D>] {
        &self.rings[1..]
    }

    pub fn rings(&self) -> &[Vec<Point2D>] {
        &self.rings
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.shell())
    }

    /// Applies a fallible point transform to every vertex, returning a new
    /// geometry.
    pub fn map_points<F, E>(&self, mut f: F) -> Result<PolygonGeometry, E>
    where
        F: FnMut(Point2D) -> Result<Point2D, E>,
    {
        let mut rings = Vec::with_capacity(self.rings.len());
        for ring in &self.rings {
            let mut out = Vec::with_capacity(ring.len());
            for p in ring {
                out.push(f(*p)?);
            }
            rings.push(out);
        }
        Ok(PolygonGeometry { rings: rings })
    }

    pub fn to_wkt(&self) -> String {
        wkt::polygon_to_wkt(self)
    }
}

/// One polygon feature: a stable id (dataset order), its geometry, and its
/// attribute table.
#[derive(Clone, Debug)]
pub struct PolygonRecord {
    pub id: usize,
    pub geometry: PolygonGeometry,
    attributes: Vec<(String, FieldData)>,
}

impl PolygonRecord {
    pub fn new(
        id: usize,
        geometry: PolygonGeometry,
        attributes: Vec<(String, FieldData)>,
    ) -> PolygonRecord {
        PolygonRecord {
            id: id,
            geometry: geometry,
            attributes: attributes,
        }
    }

    /// Returns the named attribute rendered as a string, or `None` when the
    /// field is absent or null. Callers supply their own fallback.
    pub fn attribute_as_string(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(field, _)| field == name)
            .and_then(|(_, value)| value.as_string())
    }
}

/// An in-memory polygon dataset. Read-only to the rest of the engine.
#[derive(Clone, Debug)]
pub struct PolygonDataset {
    crs: Option<String>,
    field_names: Vec<String>,
    records: Vec<PolygonRecord>,
}

impl PolygonDataset {
    pub fn new(
        crs: Option<String>,
        field_names: Vec<String>,
        records: Vec<PolygonRecord>,
    ) -> PolygonDataset {
        PolygonDataset {
            crs: crs,
            field_names: field_names,
            records: records,
        }
    }

    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    pub fn get_record(&self, id: usize) -> &PolygonRecord {
        &self.records[id]
    }

    pub fn records(&self) -> &[PolygonRecord] {
        &self.records
    }
}

/// Reads a polygon dataset from a GeoJSON file. Fails on a missing file, an
/// unsupported extension, or an empty feature collection. The `layer`
/// parameter exists for multi-layer formats; GeoJSON has none.
pub fn read_polygons(path: &Path, layer: Option<&str>) -> Result<PolygonDataset, VectorError> {
    if layer.is_some() {
        return Err(VectorError::LayerNotSupported);
    }
    if !path.exists() {
        return Err(VectorError::FileNotFound(path.display().to_string()));
    }
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(VectorError::UnsupportedFormat(format!(".{}", extension)));
    }
    let text = fs::read_to_string(path)?;
    let dataset = parse_feature_collection(&text)?;
    if dataset.num_records() == 0 {
        return Err(VectorError::EmptyDataset(path.display().to_string()));
    }
    Ok(dataset)
}

/// Renders a human-readable description of a polygon source: path, feature
/// count, CRS, and the attribute fields available for output naming.
pub fn describe_fields(path: &Path, layer: Option<&str>) -> Result<Vec<String>, VectorError> {
    let dataset = read_polygons(path, layer)?;
    let mut lines = vec![
        format!("Path: {}", path.display()),
        format!("Features: {}", dataset.num_records()),
        format!("CRS: {}", dataset.crs().unwrap_or("None (undefined)")),
    ];
    if dataset.field_names().is_empty() {
        lines.push("Fields: <none>".to_string());
    } else {
        lines.push("Fields:".to_string());
        for name in dataset.field_names() {
            lines.push(format!("  - {}", name));
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polygons.shp");
        std::fs::File::create(&path).unwrap();
        match read_polygons(&path, None) {
            Err(VectorError::UnsupportedFormat(ext)) => assert_eq!(ext, ".shp"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = read_polygons(Path::new("/no/such/file.geojson"), None);
        assert!(matches!(result, Err(VectorError::FileNotFound(_))));
    }

    #[test]
    fn test_layer_rejected() {
        let result = read_polygons(Path::new("/tmp/x.geojson"), Some("layer1"));
        assert!(matches!(result, Err(VectorError::LayerNotSupported)));
    }

    #[test]
    fn test_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.geojson");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(br#"{"type": "FeatureCollection", "features": []}"#)
            .unwrap();
        assert!(matches!(
            read_polygons(&path, None),
            Err(VectorError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_attribute_as_string() {
        let geometry = PolygonGeometry::rectangle(0.0, 1.0, 0.0, 1.0);
        let record = PolygonRecord::new(
            0,
            geometry,
            vec![
                ("name".to_string(), FieldData::Text("Block A".to_string())),
                ("zone".to_string(), FieldData::Int(12)),
                ("empty".to_string(), FieldData::Null),
            ],
        );
        assert_eq!(record.attribute_as_string("name").as_deref(), Some("Block A"));
        assert_eq!(record.attribute_as_string("zone").as_deref(), Some("12"));
        assert_eq!(record.attribute_as_string("empty"), None);
        assert_eq!(record.attribute_as_string("missing"), None);
    }

    #[test]
    fn test_ring_closure_enforced() {
        let open_ring = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(1.0, 1.0),
        ];
        let geometry = PolygonGeometry::new(vec![open_ring]).unwrap();
        let shell = geometry.shell();
        assert_eq!(shell.len(), 4);
        assert!(shell[0].nearly_equals(&shell[3]));
    }
}
