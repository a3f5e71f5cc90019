/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 18/05/2024
Last Modified: 14/12/2024
License: MIT
*/
use crate::structures::Point2D;
use crate::vector::{FieldData, PolygonDataset, PolygonGeometry, PolygonRecord, VectorError};
use serde_json::Value;

/// Parses a GeoJSON FeatureCollection of Polygon features into a dataset.
/// Feature order supplies the stable polygon ids. The legacy `crs` member is
/// honoured when present; without it the CRS is left undefined and the CRS
/// validation stage decides whether that is acceptable.
pub fn parse_feature_collection(text: &str) -> Result<PolygonDataset, VectorError> {
    let root: Value =
        serde_json::from_str(text).map_err(|e| VectorError::Parse(e.to_string()))?;
    if root["type"].as_str() != Some("FeatureCollection") {
        return Err(VectorError::Parse(
            "expected a GeoJSON FeatureCollection".to_string(),
        ));
    }
    let crs = read_crs(&root);
    let features = root["features"]
        .as_array()
        .ok_or_else(|| VectorError::Parse("'features' member is missing".to_string()))?;

    let mut field_names: Vec<String> = vec![];
    let mut records = Vec::with_capacity(features.len());
    for (id, feature) in features.iter().enumerate() {
        let geometry = read_polygon_geometry(&feature["geometry"], id)?;
        let mut attributes = vec![];
        if let Some(properties) = feature["properties"].as_object() {
            for (name, value) in properties {
                if !field_names.iter().any(|f| f == name) {
                    field_names.push(name.clone());
                }
                attributes.push((name.clone(), read_field_value(value)));
            }
        }
        records.push(PolygonRecord::new(id, geometry, attributes));
    }
    Ok(PolygonDataset::new(crs, field_names, records))
}

fn read_crs(root: &Value) -> Option<String> {
    root["crs"]["properties"]["name"]
        .as_str()
        .map(|s| s.to_string())
}

fn read_field_value(value: &Value) -> FieldData {
    match value {
        Value::Null => FieldData::Null,
        Value::Bool(b) => FieldData::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldData::Int(i)
            } else {
                FieldData::Real(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => FieldData::Text(s.clone()),
        // nested arrays/objects have no scalar form; treat as absent
        _ => FieldData::Null,
    }
}

fn read_polygon_geometry(geometry: &Value, id: usize) -> Result<PolygonGeometry, VectorError> {
    match geometry["type"].as_str() {
        Some("Polygon") => {}
        Some(other) => {
            return Err(VectorError::Geometry(format!(
                "feature {} has geometry type '{}'; only Polygon is supported \
                 (split multi-part features before clipping)",
                id, other
            )))
        }
        None => {
            return Err(VectorError::Geometry(format!(
                "feature {} has no geometry",
                id
            )))
        }
    }
    let coordinates = geometry["coordinates"]
        .as_array()
        .ok_or_else(|| VectorError::Geometry(format!("feature {} has no coordinates", id)))?;
    let mut rings = Vec::with_capacity(coordinates.len());
    for ring_value in coordinates {
        let positions = ring_value
            .as_array()
            .ok_or_else(|| VectorError::Geometry(format!("feature {}: malformed ring", id)))?;
        let mut ring = Vec::with_capacity(positions.len());
        for position in positions {
            let coords = position.as_array().ok_or_else(|| {
                VectorError::Geometry(format!("feature {}: malformed position", id))
            })?;
            if coords.len() < 2 {
                return Err(VectorError::Geometry(format!(
                    "feature {}: position needs x and y",
                    id
                )));
            }
            let x = coords[0].as_f64().ok_or_else(|| {
                VectorError::Geometry(format!("feature {}: non-numeric x", id))
            })?;
            let y = coords[1].as_f64().ok_or_else(|| {
                VectorError::Geometry(format!("feature {}: non-numeric y", id))
            })?;
            ring.push(Point2D::new(x, y));
        }
        strip_closing_duplicates(&mut ring);
        rings.push(ring);
    }
    PolygonGeometry::new(rings)
}

// Removing explicit closing vertices before PolygonGeometry re-closes the
// ring keeps accidental double-closure out of the stored geometry.
fn strip_closing_duplicates(ring: &mut Vec<Point2D>) {
    while ring.len() > 3 && ring[0].nearly_equals(&ring[ring.len() - 1]) {
        ring.pop();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "EPSG:26917"}},
        "features": [
            {
                "type": "Feature",
                "properties": {"name": "north block", "priority": 2},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"name": "south block", "area_ha": 1.25},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[20.0, 0.0], [30.0, 0.0], [30.0, 10.0], [20.0, 10.0], [20.0, 0.0]]]
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_feature_collection() {
        let dataset = parse_feature_collection(COLLECTION).unwrap();
        assert_eq!(dataset.num_records(), 2);
        assert_eq!(dataset.crs(), Some("EPSG:26917"));
        assert_eq!(dataset.get_record(0).id, 0);
        assert_eq!(dataset.get_record(1).id, 1);
        assert_eq!(
            dataset.get_record(0).attribute_as_string("name").as_deref(),
            Some("north block")
        );
        // field names collected across all features
        assert!(dataset.field_names().iter().any(|f| f == "area_ha"));
    }

    #[test]
    fn test_parse_without_crs() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Polygon",
                          "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}}
        ]}"#;
        let dataset = parse_feature_collection(text).unwrap();
        assert_eq!(dataset.crs(), None);
    }

    #[test]
    fn test_reject_non_polygon_geometry() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Point", "coordinates": [0, 0]}}
        ]}"#;
        assert!(matches!(
            parse_feature_collection(text),
            Err(VectorError::Geometry(_))
        ));
    }

    #[test]
    fn test_reject_non_feature_collection() {
        assert!(matches!(
            parse_feature_collection(r#"{"type": "Feature"}"#),
            Err(VectorError::Parse(_))
        ));
    }
}
