/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 02/06/2024
Last Modified: 14/12/2024
License: MIT
*/

//! Minimal well-known-text support: exactly the POLYGON form exchanged with
//! the external clipping and boundary tools. Holes are carried as additional
//! rings.

use crate::structures::Point2D;
use crate::vector::{PolygonGeometry, VectorError};

pub fn polygon_to_wkt(geometry: &PolygonGeometry) -> String {
    let rings: Vec<String> = geometry
        .rings()
        .iter()
        .map(|ring| {
            let coords: Vec<String> = ring.iter().map(|p| format!("{} {}", p.x, p.y)).collect();
            format!("({})", coords.join(", "))
        })
        .collect();
    format!("POLYGON ({})", rings.join(", "))
}

/// Parses a `POLYGON ((...), ...)` string, tolerating the spacing variants
/// the external tools emit. Z/M ordinates beyond x and y are ignored.
pub fn parse_polygon(text: &str) -> Result<PolygonGeometry, VectorError> {
    let trimmed = text.trim();
    let upper = trimmed.to_uppercase();
    if !upper.starts_with("POLYGON") {
        return Err(VectorError::Parse(format!(
            "expected POLYGON well-known text, got '{}'",
            truncate_for_message(trimmed)
        )));
    }
    let body = trimmed["POLYGON".len()..].trim();
    let body = body
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| {
            VectorError::Parse(format!(
                "unbalanced parentheses in '{}'",
                truncate_for_message(trimmed)
            ))
        })?;

    let mut rings = vec![];
    let mut depth = 0usize;
    let mut ring_text = String::new();
    for c in body.chars() {
        match c {
            '(' => {
                depth += 1;
                if depth > 1 {
                    return Err(VectorError::Parse(
                        "nested rings are not valid in a POLYGON".to_string(),
                    ));
                }
                ring_text.clear();
            }
            ')' => {
                if depth == 0 {
                    return Err(VectorError::Parse(
                        "unbalanced parentheses in POLYGON text".to_string(),
                    ));
                }
                depth -= 1;
                rings.push(parse_ring(&ring_text)?);
            }
            _ => {
                if depth == 1 {
                    ring_text.push(c);
                }
            }
        }
    }
    if rings.is_empty() {
        return Err(VectorError::Parse("POLYGON text has no rings".to_string()));
    }
    PolygonGeometry::new(rings)
}

fn parse_ring(text: &str) -> Result<Vec<Point2D>, VectorError> {
    let mut ring = vec![];
    for pair in text.split(',') {
        let mut ordinates = pair.split_whitespace();
        let x = parse_ordinate(ordinates.next(), pair)?;
        let y = parse_ordinate(ordinates.next(), pair)?;
        ring.push(Point2D::new(x, y));
    }
    Ok(ring)
}

fn parse_ordinate(value: Option<&str>, context: &str) -> Result<f64, VectorError> {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or_else(|| VectorError::Parse(format!("malformed coordinate '{}'", context.trim())))
}

fn truncate_for_message(text: &str) -> &str {
    match text.char_indices().nth(40) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::structures::Point2D;

    #[test]
    fn test_polygon_to_wkt() {
        let geometry = PolygonGeometry::rectangle(0.0, 2.0, 0.0, 1.0);
        assert_eq!(
            geometry.to_wkt(),
            "POLYGON ((0 0, 2 0, 2 1, 0 1, 0 0))"
        );
    }

    #[test]
    fn test_polygon_to_wkt_with_hole() {
        let geometry = PolygonGeometry::new(vec![
            vec![
                Point2D::new(0.0, 0.0),
                Point2D::new(10.0, 0.0),
                Point2D::new(10.0, 10.0),
                Point2D::new(0.0, 10.0),
            ],
            vec![
                Point2D::new(4.0, 4.0),
                Point2D::new(6.0, 4.0),
                Point2D::new(6.0, 6.0),
                Point2D::new(4.0, 6.0),
            ],
        ])
        .unwrap();
        let wkt = geometry.to_wkt();
        assert!(wkt.starts_with("POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (4 4,"));
    }

    #[test]
    fn test_parse_round_trip() {
        let geometry = PolygonGeometry::rectangle(630000.0, 630500.0, 4833000.0, 4833500.0);
        let parsed = parse_polygon(&geometry.to_wkt()).unwrap();
        assert_eq!(parsed, geometry);
    }

    #[test]
    fn test_parse_tolerates_compact_spacing() {
        let parsed = parse_polygon("POLYGON((0 0,1 0,1 1,0 1,0 0))").unwrap();
        assert_eq!(parsed.shell().len(), 5);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_polygon("LINESTRING (0 0, 1 1)").is_err());
        assert!(parse_polygon("POLYGON ((0 zero, 1 1))").is_err());
        assert!(parse_polygon("POLYGON (").is_err());
    }
}
