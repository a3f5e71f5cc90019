/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 09/06/2024
Last Modified: 14/12/2024
License: MIT
*/
use crate::vector::PolygonRecord;

/// Replaces every character outside `[A-Za-z0-9_-]` with an underscore and
/// trims leading and trailing underscores, so output names are safe on any
/// filesystem. Idempotent.
pub fn sanitize(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    replaced.trim_matches('_').to_string()
}

/// Resolves the output stem for one polygon. The name field value is used
/// when present and non-empty; otherwise the stable `polygon_{id}` fallback.
/// A suffix, when configured, is appended with an underscore; a suffix that
/// sanitizes to nothing is dropped rather than leaving a dangling underscore.
pub fn resolve_name(
    record: &PolygonRecord,
    name_field: Option<&str>,
    suffix: Option<&str>,
) -> String {
    let base = name_field
        .and_then(|field| record.attribute_as_string(field))
        .map(|value| sanitize(&value))
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| format!("polygon_{}", record.id));
    match suffix.map(sanitize) {
        Some(s) if !s.is_empty() => format!("{}_{}", base, s),
        _ => base,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vector::{FieldData, PolygonGeometry, PolygonRecord};

    fn record_with_name(id: usize, name: Option<&str>) -> PolygonRecord {
        let attributes = match name {
            Some(n) => vec![("name".to_string(), FieldData::Text(n.to_string()))],
            None => vec![],
        };
        PolygonRecord::new(
            id,
            PolygonGeometry::rectangle(0.0, 1.0, 0.0, 1.0),
            attributes,
        )
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("North Block #3"), "North_Block__3");
        assert_eq!(sanitize("stand/12 (wet)"), "stand_12__wet");
        assert_eq!(sanitize("already_clean-1"), "already_clean-1");
        // fully symbolic names sanitize to nothing; the caller falls back
        assert_eq!(sanitize("***"), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize("a b/c%d");
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn test_resolve_name_from_field() {
        let record = record_with_name(7, Some("North Block"));
        assert_eq!(
            resolve_name(&record, Some("name"), None),
            "North_Block"
        );
    }

    #[test]
    fn test_resolve_name_fallback() {
        // no field configured, field missing, and field empty all fall back
        assert_eq!(
            resolve_name(&record_with_name(3, Some("x")), None, None),
            "polygon_3"
        );
        assert_eq!(
            resolve_name(&record_with_name(4, None), Some("name"), None),
            "polygon_4"
        );
        assert_eq!(
            resolve_name(&record_with_name(5, Some("")), Some("name"), None),
            "polygon_5"
        );
    }

    #[test]
    fn test_resolve_name_with_suffix() {
        let record = record_with_name(2, Some("stand 9"));
        assert_eq!(
            resolve_name(&record, Some("name"), Some("fall 2024")),
            "stand_9_fall_2024"
        );
        assert_eq!(resolve_name(&record, None, Some("v2")), "polygon_2_v2");
    }

    #[test]
    fn test_resolve_name_drops_empty_suffix() {
        let record = record_with_name(6, Some("North Block"));
        // a fully symbolic suffix sanitizes to nothing and is dropped
        assert_eq!(
            resolve_name(&record, Some("name"), Some("##")),
            "North_Block"
        );
        assert_eq!(resolve_name(&record, Some("name"), Some("")), "North_Block");
    }
}
