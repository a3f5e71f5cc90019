/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 09/06/2024
Last Modified: 03/02/2025
License: MIT
*/
use crate::clipping::matcher::PolygonSources;
use crate::clipping::naming::resolve_name;
use crate::vector::PolygonDataset;
use std::path::{Path, PathBuf};

/// One executable clip job: the polygon, its source tiles, and where the
/// output lands.
#[derive(Clone, Debug)]
pub struct ClipPlan {
    pub polygon_id: usize,
    pub source_paths: Vec<String>,
    pub output_path: PathBuf,
}

/// Turns the match results into executable jobs. Polygons with no source
/// tiles are returned separately so the caller can report them as skipped
/// rather than failed. Outputs are named from the configured attribute with
/// the `polygon_{id}` fallback, always with a `.las` extension.
pub fn plan_outputs(
    polygons: &PolygonDataset,
    matches: &[PolygonSources],
    output_dir: &Path,
    name_field: Option<&str>,
    suffix: Option<&str>,
) -> (Vec<ClipPlan>, Vec<usize>) {
    let mut plans = vec![];
    let mut skipped = vec![];
    for entry in matches {
        if entry.source_paths.is_empty() {
            skipped.push(entry.polygon_id);
            continue;
        }
        let record = polygons.get_record(entry.polygon_id);
        let stem = resolve_name(record, name_field, suffix);
        plans.push(ClipPlan {
            polygon_id: entry.polygon_id,
            source_paths: entry.source_paths.clone(),
            output_path: output_dir.join(format!("{}.las", stem)),
        });
    }
    (plans, skipped)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vector::{FieldData, PolygonGeometry, PolygonRecord};

    fn dataset() -> PolygonDataset {
        let records = (0..3)
            .map(|id| {
                PolygonRecord::new(
                    id,
                    PolygonGeometry::rectangle(0.0, 1.0, 0.0, 1.0),
                    vec![(
                        "name".to_string(),
                        FieldData::Text(format!("stand {}", id)),
                    )],
                )
            })
            .collect();
        PolygonDataset::new(
            Some("EPSG:26917".to_string()),
            vec!["name".to_string()],
            records,
        )
    }

    #[test]
    fn test_plan_separates_empty_matches() {
        let matches = vec![
            PolygonSources {
                polygon_id: 0,
                source_paths: vec!["/data/t1.las".to_string()],
            },
            PolygonSources {
                polygon_id: 1,
                source_paths: vec![],
            },
            PolygonSources {
                polygon_id: 2,
                source_paths: vec!["/data/t1.las".to_string(), "/data/t2.las".to_string()],
            },
        ];
        let (plans, skipped) = plan_outputs(
            &dataset(),
            &matches,
            Path::new("/out"),
            Some("name"),
            None,
        );
        assert_eq!(plans.len(), 2);
        assert_eq!(skipped, vec![1]);
        assert_eq!(plans[0].output_path, PathBuf::from("/out/stand_0.las"));
        assert_eq!(plans[1].polygon_id, 2);
        assert_eq!(plans[1].source_paths.len(), 2);
    }

    #[test]
    fn test_plan_fallback_names_and_suffix() {
        let matches = vec![PolygonSources {
            polygon_id: 1,
            source_paths: vec!["/data/t1.las".to_string()],
        }];
        let (plans, _) = plan_outputs(
            &dataset(),
            &matches,
            Path::new("/out"),
            None,
            Some("thinned"),
        );
        assert_eq!(
            plans[0].output_path,
            PathBuf::from("/out/polygon_1_thinned.las")
        );
    }
}
