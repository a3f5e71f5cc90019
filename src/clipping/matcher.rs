/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 09/06/2024
Last Modified: 03/02/2025
License: MIT
*/
use crate::algorithms::{poly_overlaps_poly, poly_within_poly};
use crate::crs::{self, CrsError, CrsPolicy};
use crate::structures::Point2D;
use crate::tindex::TileIndex;
use crate::vector::{PolygonDataset, PolygonGeometry};
use rstar::{RTree, RTreeObject, AABB};
use std::io::{Error, ErrorKind};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SelectionError {
    #[error("{0}")]
    Crs(#[from] CrsError),
    #[error("The tile index contains no tiles to match against")]
    EmptyTileIndex,
}

impl From<SelectionError> for Error {
    fn from(err: SelectionError) -> Error {
        Error::new(ErrorKind::InvalidData, err.to_string())
    }
}

/// The tiles feeding one polygon's clip, in tile-index order. Polygons with
/// no intersecting tiles are carried with an empty source list so the
/// downstream stages can classify them as skips.
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonSources {
    pub polygon_id: usize,
    pub source_paths: Vec<String>,
}

struct IndexedFootprint {
    tile: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedFootprint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> AABB<[f64; 2]> {
        self.envelope
    }
}

/// Tests one tile footprint shell against a polygon, holes included: the
/// shell must overlap the polygon's shell, and a footprint that sits wholly
/// inside one of the polygon's interior rings covers nothing.
fn footprint_intersects(polygon: &PolygonGeometry, footprint: &[Point2D]) -> bool {
    if !poly_overlaps_poly(polygon.shell(), footprint) {
        return false;
    }
    !polygon
        .holes()
        .iter()
        .any(|hole| poly_within_poly(footprint, hole))
}

/// Matches every polygon to the tiles whose footprints intersect it. The
/// result has one entry per polygon, ordered by polygon id, and is fully
/// deterministic for a given dataset and index.
pub fn match_polygons_to_tiles(
    polygons: &PolygonDataset,
    tindex: &TileIndex,
    policy: CrsPolicy,
) -> Result<Vec<PolygonSources>, SelectionError> {
    if tindex.tiles.is_empty() {
        return Err(SelectionError::EmptyTileIndex);
    }
    let polygon_crs = crs::canonicalize(polygons.crs())?;
    let tindex_crs = crs::canonicalize(Some(&tindex.crs))?;

    let footprints: Vec<PolygonGeometry> = if polygon_crs == tindex_crs {
        tindex.tiles.iter().map(|t| t.footprint.clone()).collect()
    } else {
        match policy {
            CrsPolicy::Strict => {
                return Err(SelectionError::Crs(CrsError::Mismatch(
                    polygon_crs.to_string(),
                    tindex_crs.to_string(),
                )))
            }
            CrsPolicy::ReprojectTiles => {
                let mut reprojected = Vec::with_capacity(tindex.tiles.len());
                for tile in &tindex.tiles {
                    reprojected.push(
                        tile.footprint
                            .map_points(|p| crs::reproject_point(tindex_crs, polygon_crs, p))?,
                    );
                }
                reprojected
            }
        }
    };

    let tree = RTree::bulk_load(
        footprints
            .iter()
            .enumerate()
            .map(|(tile, footprint)| {
                let bbox = footprint.bounding_box();
                IndexedFootprint {
                    tile: tile,
                    envelope: AABB::from_corners(
                        [bbox.min_x, bbox.min_y],
                        [bbox.max_x, bbox.max_y],
                    ),
                }
            })
            .collect(),
    );

    let mut matches = Vec::with_capacity(polygons.num_records());
    for record in polygons.records() {
        let bbox = record.geometry.bounding_box();
        let query = AABB::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y]);
        // the tree returns candidates in arbitrary order; sort to keep the
        // source list in tile-index order
        let mut candidates: Vec<usize> = tree
            .locate_in_envelope_intersecting(&query)
            .map(|f| f.tile)
            .collect();
        candidates.sort_unstable();

        let mut source_paths = vec![];
        for tile in candidates {
            if footprint_intersects(&record.geometry, footprints[tile].shell()) {
                source_paths.push(tindex.tiles[tile].filepath.clone());
            }
        }
        matches.push(PolygonSources {
            polygon_id: record.id,
            source_paths: source_paths,
        });
    }
    Ok(matches)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tindex::TileRecord;
    use crate::vector::{PolygonDataset, PolygonGeometry, PolygonRecord};

    fn dataset(crs: &str, geometries: Vec<PolygonGeometry>) -> PolygonDataset {
        let records = geometries
            .into_iter()
            .enumerate()
            .map(|(id, geometry)| PolygonRecord::new(id, geometry, vec![]))
            .collect();
        PolygonDataset::new(Some(crs.to_string()), vec![], records)
    }

    fn index(crs: &str, tiles: Vec<(&str, PolygonGeometry)>) -> TileIndex {
        TileIndex {
            layer: "las_tiles".to_string(),
            crs: crs.to_string(),
            tiles: tiles
                .into_iter()
                .map(|(path, footprint)| TileRecord {
                    filepath: path.to_string(),
                    footprint: footprint,
                })
                .collect(),
        }
    }

    #[test]
    fn test_match_classification() {
        // polygon 0 spans both tiles, polygon 1 lies outside the coverage,
        // polygon 2 sits inside the first tile only
        let polygons = dataset(
            "EPSG:26917",
            vec![
                PolygonGeometry::rectangle(90.0, 110.0, 0.0, 10.0),
                PolygonGeometry::rectangle(500.0, 510.0, 500.0, 510.0),
                PolygonGeometry::rectangle(10.0, 20.0, 10.0, 20.0),
            ],
        );
        let tindex = index(
            "EPSG:26917",
            vec![
                ("/data/t1.las", PolygonGeometry::rectangle(0.0, 100.0, 0.0, 100.0)),
                ("/data/t2.las", PolygonGeometry::rectangle(100.0, 200.0, 0.0, 100.0)),
            ],
        );
        let matches = match_polygons_to_tiles(&polygons, &tindex, CrsPolicy::Strict).unwrap();
        assert_eq!(matches.len(), 3);
        assert_eq!(
            matches[0].source_paths,
            vec!["/data/t1.las".to_string(), "/data/t2.las".to_string()]
        );
        assert!(matches[1].source_paths.is_empty());
        assert_eq!(matches[2].source_paths, vec!["/data/t1.las".to_string()]);
    }

    #[test]
    fn test_sources_follow_tile_index_order() {
        let polygons = dataset(
            "EPSG:26917",
            vec![PolygonGeometry::rectangle(0.0, 300.0, 0.0, 100.0)],
        );
        let tindex = index(
            "EPSG:26917",
            vec![
                ("/data/c.las", PolygonGeometry::rectangle(200.0, 300.0, 0.0, 100.0)),
                ("/data/a.las", PolygonGeometry::rectangle(0.0, 100.0, 0.0, 100.0)),
                ("/data/b.las", PolygonGeometry::rectangle(100.0, 200.0, 0.0, 100.0)),
            ],
        );
        let matches = match_polygons_to_tiles(&polygons, &tindex, CrsPolicy::Strict).unwrap();
        assert_eq!(
            matches[0].source_paths,
            vec![
                "/data/c.las".to_string(),
                "/data/a.las".to_string(),
                "/data/b.las".to_string()
            ]
        );
    }

    #[test]
    fn test_strict_policy_rejects_mismatch() {
        let polygons = dataset(
            "EPSG:26917",
            vec![PolygonGeometry::rectangle(0.0, 10.0, 0.0, 10.0)],
        );
        let tindex = index(
            "EPSG:4326",
            vec![("/data/t1.las", PolygonGeometry::rectangle(-80.0, -79.0, 43.0, 44.0))],
        );
        assert!(matches!(
            match_polygons_to_tiles(&polygons, &tindex, CrsPolicy::Strict),
            Err(SelectionError::Crs(CrsError::Mismatch(_, _)))
        ));
    }

    #[test]
    fn test_reproject_policy_brings_tiles_into_polygon_crs() {
        // Toronto-area polygon in UTM 17N; the index footprint is the same
        // region expressed geographically
        let polygons = dataset(
            "EPSG:32617",
            vec![PolygonGeometry::rectangle(
                629000.0, 631000.0, 4832000.0, 4834000.0,
            )],
        );
        let tindex = index(
            "EPSG:4326",
            vec![(
                "/data/toronto.las",
                PolygonGeometry::rectangle(-79.5, -79.3, 43.6, 43.7),
            )],
        );
        let matches =
            match_polygons_to_tiles(&polygons, &tindex, CrsPolicy::ReprojectTiles).unwrap();
        assert_eq!(matches[0].source_paths, vec!["/data/toronto.las".to_string()]);
    }

    #[test]
    fn test_empty_tile_index_rejected() {
        let polygons = dataset(
            "EPSG:26917",
            vec![PolygonGeometry::rectangle(0.0, 10.0, 0.0, 10.0)],
        );
        let tindex = index("EPSG:26917", vec![]);
        assert!(matches!(
            match_polygons_to_tiles(&polygons, &tindex, CrsPolicy::Strict),
            Err(SelectionError::EmptyTileIndex)
        ));
    }

    #[test]
    fn test_tile_inside_hole_is_not_a_match() {
        use crate::structures::Point2D;
        // a doughnut polygon; one tile sits wholly inside the hole, one
        // straddles the hole boundary, one lies in the solid part
        let doughnut = PolygonGeometry::new(vec![
            vec![
                Point2D::new(0.0, 0.0),
                Point2D::new(100.0, 0.0),
                Point2D::new(100.0, 100.0),
                Point2D::new(0.0, 100.0),
            ],
            vec![
                Point2D::new(30.0, 30.0),
                Point2D::new(70.0, 30.0),
                Point2D::new(70.0, 70.0),
                Point2D::new(30.0, 70.0),
            ],
        ])
        .unwrap();
        let polygons = dataset("EPSG:26917", vec![doughnut]);
        let tindex = index(
            "EPSG:26917",
            vec![
                ("/data/in_hole.las", PolygonGeometry::rectangle(40.0, 60.0, 40.0, 60.0)),
                ("/data/straddle.las", PolygonGeometry::rectangle(60.0, 80.0, 40.0, 60.0)),
                ("/data/solid.las", PolygonGeometry::rectangle(5.0, 20.0, 5.0, 20.0)),
            ],
        );
        let matches = match_polygons_to_tiles(&polygons, &tindex, CrsPolicy::Strict).unwrap();
        assert_eq!(
            matches[0].source_paths,
            vec![
                "/data/straddle.las".to_string(),
                "/data/solid.las".to_string()
            ]
        );
    }

    #[test]
    fn test_bbox_overlap_alone_is_not_a_match() {
        // the polygon's bounding box overlaps the tile but the geometry
        // itself stays clear
        let triangle = PolygonGeometry::new(vec![vec![
            crate::structures::Point2D::new(0.0, 0.0),
            crate::structures::Point2D::new(100.0, 0.0),
            crate::structures::Point2D::new(0.0, 100.0),
        ]])
        .unwrap();
        let polygons = dataset("EPSG:26917", vec![triangle]);
        let tindex = index(
            "EPSG:26917",
            vec![("/data/t1.las", PolygonGeometry::rectangle(80.0, 100.0, 80.0, 100.0))],
        );
        let matches = match_polygons_to_tiles(&polygons, &tindex, CrsPolicy::Strict).unwrap();
        assert!(matches[0].source_paths.is_empty());
    }
}
