/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 18/05/2024
Last Modified: 03/02/2025
License: MIT
*/
use crate::structures::Point2D;
use std::fmt;
use std::io::{Error, ErrorKind};
use std::str::FromStr;
use thiserror::Error as ThisError;

/// Errors raised while validating or reconciling coordinate reference
/// systems. All of them are fatal to the operation that raised them.
#[derive(Debug, ThisError, PartialEq)]
pub enum CrsError {
    #[error("CRS is undefined")]
    Undefined,
    #[error("Invalid CRS: {0}")]
    Invalid(String),
    #[error("Mixed CRS detected ({0} vs {1}); align inputs before clipping")]
    Mismatch(String, String),
    #[error("Reprojection from {from} to {to} is not supported")]
    Reprojection { from: String, to: String },
}

impl From<CrsError> for Error {
    fn from(err: CrsError) -> Error {
        Error::new(ErrorKind::InvalidData, err.to_string())
    }
}

/// A CRS descriptor resolved to its canonical `EPSG:nnnn` form, comparable
/// by identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanonicalCrs {
    pub code: u32,
}

impl fmt::Display for CanonicalCrs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EPSG:{}", self.code)
    }
}

impl CanonicalCrs {
    /// Returns (zone, is_south) when this is a WGS84/UTM system.
    pub fn utm_zone(&self) -> Option<(u32, bool)> {
        match self.code {
            32601..=32660 => Some((self.code - 32600, false)),
            32701..=32760 => Some((self.code - 32700, true)),
            _ => None,
        }
    }

    pub fn is_geographic_wgs84(&self) -> bool {
        self.code == 4326
    }
}

/// Resolves a CRS descriptor to canonical form. Accepted inputs are
/// `EPSG:nnnn` (any case), a bare numeric code, the URN form
/// `urn:ogc:def:crs:EPSG::nnnn`, and the GeoJSON default `CRS84`.
pub fn canonicalize(descriptor: Option<&str>) -> Result<CanonicalCrs, CrsError> {
    let raw = match descriptor {
        Some(s) if !s.trim().is_empty() => s.trim(),
        _ => return Err(CrsError::Undefined),
    };
    let lowered = raw.to_lowercase();
    if lowered == "urn:ogc:def:crs:ogc:1.3:crs84" || lowered == "crs84" {
        return Ok(CanonicalCrs { code: 4326 });
    }
    let candidate = if let Some(code) = lowered.strip_prefix("epsg:") {
        code
    } else if lowered.starts_with("urn:ogc:def:crs:epsg:") {
        match lowered.rsplit(':').next() {
            Some(code) => code,
            None => return Err(CrsError::Invalid(raw.to_string())),
        }
    } else {
        lowered.as_str()
    };
    match candidate.parse::<u32>() {
        Ok(code) if code > 0 => Ok(CanonicalCrs { code: code }),
        _ => Err(CrsError::Invalid(raw.to_string())),
    }
}

/// Verifies that every descriptor in a collection resolves to a single
/// canonical CRS and returns it. An absent descriptor anywhere in the
/// collection, or an empty collection, is an `Undefined` error.
pub fn ensure_consistent<I, S>(descriptors: I) -> Result<CanonicalCrs, CrsError>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut resolved: Option<CanonicalCrs> = None;
    for value in descriptors {
        let crs = match value {
            Some(s) => canonicalize(Some(s.as_ref()))?,
            None => return Err(CrsError::Undefined),
        };
        match resolved {
            None => resolved = Some(crs),
            Some(first) => {
                if first != crs {
                    return Err(CrsError::Mismatch(first.to_string(), crs.to_string()));
                }
            }
        }
    }
    resolved.ok_or(CrsError::Undefined)
}

/// How a polygon/tile-index CRS disagreement is resolved. The policy is
/// always explicit configuration, never inferred per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrsPolicy {
    /// A mismatch between the polygon dataset and the tile index is fatal.
    #[serde(rename = "strict")]
    Strict,
    /// The tile index is reprojected into the polygon CRS before matching.
    #[serde(rename = "reproject")]
    ReprojectTiles,
}

impl Default for CrsPolicy {
    fn default() -> CrsPolicy {
        CrsPolicy::Strict
    }
}

impl FromStr for CrsPolicy {
    type Err = CrsError;

    fn from_str(s: &str) -> Result<CrsPolicy, CrsError> {
        match s.to_lowercase().trim() {
            "strict" => Ok(CrsPolicy::Strict),
            "reproject" => Ok(CrsPolicy::ReprojectTiles),
            other => Err(CrsError::Invalid(format!("unknown CRS policy '{}'", other))),
        }
    }
}

/// Reprojects a single point. Identity when the systems agree; otherwise
/// only geographic WGS84 into WGS84/UTM is supported, which covers tile
/// indexes written in the EPSG:4326 convention of the reference tooling.
pub fn reproject_point(
    from: CanonicalCrs,
    to: CanonicalCrs,
    p: Point2D,
) -> Result<Point2D, CrsError> {
    if from == to {
        return Ok(p);
    }
    let (zone, south) = match (from.is_geographic_wgs84(), to.utm_zone()) {
        (true, Some(zone)) => zone,
        _ => {
            return Err(CrsError::Reprojection {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    };
    Ok(deg_to_utm_zone(p.y, p.x, zone, south))
}

/// Transforms geographic WGS84 coordinates into UTM for a caller-supplied
/// zone. Truncated Karney-style series, good to roughly a metre, which is
/// ample for footprint screening.
fn deg_to_utm_zone(latitude: f64, longitude: f64, zone: u32, south: bool) -> Point2D {
    const E_PRIME: f64 = 0.0820944379;
    const E_PRIME_SQ: f64 = 0.006739496742;
    const K0_A: f64 = 0.9996 * 6399593.625;

    let lat = latitude.to_radians();
    let lon = longitude.to_radians();
    let central_meridian = (6.0 * zone as f64 - 183.0).to_radians();
    let delta_sin = (lon - central_meridian).sin();
    let cos_lat = lat.cos();
    let sin_2lat = (2.0 * lat).sin();

    let xi = 0.5 * ((1.0 + cos_lat * delta_sin) / (1.0 - cos_lat * delta_sin)).ln();
    let easting = xi * 0.9996 * 6399593.62 / (1.0 + E_PRIME * E_PRIME * cos_lat * cos_lat).sqrt()
        * (1.0 + E_PRIME * E_PRIME / 2.0 * xi * xi * cos_lat * cos_lat / 3.0)
        + 500000.0;

    let eta = (lat.tan() / (lon - central_meridian).cos()).atan() - lat;
    let m1 = lat + sin_2lat / 2.0;
    let m2 = 3.0 * m1 + sin_2lat * cos_lat * cos_lat;
    let m3 = 5.0 * m2 / 4.0 + sin_2lat * cos_lat * cos_lat * cos_lat * cos_lat;
    let mut northing = eta * K0_A / (1.0 + E_PRIME_SQ * cos_lat * cos_lat).sqrt()
        * (1.0 + E_PRIME_SQ / 2.0 * xi * xi * cos_lat * cos_lat)
        + K0_A * (lat - 0.005054622556 * m1 + 4.258201531e-05 * m2 / 4.0 - 1.674057895e-07 * m3 / 3.0);
    if south {
        northing += 10000000.0;
    }
    Point2D::new(easting, northing)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::structures::Point2D;

    #[test]
    fn test_canonicalize_accepted_forms() {
        for input in &["EPSG:26917", "epsg:26917", "26917", "urn:ogc:def:crs:EPSG::26917"] {
            assert_eq!(
                canonicalize(Some(input)).unwrap(),
                CanonicalCrs { code: 26917 },
                "failed for {}",
                input
            );
        }
        assert_eq!(
            canonicalize(Some("urn:ogc:def:crs:OGC:1.3:CRS84")).unwrap(),
            CanonicalCrs { code: 4326 }
        );
    }

    #[test]
    fn test_canonicalize_errors() {
        assert_eq!(canonicalize(None), Err(CrsError::Undefined));
        assert_eq!(canonicalize(Some("   ")), Err(CrsError::Undefined));
        assert!(matches!(
            canonicalize(Some("not-a-crs")),
            Err(CrsError::Invalid(_))
        ));
    }

    #[test]
    fn test_ensure_consistent() {
        let crs = ensure_consistent(vec![Some("EPSG:4326"), Some("4326")]).unwrap();
        assert_eq!(crs.code, 4326);
        assert!(matches!(
            ensure_consistent(vec![Some("EPSG:4326"), Some("EPSG:32617")]),
            Err(CrsError::Mismatch(_, _))
        ));
        assert_eq!(
            ensure_consistent(vec![Some("EPSG:4326"), None::<&str>]),
            Err(CrsError::Undefined)
        );
        assert_eq!(
            ensure_consistent(Vec::<Option<&str>>::new()),
            Err(CrsError::Undefined)
        );
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(CrsPolicy::from_str("strict").unwrap(), CrsPolicy::Strict);
        assert_eq!(
            CrsPolicy::from_str("Reproject").unwrap(),
            CrsPolicy::ReprojectTiles
        );
        assert!(CrsPolicy::from_str("lenient").is_err());
    }

    #[test]
    fn test_reproject_identity() {
        let crs = CanonicalCrs { code: 26917 };
        let p = Point2D::new(630000.0, 4833000.0);
        assert_eq!(reproject_point(crs, crs, p).unwrap(), p);
    }

    #[test]
    fn test_reproject_wgs84_to_utm17n() {
        // Toronto: 43.6426 N, 79.3871 W -> UTM zone 17N, ~630084 E, ~4833438 N
        let from = CanonicalCrs { code: 4326 };
        let to = CanonicalCrs { code: 32617 };
        let p = reproject_point(from, to, Point2D::new(-79.3871, 43.6426)).unwrap();
        assert!((p.x - 630084.0).abs() < 500.0, "easting {}", p.x);
        assert!((p.y - 4833438.0).abs() < 500.0, "northing {}", p.y);
    }

    #[test]
    fn test_reproject_unsupported_pair() {
        let from = CanonicalCrs { code: 26917 };
        let to = CanonicalCrs { code: 32617 };
        assert!(matches!(
            reproject_point(from, to, Point2D::new(0.0, 0.0)),
            Err(CrsError::Reprojection { .. })
        ));
    }
}
