/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 12/05/2024
Last Modified: 21/01/2025
License: MIT
*/
use crate::structures::{BoundingBox, Point2D};

/// Tests if a point is Left|On|Right of an infinite line,
/// based on http://geomalgorithms.com/a03-_inclusion.html.
///
/// Input:  three points p0, p1, and p2
///
/// Return: > 0 for p2 left of the line through p0 and p1
///         = 0 for p2 on the line through p0 and p1
///         < 0 for p2 right of the line through p0 and p1
fn is_left(p0: &Point2D, p1: &Point2D, p2: &Point2D) -> f64 {
    (p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y)
}

/// Tests whether a point is within a polygon ring using the winding number
/// (wn). The point falls within the ring if the winding number is odd.
/// Points on the edge of the ring are deemed outside.
pub fn point_in_poly(p: &Point2D, poly: &[Point2D]) -> bool {
    winding_number(&p, &poly) % 2 != 0i32
}

/// Calculates the winding number (wn) of a point with respect to a polygon
/// ring. The ring is treated as implicitly closed; a duplicated final vertex
/// is tolerated but not required.
pub fn winding_number(p: &Point2D, poly: &[Point2D]) -> i32 {
    if poly.len() < 3 {
        return 0i32;
    }
    let mut wn = 0i32;
    let n = poly.len();
    for i in 0..n {
        let v0 = &poly[i];
        let v1 = &poly[(i + 1) % n];
        if v0.nearly_equals(v1) {
            continue; // the explicit closing vertex contributes nothing
        }
        if v0.y <= p.y {
            // start y <= p.y
            if v1.y > p.y {
                // an upward crossing
                if is_left(v0, v1, &p) > 0f64 {
                    wn += 1i32; // have a valid up intersect
                }
            }
        } else {
            // start y > p.y (no test needed)
            if v1.y <= p.y {
                // a downward crossing
                if is_left(v0, v1, &p) < 0f64 {
                    wn -= 1i32; // have a valid down intersect
                }
            }
        }
    }
    wn
}

/// Tests whether the closed segments (p0, p1) and (p2, p3) intersect.
fn segments_intersect(p0: &Point2D, p1: &Point2D, p2: &Point2D, p3: &Point2D) -> bool {
    let d1 = is_left(p2, p3, p0);
    let d2 = is_left(p2, p3, p1);
    let d3 = is_left(p0, p1, p2);
    let d4 = is_left(p0, p1, p3);
    if ((d1 > 0f64 && d2 < 0f64) || (d1 < 0f64 && d2 > 0f64))
        && ((d3 > 0f64 && d4 < 0f64) || (d3 < 0f64 && d4 > 0f64))
    {
        return true;
    }
    // collinear overlap and endpoint touches
    let on_segment = |a: &Point2D, b: &Point2D, c: &Point2D| {
        c.x >= a.x.min(b.x) && c.x <= a.x.max(b.x) && c.y >= a.y.min(b.y) && c.y <= a.y.max(b.y)
    };
    (d1 == 0f64 && on_segment(p2, p3, p0))
        || (d2 == 0f64 && on_segment(p2, p3, p1))
        || (d3 == 0f64 && on_segment(p0, p1, p2))
        || (d4 == 0f64 && on_segment(p0, p1, p3))
}

/// Tests whether any edge of ring `poly1` crosses an edge of ring `poly2`.
/// Both rings are treated as implicitly closed.
fn poly_edges_cross(poly1: &[Point2D], poly2: &[Point2D]) -> bool {
    let n1 = poly1.len();
    let n2 = poly2.len();
    for i in 0..n1 {
        let a0 = &poly1[i];
        let a1 = &poly1[(i + 1) % n1];
        for j in 0..n2 {
            let b0 = &poly2[j];
            let b1 = &poly2[(j + 1) % n2];
            if segments_intersect(a0, a1, b0, b1) {
                return true;
            }
        }
    }
    false
}

/// Tests whether one polygon ring overlaps another. Overlap is confirmed by
/// a vertex of either ring falling within the other, or by an edge crossing;
/// disjoint rings fail all three tests.
pub fn poly_overlaps_poly(poly1: &[Point2D], poly2: &[Point2D]) -> bool {
    if !BoundingBox::from_points(poly1).overlaps(BoundingBox::from_points(poly2)) {
        return false;
    }
    for p in poly1 {
        if point_in_poly(p, poly2) {
            return true;
        }
    }
    for p in poly2 {
        if point_in_poly(p, poly1) {
            return true;
        }
    }
    poly_edges_cross(poly1, poly2)
}

/// Tests whether ring `inner` lies entirely within ring `outer`: every
/// vertex of `inner` falls inside `outer` and no edges cross. Used to
/// recognize geometry swallowed whole by an interior ring.
pub fn poly_within_poly(inner: &[Point2D], outer: &[Point2D]) -> bool {
    if !BoundingBox::from_points(outer).overlaps(BoundingBox::from_points(inner)) {
        return false;
    }
    inner.iter().all(|p| point_in_poly(p, outer)) && !poly_edges_cross(inner, outer)
}
