/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 12/05/2024
Last Modified: 03/11/2024
License: MIT
*/
use std::f64::EPSILON;
use std::fmt;

/// A 2-D point, with x and y fields.
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(x: {}, y: {})", self.x, self.y)
    }
}

impl Point2D {
    /// Creates a new Point2D.
    pub fn new(x: f64, y: f64) -> Point2D {
        Point2D { x: x, y: y }
    }

    /// Calculates the midpoint between two Point2Ds.
    pub fn midpoint(p1: &Point2D, p2: &Point2D) -> Point2D {
        Point2D::new((p1.x + p2.x) / 2f64, (p1.y + p2.y) / 2f64)
    }

    /// Tests for coincidence within floating-point tolerance.
    pub fn nearly_equals(&self, other: &Point2D) -> bool {
        (self.x - other.x).abs() <= EPSILON && (self.y - other.y).abs() <= EPSILON
    }
}

#[cfg(test)]
mod test {
    use super::Point2D;

    #[test]
    fn test_midpoint() {
        let p = Point2D::midpoint(&Point2D::new(0.0, 0.0), &Point2D::new(4.0, 2.0));
        assert_eq!(p, Point2D::new(2.0, 1.0));
    }

    #[test]
    fn test_nearly_equals() {
        assert!(Point2D::new(1.0, 1.0).nearly_equals(&Point2D::new(1.0, 1.0)));
        assert!(!Point2D::new(1.0, 1.0).nearly_equals(&Point2D::new(1.0, 1.1)));
    }
}
