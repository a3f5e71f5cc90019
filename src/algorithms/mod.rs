// private sub-module defined in another file
mod poly_ops;

// exports identifiers from private sub-modules in the current module namespace
pub use self::poly_ops::point_in_poly;
pub use self::poly_ops::poly_overlaps_poly;
pub use self::poly_ops::poly_within_poly;
pub use self::poly_ops::winding_number;
