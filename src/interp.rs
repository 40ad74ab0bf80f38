use crate::types::{Point, Value};

/// Value differences smaller than this are treated as a flat edge.
const FLAT_EDGE: Value = 1e-12;

// Return the interpolation factor t corresponding to iso_val, clamped to the edge.
// A flat edge has no unique crossing, so its midpoint is used.
pub fn find_t(v0: Value, v1: Value, iso_val: Value) -> Value {
    let denominator = v1 - v0;
    if denominator.abs() < FLAT_EDGE || !denominator.is_finite() {
        return 0.5;
    }
    let t = (iso_val - v0) / denominator;
    if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 }
}

// Linear interpolation
pub fn lerp(a: Value, b: Value, t: Value) -> Value {
    a + (b - a) * t
}

// Linearly interpolate between two points by factor t
pub fn interpolate_points(p0: &Point, p1: &Point, t: Value) -> Point {
    Point::new(
        lerp(p0.x, p1.x, t),
        lerp(p0.y, p1.y, t),
        lerp(p0.z, p1.z, t),
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn crossing_factor() {
        // t = v0 / (v0 - v1) at iso-level zero
        assert_relative_eq!(find_t(-1.0, 3.0, 0.0), 0.25);
        assert_relative_eq!(find_t(2.0, -2.0, 0.0), 0.5);
        assert_eq!(find_t(0.0, 0.0, 0.0), 0.5);
        assert_eq!(find_t(-0.5, -0.5, 0.0), 0.5);
        assert_eq!(find_t(-1.0, -0.5, 0.0), 1.0);
    }

    #[test]
    fn interpolates_between_points() {
        let p = interpolate_points(&Point::new(0.0, 1.0, 2.0), &Point::new(2.0, 1.0, 0.0), 0.25);
        assert_relative_eq!(p, Point::new(0.5, 1.0, 1.5));
    }
}
