use nalgebra::{Point3, Vector3};

/// Scalar field value at a point in space.
pub type Value = f32;

/// A 3D point with [`Value`] components.
pub type Point = Point3<Value>;

/// A 3D vector with [`Value`] components.
pub type Vector = Vector3<Value>;

/// A scalar field function: maps a [`Point`] to a [`Value`].
///
/// Return values **below** [`ISO_LEVEL`] are considered "inside" the surface.
pub type CompiledFunction<'a> = dyn Fn(Point) -> Value + Sync + 'a;

/// Field value stored at corners that no sample supports.
///
/// Any cube touching such a corner is skipped by the triangulator.
pub const OUTSIDE: Value = Value::MAX;

/// Iso-level of the reconstructed surface.
pub const ISO_LEVEL: Value = 0.0;

/// A sample position paired with the unit normal of the surface it was taken from.
///
/// The normal points away from the solid, so the implicit function is positive
/// on the side it points to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedPoint {
    pub position: Point,
    pub normal: Vector,
}

impl OrientedPoint {
    /// Pairs `position` with `normal`, normalising the latter.
    ///
    /// Returns `None` for non-finite input or a zero-length normal, which cannot
    /// orient a tangent plane.
    pub fn new(position: Point, normal: Vector) -> Option<Self> {
        if !position.coords.iter().all(|c| c.is_finite()) {
            return None;
        }
        let length = normal.norm();
        if !length.is_finite() || length <= Value::EPSILON {
            return None;
        }
        Some(Self {
            position,
            normal: normal / length,
        })
    }

    /// Distance from `q` to the tangent plane, positive on the normal's side.
    #[inline]
    pub fn plane_distance(&self, q: &Point) -> Value {
        (q - self.position).dot(&self.normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_normals() {
        let p = Point::origin();
        assert!(OrientedPoint::new(p, Vector::zeros()).is_none());
        assert!(OrientedPoint::new(p, Vector::new(Value::NAN, 0.0, 1.0)).is_none());
        assert!(OrientedPoint::new(Point::new(Value::INFINITY, 0.0, 0.0), Vector::z()).is_none());
    }

    #[test]
    fn normalises_normal() {
        let sample = OrientedPoint::new(Point::origin(), Vector::new(0.0, 0.0, 4.0)).unwrap();
        assert_eq!(sample.normal, Vector::z());
        assert_eq!(sample.plane_distance(&Point::new(3.0, 1.0, -0.5)), -0.5);
    }
}
