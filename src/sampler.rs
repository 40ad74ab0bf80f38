use nalgebra::Matrix3;
use tracing::{debug, warn};

use crate::{
    config::ReconstructionConfig,
    error::{ReconstructionError, Result},
    field::ScalarField,
    march::NormalSource,
    spatial::SpatialGrid,
    types::{OUTSIDE, OrientedPoint, Point, Value, Vector},
    volume::VolumeDescriptor,
};

/// Total kernel weight below which a corner counts as unsupported.
const MIN_SUPPORT: Value = 1e-6;

/// Ratio between the second and first covariance eigenvalue below which a
/// cloud is treated as a line.
const FLATNESS_RATIO: Value = 1e-6;

/// Wendland C2 kernel on the normalised distance `s = d / r`.
///
/// Smooth, compactly supported: `ψ(0) = 1`, `ψ(s) = 0` for `s ≥ 1`.
#[inline]
pub fn wendland(s: Value) -> Value {
    if s >= 1.0 {
        return 0.0;
    }
    let s = s.max(0.0);
    let t = 1.0 - s;
    let t2 = t * t;
    t2 * t2 * (4.0 * s + 1.0)
}

/// Implicit surface defined by a set of oriented samples.
///
/// The value at `q` is the kernel-weighted mean signed distance from `q` to the
/// tangent planes of the samples within the influence radius:
///
/// ```text
/// f(q) = Σ ψ(|q − pᵢ| / r) · (q − pᵢ)·nᵢ  /  Σ ψ(|q − pᵢ| / r)
/// ```
///
/// This is Hoppe's distance-to-tangent-plane function in its implicit moving
/// least squares form. It is negative inside the surface (against the normals)
/// and positive outside.
#[derive(Debug, Clone)]
pub struct ImplicitSurface {
    samples: Vec<OrientedPoint>,
    positions: Vec<Point>,
    index: SpatialGrid,
    radius: Value,
    skipped: usize,
}

impl ImplicitSurface {
    /// Validates `points`/`normals` and indexes the usable samples.
    ///
    /// Samples with a non-finite position or a zero-length normal are dropped;
    /// the remaining normals are normalised.
    pub fn new(
        points: &[Point],
        normals: &[Vector],
        config: &ReconstructionConfig,
    ) -> Result<Self> {
        config.validate()?;
        if points.len() != normals.len() {
            return Err(ReconstructionError::MismatchedNormals {
                points: points.len(),
                normals: normals.len(),
            });
        }

        let samples: Vec<OrientedPoint> = points
            .iter()
            .zip(normals)
            .filter_map(|(p, n)| OrientedPoint::new(*p, *n))
            .collect();
        let skipped = points.len() - samples.len();
        if skipped > 0 {
            warn!(skipped, "ignoring samples with degenerate normals");
        }

        let positions: Vec<Point> = samples.iter().map(|s| s.position).collect();
        let radius = config.influence_radius();
        let index = SpatialGrid::new(&positions, radius);

        Ok(Self {
            samples,
            positions,
            index,
            radius,
            skipped,
        })
    }

    /// Number of samples that take part in the field.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of input samples dropped during validation.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn influence_radius(&self) -> Value {
        self.radius
    }

    pub fn samples(&self) -> &[OrientedPoint] {
        &self.samples
    }

    /// Whether the samples cannot describe a surface: fewer than three of them,
    /// or all of them on one line.
    pub fn is_degenerate(&self) -> bool {
        if self.samples.len() < 3 {
            return true;
        }

        let n = self.positions.len() as Value;
        let centroid = self
            .positions
            .iter()
            .fold(Vector::zeros(), |acc, p| acc + p.coords)
            / n;
        let covariance = self
            .positions
            .iter()
            .map(|p| {
                let d = p.coords - centroid;
                d * d.transpose()
            })
            .fold(Matrix3::zeros(), |acc, m| acc + m)
            / n;

        let mut eigenvalues: Vec<Value> = covariance
            .symmetric_eigen()
            .eigenvalues
            .iter()
            .map(|e| e.max(0.0))
            .collect();
        eigenvalues.sort_by(|a, b| b.total_cmp(a));

        eigenvalues[0] <= Value::EPSILON || eigenvalues[1] <= eigenvalues[0] * FLATNESS_RATIO
    }

    /// Evaluates the implicit function at `query`.
    ///
    /// Returns `None` when no sample lies within the influence radius.
    pub fn evaluate(&self, query: &Point) -> Option<Value> {
        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;
        self.index
            .for_each_within(&self.positions, query, self.radius, |i, distance| {
                let w = wendland(distance / self.radius);
                weight_sum += w;
                value_sum += w * self.samples[i].plane_distance(query);
            });

        (weight_sum > MIN_SUPPORT).then(|| value_sum / weight_sum)
    }

    /// Samples the implicit function on every corner of `volume`.
    ///
    /// Corners without support receive [`OUTSIDE`].
    pub fn sample(&self, volume: &VolumeDescriptor) -> ScalarField {
        let field =
            ScalarField::from_fn(*volume, &|p: Point| self.evaluate(&p).unwrap_or(OUTSIDE));
        debug!(
            corners = field.values.len(),
            supported = field.supported_corners(),
            "scalar field sampled"
        );
        field
    }
}

impl NormalSource for ImplicitSurface {
    /// Kernel-weighted mean of the sample normals around `point`.
    fn normal_at(&self, point: &Point) -> Option<Vector> {
        let mut sum = Vector::zeros();
        self.index
            .for_each_within(&self.positions, point, self.radius, |i, distance| {
                sum += self.samples[i].normal * wendland(distance / self.radius);
            });
        sum.try_normalize(MIN_SUPPORT)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn plane_patch(n: usize, spacing: Value) -> (Vec<Point>, Vec<Vector>) {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                points.push(Point::new(i as Value * spacing, j as Value * spacing, 0.0));
            }
        }
        let normals = vec![Vector::z(); points.len()];
        (points, normals)
    }

    #[test]
    fn kernel_is_compact_and_monotone() {
        assert_eq!(wendland(0.0), 1.0);
        assert_eq!(wendland(1.0), 0.0);
        assert_eq!(wendland(2.0), 0.0);
        let mut last = 1.0;
        for step in 1..10 {
            let w = wendland(step as Value / 10.0);
            assert!(w < last && w > 0.0);
            last = w;
        }
    }

    #[test]
    fn plane_distance_is_recovered() {
        let (points, normals) = plane_patch(20, 0.05);
        let surface =
            ImplicitSurface::new(&points, &normals, &ReconstructionConfig::default()).unwrap();

        let above = surface.evaluate(&Point::new(0.5, 0.5, 0.1)).unwrap();
        let below = surface.evaluate(&Point::new(0.5, 0.5, -0.07)).unwrap();
        assert_relative_eq!(above, 0.1, epsilon = 1e-5);
        assert_relative_eq!(below, -0.07, epsilon = 1e-5);
        assert!(surface.evaluate(&Point::new(0.5, 0.5, 0.3)).is_none());

        let normal = surface.normal_at(&Point::new(0.4, 0.4, 0.02)).unwrap();
        assert_relative_eq!(normal, Vector::z(), epsilon = 1e-6);
    }

    #[test]
    fn mismatched_normals_are_rejected() {
        let err = ImplicitSurface::new(
            &[Point::origin(), Point::new(1.0, 0.0, 0.0)],
            &[Vector::z()],
            &ReconstructionConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReconstructionError::MismatchedNormals { points: 2, normals: 1 }
        ));
    }

    #[test]
    fn degenerate_normals_are_skipped() {
        let (mut points, mut normals) = plane_patch(5, 0.05);
        points.push(Point::new(0.1, 0.1, 0.0));
        normals.push(Vector::zeros());
        points.push(Point::new(0.1, 0.1, 0.0));
        normals.push(Vector::new(Value::NAN, 0.0, 0.0));

        let surface =
            ImplicitSurface::new(&points, &normals, &ReconstructionConfig::default()).unwrap();
        assert_eq!(surface.len(), 25);
        assert_eq!(surface.skipped(), 2);
        let value = surface.evaluate(&Point::new(0.1, 0.1, 0.02)).unwrap();
        assert!(value.is_finite());
    }

    #[test]
    fn detects_degenerate_clouds() {
        let config = ReconstructionConfig::default();
        let single = ImplicitSurface::new(&[Point::origin()], &[Vector::z()], &config).unwrap();
        assert!(single.is_degenerate());

        let line: Vec<Point> = (0..50).map(|i| Point::new(i as Value * 0.02, 0.0, 0.0)).collect();
        let normals = vec![Vector::y(); line.len()];
        let collinear = ImplicitSurface::new(&line, &normals, &config).unwrap();
        assert!(collinear.is_degenerate());

        let (points, normals) = plane_patch(6, 0.05);
        let plane = ImplicitSurface::new(&points, &normals, &config).unwrap();
        assert!(!plane.is_degenerate());
    }
}
