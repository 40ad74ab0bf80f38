use tracing::debug;

use crate::{
    config::ReconstructionConfig,
    error::{ReconstructionError, Result},
    types::{Point, Value, Vector},
};

/// Axis-aligned sampling volume around a point cloud.
///
/// The grid has `cells + 1` corners per axis, the first of which sits on
/// [`minimum`](VolumeDescriptor::minimum). Corner `(i, j, k)` lives at
/// `minimum + resolution × (i, j, k)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeDescriptor {
    pub minimum: Point,
    pub maximum: Point,
    /// Voxel edge length.
    pub resolution: Value,
}

impl VolumeDescriptor {
    /// Builds the padded bounding volume of `points`.
    ///
    /// The raw bounds are found in a single pass and then pushed outwards by
    /// [`ReconstructionConfig::margin`] on every side, so every sample keeps its
    /// full influence radius inside the grid.
    pub fn enclosing(points: &[Point], config: &ReconstructionConfig) -> Result<Self> {
        config.validate()?;

        let first = points.first().ok_or(ReconstructionError::EmptyPointCloud)?;
        let mut minimum = *first;
        let mut maximum = *first;

        for (index, point) in points.iter().enumerate() {
            if !point.coords.iter().all(|c| c.is_finite()) {
                return Err(ReconstructionError::NonFinitePoint { index });
            }
            minimum = minimum.inf(point);
            maximum = maximum.sup(point);
        }

        let offset = Vector::repeat(config.margin());
        let volume = Self {
            minimum: minimum - offset,
            maximum: maximum + offset,
            resolution: config.resolution,
        };

        let corners = volume.corner_count();
        if corners > config.max_grid_corners {
            return Err(ReconstructionError::GridTooLarge {
                corners,
                limit: config.max_grid_corners,
            });
        }

        debug!(
            minimum = ?volume.minimum,
            maximum = ?volume.maximum,
            resolution = volume.resolution,
            corners,
            "volume bounds computed"
        );
        Ok(volume)
    }

    /// Number of voxels along each axis.
    pub fn cell_counts(&self) -> [usize; 3] {
        let extent = self.maximum - self.minimum;
        [0, 1, 2].map(|axis| (extent[axis] / self.resolution).ceil().max(0.0) as usize)
    }

    /// Number of grid corners along each axis, saturating on overflow.
    pub fn dimensions(&self) -> [usize; 3] {
        self.cell_counts().map(|cells| cells.saturating_add(1))
    }

    /// Total number of grid corners, saturating on overflow.
    pub fn corner_count(&self) -> usize {
        self.dimensions()
            .iter()
            .fold(1_usize, |acc, &n| acc.saturating_mul(n))
    }

    /// World-space position of corner `(i, j, k)`.
    #[inline]
    pub fn corner_position(&self, i: usize, j: usize, k: usize) -> Point {
        self.minimum + Vector::new(i as Value, j as Value, k as Value) * self.resolution
    }

    pub fn contains(&self, point: &Point) -> bool {
        (0..3).all(|axis| self.minimum[axis] <= point[axis] && point[axis] <= self.maximum[axis])
    }
}
