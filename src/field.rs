use ndarray::{Array3, Zip};

use crate::{
    march::NormalSource,
    types::{CompiledFunction, ISO_LEVEL, OUTSIDE, Point, Value, Vector},
    volume::VolumeDescriptor,
};

/// Signed distance samples on the corners of a [`VolumeDescriptor`] grid.
///
/// The grid has `(size_x + 1) × (size_y + 1) × (size_z + 1)` corners
/// and `size_x × size_y × size_z` voxels.
///
/// Values are stored as `values[[z, y, x]]`. Negative values are inside the
/// surface; corners without support hold [`OUTSIDE`].
#[derive(Debug, Clone)]
pub struct ScalarField {
    pub volume: VolumeDescriptor,
    pub values: Array3<Value>,
}

impl ScalarField {
    /// Creates a field over `volume` with every corner set to [`OUTSIDE`].
    pub fn new(volume: VolumeDescriptor) -> Self {
        let [nx, ny, nz] = volume.dimensions();
        Self {
            volume,
            values: Array3::from_elem((nz, ny, nx), OUTSIDE),
        }
    }

    /// Fills a new field by evaluating `function` at every corner position.
    ///
    /// Corners are evaluated in parallel; each one is written exactly once.
    pub fn from_fn(volume: VolumeDescriptor, function: &CompiledFunction<'_>) -> Self {
        let mut field = Self::new(volume);
        field.fill(function);
        field
    }

    /// Overwrites every corner with `function` evaluated at its world-space position.
    pub fn fill(&mut self, function: &CompiledFunction<'_>) {
        let volume = self.volume;
        Zip::indexed(&mut self.values).par_for_each(|(z, y, x), value| {
            *value = function(volume.corner_position(x, y, z));
        });
    }

    /// Number of voxels along each axis.
    pub fn cell_counts(&self) -> [usize; 3] {
        let (nz, ny, nx) = self.values.dim();
        [nx, ny, nz].map(|n| n.saturating_sub(1))
    }

    /// Returns the scalar field value at corner `(x, y, z)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Value {
        self.values[[z, y, x]]
    }

    /// Sets the scalar field value at corner `(x, y, z)`.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, v: Value) {
        self.values[[z, y, x]] = v
    }

    /// Linear index of corner `(x, y, z)`, unique across the grid.
    #[inline]
    pub fn corner_id(&self, x: usize, y: usize, z: usize) -> usize {
        let (_, ny, nx) = self.values.dim();
        (z * ny + y) * nx + x
    }

    /// Returns the 8 corner indices `[x, y, z]` of the voxel at `(x, y, z)`.
    ///
    /// Corners are ordered to match the standard marching cubes convention:
    ///
    /// ```text
    ///     7----6          Y
    ///    /|   /|          |
    ///   3----2 |          *-- X
    ///   | 4--|-5         /
    ///   |/   |/         Z
    ///   0----1
    ///
    ///  0 = (x,   y,   z  )    4 = (x,   y,   z+1)
    ///  1 = (x+1, y,   z  )    5 = (x+1, y,   z+1)
    ///  2 = (x+1, y+1, z  )    6 = (x+1, y+1, z+1)
    ///  3 = (x,   y+1, z  )    7 = (x,   y+1, z+1)
    /// ```
    #[inline]
    pub fn voxel_corner_indices(&self, x: usize, y: usize, z: usize) -> [[usize; 3]; 8] {
        [
            [x, y, z],
            [x + 1, y, z],
            [x + 1, y + 1, z],
            [x, y + 1, z],
            [x, y, z + 1],
            [x + 1, y, z + 1],
            [x + 1, y + 1, z + 1],
            [x, y + 1, z + 1],
        ]
    }

    /// Returns the 8 values of the voxel at `(x, y, z)` in corner order.
    #[inline]
    pub fn voxel_values(&self, x: usize, y: usize, z: usize) -> [Value; 8] {
        self.voxel_corner_indices(x, y, z)
            .map(|[cx, cy, cz]| self.get(cx, cy, cz))
    }

    /// Whether some supported corner lies below the iso-level and another at or above it.
    pub fn has_crossings(&self) -> bool {
        let mut inside = false;
        let mut outside = false;
        for &v in self.values.iter().filter(|&&v| v != OUTSIDE) {
            if v < ISO_LEVEL {
                inside = true;
            } else {
                outside = true;
            }
            if inside && outside {
                return true;
            }
        }
        false
    }

    /// Number of corners holding a real sample rather than [`OUTSIDE`].
    pub fn supported_corners(&self) -> usize {
        self.values.iter().filter(|&&v| v != OUTSIDE).count()
    }
}

impl NormalSource for ScalarField {
    /// Gradient of the trilinear interpolant of the voxel containing `point`.
    ///
    /// Returns `None` when that voxel touches an unsupported corner or the
    /// gradient vanishes.
    fn normal_at(&self, point: &Point) -> Option<Vector> {
        let cells = self.cell_counts();
        if cells.contains(&0) {
            return None;
        }
        let local = (point - self.volume.minimum) / self.volume.resolution;
        if !local.iter().all(|c| c.is_finite()) {
            return None;
        }

        let mut base = [0_usize; 3];
        let mut frac = [0.0 as Value; 3];
        for axis in 0..3 {
            let cell = (local[axis].floor().max(0.0) as usize).min(cells[axis] - 1);
            base[axis] = cell;
            frac[axis] = (local[axis] - cell as Value).clamp(0.0, 1.0);
        }

        let c = self.voxel_values(base[0], base[1], base[2]);
        if c.contains(&OUTSIDE) {
            return None;
        }
        let [fx, fy, fz] = frac;
        let (gx, gy, gz) = (1.0 - fx, 1.0 - fy, 1.0 - fz);

        let dx = gy * gz * (c[1] - c[0])
            + fy * gz * (c[2] - c[3])
            + gy * fz * (c[5] - c[4])
            + fy * fz * (c[6] - c[7]);
        let dy = gx * gz * (c[3] - c[0])
            + fx * gz * (c[2] - c[1])
            + gx * fz * (c[7] - c[4])
            + fx * fz * (c[6] - c[5]);
        let dz = gx * gy * (c[4] - c[0])
            + fx * gy * (c[5] - c[1])
            + fx * fy * (c[6] - c[2])
            + gx * fy * (c[7] - c[3]);

        Vector::new(dx, dy, dz)
            .try_normalize(Value::EPSILON)
            .filter(|n| n.iter().all(|c| c.is_finite()))
    }
}
