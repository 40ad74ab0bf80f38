use crate::types::{Point, Value, Vector};

/// Upper bound on buckets per sample before the bucket size is coarsened.
const MAX_CELLS_PER_POINT: usize = 8;

/// Uniform bucket grid over a set of points.
///
/// Points are counting-sorted into cubic buckets; `cell_start[c]..cell_start[c + 1]`
/// is the slice of `entries` holding the indices that fall into bucket `c`.
/// Within a bucket indices keep their input order, so neighbour iteration is
/// deterministic.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    origin: Point,
    cell_size: Value,
    dims: [usize; 3],
    cell_start: Vec<usize>,
    entries: Vec<u32>,
}

impl SpatialGrid {
    /// Buckets `points` with (at least) `cell_size` wide cells.
    ///
    /// Every point must be finite.
    pub fn new(points: &[Point], cell_size: Value) -> Self {
        let Some(first) = points.first() else {
            return Self {
                origin: Point::origin(),
                cell_size,
                dims: [0; 3],
                cell_start: vec![0],
                entries: Vec::new(),
            };
        };

        let (mut lo, mut hi) = (*first, *first);
        for p in points {
            lo = lo.inf(p);
            hi = hi.sup(p);
        }

        let budget = points.len().saturating_mul(MAX_CELLS_PER_POINT).max(1);
        let mut cell_size = cell_size;
        let mut dims = bucket_dims(&(hi - lo), cell_size);
        while dims.iter().fold(1_usize, |a, &n| a.saturating_mul(n)) > budget {
            cell_size *= 2.0;
            dims = bucket_dims(&(hi - lo), cell_size);
        }

        let mut grid = Self {
            origin: lo,
            cell_size,
            dims,
            cell_start: Vec::new(),
            entries: Vec::new(),
        };

        let cells: Vec<usize> = points.iter().map(|p| grid.cell_of(p)).collect();
        let mut counts = vec![0_usize; dims[0] * dims[1] * dims[2] + 1];
        for &c in &cells {
            counts[c + 1] += 1;
        }
        for c in 1..counts.len() {
            counts[c] += counts[c - 1];
        }

        let mut cursor = counts.clone();
        let mut entries = vec![0_u32; points.len()];
        for (index, &c) in cells.iter().enumerate() {
            entries[cursor[c]] = index as u32;
            cursor[c] += 1;
        }

        grid.cell_start = counts;
        grid.entries = entries;
        grid
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Calls `f(index, distance)` for every point strictly closer than `radius` to `query`.
    pub fn for_each_within<F>(&self, points: &[Point], query: &Point, radius: Value, mut f: F)
    where
        F: FnMut(usize, Value),
    {
        if self.is_empty() {
            return;
        }
        let radius_sq = radius * radius;
        let Some(lo) = self.clamped_cell(&(query - Vector::repeat(radius))) else {
            return;
        };
        let Some(hi) = self.clamped_cell(&(query + Vector::repeat(radius))) else {
            return;
        };

        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    let cell = self.linear(x, y, z);
                    for &index in &self.entries[self.cell_start[cell]..self.cell_start[cell + 1]] {
                        let index = index as usize;
                        let distance_sq = (points[index] - query).norm_squared();
                        if distance_sq < radius_sq {
                            f(index, distance_sq.sqrt());
                        }
                    }
                }
            }
        }
    }

    #[inline]
    fn linear(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.dims[1] + y) * self.dims[0] + x
    }

    fn cell_of(&self, p: &Point) -> usize {
        let local = (p - self.origin) / self.cell_size;
        let [x, y, z] = [0, 1, 2].map(|a| (local[a].max(0.0) as usize).min(self.dims[a] - 1));
        self.linear(x, y, z)
    }

    /// Bucket coordinates of `p`, clamped onto the grid.
    ///
    /// Returns `None` when `p` has a non-finite coordinate.
    fn clamped_cell(&self, p: &Point) -> Option<[usize; 3]> {
        let local = (p - self.origin) / self.cell_size;
        if !local.iter().all(|c| c.is_finite()) {
            return None;
        }
        Some([0, 1, 2].map(|a| (local[a].floor().max(0.0) as usize).min(self.dims[a] - 1)))
    }
}

fn bucket_dims(extent: &Vector, cell_size: Value) -> [usize; 3] {
    [0, 1, 2].map(|a| ((extent[a] / cell_size).floor() as usize).saturating_add(1))
}
