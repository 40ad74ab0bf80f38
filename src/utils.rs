use crate::{
    interp::{find_t, interpolate_points},
    tables::{CORNER_POINT_INDICES, TRI_TABLE},
    types::{ISO_LEVEL, Point, Value, Vector},
    volume::VolumeDescriptor,
};

/// Returns the edge triples of the triangles for a marching cubes `state`.
///
/// `TRI_TABLE[state]` contains edge indices in groups of three, terminated by `-1`:
/// ```text
/// TRI_TABLE[state] = [e0, e1, e2,  e3, e4, e5,  -1, ...]
///                     \___tri0__/   \___tri1__/
/// ```
/// The table winds its triangles clockwise seen from outside, so each triple is
/// returned as `[e0, e2, e1]`.
#[inline]
pub fn triangle_edges_from_state(state: usize) -> impl Iterator<Item = [usize; 3]> {
    TRI_TABLE[state]
        .chunks_exact(3)
        .take_while(|tri| tri[0] != -1)
        .map(|tri| [tri[0] as usize, tri[2] as usize, tri[1] as usize])
}

/// Returns the 8 world-space corner positions of the voxel at grid index `(x, y, z)`.
///
/// Corners are ordered like
/// [`ScalarField::voxel_corner_indices`](crate::field::ScalarField::voxel_corner_indices).
#[inline]
pub fn get_corner_positions(x: usize, y: usize, z: usize, volume: &VolumeDescriptor) -> [Point; 8] {
    let origin = volume.corner_position(x, y, z);
    let scale = volume.resolution;

    [
        origin,
        origin + Vector::new(scale, 0.0, 0.0),
        origin + Vector::new(scale, scale, 0.0),
        origin + Vector::new(0.0, scale, 0.0),
        origin + Vector::new(0.0, 0.0, scale),
        origin + Vector::new(scale, 0.0, scale),
        origin + Vector::new(scale, scale, scale),
        origin + Vector::new(0.0, scale, scale),
    ]
}

/// Computes the marching cubes state bitmask for a voxel.
///
/// Each of the 8 corners maps to one bit. A bit is set when the corner's value
/// is **below** the iso-level (i.e. "inside" the surface):
///
/// ```text
/// corner index:  7  6  5  4  3  2  1  0
/// state bits:   [_][_][_][_][_][_][_][_]
///                                      ^-- corner 0 inside?
/// ```
#[inline]
pub fn get_state(eval_corners: &[Value; 8]) -> usize {
    eval_corners
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v < ISO_LEVEL)
        .fold(0, |state, (i, _)| state | (1 << i))
}

/// Corner pair of `edge`, ordered so the first corner has the smaller grid coordinate.
///
/// Interpolating from the lower corner keeps the crossing identical no matter
/// which of the (up to four) voxels sharing the edge computes it.
#[inline]
pub fn ordered_edge(edge: usize) -> (usize, usize) {
    let [a, b] = CORNER_POINT_INDICES[edge];
    let (a, b) = (a as usize, b as usize);
    match edge {
        // 2-3, 3-0, 6-7 and 7-4 run against their axis.
        2 | 3 | 6 | 7 => (b, a),
        _ => (a, b),
    }
}

/// Interpolates the crossing point along each edge of the voxel that crosses the iso-surface.
///
/// `edges_mask` is a 12-bit field from `EDGE_TABLE`; a set bit means that edge is active.
#[inline]
pub fn get_edge_crossings(
    edges_mask: u16,
    corner_positions: &[Point; 8],
    corner_values: &[Value; 8],
) -> [Option<Point>; 12] {
    let mut edge_points: [Option<Point>; 12] = [None; 12];

    for (i, slot) in edge_points.iter_mut().enumerate() {
        if (edges_mask & (1 << i)) == 0 {
            continue;
        }
        let (a, b) = ordered_edge(i);
        let t = find_t(corner_values[a], corner_values[b], ISO_LEVEL);
        *slot = Some(interpolate_points(&corner_positions[a], &corner_positions[b], t));
    }

    edge_points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_bits_follow_corner_signs() {
        assert_eq!(get_state(&[1.0; 8]), 0);
        assert_eq!(get_state(&[-1.0; 8]), 255);
        assert_eq!(get_state(&[-1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0]), 0b0000_0001);
        // Zero counts as outside.
        assert_eq!(get_state(&[0.0, 1.0, 1.0, -1.0, 1.0, 1.0, 1.0, -2.0]), 0b1000_1000);
    }

    #[test]
    fn ordered_edges_point_along_axes() {
        let volume = VolumeDescriptor {
            minimum: Point::origin(),
            maximum: Point::new(1.0, 1.0, 1.0),
            resolution: 1.0,
        };
        let corners = get_corner_positions(0, 0, 0, &volume);
        for edge in 0..12 {
            let (a, b) = ordered_edge(edge);
            let d = corners[b] - corners[a];
            assert_eq!(d.sum(), 1.0, "edge {edge}");
            assert_eq!(d.iter().filter(|&&c| c == 0.0).count(), 2, "edge {edge}");
        }
    }

    #[test]
    fn single_corner_state_yields_one_triangle() {
        let tris: Vec<_> = triangle_edges_from_state(1).collect();
        assert_eq!(tris, vec![[0, 3, 8]]);
        assert_eq!(triangle_edges_from_state(0).count(), 0);
        assert_eq!(triangle_edges_from_state(255).count(), 0);
    }
}
