use std::collections::HashMap;

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::debug;

use crate::{
    field::ScalarField,
    mesh::Mesh,
    tables::EDGE_TABLE,
    types::{ISO_LEVEL, OUTSIDE, Point, Value, Vector},
    utils::{
        get_corner_positions, get_edge_crossings, get_state, ordered_edge,
        triangle_edges_from_state,
    },
};

/// Supplies the unit surface normal at a point on the reconstructed surface.
pub trait NormalSource {
    /// Returns `None` when no reliable normal exists at `point`.
    fn normal_at(&self, point: &Point) -> Option<Vector>;
}

/// Triangles and vertices produced by one Z slab, indexed locally.
struct SlabMesh {
    keys: Vec<u64>,
    positions: Vec<Point>,
    normals: Vec<Vector>,
    triangles: Vec<[u32; 3]>,
}

/// Runs the marching cubes algorithm over `field`.
///
/// Work is parallelised over Z slabs using Rayon. Crossings are shared between
/// neighbouring voxels through a key on the grid edge they lie on, so the
/// result is an indexed mesh. Slabs are merged in order, which keeps the
/// output identical from run to run.
///
/// ```text
/// Per voxel:
/// 1. voxel_values              →  8 scalar values (skip if any is OUTSIDE)
/// 2. get_state                 →  256-entry lookup key
/// 3. EDGE_TABLE[state]         →  bitmask of intersected edges
/// 4. get_edge_crossings        →  up to 12 interpolated points
/// 5. triangle_edges_from_state →  triangles from TRI_TABLE
/// ```
pub fn triangulate<N>(field: &ScalarField, normals: &N) -> Mesh
where
    N: NormalSource + Sync + ?Sized,
{
    let [size_x, size_y, size_z] = field.cell_counts();
    if size_x == 0 || size_y == 0 || size_z == 0 {
        return Mesh::new_empty();
    }

    let slabs: Vec<SlabMesh> = (0..size_z)
        .into_par_iter()
        .map(|z| march_slab(field, normals, z, size_x, size_y))
        .collect();

    // Merge per-Z slabs, welding the vertices on the planes they share.
    let mut mesh = Mesh::new_empty();
    let mut welded: HashMap<u64, u32> = HashMap::new();
    for slab in slabs {
        let remap: Vec<u32> = slab
            .keys
            .iter()
            .zip(slab.positions.iter().zip(&slab.normals))
            .map(|(key, (position, normal))| {
                *welded
                    .entry(*key)
                    .or_insert_with(|| mesh.push_vertex(*position, *normal))
            })
            .collect();
        mesh.triangles.extend(
            slab.triangles
                .iter()
                .map(|tri| tri.map(|local| remap[local as usize])),
        );
    }

    debug!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "grid triangulated"
    );
    mesh
}

fn march_slab<N>(
    field: &ScalarField,
    normals: &N,
    z: usize,
    size_x: usize,
    size_y: usize,
) -> SlabMesh
where
    N: NormalSource + ?Sized,
{
    let mut slab = SlabMesh {
        keys: Vec::new(),
        positions: Vec::new(),
        normals: Vec::new(),
        triangles: Vec::new(),
    };
    let mut local: HashMap<u64, u32> = HashMap::new();

    for y in 0..size_y {
        for x in 0..size_x {
            let eval_corners = field.voxel_values(x, y, z);
            if eval_corners.contains(&OUTSIDE) {
                continue;
            }

            let state = get_state(&eval_corners);
            let edges_mask = EDGE_TABLE[state];
            if edges_mask == 0 {
                continue;
            }

            let corner_positions = get_corner_positions(x, y, z, &field.volume);
            let crossings = get_edge_crossings(edges_mask, &corner_positions, &eval_corners);
            let corner_indices = field.voxel_corner_indices(x, y, z);

            let mut vertex_of_edge = [u32::MAX; 12];
            for (edge, crossing) in crossings.iter().enumerate() {
                let Some(position) = crossing else {
                    continue;
                };
                let (a, b) = ordered_edge(edge);
                let [ax, ay, az] = corner_indices[a];
                let key = edge_key(
                    field.corner_id(ax, ay, az),
                    &corner_indices[a],
                    &corner_indices[b],
                );

                vertex_of_edge[edge] = *local.entry(key).or_insert_with(|| {
                    let normal = normals
                        .normal_at(position)
                        .filter(|n| n.iter().all(|c| c.is_finite()))
                        .unwrap_or_else(|| {
                            edge_direction(
                                &corner_positions[a],
                                &corner_positions[b],
                                eval_corners[a],
                            )
                        });
                    slab.keys.push(key);
                    slab.positions.push(*position);
                    slab.normals.push(normal);
                    (slab.positions.len() - 1) as u32
                });
            }

            slab.triangles.extend(
                triangle_edges_from_state(state).map(|edges| edges.map(|e| vertex_of_edge[e])),
            );
        }
    }

    slab
}

/// Unique key of the grid edge running from corner `lower` (linear index `corner_id`) to `upper`.
#[inline]
fn edge_key(corner_id: usize, lower: &[usize; 3], upper: &[usize; 3]) -> u64 {
    let axis = (0..3).find(|&axis| lower[axis] != upper[axis]).unwrap_or(0);
    corner_id as u64 * 3 + axis as u64
}

/// Unit vector along the edge, pointing from the inside corner to the outside one.
#[inline]
fn edge_direction(lower: &Point, upper: &Point, lower_value: Value) -> Vector {
    let along = (upper - lower).normalize();
    if lower_value < ISO_LEVEL { along } else { -along }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::volume::VolumeDescriptor;

    struct NoNormals;

    impl NormalSource for NoNormals {
        fn normal_at(&self, _point: &Point) -> Option<Vector> {
            None
        }
    }

    fn single_voxel(values: [f32; 8]) -> ScalarField {
        let volume = VolumeDescriptor {
            minimum: Point::origin(),
            maximum: Point::new(1.0, 1.0, 1.0),
            resolution: 1.0,
        };
        let mut field = ScalarField::new(volume);
        for (corner, [x, y, z]) in field.voxel_corner_indices(0, 0, 0).into_iter().enumerate() {
            field.set(x, y, z, values[corner]);
        }
        field
    }

    #[test]
    fn all_outside_emits_nothing() {
        let mesh = triangulate(&single_voxel([1.0; 8]), &NoNormals);
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn one_inside_corner_emits_one_triangle() {
        let field = single_voxel([-1.0, 3.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let mesh = triangulate(&field, &NoNormals);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);

        // Edge 0-1: t = -1 / (-1 - 3) = 0.25, edges 0-3 and 0-4: t = 0.5.
        let mut positions = mesh.positions.clone();
        positions.sort_by(|a, b| a.coords.as_slice().partial_cmp(b.coords.as_slice()).unwrap());
        assert_relative_eq!(positions[0], Point::new(0.0, 0.0, 0.5));
        assert_relative_eq!(positions[1], Point::new(0.0, 0.5, 0.0));
        assert_relative_eq!(positions[2], Point::new(0.25, 0.0, 0.0));

        // Counter-clockwise seen from outside, i.e. facing away from corner 0.
        let face = mesh.tri_normal(0);
        assert!(face.dot(&Vector::new(1.0, 1.0, 1.0)) > 0.0);
        for normal in &mesh.normals {
            assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn unsupported_corner_suppresses_voxel() {
        let field = single_voxel([-1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, OUTSIDE]);
        assert!(triangulate(&field, &NoNormals).is_empty());
    }

    #[test]
    fn thin_grid_is_empty_not_an_error() {
        let volume = VolumeDescriptor {
            minimum: Point::origin(),
            maximum: Point::new(2.0, 2.0, 0.0),
            resolution: 1.0,
        };
        let field = ScalarField::from_fn(volume, &|p: Point| p.x - 1.0);
        assert!(triangulate(&field, &NoNormals).is_empty());
    }

    #[test]
    fn analytic_sphere_is_closed_and_oriented() {
        let volume = VolumeDescriptor {
            minimum: Point::new(-1.0, -1.0, -1.0),
            maximum: Point::new(1.0, 1.0, 1.0),
            resolution: 0.1,
        };
        let field = ScalarField::from_fn(volume, &|p: Point| p.coords.norm() - 0.6);
        let mesh = triangulate(&field, &field);

        assert!(mesh.triangle_count() > 100);
        mesh.validate().unwrap();
        assert_eq!(mesh.boundary_edge_count(), 0);
        for (position, normal) in mesh.positions.iter().zip(&mesh.normals) {
            assert!((position.coords.norm() - 0.6).abs() < 0.1);
            assert!(normal.dot(&position.coords.normalize()) > 0.8);
        }
        for tri in 0..mesh.triangle_count() {
            let [a, b, c] = mesh.tri_coords(tri);
            let cross = (b - a).cross(&(c - a));
            if cross.norm() > 1e-6 {
                let centroid = (a.coords + b.coords + c.coords) / 3.0;
                assert!(cross.dot(&centroid) > 0.0, "triangle {tri} faces inwards");
            }
        }
    }
}
