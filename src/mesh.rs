use std::collections::HashMap;

use crate::{
    error::{ReconstructionError, Result},
    types::{Point, Value, Vector},
};

/// Indexed triangle mesh produced by the triangulator.
///
/// `positions` and `normals` are index-aligned; every entry of `triangles`
/// holds three indices into them, wound counter-clockwise when seen from the
/// side the normals point to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions: `[[x, y, z], ...]`
    pub positions: Vec<Point>,

    /// Unit vertex normals, one per position.
    pub normals: Vec<Vector>,

    /// Triangle index triples into `positions`: `[[v0, v1, v2], ...]`
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    /// Creates an empty mesh with no vertices, triangles, or normals.
    pub fn new_empty() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Returns true if the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Appends a vertex and returns its index.
    pub fn push_vertex(&mut self, position: Point, normal: Vector) -> u32 {
        self.positions.push(position);
        self.normals.push(normal);
        (self.positions.len() - 1) as u32
    }

    /// Adds a triangle defined by three vertex indices.
    ///
    /// Returns [`ReconstructionError::InvalidIndex`] if any index is out of bounds.
    pub fn triangle_from_verts(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        if self.positions.len() <= x.max(y.max(z)) as usize {
            return Err(ReconstructionError::InvalidIndex);
        }
        self.triangles.push([x, y, z]);
        Ok(())
    }

    /// Returns the three vertex positions of triangle `tri`.
    pub fn tri_coords(&self, tri: usize) -> [Point; 3] {
        self.triangles[tri].map(|v| self.positions[v as usize])
    }

    /// Computes the face normal for triangle `tri`.
    ///
    /// Returns the zero vector if the triangle is degenerate.
    pub fn tri_normal(&self, tri: usize) -> Vector {
        let [va, vb, vc] = self.tri_coords(tri);

        let v_a_b = vb - va;
        let v_b_c = vc - vb;

        let cross = v_a_b.cross(&v_b_c);

        let nrm = cross.norm();
        if nrm == 0.0 {
            Vector::zeros()
        } else {
            cross / nrm
        }
    }

    /// Checks the index and normal invariants.
    pub fn validate(&self) -> Result<()> {
        if self.normals.len() != self.positions.len() {
            return Err(ReconstructionError::InvalidIndex);
        }
        let count = self.positions.len();
        if self
            .triangles
            .iter()
            .flatten()
            .any(|&v| v as usize >= count)
        {
            return Err(ReconstructionError::InvalidIndex);
        }
        Ok(())
    }

    /// Sum of the triangle areas.
    pub fn surface_area(&self) -> Value {
        (0..self.triangles.len())
            .map(|tri| {
                let [a, b, c] = self.tri_coords(tri);
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }

    /// Number of undirected edges used by exactly one triangle.
    ///
    /// Zero for a closed surface.
    pub fn boundary_edge_count(&self) -> usize {
        let mut uses: HashMap<(u32, u32), usize> = HashMap::new();
        for &[a, b, c] in &self.triangles {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                *uses.entry((u.min(v), u.max(v))).or_default() += 1;
            }
        }
        uses.values().filter(|&&n| n == 1).count()
    }

    /// Iterates the corners of every triangle in order, three per triangle.
    ///
    /// This is the unshared layout that flat vertex buffers expect.
    pub fn triangle_vertices(&self) -> impl Iterator<Item = (Point, Vector)> + '_ {
        self.triangles
            .iter()
            .flatten()
            .map(|&v| (self.positions[v as usize], self.normals[v as usize]))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn quad() -> Mesh {
        let mut mesh = Mesh::new_empty();
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            mesh.push_vertex(Point::new(x, y, 0.0), Vector::z());
        }
        mesh.triangle_from_verts(0, 1, 2).unwrap();
        mesh.triangle_from_verts(0, 2, 3).unwrap();
        mesh
    }

    #[test]
    fn rejects_out_of_range_triangle() {
        let mut mesh = quad();
        assert!(matches!(
            mesh.triangle_from_verts(0, 1, 4),
            Err(ReconstructionError::InvalidIndex)
        ));
        mesh.triangles.push([0, 9, 1]);
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn quad_geometry() {
        let mesh = quad();
        mesh.validate().unwrap();
        assert_relative_eq!(mesh.tri_normal(0), Vector::z());
        assert_relative_eq!(mesh.surface_area(), 1.0);
        assert_eq!(mesh.boundary_edge_count(), 4);
        assert_eq!(mesh.triangle_vertices().count(), 6);
    }

    #[test]
    fn degenerate_triangle_has_zero_normal() {
        let mut mesh = Mesh::new_empty();
        for _ in 0..3 {
            mesh.push_vertex(Point::origin(), Vector::x());
        }
        mesh.triangle_from_verts(0, 1, 2).unwrap();
        assert_eq!(mesh.tri_normal(0), Vector::zeros());
    }
}
