use tracing::debug;

use crate::{
    mesh::Mesh,
    types::{Point, Value, Vector},
};

/// Color given to every reconstructed mesh vertex.
pub const MESH_VERTEX_COLOR: [Value; 3] = [0.7, 0.7, 0.7];

/// One stored vertex: position, color and normal together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point,
    pub color: [Value; 3],
    pub normal: Vector,
}

impl Vertex {
    pub fn new(position: Point, color: [Value; 3], normal: Vector) -> Self {
        Self {
            position,
            color,
            normal,
        }
    }
}

/// A captured point cloud together with the mesh reconstructed from it.
///
/// Point-cloud and mesh storage each keep parallel position/color/normal
/// arrays plus a combined [`Vertex`] list, in the layout flat draw calls use.
/// Mesh storage is unshared: three entries per triangle.
#[derive(Debug, Clone, Default)]
pub struct PointCloudObject {
    pub id: u32,
    pub timestamp: u64,
    /// Name of the image used to texture the mesh, if any.
    pub texture: Option<String>,

    positions: Vec<Point>,
    colors: Vec<[Value; 3]>,
    normals: Vec<Vector>,
    vertices: Vec<Vertex>,

    mesh: Option<Mesh>,
    mesh_positions: Vec<Point>,
    mesh_colors: Vec<[Value; 3]>,
    mesh_normals: Vec<Vector>,
    mesh_vertices: Vec<Vertex>,
}

impl PointCloudObject {
    pub fn new(id: u32, timestamp: u64) -> Self {
        Self {
            id,
            timestamp,
            ..Default::default()
        }
    }

    /// Builds an object from parallel position and normal arrays, colored white.
    ///
    /// Extra entries of the longer array are ignored.
    pub fn from_points(id: u32, positions: &[Point], normals: &[Vector]) -> Self {
        let mut object = Self::new(id, 0);
        for (position, normal) in positions.iter().zip(normals) {
            object.add_vertex(Vertex::new(*position, [1.0; 3], *normal));
        }
        object
    }

    pub fn add_vertex(&mut self, vertex: Vertex) {
        self.positions.push(vertex.position);
        self.colors.push(vertex.color);
        self.normals.push(vertex.normal);
        self.vertices.push(vertex);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    pub fn colors(&self) -> &[[Value; 3]] {
        &self.colors
    }

    pub fn normals(&self) -> &[Vector] {
        &self.normals
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn add_mesh_vertex(&mut self, vertex: Vertex) {
        self.mesh_positions.push(vertex.position);
        self.mesh_colors.push(vertex.color);
        self.mesh_normals.push(vertex.normal);
        self.mesh_vertices.push(vertex);
    }

    pub fn mesh_vertex_count(&self) -> usize {
        self.mesh_vertices.len()
    }

    pub fn mesh_positions(&self) -> &[Point] {
        &self.mesh_positions
    }

    pub fn mesh_colors(&self) -> &[[Value; 3]] {
        &self.mesh_colors
    }

    pub fn mesh_normals(&self) -> &[Vector] {
        &self.mesh_normals
    }

    pub fn mesh_vertices(&self) -> &[Vertex] {
        &self.mesh_vertices
    }

    /// The indexed mesh attached by the last reconstruction, if any.
    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    /// Drops the attached mesh and all mesh vertex storage.
    pub fn clear_mesh(&mut self) {
        self.mesh = None;
        self.mesh_positions.clear();
        self.mesh_colors.clear();
        self.mesh_normals.clear();
        self.mesh_vertices.clear();
    }

    /// Adopts `mesh`, replacing whatever a previous pass attached.
    ///
    /// Each triangle corner becomes its own mesh vertex, so afterwards
    /// `mesh_vertex_count() == 3 × mesh.triangle_count()`. Point-cloud storage
    /// is left untouched.
    pub fn assemble_mesh(&mut self, mesh: Mesh) {
        self.clear_mesh();

        let count = mesh.triangle_count() * 3;
        self.mesh_positions.reserve(count);
        self.mesh_colors.reserve(count);
        self.mesh_normals.reserve(count);
        self.mesh_vertices.reserve(count);

        for (position, normal) in mesh.triangle_vertices() {
            self.add_mesh_vertex(Vertex::new(position, MESH_VERTEX_COLOR, normal));
        }

        debug!(
            object = self.id,
            mesh_vertices = self.mesh_vertex_count(),
            "mesh assembled"
        );
        self.mesh = Some(mesh);
    }
}

/// Attaches a copy of `mesh` to `object`. See [`PointCloudObject::assemble_mesh`].
pub fn assemble(mesh: &Mesh, object: &mut PointCloudObject) {
    object.assemble_mesh(mesh.clone());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> Mesh {
        let mut mesh = Mesh::new_empty();
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            mesh.push_vertex(Point::new(x, y, 0.0), Vector::z());
        }
        mesh.triangle_from_verts(0, 1, 2).unwrap();
        mesh.triangle_from_verts(0, 2, 3).unwrap();
        mesh
    }

    #[test]
    fn assembly_flattens_triangles() {
        let mut object = PointCloudObject::from_points(
            7,
            &[Point::origin(), Point::new(1.0, 0.0, 0.0)],
            &[Vector::z(), Vector::z()],
        );
        let mesh = two_triangles();
        assemble(&mesh, &mut object);

        assert_eq!(object.mesh_vertex_count(), 6);
        assert_eq!(object.mesh_positions().len(), 6);
        assert_eq!(object.mesh_normals().len(), 6);
        assert_eq!(object.mesh_positions()[3], mesh.positions[0]);
        assert_eq!(object.mesh_positions()[5], mesh.positions[3]);
        assert!(object.mesh_colors().iter().all(|c| *c == MESH_VERTEX_COLOR));
        assert_eq!(object.mesh(), Some(&mesh));

        // Point-cloud storage is untouched.
        assert_eq!(object.vertex_count(), 2);
        assert_eq!(object.positions()[1], Point::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn reassembly_replaces_previous_mesh() {
        let mut object = PointCloudObject::new(1, 42);
        object.assemble_mesh(two_triangles());
        object.assemble_mesh(two_triangles());
        assert_eq!(object.mesh_vertex_count(), 6);

        object.assemble_mesh(Mesh::new_empty());
        assert_eq!(object.mesh_vertex_count(), 0);
        assert!(object.mesh().is_some_and(Mesh::is_empty));

        object.clear_mesh();
        assert!(object.mesh().is_none());
    }
}
