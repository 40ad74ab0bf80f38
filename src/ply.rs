//! ASCII PLY output for reconstructed meshes.
//!
//! Vertices carry a homogeneous `w` coordinate (always `1`) followed by the
//! normal; faces are written as `3 i0 i1 i2`.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use tracing::debug;

use crate::{error::Result, mesh::Mesh};

const VERTEX_PROPERTIES: [&str; 7] = ["x", "y", "z", "w", "nx", "ny", "nz"];

/// Writes the PLY header announcing `vertices` vertices and `faces` faces.
pub fn write_header<W: Write>(out: &mut W, vertices: usize, faces: usize) -> Result<()> {
    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "element vertex {vertices}")?;
    for property in VERTEX_PROPERTIES {
        writeln!(out, "property float {property}")?;
    }
    writeln!(out, "element face {faces}")?;
    writeln!(out, "property list int int vertex_indices")?;
    writeln!(out, "end_header")?;
    Ok(())
}

/// Serialises `mesh` to `out`.
pub fn write_mesh<W: Write>(mesh: &Mesh, out: &mut W) -> Result<()> {
    write_header(out, mesh.vertex_count(), mesh.triangle_count())?;

    for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
        writeln!(out, "{} {} {} 1 {} {} {}", p.x, p.y, p.z, n.x, n.y, n.z)?;
    }
    for [a, b, c] in &mesh.triangles {
        writeln!(out, "3 {a} {b} {c}")?;
    }
    Ok(())
}

/// Writes `mesh` to the file at `path`, creating or truncating it.
pub fn save_mesh(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    write_mesh(mesh, &mut out)?;
    out.flush()?;
    debug!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        faces = mesh.triangle_count(),
        "mesh written"
    );
    Ok(())
}
