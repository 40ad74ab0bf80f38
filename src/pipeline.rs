use std::{path::PathBuf, time::Instant};

use tracing::{debug, info, info_span, warn};

use crate::{
    config::ReconstructionConfig,
    error::{ReconstructionError, Result},
    field::ScalarField,
    march::triangulate,
    mesh::Mesh,
    object::PointCloudObject,
    ply::save_mesh,
    sampler::ImplicitSurface,
    types::{Point, Vector},
    volume::VolumeDescriptor,
};

/// Receives the number of objects finished so far after each one completes.
pub trait ProgressSink {
    fn progress(&mut self, completed: usize);
}

impl ProgressSink for () {
    fn progress(&mut self, _completed: usize) {}
}

impl<F: FnMut(usize)> ProgressSink for F {
    fn progress(&mut self, completed: usize) {
        self(completed)
    }
}

/// Reconstructs a mesh from `points` and their index-aligned `normals`.
///
/// ```text
/// points ─► VolumeDescriptor::enclosing ─► ImplicitSurface::sample ─► ScalarField
///                                                                       │
///                                 Mesh ◄── triangulate ◄────────────────┘
/// ```
///
/// Input validation failures are returned as errors. A field without any zero
/// crossing, or a cloud too degenerate to span a surface, yields an empty mesh.
pub fn reconstruct(
    points: &[Point],
    normals: &[Vector],
    config: &ReconstructionConfig,
) -> Result<Mesh> {
    let span = info_span!("reconstruct", points = points.len());
    let _enter = span.enter();
    let start = Instant::now();

    let volume = VolumeDescriptor::enclosing(points, config)?;
    let surface = ImplicitSurface::new(points, normals, config)?;

    let field = match sample_checked(&surface, &volume) {
        Ok(field) => field,
        Err(ReconstructionError::DegenerateGeometry) => {
            warn!("no surface crossings found, producing an empty mesh");
            return Ok(Mesh::new_empty());
        }
        Err(e) => return Err(e),
    };

    let mesh = triangulate(&field, &surface);
    info!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        elapsed = ?start.elapsed(),
        "reconstruction finished"
    );
    Ok(mesh)
}

/// Samples `surface` over `volume`, reporting [`ReconstructionError::DegenerateGeometry`]
/// when the resulting field cannot contain a surface.
pub fn sample_checked(surface: &ImplicitSurface, volume: &VolumeDescriptor) -> Result<ScalarField> {
    if surface.is_degenerate() {
        debug!(samples = surface.len(), "point cloud does not span a surface");
        return Err(ReconstructionError::DegenerateGeometry);
    }
    let field = surface.sample(volume);
    if !field.has_crossings() {
        return Err(ReconstructionError::DegenerateGeometry);
    }
    Ok(field)
}

/// Settings of a batch run over several objects.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub config: ReconstructionConfig,
    /// When set, every mesh is also saved as `cam0_<index>.ply` in this directory.
    pub output_dir: Option<PathBuf>,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Objects that received a mesh.
    pub reconstructed: usize,
    /// Index and error of every object that was skipped.
    pub failures: Vec<(usize, ReconstructionError)>,
}

/// Reconstructs every object in turn and attaches the resulting meshes.
///
/// A failing object is logged and skipped; the rest of the batch still runs.
/// `progress` is called once per object, failed or not.
pub fn reconstruct_objects<P>(
    objects: &mut [PointCloudObject],
    options: &BatchOptions,
    mut progress: P,
) -> BatchReport
where
    P: ProgressSink,
{
    let mut report = BatchReport::default();

    for (index, object) in objects.iter_mut().enumerate() {
        let _span = info_span!("object", index, id = object.id).entered();
        match reconstruct(object.positions(), object.normals(), &options.config) {
            Ok(mesh) => {
                if let Some(dir) = &options.output_dir {
                    let path = dir.join(format!("cam0_{index}.ply"));
                    if let Err(e) = save_mesh(&mesh, &path) {
                        warn!(path = %path.display(), error = %e, "failed to write mesh");
                    }
                }
                object.assemble_mesh(mesh);
                report.reconstructed += 1;
            }
            Err(e) => {
                warn!(error = %e, "skipping object");
                report.failures.push((index, e));
            }
        }
        progress.progress(index + 1);
    }

    info!(
        reconstructed = report.reconstructed,
        failed = report.failures.len(),
        "batch finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_progress_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |n: usize| seen.push(n);
            sink.progress(1);
            sink.progress(2);
        }
        assert_eq!(seen, vec![1, 2]);
        ().progress(5);
    }

    #[test]
    fn empty_input_is_invalid() {
        let err = reconstruct(&[], &[], &ReconstructionConfig::default()).unwrap_err();
        assert!(matches!(err, ReconstructionError::EmptyPointCloud));
    }

    #[test]
    fn single_point_gives_empty_mesh() {
        let mesh = reconstruct(
            &[Point::new(0.3, 0.2, 0.1)],
            &[Vector::y()],
            &ReconstructionConfig::default(),
        )
        .unwrap();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
    }
}
