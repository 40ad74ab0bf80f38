//! Property-based tests for the bounding volume and the implicit function.

use approx::assert_relative_eq;
use cloud_surface::{
    ReconstructionConfig,
    sampler::ImplicitSurface,
    types::{Point, Vector},
    volume::VolumeDescriptor,
};
use proptest::prelude::*;

fn arb_point() -> impl Strategy<Value = Point> {
    prop::array::uniform3(-10.0..10.0f32).prop_map(|[x, y, z]| Point::new(x, y, z))
}

proptest! {
    #[test]
    fn volume_encloses_every_point(
        points in prop::collection::vec(arb_point(), 1..64),
        resolution in 0.1..1.0f32,
    ) {
        let config = ReconstructionConfig::default().with_resolution(resolution);
        let volume = VolumeDescriptor::enclosing(&points, &config).unwrap();

        for p in &points {
            prop_assert!(volume.contains(p));
        }

        let lowest = points.iter().fold(points[0], |acc, p| acc.inf(p));
        let highest = points.iter().fold(points[0], |acc, p| acc.sup(p));
        for axis in 0..3 {
            let below = lowest[axis] - volume.minimum[axis];
            let above = volume.maximum[axis] - highest[axis];
            assert_relative_eq!(below, 5.0 * resolution, epsilon = 1e-4);
            assert_relative_eq!(above, 5.0 * resolution, epsilon = 1e-4);
        }

        let [nx, ny, nz] = volume.cell_counts();
        let last = volume.corner_position(nx, ny, nz);
        for axis in 0..3 {
            prop_assert!(last[axis] >= volume.maximum[axis] - 1e-4);
        }
    }

    #[test]
    fn plane_samples_give_signed_height(
        height in -1.0..1.0f32,
        qx in -0.2..0.2f32,
        qy in -0.2..0.2f32,
        qz in -0.1..0.1f32,
    ) {
        let points: Vec<Point> = (-5..=5)
            .flat_map(|i| {
                (-5..=5).map(move |j| Point::new(i as f32 * 0.05, j as f32 * 0.05, height))
            })
            .collect();
        let normals = vec![Vector::z(); points.len()];
        let config = ReconstructionConfig::default();
        let surface = ImplicitSurface::new(&points, &normals, &config).unwrap();

        let value = surface.evaluate(&Point::new(qx, qy, height + qz)).unwrap();
        assert_relative_eq!(value, qz, epsilon = 1e-4);
    }
}
