//! End-to-end reconstruction of sampled spheres and batch runs.

use std::{f32::consts::PI, fs};

use cloud_surface::{
    BatchOptions, BatchReport, PointCloudObject, ReconstructionConfig, ReconstructionError,
    reconstruct, reconstruct_objects,
    types::{Point, Vector},
};

/// `count` samples evenly spread over a sphere of `radius`, normals pointing outward.
fn fibonacci_sphere(count: usize, radius: f32) -> (Vec<Point>, Vec<Vector>) {
    let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let r = (1.0 - y * y).sqrt();
            let theta = golden_angle * i as f32;
            let normal = Vector::new(r * theta.cos(), y, r * theta.sin());
            (Point::from(normal * radius), normal)
        })
        .unzip()
}

#[test]
fn unit_sphere_vertices_lie_near_the_surface() {
    let (points, normals) = fibonacci_sphere(500, 1.0);
    let config = ReconstructionConfig::default().with_resolution(0.05);
    let mesh = reconstruct(&points, &normals, &config).unwrap();

    assert!(mesh.triangle_count() > 0);
    mesh.validate().unwrap();
    assert_eq!(mesh.boundary_edge_count(), 0);
    for p in &mesh.positions {
        let off = (p.coords.norm() - 1.0).abs();
        assert!(off <= 0.05, "vertex {p:?} is {off} away from the sphere");
    }
    for n in &mesh.normals {
        assert!((n.norm() - 1.0).abs() < 1e-3);
    }
}

#[test]
fn normals_point_away_from_the_center() {
    let (points, normals) = fibonacci_sphere(1000, 1.0);
    let config = ReconstructionConfig::default().with_resolution(0.05);
    let mesh = reconstruct(&points, &normals, &config).unwrap();

    for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
        assert!(p.coords.dot(n) > 0.0);
    }
    for tri in 0..mesh.triangle_count() {
        let [a, b, c] = mesh.tri_coords(tri);
        let cross = (b - a).cross(&(c - a));
        if cross.norm() > 1e-6 {
            let centroid = (a.coords + b.coords + c.coords) / 3.0;
            assert!(cross.dot(&centroid) > 0.0, "triangle {tri} faces inward");
        }
    }
}

#[test]
fn surface_area_matches_the_sphere() {
    let (points, normals) = fibonacci_sphere(2000, 1.0);
    let config = ReconstructionConfig::default().with_resolution(0.05);
    let mesh = reconstruct(&points, &normals, &config).unwrap();

    let expected = 4.0 * PI;
    let area = mesh.surface_area();
    assert!(
        (0.85 * expected..=1.2 * expected).contains(&area),
        "area {area} too far from {expected}"
    );
}

#[test]
fn output_is_deterministic() {
    let (points, normals) = fibonacci_sphere(600, 0.5);
    let config = ReconstructionConfig::default().with_resolution(0.04);

    let first = reconstruct(&points, &normals, &config).unwrap();
    let second = reconstruct(&points, &normals, &config).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn degenerate_clouds_give_empty_meshes() {
    let config = ReconstructionConfig::default();

    let single = reconstruct(&[Point::origin()], &[Vector::z()], &config).unwrap();
    assert_eq!(single.triangle_count(), 0);

    let line: Vec<Point> = (0..20).map(|i| Point::new(i as f32 * 0.02, 0.0, 0.0)).collect();
    let up = vec![Vector::y(); line.len()];
    let collinear = reconstruct(&line, &up, &config).unwrap();
    assert_eq!(collinear.triangle_count(), 0);
    assert_eq!(collinear.vertex_count(), 0);
}

#[test]
fn invalid_input_is_reported() {
    let config = ReconstructionConfig::default();
    let (points, normals) = fibonacci_sphere(50, 1.0);

    let err = reconstruct(&points, &normals[..10], &config).unwrap_err();
    assert!(matches!(
        err,
        ReconstructionError::MismatchedNormals {
            points: 50,
            normals: 10
        }
    ));

    let mut bad = points.clone();
    bad[7].x = f32::NAN;
    let err = reconstruct(&bad, &normals, &config).unwrap_err();
    assert!(matches!(err, ReconstructionError::NonFinitePoint { index: 7 }));

    let tiny = ReconstructionConfig::default().with_resolution(1e-4);
    let err = reconstruct(&points, &normals, &tiny).unwrap_err();
    assert!(matches!(err, ReconstructionError::GridTooLarge { .. }));

    let far = [Point::new(-1e20, 0.0, 0.0), Point::new(1e20, 0.0, 0.0)];
    let err = reconstruct(&far, &[Vector::z(); 2], &config).unwrap_err();
    assert!(matches!(err, ReconstructionError::GridTooLarge { .. }));
}

#[test]
fn batch_assembles_meshes_and_skips_failures() {
    let (points, normals) = fibonacci_sphere(400, 0.5);
    let mut objects = vec![
        PointCloudObject::from_points(0, &points, &normals),
        PointCloudObject::new(1, 0),
        PointCloudObject::from_points(2, &points, &normals),
    ];

    let dir = std::env::temp_dir().join(format!("cloud_surface_batch_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let options = BatchOptions {
        config: ReconstructionConfig::default().with_resolution(0.05),
        output_dir: Some(dir.clone()),
    };

    let mut seen = Vec::new();
    let report: BatchReport =
        reconstruct_objects(&mut objects, &options, |n: usize| seen.push(n));

    assert_eq!(seen, vec![1, 2, 3]);
    assert_eq!(report.reconstructed, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, 1);
    assert!(matches!(report.failures[0].1, ReconstructionError::EmptyPointCloud));

    for index in [0, 2] {
        let object = &objects[index];
        let mesh = object.mesh().unwrap();
        assert!(mesh.triangle_count() > 0);
        assert_eq!(object.mesh_vertex_count(), 3 * mesh.triangle_count());

        let ply = fs::read_to_string(dir.join(format!("cam0_{index}.ply"))).unwrap();
        assert!(ply.starts_with("ply\n"));
        assert!(ply.contains(&format!("element face {}", mesh.triangle_count())));
    }
    assert!(objects[1].mesh().is_none());
    assert!(!dir.join("cam0_1.ply").exists());

    fs::remove_dir_all(&dir).unwrap();
}
