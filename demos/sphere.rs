use bevy::{
    pbr::wireframe::{Wireframe, WireframeConfig},
    prelude::*,
};
use cloud_surface::{
    ReconstructionConfig, ReconstructionPlugin,
    plugin::CloudSource,
    types::{Point, Vector},
};

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            bevy::pbr::wireframe::WireframePlugin::default(),
            ReconstructionPlugin::default(),
        ))
        .insert_resource(WireframeConfig {
            global: true,
            ..Default::default()
        })
        .add_systems(Startup, setup)
        .run();
}

/// Evenly spreads `count` samples over a sphere, normals pointing outward.
fn fibonacci_sphere(count: usize, radius: f32) -> (Vec<Point>, Vec<Vector>) {
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
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

fn setup(mut commands: Commands) {
    const RADIUS: f32 = 4.0;

    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(RADIUS * -2.4, RADIUS * 1.8, RADIUS * -2.4)
            .looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight::default(),
        Transform::from_xyz(4.0, 8.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let (points, normals) = fibonacci_sphere(2000, RADIUS);
    commands.spawn((
        CloudSource::new(points, normals)
            .with_config(ReconstructionConfig::default().with_resolution(0.2)),
        Wireframe,
    ));
}
