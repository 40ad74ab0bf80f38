use std::sync::Arc;

use bevy::{
    asset::RenderAssetUsages,
    mesh::{Indices, PrimitiveTopology},
    prelude::*,
    tasks::{AsyncComputeTaskPool, Task, block_on, futures_lite::future},
};

use crate::{
    config::ReconstructionConfig,
    error::Result,
    mesh::Mesh as SurfaceMesh,
    pipeline::reconstruct,
    types::{Point, Vector},
};

/// System sets for the reconstruction pipeline.
///
/// Use these to order your own systems relative to reconstruction:
///
/// ```rust,ignore
/// // Inspect the indexed mesh before it is flattened into a render mesh:
/// app.add_systems(Update, export_mesh.after(ReconstructionSet::Generate)
///                                    .before(ReconstructionSet::Upload));
/// ```
///
/// ```text
/// ReconstructionSet::Spawn  →  [async compute]  →  ReconstructionSet::Generate  →  [your systems]  →  ReconstructionSet::Upload
/// ```
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReconstructionSet {
    /// Spawns an async compute task for each queued cloud.
    Spawn,
    /// Polls async tasks and inserts [`ReconstructedMesh`] on completion.
    Generate,
    /// Uploads [`ReconstructedMesh`] data into a Bevy [`Mesh3d`].
    Upload,
}

/// An oriented point cloud to reconstruct.
///
/// Positions and normals are shared through [`Arc`] so the async task can read
/// them without a copy.
#[derive(Component, Clone)]
#[require(Transform)]
pub struct CloudSource {
    pub points: Arc<Vec<Point>>,
    pub normals: Arc<Vec<Vector>>,
    pub config: ReconstructionConfig,
}

impl CloudSource {
    pub fn new(points: Vec<Point>, normals: Vec<Vector>) -> Self {
        Self {
            points: Arc::new(points),
            normals: Arc::new(normals),
            config: ReconstructionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconstructionConfig) -> Self {
        self.config = config;
        self
    }
}

/// Marker component added to [`CloudSource`] entities that are waiting to be processed.
#[derive(Component)]
pub struct QueuedCloud;

/// Holds the in-flight async reconstruction for a [`CloudSource`].
#[derive(Component)]
pub struct ComputeTask(Task<Result<SurfaceMesh>>);

/// The indexed mesh reconstructed for an entity.
///
/// Stays on the entity after upload so it can be exported or inspected.
#[derive(Component, Clone)]
pub struct ReconstructedMesh(pub SurfaceMesh);

/// Runtime configuration of the reconstruction queue.
#[derive(Resource)]
pub struct ReconstructionQueueConfig {
    /// Maximum number of reconstructions spawned per frame. Default: `2`.
    pub max_tasks_per_frame: usize,
}

impl Default for ReconstructionQueueConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_frame: 2,
        }
    }
}

/// Number of clouds whose reconstruction has finished, successfully or not.
#[derive(Resource, Default, Debug)]
pub struct ReconstructionProgress {
    pub completed: usize,
}

/// Bevy plugin that reconstructs [`CloudSource`] entities off the main thread.
///
/// ```text
/// CloudSource added
///   → QueuedCloud inserted          (on_cloud_add)
///   → ComputeTask spawned           (ReconstructionSet::Spawn)
///   → [async compute runs]
///   → ReconstructedMesh inserted    (ReconstructionSet::Generate, once task completes)
///   → Mesh3d inserted               (ReconstructionSet::Upload)
///   → QueuedCloud removed
/// ```
pub struct ReconstructionPlugin {
    /// Initial value for [`ReconstructionQueueConfig::max_tasks_per_frame`].
    pub max_tasks_per_frame: usize,
}

impl Default for ReconstructionPlugin {
    fn default() -> Self {
        Self {
            max_tasks_per_frame: ReconstructionQueueConfig::default().max_tasks_per_frame,
        }
    }
}

impl Plugin for ReconstructionPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ReconstructionQueueConfig {
            max_tasks_per_frame: self.max_tasks_per_frame,
        })
        .init_resource::<ReconstructionProgress>();

        #[cfg(feature = "auto_queue")]
        app.configure_sets(
            Update,
            (
                ReconstructionSet::Spawn,
                ReconstructionSet::Generate,
                ReconstructionSet::Upload,
            )
                .chain(),
        )
        .add_systems(
            Update,
            (
                on_cloud_add,
                spawn_reconstruction_tasks.in_set(ReconstructionSet::Spawn),
                poll_reconstruction_tasks.in_set(ReconstructionSet::Generate),
                upload_mesh.in_set(ReconstructionSet::Upload),
            ),
        );
    }
}

/// Inserts [`QueuedCloud`] on every newly added [`CloudSource`].
pub fn on_cloud_add(
    mut commands: Commands,
    query: Query<Entity, (Added<CloudSource>, Without<QueuedCloud>)>,
) {
    for entity in query.iter() {
        commands.entity(entity).insert(QueuedCloud);
    }
}

/// Spawns async reconstructions for [`QueuedCloud`]s, up to
/// [`ReconstructionQueueConfig::max_tasks_per_frame`] per frame.
pub fn spawn_reconstruction_tasks(
    mut commands: Commands,
    config: Res<ReconstructionQueueConfig>,
    query: Query<
        (Entity, &CloudSource),
        (With<QueuedCloud>, Without<ComputeTask>, Without<ReconstructedMesh>),
    >,
) {
    let task_pool = AsyncComputeTaskPool::get();

    for (entity, source) in query.iter().take(config.max_tasks_per_frame) {
        let points = Arc::clone(&source.points);
        let normals = Arc::clone(&source.normals);
        let settings = source.config;

        let task = task_pool.spawn(async move { reconstruct(&points, &normals, &settings) });

        commands.entity(entity).insert(ComputeTask(task));
    }
}

/// Polls in-flight [`ComputeTask`]s and inserts [`ReconstructedMesh`] on success.
///
/// Failed reconstructions are logged and dequeued.
pub fn poll_reconstruction_tasks(
    mut commands: Commands,
    mut progress: ResMut<ReconstructionProgress>,
    mut query: Query<(Entity, &mut ComputeTask)>,
) {
    for (entity, mut compute_task) in query.iter_mut() {
        let Some(result) = block_on(future::poll_once(&mut compute_task.0)) else {
            continue;
        };
        progress.completed += 1;

        let mut entity_commands = commands.entity(entity);
        entity_commands.remove::<ComputeTask>();
        match result {
            Ok(mesh) => {
                entity_commands.insert(ReconstructedMesh(mesh));
            }
            Err(e) => {
                warn!("reconstruction of {entity} failed: {e}");
                entity_commands.remove::<QueuedCloud>();
            }
        }
    }
}

/// Flattens a [`ReconstructedMesh`] into a Bevy [`Mesh3d`] and removes [`QueuedCloud`].
pub fn upload_mesh(
    mut commands: Commands,
    query: Query<(Entity, &ReconstructedMesh), With<QueuedCloud>>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    for (entity, generated) in query.iter() {
        commands
            .entity(entity)
            .insert(Mesh3d(meshes.add(to_render_mesh(&generated.0))))
            .remove::<QueuedCloud>();
    }
}

/// Converts the indexed mesh into an unshared triangle list, three vertices per triangle.
pub fn to_render_mesh(mesh: &SurfaceMesh) -> Mesh {
    let (positions, normals): (Vec<[f32; 3]>, Vec<[f32; 3]>) = mesh
        .triangle_vertices()
        .map(|(p, n)| ([p.x, p.y, p.z], [n.x, n.y, n.z]))
        .unzip();
    let indices: Vec<u32> = (0..positions.len() as u32).collect();

    let mut render_mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    );
    render_mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    render_mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    render_mesh.insert_indices(Indices::U32(indices));
    render_mesh
}
