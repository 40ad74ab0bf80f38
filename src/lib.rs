pub mod config;
pub mod error;
pub mod field;
pub mod interp;
pub mod march;
pub mod mesh;
pub mod object;
pub mod pipeline;
pub mod ply;
#[cfg(feature = "bevy")]
pub mod plugin;
pub mod sampler;
pub mod spatial;
pub mod tables;
pub mod types;
pub mod utils;
pub mod volume;

pub use config::ReconstructionConfig;
pub use error::{ReconstructionError, Result};
pub use mesh::Mesh;
pub use object::PointCloudObject;
pub use pipeline::{BatchOptions, BatchReport, ProgressSink, reconstruct, reconstruct_objects};
#[cfg(feature = "bevy")]
pub use plugin::ReconstructionPlugin;
