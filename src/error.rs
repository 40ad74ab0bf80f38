use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, ReconstructionError>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum ReconstructionError {
    /// The point sequence handed to the volume builder was empty.
    #[from(skip)]
    EmptyPointCloud,
    /// Positions and normals are not index-aligned.
    #[from(skip)]
    MismatchedNormals { points: usize, normals: usize },
    /// A position has a NaN or infinite coordinate.
    #[from(skip)]
    NonFinitePoint { index: usize },
    #[from(skip)]
    InvalidConfig(&'static str),
    /// The sampling grid would need more corners than the configured limit.
    #[from(skip)]
    GridTooLarge { corners: usize, limit: usize },
    /// The scalar field never crosses the iso-level.
    #[from(skip)]
    DegenerateGeometry,
    /// A triangle references a vertex that does not exist.
    #[from(skip)]
    InvalidIndex,
    Io(std::io::Error),
}

impl std::error::Error for ReconstructionError {}
