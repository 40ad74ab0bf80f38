use crate::{
    error::{ReconstructionError, Result},
    types::Value,
};

/// Parameters for one reconstruction pass.
///
/// ```rust,ignore
/// let config = ReconstructionConfig::default()
///     .with_resolution(0.02)
///     .with_radius_multiplier(3.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconstructionConfig {
    /// Voxel edge length of the sampling grid. Default: `0.05`.
    pub resolution: Value,
    /// Influence radius expressed in voxels. Samples further than
    /// `radius_multiplier × resolution` from a corner do not affect it. Default: `4.0`.
    pub radius_multiplier: Value,
    /// Upper bound on the number of grid corners a single pass may allocate.
    pub max_grid_corners: usize,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            resolution: 0.05,
            radius_multiplier: 4.0,
            max_grid_corners: 64 << 20,
        }
    }
}

impl ReconstructionConfig {
    /// Sets the voxel edge length.
    pub fn with_resolution(mut self, resolution: Value) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the influence radius in voxels.
    pub fn with_radius_multiplier(mut self, radius_multiplier: Value) -> Self {
        self.radius_multiplier = radius_multiplier;
        self
    }

    /// Sets the corner budget of the sampling grid.
    pub fn with_max_grid_corners(mut self, max_grid_corners: usize) -> Self {
        self.max_grid_corners = max_grid_corners;
        self
    }

    /// Radius within which a sample contributes to the distance field.
    #[inline]
    pub fn influence_radius(&self) -> Value {
        self.radius_multiplier * self.resolution
    }

    /// Padding added on every side of the raw point bounds.
    #[inline]
    pub fn margin(&self) -> Value {
        self.influence_radius() + self.resolution
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(ReconstructionError::InvalidConfig(
                "resolution must be positive and finite",
            ));
        }
        if !(self.radius_multiplier.is_finite() && self.radius_multiplier > 0.0) {
            return Err(ReconstructionError::InvalidConfig(
                "radius multiplier must be positive and finite",
            ));
        }
        if self.max_grid_corners < 8 {
            return Err(ReconstructionError::InvalidConfig(
                "grid corner budget cannot hold a single voxel",
            ));
        }
        Ok(())
    }
}
