//! FofConfig - clustering parameters shared by every rank in a pass.

use crate::error::ConfigError;

/// Parameters for one Friends-of-Friends pass.
///
/// Positions are supplied in physical units over `[0, domain_size)` and are
/// rescaled to grid units (`grid_resolution / domain_size`) before linking,
/// so `linking_length` is measured in mean interparticle spacings and the
/// periodic wrap distance is `grid_resolution`.
#[derive(Clone, Debug, PartialEq)]
pub struct FofConfig {
  /// Physical box size along each axis.
  pub domain_size: f32,

  /// Maximum separation (grid units) for two particles to be friends.
  pub linking_length: f32,

  /// Minimum member count for a cluster to count as a halo.
  pub min_halo_size: usize,

  /// Friends a particle needs before any of its pairs may link.
  /// `None` links on the first close pair.
  pub min_friend_count: Option<usize>,

  /// Apply minimum-image wraparound on every axis.
  pub periodic: bool,

  /// Particles per dimension; the wrap distance in grid units.
  pub grid_resolution: f32,
}

impl FofConfig {
  /// Reject parameters the pass cannot run with.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !self.linking_length.is_finite() || self.linking_length < 0.0 {
      return Err(ConfigError::InvalidLinkingLength(self.linking_length));
    }
    if self.min_halo_size < 1 {
      return Err(ConfigError::InvalidMinHaloSize(self.min_halo_size));
    }
    if let Some(nmin) = self.min_friend_count {
      if nmin < 1 {
        return Err(ConfigError::InvalidMinFriendCount(nmin));
      }
    }
    if !self.domain_size.is_finite() || self.domain_size <= 0.0 {
      return Err(ConfigError::InvalidDomainSize(self.domain_size));
    }
    if self.periodic && !(self.grid_resolution.is_finite() && self.grid_resolution > 0.0) {
      return Err(ConfigError::InvalidGridResolution(self.grid_resolution));
    }
    Ok(())
  }

  /// Factor converting physical coordinates to grid units.
  #[inline]
  pub fn grid_scale(&self) -> f32 {
    if self.grid_resolution > 0.0 {
      self.grid_resolution / self.domain_size
    } else {
      1.0
    }
  }

  /// Wrap distance for periodic correction, or `None` when open.
  #[inline]
  pub fn wrap(&self) -> Option<f32> {
    self.periodic.then_some(self.grid_resolution)
  }

  pub fn with_domain_size(mut self, domain_size: f32) -> Self {
    self.domain_size = domain_size;
    self
  }

  pub fn with_linking_length(mut self, linking_length: f32) -> Self {
    self.linking_length = linking_length;
    self
  }

  pub fn with_min_halo_size(mut self, min_halo_size: usize) -> Self {
    self.min_halo_size = min_halo_size;
    self
  }

  pub fn with_min_friend_count(mut self, min_friend_count: Option<usize>) -> Self {
    self.min_friend_count = min_friend_count;
    self
  }

  pub fn with_periodic(mut self, periodic: bool) -> Self {
    self.periodic = periodic;
    self
  }

  pub fn with_grid_resolution(mut self, grid_resolution: f32) -> Self {
    self.grid_resolution = grid_resolution;
    self
  }
}

impl Default for FofConfig {
  fn default() -> Self {
    Self {
      domain_size: 256.0,
      linking_length: 0.2,
      min_halo_size: 10,
      min_friend_count: None,
      periodic: true,
      grid_resolution: 256.0,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
