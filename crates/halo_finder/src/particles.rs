//! Columnar particle storage for one rank.
//!
//! Alive particles and their replicated dead-zone ghosts share the same
//! arrays; `status` tells them apart.

use glam::Vec3;

use crate::topology::NeighborZone;

/// Ownership state of a particle on this rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleStatus {
  /// Owned by this rank.
  Alive,
  /// Ghost copied in from the neighbor across `zone`.
  Dead(NeighborZone),
  /// Member of a halo straddling a rank boundary, pending resolution.
  Mixed,
}

impl ParticleStatus {
  #[inline]
  pub fn is_alive(self) -> bool {
    matches!(self, ParticleStatus::Alive)
  }
}

/// Structure-of-arrays particle snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleSet {
  pub x: Vec<f32>,
  pub y: Vec<f32>,
  pub z: Vec<f32>,
  pub vx: Vec<f32>,
  pub vy: Vec<f32>,
  pub vz: Vec<f32>,
  /// Globally unique particle id.
  pub tag: Vec<i64>,
  pub status: Vec<ParticleStatus>,
}

impl ParticleSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      x: Vec::with_capacity(capacity),
      y: Vec::with_capacity(capacity),
      z: Vec::with_capacity(capacity),
      vx: Vec::with_capacity(capacity),
      vy: Vec::with_capacity(capacity),
      vz: Vec::with_capacity(capacity),
      tag: Vec::with_capacity(capacity),
      status: Vec::with_capacity(capacity),
    }
  }

  /// Append one particle.
  pub fn push(&mut self, position: Vec3, velocity: Vec3, tag: i64, status: ParticleStatus) {
    self.x.push(position.x);
    self.y.push(position.y);
    self.z.push(position.z);
    self.vx.push(velocity.x);
    self.vy.push(velocity.y);
    self.vz.push(velocity.z);
    self.tag.push(tag);
    self.status.push(status);
  }

  /// Append an alive particle at rest.
  pub fn push_alive(&mut self, position: Vec3, tag: i64) {
    self.push(position, Vec3::ZERO, tag, ParticleStatus::Alive);
  }

  pub fn len(&self) -> usize {
    self.tag.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tag.is_empty()
  }

  #[inline]
  pub fn position(&self, i: usize) -> Vec3 {
    Vec3::new(self.x[i], self.y[i], self.z[i])
  }

  #[inline]
  pub fn velocity(&self, i: usize) -> Vec3 {
    Vec3::new(self.vx[i], self.vy[i], self.vz[i])
  }

  pub fn alive_count(&self) -> usize {
    self.status.iter().filter(|s| s.is_alive()).count()
  }

  /// Indices of particles a writer keeps after the pass.
  pub fn retained(&self) -> impl Iterator<Item = usize> + '_ {
    self
      .status
      .iter()
      .enumerate()
      .filter_map(|(i, s)| s.is_alive().then_some(i))
  }

  /// Positions rescaled into grid units, one column per axis.
  pub(crate) fn grid_positions(&self, scale: f32) -> [Vec<f32>; 3] {
    let rescale = |column: &[f32]| column.iter().map(|&v| v * scale).collect();
    [rescale(&self.x), rescale(&self.y), rescale(&self.z)]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_push_keeps_columns_aligned() {
    let mut set = ParticleSet::new();
    set.push_alive(Vec3::new(1.0, 2.0, 3.0), 10);
    set.push(
      Vec3::new(4.0, 5.0, 6.0),
      Vec3::X,
      11,
      ParticleStatus::Dead(NeighborZone::X1),
    );

    assert_eq!(set.len(), 2);
    assert_eq!(set.position(1), Vec3::new(4.0, 5.0, 6.0));
    assert_eq!(set.velocity(1), Vec3::X);
    assert_eq!(set.velocity(0), Vec3::ZERO);
    assert_eq!(set.alive_count(), 1);
  }

  #[test]
  fn test_retained_skips_ghosts_and_mixed() {
    let mut set = ParticleSet::new();
    set.push_alive(Vec3::ZERO, 0);
    set.push(Vec3::ZERO, Vec3::ZERO, 1, ParticleStatus::Mixed);
    set.push(
      Vec3::ZERO,
      Vec3::ZERO,
      2,
      ParticleStatus::Dead(NeighborZone::Y0),
    );
    set.push_alive(Vec3::ZERO, 3);

    assert_eq!(set.retained().collect::<Vec<_>>(), vec![0, 3]);
  }

  #[test]
  fn test_grid_positions_scale() {
    let mut set = ParticleSet::new();
    set.push_alive(Vec3::new(1.0, 2.0, 4.0), 0);
    let [x, y, z] = set.grid_positions(0.5);
    assert_eq!((x[0], y[0], z[0]), (0.5, 1.0, 2.0));
  }
}
