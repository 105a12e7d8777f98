//! CartesianDecomposition - split a periodic box over a grid of ranks.
//!
//! Each rank owns one cell of a `dims[0] x dims[1] x dims[2]` grid. Besides
//! its own particles a rank receives copies of every particle within
//! `dead_size` of its faces, shifted across the periodic boundary where
//! needed so the copies sit next to the cell they pad. Copies are tagged
//! with the zone they arrived from.

use glam::Vec3;

use crate::error::ConfigError;
use crate::particles::{ParticleSet, ParticleStatus};
use crate::topology::{NeighborZone, Topology, NUM_ZONES};

/// Process grid over a cubic periodic domain.
#[derive(Clone, Debug, PartialEq)]
pub struct CartesianDecomposition {
  dims: [usize; 3],
  domain_size: f32,
  dead_size: f32,
}

impl CartesianDecomposition {
  pub fn new(dims: [usize; 3], domain_size: f32, dead_size: f32) -> Result<Self, ConfigError> {
    if dims.iter().any(|&d| d == 0) {
      return Err(ConfigError::InvalidDims(dims));
    }
    if !domain_size.is_finite() || domain_size <= 0.0 {
      return Err(ConfigError::InvalidDomainSize(domain_size));
    }
    let min_cell = domain_size / dims.iter().copied().max().unwrap_or(1) as f32;
    if !dead_size.is_finite() || dead_size < 0.0 || dead_size > min_cell {
      return Err(ConfigError::InvalidDeadSize(dead_size));
    }
    Ok(Self {
      dims,
      domain_size,
      dead_size,
    })
  }

  pub fn dims(&self) -> [usize; 3] {
    self.dims
  }

  /// Number of ranks in the grid.
  pub fn size(&self) -> usize {
    self.dims.iter().product()
  }

  pub fn dead_size(&self) -> f32 {
    self.dead_size
  }

  /// Edge lengths of one cell.
  pub fn cell_size(&self) -> Vec3 {
    Vec3::splat(self.domain_size)
      / Vec3::new(
        self.dims[0] as f32,
        self.dims[1] as f32,
        self.dims[2] as f32,
      )
  }

  /// Rank at grid position `pos`, z fastest.
  #[inline]
  pub fn rank_of(&self, pos: [usize; 3]) -> usize {
    (pos[0] * self.dims[1] + pos[1]) * self.dims[2] + pos[2]
  }

  pub fn position_of(&self, rank: usize) -> [usize; 3] {
    let z = rank % self.dims[2];
    let y = (rank / self.dims[2]) % self.dims[1];
    let x = rank / (self.dims[1] * self.dims[2]);
    [x, y, z]
  }

  /// Grid position `pos + offset`, wrapped periodically.
  fn wrapped(&self, pos: [usize; 3], offset: [i32; 3]) -> [usize; 3] {
    let mut out = [0; 3];
    for axis in 0..3 {
      let d = self.dims[axis] as i64;
      out[axis] = (pos[axis] as i64 + offset[axis] as i64).rem_euclid(d) as usize;
    }
    out
  }

  /// Neighbor table for `rank`.
  pub fn topology(&self, rank: usize) -> Result<Topology, ConfigError> {
    let size = self.size();
    if rank >= size {
      return Err(ConfigError::RankOutOfRange { rank, size });
    }
    let position = self.position_of(rank);
    let mut neighbors = [0; NUM_ZONES];
    for zone in NeighborZone::ALL {
      neighbors[zone.index()] = self.rank_of(self.wrapped(position, zone.offset()));
    }
    Topology::new(rank, size, position, neighbors)
  }

  /// Grid cell holding `point`, after wrapping it into the domain.
  pub fn owner_of(&self, point: Vec3) -> [usize; 3] {
    let cell = self.cell_size();
    let mut pos = [0; 3];
    for axis in 0..3 {
      let v = point[axis].rem_euclid(self.domain_size);
      let c = (v / cell[axis]) as usize;
      pos[axis] = c.min(self.dims[axis] - 1);
    }
    pos
  }

  /// Split a global snapshot into one particle set per rank.
  ///
  /// Alive particles come first on every rank, followed by dead copies. A
  /// lone rank gets no copies; its pass wraps periodically instead.
  pub fn distribute(&self, particles: &ParticleSet) -> Vec<ParticleSet> {
    let size = self.size();
    let mut ranks: Vec<ParticleSet> = (0..size).map(|_| ParticleSet::new()).collect();
    let owners: Vec<[usize; 3]> = (0..particles.len())
      .map(|i| self.owner_of(particles.position(i)))
      .collect();

    for (i, &owner) in owners.iter().enumerate() {
      let position = particles.position(i).rem_euclid(Vec3::splat(self.domain_size));
      ranks[self.rank_of(owner)].push(
        position,
        particles.velocity(i),
        particles.tag[i],
        ParticleStatus::Alive,
      );
    }

    if size == 1 {
      return ranks;
    }

    let cell = self.cell_size();
    for (i, &owner) in owners.iter().enumerate() {
      let position = particles.position(i).rem_euclid(Vec3::splat(self.domain_size));
      let lower = Vec3::new(
        owner[0] as f32 * cell.x,
        owner[1] as f32 * cell.y,
        owner[2] as f32 * cell.z,
      );
      let near_low = (position - lower).cmplt(Vec3::splat(self.dead_size));
      let near_high = (lower + cell - position).cmplt(Vec3::splat(self.dead_size));

      for zone in NeighborZone::ALL {
        let offset = zone.offset();
        // The receiving rank sees this particle across `zone`, so the
        // particle must hug the face pointing back at it.
        let reaches = (0..3).all(|axis| match offset[axis] {
          1 => near_low.test(axis),
          -1 => near_high.test(axis),
          _ => true,
        });
        if !reaches {
          continue;
        }

        let inverse = [-offset[0], -offset[1], -offset[2]];
        let target = self.wrapped(owner, inverse);
        let mut shifted = position;
        for axis in 0..3 {
          let unwrapped = target[axis] as i64 + offset[axis] as i64;
          shifted[axis] += (unwrapped - owner[axis] as i64) as f32 * cell[axis];
        }
        ranks[self.rank_of(target)].push(
          shifted,
          particles.velocity(i),
          particles.tag[i],
          ParticleStatus::Dead(zone),
        );
      }
    }

    ranks
  }
}
