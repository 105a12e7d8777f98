//! Neighbor zones and the per-rank view of the process grid.
//!
//! A rank's dead zone is split into 26 compass zones, one per face, edge and
//! corner of its sub-box. Every dead particle carries the zone it was
//! replicated from, and the topology maps each zone to the rank owning that
//! side.

use crate::error::ConfigError;

/// Number of compass zones around a rank's sub-box.
pub const NUM_ZONES: usize = 26;

/// One of the 26 faces, edges and corners surrounding a sub-box.
///
/// `0` is the low side of an axis, `1` the high side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum NeighborZone {
  X0,
  X1,
  Y0,
  Y1,
  Z0,
  Z1,
  X0Y0,
  X0Y1,
  X1Y0,
  X1Y1,
  Y0Z0,
  Y0Z1,
  Y1Z0,
  Y1Z1,
  Z0X0,
  Z0X1,
  Z1X0,
  Z1X1,
  X0Y0Z0,
  X0Y0Z1,
  X0Y1Z0,
  X0Y1Z1,
  X1Y0Z0,
  X1Y0Z1,
  X1Y1Z0,
  X1Y1Z1,
}

impl NeighborZone {
  /// All zones in index order.
  pub const ALL: [NeighborZone; NUM_ZONES] = [
    Self::X0,
    Self::X1,
    Self::Y0,
    Self::Y1,
    Self::Z0,
    Self::Z1,
    Self::X0Y0,
    Self::X0Y1,
    Self::X1Y0,
    Self::X1Y1,
    Self::Y0Z0,
    Self::Y0Z1,
    Self::Y1Z0,
    Self::Y1Z1,
    Self::Z0X0,
    Self::Z0X1,
    Self::Z1X0,
    Self::Z1X1,
    Self::X0Y0Z0,
    Self::X0Y0Z1,
    Self::X0Y1Z0,
    Self::X0Y1Z1,
    Self::X1Y0Z0,
    Self::X1Y0Z1,
    Self::X1Y1Z0,
    Self::X1Y1Z1,
  ];

  /// Dense index in `0..NUM_ZONES`.
  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }

  /// Zone for a dense index.
  pub fn from_index(index: usize) -> Option<Self> {
    Self::ALL.get(index).copied()
  }

  /// Grid offset `[dx, dy, dz]` of the rank across this zone.
  pub fn offset(self) -> [i32; 3] {
    use NeighborZone::*;
    match self {
      X0 => [-1, 0, 0],
      X1 => [1, 0, 0],
      Y0 => [0, -1, 0],
      Y1 => [0, 1, 0],
      Z0 => [0, 0, -1],
      Z1 => [0, 0, 1],
      X0Y0 => [-1, -1, 0],
      X0Y1 => [-1, 1, 0],
      X1Y0 => [1, -1, 0],
      X1Y1 => [1, 1, 0],
      Y0Z0 => [0, -1, -1],
      Y0Z1 => [0, -1, 1],
      Y1Z0 => [0, 1, -1],
      Y1Z1 => [0, 1, 1],
      Z0X0 => [-1, 0, -1],
      Z0X1 => [1, 0, -1],
      Z1X0 => [-1, 0, 1],
      Z1X1 => [1, 0, 1],
      X0Y0Z0 => [-1, -1, -1],
      X0Y0Z1 => [-1, -1, 1],
      X0Y1Z0 => [-1, 1, -1],
      X0Y1Z1 => [-1, 1, 1],
      X1Y0Z0 => [1, -1, -1],
      X1Y0Z1 => [1, -1, 1],
      X1Y1Z0 => [1, 1, -1],
      X1Y1Z1 => [1, 1, 1],
    }
  }

  /// Zone for a non-zero offset with components in `-1..=1`.
  pub fn from_offset(offset: [i32; 3]) -> Option<Self> {
    Self::ALL.iter().copied().find(|zone| zone.offset() == offset)
  }

  /// High zones lie entirely on the non-negative side of every axis.
  ///
  /// A halo touching only high zones of a single neighbor is kept here; the
  /// neighbor sees the same halo through its low zones and cedes it.
  #[inline]
  pub fn is_high(self) -> bool {
    self.offset().iter().all(|&d| d >= 0)
  }

  /// Low zones lie entirely on the non-positive side of every axis. Mixed-sign
  /// zones such as `X1Y0` are neither high nor low: the rank across sees the
  /// halo through the mirrored mixed-sign zone.
  #[inline]
  pub fn is_low(self) -> bool {
    self.offset().iter().all(|&d| d <= 0)
  }
}

/// Compact set of neighbor zones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ZoneSet(u32);

impl ZoneSet {
  pub fn new() -> Self {
    Self(0)
  }

  #[inline]
  pub fn insert(&mut self, zone: NeighborZone) {
    self.0 |= 1 << zone.index();
  }

  #[inline]
  pub fn contains(&self, zone: NeighborZone) -> bool {
    self.0 & (1 << zone.index()) != 0
  }

  pub fn is_empty(&self) -> bool {
    self.0 == 0
  }

  pub fn len(&self) -> usize {
    self.0.count_ones() as usize
  }

  /// Zones in index order.
  pub fn iter(&self) -> impl Iterator<Item = NeighborZone> + '_ {
    NeighborZone::ALL
      .iter()
      .copied()
      .filter(move |&zone| self.contains(zone))
  }
}

impl FromIterator<NeighborZone> for ZoneSet {
  fn from_iter<I: IntoIterator<Item = NeighborZone>>(iter: I) -> Self {
    let mut set = ZoneSet::new();
    for zone in iter {
      set.insert(zone);
    }
    set
  }
}

/// A rank's place in the process grid, as handed over by the partitioner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topology {
  rank: usize,
  size: usize,
  position: [usize; 3],
  neighbors: [usize; NUM_ZONES],
}

impl Topology {
  /// Build from a partitioner's zone→rank table.
  pub fn new(
    rank: usize,
    size: usize,
    position: [usize; 3],
    neighbors: [usize; NUM_ZONES],
  ) -> Result<Self, ConfigError> {
    if rank >= size {
      return Err(ConfigError::RankOutOfRange { rank, size });
    }
    if let Some(&bad) = neighbors.iter().find(|&&r| r >= size) {
      return Err(ConfigError::RankOutOfRange { rank: bad, size });
    }
    Ok(Self {
      rank,
      size,
      position,
      neighbors,
    })
  }

  /// Topology of a lone rank that is its own neighbor on every side.
  pub fn single() -> Self {
    Self {
      rank: 0,
      size: 1,
      position: [0; 3],
      neighbors: [0; NUM_ZONES],
    }
  }

  pub fn rank(&self) -> usize {
    self.rank
  }

  pub fn size(&self) -> usize {
    self.size
  }

  /// Cartesian position of this rank in the process grid.
  pub fn position(&self) -> [usize; 3] {
    self.position
  }

  /// Rank owning the far side of `zone`.
  #[inline]
  pub fn neighbor_rank(&self, zone: NeighborZone) -> usize {
    self.neighbors[zone.index()]
  }

  pub fn is_single(&self) -> bool {
    self.size == 1
  }
}
