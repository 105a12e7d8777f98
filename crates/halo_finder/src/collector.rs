//! Sort finished clusters into alive-only, dead-only and mixed halos.
//!
//! Alive-only halos belong to this rank outright and dead-only ones to some
//! other rank. Mixed halos straddle a boundary: their members are marked
//! [`ParticleStatus::Mixed`] and summarised in a [`CosmoHaloRecord`] so the
//! ranks sharing them can agree on one owner.

use crate::catalog::{HaloRun, ValidHalos};
use crate::chain::HaloChains;
use crate::particles::ParticleStatus;
use crate::record::CosmoHaloRecord;

/// Halos at or above the size threshold, by kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HaloCounts {
  pub alive: usize,
  pub dead: usize,
  pub mixed: usize,
}

/// Output of [`collect_halos`].
#[derive(Clone, Debug, Default)]
pub struct Collection {
  pub counts: HaloCounts,
  /// Alive-only halos, already kept.
  pub valid: ValidHalos,
  /// One record per mixed halo, in ascending root order.
  pub mixed: Vec<CosmoHaloRecord>,
}

/// Classify every chain with at least `min_halo_size` members.
///
/// Members of mixed halos have their status set to `Mixed`.
pub fn collect_halos(
  chains: &HaloChains,
  status: &mut [ParticleStatus],
  tags: &[i64],
  min_halo_size: usize,
) -> Collection {
  let n = chains.len();
  let mut collection = Collection::default();
  if n == 0 {
    return collection;
  }

  // Pass 1: tally members per root
  let mut alive = vec![0u32; n];
  let mut dead = vec![0u32; n];
  for (p, s) in status.iter().enumerate() {
    let root = chains.root(p);
    if s.is_alive() {
      alive[root] += 1;
    } else {
      dead[root] += 1;
    }
  }

  // Pass 2: bucket roots big enough to be halos
  for root in chains.roots() {
    let (alive_count, dead_count) = (alive[root] as usize, dead[root] as usize);
    let size = alive_count + dead_count;
    if size < min_halo_size {
      continue;
    }
    let Some(head) = chains.head(root) else {
      continue;
    };

    if dead_count == 0 {
      collection.counts.alive += 1;
      collection.valid.push(HaloRun { head, size });
    } else if alive_count == 0 {
      collection.counts.dead += 1;
    } else {
      collection.counts.mixed += 1;
      let mut record = CosmoHaloRecord::new(root);
      record.alive_count = alive_count;
      record.dead_count = dead_count;

      let mut member_tags = Vec::with_capacity(size);
      for member in chains.members(root) {
        member_tags.push(tags[member]);
        if let ParticleStatus::Dead(zone) = status[member] {
          record.zones.insert(zone);
        }
        status[member] = ParticleStatus::Mixed;
      }
      member_tags.sort_unstable();
      member_tags.truncate(min_halo_size);
      record.fingerprint = member_tags;

      collection.mixed.push(record);
    }
  }

  collection
}

#[cfg(test)]
#[path = "collector_test.rs"]
mod collector_test;
