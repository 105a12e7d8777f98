//! Communication-free ownership for halos shared with one neighbor.
//!
//! A halo reaching only into high zones of a single neighbor rank is kept;
//! the neighbor sees the same halo through its low zones and cedes it. Any
//! halo touching two or more neighbor ranks, both sides of one, or a
//! mixed-sign edge or corner zone is left for the global arbiter.

use smallvec::SmallVec;

use crate::record::{CosmoHaloRecord, Validity};
use crate::topology::{Topology, ZoneSet};

/// Verdict counts from the local rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LocalSummary {
  pub valid: usize,
  pub invalid: usize,
  pub unmarked: usize,
}

/// Decide one halo from the zones it touches.
pub fn local_verdict(zones: ZoneSet, topology: &Topology) -> Validity {
  if zones.is_empty() {
    return Validity::Unmarked;
  }

  let mut ranks: SmallVec<[usize; 8]> = zones
    .iter()
    .map(|zone| topology.neighbor_rank(zone))
    .collect();
  ranks.sort_unstable();
  ranks.dedup();
  if ranks.len() != 1 {
    return Validity::Unmarked;
  }

  if zones.iter().all(|zone| zone.is_high()) {
    Validity::Valid
  } else if zones.iter().all(|zone| zone.is_low()) {
    Validity::Invalid
  } else {
    Validity::Unmarked
  }
}

/// Apply the local rule to every record.
///
/// On a single-rank run nothing can be escalated, so halos left unmarked are
/// ceded.
pub fn resolve_locally(records: &mut [CosmoHaloRecord], topology: &Topology) -> LocalSummary {
  let mut summary = LocalSummary::default();
  for record in records.iter_mut() {
    let mut verdict = local_verdict(record.zones, topology);
    if verdict == Validity::Unmarked && topology.is_single() {
      verdict = Validity::Invalid;
    }
    record.validity = verdict;
    match verdict {
      Validity::Valid => summary.valid += 1,
      Validity::Invalid => summary.invalid += 1,
      Validity::Unmarked => summary.unmarked += 1,
    }
  }
  summary
}

#[cfg(test)]
#[path = "resolution_test.rs"]
mod resolution_test;
