//! HaloCatalog - the halos a rank keeps after a pass.
//!
//! A kept halo is a run of its membership chain: the chain head plus the
//! member count. Downstream consumers re-walk the chain to reach members.

use crate::chain::{ChainIter, HaloChains};
use crate::particles::ParticleSet;

/// Owner tag written for particles outside any kept halo.
pub const NO_HALO: i64 = -1;

/// A kept halo: chain head and member count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HaloRun {
  pub head: usize,
  pub size: usize,
}

/// Kept halos with a running member total.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidHalos {
  runs: Vec<HaloRun>,
  particle_count: usize,
}

impl ValidHalos {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, run: HaloRun) {
    self.particle_count += run.size;
    self.runs.push(run);
  }

  pub fn runs(&self) -> &[HaloRun] {
    &self.runs
  }

  /// Number of kept halos.
  pub fn len(&self) -> usize {
    self.runs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.runs.is_empty()
  }

  /// Particles across all kept halos.
  pub fn particle_count(&self) -> usize {
    self.particle_count
  }
}

/// Result of a pass on one rank.
#[derive(Clone, Debug)]
pub struct HaloCatalog {
  chains: HaloChains,
  halos: ValidHalos,
}

impl HaloCatalog {
  pub fn new(chains: HaloChains, halos: ValidHalos) -> Self {
    Self { chains, halos }
  }

  pub fn chains(&self) -> &HaloChains {
    &self.chains
  }

  pub fn halos(&self) -> &ValidHalos {
    &self.halos
  }

  /// Local indices of the members of `run`.
  pub fn members(&self, run: &HaloRun) -> ChainIter<'_> {
    self.chains.walk(Some(run.head))
  }

  /// Global tags of the members of `run`, ascending.
  pub fn member_tags(&self, run: &HaloRun, particles: &ParticleSet) -> Vec<i64> {
    let mut tags: Vec<i64> = self.members(run).map(|i| particles.tag[i]).collect();
    tags.sort_unstable();
    tags
  }

  /// Per-particle owner tag: the smallest global tag of the kept halo the
  /// particle belongs to, or [`NO_HALO`].
  pub fn owner_tags(&self, particles: &ParticleSet) -> Vec<i64> {
    let mut owners = vec![NO_HALO; particles.len()];
    for run in self.halos.runs() {
      let owner = self
        .members(run)
        .map(|i| particles.tag[i])
        .min()
        .unwrap_or(NO_HALO);
      for i in self.members(run) {
        owners[i] = owner;
      }
    }
    owners
  }

  /// Split into chains and halo list.
  pub fn into_parts(self) -> (HaloChains, ValidHalos) {
    (self.chains, self.halos)
  }
}
