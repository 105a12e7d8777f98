//! HaloFinder - one full Friends-of-Friends pass on one rank.
//!
//! Stages, in order:
//! 1. **Reorder**: k-d ordering of grid-scaled positions
//! 2. **Bounds**: extents of every subrange
//! 3. **Merge**: recursive FOF linking into membership chains
//! 4. **Collect**: alive-only halos kept, mixed halos recorded
//! 5. **Resolve**: local ownership rule
//! 6. **Arbitrate**: global tie-break over the collective (all ranks)
//! 7. **Apply**: kept mixed halos promoted into the catalog

use tracing::{debug, info, info_span};
use web_time::Instant;

use crate::applier::apply_verdicts;
use crate::arbiter::arbitrate;
use crate::bounds::BoundsTable;
use crate::catalog::HaloCatalog;
use crate::chain::HaloChains;
use crate::collective::Collective;
use crate::collector::collect_halos;
use crate::config::FofConfig;
use crate::error::{ConfigError, HaloError, Result};
use crate::merger::merge_friends;
use crate::particles::{ParticleSet, ParticleStatus};
use crate::reorder::{reorder, Coords};
use crate::resolution::resolve_locally;
use crate::topology::Topology;

/// Counts and per-stage wall time of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
  /// Particles on this rank, dead copies included.
  pub particles: usize,
  /// Particles owned by this rank on entry.
  pub alive_particles: usize,
  pub alive_halos: usize,
  pub dead_halos: usize,
  pub mixed_halos: usize,
  /// Mixed halos left for the arbiter by the local rule.
  pub escalated: usize,
  /// Largest escalated count on any rank.
  pub global_escalated: u64,
  /// Halos in the final catalog.
  pub valid_halos: usize,
  /// Particles in the final catalog's halos.
  pub halo_particles: usize,

  pub reorder_us: u64,
  pub bounds_us: u64,
  pub merge_us: u64,
  pub collect_us: u64,
  pub resolve_us: u64,
  pub arbitrate_us: u64,
  pub apply_us: u64,
  pub total_us: u64,
}

/// Result of [`HaloFinder::run`].
#[derive(Debug, Clone)]
pub struct PassOutput {
  pub catalog: HaloCatalog,
  pub stats: PassStats,
}

/// Validated configuration plus this rank's place in the grid.
#[derive(Clone, Debug)]
pub struct HaloFinder {
  config: FofConfig,
  topology: Topology,
}

impl HaloFinder {
  pub fn new(config: FofConfig, topology: Topology) -> Result<Self, ConfigError> {
    config.validate()?;
    Ok(Self { config, topology })
  }

  pub fn config(&self) -> &FofConfig {
    &self.config
  }

  pub fn topology(&self) -> &Topology {
    &self.topology
  }

  /// Local clustering only: membership chains over every particle.
  pub fn cluster(&self, particles: &ParticleSet) -> HaloChains {
    let columns = particles.grid_positions(self.config.grid_scale());
    let coords = Coords::from_columns(&columns);
    let seq = reorder(coords);
    let bounds = BoundsTable::build(&seq, coords);
    merge_friends(coords, &seq, &bounds, &self.config)
  }

  /// Run the full pass. Every rank of `comm` must call this together.
  ///
  /// On return, statuses are final: members of kept halos and untouched
  /// owned particles are `Alive`, ceded mixed halos stay `Mixed` and dead
  /// copies outside kept halos stay `Dead`.
  #[tracing::instrument(skip_all, name = "finder::run", fields(rank = self.topology.rank()))]
  pub fn run<C: Collective>(&self, particles: &mut ParticleSet, comm: &C) -> Result<PassOutput> {
    if comm.rank() != self.topology.rank() || comm.size() != self.topology.size() {
      return Err(HaloError::Protocol(format!(
        "collective is rank {} of {}, topology says {} of {}",
        comm.rank(),
        comm.size(),
        self.topology.rank(),
        self.topology.size()
      )));
    }
    if let Some(i) = particles
      .status
      .iter()
      .position(|s| *s == ParticleStatus::Mixed)
    {
      return Err(HaloError::Protocol(format!(
        "particle {} entered the pass already mixed",
        i
      )));
    }

    let start = Instant::now();
    let pmin = self.config.min_halo_size;
    let mut stats = PassStats {
      particles: particles.len(),
      alive_particles: particles.alive_count(),
      ..Default::default()
    };

    // Stages 1-3: clustering
    let chains = {
      let columns = particles.grid_positions(self.config.grid_scale());
      let coords = Coords::from_columns(&columns);

      let seq = {
        let _span = info_span!("reorder").entered();
        let t = Instant::now();
        let seq = reorder(coords);
        stats.reorder_us = t.elapsed().as_micros() as u64;
        seq
      };

      let bounds = {
        let _span = info_span!("bounds").entered();
        let t = Instant::now();
        let bounds = BoundsTable::build(&seq, coords);
        stats.bounds_us = t.elapsed().as_micros() as u64;
        bounds
      };

      let _span = info_span!("merge").entered();
      let t = Instant::now();
      let chains = merge_friends(coords, &seq, &bounds, &self.config);
      stats.merge_us = t.elapsed().as_micros() as u64;
      chains
    };

    // Stage 4: collect
    let mut collection = {
      let _span = info_span!("collect").entered();
      let t = Instant::now();
      let collection = collect_halos(&chains, &mut particles.status, &particles.tag, pmin);
      stats.collect_us = t.elapsed().as_micros() as u64;
      collection
    };
    stats.alive_halos = collection.counts.alive;
    stats.dead_halos = collection.counts.dead;
    stats.mixed_halos = collection.counts.mixed;
    debug!(
      alive = collection.counts.alive,
      dead = collection.counts.dead,
      mixed = collection.counts.mixed,
      "halos collected"
    );

    // Stage 5: local rule
    {
      let _span = info_span!("resolve").entered();
      let t = Instant::now();
      let local = resolve_locally(&mut collection.mixed, &self.topology);
      stats.escalated = local.unmarked;
      stats.resolve_us = t.elapsed().as_micros() as u64;
      debug!(
        valid = local.valid,
        invalid = local.invalid,
        unmarked = local.unmarked,
        "local rule applied"
      );
    }

    // Stage 6: arbitration, collective
    {
      let t = Instant::now();
      let summary = arbitrate(&mut collection.mixed, pmin, comm)?;
      stats.global_escalated = summary.global_max;
      stats.arbitrate_us = t.elapsed().as_micros() as u64;
    }

    // Stage 7: apply
    let mut valid = collection.valid;
    {
      let _span = info_span!("apply").entered();
      let t = Instant::now();
      apply_verdicts(&collection.mixed, &chains, &mut particles.status, &mut valid)?;
      stats.apply_us = t.elapsed().as_micros() as u64;
    }

    stats.valid_halos = valid.len();
    stats.halo_particles = valid.particle_count();
    stats.total_us = start.elapsed().as_micros() as u64;

    info!(
      particles = stats.particles,
      valid_halos = stats.valid_halos,
      halo_particles = stats.halo_particles,
      escalated = stats.escalated,
      total_us = stats.total_us,
      "halo pass complete"
    );

    Ok(PassOutput {
      catalog: HaloCatalog::new(chains, valid),
      stats,
    })
  }
}

#[cfg(test)]
#[path = "finder_test.rs"]
mod finder_test;
