//! halo_finder - Distributed Friends-of-Friends halo finding
//!
//! This crate groups N-body particles into halos: connected clusters in
//! which every member lies within one linking length of another member.
//! Particles are split across ranks, each holding its own particles plus
//! copies of its neighbors' particles near the shared faces (the dead zone).
//! Every rank clusters locally, then the ranks agree on a single owner for
//! each halo that straddles a boundary.
//!
//! # Features
//!
//! - **k-d ordering**: balanced median partition cycling x, y, z
//! - **Pruned merge**: recursive linking that skips subranges whose extents
//!   are a linking length apart, with optional periodic wraparound
//! - **Local ownership rule**: halos shared with one neighbor are settled
//!   without communication
//! - **Global arbitration**: halos touching several ranks are matched by
//!   tag fingerprint on a master rank, which broadcasts one owner each
//! - **Local worlds**: in-process ranks over channels for tests and tools
//!
//! # Example
//!
//! ```ignore
//! use halo_finder::{run_local_world, CartesianDecomposition, Collective, FofConfig, HaloFinder};
//!
//! let decomposition = CartesianDecomposition::new([2, 2, 2], 64.0, 2.0)?;
//! let ranks = decomposition.distribute(&snapshot);
//! let config = FofConfig::default()
//!     .with_domain_size(64.0)
//!     .with_grid_resolution(64.0)
//!     .with_periodic(false);
//!
//! let outputs = run_local_world(decomposition.size(), |comm| {
//!     let topology = decomposition.topology(comm.rank())?;
//!     let finder = HaloFinder::new(config.clone(), topology)?;
//!     let mut particles = ranks[comm.rank()].clone();
//!     finder.run(&mut particles, &comm)
//! })?;
//! ```

pub mod error;
pub use error::{ConfigError, HaloError, Result, TransportError};

// Configuration and rank layout
pub mod config;
pub mod decomposition;
pub mod topology;
pub use config::FofConfig;
pub use decomposition::CartesianDecomposition;
pub use topology::{NeighborZone, Topology, ZoneSet, NUM_ZONES};

// Particle storage
pub mod particles;
pub use particles::{ParticleSet, ParticleStatus};

// Local clustering
pub mod bounds;
pub mod chain;
pub mod merger;
pub mod reorder;
pub use bounds::BoundsTable;
pub use chain::{ChainIter, HaloChains};
pub use merger::{find_friends, merge_friends, LinkRule};
pub use reorder::{reorder, Axis, Coords};

// Halo classification and ownership
pub mod applier;
pub mod arbiter;
pub mod catalog;
pub mod collector;
pub mod record;
pub mod resolution;
pub use applier::{apply_verdicts, ApplySummary};
pub use arbiter::{arbitrate, ArbiterSummary, DirectoryEntry, GlobalHaloDirectory, MASTER};
pub use catalog::{HaloCatalog, HaloRun, ValidHalos, NO_HALO};
pub use collector::{collect_halos, Collection, HaloCounts};
pub use record::{CosmoHaloRecord, Validity};
pub use resolution::{local_verdict, resolve_locally, LocalSummary};

// Collectives between ranks
pub mod collective;
pub use collective::{run_local_world, Collective, LocalTransport};

// Full pass
pub mod finder;
pub use finder::{HaloFinder, PassOutput, PassStats};

#[cfg(test)]
mod test_utils;
