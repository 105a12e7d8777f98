//! Configuration parsing for halo finding runs.

use anyhow::{Context, Result};
use halo_finder::{CartesianDecomposition, FofConfig};
use serde::Deserialize;
use std::path::Path;

/// Root configuration for a run.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Clustering parameters.
	pub fof: FofSection,
	/// Process grid and dead-zone width.
	pub decomposition: DecompositionSection,
	/// Snapshot generator.
	pub synthetic: SyntheticSection,
}

/// Friends-of-Friends parameters.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FofSection {
	/// Physical box size.
	pub domain_size: f32,
	/// Particles per dimension; positions are scaled to this many grid units.
	pub grid_resolution: f32,
	/// Linking length in grid units.
	pub linking_length: f32,
	/// Smallest halo reported.
	pub min_halo_size: usize,
	/// Friends a particle needs before it may link (optional).
	pub min_friend_count: Option<usize>,
}

/// Process grid.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DecompositionSection {
	/// Ranks along x, y and z.
	pub dims: [usize; 3],
	/// Dead-zone width in physical units.
	pub dead_size: f32,
}

/// Synthetic snapshot: compact clusters over a uniform background.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyntheticSection {
	pub seed: u64,
	/// Number of clusters.
	pub clusters: usize,
	pub particles_per_cluster: usize,
	/// Cluster radius in physical units.
	pub cluster_radius: f32,
	/// Uniform background particles.
	pub background: usize,
}

impl Default for FofSection {
	fn default() -> Self {
		Self {
			domain_size: 64.0,
			grid_resolution: 64.0,
			linking_length: 0.4,
			min_halo_size: 10,
			min_friend_count: None,
		}
	}
}

impl Default for DecompositionSection {
	fn default() -> Self {
		Self {
			dims: [2, 2, 2],
			dead_size: 4.0,
		}
	}
}

impl Default for SyntheticSection {
	fn default() -> Self {
		Self {
			seed: 42,
			clusters: 64,
			particles_per_cluster: 200,
			cluster_radius: 1.0,
			background: 20_000,
		}
	}
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::parse(&content)
	}

	/// Parse and check configuration from TOML text.
	pub fn parse(content: &str) -> Result<Self> {
		let config: Config = toml::from_str(content).with_context(|| "Failed to parse config TOML")?;
		config.check()?;
		Ok(config)
	}

	/// Reject values no run can use.
	pub fn check(&self) -> Result<()> {
		let synthetic = &self.synthetic;
		if synthetic.clusters > 0 && synthetic.particles_per_cluster == 0 {
			anyhow::bail!("particles_per_cluster must be positive when clusters are requested");
		}
		if !(synthetic.cluster_radius.is_finite() && synthetic.cluster_radius > 0.0) {
			anyhow::bail!(
				"cluster_radius must be positive, got {}",
				synthetic.cluster_radius
			);
		}
		if synthetic.cluster_radius >= self.decomposition.dead_size {
			log::warn!(
				"cluster_radius {} is not below dead_size {}; halos may be split between ranks",
				synthetic.cluster_radius,
				self.decomposition.dead_size
			);
		}
		self.fof_config(1)
			.validate()
			.context("Invalid [fof] section")?;
		self.decomposition().context("Invalid [decomposition] section")?;
		Ok(())
	}

	/// Clustering parameters for a world of `ranks`. A lone rank wraps
	/// periodically itself; several ranks get periodic images as dead copies.
	pub fn fof_config(&self, ranks: usize) -> FofConfig {
		FofConfig::default()
			.with_domain_size(self.fof.domain_size)
			.with_grid_resolution(self.fof.grid_resolution)
			.with_linking_length(self.fof.linking_length)
			.with_min_halo_size(self.fof.min_halo_size)
			.with_min_friend_count(self.fof.min_friend_count)
			.with_periodic(ranks == 1)
	}

	pub fn decomposition(&self) -> Result<CartesianDecomposition> {
		Ok(CartesianDecomposition::new(
			self.decomposition.dims,
			self.fof.domain_size,
			self.decomposition.dead_size,
		)?)
	}
}
