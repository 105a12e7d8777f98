//! Distributed halo finding over in-process ranks.
//!
//! Generates a seeded synthetic snapshot, splits it over a Cartesian grid of
//! ranks with dead-zone copies, runs one Friends-of-Friends pass per rank on
//! a local world and reports what every rank kept.

mod config;
mod synthetic;

use anyhow::{Context, Result};
use clap::Parser;
use halo_finder::{run_local_world, Collective, HaloFinder, PassOutput};
use std::path::PathBuf;

use config::Config;

/// Distributed Friends-of-Friends halo finder.
#[derive(Parser, Debug)]
#[command(name = "find_halos")]
#[command(about = "Finds halos in a synthetic snapshot split over in-process ranks")]
struct Args {
	/// Path to configuration TOML file (defaults apply when omitted).
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Ranks along x (overrides the config).
	#[arg(long)]
	ranks_x: Option<usize>,

	/// Ranks along y (overrides the config).
	#[arg(long)]
	ranks_y: Option<usize>,

	/// Ranks along z (overrides the config).
	#[arg(long)]
	ranks_z: Option<usize>,

	/// Snapshot seed (overrides the config).
	#[arg(long)]
	seed: Option<u64>,

	/// Number of largest halos to list.
	#[arg(long, default_value_t = 10)]
	top: usize,
}

fn main() -> Result<()> {
	env_logger::init();
	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => {
			log::info!("Loading config from: {}", path.display());
			Config::load(path)?
		}
		None => Config::default(),
	};
	for (axis, value) in [args.ranks_x, args.ranks_y, args.ranks_z].into_iter().enumerate() {
		if let Some(ranks) = value {
			config.decomposition.dims[axis] = ranks;
		}
	}
	if let Some(seed) = args.seed {
		config.synthetic.seed = seed;
	}
	config.check()?;

	let decomposition = config.decomposition()?;
	let ranks = decomposition.size();
	let fof = config.fof_config(ranks);

	let snapshot = synthetic::generate(&config.synthetic, config.fof.domain_size);
	let parts = decomposition.distribute(&snapshot);
	println!(
		"Snapshot: {} particles, {} ranks ({}x{}x{}), dead zone {}",
		snapshot.len(),
		ranks,
		decomposition.dims()[0],
		decomposition.dims()[1],
		decomposition.dims()[2],
		decomposition.dead_size()
	);

	let results = run_local_world(ranks, |comm| -> Result<PassOutput> {
		let rank = comm.rank();
		let topology = decomposition.topology(rank)?;
		let finder = HaloFinder::new(fof.clone(), topology)?;
		let mut particles = parts[rank].clone();
		finder
			.run(&mut particles, &comm)
			.with_context(|| format!("Halo pass failed on rank {}", rank))
	})
	.context("Failed to start local world")?;

	println!(
		"\n{:>5} {:>10} {:>7} {:>7} {:>7} {:>9} {:>7} {:>10} {:>10}",
		"rank", "particles", "alive", "dead", "mixed", "escalated", "kept", "in halos", "total µs"
	);

	let mut all_sizes = Vec::new();
	let mut kept_total = 0;
	let mut members_total = 0;
	for (rank, result) in results.into_iter().enumerate() {
		let output = result?;
		let stats = output.stats;
		println!(
			"{:>5} {:>10} {:>7} {:>7} {:>7} {:>9} {:>7} {:>10} {:>10}",
			rank,
			stats.particles,
			stats.alive_halos,
			stats.dead_halos,
			stats.mixed_halos,
			stats.escalated,
			stats.valid_halos,
			stats.halo_particles,
			stats.total_us
		);
		log::debug!(
			"rank {} stages µs: reorder {} bounds {} merge {} collect {} resolve {} arbitrate {} apply {}",
			rank,
			stats.reorder_us,
			stats.bounds_us,
			stats.merge_us,
			stats.collect_us,
			stats.resolve_us,
			stats.arbitrate_us,
			stats.apply_us
		);
		kept_total += stats.valid_halos;
		members_total += stats.halo_particles;
		all_sizes.extend(output.catalog.halos().runs().iter().map(|run| run.size));
	}

	println!("\nHalos kept: {} ({} particles)", kept_total, members_total);
	all_sizes.sort_unstable_by(|a, b| b.cmp(a));
	if !all_sizes.is_empty() && args.top > 0 {
		let shown: Vec<String> = all_sizes.iter().take(args.top).map(|s| s.to_string()).collect();
		println!("Largest: {}", shown.join(", "));
	}

	Ok(())
}
