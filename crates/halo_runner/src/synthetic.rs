//! Seeded synthetic snapshots: compact clusters over a uniform background.

use glam::Vec3;
use halo_finder::{ParticleSet, ParticleStatus};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::SyntheticSection;

/// Build a snapshot in `[0, domain_size)^3`. Tags run from 0 in creation
/// order, cluster members first.
pub fn generate(params: &SyntheticSection, domain_size: f32) -> ParticleSet {
	let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
	let total = params.clusters * params.particles_per_cluster + params.background;
	let mut particles = ParticleSet::with_capacity(total);
	let domain = Vec3::splat(domain_size);
	let mut tag = 0i64;

	for _ in 0..params.clusters {
		let center = random_point(&mut rng, domain_size);
		let bulk = random_velocity(&mut rng, 1.0);
		for _ in 0..params.particles_per_cluster {
			let offset = random_in_ball(&mut rng) * params.cluster_radius;
			let velocity = bulk + random_velocity(&mut rng, 0.1);
			particles.push(
				wrap(center + offset, domain),
				velocity,
				tag,
				ParticleStatus::Alive,
			);
			tag += 1;
		}
	}

	for _ in 0..params.background {
		let position = random_point(&mut rng, domain_size);
		let velocity = random_velocity(&mut rng, 1.0);
		particles.push(position, velocity, tag, ParticleStatus::Alive);
		tag += 1;
	}

	particles
}

/// Periodic wrap into `[0, domain)`; rounding can land exactly on `domain`.
fn wrap(p: Vec3, domain: Vec3) -> Vec3 {
	let w = p.rem_euclid(domain);
	Vec3::select(w.cmpge(domain), Vec3::ZERO, w)
}

fn random_point(rng: &mut ChaCha8Rng, extent: f32) -> Vec3 {
	Vec3::new(
		rng.random_range(0.0..extent),
		rng.random_range(0.0..extent),
		rng.random_range(0.0..extent),
	)
}

fn random_velocity(rng: &mut ChaCha8Rng, scale: f32) -> Vec3 {
	Vec3::new(
		rng.random_range(-scale..scale),
		rng.random_range(-scale..scale),
		rng.random_range(-scale..scale),
	)
}

/// Uniform point in the unit ball, by rejection.
fn random_in_ball(rng: &mut ChaCha8Rng) -> Vec3 {
	loop {
		let p = random_velocity(rng, 1.0);
		if p.length_squared() <= 1.0 {
			return p;
		}
	}
}
