//! Shared fixtures for the distributed pass tests.

use std::collections::BTreeMap;

use glam::Vec3;
use halo_finder::{
  run_local_world, CartesianDecomposition, Collective, FofConfig, HaloFinder, ParticleSet,
  PassOutput,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const DOMAIN: f32 = 32.0;
pub const LINK: f32 = 0.5;
pub const PMIN: usize = 8;
pub const DEAD: f32 = 3.0;

/// Compact clusters at `centers` plus a sparse uniform background.
pub fn snapshot(seed: u64, centers: &[Vec3], per_cluster: usize, background: usize) -> ParticleSet {
  let mut rng = ChaCha8Rng::seed_from_u64(seed);
  let mut particles = ParticleSet::new();
  let mut tag = 0;
  for &center in centers {
    for _ in 0..per_cluster {
      let jitter = Vec3::new(
        rng.random_range(-0.4..0.4),
        rng.random_range(-0.4..0.4),
        rng.random_range(-0.4..0.4),
      );
      particles.push_alive((center + jitter).rem_euclid(Vec3::splat(DOMAIN)), tag);
      tag += 1;
    }
  }
  for _ in 0..background {
    let p = Vec3::new(
      rng.random_range(0.0..DOMAIN),
      rng.random_range(0.0..DOMAIN),
      rng.random_range(0.0..DOMAIN),
    );
    particles.push_alive(p, tag);
    tag += 1;
  }
  particles
}

/// `count` particles stepping `step` along `direction` through `center`,
/// offset by half a step so none sits exactly on `center`.
pub fn segment(center: Vec3, direction: Vec3, step: f32, count: usize) -> ParticleSet {
  let mut particles = ParticleSet::new();
  let first = -(count as f32 / 2.0) + 0.25;
  for i in 0..count {
    let t = (first + i as f32) * step;
    particles.push_alive(center + direction * t, i as i64);
  }
  particles
}

/// Random cluster centers anywhere in the box.
pub fn random_centers(seed: u64, count: usize) -> Vec<Vec3> {
  let mut rng = ChaCha8Rng::seed_from_u64(seed);
  (0..count)
    .map(|_| {
      Vec3::new(
        rng.random_range(0.0..DOMAIN),
        rng.random_range(0.0..DOMAIN),
        rng.random_range(0.0..DOMAIN),
      )
    })
    .collect()
}

/// Periodic O(N²) FOF over the whole snapshot: sorted tag lists of every
/// group with at least `PMIN` members, sorted.
pub fn global_halos(particles: &ParticleSet) -> Vec<Vec<i64>> {
  let n = particles.len();
  let mut label: Vec<usize> = (0..n).collect();

  fn find(label: &mut [usize], mut x: usize) -> usize {
    while label[x] != x {
      label[x] = label[label[x]];
      x = label[x];
    }
    x
  }

  for i in 0..n {
    for j in (i + 1)..n {
      let mut d = (particles.position(i) - particles.position(j)).abs();
      d = d.min(Vec3::splat(DOMAIN) - d);
      if d.cmplt(Vec3::splat(LINK)).all() && d.length_squared() < LINK * LINK {
        let (a, b) = (find(&mut label, i), find(&mut label, j));
        if a != b {
          label[a.max(b)] = a.min(b);
        }
      }
    }
  }

  let mut groups: BTreeMap<usize, Vec<i64>> = BTreeMap::new();
  for i in 0..n {
    let root = find(&mut label, i);
    groups.entry(root).or_default().push(particles.tag[i]);
  }
  let mut halos: Vec<Vec<i64>> = groups
    .into_values()
    .filter(|g| g.len() >= PMIN)
    .map(|mut g| {
      g.sort_unstable();
      g
    })
    .collect();
  halos.sort();
  halos
}

pub fn config_for(ranks: usize) -> FofConfig {
  FofConfig::default()
    .with_domain_size(DOMAIN)
    .with_grid_resolution(DOMAIN)
    .with_linking_length(LINK)
    .with_min_halo_size(PMIN)
    .with_periodic(ranks == 1)
}

/// Run a full pass on every rank of a `dims` grid.
pub fn run_distributed(dims: [usize; 3], particles: &ParticleSet) -> Vec<(PassOutput, ParticleSet)> {
  let decomposition = CartesianDecomposition::new(dims, DOMAIN, DEAD).unwrap();
  let parts = decomposition.distribute(particles);
  let config = config_for(decomposition.size());

  run_local_world(decomposition.size(), |comm| {
    let topology = decomposition.topology(comm.rank()).unwrap();
    let finder = HaloFinder::new(config.clone(), topology).unwrap();
    let mut local = parts[comm.rank()].clone();
    let output = finder.run(&mut local, &comm).unwrap();
    (output, local)
  })
  .unwrap()
}

/// Every kept halo across all ranks as sorted tag lists, sorted. A halo
/// kept twice shows up twice.
pub fn kept_halos(results: &[(PassOutput, ParticleSet)]) -> Vec<Vec<i64>> {
  let mut halos: Vec<Vec<i64>> = results
    .iter()
    .flat_map(|(output, particles)| {
      output
        .catalog
        .halos()
        .runs()
        .iter()
        .map(move |run| output.catalog.member_tags(run, particles))
    })
    .collect();
  halos.sort();
  halos
}
