use std::collections::BTreeSet;

use glam::Vec3;

use super::*;
use crate::catalog::NO_HALO;
use crate::collective::{run_local_world, LocalTransport};
use crate::decomposition::CartesianDecomposition;
use crate::test_utils::clustered_points;

/// Grid units equal physical units over a box of `size`.
fn config(size: f32, link: f32, pmin: usize, periodic: bool) -> FofConfig {
  FofConfig::default()
    .with_domain_size(size)
    .with_grid_resolution(size)
    .with_linking_length(link)
    .with_min_halo_size(pmin)
    .with_periodic(periodic)
}

fn particles_at(points: &[Vec3]) -> ParticleSet {
  let mut set = ParticleSet::new();
  for (i, &p) in points.iter().enumerate() {
    set.push_alive(p, i as i64);
  }
  set
}

fn halo_tag_sets(output: &PassOutput, particles: &ParticleSet) -> BTreeSet<Vec<i64>> {
  output
    .catalog
    .halos()
    .runs()
    .iter()
    .map(|run| output.catalog.member_tags(run, particles))
    .collect()
}

fn run_single(config: FofConfig, particles: &mut ParticleSet) -> PassOutput {
  let finder = HaloFinder::new(config, Topology::single()).unwrap();
  let comm = LocalTransport::world(1).pop().unwrap();
  finder.run(particles, &comm).unwrap()
}

/// Run every rank of `decomposition` and return per-rank output and final
/// particles.
fn run_world(
  decomposition: &CartesianDecomposition,
  config: &FofConfig,
  particles: &ParticleSet,
) -> Vec<(PassOutput, ParticleSet)> {
  let parts = decomposition.distribute(particles);
  run_local_world(decomposition.size(), |comm| {
    let rank = comm.rank();
    let topology = decomposition.topology(rank).unwrap();
    let finder = HaloFinder::new(config.clone(), topology).unwrap();
    let mut local = parts[rank].clone();
    let output = finder.run(&mut local, &comm).unwrap();
    (output, local)
  })
  .unwrap()
}

// =============================================================================
// Setup
// =============================================================================

#[test]
fn test_rejects_invalid_config() {
  let bad = FofConfig::default().with_linking_length(-1.0);
  assert_eq!(
    HaloFinder::new(bad, Topology::single()).unwrap_err(),
    ConfigError::InvalidLinkingLength(-1.0)
  );
  let bad = FofConfig::default().with_min_halo_size(0);
  assert!(HaloFinder::new(bad, Topology::single()).is_err());
}

#[test]
fn test_collective_must_match_topology() {
  let finder = HaloFinder::new(FofConfig::default(), Topology::single()).unwrap();
  let world = LocalTransport::world(2);
  let mut particles = ParticleSet::new();
  assert!(matches!(
    finder.run(&mut particles, &world[0]),
    Err(HaloError::Protocol(_))
  ));
}

#[test]
fn test_mixed_input_rejected() {
  let mut particles = particles_at(&[Vec3::ZERO]);
  particles.status[0] = ParticleStatus::Mixed;
  let finder = HaloFinder::new(FofConfig::default(), Topology::single()).unwrap();
  let comm = LocalTransport::world(1).pop().unwrap();
  assert!(matches!(
    finder.run(&mut particles, &comm),
    Err(HaloError::Protocol(_))
  ));
}

// =============================================================================
// Single rank
// =============================================================================

#[test]
fn test_line_example_end_to_end() {
  let xs = [0.0, 1.0, 2.0, 10.0, 11.0, 20.0, 21.0, 22.0, 23.0];
  let points: Vec<_> = xs.iter().map(|&x| Vec3::new(x, 5.0, 5.0)).collect();
  let mut particles = particles_at(&points);

  let output = run_single(config(100.0, 1.5, 2, true), &mut particles);

  let expected: BTreeSet<Vec<i64>> = [vec![0, 1, 2], vec![3, 4], vec![5, 6, 7, 8]]
    .into_iter()
    .collect();
  assert_eq!(halo_tag_sets(&output, &particles), expected);
  assert_eq!(output.stats.valid_halos, 3);
  assert_eq!(output.stats.halo_particles, 9);
  assert_eq!(output.stats.alive_halos, 3);
  assert_eq!(output.stats.mixed_halos, 0);
  assert_eq!(
    output.catalog.owner_tags(&particles),
    vec![0, 0, 0, 3, 3, 5, 5, 5, 5]
  );
}

/// Halos under `pmin` leave their particles without an owner.
#[test]
fn test_small_groups_unowned() {
  let points = [Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.5, 1.0, 1.0), Vec3::new(9.0, 9.0, 9.0)];
  let mut particles = particles_at(&points);
  let output = run_single(config(20.0, 1.0, 3, false), &mut particles);
  assert!(output.catalog.halos().is_empty());
  assert_eq!(output.catalog.owner_tags(&particles), vec![NO_HALO; 3]);
}

#[test]
fn test_empty_rank() {
  let mut particles = ParticleSet::new();
  let output = run_single(FofConfig::default(), &mut particles);
  assert!(output.catalog.halos().is_empty());
  assert_eq!(output.stats.particles, 0);
}

/// Physical positions are rescaled before linking.
#[test]
fn test_grid_scaling() {
  // 0.5 physical apart; grid scale 4 makes that 2.0 grid units
  let points = [Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.5, 1.0, 1.0)];
  let far = config(10.0, 1.0, 2, false).with_grid_resolution(40.0);
  let near = config(10.0, 1.0, 2, false);

  let mut particles = particles_at(&points);
  assert!(run_single(far, &mut particles).catalog.halos().is_empty());
  let mut particles = particles_at(&points);
  assert_eq!(run_single(near, &mut particles).catalog.halos().len(), 1);
}

#[test]
fn test_rerun_is_deterministic() {
  let cloud = clustered_points(17, 6, 30, 16.0);
  let points: Vec<Vec3> = (0..cloud.len()).map(|i| cloud.coords().point(i)).collect();
  let input = particles_at(&points);
  let config = config(16.0, 0.8, 5, true);

  let mut first = input.clone();
  let mut second = input.clone();
  let a = run_single(config.clone(), &mut first);
  let b = run_single(config, &mut second);

  assert!(!a.catalog.halos().is_empty());
  assert_eq!(halo_tag_sets(&a, &first), halo_tag_sets(&b, &second));
  assert_eq!(a.catalog.owner_tags(&first), b.catalog.owner_tags(&second));
  assert_eq!(first.status, second.status);
}

// =============================================================================
// Several ranks
// =============================================================================

/// A halo split across one face is kept by the low-side rank without any
/// arbitration.
#[test]
fn test_face_split_resolved_locally() {
  let decomposition = CartesianDecomposition::new([2, 1, 1], 8.0, 1.0).unwrap();
  let points = [
    Vec3::new(3.7, 4.0, 4.0),
    Vec3::new(3.9, 4.0, 4.0),
    Vec3::new(4.1, 4.0, 4.0),
    Vec3::new(4.3, 4.0, 4.0),
  ];
  let config = config(8.0, 0.3, 3, false);

  let results = run_world(&decomposition, &config, &particles_at(&points));

  let (out0, parts0) = &results[0];
  let (out1, parts1) = &results[1];
  assert_eq!(out0.stats.mixed_halos, 1);
  assert_eq!(out1.stats.mixed_halos, 1);
  assert_eq!(out0.stats.escalated + out1.stats.escalated, 0);
  assert_eq!(out0.stats.global_escalated, 0);

  let kept: BTreeSet<Vec<i64>> = [vec![0, 1, 2, 3]].into_iter().collect();
  assert_eq!(halo_tag_sets(out0, parts0), kept);
  assert!(out1.catalog.halos().is_empty());

  // The owner promotes its dead copies, the other side keeps them out
  assert_eq!(parts0.retained().count(), 4);
  assert_eq!(parts1.retained().count(), 0);
}

/// A halo on the corner of four ranks goes to arbitration and is kept once.
#[test]
fn test_corner_halo_arbitrated() {
  let decomposition = CartesianDecomposition::new([2, 2, 1], 8.0, 1.0).unwrap();
  let points = [
    Vec3::new(3.8, 3.8, 4.0),
    Vec3::new(4.2, 3.8, 4.0),
    Vec3::new(3.8, 4.2, 4.0),
    Vec3::new(4.2, 4.2, 4.0),
  ];
  let config = config(8.0, 0.6, 3, false);

  let results = run_world(&decomposition, &config, &particles_at(&points));

  for (output, _) in &results {
    assert_eq!(output.stats.mixed_halos, 1);
    assert_eq!(output.stats.escalated, 1);
    assert_eq!(output.stats.global_escalated, 1);
  }
  let owners: Vec<usize> = results
    .iter()
    .map(|(output, _)| output.catalog.halos().len())
    .collect();
  // Equal alive counts, so the lowest rank wins
  assert_eq!(owners, vec![1, 0, 0, 0]);

  let (out0, parts0) = &results[0];
  let kept: BTreeSet<Vec<i64>> = [vec![0, 1, 2, 3]].into_iter().collect();
  assert_eq!(halo_tag_sets(out0, parts0), kept);
}

#[test]
fn test_rank_without_particles_takes_part() {
  let decomposition = CartesianDecomposition::new([2, 1, 1], 8.0, 1.0).unwrap();
  let points = [
    Vec3::new(1.5, 4.0, 4.0),
    Vec3::new(1.7, 4.0, 4.0),
    Vec3::new(1.9, 4.0, 4.0),
  ];
  let config = config(8.0, 0.3, 3, false);

  let results = run_world(&decomposition, &config, &particles_at(&points));
  assert_eq!(results[0].0.catalog.halos().len(), 1);
  assert_eq!(results[1].0.stats.particles, 0);
  assert!(results[1].0.catalog.halos().is_empty());
}
