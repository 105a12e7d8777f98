//! Test utilities: seeded point sets and a brute-force FOF oracle.

use std::collections::BTreeSet;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::chain::HaloChains;
use crate::reorder::Coords;

/// Owned coordinate columns for building `Coords`.
pub struct Points {
  pub columns: [Vec<f32>; 3],
}

impl Points {
  pub fn from_vec3(points: &[Vec3]) -> Self {
    Self {
      columns: [
        points.iter().map(|p| p.x).collect(),
        points.iter().map(|p| p.y).collect(),
        points.iter().map(|p| p.z).collect(),
      ],
    }
  }

  /// Points along the x axis.
  pub fn on_line(xs: &[f32]) -> Self {
    let points: Vec<_> = xs.iter().map(|&x| Vec3::new(x, 0.0, 0.0)).collect();
    Self::from_vec3(&points)
  }

  pub fn coords(&self) -> Coords<'_> {
    Coords::from_columns(&self.columns)
  }

  pub fn len(&self) -> usize {
    self.columns[0].len()
  }
}

/// Uniform points in `[0, extent)^3`.
pub fn uniform_points(seed: u64, count: usize, extent: f32) -> Points {
  let mut rng = ChaCha8Rng::seed_from_u64(seed);
  let points: Vec<Vec3> = (0..count)
    .map(|_| {
      Vec3::new(
        rng.random_range(0.0..extent),
        rng.random_range(0.0..extent),
        rng.random_range(0.0..extent),
      )
    })
    .collect();
  Points::from_vec3(&points)
}

/// Tight blobs around random centers plus uniform background.
pub fn clustered_points(seed: u64, clusters: usize, per_cluster: usize, extent: f32) -> Points {
  let mut rng = ChaCha8Rng::seed_from_u64(seed);
  let mut points = Vec::new();
  for _ in 0..clusters {
    let center = Vec3::new(
      rng.random_range(0.0..extent),
      rng.random_range(0.0..extent),
      rng.random_range(0.0..extent),
    );
    for _ in 0..per_cluster {
      let jitter = Vec3::new(
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
      );
      let p = (center + jitter).rem_euclid(Vec3::splat(extent));
      points.push(p);
    }
  }
  for _ in 0..clusters * 2 {
    points.push(Vec3::new(
      rng.random_range(0.0..extent),
      rng.random_range(0.0..extent),
      rng.random_range(0.0..extent),
    ));
  }
  Points::from_vec3(&points)
}

/// O(N²) reference clustering with the same distance rule as the merger.
pub fn brute_force_groups(coords: Coords<'_>, link: f32, wrap: Option<f32>) -> Vec<BTreeSet<usize>> {
  let n = coords.len();
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
      if within(coords.point(i), coords.point(j), link, wrap) {
        let (a, b) = (find(&mut label, i), find(&mut label, j));
        if a != b {
          label[a.max(b)] = a.min(b);
        }
      }
    }
  }

  let mut groups: std::collections::BTreeMap<usize, BTreeSet<usize>> = Default::default();
  for i in 0..n {
    let root = find(&mut label, i);
    groups.entry(root).or_default().insert(i);
  }
  groups.into_values().collect()
}

fn within(a: Vec3, b: Vec3, link: f32, wrap: Option<f32>) -> bool {
  let mut d = (a - b).abs();
  if let Some(np) = wrap {
    d = d.min(Vec3::splat(np) - d);
  }
  d.cmplt(Vec3::splat(link)).all() && d.length_squared() < link * link
}

/// Chains as a canonical set of groups, independent of labels.
pub fn chain_groups(chains: &HaloChains) -> BTreeSet<BTreeSet<usize>> {
  chains
    .roots()
    .map(|root| chains.members(root).collect())
    .collect()
}
