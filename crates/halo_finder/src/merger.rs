//! Recursive Friends-of-Friends merge over the k-d ordering.
//!
//! The recursion visits the same ranges as [`reorder`](crate::reorder): both
//! halves of a range are clustered first, then merged. A merge of two ranges
//! is skipped outright when their extents along the split axis are at least
//! one linking length apart; otherwise it descends into the four pairings of
//! their children until one side is a single particle, where pairs are
//! tested directly.
//!
//! With a minimum friend count the traversal runs twice: the first pass only
//! tallies close pairs per particle, the second links a pair only when both
//! endpoints reached the minimum. Sparse bridge particles are left out.

use crate::bounds::BoundsTable;
use crate::chain::HaloChains;
use crate::config::FofConfig;
use crate::reorder::{midpoint, reorder, Axis, Coords};

/// Distance rule shared by the merge and anything that wants to re-check a
/// pair: per-axis separations with optional minimum-image correction.
#[derive(Clone, Copy, Debug)]
pub struct LinkRule {
  link: f32,
  link_sq: f32,
  wrap: Option<f32>,
}

impl LinkRule {
  pub fn new(linking_length: f32, wrap: Option<f32>) -> Self {
    Self {
      link: linking_length,
      link_sq: linking_length * linking_length,
      wrap,
    }
  }

  pub fn from_config(config: &FofConfig) -> Self {
    Self::new(config.linking_length, config.wrap())
  }

  /// Separation along one axis, wrapped when periodic. Periodic inputs may
  /// lie outside `[0, np)`; the separation is folded back first.
  #[inline]
  fn axis_distance(&self, a: f32, b: f32) -> f32 {
    match self.wrap {
      Some(np) => {
        let d = (a - b).rem_euclid(np);
        d.min(np - d)
      }
      None => (a - b).abs(),
    }
  }

  /// True when `p` and `q` are strictly closer than the linking length.
  #[inline]
  pub fn are_friends(&self, coords: &Coords<'_>, p: usize, q: usize) -> bool {
    let mut dist_sq = 0.0;
    for axis in [Axis::X, Axis::Y, Axis::Z] {
      let column = coords.axis(axis);
      let d = self.axis_distance(column[p], column[q]);
      if d >= self.link {
        return false;
      }
      dist_sq += d * d;
    }
    dist_sq < self.link_sq
  }

  /// Gap between two extents on one axis; a negative gap means overlap.
  #[inline]
  fn gap(&self, lo_a: f32, hi_a: f32, lo_b: f32, hi_b: f32) -> f32 {
    let span = hi_a.max(hi_b) - lo_a.min(lo_b);
    let gap = span - (hi_a - lo_a) - (hi_b - lo_b);
    match self.wrap {
      Some(np) => gap.min(np - span),
      None => gap,
    }
  }
}

/// What a traversal does at its leaf blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
  /// Tally close pairs per particle, no unions.
  Count,
  /// Union close pairs.
  Link,
}

/// State of one clustering pass.
struct Merger<'a> {
  coords: Coords<'a>,
  seq: &'a [usize],
  bounds: &'a BoundsTable,
  rule: LinkRule,
  pass: Pass,
  /// Required friends per endpoint, with the tallies from a count pass.
  gate: Option<(usize, Vec<u32>)>,
  chains: HaloChains,
}

impl Merger<'_> {
  fn cluster(&mut self, first: usize, last: usize, axis: Axis) {
    if last - first <= 1 {
      return;
    }
    let mid = midpoint(first, last);
    self.cluster(first, mid, axis.next());
    self.cluster(mid, last, axis.next());
    self.merge(first, mid, mid, last, axis);
  }

  fn merge(&mut self, first1: usize, last1: usize, first2: usize, last2: usize, axis: Axis) {
    let len1 = last1 - first1;
    let len2 = last2 - first2;
    if len1 == 0 || len2 == 0 {
      return;
    }
    if len1 == 1 || len2 == 1 {
      match self.pass {
        Pass::Count => self.count_block(first1, last1, first2, last2),
        Pass::Link => self.link_block(first1, last1, first2, last2),
      }
      return;
    }

    let a = axis.index();
    let (lo1, hi1) = self.bounds.extent(first1, last1);
    let (lo2, hi2) = self.bounds.extent(first2, last2);
    if self.rule.gap(lo1[a], hi1[a], lo2[a], hi2[a]) >= self.rule.link {
      return;
    }

    let mid1 = midpoint(first1, last1);
    let mid2 = midpoint(first2, last2);
    let next = axis.next();
    self.merge(first1, mid1, first2, mid2, next);
    self.merge(first1, mid1, mid2, last2, next);
    self.merge(mid1, last1, first2, mid2, next);
    self.merge(mid1, last1, mid2, last2, next);
  }

  /// Test every pair of a leaf block and union the hits.
  fn link_block(&mut self, first1: usize, last1: usize, first2: usize, last2: usize) {
    for i in first1..last1 {
      for j in first2..last2 {
        let (p, q) = (self.seq[i], self.seq[j]);
        if self.chains.root(p) == self.chains.root(q) || !self.passes_gate(p, q) {
          continue;
        }
        if self.rule.are_friends(&self.coords, p, q) {
          self.chains.union(p, q);
        }
      }
    }
  }

  fn count_block(&mut self, first1: usize, last1: usize, first2: usize, last2: usize) {
    let Some((_, friends)) = self.gate.as_mut() else {
      return;
    };
    for i in first1..last1 {
      for j in first2..last2 {
        let (p, q) = (self.seq[i], self.seq[j]);
        if self.rule.are_friends(&self.coords, p, q) {
          friends[p] += 1;
          friends[q] += 1;
        }
      }
    }
  }

  #[inline]
  fn passes_gate(&self, p: usize, q: usize) -> bool {
    match &self.gate {
      Some((min_friends, friends)) => {
        friends[p] as usize >= *min_friends && friends[q] as usize >= *min_friends
      }
      None => true,
    }
  }
}

/// Cluster points already ordered by `seq` with extents in `bounds`.
pub fn merge_friends(
  coords: Coords<'_>,
  seq: &[usize],
  bounds: &BoundsTable,
  config: &FofConfig,
) -> HaloChains {
  let n = seq.len();
  let mut merger = Merger {
    coords,
    seq,
    bounds,
    rule: LinkRule::from_config(config),
    pass: Pass::Link,
    gate: None,
    chains: HaloChains::new(coords.len()),
  };
  if n <= 1 {
    return merger.chains;
  }

  if let Some(min_friends) = config.min_friend_count.filter(|&m| m > 1) {
    merger.gate = Some((min_friends, vec![0; coords.len()]));
    merger.pass = Pass::Count;
    merger.cluster(0, n, Axis::X);
    merger.pass = Pass::Link;
  }
  merger.cluster(0, n, Axis::X);
  merger.chains
}

/// Order, bound and cluster `coords` in one call.
pub fn find_friends(coords: Coords<'_>, config: &FofConfig) -> HaloChains {
  let seq = reorder(coords);
  let bounds = BoundsTable::build(&seq, coords);
  merge_friends(coords, &seq, &bounds, config)
}

#[cfg(test)]
#[path = "merger_test.rs"]
mod merger_test;
