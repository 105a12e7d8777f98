//! Per-subtree axis extents used to prune merges.

use glam::Vec3;

use crate::reorder::{midpoint, Coords};

/// Lower/upper corner of every subtree of a `seq` ordering, stored at the
/// subtree's midpoint.
///
/// Every range of length two or more that the recursion can visit has an
/// entry. Built once per ordering and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct BoundsTable {
  lower: Vec<Vec3>,
  upper: Vec<Vec3>,
}

impl BoundsTable {
  /// Compute extents bottom-up over the ranges of `seq`.
  pub fn build(seq: &[usize], coords: Coords<'_>) -> Self {
    let n = seq.len();
    let mut table = Self {
      lower: vec![Vec3::ZERO; n],
      upper: vec![Vec3::ZERO; n],
    };
    if n > 0 {
      table.compute(seq, coords, 0, n);
    }
    table
  }

  fn compute(&mut self, seq: &[usize], coords: Coords<'_>, first: usize, last: usize) {
    let len = last - first;
    let mid = midpoint(first, last);

    if len <= 2 {
      self.store_direct(seq, coords, first, last);
      return;
    }
    if len == 3 {
      // The right child has length two and can still be merged against
      // larger ranges, so it needs its own slot.
      self.store_direct(seq, coords, first, last);
      self.store_direct(seq, coords, mid, last);
      return;
    }

    self.compute(seq, coords, first, mid);
    self.compute(seq, coords, mid, last);

    let left = midpoint(first, mid);
    let right = midpoint(mid, last);
    self.lower[mid] = self.lower[left].min(self.lower[right]);
    self.upper[mid] = self.upper[left].max(self.upper[right]);
  }

  fn store_direct(&mut self, seq: &[usize], coords: Coords<'_>, first: usize, last: usize) {
    let mut lo = Vec3::splat(f32::INFINITY);
    let mut hi = Vec3::splat(f32::NEG_INFINITY);
    for &i in &seq[first..last] {
      let p = coords.point(i);
      lo = lo.min(p);
      hi = hi.max(p);
    }
    let mid = midpoint(first, last);
    self.lower[mid] = lo;
    self.upper[mid] = hi;
  }

  /// Extents of the subtree `[first, last)`.
  #[inline]
  pub fn extent(&self, first: usize, last: usize) -> (Vec3, Vec3) {
    let mid = midpoint(first, last);
    (self.lower[mid], self.upper[mid])
  }

  pub fn len(&self) -> usize {
    self.lower.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lower.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::reorder::reorder;
  use crate::test_utils::{uniform_points, Points};

  /// Walk every range with length >= 2 and check coverage and tightness.
  fn check_range(table: &BoundsTable, seq: &[usize], coords: Coords<'_>, first: usize, last: usize) {
    if last - first < 2 {
      return;
    }
    let (lo, hi) = table.extent(first, last);
    let mut tight_lo = Vec3::splat(f32::INFINITY);
    let mut tight_hi = Vec3::splat(f32::NEG_INFINITY);
    for &i in &seq[first..last] {
      let p = coords.point(i);
      assert!(
        p.cmpge(lo).all() && p.cmple(hi).all(),
        "point {} outside bounds of {}..{}",
        i,
        first,
        last
      );
      tight_lo = tight_lo.min(p);
      tight_hi = tight_hi.max(p);
    }
    assert_eq!((lo, hi), (tight_lo, tight_hi), "range {}..{}", first, last);

    let mid = midpoint(first, last);
    check_range(table, seq, coords, first, mid);
    check_range(table, seq, coords, mid, last);
  }

  #[test]
  fn test_bounds_cover_every_subtree() {
    for n in [2, 3, 4, 5, 6, 7, 11, 64, 100, 129] {
      let points = uniform_points(100 + n as u64, n, 20.0);
      let seq = reorder(points.coords());
      let table = BoundsTable::build(&seq, points.coords());
      check_range(&table, &seq, points.coords(), 0, n);
    }
  }

  #[test]
  fn test_empty() {
    let points = Points::on_line(&[]);
    let table = BoundsTable::build(&[], points.coords());
    assert!(table.is_empty());
  }

  #[test]
  fn test_single_point_stores_itself() {
    let points = Points::on_line(&[4.0]);
    let table = BoundsTable::build(&[0], points.coords());
    assert_eq!(
      table.extent(0, 1),
      (Vec3::new(4.0, 0.0, 0.0), Vec3::new(4.0, 0.0, 0.0))
    );
  }
}
