//! Balanced k-d ordering of particle indices.
//!
//! The particle arrays never move. Instead `seq` is permuted so that every
//! range `[first, last)` visited by the recursion below is one subtree: the
//! range is split at `first + len / 2` around the median on the current axis,
//! and the axis cycles x → y → z for the children. Bounds and merging walk
//! exactly the same ranges, so a subtree is identified by its midpoint.

use glam::Vec3;

/// Split axis of a recursion level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
  X,
  Y,
  Z,
}

impl Axis {
  /// Axis used one level further down.
  #[inline]
  pub fn next(self) -> Self {
    match self {
      Axis::X => Axis::Y,
      Axis::Y => Axis::Z,
      Axis::Z => Axis::X,
    }
  }

  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }
}

/// Borrowed coordinate columns, in grid units.
#[derive(Clone, Copy, Debug)]
pub struct Coords<'a> {
  axes: [&'a [f32]; 3],
}

impl<'a> Coords<'a> {
  pub fn new(x: &'a [f32], y: &'a [f32], z: &'a [f32]) -> Self {
    debug_assert!(
      x.len() == y.len() && y.len() == z.len(),
      "coordinate columns must have equal length"
    );
    Self { axes: [x, y, z] }
  }

  pub fn from_columns(columns: &'a [Vec<f32>; 3]) -> Self {
    Self::new(&columns[0], &columns[1], &columns[2])
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.axes[0].len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Column for one axis.
  #[inline]
  pub fn axis(&self, axis: Axis) -> &'a [f32] {
    self.axes[axis.index()]
  }

  #[inline]
  pub fn point(&self, i: usize) -> Vec3 {
    Vec3::new(self.axes[0][i], self.axes[1][i], self.axes[2][i])
  }
}

/// Midpoint of a recursion range; also the slot holding that subtree's data.
#[inline]
pub(crate) fn midpoint(first: usize, last: usize) -> usize {
  first + (last - first) / 2
}

/// Build the k-d ordering over all points. Starts splitting on x.
pub fn reorder(coords: Coords<'_>) -> Vec<usize> {
  let mut seq: Vec<usize> = (0..coords.len()).collect();
  reorder_range(&mut seq, coords, Axis::X);
  seq
}

fn reorder_range(seq: &mut [usize], coords: Coords<'_>, axis: Axis) {
  let len = seq.len();
  if len <= 1 {
    return;
  }

  let mid = len / 2;
  let column = coords.axis(axis);
  seq.select_nth_unstable_by(mid, |&a, &b| column[a].total_cmp(&column[b]));

  let (left, right) = seq.split_at_mut(mid);
  reorder_range(left, coords, axis.next());
  reorder_range(right, coords, axis.next());
}

#[cfg(test)]
#[path = "reorder_test.rs"]
mod reorder_test;
