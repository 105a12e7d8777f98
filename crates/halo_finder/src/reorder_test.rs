use super::*;
use crate::test_utils::{uniform_points, Points};

fn assert_permutation(seq: &[usize], n: usize) {
  let mut seen = vec![false; n];
  assert_eq!(seq.len(), n);
  for &i in seq {
    assert!(i < n, "index {} out of range", i);
    assert!(!seen[i], "index {} repeated", i);
    seen[i] = true;
  }
}

/// Every range of the recursion holds the lower half on its split axis.
fn assert_median_split(seq: &[usize], coords: Coords<'_>, first: usize, last: usize, axis: Axis) {
  if last - first <= 1 {
    return;
  }
  let mid = midpoint(first, last);
  let column = coords.axis(axis);
  let left_max = seq[first..mid]
    .iter()
    .map(|&i| column[i])
    .fold(f32::NEG_INFINITY, f32::max);
  let right_min = seq[mid..last]
    .iter()
    .map(|&i| column[i])
    .fold(f32::INFINITY, f32::min);
  assert!(
    left_max <= right_min,
    "range {}..{} not split on {:?}: {} > {}",
    first,
    last,
    axis,
    left_max,
    right_min
  );
  assert_median_split(seq, coords, first, mid, axis.next());
  assert_median_split(seq, coords, mid, last, axis.next());
}

#[test]
fn test_empty_is_noop() {
  let points = Points::on_line(&[]);
  assert!(reorder(points.coords()).is_empty());
}

#[test]
fn test_single_point() {
  let points = Points::on_line(&[3.0]);
  assert_eq!(reorder(points.coords()), vec![0]);
}

/// Output is a permutation of 0..N for awkward sizes.
#[test]
fn test_output_is_permutation() {
  for n in [2, 3, 5, 7, 16, 31, 100, 257] {
    let points = uniform_points(n as u64, n, 10.0);
    let seq = reorder(points.coords());
    assert_permutation(&seq, n);
  }
}

#[test]
fn test_ranges_are_median_split() {
  for n in [4, 9, 33, 200] {
    let points = uniform_points(7 + n as u64, n, 50.0);
    let seq = reorder(points.coords());
    assert_median_split(&seq, points.coords(), 0, n, Axis::X);
  }
}

/// Duplicated coordinates still yield a permutation.
#[test]
fn test_duplicate_coordinates() {
  let points = Points::on_line(&[1.0; 13]);
  let seq = reorder(points.coords());
  assert_permutation(&seq, 13);
}

#[test]
fn test_axis_cycles() {
  assert_eq!(Axis::X.next(), Axis::Y);
  assert_eq!(Axis::Y.next(), Axis::Z);
  assert_eq!(Axis::Z.next(), Axis::X);
  assert_eq!(Axis::Z.index(), 2);
}
