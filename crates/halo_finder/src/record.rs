//! Records of halos that straddle a rank boundary.

use crate::topology::ZoneSet;

/// Ownership verdict of a mixed halo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Validity {
  /// Not decided yet; needs arbitration.
  #[default]
  Unmarked,
  /// Kept by this rank.
  Valid,
  /// Owned by another rank.
  Invalid,
}

impl Validity {
  /// Wire code used in verdict broadcasts.
  pub fn code(self) -> i64 {
    match self {
      Validity::Unmarked => 0,
      Validity::Valid => 1,
      Validity::Invalid => 2,
    }
  }

  pub fn from_code(code: i64) -> Option<Self> {
    match code {
      0 => Some(Validity::Unmarked),
      1 => Some(Validity::Valid),
      2 => Some(Validity::Invalid),
      _ => None,
    }
  }
}

/// A halo with both alive and dead members on this rank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CosmoHaloRecord {
  /// Chain root of the halo at merge time.
  pub halo_id: usize,
  pub alive_count: usize,
  pub dead_count: usize,
  /// Smallest global tags of the members, ascending, at most `pmin` long.
  pub fingerprint: Vec<i64>,
  /// Dead-zone sides the halo reaches into.
  pub zones: ZoneSet,
  pub validity: Validity,
}

impl CosmoHaloRecord {
  pub fn new(halo_id: usize) -> Self {
    Self {
      halo_id,
      alive_count: 0,
      dead_count: 0,
      fingerprint: Vec::new(),
      zones: ZoneSet::new(),
      validity: Validity::Unmarked,
    }
  }

  /// Total members, alive and dead.
  pub fn size(&self) -> usize {
    self.alive_count + self.dead_count
  }

  /// True when both fingerprints share a tag.
  pub fn matches(&self, other: &CosmoHaloRecord) -> bool {
    sorted_intersects(&self.fingerprint, &other.fingerprint)
  }
}

/// Intersection test over two ascending slices.
pub fn sorted_intersects(a: &[i64], b: &[i64]) -> bool {
  let (mut i, mut j) = (0, 0);
  while i < a.len() && j < b.len() {
    match a[i].cmp(&b[j]) {
      std::cmp::Ordering::Less => i += 1,
      std::cmp::Ordering::Greater => j += 1,
      std::cmp::Ordering::Equal => return true,
    }
  }
  false
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sorted_intersects() {
    assert!(sorted_intersects(&[1, 4, 9], &[2, 3, 9]));
    assert!(sorted_intersects(&[5], &[1, 5, 8]));
    assert!(!sorted_intersects(&[1, 3, 5], &[2, 4, 6]));
    assert!(!sorted_intersects(&[], &[1]));
  }

  #[test]
  fn test_validity_codes_roundtrip() {
    for v in [Validity::Unmarked, Validity::Valid, Validity::Invalid] {
      assert_eq!(Validity::from_code(v.code()), Some(v));
    }
    assert_eq!(Validity::from_code(7), None);
  }

  #[test]
  fn test_record_matches_on_shared_tag() {
    let mut a = CosmoHaloRecord::new(0);
    a.fingerprint = vec![10, 11, 12];
    let mut b = CosmoHaloRecord::new(3);
    b.fingerprint = vec![12, 40];
    assert!(a.matches(&b));
    b.fingerprint = vec![13, 40];
    assert!(!a.matches(&b));
  }
}
