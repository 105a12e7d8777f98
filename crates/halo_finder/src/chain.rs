//! HaloChains - per-pass arena of linked membership chains.
//!
//! Every particle belongs to exactly one chain. A chain is identified by its
//! root, the smallest particle index it contains; `tag[p]` names the root of
//! `p`, `head[root]` the first member and `next[member]` the one after it.

/// Membership chains over `0..len` particle indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HaloChains {
  tag: Vec<usize>,
  head: Vec<Option<usize>>,
  next: Vec<Option<usize>>,
}

impl HaloChains {
  /// One singleton chain per particle.
  pub fn new(len: usize) -> Self {
    Self {
      tag: (0..len).collect(),
      head: (0..len).map(Some).collect(),
      next: vec![None; len],
    }
  }

  pub fn len(&self) -> usize {
    self.tag.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tag.is_empty()
  }

  /// Root of the chain containing `p`.
  #[inline]
  pub fn root(&self, p: usize) -> usize {
    self.tag[p]
  }

  /// First member of the chain rooted at `root`, `None` if `root` is not a
  /// root.
  #[inline]
  pub fn head(&self, root: usize) -> Option<usize> {
    self.head[root]
  }

  /// Member following `member` in its chain.
  #[inline]
  pub fn next(&self, member: usize) -> Option<usize> {
    self.next[member]
  }

  #[inline]
  pub fn is_root(&self, p: usize) -> bool {
    self.head[p].is_some()
  }

  /// All chain roots in ascending order.
  pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
    self
      .head
      .iter()
      .enumerate()
      .filter_map(|(i, h)| h.map(|_| i))
  }

  /// Members of the chain rooted at `root`, starting from its head.
  pub fn members(&self, root: usize) -> ChainIter<'_> {
    self.walk(self.head[root])
  }

  /// Members reached from an arbitrary chain position.
  pub fn walk(&self, start: Option<usize>) -> ChainIter<'_> {
    ChainIter {
      chains: self,
      cursor: start,
    }
  }

  /// Join the chains of `a` and `b`; the smaller root survives.
  ///
  /// Every member of the larger-root chain is relabelled and the whole chain
  /// is spliced in front of the survivor's head. Returns `false` when both
  /// were already in one chain.
  pub fn union(&mut self, a: usize, b: usize) -> bool {
    let (ra, rb) = (self.tag[a], self.tag[b]);
    if ra == rb {
      return false;
    }
    let new_root = ra.min(rb);
    let old_root = ra.max(rb);

    let mut last = None;
    let mut cursor = self.head[old_root];
    while let Some(member) = cursor {
      self.tag[member] = new_root;
      last = Some(member);
      cursor = self.next[member];
    }

    if let Some(last) = last {
      self.next[last] = self.head[new_root];
      self.head[new_root] = self.head[old_root];
    }
    self.head[old_root] = None;
    true
  }
}

/// Iterator over one chain.
pub struct ChainIter<'a> {
  chains: &'a HaloChains,
  cursor: Option<usize>,
}

impl Iterator for ChainIter<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    let current = self.cursor?;
    self.cursor = self.chains.next[current];
    Some(current)
  }
}

#[cfg(test)]
#[path = "chain_test.rs"]
mod chain_test;
