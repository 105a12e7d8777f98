//! GlobalArbiter - master-coordinated ownership for halos the local rule
//! could not settle.
//!
//! Protocol, every rank in lockstep:
//! 1. all-reduce the largest unmarked-record count; zero everywhere ends it
//! 2. gather fixed-width rows `(local index, alive, dead, fingerprint length,
//!    fingerprint...)` on the master, padded to that count
//! 3. the master groups entries whose fingerprints intersect and picks one
//!    owner per group
//! 4. the master broadcasts `(rank, local index, verdict)` triples and each
//!    rank applies its own
//!
//! Only the master decides. Other ranks never compare fingerprints.

use smallvec::SmallVec;
use tracing::{debug, info, info_span};

use crate::chain::HaloChains;
use crate::collective::Collective;
use crate::error::{HaloError, Result, TransportError};
use crate::record::{sorted_intersects, CosmoHaloRecord, Validity};

/// Rank that builds the directory and decides.
pub const MASTER: usize = 0;

/// Row words ahead of the fingerprint.
const HEADER: usize = 4;
/// Local index of a padding row.
const PADDING: i64 = -1;

/// One escalated halo as seen by one rank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
  pub rank: usize,
  /// Index into that rank's record list.
  pub local_index: usize,
  pub alive_count: usize,
  pub dead_count: usize,
  pub fingerprint: Vec<i64>,
  /// Directory indices of entries sharing a fingerprint tag.
  pub partners: SmallVec<[usize; 4]>,
}

/// All escalated halos of the world, built on the master.
#[derive(Clone, Debug, Default)]
pub struct GlobalHaloDirectory {
  entries: Vec<DirectoryEntry>,
}

impl GlobalHaloDirectory {
  pub fn new(entries: Vec<DirectoryEntry>) -> Self {
    let mut directory = Self { entries };
    directory.link_partners();
    directory
  }

  /// Decode one gathered buffer per rank.
  pub fn from_buffers(buffers: &[Vec<i64>], min_halo_size: usize) -> Result<Self, TransportError> {
    let width = HEADER + min_halo_size;
    let mut entries = Vec::new();

    for (rank, buffer) in buffers.iter().enumerate() {
      if buffer.len() % width != 0 {
        return Err(TransportError::Malformed(format!(
          "rank {} sent {} words, not a multiple of row width {}",
          rank,
          buffer.len(),
          width
        )));
      }
      for row in buffer.chunks_exact(width) {
        if row[0] == PADDING {
          continue;
        }
        let word = |i: usize| {
          usize::try_from(row[i]).map_err(|_| {
            TransportError::Malformed(format!("rank {} row field {} is {}", rank, i, row[i]))
          })
        };
        let fingerprint_len = word(3)?;
        if fingerprint_len > min_halo_size {
          return Err(TransportError::Malformed(format!(
            "rank {} fingerprint of {} tags exceeds {}",
            rank, fingerprint_len, min_halo_size
          )));
        }
        entries.push(DirectoryEntry {
          rank,
          local_index: word(0)?,
          alive_count: word(1)?,
          dead_count: word(2)?,
          fingerprint: row[HEADER..HEADER + fingerprint_len].to_vec(),
          partners: SmallVec::new(),
        });
      }
    }

    Ok(Self::new(entries))
  }

  pub fn entries(&self) -> &[DirectoryEntry] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Pairwise fingerprint comparison.
  fn link_partners(&mut self) {
    let n = self.entries.len();
    for i in 0..n {
      for j in i + 1..n {
        if sorted_intersects(&self.entries[i].fingerprint, &self.entries[j].fingerprint) {
          self.entries[i].partners.push(j);
          self.entries[j].partners.push(i);
        }
      }
    }
  }

  /// Entries describing the same physical halo, grouped transitively.
  pub fn partner_groups(&self) -> Vec<Vec<usize>> {
    let mut groups = HaloChains::new(self.entries.len());
    for (i, entry) in self.entries.iter().enumerate() {
      for &j in &entry.partners {
        groups.union(i, j);
      }
    }
    groups
      .roots()
      .map(|root| {
        let mut members: Vec<usize> = groups.members(root).collect();
        members.sort_unstable();
        members
      })
      .collect()
  }

  /// One verdict per entry: in every group the entry with the fewest alive
  /// particles is kept, ties going to the lower rank then lower local index.
  pub fn decide(&self) -> Vec<Validity> {
    let mut verdicts = vec![Validity::Invalid; self.entries.len()];
    for group in self.partner_groups() {
      let owner = group.iter().copied().min_by_key(|&i| {
        let entry = &self.entries[i];
        (entry.alive_count, entry.rank, entry.local_index)
      });
      if let Some(owner) = owner {
        verdicts[owner] = Validity::Valid;
      }
    }
    verdicts
  }

  /// Flattened `(rank, local index, verdict code)` triples.
  pub fn verdict_stream(&self, verdicts: &[Validity]) -> Vec<i64> {
    self
      .entries
      .iter()
      .zip(verdicts)
      .flat_map(|(entry, verdict)| [entry.rank as i64, entry.local_index as i64, verdict.code()])
      .collect()
  }
}

/// Fixed-width rows for this rank's unmarked records, padded to `rows`.
pub fn encode_unmarked(records: &[CosmoHaloRecord], rows: usize, min_halo_size: usize) -> Vec<i64> {
  let width = HEADER + min_halo_size;
  let mut buffer = Vec::with_capacity(rows * width);
  let mut written = 0;

  for (index, record) in records.iter().enumerate() {
    if record.validity != Validity::Unmarked {
      continue;
    }
    let fingerprint = &record.fingerprint[..record.fingerprint.len().min(min_halo_size)];
    buffer.extend([
      index as i64,
      record.alive_count as i64,
      record.dead_count as i64,
      fingerprint.len() as i64,
    ]);
    buffer.extend_from_slice(fingerprint);
    buffer.resize(buffer.len() + min_halo_size - fingerprint.len(), PADDING);
    written += 1;
  }

  for _ in written..rows {
    buffer.push(PADDING);
    buffer.resize(buffer.len() + width - 1, 0);
  }
  buffer
}

/// Outcome of arbitration on one rank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArbiterSummary {
  /// Largest unmarked count on any rank; zero means nothing was exchanged.
  pub global_max: u64,
  /// Directory size, known on the master only.
  pub directory_entries: usize,
  /// This rank's records settled Valid / Invalid by the broadcast.
  pub valid: usize,
  pub invalid: usize,
}

/// Settle every unmarked record on every rank.
///
/// Must be called by all ranks of `comm`, even those without unmarked
/// records.
pub fn arbitrate<C: Collective>(
  records: &mut [CosmoHaloRecord],
  min_halo_size: usize,
  comm: &C,
) -> Result<ArbiterSummary> {
  let rank = comm.rank();
  let _span = info_span!("arbitrate", rank).entered();
  let mut summary = ArbiterSummary::default();

  let unmarked = records
    .iter()
    .filter(|r| r.validity == Validity::Unmarked)
    .count();
  summary.global_max = comm.all_reduce_max(unmarked as u64)?;
  if summary.global_max == 0 {
    debug!(rank, "no unmarked halos anywhere, skipping arbitration");
    return Ok(summary);
  }

  let rows = usize::try_from(summary.global_max)
    .map_err(|_| HaloError::Protocol(format!("row count {} overflows", summary.global_max)))?;
  let buffer = encode_unmarked(records, rows, min_halo_size);
  let gathered = comm.gather(MASTER, &buffer)?;

  let stream = match gathered {
    Some(buffers) => {
      let directory = GlobalHaloDirectory::from_buffers(&buffers, min_halo_size)?;
      let verdicts = directory.decide();
      summary.directory_entries = directory.len();
      info!(
        entries = directory.len(),
        groups = directory.partner_groups().len(),
        "global halo directory built"
      );
      comm.broadcast(MASTER, directory.verdict_stream(&verdicts))?
    }
    None => comm.broadcast(MASTER, Vec::new())?,
  };

  if stream.len() % 3 != 0 {
    return Err(TransportError::Malformed(format!("verdict stream of {} words", stream.len())).into());
  }
  for triple in stream.chunks_exact(3) {
    if triple[0] != rank as i64 {
      continue;
    }
    let index = usize::try_from(triple[1])
      .ok()
      .filter(|&i| i < records.len())
      .ok_or_else(|| HaloError::Protocol(format!("verdict for unknown halo {}", triple[1])))?;
    let verdict = match Validity::from_code(triple[2]) {
      Some(v @ (Validity::Valid | Validity::Invalid)) => v,
      _ => {
        return Err(HaloError::Protocol(format!(
          "verdict code {} for halo {}",
          triple[2], index
        )))
      }
    };

    let record = &mut records[index];
    if record.validity != Validity::Unmarked {
      return Err(HaloError::Protocol(format!(
        "halo {} already settled as {:?}",
        index, record.validity
      )));
    }
    record.validity = verdict;
    match verdict {
      Validity::Valid => summary.valid += 1,
      _ => summary.invalid += 1,
    }
  }

  debug!(rank, valid = summary.valid, invalid = summary.invalid, "verdicts applied");
  Ok(summary)
}

#[cfg(test)]
#[path = "arbiter_test.rs"]
mod arbiter_test;
