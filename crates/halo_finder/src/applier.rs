//! ResultApplier - turn settled verdicts into kept halos.

use tracing::debug;

use crate::catalog::{HaloRun, ValidHalos};
use crate::chain::HaloChains;
use crate::error::{HaloError, Result};
use crate::particles::ParticleStatus;
use crate::record::{CosmoHaloRecord, Validity};

/// Mixed halos settled on this rank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplySummary {
  pub kept: usize,
  pub ceded: usize,
  /// Particles promoted to `Alive`, dead copies included.
  pub promoted: usize,
}

/// Keep every Valid record: its members become `Alive` and its run joins
/// `valid`. Members of Invalid records stay `Mixed`.
///
/// Every record must be settled by now; an unmarked one is a protocol error.
pub fn apply_verdicts(
  records: &[CosmoHaloRecord],
  chains: &HaloChains,
  status: &mut [ParticleStatus],
  valid: &mut ValidHalos,
) -> Result<ApplySummary> {
  let mut summary = ApplySummary::default();

  for record in records {
    match record.validity {
      Validity::Unmarked => {
        return Err(HaloError::Protocol(format!(
          "halo {} reached the applier unmarked",
          record.halo_id
        )))
      }
      Validity::Invalid => summary.ceded += 1,
      Validity::Valid => {
        let head = chains
          .head(record.halo_id)
          .ok_or_else(|| HaloError::Protocol(format!("halo {} is not a chain root", record.halo_id)))?;

        let size = chains.walk(Some(head)).count();
        if size != record.size() {
          return Err(HaloError::Protocol(format!(
            "halo {} has {} members, record says {}",
            record.halo_id,
            size,
            record.size()
          )));
        }

        for member in chains.walk(Some(head)) {
          status[member] = ParticleStatus::Alive;
        }
        valid.push(HaloRun { head, size });
        summary.kept += 1;
        summary.promoted += size;
      }
    }
  }

  debug!(
    kept = summary.kept,
    ceded = summary.ceded,
    promoted = summary.promoted,
    "mixed halos applied"
  );
  Ok(summary)
}
