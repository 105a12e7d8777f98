//! Collective operations between ranks.
//!
//! The arbiter only needs three blocking collectives: a max all-reduce, a
//! gather to one root and a broadcast from it. [`Collective`] names them so a
//! message-passing backend can be plugged in; [`LocalTransport`] implements
//! them for ranks living in one process.
//!
//! # Usage
//!
//! ```ignore
//! let totals = run_local_world(4, |comm| {
//!     comm.all_reduce_max(comm.rank() as u64)
//! })?;
//! ```

use crossbeam_channel::{self as channel, Receiver, Sender};

use crate::error::TransportError;

/// Blocking collectives over a fixed set of ranks.
///
/// Every rank must call the same collectives in the same order.
pub trait Collective {
  fn rank(&self) -> usize;

  fn size(&self) -> usize;

  /// Maximum of `value` over all ranks, returned on every rank.
  fn all_reduce_max(&self, value: u64) -> Result<u64, TransportError>;

  /// Collect one buffer per rank on `root`, in rank order. Other ranks get
  /// `None`.
  fn gather(&self, root: usize, data: &[i64]) -> Result<Option<Vec<Vec<i64>>>, TransportError>;

  /// Send `data` from `root` to every rank. Non-root input is ignored.
  fn broadcast(&self, root: usize, data: Vec<i64>) -> Result<Vec<i64>, TransportError>;
}

/// One rank's end of an in-process world.
///
/// Each ordered pair of ranks has its own unbounded channel, so messages
/// between two ranks arrive in send order.
pub struct LocalTransport {
  rank: usize,
  /// Indexed by destination rank.
  senders: Vec<Sender<Vec<i64>>>,
  /// Indexed by source rank.
  receivers: Vec<Receiver<Vec<i64>>>,
}

impl LocalTransport {
  /// Wire up `size` fully connected ranks.
  pub fn world(size: usize) -> Vec<LocalTransport> {
    let mut senders: Vec<Vec<Sender<Vec<i64>>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
    let mut receivers: Vec<Vec<Receiver<Vec<i64>>>> =
      (0..size).map(|_| Vec::with_capacity(size)).collect();

    for from in 0..size {
      for to in 0..size {
        let (tx, rx) = channel::unbounded();
        senders[from].push(tx);
        receivers[to].push(rx);
      }
    }

    senders
      .into_iter()
      .zip(receivers)
      .enumerate()
      .map(|(rank, (senders, receivers))| LocalTransport {
        rank,
        senders,
        receivers,
      })
      .collect()
  }

  fn check_rank(&self, rank: usize) -> Result<(), TransportError> {
    if rank >= self.size() {
      return Err(TransportError::RankOutOfRange {
        rank,
        size: self.size(),
      });
    }
    Ok(())
  }

  fn send(&self, to: usize, data: Vec<i64>) -> Result<(), TransportError> {
    self.senders[to]
      .send(data)
      .map_err(|_| TransportError::Disconnected { peer: to })
  }

  fn recv(&self, from: usize) -> Result<Vec<i64>, TransportError> {
    self.receivers[from]
      .recv()
      .map_err(|_| TransportError::Disconnected { peer: from })
  }
}

impl Collective for LocalTransport {
  fn rank(&self) -> usize {
    self.rank
  }

  fn size(&self) -> usize {
    self.senders.len()
  }

  fn all_reduce_max(&self, value: u64) -> Result<u64, TransportError> {
    let value = i64::try_from(value)
      .map_err(|_| TransportError::Malformed(format!("{} does not fit a wire word", value)))?;
    let gathered = self.gather(0, &[value])?;
    let max = gathered
      .map(|rows| rows.iter().flatten().copied().max().unwrap_or(0))
      .unwrap_or(0);
    let reply = self.broadcast(0, vec![max])?;
    match reply.as_slice() {
      [max] if *max >= 0 => Ok(*max as u64),
      other => Err(TransportError::Malformed(format!(
        "all-reduce reply {:?}",
        other
      ))),
    }
  }

  fn gather(&self, root: usize, data: &[i64]) -> Result<Option<Vec<Vec<i64>>>, TransportError> {
    self.check_rank(root)?;
    if self.rank != root {
      self.send(root, data.to_vec())?;
      return Ok(None);
    }

    let mut rows = Vec::with_capacity(self.size());
    for from in 0..self.size() {
      if from == root {
        rows.push(data.to_vec());
      } else {
        rows.push(self.recv(from)?);
      }
    }
    Ok(Some(rows))
  }

  fn broadcast(&self, root: usize, data: Vec<i64>) -> Result<Vec<i64>, TransportError> {
    self.check_rank(root)?;
    if self.rank != root {
      return self.recv(root);
    }

    for to in (0..self.size()).filter(|&to| to != root) {
      self.send(to, data.clone())?;
    }
    Ok(data)
  }
}

/// Run `work` once per rank of a `size`-rank local world and collect the
/// results in rank order.
///
/// Ranks run on a dedicated rayon pool with one thread per rank, since every
/// rank blocks inside collectives until its peers catch up.
pub fn run_local_world<T, F>(size: usize, work: F) -> Result<Vec<T>, TransportError>
where
  F: Fn(LocalTransport) -> T + Sync,
  T: Send,
{
  if size == 0 {
    return Ok(Vec::new());
  }

  let pool = rayon::ThreadPoolBuilder::new()
    .num_threads(size)
    .thread_name(|i| format!("rank-{}", i))
    .build()
    .map_err(|e| TransportError::Spawn(e.to_string()))?;

  let mut slots: Vec<Option<T>> = (0..size).map(|_| None).collect();
  let work = &work;
  pool.scope(|scope| {
    for (transport, slot) in LocalTransport::world(size).into_iter().zip(slots.iter_mut()) {
      scope.spawn(move |_| {
        *slot = Some(work(transport));
      });
    }
  });

  slots
    .into_iter()
    .collect::<Option<Vec<T>>>()
    .ok_or_else(|| TransportError::Spawn("a rank finished without a result".to_string()))
}
