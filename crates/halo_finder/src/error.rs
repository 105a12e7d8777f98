//! Error types for configuration, transport and the halo pass.

use thiserror::Error;

/// Rejected configuration, detected before any pass starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
  #[error("linking length must be finite and non-negative, got {0}")]
  InvalidLinkingLength(f32),

  #[error("minimum halo size must be at least 1, got {0}")]
  InvalidMinHaloSize(usize),

  #[error("minimum friend count must be at least 1, got {0}")]
  InvalidMinFriendCount(usize),

  #[error("periodic wraparound needs a positive grid resolution, got {0}")]
  InvalidGridResolution(f32),

  #[error("domain size must be positive, got {0}")]
  InvalidDomainSize(f32),

  #[error("rank {rank} is outside a world of {size} ranks")]
  RankOutOfRange { rank: usize, size: usize },

  #[error("decomposition dims must all be positive, got {0:?}")]
  InvalidDims([usize; 3]),

  #[error("dead zone size must be finite and non-negative, got {0}")]
  InvalidDeadSize(f32),
}

/// Failure of a collective operation between ranks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
  #[error("rank {peer} disconnected")]
  Disconnected { peer: usize },

  #[error("rank {rank} is outside a world of {size} ranks")]
  RankOutOfRange { rank: usize, size: usize },

  #[error("malformed payload: {0}")]
  Malformed(String),

  #[error("failed to start local world: {0}")]
  Spawn(String),
}

/// Any failure of a halo-finding pass.
#[derive(Debug, Error)]
pub enum HaloError {
  #[error("invalid configuration: {0}")]
  Config(#[from] ConfigError),

  #[error("collective failed: {0}")]
  Transport(#[from] TransportError),

  #[error("protocol violation: {0}")]
  Protocol(String),
}

pub type Result<T, E = HaloError> = std::result::Result<T, E>;
