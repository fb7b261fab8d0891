//! Crate-level error type.

use thiserror::Error;

use crate::sim::SimError;

/// Errors that abort a control run.
///
/// Dimension mismatches are deliberately absent: the policy falls back to a
/// random action and the replay buffer skips the store, so they never
/// surface as errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The simulator backend failed mid-run. Never retried.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// A model checkpoint could not be loaded or saved, or the torch
    /// backend rejected an operation. A missing checkpoint on resume lands
    /// here and aborts the run.
    #[cfg(feature = "nn")]
    #[error("torch error: {0}")]
    Torch(#[from] tch::TchError),

    /// Filesystem failure while preparing the checkpoint directory.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The run configuration is inconsistent (e.g. the phase table has a
    /// different number of entries than the action space).
    #[error("invalid configuration: {0}")]
    Config(String),
}
