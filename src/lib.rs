//! greenwave - adaptive traffic-signal control via multi-agent Q-learning.
//!
//! Several junction controllers share one Q-value network while keeping
//! private replay histories: each time a junction's phase timer expires it
//! records a transition, triggers a full-batch Q-learning update on the
//! shared network, and picks its next signal phase epsilon-greedily. The
//! traffic simulator stays behind the [`sim::TrafficSim`] trait.
//!
//! The network, policy, learner and control loop require the `nn` feature
//! flag (which brings in `tch` / libtorch). Buffers, observation handling,
//! junction state and reporting are always available.

pub mod config;
pub mod error;
pub mod junction;
pub mod metrics;
pub mod observation;
pub mod replay;
pub mod sim;

// Modules that require the `nn` feature (tch dependency).
#[cfg(feature = "nn")]
pub mod learner;
#[cfg(feature = "nn")]
pub mod network;
#[cfg(feature = "nn")]
pub mod policy;
#[cfg(feature = "nn")]
pub mod runner;

// Public re-exports — always available.
pub use config::{AgentConfig, RunConfig};
pub use error::Error;
pub use junction::{JunctionState, PhaseProgram, PhaseTable, TRANSITION_TICKS};
pub use metrics::{EpochStats, RunSummary};
pub use observation::normalize;
pub use replay::{ReplayBuffer, Transition};
pub use sim::{JunctionId, LaneId, SimError, TrafficSim, VehicleId};

// Re-exports gated behind the `nn` feature.
#[cfg(feature = "nn")]
pub use learner::{td_targets, QLearner};
#[cfg(feature = "nn")]
pub use network::QNetwork;
#[cfg(feature = "nn")]
pub use policy::EpsilonGreedy;
#[cfg(feature = "nn")]
pub use runner::{measure_baseline, CheckpointGate, TrainingRunner};
