//! Configuration for the learning agent and the control run.

use std::path::PathBuf;

/// Hyperparameters of the shared Q-learning agent.
///
/// One approximator and one exploration schedule serve every junction;
/// these values are process-wide.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentConfig {
    /// Discount factor γ for future rewards.
    pub gamma: f64,
    /// Initial exploration rate ε.
    pub epsilon: f64,
    /// Learning rate for the Adam optimizer.
    pub lr: f64,
    /// Fixed state-vector dimension D; observations are padded or truncated
    /// to this length before use.
    pub input_dims: usize,
    /// Width of the first hidden layer.
    pub fc1_dims: usize,
    /// Width of the second hidden layer.
    pub fc2_dims: usize,
    /// Number of discrete actions (signal phases per junction).
    pub n_actions: usize,
    /// Per-junction replay capacity; the oldest transition is overwritten
    /// once the write counter exceeds it.
    pub capacity: usize,
    /// Linear ε decrement applied after every learning step.
    pub epsilon_dec: f64,
    /// Floor below which ε never falls.
    pub epsilon_end: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            epsilon: 0.0,
            lr: 0.1,
            input_dims: 4,
            fc1_dims: 256,
            fc2_dims: 256,
            n_actions: 4,
            capacity: 100_000,
            epsilon_dec: 5e-4,
            epsilon_end: 0.05,
        }
    }
}

/// Configuration of a control run (one or more epochs).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunConfig {
    /// Model name; checkpoints live at `<model_dir>/<model_name>.ot`.
    pub model_name: String,
    /// Directory holding model checkpoints.
    pub model_dir: PathBuf,
    /// Number of epochs to run. Offline runs stop after the first epoch.
    pub epochs: u32,
    /// Tick horizon of one epoch; every epoch runs ticks `0..=steps`.
    pub steps: u32,
    /// Whether this run trains at all.
    pub training: bool,
    /// Whether training updates happen online during the run. With
    /// `training && !online` the loop only executes the learned policy.
    pub online: bool,
    /// Load an existing checkpoint at run start. Missing checkpoints are
    /// fatal when this is set.
    pub resume: bool,
    /// Minimum green duration; the hold phase and the decision timer last
    /// `min_duration + 10` ticks.
    pub min_duration: u32,
    /// Seed for the policy RNG, for reproducible runs.
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model_name: "model".to_string(),
            model_dir: PathBuf::from("models"),
            epochs: 50,
            steps: 500,
            training: true,
            online: true,
            resume: false,
            min_duration: 5,
            seed: 0,
        }
    }
}

impl RunConfig {
    /// Path of the checkpoint file for this run's model name.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.model_dir.join(format!("{}.ot", self.model_name))
    }

    /// Ticks a junction holds its phase between decisions.
    pub fn hold_ticks(&self) -> u32 {
        self.min_duration + 10
    }
}
