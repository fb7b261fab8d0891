//! Epsilon-greedy action selection with linear decay.
//!
//! One policy instance serves all junctions: the exploration schedule is a
//! process-wide resource, decayed once per learning step no matter which
//! junction triggered the step.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::AgentConfig;
use crate::network::QNetwork;

/// Epsilon-greedy selector over the shared Q-network.
#[derive(Debug)]
pub struct EpsilonGreedy {
    epsilon: f64,
    epsilon_end: f64,
    epsilon_dec: f64,
    input_dims: usize,
    n_actions: usize,
    rng: StdRng,
}

impl EpsilonGreedy {
    /// Creates a policy from agent hyperparameters and an RNG seed.
    pub fn new(config: &AgentConfig, seed: u64) -> Self {
        Self {
            epsilon: config.epsilon,
            epsilon_end: config.epsilon_end,
            epsilon_dec: config.epsilon_dec,
            input_dims: config.input_dims,
            n_actions: config.n_actions,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Selects an action for the given observation.
    ///
    /// An observation whose length differs from D yields a uniformly random
    /// action; this is a recovery path, never an error. Otherwise the
    /// policy explores with probability ε and exploits the network's argmax
    /// action the rest of the time.
    pub fn select_action(&mut self, network: &QNetwork, observation: &[f64]) -> usize {
        if observation.len() != self.input_dims {
            return self.rng.gen_range(0..self.n_actions);
        }

        if self.rng.gen::<f64>() > self.epsilon {
            argmax(&network.action_values(observation))
        } else {
            self.rng.gen_range(0..self.n_actions)
        }
    }

    /// Applies one step of linear decay: `ε ← max(ε_end, ε - ε_dec)`.
    pub fn decay(&mut self) {
        self.epsilon = (self.epsilon - self.epsilon_dec).max(self.epsilon_end);
    }

    /// Current exploration rate.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Overrides the current exploration rate.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    /// Size of the action space.
    pub fn n_actions(&self) -> usize {
        self.n_actions
    }
}

/// Index of the first maximal value.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
