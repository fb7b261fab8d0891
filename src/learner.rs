//! Q-learning updates on the shared network.
//!
//! Every decision point triggers one update built from the deciding
//! junction's *entire* buffer contents. There is no minibatch sampling, no
//! separate target network and no gradient clipping; the batch simply grows
//! with the number of elapsed decision points until it spans the whole ring.
//! Production DQN variants would sample fixed-size minibatches instead; the
//! full-batch rule is the contract here.

use tch::{nn, nn::OptimizerConfig, Device, Reduction, Tensor};

use crate::config::AgentConfig;
use crate::error::Error;
use crate::network::QNetwork;
use crate::policy::EpsilonGreedy;
use crate::replay::ReplayBuffer;

/// Owns the shared network, its Adam optimizer and the global step counter.
pub struct QLearner {
    network: QNetwork,
    opt: nn::Optimizer,
    gamma: f64,
    steps: u64,
}

impl QLearner {
    /// Builds the network and optimizer from agent hyperparameters.
    pub fn new(config: &AgentConfig, device: Device) -> Result<Self, Error> {
        let mut network = QNetwork::new(
            config.input_dims,
            config.fc1_dims,
            config.fc2_dims,
            config.n_actions,
            device,
        );
        let opt = nn::Adam::default().build(network.var_store_mut(), config.lr)?;
        Ok(Self {
            network,
            opt,
            gamma: config.gamma,
            steps: 0,
        })
    }

    /// Performs one gradient step from the buffer's full contents.
    ///
    /// Returns the mean-squared TD error, or `None` when the buffer is
    /// empty (an empty batch admits no target). On success the global step
    /// counter advances and the policy's epsilon decays — the decay is a
    /// side effect of every learning step, independent of which junction's
    /// buffer was consumed.
    pub fn learn(&mut self, buffer: &ReplayBuffer, policy: &mut EpsilonGreedy) -> Option<f64> {
        let n = buffer.len();
        if n == 0 {
            return None;
        }

        let device = self.network.device();
        let dims = buffer.dims() as i64;
        let states = Tensor::from_slice(buffer.states_flat())
            .reshape([n as i64, dims])
            .to_device(device);
        let next_states = Tensor::from_slice(buffer.next_states_flat())
            .reshape([n as i64, dims])
            .to_device(device);
        let actions = Tensor::from_slice(buffer.actions()).to_device(device);
        let rewards = Tensor::from_slice(buffer.rewards()).to_device(device);
        let terminals = Tensor::from_slice(buffer.terminals()).to_device(device);

        let q_eval = self
            .network
            .forward(&states)
            .gather(1, &actions.unsqueeze(-1), false)
            .squeeze_dim(-1);
        let q_next = self.network.forward(&next_states);
        let target = td_targets(&q_next, &rewards, &terminals, self.gamma);

        let loss = target.mse_loss(&q_eval, Reduction::Mean);
        self.opt.zero_grad();
        loss.backward();
        self.opt.step();

        self.steps += 1;
        policy.decay();

        Some(loss.double_value(&[]))
    }

    /// The shared network.
    pub fn network(&self) -> &QNetwork {
        &self.network
    }

    /// Number of learning steps performed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Discount factor γ.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Saves the shared parameters.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Error> {
        self.network.save(path).map_err(Error::from)
    }

    /// Loads shared parameters written by an earlier run.
    pub fn load(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), Error> {
        self.network.load(path).map_err(Error::from)
    }
}

/// Computes TD targets `r + γ · max_a q_next[·, a]`.
///
/// Rows flagged terminal are zeroed in full before the max-reduction, so a
/// terminal transition's target is exactly its reward regardless of the
/// network's raw output for that row.
pub fn td_targets(q_next: &Tensor, rewards: &Tensor, terminals: &Tensor, gamma: f64) -> Tensor {
    let masked = q_next.masked_fill(&terminals.unsqueeze(-1), 0.0);
    let (best, _) = masked.max_dim(1, false);
    best * gamma + rewards
}
