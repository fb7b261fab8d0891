//! Shared Q-value network using tch-rs (PyTorch bindings).
//!
//! One instance serves every junction; its variable store holds the only
//! learnable parameters in the system.

use std::path::Path;

use tch::{nn, nn::Module, Device, Kind, Tensor};

/// MLP regressor estimating one action value per discrete action.
///
/// Architecture: `input_dims → fc1_dims → fc2_dims → n_actions` with ReLU
/// activations on the hidden layers and a linear output.
pub struct QNetwork {
    vs: nn::VarStore,
    net: nn::Sequential,
    input_dims: usize,
    n_actions: usize,
}

impl QNetwork {
    /// Creates a new network with freshly initialized parameters.
    pub fn new(
        input_dims: usize,
        fc1_dims: usize,
        fc2_dims: usize,
        n_actions: usize,
        device: Device,
    ) -> Self {
        let vs = nn::VarStore::new(device);
        let p = &vs.root();
        let net = nn::seq()
            .add(nn::linear(
                p / "fc1",
                input_dims as i64,
                fc1_dims as i64,
                Default::default(),
            ))
            .add_fn(|x| x.relu())
            .add(nn::linear(
                p / "fc2",
                fc1_dims as i64,
                fc2_dims as i64,
                Default::default(),
            ))
            .add_fn(|x| x.relu())
            .add(nn::linear(
                p / "out",
                fc2_dims as i64,
                n_actions as i64,
                Default::default(),
            ));

        Self {
            vs,
            net,
            input_dims,
            n_actions,
        }
    }

    /// Forward pass: maps a `[batch, input_dims]` tensor to
    /// `[batch, n_actions]` action values.
    pub fn forward(&self, states: &Tensor) -> Tensor {
        self.net.forward(states)
    }

    /// Action values for a single observation.
    pub fn action_values(&self, observation: &[f64]) -> Vec<f64> {
        let obs: Vec<f32> = observation.iter().map(|&v| v as f32).collect();
        let input = Tensor::from_slice(&obs)
            .reshape([1, self.input_dims as i64])
            .to_kind(Kind::Float)
            .to_device(self.vs.device());
        let values = self.forward(&input).squeeze_dim(0).to_kind(Kind::Double);
        Vec::<f64>::try_from(values).unwrap_or_else(|_| vec![0.0; self.n_actions])
    }

    /// Saves all parameters to the given path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), tch::TchError> {
        self.vs.save(path)
    }

    /// Loads parameters previously written by [`QNetwork::save`].
    ///
    /// Fails if the file is missing or its tensors do not match this
    /// network's shape.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), tch::TchError> {
        self.vs.load(path)
    }

    /// State dimension D expected by [`QNetwork::forward`].
    pub fn input_dims(&self) -> usize {
        self.input_dims
    }

    /// Size of the action space.
    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// Device the parameters live on.
    pub fn device(&self) -> Device {
        self.vs.device()
    }

    /// Returns a reference to the variable store.
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Returns a mutable reference to the variable store for optimization.
    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_shape() {
        let net = QNetwork::new(4, 16, 16, 4, Device::Cpu);
        let states = Tensor::randn([8, 4], (Kind::Float, Device::Cpu));
        let values = net.forward(&states);
        assert_eq!(values.size(), &[8, 4]);
    }

    #[test]
    fn action_values_length_matches_action_space() {
        let net = QNetwork::new(4, 16, 16, 6, Device::Cpu);
        let values = net.action_values(&[0.5, 0.5, 0.5, 0.5]);
        assert_eq!(values.len(), 6);
    }

    #[test]
    fn forward_is_deterministic() {
        let net = QNetwork::new(4, 16, 16, 4, Device::Cpu);
        let a = net.action_values(&[1.0, 2.0, 3.0, 4.0]);
        let b = net.action_values(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(a, b);
    }
}
