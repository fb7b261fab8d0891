//! Training demo: two synthetic junctions under the shared Q-learner.
//!
//! Builds a toy traffic simulator (Poisson-ish arrivals, one green approach
//! per junction drains its queue), runs a fixed-program baseline for
//! reference, then trains the shared network online for a few epochs.
//!
//! Run (requires libtorch):
//! ```sh
//! cargo run --example train_demo --features nn
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tch::Device;

use greenwave::{
    measure_baseline, AgentConfig, JunctionId, LaneId, PhaseTable, RunConfig, SimError,
    TrafficSim, TrainingRunner, VehicleId, TRANSITION_TICKS,
};

const APPROACHES: usize = 4;

/// Toy simulator: each junction has one lane per approach; a lane gains a
/// vehicle with a per-approach arrival probability each tick and drains
/// while its approach is green.
struct ToySim {
    rng: StdRng,
    queues: Vec<[u32; APPROACHES]>,
    green: Vec<Option<usize>>,
    arrival: [f64; APPROACHES],
}

impl ToySim {
    fn new(n_junctions: usize, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            queues: vec![[0; APPROACHES]; n_junctions],
            green: vec![None; n_junctions],
            // Uneven demand: approach 0 is the busy one.
            arrival: [0.6, 0.2, 0.15, 0.1],
        }
    }

    fn junction_of(&self, lane: &LaneId) -> usize {
        lane[1..lane.find(':').unwrap()].parse().unwrap()
    }

    fn approach_of(&self, lane: &LaneId) -> usize {
        lane[lane.find(':').unwrap() + 1..].parse().unwrap()
    }
}

impl TrafficSim for ToySim {
    fn junctions(&self) -> Result<Vec<JunctionId>, SimError> {
        Ok((0..self.queues.len()).map(|j| format!("J{}", j)).collect())
    }

    fn controlled_lanes(&self, junction: &JunctionId) -> Result<Vec<LaneId>, SimError> {
        let j: usize = junction[1..]
            .parse()
            .map_err(|_| SimError::UnknownEntity(junction.clone()))?;
        Ok((0..APPROACHES).map(|a| format!("J{}:{}", j, a)).collect())
    }

    fn step(&mut self) -> Result<(), SimError> {
        for j in 0..self.queues.len() {
            for a in 0..APPROACHES {
                if self.rng.gen::<f64>() < self.arrival[a] {
                    self.queues[j][a] += 1;
                }
            }
            if let Some(a) = self.green[j] {
                self.queues[j][a] = self.queues[j][a].saturating_sub(2);
            }
        }
        Ok(())
    }

    fn waiting_time(&self, lanes: &[LaneId]) -> Result<f64, SimError> {
        // Every queued vehicle waits one tick per tick.
        Ok(lanes
            .iter()
            .map(|l| f64::from(self.queues[self.junction_of(l)][self.approach_of(l)]))
            .sum())
    }

    fn vehicle_counts(&self, lanes: &[LaneId]) -> Result<Vec<u32>, SimError> {
        Ok(lanes
            .iter()
            .map(|l| self.queues[self.junction_of(l)][self.approach_of(l)])
            .collect())
    }

    fn queue_length(&self, lanes: &[LaneId]) -> Result<u32, SimError> {
        Ok(lanes
            .iter()
            .map(|l| self.queues[self.junction_of(l)][self.approach_of(l)])
            .sum())
    }

    fn vehicles(&self) -> Result<Vec<VehicleId>, SimError> {
        Ok(Vec::new())
    }

    fn accumulated_waiting_time(&self, _vehicle: &VehicleId) -> Result<f64, SimError> {
        Ok(0.0)
    }

    fn set_phase(
        &mut self,
        junction: &JunctionId,
        duration_ticks: u32,
        phase_state: &str,
    ) -> Result<(), SimError> {
        let j: usize = junction[1..]
            .parse()
            .map_err(|_| SimError::UnknownEntity(junction.clone()))?;
        // Only the hold program switches the green approach; the short
        // transition program keeps the previous one draining.
        if duration_ticks > TRANSITION_TICKS {
            self.green[j] = phase_state.find('G');
        }
        Ok(())
    }
}

/// One green approach per action, four-lane junctions.
fn toy_phase_table() -> PhaseTable {
    PhaseTable::new(
        (0..APPROACHES)
            .map(|a| {
                let mut transition = vec!['r'; APPROACHES];
                let mut hold = vec!['r'; APPROACHES];
                transition[a] = 'y';
                hold[a] = 'G';
                (
                    transition.into_iter().collect(),
                    hold.into_iter().collect(),
                )
            })
            .collect(),
    )
}

fn main() {
    println!("=== Adaptive Signal Control Demo ===\n");

    let steps = 300;

    // Fixed-program reference: nobody ever gets green.
    let mut baseline_sim = ToySim::new(2, 7);
    let baseline = measure_baseline(&mut baseline_sim, steps).expect("baseline run");
    println!("Baseline total waiting time: {:.0}\n", baseline);

    let agent_cfg = AgentConfig {
        epsilon: 1.0,
        epsilon_dec: 0.05,
        epsilon_end: 0.05,
        lr: 1e-3,
        fc1_dims: 64,
        fc2_dims: 64,
        ..AgentConfig::default()
    };
    let run_cfg = RunConfig {
        epochs: 5,
        steps,
        model_name: "toy".to_string(),
        model_dir: std::env::temp_dir().join("greenwave-demo"),
        seed: 7,
        ..RunConfig::default()
    };

    println!("Training online for {} epochs...", run_cfg.epochs);
    let sim = ToySim::new(2, 7);
    let mut runner = TrainingRunner::new(sim, agent_cfg, run_cfg, toy_phase_table(), Device::Cpu)
        .expect("runner construction");
    let summary = runner.run().expect("training run");

    println!("\n{}", summary);
    println!(
        "Final epsilon: {:.3}, learning steps: {}",
        runner.policy().epsilon(),
        runner.learner().steps()
    );
}
