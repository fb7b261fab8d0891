//! Synchronous control loop over the simulator.
//!
//! The runner owns simulated time: each tick it advances the simulator,
//! accumulates reporting totals, and walks every junction's decision state
//! machine in the simulator's enumeration order. Everything is
//! single-threaded and strictly in program order, which is what makes the
//! learning semantics deterministic for a fixed seed and simulator script.

use tch::Device;

use crate::config::{AgentConfig, RunConfig};
use crate::error::Error;
use crate::junction::{JunctionState, PhaseTable, TRANSITION_TICKS};
use crate::learner::QLearner;
use crate::metrics::{EpochStats, RunSummary};
use crate::observation::normalize;
use crate::policy::EpsilonGreedy;
use crate::replay::ReplayBuffer;
use crate::sim::TrafficSim;

/// Tracks the best epoch waiting time for checkpoint gating.
///
/// A checkpoint is written only when an epoch's total waiting time strictly
/// improves on the best seen so far; the first epoch always improves on the
/// initial `+∞`.
#[derive(Debug)]
pub struct CheckpointGate {
    best: f64,
}

impl CheckpointGate {
    /// Creates a gate with no epoch recorded yet.
    pub fn new() -> Self {
        Self { best: f64::INFINITY }
    }

    /// Records an epoch total; returns true on strict improvement.
    pub fn improves(&mut self, total_waiting_time: f64) -> bool {
        if total_waiting_time < self.best {
            self.best = total_waiting_time;
            true
        } else {
            false
        }
    }

    /// Best total waiting time recorded so far.
    pub fn best(&self) -> f64 {
        self.best
    }
}

impl Default for CheckpointGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives epochs of simulation, decisions and learning updates.
///
/// One shared [`QLearner`] and one shared [`EpsilonGreedy`] serve every
/// junction; each junction keeps its own [`ReplayBuffer`] and
/// [`JunctionState`]. Junction states are rebuilt at each epoch start while
/// buffers and the exploration schedule persist across epochs.
pub struct TrainingRunner<S: TrafficSim> {
    sim: S,
    agent_cfg: AgentConfig,
    run_cfg: RunConfig,
    phase_table: PhaseTable,
    learner: QLearner,
    policy: EpsilonGreedy,
    buffers: Vec<ReplayBuffer>,
    junctions: Vec<JunctionState>,
    gate: CheckpointGate,
}

impl<S: TrafficSim> TrainingRunner<S> {
    /// Builds a runner over the given simulator.
    ///
    /// Queries the simulator for its junctions and lanes, builds one buffer
    /// per junction, and — when `run_cfg.resume` is set — loads the model
    /// checkpoint, failing the whole run if it is absent or incompatible.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the phase table size differs from the agent's
    /// action space; simulator and checkpoint failures are fatal.
    pub fn new(
        sim: S,
        agent_cfg: AgentConfig,
        run_cfg: RunConfig,
        phase_table: PhaseTable,
        device: Device,
    ) -> Result<Self, Error> {
        if phase_table.len() != agent_cfg.n_actions {
            return Err(Error::Config(format!(
                "phase table has {} programs but the agent has {} actions",
                phase_table.len(),
                agent_cfg.n_actions
            )));
        }

        let ids = sim.junctions()?;
        let mut junctions = Vec::with_capacity(ids.len());
        let mut buffers = Vec::with_capacity(ids.len());
        for (index, id) in ids.into_iter().enumerate() {
            let lanes = sim.controlled_lanes(&id)?;
            junctions.push(JunctionState::new(id, index, lanes));
            buffers.push(ReplayBuffer::new(agent_cfg.input_dims, agent_cfg.capacity));
        }

        let mut learner = QLearner::new(&agent_cfg, device)?;
        if run_cfg.resume {
            learner.load(run_cfg.checkpoint_path())?;
        }
        let policy = EpsilonGreedy::new(&agent_cfg, run_cfg.seed);

        Ok(Self {
            sim,
            agent_cfg,
            run_cfg,
            phase_table,
            learner,
            policy,
            buffers,
            junctions,
            gate: CheckpointGate::new(),
        })
    }

    /// Runs the configured number of epochs.
    ///
    /// Non-online runs stop after the first epoch. After each epoch the
    /// checkpoint gate is consulted; on strict improvement during online
    /// training the shared parameters are written to the model path.
    pub fn run(&mut self) -> Result<RunSummary, Error> {
        let mut summary = RunSummary::default();

        for epoch in 0..self.run_cfg.epochs {
            self.reset_epoch();
            let stats = self.run_epoch(epoch)?;
            eprintln!(
                "[Epoch {}/{}] waiting={:.1} travel={:.1} queue={} epsilon={:.3}",
                epoch,
                self.run_cfg.epochs,
                stats.total_waiting_time,
                stats.total_travel_time,
                stats.total_queue_length,
                self.policy.epsilon()
            );

            if self.gate.improves(stats.total_waiting_time)
                && self.run_cfg.training
                && self.run_cfg.online
            {
                std::fs::create_dir_all(&self.run_cfg.model_dir)?;
                self.learner.save(self.run_cfg.checkpoint_path())?;
            }
            summary.push(stats);

            if !(self.run_cfg.training && self.run_cfg.online) {
                break;
            }
        }

        Ok(summary)
    }

    /// Runs a single epoch over ticks `0..=steps`.
    pub fn run_epoch(&mut self, epoch: u32) -> Result<EpochStats, Error> {
        let mut stats = EpochStats {
            epoch,
            ..EpochStats::default()
        };
        let hold = self.run_cfg.hold_ticks();
        let online = self.run_cfg.training && self.run_cfg.online;
        let dims = self.agent_cfg.input_dims;

        let mut step = 0u32;
        while step <= self.run_cfg.steps {
            self.sim.step()?;

            for i in 0..self.junctions.len() {
                let lanes = self.junctions[i].lanes.clone();
                let waiting = self.sim.waiting_time(&lanes)?;
                stats.total_waiting_time += waiting;
                stats.total_queue_length += u64::from(self.sim.queue_length(&lanes)?);
                for vehicle in self.sim.vehicles()? {
                    stats.total_travel_time += self.sim.accumulated_waiting_time(&vehicle)?;
                }

                if !self.junctions[i].ready() {
                    self.junctions[i].tick_down();
                    continue;
                }

                let counts = self.sim.vehicle_counts(&lanes)?;
                let raw: Vec<f64> = counts.iter().map(|&c| f64::from(c)).collect();
                let new_state = normalize(&raw, dims);
                let prior_state = normalize(&self.junctions[i].prev_state, dims);
                let prior_action = self.junctions[i].prev_action;
                let reward = -waiting;
                let terminal = step == self.run_cfg.steps;

                if online {
                    self.buffers[i]
                        .store(&prior_state, &new_state, prior_action, reward, terminal);
                    self.learner.learn(&self.buffers[i], &mut self.policy);
                }

                let action = self.policy.select_action(self.learner.network(), &new_state);
                let program = self.phase_table.program(action);
                self.sim
                    .set_phase(&self.junctions[i].id, TRANSITION_TICKS, &program.transition)?;
                self.sim.set_phase(&self.junctions[i].id, hold, &program.hold)?;
                self.junctions[i].commit(new_state, action, hold);
            }

            step += 1;
        }

        Ok(stats)
    }

    /// Rebuilds every junction's decision state for a fresh epoch.
    ///
    /// Buffers and the exploration schedule deliberately survive; only the
    /// timers and prior state/action pairs reset.
    fn reset_epoch(&mut self) {
        for junction in &mut self.junctions {
            *junction =
                JunctionState::new(junction.id.clone(), junction.index, junction.lanes.clone());
        }
    }

    /// The shared learner.
    pub fn learner(&self) -> &QLearner {
        &self.learner
    }

    /// The shared policy.
    pub fn policy(&self) -> &EpsilonGreedy {
        &self.policy
    }

    /// Mutable access to the shared policy.
    pub fn policy_mut(&mut self) -> &mut EpsilonGreedy {
        &mut self.policy
    }

    /// Per-junction replay buffers, in junction order.
    pub fn buffers(&self) -> &[ReplayBuffer] {
        &self.buffers
    }

    /// Per-junction decision states, in junction order.
    pub fn junctions(&self) -> &[JunctionState] {
        &self.junctions
    }

    /// The underlying simulator.
    pub fn sim(&self) -> &S {
        &self.sim
    }

    /// Consumes the runner, returning the simulator.
    pub fn into_sim(self) -> S {
        self.sim
    }
}

/// Measures total waiting time over a fixed horizon without any learning
/// or actuation, as a fixed-program reference figure.
pub fn measure_baseline<S: TrafficSim>(sim: &mut S, steps: u32) -> Result<f64, Error> {
    let junctions = sim.junctions()?;
    let mut total = 0.0;
    let mut step = 0u32;
    while step <= steps {
        sim.step()?;
        for junction in &junctions {
            let lanes = sim.controlled_lanes(junction)?;
            total += sim.waiting_time(&lanes)?;
        }
        step += 1;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{JunctionId, LaneId, SimError, VehicleId};
    use std::path::PathBuf;

    /// Scripted single-junction simulator: waiting times and per-lane
    /// vehicle counts are indexed by tick, actuations are recorded.
    struct ScriptedSim {
        tick: isize,
        lanes: Vec<LaneId>,
        waiting: Vec<f64>,
        counts: Vec<Vec<u32>>,
        phases: Vec<(JunctionId, u32, String)>,
    }

    impl ScriptedSim {
        fn new(waiting: Vec<f64>, counts: Vec<Vec<u32>>) -> Self {
            Self {
                tick: -1,
                lanes: (0..4).map(|i| format!("L{}", i)).collect(),
                waiting,
                counts,
                phases: Vec::new(),
            }
        }

        fn at<T: Clone + Default>(&self, table: &[T]) -> T {
            table.get(self.tick as usize).cloned().unwrap_or_default()
        }
    }

    impl TrafficSim for ScriptedSim {
        fn junctions(&self) -> Result<Vec<JunctionId>, SimError> {
            Ok(vec!["J0".to_string()])
        }

        fn controlled_lanes(&self, _junction: &JunctionId) -> Result<Vec<LaneId>, SimError> {
            Ok(self.lanes.clone())
        }

        fn step(&mut self) -> Result<(), SimError> {
            self.tick += 1;
            Ok(())
        }

        fn waiting_time(&self, _lanes: &[LaneId]) -> Result<f64, SimError> {
            Ok(self.at(&self.waiting))
        }

        fn vehicle_counts(&self, _lanes: &[LaneId]) -> Result<Vec<u32>, SimError> {
            let counts = self.at(&self.counts);
            if counts.is_empty() {
                Ok(vec![0; self.lanes.len()])
            } else {
                Ok(counts)
            }
        }

        fn queue_length(&self, _lanes: &[LaneId]) -> Result<u32, SimError> {
            Ok(0)
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
            self.phases
                .push((junction.clone(), duration_ticks, phase_state.to_string()));
            Ok(())
        }
    }

    fn scripted_run_config(steps: u32, model_name: &str) -> RunConfig {
        RunConfig {
            epochs: 1,
            steps,
            model_name: model_name.to_string(),
            model_dir: std::env::temp_dir().join("greenwave-runner-tests"),
            seed: 3,
            ..RunConfig::default()
        }
    }

    #[test]
    fn checkpoint_gate_fires_only_on_strict_improvement() {
        let mut gate = CheckpointGate::new();
        assert!(gate.improves(100.0));
        assert!(!gate.improves(120.0));
        assert!(gate.improves(80.0));
        assert_eq!(gate.best(), 80.0);
    }

    #[test]
    fn baseline_accumulates_waiting_over_horizon() {
        let mut sim = ScriptedSim::new(vec![1.0, 2.0, 3.0, 4.0], vec![]);
        let total = measure_baseline(&mut sim, 3).unwrap();
        assert_eq!(total, 10.0);
    }

    #[test]
    fn scripted_epoch_stores_learns_and_decays() {
        // Decisions land on ticks 0, 16 and 32 (hold timer = 15 ticks), so
        // the horizon of 32 yields exactly three decision points and the
        // third one is the final tick.
        let mut waiting = vec![0.0; 33];
        waiting[0] = 5.0;
        waiting[16] = 2.0;
        waiting[32] = 1.0;

        let mut counts = vec![Vec::new(); 33];
        counts[0] = vec![1, 0, 2, 0];
        counts[16] = vec![0, 3, 1, 1];
        counts[32] = vec![2, 2, 0, 0];

        let agent_cfg = AgentConfig {
            epsilon: 0.0,
            fc1_dims: 16,
            fc2_dims: 16,
            ..AgentConfig::default()
        };
        let sim = ScriptedSim::new(waiting, counts);
        let mut runner = TrainingRunner::new(
            sim,
            agent_cfg.clone(),
            scripted_run_config(32, "scripted-e2e"),
            PhaseTable::default(),
            Device::Cpu,
        )
        .unwrap();

        let summary = runner.run().unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary.epochs[0].total_waiting_time, 8.0);

        // Three transitions, stored in decision order.
        let buf = &runner.buffers()[0];
        assert_eq!(buf.counter(), 3);

        let t0 = buf.get(0);
        let t1 = buf.get(1);
        let t2 = buf.get(2);

        assert_eq!(t0.state, vec![0.0; 4]);
        assert_eq!(t0.next_state, vec![1.0, 0.0, 2.0, 0.0]);
        assert_eq!(t0.action, 0);
        assert_eq!(t0.reward, -5.0);
        assert!(!t0.terminal);

        // Prior/next chaining across decision points.
        assert_eq!(t1.state, t0.next_state);
        assert_eq!(t1.next_state, vec![0.0, 3.0, 1.0, 1.0]);
        assert_eq!(t1.reward, -2.0);
        assert!(!t1.terminal);

        assert_eq!(t2.state, t1.next_state);
        assert_eq!(t2.next_state, vec![2.0, 2.0, 0.0, 0.0]);
        assert_eq!(t2.reward, -1.0);
        assert!(t2.terminal);

        // One learning step per decision, with the matching epsilon decay.
        assert_eq!(runner.learner().steps(), 3);
        let expected_eps = (0.0 - 3.0 * agent_cfg.epsilon_dec).max(agent_cfg.epsilon_end);
        assert!((runner.policy().epsilon() - expected_eps).abs() < 1e-12);

        // Each decision actuated a transition program then a hold program.
        let sim = runner.into_sim();
        assert_eq!(sim.phases.len(), 6);
        for pair in sim.phases.chunks(2) {
            assert_eq!(pair[0].1, TRANSITION_TICKS);
            assert_eq!(pair[1].1, 15);
        }
    }

    #[test]
    fn stored_actions_chain_previous_decisions() {
        let mut waiting = vec![0.0; 33];
        waiting[0] = 3.0;
        let mut counts = vec![Vec::new(); 33];
        counts[0] = vec![4, 0, 0, 0];
        counts[16] = vec![0, 4, 0, 0];
        counts[32] = vec![0, 0, 4, 0];

        let agent_cfg = AgentConfig {
            epsilon: 0.0,
            fc1_dims: 16,
            fc2_dims: 16,
            ..AgentConfig::default()
        };
        let sim = ScriptedSim::new(waiting, counts);
        let mut runner = TrainingRunner::new(
            sim,
            agent_cfg,
            scripted_run_config(32, "scripted-chain"),
            PhaseTable::default(),
            Device::Cpu,
        )
        .unwrap();
        runner.run().unwrap();

        // The action stored at decision k is the one chosen at decision
        // k-1; the first decision stores the initial prior action 0.
        let buf = &runner.buffers()[0];
        assert_eq!(buf.get(0).action, 0);
        let junction = &runner.junctions()[0];
        let sim = runner.sim();
        // The final committed action matches the last actuated hold phase.
        let table = PhaseTable::default();
        let last_hold = &sim.phases.last().unwrap().2;
        assert_eq!(&table.program(junction.prev_action).hold, last_hold);
    }

    #[test]
    fn offline_run_neither_stores_nor_learns() {
        let mut waiting = vec![0.0; 33];
        waiting[0] = 5.0;
        let counts = vec![Vec::new(); 33];

        let agent_cfg = AgentConfig {
            epsilon: 0.0,
            fc1_dims: 16,
            fc2_dims: 16,
            ..AgentConfig::default()
        };
        let run_cfg = RunConfig {
            online: false,
            epochs: 4,
            ..scripted_run_config(32, "scripted-offline")
        };
        let sim = ScriptedSim::new(waiting, counts);
        let mut runner =
            TrainingRunner::new(sim, agent_cfg, run_cfg, PhaseTable::default(), Device::Cpu)
                .unwrap();

        let summary = runner.run().unwrap();
        // Non-online runs stop after the first epoch.
        assert_eq!(summary.len(), 1);
        assert!(runner.buffers()[0].is_empty());
        assert_eq!(runner.learner().steps(), 0);
    }

    #[test]
    fn phase_table_size_must_match_action_space() {
        let agent_cfg = AgentConfig {
            n_actions: 3,
            ..AgentConfig::default()
        };
        let sim = ScriptedSim::new(vec![], vec![]);
        let result = TrainingRunner::new(
            sim,
            agent_cfg,
            scripted_run_config(10, "scripted-table"),
            PhaseTable::default(),
            Device::Cpu,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn resume_with_missing_checkpoint_is_fatal() {
        let agent_cfg = AgentConfig {
            fc1_dims: 16,
            fc2_dims: 16,
            ..AgentConfig::default()
        };
        let run_cfg = RunConfig {
            resume: true,
            model_name: "does-not-exist".to_string(),
            model_dir: PathBuf::from("/nonexistent/greenwave"),
            ..scripted_run_config(10, "scripted-resume")
        };
        let sim = ScriptedSim::new(vec![], vec![]);
        let result =
            TrainingRunner::new(sim, agent_cfg, run_cfg, PhaseTable::default(), Device::Cpu);
        assert!(result.is_err());
    }
}
