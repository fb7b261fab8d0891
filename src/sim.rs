//! Traffic simulator interface.
//!
//! The crate never talks to a concrete simulator directly; everything the
//! control loop needs is expressed through the [`TrafficSim`] trait so that
//! a SUMO/TraCI bridge, a hardware-in-the-loop rig, or a synthetic test
//! simulator can be swapped in without touching the learning code.

use thiserror::Error;

/// Identifier of a signalized junction, as reported by the simulator.
pub type JunctionId = String;

/// Identifier of a sensor-equipped lane controlled by a junction.
pub type LaneId = String;

/// Identifier of a vehicle currently in the simulation.
pub type VehicleId = String;

/// Failure raised by the simulator backend.
///
/// Any simulator failure is fatal for the current run: the control loop
/// propagates it without retrying.
#[derive(Debug, Error)]
pub enum SimError {
    /// The simulator connection was lost or the backend crashed.
    #[error("simulator backend failed: {0}")]
    Backend(String),

    /// A junction or lane id was not known to the simulator.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
}

/// Interface the control loop expects from a traffic simulator.
///
/// One call to [`TrafficSim::step`] advances simulated time by one tick.
/// All queries refer to the state after the most recent step. Junction
/// enumeration order must be stable across calls within a run; the control
/// loop relies on it for deterministic processing order.
pub trait TrafficSim {
    /// Returns the ids of all signalized junctions, in a stable order.
    fn junctions(&self) -> Result<Vec<JunctionId>, SimError>;

    /// Returns the lanes controlled by the given junction.
    fn controlled_lanes(&self, junction: &JunctionId) -> Result<Vec<LaneId>, SimError>;

    /// Advances simulated time by one tick.
    fn step(&mut self) -> Result<(), SimError>;

    /// Cumulative waiting time over the given lanes for the current tick.
    fn waiting_time(&self, lanes: &[LaneId]) -> Result<f64, SimError>;

    /// Number of vehicles per lane whose position exceeds the simulator's
    /// fixed distance threshold from the lane start.
    ///
    /// The returned counts are aligned with the order of `lanes`.
    fn vehicle_counts(&self, lanes: &[LaneId]) -> Result<Vec<u32>, SimError>;

    /// Total number of halted vehicles over the given lanes.
    ///
    /// Used for epoch-level reporting only, never for learning.
    fn queue_length(&self, lanes: &[LaneId]) -> Result<u32, SimError>;

    /// Ids of all vehicles currently in the simulation.
    fn vehicles(&self) -> Result<Vec<VehicleId>, SimError>;

    /// Waiting time accumulated by a single vehicle since it entered.
    ///
    /// Used for epoch-level reporting only, never for learning.
    fn accumulated_waiting_time(&self, vehicle: &VehicleId) -> Result<f64, SimError>;

    /// Actuates a signal program on a junction.
    ///
    /// `phase_state` is the simulator's per-lane signal string (e.g.
    /// `"GGGrrrrrrrrr"`); the program holds for `duration_ticks` ticks
    /// unless replaced earlier.
    fn set_phase(
        &mut self,
        junction: &JunctionId,
        duration_ticks: u32,
        phase_state: &str,
    ) -> Result<(), SimError>;
}
