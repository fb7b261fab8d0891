//! Per-junction decision state and signal phase programs.

use crate::sim::{JunctionId, LaneId};

/// Ticks of the fixed transition (amber) program actuated before each hold.
pub const TRANSITION_TICKS: u32 = 6;

/// One selectable signal program: a short transition state followed by the
/// hold state that stays green for the decision interval.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseProgram {
    /// Per-lane signal string actuated for [`TRANSITION_TICKS`].
    pub transition: String,
    /// Per-lane signal string held until the next decision.
    pub hold: String,
}

/// Action-indexed table of signal programs.
///
/// Action `a` actuates `programs[a]`. The table length defines the action
/// space, so it must match the agent's `n_actions`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseTable {
    programs: Vec<PhaseProgram>,
}

impl PhaseTable {
    /// Builds a table from `(transition, hold)` pairs.
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self {
            programs: pairs
                .into_iter()
                .map(|(transition, hold)| PhaseProgram { transition, hold })
                .collect(),
        }
    }

    /// Number of programs, i.e. the size of the action space.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Returns true if the table holds no programs.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Program for the given action index.
    ///
    /// # Panics
    ///
    /// Panics if `action >= len()`.
    pub fn program(&self, action: usize) -> &PhaseProgram {
        &self.programs[action]
    }
}

impl Default for PhaseTable {
    /// Four-way crossing with one green group per approach, twelve
    /// controlled lanes.
    fn default() -> Self {
        Self::new(vec![
            ("yyyrrrrrrrrr".into(), "GGGrrrrrrrrr".into()),
            ("rrryyyrrrrrr".into(), "rrrGGGrrrrrr".into()),
            ("rrrrrryyyrrr".into(), "rrrrrrGGGrrr".into()),
            ("rrrrrrrrryyy".into(), "rrrrrrrrrGGG".into()),
        ])
    }
}

/// Decision-point state for a single junction.
///
/// A junction is either waiting (timer > 0, counting down one per tick) or
/// due for a decision (timer == 0). The state starts with a zero timer so
/// the very first tick of an epoch forces a decision, and with a zero prior
/// state sized to the junction's lane count.
#[derive(Debug, Clone)]
pub struct JunctionState {
    /// Simulator id of this junction.
    pub id: JunctionId,
    /// Dense index used to address this junction's replay buffer.
    pub index: usize,
    /// Lanes controlled by this junction, in simulator order.
    pub lanes: Vec<LaneId>,
    /// Ticks remaining until the next decision.
    pub timer: u32,
    /// Normalized state committed at the previous decision point.
    pub prev_state: Vec<f64>,
    /// Action committed at the previous decision point.
    pub prev_action: usize,
}

impl JunctionState {
    /// Creates the epoch-start state for a junction.
    pub fn new(id: JunctionId, index: usize, lanes: Vec<LaneId>) -> Self {
        let prev_state = vec![0.0; lanes.len()];
        Self {
            id,
            index,
            lanes,
            timer: 0,
            prev_state,
            prev_action: 0,
        }
    }

    /// True when the phase timer has elapsed and a decision is due.
    pub fn ready(&self) -> bool {
        self.timer == 0
    }

    /// Counts the waiting timer down by one tick.
    pub fn tick_down(&mut self) {
        self.timer = self.timer.saturating_sub(1);
    }

    /// Commits a decision: the new prior state/action pair and a fresh
    /// hold timer.
    pub fn commit(&mut self, state: Vec<f64>, action: usize, hold_ticks: u32) {
        self.prev_state = state;
        self.prev_action = action;
        self.timer = hold_ticks;
    }
}
