//! Epoch-level performance reporting.
//!
//! These figures are collected for reporting only; learning never reads
//! them. Plot generation is left to downstream tooling.

use std::fmt;

/// Totals accumulated over one epoch.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpochStats {
    /// Epoch index within the run.
    pub epoch: u32,
    /// Sum of per-tick lane waiting time over all junctions.
    pub total_waiting_time: f64,
    /// Sum of accumulated per-vehicle waiting time, sampled once per
    /// junction per tick.
    pub total_travel_time: f64,
    /// Sum of per-tick halted-vehicle counts over all junctions.
    pub total_queue_length: u64,
}

impl fmt::Display for EpochStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "epoch {}: waiting={:.1} travel={:.1} queue={}",
            self.epoch, self.total_waiting_time, self.total_travel_time, self.total_queue_length
        )
    }
}

/// Aggregated results of a full run.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
    /// Per-epoch totals, in execution order.
    pub epochs: Vec<EpochStats>,
    /// Lowest total waiting time seen across the run.
    pub best_waiting_time: Option<f64>,
}

impl RunSummary {
    /// Records an epoch and updates the best waiting time.
    pub fn push(&mut self, stats: EpochStats) {
        let waiting = stats.total_waiting_time;
        if self.best_waiting_time.is_none_or(|best| waiting < best) {
            self.best_waiting_time = Some(waiting);
        }
        self.epochs.push(stats);
    }

    /// Number of completed epochs.
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    /// Returns true if no epoch has completed yet.
    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Run Summary ({} epochs) ===", self.epochs.len())?;
        for stats in &self.epochs {
            writeln!(f, "  {}", stats)?;
        }
        match self.best_waiting_time {
            Some(best) => writeln!(f, "  Best total waiting time: {:.1}", best),
            None => writeln!(f, "  No epochs completed"),
        }
    }
}
