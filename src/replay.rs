//! Per-junction experience storage.
//!
//! Each junction owns one [`ReplayBuffer`]; nothing is ever shared between
//! buffers. Storage is a fixed-capacity ring over parallel arrays, mirroring
//! the layout the learner consumes: flattened f32 state rows plus scalar
//! columns for action, reward and terminal flag.

/// One stored transition, read back from a buffer slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State vector at the decision point, length D.
    pub state: Vec<f32>,
    /// State vector at the following decision point, length D.
    pub next_state: Vec<f32>,
    /// Chosen action index.
    pub action: i64,
    /// Scalar reward observed for the transition.
    pub reward: f32,
    /// Whether the transition ended the epoch.
    pub terminal: bool,
}

/// Fixed-capacity ring buffer of transitions.
///
/// The write slot is always `counter % capacity`; once the counter exceeds
/// the capacity, the oldest entry is overwritten. The counter only ever
/// resets through [`ReplayBuffer::reset`], which deliberately leaves stored
/// values in place (they are simply overwritten as the counter catches back
/// up).
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    dims: usize,
    capacity: usize,
    states: Vec<f32>,
    next_states: Vec<f32>,
    actions: Vec<i64>,
    rewards: Vec<f32>,
    terminals: Vec<bool>,
    counter: usize,
}

impl ReplayBuffer {
    /// Creates an empty buffer for `dims`-component states.
    pub fn new(dims: usize, capacity: usize) -> Self {
        Self {
            dims,
            capacity,
            states: vec![0.0; capacity * dims],
            next_states: vec![0.0; capacity * dims],
            actions: vec![0; capacity],
            rewards: vec![0.0; capacity],
            terminals: vec![false; capacity],
            counter: 0,
        }
    }

    /// Stores one transition at the current write slot.
    ///
    /// If either vector's length differs from D the call is a silent no-op;
    /// upstream normalization makes that unreachable in correct operation,
    /// and a mismatch must never crash the run.
    pub fn store(
        &mut self,
        state: &[f64],
        next_state: &[f64],
        action: usize,
        reward: f64,
        terminal: bool,
    ) {
        if state.len() != self.dims || next_state.len() != self.dims {
            return;
        }

        let slot = self.counter % self.capacity;
        let row = slot * self.dims;
        for (i, &v) in state.iter().enumerate() {
            self.states[row + i] = v as f32;
        }
        for (i, &v) in next_state.iter().enumerate() {
            self.next_states[row + i] = v as f32;
        }
        self.actions[slot] = action as i64;
        self.rewards[slot] = reward as f32;
        self.terminals[slot] = terminal;
        self.counter += 1;
    }

    /// Zeroes the write counter. Stored values are not erased.
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    /// Number of addressable transitions: `min(counter, capacity)`.
    pub fn len(&self) -> usize {
        self.counter.min(self.capacity)
    }

    /// Returns true if nothing has been stored since the last reset.
    pub fn is_empty(&self) -> bool {
        self.counter == 0
    }

    /// Total number of stores since the last reset.
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// State dimension D.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Maximum number of transitions held at once.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Flattened state rows of all addressable transitions, row-major.
    pub fn states_flat(&self) -> &[f32] {
        &self.states[..self.len() * self.dims]
    }

    /// Flattened next-state rows of all addressable transitions, row-major.
    pub fn next_states_flat(&self) -> &[f32] {
        &self.next_states[..self.len() * self.dims]
    }

    /// Action column of all addressable transitions.
    pub fn actions(&self) -> &[i64] {
        &self.actions[..self.len()]
    }

    /// Reward column of all addressable transitions.
    pub fn rewards(&self) -> &[f32] {
        &self.rewards[..self.len()]
    }

    /// Terminal column of all addressable transitions.
    pub fn terminals(&self) -> &[bool] {
        &self.terminals[..self.len()]
    }

    /// Reads back the transition stored at the given slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= len()`.
    pub fn get(&self, slot: usize) -> Transition {
        assert!(slot < self.len(), "slot {} out of range", slot);
        let row = slot * self.dims;
        Transition {
            state: self.states[row..row + self.dims].to_vec(),
            next_state: self.next_states[row..row + self.dims].to_vec(),
            action: self.actions[slot],
            reward: self.rewards[slot],
            terminal: self.terminals[slot],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(dims: usize, capacity: usize, n: usize) -> ReplayBuffer {
        let mut buf = ReplayBuffer::new(dims, capacity);
        for k in 0..n {
            let v = k as f64;
            buf.store(
                &vec![v; dims],
                &vec![v + 0.5; dims],
                k % 3,
                -v,
                false,
            );
        }
        buf
    }

    #[test]
    fn store_writes_all_fields() {
        let mut buf = ReplayBuffer::new(4, 8);
        buf.store(&[1.0, 2.0, 3.0, 4.0], &[5.0, 6.0, 7.0, 8.0], 2, -3.5, true);
        assert_eq!(buf.counter(), 1);
        let t = buf.get(0);
        assert_eq!(t.state, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(t.next_state, vec![5.0, 6.0, 7.0, 8.0]);
        assert_eq!(t.action, 2);
        assert_eq!(t.reward, -3.5);
        assert!(t.terminal);
    }

    #[test]
    fn mismatched_dims_is_a_silent_no_op() {
        let mut buf = ReplayBuffer::new(4, 8);
        buf.store(&[1.0, 2.0], &[1.0, 2.0, 3.0, 4.0], 0, 0.0, false);
        buf.store(&[1.0, 2.0, 3.0, 4.0], &[1.0], 0, 0.0, false);
        assert_eq!(buf.counter(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn ring_overwrites_oldest() {
        let capacity = 4;
        let k = 3;
        let buf = filled(2, capacity, capacity + k);

        assert_eq!(buf.len(), capacity);
        assert_eq!(buf.counter(), capacity + k);

        // The most recent store landed at (counter - 1) % capacity.
        let newest = buf.get((buf.counter() - 1) % capacity);
        assert_eq!(newest.reward, -((capacity + k - 1) as f32));

        // Exactly the most recent `capacity` rewards remain addressable.
        let mut rewards: Vec<f32> = buf.rewards().to_vec();
        rewards.sort_by(|a, b| b.partial_cmp(a).unwrap());
        let expected: Vec<f32> = (k..capacity + k).map(|v| -(v as f32)).collect();
        let mut expected_sorted = expected;
        expected_sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_eq!(rewards, expected_sorted);
    }

    #[test]
    fn write_slot_is_counter_mod_capacity() {
        let mut buf = ReplayBuffer::new(1, 3);
        for k in 0..7 {
            let slot = buf.counter() % buf.capacity();
            buf.store(&[k as f64], &[0.0], 0, k as f64, false);
            assert_eq!(buf.get(slot).reward, k as f32);
        }
    }

    #[test]
    fn reset_zeroes_counter_but_keeps_values() {
        let mut buf = filled(2, 4, 3);
        buf.reset();
        assert_eq!(buf.counter(), 0);
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);

        // Old values are still in place and get overwritten from slot 0.
        buf.store(&[9.0, 9.0], &[9.0, 9.0], 1, 9.0, false);
        assert_eq!(buf.get(0).reward, 9.0);
    }

    #[test]
    fn batch_slices_cover_addressable_rows() {
        let buf = filled(3, 10, 4);
        assert_eq!(buf.states_flat().len(), 4 * 3);
        assert_eq!(buf.next_states_flat().len(), 4 * 3);
        assert_eq!(buf.actions().len(), 4);
        assert_eq!(buf.rewards().len(), 4);
        assert_eq!(buf.terminals().len(), 4);
    }
}
