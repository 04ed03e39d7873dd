//! Ring buffer for delayed inputs
//!
//! Inputs are deposited ahead of time, keyed by the absolute step at which
//! they are delivered, and consumed exactly once when that step is updated.

use crate::error::*;

/// Fixed-size ring of per-step input sums
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Vec<f64>,
    /// First step not yet consumed
    origin: u64,
}

impl RingBuffer {
    /// Buffer holding `horizon` consecutive steps (at least one)
    pub fn new(horizon: usize) -> Self {
        Self {
            slots: vec![0.0; horizon.max(1)],
            origin: 0,
        }
    }

    /// Number of steps the buffer can hold ahead of the origin
    pub fn horizon(&self) -> usize {
        self.slots.len()
    }

    /// First step not yet consumed
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Drop all pending input and restart at `origin`
    pub fn clear(&mut self, origin: u64) {
        self.slots.iter_mut().for_each(|s| *s = 0.0);
        self.origin = origin;
    }

    /// Add `value` to the sum delivered at `step`
    pub fn add_value(&mut self, step: u64, value: f64) -> Result<()> {
        let horizon = self.slots.len();
        if step < self.origin || step - self.origin >= horizon as u64 {
            return Err(RuntimeError::BufferHorizon {
                step,
                origin: self.origin,
                horizon,
            });
        }
        let idx = (step % horizon as u64) as usize;
        self.slots[idx] += value;
        Ok(())
    }

    /// Take the sum delivered at `step`, which must be the origin.
    ///
    /// Steps are consumed in order; the slot is zeroed for reuse and the
    /// origin advances by one.
    pub fn take(&mut self, step: u64) -> f64 {
        debug_assert_eq!(step, self.origin, "ring buffer consumed out of order");
        let idx = (step % self.slots.len() as u64) as usize;
        let value = std::mem::take(&mut self.slots[idx]);
        self.origin = step + 1;
        value
    }
}
