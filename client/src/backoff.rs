//! Polling delays over the Luby sequence.
//!
//! The sequence (1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8, ...) keeps
//! early polls snappy while spacing them out for long-running jobs, without
//! the runaway gaps of plain exponential backoff.

use std::time::Duration;

/// Value of the Luby sequence at 1-based position `i`.
pub fn luby(i: u64) -> u64 {
    let mut k = 1u32;
    while (1u64 << k) - 1 < i {
        k += 1;
    }
    if i == (1u64 << k) - 1 {
        1u64 << (k - 1)
    } else {
        luby(i - ((1u64 << (k - 1)) - 1))
    }
}

/// Stateful delay schedule: the Luby sequence scaled by a unit and capped.
#[derive(Clone, Debug)]
pub struct Backoff {
    step: u64,
    unit: Duration,
    cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(16))
    }
}

impl Backoff {
    pub fn new(unit: Duration, cap: Duration) -> Self {
        Self { step: 0, unit, cap }
    }

    /// Delay before the next poll.
    pub fn next_delay(&mut self) -> Duration {
        self.step += 1;
        self.cap.min(self.unit * luby(self.step) as u32)
    }
}
