//! Inactivity watchdog over the raw aim stream.

use crate::math::Vec3;
use std::time::{Duration, Instant};

/// One aim direction from the sensor-fusion collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimSample {
    pub direction: Vec3,
    /// Arrival order; only used for ordering, never for timing
    pub sequence: u64,
}

impl AimSample {
    pub fn new(direction: Vec3, sequence: u64) -> Self {
        Self {
            direction,
            sequence,
        }
    }
}

/// Signals pause after `timeout` without a significant change in aim.
///
/// A change is significant when any axis moves by more than `epsilon` from
/// the last significant sample. The countdown is a deadline checked by
/// [`IdleMonitor::poll`] on the same thread that calls
/// [`IdleMonitor::observe`], so a reset can never be overtaken by a stale fire.
#[derive(Debug, Clone)]
pub struct IdleMonitor {
    epsilon: f32,
    timeout: Duration,
    last_significant: Option<Vec3>,
    deadline: Option<Instant>,
}

impl IdleMonitor {
    pub fn new(epsilon: f32, timeout: Duration) -> Self {
        Self {
            epsilon,
            timeout,
            last_significant: None,
            deadline: None,
        }
    }

    pub fn observe(&mut self, direction: Vec3, now: Instant) {
        let significant = match self.last_significant {
            None => true,
            Some(last) => {
                let delta = (direction - last).abs();
                delta.max_element() > self.epsilon
            }
        };

        if significant {
            self.last_significant = Some(direction);
            self.deadline = Some(now + self.timeout);
        }
    }

    /// Returns true once when the countdown has expired, clearing the record.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                log::info!("No significant movement for {:?}", self.timeout);
                self.reset();
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.last_significant = None;
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn last_significant(&self) -> Option<Vec3> {
        self.last_significant
    }
}
