//! Simulated platform time.
//!
//! The "current date" is an integer day counter advanced only by an explicit
//! admin action, never by wall time. Callers read the day once per operation
//! and reuse the value, so a concurrent advance can never produce a torn
//! mixture of days within one computation.

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::info;

use crate::error::{AdError, AdResult};

/// Source of the simulated current date. Injected wherever time is needed so
/// tests can pin arbitrary days without process-wide state.
pub trait ClockSource: Send + Sync {
    /// The current simulated day. 0 until the first advance.
    fn current_date(&self) -> u32;

    /// Set the day to `new_date`. Fails if that would move time backwards;
    /// re-setting the same day is allowed. Returns the stored value.
    fn advance(&self, new_date: u32) -> AdResult<u32>;
}

/// Process-wide atomic day counter.
#[derive(Debug, Default)]
pub struct SimulatedClock {
    day: AtomicU32,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(day: u32) -> Self {
        Self {
            day: AtomicU32::new(day),
        }
    }
}

impl ClockSource for SimulatedClock {
    fn current_date(&self) -> u32 {
        self.day.load(Ordering::SeqCst)
    }

    fn advance(&self, new_date: u32) -> AdResult<u32> {
        // CAS loop: concurrent advances serialize, the counter never decreases.
        self.day
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (new_date >= current).then_some(new_date)
            })
            .map_err(|current| {
                AdError::Validation(format!(
                    "current_date can't be less than the set date ({current})"
                ))
            })?;
        info!(day = new_date, "Simulated date advanced");
        Ok(new_date)
    }
}
