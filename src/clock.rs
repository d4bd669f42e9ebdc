use std::time::Duration;

use tracing::debug;

/// Gaps longer than this between two ticks are treated as a suspended
/// process rather than breathing time.
pub const DEFAULT_MAX_GAP: Duration = Duration::from_secs(1);

/// Turns successive timestamps into time deltas for the phase machine.
///
/// Timestamps are offsets from any fixed epoch the driver picks; only their
/// differences matter. The clock does no scheduling of its own.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    previous: Option<Duration>,
    max_gap: Duration,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::with_max_gap(DEFAULT_MAX_GAP)
    }

    pub fn with_max_gap(max_gap: Duration) -> Self {
        Self {
            previous: None,
            max_gap,
        }
    }

    /// Forget the reference timestamp so the next tick only re-establishes it.
    pub fn rebase(&mut self) {
        self.previous = None;
    }

    pub fn has_reference(&self) -> bool {
        self.previous.is_some()
    }

    pub fn max_gap(&self) -> Duration {
        self.max_gap
    }

    /// Returns the seconds elapsed since the previous tick, or `None` when
    /// there is nothing to apply: the first tick after a rebase, a timestamp
    /// that went backwards, or a gap longer than `max_gap`.
    pub fn tick(&mut self, now: Duration) -> Option<f64> {
        let previous = self.previous.replace(now)?;

        match now.checked_sub(previous) {
            None => {
                debug!(?now, ?previous, "clock went backwards, discarding tick");
                None
            }
            Some(gap) if gap > self.max_gap => {
                debug!(?gap, "tick gap exceeds limit, discarding");
                None
            }
            Some(gap) => Some(gap.as_secs_f64()),
        }
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}
