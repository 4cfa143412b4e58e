//! Sliding window of recent call outcomes.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Outcome of one external call, as seen by the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    /// The service answered 429
    RateLimited,
    /// The call ran into its timeout
    Timeout,
}

impl CallOutcome {
    fn is_throttle_signal(self) -> bool {
        matches!(self, CallOutcome::RateLimited | CallOutcome::Timeout)
    }
}

/// Bounded by both entry count and age; entries older than `span` are ignored.
#[derive(Debug)]
pub(crate) struct OutcomeWindow {
    entries: VecDeque<(Instant, CallOutcome)>,
    capacity: usize,
    span: Duration,
}

impl OutcomeWindow {
    pub(crate) fn new(capacity: usize, span: Duration) -> Self {
        OutcomeWindow {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            span,
        }
    }

    pub(crate) fn record(&mut self, outcome: CallOutcome) {
        let now = Instant::now();
        self.expire(now);
        self.entries.push_back((now, outcome));
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Calls in the window and the share of them that were 429s or timeouts.
    pub(crate) fn stats(&mut self) -> (usize, f64) {
        self.expire(Instant::now());
        let total = self.entries.len();
        if total == 0 {
            return (0, 0.0);
        }
        let errors = self
            .entries
            .iter()
            .filter(|(_, outcome)| outcome.is_throttle_signal())
            .count();
        (total, errors as f64 / total as f64)
    }

    fn expire(&mut self, now: Instant) {
        while let Some((at, _)) = self.entries.front() {
            if now.duration_since(*at) > self.span {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }
}
