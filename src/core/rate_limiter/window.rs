//! Per-key sliding window log

use std::collections::VecDeque;

/// Time-ordered log of consumed units for one key
///
/// Records at the same millisecond are merged, so the log holds at most one
/// entry per distinct timestamp inside the retention horizon. The horizon is
/// owned by the limiter and passed in, so every key is kept for the largest
/// window the limiter has been asked about.
#[derive(Debug, Default)]
pub(super) struct SlidingWindow {
    /// `(timestamp_ms, units)`, oldest first
    events: VecDeque<(u64, u64)>,
}

/// Is a record stamped `ts` still inside a window of `span_ms` ending at `now_ms`?
fn within(ts: u64, span_ms: u64, now_ms: u64) -> bool {
    ts.saturating_add(span_ms) > now_ms
}

impl SlidingWindow {
    /// Append `units` at `now_ms`
    pub(super) fn record(&mut self, now_ms: u64, units: u64, horizon_ms: u64) {
        if units == 0 {
            return;
        }

        // Keep the log ordered even if the clock stepped back
        match self.events.back_mut() {
            Some((ts, count)) if *ts >= now_ms => *count = count.saturating_add(units),
            _ => self.events.push_back((now_ms, units)),
        }
        self.prune(now_ms, horizon_ms);
    }

    /// Units recorded in `(now_ms - window_ms, now_ms]`
    pub(super) fn used(&mut self, now_ms: u64, window_ms: u64, horizon_ms: u64) -> u64 {
        self.prune(now_ms, horizon_ms.max(window_ms));

        self.events
            .iter()
            .rev()
            .take_while(|(ts, _)| within(*ts, window_ms, now_ms))
            .fold(0u64, |sum, (_, units)| sum.saturating_add(*units))
    }

    /// Units still inside the retention horizon, without pruning
    pub(super) fn retained(&self, now_ms: u64, horizon_ms: u64) -> u64 {
        self.events
            .iter()
            .rev()
            .take_while(|(ts, _)| within(*ts, horizon_ms, now_ms))
            .fold(0u64, |sum, (_, units)| sum.saturating_add(*units))
    }

    /// Milliseconds until the oldest record inside `window_ms` expires
    pub(super) fn reset_after(&self, now_ms: u64, window_ms: u64) -> u64 {
        self.events
            .iter()
            .find(|(ts, _)| within(*ts, window_ms, now_ms))
            .map(|(ts, _)| ts.saturating_add(window_ms).saturating_sub(now_ms))
            .unwrap_or(0)
    }

    /// Drop records older than `horizon_ms`
    pub(super) fn prune(&mut self, now_ms: u64, horizon_ms: u64) {
        while let Some(&(ts, _)) = self.events.front() {
            if within(ts, horizon_ms, now_ms) {
                break;
            }
            self.events.pop_front();
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
