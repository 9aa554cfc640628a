use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::trace;

use laya_domain::PitchClass;

/// Minimum wall-clock time between recomputations.
const UPDATE_INTERVAL: Duration = Duration::from_millis(500);
const KEY_HISTORY_LEN: usize = 10;

/// Dominant-bin key estimator, stabilized by time-gated majority voting.
/// A coarse heuristic (loudest bin mod 12), not chroma analysis; the
/// voting history only smooths the label, it does not make the mapping
/// harmonic.
pub struct KeyEstimator {
    history: VecDeque<PitchClass>,
    last_update: Instant,
}

impl KeyEstimator {
    /// `start` seeds the gate, so the first recomputation happens half a
    /// second into the session.
    pub fn new(start: Instant) -> Self {
        Self {
            history: VecDeque::with_capacity(KEY_HISTORY_LEN),
            last_update: start,
        }
    }

    /// Returns the current key label, recomputing at most once per
    /// `UPDATE_INTERVAL`. Gated calls and degenerate frames (empty or
    /// all zero) return the latest history entry without touching state.
    pub fn estimate(&mut self, freq: &[u8], now: Instant) -> Option<PitchClass> {
        if now.duration_since(self.last_update) < UPDATE_INTERVAL {
            return self.history.back().copied();
        }
        if freq.is_empty() || freq.iter().all(|&b| b == 0) {
            return self.history.back().copied();
        }

        let mut dominant = 0;
        for (index, &value) in freq.iter().enumerate() {
            // First occurrence wins on ties.
            if value > freq[dominant] {
                dominant = index;
            }
        }
        let label = PitchClass::from_bin_index(dominant);
        if self.history.len() == KEY_HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(label);

        let mode = self.mode();
        self.last_update = now;
        trace!(bin = dominant, %label, %mode, "key tick");
        Some(mode)
    }

    /// Most frequent label in history; on a count tie the label that
    /// reached the maximum count first in chronological order wins.
    fn mode(&self) -> PitchClass {
        let mut counts = [0usize; 12];
        let mut best = *self.history.back().expect("mode follows a push");
        let mut best_count = 0;
        for &entry in &self.history {
            counts[entry as usize] += 1;
            if counts[entry as usize] > best_count {
                best_count = counts[entry as usize];
                best = entry;
            }
        }
        best
    }
}
