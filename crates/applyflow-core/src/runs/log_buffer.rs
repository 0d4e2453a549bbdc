//! Capped ring buffer for run log lines.

use std::collections::VecDeque;

/// FIFO-evicting line buffer. Length never exceeds the cap; the newest
/// lines are always retained, so after overflow the buffer holds the
/// suffix of everything pushed.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    cap: usize,
    lines: VecDeque<String>,
    /// Total lines ever pushed, monotonic. Log-stream cursors compare
    /// against this to compute which lines they have not yet emitted.
    total_pushed: u64,
}

impl LogBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            lines: VecDeque::with_capacity(cap.min(256)),
            total_pushed: 0,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.cap {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        self.total_pushed += 1;
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    /// Lines pushed after `cursor` (a previous `total_pushed` value),
    /// together with the new cursor. Lines already evicted are gone; the
    /// caller gets whatever suffix still exists.
    pub fn lines_since(&self, cursor: u64) -> (Vec<String>, u64) {
        let missed = self.total_pushed.saturating_sub(cursor) as usize;
        let available = missed.min(self.lines.len());
        let start = self.lines.len() - available;
        let new_lines = self.lines.iter().skip(start).cloned().collect();
        (new_lines, self.total_pushed)
    }
}
