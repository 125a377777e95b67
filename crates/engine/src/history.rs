// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ring-buffered input/output history: edge detection, extended-hold
//! debounce, and the comms-health watchdog (§4.2, §4.4).
//!
//! Samples carry an explicit timestamp supplied by the caller rather than
//! reading a clock internally — this keeps the buffers (and everything
//! built on them) driven entirely by the polling thread's own notion of
//! "now", which is what makes the scenario tests in `tests/scenarios`
//! able to fast-forward through minutes of simulated time without
//! sleeping.

use std::collections::{HashMap, VecDeque};

/// A single sampled value: a coil reading or a register reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Reg(u16),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Reg(_) => None,
        }
    }

    pub fn as_reg(&self) -> Option<u16> {
        match self {
            Self::Reg(r) => Some(*r),
            Self::Bool(_) => None,
        }
    }
}

/// One timestamped snapshot of a merged label-to-value map (§3 LogEntry).
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: f64,
    pub data: HashMap<&'static str, Value>,
}

/// A fixed-capacity, oldest-out-on-overflow ring of [`LogEntry`] (I2, P2).
#[derive(Debug)]
pub struct RingLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl RingLog {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity.min(4096)), capacity: capacity.max(1) }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn newest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// The most recent `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&LogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.entries.iter()
    }

    fn in_window(&self, now: f64, window_s: f64) -> impl DoubleEndedIterator<Item = &LogEntry> {
        let floor = now - window_s;
        self.entries.iter().filter(move |e| e.timestamp >= floor && e.timestamp <= now)
    }
}

/// The two ring buffers (input, output) and the derived queries rules use.
#[derive(Debug)]
pub struct History {
    input: RingLog,
    output: RingLog,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self { input: RingLog::new(capacity), output: RingLog::new(capacity) }
    }

    pub fn record_input(&mut self, timestamp: f64, data: HashMap<&'static str, Value>) {
        self.input.push(LogEntry { timestamp, data });
    }

    pub fn record_output(&mut self, timestamp: f64, data: HashMap<&'static str, Value>) {
        self.output.push(LogEntry { timestamp, data });
    }

    pub fn input(&self) -> &RingLog {
        &self.input
    }

    pub fn output(&self) -> &RingLog {
        &self.output
    }

    pub fn recent_input(&self, n: usize) -> Vec<&LogEntry> {
        self.input.recent(n)
    }

    pub fn recent_output(&self, n: usize) -> Vec<&LogEntry> {
        self.output.recent(n)
    }

    /// True iff two chronologically adjacent samples of `label` within
    /// `[now-window_s, now]` transition False -> True (§4.4, P3).
    pub fn rising_edge(&self, label: &str, now: f64, window_s: f64) -> bool {
        self.has_edge(label, now, window_s, false, true)
    }

    /// True iff two chronologically adjacent samples of `label` within
    /// `[now-window_s, now]` transition True -> False (§4.4, P3).
    pub fn falling_edge(&self, label: &str, now: f64, window_s: f64) -> bool {
        self.has_edge(label, now, window_s, true, false)
    }

    fn has_edge(&self, label: &str, now: f64, window_s: f64, from: bool, to: bool) -> bool {
        let samples: Vec<bool> = self
            .input
            .in_window(now, window_s)
            .filter_map(|e| e.data.get(label).and_then(Value::as_bool))
            .collect();
        samples.windows(2).any(|pair| pair[0] == from && pair[1] == to)
    }

    /// True iff every sample of `label` in `[now-seconds, now]` equals
    /// `value` and the window is fully covered by history (§4.4, P4).
    pub fn extended_hold(&self, label: &str, value: bool, now: f64, seconds: f64) -> bool {
        let mut oldest: Option<f64> = None;
        let mut all_match = true;
        let mut any = false;
        for entry in self.input.in_window(now, seconds) {
            let Some(sample) = entry.data.get(label).and_then(Value::as_bool) else {
                continue;
            };
            any = true;
            if sample != value {
                all_match = false;
            }
            oldest = Some(oldest.map_or(entry.timestamp, |o: f64| o.min(entry.timestamp)));
        }
        let Some(oldest) = oldest else {
            return false;
        };
        any && all_match && oldest <= now - seconds
    }

    /// Comms-health watchdog (§4.2): empty history is startup grace,
    /// starvation beyond `timeout_s` is unhealthy, otherwise scan
    /// newest-to-oldest within the window for a live VERSION heartbeat.
    pub fn check_comms_health(&self, now: f64, timeout_s: f64) -> bool {
        let Some(newest) = self.output.newest() else {
            return true;
        };
        if newest.timestamp < now - timeout_s {
            return false;
        }
        self.output
            .in_window(now, timeout_s)
            .rev()
            .any(|e| e.data.get("VERSION").and_then(Value::as_reg).is_some_and(|v| v != 0))
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
