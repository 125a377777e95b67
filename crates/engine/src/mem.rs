// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent machine memory (§3 MachineMemory, §4.3).
//!
//! Constructed once when the engine is built, mutated only by rules, and
//! cleared only by an explicit `clear()` (the E-Stop rule does this).
//! The reserved `_MODE` slot from the Python original becomes a first-class
//! [`Mode`] field rather than a string key in the generic store (§9
//! "Dynamic-typed memory").

use std::collections::HashMap;
use std::fmt;

/// Operational mode of the feeder (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Ready,
    Manual,
    MovingC3ToC2,
    MovingBoth,
    MovingC2ToPalm,
    ErrorSafety,
    ErrorComms,
    ErrorCommsAck,
    ErrorEstop,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ready => "READY",
            Self::Manual => "MANUAL",
            Self::MovingC3ToC2 => "MOVING_C3_TO_C2",
            Self::MovingBoth => "MOVING_BOTH",
            Self::MovingC2ToPalm => "MOVING_C2_TO_PALM",
            Self::ErrorSafety => "ERROR_SAFETY",
            Self::ErrorComms => "ERROR_COMMS",
            Self::ErrorCommsAck => "ERROR_COMMS_ACK",
            Self::ErrorEstop => "ERROR_ESTOP",
        })
    }
}

/// A typed value in machine memory, replacing the Python source's
/// dynamically-typed dict entries.
#[derive(Debug, Clone, PartialEq)]
pub enum MemValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    /// A monotonic-clock timestamp, used for the timestamp-in-memory
    /// delay pattern (§4.3, §9) instead of sleeping inside a rule action.
    Timestamp(f64),
    Text(String),
}

impl MemValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<f64> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

/// Cross-scan persistent state: the operational mode plus a generic,
/// rule-addressable key/value store for timers and flags.
#[derive(Debug, Default)]
pub struct MachineMemory {
    mode: Option<Mode>,
    state: HashMap<String, MemValue>,
}

impl MachineMemory {
    pub fn new() -> Self {
        Self { mode: None, state: HashMap::new() }
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// Set the operational mode. Logs at INFO iff it actually changed
    /// (P6); a no-op transition to the same mode is silent.
    pub fn set_mode(&mut self, new: Mode) {
        match self.mode {
            Some(prev) if prev == new => {}
            Some(prev) => {
                tracing::info!(%prev, %new, "mode: {prev} -> {new}");
                self.mode = Some(new);
            }
            None => {
                tracing::info!(%new, "mode: {new}");
                self.mode = Some(new);
            }
        }
    }

    /// Unset the mode (used when recovering from ERROR_ESTOP back to the
    /// pre-mode-machine "unset" state per §4.5).
    pub fn unset_mode(&mut self) {
        self.mode = None;
    }

    pub fn get(&self, key: &str) -> Option<&MemValue> {
        self.state.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.state.get(key).and_then(MemValue::as_bool)
    }

    pub fn get_timestamp(&self, key: &str) -> Option<f64> {
        self.state.get(key).and_then(MemValue::as_timestamp)
    }

    pub fn set(&mut self, key: impl Into<String>, value: MemValue) {
        self.state.insert(key.into(), value);
    }

    pub fn pop(&mut self, key: &str) -> Option<MemValue> {
        self.state.remove(key)
    }

    /// Clears the generic store. Does not touch `mode` — the caller (the
    /// E-Stop rule) always follows with an explicit `set_mode` (§4.5).
    pub fn clear(&mut self) {
        self.state.clear();
    }

    /// A cloned snapshot of the generic store, for the shared-state
    /// publisher (§3 SharedState, §4.6).
    pub fn snapshot(&self) -> HashMap<String, MemValue> {
        self.state.clone()
    }
}

#[cfg(test)]
#[path = "mem_tests.rs"]
mod tests;
