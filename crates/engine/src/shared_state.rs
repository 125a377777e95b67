// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-safe state publisher (§3 SharedState, §5).
//!
//! Only the polling thread writes, via [`SharedState::publish`]; any number
//! of reader threads may take a [`Snapshot`] under the mutex. A snapshot
//! reflects either the pre-scan or the post-scan state, never an
//! interleaving (§5 ordering guarantees).

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::engine::Engine;
use crate::facade::IoFacade;
use crate::history::Value;
use crate::mem::{MemValue, Mode};

/// Virtual key injected alongside the real memory keys so external UIs can
/// show the raw button-edge state next to the mode, without it being a key
/// any rule actually sets (§10.6, grounded on `polling_thread.py`).
const KLAAR_GEWEEG_VIRTUAL_KEY: &str = "KLAAR_GEWEEG";
const KLAAR_GEWEEG_BTN_LABEL: &str = "Klaar_Geweeg_Btn";

/// One consistent point-in-time view of the engine, as published at the
/// end of a scan.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub input_data: HashMap<&'static str, Value>,
    pub output_data: HashMap<&'static str, Value>,
    pub mode: Option<Mode>,
    pub rule_memory_snapshot: HashMap<String, MemValue>,
    pub active_rule_names: Vec<&'static str>,
    pub input_heartbeat_counter: u64,
    pub output_heartbeat_counter: u64,
    pub connected: bool,
    pub in_comms_error: bool,
}

/// Mutex-guarded publisher (§5): the polling thread is the sole writer.
#[derive(Default)]
pub struct SharedState {
    inner: Mutex<Snapshot>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish one scan's worth of state. Called once per tick, after
    /// `engine.evaluate` has run (§4.6 step 4).
    pub fn publish(&self, io: &IoFacade, engine: &Engine, now: f64) {
        let mut rule_memory_snapshot = engine.memory().snapshot();
        rule_memory_snapshot.insert(
            KLAAR_GEWEEG_VIRTUAL_KEY.to_owned(),
            MemValue::Bool(io.rising_edge(KLAAR_GEWEEG_BTN_LABEL, None, now)),
        );
        let mode = engine.memory().mode();
        let in_comms_error = matches!(mode, Some(Mode::ErrorComms) | Some(Mode::ErrorCommsAck));

        let mut inner = self.inner.lock();
        inner.input_data = io.current_input().clone();
        inner.output_data = io.current_output().clone();
        inner.mode = mode;
        inner.rule_memory_snapshot = rule_memory_snapshot;
        inner.active_rule_names = engine.active_rule_names().to_vec();
        inner.input_heartbeat_counter += 1;
        inner.output_heartbeat_counter += 1;
        inner.connected = io.connected();
        inner.in_comms_error = in_comms_error;
    }

    /// Take a consistent snapshot (§5: atomic under the mutex).
    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
#[path = "shared_state_tests.rs"]
mod tests;
