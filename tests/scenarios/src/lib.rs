// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box harness for the end-to-end feeder scenarios (§8 S1-S6).
//!
//! Builds the real engine — the feeder rule set, the I/O facade, the
//! event log — against the in-process mock transport and drives it
//! through a caller-controlled clock, so a scenario spanning minutes of
//! wall time (e.g. S2's 30 s conveyor stagger) runs instantly.

use feeder_plc::engine::Engine;
use feeder_plc::event_log::{EventEntry, EventLog};
use feeder_plc::facade::IoFacade;
use feeder_plc::feeder::{build_rules, FeederConfig};
use feeder_plc::history::Value;
use feeder_plc::labels::LabelMap;
use feeder_plc::mem::Mode;
use feeder_plc::modbus::MockTransport;

/// Every INPUT coil the scenarios in §8 manipulate, started from its
/// "all clear" default: trips true, E-Stop true, Auto selected, bins
/// present on both conveyors, crate sensors aligned, PALM permits
/// departure.
const ALL_CLEAR_TRUE: &[&str] = &[
    "M1_Trip",
    "M2_Trip",
    "E_Stop",
    "Auto_Select",
    "S1",
    "S2",
    "CPS_1",
    "CPS_2",
    "PALM_Run_Signal",
    "DHLM_Trip_Signal",
];
const ALL_CLEAR_FALSE: &[&str] = &["Manual_Select", "Klaar_Geweeg_Btn", "Reset_Btn"];

/// A feeder engine wired to the mock transport, ready to be driven one
/// scan at a time through [`Harness::tick`].
pub struct Harness {
    pub engine: Engine,
    pub io: IoFacade,
    pub log: EventLog,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(FeederConfig::default())
    }

    pub fn with_config(config: FeederConfig) -> Self {
        let labels = LabelMap::new().expect("default label map is well-formed");
        let input = Box::new(MockTransport::new());
        let output = Box::new(MockTransport::new().with_version(12345));
        let io = IoFacade::new(labels, input, output, 3000, 15.0);
        let engine = Engine::new(build_rules(config));
        let log = EventLog::new(None, 200);
        Self { engine, io, log }
    }

    /// One scan at `now` (§4.3, §4.6 steps 2-3): refresh I/O then
    /// evaluate every rule in order.
    pub fn tick(&mut self, now: f64) {
        self.io.refresh(now);
        self.engine.evaluate(&mut self.io, &self.log, now);
    }

    pub fn mode(&self) -> Option<Mode> {
        self.engine.memory().mode()
    }

    pub fn output(&self, label: &str) -> Option<Value> {
        self.io.get(label)
    }

    pub fn set(&mut self, label: &str, value: Value) -> bool {
        self.io.set(label, value)
    }

    pub fn recent_log(&self, n: usize) -> Vec<EventEntry> {
        self.log.recent(n)
    }

    /// Drive every INPUT coil to the all-clear defaults (§8's scenario
    /// preamble).
    pub fn set_all_clear(&mut self) {
        for label in ALL_CLEAR_TRUE {
            self.io.set(label, Value::Bool(true));
        }
        for label in ALL_CLEAR_FALSE {
            self.io.set(label, Value::Bool(false));
        }
    }

    /// All-clear for 2 s then one scan (§8 S1): the shared setup every
    /// later scenario builds on.
    pub fn reach_ready(&mut self) {
        self.set_all_clear();
        for t in [0.0, 1.0, 2.0] {
            self.tick(t);
        }
        assert_eq!(self.mode(), Some(Mode::Ready), "setup failed to reach READY");
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
