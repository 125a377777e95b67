// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property-based invariants (§8 P1-P7), run directly against the public
//! building blocks (`LabelMap`, `History`, `Engine`) rather than the full
//! mock-transport harness — most of these don't need a scan loop at all.

use std::collections::HashMap;

use feeder_plc::engine::Engine;
use feeder_plc::event_log::EventLog;
use feeder_plc::facade::IoFacade;
use feeder_plc::feeder::{build_rules, FeederConfig};
use feeder_plc::history::{History, Value};
use feeder_plc::labels::{Device, Kind, LabelMap};
use feeder_plc::mem::{MachineMemory, Mode};
use feeder_plc::modbus::MockTransport;
use proptest::prelude::*;

const ALL_LABELS: &[&str] = &[
    "S1",
    "S2",
    "CS1",
    "CS2",
    "CS3",
    "M1_Trip",
    "M2_Trip",
    "E_Stop",
    "Manual_Select",
    "Auto_Select",
    "Klaar_Geweeg_Btn",
    "CPS_1",
    "CPS_2",
    "Reset_Btn",
    "PALM_Run_Signal",
    "DHLM_Trip_Signal",
];

// P1 Label bijection: resolve(device, label) round-trips through address,
// and no two labels on the same device collide on the same address.
#[test]
fn p1_label_bijection() {
    let labels = LabelMap::new().expect("default label map is well-formed");
    for device in [Device::Input, Device::Output] {
        for kind in [Kind::Coil, Kind::Register] {
            let slots = labels.all_labels(device, kind);
            let mut seen_addrs = std::collections::HashSet::new();
            for (addr, label) in &slots {
                assert_eq!(labels.resolve(device, label), Some((*addr, kind)));
                assert!(seen_addrs.insert(*addr), "duplicate address {addr} on {device:?}/{kind:?}");
            }
        }
    }
}

fn arb_samples() -> impl Strategy<Value = Vec<(f64, bool)>> {
    proptest::collection::vec((0.0f64..200.0, any::<bool>()), 0..64)
}

// P2 History monotonicity: a ring buffer never exceeds its capacity and,
// once full, keeps exactly `capacity` entries after further pushes.
proptest! {
    #[test]
    fn p2_history_monotonicity(timestamps in proptest::collection::vec(0.0f64..1000.0, 0..500)) {
        let capacity = 20usize;
        let mut history = History::new(capacity);
        let mut sorted = timestamps.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for &t in &sorted {
            history.record_input(t, HashMap::new());
        }
        let len = history.input().len();
        prop_assert!(len <= capacity);
        if sorted.len() > capacity {
            prop_assert_eq!(len, capacity);
        }
        let recent: Vec<f64> = history.recent_input(len).iter().map(|e| e.timestamp).collect();
        for pair in recent.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
    }
}

// P3 Edge soundness: whenever `rising_edge`/`falling_edge` reports true,
// two adjacent in-window samples actually witness the claimed transition.
proptest! {
    #[test]
    fn p3_edge_soundness(samples in arb_samples(), window in 0.5f64..50.0) {
        let mut history = History::new(128);
        let mut sorted = samples;
        sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        for &(t, v) in &sorted {
            let mut data = HashMap::new();
            data.insert("L", Value::Bool(v));
            history.record_input(t, data);
        }
        let Some(&(now, _)) = sorted.last() else { return Ok(()); };

        for (from, to, rising) in [(false, true, true), (true, false, false)] {
            let reported = if rising {
                history.rising_edge("L", now, window)
            } else {
                history.falling_edge("L", now, window)
            };
            if reported {
                let floor = now - window;
                let in_window: Vec<bool> = sorted
                    .iter()
                    .filter(|(t, _)| *t >= floor && *t <= now)
                    .map(|(_, v)| *v)
                    .collect();
                let witnessed = in_window.windows(2).any(|p| p[0] == from && p[1] == to);
                prop_assert!(witnessed);
            }
        }
    }
}

// P4 Hold soundness: whenever `extended_hold` reports true, every in-window
// sample matches the claimed value and the oldest one reaches the floor.
proptest! {
    #[test]
    fn p4_hold_soundness(samples in arb_samples(), hold in 0.5f64..20.0, value in any::<bool>()) {
        let mut history = History::new(128);
        let mut sorted = samples;
        sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        for &(t, v) in &sorted {
            let mut data = HashMap::new();
            data.insert("L", Value::Bool(v));
            history.record_input(t, data);
        }
        let Some(&(now, _)) = sorted.last() else { return Ok(()); };

        if history.extended_hold("L", value, now, hold) {
            let floor = now - hold;
            let in_window: Vec<(f64, bool)> =
                sorted.iter().copied().filter(|(t, _)| *t >= floor && *t <= now).collect();
            prop_assert!(!in_window.is_empty());
            prop_assert!(in_window.iter().all(|(_, v)| *v == value));
            let oldest = in_window.iter().map(|(t, _)| *t).fold(f64::INFINITY, f64::min);
            prop_assert!(oldest <= floor);
        }
    }
}

fn harness() -> (Engine, IoFacade, EventLog) {
    let labels = LabelMap::new().expect("default label map is well-formed");
    let input = Box::new(MockTransport::new());
    let output = Box::new(MockTransport::new().with_version(12345));
    let io = IoFacade::new(labels, input, output, 3000, 15.0);
    let engine = Engine::new(build_rules(FeederConfig::default()));
    let log = EventLog::new(None, 200);
    (engine, io, log)
}

fn all_clear(io: &mut IoFacade) {
    for label in [
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
    ] {
        io.set(label, Value::Bool(true));
    }
    for label in ["Manual_Select", "Klaar_Geweeg_Btn", "Reset_Btn"] {
        io.set(label, Value::Bool(false));
    }
}

// P5 Safety dominance: once the E-Stop rule's condition is true, MOTOR_2
// and MOTOR_3 are false in the post-scan output map regardless of what any
// earlier rule commanded in the same scan.
proptest! {
    #[test]
    fn p5_safety_dominance(inputs in proptest::collection::hash_map(
        proptest::sample::select(ALL_LABELS),
        any::<bool>(),
        0..ALL_LABELS.len(),
    )) {
        let (mut engine, mut io, log) = harness();
        all_clear(&mut io);
        io.refresh(0.0);
        engine.evaluate(&mut io, &log, 0.0);
        io.refresh(1.0);
        engine.evaluate(&mut io, &log, 1.0);

        for (label, value) in &inputs {
            io.set(label, Value::Bool(*value));
        }
        io.set("E_Stop", Value::Bool(false));
        io.refresh(2.0);
        engine.evaluate(&mut io, &log, 2.0);
        io.refresh(3.0);
        engine.evaluate(&mut io, &log, 3.0);

        if io.history().extended_hold("E_Stop", false, 3.0, 1.0) {
            prop_assert_eq!(io.get("MOTOR_2"), Some(Value::Bool(false)));
            prop_assert_eq!(io.get("MOTOR_3"), Some(Value::Bool(false)));
        }
    }
}

// P6 Mode logging: `set_mode` only changes the stored mode when it differs
// from the previous one, and every matched rule bumps its trigger count.
#[test]
fn p6_mode_transition_is_a_noop_when_unchanged() {
    let mut mem = MachineMemory::new();
    mem.set_mode(Mode::Ready);
    assert_eq!(mem.mode(), Some(Mode::Ready));
    mem.set_mode(Mode::Ready);
    assert_eq!(mem.mode(), Some(Mode::Ready));
    mem.set_mode(Mode::Manual);
    assert_eq!(mem.mode(), Some(Mode::Manual));
}

#[test]
fn p6_trigger_count_increments_on_every_action_execution() {
    let (mut engine, mut io, log) = harness();
    all_clear(&mut io);
    for t in [0.0, 1.0, 2.0] {
        io.refresh(t);
        engine.evaluate(&mut io, &log, t);
    }
    let enter_ready = engine
        .rule_status()
        .into_iter()
        .find(|s| s.name == "EnterReady")
        .expect("EnterReady is registered");
    assert_eq!(enter_ready.trigger_count, 1);

    io.refresh(3.0);
    engine.evaluate(&mut io, &log, 3.0);
    let led = engine
        .rule_status()
        .into_iter()
        .find(|s| s.name == "LedGreenTracksCommsHealth")
        .expect("LedGreenTracksCommsHealth is registered");
    assert_eq!(led.trigger_count, 1);
}

// P7 Comms-health monotone in window: for a fixed history, widening the
// timeout window can only turn an unhealthy result healthy, never the
// reverse.
proptest! {
    #[test]
    fn p7_comms_health_monotone_in_window(
        samples in proptest::collection::vec((0.0f64..200.0, 0u16..3), 0..64),
        small_timeout in 0.5f64..20.0,
        extra in 0.0f64..50.0,
    ) {
        let mut history = History::new(128);
        let mut sorted = samples;
        sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        for &(t, version) in &sorted {
            let mut data = HashMap::new();
            data.insert("VERSION", Value::Reg(version));
            history.record_output(t, data);
        }
        let Some(&(now, _)) = sorted.last() else { return Ok(()); };

        let healthy_small = history.check_comms_health(now, small_timeout);
        let healthy_large = history.check_comms_health(now, small_timeout + extra);
        prop_assert!(!(healthy_small && !healthy_large));
    }
}
