// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end feeder scenarios (§8 S1-S6), driven against the mock
//! transport through a controllable clock (`Harness::tick`).

use feeder_plc::history::Value;
use feeder_plc::mem::Mode;
use feeder_plc_scenarios::Harness;

#[test]
fn s1_cold_boot_reaches_ready() {
    let mut h = Harness::new();
    h.reach_ready();
    assert_eq!(h.output("MOTOR_2"), Some(Value::Bool(false)));
    assert_eq!(h.output("MOTOR_3"), Some(Value::Bool(false)));
    assert_eq!(h.output("LED_GREEN"), Some(Value::Bool(true)));
}

#[test]
fn s2_c3_to_c2_cycle_stages_motors_then_returns_to_ready() {
    let mut h = Harness::new();
    h.reach_ready();

    // Bin appears on C3 only (S1 false, S2 true): READY -> MOVING_C3_TO_C2.
    h.set("S1", Value::Bool(false));
    h.tick(3.0);
    assert_eq!(h.mode(), Some(Mode::MovingC3ToC2));
    assert_eq!(h.output("MOTOR_2"), Some(Value::Bool(false)));

    // Before the 30 s mark, nothing has happened yet.
    h.tick(32.9);
    assert_eq!(h.output("MOTOR_2"), Some(Value::Bool(false)));

    // At/after the 30 s mark, MOTOR_2 turns on; MOTOR_3 follows 2 s later.
    h.tick(33.0);
    assert_eq!(h.output("MOTOR_2"), Some(Value::Bool(true)));
    assert_eq!(h.output("MOTOR_3"), Some(Value::Bool(false)));

    h.tick(35.1);
    assert_eq!(h.output("MOTOR_3"), Some(Value::Bool(true)));

    // Bin arrives on C2 (S2 false): motors stop, back to READY.
    h.set("S2", Value::Bool(false));
    h.tick(36.0);
    assert_eq!(h.mode(), Some(Mode::Ready));
    assert_eq!(h.output("MOTOR_2"), Some(Value::Bool(false)));
    assert_eq!(h.output("MOTOR_3"), Some(Value::Bool(false)));
}

#[test]
fn s3_estop_dominance_clears_memory_and_forces_motors_off() {
    let mut h = Harness::new();
    h.reach_ready();

    // Enter MOVING_BOTH: no bin on either conveyor, weighed-ready pulse, PALM ok.
    h.set("S1", Value::Bool(false));
    h.set("S2", Value::Bool(false));
    h.tick(3.0);
    h.set("Klaar_Geweeg_Btn", Value::Bool(true));
    h.tick(3.1);
    assert_eq!(h.mode(), Some(Mode::MovingBoth));
    assert_eq!(h.output("MOTOR_2"), Some(Value::Bool(true)));

    // Hold E_Stop false for a full 1 s window.
    h.set("E_Stop", Value::Bool(false));
    h.tick(3.2);
    h.tick(4.2);

    assert_eq!(h.mode(), Some(Mode::ErrorEstop));
    assert_eq!(h.output("MOTOR_2"), Some(Value::Bool(false)));
    assert_eq!(h.output("MOTOR_3"), Some(Value::Bool(false)));

    // E_Stop true alone does not recover.
    h.set("E_Stop", Value::Bool(true));
    h.tick(4.3);
    assert_eq!(h.mode(), Some(Mode::ErrorEstop));

    // E_Stop true AND Manual_Select true does (back to the pre-mode-machine
    // "unset" state, §4.5).
    h.set("Manual_Select", Value::Bool(true));
    h.tick(4.4);
    assert_eq!(h.mode(), None);
}

#[test]
fn s4_comms_watchdog_trips_and_recovers_through_manual_then_auto() {
    let mut h = Harness::new();
    h.reach_ready();

    h.set("VERSION", Value::Reg(0));
    for i in 0..=5 {
        h.tick(3.0 + i as f64);
    }
    h.tick(8.1);
    assert_eq!(h.mode(), Some(Mode::ErrorComms));
    assert_eq!(h.output("LED_GREEN"), Some(Value::Bool(false)));

    h.set("VERSION", Value::Reg(42));
    h.set("Manual_Select", Value::Bool(true));
    h.tick(8.2);
    assert_eq!(h.mode(), Some(Mode::ErrorCommsAck));

    h.set("Manual_Select", Value::Bool(false));
    h.set("Auto_Select", Value::Bool(true));
    h.tick(8.3);
    assert_eq!(h.mode(), Some(Mode::Ready));
}

#[test]
fn s5_trip_debounce_ignores_brief_pulse_but_trips_on_sustained_drop() {
    let mut h = Harness::new();
    h.reach_ready();

    // A brief 300 ms pulse does not trip anything (below the 1 s hold).
    h.set("M1_Trip", Value::Bool(false));
    h.tick(3.0);
    h.set("M1_Trip", Value::Bool(true));
    h.tick(3.3);
    assert_eq!(h.mode(), Some(Mode::Ready));

    // A full 1 s sustained drop trips ERROR_SAFETY, motors off, and logs
    // a warning naming the tripped signal.
    h.set("M1_Trip", Value::Bool(false));
    h.tick(3.4);
    h.tick(4.4);
    assert_eq!(h.mode(), Some(Mode::ErrorSafety));
    assert_eq!(h.output("MOTOR_2"), Some(Value::Bool(false)));
    assert!(h.recent_log(10).iter().any(|e| e.message.contains("M1_Trip")));
}

#[test]
fn s6_brief_button_pulse_is_seen_through_edge_window() {
    let mut h = Harness::new();
    h.reach_ready();

    h.set("S1", Value::Bool(false));
    h.set("S2", Value::Bool(false));
    h.tick(3.0);

    // 50 ms pulse, never sampled at scan boundaries as level-true, but
    // inside the default 15 s edge window.
    h.set("Klaar_Geweeg_Btn", Value::Bool(true));
    h.tick(3.05);
    h.set("Klaar_Geweeg_Btn", Value::Bool(false));
    h.tick(3.1);

    assert_eq!(h.mode(), Some(Mode::MovingBoth));
}
