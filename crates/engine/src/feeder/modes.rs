// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the ordered `Vec<Rule>` that drives the feeder mode state
//! machine (§4.5). Rules are grouped in registration order: continuous
//! indicators and timer bookkeeping first, the normal ready/manual/move
//! sequences next, and the safety/comms/E-Stop rules last so they
//! override anything the normal-flow rules wrote earlier in the same
//! scan (late-wins, I4, P5).
//!
//! Every timed transition uses the timestamp-in-memory pattern from §9:
//! an originating rule records `now + delay` under a memory key, and a
//! companion rule fires when `now >= target`. No rule ever sleeps.

use crate::facade::IoFacade;
use crate::history::Value;
use crate::mem::{MachineMemory, MemValue, Mode};
use crate::rule::Rule;

const S1: &str = "S1";
const S2: &str = "S2";
const M1_TRIP: &str = "M1_Trip";
const M2_TRIP: &str = "M2_Trip";
const E_STOP: &str = "E_Stop";
const MANUAL_SELECT: &str = "Manual_Select";
const AUTO_SELECT: &str = "Auto_Select";
const KLAAR_GEWEEG_BTN: &str = "Klaar_Geweeg_Btn";
const CPS_1: &str = "CPS_1";
const CPS_2: &str = "CPS_2";
const PALM_RUN_SIGNAL: &str = "PALM_Run_Signal";
const DHLM_TRIP_SIGNAL: &str = "DHLM_Trip_Signal";
const LED_GREEN: &str = "LED_GREEN";
const MOTOR_2: &str = "MOTOR_2";
const MOTOR_3: &str = "MOTOR_3";
const LED_RED: &str = "LED_RED";

const TRIP_HOLD_S: f64 = 1.0;

// Memory keys for the timestamp-in-memory delay pattern (§9). None of
// these are rendered to operators directly; `_MODE` remains a dedicated
// `Mode` field rather than living in this generic store (§3).
const C3TOC2_MOTOR2_TARGET: &str = "C3toC2_StartTime";
const C3TOC2_MOTOR3_TARGET: &str = "C3toC2_Motor3Target";
const C2PALM_STOP_TARGET: &str = "C2Palm_StopTarget";
const MOVINGBOTH_MOTOR3_TARGET: &str = "Motor3_StartTime";
const MOVINGBOTH_MOTOR3_STAGE2_TARGET: &str = "MovingBoth_Motor3Stage2Target";
const C3_TIMER: &str = "C3_Timer";

/// Operator-tunable parameters the feeder rule set closes over (§4.2, §4.4).
#[derive(Debug, Clone, Copy)]
pub struct FeederConfig {
    pub comms_timeout_s: f64,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self { comms_timeout_s: 5.0 }
    }
}

fn get_bool(io: &IoFacade, label: &str) -> bool {
    io.get(label).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn motors_off(io: &mut IoFacade) {
    io.set(MOTOR_2, Value::Bool(false));
    io.set(MOTOR_3, Value::Bool(false));
}

/// Build the feeder's complete, order-significant rule set.
pub fn build_rules(config: FeederConfig) -> Vec<Rule> {
    let comms_timeout_s = config.comms_timeout_s;
    vec![
        led_green_tracks_comms_health(comms_timeout_s),
        led_red_tracks_misalignment(),
        c3_timer_set_on_falling_edge(),
        c3_timer_clear_on_rising_edge(),
        enter_ready(),
        enter_manual(),
        enter_c3_to_c2(),
        c3_to_c2_start_motor2(),
        c3_to_c2_start_motor3(),
        c3_to_c2_complete(),
        enter_c2_to_palm(),
        c2_to_palm_schedule_stop(),
        c2_to_palm_complete(),
        enter_moving_both(),
        moving_both_schedule_motor3(),
        moving_both_start_motor3(),
        moving_both_complete(),
        comms_ack_to_ready(comms_timeout_s),
        comms_ack_to_comms(comms_timeout_s),
        comms_reconnect_attempt(),
        error_comms_ack(),
        error_estop_reset(),
        enter_error_safety(),
        enter_error_comms(comms_timeout_s),
        enter_error_estop(),
    ]
}

fn led_green_tracks_comms_health(comms_timeout_s: f64) -> Rule {
    Rule::new(
        "LedGreenTracksCommsHealth",
        move |io, _mem, now| {
            let healthy = io.history().check_comms_health(now, comms_timeout_s);
            Ok(io.get(LED_GREEN).and_then(|v| v.as_bool()) != Some(healthy))
        },
        move |io, _mem, ctl| {
            let healthy = io.history().check_comms_health(ctl.now, comms_timeout_s);
            io.set(LED_GREEN, Value::Bool(healthy));
            Ok(())
        },
    )
}

fn led_red_tracks_misalignment() -> Rule {
    Rule::new(
        "LedRedTracksMisalignment",
        |_io, _mem, _now| Ok(true),
        |io, _mem, _ctl| {
            let aligned = get_bool(io, CPS_1) && get_bool(io, CPS_2);
            io.set(LED_RED, Value::Bool(!aligned));
            Ok(())
        },
    )
}

fn c3_timer_set_on_falling_edge() -> Rule {
    Rule::new(
        "C3TimerSetOnFallingEdge",
        |io, _mem, now| Ok(io.falling_edge(S1, None, now)),
        |_io, mem, ctl| {
            mem.set(C3_TIMER, MemValue::Timestamp(ctl.now));
            Ok(())
        },
    )
}

fn c3_timer_clear_on_rising_edge() -> Rule {
    Rule::new(
        "C3TimerClearOnRisingEdge",
        |io, _mem, now| Ok(io.rising_edge(S1, None, now)),
        |_io, mem, _ctl| {
            mem.pop(C3_TIMER);
            Ok(())
        },
    )
}

/// unset / MANUAL / ERROR_SAFETY -> READY (§4.5 row 1).
fn enter_ready() -> Rule {
    Rule::new(
        "EnterReady",
        |io, mem, now| {
            let from_eligible_mode =
                matches!(mem.mode(), None | Some(Mode::Manual) | Some(Mode::ErrorSafety));
            Ok(from_eligible_mode
                && get_bool(io, AUTO_SELECT)
                && get_bool(io, E_STOP)
                && io.extended_hold(M1_TRIP, true, TRIP_HOLD_S, now)
                && io.extended_hold(M2_TRIP, true, TRIP_HOLD_S, now)
                && io.extended_hold(DHLM_TRIP_SIGNAL, true, TRIP_HOLD_S, now))
        },
        |io, mem, _ctl| {
            motors_off(io);
            mem.set_mode(Mode::Ready);
            Ok(())
        },
    )
}

/// any non-ERROR_COMMS_ACK -> MANUAL (§4.5 row 2).
fn enter_manual() -> Rule {
    Rule::new(
        "EnterManual",
        |io, mem, _now| {
            Ok(mem.mode() != Some(Mode::ErrorCommsAck) && get_bool(io, MANUAL_SELECT))
        },
        |io, mem, _ctl| {
            motors_off(io);
            mem.set_mode(Mode::Manual);
            Ok(())
        },
    )
}

/// READY -> MOVING_C3_TO_C2 (§4.5 row 4): bin on C3, none on C2 yet.
fn enter_c3_to_c2() -> Rule {
    Rule::new(
        "EnterMovingC3ToC2",
        |io, mem, _now| Ok(mem.mode() == Some(Mode::Ready) && get_bool(io, S2) && !get_bool(io, S1)),
        |_io, mem, ctl| {
            mem.set(C3TOC2_MOTOR2_TARGET, MemValue::Timestamp(ctl.now + 30.0));
            mem.set_mode(Mode::MovingC3ToC2);
            Ok(())
        },
    )
}

/// MOVING_C3_TO_C2, stage 1: at the 30s mark, MOTOR_2 on and schedule the
/// 2s safety stagger before MOTOR_3 (§4.5 row 5, §9).
fn c3_to_c2_start_motor2() -> Rule {
    Rule::new(
        "MovingC3ToC2StartMotor2",
        |_io, mem, now| {
            let due = mem.get_timestamp(C3TOC2_MOTOR2_TARGET).is_some_and(|t| now >= t);
            Ok(mem.mode() == Some(Mode::MovingC3ToC2)
                && due
                && mem.get_timestamp(C3TOC2_MOTOR3_TARGET).is_none())
        },
        |io, mem, ctl| {
            io.set(MOTOR_2, Value::Bool(true));
            mem.set(C3TOC2_MOTOR3_TARGET, MemValue::Timestamp(ctl.now + 2.0));
            Ok(())
        },
    )
}

/// MOVING_C3_TO_C2, stage 2: MOTOR_3 on 2s after MOTOR_2.
fn c3_to_c2_start_motor3() -> Rule {
    Rule::new(
        "MovingC3ToC2StartMotor3",
        |_io, mem, now| {
            Ok(mem.mode() == Some(Mode::MovingC3ToC2)
                && mem.get_timestamp(C3TOC2_MOTOR3_TARGET).is_some_and(|t| now >= t))
        },
        |io, mem, _ctl| {
            io.set(MOTOR_3, Value::Bool(true));
            mem.pop(C3TOC2_MOTOR3_TARGET);
            Ok(())
        },
    )
}

/// MOVING_C3_TO_C2 -> READY when the bin arrives on C2 (§4.5 row 6).
fn c3_to_c2_complete() -> Rule {
    Rule::new(
        "CompleteMovingC3ToC2",
        |io, mem, _now| Ok(mem.mode() == Some(Mode::MovingC3ToC2) && !get_bool(io, S2)),
        |io, mem, _ctl| {
            motors_off(io);
            mem.pop(C3TOC2_MOTOR2_TARGET);
            mem.pop(C3TOC2_MOTOR3_TARGET);
            mem.set_mode(Mode::Ready);
            Ok(())
        },
    )
}

/// READY -> MOVING_C2_TO_PALM (§4.5 row 7): bin on C2 only, weighed-ready
/// pulse seen, PALM line permits departure.
fn enter_c2_to_palm() -> Rule {
    Rule::new(
        "EnterMovingC2ToPalm",
        |io, mem, now| {
            Ok(mem.mode() == Some(Mode::Ready)
                && get_bool(io, S1)
                && !get_bool(io, S2)
                && io.rising_edge(KLAAR_GEWEEG_BTN, None, now)
                && get_bool(io, PALM_RUN_SIGNAL))
        },
        |io, mem, _ctl| {
            io.set(MOTOR_2, Value::Bool(true));
            mem.set_mode(Mode::MovingC2ToPalm);
            Ok(())
        },
    )
}

/// MOVING_C2_TO_PALM, stage 1: bin has left C2, schedule the 1s stop delay.
fn c2_to_palm_schedule_stop() -> Rule {
    Rule::new(
        "ScheduleMovingC2ToPalmStop",
        |io, mem, _now| {
            Ok(mem.mode() == Some(Mode::MovingC2ToPalm)
                && get_bool(io, S2)
                && mem.get_timestamp(C2PALM_STOP_TARGET).is_none())
        },
        |_io, mem, ctl| {
            mem.set(C2PALM_STOP_TARGET, MemValue::Timestamp(ctl.now + 1.0));
            Ok(())
        },
    )
}

/// MOVING_C2_TO_PALM, stage 2: MOTOR_2 off and back to READY (§4.5 row 8).
fn c2_to_palm_complete() -> Rule {
    Rule::new(
        "CompleteMovingC2ToPalm",
        |_io, mem, now| {
            Ok(mem.mode() == Some(Mode::MovingC2ToPalm)
                && mem.get_timestamp(C2PALM_STOP_TARGET).is_some_and(|t| now >= t))
        },
        |io, mem, _ctl| {
            io.set(MOTOR_2, Value::Bool(false));
            mem.pop(C2PALM_STOP_TARGET);
            mem.set_mode(Mode::Ready);
            Ok(())
        },
    )
}

/// READY -> MOVING_BOTH (§4.5 row 9): no bin on either conveyor yet,
/// weighed-ready pulse seen, PALM permits departure. MOTOR_2 starts
/// immediately; MOTOR_3's start is staggered off the remaining time the
/// bin had already been sitting on C3 (`C3_Timer`).
fn enter_moving_both() -> Rule {
    Rule::new(
        "EnterMovingBoth",
        |io, mem, now| {
            Ok(mem.mode() == Some(Mode::Ready)
                && !get_bool(io, S1)
                && !get_bool(io, S2)
                && io.rising_edge(KLAAR_GEWEEG_BTN, None, now)
                && get_bool(io, PALM_RUN_SIGNAL))
        },
        |io, mem, ctl| {
            io.set(MOTOR_2, Value::Bool(true));
            let elapsed = mem.get_timestamp(C3_TIMER).map_or(0.0, |started| ctl.now - started);
            let delay = (30.0 - elapsed).max(0.0);
            mem.set(MOVINGBOTH_MOTOR3_TARGET, MemValue::Timestamp(ctl.now + delay));
            mem.set_mode(Mode::MovingBoth);
            Ok(())
        },
    )
}

/// MOVING_BOTH, stage 1: at `Motor3_StartTime`, schedule the 2s safety
/// stagger before MOTOR_3 actually switches on (§4.5 row 10, §9).
fn moving_both_schedule_motor3() -> Rule {
    Rule::new(
        "MovingBothScheduleMotor3",
        |_io, mem, now| {
            Ok(mem.mode() == Some(Mode::MovingBoth)
                && mem.get_timestamp(MOVINGBOTH_MOTOR3_TARGET).is_some_and(|t| now >= t)
                && mem.get_timestamp(MOVINGBOTH_MOTOR3_STAGE2_TARGET).is_none())
        },
        |_io, mem, ctl| {
            mem.set(MOVINGBOTH_MOTOR3_STAGE2_TARGET, MemValue::Timestamp(ctl.now + 2.0));
            mem.pop(MOVINGBOTH_MOTOR3_TARGET);
            Ok(())
        },
    )
}

/// MOVING_BOTH, stage 2: MOTOR_3 on.
fn moving_both_start_motor3() -> Rule {
    Rule::new(
        "MovingBothStartMotor3",
        |_io, mem, now| {
            Ok(mem.mode() == Some(Mode::MovingBoth)
                && mem.get_timestamp(MOVINGBOTH_MOTOR3_STAGE2_TARGET).is_some_and(|t| now >= t))
        },
        |io, mem, _ctl| {
            io.set(MOTOR_3, Value::Bool(true));
            mem.pop(MOVINGBOTH_MOTOR3_STAGE2_TARGET);
            Ok(())
        },
    )
}

/// MOVING_BOTH -> READY when the bin reaches C2 and C3 is clear (§4.5 row 11).
fn moving_both_complete() -> Rule {
    Rule::new(
        "CompleteMovingBoth",
        |io, mem, _now| Ok(mem.mode() == Some(Mode::MovingBoth) && get_bool(io, S1) && !get_bool(io, S2)),
        |io, mem, _ctl| {
            motors_off(io);
            mem.pop(MOVINGBOTH_MOTOR3_TARGET);
            mem.pop(MOVINGBOTH_MOTOR3_STAGE2_TARGET);
            mem.set_mode(Mode::Ready);
            Ok(())
        },
    )
}

/// ERROR_COMMS_ACK -> READY once the operator returns to Auto and comms
/// are actually healthy again (§4.5, §4.7 — recovery is operator-mediated).
fn comms_ack_to_ready(comms_timeout_s: f64) -> Rule {
    Rule::new(
        "ErrorCommsAckToReady",
        move |io, mem, now| {
            Ok(mem.mode() == Some(Mode::ErrorCommsAck)
                && get_bool(io, AUTO_SELECT)
                && io.history().check_comms_health(now, comms_timeout_s))
        },
        |_io, mem, _ctl| {
            mem.set_mode(Mode::Ready);
            Ok(())
        },
    )
}

/// ERROR_COMMS_ACK -> ERROR_COMMS if the operator selects Auto too soon.
fn comms_ack_to_comms(comms_timeout_s: f64) -> Rule {
    Rule::new(
        "ErrorCommsAckToComms",
        move |io, mem, now| {
            Ok(mem.mode() == Some(Mode::ErrorCommsAck)
                && get_bool(io, AUTO_SELECT)
                && !io.history().check_comms_health(now, comms_timeout_s))
        },
        |_io, mem, _ctl| {
            mem.set_mode(Mode::ErrorComms);
            Ok(())
        },
    )
}

/// While in ERROR_COMMS, re-attempt `connect()` on both transports every
/// scan; a success is only logged at DEBUG, recovery itself is declared
/// by `comms_ack_to_ready` once VERSION is actually read again (§4.7).
fn comms_reconnect_attempt() -> Rule {
    Rule::new(
        "CommsReconnectAttempt",
        |_io, mem, _now| Ok(mem.mode() == Some(Mode::ErrorComms)),
        |io, _mem, ctl| {
            if io.connect_all() {
                ctl.log.debug("modbus reconnect attempt succeeded", ctl.now);
            }
            Ok(())
        },
    )
}

/// ERROR_COMMS -> ERROR_COMMS_ACK on operator acknowledgement (§4.5).
fn error_comms_ack() -> Rule {
    Rule::new(
        "AckCommsError",
        |io, mem, _now| Ok(mem.mode() == Some(Mode::ErrorComms) && get_bool(io, MANUAL_SELECT)),
        |_io, mem, ctl| {
            ctl.log.info("operator acknowledged comms failure", ctl.now);
            mem.set_mode(Mode::ErrorCommsAck);
            Ok(())
        },
    )
}

/// ERROR_ESTOP -> unset once E-Stop is released and Manual is selected
/// (§4.5) — E_Stop=TRUE alone does not recover.
fn error_estop_reset() -> Rule {
    Rule::new(
        "ResetErrorEstop",
        |io, mem, _now| {
            Ok(mem.mode() == Some(Mode::ErrorEstop)
                && get_bool(io, E_STOP)
                && get_bool(io, MANUAL_SELECT))
        },
        |_io, mem, ctl| {
            ctl.log.info("E-Stop reset acknowledged", ctl.now);
            mem.unset_mode();
            Ok(())
        },
    )
}

/// any non-ERROR_{COMMS,ESTOP} -> ERROR_SAFETY on a debounced trip
/// (§4.5 row 3, S5). Registered after the normal-flow rules so it
/// overrides whatever they just commanded.
fn enter_error_safety() -> Rule {
    Rule::new(
        "EnterErrorSafety",
        |io, mem, now| {
            let eligible = !matches!(mem.mode(), Some(Mode::ErrorComms) | Some(Mode::ErrorEstop));
            Ok(eligible
                && (io.extended_hold(M1_TRIP, false, TRIP_HOLD_S, now)
                    || io.extended_hold(M2_TRIP, false, TRIP_HOLD_S, now)
                    || io.extended_hold(DHLM_TRIP_SIGNAL, false, TRIP_HOLD_S, now)))
        },
        |io, mem, ctl| {
            for (label, tripped) in [
                (M1_TRIP, io.extended_hold(M1_TRIP, false, TRIP_HOLD_S, ctl.now)),
                (M2_TRIP, io.extended_hold(M2_TRIP, false, TRIP_HOLD_S, ctl.now)),
                (DHLM_TRIP_SIGNAL, io.extended_hold(DHLM_TRIP_SIGNAL, false, TRIP_HOLD_S, ctl.now)),
            ] {
                if tripped {
                    ctl.log.warn(format!("safety trip: {label}"), ctl.now);
                }
            }
            motors_off(io);
            mem.set_mode(Mode::ErrorSafety);
            Ok(())
        },
    )
}

/// any -> ERROR_COMMS when the comms watchdog goes unhealthy (§4.5,
/// §4.2, §4.7). Only fires on the transition edge — once in
/// ERROR_COMMS/ERROR_COMMS_ACK the dedicated ack rules own the mode.
fn enter_error_comms(comms_timeout_s: f64) -> Rule {
    Rule::new(
        "EnterErrorComms",
        move |io, mem, now| {
            let eligible = !matches!(
                mem.mode(),
                Some(Mode::ErrorComms) | Some(Mode::ErrorCommsAck) | Some(Mode::ErrorEstop)
            );
            Ok(eligible && !io.history().check_comms_health(now, comms_timeout_s))
        },
        |io, mem, ctl| {
            motors_off(io);
            io.close_all();
            ctl.log.error_once("comms_dead", "comms watchdog: link declared dead, closing transports", ctl.now);
            mem.set_mode(Mode::ErrorComms);
            Ok(())
        },
    )
}

/// any -> ERROR_ESTOP on a debounced E-Stop release (§4.5, S3). This is
/// the dominant safety rule (P5) and must stay last in the rule list: it
/// always has the final word on MOTOR_2/MOTOR_3 within the scan.
fn enter_error_estop() -> Rule {
    Rule::new(
        "EnterErrorEstop",
        |io, _mem, now| Ok(io.extended_hold(E_STOP, false, TRIP_HOLD_S, now)),
        |io, mem, ctl| {
            motors_off(io);
            mem.clear();
            mem.set_mode(Mode::ErrorEstop);
            ctl.log.warn("E-Stop released: motors forced off", ctl.now);
            Ok(())
        },
    )
}

#[cfg(test)]
#[path = "modes_tests.rs"]
mod tests;
