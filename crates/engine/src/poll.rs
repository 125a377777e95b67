// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling thread (§4.6): a single background thread that reads, evaluates,
//! and publishes on a fixed period, plus the pure per-tick step it runs —
//! exposed separately so tests can drive scans against a synthetic clock
//! without sleeping (§10.5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::engine::Engine;
use crate::event_log::EventLog;
use crate::facade::IoFacade;
use crate::shared_state::SharedState;

/// Event-log rotation check frequency, in ticks (§4.6 step 5).
const ROTATE_EVERY_N_TICKS: u64 = 1000;

/// One scan tick (§4.6 steps 2-4): refresh I/O, evaluate the rule set, and
/// publish the resulting snapshot. `now` is caller-supplied so tests can
/// fast-forward through minutes of simulated time.
pub fn run_scan(io: &mut IoFacade, engine: &mut Engine, log: &EventLog, shared: &SharedState, now: f64) {
    io.refresh(now);
    engine.evaluate(io, log, now);
    shared.publish(io, engine, now);
}

/// Owns the background scan thread. Dropping (or calling [`Poller::stop`])
/// signals the cooperative stop flag and joins the thread; an in-flight
/// Modbus read may delay shutdown up to the transport timeout (§4.6, §5).
pub struct Poller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawn the scan loop. `io` and `engine` become owned by the thread;
    /// the caller keeps `shared` and `log` to read snapshots / recent
    /// events from other threads.
    pub fn spawn(
        mut io: IoFacade,
        mut engine: Engine,
        log: Arc<EventLog>,
        shared: Arc<SharedState>,
        poll_interval: Duration,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let start = Instant::now();

        let handle = thread::spawn(move || {
            let mut ticks: u64 = 0;
            while !stop_flag.load(Ordering::Relaxed) {
                let tick_start = Instant::now();
                let now = start.elapsed().as_secs_f64();

                run_scan(&mut io, &mut engine, &log, &shared, now);

                ticks += 1;
                if ticks % ROTATE_EVERY_N_TICKS == 0 {
                    log.rotate_if_needed();
                }

                let elapsed = tick_start.elapsed();
                if elapsed < poll_interval {
                    thread::sleep(poll_interval - elapsed);
                }
            }
        });

        Self { stop, handle: Some(handle) }
    }

    /// Signal the stop event and block until the thread exits (§4.6, §5).
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
