// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The symbolic I/O facade rules call through (§4.1).
//!
//! Holds the label map, a transport per device, and the history ring
//! buffers. Does not own a connection lifecycle beyond what `connect_all`
//! / `close_all` expose — the polling thread decides when those run
//! (§4.7).

use std::collections::HashMap;

use crate::history::{History, Value};
use crate::labels::{Device, Kind, LabelMap};
use crate::modbus::ModbusTransport;

pub struct IoFacade {
    labels: LabelMap,
    input: Box<dyn ModbusTransport>,
    output: Box<dyn ModbusTransport>,
    history: History,
    current_input: HashMap<&'static str, Value>,
    current_output: HashMap<&'static str, Value>,
    edge_window_s: f64,
}

impl IoFacade {
    pub fn new(
        labels: LabelMap,
        input: Box<dyn ModbusTransport>,
        output: Box<dyn ModbusTransport>,
        history_capacity: usize,
        edge_window_s: f64,
    ) -> Self {
        Self {
            labels,
            input,
            output,
            history: History::new(history_capacity),
            current_input: HashMap::new(),
            current_output: HashMap::new(),
            edge_window_s,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    fn transport_mut(&mut self, device: Device) -> &mut dyn ModbusTransport {
        match device {
            Device::Input => self.input.as_mut(),
            Device::Output => self.output.as_mut(),
        }
    }

    pub fn connect_all(&mut self) -> bool {
        let input_ok = self.input.connect();
        let output_ok = self.output.connect();
        input_ok && output_ok
    }

    pub fn close_all(&mut self) {
        self.input.close();
        self.output.close();
    }

    /// Both transports report connected (§3 SharedState `connected`).
    pub fn connected(&self) -> bool {
        self.input.is_connected() && self.output.is_connected()
    }

    /// The last-refreshed INPUT map, for the shared-state publisher.
    pub fn current_input(&self) -> &HashMap<&'static str, Value> {
        &self.current_input
    }

    /// The last-refreshed OUTPUT map, for the shared-state publisher.
    pub fn current_output(&self) -> &HashMap<&'static str, Value> {
        &self.current_output
    }

    /// Read the full contiguous range for `(device, kind)` in one request
    /// (§4.1 `get_all`). Coil failures return an empty map; register
    /// failures return every known label zero-filled (the VERSION=0
    /// "comms dead" sentinel, §4.2).
    pub fn get_all(&mut self, device: Device, kind: Kind) -> HashMap<&'static str, Value> {
        let labels = self.labels.all_labels(device, kind);
        if labels.is_empty() {
            return HashMap::new();
        }
        let max_addr = labels.iter().map(|(a, _)| *a).max().unwrap_or(0);
        let transport = self.transport_mut(device);
        match kind {
            Kind::Coil => match transport.read_coils(0, max_addr + 1) {
                Some(values) => labels
                    .into_iter()
                    .filter_map(|(a, l)| values.get(a as usize).map(|v| (l, Value::Bool(*v))))
                    .collect(),
                None => HashMap::new(),
            },
            Kind::Register => match transport.read_holding_registers(0, max_addr + 1) {
                Some(values) => labels
                    .into_iter()
                    .filter_map(|(a, l)| values.get(a as usize).map(|v| (l, Value::Reg(*v))))
                    .collect(),
                None => labels.into_iter().map(|(_, l)| (l, Value::Reg(0))).collect(),
            },
        }
    }

    /// Perform one scan's worth of reads, append to history, and refresh
    /// the cached current-value maps that `get`/`set` consult (§4.6 step 2-3).
    pub fn refresh(&mut self, now: f64) {
        let input_coils = self.get_all(Device::Input, Kind::Coil);
        let output_coils = self.get_all(Device::Output, Kind::Coil);
        let output_regs = self.get_all(Device::Output, Kind::Register);

        self.history.record_input(now, input_coils.clone());
        let mut output_all = output_coils.clone();
        output_all.extend(output_regs.clone());
        self.history.record_output(now, output_all);

        self.current_input = input_coils;
        self.current_output = output_coils;
        self.current_output.extend(output_regs);
    }

    /// Read the last-refreshed value, INPUT first then OUTPUT. Resolves
    /// `label` through the label map first so lookups are
    /// case-insensitive like `set` and the reverse index itself (I5, P1).
    pub fn get(&self, label: &str) -> Option<Value> {
        let (device, address, kind) = self.labels.resolve_any(label)?;
        self.get_canonical(device, address, kind)
    }

    /// Read the last-refreshed value from a specific device, also
    /// resolved case-insensitively through the label map.
    pub fn get_on(&self, device: Device, label: &str) -> Option<Value> {
        let (address, kind) = self.labels.resolve(device, label)?;
        self.get_canonical(device, address, kind)
    }

    fn get_canonical(&self, device: Device, address: u16, kind: Kind) -> Option<Value> {
        let canonical = self.labels.info(device, kind, address)?.label;
        match device {
            Device::Input => self.current_input.get(canonical),
            Device::Output => self.current_output.get(canonical),
        }
        .copied()
    }

    /// Write to whichever device owns `label`, OUTPUT first (§4.1 `set`).
    /// A kind mismatch (bool vs register) returns `false` without writing.
    pub fn set(&mut self, label: &str, value: Value) -> bool {
        let Some((device, address, kind)) = self.labels.resolve_any_for_write(label) else {
            return false;
        };
        let ok = match (kind, value) {
            (Kind::Coil, Value::Bool(b)) => self.transport_mut(device).write_coil(address, b),
            (Kind::Register, Value::Reg(r)) => self.transport_mut(device).write_register(address, r),
            _ => return false,
        };
        if ok {
            if let Some(canonical) = self.labels.info(device, kind, address).map(|slot| slot.label) {
                match device {
                    Device::Input => self.current_input.insert(canonical, value),
                    Device::Output => self.current_output.insert(canonical, value),
                };
            }
        }
        ok
    }

    pub fn rising_edge(&self, label: &str, window_ms: Option<u64>, now: f64) -> bool {
        self.history.rising_edge(label, now, self.window_seconds(window_ms))
    }

    pub fn falling_edge(&self, label: &str, window_ms: Option<u64>, now: f64) -> bool {
        self.history.falling_edge(label, now, self.window_seconds(window_ms))
    }

    pub fn extended_hold(&self, label: &str, value: bool, seconds: f64, now: f64) -> bool {
        self.history.extended_hold(label, value, now, seconds)
    }

    fn window_seconds(&self, window_ms: Option<u64>) -> f64 {
        window_ms.map_or(self.edge_window_s, |ms| ms as f64 / 1000.0)
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
