// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process mock transport, selected via `--mock` (§6). Grounded on
//! `modbus/mock.py`'s `MockModbusClient`: plain in-memory coil/register
//! maps plus test-only setter helpers, with `connect`/`close` as no-ops
//! that always succeed unless the harness is told to simulate a dead link.

use std::collections::HashMap;

use super::transport::ModbusTransport;

/// An in-memory stand-in for a remote terminal, driven entirely by test
/// or demo code through [`MockTransport::set_coil`] /
/// [`MockTransport::set_register`].
#[derive(Debug, Default)]
pub struct MockTransport {
    connected: bool,
    coils: HashMap<u16, bool>,
    registers: HashMap<u16, u16>,
    /// When true, every read/write fails as if the link were down,
    /// regardless of `connected` — used to drive the comms-watchdog
    /// scenarios (S4) without actually severing a socket.
    fail: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed VERSION (or any register) before first use; mirrors the
    /// Python mock's default `VERSION = 12345` at construction.
    pub fn with_version(mut self, version: u16) -> Self {
        self.registers.insert(0, version);
        self
    }

    pub fn set_coil(&mut self, address: u16, value: bool) {
        self.coils.insert(address, value);
    }

    pub fn set_register(&mut self, address: u16, value: u16) {
        self.registers.insert(address, value);
    }

    pub fn coil(&self, address: u16) -> bool {
        self.coils.get(&address).copied().unwrap_or(false)
    }

    pub fn register(&self, address: u16) -> u16 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    /// Simulate the link going dead (or recovering): every transport
    /// operation fails while `fail` is true.
    pub fn set_fail(&mut self, fail: bool) {
        self.fail = fail;
    }
}

impl ModbusTransport for MockTransport {
    fn connect(&mut self) -> bool {
        if self.fail {
            return false;
        }
        self.connected = true;
        true
    }

    fn close(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read_coils(&mut self, address: u16, count: u16) -> Option<Vec<bool>> {
        if self.fail {
            return None;
        }
        Some((address..address + count).map(|a| self.coil(a)).collect())
    }

    fn write_coil(&mut self, address: u16, value: bool) -> bool {
        if self.fail {
            return false;
        }
        self.coils.insert(address, value);
        true
    }

    fn read_holding_registers(&mut self, address: u16, count: u16) -> Option<Vec<u16>> {
        if self.fail {
            return None;
        }
        Some((address..address + count).map(|a| self.register(a)).collect())
    }

    fn write_register(&mut self, address: u16, value: u16) -> bool {
        if self.fail {
            return false;
        }
        self.registers.insert(address, value);
        true
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
