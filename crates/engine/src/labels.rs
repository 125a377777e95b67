// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static label map: symbolic names to `(device, kind, address)` slots.
//!
//! Keyed by `(device, kind, address)` per §3; the reverse index (label to
//! address) is case-insensitive and injective per device (I5, P1). Built
//! once at startup and never mutated afterward.

use std::fmt;

/// Which remote Modbus/TCP terminal a slot lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Input,
    Output,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
        })
    }
}

/// Whether a slot is a single-bit coil or a 16-bit holding register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Coil,
    Register,
}

/// A single label-map entry: its address and a short description.
#[derive(Debug, Clone, Copy)]
pub struct Slot {
    pub address: u16,
    pub kind: Kind,
    pub label: &'static str,
    pub description: &'static str,
}

const INPUT_COILS: &[(u16, &str, &str)] = &[
    (0, "S1", "Bin present sensor on C3 (inverted: true = C3 empty)"),
    (1, "S2", "Bin present sensor on C2 (inverted: true = C2 empty)"),
    (2, "CS1", "Crate sensor 1"),
    (3, "CS2", "Crate sensor 2"),
    (4, "CS3", "Crate sensor 3"),
    (5, "M1_Trip", "Motor 1 protection trip (false = tripped)"),
    (6, "M2_Trip", "Motor 2 protection trip (false = tripped)"),
    (7, "E_Stop", "Emergency stop loop (false = pressed)"),
    (8, "Manual_Select", "Manual-mode selector switch"),
    (9, "Auto_Select", "Auto-mode selector switch"),
    (10, "Klaar_Geweeg_Btn", "Operator \"weighed, ready\" pushbutton"),
    (11, "CPS_1", "Crate-position sensor 1"),
    (12, "CPS_2", "Crate-position sensor 2"),
    (13, "Reset_Btn", "Fault reset pushbutton"),
    (14, "PALM_Run_Signal", "Downstream PALM line run-permissive"),
    (15, "DHLM_Trip_Signal", "DHLM drive protection trip (false = tripped)"),
];

const OUTPUT_COILS: &[(u16, &str, &str)] = &[
    (0, "LED_GREEN", "Comms-healthy indicator lamp"),
    (1, "MOTOR_2", "C2 conveyor drive"),
    (2, "MOTOR_3", "C3 conveyor drive"),
    (3, "LED_RED", "Crate-misalignment indicator lamp"),
];

const OUTPUT_REGISTERS: &[(u16, &str, &str)] =
    &[(0, "VERSION", "Remote terminal firmware heartbeat, 0 = dead link")];

/// Immutable label-to-address map for both remote terminals.
#[derive(Debug, Clone, Copy)]
pub struct LabelMap;

impl LabelMap {
    /// Build the default label map, validating uniqueness per device (I5).
    ///
    /// The table above is a compile-time constant, so this only fails if a
    /// future edit to the table introduces a duplicate label.
    pub fn new() -> Result<Self, crate::error::PlcError> {
        for device in [Device::Input, Device::Output] {
            let mut seen: Vec<&str> = Vec::new();
            for (_, table) in Self::tables(device) {
                for (_, label, _) in table {
                    if seen.iter().any(|s| s.eq_ignore_ascii_case(label)) {
                        return Err(crate::error::PlcError::ConfigError {
                            reason: "duplicate label in map",
                        });
                    }
                    seen.push(label);
                }
            }
        }
        Ok(Self)
    }

    fn tables(device: Device) -> &'static [(Kind, &'static [(u16, &'static str, &'static str)])] {
        match device {
            Device::Input => &[(Kind::Coil, INPUT_COILS)],
            Device::Output => &[(Kind::Coil, OUTPUT_COILS), (Kind::Register, OUTPUT_REGISTERS)],
        }
    }

    /// Resolve a label on a specific device to its address and kind (I5).
    pub fn resolve(&self, device: Device, label: &str) -> Option<(u16, Kind)> {
        for (kind, table) in Self::tables(device) {
            for (address, entry_label, _) in *table {
                if entry_label.eq_ignore_ascii_case(label) {
                    return Some((*address, *kind));
                }
            }
        }
        None
    }

    /// Resolve a label against INPUT first, then OUTPUT (§4.1 `get`).
    pub fn resolve_any(&self, label: &str) -> Option<(Device, u16, Kind)> {
        if let Some((addr, kind)) = self.resolve(Device::Input, label) {
            return Some((Device::Input, addr, kind));
        }
        self.resolve(Device::Output, label)
            .map(|(addr, kind)| (Device::Output, addr, kind))
    }

    /// Resolve a label against OUTPUT first, then INPUT (§4.1 `set`).
    pub fn resolve_any_for_write(&self, label: &str) -> Option<(Device, u16, Kind)> {
        if let Some((addr, kind)) = self.resolve(Device::Output, label) {
            return Some((Device::Output, addr, kind));
        }
        self.resolve(Device::Input, label)
            .map(|(addr, kind)| (Device::Input, addr, kind))
    }

    /// Look up the full slot info for a known `(device, kind, address)`.
    pub fn info(&self, device: Device, kind: Kind, address: u16) -> Option<Slot> {
        for (table_kind, table) in Self::tables(device) {
            if *table_kind != kind {
                continue;
            }
            for (addr, label, description) in *table {
                if *addr == address {
                    return Some(Slot { address, kind, label, description });
                }
            }
        }
        None
    }

    /// All labels defined for `(device, kind)`, in address order.
    pub fn all_labels(&self, device: Device, kind: Kind) -> Vec<(u16, &'static str)> {
        let mut out = Vec::new();
        for (table_kind, table) in Self::tables(device) {
            if *table_kind != kind {
                continue;
            }
            for (addr, label, _) in *table {
                out.push((*addr, *label));
            }
        }
        out.sort_by_key(|(addr, _)| *addr);
        out
    }

    /// The highest address used for `(device, kind)`, for sizing a read.
    pub fn max_address(&self, device: Device, kind: Kind) -> Option<u16> {
        self.all_labels(device, kind).into_iter().map(|(a, _)| a).max()
    }
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod tests;
