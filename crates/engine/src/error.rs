// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classified, non-fatal error taxonomy for the control engine.
//!
//! Everything here is logged and absorbed by the caller rather than
//! propagated as a hard failure — only configuration problems at startup
//! are fatal, and those travel as `anyhow::Error` out of `main`, never as
//! a `PlcError`.

use std::fmt;

/// Outcomes the I/O facade and rule engine classify internally before
/// collapsing them to `None`/`false` at their public boundary (§4.1, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlcError {
    /// Fatal at startup: duplicate label or unknown device in the label map.
    ConfigError { reason: &'static str },
    /// A Modbus read or write failed (timeout, disconnect, protocol error).
    TransportFailure,
    /// `get`/`set` addressed a label not present in either device's map.
    UnresolvedLabel,
    /// A rule's `condition` or `action` panicked or returned an error.
    RuleFault,
}

impl PlcError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigError { .. } => "CONFIG_ERROR",
            Self::TransportFailure => "TRANSPORT_FAILURE",
            Self::UnresolvedLabel => "UNRESOLVED_LABEL",
            Self::RuleFault => "RULE_FAULT",
        }
    }
}

impl fmt::Display for PlcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError { reason } => write!(f, "config error: {reason}"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl std::error::Error for PlcError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
