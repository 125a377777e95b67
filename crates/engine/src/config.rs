// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI surface (§6, §10.4), `clap::Parser`-derived with an `env` fallback
//! on every flag, mirroring the teacher's own `config.rs` shape.

use std::time::Duration;

use clap::Parser;

use crate::labels::LabelMap;

/// Soft-PLC apple-sorting conveyor feeder controller.
#[derive(Debug, Parser)]
#[command(name = "feeder-plc", version, about)]
pub struct Config {
    /// Use in-process mock transports instead of real Modbus/TCP.
    #[arg(long, env = "FEEDER_MOCK")]
    pub mock: bool,

    /// UI selector (tui, web, logs). The engine only exposes the
    /// interface the selected view consumes; it does not implement the
    /// view itself.
    #[arg(long, env = "FEEDER_VIEW", default_value = "logs")]
    pub view: String,

    /// Web dashboard port, reserved for an external process.
    #[arg(long, env = "FEEDER_PORT", default_value = "7681")]
    pub port: u16,

    /// INPUT terminal Modbus/TCP address.
    #[arg(long, env = "FEEDER_INPUT_IP", default_value = "172.20.231.25")]
    pub input_ip: String,

    /// OUTPUT terminal Modbus/TCP address.
    #[arg(long, env = "FEEDER_OUTPUT_IP", default_value = "172.20.231.49")]
    pub output_ip: String,

    /// Modbus slave id for the INPUT terminal.
    #[arg(long, env = "FEEDER_INPUT_SLAVE_ID", default_value = "1")]
    pub input_slave_id: u8,

    /// Modbus slave id for the OUTPUT terminal.
    #[arg(long, env = "FEEDER_OUTPUT_SLAVE_ID", default_value = "1")]
    pub output_slave_id: u8,

    /// Per-request Modbus timeout, in seconds.
    #[arg(long, env = "FEEDER_MODBUS_TIMEOUT_SECS", default_value = "10.0")]
    pub modbus_timeout_secs: f64,

    /// Modbus retries before a read/write is treated as a failure.
    #[arg(long, env = "FEEDER_MODBUS_RETRIES", default_value = "0")]
    pub modbus_retries: u32,

    /// Scan period, in milliseconds.
    #[arg(long, env = "FEEDER_POLL_INTERVAL_MS", default_value = "100")]
    pub poll_interval_ms: u64,

    /// History ring-buffer capacity, per device.
    #[arg(long, env = "FEEDER_LOG_STACK_SIZE", default_value = "3000")]
    pub log_stack_size: usize,

    /// Comms-health watchdog timeout, in seconds.
    #[arg(long, env = "FEEDER_COMMS_TIMEOUT_SECS", default_value = "5.0")]
    pub comms_timeout_secs: f64,

    /// Edge-detection window, in milliseconds. Clamped to [50, 60000]
    /// before use (§4.4) rather than rejected — operators tuning this
    /// live should never be able to wedge the process.
    #[arg(long, env = "FEEDER_EDGE_WINDOW_MS", default_value = "15000")]
    pub edge_window_ms: u64,

    /// Log format (json or text).
    #[arg(long, env = "FEEDER_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "FEEDER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Fatal configuration checks performed once at startup (§7). Anything
    /// else (transport failure, unresolved label, rule error) is a log
    /// entry and a mode transition, never a process exit.
    pub fn validate(&self) -> anyhow::Result<()> {
        LabelMap::new().map_err(|e| anyhow::anyhow!("{e}"))?;
        match self.view.as_str() {
            "tui" | "web" | "logs" => {}
            other => anyhow::bail!("invalid --view: {other} (expected tui, web, or logs)"),
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid --log-format: {other} (expected json or text)"),
        }
        Ok(())
    }

    /// Edge-detection window clamped to §4.4's [50 ms, 60 s] range.
    pub fn effective_edge_window_ms(&self) -> u64 {
        self.edge_window_ms.clamp(50, 60_000)
    }

    pub fn edge_window_s(&self) -> f64 {
        self.effective_edge_window_ms() as f64 / 1000.0
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn modbus_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.modbus_timeout_secs.max(0.0))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
