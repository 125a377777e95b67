// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use feeder_plc::config::Config;
use feeder_plc::engine::Engine;
use feeder_plc::event_log::EventLog;
use feeder_plc::facade::IoFacade;
use feeder_plc::feeder::{build_rules, FeederConfig};
use feeder_plc::labels::LabelMap;
use feeder_plc::modbus::{MockTransport, ModbusTransport, TcpModbusClient};
use feeder_plc::poll::Poller;
use feeder_plc::shared_state::SharedState;

fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    if let Err(e) = run(config) {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging from config. `DEBUG=1` forces at least
/// debug-level output regardless of the configured level (§6, §10.2).
///
/// Uses `try_init` so it's safe to call multiple times (e.g. from tests).
fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let debug_override = std::env::var("DEBUG").as_deref() == Ok("1");
    let level: &str = if debug_override && config.log_level == "info" { "debug" } else { &config.log_level };

    let filter = if std::env::var("FEEDER_LOG_LEVEL").is_err() && level == "info" {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

fn build_transport(config: &Config, mock: bool, ip: &str, slave_id: u8) -> Box<dyn ModbusTransport> {
    if mock {
        Box::new(MockTransport::new().with_version(12345))
    } else {
        Box::new(TcpModbusClient::new(ip, 502, slave_id, config.modbus_timeout(), config.modbus_retries))
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    let labels = LabelMap::new()?;

    let mut input = build_transport(&config, config.mock, &config.input_ip, config.input_slave_id);
    let mut output = build_transport(&config, config.mock, &config.output_ip, config.output_slave_id);
    if !input.connect() {
        warn!(ip = %config.input_ip, "initial connect to INPUT terminal failed");
    }
    if !output.connect() {
        warn!(ip = %config.output_ip, "initial connect to OUTPUT terminal failed");
    }

    let io = IoFacade::new(labels, input, output, config.log_stack_size, config.edge_window_s());

    let rules = build_rules(FeederConfig { comms_timeout_s: config.comms_timeout_secs });
    let engine = Engine::new(rules);

    std::fs::create_dir_all("logs")?;
    let log = Arc::new(EventLog::new(
        Some(PathBuf::from("logs/system_events.jsonl")),
        config.log_stack_size,
    ));
    let shared = Arc::new(SharedState::new());

    info!(view = %config.view, mock = config.mock, "feeder-plc starting");

    let _poller =
        Poller::spawn(io, engine, Arc::clone(&log), Arc::clone(&shared), config.poll_interval());

    // The scan loop runs on its own thread until the process is killed;
    // the external UI and signal handling are out of scope here (§1).
    loop {
        std::thread::park();
    }
}
