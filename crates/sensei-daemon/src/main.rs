// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SENSEI daemon entry point.
//!
//! # Usage
//!
//! ```bash
//! # Run with a configuration file
//! sensei --config sensors.json
//!
//! # Custom OSC control port, ack verification off
//! sensei --config sensors.json --osc-port 24024 --no-ack-verification
//! ```

use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::Context;
use clap::Parser;

use sensei::engine::{EngineOptions, SenseiEngine};

/// SENSEI sensor mediation daemon
#[derive(Parser, Debug)]
#[command(name = "sensei")]
#[command(about = "Bridges a sensor front-end device to OSC consumers")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: PathBuf,

    /// OSC user-control port
    #[arg(long, default_value_t = sensei::user_frontend::DEFAULT_SERVER_PORT)]
    osc_port: u16,

    /// Upper bound on sensor indices
    #[arg(long, default_value_t = sensei::mapping::DEFAULT_MAX_SENSORS)]
    max_sensors: usize,

    /// Receive socket path
    #[arg(long, default_value = sensei::link::SENSEI_SOCKET)]
    receive_socket: PathBuf,

    /// Device peer socket path
    #[arg(long, default_value = sensei::link::RASPA_SOCKET)]
    peer_socket: PathBuf,

    /// Disable ack tracking and retransmission
    #[arg(long)]
    no_ack_verification: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(args.log_level.as_str()),
    )
    .init();
    log::info!("sensei starting, configuration: {}", args.config.display());

    let mut options = EngineOptions::new(&args.config);
    options.osc_server_port = args.osc_port;
    options.max_sensors = args.max_sensors;
    options.receive_socket = args.receive_socket;
    options.peer_socket = args.peer_socket;

    let mut engine = SenseiEngine::new(options).context("building engine")?;
    if args.no_ack_verification {
        engine.link_controls().verify_acks(false);
    }
    engine.run().context("starting workers")?;

    // Block until SIGINT/SIGTERM, then shut the workers down in order.
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .context("installing signal handler")?;
    let _ = shutdown_rx.recv();

    log::info!("sensei shutting down");
    engine.stop();
    Ok(())
}
