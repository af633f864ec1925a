// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # SENSEI - sensor mediation daemon
//!
//! Host-side daemon mediating between a sensor-acquisition microcontroller
//! (reached over a local-domain datagram socket with a fixed binary packet
//! protocol) and downstream consumers that receive transformed sensor
//! values over OSC or stdout.
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                         Configuration                              |
//! |   JSON document -> config compiler -> ordered command sequence     |
//! +--------------------------------------------------------------------+
//! |                          Mapping layer                             |
//! |   dispatcher -> per-sensor mappers (digital/analog/range/cont.)    |
//! +--------------------------------------------------------------------+
//! |                           Link layer                               |
//! |   packet codec | ack/retry tracker | reader + writer threads       |
//! +--------------------------------------------------------------------+
//! |                           Transport                                |
//! |   local-domain datagram socket pair (/tmp/sensei <-> /tmp/raspa)   |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`engine`] - queue/thread wiring, start here
//! - [`config`] - configuration compiler (JSON tree -> command sequence)
//! - [`mapping`] - mapping dispatcher and per-sensor mappers
//! - [`link`] - device link engine and command translator
//! - [`protocol`] - device packet codec and CRC
//! - [`output`] - OSC and stdout output backends
//! - [`user_frontend`] - OSC runtime control surface

/// Configuration compiler (JSON tree walker, command emission).
pub mod config;
/// Process wiring: queues, dispatcher worker, startup and shutdown.
pub mod engine;
/// Error taxonomy shared by every subsystem.
pub mod error;
/// Link engine: socket pair, reader/writer threads, ack gate.
pub mod link;
/// Mapping dispatcher and per-sensor transformation pipelines.
pub mod mapping;
/// Message taxonomy: values, commands, link errors, destinations.
pub mod message;
/// Minimal OSC 1.0 wire codec shared by backends and the user frontend.
pub mod osc;
/// Output backends (OSC, stdout).
pub mod output;
/// Device wire protocol: packet layout, CRC, packet factory.
pub mod protocol;
/// Multi-producer / multi-consumer FIFO with bounded waits.
pub mod queue;
/// Timeout and retry bookkeeping for the single in-flight packet.
pub mod tracker;
/// OSC user-control listener.
pub mod user_frontend;

pub use engine::{EngineOptions, SenseiEngine};
pub use error::{Error, Result};
