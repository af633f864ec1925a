// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Debug backend printing to the standard streams.
//!
//! Transformed values go to stdout, raw input values to stderr, so the two
//! can be redirected independently.

use crate::error::Result;
use crate::message::{Command, Value, ValuePayload};

use super::{BackendState, OutputBackend};

/// Prints every emission; intended for bring-up and debugging.
pub struct StandardStreamBackend {
    state: BackendState,
}

impl StandardStreamBackend {
    #[must_use]
    pub fn new(id: usize, max_sensors: usize) -> Self {
        Self { state: BackendState::new(id, max_sensors) }
    }
}

impl OutputBackend for StandardStreamBackend {
    fn send(&mut self, transformed: &Value, raw: &Value) {
        let index = transformed.index;
        let name = self.state.sensor_name(index);

        if self.state.enabled() {
            if let ValuePayload::Output(value) = transformed.payload {
                println!("sensor: {}, name: {}, value: {}", index, name, value);
            }
        }

        if self.state.raw_input_enabled() {
            match raw.payload {
                ValuePayload::Analog(value) => {
                    eprintln!("--raw input-- sensor: {}, name: {}, value: {}", index, name, value);
                }
                ValuePayload::Digital(value) => {
                    eprintln!(
                        "--raw input-- sensor: {}, name: {}, value: {}",
                        index, name, value as i32
                    );
                }
                ValuePayload::Continuous(value) | ValuePayload::Imu(value) => {
                    eprintln!("--raw input-- sensor: {}, name: {}, value: {}", index, name, value);
                }
                _ => {}
            }
        }
    }

    fn apply_command(&mut self, command: &Command) -> Result<()> {
        // No stream-specific commands; everything is shared state.
        self.state.apply_command(command)
    }
}
