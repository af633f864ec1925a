// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Output backends: downstream consumers of transformed sensor values.
//!
//! A backend receives every emission as a `(transformed, raw)` pair; raw
//! republishing is optional and configured per backend. Backends are
//! identified by an integer id carried in the commands that configure them.

pub mod osc_backend;
pub mod stream;

pub use osc_backend::OscBackend;
pub use stream::StandardStreamBackend;

use crate::error::{Error, Result};
use crate::message::{Command, CommandKind, Value};

/// Downstream consumer of `(transformed, raw)` value pairs.
pub trait OutputBackend: Send {
    /// Deliver one transformed value, with the originating raw sample.
    fn send(&mut self, transformed: &Value, raw: &Value);

    /// Apply a backend-destined configuration command.
    fn apply_command(&mut self, command: &Command) -> Result<()>;
}

/// Configuration shared by every backend implementation.
#[derive(Debug)]
pub(crate) struct BackendState {
    id: usize,
    enabled: bool,
    raw_input_enabled: bool,
    sensor_names: Vec<String>,
}

impl BackendState {
    pub(crate) fn new(id: usize, max_sensors: usize) -> Self {
        Self {
            id,
            enabled: true,
            raw_input_enabled: false,
            sensor_names: (0..max_sensors).map(|i| format!("sensor_{}", i)).collect(),
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn raw_input_enabled(&self) -> bool {
        self.raw_input_enabled
    }

    pub(crate) fn sensor_name(&self, index: usize) -> &str {
        self.sensor_names
            .get(index)
            .map(String::as_str)
            .unwrap_or("unknown")
    }

    /// Handle the command set shared by all backend types.
    ///
    /// Sensor names address a sensor, not a backend, so they apply
    /// unconditionally; backend toggles only apply when the command's index
    /// matches this backend's id.
    pub(crate) fn apply_command(&mut self, command: &Command) -> Result<()> {
        match &command.kind {
            CommandKind::SetSensorName(name) => {
                if let Some(slot) = self.sensor_names.get_mut(command.index) {
                    *slot = name.clone();
                }
                Ok(())
            }
            CommandKind::SetSendOutputEnabled(enabled) => {
                if command.index == self.id {
                    self.enabled = *enabled;
                }
                Ok(())
            }
            CommandKind::SetSendRawInputEnabled(enabled) => {
                if command.index == self.id {
                    self.raw_input_enabled = *enabled;
                }
                Ok(())
            }
            _ => Err(Error::UnhandledCommand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::factory;

    #[test]
    fn test_backend_toggles_are_id_scoped() {
        let mut state = BackendState::new(1, 8);
        state
            .apply_command(&factory::set_send_output_enabled(0, false))
            .expect("command for other backend is ignored");
        assert!(state.enabled(), "toggle for backend 0 must not affect backend 1");
        state
            .apply_command(&factory::set_send_output_enabled(1, false))
            .expect("toggle");
        assert!(!state.enabled());
    }

    #[test]
    fn test_sensor_names_apply_to_every_backend() {
        let mut state = BackendState::new(3, 8);
        state
            .apply_command(&factory::set_sensor_name(2, "fader_left"))
            .expect("name");
        assert_eq!(state.sensor_name(2), "fader_left");
        assert_eq!(state.sensor_name(5), "sensor_5");
    }

    #[test]
    fn test_out_of_range_names_fall_back() {
        let state = BackendState::new(0, 2);
        assert_eq!(state.sensor_name(99), "unknown");
    }
}
