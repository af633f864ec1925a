// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mapping dispatcher: routes commands and values to per-sensor mappers.
//!
//! Owns a bounded array of mapper slots indexed by sensor id. A
//! `SET_SENSOR_TYPE` command instantiates (or replaces) the slot's mapper;
//! every other mapping-destined command and every inbound value is
//! dispatched to the slot named by its index. Mapper errors are reported to
//! the caller but never stop dispatch of subsequent messages.

pub mod mappers;

pub use mappers::SensorMapper;

use crate::error::{Error, Result};
use crate::message::{Command, CommandKind, Value, ValuePayload};
use crate::output::OutputBackend;

/// Default bound on sensor indices.
pub const DEFAULT_MAX_SENSORS: usize = 64;

/// Sensor-index to mapper lookup and dispatch.
pub struct MappingProcessor {
    mappers: Vec<Option<SensorMapper>>,
}

impl MappingProcessor {
    #[must_use]
    pub fn new(max_sensors: usize) -> Self {
        let mut mappers = Vec::with_capacity(max_sensors);
        mappers.resize_with(max_sensors, || None);
        Self { mappers }
    }

    /// Apply one mapping-destined command.
    ///
    /// `SET_SENSOR_TYPE` (re)creates the slot's mapper; everything else is
    /// forwarded to the existing mapper.
    pub fn apply_command(&mut self, command: &Command) -> Result<()> {
        let index = command.index;
        if index >= self.mappers.len() {
            log::warn!("[MAPPING] sensor index {} out of range", index);
            return Err(Error::InvalidValue);
        }
        if let CommandKind::SetSensorType(sensor_type) = &command.kind {
            self.mappers[index] = Some(SensorMapper::new(*sensor_type, index));
            return Ok(());
        }
        match &mut self.mappers[index] {
            Some(mapper) => mapper.apply_command(command),
            None => {
                log::warn!("[MAPPING] command for unconfigured sensor {}", index);
                Err(Error::InvalidValue)
            }
        }
    }

    /// Route one inbound sample to its mapper and through to the backend.
    pub fn process(&mut self, value: &Value, backend: &mut dyn OutputBackend) {
        match self.mappers.get_mut(value.index) {
            Some(Some(mapper)) => mapper.process(value, backend),
            _ => log::debug!("[MAPPING] value for unconfigured sensor {}", value.index),
        }
    }

    /// Reverse-translate a user set-request into a device command.
    pub fn process_set_value(&self, value: &Value) -> Option<Command> {
        debug_assert!(matches!(
            value.payload,
            ValuePayload::IntegerSet(_) | ValuePayload::FloatSet(_)
        ));
        match self.mappers.get(value.index) {
            Some(Some(mapper)) => mapper.process_set_value(value),
            _ => {
                log::debug!("[MAPPING] set request for unconfigured sensor {}", value.index);
                None
            }
        }
    }

    /// Collect a configuration snapshot for every configured sensor.
    pub fn put_config_commands_into(&self, out: &mut Vec<Command>) {
        for mapper in self.mappers.iter().flatten() {
            mapper.emit_config_commands(out);
        }
    }
}
