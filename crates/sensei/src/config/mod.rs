// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configuration compiler.
//!
//! Walks a parsed JSON configuration document (`backends`, `sensors`,
//! `imu`) and emits a strictly ordered command sequence onto the main
//! queue. The sequence is bracketed by `ENABLE_SENDING_PACKETS(false)` /
//! `(true)`, so the device stays muted for the whole reconfiguration.
//!
//! Compilation is fail-fast: the first missing required key or unknown
//! enum string aborts with a parameter error, leaving the device muted.
//! Missing optional keys are skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value as Json;

use crate::error::{Error, Result};
use crate::message::{factory, BackendType, ImuIndex, Message, SendingMode, SensorHwType,
                     SensorType};
use crate::queue::SynchronizedQueue;

/// Read and parse a configuration file.
pub fn load_document(path: &Path) -> Result<Json> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        log::error!("[CONFIG] cannot open {}: {}", path.display(), e);
        Error::Io(e)
    })?;
    serde_json::from_str(&text).map_err(|e| {
        log::error!("[CONFIG] cannot parse {}: {}", path.display(), e);
        Error::Parsing(e.to_string())
    })
}

/// Backend declarations found in a document: `(id, type)` pairs.
///
/// Used by the process wiring to instantiate backends before the compiled
/// commands configure them.
#[must_use]
pub fn backend_specs(doc: &Json) -> Vec<(usize, BackendType)> {
    let mut specs = Vec::new();
    let Some(backends) = doc.get("backends").and_then(Json::as_array) else {
        return specs;
    };
    for backend in backends {
        let Some(id) = backend.get("id").and_then(Json::as_u64) else {
            continue;
        };
        match backend.get("type").and_then(Json::as_str) {
            Some("osc") => specs.push((id as usize, BackendType::Osc)),
            Some("stream") => specs.push((id as usize, BackendType::StdStream)),
            Some(other) => log::warn!("[CONFIG] unknown backend type \"{}\"", other),
            None => log::warn!("[CONFIG] backend {} has no type", id),
        }
    }
    specs
}

/// Compiles a JSON configuration document into commands.
pub struct JsonConfiguration {
    source: PathBuf,
    queue: Arc<SynchronizedQueue<Message>>,
}

impl JsonConfiguration {
    pub fn new<P: Into<PathBuf>>(source: P, queue: Arc<SynchronizedQueue<Message>>) -> Self {
        Self { source: source.into(), queue }
    }

    /// Read the source file and compile it.
    pub fn read(&self) -> Result<()> {
        log::info!("[CONFIG] reading configuration from {}", self.source.display());
        let doc = load_document(&self.source)?;
        self.compile(&doc)
    }

    /// Compile an already-parsed document.
    pub fn compile(&self, doc: &Json) -> Result<()> {
        // Mute the board before any configuration command goes out.
        self.push(factory::enable_sending_packets(false));

        if let Some(backends) = doc.get("backends").and_then(Json::as_array) {
            for backend in backends {
                self.handle_backend(backend)?;
            }
        }
        if let Some(sensors) = doc.get("sensors").and_then(Json::as_array) {
            for sensor in sensors {
                self.handle_sensor(sensor)?;
            }
        }
        self.handle_imu(doc.get("imu"))?;

        // The final command re-enables packet sending.
        self.push(factory::enable_sending_packets(true));
        Ok(())
    }

    fn push(&self, command: crate::message::Command) {
        self.queue.push(Message::Command(command));
    }

    /// Emit commands for one sensor. `id` is the only required key; the
    /// emission order is fixed because later commands depend on state
    /// established by earlier ones.
    fn handle_sensor(&self, sensor: &Json) -> Result<()> {
        let Some(id) = sensor.get("id").and_then(Json::as_u64) else {
            log::warn!("[CONFIG] sensor id not found in configuration");
            return Err(Error::Parameter("sensor id missing".to_string()));
        };
        let id = id as usize;

        if let Some(name) = sensor.get("name").and_then(Json::as_str) {
            self.push(factory::set_sensor_name(id, name));
        }

        if let Some(type_str) = sensor.get("sensor_type").and_then(Json::as_str) {
            let sensor_type = match type_str {
                "analog_input" => SensorType::AnalogInput,
                "digital_input" => SensorType::DigitalInput,
                "continuous_input" => SensorType::ContinuousInput,
                "digital_output" => SensorType::DigitalOutput,
                "range_input" => SensorType::RangeInput,
                other => {
                    log::warn!("[CONFIG] \"{}\" is not a recognized sensor type", other);
                    return Err(Error::Parameter(format!("unknown sensor type: {}", other)));
                }
            };
            self.push(factory::set_sensor_type(id, sensor_type));
        }

        if let Some(hardware) = sensor.get("hardware") {
            if hardware.is_object() {
                self.handle_sensor_hw(hardware, id)?;
            }
        }

        // IMU parameter bound to this sensor's virtual pin.
        if let Some(parameter) = sensor.get("parameter").and_then(Json::as_str) {
            let imu_index = match parameter {
                "yaw" => Some(ImuIndex::Yaw),
                "pitch" => Some(ImuIndex::Pitch),
                "roll" => Some(ImuIndex::Roll),
                _ => None,
            };
            if let Some(imu_index) = imu_index {
                self.push(factory::set_virtual_pin(id, imu_index));
            }
        }

        if let Some(enabled) = sensor.get("enabled").and_then(Json::as_bool) {
            self.push(factory::set_enabled(id, enabled));
        }

        if let Some(mode_str) = sensor.get("mode").and_then(Json::as_str) {
            let mode = match mode_str {
                "off" => SendingMode::Off,
                "continuous" => SendingMode::Continuous,
                "on_value_changed" => SendingMode::OnValueChanged,
                "toggled" => SendingMode::Toggled,
                "on_press" => SendingMode::OnPress,
                "on_release" => SendingMode::OnRelease,
                other => {
                    log::warn!("[CONFIG] \"{}\" is not a recognized sending mode", other);
                    return Err(Error::Parameter(format!("unknown sending mode: {}", other)));
                }
            };
            self.push(factory::set_sending_mode(id, mode));
        }

        if let Some(inverted) = sensor.get("inverted").and_then(Json::as_bool) {
            self.push(factory::set_invert_enabled(id, inverted));
        }

        if let Some(range) = sensor.get("range").and_then(Json::as_array) {
            if range.len() >= 2 {
                if let (Some(low), Some(high)) = (range[0].as_f64(), range[1].as_f64()) {
                    self.push(factory::set_input_scale_range_low(id, low as f32));
                    self.push(factory::set_input_scale_range_high(id, high as f32));
                }
            }
        }
        Ok(())
    }

    fn handle_sensor_hw(&self, hardware: &Json, id: usize) -> Result<()> {
        // Pin binding comes first so later hardware commands address a
        // controller that exists.
        if let Some(pin) = hardware.get("pin_index").and_then(Json::as_i64) {
            self.push(factory::set_hw_pin(id, pin as i32));
        }
        if let Some(pins) = hardware.get("pins").and_then(Json::as_array) {
            let pins: Vec<i32> =
                pins.iter().filter_map(Json::as_i64).map(|p| p as i32).collect();
            if !pins.is_empty() {
                self.push(factory::set_hw_pins(id, pins));
            }
        }

        if let Some(hw_str) = hardware.get("hardware_type").and_then(Json::as_str) {
            let hw_type = match hw_str {
                "analog_input_pin" => SensorHwType::AnalogInputPin,
                "digital_input_pin" => SensorHwType::DigitalInputPin,
                "digital_output_pin" => SensorHwType::DigitalOutputPin,
                "stepped_output" => SensorHwType::SteppedOutput,
                "multiplexer" => SensorHwType::Multiplexer,
                "n_way_switch" => SensorHwType::NWaySwitch,
                "encoder" => SensorHwType::Encoder,
                "button" => SensorHwType::Button,
                "ribbon" => SensorHwType::Ribbon,
                "imu_pitch" => SensorHwType::ImuPitch,
                "imu_roll" => SensorHwType::ImuRoll,
                "imu_yaw" => SensorHwType::ImuYaw,
                other => {
                    log::warn!("[CONFIG] \"{}\" is not a recognized hardware type", other);
                    return Err(Error::Parameter(format!("unknown hardware type: {}", other)));
                }
            };
            self.push(factory::set_sensor_hw_type(id, hw_type));
        }

        if let Some(ticks) = hardware.get("delta_ticks").and_then(Json::as_i64) {
            self.push(factory::set_sending_delta_ticks(id, ticks as i32));
        }
        if let Some(bits) = hardware.get("adc_resolution").and_then(Json::as_i64) {
            self.push(factory::set_adc_bit_resolution(id, bits as i32));
        }
        if let Some(cutoff) = hardware.get("lowpass_cutoff").and_then(Json::as_f64) {
            self.push(factory::set_lowpass_cutoff(id, cutoff as f32));
        }
        if let Some(order) = hardware.get("lowpass_order").and_then(Json::as_i64) {
            self.push(factory::set_lowpass_filter_order(id, order as i32));
        }
        if let Some(threshold) = hardware.get("slider_threshold").and_then(Json::as_i64) {
            self.push(factory::set_slider_threshold(id, threshold as i32));
        }
        Ok(())
    }

    fn handle_backend(&self, backend: &Json) -> Result<()> {
        let Some(id) = backend.get("id").and_then(Json::as_u64) else {
            log::warn!("[CONFIG] backend id not found in configuration");
            return Err(Error::Parameter("backend id missing".to_string()));
        };
        let id = id as usize;

        if let Some(enabled) = backend.get("enabled").and_then(Json::as_bool) {
            self.push(factory::set_send_output_enabled(id, enabled));
        }
        if let Some(raw_enabled) = backend.get("raw_input_enabled").and_then(Json::as_bool) {
            self.push(factory::set_send_raw_input_enabled(id, raw_enabled));
        }

        if let Some("osc") = backend.get("type").and_then(Json::as_str) {
            self.handle_osc_backend(backend, id)?;
        }
        Ok(())
    }

    fn handle_osc_backend(&self, backend: &Json, id: usize) -> Result<()> {
        if let Some(host) = backend.get("host").and_then(Json::as_str) {
            self.push(factory::set_osc_output_host(id, host));
        }
        if let Some(port) = backend.get("port").and_then(Json::as_i64) {
            self.push(factory::set_osc_output_port(id, port));
        }
        if let Some(path) = backend.get("base_path").and_then(Json::as_str) {
            self.push(factory::set_osc_output_base_path(id, path));
        }
        if let Some(path) = backend.get("base_raw_input_path").and_then(Json::as_str) {
            self.push(factory::set_osc_output_raw_path(id, path));
        }
        Ok(())
    }

    fn handle_imu(&self, imu: Option<&Json>) -> Result<()> {
        let Some(imu) = imu else { return Ok(()) };
        if !imu.is_object() {
            return Ok(());
        }

        if let Some(filter_str) = imu.get("filter_mode").and_then(Json::as_str) {
            let filter = match filter_str {
                "no_orientation" => 0,
                "kalman" => 1,
                "q_comp" => 2,
                "q_grad" => 3,
                _ => 0,
            };
            self.push(factory::set_imu_filter_mode(filter));
        }
        if let Some(range) = imu.get("accelerometer_range_max").and_then(Json::as_i64) {
            self.push(factory::set_imu_acc_range_max(range as i32));
        }
        if let Some(range) = imu.get("gyroscope_range_max").and_then(Json::as_i64) {
            self.push(factory::set_imu_gyro_range_max(range as i32));
        }
        if let Some(range) = imu.get("compass_range_max").and_then(Json::as_f64) {
            self.push(factory::set_imu_compass_range_max(range as f32));
        }
        if let Some(enabled) = imu.get("compass_enabled").and_then(Json::as_bool) {
            self.push(factory::set_imu_compass_enabled(enabled));
        }
        if let Some(mode_str) = imu.get("mode").and_then(Json::as_str) {
            let mode = match mode_str {
                "continuous" => SendingMode::Continuous,
                "on_value_changed" => SendingMode::OnValueChanged,
                other => {
                    log::warn!("[CONFIG] \"{}\" is not a recognized sending mode", other);
                    return Err(Error::Parameter(format!("unknown sending mode: {}", other)));
                }
            };
            self.push(factory::set_imu_sending_mode(mode));
        }
        if let Some(ticks) = imu.get("delta_ticks").and_then(Json::as_i64) {
            self.push(factory::set_imu_delta_ticks(ticks as i32));
        }
        if let Some(data_str) = imu.get("data").and_then(Json::as_str) {
            let mode = if data_str == "quaternions" {
                2
            } else {
                log::error!("[CONFIG] \"{}\" is not a recognized data mode", data_str);
                0
            };
            self.push(factory::set_imu_data_mode(mode));
        }
        if let Some(threshold) = imu.get("acc_norm_threshold").and_then(Json::as_f64) {
            self.push(factory::set_imu_acc_threshold(threshold as f32));
        }
        if let Some(enabled) = imu.get("enabled").and_then(Json::as_bool) {
            self.push(factory::set_imu_enabled(enabled));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Command, CommandKind};
    use serde_json::json;

    fn compile(doc: &Json) -> (Result<()>, Vec<Command>) {
        let queue = Arc::new(SynchronizedQueue::new());
        let config = JsonConfiguration::new("unused.json", Arc::clone(&queue));
        let result = config.compile(doc);
        let mut commands = Vec::new();
        while let Some(message) = queue.pop() {
            match message {
                Message::Command(command) => commands.push(command),
                other => panic!("compiler must only emit commands, got {:?}", other),
            }
        }
        (result, commands)
    }

    #[test]
    fn test_compile_seed_scenario() {
        let doc = json!({
            "backends": [
                {"id": 0, "type": "osc", "enabled": true, "host": "h", "port": 9000,
                 "base_path": "/s"}
            ],
            "sensors": [
                {"id": 3, "sensor_type": "analog_input", "enabled": true,
                 "mode": "on_value_changed", "range": [0, 1023]}
            ],
            "imu": {}
        });
        let (result, commands) = compile(&doc);
        result.expect("compilation must succeed");

        let kinds: Vec<&CommandKind> = commands.iter().map(|c| &c.kind).collect();
        assert!(matches!(kinds[0], CommandKind::EnableSendingPackets(false)));
        assert!(matches!(kinds[1], CommandKind::SetSendOutputEnabled(true)));
        assert!(matches!(kinds[2], CommandKind::SetOscOutputHost(h) if h == "h"));
        assert!(matches!(kinds[3], CommandKind::SetOscOutputPort(9000)));
        assert!(matches!(kinds[4], CommandKind::SetOscOutputBasePath(p) if p == "/s"));
        assert!(matches!(
            kinds[5],
            CommandKind::SetSensorType(crate::message::SensorType::AnalogInput)
        ));
        assert!(matches!(kinds[6], CommandKind::SetEnabled(true)));
        assert!(matches!(
            kinds[7],
            CommandKind::SetSendingMode(SendingMode::OnValueChanged)
        ));
        assert!(matches!(kinds[8], CommandKind::SetInputScaleRangeLow(v) if *v == 0.0));
        assert!(matches!(kinds[9], CommandKind::SetInputScaleRangeHigh(v) if *v == 1023.0));
        assert!(matches!(kinds[10], CommandKind::EnableSendingPackets(true)));
        assert_eq!(commands.len(), 11);

        // Sensor commands carry the sensor id, backend commands the backend id.
        assert_eq!(commands[5].index, 3);
        assert_eq!(commands[2].index, 0);
    }

    #[test]
    fn test_missing_sensor_id_aborts_after_mute() {
        let doc = json!({
            "sensors": [ {"sensor_type": "analog_input"} ]
        });
        let (result, commands) = compile(&doc);
        assert!(matches!(result, Err(Error::Parameter(_))));
        assert_eq!(commands.len(), 1, "only the leading mute may be emitted");
        assert!(matches!(commands[0].kind, CommandKind::EnableSendingPackets(false)));
    }

    #[test]
    fn test_unknown_sensor_type_is_a_parameter_error() {
        let doc = json!({
            "sensors": [ {"id": 1, "sensor_type": "thermo_input"} ]
        });
        let (result, _) = compile(&doc);
        assert!(matches!(result, Err(Error::Parameter(_))));
    }

    #[test]
    fn test_unknown_sending_mode_is_a_parameter_error() {
        let doc = json!({
            "sensors": [ {"id": 1, "sensor_type": "analog_input", "mode": "sometimes"} ]
        });
        let (result, _) = compile(&doc);
        assert!(matches!(result, Err(Error::Parameter(_))));
    }

    #[test]
    fn test_hardware_block_emits_in_fixed_order() {
        let doc = json!({
            "sensors": [{
                "id": 2,
                "hardware": {
                    "pin_index": 14,
                    "hardware_type": "analog_input_pin",
                    "delta_ticks": 5,
                    "adc_resolution": 10,
                    "lowpass_cutoff": 120.0,
                    "lowpass_order": 2,
                    "slider_threshold": 8
                }
            }]
        });
        let (result, commands) = compile(&doc);
        result.expect("compile");
        let kinds: Vec<&CommandKind> = commands.iter().map(|c| &c.kind).collect();
        assert!(matches!(kinds[1], CommandKind::SetHwPin(14)));
        assert!(matches!(
            kinds[2],
            CommandKind::SetSensorHwType(SensorHwType::AnalogInputPin)
        ));
        assert!(matches!(kinds[3], CommandKind::SetSendingDeltaTicks(5)));
        assert!(matches!(kinds[4], CommandKind::SetAdcBitResolution(10)));
        assert!(matches!(kinds[5], CommandKind::SetLowpassCutoff(v) if *v == 120.0));
        assert!(matches!(kinds[6], CommandKind::SetLowpassFilterOrder(2)));
        assert!(matches!(kinds[7], CommandKind::SetSliderThreshold(8)));
    }

    #[test]
    fn test_imu_block_compiles_full_parameter_set() {
        let doc = json!({
            "imu": {
                "filter_mode": "kalman",
                "accelerometer_range_max": 4,
                "gyroscope_range_max": 500,
                "compass_range_max": 2.5,
                "compass_enabled": true,
                "mode": "continuous",
                "delta_ticks": 10,
                "data": "quaternions",
                "acc_norm_threshold": 0.1,
                "enabled": true
            }
        });
        let (result, commands) = compile(&doc);
        result.expect("compile");
        let kinds: Vec<&CommandKind> = commands.iter().map(|c| &c.kind).collect();
        assert!(matches!(kinds[1], CommandKind::SetImuFilterMode(1)));
        assert!(matches!(kinds[2], CommandKind::SetImuAccRangeMax(4)));
        assert!(matches!(kinds[7], CommandKind::SetImuDeltaTicks(10)));
        assert!(matches!(kinds[8], CommandKind::SetImuDataMode(2)));
        assert!(matches!(kinds[10], CommandKind::SetImuEnabled(true)));
    }

    #[test]
    fn test_unknown_imu_data_mode_falls_back_to_components() {
        let doc = json!({ "imu": { "data": "euler" } });
        let (result, commands) = compile(&doc);
        result.expect("compile");
        assert!(commands
            .iter()
            .any(|c| matches!(c.kind, CommandKind::SetImuDataMode(0))));
    }

    #[test]
    fn test_empty_document_still_brackets_with_mute_unmute() {
        let (result, commands) = compile(&json!({}));
        result.expect("compile");
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0].kind, CommandKind::EnableSendingPackets(false)));
        assert!(matches!(commands[1].kind, CommandKind::EnableSendingPackets(true)));
    }

    #[test]
    fn test_virtual_pin_binding() {
        let doc = json!({
            "sensors": [ {"id": 6, "sensor_type": "continuous_input", "parameter": "yaw"} ]
        });
        let (result, commands) = compile(&doc);
        result.expect("compile");
        assert!(commands
            .iter()
            .any(|c| matches!(c.kind, CommandKind::SetVirtualPin(ImuIndex::Yaw))));
    }

    #[test]
    fn test_backend_specs_extraction() {
        let doc = json!({
            "backends": [
                {"id": 0, "type": "osc"},
                {"id": 1, "type": "stream"},
                {"id": 2, "type": "teletype"}
            ]
        });
        let specs = backend_specs(&doc);
        assert_eq!(specs, vec![(0, BackendType::Osc), (1, BackendType::StdStream)]);
    }
}
