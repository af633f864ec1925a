// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-sensor transformation pipelines.
//!
//! A mapper converts raw device samples into normalised output values
//! (clip, scale, invert, change-detect) and reverse-translates user
//! set-requests into device commands. Four variants share a common header:
//!
//! - **digital**: boolean in, 0.0/1.0 out, no change detection,
//! - **analog**: integer ADC counts in, `[0, 1]` float out,
//! - **range**: integer in, clipped integer out,
//! - **continuous**: float in, `[0, 1]` float out (default range is one
//!   full turn, `[-PI, PI]`).

use crate::error::{Error, Result};
use crate::message::{
    factory, Command, CommandKind, MultiplexerConfig, SendingMode, SensorHwType, SensorType,
    Value, ValuePayload,
};
use crate::output::OutputBackend;

const MAX_ADC_BIT_RESOLUTION: i32 = 16;
const DEFAULT_ADC_BIT_RESOLUTION: i32 = 12;
const DEFAULT_FILTER_TIME_CONSTANT: f32 = 0.020; // 20 ms

/// Two consecutive float outputs closer than this are considered unchanged.
const PREVIOUS_VALUE_THRESHOLD: f32 = 1.0e-4;

#[inline]
fn clip<T: PartialOrd>(value: T, low: T, high: T) -> T {
    if value < low {
        low
    } else if value > high {
        high
    } else {
        value
    }
}

// ============================================================================
// Shared header
// ============================================================================

/// Configuration common to every mapper variant.
#[derive(Debug)]
pub(crate) struct MapperCore {
    sensor_type: SensorType,
    index: usize,
    enabled: bool,
    hw_type: Option<SensorHwType>,
    hw_pins: Vec<i32>,
    sending_mode: SendingMode,
    delta_ticks: i32,
    previous_value: f32,
    invert: bool,
    send_timestamp: bool,
    fast_mode: bool,
    multiplexer: Option<MultiplexerConfig>,
}

impl MapperCore {
    fn new(sensor_type: SensorType, index: usize) -> Self {
        Self {
            sensor_type,
            index,
            enabled: false,
            hw_type: None,
            hw_pins: Vec::new(),
            sending_mode: SendingMode::Off,
            delta_ticks: 1,
            previous_value: 0.0,
            invert: false,
            send_timestamp: false,
            fast_mode: false,
            multiplexer: None,
        }
    }

    /// Handle the configuration commands shared by all sensor types.
    fn apply_command(&mut self, command: &Command) -> Result<()> {
        match &command.kind {
            CommandKind::SetEnabled(enabled) => {
                self.enabled = *enabled;
            }
            CommandKind::SetSensorHwType(hw_type) => {
                self.hw_type = Some(*hw_type);
            }
            CommandKind::SetHwPins(pins) => {
                self.hw_pins = pins.clone();
            }
            CommandKind::SetSendingMode(mode) => {
                self.sending_mode = *mode;
            }
            CommandKind::SetInvertEnabled(inverted) => {
                self.invert = *inverted;
            }
            CommandKind::SetSendingDeltaTicks(ticks) => {
                if *ticks > 0 {
                    self.delta_ticks = *ticks;
                } else {
                    self.delta_ticks = 1;
                    return Err(Error::InvalidValue);
                }
            }
            CommandKind::SetMultiplexed(mux) => {
                self.multiplexer = Some(*mux);
            }
            CommandKind::SetSendTimestampEnabled(enabled) => {
                self.send_timestamp = *enabled;
            }
            CommandKind::SetFastMode(enabled) => {
                self.fast_mode = *enabled;
            }
            _ => return Err(Error::UnhandledCommand),
        }
        Ok(())
    }

    fn emit_config_commands(&self, out: &mut Vec<Command>) {
        out.push(factory::set_sensor_type(self.index, self.sensor_type));
        if let Some(hw_type) = self.hw_type {
            out.push(factory::set_sensor_hw_type(self.index, hw_type));
        }
        out.push(factory::set_hw_pins(self.index, self.hw_pins.clone()));
        out.push(factory::set_enabled(self.index, self.enabled));
        out.push(factory::set_sending_mode(self.index, self.sending_mode));
        out.push(factory::set_sending_delta_ticks(self.index, self.delta_ticks));
        out.push(factory::set_invert_enabled(self.index, self.invert));
        out.push(factory::set_send_timestamp_enabled(self.index, self.send_timestamp));
        out.push(factory::set_fast_mode(self.index, self.fast_mode));
        if let Some(mux) = self.multiplexer {
            out.push(factory::set_multiplexed(self.index, mux.id, mux.pin));
        }
    }

    fn output_timestamp(&self, value: &Value) -> u32 {
        if self.send_timestamp {
            value.timestamp
        } else {
            0
        }
    }
}

// ============================================================================
// Digital
// ============================================================================

#[derive(Debug)]
pub struct DigitalMapper {
    core: MapperCore,
}

impl DigitalMapper {
    fn new(sensor_type: SensorType, index: usize) -> Self {
        Self { core: MapperCore::new(sensor_type, index) }
    }

    fn apply_command(&mut self, command: &Command) -> Result<()> {
        match &command.kind {
            // Set internally when the mapper is created, nothing to do.
            CommandKind::SetSensorType(_) => Ok(()),
            _ => self.core.apply_command(command),
        }
    }

    fn process(&mut self, value: &Value, backend: &mut dyn OutputBackend) {
        if !self.core.enabled {
            return;
        }
        let digital = match value.payload {
            ValuePayload::Digital(v) => v,
            ValuePayload::Analog(v) => v > 0,
            _ => return,
        };
        let mut out = if digital { 1.0 } else { 0.0 };
        if self.core.invert {
            out = 1.0 - out;
        }
        // No change detection on digital pins: every enabled sample emits.
        let transformed =
            factory::output_value(self.core.index, out, self.core.output_timestamp(value));
        backend.send(&transformed, value);
    }

    fn process_set_value(&self, value: &Value) -> Option<Command> {
        if !self.core.enabled {
            return None;
        }
        let mut out = match value.payload {
            ValuePayload::IntegerSet(v) => v > 0,
            ValuePayload::FloatSet(v) => v > 0.5,
            _ => return None,
        };
        if self.core.invert {
            out = !out;
        }
        Some(factory::set_digital_output_value(value.index, out))
    }
}

// ============================================================================
// Analog
// ============================================================================

#[derive(Debug)]
pub struct AnalogMapper {
    core: MapperCore,
    adc_bit_resolution: i32,
    max_allowed_input: i32,
    filter_time_constant: f32,
    slider_threshold: i32,
    range_low: i32,
    range_high: i32,
}

impl AnalogMapper {
    fn new(index: usize) -> Self {
        Self {
            core: MapperCore::new(SensorType::AnalogInput, index),
            adc_bit_resolution: DEFAULT_ADC_BIT_RESOLUTION,
            max_allowed_input: (1 << DEFAULT_ADC_BIT_RESOLUTION) - 1,
            filter_time_constant: DEFAULT_FILTER_TIME_CONSTANT,
            slider_threshold: 0,
            range_low: 0,
            range_high: (1 << DEFAULT_ADC_BIT_RESOLUTION) - 1,
        }
    }

    fn apply_command(&mut self, command: &Command) -> Result<()> {
        match &command.kind {
            CommandKind::SetSensorType(_) => Ok(()),
            CommandKind::SetAdcBitResolution(bits) => self.set_adc_bit_resolution(*bits),
            CommandKind::SetAdcFilterTimeConstant(tc) => self.set_filter_time_constant(*tc),
            CommandKind::SetSliderThreshold(threshold) => self.set_slider_threshold(*threshold),
            CommandKind::SetInputScaleRangeLow(low) => {
                self.set_input_scale_range_low(low.round() as i32)
            }
            CommandKind::SetInputScaleRangeHigh(high) => {
                self.set_input_scale_range_high(high.round() as i32)
            }
            _ => self.core.apply_command(command),
        }
    }

    fn emit_config_commands(&self, out: &mut Vec<Command>) {
        self.core.emit_config_commands(out);
        out.push(factory::set_adc_bit_resolution(self.core.index, self.adc_bit_resolution));
        out.push(factory::set_adc_filter_time_constant(
            self.core.index,
            self.filter_time_constant,
        ));
        out.push(factory::set_slider_threshold(self.core.index, self.slider_threshold));
        out.push(factory::set_input_scale_range_low(self.core.index, self.range_low as f32));
        out.push(factory::set_input_scale_range_high(self.core.index, self.range_high as f32));
    }

    fn process(&mut self, value: &Value, backend: &mut dyn OutputBackend) {
        if !self.core.enabled {
            return;
        }
        let ValuePayload::Analog(raw) = value.payload else {
            return;
        };
        let clipped = clip(raw, self.range_low, self.range_high);
        let mut out = (clipped - self.range_low) as f32 / (self.range_high - self.range_low) as f32;
        if self.core.invert {
            out = 1.0 - out;
        }
        if self.core.sending_mode == SendingMode::OnValueChanged
            && (out - self.core.previous_value).abs() > PREVIOUS_VALUE_THRESHOLD
        {
            let transformed =
                factory::output_value(self.core.index, out, self.core.output_timestamp(value));
            backend.send(&transformed, value);
            self.core.previous_value = out;
        }
    }

    fn process_set_value(&self, value: &Value) -> Option<Command> {
        if !self.core.enabled {
            return None;
        }
        let ValuePayload::FloatSet(requested) = value.payload else {
            return None;
        };
        let mut out = clip(requested, 0.0, 1.0);
        if self.core.invert {
            out = 1.0 - out;
        }
        let scaled = out * (self.range_high - self.range_low) as f32 + self.range_low as f32;
        Some(factory::set_range_output_value(value.index, scaled.round() as i32))
    }

    fn set_adc_bit_resolution(&mut self, bits: i32) -> Result<()> {
        if !(1..=MAX_ADC_BIT_RESOLUTION).contains(&bits) {
            return Err(Error::InvalidValue);
        }
        self.adc_bit_resolution = bits;
        self.max_allowed_input = (1 << bits) - 1;
        self.range_low = self.range_low.min(self.max_allowed_input);
        self.range_high = self.range_high.min(self.max_allowed_input);
        Ok(())
    }

    fn set_filter_time_constant(&mut self, time_constant: f32) -> Result<()> {
        if time_constant <= 0.0 {
            return Err(Error::InvalidValue);
        }
        self.filter_time_constant = time_constant;
        Ok(())
    }

    fn set_slider_threshold(&mut self, threshold: i32) -> Result<()> {
        if threshold < 0 || threshold > self.max_allowed_input - 1 {
            return Err(Error::InvalidValue);
        }
        self.slider_threshold = threshold;
        Ok(())
    }

    fn set_input_scale_range_low(&mut self, low: i32) -> Result<()> {
        if low < 0 || low > self.max_allowed_input - 1 {
            return Err(Error::InvalidRange);
        }
        self.range_low = low;
        if self.range_high <= self.range_low {
            self.range_high = self.range_low + 1;
            return Err(Error::ClipWarning);
        }
        Ok(())
    }

    fn set_input_scale_range_high(&mut self, high: i32) -> Result<()> {
        if high > self.max_allowed_input - 1 {
            return Err(Error::InvalidRange);
        }
        self.range_high = high;
        if self.range_high <= self.range_low {
            self.range_high = self.range_low + 1;
            return Err(Error::ClipWarning);
        }
        Ok(())
    }
}

// ============================================================================
// Range
// ============================================================================

#[derive(Debug)]
pub struct RangeMapper {
    core: MapperCore,
    range_low: i32,
    range_high: i32,
    previous_int_value: i32,
}

impl RangeMapper {
    fn new(index: usize) -> Self {
        Self {
            core: MapperCore::new(SensorType::RangeInput, index),
            range_low: 0,
            range_high: 100,
            previous_int_value: 0,
        }
    }

    fn apply_command(&mut self, command: &Command) -> Result<()> {
        match &command.kind {
            CommandKind::SetSensorType(_) => Ok(()),
            CommandKind::SetInputScaleRangeLow(low) => {
                self.range_low = low.round() as i32;
                self.reorder_range()
            }
            CommandKind::SetInputScaleRangeHigh(high) => {
                self.range_high = high.round() as i32;
                self.reorder_range()
            }
            _ => self.core.apply_command(command),
        }
    }

    fn reorder_range(&mut self) -> Result<()> {
        if self.range_high <= self.range_low {
            self.range_high = self.range_low + 1;
            return Err(Error::ClipWarning);
        }
        Ok(())
    }

    fn emit_config_commands(&self, out: &mut Vec<Command>) {
        self.core.emit_config_commands(out);
        out.push(factory::set_input_scale_range_low(self.core.index, self.range_low as f32));
        out.push(factory::set_input_scale_range_high(self.core.index, self.range_high as f32));
    }

    fn process(&mut self, value: &Value, backend: &mut dyn OutputBackend) {
        if !self.core.enabled {
            return;
        }
        let ValuePayload::Analog(raw) = value.payload else {
            return;
        };
        let mut out = clip(raw, self.range_low, self.range_high);
        if self.core.invert {
            out = self.range_high - out + self.range_low;
        }
        if out != self.previous_int_value {
            let transformed = factory::output_value(
                self.core.index,
                out as f32,
                self.core.output_timestamp(value),
            );
            backend.send(&transformed, value);
            self.previous_int_value = out;
        }
    }

    fn process_set_value(&self, value: &Value) -> Option<Command> {
        if !self.core.enabled {
            return None;
        }
        let requested = match value.payload {
            ValuePayload::IntegerSet(v) => v,
            ValuePayload::FloatSet(v) => v.round() as i32,
            _ => return None,
        };
        let mut out = clip(requested, self.range_low, self.range_high);
        if self.core.invert {
            out = self.range_high - out + self.range_low;
        }
        Some(factory::set_range_output_value(value.index, out))
    }
}

// ============================================================================
// Continuous
// ============================================================================

#[derive(Debug)]
pub struct ContinuousMapper {
    core: MapperCore,
    range_low: f32,
    range_high: f32,
}

impl ContinuousMapper {
    fn new(index: usize) -> Self {
        Self {
            core: MapperCore::new(SensorType::ContinuousInput, index),
            range_low: -std::f32::consts::PI,
            range_high: std::f32::consts::PI,
        }
    }

    fn apply_command(&mut self, command: &Command) -> Result<()> {
        match &command.kind {
            CommandKind::SetSensorType(_) => Ok(()),
            CommandKind::SetInputScaleRangeLow(low) => {
                self.range_low = *low;
                self.reorder_range()
            }
            CommandKind::SetInputScaleRangeHigh(high) => {
                self.range_high = *high;
                self.reorder_range()
            }
            _ => self.core.apply_command(command),
        }
    }

    fn reorder_range(&mut self) -> Result<()> {
        if self.range_high <= self.range_low {
            self.range_low = self.range_high - 1.0;
            return Err(Error::ClipWarning);
        }
        Ok(())
    }

    fn emit_config_commands(&self, out: &mut Vec<Command>) {
        self.core.emit_config_commands(out);
        out.push(factory::set_input_scale_range_low(self.core.index, self.range_low));
        out.push(factory::set_input_scale_range_high(self.core.index, self.range_high));
    }

    fn process(&mut self, value: &Value, backend: &mut dyn OutputBackend) {
        if !self.core.enabled {
            return;
        }
        let raw = match value.payload {
            ValuePayload::Continuous(v) => v,
            ValuePayload::Imu(v) => v,
            _ => return,
        };
        let clipped = clip(raw, self.range_low, self.range_high);
        let mut out = (clipped - self.range_low) / (self.range_high - self.range_low);
        if self.core.invert {
            out = 1.0 - out;
        }
        if (out - self.core.previous_value).abs() > PREVIOUS_VALUE_THRESHOLD {
            let transformed =
                factory::output_value(self.core.index, out, self.core.output_timestamp(value));
            backend.send(&transformed, value);
            self.core.previous_value = out;
        }
    }

    fn process_set_value(&self, value: &Value) -> Option<Command> {
        if !self.core.enabled {
            return None;
        }
        let ValuePayload::FloatSet(requested) = value.payload else {
            return None;
        };
        let mut out = clip(requested, 0.0, 1.0);
        if self.core.invert {
            out = 1.0 - out;
        }
        let scaled = out * (self.range_high - self.range_low) + self.range_low;
        Some(factory::set_continuous_output_value(value.index, scaled))
    }
}

// ============================================================================
// Variant dispatch
// ============================================================================

/// A sensor mapper of any kind.
#[derive(Debug)]
pub enum SensorMapper {
    Digital(DigitalMapper),
    Analog(AnalogMapper),
    Range(RangeMapper),
    Continuous(ContinuousMapper),
}

impl SensorMapper {
    /// Instantiate the variant matching a sensor type.
    #[must_use]
    pub fn new(sensor_type: SensorType, index: usize) -> Self {
        match sensor_type {
            SensorType::DigitalInput | SensorType::DigitalOutput => {
                SensorMapper::Digital(DigitalMapper::new(sensor_type, index))
            }
            SensorType::AnalogInput => SensorMapper::Analog(AnalogMapper::new(index)),
            SensorType::RangeInput => SensorMapper::Range(RangeMapper::new(index)),
            SensorType::ContinuousInput => {
                SensorMapper::Continuous(ContinuousMapper::new(index))
            }
        }
    }

    pub fn apply_command(&mut self, command: &Command) -> Result<()> {
        match self {
            SensorMapper::Digital(m) => m.apply_command(command),
            SensorMapper::Analog(m) => m.apply_command(command),
            SensorMapper::Range(m) => m.apply_command(command),
            SensorMapper::Continuous(m) => m.apply_command(command),
        }
    }

    /// Snapshot of the mapper's configuration as a command sequence, used
    /// to re-push state to a newly attached backend or peer.
    pub fn emit_config_commands(&self, out: &mut Vec<Command>) {
        match self {
            SensorMapper::Digital(m) => m.core.emit_config_commands(out),
            SensorMapper::Analog(m) => m.emit_config_commands(out),
            SensorMapper::Range(m) => m.emit_config_commands(out),
            SensorMapper::Continuous(m) => m.emit_config_commands(out),
        }
    }

    pub fn process(&mut self, value: &Value, backend: &mut dyn OutputBackend) {
        match self {
            SensorMapper::Digital(m) => m.process(value, backend),
            SensorMapper::Analog(m) => m.process(value, backend),
            SensorMapper::Range(m) => m.process(value, backend),
            SensorMapper::Continuous(m) => m.process(value, backend),
        }
    }

    pub fn process_set_value(&self, value: &Value) -> Option<Command> {
        match self {
            SensorMapper::Digital(m) => m.process_set_value(value),
            SensorMapper::Analog(m) => m.process_set_value(value),
            SensorMapper::Range(m) => m.process_set_value(value),
            SensorMapper::Continuous(m) => m.process_set_value(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collects everything a mapper emits.
    #[derive(Default)]
    struct RecordingBackend {
        sent: Vec<(Value, Value)>,
    }

    impl OutputBackend for RecordingBackend {
        fn send(&mut self, transformed: &Value, raw: &Value) {
            self.sent.push((*transformed, *raw));
        }

        fn apply_command(&mut self, _command: &Command) -> Result<()> {
            Ok(())
        }
    }

    fn enabled_mapper(sensor_type: SensorType, index: usize) -> SensorMapper {
        let mut mapper = SensorMapper::new(sensor_type, index);
        mapper
            .apply_command(&factory::set_enabled(index, true))
            .expect("enable");
        mapper
    }

    fn output_of(backend: &RecordingBackend, n: usize) -> f32 {
        match backend.sent[n].0.payload {
            ValuePayload::Output(v) => v,
            other => panic!("expected output payload, got {:?}", other),
        }
    }

    #[test]
    fn test_digital_mapper_emits_every_sample() {
        let mut mapper = enabled_mapper(SensorType::DigitalInput, 1);
        let mut backend = RecordingBackend::default();
        mapper.process(&factory::digital_value(1, true, 0), &mut backend);
        mapper.process(&factory::digital_value(1, true, 0), &mut backend);
        assert_eq!(backend.sent.len(), 2, "digital pins have no change detection");
        assert_eq!(output_of(&backend, 0), 1.0);
    }

    #[test]
    fn test_digital_mapper_coerces_analog_and_inverts() {
        let mut mapper = enabled_mapper(SensorType::DigitalInput, 1);
        mapper
            .apply_command(&factory::set_invert_enabled(1, true))
            .expect("invert");
        let mut backend = RecordingBackend::default();
        mapper.process(&factory::analog_value(1, 512, 0), &mut backend);
        mapper.process(&factory::analog_value(1, 0, 0), &mut backend);
        assert_eq!(output_of(&backend, 0), 0.0, "high input inverted to 0");
        assert_eq!(output_of(&backend, 1), 1.0, "low input inverted to 1");
    }

    #[test]
    fn test_disabled_mapper_is_silent() {
        let mut mapper = SensorMapper::new(SensorType::DigitalInput, 1);
        let mut backend = RecordingBackend::default();
        mapper.process(&factory::digital_value(1, true, 0), &mut backend);
        assert!(backend.sent.is_empty());
    }

    #[test]
    fn test_analog_pipeline_normalises_and_deduplicates() {
        // Seed scenario: 12 bit resolution, default range [0, 4095],
        // on-value-changed mode.
        let mut mapper = enabled_mapper(SensorType::AnalogInput, 5);
        mapper
            .apply_command(&factory::set_sending_mode(5, SendingMode::OnValueChanged))
            .expect("mode");
        let mut backend = RecordingBackend::default();

        mapper.process(&factory::analog_value(5, 2048, 0), &mut backend);
        assert_eq!(backend.sent.len(), 1);
        assert!((output_of(&backend, 0) - 0.5001).abs() < 1e-3);

        mapper.process(&factory::analog_value(5, 2048, 0), &mut backend);
        assert_eq!(backend.sent.len(), 1, "identical sample must not re-emit");

        mapper.process(&factory::analog_value(5, 4095, 0), &mut backend);
        assert_eq!(backend.sent.len(), 2);
        assert_eq!(output_of(&backend, 1), 1.0);
    }

    #[test]
    fn test_analog_output_is_always_normalised() {
        let mut mapper = enabled_mapper(SensorType::AnalogInput, 5);
        mapper
            .apply_command(&factory::set_sending_mode(5, SendingMode::OnValueChanged))
            .expect("mode");
        let mut backend = RecordingBackend::default();
        for raw in [-100, 0, 17, 4095, 10_000] {
            mapper.process(&factory::analog_value(5, raw, 0), &mut backend);
        }
        for n in 0..backend.sent.len() {
            let out = output_of(&backend, n);
            assert!((0.0..=1.0).contains(&out), "output {} escaped [0, 1]", out);
        }
    }

    #[test]
    fn test_analog_invert_mirrors_output() {
        let mut mapper = enabled_mapper(SensorType::AnalogInput, 5);
        mapper
            .apply_command(&factory::set_sending_mode(5, SendingMode::OnValueChanged))
            .expect("mode");
        mapper
            .apply_command(&factory::set_invert_enabled(5, true))
            .expect("invert");
        let mut backend = RecordingBackend::default();
        mapper.process(&factory::analog_value(5, 4095, 0), &mut backend);
        assert_eq!(output_of(&backend, 0), 0.0);
    }

    #[test]
    fn test_analog_mapper_without_value_changed_mode_is_silent() {
        let mut mapper = enabled_mapper(SensorType::AnalogInput, 5);
        mapper
            .apply_command(&factory::set_sending_mode(5, SendingMode::Continuous))
            .expect("mode");
        let mut backend = RecordingBackend::default();
        mapper.process(&factory::analog_value(5, 1000, 0), &mut backend);
        assert!(backend.sent.is_empty(), "analog emission is gated on on-value-changed");
    }

    #[test]
    fn test_analog_bit_resolution_bounds() {
        let mut mapper = SensorMapper::new(SensorType::AnalogInput, 5);
        assert!(matches!(
            mapper.apply_command(&factory::set_adc_bit_resolution(5, 0)),
            Err(Error::InvalidValue)
        ));
        assert!(matches!(
            mapper.apply_command(&factory::set_adc_bit_resolution(5, 17)),
            Err(Error::InvalidValue)
        ));
        assert!(mapper.apply_command(&factory::set_adc_bit_resolution(5, 10)).is_ok());
    }

    #[test]
    fn test_analog_range_clamped_by_resolution_change() {
        let mut mapper = enabled_mapper(SensorType::AnalogInput, 5);
        mapper
            .apply_command(&factory::set_sending_mode(5, SendingMode::OnValueChanged))
            .expect("mode");
        // Dropping to 8 bits clamps the default [0, 4095] range to [0, 255].
        mapper.apply_command(&factory::set_adc_bit_resolution(5, 8)).expect("resolution");
        let mut backend = RecordingBackend::default();
        mapper.process(&factory::analog_value(5, 255, 0), &mut backend);
        assert_eq!(output_of(&backend, 0), 1.0);
    }

    #[test]
    fn test_analog_set_value_scales_back_to_device_domain() {
        let mapper = enabled_mapper(SensorType::AnalogInput, 5);
        let command = mapper
            .process_set_value(&factory::float_set_value(5, 0.5, 0))
            .expect("setter must produce a command");
        assert_eq!(command.kind, CommandKind::SetRangeOutputValue(2048));
    }

    #[test]
    fn test_analog_set_value_clips_and_inverts() {
        let mut mapper = enabled_mapper(SensorType::AnalogInput, 5);
        mapper
            .apply_command(&factory::set_invert_enabled(5, true))
            .expect("invert");
        let command = mapper
            .process_set_value(&factory::float_set_value(5, 2.0, 0))
            .expect("setter");
        // Clipped to 1.0, inverted to 0.0, scaled to range_low.
        assert_eq!(command.kind, CommandKind::SetRangeOutputValue(0));
    }

    #[test]
    fn test_range_clip_and_invert() {
        // Seed scenario: range [10, 20], invert on.
        let mut mapper = enabled_mapper(SensorType::RangeInput, 2);
        mapper
            .apply_command(&factory::set_input_scale_range_low(2, 10.0))
            .expect("low");
        mapper
            .apply_command(&factory::set_input_scale_range_high(2, 20.0))
            .expect("high");
        mapper
            .apply_command(&factory::set_invert_enabled(2, true))
            .expect("invert");
        let mut backend = RecordingBackend::default();

        mapper.process(&factory::analog_value(2, 25, 0), &mut backend);
        assert_eq!(output_of(&backend, 0), 10.0, "25 clips to 20, inverts to 10");

        mapper.process(&factory::analog_value(2, 5, 0), &mut backend);
        assert_eq!(output_of(&backend, 1), 20.0, "5 clips to 10, inverts to 20");
    }

    #[test]
    fn test_range_change_detection_is_exact() {
        let mut mapper = enabled_mapper(SensorType::RangeInput, 2);
        let mut backend = RecordingBackend::default();
        mapper.process(&factory::analog_value(2, 42, 0), &mut backend);
        mapper.process(&factory::analog_value(2, 42, 0), &mut backend);
        mapper.process(&factory::analog_value(2, 43, 0), &mut backend);
        assert_eq!(backend.sent.len(), 2);
    }

    #[test]
    fn test_range_degenerate_range_is_clamped() {
        let mut mapper = SensorMapper::new(SensorType::RangeInput, 2);
        mapper
            .apply_command(&factory::set_input_scale_range_low(2, 50.0))
            .expect("low");
        assert!(matches!(
            mapper.apply_command(&factory::set_input_scale_range_high(2, 30.0)),
            Err(Error::ClipWarning)
        ));
    }

    #[test]
    fn test_continuous_default_range_is_one_turn() {
        let mut mapper = enabled_mapper(SensorType::ContinuousInput, 3);
        let mut backend = RecordingBackend::default();
        mapper.process(&factory::continuous_value(3, std::f32::consts::PI, 0), &mut backend);
        assert_eq!(output_of(&backend, 0), 1.0);
    }

    #[test]
    fn test_continuous_change_detection_threshold() {
        let mut mapper = enabled_mapper(SensorType::ContinuousInput, 3);
        let mut backend = RecordingBackend::default();
        mapper.process(&factory::continuous_value(3, 1.0, 0), &mut backend);
        mapper.process(&factory::continuous_value(3, 1.0, 0), &mut backend);
        assert_eq!(backend.sent.len(), 1, "identical inputs emit at most once");
    }

    #[test]
    fn test_continuous_accepts_imu_samples() {
        let mut mapper = enabled_mapper(SensorType::ContinuousInput, 3);
        let mut backend = RecordingBackend::default();
        mapper.process(&factory::imu_value(3, 0.5, 0), &mut backend);
        assert_eq!(backend.sent.len(), 1);
    }

    #[test]
    fn test_continuous_set_value_maps_to_range() {
        let mapper = enabled_mapper(SensorType::ContinuousInput, 3);
        let command = mapper
            .process_set_value(&factory::float_set_value(3, 1.0, 0))
            .expect("setter");
        match command.kind {
            CommandKind::SetContinuousOutputValue(v) => {
                assert!((v - std::f32::consts::PI).abs() < 1e-5);
            }
            other => panic!("expected continuous output, got {:?}", other),
        }
    }

    #[test]
    fn test_delta_ticks_zero_is_clamped_and_flagged() {
        let mut mapper = SensorMapper::new(SensorType::AnalogInput, 5);
        assert!(matches!(
            mapper.apply_command(&factory::set_sending_delta_ticks(5, 0)),
            Err(Error::InvalidValue)
        ));
        // The mapper stays usable with the clamped value.
        let mut out = Vec::new();
        mapper.emit_config_commands(&mut out);
        assert!(out.contains(&factory::set_sending_delta_ticks(5, 1)));
    }

    #[test]
    fn test_send_timestamp_propagates_to_output() {
        let mut mapper = enabled_mapper(SensorType::DigitalInput, 1);
        mapper
            .apply_command(&factory::set_send_timestamp_enabled(1, true))
            .expect("timestamps");
        let mut backend = RecordingBackend::default();
        mapper.process(&factory::digital_value(1, true, 1234), &mut backend);
        assert_eq!(backend.sent[0].0.timestamp, 1234);
    }

    #[test]
    fn test_config_snapshot_covers_kind_specific_state() {
        let mut mapper = SensorMapper::new(SensorType::AnalogInput, 5);
        mapper.apply_command(&factory::set_enabled(5, true)).expect("enable");
        let mut out = Vec::new();
        mapper.emit_config_commands(&mut out);
        assert_eq!(out[0], factory::set_sensor_type(5, SensorType::AnalogInput));
        assert!(out.contains(&factory::set_adc_bit_resolution(5, 12)));
        assert!(out.contains(&factory::set_input_scale_range_high(5, 4095.0)));
    }

    #[test]
    fn test_unknown_command_is_surfaced() {
        let mut mapper = SensorMapper::new(SensorType::DigitalInput, 1);
        assert!(matches!(
            mapper.apply_command(&factory::set_adc_bit_resolution(1, 12)),
            Err(Error::UnhandledCommand)
        ));
    }
}
