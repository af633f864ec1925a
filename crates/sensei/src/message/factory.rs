// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Constructors for every concrete message variant.
//!
//! Kept as free functions so call sites read like the operation they
//! perform. All constructors are stateless.

use super::{
    Command, CommandKind, ImuIndex, LinkError, LinkErrorKind, Message, MultiplexerConfig,
    SendingMode, SensorHwType, SensorType, Value, ValuePayload,
};

// ============================================================================
// Values
// ============================================================================

#[must_use]
pub fn analog_value(index: usize, value: i32, timestamp: u32) -> Value {
    Value { index, payload: ValuePayload::Analog(value), timestamp }
}

#[must_use]
pub fn digital_value(index: usize, value: bool, timestamp: u32) -> Value {
    Value { index, payload: ValuePayload::Digital(value), timestamp }
}

#[must_use]
pub fn continuous_value(index: usize, value: f32, timestamp: u32) -> Value {
    Value { index, payload: ValuePayload::Continuous(value), timestamp }
}

#[must_use]
pub fn imu_value(index: usize, value: f32, timestamp: u32) -> Value {
    Value { index, payload: ValuePayload::Imu(value), timestamp }
}

#[must_use]
pub fn output_value(index: usize, value: f32, timestamp: u32) -> Value {
    Value { index, payload: ValuePayload::Output(value), timestamp }
}

#[must_use]
pub fn integer_set_value(index: usize, value: i32, timestamp: u32) -> Value {
    Value { index, payload: ValuePayload::IntegerSet(value), timestamp }
}

#[must_use]
pub fn float_set_value(index: usize, value: f32, timestamp: u32) -> Value {
    Value { index, payload: ValuePayload::FloatSet(value), timestamp }
}

// ============================================================================
// Commands
// ============================================================================

#[must_use]
pub fn command(index: usize, kind: CommandKind) -> Command {
    Command { index, kind, timestamp: 0 }
}

#[must_use]
pub fn set_sensor_type(index: usize, sensor_type: SensorType) -> Command {
    command(index, CommandKind::SetSensorType(sensor_type))
}

#[must_use]
pub fn set_sensor_hw_type(index: usize, hw_type: SensorHwType) -> Command {
    command(index, CommandKind::SetSensorHwType(hw_type))
}

#[must_use]
pub fn set_sensor_name(index: usize, name: &str) -> Command {
    command(index, CommandKind::SetSensorName(name.to_string()))
}

#[must_use]
pub fn set_virtual_pin(index: usize, parameter: ImuIndex) -> Command {
    command(index, CommandKind::SetVirtualPin(parameter))
}

#[must_use]
pub fn set_hw_pin(index: usize, pin: i32) -> Command {
    command(index, CommandKind::SetHwPin(pin))
}

#[must_use]
pub fn set_hw_pins(index: usize, pins: Vec<i32>) -> Command {
    command(index, CommandKind::SetHwPins(pins))
}

#[must_use]
pub fn set_multiplexed(index: usize, mux_id: i32, mux_pin: i32) -> Command {
    command(
        index,
        CommandKind::SetMultiplexed(MultiplexerConfig { id: mux_id, pin: mux_pin }),
    )
}

#[must_use]
pub fn set_enabled(index: usize, enabled: bool) -> Command {
    command(index, CommandKind::SetEnabled(enabled))
}

#[must_use]
pub fn set_sending_mode(index: usize, mode: SendingMode) -> Command {
    command(index, CommandKind::SetSendingMode(mode))
}

#[must_use]
pub fn set_sending_delta_ticks(index: usize, ticks: i32) -> Command {
    command(index, CommandKind::SetSendingDeltaTicks(ticks))
}

#[must_use]
pub fn set_adc_bit_resolution(index: usize, bits: i32) -> Command {
    command(index, CommandKind::SetAdcBitResolution(bits))
}

#[must_use]
pub fn set_adc_filter_time_constant(index: usize, time_constant: f32) -> Command {
    command(index, CommandKind::SetAdcFilterTimeConstant(time_constant))
}

#[must_use]
pub fn set_slider_threshold(index: usize, threshold: i32) -> Command {
    command(index, CommandKind::SetSliderThreshold(threshold))
}

#[must_use]
pub fn set_lowpass_cutoff(index: usize, cutoff: f32) -> Command {
    command(index, CommandKind::SetLowpassCutoff(cutoff))
}

#[must_use]
pub fn set_lowpass_filter_order(index: usize, order: i32) -> Command {
    command(index, CommandKind::SetLowpassFilterOrder(order))
}

#[must_use]
pub fn set_invert_enabled(index: usize, inverted: bool) -> Command {
    command(index, CommandKind::SetInvertEnabled(inverted))
}

#[must_use]
pub fn set_send_timestamp_enabled(index: usize, enabled: bool) -> Command {
    command(index, CommandKind::SetSendTimestampEnabled(enabled))
}

#[must_use]
pub fn set_fast_mode(index: usize, enabled: bool) -> Command {
    command(index, CommandKind::SetFastMode(enabled))
}

#[must_use]
pub fn set_input_scale_range_low(index: usize, low: f32) -> Command {
    command(index, CommandKind::SetInputScaleRangeLow(low))
}

#[must_use]
pub fn set_input_scale_range_high(index: usize, high: f32) -> Command {
    command(index, CommandKind::SetInputScaleRangeHigh(high))
}

#[must_use]
pub fn set_digital_output_value(index: usize, value: bool) -> Command {
    command(index, CommandKind::SetDigitalOutputValue(value))
}

#[must_use]
pub fn set_continuous_output_value(index: usize, value: f32) -> Command {
    command(index, CommandKind::SetContinuousOutputValue(value))
}

#[must_use]
pub fn set_range_output_value(index: usize, value: i32) -> Command {
    command(index, CommandKind::SetRangeOutputValue(value))
}

#[must_use]
pub fn enable_sending_packets(enabled: bool) -> Command {
    command(0, CommandKind::EnableSendingPackets(enabled))
}

// Output backend commands. `index` is the backend id.

#[must_use]
pub fn set_send_output_enabled(index: usize, enabled: bool) -> Command {
    command(index, CommandKind::SetSendOutputEnabled(enabled))
}

#[must_use]
pub fn set_send_raw_input_enabled(index: usize, enabled: bool) -> Command {
    command(index, CommandKind::SetSendRawInputEnabled(enabled))
}

#[must_use]
pub fn set_osc_output_host(index: usize, host: &str) -> Command {
    command(index, CommandKind::SetOscOutputHost(host.to_string()))
}

#[must_use]
pub fn set_osc_output_port(index: usize, port: i64) -> Command {
    command(index, CommandKind::SetOscOutputPort(port))
}

#[must_use]
pub fn set_osc_output_base_path(index: usize, path: &str) -> Command {
    command(index, CommandKind::SetOscOutputBasePath(path.to_string()))
}

#[must_use]
pub fn set_osc_output_raw_path(index: usize, path: &str) -> Command {
    command(index, CommandKind::SetOscOutputRawPath(path.to_string()))
}

#[must_use]
pub fn set_osc_input_port(port: i64) -> Command {
    command(0, CommandKind::SetOscInputPort(port))
}

// IMU commands. The IMU is a singleton, so the index is always 0.

#[must_use]
pub fn set_imu_enabled(enabled: bool) -> Command {
    command(0, CommandKind::SetImuEnabled(enabled))
}

#[must_use]
pub fn set_imu_filter_mode(mode: i32) -> Command {
    command(0, CommandKind::SetImuFilterMode(mode))
}

#[must_use]
pub fn set_imu_acc_range_max(range: i32) -> Command {
    command(0, CommandKind::SetImuAccRangeMax(range))
}

#[must_use]
pub fn set_imu_gyro_range_max(range: i32) -> Command {
    command(0, CommandKind::SetImuGyroRangeMax(range))
}

#[must_use]
pub fn set_imu_compass_range_max(range: f32) -> Command {
    command(0, CommandKind::SetImuCompassRangeMax(range))
}

#[must_use]
pub fn set_imu_compass_enabled(enabled: bool) -> Command {
    command(0, CommandKind::SetImuCompassEnabled(enabled))
}

#[must_use]
pub fn set_imu_sending_mode(mode: SendingMode) -> Command {
    command(0, CommandKind::SetImuSendingMode(mode))
}

#[must_use]
pub fn set_imu_delta_ticks(ticks: i32) -> Command {
    command(0, CommandKind::SetImuDeltaTicks(ticks))
}

#[must_use]
pub fn set_imu_data_mode(mode: i32) -> Command {
    command(0, CommandKind::SetImuDataMode(mode))
}

#[must_use]
pub fn set_imu_acc_threshold(threshold: f32) -> Command {
    command(0, CommandKind::SetImuAccThreshold(threshold))
}

#[must_use]
pub fn imu_calibrate() -> Command {
    command(0, CommandKind::ImuCalibrate)
}

// ============================================================================
// Errors
// ============================================================================

#[must_use]
pub fn bad_crc_error(index: usize, timestamp: u32) -> Message {
    Message::Error(LinkError { index, kind: LinkErrorKind::BadCrc, timestamp })
}

#[must_use]
pub fn too_many_timeouts_error(index: usize, timestamp: u32) -> Message {
    Message::Error(LinkError { index, kind: LinkErrorKind::TooManyTimeouts, timestamp })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_constructors_carry_the_envelope() {
        let v = analog_value(3, 2048, 42);
        assert_eq!(v.index, 3);
        assert_eq!(v.timestamp, 42);
        assert_eq!(v.payload, ValuePayload::Analog(2048));
    }

    #[test]
    fn test_system_commands_use_index_zero() {
        assert_eq!(enable_sending_packets(true).index, 0);
        assert_eq!(set_imu_enabled(true).index, 0);
    }

    #[test]
    fn test_error_constructors() {
        let msg = too_many_timeouts_error(7, 0);
        match msg {
            Message::Error(e) => assert_eq!(e.kind, LinkErrorKind::TooManyTimeouts),
            other => panic!("expected error message, got {:?}", other),
        }
    }
}
