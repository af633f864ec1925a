// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Internal command to device packet translation.
//!
//! Pure mapping: one command becomes zero, one or several packets. Commands
//! with no counterpart in the current device protocol (IMU configuration,
//! lowpass parameters, virtual pins) are dropped with a warning.

use crate::message::{Command, CommandKind, SendingMode, SensorHwType};
use crate::protocol::{hw_type, notification_mode, GpioPacket, PacketFactory, CNTRLR_MUTED,
                      CNTRLR_UNMUTED, MAX_PINS_PER_PACKET};

/// Map an internal hardware type onto the device's controller vocabulary.
fn to_device_hw_type(value: SensorHwType) -> Option<u8> {
    match value {
        SensorHwType::DigitalInputPin => Some(hw_type::BINARY_INPUT),
        SensorHwType::DigitalOutputPin => Some(hw_type::BINARY_OUTPUT),
        SensorHwType::AnalogInputPin => Some(hw_type::ANALOG_INPUT),
        SensorHwType::SteppedOutput => Some(hw_type::STEPPED_OUTPUT),
        SensorHwType::Multiplexer => Some(hw_type::MUX_OUTPUT),
        SensorHwType::NWaySwitch => Some(hw_type::N_WAY_SWITCH),
        SensorHwType::Encoder => Some(hw_type::ROTARY_ENCODER),
        SensorHwType::Button => Some(hw_type::BINARY_INPUT),
        SensorHwType::Ribbon
        | SensorHwType::ImuPitch
        | SensorHwType::ImuRoll
        | SensorHwType::ImuYaw => None,
    }
}

/// Map an internal sending mode onto a device notification mode.
///
/// `Off` has no device mapping; silencing relies on the controller mute.
/// The gesture modes are resolved locally by the mapper, so the device is
/// asked for plain value-change notifications.
fn to_device_notification_mode(mode: SendingMode) -> Option<u8> {
    match mode {
        SendingMode::Off => None,
        SendingMode::Continuous => Some(notification_mode::EVERY_CNTRLR_TICK),
        SendingMode::OnValueChanged
        | SendingMode::Toggled
        | SendingMode::OnPress
        | SendingMode::OnRelease => Some(notification_mode::ON_VALUE_CHANGE),
    }
}

/// Translate one command into its device packets.
///
/// Fan-out preserves order: `SET_HW_PINS` splits into payload-ceiling
/// chunks whose concatenation equals the input list.
pub fn translate_command(factory: &PacketFactory, command: &Command) -> Vec<GpioPacket> {
    let controller_id = command.index as u8;
    let mut packets = Vec::new();
    match &command.kind {
        CommandKind::SetSensorHwType(sensor_hw) => match to_device_hw_type(*sensor_hw) {
            Some(device_type) => {
                packets.push(factory.make_add_controller_command(controller_id, device_type));
            }
            None => {
                log::warn!("[LINK] hw type {:?} has no device mapping, dropped", sensor_hw);
            }
        },
        CommandKind::SetHwPin(pin) => {
            match factory.make_add_pins_to_controller_command(controller_id, &[*pin as u8]) {
                Ok(packet) => packets.push(packet),
                Err(e) => log::warn!("[LINK] failed to encode pin: {}", e),
            }
        }
        CommandKind::SetHwPins(pins) => {
            for chunk in pins.chunks(MAX_PINS_PER_PACKET) {
                let device_pins: Vec<u8> = chunk.iter().map(|p| *p as u8).collect();
                match factory.make_add_pins_to_controller_command(controller_id, &device_pins) {
                    Ok(packet) => packets.push(packet),
                    Err(e) => log::warn!("[LINK] failed to encode pin chunk: {}", e),
                }
            }
        }
        CommandKind::SetEnabled(enabled) => {
            let muted = if *enabled { CNTRLR_UNMUTED } else { CNTRLR_MUTED };
            packets.push(factory.make_mute_controller_command(controller_id, muted));
        }
        CommandKind::SetSendingMode(mode) => {
            if let Some(device_mode) = to_device_notification_mode(*mode) {
                packets.push(factory.make_set_notification_mode(controller_id, device_mode));
            }
        }
        CommandKind::SetSendingDeltaTicks(ticks) => {
            packets.push(
                factory.make_set_controller_tick_rate_command(controller_id, *ticks as u16),
            );
        }
        CommandKind::SetAdcBitResolution(bits) => {
            packets.push(factory.make_set_analog_resolution_command(controller_id, *bits as u8));
        }
        CommandKind::SetDigitalOutputValue(value) => {
            packets.push(factory.make_set_value_command(controller_id, u32::from(*value)));
        }
        CommandKind::SetContinuousOutputValue(value) => {
            let scaled = (f64::from(*value) * 256.0).round() as i64;
            packets.push(factory.make_set_value_command(controller_id, scaled as u32));
        }
        CommandKind::SetRangeOutputValue(value) => {
            packets.push(factory.make_set_value_command(controller_id, *value as u32));
        }
        CommandKind::EnableSendingPackets(enabled) => {
            packets.push(if *enabled {
                factory.make_start_system_command()
            } else {
                factory.make_stop_system_command()
            });
        }
        other => {
            log::warn!("[LINK] command {:?} has no device mapping, dropped", other);
        }
    }
    packets
}
