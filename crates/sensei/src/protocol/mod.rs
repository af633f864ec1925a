// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Device wire protocol.
//!
//! The front-end device speaks fixed-size 32-byte datagrams:
//!
//! ```text
//! +---------+----------+-------------------+------------------+---------+
//! | command | reserved | sequence_no (LE)  | payload          | crc (LE)|
//! | u8      | u8       | u32               | 24 bytes         | u16     |
//! +---------+----------+-------------------+------------------+---------+
//! ```
//!
//! The CRC is CRC-16/CCITT-FALSE over the first 30 bytes. All multi-byte
//! numeric fields are little-endian on the wire; byte-order conversion
//! happens here and nowhere else.

pub mod crc;
pub mod factory;

pub use factory::PacketFactory;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Total size of a device packet on the wire.
pub const GPIO_PACKET_SIZE: usize = 32;
/// Size of the payload region.
pub const PAYLOAD_SIZE: usize = 24;
/// Offset of the payload region.
const PAYLOAD_OFFSET: usize = 6;
/// Offset of the trailing CRC.
const CRC_OFFSET: usize = 30;
/// Maximum number of pins carried by a single `ADD_PINS_TO_CONTROLLER`.
pub const MAX_PINS_PER_PACKET: usize = PAYLOAD_SIZE - 2;

// ============================================================================
// Device-side constants
// ============================================================================

/// Controller hardware types understood by the device.
pub mod hw_type {
    pub const BINARY_INPUT: u8 = 0;
    pub const BINARY_OUTPUT: u8 = 1;
    pub const ANALOG_INPUT: u8 = 2;
    pub const STEPPED_OUTPUT: u8 = 3;
    pub const MUX_OUTPUT: u8 = 4;
    pub const N_WAY_SWITCH: u8 = 5;
    pub const ROTARY_ENCODER: u8 = 6;
}

/// Controller notification modes.
pub mod notification_mode {
    pub const ON_VALUE_CHANGE: u8 = 0;
    pub const EVERY_CNTRLR_TICK: u8 = 1;
}

/// Controller mute states.
pub const CNTRLR_UNMUTED: u8 = 0;
/// See [`CNTRLR_UNMUTED`].
pub const CNTRLR_MUTED: u8 = 1;

/// Commands carried in the packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GpioCommand {
    ResetSystem = 1,
    StartSystem = 2,
    StopSystem = 3,
    AddController = 4,
    AddPinsToController = 5,
    MuteController = 6,
    SetNotificationMode = 7,
    SetControllerTickRate = 8,
    SetAnalogResolution = 9,
    SetValue = 10,
    /// Carries a controller value when sent by the device.
    GetValue = 11,
    Ack = 250,
}

impl GpioCommand {
    fn from_u8(byte: u8) -> Option<GpioCommand> {
        match byte {
            1 => Some(GpioCommand::ResetSystem),
            2 => Some(GpioCommand::StartSystem),
            3 => Some(GpioCommand::StopSystem),
            4 => Some(GpioCommand::AddController),
            5 => Some(GpioCommand::AddPinsToController),
            6 => Some(GpioCommand::MuteController),
            7 => Some(GpioCommand::SetNotificationMode),
            8 => Some(GpioCommand::SetControllerTickRate),
            9 => Some(GpioCommand::SetAnalogResolution),
            10 => Some(GpioCommand::SetValue),
            11 => Some(GpioCommand::GetValue),
            250 => Some(GpioCommand::Ack),
            _ => None,
        }
    }
}

/// Human-readable form of the ack status byte.
#[must_use]
pub fn status_to_string(status: u8) -> &'static str {
    match status {
        0 => "ok",
        1 => "invalid command",
        2 => "invalid controller id",
        3 => "invalid parameter",
        4 => "controller busy",
        _ => "unknown error",
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Payload union, discriminated by the packet command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Reset / start / stop carry no payload.
    None,
    AddController { controller_id: u8, hw_type: u8 },
    Pinlist { controller_id: u8, pins: Vec<u8> },
    MuteController { controller_id: u8, muted: u8 },
    NotificationMode { controller_id: u8, mode: u8 },
    TickRate { controller_id: u8, delta_ticks: u16 },
    AnalogResolution { controller_id: u8, resolution: u8 },
    /// Shared by `SET_VALUE` (outgoing) and `GET_VALUE` (incoming).
    Value { controller_id: u8, value: u32 },
    Ack { returned_seq_no: u32, status: u8 },
}

// ============================================================================
// Packet
// ============================================================================

/// A decoded (or to-be-encoded) device packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpioPacket {
    pub command: GpioCommand,
    pub sequence_no: u32,
    pub payload: Payload,
}

impl GpioPacket {
    /// Encode into the fixed wire layout, computing the trailing CRC.
    #[must_use]
    pub fn encode(&self) -> [u8; GPIO_PACKET_SIZE] {
        let mut buf = [0u8; GPIO_PACKET_SIZE];
        buf[0] = self.command as u8;
        LittleEndian::write_u32(&mut buf[2..6], self.sequence_no);
        let payload = &mut buf[PAYLOAD_OFFSET..CRC_OFFSET];
        match &self.payload {
            Payload::None => {}
            Payload::AddController { controller_id, hw_type } => {
                payload[0] = *controller_id;
                payload[1] = *hw_type;
            }
            Payload::Pinlist { controller_id, pins } => {
                payload[0] = *controller_id;
                payload[1] = pins.len() as u8;
                payload[2..2 + pins.len()].copy_from_slice(pins);
            }
            Payload::MuteController { controller_id, muted } => {
                payload[0] = *controller_id;
                payload[1] = *muted;
            }
            Payload::NotificationMode { controller_id, mode } => {
                payload[0] = *controller_id;
                payload[1] = *mode;
            }
            Payload::TickRate { controller_id, delta_ticks } => {
                payload[0] = *controller_id;
                LittleEndian::write_u16(&mut payload[2..4], *delta_ticks);
            }
            Payload::AnalogResolution { controller_id, resolution } => {
                payload[0] = *controller_id;
                payload[1] = *resolution;
            }
            Payload::Value { controller_id, value } => {
                payload[0] = *controller_id;
                LittleEndian::write_u32(&mut payload[2..6], *value);
            }
            Payload::Ack { returned_seq_no, status } => {
                LittleEndian::write_u32(&mut payload[0..4], *returned_seq_no);
                payload[4] = *status;
            }
        }
        let crc = crc::crc16(&buf[..CRC_OFFSET]);
        LittleEndian::write_u16(&mut buf[CRC_OFFSET..], crc);
        buf
    }

    /// Decode a received datagram, verifying size and CRC.
    pub fn decode(buf: &[u8]) -> Result<GpioPacket> {
        if buf.len() < GPIO_PACKET_SIZE {
            return Err(Error::Parsing(format!(
                "device packet too short: {} bytes",
                buf.len()
            )));
        }
        let advertised = LittleEndian::read_u16(&buf[CRC_OFFSET..GPIO_PACKET_SIZE]);
        if !crc::verify_crc16(&buf[..CRC_OFFSET], advertised) {
            return Err(Error::BadCrc);
        }
        let command = GpioCommand::from_u8(buf[0]).ok_or_else(|| {
            Error::Parsing(format!("unknown device command: 0x{:02x}", buf[0]))
        })?;
        let sequence_no = LittleEndian::read_u32(&buf[2..6]);
        let payload_buf = &buf[PAYLOAD_OFFSET..CRC_OFFSET];
        let payload = match command {
            GpioCommand::ResetSystem | GpioCommand::StartSystem | GpioCommand::StopSystem => {
                Payload::None
            }
            GpioCommand::AddController => Payload::AddController {
                controller_id: payload_buf[0],
                hw_type: payload_buf[1],
            },
            GpioCommand::AddPinsToController => {
                let count = payload_buf[1] as usize;
                if count > MAX_PINS_PER_PACKET {
                    return Err(Error::Parsing(format!("pin list count out of range: {}", count)));
                }
                Payload::Pinlist {
                    controller_id: payload_buf[0],
                    pins: payload_buf[2..2 + count].to_vec(),
                }
            }
            GpioCommand::MuteController => Payload::MuteController {
                controller_id: payload_buf[0],
                muted: payload_buf[1],
            },
            GpioCommand::SetNotificationMode => Payload::NotificationMode {
                controller_id: payload_buf[0],
                mode: payload_buf[1],
            },
            GpioCommand::SetControllerTickRate => Payload::TickRate {
                controller_id: payload_buf[0],
                delta_ticks: LittleEndian::read_u16(&payload_buf[2..4]),
            },
            GpioCommand::SetAnalogResolution => Payload::AnalogResolution {
                controller_id: payload_buf[0],
                resolution: payload_buf[1],
            },
            GpioCommand::SetValue | GpioCommand::GetValue => Payload::Value {
                controller_id: payload_buf[0],
                value: LittleEndian::read_u32(&payload_buf[2..6]),
            },
            GpioCommand::Ack => Payload::Ack {
                returned_seq_no: LittleEndian::read_u32(&payload_buf[0..4]),
                status: payload_buf[4],
            },
        };
        Ok(GpioPacket { command, sequence_no, payload })
    }
}
