// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Constructors for outbound device packets.
//!
//! Sequence numbers are assigned here, monotonically, one per packet.
//! The factory is safe to share between threads.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Error, Result};

use super::{GpioCommand, GpioPacket, Payload, MAX_PINS_PER_PACKET};

/// Builds device packets with monotonically increasing sequence numbers.
#[derive(Debug)]
pub struct PacketFactory {
    next_seq: AtomicU32,
}

impl PacketFactory {
    /// Sequence numbering starts at 1; 0 is never a valid sequence.
    #[must_use]
    pub fn new() -> Self {
        Self { next_seq: AtomicU32::new(1) }
    }

    #[inline]
    fn next_seq(&self) -> u32 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    #[must_use]
    pub fn make_reset_system_command(&self) -> GpioPacket {
        GpioPacket {
            command: GpioCommand::ResetSystem,
            sequence_no: self.next_seq(),
            payload: Payload::None,
        }
    }

    #[must_use]
    pub fn make_start_system_command(&self) -> GpioPacket {
        GpioPacket {
            command: GpioCommand::StartSystem,
            sequence_no: self.next_seq(),
            payload: Payload::None,
        }
    }

    #[must_use]
    pub fn make_stop_system_command(&self) -> GpioPacket {
        GpioPacket {
            command: GpioCommand::StopSystem,
            sequence_no: self.next_seq(),
            payload: Payload::None,
        }
    }

    #[must_use]
    pub fn make_add_controller_command(&self, controller_id: u8, hw_type: u8) -> GpioPacket {
        GpioPacket {
            command: GpioCommand::AddController,
            sequence_no: self.next_seq(),
            payload: Payload::AddController { controller_id, hw_type },
        }
    }

    /// Fails with an encoding error when `pins` exceeds the payload ceiling;
    /// callers split longer lists into multiple packets.
    pub fn make_add_pins_to_controller_command(
        &self,
        controller_id: u8,
        pins: &[u8],
    ) -> Result<GpioPacket> {
        if pins.len() > MAX_PINS_PER_PACKET {
            return Err(Error::Encoding(format!(
                "pin list of {} exceeds packet ceiling of {}",
                pins.len(),
                MAX_PINS_PER_PACKET
            )));
        }
        Ok(GpioPacket {
            command: GpioCommand::AddPinsToController,
            sequence_no: self.next_seq(),
            payload: Payload::Pinlist { controller_id, pins: pins.to_vec() },
        })
    }

    #[must_use]
    pub fn make_mute_controller_command(&self, controller_id: u8, muted: u8) -> GpioPacket {
        GpioPacket {
            command: GpioCommand::MuteController,
            sequence_no: self.next_seq(),
            payload: Payload::MuteController { controller_id, muted },
        }
    }

    #[must_use]
    pub fn make_set_notification_mode(&self, controller_id: u8, mode: u8) -> GpioPacket {
        GpioPacket {
            command: GpioCommand::SetNotificationMode,
            sequence_no: self.next_seq(),
            payload: Payload::NotificationMode { controller_id, mode },
        }
    }

    #[must_use]
    pub fn make_set_controller_tick_rate_command(
        &self,
        controller_id: u8,
        delta_ticks: u16,
    ) -> GpioPacket {
        GpioPacket {
            command: GpioCommand::SetControllerTickRate,
            sequence_no: self.next_seq(),
            payload: Payload::TickRate { controller_id, delta_ticks },
        }
    }

    #[must_use]
    pub fn make_set_analog_resolution_command(
        &self,
        controller_id: u8,
        resolution: u8,
    ) -> GpioPacket {
        GpioPacket {
            command: GpioCommand::SetAnalogResolution,
            sequence_no: self.next_seq(),
            payload: Payload::AnalogResolution { controller_id, resolution },
        }
    }

    #[must_use]
    pub fn make_set_value_command(&self, controller_id: u8, value: u32) -> GpioPacket {
        GpioPacket {
            command: GpioCommand::SetValue,
            sequence_no: self.next_seq(),
            payload: Payload::Value { controller_id, value },
        }
    }
}

impl Default for PacketFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_numbers_are_monotonic() {
        let factory = PacketFactory::new();
        let a = factory.make_reset_system_command();
        let b = factory.make_start_system_command();
        let c = factory.make_stop_system_command();
        assert_eq!(a.sequence_no, 1);
        assert_eq!(b.sequence_no, 2);
        assert_eq!(c.sequence_no, 3);
    }

    #[test]
    fn test_pin_list_at_ceiling_is_accepted() {
        let factory = PacketFactory::new();
        let pins = vec![0u8; MAX_PINS_PER_PACKET];
        assert!(factory.make_add_pins_to_controller_command(2, &pins).is_ok());
    }

    #[test]
    fn test_pin_list_overflow_is_an_encoding_error() {
        let factory = PacketFactory::new();
        let pins = vec![0u8; MAX_PINS_PER_PACKET + 1];
        let result = factory.make_add_pins_to_controller_command(2, &pins);
        assert!(matches!(result, Err(Error::Encoding(_))));
    }
}
