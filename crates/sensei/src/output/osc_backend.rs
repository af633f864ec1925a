// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OSC output backend.
//!
//! Publishes transformed values to `{base_path}/{sensor_name}` and, when raw
//! republishing is enabled, the originating samples to
//! `{base_raw_input_path}/{sensor_name}`. Host and port are reconfigured at
//! runtime through backend commands; the destination address is re-resolved
//! on every change.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use crate::error::{Error, Result};
use crate::message::{Command, CommandKind, Value, ValuePayload};
use crate::osc::{encode_message, OscArg};

use super::{BackendState, OutputBackend};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 23023;
const DEFAULT_BASE_PATH: &str = "/sensors";
const DEFAULT_RAW_PATH: &str = "/raw_input";

/// Backend port numbers live above the reserved range.
const MIN_PORT: i64 = 1024;
const MAX_PORT: i64 = 65535;

/// Sends transformed (and optionally raw) values over OSC/UDP.
pub struct OscBackend {
    state: BackendState,
    host: String,
    port: u16,
    base_path: String,
    base_raw_path: String,
    socket: UdpSocket,
    destination: Option<SocketAddr>,
}

impl OscBackend {
    pub fn new(id: usize, max_sensors: usize) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        let mut backend = Self {
            state: BackendState::new(id, max_sensors),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            base_path: DEFAULT_BASE_PATH.to_string(),
            base_raw_path: DEFAULT_RAW_PATH.to_string(),
            socket,
            destination: None,
        };
        backend.resolve_destination();
        Ok(backend)
    }

    fn resolve_destination(&mut self) {
        match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(mut addrs) => {
                self.destination = addrs.next();
                if self.destination.is_none() {
                    log::error!("[OSC] host {} resolved to no addresses", self.host);
                }
            }
            Err(e) => {
                log::error!("[OSC] cannot resolve {}:{}: {}", self.host, self.port, e);
                self.destination = None;
            }
        }
    }

    fn transmit(&self, address: &str, arg: OscArg) {
        let Some(destination) = self.destination else {
            return;
        };
        let datagram = encode_message(address, &[arg]);
        if let Err(e) = self.socket.send_to(&datagram, destination) {
            log::warn!("[OSC] send to {} failed: {}", destination, e);
        }
    }
}

impl OutputBackend for OscBackend {
    fn send(&mut self, transformed: &Value, raw: &Value) {
        let name = self.state.sensor_name(transformed.index);

        if self.state.enabled() {
            if let ValuePayload::Output(value) = transformed.payload {
                let address = format!("{}/{}", self.base_path, name);
                self.transmit(&address, OscArg::Float(value));
            }
        }

        if self.state.raw_input_enabled() {
            let address = format!("{}/{}", self.base_raw_path, name);
            match raw.payload {
                ValuePayload::Analog(value) => self.transmit(&address, OscArg::Int(value)),
                ValuePayload::Digital(value) => {
                    self.transmit(&address, OscArg::Int(i32::from(value)));
                }
                ValuePayload::Continuous(value) | ValuePayload::Imu(value) => {
                    self.transmit(&address, OscArg::Float(value));
                }
                _ => {}
            }
        }
    }

    fn apply_command(&mut self, command: &Command) -> Result<()> {
        match &command.kind {
            CommandKind::SetOscOutputHost(host) => {
                if command.index == self.state.id() {
                    self.host = host.clone();
                    self.resolve_destination();
                }
                Ok(())
            }
            CommandKind::SetOscOutputPort(port) => {
                if command.index == self.state.id() {
                    if !(MIN_PORT..=MAX_PORT).contains(port) {
                        return Err(Error::InvalidPortNumber(*port));
                    }
                    self.port = *port as u16;
                    self.resolve_destination();
                }
                Ok(())
            }
            CommandKind::SetOscOutputBasePath(path) => {
                if command.index == self.state.id() {
                    self.base_path = path.clone();
                }
                Ok(())
            }
            CommandKind::SetOscOutputRawPath(path) => {
                if command.index == self.state.id() {
                    self.base_raw_path = path.clone();
                }
                Ok(())
            }
            _ => self.state.apply_command(command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::factory;
    use std::time::Duration;

    fn receiver() -> (UdpSocket, u16) {
        let socket = UdpSocket::bind(("127.0.0.1", 0)).expect("bind receiver");
        socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("receiver timeout");
        let port = socket.local_addr().expect("local addr").port();
        (socket, port)
    }

    fn configured_backend(port: u16) -> OscBackend {
        let mut backend = OscBackend::new(0, 8).expect("backend");
        backend
            .apply_command(&factory::set_osc_output_host(0, "127.0.0.1"))
            .expect("host");
        backend
            .apply_command(&factory::set_osc_output_port(0, i64::from(port)))
            .expect("port");
        backend
    }

    #[test]
    fn test_rejects_out_of_range_port() {
        let mut backend = OscBackend::new(0, 8).expect("backend");
        let result = backend.apply_command(&factory::set_osc_output_port(0, 80));
        assert!(matches!(result, Err(Error::InvalidPortNumber(80))));
    }

    #[test]
    fn test_publishes_transformed_value_under_sensor_name() {
        let (receiver, port) = receiver();
        let mut backend = configured_backend(port);
        backend
            .apply_command(&factory::set_osc_output_base_path(0, "/sensei"))
            .expect("path");
        backend
            .apply_command(&factory::set_sensor_name(3, "ribbon"))
            .expect("name");

        backend.send(&factory::output_value(3, 0.75, 0), &factory::analog_value(3, 3000, 0));

        let mut buf = [0u8; 256];
        let received = receiver.recv(&mut buf).expect("datagram");
        let message = crate::osc::decode_message(&buf[..received]).expect("decode");
        assert_eq!(message.address, "/sensei/ribbon");
        assert_eq!(message.args, vec![OscArg::Float(0.75)]);
    }

    #[test]
    fn test_raw_republishing_is_opt_in() {
        let (receiver, port) = receiver();
        let mut backend = configured_backend(port);

        backend.send(&factory::output_value(1, 0.5, 0), &factory::analog_value(1, 2048, 0));
        let mut buf = [0u8; 256];
        let received = receiver.recv(&mut buf).expect("transformed datagram");
        assert!(crate::osc::decode_message(&buf[..received]).is_ok());

        backend
            .apply_command(&factory::set_send_raw_input_enabled(0, true))
            .expect("raw enable");
        backend.send(&factory::output_value(1, 0.5, 0), &factory::analog_value(1, 2048, 0));

        let first = receiver.recv(&mut buf).expect("transformed datagram");
        let first = crate::osc::decode_message(&buf[..first]).expect("decode");
        let second = receiver.recv(&mut buf).expect("raw datagram");
        let second = crate::osc::decode_message(&buf[..second]).expect("decode");
        assert_eq!(first.address, "/sensors/sensor_1");
        assert_eq!(second.address, "/raw_input/sensor_1");
        assert_eq!(second.args, vec![OscArg::Int(2048)]);
    }

    #[test]
    fn test_disabled_backend_is_silent() {
        let (receiver, port) = receiver();
        let mut backend = configured_backend(port);
        backend
            .apply_command(&factory::set_send_output_enabled(0, false))
            .expect("disable");
        backend.send(&factory::output_value(1, 0.5, 0), &factory::analog_value(1, 1, 0));

        receiver
            .set_read_timeout(Some(Duration::from_millis(200)))
            .expect("timeout");
        let mut buf = [0u8; 256];
        assert!(receiver.recv(&mut buf).is_err(), "disabled backend must not publish");
    }
}
