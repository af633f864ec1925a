// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OSC user-control surface.
//!
//! A UDP listener translating runtime control messages into commands and
//! set-requests on the main queue:
//!
//! | address | args | effect |
//! |---|---|---|
//! | `/set_enabled` | `ii` | enable/disable a sensor |
//! | `/set_output` | `if` | float set-request |
//! | `/set_digital_output` | `ii` | integer set-request |
//! | `/set_range_output` | `ii` | integer set-request |

use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::message::{factory, Command, CommandKind, Message};
use crate::osc::{decode_message, OscArg, OscMessage};
use crate::queue::SynchronizedQueue;

/// Default control port.
pub const DEFAULT_SERVER_PORT: u16 = 23024;

const SOCKET_TIMEOUT: Duration = Duration::from_millis(500);
const RECEIVE_BUFFER: usize = 512;

/// OSC listener pushing user commands onto the main queue.
pub struct OscUserFrontend {
    queue: Arc<SynchronizedQueue<Message>>,
    max_sensors: usize,
    port: u16,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl OscUserFrontend {
    #[must_use]
    pub fn new(queue: Arc<SynchronizedQueue<Message>>, max_sensors: usize) -> Self {
        Self::with_port(queue, max_sensors, DEFAULT_SERVER_PORT)
    }

    /// Port 0 binds an ephemeral port (used by tests); read it back with
    /// [`port`](Self::port) after [`start`](Self::start).
    #[must_use]
    pub fn with_port(
        queue: Arc<SynchronizedQueue<Message>>,
        max_sensors: usize,
        port: u16,
    ) -> Self {
        Self {
            queue,
            max_sensors,
            port,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// Currently configured (or bound) port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Bind the socket and spawn the listener thread.
    pub fn start(&mut self) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }
        let socket = UdpSocket::bind(("0.0.0.0", self.port))?;
        socket.set_read_timeout(Some(SOCKET_TIMEOUT))?;
        self.port = socket.local_addr()?.port();
        log::info!("[USER] OSC control listening on port {}", self.port);

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let queue = Arc::clone(&self.queue);
        let max_sensors = self.max_sensors;
        self.thread = Some(
            std::thread::Builder::new()
                .name("sensei-user-frontend".into())
                .spawn(move || listen_loop(&socket, &queue, &running, max_sensors))
                .expect("spawning user frontend listener"),
        );
        Ok(())
    }

    /// Stop the listener thread, bounded by the socket timeout.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    /// Apply a user-frontend-destined command.
    pub fn apply_command(&mut self, command: &Command) -> Result<()> {
        match &command.kind {
            CommandKind::SetOscInputPort(port) => {
                if !(1000..=65535).contains(port) {
                    return Err(Error::InvalidPortNumber(*port));
                }
                self.port = *port as u16;
                if self.thread.is_some() {
                    self.stop();
                    self.start()?;
                }
                Ok(())
            }
            _ => Err(Error::UnhandledCommand),
        }
    }
}

impl Drop for OscUserFrontend {
    fn drop(&mut self) {
        self.stop();
    }
}

fn listen_loop(
    socket: &UdpSocket,
    queue: &SynchronizedQueue<Message>,
    running: &AtomicBool,
    max_sensors: usize,
) {
    let mut buffer = [0u8; RECEIVE_BUFFER];
    while running.load(Ordering::Acquire) {
        match socket.recv(&mut buffer) {
            Ok(received) => match decode_message(&buffer[..received]) {
                Ok(message) => dispatch(&message, queue, max_sensors),
                Err(e) => log::warn!("[USER] undecodable OSC datagram: {}", e),
            },
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {}
            Err(e) => log::warn!("[USER] receive error: {}", e),
        }
    }
}

fn sensor_index(raw: i32, max_sensors: usize) -> Option<usize> {
    if raw >= 0 && (raw as usize) < max_sensors {
        Some(raw as usize)
    } else {
        log::warn!("[USER] sensor index {} out of range", raw);
        None
    }
}

fn dispatch(message: &OscMessage, queue: &SynchronizedQueue<Message>, max_sensors: usize) {
    match (message.address.as_str(), message.args.as_slice()) {
        ("/set_enabled", [OscArg::Int(index), OscArg::Int(enabled)]) => {
            if let Some(index) = sensor_index(*index, max_sensors) {
                log::debug!("[USER] set_enabled {} {}", index, enabled);
                queue.push(Message::Command(factory::set_enabled(index, *enabled != 0)));
            }
        }
        ("/set_output", [OscArg::Int(index), OscArg::Float(value)]) => {
            if let Some(index) = sensor_index(*index, max_sensors) {
                log::debug!("[USER] set_output {} {}", index, value);
                queue.push(Message::Value(factory::float_set_value(index, *value, 0)));
            }
        }
        ("/set_digital_output", [OscArg::Int(index), OscArg::Int(value)])
        | ("/set_range_output", [OscArg::Int(index), OscArg::Int(value)]) => {
            if let Some(index) = sensor_index(*index, max_sensors) {
                log::debug!("[USER] {} {} {}", message.address, index, value);
                queue.push(Message::Value(factory::integer_set_value(index, *value, 0)));
            }
        }
        _ => log::warn!("[USER] unhandled OSC message: {}", message.address),
    }
}
