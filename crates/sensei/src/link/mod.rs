// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Link engine for the front-end device.
//!
//! Manages the local-domain datagram socket pair and the two worker threads
//! that drive it:
//!
//! - the **reader** blocks on the receive socket (500 ms timeout), lifts
//!   value packets into messages and handles acks; every wakeup also polls
//!   the retry state machine,
//! - the **writer** drains the outbound command queue through the command
//!   translator into a send list, transmitting at most one unacked packet
//!   at a time when ack verification is enabled.
//!
//! The daemon binds its receive endpoint first and connects the send
//! endpoint lazily; a failed connect is retried whenever a valid packet
//! arrives, so the two processes can start in any order.

pub mod translator;

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::error::Result;
use crate::message::{factory, Command, Message};
use crate::protocol::{
    status_to_string, GpioCommand, GpioPacket, PacketFactory, Payload, GPIO_PACKET_SIZE,
};
use crate::queue::SynchronizedQueue;
use crate::tracker::{MessageTracker, Timeout};

/// Well-known receive endpoint of the daemon.
pub const SENSEI_SOCKET: &str = "/tmp/sensei";
/// Well-known endpoint of the device bridge process.
pub const RASPA_SOCKET: &str = "/tmp/raspa";

const SOCKET_TIMEOUT: Duration = Duration::from_millis(500);
const QUEUE_WAIT: Duration = Duration::from_secs(1);
const ACK_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_RESEND_ATTEMPTS: u32 = 3;

// Worker lifecycle states.
const STOPPED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPING: u8 = 2;

/// Send-side state guarded by one mutex: the pending packet list and the
/// ack tracker always mutate together.
struct SendState {
    send_list: VecDeque<GpioPacket>,
    tracker: MessageTracker,
}

struct LinkShared {
    state: AtomicU8,
    muted: AtomicBool,
    verify_acks: AtomicBool,
    connected: AtomicBool,
    /// Mirror of the ack gate, readable without taking the send lock.
    ready_to_send: AtomicBool,
    send: Mutex<SendState>,
    send_available: Condvar,
    in_socket: UnixDatagram,
    out_socket: UnixDatagram,
    peer_path: PathBuf,
    receive_path: PathBuf,
    hw_queue: Arc<SynchronizedQueue<Command>>,
    value_queue: Arc<SynchronizedQueue<Message>>,
    packet_factory: PacketFactory,
}

/// Clonable control surface over a running link.
#[derive(Clone)]
pub struct LinkControls {
    shared: Arc<LinkShared>,
}

impl LinkControls {
    /// While muted, packets arriving from the device are dropped. Outbound
    /// command flow is unaffected: configuration is sent to a muted device.
    pub fn mute(&self, enabled: bool) {
        self.shared.muted.store(enabled, Ordering::Release);
    }

    /// Enable or disable tracking and retransmission of sent packets.
    pub fn verify_acks(&self, enabled: bool) {
        self.shared.verify_acks.store(enabled, Ordering::Release);
    }

    /// True once the send endpoint is connected to the peer.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }
}

/// The hardware link: socket pair plus reader and writer workers.
pub struct DeviceLink {
    shared: Arc<LinkShared>,
    read_thread: Option<JoinHandle<()>>,
    write_thread: Option<JoinHandle<()>>,
}

impl DeviceLink {
    /// Create a link on the well-known socket paths.
    pub fn new(
        hw_queue: Arc<SynchronizedQueue<Command>>,
        value_queue: Arc<SynchronizedQueue<Message>>,
    ) -> Result<Self> {
        Self::with_paths(hw_queue, value_queue, SENSEI_SOCKET, RASPA_SOCKET)
    }

    /// Create a link on caller-chosen socket paths (used by tests).
    pub fn with_paths<P: AsRef<Path>, Q: AsRef<Path>>(
        hw_queue: Arc<SynchronizedQueue<Command>>,
        value_queue: Arc<SynchronizedQueue<Message>>,
        receive_path: P,
        peer_path: Q,
    ) -> Result<Self> {
        let receive_path = receive_path.as_ref().to_path_buf();
        let peer_path = peer_path.as_ref().to_path_buf();

        // A previous run that did not exit cleanly leaves the endpoint file
        // behind; remove it before binding.
        if let Err(e) = std::fs::remove_file(&receive_path) {
            if e.kind() != ErrorKind::NotFound {
                return Err(e.into());
            }
        }
        let in_socket = UnixDatagram::bind(&receive_path)?;
        in_socket.set_read_timeout(Some(SOCKET_TIMEOUT))?;

        let out_socket = UnixDatagram::unbound()?;
        out_socket.set_write_timeout(Some(SOCKET_TIMEOUT))?;
        let connected = match out_socket.connect(&peer_path) {
            Ok(()) => {
                log::info!("[LINK] connected to device peer at {}", peer_path.display());
                true
            }
            Err(e) => {
                log::info!(
                    "[LINK] could not connect to {} yet ({}), will retry on first packet",
                    peer_path.display(),
                    e
                );
                false
            }
        };

        let packet_factory = PacketFactory::new();
        let mut send_list = VecDeque::new();
        // The reset packet is always the first thing sent on (re)connection.
        send_list.push_back(packet_factory.make_reset_system_command());

        let shared = Arc::new(LinkShared {
            state: AtomicU8::new(STOPPED),
            muted: AtomicBool::new(false),
            verify_acks: AtomicBool::new(true),
            connected: AtomicBool::new(connected),
            ready_to_send: AtomicBool::new(true),
            send: Mutex::new(SendState {
                send_list,
                tracker: MessageTracker::new(ACK_TIMEOUT, MAX_RESEND_ATTEMPTS),
            }),
            send_available: Condvar::new(),
            in_socket,
            out_socket,
            peer_path,
            receive_path,
            hw_queue,
            value_queue,
            packet_factory,
        });

        Ok(Self { shared, read_thread: None, write_thread: None })
    }

    /// Control surface usable from other threads.
    #[must_use]
    pub fn controls(&self) -> LinkControls {
        LinkControls { shared: Arc::clone(&self.shared) }
    }

    /// Spawn the reader and writer workers.
    pub fn run(&mut self) {
        if self.shared.state.load(Ordering::Acquire) != STOPPED {
            log::error!("[LINK] cannot start, link already running");
            return;
        }
        log::info!("[LINK] starting read and write threads");
        self.shared.state.store(RUNNING, Ordering::Release);
        let reader_shared = Arc::clone(&self.shared);
        self.read_thread = Some(
            std::thread::Builder::new()
                .name("sensei-link-reader".into())
                .spawn(move || read_loop(&reader_shared))
                .expect("spawning link reader"),
        );
        let writer_shared = Arc::clone(&self.shared);
        self.write_thread = Some(
            std::thread::Builder::new()
                .name("sensei-link-writer".into())
                .spawn(move || write_loop(&writer_shared))
                .expect("spawning link writer"),
        );
    }

    /// Stop both workers. The reader exits first (bounded by its socket
    /// timeout) and wakes the writer's gate so it can observe the state
    /// change. Unsent packets are discarded.
    pub fn stop(&mut self) {
        if self.shared.state.load(Ordering::Acquire) != RUNNING {
            return;
        }
        log::info!("[LINK] stopping");
        self.shared.state.store(STOPPING, Ordering::Release);
        if let Some(reader) = self.read_thread.take() {
            let _ = reader.join();
        }
        self.shared.send_available.notify_all();
        if let Some(writer) = self.write_thread.take() {
            let _ = writer.join();
        }
        self.shared.state.store(STOPPED, Ordering::Release);
        log::info!("[LINK] threads stopped");
    }
}

impl Drop for DeviceLink {
    fn drop(&mut self) {
        self.stop();
        let _ = std::fs::remove_file(&self.shared.receive_path);
    }
}

// ============================================================================
// Reader
// ============================================================================

fn read_loop(shared: &LinkShared) {
    let mut buffer = [0u8; GPIO_PACKET_SIZE];
    while shared.state.load(Ordering::Acquire) == RUNNING {
        match shared.in_socket.recv(&mut buffer) {
            Ok(bytes) => {
                let muted = shared.muted.load(Ordering::Acquire);
                if !muted && bytes >= GPIO_PACKET_SIZE {
                    if !shared.connected.load(Ordering::Acquire) {
                        try_connect(shared);
                    }
                    handle_datagram(shared, &buffer);
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {}
            Err(e) => log::warn!("[LINK] receive error: {}", e),
        }
        // Cheap check first; the full poll takes the send lock.
        if !shared.ready_to_send.load(Ordering::Acquire) {
            handle_timeouts(shared);
        }
    }
    // No more acks or timeouts will arrive; wake the writer so it can
    // observe the state change.
    shared.send_available.notify_all();
}

fn try_connect(shared: &LinkShared) {
    match shared.out_socket.connect(&shared.peer_path) {
        Ok(()) => {
            shared.connected.store(true, Ordering::Release);
            log::info!("[LINK] connected to device peer at {}", shared.peer_path.display());
        }
        Err(e) => {
            log::debug!("[LINK] connect to {} failed: {}", shared.peer_path.display(), e);
        }
    }
}

fn handle_datagram(shared: &LinkShared, buffer: &[u8]) {
    let packet = match GpioPacket::decode(buffer) {
        Ok(packet) => packet,
        Err(crate::error::Error::BadCrc) => {
            log::warn!("[LINK] dropping packet with bad CRC");
            shared.value_queue.push(factory::bad_crc_error(0, 0));
            return;
        }
        Err(e) => {
            log::warn!("[LINK] undecodable packet: {}", e);
            return;
        }
    };
    match packet.command {
        GpioCommand::GetValue => handle_value(shared, &packet),
        GpioCommand::Ack => handle_ack(shared, &packet),
        other => log::warn!("[LINK] unhandled device command: {:?}", other),
    }
}

fn handle_value(shared: &LinkShared, packet: &GpioPacket) {
    if let Payload::Value { controller_id, value } = &packet.payload {
        let (controller_id, value) = (*controller_id, *value);
        log::debug!("[LINK] value packet: controller {} = {}", controller_id, value);
        shared
            .value_queue
            .push(Message::Value(factory::analog_value(controller_id as usize, value as i32, 0)));
    }
}

fn handle_ack(shared: &LinkShared, packet: &GpioPacket) {
    let Payload::Ack { returned_seq_no, status } = &packet.payload else {
        return;
    };
    let (returned_seq_no, status) = (*returned_seq_no, *status);
    log::debug!("[LINK] ack for seq {}", returned_seq_no);
    if shared.verify_acks.load(Ordering::Acquire) {
        let mut send = shared.send.lock();
        if send.tracker.ack(returned_seq_no) {
            send.send_list.pop_front();
            shared.ready_to_send.store(true, Ordering::Release);
            shared.send_available.notify_one();
        } else {
            log::warn!("[LINK] unrecognised ack for seq {}", returned_seq_no);
        }
    }
    if status != 0 {
        log::warn!(
            "[LINK] device reported fault for seq {}: {}",
            returned_seq_no,
            status_to_string(status)
        );
    }
}

fn handle_timeouts(shared: &LinkShared) {
    let mut send = shared.send.lock();
    match send.tracker.timed_out() {
        Timeout::TimedOutPermanently => {
            log::warn!("[LINK] packet timed out too many times, dropping it");
            send.send_list.pop_front();
            shared.value_queue.push(factory::too_many_timeouts_error(0, 0));
            shared.ready_to_send.store(true, Ordering::Release);
            shared.send_available.notify_one();
        }
        Timeout::TimedOut => {
            log::warn!("[LINK] packet timed out, retrying");
            shared.ready_to_send.store(true, Ordering::Release);
            shared.send_available.notify_one();
        }
        Timeout::NoMessage | Timeout::Waiting => {}
    }
}

// ============================================================================
// Writer
// ============================================================================

fn write_loop(shared: &LinkShared) {
    while shared.state.load(Ordering::Acquire) == RUNNING {
        shared.hw_queue.wait_for_data(QUEUE_WAIT);
        while let Some(command) = shared.hw_queue.pop() {
            let packets = translator::translate_command(&shared.packet_factory, &command);
            if !packets.is_empty() {
                shared.send.lock().send_list.extend(packets);
            }
        }
        drain_send_list(shared);
    }
}

fn drain_send_list(shared: &LinkShared) {
    loop {
        let packet = {
            let mut send = shared.send.lock();
            if send.send_list.is_empty() || shared.state.load(Ordering::Acquire) != RUNNING {
                return;
            }
            let verify = shared.verify_acks.load(Ordering::Acquire);
            if verify && !shared.ready_to_send.load(Ordering::Acquire) {
                // Wait for an ack, a timeout or shutdown; all three paths
                // signal the condition.
                shared.send_available.wait(&mut send);
                continue;
            }
            send.send_list.front().cloned()
        };
        let Some(packet) = packet else { return };

        // The socket send happens outside the lock; nothing else transmits
        // while the gate is held by this thread.
        let wire = packet.encode();
        let sent = shared.out_socket.send(&wire);

        let mut send = shared.send.lock();
        match sent {
            Ok(bytes) if bytes == GPIO_PACKET_SIZE => {
                if shared.verify_acks.load(Ordering::Acquire) {
                    log::debug!(
                        "[LINK] sent packet cmd {:?} seq {}",
                        packet.command,
                        packet.sequence_no
                    );
                    send.tracker.store(packet.sequence_no);
                    shared.ready_to_send.store(false, Ordering::Release);
                } else {
                    send.send_list.pop_front();
                }
            }
            Ok(bytes) => {
                log::warn!("[LINK] short send: {} of {} bytes", bytes, GPIO_PACKET_SIZE);
                send.send_list.pop_front();
            }
            Err(e) => {
                log::warn!("[LINK] send failed: {}", e);
                send.send_list.pop_front();
            }
        }
    }
}
