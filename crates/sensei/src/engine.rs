// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process wiring: queues, workers and message routing.
//!
//! Owns the three internal queues and the long-lived workers. The
//! dispatcher worker drains both inbound directions: device samples from
//! the value queue, and compiled/user messages from the main queue, routing
//! each by its destination bitset:
//!
//! ```text
//! config compiler ----\                      /--> mapping processor
//! user frontend ------ main queue --> dispatcher --> output backends
//!                                            \--> user frontend
//! device link reader -- value queue -/        \--> hw queue --> link writer
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{self, JsonConfiguration};
use crate::error::Result;
use crate::link::{DeviceLink, LinkControls, RASPA_SOCKET, SENSEI_SOCKET};
use crate::mapping::{MappingProcessor, DEFAULT_MAX_SENSORS};
use crate::message::{BackendType, Command, Destination, Message, Value, ValuePayload};
use crate::output::{OscBackend, OutputBackend, StandardStreamBackend};
use crate::queue::{QueueNotifier, SynchronizedQueue};
use crate::user_frontend::{OscUserFrontend, DEFAULT_SERVER_PORT};

const QUEUE_WAIT: Duration = Duration::from_secs(1);

/// Construction parameters for the engine.
pub struct EngineOptions {
    pub config_file: PathBuf,
    pub osc_server_port: u16,
    pub max_sensors: usize,
    pub receive_socket: PathBuf,
    pub peer_socket: PathBuf,
}

impl EngineOptions {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(config_file: P) -> Self {
        Self {
            config_file: config_file.into(),
            osc_server_port: DEFAULT_SERVER_PORT,
            max_sensors: DEFAULT_MAX_SENSORS,
            receive_socket: PathBuf::from(SENSEI_SOCKET),
            peer_socket: PathBuf::from(RASPA_SOCKET),
        }
    }
}

/// The assembled daemon: link, dispatcher, frontends and backends.
pub struct SenseiEngine {
    main_queue: Arc<SynchronizedQueue<Message>>,
    value_queue: Arc<SynchronizedQueue<Message>>,
    dispatch_notifier: Arc<QueueNotifier>,
    link: DeviceLink,
    user_frontend: Arc<Mutex<OscUserFrontend>>,
    // Moved into the dispatcher thread on run().
    processor: Option<MappingProcessor>,
    backends: Option<Vec<Box<dyn OutputBackend>>>,
    hw_queue: Arc<SynchronizedQueue<Command>>,
    running: Arc<AtomicBool>,
    dispatcher: Option<JoinHandle<()>>,
}

impl SenseiEngine {
    /// Build the engine and compile the configuration document.
    ///
    /// A parameter error during compilation leaves the device muted and the
    /// engine alive; the error is logged, not fatal.
    pub fn new(options: EngineOptions) -> Result<Self> {
        // The dispatcher drains two queues; a shared notifier lets a push
        // on either one wake its wait.
        let dispatch_notifier = Arc::new(QueueNotifier::new());
        let main_queue =
            Arc::new(SynchronizedQueue::with_notifier(Arc::clone(&dispatch_notifier)));
        let value_queue =
            Arc::new(SynchronizedQueue::with_notifier(Arc::clone(&dispatch_notifier)));
        let hw_queue = Arc::new(SynchronizedQueue::new());

        let link = DeviceLink::with_paths(
            Arc::clone(&hw_queue),
            Arc::clone(&value_queue),
            &options.receive_socket,
            &options.peer_socket,
        )?;
        let user_frontend = Arc::new(Mutex::new(OscUserFrontend::with_port(
            Arc::clone(&main_queue),
            options.max_sensors,
            options.osc_server_port,
        )));

        let doc = config::load_document(&options.config_file)?;
        let mut backends: Vec<Box<dyn OutputBackend>> = Vec::new();
        for (id, backend_type) in config::backend_specs(&doc) {
            match backend_type {
                BackendType::Osc => {
                    backends.push(Box::new(OscBackend::new(id, options.max_sensors)?));
                }
                BackendType::StdStream => {
                    backends.push(Box::new(StandardStreamBackend::new(id, options.max_sensors)));
                }
            }
        }
        if backends.is_empty() {
            log::info!("[ENGINE] no backends configured, using stdout backend");
            backends.push(Box::new(StandardStreamBackend::new(0, options.max_sensors)));
        }

        let compiler = JsonConfiguration::new(&options.config_file, Arc::clone(&main_queue));
        if let Err(e) = compiler.compile(&doc) {
            log::error!("[ENGINE] configuration compilation failed: {} (device left muted)", e);
        }

        Ok(Self {
            main_queue,
            value_queue,
            dispatch_notifier,
            link,
            user_frontend,
            processor: Some(MappingProcessor::new(options.max_sensors)),
            backends: Some(backends),
            hw_queue,
            running: Arc::new(AtomicBool::new(false)),
            dispatcher: None,
        })
    }

    /// Control surface of the device link.
    #[must_use]
    pub fn link_controls(&self) -> LinkControls {
        self.link.controls()
    }

    /// Port the OSC user-control listener is bound to (meaningful after
    /// [`run`](Self::run) when an ephemeral port was requested).
    #[must_use]
    pub fn user_control_port(&self) -> u16 {
        self.user_frontend.lock().port()
    }

    /// Start every worker: link reader/writer, user frontend listener and
    /// the mapping dispatcher.
    pub fn run(&mut self) -> Result<()> {
        let (Some(processor), Some(backends)) = (self.processor.take(), self.backends.take())
        else {
            log::error!("[ENGINE] already running");
            return Ok(());
        };

        self.link.run();
        self.user_frontend.lock().start()?;
        self.running.store(true, Ordering::Release);

        let context = DispatchContext {
            main_queue: Arc::clone(&self.main_queue),
            value_queue: Arc::clone(&self.value_queue),
            notifier: Arc::clone(&self.dispatch_notifier),
            hw_queue: Arc::clone(&self.hw_queue),
            processor,
            backends,
            user_frontend: Arc::clone(&self.user_frontend),
            running: Arc::clone(&self.running),
        };
        self.dispatcher = Some(
            std::thread::Builder::new()
                .name("sensei-dispatcher".into())
                .spawn(move || dispatch_loop(context))
                .expect("spawning dispatcher"),
        );
        Ok(())
    }

    /// Stop the workers in reverse order of data flow.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.dispatch_notifier.notify_shutdown();
        if let Some(dispatcher) = self.dispatcher.take() {
            let _ = dispatcher.join();
        }
        self.user_frontend.lock().stop();
        self.link.stop();
    }
}

// ============================================================================
// Dispatcher worker
// ============================================================================

struct DispatchContext {
    main_queue: Arc<SynchronizedQueue<Message>>,
    value_queue: Arc<SynchronizedQueue<Message>>,
    notifier: Arc<QueueNotifier>,
    hw_queue: Arc<SynchronizedQueue<Command>>,
    processor: MappingProcessor,
    backends: Vec<Box<dyn OutputBackend>>,
    user_frontend: Arc<Mutex<OscUserFrontend>>,
    running: Arc<AtomicBool>,
}

/// Forwards each emission to every backend.
struct FanOutBackend<'a> {
    backends: &'a mut [Box<dyn OutputBackend>],
}

impl OutputBackend for FanOutBackend<'_> {
    fn send(&mut self, transformed: &Value, raw: &Value) {
        for backend in self.backends.iter_mut() {
            backend.send(transformed, raw);
        }
    }

    fn apply_command(&mut self, _command: &Command) -> Result<()> {
        Ok(())
    }
}

fn dispatch_loop(mut context: DispatchContext) {
    while context.running.load(Ordering::Acquire) {
        if context.main_queue.is_empty() && context.value_queue.is_empty() {
            // Both input queues signal the shared notifier, so a push on
            // either side wakes this wait.
            context.notifier.wait(QUEUE_WAIT);
        }
        while let Some(message) = context.value_queue.pop() {
            handle_message(&mut context, message);
        }
        while let Some(message) = context.main_queue.pop() {
            handle_message(&mut context, message);
        }
    }
}

fn handle_message(context: &mut DispatchContext, message: Message) {
    match message {
        Message::Command(command) => route_command(context, command),
        Message::Value(value) => match value.payload {
            ValuePayload::IntegerSet(_) | ValuePayload::FloatSet(_) => {
                if let Some(command) = context.processor.process_set_value(&value) {
                    route_command(context, command);
                }
            }
            _ => {
                let mut fanout = FanOutBackend { backends: &mut context.backends };
                context.processor.process(&value, &mut fanout);
            }
        },
        Message::Error(error) => {
            log::warn!("[ENGINE] link error: {:?} (sensor {})", error.kind, error.index);
        }
    }
}

/// Deliver a command to every subsystem named in its destination bitset.
/// Non-OK results are logged and dispatch continues.
fn route_command(context: &mut DispatchContext, command: Command) {
    let destination = command.destination();

    if destination.contains(Destination::MAPPING_PROCESSOR) {
        if let Err(e) = context.processor.apply_command(&command) {
            log::warn!("[ENGINE] mapper rejected {:?}: {}", command.kind, e);
        }
    }
    if destination.contains(Destination::OUTPUT_BACKEND) {
        for backend in &mut context.backends {
            if let Err(e) = backend.apply_command(&command) {
                log::warn!("[ENGINE] backend rejected {:?}: {}", command.kind, e);
            }
        }
    }
    if destination.contains(Destination::USER_FRONTEND) {
        if let Err(e) = context.user_frontend.lock().apply_command(&command) {
            log::warn!("[ENGINE] user frontend rejected {:?}: {}", command.kind, e);
        }
    }
    if destination.contains(Destination::HARDWARE_FRONTEND) {
        context.hw_queue.push(command);
    }
}
