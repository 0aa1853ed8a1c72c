// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! ZMQ PUB server
//!
//! Publishes `"<topic> <payload>"` messages from any thread. Messages go
//! through a bounded outbox to the loop thread that owns the PUB socket.

use crossbeam::channel::{self, select, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::common::{Endpoint, PublisherConfig, TopicMessage, TransportError, TransportResult};
use crate::traits::Transport;
use crate::zmq::owner::{
    on_loop_error, send_blocking, LoopControl, LoopSignals, SocketOwner, Terminator,
};

const TAG: &str = "ZMQ-PUB";

/// ZMQ PUB server
pub struct ZmqPublisher {
    owner: Arc<SocketOwner>,
    config: PublisherConfig,
    outbox: Sender<String>,
    pending_outbox: Arc<Mutex<Option<Receiver<String>>>>,
}

impl ZmqPublisher {
    pub fn new(config: PublisherConfig) -> TransportResult<Self> {
        config.validate()?;
        let owner = SocketOwner::new(TAG, "zmq-pub", zmq::PUB, config.base.linger_ms())?;
        let (outbox, pending) = channel::bounded(config.queue_capacity);
        let pending_outbox = Arc::new(Mutex::new(Some(pending)));
        let release = Arc::clone(&pending_outbox);
        // Producers blocked on a never-started queue must see disconnection
        owner.on_terminate(move || drop(release.lock().take()));

        Ok(Self {
            owner,
            config,
            outbox,
            pending_outbox,
        })
    }

    /// Create a publisher bound to `host:port` with default settings
    pub fn with_address(host: &str, port: u16) -> TransportResult<Self> {
        Self::new(PublisherConfig::new(Endpoint::tcp(host, port)))
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Publish `payload` under `topic`
    ///
    /// `topic` must be a single non-empty token. Never blocks: a full outbox
    /// fails with `QueueFull`. Messages published before `start` are held in
    /// the outbox and sent once the socket is bound.
    pub fn publish(&self, topic: &str, payload: &str) -> TransportResult<()> {
        if topic.is_empty() || topic.contains(char::is_whitespace) {
            return Err(TransportError::InvalidMessage(format!(
                "Topic must be a single non-empty token, got {:?}",
                topic
            )));
        }
        self.publish_message(&TopicMessage::new(topic, payload))
    }

    pub fn publish_message(&self, message: &TopicMessage) -> TransportResult<()> {
        if self.owner.is_terminated() {
            return Err(TransportError::NotRunning);
        }

        match self.outbox.try_send(message.encode()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("[{}] Outbox full; dropped message on {}", TAG, message.topic);
                Err(TransportError::QueueFull {
                    capacity: self.config.queue_capacity,
                })
            }
            Err(TrySendError::Disconnected(_)) => Err(TransportError::NotRunning),
        }
    }

    pub fn terminator(&self) -> Terminator {
        Terminator::new(Arc::clone(&self.owner))
    }

    pub fn is_released(&self) -> bool {
        self.owner.is_released()
    }
}

impl Transport for ZmqPublisher {
    fn start(&self) -> TransportResult<()> {
        let mut pending = self.pending_outbox.lock();
        let outbox = pending.take().ok_or_else(|| {
            if self.owner.is_terminated() {
                TransportError::AlreadyTerminated
            } else {
                TransportError::AlreadyRunning
            }
        })?;

        let address = self.config.base.endpoint.address();
        let loop_outbox = outbox.clone();

        match self.owner.start(move |socket, signals| {
            run_publisher_loop(socket, signals, &address, loop_outbox)
        }) {
            Ok(()) => Ok(()),
            Err(e) => {
                if !self.owner.is_terminated() {
                    *pending = Some(outbox);
                }
                Err(e)
            }
        }
    }

    fn terminate(&self) {
        self.owner.terminate();
    }

    fn is_running(&self) -> bool {
        self.owner.is_running()
    }

    fn is_terminated(&self) -> bool {
        self.owner.is_terminated()
    }

    fn transport_type(&self) -> &str {
        "zmq-pub"
    }
}

impl Drop for ZmqPublisher {
    fn drop(&mut self) {
        if !self.owner.is_terminated() {
            error!("[{}] Publisher dropped without terminate(); terminating now", TAG);
            self.terminate();
        }
    }
}

fn run_publisher_loop(
    socket: zmq::Socket,
    signals: LoopSignals,
    address: &str,
    outbox: Receiver<String>,
) {
    if let Err(e) = socket.bind(address) {
        let err = TransportError::BindFailed {
            address: address.to_string(),
            source: e,
        };
        if matches!(e, zmq::Error::ETERM) {
            debug!("[{}] {} (expected - context terminated)", TAG, err);
        } else {
            error!("[{}] {}", TAG, err);
        }
        return;
    }
    info!("🦀 [{}] Publishing on {}", TAG, address);

    let interrupt = signals.interrupt();
    loop {
        let message = select! {
            recv(outbox) -> message => match message {
                Ok(message) => message,
                Err(_) => break,
            },
            recv(interrupt) -> _ => {
                on_loop_error(TAG, &TransportError::Interrupted);
                break;
            }
        };

        debug!("[{}] Publishing: {}", TAG, message);
        if let Err(e) = send_blocking(&socket, message.as_bytes()) {
            if on_loop_error(TAG, &e) == LoopControl::Exit {
                break;
            }
        }
    }

    debug!("[{}] Closing socket...", TAG);
    drop(socket);
    debug!("[{}] Done.", TAG);
}
