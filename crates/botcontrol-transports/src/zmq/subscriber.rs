// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! ZMQ SUB client
//!
//! Connects to a publisher, subscribes to a fixed set of topic prefixes and
//! hands each `"<topic> <payload>"` message to a listener.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::common::{Endpoint, SubscriberConfig, TopicMessage, TransportError, TransportResult};
use crate::traits::{MessageListener, Transport};
use crate::zmq::owner::{on_loop_error, LoopControl, LoopSignals, SocketOwner, Terminator};

const TAG: &str = "ZMQ-SUB";

/// ZMQ SUB client
pub struct ZmqSubscriber {
    owner: Arc<SocketOwner>,
    config: SubscriberConfig,
    /// Applied once, when the loop starts
    topics: Mutex<Vec<String>>,
    listener: Arc<RwLock<Option<MessageListener>>>,
}

impl ZmqSubscriber {
    pub fn new(config: SubscriberConfig) -> TransportResult<Self> {
        config.validate()?;
        let owner = SocketOwner::new(TAG, "zmq-sub", zmq::SUB, config.base.linger_ms())?;
        let topics = Mutex::new(config.topics.clone());

        Ok(Self {
            owner,
            config,
            topics,
            listener: Arc::new(RwLock::new(None)),
        })
    }

    /// Create a subscriber for `host:port` that receives every topic
    pub fn with_address(host: &str, port: u16) -> TransportResult<Self> {
        Self::new(SubscriberConfig::new(Endpoint::tcp(host, port)))
    }

    pub fn config(&self) -> &SubscriberConfig {
        &self.config
    }

    /// Replace the topic prefixes; only allowed before `start`
    ///
    /// An empty list subscribes to everything. After `start` the change is
    /// rejected with `AlreadyRunning` and the active subscriptions stay as
    /// they were.
    pub fn set_topics<I, S>(&self, topics: I) -> TransportResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut current = self.topics.lock();
        if self.owner.is_started() {
            warn!("[{}] Topics can only be set before start(); ignoring", TAG);
            return Err(TransportError::AlreadyRunning);
        }
        *current = topics.into_iter().map(Into::into).collect();
        Ok(())
    }

    pub fn topics(&self) -> Vec<String> {
        self.topics.lock().clone()
    }

    /// Install the message callback; may be changed at any time
    pub fn set_listener<F>(&self, listener: F)
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        *self.listener.write() = Some(Arc::new(listener));
    }

    pub fn clear_listener(&self) {
        *self.listener.write() = None;
    }

    pub fn terminator(&self) -> Terminator {
        Terminator::new(Arc::clone(&self.owner))
    }

    pub fn is_released(&self) -> bool {
        self.owner.is_released()
    }
}

impl Transport for ZmqSubscriber {
    fn start(&self) -> TransportResult<()> {
        // Held across start so set_topics cannot slip in between
        let topics = self.topics.lock();
        let address = self.config.base.endpoint.address();
        let subscriptions = topics.clone();
        let listener = Arc::clone(&self.listener);
        let loop_delay = self.config.loop_delay;

        self.owner.start(move |socket, signals| {
            run_subscriber_loop(socket, signals, &address, &subscriptions, listener, loop_delay)
        })
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
        "zmq-sub"
    }
}

impl Drop for ZmqSubscriber {
    fn drop(&mut self) {
        if !self.owner.is_terminated() {
            error!("[{}] Subscriber dropped without terminate(); terminating now", TAG);
            self.owner.terminate();
        }
    }
}

fn subscribe_all(socket: &zmq::Socket, topics: &[String]) -> TransportResult<()> {
    if topics.is_empty() {
        socket.set_subscribe(b"")?;
        debug!("[{}] Subscribed to all topics", TAG);
        return Ok(());
    }
    for topic in topics {
        socket.set_subscribe(topic.as_bytes())?;
        debug!("[{}] Subscribed to topic: {}", TAG, topic);
    }
    Ok(())
}

/// Decode one received message, or `None` if it must be dropped
fn decode_message(parts: Vec<Vec<u8>>) -> Option<TopicMessage> {
    if parts.len() != 1 {
        warn!("[{}] Ignoring {}-part message", TAG, parts.len());
        return None;
    }
    let bytes = parts.into_iter().next()?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => {
            warn!("[{}] Ignoring message that is not valid UTF-8", TAG);
            return None;
        }
    };
    debug!("[{}] Received: {}", TAG, text);
    let message = TopicMessage::parse(&text);
    if message.is_none() {
        warn!("[{}] Ignoring malformed message: {:?}", TAG, text);
    }
    message
}

fn recv_parts(socket: &zmq::Socket) -> TransportResult<Vec<Vec<u8>>> {
    loop {
        match socket.recv_multipart(0) {
            Err(zmq::Error::EINTR) => continue,
            other => return other.map_err(TransportError::from),
        }
    }
}

fn run_subscriber_loop(
    socket: zmq::Socket,
    signals: LoopSignals,
    address: &str,
    topics: &[String],
    listener: Arc<RwLock<Option<MessageListener>>>,
    loop_delay: Duration,
) {
    if let Err(e) = socket.connect(address) {
        let err = TransportError::ConnectFailed {
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
    if let Err(e) = subscribe_all(&socket, topics) {
        on_loop_error(TAG, &e);
        return;
    }
    info!("🦀 [{}] Connected to {}", TAG, address);

    loop {
        let parts = match recv_parts(&socket) {
            Ok(parts) => parts,
            Err(e) => match on_loop_error(TAG, &e) {
                LoopControl::Continue => continue,
                LoopControl::Exit => break,
            },
        };

        if let Some(message) = decode_message(parts) {
            let current = listener.read().clone();
            match current {
                Some(listener) => listener(&message.topic, &message.payload),
                None => debug!("[{}] No listener; dropped message on {}", TAG, message.topic),
            }
        }

        if signals.sleep(loop_delay) {
            on_loop_error(TAG, &TransportError::Interrupted);
            break;
        }
    }

    debug!("[{}] Closing socket...", TAG);
    drop(socket);
    debug!("[{}] Done.", TAG);
}
