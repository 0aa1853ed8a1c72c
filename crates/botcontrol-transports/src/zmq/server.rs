// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! ZMQ REP server
//!
//! Binds, then answers each request with the handler's result after a fixed
//! response delay. Without a handler requests are echoed back.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::common::{Endpoint, ServerConfig, TransportError, TransportResult};
use crate::traits::{RequestHandler, Transport};
use crate::zmq::owner::{
    decode_lossy, on_loop_error, recv_blocking, send_blocking, LoopControl, LoopSignals,
    SocketOwner, Terminator,
};

const TAG: &str = "ZMQ-SERVER";

/// ZMQ REP server
pub struct ZmqReplyServer {
    owner: Arc<SocketOwner>,
    config: ServerConfig,
    handler: Arc<RwLock<Option<RequestHandler>>>,
}

impl ZmqReplyServer {
    pub fn new(config: ServerConfig) -> TransportResult<Self> {
        config.validate()?;
        let owner = SocketOwner::new(TAG, "zmq-server", zmq::REP, config.base.linger_ms())?;

        Ok(Self {
            owner,
            config,
            handler: Arc::new(RwLock::new(None)),
        })
    }

    /// Create a server bound to `host:port` with default settings
    pub fn with_address(host: &str, port: u16) -> TransportResult<Self> {
        Self::new(ServerConfig::new(Endpoint::tcp(host, port)))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Install the reply function; takes effect from the next request
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        *self.handler.write() = Some(Arc::new(handler));
    }

    /// Go back to echoing requests
    pub fn clear_handler(&self) {
        *self.handler.write() = None;
    }

    pub fn terminator(&self) -> Terminator {
        Terminator::new(Arc::clone(&self.owner))
    }

    pub fn is_released(&self) -> bool {
        self.owner.is_released()
    }
}

impl Transport for ZmqReplyServer {
    fn start(&self) -> TransportResult<()> {
        let address = self.config.base.endpoint.address();
        let handler = Arc::clone(&self.handler);
        let delay = self.config.response_delay;

        self.owner.start(move |socket, signals| {
            run_server_loop(socket, signals, &address, handler, delay)
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
        "zmq-rep"
    }
}

impl Drop for ZmqReplyServer {
    fn drop(&mut self) {
        if !self.owner.is_terminated() {
            error!("[{}] Server dropped without terminate(); terminating now", TAG);
            self.owner.terminate();
        }
    }
}

fn run_server_loop(
    socket: zmq::Socket,
    signals: LoopSignals,
    address: &str,
    handler: Arc<RwLock<Option<RequestHandler>>>,
    delay: Duration,
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
    info!("🦀 [{}] Listening on {}", TAG, address);

    loop {
        let request = match recv_blocking(&socket) {
            Ok(bytes) => decode_lossy(TAG, bytes),
            Err(e) => match on_loop_error(TAG, &e) {
                LoopControl::Continue => continue,
                LoopControl::Exit => break,
            },
        };
        debug!("[{}] Received: {}", TAG, request);

        // Release the lock before calling out: handlers may replace themselves
        let current = handler.read().clone();
        let reply = match current {
            Some(handler) => handler(&request),
            None => request,
        };

        if signals.sleep(delay) {
            on_loop_error(TAG, &TransportError::Interrupted);
            break;
        }

        debug!("[{}] Sending: {}", TAG, reply);
        if let Err(e) = send_blocking(&socket, reply.as_bytes()) {
            if on_loop_error(TAG, &e) == LoopControl::Exit {
                break;
            }
        }
    }

    debug!("[{}] Closing socket...", TAG);
    drop(socket);
    debug!("[{}] Done.", TAG);
}
