// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! ZMQ REQ client with a bounded request queue
//!
//! Any number of threads submit requests; one loop thread owns the REQ socket
//! and services them strictly in queue order, one send/receive exchange at a
//! time. Callers either block for the reply, poll a [`RequestRecord`], or use
//! the single-slot call that drops the request when another is outstanding.

use crossbeam::channel::{self, select, Receiver, SendError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::common::{ClientConfig, Endpoint, RequestRecord, TransportError, TransportResult};
use crate::traits::Transport;
use crate::zmq::owner::{
    decode_lossy, on_loop_error, recv_blocking, send_blocking, LoopControl, LoopSignals,
    SocketOwner, Terminator,
};

const TAG: &str = "ZMQ-CLIENT";

/// ZMQ REQ client
pub struct ZmqClient {
    owner: Arc<SocketOwner>,
    config: ClientConfig,
    requests: Sender<Arc<RequestRecord>>,
    /// Held until `start` moves it into the loop
    pending_requests: Arc<Mutex<Option<Receiver<Arc<RequestRecord>>>>>,
    /// Records submitted and not yet serviced
    outstanding: Arc<AtomicUsize>,
}

impl ZmqClient {
    /// Create a client; nothing connects until [`start`](Transport::start)
    pub fn new(config: ClientConfig) -> TransportResult<Self> {
        config.validate()?;
        let owner = SocketOwner::new(TAG, "zmq-client", zmq::REQ, config.base.linger_ms())?;
        let (requests, pending) = channel::bounded(config.queue_capacity);
        let pending_requests = Arc::new(Mutex::new(Some(pending)));
        let release = Arc::clone(&pending_requests);
        // Producers blocked on a never-started queue must see disconnection
        owner.on_terminate(move || drop(release.lock().take()));

        Ok(Self {
            owner,
            config,
            requests,
            pending_requests,
            outstanding: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Create a client for `host:port` with default settings
    pub fn with_address(host: &str, port: u16) -> TransportResult<Self> {
        Self::new(ClientConfig::new(Endpoint::tcp(host, port)))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Submit and block until the reply arrives
    ///
    /// Blocks while the queue is full. Returns `None` if the request was
    /// rejected (client terminated) or the exchange failed. There is no
    /// timeout: a request dropped by termination after it was queued leaves
    /// this call waiting forever; use
    /// [`service_request_async`](Self::service_request_async) with
    /// [`RequestRecord::wait_timeout`] to bound the wait.
    pub fn service_request_sync(&self, payload: impl Into<String>) -> Option<String> {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let record = self.enqueue(payload.into());
        record.wait()
    }

    /// Submit and return the record immediately
    ///
    /// Blocks only while the queue is full. A rejected request comes back
    /// already serviced with no reply.
    pub fn service_request_async(&self, payload: impl Into<String>) -> Arc<RequestRecord> {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.enqueue(payload.into())
    }

    /// Submit only if nothing else is outstanding, then block for the reply
    ///
    /// Returns `None` without sending when another request is queued or in
    /// flight, so at most one single-slot request is ever pending.
    pub fn service_request_single_sync(&self, payload: impl Into<String>) -> Option<String> {
        let payload = payload.into();
        if self
            .outstanding
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("[{}] Request outstanding; dropped request: {}", TAG, payload);
            return None;
        }
        let record = self.enqueue(payload);
        record.wait()
    }

    /// `blocking` selects [`service_request_sync`](Self::service_request_sync),
    /// otherwise [`service_request_single_sync`](Self::service_request_single_sync)
    pub fn submit(&self, payload: impl Into<String>, blocking: bool) -> Option<String> {
        if blocking {
            self.service_request_sync(payload)
        } else {
            self.service_request_single_sync(payload)
        }
    }

    /// Records submitted and not yet serviced
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Handle that terminates this client from any thread
    pub fn terminator(&self) -> Terminator {
        Terminator::new(Arc::clone(&self.owner))
    }

    /// Whether teardown has fully completed
    pub fn is_released(&self) -> bool {
        self.owner.is_released()
    }

    /// Queue a record the caller has already counted in `outstanding`
    fn enqueue(&self, payload: String) -> Arc<RequestRecord> {
        let record = Arc::new(RequestRecord::new(payload));

        if self.owner.is_terminated() {
            warn!("[{}] Client terminated; dropped request: {}", TAG, record.payload());
            self.reject(&record);
            return record;
        }

        debug!("[{}] Queueing: {}", TAG, record.payload());
        if let Err(SendError(record)) = self.requests.send(Arc::clone(&record)) {
            warn!("[{}] Request loop has exited; dropped request: {}", TAG, record.payload());
            self.reject(&record);
        }
        record
    }

    fn reject(&self, record: &RequestRecord) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        record.complete(None);
    }

    fn lifecycle_error(&self) -> TransportError {
        if self.owner.is_terminated() {
            TransportError::AlreadyTerminated
        } else {
            TransportError::AlreadyRunning
        }
    }
}

impl Transport for ZmqClient {
    fn start(&self) -> TransportResult<()> {
        let mut pending = self.pending_requests.lock();
        let requests = pending.take().ok_or_else(|| self.lifecycle_error())?;

        let address = self.config.base.endpoint.address();
        let outstanding = Arc::clone(&self.outstanding);
        let loop_requests = requests.clone();

        match self.owner.start(move |socket, signals| {
            run_client_loop(socket, signals, &address, loop_requests, outstanding)
        }) {
            // Only the loop holds a receiver from here on
            Ok(()) => Ok(()),
            Err(e) => {
                if !self.owner.is_terminated() {
                    *pending = Some(requests);
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
        "zmq-req"
    }
}

impl Drop for ZmqClient {
    fn drop(&mut self) {
        if !self.owner.is_terminated() {
            error!("[{}] Client dropped without terminate(); terminating now", TAG);
            self.terminate();
        }
    }
}

fn run_client_loop(
    socket: zmq::Socket,
    signals: LoopSignals,
    address: &str,
    requests: Receiver<Arc<RequestRecord>>,
    outstanding: Arc<AtomicUsize>,
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
    info!("🦀 [{}] Connected to {}", TAG, address);

    let interrupt = signals.interrupt();
    loop {
        let record = select! {
            recv(requests) -> record => match record {
                Ok(record) => record,
                Err(_) => {
                    debug!("[{}] Request queue closed", TAG);
                    break;
                }
            },
            recv(interrupt) -> _ => {
                on_loop_error(TAG, &TransportError::Interrupted);
                break;
            }
        };

        debug!("[{}] Sending: {}", TAG, record.payload());
        match exchange(&socket, record.payload()) {
            Ok(reply) => {
                debug!("[{}] Received: {}", TAG, reply);
                // Free the slot before waking the caller
                outstanding.fetch_sub(1, Ordering::SeqCst);
                record.complete(Some(reply));
            }
            Err(e) => {
                let control = on_loop_error(TAG, &e);
                if e.is_termination() {
                    break;
                }
                outstanding.fetch_sub(1, Ordering::SeqCst);
                record.complete(None);
                if control == LoopControl::Exit {
                    break;
                }
            }
        }
    }

    debug!("[{}] Closing socket...", TAG);
    drop(socket);
    debug!("[{}] Done.", TAG);
}

/// One REQ round trip
fn exchange(socket: &zmq::Socket, payload: &str) -> TransportResult<String> {
    send_blocking(socket, payload.as_bytes())?;
    let reply = recv_blocking(socket)?;
    Ok(decode_lossy(TAG, reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unstarted_client(capacity: usize) -> ZmqClient {
        let config = ClientConfig::new(Endpoint::tcp("127.0.0.1", 31999))
            .with_queue_capacity(capacity);
        ZmqClient::new(config).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ClientConfig::default().with_queue_capacity(0);
        assert!(matches!(
            ZmqClient::new(config),
            Err(TransportError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_requests_after_terminate_are_rejected() {
        let client = unstarted_client(2);
        client.terminate();

        assert_eq!(client.service_request_sync("PING"), None);
        assert_eq!(client.service_request_single_sync("PING"), None);

        let record = client.service_request_async("PING");
        assert!(record.is_serviced());
        assert_eq!(record.reply(), None);
        assert_eq!(client.outstanding(), 0);
    }

    #[test]
    fn test_single_slot_drops_when_outstanding() {
        let client = unstarted_client(2);
        // Queued but never serviced: the loop has not started
        let record = client.service_request_async("first");
        assert!(!record.is_serviced());
        assert_eq!(client.outstanding(), 1);

        assert_eq!(client.service_request_single_sync("second"), None);
        assert_eq!(client.outstanding(), 1);
        client.terminate();
    }

    #[test]
    fn test_terminator_releases_producer_blocked_on_full_queue() {
        let client = Arc::new(unstarted_client(1));
        let first = client.service_request_async("one");
        assert!(!first.is_serviced());

        let (done_tx, done_rx) = channel::bounded(1);
        let producer = Arc::clone(&client);
        let handle = std::thread::spawn(move || {
            let record = producer.service_request_async("two");
            done_tx.send(record).unwrap();
        });

        // Queue is full and nothing drains it
        assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());

        client.terminator().terminate();

        let second = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("producer still blocked after terminate");
        assert!(second.is_serviced());
        assert_eq!(second.reply(), None);
        handle.join().unwrap();

        assert!(client.is_terminated());
        assert!(client.is_released());
        assert!(client.pending_requests.lock().is_none());
        assert_eq!(client.outstanding(), 1);
    }

    #[test]
    fn test_start_after_terminate_fails() {
        let client = unstarted_client(1);
        client.terminate();
        assert!(matches!(client.start(), Err(TransportError::AlreadyTerminated)));
        assert!(client.is_released());
        assert!(!client.is_running());
    }

    #[test]
    fn test_start_twice_fails() {
        let client = unstarted_client(1);
        client.start().unwrap();
        assert!(matches!(client.start(), Err(TransportError::AlreadyRunning)));
        client.terminate();
        assert!(client.is_released());
    }
}
