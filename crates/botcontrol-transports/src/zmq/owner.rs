// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! Socket lifecycle owner
//!
//! A ZMQ socket is not thread-safe, so each one lives on exactly one loop
//! thread. [`SocketOwner`] creates the context and socket, hands the socket
//! to that thread on `start`, and tears both down on `terminate`.
//!
//! ## Termination
//!
//! A loop thread may be parked inside `recv`/`send` when termination is
//! requested. Nothing can safely reach into that call, so teardown:
//!
//! 1. drops the interrupt sender, waking loops parked on a queue or a delay;
//! 2. terminates the context, which makes every blocking socket call on it
//!    fail with `ETERM`. The loop treats that as a normal exit and closes its
//!    socket; context termination returns once the socket is closed;
//! 3. joins the loop thread and releases the context.
//!
//! Termination requested from a thread that must not block (see
//! [`crate::blocking`]) or from the loop thread itself (where step 2 would
//! wait on the caller's own socket) runs on a helper thread.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::blocking;
use crate::common::{TransportError, TransportResult};

/// Handed to a loop body alongside its socket
#[derive(Debug, Clone)]
pub struct LoopSignals {
    interrupt: Receiver<()>,
}

impl LoopSignals {
    /// Becomes ready (disconnected) once termination starts; never carries a value
    pub fn interrupt(&self) -> &Receiver<()> {
        &self.interrupt
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self.interrupt.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleep for `duration`; returns `true` if interrupted first
    pub fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return self.is_interrupted();
        }
        matches!(
            self.interrupt.recv_timeout(duration),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

/// What a loop does after a transport error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

/// Log `err` at the level its kind deserves and decide whether the loop goes on
pub(crate) fn on_loop_error(tag: &str, err: &TransportError) -> LoopControl {
    if err.is_termination() {
        debug!("[{}] {} (expected during shutdown)", tag, err);
        LoopControl::Exit
    } else if err.is_socket_fatal() {
        error!("[{}] Socket no longer usable: {}", tag, err);
        LoopControl::Exit
    } else {
        error!("[{}] Unexpected transport fault: {}", tag, err);
        LoopControl::Continue
    }
}

/// Blocking receive of one frame, retried across `EINTR`
pub(crate) fn recv_blocking(socket: &zmq::Socket) -> TransportResult<Vec<u8>> {
    loop {
        match socket.recv_bytes(0) {
            Err(zmq::Error::EINTR) => continue,
            other => return other.map_err(TransportError::from),
        }
    }
}

/// Blocking send of one frame, retried across `EINTR`
pub(crate) fn send_blocking(socket: &zmq::Socket, data: &[u8]) -> TransportResult<()> {
    loop {
        match socket.send(data, 0) {
            Err(zmq::Error::EINTR) => continue,
            other => return other.map_err(TransportError::from),
        }
    }
}

/// Decode a frame as UTF-8, replacing invalid sequences
pub(crate) fn decode_lossy(tag: &str, bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| {
        warn!("[{}] Payload is not valid UTF-8; decoding lossily", tag);
        String::from_utf8_lossy(e.as_bytes()).into_owned()
    })
}

/// Owns one context/socket pair and the thread that drives the socket
pub struct SocketOwner {
    tag: &'static str,
    thread_name: String,

    // Declared before `context`: an unstarted socket must close first.
    socket: Mutex<Option<zmq::Socket>>,
    context: Mutex<Option<zmq::Context>>,

    interrupt: Mutex<Option<Sender<()>>>,
    interrupt_rx: Receiver<()>,
    thread: Mutex<Option<JoinHandle<()>>>,
    /// Run once, on the first `terminate`, before any teardown
    terminate_hooks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,

    started: AtomicBool,
    terminated: AtomicBool,
    released: AtomicBool,
}

impl SocketOwner {
    /// Create a context and a socket of `socket_type` on it
    ///
    /// `tag` prefixes every log line; `thread_name` names the loop thread.
    pub fn new(
        tag: &'static str,
        thread_name: impl Into<String>,
        socket_type: zmq::SocketType,
        linger_ms: i32,
    ) -> TransportResult<Arc<Self>> {
        let context = zmq::Context::new();
        let socket = context.socket(socket_type).map_err(|e| {
            TransportError::InitializationFailed(format!("{:?} socket: {}", socket_type, e))
        })?;
        socket.set_linger(linger_ms)?;

        let (interrupt, interrupt_rx) = channel::unbounded();

        Ok(Arc::new(Self {
            tag,
            thread_name: thread_name.into(),
            socket: Mutex::new(Some(socket)),
            context: Mutex::new(Some(context)),
            interrupt: Mutex::new(Some(interrupt)),
            interrupt_rx,
            thread: Mutex::new(None),
            terminate_hooks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            released: AtomicBool::new(false),
        }))
    }

    /// Run `body` on a new thread with the owned socket
    ///
    /// `body` is the only code that ever touches the socket. It must return
    /// once a socket call reports termination or the interrupt fires; the
    /// socket is closed when `body` drops it.
    pub fn start<F>(&self, body: F) -> TransportResult<()>
    where
        F: FnOnce(zmq::Socket, LoopSignals) + Send + 'static,
    {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(TransportError::AlreadyTerminated);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyRunning);
        }

        let mut thread_slot = self.thread.lock();
        let socket = self
            .socket
            .lock()
            .take()
            .ok_or(TransportError::AlreadyTerminated)?;
        let signals = LoopSignals {
            interrupt: self.interrupt_rx.clone(),
        };

        let tag = self.tag;
        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                debug!("[{}] Loop started", tag);
                body(socket, signals);
                debug!("[{}] Loop finished", tag);
            })?;

        *thread_slot = Some(handle);
        Ok(())
    }

    /// Register non-blocking work to run when termination is first requested
    ///
    /// Hooks run on the terminating thread, whichever handle it used. A hook
    /// registered after termination runs immediately.
    pub(crate) fn on_terminate(&self, hook: impl FnOnce() + Send + 'static) {
        let mut hooks = self.terminate_hooks.lock();
        if self.is_terminated() {
            drop(hooks);
            hook();
            return;
        }
        hooks.push(Box::new(hook));
    }

    /// Request termination; safe from any thread, any number of times
    ///
    /// Only the first call has an effect. When it runs inline it returns
    /// after the loop thread has exited and the context is released.
    pub fn terminate(self: &Arc<Self>) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            warn!("[{}] terminate(): ZMQ context already terminated.", self.tag);
            return;
        }

        let hooks = std::mem::take(&mut *self.terminate_hooks.lock());
        for hook in hooks {
            hook();
        }

        if self.is_owning_thread() || !blocking::current_thread_may_block() {
            debug!("[{}] terminate(): Deferring teardown to a helper thread", self.tag);
            let owner = Arc::clone(self);
            let spawned = thread::Builder::new()
                .name(format!("{}-terminator", self.thread_name))
                .spawn(move || owner.teardown());
            if let Err(e) = spawned {
                error!(
                    "[{}] terminate(): Failed to spawn teardown thread: {}",
                    self.tag, e
                );
                // Best effort: at least stop loops waiting on the interrupt.
                drop(self.interrupt.lock().take());
            }
        } else {
            self.teardown();
        }
    }

    fn teardown(&self) {
        debug!("[{}] terminate(): Interrupting loop...", self.tag);
        drop(self.interrupt.lock().take());

        // A socket that never reached its loop would block context termination.
        drop(self.socket.lock().take());

        let Some(mut context) = self.context.lock().take() else {
            return;
        };

        debug!("[{}] terminate(): Terminating ZMQ context...", self.tag);
        loop {
            match context.destroy() {
                Err(zmq::Error::EINTR) => continue,
                Err(e) => {
                    warn!("[{}] terminate(): Context termination reported: {}", self.tag, e);
                    break;
                }
                Ok(()) => break,
            }
        }

        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                error!("[{}] terminate(): Loop thread panicked", self.tag);
            }
        }

        drop(context);
        self.released.store(true, Ordering::SeqCst);
        debug!("[{}] terminate(): Done.", self.tag);
    }

    fn is_owning_thread(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .map_or(false, |handle| handle.thread().id() == thread::current().id())
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Started, not terminated, and the loop has not exited on its own
    pub fn is_running(&self) -> bool {
        self.is_started()
            && !self.is_terminated()
            && self
                .thread
                .lock()
                .as_ref()
                .map_or(false, |handle| !handle.is_finished())
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Teardown has finished: loop joined, socket closed, context released
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Cloneable handle that can terminate a component from anywhere,
/// including from inside its own handler or listener
#[derive(Clone)]
pub struct Terminator {
    owner: Arc<SocketOwner>,
}

impl Terminator {
    pub(crate) fn new(owner: Arc<SocketOwner>) -> Self {
        Self { owner }
    }

    pub fn terminate(&self) {
        self.owner.terminate();
    }

    pub fn is_terminated(&self) -> bool {
        self.owner.is_terminated()
    }

    pub fn is_released(&self) -> bool {
        self.owner.is_released()
    }
}

impl std::fmt::Debug for Terminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminator")
            .field("tag", &self.owner.tag())
            .field("terminated", &self.owner.is_terminated())
            .finish()
    }
}
