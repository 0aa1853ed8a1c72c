// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! Transport trait definitions
//!
//! Every socket-owning component (client, server, subscriber, publisher)
//! shares the same lifecycle: construct, `start` once, `terminate` once.

use std::sync::Arc;

use crate::common::TransportResult;

/// Computes the reply for one request
pub type RequestHandler = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Receives `(topic, payload)` for each message that matched a subscription
pub type MessageListener = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Base transport trait - implemented by all socket owners
pub trait Transport: Send + Sync {
    /// Spawn the socket loop
    ///
    /// Fails with `AlreadyRunning` on a second call and `AlreadyTerminated`
    /// after `terminate`.
    fn start(&self) -> TransportResult<()>;

    /// Stop the loop and release the socket and context
    ///
    /// Idempotent. Returns once resources are released, except on threads
    /// that may not block (or the loop thread itself), where teardown
    /// continues in the background.
    fn terminate(&self);

    /// Loop thread is alive and termination has not been requested
    fn is_running(&self) -> bool;

    /// `terminate` has been called
    fn is_terminated(&self) -> bool;

    /// Get transport name/type
    fn transport_type(&self) -> &str;
}
