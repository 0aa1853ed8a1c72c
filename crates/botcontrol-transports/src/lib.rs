//! # botcontrol-transports
//!
//! Socket ownership and request coordination for talking to a robot over
//! ZeroMQ.
//!
//! ZMQ sockets are not thread-safe, so every component here owns exactly one
//! socket on exactly one loop thread and exposes a thread-safe API around it:
//!
//! - **Client** ([`ZmqClient`]): REQ socket fed by a bounded FIFO request
//!   queue; synchronous, asynchronous and single-slot calls
//! - **Server** ([`ZmqReplyServer`]): REP socket answering with a handler
//!   after a configurable response delay
//! - **Subscriber** ([`ZmqSubscriber`]): SUB socket filtering on topic
//!   prefixes and feeding a listener
//! - **Publisher** ([`ZmqPublisher`]): PUB socket fed by a bounded outbox
//!
//! All of them share the termination protocol in [`zmq::owner`]: termination
//! is idempotent, unblocks a loop parked in `recv`, and never blocks a thread
//! marked with [`blocking::mark_current_thread_nonblocking`].
//!
//! ## Feature Flags
//!
//! - `tokio`: treat threads driving a Tokio runtime as non-blocking
//!
//! ## Example: Request-Reply
//!
//! ```no_run
//! use botcontrol_transports::prelude::*;
//!
//! let server = ZmqReplyServer::with_address("127.0.0.1", 61000)?;
//! server.set_handler(|request| format!("ack {}", request));
//! server.start()?;
//!
//! let client = ZmqClient::with_address("127.0.0.1", 61000)?;
//! client.start()?;
//! assert_eq!(client.service_request_sync("PING").as_deref(), Some("ack PING"));
//!
//! client.terminate();
//! server.terminate();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Example: Publish-Subscribe
//!
//! ```no_run
//! use botcontrol_transports::prelude::*;
//!
//! let subscriber = ZmqSubscriber::new(
//!     SubscriberConfig::new(Endpoint::tcp("10.2.1.1", 60001)).with_topics(["turret_pitch"]),
//! )?;
//! subscriber.set_listener(|topic, payload| println!("{}: {}", topic, payload));
//! subscriber.start()?;
//! # subscriber.terminate();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod blocking;
pub mod common;
pub mod traits;
pub mod zmq;

// Re-export commonly used types
pub use common::{
    ClientConfig, Endpoint, PublisherConfig, RequestRecord, ServerConfig, SubscriberConfig,
    TopicMessage, TransportConfig, TransportError, TransportResult,
};

pub use traits::{MessageListener, RequestHandler, Transport};

pub use crate::zmq::{Terminator, ZmqClient, ZmqPublisher, ZmqReplyServer, ZmqSubscriber};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::common::*;
    pub use crate::traits::*;
    pub use crate::zmq::{Terminator, ZmqClient, ZmqPublisher, ZmqReplyServer, ZmqSubscriber};
}
