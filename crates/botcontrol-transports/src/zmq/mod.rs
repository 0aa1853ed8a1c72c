// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! ZMQ socket owners
//!
//! Each component owns one context and one socket, driven by its own loop
//! thread:
//! - **Request-Reply**: [`ZmqClient`] (REQ) ↔ [`ZmqReplyServer`] (REP)
//! - **Publish-Subscribe**: [`ZmqPublisher`] (PUB) ↔ [`ZmqSubscriber`] (SUB)
//!
//! ## Example (Client)
//!
//! ```no_run
//! use botcontrol_transports::zmq::ZmqClient;
//! use botcontrol_transports::traits::Transport;
//!
//! let client = ZmqClient::with_address("10.2.1.1", 60000)?;
//! client.start()?;
//!
//! let reply = client.service_request_sync("turret_pitch 42.5");
//! println!("Reply: {:?}", reply);
//! client.terminate();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod client;
pub mod owner;
pub mod publisher;
pub mod server;
pub mod subscriber;

pub use client::ZmqClient;
pub use owner::{LoopSignals, SocketOwner, Terminator};
pub use publisher::ZmqPublisher;
pub use server::ZmqReplyServer;
pub use subscriber::ZmqSubscriber;
