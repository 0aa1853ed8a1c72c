//! # BotControl
//!
//! Socket ownership and request coordination for remotely controlling a robot
//! over ZeroMQ. The robot exposes a request/reply endpoint for commands and a
//! publish endpoint for telemetry; this crate provides the client-side loops
//! that talk to them, plus a reply server and publisher for local testing.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! botcontrol = "0.1"  # Default: config + observability
//! ```
//!
//! ## Feature Flags
//!
//! - **`config`** (default): `botcontrol.toml` loading with environment and CLI overrides
//! - **`observability`** (default): logging initialisation and the cross-thread log console
//! - **`tokio`**: treat Tokio runtime threads as threads that must not block
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use botcontrol::prelude::*;
//!
//! let config = botcontrol::config::load_config(None, None)?;
//!
//! let client = ZmqClient::new(ClientConfig::from(&config))?;
//! client.start()?;
//!
//! let subscriber = ZmqSubscriber::new(SubscriberConfig::from(&config))?;
//! subscriber.set_listener(|topic, payload| println!("{}: {}", topic, payload));
//! subscriber.start()?;
//!
//! if let Some(reply) = client.submit("turret_pitch 42.5", true) {
//!     println!("robot: {}", reply);
//! }
//!
//! subscriber.terminate();
//! client.terminate();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export I/O layer
pub use botcontrol_transports as transports;

// Re-export foundation
#[cfg(feature = "config")]
pub use botcontrol_config as config;

#[cfg(feature = "observability")]
pub use botcontrol_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::transports::prelude::*;

    #[cfg(feature = "config")]
    pub use crate::config::{load_config, BotControlConfig};

    #[cfg(feature = "observability")]
    pub use crate::observability::{ChannelLogSink, LogConsole, LogSink};
}
