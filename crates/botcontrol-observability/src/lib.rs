// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! # botcontrol-observability
//!
//! Logging infrastructure shared by the BotControl crates.
//!
//! - [`init`]: installs a `tracing-subscriber` console layer filtered by
//!   per-crate debug flags
//! - [`cli`]: parses `--debug-<crate>` flags and `BOTCONTROL_DEBUG`
//! - [`sink`]: marshals log lines produced on background loop threads to a
//!   single consumer (a console view, a UI widget, a test)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;
pub mod sink;

pub use cli::*;
pub use init::*;
pub use sink::{ChannelLogSink, LogConsole, LogSink, DEFAULT_MAX_LINES};

/// Known BotControl crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "botcontrol",
    "botcontrol-config",
    "botcontrol-observability",
    "botcontrol-transports",
];
