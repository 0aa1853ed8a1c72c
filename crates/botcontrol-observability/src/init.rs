// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for BotControl processes

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::{parse_debug_flags, CrateDebugFlags};

/// Build the filter used by [`init_logging`]
///
/// A non-empty `RUST_LOG` takes precedence over the debug flags.
pub fn build_filter(debug_flags: &CrateDebugFlags, base_level: &str) -> Result<EnvFilter> {
    if let Ok(directives) = std::env::var("RUST_LOG") {
        if !directives.trim().is_empty() {
            return EnvFilter::try_new(&directives)
                .with_context(|| format!("Invalid RUST_LOG directives: {}", directives));
        }
    }

    let directives = debug_flags.to_filter_string(base_level);
    EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter: {}", directives))
}

/// Install a console subscriber for the whole process
///
/// Thread names are included in every line because each socket owner logs
/// from its own loop thread.
///
/// # Errors
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_logging(debug_flags: &CrateDebugFlags, base_level: &str) -> Result<()> {
    let filter = build_filter(debug_flags, base_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

/// Initialize logging from process arguments, `BOTCONTROL_DEBUG` and `RUST_LOG`
pub fn init_logging_default() -> Result<()> {
    init_logging(&parse_debug_flags(), "info")
}
