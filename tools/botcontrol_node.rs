// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! Command-line node for exercising the socket owners by hand.
//!
//! - `server`: reply server that echoes requests
//! - `client`: sends each stdin line as a request and prints the reply
//! - `subscriber`: prints every message on the configured topics
//! - `publisher`: publishes each stdin line (`<topic> <payload>`)
//!
//! Every mode stops on end of input or a line reading `quit`.

use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use botcontrol::config::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    validate_config, BotControlConfig,
};
use botcontrol::observability::{init_logging, CrateDebugFlags, LogConsole, LogSink, DEFAULT_MAX_LINES};
use botcontrol::prelude::*;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Server,
    Client,
    Subscriber,
    Publisher,
}

struct Args {
    mode: Mode,
    config_path: Option<PathBuf>,
    overrides: HashMap<String, String>,
    debug_flags: CrateDebugFlags,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: botcontrol_node <server|client|subscriber|publisher> [--config <path>] \
         [--host <host>] [--port <port>] [--debug-all | --debug-<crate>]\n\n\
         --host sets the address to bind (server, publisher) or the robot to\n\
         connect to (client, subscriber).\n\
         --port sets the server port (server), the request port (client) or the\n\
         publish port (subscriber, publisher).\n"
    );
    process::exit(2);
}

/// Config key `--host` overrides: servers bind, clients connect
fn host_override_key(mode: Mode) -> &'static str {
    match mode {
        Mode::Server => "server_bind_host",
        Mode::Publisher => "publisher_bind_host",
        Mode::Client | Mode::Subscriber => "host",
    }
}

fn parse_args() -> Args {
    let raw: Vec<String> = env::args().skip(1).collect();
    let debug_flags = CrateDebugFlags::from_args(raw.iter().cloned());

    let mut args = raw.into_iter();
    let mode = match args.next().as_deref() {
        Some("server") => Mode::Server,
        Some("client") => Mode::Client,
        Some("subscriber") => Mode::Subscriber,
        Some("publisher") => Mode::Publisher,
        _ => usage_and_exit(),
    };

    let mut config_path = None;
    let mut overrides = HashMap::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                config_path = Some(PathBuf::from(v));
            }
            "--host" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                overrides.insert(host_override_key(mode).to_string(), v);
            }
            "--port" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                let key = match mode {
                    Mode::Server => "server_port",
                    Mode::Client => "request_port",
                    Mode::Subscriber | Mode::Publisher => "publish_port",
                };
                overrides.insert(key.to_string(), v);
            }
            "-h" | "--help" => usage_and_exit(),
            other if other.starts_with("--debug-") => {}
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        }
    }

    Args {
        mode,
        config_path,
        overrides,
        debug_flags,
    }
}

/// Explicit path, else a discovered `botcontrol.toml`, else built-in defaults
fn resolve_config(args: &Args) -> Result<BotControlConfig> {
    if let Some(path) = &args.config_path {
        return load_config(Some(path.as_path()), Some(&args.overrides))
            .with_context(|| format!("Failed to load {}", path.display()));
    }
    if let Ok(path) = find_config_file() {
        return load_config(Some(path.as_path()), Some(&args.overrides))
            .with_context(|| format!("Failed to load {}", path.display()));
    }

    let mut config = BotControlConfig::default();
    apply_environment_overrides(&mut config);
    apply_cli_overrides(&mut config, &args.overrides);
    validate_config(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Feed stdin lines to `on_line` until EOF or `quit`
fn for_each_input_line(mut on_line: impl FnMut(&str)) -> Result<()> {
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let line = line.trim();
        if line == "quit" {
            break;
        }
        if !line.is_empty() {
            on_line(line);
        }
    }
    Ok(())
}

fn run_server(config: &BotControlConfig) -> Result<()> {
    let server = ZmqReplyServer::new(ServerConfig::from(config))?;
    server.start()?;
    info!("Echo server running; type 'quit' to stop");
    for_each_input_line(|_| {})?;
    server.terminate();
    Ok(())
}

fn run_client(config: &BotControlConfig) -> Result<()> {
    let client = ZmqClient::new(ClientConfig::from(config))?;
    client.start()?;
    for_each_input_line(|line| match client.submit(line, true) {
        Some(reply) => println!("{reply}"),
        None => warn!("No reply to: {}", line),
    })?;
    client.terminate();
    Ok(())
}

fn run_subscriber(config: &BotControlConfig) -> Result<()> {
    let subscriber = ZmqSubscriber::new(SubscriberConfig::from(config))?;
    let (sink, mut console) = LogConsole::new(DEFAULT_MAX_LINES);
    subscriber.set_listener(move |topic, payload| sink.log(&format!("{topic}: {payload}")));
    subscriber.start()?;

    let terminator = subscriber.terminator();
    thread::Builder::new()
        .name("stdin-watch".to_string())
        .spawn(move || {
            if let Err(e) = for_each_input_line(|_| {}) {
                warn!("{:#}", e);
            }
            terminator.terminate();
        })
        .context("Failed to spawn stdin watcher")?;

    while !subscriber.is_terminated() {
        let received = console.pump_timeout(Duration::from_millis(200));
        let skip = console.len().saturating_sub(received);
        for line in console.lines().skip(skip) {
            println!("{line}");
        }
    }
    Ok(())
}

fn run_publisher(config: &BotControlConfig) -> Result<()> {
    let publisher = ZmqPublisher::new(PublisherConfig::from(config))?;
    publisher.start()?;
    for_each_input_line(|line| match TopicMessage::parse(line) {
        Some(message) => {
            if let Err(e) = publisher.publish_message(&message) {
                warn!("Publish failed: {}", e);
            }
        }
        None => warn!("Expected '<topic> <payload>', got: {}", line),
    })?;
    publisher.terminate();
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args();
    let config = resolve_config(&args)?;
    init_logging(&args.debug_flags, &config.logging.level)?;
    info!(
        "botcontrol_node {:?} (robot at {})",
        args.mode,
        config.connection.host
    );

    match args.mode {
        Mode::Server => run_server(&config),
        Mode::Client => run_client(&config),
        Mode::Subscriber => run_subscriber(&config),
        Mode::Publisher => run_publisher(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_targets_bind_address_for_listening_modes() {
        let mut config = BotControlConfig::default();
        let mut overrides = HashMap::new();
        overrides.insert(host_override_key(Mode::Server).to_string(), "127.0.0.1".to_string());
        apply_cli_overrides(&mut config, &overrides);
        assert_eq!(ServerConfig::from(&config).base.endpoint.host, "127.0.0.1");

        let mut config = BotControlConfig::default();
        let mut overrides = HashMap::new();
        overrides.insert(host_override_key(Mode::Publisher).to_string(), "127.0.0.1".to_string());
        apply_cli_overrides(&mut config, &overrides);
        assert_eq!(config.publisher.bind_host, "127.0.0.1");

        assert_eq!(host_override_key(Mode::Client), "host");
        assert_eq!(host_override_key(Mode::Subscriber), "host");
    }
}
