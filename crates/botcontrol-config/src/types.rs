// Copyright 2025 NCSU IEEE Robotics
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `botcontrol.toml`.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BotControlConfig {
    pub connection: ConnectionConfig,
    pub client: ClientSection,
    pub server: ServerSection,
    pub subscriber: SubscriberSection,
    pub publisher: PublisherSection,
    pub logging: LoggingSection,
}

/// Remote robot controller address
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Transport scheme, e.g. `tcp`
    pub protocol: String,
    /// Host the client and subscriber connect to
    pub host: String,
    /// Port of the robot's request/reply endpoint
    pub request_port: u16,
    /// Port of the robot's publish endpoint
    pub publish_port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            protocol: "tcp".to_string(),
            host: "127.0.0.1".to_string(),
            request_port: 60000,
            publish_port: 60001,
        }
    }
}

/// Request/reply client settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClientSection {
    /// Number of requests that may wait in the queue before producers block
    pub queue_capacity: usize,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self { queue_capacity: 10 }
    }
}

/// Local reply server settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerSection {
    pub bind_host: String,
    pub port: u16,
    /// Artificial delay before each reply, used to throttle blocking clients
    pub response_delay_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 61000,
            response_delay_ms: 500,
        }
    }
}

/// Subscriber settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SubscriberSection {
    /// Topic prefixes; empty means every message
    pub topics: Vec<String>,
    /// Pause between delivered messages
    pub loop_delay_ms: u64,
}

impl Default for SubscriberSection {
    fn default() -> Self {
        Self {
            topics: vec![
                "turret_pitch".to_string(),
                "turret_yaw".to_string(),
                "ir".to_string(),
            ],
            loop_delay_ms: 100,
        }
    }
}

/// Publisher settings (binds on `connection.publish_port`)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PublisherSection {
    pub bind_host: String,
    pub queue_capacity: usize,
}

impl Default for PublisherSection {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            queue_capacity: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ConnectionConfig {
    /// `protocol://host:request_port`
    pub fn request_address(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.request_port)
    }

    /// `protocol://host:publish_port`
    pub fn publish_address(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.publish_port)
    }
}
