//! Per-component configuration types

use botcontrol_config::BotControlConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::common::error::{TransportError, TransportResult};

/// Default port of a local reply server
pub const DEFAULT_SERVER_PORT: u16 = 61000;
/// Default port of the robot's publish endpoint
pub const DEFAULT_PUBLISH_PORT: u16 = 60001;
/// Requests a client keeps queued before producers block
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;
pub const DEFAULT_RESPONSE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_LOOP_DELAY: Duration = Duration::from_millis(100);

/// `scheme://host:port`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoint {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(protocol: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol: protocol.into(),
            host: host.into(),
            port,
        }
    }

    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::new("tcp", host, port)
    }

    /// Rendered address passed to `connect`/`bind`
    pub fn address(&self) -> String {
        self.to_string()
    }

    pub fn validate(&self) -> TransportResult<()> {
        if self.protocol.trim().is_empty() {
            return Err(TransportError::InvalidConfig(
                "Protocol cannot be empty".to_string(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(TransportError::InvalidConfig("Host cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(TransportError::InvalidConfig("Port cannot be 0".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Settings every socket owner shares
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportConfig {
    /// Address to bind (server roles) or connect (client roles)
    pub endpoint: Endpoint,

    /// How long unsent messages may hold up termination (None = drop immediately)
    pub linger: Option<Duration>,
}

impl TransportConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            linger: None,
        }
    }

    /// Linger value in the form `zmq_setsockopt` expects
    pub fn linger_ms(&self) -> i32 {
        self.linger
            .map(|l| l.as_millis().min(i32::MAX as u128) as i32)
            .unwrap_or(0)
    }

    pub fn validate(&self) -> TransportResult<()> {
        self.endpoint.validate()
    }
}

/// Request/reply client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(flatten)]
    pub base: TransportConfig,

    /// Bound of the request queue
    pub queue_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base: TransportConfig::new(Endpoint::tcp("127.0.0.1", DEFAULT_SERVER_PORT)),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            base: TransportConfig::new(endpoint),
            ..Default::default()
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.base.linger = Some(linger);
        self
    }

    pub fn validate(&self) -> TransportResult<()> {
        self.base.validate()?;
        if self.queue_capacity == 0 {
            return Err(TransportError::InvalidConfig(
                "Queue capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reply server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub base: TransportConfig,

    /// Pause between computing a reply and sending it
    pub response_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base: TransportConfig::new(Endpoint::tcp("0.0.0.0", DEFAULT_SERVER_PORT)),
            response_delay: DEFAULT_RESPONSE_DELAY,
        }
    }
}

impl ServerConfig {
    pub fn new(bind: Endpoint) -> Self {
        Self {
            base: TransportConfig::new(bind),
            ..Default::default()
        }
    }

    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    pub fn validate(&self) -> TransportResult<()> {
        self.base.validate()
    }
}

/// Subscriber configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriberConfig {
    #[serde(flatten)]
    pub base: TransportConfig,

    /// Topic prefixes applied when the loop starts (empty = everything)
    pub topics: Vec<String>,

    /// Pause after each delivered message
    pub loop_delay: Duration,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            base: TransportConfig::new(Endpoint::tcp("127.0.0.1", DEFAULT_PUBLISH_PORT)),
            topics: Vec::new(),
            loop_delay: DEFAULT_LOOP_DELAY,
        }
    }
}

impl SubscriberConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            base: TransportConfig::new(endpoint),
            ..Default::default()
        }
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_loop_delay(mut self, delay: Duration) -> Self {
        self.loop_delay = delay;
        self
    }

    pub fn validate(&self) -> TransportResult<()> {
        self.base.validate()
    }
}

/// Publisher configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublisherConfig {
    #[serde(flatten)]
    pub base: TransportConfig,

    /// Messages waiting to be published before `publish` reports `QueueFull`
    pub queue_capacity: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            base: TransportConfig::new(Endpoint::tcp("0.0.0.0", DEFAULT_PUBLISH_PORT)),
            queue_capacity: 100,
        }
    }
}

impl PublisherConfig {
    pub fn new(bind: Endpoint) -> Self {
        Self {
            base: TransportConfig::new(bind),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> TransportResult<()> {
        self.base.validate()?;
        if self.queue_capacity == 0 {
            return Err(TransportError::InvalidConfig(
                "Queue capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&BotControlConfig> for ClientConfig {
    fn from(config: &BotControlConfig) -> Self {
        let c = &config.connection;
        Self::new(Endpoint::new(&c.protocol, &c.host, c.request_port))
            .with_queue_capacity(config.client.queue_capacity)
    }
}

impl From<&BotControlConfig> for ServerConfig {
    fn from(config: &BotControlConfig) -> Self {
        let s = &config.server;
        Self::new(Endpoint::new(&config.connection.protocol, &s.bind_host, s.port))
            .with_response_delay(Duration::from_millis(s.response_delay_ms))
    }
}

impl From<&BotControlConfig> for SubscriberConfig {
    fn from(config: &BotControlConfig) -> Self {
        let c = &config.connection;
        Self::new(Endpoint::new(&c.protocol, &c.host, c.publish_port))
            .with_topics(config.subscriber.topics.iter().cloned())
            .with_loop_delay(Duration::from_millis(config.subscriber.loop_delay_ms))
    }
}

impl From<&BotControlConfig> for PublisherConfig {
    fn from(config: &BotControlConfig) -> Self {
        let c = &config.connection;
        let mut publisher = Self::new(Endpoint::new(
            &c.protocol,
            &config.publisher.bind_host,
            c.publish_port,
        ));
        publisher.queue_capacity = config.publisher.queue_capacity;
        publisher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_address() {
        assert_eq!(Endpoint::tcp("10.2.1.1", 60000).address(), "tcp://10.2.1.1:60000");
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert!(Endpoint::tcp("", 60000).validate().is_err());
        assert!(Endpoint::tcp("127.0.0.1", 0).validate().is_err());
        assert!(ClientConfig::default().with_queue_capacity(0).validate().is_err());
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn test_linger_defaults_to_immediate_close() {
        let config = ClientConfig::default();
        assert_eq!(config.base.linger_ms(), 0);
        let config = config.with_linger(Duration::from_millis(250));
        assert_eq!(config.base.linger_ms(), 250);
    }

    #[test]
    fn test_from_file_config() {
        let mut file = BotControlConfig::default();
        file.connection.host = "10.2.1.1".to_string();
        file.server.response_delay_ms = 0;

        let client = ClientConfig::from(&file);
        assert_eq!(client.base.endpoint.address(), "tcp://10.2.1.1:60000");
        assert_eq!(client.queue_capacity, 10);

        let server = ServerConfig::from(&file);
        assert_eq!(server.base.endpoint.address(), "tcp://0.0.0.0:61000");
        assert_eq!(server.response_delay, Duration::ZERO);

        let subscriber = SubscriberConfig::from(&file);
        assert_eq!(subscriber.base.endpoint.address(), "tcp://10.2.1.1:60001");
        assert_eq!(subscriber.topics, vec!["turret_pitch", "turret_yaw", "ir"]);

        let publisher = PublisherConfig::from(&file);
        assert_eq!(publisher.base.endpoint.address(), "tcp://0.0.0.0:60001");
    }
}
