//! Common types and utilities for all socket owners

pub mod config;
pub mod error;
pub mod message;

pub use config::{
    ClientConfig, Endpoint, PublisherConfig, ServerConfig, SubscriberConfig, TransportConfig,
};
pub use error::{TransportError, TransportResult};
pub use message::{RequestRecord, TopicMessage};
