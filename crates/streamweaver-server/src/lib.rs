//! StreamWeaver Broker Server
//!
//! gRPC surface plus process wiring: configuration loading, subsystem
//! construction, and graceful shutdown.

pub mod config;
pub mod service;

pub use config::{BrokerConfig, ConfigError};
pub use service::StreamWeaverBrokerService;
