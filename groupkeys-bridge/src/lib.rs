//! Messaging bridge between the AMQP bus and the key store
//!
//! Listens on the request topic space for group key management requests,
//! runs the matching workflow against the store, and publishes a correlated
//! status response on the companion topic space.

pub mod bridge;
pub mod connection;
pub mod error;
pub mod publisher;
pub mod router;
pub mod topics;
pub mod workflow;

pub use bridge::MessageBridge;
pub use connection::ConnectionProvider;
pub use error::BridgeError;
pub use publisher::ResponsePublisher;
pub use router::TopicRouter;
pub use topics::{RequestTopic, ResponseTopic};
pub use workflow::{StatusPublisher, WorkflowExecutor};
