//! Status response publishing
//!
//! Publishes the status envelope to the outbound topic exchange with the
//! response routing key. No queue is declared here; response consumers own
//! their queues and bindings.

use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
    BasicProperties, Connection, ExchangeKind,
};
use tracing::error;

use groupkeys_core::models::StatusResponse;

use crate::connection::ConnectionProvider;
use crate::error::Result;
use crate::topics::{ResponseTopic, RESPONSE_EXCHANGE};
use crate::workflow::StatusPublisher;

pub struct ResponsePublisher {
    provider: ConnectionProvider,
}

impl ResponsePublisher {
    #[must_use]
    pub const fn new(provider: ConnectionProvider) -> Self {
        Self { provider }
    }

    async fn publish(
        &self,
        conn: &Connection,
        response: StatusResponse,
        topic: ResponseTopic,
    ) -> Result<()> {
        let channel = conn.create_channel().await?;

        channel
            .exchange_declare(
                RESPONSE_EXCHANGE,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        let payload = serde_json::to_vec(&response)?;
        let _confirm = channel
            .basic_publish(
                RESPONSE_EXCHANGE,
                topic.wire_name(),
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default(),
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl StatusPublisher for ResponsePublisher {
    /// Publish a status response, correlated to the originating workflow by
    /// its response topic.
    ///
    /// When no connection is present the response is dropped: no error, no
    /// retry, no log. This is a documented gap of the protocol, not a
    /// handled case. Transport errors on a live connection are logged and
    /// swallowed.
    async fn publish_status(&self, response: StatusResponse, topic: ResponseTopic) {
        let Some(conn) = self.provider.snapshot() else {
            return;
        };

        if let Err(e) = self.publish(&conn, response, topic).await {
            error!(
                error = %e,
                routing_key = topic.wire_name(),
                "Failed to publish status response"
            );
        }
    }
}
