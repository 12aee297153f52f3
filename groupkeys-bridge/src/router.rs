//! Topic subscription and dispatch
//!
//! One subscription per request topic: a fresh channel, the request topic
//! exchange, a non-exclusive auto-delete queue named after the topic, bound
//! with the queue name as routing key. Deliveries from all subscriptions
//! are merged into one stream and dispatched by typed routing-key lookup;
//! messages matching no known topic are dropped.
//!
//! Under the default `on_delivery` ack policy the broker marks a message
//! consumed the moment it is delivered, so a crash or store failure after
//! delivery loses the request without redelivery. `after_processing` acks
//! each delivery only after its workflow has completed.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, Connection, Consumer, ExchangeKind,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use groupkeys_core::config::AckPolicy;

use crate::connection::RunExit;
use crate::error::Result;
use crate::topics::{RequestTopic, REQUEST_EXCHANGE};
use crate::workflow::WorkflowExecutor;

/// One live subscription. The channel is held so it outlives the consumer.
pub struct Subscription {
    channel: Channel,
    consumer: Consumer,
}

pub struct TopicRouter {
    executor: Arc<WorkflowExecutor>,
    ack_policy: AckPolicy,
}

impl TopicRouter {
    #[must_use]
    pub fn new(executor: Arc<WorkflowExecutor>, ack_policy: AckPolicy) -> Self {
        Self {
            executor,
            ack_policy,
        }
    }

    /// Subscribe to one request topic on the given connection.
    ///
    /// Subscriptions are not retried individually; a failure here surfaces
    /// to the supervisor, which tears the session down and re-runs every
    /// subscribe on the next connection.
    pub async fn subscribe(&self, conn: &Connection, topic: RequestTopic) -> Result<Subscription> {
        let channel = conn.create_channel().await?;

        channel
            .exchange_declare(
                REQUEST_EXCHANGE,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        let queue = channel
            .queue_declare(
                topic.wire_name(),
                QueueDeclareOptions {
                    exclusive: false,
                    auto_delete: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        channel
            .queue_bind(
                queue.name().as_str(),
                REQUEST_EXCHANGE,
                topic.wire_name(),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let consumer = channel
            .basic_consume(
                queue.name().as_str(),
                topic.logical_name(),
                BasicConsumeOptions {
                    no_ack: self.ack_policy == AckPolicy::OnDelivery,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        info!(queue = topic.wire_name(), "Subscribed to request topic");

        Ok(Subscription { channel, consumer })
    }

    /// Drive the merged delivery stream until the connection dies or
    /// shutdown is requested.
    pub async fn drive(
        &self,
        subscriptions: Vec<Subscription>,
        cancel: &CancellationToken,
    ) -> RunExit {
        let mut channels = Vec::with_capacity(subscriptions.len());
        let mut consumers = Vec::with_capacity(subscriptions.len());
        for sub in subscriptions {
            channels.push(sub.channel);
            consumers.push(sub.consumer);
        }

        let mut deliveries = stream::select_all(consumers);

        loop {
            tokio::select! {
                () = cancel.cancelled() => return RunExit::Cancelled,
                next = deliveries.next() => match next {
                    Some(Ok(delivery)) => self.dispatch(delivery),
                    Some(Err(e)) => {
                        error!(error = %e, "Consumer error");
                        return RunExit::Disconnected;
                    }
                    // All consumer streams ended: the connection is gone
                    None => return RunExit::Disconnected,
                },
            }
        }
    }

    /// Dispatch one delivery to its workflow.
    ///
    /// Each message runs in its own task, so in-flight store calls overlap
    /// freely; the store tolerates concurrent writes.
    fn dispatch(&self, delivery: Delivery) {
        let Some(topic) = RequestTopic::from_wire(delivery.routing_key.as_str()) else {
            self.discard(delivery);
            return;
        };

        let executor = self.executor.clone();
        let ack_after_processing = self.ack_policy == AckPolicy::AfterProcessing;

        tokio::spawn(async move {
            match topic {
                RequestTopic::NewGroupKeys => {
                    executor.upload_group_keys(&delivery.data).await;
                }
                RequestTopic::DeleteKeysByUuid => {
                    // Lossy decode: invalid UTF-8 becomes U+FFFD, everything
                    // after that is passed through to the store untouched.
                    let uuids_csv = String::from_utf8_lossy(&delivery.data);
                    executor.delete_group_keys_by_uuids(&uuids_csv).await;
                }
            }

            if ack_after_processing {
                if let Err(e) = delivery.acker.ack(BasicAckOptions::default()).await {
                    warn!(error = %e, "Failed to ack delivery");
                }
            }
        });
    }

    /// Drop a delivery matching no known topic.
    ///
    /// Under `after_processing` the delivery must still be settled: the
    /// consumer runs with `no_ack: false`, so an unacked drop would sit on
    /// the broker and be redelivered after every reconnect.
    fn discard(&self, delivery: Delivery) {
        debug!(
            routing_key = %delivery.routing_key,
            "No handler for routing key, dropping message"
        );

        if self.ack_policy == AckPolicy::AfterProcessing {
            tokio::spawn(async move {
                if let Err(e) = delivery.acker.ack(BasicAckOptions::default()).await {
                    warn!(error = %e, "Failed to ack dropped delivery");
                }
            });
        }
    }
}
