//! Request workflows
//!
//! Both workflows have the same shape: store call, branch on outcome,
//! respond. They are pure orchestration — no input validation beyond what
//! the store enforces, no retries, and exactly one status publish attempt
//! per invocation (success or error). On store failure the raw error detail
//! goes to the notification collaborator; the bus only sees an opaque
//! error status.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use groupkeys_core::{
    models::{Status, StatusResponse, UploadKeysRequest},
    repository::KeyStore,
    service::FailureNotifier,
};

use crate::topics::{RequestTopic, ResponseTopic};

/// Publisher seam the workflows respond through.
///
/// Infallible by contract: the implementation swallows an absent connection
/// (the response is dropped) and logs transport errors. Workflows have
/// nothing useful to do with a publish failure.
#[async_trait]
pub trait StatusPublisher: Send + Sync {
    async fn publish_status(&self, response: StatusResponse, topic: ResponseTopic);
}

pub struct WorkflowExecutor {
    store: Arc<dyn KeyStore>,
    notifier: Arc<dyn FailureNotifier>,
    publisher: Arc<dyn StatusPublisher>,
}

impl WorkflowExecutor {
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyStore>,
        notifier: Arc<dyn FailureNotifier>,
        publisher: Arc<dyn StatusPublisher>,
    ) -> Self {
        Self {
            store,
            notifier,
            publisher,
        }
    }

    /// Bulk key upload workflow (`apiGroupE2EQ.newGroupE2EKeys`).
    ///
    /// Parses the JSON payload and bulk-inserts the records. A payload that
    /// does not parse is treated like a store failure: notified, answered
    /// with an error status, swallowed.
    pub async fn upload_group_keys(&self, payload: &[u8]) {
        let topic = RequestTopic::NewGroupKeys.response();

        let request: UploadKeysRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "Failed to parse key upload payload");
                self.notifier
                    .notify_failure(&format!("Failed to parse key upload payload: {e}"))
                    .await;
                self.respond(Status::Error, topic).await;
                return;
            }
        };

        match self.store.insert_keys(&request.records).await {
            Ok(()) => {
                debug!(count = request.records.len(), "Group keys stored");
                self.respond(Status::Ok, topic).await;
            }
            Err(e) => {
                error!(error = %e, "Group key upload failed");
                self.notifier.notify_failure(&e.to_string()).await;
                self.respond(Status::Error, topic).await;
            }
        }
    }

    /// Bulk key deletion workflow (`apiGroupE2EQ.deleteOneTimePublicKeysByUUID`).
    ///
    /// The UUID list is handed to the store byte-for-byte, including empty
    /// or malformed lists; the store owns the parsing.
    pub async fn delete_group_keys_by_uuids(&self, uuids_csv: &str) {
        let topic = RequestTopic::DeleteKeysByUuid.response();

        match self.store.delete_keys_by_uuids(uuids_csv).await {
            Ok(()) => {
                debug!("Group keys deleted");
                self.respond(Status::Ok, topic).await;
            }
            Err(e) => {
                error!(error = %e, "Group key deletion failed");
                self.notifier.notify_failure(&e.to_string()).await;
                self.respond(Status::Error, topic).await;
            }
        }
    }

    async fn respond(&self, status: Status, topic: ResponseTopic) {
        self.publisher
            .publish_status(StatusResponse::new(status), topic)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupkeys_core::models::KeyRecord;
    use groupkeys_core::{Error, Result};
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Store {}

        #[async_trait]
        impl KeyStore for Store {
            async fn insert_keys(&self, records: &[KeyRecord]) -> Result<()>;
            async fn delete_keys_by_uuids(&self, uuids_csv: &str) -> Result<()>;
        }
    }

    mock! {
        Notifier {}

        #[async_trait]
        impl FailureNotifier for Notifier {
            async fn notify_failure(&self, reason: &str);
        }
    }

    mock! {
        Publisher {}

        #[async_trait]
        impl StatusPublisher for Publisher {
            async fn publish_status(&self, response: StatusResponse, topic: ResponseTopic);
        }
    }

    const UPLOAD_PAYLOAD: &[u8] = br#"{"oneTimeGroupPreKeyPairPbks":[{"user_id":1,"group_id":"g1","group_one_time_pre_key_pair_pbk":"AA==","group_one_time_pre_key_pair_uuid":"u1"}]}"#;

    fn executor(
        store: MockStore,
        notifier: MockNotifier,
        publisher: MockPublisher,
    ) -> WorkflowExecutor {
        WorkflowExecutor::new(Arc::new(store), Arc::new(notifier), Arc::new(publisher))
    }

    #[tokio::test]
    async fn test_upload_success_publishes_single_ok() {
        let mut store = MockStore::new();
        store
            .expect_insert_keys()
            .withf(|records| {
                records.len() == 1
                    && records[0].user_id == 1
                    && records[0].group_id == "g1"
                    && records[0].public_key == b"AA=="
                    && records[0].uuid == "u1"
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut notifier = MockNotifier::new();
        notifier.expect_notify_failure().times(0);

        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish_status()
            .with(
                eq(StatusResponse::new(Status::Ok)),
                eq(ResponseTopic::NewGroupKeysStatus),
            )
            .times(1)
            .returning(|_, _| ());

        executor(store, notifier, publisher)
            .upload_group_keys(UPLOAD_PAYLOAD)
            .await;
    }

    #[tokio::test]
    async fn test_upload_store_failure_notifies_and_publishes_single_error() {
        let mut store = MockStore::new();
        store
            .expect_insert_keys()
            .times(1) // never retried
            .returning(|_| Err(Error::Internal("insert blew up".to_string())));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify_failure()
            .withf(|reason| reason.contains("insert blew up"))
            .times(1)
            .returning(|_| ());

        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish_status()
            .with(
                eq(StatusResponse::new(Status::Error)),
                eq(ResponseTopic::NewGroupKeysStatus),
            )
            .times(1)
            .returning(|_, _| ());

        executor(store, notifier, publisher)
            .upload_group_keys(UPLOAD_PAYLOAD)
            .await;
    }

    #[tokio::test]
    async fn test_upload_parse_failure_behaves_like_store_failure() {
        let mut store = MockStore::new();
        store.expect_insert_keys().times(0);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify_failure()
            .withf(|reason| reason.contains("parse"))
            .times(1)
            .returning(|_| ());

        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish_status()
            .with(
                eq(StatusResponse::new(Status::Error)),
                eq(ResponseTopic::NewGroupKeysStatus),
            )
            .times(1)
            .returning(|_, _| ());

        executor(store, notifier, publisher)
            .upload_group_keys(b"not json")
            .await;
    }

    #[tokio::test]
    async fn test_delete_passes_csv_through_unmodified() {
        let mut store = MockStore::new();
        store
            .expect_delete_keys_by_uuids()
            .with(eq("u1,u2,u3"))
            .times(1)
            .returning(|_| Ok(()));

        let mut notifier = MockNotifier::new();
        notifier.expect_notify_failure().times(0);

        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish_status()
            .with(
                eq(StatusResponse::new(Status::Ok)),
                eq(ResponseTopic::DeleteKeysStatus),
            )
            .times(1)
            .returning(|_, _| ());

        executor(store, notifier, publisher)
            .delete_group_keys_by_uuids("u1,u2,u3")
            .await;
    }

    #[tokio::test]
    async fn test_delete_forwards_empty_and_malformed_lists() {
        for csv in ["", "not,really uuids,,"] {
            let mut store = MockStore::new();
            store
                .expect_delete_keys_by_uuids()
                .with(eq(csv))
                .times(1)
                .returning(|_| Ok(()));

            let mut notifier = MockNotifier::new();
            notifier.expect_notify_failure().times(0);

            let mut publisher = MockPublisher::new();
            publisher
                .expect_publish_status()
                .times(1)
                .returning(|_, _| ());

            executor(store, notifier, publisher)
                .delete_group_keys_by_uuids(csv)
                .await;
        }
    }

    #[tokio::test]
    async fn test_delete_store_failure_notifies_and_publishes_single_error() {
        let mut store = MockStore::new();
        store
            .expect_delete_keys_by_uuids()
            .times(1)
            .returning(|_| Err(Error::Internal("delete blew up".to_string())));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify_failure()
            .withf(|reason| reason.contains("delete blew up"))
            .times(1)
            .returning(|_| ());

        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish_status()
            .with(
                eq(StatusResponse::new(Status::Error)),
                eq(ResponseTopic::DeleteKeysStatus),
            )
            .times(1)
            .returning(|_, _| ());

        executor(store, notifier, publisher)
            .delete_group_keys_by_uuids("u1")
            .await;
    }
}
