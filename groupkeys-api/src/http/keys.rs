//! Group key read endpoints
//!
//! Both endpoints answer with a JSON array and status 200 even when the
//! store fails: the failure is reported to the notification collaborator
//! and the caller gets an empty result, matching the historical contract.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::error;

use crate::http::AppState;

#[derive(Debug, Deserialize)]
pub struct GroupOneTimeKeysQuery {
    #[serde(rename = "groupChatId")]
    pub group_chat_id: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct GroupKeysNeededQuery {
    #[serde(rename = "groupChatIds")]
    pub group_chat_ids: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
}

/// Fetch the one-time public keys for one group message, excluding the
/// requesting user's own keys.
pub async fn get_group_one_time_keys(
    State(state): State<AppState>,
    Query(query): Query<GroupOneTimeKeysQuery>,
) -> impl IntoResponse {
    match state
        .reader
        .get_group_one_time_keys(&query.group_chat_id, query.user_id)
        .await
    {
        Ok(keys) => Json(keys),
        Err(e) => {
            error!(error = %e, group_chat_id = %query.group_chat_id, "Failed to fetch group one-time keys");
            state.notifier.notify_failure(&e.to_string()).await;
            Json(Vec::new())
        }
    }
}

/// Check which of the given groups need their one-time keys replenished
pub async fn check_if_group_keys_needed(
    State(state): State<AppState>,
    Query(query): Query<GroupKeysNeededQuery>,
) -> impl IntoResponse {
    match state
        .reader
        .check_if_group_keys_needed(&query.group_chat_ids, query.user_id)
        .await
    {
        Ok(group_ids) => Json(group_ids),
        Err(e) => {
            error!(error = %e, "Failed to check group key levels");
            state.notifier.notify_failure(&e.to_string()).await;
            Json(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use mockall::mock;

    use groupkeys_core::models::GroupOneTimeKeyView;
    use groupkeys_core::repository::KeyReader;
    use groupkeys_core::service::FailureNotifier;
    use groupkeys_core::{Error, Result};

    mock! {
        Reader {}

        #[async_trait]
        impl KeyReader for Reader {
            async fn get_group_one_time_keys(
                &self,
                group_chat_id: &str,
                user_id: i64,
            ) -> Result<Vec<GroupOneTimeKeyView>>;

            async fn check_if_group_keys_needed(
                &self,
                group_chat_ids: &str,
                user_id: i64,
            ) -> Result<Vec<String>>;
        }
    }

    mock! {
        Notifier {}

        #[async_trait]
        impl FailureNotifier for Notifier {
            async fn notify_failure(&self, reason: &str);
        }
    }

    fn state(reader: MockReader, notifier: MockNotifier) -> AppState {
        AppState {
            reader: Arc::new(reader),
            notifier: Arc::new(notifier),
        }
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_query_field_names_match_wire() {
        let query: GroupOneTimeKeysQuery =
            serde_json::from_value(serde_json::json!({"groupChatId": "g1", "userId": 7})).unwrap();
        assert_eq!(query.group_chat_id, "g1");
        assert_eq!(query.user_id, 7);

        let query: GroupKeysNeededQuery =
            serde_json::from_value(serde_json::json!({"groupChatIds": "g1,g2", "userId": 7}))
                .unwrap();
        assert_eq!(query.group_chat_ids, "g1,g2");
        assert_eq!(query.user_id, 7);
    }

    #[tokio::test]
    async fn test_get_keys_store_failure_yields_empty_array_and_one_notification() {
        let mut reader = MockReader::new();
        reader
            .expect_get_group_one_time_keys()
            .times(1)
            .returning(|_, _| Err(Error::Internal("read blew up".to_string())));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify_failure()
            .withf(|reason| reason.contains("read blew up"))
            .times(1)
            .returning(|_| ());

        let response = get_group_one_time_keys(
            State(state(reader, notifier)),
            Query(GroupOneTimeKeysQuery {
                group_chat_id: "g1".to_string(),
                user_id: 1,
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "[]");
    }

    #[tokio::test]
    async fn test_check_keys_store_failure_yields_empty_array_and_one_notification() {
        let mut reader = MockReader::new();
        reader
            .expect_check_if_group_keys_needed()
            .times(1)
            .returning(|_, _| Err(Error::Internal("check blew up".to_string())));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify_failure()
            .withf(|reason| reason.contains("check blew up"))
            .times(1)
            .returning(|_| ());

        let response = check_if_group_keys_needed(
            State(state(reader, notifier)),
            Query(GroupKeysNeededQuery {
                group_chat_ids: "g1,g2".to_string(),
                user_id: 1,
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "[]");
    }

    #[tokio::test]
    async fn test_check_keys_success_returns_group_ids() {
        let mut reader = MockReader::new();
        reader
            .expect_check_if_group_keys_needed()
            .times(1)
            .returning(|_, _| Ok(vec!["g2".to_string()]));

        let mut notifier = MockNotifier::new();
        notifier.expect_notify_failure().times(0);

        let response = check_if_group_keys_needed(
            State(state(reader, notifier)),
            Query(GroupKeysNeededQuery {
                group_chat_ids: "g1,g2".to_string(),
                user_id: 1,
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"["g2"]"#);
    }
}
