//! Wire and row models for one-time group pre-key pairs

use serde::{Deserialize, Serialize};

/// One uploaded key instance.
///
/// Field names mirror the bus payload and the
/// `group_one_time_pre_key_pair` table columns. Unknown payload fields are
/// ignored; no field is validated beyond what the store enforces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub user_id: i64,
    pub group_id: String,
    /// Public key blob. Carried as the raw bytes of the JSON string,
    /// stored untouched (callers encode however they like).
    #[serde(rename = "group_one_time_pre_key_pair_pbk", with = "raw_string_bytes")]
    pub public_key: Vec<u8>,
    /// Globally unique per key instance
    #[serde(rename = "group_one_time_pre_key_pair_uuid")]
    pub uuid: String,
}

/// Envelope of the bulk key upload request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadKeysRequest {
    #[serde(rename = "oneTimeGroupPreKeyPairPbks")]
    pub records: Vec<KeyRecord>,
}

/// Workflow outcome published on the response topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Status envelope. This is the only thing that ever crosses the bus in the
/// outbound direction; error detail goes to the notification collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: Status,
}

impl StatusResponse {
    #[must_use]
    pub const fn new(status: Status) -> Self {
        Self { status }
    }
}

/// One key as returned by the HTTP read endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupOneTimeKeyView {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "groupChatId")]
    pub group_chat_id: String,
    /// Blob bytes, serialized as a JSON byte array
    #[serde(rename = "oneTimeGroupPublicKey")]
    pub one_time_group_public_key: Vec<u8>,
    pub uuid: String,
}

/// Serde adapter keeping the public key blob byte-identical to the JSON
/// string it arrived as.
mod raw_string_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(String::deserialize(deserializer)?.into_bytes())
    }
}
