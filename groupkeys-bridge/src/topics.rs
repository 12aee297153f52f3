//! Typed topic space
//!
//! Two disjoint namespaces exist on the bus: `apiGroupE2EQ` carries inbound
//! requests, `apiGroupE2EC` carries outbound status responses. Each request
//! topic pairs with exactly one response topic. Routing keys are matched
//! through these enums instead of ad-hoc string concatenation.

/// Namespace prefix of inbound request topics
pub const REQUEST_NAMESPACE: &str = "apiGroupE2EQ";

/// Namespace prefix of outbound response topics
pub const RESPONSE_NAMESPACE: &str = "apiGroupE2EC";

/// Topic exchange covering all request topics
pub const REQUEST_EXCHANGE: &str = "apiGroupE2EQ.*";

/// Topic exchange covering all response topics
pub const RESPONSE_EXCHANGE: &str = "apiGroupE2EC.*";

/// Inbound request topics the bridge subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestTopic {
    /// Bulk key upload, JSON body `{"oneTimeGroupPreKeyPairPbks":[...]}`
    NewGroupKeys,
    /// Bulk key deletion, raw UUID-CSV body
    DeleteKeysByUuid,
}

impl RequestTopic {
    /// Every topic subscribed at startup (and re-subscribed on reconnect)
    pub const ALL: [Self; 2] = [Self::NewGroupKeys, Self::DeleteKeysByUuid];

    #[must_use]
    pub const fn logical_name(self) -> &'static str {
        match self {
            Self::NewGroupKeys => "newGroupE2EKeys",
            Self::DeleteKeysByUuid => "deleteOneTimePublicKeysByUUID",
        }
    }

    /// Namespace-qualified wire name, used as queue name and routing key
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::NewGroupKeys => "apiGroupE2EQ.newGroupE2EKeys",
            Self::DeleteKeysByUuid => "apiGroupE2EQ.deleteOneTimePublicKeysByUUID",
        }
    }

    /// Resolve an inbound routing key. Unrecognized keys yield `None` and
    /// the message is dropped by the router.
    #[must_use]
    pub fn from_wire(routing_key: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|topic| topic.wire_name() == routing_key)
    }

    /// The response topic paired with this request topic
    #[must_use]
    pub const fn response(self) -> ResponseTopic {
        match self {
            Self::NewGroupKeys => ResponseTopic::NewGroupKeysStatus,
            Self::DeleteKeysByUuid => ResponseTopic::DeleteKeysStatus,
        }
    }
}

/// Outbound response topics, one per request topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseTopic {
    NewGroupKeysStatus,
    DeleteKeysStatus,
}

impl ResponseTopic {
    #[must_use]
    pub const fn logical_name(self) -> &'static str {
        match self {
            Self::NewGroupKeysStatus => "newGroupE2EKeysQ",
            Self::DeleteKeysStatus => "deleteGroupOneTimePublicKeysByUUIDQ",
        }
    }

    /// Namespace-qualified routing key the status response is published with
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::NewGroupKeysStatus => "apiGroupE2EC.newGroupE2EKeysQ",
            Self::DeleteKeysStatus => "apiGroupE2EC.deleteGroupOneTimePublicKeysByUUIDQ",
        }
    }
}
