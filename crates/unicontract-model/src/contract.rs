use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::operation::UnifiedOperation;

/// Source protocol family of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Request-style (OpenAPI / Swagger).
    OpenApi,
    /// Event-style (AsyncAPI).
    AsyncApi,
}

impl Protocol {
    /// Lowercase tag used in ids and serialized output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenApi => "openapi",
            Self::AsyncApi => "asyncapi",
        }
    }

    /// The communication pattern every operation of this protocol follows.
    pub fn communication_pattern(self) -> CommunicationPattern {
        match self {
            Self::OpenApi => CommunicationPattern::RequestResponse,
            Self::AsyncApi => CommunicationPattern::PublishSubscribe,
        }
    }

    /// Synthetic operation id used when the source provides no usable one.
    pub fn fallback_operation_id(self, index: usize) -> String {
        format!("{}-op-{}", self.as_str(), index)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the two sides of an operation exchange data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommunicationPattern {
    /// Synchronous request/response (REST).
    RequestResponse,
    /// Asynchronous publish/subscribe (events).
    PublishSubscribe,
}

impl CommunicationPattern {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequestResponse => "request-response",
            Self::PublishSubscribe => "publish-subscribe",
        }
    }
}

/// A complete API contract: one OpenAPI or AsyncAPI document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedContract {
    /// Stable identifier derived from protocol and title.
    pub id: String,
    /// The `info.title` field.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The `info.version` field (the API's version, not the format's).
    pub version: String,
    pub protocol: Protocol,
    /// Operations in source document order.
    #[serde(default)]
    pub operations: Vec<UnifiedOperation>,
    /// Tags for grouping operations, unique by name.
    #[serde(default)]
    pub tags: Vec<ContractTag>,
    #[serde(default)]
    pub servers: Vec<ServerInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_schemes: Option<BTreeMap<String, SecurityScheme>>,
    pub metadata: ContractMetadata,
}

impl UnifiedContract {
    /// Derive the contract id: `<protocol>-<title>`, lowercased, with
    /// whitespace runs replaced by a single `-`.
    pub fn derive_id(protocol: Protocol, title: &str) -> String {
        let slug = title
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        format!("{}-{}", protocol.as_str(), slug)
    }

    /// Look up an operation by id.
    pub fn operation(&self, id: &str) -> Option<&UnifiedOperation> {
        self.operations.iter().find(|op| op.id == id)
    }
}

/// Tag used to group operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ContractTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// A server the contract is reachable on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Transport hint, e.g. "https", "kafka", "mqtt".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// A declared security scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScheme {
    /// Scheme type, e.g. "http", "apiKey", "oauth2".
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    /// Where an API key is carried ("header", "query", "cookie").
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// API key parameter name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Contract-level provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMetadata {
    pub source_protocol: Protocol,
    /// The source document, kept for advanced inspection when it is plain data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_spec: Option<Value>,
}
