use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::contract::{CommunicationPattern, Protocol};
use crate::schema::UnifiedDataSchema;

/// Universal action verb of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionType {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
    /// Send a message to a channel.
    Publish,
    /// Receive messages from a channel.
    Subscribe,
}

impl ActionType {
    /// Map an HTTP method (any case) onto its action.
    pub fn from_http_method(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            "TRACE" => Some(Self::Trace),
            _ => None,
        }
    }

    /// `send` publishes; `receive` and anything else subscribes.
    pub fn from_async_action(action: AsyncAction) -> Self {
        match action {
            AsyncAction::Send => Self::Publish,
            AsyncAction::Receive => Self::Subscribe,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Publish => "PUBLISH",
            Self::Subscribe => "SUBSCRIBE",
        }
    }

    /// True for the event-style verbs.
    pub fn is_event(self) -> bool {
        matches!(self, Self::Publish | Self::Subscribe)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    /// Parse an OpenAPI `in` value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }
}

/// Direction of an event-style operation, from the application's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsyncAction {
    Send,
    Receive,
}

impl AsyncAction {
    /// `"send"` is the only value that means sending.
    pub fn parse(s: &str) -> Self {
        if s == "send" {
            Self::Send
        } else {
            Self::Receive
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Receive => "receive",
        }
    }
}

/// One callable or subscribable unit of a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedOperation {
    /// Unique within the owning contract.
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub action_type: ActionType,
    /// URL path template or channel address, verbatim.
    pub location: String,
    pub communication_pattern: CommunicationPattern,
    /// Tag names in source order; duplicates are kept.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Request body or message to publish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<UnifiedDataSchema>,
    /// Responses (one per status code) or the received message.
    #[serde(default)]
    pub output: Vec<UnifiedDataSchema>,
    #[serde(default)]
    pub parameters: Vec<UnifiedParameter>,
    /// Names of the security schemes the operation requires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<String>>,
    pub metadata: OperationMetadata,
}

impl UnifiedOperation {
    pub fn is_synchronous(&self) -> bool {
        self.communication_pattern == CommunicationPattern::RequestResponse
    }

    pub fn is_asynchronous(&self) -> bool {
        self.communication_pattern == CommunicationPattern::PublishSubscribe
    }
}

/// A path, query, header or cookie parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedParameter {
    pub name: String,
    pub location: ParameterLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

/// Protocol-specific detail of an operation.
///
/// Exactly one of `rest` / `async` is set, matching `protocol`. Build it with
/// [`OperationMetadata::rest`] or [`OperationMetadata::event`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    pub protocol: Protocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest: Option<RestMetadata>,
    #[serde(rename = "async", default, skip_serializing_if = "Option::is_none")]
    pub event: Option<AsyncMetadata>,
}

impl OperationMetadata {
    pub fn rest(operation_id: Option<String>, rest: RestMetadata) -> Self {
        Self {
            protocol: Protocol::OpenApi,
            operation_id,
            rest: Some(rest),
            event: None,
        }
    }

    pub fn event(operation_id: Option<String>, event: AsyncMetadata) -> Self {
        Self {
            protocol: Protocol::AsyncApi,
            operation_id,
            rest: None,
            event: Some(event),
        }
    }
}

/// HTTP detail of a request-style operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestMetadata {
    /// Uppercase HTTP method.
    pub method: String,
    pub path: String,
    /// Declared response status codes, in declaration order.
    #[serde(default)]
    pub status_codes: Vec<String>,
}

/// Channel detail of an event-style operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncMetadata {
    pub channel: String,
    pub action: AsyncAction,
    /// Recognized transport bindings, keyed by transport name.
    #[serde(default)]
    pub bindings: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_methods_map_to_actions() {
        assert_eq!(ActionType::from_http_method("get"), Some(ActionType::Get));
        assert_eq!(
            ActionType::from_http_method("DELETE"),
            Some(ActionType::Delete)
        );
        assert_eq!(ActionType::from_http_method("trace"), Some(ActionType::Trace));
        assert_eq!(ActionType::from_http_method("connect"), None);
    }

    #[test]
    fn only_send_publishes() {
        assert_eq!(AsyncAction::parse("send"), AsyncAction::Send);
        assert_eq!(AsyncAction::parse("receive"), AsyncAction::Receive);
        assert_eq!(AsyncAction::parse("publish"), AsyncAction::Receive);
        assert_eq!(
            ActionType::from_async_action(AsyncAction::Send),
            ActionType::Publish
        );
        assert_eq!(
            ActionType::from_async_action(AsyncAction::Receive),
            ActionType::Subscribe
        );
    }

    #[test]
    fn metadata_constructors_set_one_side() {
        let rest = OperationMetadata::rest(
            None,
            RestMetadata {
                method: "GET".into(),
                path: "/".into(),
                status_codes: vec![],
            },
        );
        assert!(rest.rest.is_some() && rest.event.is_none());
        assert_eq!(rest.protocol, Protocol::OpenApi);

        let event = OperationMetadata::event(
            Some("onOrder".into()),
            AsyncMetadata {
                channel: "orders".into(),
                action: AsyncAction::Receive,
                bindings: BTreeMap::new(),
            },
        );
        assert!(event.rest.is_none() && event.event.is_some());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["async"]["action"], "receive");
        assert!(json.get("rest").is_none());
    }

    #[test]
    fn action_type_serializes_uppercase() {
        let json = serde_json::to_value(ActionType::Subscribe).unwrap();
        assert_eq!(json, "SUBSCRIBE");
        let back: ActionType = serde_json::from_value(serde_json::json!("PATCH")).unwrap();
        assert_eq!(back, ActionType::Patch);
    }
}
