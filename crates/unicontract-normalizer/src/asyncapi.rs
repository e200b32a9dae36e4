//! Event-style (AsyncAPI) normalization.
//!
//! Accepts AsyncAPI 3.x documents (root `operations` map, channels by
//! reference) and 2.x documents (`publish`/`subscribe` nested under each
//! channel), as plain data or as wrapped library objects.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use unicontract_model::{
    ActionType, AsyncAction, AsyncMetadata, ContractMetadata, ContractTag, OperationMetadata,
    ParameterLocation, Protocol, ServerInfo, UnifiedContract, UnifiedDataSchema,
    UnifiedOperation, UnifiedParameter,
};
use unicontract_telemetry::log_extraction_failure;

use crate::access::{recover, FieldResolver, FieldResolverExt, Node};
use crate::error::{ExtractionError, NormalizeError};
use crate::ids::IdAllocator;
use crate::info::{document_info, document_tags, push_unique_tag, security_schemes, tag_name};
use crate::options::{NormalizeOptions, DEFAULT_MEDIA_TYPE};
use crate::refs::{is_reference, resolve_pointer};
use crate::schema::{strip_parser_metadata, MessageDialect, SchemaWalker};

const PROTOCOL: Protocol = Protocol::AsyncApi;

/// Binding keys kept per transport. Other transports are dropped.
const KNOWN_BINDINGS: &[(&str, &[&str])] = &[
    ("kafka", &["topic", "partitions", "replicas", "configs"]),
    ("mqtt", &["qos", "retain"]),
    ("amqp", &["is", "exchange", "queue"]),
];

/// An operation as found in the source, before normalization.
struct SourceOperation {
    natural_id: Option<String>,
    node: Node,
    action: AsyncAction,
    channel: Option<Node>,
    /// Channel key for 2.x documents, which is the address.
    channel_key: Option<String>,
    messages: Vec<Node>,
}

/// Normalize an AsyncAPI document into a unified contract.
pub fn normalize_asyncapi(
    doc: &Node,
    options: &NormalizeOptions,
) -> Result<UnifiedContract, NormalizeError> {
    let info = document_info(doc)?;
    let default_content_type = doc
        .str_field("defaultContentType")
        .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());

    let schemes = declared_schemes(doc, &options.parser_metadata_prefix);
    let mut ids = IdAllocator::new(PROTOCOL);
    let operations: Vec<UnifiedOperation> = source_operations(doc)
        .into_iter()
        .enumerate()
        .map(|(index, source)| {
            let id = ids.allocate(source.natural_id.as_deref(), index);
            normalize_operation(source, id, options, &default_content_type, &schemes)
        })
        .collect();

    let mut tags = document_tags(doc);
    if let Some(info_node) = doc.field_node("info") {
        for tag in document_tags(&info_node) {
            push_unique_tag(&mut tags, tag);
        }
    }
    for name in operations.iter().flat_map(|op| op.tags.iter()) {
        push_unique_tag(&mut tags, ContractTag::new(name.clone()));
    }

    tracing::debug!(
        title = %info.title,
        operations = operations.len(),
        "normalized asyncapi document"
    );

    let original_spec = match doc {
        Node::Plain(value) if options.include_original_document => Some(value.clone()),
        _ => None,
    };

    Ok(UnifiedContract {
        id: UnifiedContract::derive_id(PROTOCOL, &info.title),
        name: info.title,
        description: info.description,
        version: info.version,
        protocol: PROTOCOL,
        operations,
        tags,
        servers: servers(doc, options),
        security_schemes: security_schemes(doc),
        metadata: ContractMetadata {
            source_protocol: PROTOCOL,
            original_spec,
        },
    })
}

/// Replace an unresolved local `$ref` with its target in a plain document.
fn resolve_local(doc: &Node, node: Node) -> Node {
    if !is_reference(&node) {
        return node;
    }
    let target = node
        .str_field("$ref")
        .zip(doc.raw())
        .and_then(|(reference, root)| resolve_pointer(&root, &reference).cloned());
    match target {
        Some(value) => Node::Plain(value),
        None => node,
    }
}

/// Values of a list- or map-shaped field, in source order.
fn collection_values(node: &Node, field: &str) -> Vec<Node> {
    let Some(collection) = node.field_node(field) else {
        return Vec::new();
    };
    if let Some(items) = recover(field, collection.elements()) {
        return items;
    }
    recover(field, collection.entries())
        .unwrap_or_default()
        .into_iter()
        .map(|(_, value)| value)
        .collect()
}

fn source_operations(doc: &Node) -> Vec<SourceOperation> {
    match doc.field_node("operations") {
        Some(operations) => v3_operations(doc, &operations),
        None => v2_operations(doc),
    }
}

fn v3_operations(doc: &Node, operations: &Node) -> Vec<SourceOperation> {
    let listed: Vec<(Option<String>, Node)> = match recover("operations", operations.entries()) {
        Some(entries) => entries.into_iter().map(|(k, n)| (Some(k), n)).collect(),
        None => recover("operations", operations.elements())
            .unwrap_or_default()
            .into_iter()
            .map(|n| (None, n))
            .collect(),
    };

    listed
        .into_iter()
        .map(|(key, op)| {
            let natural_id = op.str_field("id").or(key).or_else(|| {
                op.raw().and_then(|raw| {
                    raw.get("x-parser-unique-object-id")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
            });
            let channel = op
                .field_node("channel")
                .or_else(|| collection_values(&op, "channels").into_iter().next())
                .map(|c| resolve_local(doc, c));

            let mut messages: Vec<Node> = collection_values(&op, "messages")
                .into_iter()
                .map(|m| resolve_local(doc, m))
                .collect();
            if messages.is_empty() {
                if let Some(channel) = &channel {
                    messages = collection_values(channel, "messages")
                        .into_iter()
                        .map(|m| resolve_local(doc, m))
                        .collect();
                }
            }

            SourceOperation {
                natural_id,
                action: AsyncAction::parse(op.str_field("action").as_deref().unwrap_or("")),
                node: op,
                channel,
                channel_key: None,
                messages,
            }
        })
        .collect()
}

fn v2_operations(doc: &Node) -> Vec<SourceOperation> {
    let mut out = Vec::new();
    for (address, channel) in doc.entries_field("channels") {
        // The application sends on `subscribe` and receives on `publish`.
        for (verb, action) in [
            ("subscribe", AsyncAction::Send),
            ("publish", AsyncAction::Receive),
        ] {
            let Some(op) = channel.field_node(verb) else {
                continue;
            };
            let messages = match op.field_node("message").map(|m| resolve_local(doc, m)) {
                Some(message) => {
                    let variants = message.list_field("oneOf");
                    if variants.is_empty() {
                        vec![message]
                    } else {
                        variants.into_iter().map(|m| resolve_local(doc, m)).collect()
                    }
                }
                None => Vec::new(),
            };
            out.push(SourceOperation {
                natural_id: op.str_field("operationId"),
                node: op,
                action,
                channel: Some(channel.clone()),
                channel_key: Some(address.clone()),
                messages,
            });
        }
    }
    out
}

fn normalize_operation(
    source: SourceOperation,
    id: String,
    options: &NormalizeOptions,
    default_content_type: &str,
    schemes: &[(String, Value)],
) -> UnifiedOperation {
    let SourceOperation {
        natural_id,
        node: op,
        action,
        channel,
        channel_key,
        messages,
    } = source;

    let action_type = ActionType::from_async_action(action);
    let location = channel_address(channel.as_ref(), channel_key, &id);
    let message = messages.first();

    let data = message.map(|m| normalize_message(m, options, default_content_type));
    let (input, output) = match action_type {
        ActionType::Publish => (data, Vec::new()),
        _ => (None, data.into_iter().collect()),
    };

    let mut tags = tag_names(&op);
    if let Some(channel) = &channel {
        tags.extend(tag_names(channel));
    }

    let mut parameters = channel
        .as_ref()
        .map(channel_parameters)
        .unwrap_or_default();
    parameters.extend(extract_message_headers(message));

    UnifiedOperation {
        name: op
            .str_field("summary")
            .unwrap_or_else(|| format!("{} {}", action_type, location)),
        description: op
            .str_field("description")
            .or_else(|| channel.as_ref().and_then(|c| c.str_field("description"))),
        action_type,
        communication_pattern: PROTOCOL.communication_pattern(),
        tags,
        input,
        output,
        parameters,
        security: security_requirements(&op, schemes, &options.parser_metadata_prefix),
        metadata: OperationMetadata::event(
            natural_id,
            AsyncMetadata {
                channel: location.clone(),
                action,
                bindings: bindings(channel.as_ref(), &op),
            },
        ),
        location,
        id,
    }
}

/// Channel `address`, else the raw `address`, else the 2.x channel key,
/// else the operation id.
fn channel_address(channel: Option<&Node>, channel_key: Option<String>, id: &str) -> String {
    channel
        .and_then(|c| {
            c.str_field("address").or_else(|| {
                c.raw()
                    .and_then(|raw| raw.get("address").and_then(Value::as_str).map(str::to_string))
            })
        })
        .or(channel_key)
        .unwrap_or_else(|| id.to_string())
}

/// Tag names by dual access, falling back to the raw `tags` field.
fn tag_names(node: &Node) -> Vec<String> {
    let listed = match node.resolve("tags") {
        Ok(Some(tags)) => recover("tags", tags.elements()),
        Ok(None) => None,
        Err(err) => {
            log_extraction_failure!(field = "tags", error = %err, "reading raw tags");
            None
        }
    };
    match listed {
        Some(tags) => tags.iter().filter_map(tag_name).collect(),
        None => node
            .raw()
            .and_then(|raw| raw.get("tags").and_then(Value::as_array).cloned())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| tag_name(&Node::Plain(t)))
            .collect(),
    }
}

fn normalize_message(
    message: &Node,
    options: &NormalizeOptions,
    default_content_type: &str,
) -> UnifiedDataSchema {
    let name = message.str_field("name").or_else(|| message.str_field("title"));
    let description = message
        .str_field("summary")
        .or_else(|| message.str_field("description"));
    let content_type = message
        .str_field("contentType")
        .unwrap_or_else(|| default_content_type.to_string());

    let Some(payload) = message.field_node("payload") else {
        return UnifiedDataSchema {
            name,
            description,
            content_type: Some(content_type),
            ..UnifiedDataSchema::new("object")
        };
    };

    // AsyncAPI 3 multi-format payload: `{schemaFormat, schema}`.
    let (marker, payload) = match (payload.str_field("schemaFormat"), payload.field_node("schema")) {
        (Some(marker), Some(schema)) => (Some(marker), schema),
        _ => (message.str_field("schemaFormat"), payload),
    };

    let mut schema = payload_schema(&payload, marker.as_deref(), options);
    schema.name = name.or(schema.name);
    schema.description = description.or(schema.description);
    schema.content_type = Some(content_type);
    if schema.example.is_none() {
        schema.example = message_example(message);
    }
    schema
}

fn payload_schema(
    payload: &Node,
    marker: Option<&str>,
    options: &NormalizeOptions,
) -> UnifiedDataSchema {
    let prefix = options.parser_metadata_prefix.as_str();
    let Some(handler) = marker.and_then(|m| options.formats.lookup(m)) else {
        return SchemaWalker::new(MessageDialect::from_marker(marker), prefix).schema(payload);
    };

    let walker = SchemaWalker::new(MessageDialect::new(handler.format()), prefix);
    let raw = payload.to_json();
    match handler.to_json_schema(&raw) {
        Ok(converted) => walker.schema_with_original(&Node::Plain(converted), raw),
        Err(err) => {
            log_extraction_failure!(
                field = "payload",
                format = handler.name(),
                error = %err,
                "payload conversion failed, walking it as-is"
            );
            walker.schema(payload)
        }
    }
}

/// `payload` of the first message example, by accessor then raw field.
fn message_example(message: &Node) -> Option<Value> {
    let first = message.list_field("examples").into_iter().next()?;
    first.json_field("payload").or_else(|| {
        first
            .raw()
            .and_then(|raw| raw.get("payload").cloned())
            .filter(|payload| !payload.is_null())
    })
}

/// Message headers as header parameters.
///
/// Any failure while reading the headers yields an empty list.
pub fn extract_message_headers(message: Option<&Node>) -> Vec<UnifiedParameter> {
    let Some(message) = message else {
        return Vec::new();
    };
    match read_headers(message) {
        Ok(parameters) => parameters,
        Err(err) => {
            log_extraction_failure!(field = "headers", error = %err, "headers dropped");
            Vec::new()
        }
    }
}

fn read_headers(message: &Node) -> Result<Vec<UnifiedParameter>, ExtractionError> {
    let Some(headers) = message.resolve("headers")?.filter(|h| !h.is_null()) else {
        return Ok(Vec::new());
    };
    let Some(properties) = headers.resolve("properties")? else {
        return Ok(Vec::new());
    };
    let entries = properties
        .entries()?
        .ok_or_else(|| ExtractionError::UnexpectedShape {
            field: "headers.properties".into(),
            expected: "map",
        })?;

    // An unreadable `required` list leaves every header optional.
    let required = headers.string_list_field("required");

    entries
        .into_iter()
        .map(|(name, schema)| -> Result<UnifiedParameter, ExtractionError> {
            let read = |field: &str| -> Result<Option<Node>, ExtractionError> {
                Ok(schema.resolve(field)?.filter(|n| !n.is_null()))
            };
            Ok(UnifiedParameter {
                required: required.contains(&name),
                location: ParameterLocation::Header,
                description: read("description")?.and_then(|n| n.as_str().map(str::to_string)),
                param_type: read("type")?
                    .and_then(|n| n.as_str().map(str::to_string))
                    .unwrap_or_else(|| "string".to_string()),
                format: read("format")?.and_then(|n| n.as_str().map(str::to_string)),
                example: read("example")?.map(|n| n.to_json()),
                default: read("default")?.map(|n| n.to_json()),
                enum_values: match read("enum")?.map(|n| n.to_json()) {
                    Some(Value::Array(values)) => Some(values),
                    _ => None,
                },
                name,
            })
        })
        .collect()
}

/// Channel address parameters, always required.
fn channel_parameters(channel: &Node) -> Vec<UnifiedParameter> {
    channel
        .entries_field("parameters")
        .into_iter()
        .filter(|(_, param)| !is_reference(param))
        .map(|(name, param)| {
            let schema = param.field_node("schema");
            let from_schema = |field: &str| schema.as_ref().and_then(|s| s.json_field(field));
            UnifiedParameter {
                name,
                location: ParameterLocation::Path,
                description: param.str_field("description"),
                required: true,
                param_type: schema
                    .as_ref()
                    .and_then(|s| s.str_field("type"))
                    .unwrap_or_else(|| "string".to_string()),
                format: schema.as_ref().and_then(|s| s.str_field("format")),
                example: param
                    .list_field("examples")
                    .first()
                    .map(Node::to_json)
                    .or_else(|| from_schema("example")),
                default: param.json_field("default").or_else(|| from_schema("default")),
                enum_values: match param.json_field("enum").or_else(|| from_schema("enum")) {
                    Some(Value::Array(values)) => Some(values),
                    _ => None,
                },
            }
        })
        .collect()
}

/// Known transport bindings, channel first, operation keys override.
fn bindings(channel: Option<&Node>, op: &Node) -> BTreeMap<String, Value> {
    let mut merged: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
    for source in channel.into_iter().chain(std::iter::once(op)) {
        for (transport, binding) in source.entries_field("bindings") {
            let Some((_, keys)) = KNOWN_BINDINGS.iter().find(|(name, _)| *name == transport) else {
                continue;
            };
            let target = merged.entry(transport).or_default();
            for key in keys.iter() {
                if let Some(value) = binding.json_field(key) {
                    target.insert(key.to_string(), value);
                }
            }
        }
    }
    merged
        .into_iter()
        .map(|(transport, config)| (transport, Value::Object(config)))
        .collect()
}

/// `components.securitySchemes` entries as metadata-stripped JSON, for
/// naming inlined 3.x requirement objects.
fn declared_schemes(doc: &Node, prefix: &str) -> Vec<(String, Value)> {
    doc.field_node("components")
        .map(|components| components.entries_field("securitySchemes"))
        .unwrap_or_default()
        .into_iter()
        .map(|(name, scheme)| (name, strip_parser_metadata(&scheme.to_json(), prefix)))
        .collect()
}

/// Requirement names in first-seen order.
///
/// 2.x lists `{scheme: [scopes]}` maps. 3.x lists scheme objects: a `$ref`
/// is named by its last pointer segment, an inlined scheme by the
/// `components.securitySchemes` entry it equals.
fn security_requirements(
    op: &Node,
    schemes: &[(String, Value)],
    prefix: &str,
) -> Option<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for requirement in &op.list_field("security") {
        let found: Vec<String> = if let Some(reference) = requirement.str_field("$ref") {
            reference
                .rsplit('/')
                .next()
                .filter(|tail| !tail.is_empty())
                .map(str::to_string)
                .into_iter()
                .collect()
        } else if requirement.str_field("type").is_some() {
            let inline = strip_parser_metadata(&requirement.to_json(), prefix);
            schemes
                .iter()
                .find(|(_, scheme)| *scheme == inline)
                .map(|(name, _)| name.clone())
                .into_iter()
                .collect()
        } else {
            requirement
                .entries()
                .ok()
                .flatten()
                .unwrap_or_default()
                .into_iter()
                .filter(|(_, scopes)| {
                    matches!(scopes, Node::Plain(Value::Array(_)) | Node::List(_))
                })
                .map(|(name, _)| name)
                .collect()
        };
        for name in found {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    (!names.is_empty()).then_some(names)
}

fn servers(doc: &Node, options: &NormalizeOptions) -> Vec<ServerInfo> {
    collection_values(doc, "servers")
        .iter()
        .filter_map(|server| {
            let url = server.str_field("url").or_else(|| {
                server.str_field("host").map(|host| {
                    format!("{}{}", host, server.str_field("pathname").unwrap_or_default())
                })
            })?;
            Some(ServerInfo {
                url,
                description: server.str_field("description"),
                protocol: Some(
                    server
                        .str_field("protocol")
                        .unwrap_or_else(|| options.default_event_transport.clone()),
                ),
            })
        })
        .collect()
}
