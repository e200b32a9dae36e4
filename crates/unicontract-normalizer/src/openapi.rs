//! Request-style (OpenAPI) normalization.

use serde_json::Value;
use unicontract_model::{
    ActionType, ContractMetadata, OperationMetadata, ParameterLocation, Protocol, RestMetadata,
    ServerInfo, UnifiedContract, UnifiedDataSchema, UnifiedOperation, UnifiedParameter,
};
use unicontract_telemetry::log_operation_skipped;

use crate::access::{FieldResolverExt, Node};
use crate::error::NormalizeError;
use crate::ids::IdAllocator;
use crate::info::{document_info, document_tags, security_schemes};
use crate::options::NormalizeOptions;
use crate::refs::is_reference;
use crate::schema::{JsonSchemaDialect, SchemaWalker};

/// Path item keys read as operations, in iteration order.
const HTTP_METHODS: &[(&str, ActionType)] = &[
    ("get", ActionType::Get),
    ("post", ActionType::Post),
    ("put", ActionType::Put),
    ("patch", ActionType::Patch),
    ("delete", ActionType::Delete),
    ("options", ActionType::Options),
    ("head", ActionType::Head),
    ("trace", ActionType::Trace),
];

const PROTOCOL: Protocol = Protocol::OpenApi;

/// Normalize an OpenAPI document into a unified contract.
pub fn normalize_openapi(
    doc: &Node,
    options: &NormalizeOptions,
) -> Result<UnifiedContract, NormalizeError> {
    let info = document_info(doc)?;
    let walker = SchemaWalker::new(JsonSchemaDialect, &options.parser_metadata_prefix);
    let mut ids = IdAllocator::new(PROTOCOL);
    let mut operations = Vec::new();

    for (path, item) in doc.entries_field("paths") {
        if !item.is_object_like() {
            log_operation_skipped!(location = %path, reason = "path item is not an object", "path skipped");
            continue;
        }
        let path_params = parameters(&item);

        for &(key, action_type) in HTTP_METHODS {
            let Some(op) = item.field_node(key) else {
                continue;
            };
            let index = operations.len();
            let id = ids.allocate(op.str_field("operationId").as_deref(), index);
            operations.push(normalize_operation(
                &walker,
                options,
                &path,
                action_type,
                &op,
                &path_params,
                id,
            ));
        }
    }

    tracing::debug!(
        title = %info.title,
        operations = operations.len(),
        "normalized openapi document"
    );

    Ok(UnifiedContract {
        id: UnifiedContract::derive_id(PROTOCOL, &info.title),
        name: info.title,
        description: info.description,
        version: info.version,
        protocol: PROTOCOL,
        operations,
        tags: document_tags(doc),
        servers: servers(doc),
        security_schemes: security_schemes(doc),
        metadata: ContractMetadata {
            source_protocol: PROTOCOL,
            original_spec: options.include_original_document.then(|| doc.to_json()),
        },
    })
}

fn normalize_operation(
    walker: &SchemaWalker<'_, JsonSchemaDialect>,
    options: &NormalizeOptions,
    path: &str,
    action_type: ActionType,
    op: &Node,
    path_params: &[UnifiedParameter],
    id: String,
) -> UnifiedOperation {
    let method = action_type.as_str();

    let responses = op.entries_field("responses");
    let status_codes = responses.iter().map(|(code, _)| code.clone()).collect();
    let output = responses
        .iter()
        .filter(|(_, response)| !is_reference(response))
        .map(|(code, response)| normalize_response(walker, options, code, response))
        .collect();

    let input = op
        .field_node("requestBody")
        .filter(|body| !is_reference(body))
        .and_then(|body| normalize_request_body(walker, options, &body));

    UnifiedOperation {
        id,
        name: op
            .str_field("summary")
            .unwrap_or_else(|| format!("{} {}", method, path)),
        description: op.str_field("description"),
        action_type,
        location: path.to_string(),
        communication_pattern: PROTOCOL.communication_pattern(),
        tags: op.string_list_field("tags"),
        input,
        output,
        parameters: merge_parameters(path_params, parameters(op)),
        security: security_requirements(op),
        metadata: OperationMetadata::rest(
            op.str_field("operationId"),
            RestMetadata {
                method: method.to_string(),
                path: path.to_string(),
                status_codes,
            },
        ),
    }
}

/// Pick the preferred media type, else the first declared one.
fn choose_media(content: Vec<(String, Node)>, preferred: &str) -> Option<(String, Node)> {
    let position = content
        .iter()
        .position(|(media_type, _)| media_type == preferred)
        .unwrap_or(0);
    content.into_iter().nth(position)
}

/// Media-type `example`, else the first `examples.*.value`.
fn media_example(media: &Node) -> Option<Value> {
    media.json_field("example").or_else(|| {
        media
            .entries_field("examples")
            .iter()
            .find_map(|(_, example)| example.json_field("value"))
    })
}

fn media_schema(
    walker: &SchemaWalker<'_, JsonSchemaDialect>,
    media_type: &str,
    media: &Node,
) -> Option<UnifiedDataSchema> {
    let schema_node = media.field_node("schema").filter(|s| !is_reference(s))?;
    let mut schema = walker.schema(&schema_node);
    schema.content_type = Some(media_type.to_string());
    if schema.example.is_none() {
        schema.example = media_example(media);
    }
    Some(schema)
}

fn normalize_request_body(
    walker: &SchemaWalker<'_, JsonSchemaDialect>,
    options: &NormalizeOptions,
    body: &Node,
) -> Option<UnifiedDataSchema> {
    let (media_type, media) = choose_media(
        body.entries_field("content"),
        &options.preferred_media_type,
    )?;
    let mut schema = media_schema(walker, &media_type, &media)?;
    if schema.description.is_none() {
        schema.description = body.str_field("description");
    }
    Some(schema)
}

fn normalize_response(
    walker: &SchemaWalker<'_, JsonSchemaDialect>,
    options: &NormalizeOptions,
    code: &str,
    response: &Node,
) -> UnifiedDataSchema {
    let description = response.str_field("description");
    let chosen = choose_media(response.entries_field("content"), &options.preferred_media_type);

    let schema = chosen
        .as_ref()
        .and_then(|(media_type, media)| media_schema(walker, media_type, media));

    match schema {
        Some(mut schema) => {
            if schema.name.is_none() {
                schema.name = Some(format!("{} Response", code));
            }
            if schema.description.is_none() {
                schema.description = description;
            }
            schema.status_code = Some(code.to_string());
            schema
        }
        // No body, or a body without a schema: still one entry per status code.
        None => UnifiedDataSchema {
            name: Some(format!("{} Response", code)),
            description,
            status_code: Some(code.to_string()),
            content_type: chosen.map(|(media_type, _)| media_type),
            ..UnifiedDataSchema::new("null")
        },
    }
}

fn parameters(node: &Node) -> Vec<UnifiedParameter> {
    node.list_field("parameters")
        .iter()
        .filter(|param| !is_reference(param))
        .filter_map(parameter)
        .collect()
}

fn parameter(param: &Node) -> Option<UnifiedParameter> {
    let name = param.str_field("name")?;
    let location = param
        .str_field("in")
        .as_deref()
        .and_then(ParameterLocation::parse)?;
    let schema = param.field_node("schema").filter(|s| !is_reference(s));
    let from_schema = |field: &str| schema.as_ref().and_then(|s| s.json_field(field));

    Some(UnifiedParameter {
        name,
        location,
        description: param.str_field("description"),
        required: param.bool_field("required").unwrap_or(false),
        param_type: schema
            .as_ref()
            .and_then(|s| s.str_field("type"))
            .unwrap_or_else(|| "string".to_string()),
        format: schema.as_ref().and_then(|s| s.str_field("format")),
        example: param.json_field("example").or_else(|| from_schema("example")),
        default: from_schema("default"),
        enum_values: match from_schema("enum") {
            Some(Value::Array(values)) => Some(values),
            _ => None,
        },
    })
}

/// Path-level parameters first; an operation parameter with the same
/// name and location replaces the path-level one.
fn merge_parameters(
    path_params: &[UnifiedParameter],
    op_params: Vec<UnifiedParameter>,
) -> Vec<UnifiedParameter> {
    let mut merged: Vec<UnifiedParameter> = path_params
        .iter()
        .filter(|p| {
            !op_params
                .iter()
                .any(|o| o.name == p.name && o.location == p.location)
        })
        .cloned()
        .collect();
    merged.extend(op_params);
    merged
}

/// Scheme names across all security requirement entries, first-seen order.
fn security_requirements(op: &Node) -> Option<Vec<String>> {
    let requirements = op.field_node("security")?;
    let mut names: Vec<String> = Vec::new();
    for requirement in requirements.elements().ok().flatten().unwrap_or_default() {
        for (name, _) in requirement.entries().ok().flatten().unwrap_or_default() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Some(names)
}

fn servers(doc: &Node) -> Vec<ServerInfo> {
    doc.list_field("servers")
        .iter()
        .filter_map(|server| {
            let url = server.str_field("url")?;
            let protocol = if url.starts_with("https") { "https" } else { "http" };
            Some(ServerInfo {
                protocol: Some(protocol.to_string()),
                description: server.str_field("description"),
                url,
            })
        })
        .collect()
}
