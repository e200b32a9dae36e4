//! OpenAPI 3.x and AsyncAPI 2.x/3.x normalization into the unified contract model.
//!
//! Documents arrive as a [`Node`]: plain JSON/YAML data or an accessor-backed
//! object graph from a protocol library. [`normalize`] detects the protocol
//! from the root `openapi`/`swagger` or `asyncapi` field and routes the
//! document to the matching normalizer.

pub mod access;
pub mod asyncapi;
pub mod detect;
pub mod error;
pub mod formats;
mod ids;
mod info;
pub mod openapi;
pub mod options;
pub mod refs;
pub mod schema;

pub use access::{
    resolve_or_default, Accessor, FieldResolver, FieldResolverExt, Member, Node, Resolved,
    WrappedObject,
};
pub use asyncapi::{extract_message_headers, normalize_asyncapi};
pub use detect::{detect_spec_type, detect_spec_type_from_path, validate_spec_version};
pub use error::{ExtractionError, NormalizeError, VersionWarning};
pub use formats::{AvroFormat, FormatRegistry, SchemaFormatHandler};
pub use openapi::normalize_openapi;
pub use options::NormalizeOptions;
pub use refs::dereference;

use serde_json::Value;
use unicontract_model::{Protocol, UnifiedContract};

/// Detect, check the version and normalize a document.
pub fn normalize(doc: &Node, options: &NormalizeOptions) -> Result<UnifiedContract, NormalizeError> {
    normalize_with_hint(doc, None, options)
}

/// Like [`normalize`], but falls back to `hint` when the document carries
/// no protocol marker.
///
/// With the hint standing in for the marker, the version check still runs
/// and fails with [`NormalizeError::MissingVersionField`].
pub fn normalize_with_hint(
    doc: &Node,
    hint: Option<Protocol>,
    options: &NormalizeOptions,
) -> Result<UnifiedContract, NormalizeError> {
    let protocol = match (detect_spec_type(doc), hint) {
        (Ok(protocol), _) => protocol,
        (Err(NormalizeError::UnrecognizedSpecFormat), Some(hint)) if doc.is_object_like() => hint,
        (Err(err), _) => return Err(err),
    };
    validate_spec_version(doc, protocol)?;

    match protocol {
        Protocol::OpenApi => normalize_openapi(doc, options),
        Protocol::AsyncApi => normalize_asyncapi(doc, options),
    }
}

/// Normalize plain document data, inlining local `$ref`s first.
pub fn normalize_document(
    value: &Value,
    options: &NormalizeOptions,
) -> Result<UnifiedContract, NormalizeError> {
    normalize(&Node::Plain(dereference(value)), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn routes_by_marker() {
        let options = NormalizeOptions::default();
        let rest = json!({"openapi": "3.0.0", "info": {"title": "A", "version": "1"}, "paths": {}});
        let events = json!({"asyncapi": "3.0.0", "info": {"title": "B", "version": "1"}});

        assert_eq!(normalize_document(&rest, &options).unwrap().protocol, Protocol::OpenApi);
        assert_eq!(
            normalize_document(&events, &options).unwrap().protocol,
            Protocol::AsyncApi
        );
    }

    #[test]
    fn unsupported_version_still_normalizes() {
        let doc = json!({"asyncapi": "1.2.0", "info": {"title": "Old", "version": "1"}});
        let contract = normalize_document(&doc, &NormalizeOptions::default()).unwrap();
        assert_eq!(contract.id, "asyncapi-old");
    }

    #[test]
    fn fatal_errors() {
        let options = NormalizeOptions::default();
        assert_eq!(
            normalize_document(&json!({"info": {}}), &options).unwrap_err(),
            NormalizeError::UnrecognizedSpecFormat
        );
        assert_eq!(
            normalize_document(&json!({"openapi": null, "info": {}}), &options).unwrap_err(),
            NormalizeError::MissingVersionField {
                protocol: Protocol::OpenApi
            }
        );
    }

    #[test]
    fn hint_covers_missing_marker() {
        let doc = Node::Plain(json!({"info": {"title": "X", "version": "1"}}));
        assert_eq!(
            normalize_with_hint(&doc, Some(Protocol::AsyncApi), &NormalizeOptions::default())
                .unwrap_err(),
            NormalizeError::MissingVersionField {
                protocol: Protocol::AsyncApi
            }
        );
    }

    #[test]
    fn references_are_inlined_before_normalizing() {
        let doc = json!({
            "openapi": "3.0.0",
            "info": {"title": "Refs", "version": "1"},
            "components": {"schemas": {"Id": {"type": "string", "format": "uuid"}}},
            "paths": {"/items/{id}": {"get": {
                "parameters": [{"name": "id", "in": "path", "required": true,
                                "schema": {"$ref": "#/components/schemas/Id"}}],
                "responses": {"200": {"description": "ok", "content": {"application/json": {
                    "schema": {"$ref": "#/components/schemas/Id"}}}}}
            }}}
        });
        let contract = normalize_document(&doc, &NormalizeOptions::default()).unwrap();
        let op = &contract.operations[0];
        assert_eq!(op.parameters[0].format.as_deref(), Some("uuid"));
        assert_eq!(op.output[0].format.as_deref(), Some("uuid"));
    }
}
