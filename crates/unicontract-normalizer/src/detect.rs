//! Protocol detection.

use unicontract_model::Protocol;
use unicontract_telemetry::log_unsupported_version;

use crate::access::{FieldResolver, Node};
use crate::error::{NormalizeError, VersionWarning};

/// Root field carrying the version for each marker, in detection order.
const MARKERS: &[(&str, Protocol)] = &[
    ("asyncapi", Protocol::AsyncApi),
    ("openapi", Protocol::OpenApi),
    ("swagger", Protocol::OpenApi),
];

fn has_field(doc: &Node, name: &str) -> bool {
    // A failing accessor still proves the field exists.
    !matches!(doc.resolve(name), Ok(None))
}

/// Classify a document by its reserved root field.
pub fn detect_spec_type(doc: &Node) -> Result<Protocol, NormalizeError> {
    if !doc.is_object_like() {
        return Err(NormalizeError::UnrecognizedSpecFormat);
    }
    MARKERS
        .iter()
        .find(|(field, _)| has_field(doc, field))
        .map(|(_, protocol)| *protocol)
        .ok_or(NormalizeError::UnrecognizedSpecFormat)
}

fn supported_majors(protocol: Protocol) -> &'static [&'static str] {
    match protocol {
        Protocol::OpenApi => &["3."],
        Protocol::AsyncApi => &["2.", "3."],
    }
}

/// The declared version for `protocol`, stringified.
pub fn declared_version(doc: &Node, protocol: Protocol) -> Option<String> {
    MARKERS
        .iter()
        .filter(|(_, p)| *p == protocol)
        .find_map(|(field, _)| match doc.resolve(field) {
            Ok(Some(node)) => node.to_text(),
            _ => None,
        })
}

/// Check the declared version against the supported majors.
///
/// A missing version is fatal. An unsupported one is logged and returned
/// as a warning; callers carry on regardless.
pub fn validate_spec_version(
    doc: &Node,
    protocol: Protocol,
) -> Result<Option<VersionWarning>, NormalizeError> {
    let version = declared_version(doc, protocol)
        .ok_or(NormalizeError::MissingVersionField { protocol })?;

    if supported_majors(protocol)
        .iter()
        .any(|major| version.starts_with(major))
    {
        return Ok(None);
    }

    log_unsupported_version!(
        protocol = %protocol,
        version = %version,
        "normalizing on a best-effort basis"
    );
    Ok(Some(VersionWarning::UnsupportedVersion { protocol, version }))
}

/// Guess the protocol from a file path. `None` when the path has no hint.
pub fn detect_spec_type_from_path(path: &str) -> Option<Protocol> {
    let lower = path.to_lowercase();
    if lower.contains("asyncapi") {
        Some(Protocol::AsyncApi)
    } else if lower.contains("openapi") || lower.contains("swagger") {
        Some(Protocol::OpenApi)
    } else {
        None
    }
}
