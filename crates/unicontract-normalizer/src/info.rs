//! Document-level fields shared by both normalizers.

use std::collections::BTreeMap;

use unicontract_model::{ContractTag, SecurityScheme};

use crate::access::{FieldResolverExt, Node};
use crate::error::NormalizeError;
use crate::refs::is_reference;

/// The `info` block of a document.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DocumentInfo {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

/// Read `info`. Title and version are required.
pub(crate) fn document_info(doc: &Node) -> Result<DocumentInfo, NormalizeError> {
    let info = doc
        .field_node("info")
        .filter(Node::is_object_like)
        .ok_or_else(|| NormalizeError::MissingField("info".into()))?;
    let title = info
        .str_field("title")
        .ok_or_else(|| NormalizeError::MissingField("info.title".into()))?;
    let version = info
        .text_field("version")
        .ok_or_else(|| NormalizeError::MissingField("info.version".into()))?;
    Ok(DocumentInfo {
        title,
        version,
        description: info.str_field("description"),
    })
}

/// A tag's name: the node itself when it is a string, else its `name`
/// field, else `name` in the raw payload.
pub(crate) fn tag_name(tag: &Node) -> Option<String> {
    if let Some(name) = tag.as_str() {
        return Some(name.to_string());
    }
    tag.str_field("name").or_else(|| {
        tag.raw()
            .and_then(|raw| raw.get("name").and_then(|n| n.as_str()).map(str::to_string))
    })
}

fn contract_tag(tag: &Node) -> Option<ContractTag> {
    let name = tag_name(tag)?;
    Some(ContractTag {
        name,
        description: tag.str_field("description"),
    })
}

/// Append `tag` unless one with the same name is already present.
pub(crate) fn push_unique_tag(tags: &mut Vec<ContractTag>, tag: ContractTag) {
    if !tags.iter().any(|t| t.name == tag.name) {
        tags.push(tag);
    }
}

/// Root `tags`, unique by name, first declaration wins.
pub(crate) fn document_tags(doc: &Node) -> Vec<ContractTag> {
    let mut tags = Vec::new();
    for tag in doc.list_field("tags").iter().filter_map(contract_tag) {
        push_unique_tag(&mut tags, tag);
    }
    tags
}

/// `components.securitySchemes`, skipping references and schemes without a type.
pub(crate) fn security_schemes(doc: &Node) -> Option<BTreeMap<String, SecurityScheme>> {
    let components = doc.field_node("components")?;
    let entries = components.entries_field("securitySchemes");
    if entries.is_empty() {
        return None;
    }
    let schemes: BTreeMap<_, _> = entries
        .into_iter()
        .filter(|(_, scheme)| !is_reference(scheme))
        .filter_map(|(name, scheme)| {
            let scheme_type = scheme.str_field("type")?;
            Some((
                name,
                SecurityScheme {
                    scheme_type,
                    scheme: scheme.str_field("scheme"),
                    description: scheme.str_field("description"),
                    bearer_format: scheme.str_field("bearerFormat"),
                    location: scheme.str_field("in"),
                    name: scheme.str_field("name"),
                },
            ))
        })
        .collect();
    (!schemes.is_empty()).then_some(schemes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::WrappedObject;
    use serde_json::json;

    #[test]
    fn info_requires_title_and_version() {
        let doc = Node::Plain(json!({"info": {"title": "Shop", "version": 1.2}}));
        let info = document_info(&doc).unwrap();
        assert_eq!(info.title, "Shop");
        assert_eq!(info.version, "1.2");

        let doc = Node::Plain(json!({"info": {"version": "1"}}));
        assert_eq!(
            document_info(&doc),
            Err(NormalizeError::MissingField("info.title".into()))
        );
        assert_eq!(
            document_info(&Node::Plain(json!({}))),
            Err(NormalizeError::MissingField("info".into()))
        );
    }

    #[test]
    fn tags_are_unique_by_name() {
        let doc = Node::Plain(json!({"tags": [
            {"name": "products", "description": "first"},
            {"name": "orders"},
            {"name": "products", "description": "second"}
        ]}));
        let tags = document_tags(&doc);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].description.as_deref(), Some("first"));
    }

    #[test]
    fn tag_name_falls_back_to_raw() {
        let wrapped = WrappedObject::new()
            .with_raw(json!({"name": "billing"}))
            .into_node();
        assert_eq!(tag_name(&wrapped).as_deref(), Some("billing"));
        assert_eq!(tag_name(&Node::Plain(json!("plain"))).as_deref(), Some("plain"));
    }

    #[test]
    fn security_schemes_skip_references() {
        let doc = Node::Plain(json!({"components": {"securitySchemes": {
            "bearerAuth": {"type": "http", "scheme": "bearer", "bearerFormat": "JWT"},
            "shared": {"$ref": "#/components/securitySchemes/bearerAuth"}
        }}}));
        let schemes = security_schemes(&doc).unwrap();
        assert_eq!(schemes.len(), 1);
        assert_eq!(schemes["bearerAuth"].bearer_format.as_deref(), Some("JWT"));
        assert!(security_schemes(&Node::Plain(json!({}))).is_none());
    }
}
